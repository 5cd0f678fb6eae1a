use std::process::{Command, Stdio};

use tracing::{debug, warn};

/// Spoken stimuli, indexed from 1.
pub const LETTERS: [char; 8] = ['A', 'B', 'C', 'D', 'E', 'F', 'G', 'H'];

pub fn letter_for(index: u32) -> Option<char> {
    index
        .checked_sub(1)
        .and_then(|i| LETTERS.get(i as usize))
        .copied()
}

/// Audio playback boundary. Implementations must not block the caller for
/// the duration of playback and must swallow their own failures.
pub trait LetterPlayer: Send + Sync + 'static {
    fn play_letter(&self, index: u32);
}

/// Speaks letters through an external text-to-speech program.
#[derive(Debug, Clone)]
pub struct SpeechPlayer {
    program: String,
    args: Vec<String>,
}

impl SpeechPlayer {
    /// `command` is split on whitespace; the letter is appended as the last
    /// argument.
    pub fn new(command: &str) -> Self {
        let mut parts = command.split_whitespace().map(str::to_string);
        let program = parts.next().unwrap_or_else(default_speech_program);
        Self {
            program,
            args: parts.collect(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

impl Default for SpeechPlayer {
    fn default() -> Self {
        Self::new(&default_speech_program())
    }
}

fn default_speech_program() -> String {
    if cfg!(target_os = "macos") {
        "say".to_string()
    } else {
        "espeak".to_string()
    }
}

impl LetterPlayer for SpeechPlayer {
    fn play_letter(&self, index: u32) {
        let Some(letter) = letter_for(index) else {
            warn!("no letter for audio index {}", index);
            return;
        };

        let spawned = Command::new(&self.program)
            .args(&self.args)
            .arg(letter.to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn();

        match spawned {
            Ok(mut child) => {
                debug!("speaking letter {}", letter);
                // reap in the background so finished speakers don't linger
                std::thread::spawn(move || {
                    let _ = child.wait();
                });
            }
            Err(e) => warn!("failed to run {} for letter {}: {}", self.program, letter, e),
        }
    }
}

/// Player for muted sessions and tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentPlayer;

impl LetterPlayer for SilentPlayer {
    fn play_letter(&self, index: u32) {
        debug!("muted letter {:?}", letter_for(index));
    }
}
