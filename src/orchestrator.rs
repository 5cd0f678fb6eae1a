// Session orchestrator: paces stimuli on a fixed clock, scores match signals
// and publishes every change through observable snapshots.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

use itertools::Itertools;
use tracing::{debug, info, warn};

use crate::audio::LetterPlayer;
use crate::config::{Settings, SettingsStore};
use crate::error::NBackError;
use crate::observable::Observable;
use crate::sequence::{self, StimulusSequence};
use crate::session::{
    Feedback, Modality, SessionConfig, SessionState, FEEDBACK_RESET_MS, LEAD_IN_MS,
};

/// Fixed delays around the per-stimulus interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timings {
    pub lead_in: Duration,
    pub feedback_reset: Duration,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            lead_in: Duration::from_millis(LEAD_IN_MS),
            feedback_reset: Duration::from_millis(FEEDBACK_RESET_MS),
        }
    }
}

struct ActiveSession {
    config: SessionConfig,
    visual: Option<StimulusSequence>,
    audio: Option<StimulusSequence>,
}

#[derive(Default)]
struct Core {
    /// Bumped on every start and shutdown; a loop only publishes while its
    /// generation is current.
    generation: u64,
    session: Option<ActiveSession>,
    score: u32,
    correct_count: u32,
}

/// Persists highscores on one background thread, in the order they were
/// reached. The thread exits once the writer is dropped.
struct HighscoreWriter {
    tx: Mutex<Sender<u32>>,
}

impl HighscoreWriter {
    fn spawn(store: Arc<dyn SettingsStore>) -> Self {
        let (tx, rx) = mpsc::channel::<u32>();
        thread::spawn(move || {
            for score in rx {
                match store.save_highscore(score) {
                    Ok(()) => info!("new highscore {} saved", score),
                    Err(e) => warn!("saving highscore {} failed: {}", score, e),
                }
            }
        });
        Self { tx: Mutex::new(tx) }
    }

    fn save(&self, score: u32) {
        let tx = self.tx.lock().unwrap_or_else(PoisonError::into_inner);
        if tx.send(score).is_err() {
            warn!("highscore writer gone, {} not saved", score);
        }
    }
}

struct Shared {
    core: Mutex<Core>,
    state: Observable<SessionState>,
    score: Observable<u32>,
    highscore: Observable<u32>,
    highscore_writer: HighscoreWriter,
    store: Arc<dyn SettingsStore>,
    player: Arc<dyn LetterPlayer>,
    timings: Timings,
}

enum Step {
    Superseded,
    Shown { audio: Option<u32> },
}

pub struct Orchestrator {
    shared: Arc<Shared>,
    cancel: Mutex<Option<Sender<()>>>,
}

impl Orchestrator {
    pub fn new(store: Arc<dyn SettingsStore>, player: Arc<dyn LetterPlayer>) -> Self {
        Self::with_timings(store, player, Timings::default())
    }

    pub fn with_timings(
        store: Arc<dyn SettingsStore>,
        player: Arc<dyn LetterPlayer>,
        timings: Timings,
    ) -> Self {
        let highscore = store.load_highscore();
        Self {
            shared: Arc::new(Shared {
                core: Mutex::new(Core::default()),
                state: Observable::new(SessionState::default()),
                score: Observable::new(0),
                highscore: Observable::new(highscore),
                highscore_writer: HighscoreWriter::spawn(Arc::clone(&store)),
                store,
                player,
                timings,
            }),
            cancel: Mutex::new(None),
        }
    }

    fn cancel_slot(&self) -> MutexGuard<'_, Option<Sender<()>>> {
        self.cancel.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Change the modality of the idle session.
    pub fn configure(&self, modality: Modality) -> Result<(), NBackError> {
        let _core = self.shared.lock_core();
        if self.shared.state.get().is_running {
            return Err(NBackError::SessionRunning);
        }
        self.shared.state.update(|st| st.modality = modality);
        Ok(())
    }

    /// Start a new session, cancelling any session already in flight.
    ///
    /// Sequences are generated before anything else changes, so a bad
    /// configuration leaves the current session untouched.
    pub fn start(&self, config: SessionConfig) -> Result<(), NBackError> {
        config.validate()?;
        let visual = if config.modality.has_visual() {
            Some(sequence::generate(
                config.length,
                config.stimulus_domain_size,
                config.target_match_percentage,
                config.lag,
            )?)
        } else {
            None
        };
        let audio = if config.modality.has_audio() {
            Some(sequence::generate(
                config.length,
                config.audio_domain_size,
                config.target_match_percentage,
                config.lag,
            )?)
        } else {
            None
        };

        if let Some(seq) = &visual {
            debug!("visual sequence: [{}]", seq.values().iter().join(", "));
        }
        if let Some(seq) = &audio {
            debug!("audio sequence: [{}]", seq.values().iter().join(", "));
        }

        // held until the loop is spawned so concurrent starts can't interleave
        let mut cancel = self.cancel_slot();
        if let Some(previous) = cancel.take() {
            let _ = previous.send(());
            info!("restarting: previous session cancelled");
        }

        let (cancel_tx, cancel_rx) = mpsc::channel();
        let generation = {
            let mut core = self.shared.lock_core();
            core.generation += 1;
            core.score = 0;
            core.correct_count = 0;
            core.session = Some(ActiveSession {
                config: config.clone(),
                visual,
                audio,
            });
            self.shared.score.set(0);
            self.shared.state.set(SessionState {
                modality: config.modality,
                current_visual_value: None,
                current_audio_value: None,
                current_index: 0,
                is_running: true,
                feedback: Feedback::None,
                correct_count: 0,
            });
            core.generation
        };

        info!(
            "session {} started: {} lag={} length={} interval={}ms",
            generation, config.modality, config.lag, config.length, config.tick_interval_ms
        );

        let shared = Arc::clone(&self.shared);
        thread::spawn(move || shared.run(generation, cancel_rx));
        *cancel = Some(cancel_tx);
        Ok(())
    }

    /// Score a "match" signal against the current stimulus.
    ///
    /// Returns `None` without touching any state when no session is running
    /// or the current index has no lag-N predecessor. Every call is scored,
    /// including repeated presses within one stimulus.
    pub fn check_match(&self) -> Option<Feedback> {
        let mut core = self.shared.lock_core();
        let state = self.shared.state.get();
        if !state.is_running {
            return None;
        }
        let index = state.current_index;

        let correct = {
            let session = core.session.as_ref()?;
            if index < session.config.lag {
                return None;
            }
            let visual = session
                .visual
                .as_ref()
                .is_some_and(|seq| seq.is_match_at(index));
            let audio = session
                .audio
                .as_ref()
                .is_some_and(|seq| seq.is_match_at(index));
            match session.config.modality {
                Modality::Visual => visual,
                Modality::Audio => audio,
                Modality::AudioVisual => visual || audio,
            }
        };

        let feedback = if correct {
            core.score += 1;
            core.correct_count += 1;
            Feedback::Correct
        } else {
            core.score = core.score.saturating_sub(1);
            Feedback::Incorrect
        };
        let correct_count = core.correct_count;
        self.shared.score.set(core.score);
        self.shared.state.update(|st| {
            st.feedback = feedback;
            st.correct_count = correct_count;
        });
        debug!("match at {} -> {:?}, score {}", index, feedback, core.score);
        drop(core);

        self.shared.schedule_feedback_reset();
        Some(feedback)
    }

    /// Cancel the running session, if any, and return to idle.
    pub fn shutdown(&self) {
        let mut cancel = self.cancel_slot();
        if let Some(tx) = cancel.take() {
            let _ = tx.send(());
        }
        let mut core = self.shared.lock_core();
        core.generation += 1;
        if core.session.take().is_some() {
            info!("session {} cancelled", core.generation - 1);
        }
        self.shared.state.update(|st| {
            st.current_visual_value = None;
            st.current_audio_value = None;
            st.is_running = false;
            st.feedback = Feedback::None;
        });
    }

    pub fn state(&self) -> SessionState {
        self.shared.state.get()
    }

    pub fn subscribe_state(&self) -> Receiver<SessionState> {
        self.shared.state.subscribe()
    }

    pub fn score(&self) -> u32 {
        self.shared.score.get()
    }

    pub fn subscribe_score(&self) -> Receiver<u32> {
        self.shared.score.subscribe()
    }

    pub fn highscore(&self) -> u32 {
        self.shared.highscore.get()
    }

    pub fn subscribe_highscore(&self) -> Receiver<u32> {
        self.shared.highscore.subscribe()
    }

    pub fn is_running(&self) -> bool {
        self.shared.state.get().is_running
    }

    pub fn settings(&self) -> Settings {
        self.shared.store.load_settings()
    }

    pub fn save_settings(&self, settings: &Settings) {
        if let Err(e) = self.shared.store.save_settings(settings) {
            warn!("saving settings failed: {}", e);
        }
    }
}

impl Drop for Orchestrator {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl Shared {
    fn lock_core(&self) -> MutexGuard<'_, Core> {
        self.core.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn run(&self, generation: u64, cancel: Receiver<()>) {
        if !wait(&cancel, self.timings.lead_in) {
            debug!("session {} cancelled during lead-in", generation);
            return;
        }

        let (length, interval) = {
            let core = self.lock_core();
            match &core.session {
                Some(s) if core.generation == generation => {
                    (s.config.length, s.config.tick_interval())
                }
                _ => return,
            }
        };

        for index in 0..length {
            match self.present(generation, index) {
                Step::Superseded => return,
                Step::Shown { audio } => {
                    if let Some(letter) = audio {
                        self.player.play_letter(letter);
                    }
                }
            }
            if !wait(&cancel, interval) {
                debug!("session {} cancelled at index {}", generation, index);
                return;
            }
        }

        self.finish(generation);
    }

    fn present(&self, generation: u64, index: usize) -> Step {
        let core = self.lock_core();
        if core.generation != generation {
            return Step::Superseded;
        }
        let Some(session) = core.session.as_ref() else {
            return Step::Superseded;
        };
        let visual = session.visual.as_ref().and_then(|s| s.get(index));
        let audio = session.audio.as_ref().and_then(|s| s.get(index));
        self.state.update(|st| {
            st.current_index = index;
            st.current_visual_value = visual;
            st.current_audio_value = audio;
            st.feedback = Feedback::None;
        });
        debug!("stimulus {}: visual={:?} audio={:?}", index, visual, audio);
        Step::Shown { audio }
    }

    fn finish(&self, generation: u64) {
        let mut core = self.lock_core();
        if core.generation != generation {
            return;
        }
        core.session = None;
        let score = core.score;
        if score > self.highscore.get() {
            self.highscore.set(score);
            // queued under the lock so saves keep the order highscores were reached in
            self.highscore_writer.save(score);
        }
        self.state.update(|st| {
            st.current_visual_value = None;
            st.current_audio_value = None;
            st.is_running = false;
        });
        drop(core);

        info!("session {} finished with score {}", generation, score);
    }

    /// Clear feedback after a fixed delay. Not tied to the session: if a new
    /// session started meanwhile the next stimulus overwrites it anyway.
    fn schedule_feedback_reset(&self) {
        let state = self.state.clone();
        let delay = self.timings.feedback_reset;
        thread::spawn(move || {
            thread::sleep(delay);
            state.update(|st| st.feedback = Feedback::None);
        });
    }
}

/// Sleep for `timeout` unless cancelled first. Returns false on cancellation.
fn wait(cancel: &Receiver<()>, timeout: Duration) -> bool {
    matches!(cancel.recv_timeout(timeout), Err(RecvTimeoutError::Timeout))
}
