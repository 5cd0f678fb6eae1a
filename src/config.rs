use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use tracing::warn;

use crate::app_dirs::AppDirs;

pub const N_BACK_RANGE: RangeInclusive<u32> = 1..=5;
pub const EVENT_COUNT_RANGE: RangeInclusive<u32> = 5..=30;
/// Increment of the event count on the settings screen.
pub const EVENT_COUNT_STEP: u32 = 5;
pub const INTERVAL_SECS_RANGE: RangeInclusive<u64> = 1..=5;
pub const GRID_SIZES: [u32; 3] = [3, 4, 5];

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    pub n_back: u32,
    pub event_count: u32,
    pub event_interval_ms: u64,
    pub grid_size: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            n_back: 2,
            event_count: 10,
            event_interval_ms: 2000,
            grid_size: 3,
        }
    }
}

impl Settings {
    /// Coerce every field into the range offered by the settings screen.
    pub fn clamped(self) -> Self {
        let secs = (self.event_interval_ms / 1000)
            .clamp(*INTERVAL_SECS_RANGE.start(), *INTERVAL_SECS_RANGE.end());
        let grid_size = if GRID_SIZES.contains(&self.grid_size) {
            self.grid_size
        } else {
            Settings::default().grid_size
        };
        Self {
            n_back: self
                .n_back
                .clamp(*N_BACK_RANGE.start(), *N_BACK_RANGE.end()),
            event_count: self
                .event_count
                .clamp(*EVENT_COUNT_RANGE.start(), *EVENT_COUNT_RANGE.end()),
            event_interval_ms: secs * 1000,
            grid_size,
        }
    }

    pub fn interval_secs(&self) -> u64 {
        self.event_interval_ms / 1000
    }
}

/// Everything persisted between runs.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Preferences {
    pub settings: Settings,
    pub highscore: u32,
    pub highscore_at: Option<DateTime<Local>>,
}

pub trait SettingsStore: Send + Sync + 'static {
    /// Latest stored settings, or the defaults when nothing usable is stored.
    fn load_settings(&self) -> Settings;
    fn load_highscore(&self) -> u32;
    fn save_settings(&self, settings: &Settings) -> io::Result<()>;
    fn save_highscore(&self, score: u32) -> io::Result<()>;
}

#[derive(Debug)]
pub struct FileSettingsStore {
    path: PathBuf,
    // serialises read-modify-write cycles on the preferences file
    write_lock: Mutex<()>,
}

impl FileSettingsStore {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self::with_path(AppDirs::preferences_path())
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Preferences {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Preferences::default(),
            Err(e) => {
                warn!("reading {} failed, using defaults: {}", self.path.display(), e);
                return Preferences::default();
            }
        };
        match serde_json::from_slice::<Preferences>(&bytes) {
            Ok(mut prefs) => {
                prefs.settings = prefs.settings.clamped();
                prefs
            }
            Err(e) => {
                warn!("{} is not valid preferences json: {}", self.path.display(), e);
                Preferences::default()
            }
        }
    }

    fn modify<F: FnOnce(&mut Preferences)>(&self, f: F) -> io::Result<()> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut prefs = self.load();
        f(&mut prefs);
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(&prefs).map_err(io::Error::other)?;
        fs::write(&self.path, data)
    }
}

impl SettingsStore for FileSettingsStore {
    fn load_settings(&self) -> Settings {
        self.load().settings
    }

    fn load_highscore(&self) -> u32 {
        self.load().highscore
    }

    fn save_settings(&self, settings: &Settings) -> io::Result<()> {
        self.modify(|prefs| prefs.settings = *settings)
    }

    fn save_highscore(&self, score: u32) -> io::Result<()> {
        self.modify(|prefs| {
            prefs.highscore = score;
            prefs.highscore_at = Some(Local::now());
        })
    }
}

/// Store kept in memory, for tests and embedding without a filesystem.
#[derive(Debug, Default)]
pub struct MemorySettingsStore {
    prefs: Mutex<Preferences>,
}

impl MemorySettingsStore {
    pub fn new(settings: Settings, highscore: u32) -> Self {
        Self {
            prefs: Mutex::new(Preferences {
                settings,
                highscore,
                highscore_at: None,
            }),
        }
    }

    pub fn preferences(&self) -> Preferences {
        self.prefs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl SettingsStore for MemorySettingsStore {
    fn load_settings(&self) -> Settings {
        self.preferences().settings
    }

    fn load_highscore(&self) -> u32 {
        self.preferences().highscore
    }

    fn save_settings(&self, settings: &Settings) -> io::Result<()> {
        self.prefs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .settings = *settings;
        Ok(())
    }

    fn save_highscore(&self, score: u32) -> io::Result<()> {
        let mut prefs = self.prefs.lock().unwrap_or_else(PoisonError::into_inner);
        prefs.highscore = score;
        prefs.highscore_at = Some(Local::now());
        Ok(())
    }
}
