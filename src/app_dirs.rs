use directories::ProjectDirs;
use std::path::PathBuf;

/// Centralized application directory resolution
pub struct AppDirs;

impl AppDirs {
    pub fn preferences_path() -> PathBuf {
        ProjectDirs::from("", "", "nback")
            .map(|pd| pd.config_dir().join("preferences.json"))
            .unwrap_or_else(|| PathBuf::from("nback_preferences.json"))
    }

    /// Log file under $HOME/.local/state/nback, since the TUI owns stdout.
    pub fn log_path() -> PathBuf {
        if let Ok(home) = std::env::var("HOME") {
            PathBuf::from(home)
                .join(".local")
                .join("state")
                .join("nback")
                .join("nback.log")
        } else {
            ProjectDirs::from("", "", "nback")
                .map(|pd| pd.data_local_dir().join("nback.log"))
                .unwrap_or_else(|| PathBuf::from("nback.log"))
        }
    }
}
