// Library surface for the terminal binary and for headless/integration tests.
pub mod app;
pub mod app_dirs;
pub mod audio;
pub mod config;
pub mod error;
pub mod observable;
pub mod orchestrator;
pub mod runtime;
pub mod sequence;
pub mod session;
pub mod ui;

pub use error::NBackError;
pub use orchestrator::{Orchestrator, Timings};
pub use sequence::{generate, StimulusSequence};
pub use session::{Feedback, Modality, SessionConfig, SessionState};
