use thiserror::Error;

/// Errors surfaced synchronously by the generator and the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NBackError {
    #[error("invalid session configuration: {0}")]
    InvalidConfiguration(String),

    #[error("stimulus domain of size {domain_size} leaves nothing to draw a non-match from")]
    DomainTooSmall { domain_size: u32 },

    #[error("session is running; stop it before changing the modality")]
    SessionRunning,
}

impl NBackError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidConfiguration(message.into())
    }
}
