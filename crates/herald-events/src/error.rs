//! Emitter error types

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EmitterError {
    #[error("maximum listeners ({limit}) reached for \"{event}\" event")]
    ListenerLimitExceeded { event: String, limit: usize },

    /// First failing listener of a propagating emission, passed through as-is.
    #[error(transparent)]
    Listener(anyhow::Error),

    #[error("{} listener(s) failed for \"{event}\" event", failures.len())]
    ListenerFailures {
        event: String,
        failures: Vec<anyhow::Error>,
    },
}

impl EmitterError {
    pub fn is_limit_exceeded(&self) -> bool {
        matches!(self, EmitterError::ListenerLimitExceeded { .. })
    }

    /// Event name carried by the error, if any.
    pub fn event(&self) -> Option<&str> {
        match self {
            EmitterError::ListenerLimitExceeded { event, .. }
            | EmitterError::ListenerFailures { event, .. } => Some(event),
            EmitterError::Listener(_) => None,
        }
    }
}
