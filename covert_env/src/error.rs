//! Error types for the environment abstraction.

use thiserror::Error;

/// Errors that can occur in the environment abstraction layer.
#[derive(Debug, Error)]
pub enum EnvError {
    /// A task could not be started (no runtime, runtime shutting down)
    #[error("Failed to spawn task '{name}': {reason}")]
    Spawn { name: String, reason: String },
}

impl EnvError {
    /// Creates a spawn error for the named task.
    pub fn spawn(name: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::Spawn {
            name: name.into(),
            reason: reason.to_string(),
        }
    }
}
