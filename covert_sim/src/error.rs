//! CLI-level errors.

use covert_core::{ConfigError, SimError};
use thiserror::Error;

/// Anything that stops the CLI before or during a run. All map to exit code 1.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("unknown scenario '{0}' (try --list-scenarios)")]
    UnknownScenario(String),

    #[error("invalid view interval {0}s")]
    InvalidViewInterval(f64),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Sim(#[from] SimError),

    #[error("failed to encode report: {0}")]
    Report(#[from] serde_json::Error),
}
