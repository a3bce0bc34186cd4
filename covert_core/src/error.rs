//! Error types for the simulation engine.

use std::path::PathBuf;
use thiserror::Error;

/// Bounded collections in the shared store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    Groups,
    Suspects,
    Spies,
    AgencyPositions,
    CaughtResistance,
    CaughtAgency,
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Collection::Groups => "group registry",
            Collection::Suspects => "suspect set",
            Collection::Spies => "spy set",
            Collection::AgencyPositions => "agency positions",
            Collection::CaughtResistance => "caught resistance positions",
            Collection::CaughtAgency => "caught agency positions",
        };
        f.write_str(name)
    }
}

/// Non-fatal store failures. The write is dropped; the simulation continues.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    /// A bounded collection is full
    #[error("{collection} is full (capacity {capacity}); write dropped")]
    Capacity { collection: Collection, capacity: usize },

    /// The referenced group is not in the registry
    #[error("unknown group {0}")]
    UnknownGroup(u32),
}

/// Configuration loading and validation failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file exists but could not be read
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The loaded parameters cannot drive a simulation
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Fatal bootstrap failures of a simulation run.
#[derive(Debug, Error)]
pub enum SimError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The async runtime could not be built
    #[error("failed to build runtime: {0}")]
    Runtime(#[source] std::io::Error),

    /// A population that the run cannot do without failed to start
    #[error("failed to start {population} population: {source}")]
    Population {
        population: &'static str,
        #[source]
        source: covert_env::EnvError,
    },
}
