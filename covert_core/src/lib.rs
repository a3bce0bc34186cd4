//! Covert Core - Concurrent engine for the resistance vs. counter-intelligence
//! simulation
//!
//! Three populations share one store and run as independent tasks:
//! 1. **Resistance**: groups form on a timer, members share data, spies leak
//!    it and self-healing replenishment refills losses
//! 2. **Agency**: agents analyse, face growing risk with time in service, and
//!    drive the suspicion pipeline
//! 3. **Civilians**: background data sharing
//!
//! The [`Orchestrator`] supervises the populations and ends the run on the
//! first termination condition.

pub mod agency;
pub mod bounded;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod orchestrator;
pub mod pipeline;
pub mod resistance;
pub mod snapshot;
pub mod store;
pub mod targeting;
pub mod types;
pub mod world;

// Re-export key types for convenience
pub use config::{DurationRange, SimParams};
pub use error::{ConfigError, SimError, StoreError};
pub use orchestrator::{check_termination, Orchestrator, SimOutcome, TerminationReason};
pub use pipeline::{run_pass, PassReport};
pub use snapshot::StoreSnapshot;
pub use store::{Counter, Counters, SharedStore};
pub use types::{AgencyId, GroupId, MemberId, Position};
pub use world::World;
