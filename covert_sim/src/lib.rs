//! Covert Simulation Harness
//!
//! Runs the conflict engine from `covert_core` end to end:
//! - **Contexts**: wall-clock (`TokioContext`) or a seeded virtual clock
//!   ([`SimContext`]) that jumps straight to the next timer
//! - **Scenarios**: parameter presets applied before the config file
//! - **Viewer**: read-only snapshot sampler feeding the log and the exporter
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────── runner ─────────────────────────┐
//! │  tokio runtime: multi-thread, or paused current-thread      │
//! │                                                             │
//! │  ┌─────────────────────── Orchestrator ──────────────────┐  │
//! │  │  civilians  │  resistance  │  agency  │  viewer       │  │
//! │  └──────┬──────────────┬────────────┬─────────┬──────────┘  │
//! │         ▼              ▼            ▼         ▼ read-only   │
//! │  ┌─────────────────────── SharedStore ───────────────────┐  │
//! │  │  intel (lock a)            │  registry (lock b)       │  │
//! │  └───────────────────────────────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use covert_sim::{run, RunConfig, ScenarioId};
//!
//! let mut params = SimParams::default();
//! ScenarioId::Skirmish.apply(&mut params);
//! let report = run(RunConfig::new(params, ScenarioId::Skirmish).with_virtual_time(true))?;
//! println!("{}", report.outcome.reason);
//! ```

mod context;
mod error;
pub mod exporter;
pub mod runner;
pub mod scenarios;
pub mod viewer;

pub use context::SimContext;
pub use error::CliError;
pub use exporter::{SimExport, SimFrame};
pub use runner::{run, RunConfig, RunReport};
pub use scenarios::ScenarioId;
pub use viewer::{FrameSink, Viewer};
