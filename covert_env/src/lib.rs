//! Covert Simulation Environment Abstraction Layer
//!
//! This crate lets the conflict engine run against either the **real clock**
//! (tokio) or a **virtual clock** that fast-forwards whenever an actor sleeps.
//!
//! # Core Concept
//!
//! Every actor touches the outside world through a context:
//! - Time (`now()`, `sleep()`)
//! - Tasks (`spawn()`)
//! - Randomness (`derive_rng()`)
//!
//! Shutdown is cooperative: actors poll a [`ShutdownSignal`] at the top of
//! each loop iteration.
//!
//! # Example
//!
//! ```ignore
//! use covert_env::{CovertContext, ShutdownSignal};
//!
//! async fn civilian_loop<Ctx: CovertContext>(ctx: &Ctx, shutdown: &ShutdownSignal) {
//!     while shutdown.is_running() {
//!         ctx.sleep(Duration::from_secs(5)).await;
//!         share_data();
//!     }
//! }
//! ```

mod context;
mod error;
mod shutdown;
mod tokio_impl;

pub use context::CovertContext;
pub use error::EnvError;
pub use shutdown::ShutdownSignal;
pub use tokio_impl::TokioContext;
