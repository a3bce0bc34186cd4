//! Core environment context trait for simulation actors.

use crate::error::EnvError;
use async_trait::async_trait;
use rand_chacha::ChaCha8Rng;
use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;

/// The central interface for environment interaction.
///
/// Actors, lifecycle managers and the orchestrator only ever see time,
/// sleeping, task creation and randomness through this trait, so the same
/// engine runs against the wall clock or a virtual clock.
///
/// # Implementations
///
/// - **Production**: `TokioContext` - wraps `tokio::time`, entropy-seeded RNG
/// - **Simulation**: `SimContext` (in `covert_sim`) - virtual clock, seeded RNG
#[async_trait]
pub trait CovertContext: Send + Sync + 'static {
    /// Returns the monotonic time elapsed since the context was created.
    ///
    /// In simulation, this is the virtual clock time.
    fn now(&self) -> Duration;

    /// Suspends the calling task for the given duration.
    ///
    /// Callers must never hold a store lock across this call.
    async fn sleep(&self, duration: Duration);

    /// Spawns an independent background task.
    ///
    /// The returned handle may be aborted by the owner; a task that finishes
    /// or panics never affects its siblings.
    fn spawn<F>(&self, name: &str, future: F) -> Result<JoinHandle<()>, EnvError>
    where
        F: Future<Output = ()> + Send + 'static;

    /// Derives a random number generator for one actor.
    ///
    /// Seeded contexts combine the master seed with `seed_extension` so that
    /// every actor gets its own stream.
    fn derive_rng(&self, seed_extension: u64) -> ChaCha8Rng;

    /// Returns the context's seed (0 when not seeded).
    fn seed(&self) -> u64;
}
