//! Simulation orchestrator.
//!
//! Starts one supervised task per population, watches the termination
//! predicates on a fixed tick, and tears everything down exactly once.
//!
//! # Shutdown sequence
//!
//! 1. A predicate holds (or the interrupt future completes).
//! 2. The shared [`ShutdownSignal`](covert_env::ShutdownSignal) is flipped;
//!    only the first flip logs the reason.
//! 3. Every population task is aborted, which drops its actor set and aborts
//!    the actors.
//! 4. All population tasks are awaited, then the final snapshot is taken.

use crate::config::SimParams;
use crate::error::SimError;
use crate::lifecycle::{run_agency, run_civilians, run_resistance};
use crate::snapshot::StoreSnapshot;
use crate::store::Counters;
use crate::world::World;
use covert_env::CovertContext;
use serde::Serialize;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

type Population = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Why a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TerminationReason {
    MaxKilled,
    MaxInjured,
    AgencyDefeated,
    /// External interrupt (Ctrl-C)
    Interrupted,
}

impl std::fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            TerminationReason::MaxKilled => "resistance losses reached the kill limit",
            TerminationReason::MaxInjured => "resistance injuries reached the limit",
            TerminationReason::AgencyDefeated => "agency defeated after its time limit",
            TerminationReason::Interrupted => "interrupted",
        };
        f.write_str(text)
    }
}

/// Evaluates the termination predicates in order; the first that holds wins.
pub fn check_termination(
    counters: &Counters,
    params: &SimParams,
    elapsed: Duration,
) -> Option<TerminationReason> {
    if counters.killed_resistance >= params.max_killed {
        return Some(TerminationReason::MaxKilled);
    }
    if counters.injured_resistance >= params.max_injured {
        return Some(TerminationReason::MaxInjured);
    }
    let agency_losses = counters.killed_agency + counters.caught_agency;
    if elapsed >= params.agency_time_limit && agency_losses >= i64::from(params.agency_members) {
        return Some(TerminationReason::AgencyDefeated);
    }
    None
}

/// Result of a finished run.
#[derive(Debug, Clone, Serialize)]
pub struct SimOutcome {
    pub reason: TerminationReason,
    pub elapsed_secs: f64,
    pub snapshot: StoreSnapshot,
}

/// Owns the populations of one run.
pub struct Orchestrator<C> {
    world: World<C>,
    viewer: Option<Population>,
}

impl<C: CovertContext> Orchestrator<C> {
    pub fn new(world: World<C>) -> Self {
        Self {
            world,
            viewer: None,
        }
    }

    /// Adds a read-only visualization population.
    pub fn with_viewer<F>(mut self, viewer: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.viewer = Some(Box::pin(viewer));
        self
    }

    pub fn world(&self) -> &World<C> {
        &self.world
    }

    /// Runs until a termination predicate holds.
    pub async fn run(self) -> Result<SimOutcome, SimError> {
        self.run_until(std::future::pending()).await
    }

    /// Runs until a termination predicate holds or `interrupt` completes.
    pub async fn run_until<I>(self, interrupt: I) -> Result<SimOutcome, SimError>
    where
        I: Future<Output = ()> + Send,
    {
        let world = self.world;
        let start = world.ctx.now();

        let mut populations: Vec<(&'static str, Population)> = Vec::with_capacity(4);
        populations.push(("civilians", Box::pin(run_civilians(world.clone()))));
        populations.push(("resistance", Box::pin(run_resistance(world.clone()))));
        populations.push(("agency", Box::pin(run_agency(world.clone()))));
        if let Some(viewer) = self.viewer {
            populations.push(("viewer", viewer));
        }

        let mut handles: Vec<(&'static str, JoinHandle<()>)> =
            Vec::with_capacity(populations.len());
        for (name, future) in populations {
            match world.ctx.spawn(name, future) {
                Ok(handle) => handles.push((name, handle)),
                Err(source) => {
                    world.shutdown.trigger();
                    for (_, handle) in &handles {
                        handle.abort();
                    }
                    return Err(SimError::Population {
                        population: name,
                        source,
                    });
                }
            }
        }
        info!(
            populations = handles.len(),
            agency = world.params.agency_members,
            "Simulation started"
        );

        let reason = watch(&world, start, interrupt).await;

        if world.shutdown.trigger() {
            info!(%reason, "Shutting down");
        }
        for (_, handle) in &handles {
            handle.abort();
        }
        for (name, handle) in handles {
            match handle.await {
                Ok(()) => debug!(population = name, "Population finished"),
                Err(e) if e.is_cancelled() => debug!(population = name, "Population stopped"),
                Err(e) => warn!(population = name, "Population task failed: {}", e),
            }
        }
        // Let aborted actors release their group seats
        tokio::task::yield_now().await;

        let elapsed = world.ctx.now().saturating_sub(start);
        Ok(SimOutcome {
            reason,
            elapsed_secs: elapsed.as_secs_f64(),
            snapshot: world.store.snapshot(),
        })
    }
}

/// Watchdog loop: one predicate check per tick.
async fn watch<C, I>(world: &World<C>, start: Duration, interrupt: I) -> TerminationReason
where
    C: CovertContext,
    I: Future<Output = ()>,
{
    tokio::pin!(interrupt);
    loop {
        tokio::select! {
            _ = &mut interrupt => {
                info!("Interrupt received");
                return TerminationReason::Interrupted;
            }
            _ = world.ctx.sleep(world.params.watchdog_interval) => {}
        }

        if !world.is_running() {
            return TerminationReason::Interrupted;
        }
        let elapsed = world.ctx.now().saturating_sub(start);
        let counters = world.store.counters();
        if let Some(reason) = check_termination(&counters, &world.params, elapsed) {
            info!(
                %reason,
                killed = counters.killed_resistance,
                injured = counters.injured_resistance,
                agency_losses = counters.killed_agency + counters.caught_agency,
                elapsed_secs = elapsed.as_secs_f64(),
                "Termination condition met"
            );
            return reason;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DurationRange;
    use crate::store::Counter;
    use covert_env::TokioContext;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn params() -> SimParams {
        SimParams {
            max_killed: 3,
            max_injured: 3,
            agency_members: 2,
            agency_time_limit: Duration::from_secs(60),
            ..SimParams::default()
        }
    }

    fn quiet() -> SimParams {
        SimParams {
            target_probability: 0.0,
            military_target_bonus: 0.0,
            spy_time_target_factor: 0.0,
            agency_target_scale: 0.0,
            ..params()
        }
    }

    #[test]
    fn test_kill_limit_fires_alone() {
        let counters = Counters {
            killed_resistance: 3,
            ..Counters::default()
        };
        assert_eq!(
            check_termination(&counters, &params(), Duration::ZERO),
            Some(TerminationReason::MaxKilled)
        );
        let below = Counters {
            killed_resistance: 2,
            ..Counters::default()
        };
        assert_eq!(check_termination(&below, &params(), Duration::ZERO), None);
    }

    #[test]
    fn test_predicates_evaluated_in_order() {
        let counters = Counters {
            killed_resistance: 5,
            injured_resistance: 5,
            ..Counters::default()
        };
        assert_eq!(
            check_termination(&counters, &params(), Duration::ZERO),
            Some(TerminationReason::MaxKilled)
        );
    }

    #[test]
    fn test_agency_defeat_needs_time_limit() {
        let counters = Counters {
            killed_agency: 1,
            caught_agency: 1,
            ..Counters::default()
        };
        assert_eq!(check_termination(&counters, &params(), Duration::from_secs(59)), None);
        assert_eq!(
            check_termination(&counters, &params(), Duration::from_secs(60)),
            Some(TerminationReason::AgencyDefeated)
        );
        // Injuries alone never defeat the agency
        let injured = Counters {
            injured_agency: 10,
            ..Counters::default()
        };
        assert_eq!(check_termination(&injured, &params(), Duration::from_secs(600)), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_stops_on_kill_limit() {
        let world = World::new(TokioContext::shared(), quiet());
        let store = Arc::clone(&world.store);
        let shutdown = world.shutdown.clone();

        let run = tokio::spawn(Orchestrator::new(world).run());
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert!(shutdown.is_running());

        store.adjust_counter(Counter::KilledResistance, 3);
        let outcome = run.await.unwrap().unwrap();

        assert_eq!(outcome.reason, TerminationReason::MaxKilled);
        assert!(!shutdown.is_running());
        // The shutdown flag can only be flipped once
        assert!(!shutdown.trigger());
        assert!(outcome.elapsed_secs >= 3.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_interrupt_ends_run_and_stops_viewer() {
        let world = World::new(
            TokioContext::shared(),
            SimParams {
                agency_activity: DurationRange::from_secs(1, 1),
                ..quiet()
            },
        );
        let ticks = Arc::new(AtomicUsize::new(0));
        let viewer_ticks = Arc::clone(&ticks);
        let viewer = async move {
            loop {
                tokio::time::sleep(Duration::from_secs(1)).await;
                viewer_ticks.fetch_add(1, Ordering::SeqCst);
            }
        };

        let outcome = Orchestrator::new(world)
            .with_viewer(viewer)
            .run_until(tokio::time::sleep(Duration::from_millis(4500)))
            .await
            .unwrap();

        assert_eq!(outcome.reason, TerminationReason::Interrupted);
        let seen = ticks.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), seen);
        // Every actor has given up its place by the final snapshot
        assert_eq!(outcome.snapshot.counters.current_agency_members, 0);
        assert!(outcome.snapshot.agency_positions.is_empty());
        assert_eq!(outcome.snapshot.resistance_members(), 0);
    }
}
