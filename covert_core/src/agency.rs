//! Counter-intelligence agency actor.
//!
//! An agent analyses intelligence for a while, faces a targeting draw that
//! grows with its time in service, runs a pipeline pass, and then drifts one
//! step on the map. Exits are reported back to the store so the agency
//! monitor can recruit a replacement.
//!
//! Agents are counted in `current_agency_members` for exactly as long as
//! their [`Badge`] lives, the same way resistance members hold a group seat.

use crate::pipeline::run_pass;
use crate::store::{Counter, SharedStore};
use crate::targeting::{
    agency_target_probability, draw_hit, draw_injury, draw_outcome, Injury, Outcome,
};
use crate::types::{AgencyId, Position, MAP_EXTENT};
use crate::world::{streams, World};
use covert_env::CovertContext;
use rand::Rng;
use std::sync::Arc;
use tracing::{debug, info};

/// Why an agent left the agency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentExit {
    Killed,
    Caught,
    SevereInjury,
    Shutdown,
}

impl AgentExit {
    /// Counter incremented on this exit, if any.
    pub fn counter(self) -> Option<Counter> {
        match self {
            AgentExit::Killed => Some(Counter::KilledAgency),
            AgentExit::Caught => Some(Counter::CaughtAgency),
            AgentExit::SevereInjury => Some(Counter::InjuredAgency),
            AgentExit::Shutdown => None,
        }
    }
}

/// An agent's place in `current_agency_members`.
///
/// Issuing counts the agent in. Retiring records an outcome; dropping the
/// badge (shutdown, abort, or a failed spawn) discharges the agent without
/// one.
#[derive(Debug)]
pub struct Badge {
    store: Arc<SharedStore>,
    agent: AgencyId,
    on_duty: bool,
}

impl Badge {
    pub fn issue(store: &Arc<SharedStore>, agent: AgencyId) -> Self {
        store.adjust_counter(Counter::CurrentAgencyMembers, 1);
        Self {
            store: Arc::clone(store),
            agent,
            on_duty: true,
        }
    }

    pub fn agent(&self) -> AgencyId {
        self.agent
    }

    fn retire(mut self, outcome: Counter) {
        self.on_duty = false;
        self.store.retire_agent(self.agent, outcome);
    }
}

impl Drop for Badge {
    fn drop(&mut self) {
        if self.on_duty {
            self.store.discharge_agent(self.agent);
        }
    }
}

/// Runs the agent holding `badge` until it exits.
pub async fn run_agent<C: CovertContext>(world: World<C>, badge: Badge) -> AgentExit {
    let id = badge.agent();
    let store = &world.store;
    let params = &world.params;
    let mut rng = world.ctx.derive_rng(streams::AGENCY + u64::from(id.0));
    let joined = world.ctx.now();

    let start = Position::new(
        rng.gen_range(-MAP_EXTENT..MAP_EXTENT),
        rng.gen_range(-MAP_EXTENT..MAP_EXTENT),
    );
    store.place_agent(id, start);
    debug!(agent = %id, x = start.x, y = start.y, "Agent joined");

    let exit = loop {
        if !world.is_running() {
            break AgentExit::Shutdown;
        }

        world.ctx.sleep(params.agency_activity.sample(&mut rng)).await;

        let in_service = world.ctx.now().saturating_sub(joined);
        let p = agency_target_probability(params, in_service);
        if draw_hit(&mut rng, p) {
            match draw_outcome(&mut rng) {
                Outcome::Killed => break AgentExit::Killed,
                Outcome::Caught => break AgentExit::Caught,
                Outcome::Injured => match draw_injury(&mut rng, params.light_injury_probability) {
                    Injury::Light => {
                        store.adjust_counter(Counter::InjuredAgency, 1);
                        info!(agent = %id, "Agent lightly injured, recovering");
                        world.ctx.sleep(params.recovery_light).await;
                        store.adjust_counter(Counter::InjuredAgency, -1);
                    }
                    Injury::Severe => break AgentExit::SevereInjury,
                },
            }
        }

        run_pass(store, params);

        let dx = rng.gen_range(-1i8..=1);
        let dy = rng.gen_range(-1i8..=1);
        store.move_agent(id, f32::from(dx), f32::from(dy));
    };

    match exit.counter() {
        Some(counter) => {
            badge.retire(counter);
            let service = world.ctx.now().saturating_sub(joined);
            info!(
                agent = %id,
                exit = ?exit,
                service_secs = service.as_secs_f64(),
                "Agent left the agency"
            );
        }
        None => {
            drop(badge);
            debug!(agent = %id, "Agent stopped");
        }
    }
    exit
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DurationRange, SimParams};
    use crate::store::NewGroup;
    use covert_env::TokioContext;
    use std::time::Duration;

    fn world(params: SimParams) -> World<TokioContext> {
        World::new(
            TokioContext::shared(),
            SimParams {
                agency_activity: DurationRange::from_secs(1, 1),
                ..params
            },
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_certain_hit_retires_agent() {
        let w = world(SimParams {
            agency_time_limit: Duration::from_secs(1),
            agency_target_scale: 1.0,
            light_injury_probability: 0.0,
            ..SimParams::default()
        });
        let badge = Badge::issue(&w.store, AgencyId(1));

        let exit = run_agent(w.clone(), badge).await;

        assert_ne!(exit, AgentExit::Shutdown);
        let snap = w.store.snapshot();
        assert_eq!(snap.counters.current_agency_members, 0);
        let c = snap.counters;
        assert_eq!(c.killed_agency + c.caught_agency + c.injured_agency, 1);
        assert!(snap.agency_positions.is_empty());
        assert_eq!(snap.caught_agency.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_agent_runs_pipeline_and_walks() {
        let w = world(SimParams {
            agency_target_scale: 0.0,
            agency_time_limit: Duration::from_secs(100),
            ..SimParams::default()
        });
        let g = w
            .store
            .add_group(NewGroup {
                size: 3,
                is_military: false,
                has_spy: true,
                position: Position::default(),
            })
            .unwrap();
        w.store.register_spy(g.spy_member());
        w.store.add_spy_time(g, Duration::from_secs(10)).unwrap();
        let badge = Badge::issue(&w.store, AgencyId(3));

        let handle = tokio::spawn(run_agent(w.clone(), badge));
        tokio::time::sleep(Duration::from_millis(1500)).await;

        let snap = w.store.snapshot();
        // Suspicion 0.1 is above both promotion and imprisonment thresholds
        assert_eq!(snap.counters.total_arrests, 1);
        assert_eq!(snap.counters.total_imprisoned, 1);
        assert_eq!(snap.agency_positions.len(), 1);
        let (_, pos) = snap.agency_positions[0];
        assert!(pos.x.abs() <= MAP_EXTENT && pos.y.abs() <= MAP_EXTENT);

        w.shutdown.trigger();
        assert_eq!(handle.await.unwrap(), AgentExit::Shutdown);
        let snap = w.store.snapshot();
        assert_eq!(snap.counters.current_agency_members, 0);
        assert!(snap.agency_positions.is_empty());
        assert!(snap.caught_agency.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_lightly_injured_agent_still_analyses() {
        let w = world(SimParams {
            agency_time_limit: Duration::from_secs(1),
            agency_target_scale: 1.0,
            light_injury_probability: 1.0,
            recovery_light: Duration::from_secs(1),
            ..SimParams::default()
        });
        let g = w
            .store
            .add_group(NewGroup {
                size: 3,
                is_military: false,
                has_spy: true,
                position: Position::default(),
            })
            .unwrap();
        w.store.register_spy(g.spy_member());
        w.store.add_spy_time(g, Duration::from_secs(10)).unwrap();

        let handles: Vec<_> = (1..=30)
            .map(|n| tokio::spawn(run_agent(w.clone(), Badge::issue(&w.store, AgencyId(n)))))
            .collect();
        // First hit at 1s: a third of the agents are injured and recover at 2s,
        // then analyse before their next hit at 3s
        tokio::time::sleep(Duration::from_millis(2500)).await;

        let c = w.store.counters();
        assert_eq!(c.total_arrests, 1);
        assert_eq!(c.total_imprisoned, 1);
        assert_eq!(c.injured_agency, 0);
        assert!(c.killed_agency + c.caught_agency < 30);

        for handle in handles {
            handle.abort();
            let _ = handle.await;
        }
        assert_eq!(w.store.counters().current_agency_members, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_aborted_agent_is_discharged() {
        let w = world(SimParams {
            agency_target_scale: 0.0,
            ..SimParams::default()
        });
        let handle = tokio::spawn(run_agent(w.clone(), Badge::issue(&w.store, AgencyId(6))));
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(w.store.snapshot().agency_positions.len(), 1);

        handle.abort();
        let _ = handle.await;

        let snap = w.store.snapshot();
        assert_eq!(snap.counters.current_agency_members, 0);
        assert!(snap.agency_positions.is_empty());
    }
}
