//! Resistance member actor.
//!
//! ```text
//!            ┌──────────── Continue ────────────┐
//!            ▼                                  │
//!   Active ──► activity ──► targeting draw ─────┤
//!     │                          │ hit          │
//!     │ spy suspected            ▼              │
//!     ▼                    outcome draw         │
//!  Arrested        ┌─────────┼──────────┐       │
//!                  ▼         ▼          ▼       │
//!               Killed    Injured     Caught    │
//!                       light│ severe           │
//!                 Recovering─┘   └─► exit       │
//!                       └───────────────────────┘
//! ```
//!
//! Spies are never harmed by a hit; the agency only observes them. Every exit
//! leaves the group exactly once.

use crate::store::{Counter, SharedStore, SpyStatus};
use crate::targeting::{
    draw_hit, draw_injury, draw_outcome, resistance_target_probability, Injury, Outcome,
};
use crate::types::{GroupId, MemberId};
use crate::world::World;
use covert_env::CovertContext;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Member,
    Spy,
}

/// Why a member left the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberExit {
    Killed,
    Caught,
    SevereInjury,
    /// A spy taken into custody by the agency
    Arrested,
    Shutdown,
}

impl MemberExit {
    /// Removal sites are logged for every exit except shutdown.
    pub fn records_position(self) -> bool {
        !matches!(self, MemberExit::Shutdown)
    }
}

/// Group membership held by a member from spawn until exit.
///
/// Claim the seat before spawning and move it into the task. Leaving
/// explicitly records the exit; dropping the seat (task aborted, even before
/// its first poll, or a failed spawn) still decrements `member_count`, so
/// each member leaves its group exactly once.
#[derive(Debug)]
pub struct Seat {
    store: Arc<SharedStore>,
    member: MemberId,
    group: GroupId,
    occupied: bool,
}

impl Seat {
    /// Claims the seat of `member`, already counted in its group.
    pub fn new(store: &Arc<SharedStore>, member: MemberId) -> Self {
        Self {
            store: Arc::clone(store),
            member,
            group: member.group(),
            occupied: true,
        }
    }

    pub fn member(&self) -> MemberId {
        self.member
    }

    fn leave(mut self, record_position: bool) {
        self.occupied = false;
        self.store.remove_group_member(self.group, record_position);
    }
}

impl Drop for Seat {
    fn drop(&mut self) {
        if self.occupied {
            self.store.remove_group_member(self.group, false);
        }
    }
}

/// Runs the member holding `seat` until it exits.
pub async fn run_member<C: CovertContext>(world: World<C>, seat: Seat, role: Role) -> MemberExit {
    let id = seat.member();
    let group = seat.group;
    let store = &world.store;
    let params = &world.params;
    let mut rng = world.ctx.derive_rng(u64::from(id.0));

    debug!(member = %id, group = %group, ?role, "Member active");

    let exit = loop {
        if !world.is_running() {
            break MemberExit::Shutdown;
        }

        if role == Role::Spy {
            match store.spy_status(id) {
                SpyStatus::Free => {}
                SpyStatus::Suspected | SpyStatus::Imprisoned => break MemberExit::Arrested,
            }
        }

        let activity = match role {
            Role::Member => params.member_activity,
            Role::Spy => params.spy_activity,
        }
        .sample(&mut rng);
        world.ctx.sleep(activity).await;

        match role {
            Role::Member => {
                store.adjust_counter(Counter::DataShared, 1);
            }
            Role::Spy => {
                store.adjust_counter(Counter::DataShared, 2);
                if let Err(e) = store.add_spy_time(group, activity) {
                    debug!(member = %id, "{}", e);
                }
            }
        }

        let exposure = store.group_exposure(group).unwrap_or_default();
        if !draw_hit(&mut rng, resistance_target_probability(params, exposure)) {
            continue;
        }

        if role == Role::Spy {
            info!(member = %id, group = %group, "Spy observed by the agency, cover holds");
            continue;
        }

        match draw_outcome(&mut rng) {
            Outcome::Killed => {
                store.adjust_counter(Counter::KilledResistance, 1);
                break MemberExit::Killed;
            }
            Outcome::Caught => {
                store.adjust_counter(Counter::CaughtResistance, 1);
                break MemberExit::Caught;
            }
            Outcome::Injured => match draw_injury(&mut rng, params.light_injury_probability) {
                Injury::Light => {
                    store.adjust_counter(Counter::InjuredResistance, 1);
                    info!(member = %id, "Lightly injured, recovering");
                    world.ctx.sleep(params.recovery_light).await;
                    store.adjust_counter(Counter::InjuredResistance, -1);
                    debug!(member = %id, "Recovered");
                }
                Injury::Severe => {
                    store.adjust_counter(Counter::InjuredResistance, 1);
                    break MemberExit::SevereInjury;
                }
            },
        }
    };

    if exit == MemberExit::Arrested {
        store.arrest_spy(id);
        store.clear_group_spy(group);
    }
    seat.leave(exit.records_position());

    match exit {
        MemberExit::Shutdown => debug!(member = %id, "Member stopped"),
        other => info!(
            member = %id,
            group = %group,
            exit = ?other,
            "Member left the simulation"
        ),
    }
    exit
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DurationRange, SimParams};
    use crate::store::NewGroup;
    use crate::types::Position;
    use covert_env::TokioContext;
    use std::time::Duration;

    fn world(params: SimParams) -> World<TokioContext> {
        World::new(TokioContext::shared(), params)
    }

    fn quick(params: SimParams) -> SimParams {
        SimParams {
            member_activity: DurationRange::from_secs(1, 1),
            spy_activity: DurationRange::from_secs(1, 1),
            ..params
        }
    }

    fn seat(world: &World<TokioContext>, id: MemberId) -> Seat {
        Seat::new(&world.store, id)
    }

    fn add_group(world: &World<TokioContext>, size: u32, has_spy: bool) -> GroupId {
        world
            .store
            .add_group(NewGroup {
                size,
                is_military: false,
                has_spy,
                position: Position::new(5.0, 5.0),
            })
            .unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_certain_hit_exits_and_leaves_group() {
        let w = world(quick(SimParams {
            target_probability: 1.0,
            light_injury_probability: 0.0,
            ..SimParams::default()
        }));
        let g = add_group(&w, 2, false);

        let exit = run_member(w.clone(), seat(&w, MemberId::new(g, 2)), Role::Member).await;

        assert_ne!(exit, MemberExit::Shutdown);
        let snap = w.store.snapshot();
        assert_eq!(snap.groups[0].member_count, 1);
        assert_eq!(snap.caught_resistance.len(), 1);
        assert_eq!(snap.counters.data_shared, 1);
        let c = snap.counters;
        assert_eq!(c.killed_resistance + c.injured_resistance + c.caught_resistance, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_exit_leaves_without_position() {
        let w = world(quick(SimParams {
            target_probability: 0.0,
            ..SimParams::default()
        }));
        let g = add_group(&w, 3, false);
        w.shutdown.trigger();

        let exit = run_member(w.clone(), seat(&w, MemberId::new(g, 2)), Role::Member).await;

        assert_eq!(exit, MemberExit::Shutdown);
        let snap = w.store.snapshot();
        assert_eq!(snap.groups[0].member_count, 2);
        assert!(snap.caught_resistance.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_spy_survives_hits_and_accumulates_spy_time() {
        let w = world(quick(SimParams {
            target_probability: 1.0,
            ..SimParams::default()
        }));
        let g = add_group(&w, 3, true);
        let spy = g.spy_member();
        w.store.register_spy(spy);

        let handle = tokio::spawn(run_member(w.clone(), seat(&w, spy), Role::Spy));
        tokio::time::sleep(Duration::from_millis(3500)).await;

        let exposure = w.store.group_exposure(g).unwrap();
        assert_eq!(exposure.accumulated_spy_time, Duration::from_secs(3));
        assert_eq!(w.store.counters().data_shared, 6);
        assert_eq!(w.store.counters().killed_resistance, 0);

        w.shutdown.trigger();
        assert_eq!(handle.await.unwrap(), MemberExit::Shutdown);
    }

    #[tokio::test(start_paused = true)]
    async fn test_suspected_spy_is_arrested() {
        let w = world(quick(SimParams::default()));
        let g = add_group(&w, 3, true);
        let spy = g.spy_member();
        w.store.register_spy(spy);
        w.store.promote_spy_to_suspect(g);

        let exit = run_member(w.clone(), seat(&w, spy), Role::Spy).await;

        assert_eq!(exit, MemberExit::Arrested);
        let snap = w.store.snapshot();
        assert_eq!(snap.counters.caught_resistance, 1);
        assert!(snap.suspects.is_empty());
        assert!(snap.spies.is_empty());
        assert!(!snap.groups[0].has_spy);
        assert_eq!(snap.groups[0].member_count, 2);
        assert_eq!(snap.caught_resistance, vec![Position::new(5.0, 5.0)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_imprisoned_spy_is_arrested() {
        let w = world(quick(SimParams::default()));
        let g = add_group(&w, 3, true);
        let spy = g.spy_member();
        w.store.register_spy(spy);
        w.store.add_suspect(spy);
        assert!(w.store.imprison_suspect(spy));

        let exit = run_member(w.clone(), seat(&w, spy), Role::Spy).await;

        assert_eq!(exit, MemberExit::Arrested);
        assert_eq!(w.store.counters().caught_resistance, 1);
        assert_eq!(w.store.spy_status(spy), SpyStatus::Free);
    }

    #[tokio::test(start_paused = true)]
    async fn test_spy_dropped_from_full_spy_set_keeps_working() {
        let w = world(quick(SimParams {
            max_spies: 1,
            target_probability: 0.0,
            ..SimParams::default()
        }));
        let first = add_group(&w, 3, true);
        let second = add_group(&w, 3, true);
        assert!(w.store.register_spy(first.spy_member()));
        assert!(!w.store.register_spy(second.spy_member()));

        let spy = second.spy_member();
        let handle = tokio::spawn(run_member(w.clone(), seat(&w, spy), Role::Spy));
        tokio::time::sleep(Duration::from_millis(2500)).await;
        w.shutdown.trigger();

        assert_eq!(handle.await.unwrap(), MemberExit::Shutdown);
        let snap = w.store.snapshot();
        assert_eq!(snap.counters.caught_resistance, 0);
        assert!(snap.caught_resistance.is_empty());
        assert!(snap.groups.iter().all(|g| g.has_spy));
    }

    #[tokio::test(start_paused = true)]
    async fn test_member_aborted_before_first_poll_leaves_group() {
        let w = world(quick(SimParams::default()));
        let g = add_group(&w, 3, false);

        let member = seat(&w, MemberId::new(g, 2));
        let handle = tokio::spawn(run_member(w.clone(), member, Role::Member));
        handle.abort();
        assert!(handle.await.unwrap_err().is_cancelled());

        assert_eq!(w.store.snapshot().groups[0].member_count, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_aborted_member_still_leaves_group() {
        let w = world(quick(SimParams {
            target_probability: 0.0,
            ..SimParams::default()
        }));
        let g = add_group(&w, 3, false);

        let member = seat(&w, MemberId::new(g, 2));
        let handle = tokio::spawn(run_member(w.clone(), member, Role::Member));
        tokio::time::sleep(Duration::from_millis(500)).await;
        handle.abort();
        let _ = handle.await;

        assert_eq!(w.store.snapshot().groups[0].member_count, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_light_injuries_always_recover() {
        let w = world(quick(SimParams {
            target_probability: 1.0,
            light_injury_probability: 1.0,
            recovery_light: Duration::from_secs(3),
            ..SimParams::default()
        }));
        let g = add_group(&w, 31, false);

        let handles: Vec<_> = (2..32)
            .map(|seq| {
                let member = seat(&w, MemberId::new(g, seq));
                tokio::spawn(run_member(w.clone(), member, Role::Member))
            })
            .collect();
        tokio::time::sleep(Duration::from_secs(20)).await;
        w.shutdown.trigger();

        let mut exits = Vec::new();
        for handle in handles {
            exits.push(handle.await.unwrap());
        }

        // Shutdown is only observed after a recovery completes
        let c = w.store.counters();
        assert_eq!(c.injured_resistance, 0);
        assert!(!exits.contains(&MemberExit::SevereInjury));
        let harmed = exits.iter().filter(|e| e.records_position()).count() as i64;
        assert_eq!(c.killed_resistance + c.caught_resistance, harmed);
        assert_eq!(w.store.snapshot().groups[0].member_count, 1);
    }
}
