//! Population supervisors: group formation, replenishment, agency
//! recruitment and civilians.
//!
//! Each supervisor owns an [`ActorSet`] holding its actors' task handles.
//! Actors are independent tasks, so one finishing or panicking never touches
//! the supervisor or its siblings. When a supervisor's future is dropped (the
//! orchestrator aborts it) its set goes with it and every remaining actor is
//! aborted.

use crate::agency::{run_agent, Badge};
use crate::resistance::{run_member, Role, Seat};
use crate::store::{Counter, NewGroup};
use crate::types::{AgencyId, GroupId, MemberId, Position, MAP_EXTENT, SPY_SEQ};
use crate::world::{streams, World};
use covert_env::{CovertContext, EnvError};
use rand::Rng;
use std::sync::{Mutex, PoisonError};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Task handles of one population's actors.
#[derive(Debug)]
pub struct ActorSet {
    population: &'static str,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl ActorSet {
    pub fn new(population: &'static str) -> Self {
        Self {
            population,
            tasks: Mutex::new(Vec::new()),
        }
    }

    /// Tracks a freshly spawned actor, forgetting any that already finished.
    pub fn track(&self, handle: JoinHandle<()>) {
        let mut tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        tasks.retain(|t| !t.is_finished());
        tasks.push(handle);
    }

    /// Number of actors still running.
    pub fn live(&self) -> usize {
        self.tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|t| !t.is_finished())
            .count()
    }

    /// Aborts every tracked actor.
    pub fn abort_all(&self) {
        let mut tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        let live = tasks.iter().filter(|t| !t.is_finished()).count();
        for task in tasks.drain(..) {
            task.abort();
        }
        if live > 0 {
            debug!(population = self.population, live, "Aborted actors");
        }
    }
}

impl Drop for ActorSet {
    fn drop(&mut self) {
        self.abort_all();
    }
}

/// Spawns a member already counted in its group.
///
/// The seat is claimed before spawning; a failed spawn drops the future and
/// with it the seat, handing the place back.
fn spawn_member<C: CovertContext>(
    world: &World<C>,
    actors: &ActorSet,
    id: MemberId,
    role: Role,
) -> Result<(), EnvError> {
    let w = world.clone();
    let seat = Seat::new(&world.store, id);
    let handle = world.ctx.spawn(&format!("member-{id}"), async move {
        run_member(w, seat, role).await;
    })?;
    actors.track(handle);
    Ok(())
}

// ─────────────────────────── resistance ───────────────────────────

/// Resistance supervisor: formation and replenishment run side by side.
pub async fn run_resistance<C: CovertContext>(world: World<C>) {
    let actors = ActorSet::new("resistance");
    tokio::join!(
        formation_loop(world.clone(), &actors),
        replenish_loop(world, &actors)
    );
}

async fn formation_loop<C: CovertContext>(world: World<C>, actors: &ActorSet) {
    let mut rng = world.ctx.derive_rng(streams::FORMATION);
    while world.is_running() {
        form_group(&world, actors, &mut rng);
        world.ctx.sleep(world.params.group_creation_interval).await;
    }
}

async fn replenish_loop<C: CovertContext>(world: World<C>, actors: &ActorSet) {
    while world.is_running() {
        world.ctx.sleep(world.params.replenish_interval).await;
        if world.is_running() {
            replenish_once(&world, actors);
        }
    }
}

/// Forms one group and spawns its members.
///
/// Returns `None` when the registry is full; nothing is spawned then.
pub fn form_group<C: CovertContext, R: Rng + ?Sized>(
    world: &World<C>,
    actors: &ActorSet,
    rng: &mut R,
) -> Option<GroupId> {
    let params = &world.params;
    let store = &world.store;

    let draft = NewGroup {
        size: rng.gen_range(params.group_size_min..=params.group_size_max),
        is_military: rng.gen_range(0..100) < params.military_group_percentage,
        has_spy: rng.gen::<f64>() * 100.0 < params.spy_infiltration_percent,
        position: Position::new(
            rng.gen_range(-MAP_EXTENT..MAP_EXTENT),
            rng.gen_range(-MAP_EXTENT..MAP_EXTENT),
        ),
    };
    let group = store.add_group(draft).ok()?;
    store.adjust_counter(Counter::TotalResistanceGroups, 1);

    // A full spy set drops the registration; the slot then joins as a plain
    // member so it can never be mistaken for an imprisoned spy.
    let has_spy = draft.has_spy && store.register_spy(group.spy_member());
    if draft.has_spy && !has_spy {
        store.clear_group_spy(group);
    }

    info!(
        group = %group,
        size = draft.size,
        military = draft.is_military,
        spy = has_spy,
        "Resistance group formed"
    );

    for seq in SPY_SEQ..=draft.size {
        let id = MemberId::new(group, seq);
        let role = if has_spy && seq == SPY_SEQ {
            Role::Spy
        } else {
            Role::Member
        };
        if let Err(e) = spawn_member(world, actors, id, role) {
            warn!(member = %id, "{}", e);
            if role == Role::Spy {
                store.release_spy(id);
                store.clear_group_spy(group);
            }
        }
    }
    Some(group)
}

/// Tops every group up to `group_size_max`. Returns the number of members
/// spawned.
///
/// Spawn failures hand the reserved seat back through the dropped
/// [`Seat`]; the next tick retries.
pub fn replenish_once<C: CovertContext>(world: &World<C>, actors: &ActorSet) -> usize {
    let mut spawned = 0;
    for plan in world.store.replenish_groups(world.params.group_size_max) {
        for id in plan.members {
            match spawn_member(world, actors, id, Role::Member) {
                Ok(()) => spawned += 1,
                Err(e) => warn!(member = %id, "{}", e),
            }
        }
        debug!(group = %plan.group, "Group replenished");
    }
    if spawned > 0 {
        info!(spawned, "Replenished resistance groups");
    }
    spawned
}

// ─────────────────────────── agency ───────────────────────────

/// Agency supervisor: recruits the initial agents, then keeps the agency at
/// strength by recruiting one replacement per monitor tick.
pub async fn run_agency<C: CovertContext>(world: World<C>) {
    let actors = ActorSet::new("agency");
    let mut recruiter = Recruiter::default();

    for _ in 0..world.params.agency_members {
        recruiter.recruit(&world, &actors);
    }
    info!(agents = world.params.agency_members, "Agency deployed");

    while world.is_running() {
        world.ctx.sleep(world.params.agency_monitor_interval).await;
        let current = world.store.counters().current_agency_members;
        if world.is_running() && current < i64::from(world.params.agency_members) {
            recruiter.recruit(&world, &actors);
        }
    }
}

/// Hands out fresh agent ids.
#[derive(Debug)]
pub struct Recruiter {
    next_id: u32,
}

impl Default for Recruiter {
    fn default() -> Self {
        Self { next_id: 1 }
    }
}

impl Recruiter {
    /// Spawns one agent and counts it in `current_agency_members` for as
    /// long as it serves.
    pub fn recruit<C: CovertContext>(
        &mut self,
        world: &World<C>,
        actors: &ActorSet,
    ) -> Option<AgencyId> {
        let id = AgencyId(self.next_id);
        self.next_id += 1;

        let w = world.clone();
        let badge = Badge::issue(&world.store, id);
        match world.ctx.spawn(&format!("agent-{id}"), async move {
            run_agent(w, badge).await;
        }) {
            Ok(handle) => {
                actors.track(handle);
                debug!(agent = %id, "Agent recruited");
                Some(id)
            }
            Err(e) => {
                warn!(agent = %id, "{}", e);
                None
            }
        }
    }
}

// ─────────────────────────── civilians ───────────────────────────

/// Civilians share a piece of data every `civilian_interval`.
pub async fn run_civilians<C: CovertContext>(world: World<C>) {
    while world.is_running() {
        world.ctx.sleep(world.params.civilian_interval).await;
        let shared = world.store.adjust_counter(Counter::DataShared, 1);
        debug!(data_shared = shared, "Civilians shared data");
    }
}
