//! The shared state store.
//!
//! All persistent simulation state lives here, split into two disjoint
//! partitions with one mutex each:
//!
//! ```text
//! ┌──────────────────────── SharedStore ─────────────────────────┐
//! │  intel    (lock a)                registry   (lock b)        │
//! │  • counters                       • resistance groups        │
//! │  • suspect set / spy set          • caught resistance log    │
//! │  • live agency positions                                     │
//! │  • caught agency log                                         │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Invariants:
//! - No operation holds both guards at once, so there is no lock ordering to
//!   get wrong.
//! - Guards are never held across an `.await`; sleeping happens outside.
//! - A multi-field update (e.g. "decrement `member_count` and record a
//!   position") happens under a single guard, so readers never see it torn.
//! - Bounded collections reject writes past capacity; the store logs the
//!   drop and keeps going.

use crate::bounded::{BoundedMap, BoundedSet, PositionLog};
use crate::config::SimParams;
use crate::error::{Collection, StoreError};
use crate::snapshot::StoreSnapshot;
use crate::types::{AgencyId, GroupId, MemberId, Position, MEMBER_ID_STRIDE, SPY_SEQ};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{debug, warn};

/// Named aggregate counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Counter {
    KilledResistance,
    InjuredResistance,
    CaughtResistance,
    KilledAgency,
    InjuredAgency,
    CaughtAgency,
    TotalArrests,
    TotalImprisoned,
    TotalReleased,
    CurrentAgencyMembers,
    TotalResistanceGroups,
    DataShared,
}

/// Aggregate counters (partition a).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Counters {
    pub killed_resistance: i64,
    pub injured_resistance: i64,
    pub caught_resistance: i64,
    pub killed_agency: i64,
    pub injured_agency: i64,
    pub caught_agency: i64,
    pub total_arrests: i64,
    pub total_imprisoned: i64,
    pub total_released: i64,
    pub current_agency_members: i64,
    pub total_resistance_groups: i64,
    pub data_shared: i64,
}

impl Counters {
    pub fn get(&self, counter: Counter) -> i64 {
        match counter {
            Counter::KilledResistance => self.killed_resistance,
            Counter::InjuredResistance => self.injured_resistance,
            Counter::CaughtResistance => self.caught_resistance,
            Counter::KilledAgency => self.killed_agency,
            Counter::InjuredAgency => self.injured_agency,
            Counter::CaughtAgency => self.caught_agency,
            Counter::TotalArrests => self.total_arrests,
            Counter::TotalImprisoned => self.total_imprisoned,
            Counter::TotalReleased => self.total_released,
            Counter::CurrentAgencyMembers => self.current_agency_members,
            Counter::TotalResistanceGroups => self.total_resistance_groups,
            Counter::DataShared => self.data_shared,
        }
    }

    fn slot_mut(&mut self, counter: Counter) -> &mut i64 {
        match counter {
            Counter::KilledResistance => &mut self.killed_resistance,
            Counter::InjuredResistance => &mut self.injured_resistance,
            Counter::CaughtResistance => &mut self.caught_resistance,
            Counter::KilledAgency => &mut self.killed_agency,
            Counter::InjuredAgency => &mut self.injured_agency,
            Counter::CaughtAgency => &mut self.caught_agency,
            Counter::TotalArrests => &mut self.total_arrests,
            Counter::TotalImprisoned => &mut self.total_imprisoned,
            Counter::TotalReleased => &mut self.total_released,
            Counter::CurrentAgencyMembers => &mut self.current_agency_members,
            Counter::TotalResistanceGroups => &mut self.total_resistance_groups,
            Counter::DataShared => &mut self.data_shared,
        }
    }

    /// Adds `delta` and returns the new value.
    pub fn adjust(&mut self, counter: Counter, delta: i64) -> i64 {
        let slot = self.slot_mut(counter);
        *slot += delta;
        *slot
    }
}

/// A resistance group record.
#[derive(Debug, Clone, Serialize)]
pub struct ResistanceGroup {
    pub id: GroupId,
    pub has_spy: bool,
    pub is_military: bool,
    /// Spy exposure accumulated in the current evidence window
    pub accumulated_spy_time: Duration,
    pub member_count: u32,
    pub position: Position,
    /// Next member sequence number handed out by replenishment
    #[serde(skip)]
    next_seq: u32,
}

impl ResistanceGroup {
    /// `accumulated_spy_time / agency_time_limit`.
    pub fn suspicion(&self, agency_time_limit: Duration) -> f64 {
        if agency_time_limit.is_zero() {
            return 0.0;
        }
        self.accumulated_spy_time.as_secs_f64() / agency_time_limit.as_secs_f64()
    }

    fn allocate_seq(&mut self) -> u32 {
        let seq = self.next_seq;
        self.next_seq = if seq + 1 >= MEMBER_ID_STRIDE {
            SPY_SEQ + 1
        } else {
            seq + 1
        };
        seq
    }
}

/// Parameters of a group about to be formed.
#[derive(Debug, Clone, Copy)]
pub struct NewGroup {
    pub size: u32,
    pub is_military: bool,
    pub has_spy: bool,
    pub position: Position,
}

/// What a targeting draw needs to know about a group.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GroupExposure {
    pub is_military: bool,
    pub accumulated_spy_time: Duration,
}

/// Suspicion of one group at the time it was read.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroupSuspicion {
    pub group: GroupId,
    pub has_spy: bool,
    pub suspicion: f64,
}

/// Members reserved by a replenishment pass, ready to be spawned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplenishPlan {
    pub group: GroupId,
    pub members: Vec<MemberId>,
}

/// Where a spy stands with the agency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpyStatus {
    /// Still a spy, not under suspicion
    Free,
    /// On the suspect list
    Suspected,
    /// Imprisoned by the pipeline, awaiting pickup
    Imprisoned,
}

/// Partition (a): counters, suspects, spies, agency positions.
#[derive(Debug)]
pub struct IntelState {
    pub counters: Counters,
    suspects: BoundedSet<MemberId>,
    spies: BoundedSet<MemberId>,
    /// Spies moved out of the spy set by imprisonment. Drained when the spy
    /// actor takes its arrested exit.
    imprisoned: BTreeSet<MemberId>,
    agency_positions: BoundedMap<AgencyId, Position>,
    caught_agency: PositionLog,
}

impl IntelState {
    fn new(params: &SimParams) -> Self {
        Self {
            counters: Counters::default(),
            suspects: BoundedSet::new(Collection::Suspects, params.max_suspects),
            spies: BoundedSet::new(Collection::Spies, params.max_spies),
            imprisoned: BTreeSet::new(),
            agency_positions: BoundedMap::new(
                Collection::AgencyPositions,
                params.max_agency_positions,
            ),
            caught_agency: PositionLog::new(Collection::CaughtAgency, params.max_caught_agency),
        }
    }

    /// Adds a suspect; a full set drops the write.
    pub fn add_suspect(&mut self, member: MemberId) -> bool {
        match self.suspects.insert(member) {
            Ok(added) => added,
            Err(e) => {
                warn!(member = %member, "{}", e);
                false
            }
        }
    }

    pub fn remove_suspect(&mut self, member: MemberId) -> bool {
        self.suspects.remove(&member)
    }

    pub fn is_suspected(&self, member: MemberId) -> bool {
        self.suspects.contains(&member)
    }

    pub fn suspects(&self) -> Vec<MemberId> {
        self.suspects.to_vec()
    }

    pub fn suspect_count(&self) -> usize {
        self.suspects.len()
    }

    pub fn register_spy(&mut self, member: MemberId) -> bool {
        match self.spies.insert(member) {
            Ok(added) => added,
            Err(e) => {
                warn!(member = %member, "{}", e);
                false
            }
        }
    }

    pub fn is_spy(&self, member: MemberId) -> bool {
        self.spies.contains(&member)
    }

    pub fn spies(&self) -> Vec<MemberId> {
        self.spies.to_vec()
    }
}

/// Partition (b): the group registry.
#[derive(Debug)]
pub struct Registry {
    groups: BTreeMap<GroupId, ResistanceGroup>,
    capacity: usize,
    next_group_id: u32,
    caught_resistance: PositionLog,
}

impl Registry {
    fn new(params: &SimParams) -> Self {
        Self {
            groups: BTreeMap::new(),
            capacity: params.max_groups,
            next_group_id: 1,
            caught_resistance: PositionLog::new(
                Collection::CaughtResistance,
                params.max_caught_resistance,
            ),
        }
    }

    pub fn group(&self, id: GroupId) -> Option<&ResistanceGroup> {
        self.groups.get(&id)
    }

    pub fn groups(&self) -> impl Iterator<Item = &ResistanceGroup> {
        self.groups.values()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

/// Acquires a partition lock, recovering from poisoning.
///
/// Every critical section is a handful of field writes, so a panicking
/// holder cannot leave a partition half-updated in a way later writers care
/// about.
fn acquire<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// The single source of truth for a simulation run.
#[derive(Debug)]
pub struct SharedStore {
    intel: Mutex<IntelState>,
    registry: Mutex<Registry>,
}

impl SharedStore {
    /// Creates an empty store sized by the capacity parameters.
    pub fn new(params: &SimParams) -> Self {
        Self {
            intel: Mutex::new(IntelState::new(params)),
            registry: Mutex::new(Registry::new(params)),
        }
    }

    /// Scoped exclusive access to partition (a).
    pub fn acquire_counters_lock(&self) -> MutexGuard<'_, IntelState> {
        acquire(&self.intel)
    }

    /// Scoped exclusive access to partition (b).
    pub fn acquire_group_lock(&self) -> MutexGuard<'_, Registry> {
        acquire(&self.registry)
    }

    // ─────────────────────────── counters ───────────────────────────

    /// Adds `delta` to one counter and returns its new value.
    pub fn adjust_counter(&self, counter: Counter, delta: i64) -> i64 {
        self.acquire_counters_lock().counters.adjust(counter, delta)
    }

    /// Applies several counter deltas in one critical section.
    pub fn adjust_counters(&self, deltas: &[(Counter, i64)]) {
        let mut intel = self.acquire_counters_lock();
        for &(counter, delta) in deltas {
            intel.counters.adjust(counter, delta);
        }
    }

    pub fn counters(&self) -> Counters {
        self.acquire_counters_lock().counters
    }

    // ─────────────────────────── registry ───────────────────────────

    /// Registers a new group and returns its id.
    ///
    /// A full registry drops the group.
    pub fn add_group(&self, group: NewGroup) -> Result<GroupId, StoreError> {
        let mut registry = self.acquire_group_lock();
        if registry.groups.len() >= registry.capacity {
            let err = StoreError::Capacity {
                collection: Collection::Groups,
                capacity: registry.capacity,
            };
            warn!("{}", err);
            return Err(err);
        }
        let id = GroupId(registry.next_group_id);
        registry.next_group_id += 1;
        registry.groups.insert(
            id,
            ResistanceGroup {
                id,
                has_spy: group.has_spy,
                is_military: group.is_military,
                accumulated_spy_time: Duration::ZERO,
                member_count: group.size,
                position: group.position,
                next_seq: group.size + 1,
            },
        );
        Ok(id)
    }

    /// Decrements a group's member count, optionally logging the group's
    /// position as a removal site.
    ///
    /// Returns the remaining member count, or `None` for an unknown group.
    /// The count saturates at zero.
    pub fn remove_group_member(&self, group: GroupId, record_position: bool) -> Option<u32> {
        let mut guard = self.acquire_group_lock();
        let registry = &mut *guard;
        let entry = registry.groups.get_mut(&group)?;
        entry.member_count = entry.member_count.saturating_sub(1);
        let remaining = entry.member_count;
        if record_position {
            if let Err(e) = registry.caught_resistance.record(entry.position) {
                warn!(group = %group, "{}", e);
            }
        }
        Some(remaining)
    }

    /// Adds spy exposure to a group's current evidence window.
    pub fn add_spy_time(&self, group: GroupId, exposure: Duration) -> Result<(), StoreError> {
        let mut registry = self.acquire_group_lock();
        let entry = registry
            .groups
            .get_mut(&group)
            .ok_or(StoreError::UnknownGroup(group.0))?;
        entry.accumulated_spy_time += exposure;
        Ok(())
    }

    /// Marks a group as no longer harbouring a spy.
    pub fn clear_group_spy(&self, group: GroupId) {
        if let Some(entry) = self.acquire_group_lock().groups.get_mut(&group) {
            entry.has_spy = false;
        }
    }

    pub fn group_exposure(&self, group: GroupId) -> Option<GroupExposure> {
        self.acquire_group_lock()
            .groups
            .get(&group)
            .map(|g| GroupExposure {
                is_military: g.is_military,
                accumulated_spy_time: g.accumulated_spy_time,
            })
    }

    /// Current suspicion of every group.
    pub fn suspicion_levels(&self, agency_time_limit: Duration) -> Vec<GroupSuspicion> {
        self.acquire_group_lock()
            .groups
            .values()
            .map(|g| GroupSuspicion {
                group: g.id,
                has_spy: g.has_spy,
                suspicion: g.suspicion(agency_time_limit),
            })
            .collect()
    }

    /// Current suspicion of the given groups. Unknown groups score zero.
    pub fn group_suspicion(
        &self,
        groups: &[GroupId],
        agency_time_limit: Duration,
    ) -> BTreeMap<GroupId, f64> {
        let registry = self.acquire_group_lock();
        groups
            .iter()
            .map(|id| {
                let suspicion = registry
                    .groups
                    .get(id)
                    .map_or(0.0, |g| g.suspicion(agency_time_limit));
                (*id, suspicion)
            })
            .collect()
    }

    /// Closes the evidence window of every group.
    pub fn reset_spy_time(&self) {
        for group in self.acquire_group_lock().groups.values_mut() {
            group.accumulated_spy_time = Duration::ZERO;
        }
    }

    /// Tops every group up to `max_members`, reserving fresh member ids.
    ///
    /// Counts are raised here, under the registry lock, so concurrent exits
    /// and a replenishment pass never push a group past the maximum.
    pub fn replenish_groups(&self, max_members: u32) -> Vec<ReplenishPlan> {
        let mut registry = self.acquire_group_lock();
        let mut plans = Vec::new();
        for group in registry.groups.values_mut() {
            if group.member_count >= max_members {
                continue;
            }
            let missing = max_members - group.member_count;
            let members = (0..missing)
                .map(|_| MemberId::new(group.id, group.allocate_seq()))
                .collect();
            group.member_count = max_members;
            plans.push(ReplenishPlan {
                group: group.id,
                members,
            });
        }
        plans
    }

    // ─────────────────────────── suspects & spies ───────────────────────────

    pub fn add_suspect(&self, member: MemberId) -> bool {
        self.acquire_counters_lock().add_suspect(member)
    }

    pub fn remove_suspect(&self, member: MemberId) -> bool {
        self.acquire_counters_lock().remove_suspect(member)
    }

    pub fn register_spy(&self, member: MemberId) -> bool {
        self.acquire_counters_lock().register_spy(member)
    }

    pub fn release_spy(&self, member: MemberId) -> bool {
        let mut intel = self.acquire_counters_lock();
        intel.imprisoned.remove(&member);
        intel.spies.remove(&member)
    }

    /// Puts a group's spy slot on the suspect list.
    ///
    /// `total_arrests` is incremented only when the suspect is newly added.
    pub fn promote_spy_to_suspect(&self, group: GroupId) -> bool {
        let suspect = group.spy_member();
        let mut intel = self.acquire_counters_lock();
        if intel.is_suspected(suspect) {
            return false;
        }
        let added = intel.add_suspect(suspect);
        if added {
            intel.counters.adjust(Counter::TotalArrests, 1);
        }
        added
    }

    pub fn spy_status(&self, member: MemberId) -> SpyStatus {
        let intel = self.acquire_counters_lock();
        if intel.imprisoned.contains(&member) {
            SpyStatus::Imprisoned
        } else if intel.is_suspected(member) {
            SpyStatus::Suspected
        } else {
            SpyStatus::Free
        }
    }

    /// Takes a spy into custody: clears both records and counts the capture.
    pub fn arrest_spy(&self, member: MemberId) {
        let mut intel = self.acquire_counters_lock();
        intel.spies.remove(&member);
        intel.imprisoned.remove(&member);
        intel.suspects.remove(&member);
        intel.counters.adjust(Counter::CaughtResistance, 1);
    }

    /// Releases a suspect. Returns false if another pass already removed it.
    pub fn release_suspect(&self, member: MemberId) -> bool {
        let mut intel = self.acquire_counters_lock();
        if !intel.suspects.remove(&member) {
            return false;
        }
        intel.counters.adjust(Counter::TotalReleased, 1);
        true
    }

    /// Imprisons a suspect. Returns false if another pass already removed it.
    pub fn imprison_suspect(&self, member: MemberId) -> bool {
        let mut intel = self.acquire_counters_lock();
        if !intel.suspects.remove(&member) {
            return false;
        }
        if intel.spies.remove(&member) {
            intel.imprisoned.insert(member);
        }
        intel.counters.adjust(Counter::TotalImprisoned, 1);
        true
    }

    // ─────────────────────────── agency positions ───────────────────────────

    /// Records a newly joined agent's position.
    pub fn place_agent(&self, agent: AgencyId, position: Position) {
        if let Err(e) = self
            .acquire_counters_lock()
            .agency_positions
            .insert(agent, position)
        {
            warn!(agent = %agent, "{}", e);
        }
    }

    /// Random-walk step for an agent, clamped to the map.
    pub fn move_agent(&self, agent: AgencyId, dx: f32, dy: f32) {
        let mut intel = self.acquire_counters_lock();
        if let Some(position) = intel.agency_positions.get_mut(&agent) {
            *position = position.step_clamped(dx, dy);
        }
    }

    /// Removes an agent from service.
    ///
    /// Decrements `current_agency_members`, bumps `outcome`, and moves the
    /// agent's last position into the caught-agency log, all at once.
    pub fn retire_agent(&self, agent: AgencyId, outcome: Counter) {
        let mut intel = self.acquire_counters_lock();
        intel.counters.adjust(Counter::CurrentAgencyMembers, -1);
        intel.counters.adjust(outcome, 1);
        if let Some(position) = intel.agency_positions.remove(&agent) {
            if let Err(e) = intel.caught_agency.record(position) {
                warn!(agent = %agent, "{}", e);
            }
        } else {
            debug!(agent = %agent, "Retired agent had no recorded position");
        }
    }

    /// Takes an agent off the books without an outcome (shutdown or abort).
    ///
    /// The live position is dropped, not logged.
    pub fn discharge_agent(&self, agent: AgencyId) {
        let mut intel = self.acquire_counters_lock();
        intel.counters.adjust(Counter::CurrentAgencyMembers, -1);
        intel.agency_positions.remove(&agent);
    }

    // ─────────────────────────── snapshot ───────────────────────────

    /// Lock-respecting copy of the whole store.
    ///
    /// Partitions are read one after the other, never together.
    pub fn snapshot(&self) -> StoreSnapshot {
        let (counters, suspects, spies, agency_positions, caught_agency) = {
            let intel = self.acquire_counters_lock();
            (
                intel.counters,
                intel.suspects.to_vec(),
                intel.spies.to_vec(),
                intel.agency_positions.to_vec(),
                intel.caught_agency.entries().to_vec(),
            )
        };
        let (groups, caught_resistance) = {
            let registry = self.acquire_group_lock();
            (
                registry.groups.values().cloned().collect(),
                registry.caught_resistance.entries().to_vec(),
            )
        };
        StoreSnapshot {
            counters,
            groups,
            suspects,
            spies,
            agency_positions,
            caught_resistance,
            caught_agency,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn params() -> SimParams {
        SimParams::default()
    }

    fn group(size: u32, has_spy: bool) -> NewGroup {
        NewGroup {
            size,
            is_military: false,
            has_spy,
            position: Position::new(10.0, -20.0),
        }
    }

    #[test]
    fn test_group_ids_are_unique_and_monotonic() {
        let store = SharedStore::new(&params());
        let a = store.add_group(group(3, false)).unwrap();
        let b = store.add_group(group(3, false)).unwrap();
        assert_eq!(a, GroupId(1));
        assert_eq!(b, GroupId(2));
    }

    #[test]
    fn test_registry_full_drops_group() {
        let store = SharedStore::new(&SimParams {
            max_groups: 1,
            ..params()
        });
        store.add_group(group(3, false)).unwrap();
        let err = store.add_group(group(3, false)).unwrap_err();
        assert!(matches!(err, StoreError::Capacity { collection: Collection::Groups, .. }));
        assert_eq!(store.acquire_group_lock().len(), 1);
    }

    #[test]
    fn test_remove_member_saturates_and_records() {
        let store = SharedStore::new(&params());
        let id = store.add_group(group(1, false)).unwrap();

        assert_eq!(store.remove_group_member(id, true), Some(0));
        assert_eq!(store.remove_group_member(id, false), Some(0));
        assert_eq!(store.remove_group_member(GroupId(99), true), None);

        let snap = store.snapshot();
        assert_eq!(snap.caught_resistance, vec![Position::new(10.0, -20.0)]);
    }

    #[test]
    fn test_promote_is_idempotent() {
        let store = SharedStore::new(&params());
        let id = store.add_group(group(4, true)).unwrap();

        assert!(store.promote_spy_to_suspect(id));
        assert!(!store.promote_spy_to_suspect(id));

        let intel = store.acquire_counters_lock();
        assert_eq!(intel.suspects(), vec![MemberId(1001)]);
        assert_eq!(intel.counters.total_arrests, 1);
    }

    #[test]
    fn test_release_and_imprison_are_exclusive() {
        let store = SharedStore::new(&params());
        let spy = MemberId(1001);
        store.register_spy(spy);
        store.add_suspect(spy);

        assert!(store.imprison_suspect(spy));
        assert!(!store.release_suspect(spy));
        assert!(!store.imprison_suspect(spy));

        let counters = store.counters();
        assert_eq!(counters.total_imprisoned, 1);
        assert_eq!(counters.total_released, 0);
        assert_eq!(store.spy_status(spy), SpyStatus::Imprisoned);
    }

    #[test]
    fn test_spy_status_transitions() {
        let store = SharedStore::new(&params());
        let spy = MemberId(2001);
        store.register_spy(spy);
        assert_eq!(store.spy_status(spy), SpyStatus::Free);
        store.add_suspect(spy);
        assert_eq!(store.spy_status(spy), SpyStatus::Suspected);
        store.arrest_spy(spy);
        assert_eq!(store.spy_status(spy), SpyStatus::Free);
        assert!(!store.acquire_counters_lock().is_spy(spy));
        assert_eq!(store.counters().caught_resistance, 1);
    }

    #[test]
    fn test_unregistered_spy_is_never_imprisoned() {
        let store = SharedStore::new(&SimParams {
            max_spies: 1,
            ..params()
        });
        assert!(store.register_spy(MemberId(1001)));
        assert!(!store.register_spy(MemberId(2001)));

        // Absent from the spy set only because the set was full
        assert_eq!(store.spy_status(MemberId(2001)), SpyStatus::Free);

        // A non-spy suspect is imprisoned without entering the imprisoned record
        store.add_suspect(MemberId(2001));
        assert!(store.imprison_suspect(MemberId(2001)));
        assert_eq!(store.spy_status(MemberId(2001)), SpyStatus::Free);
    }

    #[test]
    fn test_discharge_agent_drops_position_without_logging() {
        let store = SharedStore::new(&params());
        store.adjust_counter(Counter::CurrentAgencyMembers, 1);
        store.place_agent(AgencyId(4), Position::new(1.0, 2.0));

        store.discharge_agent(AgencyId(4));

        let snap = store.snapshot();
        assert_eq!(snap.counters.current_agency_members, 0);
        assert!(snap.agency_positions.is_empty());
        assert!(snap.caught_agency.is_empty());
        assert_eq!(snap.counters.killed_agency + snap.counters.caught_agency, 0);
    }

    #[test]
    fn test_suspect_capacity_drops_new_entries() {
        let store = SharedStore::new(&SimParams {
            max_suspects: 2,
            ..params()
        });
        assert!(store.add_suspect(MemberId(1001)));
        assert!(store.add_suspect(MemberId(2001)));
        assert!(!store.add_suspect(MemberId(3001)));
        assert_eq!(store.acquire_counters_lock().suspect_count(), 2);
    }

    #[test]
    fn test_replenish_tops_up_with_fresh_ids() {
        let store = SharedStore::new(&params());
        let id = store.add_group(group(3, true)).unwrap();
        store.remove_group_member(id, true);
        store.remove_group_member(id, true);

        let plans = store.replenish_groups(5);
        assert_eq!(plans.len(), 1);
        assert_eq!(plans[0].group, id);
        // Ids continue after the founding members, never reusing slot 1
        assert_eq!(plans[0].members, vec![MemberId(1004), MemberId(1005), MemberId(1006), MemberId(1007)]);
        assert_eq!(store.acquire_group_lock().group(id).unwrap().member_count, 5);

        // Already full: nothing to do
        assert!(store.replenish_groups(5).is_empty());
    }

    #[test]
    fn test_member_seq_wraps_past_reserved_slot() {
        let mut g = ResistanceGroup {
            id: GroupId(7),
            has_spy: false,
            is_military: false,
            accumulated_spy_time: Duration::ZERO,
            member_count: 0,
            position: Position::default(),
            next_seq: 999,
        };
        assert_eq!(g.allocate_seq(), 999);
        assert_eq!(g.allocate_seq(), 2);
    }

    #[test]
    fn test_spy_time_and_reset() {
        let store = SharedStore::new(&params());
        let id = store.add_group(group(3, true)).unwrap();
        store.add_spy_time(id, Duration::from_secs(6)).unwrap();
        assert!(store.add_spy_time(GroupId(50), Duration::from_secs(1)).is_err());

        let limit = Duration::from_secs(60);
        assert_eq!(store.group_suspicion(&[id], limit)[&id], 0.1);

        store.reset_spy_time();
        assert_eq!(store.suspicion_levels(limit)[0].suspicion, 0.0);
    }

    #[test]
    fn test_retire_agent_moves_position_to_caught_log() {
        let store = SharedStore::new(&params());
        store.adjust_counter(Counter::CurrentAgencyMembers, 2);
        store.place_agent(AgencyId(1), Position::new(1.0, 2.0));
        store.move_agent(AgencyId(1), 0.5, -0.5);

        store.retire_agent(AgencyId(1), Counter::CaughtAgency);

        let snap = store.snapshot();
        assert_eq!(snap.counters.current_agency_members, 1);
        assert_eq!(snap.counters.caught_agency, 1);
        assert!(snap.agency_positions.is_empty());
        assert_eq!(snap.caught_agency, vec![Position::new(1.5, 1.5)]);
    }

    #[test]
    fn test_concurrent_increments_are_not_lost() {
        let store = Arc::new(SharedStore::new(&params()));
        let threads: Vec<_> = (0..64)
            .map(|_| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    for _ in 0..500 {
                        store.adjust_counter(Counter::DataShared, 1);
                    }
                })
            })
            .collect();
        for t in threads {
            t.join().unwrap();
        }
        assert_eq!(store.counters().data_shared, 64 * 500);
    }
}
