//! Read-only copies of the shared store for viewers and export.

use crate::store::{Counters, ResistanceGroup};
use crate::types::{AgencyId, MemberId, Position};
use serde::Serialize;

/// Point-in-time copy of both store partitions.
///
/// The two partitions are copied one after the other, so a snapshot is
/// consistent per partition but not across them.
#[derive(Debug, Clone, Serialize)]
pub struct StoreSnapshot {
    pub counters: Counters,
    pub groups: Vec<ResistanceGroup>,
    pub suspects: Vec<MemberId>,
    pub spies: Vec<MemberId>,
    pub agency_positions: Vec<(AgencyId, Position)>,
    pub caught_resistance: Vec<Position>,
    pub caught_agency: Vec<Position>,
}

impl StoreSnapshot {
    /// Resistance members currently alive across all groups.
    pub fn resistance_members(&self) -> u64 {
        self.groups.iter().map(|g| u64::from(g.member_count)).sum()
    }

    pub fn groups_with_spy(&self) -> usize {
        self.groups.iter().filter(|g| g.has_spy).count()
    }

    /// One-line summary used by the periodic viewer log.
    pub fn summary(&self) -> String {
        let c = &self.counters;
        format!(
            "groups={} members={} agency={} | resistance k/i/c={}/{}/{} | agency k/i/c={}/{}/{} | suspects={} arrests={} imprisoned={} released={}",
            self.groups.len(),
            self.resistance_members(),
            c.current_agency_members,
            c.killed_resistance,
            c.injured_resistance,
            c.caught_resistance,
            c.killed_agency,
            c.injured_agency,
            c.caught_agency,
            self.suspects.len(),
            c.total_arrests,
            c.total_imprisoned,
            c.total_released,
        )
    }
}
