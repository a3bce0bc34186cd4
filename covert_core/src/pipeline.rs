//! Counter-intelligence pipeline.
//!
//! One pass per agency iteration, and passes from different agents run
//! concurrently. Each phase takes exactly one partition lock and releases it
//! before the next phase starts:
//!
//! 1. **Promote**: read group suspicion (registry), then put the spy slot of
//!    every suspicious group that harbours a spy on the suspect list (intel).
//! 2. **Decide**: copy the suspect list (intel), re-read the suspicion of
//!    their groups (registry), then release or imprison (intel).
//! 3. **Reset**: close every group's evidence window (registry).
//!
//! Decisions are applied only if the suspect is still listed at the moment of
//! removal, so a suspect leaves through exactly one of release or imprison
//! even when several passes race on it.

use crate::config::SimParams;
use crate::store::SharedStore;
use crate::types::MemberId;
use tracing::{debug, info};

/// What one pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassReport {
    pub promoted: Vec<MemberId>,
    pub released: Vec<MemberId>,
    pub imprisoned: Vec<MemberId>,
    /// Suspects whose suspicion sits between the two arrest thresholds
    pub pending: Vec<MemberId>,
}

impl PassReport {
    pub fn is_quiet(&self) -> bool {
        self.promoted.is_empty() && self.released.is_empty() && self.imprisoned.is_empty()
    }
}

/// Runs a full promote / decide / reset pass over the store.
pub fn run_pass(store: &SharedStore, params: &SimParams) -> PassReport {
    let mut report = PassReport::default();
    let limit = params.agency_time_limit;

    // Phase 1
    for level in store.suspicion_levels(limit) {
        if !level.has_spy || level.suspicion <= params.suspicion_threshold {
            continue;
        }
        if store.promote_spy_to_suspect(level.group) {
            let suspect = level.group.spy_member();
            info!(
                suspect = %suspect,
                group = %level.group,
                suspicion = level.suspicion,
                "Suspect identified"
            );
            report.promoted.push(suspect);
        }
    }

    // Phase 2
    let suspects = store.acquire_counters_lock().suspects();
    let groups: Vec<_> = suspects.iter().map(|s| s.group()).collect();
    let levels = store.group_suspicion(&groups, limit);

    for suspect in suspects {
        let suspicion = levels.get(&suspect.group()).copied().unwrap_or(0.0);
        if suspicion < params.arrest_release_threshold {
            if store.release_suspect(suspect) {
                info!(suspect = %suspect, suspicion, "Suspect released");
                report.released.push(suspect);
            }
        } else if suspicion > params.arrest_imprison_threshold {
            if store.imprison_suspect(suspect) {
                info!(suspect = %suspect, suspicion, "Suspect imprisoned");
                report.imprisoned.push(suspect);
            }
        } else {
            report.pending.push(suspect);
        }
    }

    // Phase 3
    store.reset_spy_time();

    if !report.is_quiet() {
        debug!(
            promoted = report.promoted.len(),
            released = report.released.len(),
            imprisoned = report.imprisoned.len(),
            pending = report.pending.len(),
            "Pipeline pass complete"
        );
    }
    report
}
