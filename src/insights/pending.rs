//! Staleness oracle: how many eligible moments a cached summary is missing.
//!
//! Recomputed in full on every collection change and snapshot load. No
//! incremental patching; a full diff is O(moments-in-period) and immune to
//! drift.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Local};

use crate::insights::InsightSnapshot;
use crate::moment::{filter_for_period, Moment};
use crate::period::{period_for, PeriodKind};

/// Derived per kind, never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PendingInfo {
    /// Eligible moments of the current period not represented in the
    /// cached snapshot. Drives the "N new, tap to refresh" affordance.
    pub pending: usize,
    /// All eligible moments of the current period.
    pub total_eligible: usize,
}

/// Compute pending counts for every time kind at once.
pub fn compute_pending(
    moments: &[Moment],
    snapshots: &HashMap<PeriodKind, InsightSnapshot>,
    now: DateTime<Local>,
) -> HashMap<PeriodKind, PendingInfo> {
    PeriodKind::ALL
        .into_iter()
        .map(|kind| (kind, compute_pending_for(kind, moments, snapshots.get(&kind), now)))
        .collect()
}

/// Pending counts for one kind. Without a snapshot everything is new:
/// `pending == total_eligible`.
pub fn compute_pending_for(
    kind: PeriodKind,
    moments: &[Moment],
    snapshot: Option<&InsightSnapshot>,
    now: DateTime<Local>,
) -> PendingInfo {
    let period = period_for(kind, now);
    let eligible = filter_for_period(moments, &period);

    let included: HashSet<&str> = snapshot
        .map(|s| s.included_ids.iter().map(String::as_str).collect())
        .unwrap_or_default();

    let pending = eligible.iter().filter(|m| !included.contains(m.id.as_str())).count();

    PendingInfo {
        pending,
        total_eligible: eligible.len(),
    }
}
