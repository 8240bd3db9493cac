//! Monthly eligibility and the phrase regeneration gate.
//!
//! A month has to accumulate signal before narrative generation unlocks,
//! and a cached phrase is only regenerated once enough new captures have
//! arrived to change it. The cached total is a threshold comparator, not a
//! source of truth.

use chrono::{DateTime, Datelike, Local};
use serde::{Deserialize, Serialize};

use crate::moment::Moment;
use crate::period::{day_key, end_of_month, month_key};

/// Days of the month that must have elapsed before generation unlocks.
pub const MIN_ELAPSED_DAYS: u32 = 7;
/// Distinct capture days required before generation unlocks.
pub const MIN_ACTIVE_DAYS: usize = 7;
/// Capture-count delta that invalidates a cached phrase.
pub const REGEN_DELTA: u32 = 10;
/// Captures required before a month supports a phrase at all.
pub const MIN_PHRASE_MOMENTS: usize = 3;

/// Cached month-level summary, upserted by `(user, month_key)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonthlySummary {
    pub month_key: String,
    pub phrase: Option<String>,
    pub reasoning: Option<String>,
    /// Regeneration-threshold comparator only.
    pub total_moments: u32,
    /// Resolved label -> occurrence count, sorted descending.
    pub mood_totals: Vec<(String, u32)>,
    pub generated_at: DateTime<Local>,
}

/// The instant a month is judged "through": `now` for the current month,
/// the month's last calendar day for past months.
pub fn through_date(month_start: DateTime<Local>, now: DateTime<Local>) -> DateTime<Local> {
    if month_key(month_start) == month_key(now) {
        now
    } else {
        end_of_month(month_start)
    }
}

/// Both conditions are required: enough of the month elapsed AND enough
/// distinct days logged.
pub fn is_unlocked(month_start: DateTime<Local>, active_days: usize, now: DateTime<Local>) -> bool {
    through_date(month_start, now).day() >= MIN_ELAPSED_DAYS && active_days >= MIN_ACTIVE_DAYS
}

/// Distinct local calendar days with at least one capture.
pub fn active_days(month_moments: &[&Moment]) -> usize {
    let mut keys: Vec<String> = month_moments.iter().map(|m| day_key(m.created_at)).collect();
    keys.sort();
    keys.dedup();
    keys.len()
}

/// Whether the cached phrase/reasoning must be rebuilt. `force` bypasses
/// the gate unconditionally.
pub fn needs_regeneration(cached: Option<&MonthlySummary>, current_total: u32, force: bool) -> bool {
    if force {
        return true;
    }
    match cached {
        None => true,
        Some(summary) => {
            summary.phrase.is_none()
                || summary.reasoning.is_none()
                || summary.total_moments.abs_diff(current_total) >= REGEN_DELTA
        }
    }
}

/// A month below the floor must show no phrase at all, including a
/// previously generated one that the data no longer supports.
pub fn supports_phrase(moment_count: usize) -> bool {
    moment_count >= MIN_PHRASE_MOMENTS
}

/// Occurrence totals per resolved mood label, sorted descending with ties
/// broken by label.
pub fn mood_totals(month_moments: &[&Moment]) -> Vec<(String, u32)> {
    let mut totals: Vec<(String, u32)> = Vec::new();
    for m in month_moments {
        let label = crate::mood::resolve_label(&m.mood, m.mood_name.as_deref());
        match totals.iter_mut().find(|(l, _)| *l == label) {
            Some((_, n)) => *n += 1,
            None => totals.push((label, 1)),
        }
    }
    totals.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    totals
}
