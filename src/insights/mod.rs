//! Insight derivation: staleness, aggregation, and generation state.

pub mod flow;
pub mod monthly;
pub mod orchestrator;
pub mod pending;
pub mod signal;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::period::PeriodKind;

pub use flow::{compute_daily_flow, current_streak, mood_by_day_part, DailyMoodFlow, DayPartMood, FlowSegment};
pub use monthly::{needs_regeneration, MonthlySummary};
pub use orchestrator::{GenerationJob, GenerationStatus, InsightEngine};
pub use pending::{compute_pending, compute_pending_for, PendingInfo};
pub use signal::{compute_weekly_signal, WeekPattern, WeeklyMoodSignal};

/// Cache scope of a generated insight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InsightKind {
    Daily,
    Weekly,
    Monthly,
    Album,
}

impl InsightKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            InsightKind::Daily => "daily",
            InsightKind::Weekly => "weekly",
            InsightKind::Monthly => "monthly",
            InsightKind::Album => "album",
        }
    }

    /// The time scope this kind windows over; album insights have none.
    pub fn period_kind(&self) -> Option<PeriodKind> {
        match self {
            InsightKind::Daily => Some(PeriodKind::Daily),
            InsightKind::Weekly => Some(PeriodKind::Weekly),
            InsightKind::Monthly => Some(PeriodKind::Monthly),
            InsightKind::Album => None,
        }
    }

    pub fn from_str(raw: &str) -> Option<Self> {
        match raw {
            "daily" => Some(InsightKind::Daily),
            "weekly" => Some(InsightKind::Weekly),
            "monthly" => Some(InsightKind::Monthly),
            "album" => Some(InsightKind::Album),
            _ => None,
        }
    }
}

impl From<PeriodKind> for InsightKind {
    fn from(kind: PeriodKind) -> Self {
        match kind {
            PeriodKind::Daily => InsightKind::Daily,
            PeriodKind::Weekly => InsightKind::Weekly,
            PeriodKind::Monthly => InsightKind::Monthly,
        }
    }
}

/// The cached summary record for one `(user, kind, period_key)` tuple.
///
/// `included_ids` is a snapshot-in-time record of exactly which moments the
/// narrative was built from. It is never mutated after creation; staleness
/// is always computed by diffing against it, never by re-deriving
/// membership. It is persisted atomically with the narrative text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsightSnapshot {
    pub kind: InsightKind,
    pub period_key: String,
    pub period_start: DateTime<Local>,
    pub period_end: DateTime<Local>,
    pub generated_at: DateTime<Local>,
    pub included_ids: Vec<String>,
    pub narrative: String,
    #[serde(default)]
    pub request_id: Option<String>,
}
