//! Persistence for generated insights.
//!
//! Everything stored here is a cache over the live moment collection: the
//! aggregators can always recompute from source, so a miss is never an
//! error and presence is never a correctness dependency. Writes are
//! last-write-wins per key.

pub mod schema;
pub mod sqlite;

use anyhow::Result;

use crate::insights::{DailyMoodFlow, InsightKind, InsightSnapshot, MonthlySummary};

pub use schema::{MIGRATIONS, SCHEMA};
pub use sqlite::SqliteStore;

/// Cached narrative snapshots keyed by `(user, kind, period_key)`.
///
/// `put` writes the included-id set and the narrative atomically; a
/// snapshot is never observable half-written.
pub trait SnapshotStore {
    fn get_snapshot(
        &self,
        user: Option<&str>,
        kind: InsightKind,
        period_key: &str,
    ) -> Result<Option<InsightSnapshot>>;

    fn put_snapshot(&self, user: Option<&str>, snapshot: &InsightSnapshot) -> Result<()>;
}

/// Day-level mood-flow rows keyed by `(user, day_key)`, for fast range
/// reads by the timeline.
pub trait FlowCache {
    fn get_flow(&self, user: Option<&str>, day_key: &str) -> Result<Option<DailyMoodFlow>>;

    fn put_flow(&self, user: Option<&str>, day_key: &str, flow: &DailyMoodFlow) -> Result<()>;
}

/// Month summaries keyed by `(user, month_key)`.
pub trait MonthlyStore {
    fn get_monthly(&self, user: Option<&str>, month_key: &str) -> Result<Option<MonthlySummary>>;

    fn upsert_monthly(&self, user: Option<&str>, summary: &MonthlySummary) -> Result<()>;
}

/// Everything the insight engine needs from one backing store.
pub trait InsightStore: SnapshotStore + FlowCache + MonthlyStore {}

impl<T: SnapshotStore + FlowCache + MonthlyStore> InsightStore for T {}
