//! Insight engine for a photo mood journal.
//!
//! Users capture photo+mood moments; this crate decides which of them are
//! eligible to be summarized, whether a cached narrative has gone stale,
//! and turns raw capture streams into the structured signals (daily mood
//! flows, weekly mood patterns, monthly phrases) fed to a hosted narrative
//! summarizer. The aggregation core is pure and synchronous; the engine in
//! [`insights::orchestrator`] is the only layer that talks to the network
//! and the cache.

pub mod config;
pub mod insights;
pub mod logging;
pub mod moment;
pub mod mood;
pub mod period;
pub mod store;
pub mod summarizer;

pub use config::{Config, InsightsConfig, SummarizerConfig, SummarizerProviderType};
pub use insights::{
    compute_daily_flow, compute_pending, compute_weekly_signal, DailyMoodFlow, GenerationStatus,
    InsightEngine, InsightKind, InsightSnapshot, MonthlySummary, PendingInfo, WeekPattern,
    WeeklyMoodSignal,
};
pub use moment::{Album, Moment, MoodId};
pub use period::{period_for, period_key, Period, PeriodKind};
pub use store::{FlowCache, InsightStore, MonthlyStore, SnapshotStore, SqliteStore};
pub use summarizer::{
    Stage, SummarizeError, Summarizer, SummarizerClient, SummaryRequest, SummaryResponse,
};
