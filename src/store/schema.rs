//! SQL schema for the insight caches.

pub const SCHEMA: &str = r#"
-- Cached narrative snapshots, one row per (user, kind, period).
-- included_ids records exactly which moments the narrative was built from
-- and is written in the same statement as the text, never separately.
CREATE TABLE IF NOT EXISTS insight_snapshots (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id TEXT NOT NULL DEFAULT '',
    kind TEXT NOT NULL,
    period_key TEXT NOT NULL,
    period_start TEXT NOT NULL,
    period_end TEXT NOT NULL,
    generated_at TEXT NOT NULL,
    included_ids TEXT NOT NULL,  -- JSON array of moment ids
    narrative TEXT NOT NULL,
    request_id TEXT,
    UNIQUE(user_id, kind, period_key)
);

CREATE INDEX IF NOT EXISTS idx_snapshots_user_kind ON insight_snapshots(user_id, kind);

-- Day-level mood-flow cache for fast timeline range reads.
-- Always re-derivable from moments; rows here are an optimization.
CREATE TABLE IF NOT EXISTS daily_flows (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id TEXT NOT NULL DEFAULT '',
    day_key TEXT NOT NULL,
    segments TEXT NOT NULL,      -- JSON array of flow segments
    dominant TEXT,
    total_moments INTEGER NOT NULL DEFAULT 0,
    UNIQUE(user_id, day_key)
);

CREATE INDEX IF NOT EXISTS idx_flows_user_day ON daily_flows(user_id, day_key);

-- Month summaries, upserted by (user, month).
CREATE TABLE IF NOT EXISTS monthly_summaries (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id TEXT NOT NULL DEFAULT '',
    month_key TEXT NOT NULL,
    phrase TEXT,
    reasoning TEXT,
    total_moments INTEGER NOT NULL DEFAULT 0,
    mood_totals TEXT NOT NULL DEFAULT '[]',  -- JSON array of [label, count]
    generated_at TEXT NOT NULL,
    UNIQUE(user_id, month_key)
);
"#;

/// Applied tolerantly on open; statements that already ran are ignored.
pub const MIGRATIONS: &[&str] = &[
    "ALTER TABLE insight_snapshots ADD COLUMN request_id TEXT",
];
