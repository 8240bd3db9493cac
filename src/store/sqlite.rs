//! SQLite backend for the insight caches.

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

use crate::insights::{DailyMoodFlow, InsightKind, InsightSnapshot, MonthlySummary};

use super::schema::{MIGRATIONS, SCHEMA};
use super::{FlowCache, MonthlyStore, SnapshotStore};

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create store directory: {}", parent.display()))?;
        }
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open insight store: {}", path.display()))?;
        let store = Self { conn };
        store.initialize()?;
        Ok(store)
    }

    pub fn open_in_memory() -> Result<Self> {
        let store = Self {
            conn: Connection::open_in_memory().context("failed to open in-memory store")?,
        };
        store.initialize()?;
        Ok(store)
    }

    fn initialize(&self) -> Result<()> {
        self.conn.execute_batch(SCHEMA).context("failed to initialize schema")?;
        for migration in MIGRATIONS {
            // Already-applied migrations fail; that is expected.
            let _ = self.conn.execute(migration, []);
        }
        Ok(())
    }
}

/// Guest captures are stored under the empty user key.
fn user_key(user: Option<&str>) -> &str {
    user.unwrap_or("")
}

fn parse_instant(raw: &str) -> Result<DateTime<Local>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Local))
        .with_context(|| format!("malformed stored timestamp: {raw}"))
}

impl SnapshotStore for SqliteStore {
    fn get_snapshot(
        &self,
        user: Option<&str>,
        kind: InsightKind,
        period_key: &str,
    ) -> Result<Option<InsightSnapshot>> {
        let row = self
            .conn
            .query_row(
                r#"
                SELECT period_start, period_end, generated_at, included_ids, narrative, request_id
                FROM insight_snapshots
                WHERE user_id = ?1 AND kind = ?2 AND period_key = ?3
                "#,
                params![user_key(user), kind.as_str(), period_key],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                        row.get::<_, Option<String>>(5)?,
                    ))
                },
            )
            .optional()
            .context("failed to read snapshot")?;

        let Some((start, end, generated_at, included_ids, narrative, request_id)) = row else {
            return Ok(None);
        };

        Ok(Some(InsightSnapshot {
            kind,
            period_key: period_key.to_string(),
            period_start: parse_instant(&start)?,
            period_end: parse_instant(&end)?,
            generated_at: parse_instant(&generated_at)?,
            included_ids: serde_json::from_str(&included_ids)
                .context("malformed included_ids column")?,
            narrative,
            request_id,
        }))
    }

    fn put_snapshot(&self, user: Option<&str>, snapshot: &InsightSnapshot) -> Result<()> {
        let included_ids =
            serde_json::to_string(&snapshot.included_ids).context("failed to encode included_ids")?;

        // One statement: the id set and the narrative land together or not
        // at all. Conflicts on the composite key are last-write-wins.
        self.conn
            .execute(
                r#"
                INSERT INTO insight_snapshots
                    (user_id, kind, period_key, period_start, period_end,
                     generated_at, included_ids, narrative, request_id)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                ON CONFLICT(user_id, kind, period_key) DO UPDATE SET
                    period_start = excluded.period_start,
                    period_end = excluded.period_end,
                    generated_at = excluded.generated_at,
                    included_ids = excluded.included_ids,
                    narrative = excluded.narrative,
                    request_id = excluded.request_id
                "#,
                params![
                    user_key(user),
                    snapshot.kind.as_str(),
                    snapshot.period_key,
                    snapshot.period_start.to_rfc3339(),
                    snapshot.period_end.to_rfc3339(),
                    snapshot.generated_at.to_rfc3339(),
                    included_ids,
                    snapshot.narrative,
                    snapshot.request_id,
                ],
            )
            .context("failed to write snapshot")?;

        Ok(())
    }
}

impl FlowCache for SqliteStore {
    fn get_flow(&self, user: Option<&str>, day_key: &str) -> Result<Option<DailyMoodFlow>> {
        let row = self
            .conn
            .query_row(
                "SELECT segments, dominant, total_moments FROM daily_flows
                 WHERE user_id = ?1 AND day_key = ?2",
                params![user_key(user), day_key],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, Option<String>>(1)?,
                        row.get::<_, i64>(2)?,
                    ))
                },
            )
            .optional()
            .context("failed to read flow row")?;

        let Some((segments, dominant, total)) = row else {
            return Ok(None);
        };

        Ok(Some(DailyMoodFlow {
            segments: serde_json::from_str(&segments).context("malformed segments column")?,
            dominant,
            total_moments: usize::try_from(total).unwrap_or(0),
        }))
    }

    fn put_flow(&self, user: Option<&str>, day_key: &str, flow: &DailyMoodFlow) -> Result<()> {
        let segments = serde_json::to_string(&flow.segments).context("failed to encode segments")?;

        self.conn
            .execute(
                r#"
                INSERT INTO daily_flows (user_id, day_key, segments, dominant, total_moments)
                VALUES (?1, ?2, ?3, ?4, ?5)
                ON CONFLICT(user_id, day_key) DO UPDATE SET
                    segments = excluded.segments,
                    dominant = excluded.dominant,
                    total_moments = excluded.total_moments
                "#,
                params![
                    user_key(user),
                    day_key,
                    segments,
                    flow.dominant,
                    flow.total_moments as i64,
                ],
            )
            .context("failed to write flow row")?;

        Ok(())
    }
}

impl MonthlyStore for SqliteStore {
    fn get_monthly(&self, user: Option<&str>, month_key: &str) -> Result<Option<MonthlySummary>> {
        let row = self
            .conn
            .query_row(
                "SELECT phrase, reasoning, total_moments, mood_totals, generated_at
                 FROM monthly_summaries WHERE user_id = ?1 AND month_key = ?2",
                params![user_key(user), month_key],
                |row| {
                    Ok((
                        row.get::<_, Option<String>>(0)?,
                        row.get::<_, Option<String>>(1)?,
                        row.get::<_, i64>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                    ))
                },
            )
            .optional()
            .context("failed to read monthly summary")?;

        let Some((phrase, reasoning, total, mood_totals, generated_at)) = row else {
            return Ok(None);
        };

        Ok(Some(MonthlySummary {
            month_key: month_key.to_string(),
            phrase,
            reasoning,
            total_moments: u32::try_from(total).unwrap_or(0),
            mood_totals: serde_json::from_str(&mood_totals).context("malformed mood_totals column")?,
            generated_at: parse_instant(&generated_at)?,
        }))
    }

    fn upsert_monthly(&self, user: Option<&str>, summary: &MonthlySummary) -> Result<()> {
        let mood_totals =
            serde_json::to_string(&summary.mood_totals).context("failed to encode mood_totals")?;

        self.conn
            .execute(
                r#"
                INSERT INTO monthly_summaries
                    (user_id, month_key, phrase, reasoning, total_moments, mood_totals, generated_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                ON CONFLICT(user_id, month_key) DO UPDATE SET
                    phrase = excluded.phrase,
                    reasoning = excluded.reasoning,
                    total_moments = excluded.total_moments,
                    mood_totals = excluded.mood_totals,
                    generated_at = excluded.generated_at
                "#,
                params![
                    user_key(user),
                    summary.month_key,
                    summary.phrase,
                    summary.reasoning,
                    summary.total_moments as i64,
                    mood_totals,
                    summary.generated_at.to_rfc3339(),
                ],
            )
            .context("failed to write monthly summary")?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::insights::FlowSegment;
    use chrono::TimeZone;

    fn at(d: u32, h: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(2026, 3, d, h, 0, 0).unwrap()
    }

    fn snapshot(period_key: &str, narrative: &str, included: &[&str]) -> InsightSnapshot {
        InsightSnapshot {
            kind: InsightKind::Daily,
            period_key: period_key.to_string(),
            period_start: at(5, 0),
            period_end: at(5, 18),
            generated_at: at(5, 18),
            included_ids: included.iter().map(|s| s.to_string()).collect(),
            narrative: narrative.to_string(),
            request_id: Some("req-1".to_string()),
        }
    }

    #[test]
    fn snapshot_round_trips_with_its_id_set() {
        let store = SqliteStore::open_in_memory().unwrap();
        let snap = snapshot("2026-03-05", "a calm morning", &["m1", "m2"]);

        store.put_snapshot(Some("u1"), &snap).unwrap();
        let loaded = store
            .get_snapshot(Some("u1"), InsightKind::Daily, "2026-03-05")
            .unwrap()
            .expect("snapshot present");

        assert_eq!(loaded.narrative, "a calm morning");
        assert_eq!(loaded.included_ids, vec!["m1", "m2"]);
        assert_eq!(loaded.request_id.as_deref(), Some("req-1"));
        assert_eq!(loaded.period_start, snap.period_start);
    }

    #[test]
    fn rewrite_of_the_same_key_is_last_write_wins() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.put_snapshot(Some("u1"), &snapshot("2026-03-05", "first", &["m1"])).unwrap();
        store.put_snapshot(Some("u1"), &snapshot("2026-03-05", "second", &["m1", "m2"])).unwrap();

        let loaded = store
            .get_snapshot(Some("u1"), InsightKind::Daily, "2026-03-05")
            .unwrap()
            .expect("snapshot present");
        assert_eq!(loaded.narrative, "second");
        assert_eq!(loaded.included_ids.len(), 2);
    }

    #[test]
    fn guest_rows_do_not_collide_with_user_rows() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.put_snapshot(None, &snapshot("2026-03-05", "guest", &["m1"])).unwrap();
        store.put_snapshot(Some("u1"), &snapshot("2026-03-05", "signed in", &["m2"])).unwrap();

        let guest = store.get_snapshot(None, InsightKind::Daily, "2026-03-05").unwrap().unwrap();
        let user = store.get_snapshot(Some("u1"), InsightKind::Daily, "2026-03-05").unwrap().unwrap();
        assert_eq!(guest.narrative, "guest");
        assert_eq!(user.narrative, "signed in");
    }

    #[test]
    fn missing_keys_read_as_none() {
        let store = SqliteStore::open_in_memory().unwrap();
        assert!(store
            .get_snapshot(Some("u1"), InsightKind::Weekly, "2026-03-01")
            .unwrap()
            .is_none());
        assert!(store.get_flow(None, "2026-03-05").unwrap().is_none());
        assert!(store.get_monthly(None, "2026-03").unwrap().is_none());
    }

    #[test]
    fn flow_rows_round_trip() {
        let store = SqliteStore::open_in_memory().unwrap();
        let flow = DailyMoodFlow {
            segments: vec![FlowSegment {
                time_percent: 0.5,
                mood: "Calm".to_string(),
                color: "#7FB8A4".to_string(),
                intensity: 0.7,
            }],
            dominant: Some("Calm".to_string()),
            total_moments: 1,
        };

        store.put_flow(Some("u1"), "2026-03-05", &flow).unwrap();
        let loaded = store.get_flow(Some("u1"), "2026-03-05").unwrap().expect("flow present");
        assert_eq!(loaded.dominant.as_deref(), Some("Calm"));
        assert_eq!(loaded.segments.len(), 1);
        assert_eq!(loaded.segments[0].mood, "Calm");
    }

    #[test]
    fn monthly_upsert_replaces_the_cached_phrase() {
        let store = SqliteStore::open_in_memory().unwrap();
        let mut summary = MonthlySummary {
            month_key: "2026-03".to_string(),
            phrase: Some("a bright stretch".to_string()),
            reasoning: Some("many happy mornings".to_string()),
            total_moments: 12,
            mood_totals: vec![("Happy".to_string(), 8), ("Calm".to_string(), 4)],
            generated_at: at(10, 12),
        };
        store.upsert_monthly(Some("u1"), &summary).unwrap();

        summary.phrase = None;
        summary.reasoning = None;
        store.upsert_monthly(Some("u1"), &summary).unwrap();

        let loaded = store.get_monthly(Some("u1"), "2026-03").unwrap().expect("row present");
        assert!(loaded.phrase.is_none());
        assert_eq!(loaded.total_moments, 12);
        assert_eq!(loaded.mood_totals[0].0, "Happy");
    }
}
