//! Per-kind insight generation state machine.
//!
//! The engine glues the pure aggregators to the two external collaborators:
//! the narrative summarizer and the snapshot cache. Generation is split into
//! `begin`/`finish` so a host can run the blocking summarizer call on a
//! worker thread; `refresh` composes the two for callers that don't need
//! that. At most one generation per kind is in flight at a time, and a
//! result whose period ended while it was in flight is discarded.

use std::collections::HashMap;

use anyhow::Result;
use chrono::{DateTime, Local};

use crate::insights::monthly::{self, MonthlySummary};
use crate::insights::pending::{compute_pending, PendingInfo};
use crate::insights::{compute_daily_flow, DailyMoodFlow, InsightKind, InsightSnapshot};
use crate::moment::{filter_for_period, Album, Moment};
use crate::period::{
    day_key, month_key, period_for, period_key, start_of_month, Period, PeriodKind,
};
use crate::store::InsightStore;
use crate::summarizer::{
    CapturePayload, Stage, SummarizeError, SummarizerClient, SummaryRequest, SummaryResponse,
};

/// UI-facing generation state for one kind.
#[derive(Debug, Clone, PartialEq)]
pub enum GenerationStatus {
    Idle,
    Loading,
    Success {
        narrative: String,
        request_id: String,
    },
    Error {
        stage: Stage,
        message: String,
        request_id: Option<String>,
    },
}

impl GenerationStatus {
    pub fn is_loading(&self) -> bool {
        matches!(self, GenerationStatus::Loading)
    }
}

#[derive(Debug, Clone)]
struct KindState {
    status: GenerationStatus,
    period_key: String,
    has_generated: bool,
}

impl KindState {
    fn new(period_key: String) -> Self {
        Self {
            status: GenerationStatus::Idle,
            period_key,
            has_generated: false,
        }
    }
}

/// A generation admitted past the eligibility, validation, and
/// single-flight gates. Feed `request` to the summarizer, then hand the
/// outcome back via `finish_generation`.
#[derive(Debug)]
pub struct GenerationJob {
    kind: InsightKind,
    state_key: String,
    period_key: String,
    period: Period,
    included_ids: Vec<String>,
    pub request: SummaryRequest,
}

pub struct InsightEngine {
    summarizer: SummarizerClient,
    store: Box<dyn InsightStore>,
    user_id: Option<String>,
    tone_style: String,
    states: HashMap<String, KindState>,
}

impl InsightEngine {
    pub fn new(
        summarizer: SummarizerClient,
        store: Box<dyn InsightStore>,
        user_id: Option<String>,
        tone_style: String,
    ) -> Self {
        Self {
            summarizer,
            store,
            user_id,
            tone_style,
            states: HashMap::new(),
        }
    }

    pub fn status(&self, kind: PeriodKind) -> GenerationStatus {
        self.status_for(InsightKind::from(kind).as_str())
    }

    pub fn album_status(&self, album_id: &str) -> GenerationStatus {
        self.status_for(&album_state_key(album_id))
    }

    fn status_for(&self, state_key: &str) -> GenerationStatus {
        self.states
            .get(state_key)
            .map(|s| s.status.clone())
            .unwrap_or(GenerationStatus::Idle)
    }

    /// Reset stale period state. Runs on every app-foreground/screen-focus;
    /// there is no background process, so a timer would never fire.
    pub fn check_rollover(&mut self, now: DateTime<Local>) {
        for kind in PeriodKind::ALL {
            let fresh = period_key(kind, now);
            let state_key = InsightKind::from(kind).as_str();
            if let Some(state) = self.states.get_mut(state_key) {
                if state.period_key != fresh {
                    tracing::debug!(kind = state_key, "period rolled over, resetting state");
                    *state = KindState::new(fresh);
                }
            }
        }
    }

    /// Blocking convenience: begin, summarize, finish in one call.
    pub fn refresh(
        &mut self,
        kind: PeriodKind,
        moments: &[Moment],
        now: DateTime<Local>,
    ) -> GenerationStatus {
        match self.begin_generation(kind, moments, now) {
            Some(job) => {
                let outcome = self.summarizer.summarize(&job.request);
                self.finish_generation(job, outcome, now)
            }
            None => self.status(kind),
        }
    }

    pub fn refresh_album(
        &mut self,
        album: &Album,
        moments: &[Moment],
        now: DateTime<Local>,
    ) -> GenerationStatus {
        match self.begin_album_generation(album, moments, now) {
            Some(job) => {
                let outcome = self.summarizer.summarize(&job.request);
                self.finish_generation(job, outcome, now)
            }
            None => self.album_status(&album.id),
        }
    }

    /// Admit a generation for one time kind. Returns `None` and leaves a
    /// readable status when nothing should run: another generation is in
    /// flight, the period holds no eligible moments, or validation failed.
    pub fn begin_generation(
        &mut self,
        kind: PeriodKind,
        moments: &[Moment],
        now: DateTime<Local>,
    ) -> Option<GenerationJob> {
        let insight_kind = InsightKind::from(kind);
        let fresh_key = period_key(kind, now);
        let period = period_for(kind, now);
        let eligible = filter_for_period(moments, &period);

        self.admit(
            insight_kind,
            insight_kind.as_str().to_string(),
            fresh_key,
            period,
            eligible,
            period_label(kind, now),
        )
    }

    /// Album variant: eligible members only, no time window, keyed by the
    /// album id (album "periods" never roll over).
    pub fn begin_album_generation(
        &mut self,
        album: &Album,
        moments: &[Moment],
        now: DateTime<Local>,
    ) -> Option<GenerationJob> {
        let members = album.members(moments);
        let start = members
            .iter()
            .map(|m| m.created_at)
            .min()
            .unwrap_or(now);

        self.admit(
            InsightKind::Album,
            album_state_key(&album.id),
            album.id.clone(),
            Period { start, end: now },
            members,
            album.name.clone(),
        )
    }

    fn admit(
        &mut self,
        kind: InsightKind,
        state_key: String,
        fresh_key: String,
        period: Period,
        eligible: Vec<&Moment>,
        label: String,
    ) -> Option<GenerationJob> {
        let state = self
            .states
            .entry(state_key.clone())
            .or_insert_with(|| KindState::new(fresh_key.clone()));
        if state.period_key != fresh_key {
            *state = KindState::new(fresh_key.clone());
        }

        // Single-flight: concurrent refreshes for one kind are no-ops.
        if state.status.is_loading() {
            return None;
        }

        if eligible.is_empty() {
            state.status = GenerationStatus::Idle;
            return None;
        }

        if let Err(err) = validate_moments(&eligible) {
            tracing::warn!(kind = kind.as_str(), error = %err, "rejecting generation input");
            state.status = GenerationStatus::Error {
                stage: err.stage,
                message: err.message,
                request_id: None,
            };
            return None;
        }

        state.status = GenerationStatus::Loading;
        state.period_key = fresh_key.clone();

        Some(GenerationJob {
            kind,
            state_key,
            period_key: fresh_key,
            period,
            included_ids: eligible.iter().map(|m| m.id.clone()).collect(),
            request: SummaryRequest {
                period_label: label,
                structured_captures: eligible.iter().map(|m| CapturePayload::from_moment(m)).collect(),
                tone_style: self.tone_style.clone(),
            },
        })
    }

    /// Apply a summarizer outcome. A result that arrives after its period
    /// rolled over is discarded instead of being shown against the wrong
    /// day; the state resets to idle for the new period.
    pub fn finish_generation(
        &mut self,
        job: GenerationJob,
        outcome: Result<SummaryResponse, SummarizeError>,
        now: DateTime<Local>,
    ) -> GenerationStatus {
        let current_key = match job.kind.period_kind() {
            Some(kind) => period_key(kind, now),
            None => job.period_key.clone(),
        };
        if current_key != job.period_key {
            tracing::info!(
                kind = job.kind.as_str(),
                stale = %job.period_key,
                "discarding generation result from an expired period"
            );
            self.states
                .insert(job.state_key, KindState::new(current_key));
            return GenerationStatus::Idle;
        }

        let status = match outcome {
            Ok(response) => {
                let snapshot = InsightSnapshot {
                    kind: job.kind,
                    period_key: job.period_key.clone(),
                    period_start: job.period.start,
                    period_end: job.period.end,
                    generated_at: now,
                    included_ids: job.included_ids,
                    narrative: response.text.clone(),
                    request_id: Some(response.request_id.clone()),
                };
                match self.store.put_snapshot(self.user_id.as_deref(), &snapshot) {
                    Ok(()) => GenerationStatus::Success {
                        narrative: response.text,
                        request_id: response.request_id,
                    },
                    Err(e) => {
                        tracing::error!(error = %e, "failed to persist snapshot");
                        GenerationStatus::Error {
                            stage: Stage::Unknown,
                            message: format!("failed to persist insight: {e}"),
                            request_id: Some(response.request_id),
                        }
                    }
                }
            }
            Err(err) => {
                tracing::warn!(kind = job.kind.as_str(), stage = %err.stage, "generation failed");
                GenerationStatus::Error {
                    stage: err.stage,
                    message: err.message,
                    request_id: err.request_id,
                }
            }
        };

        let succeeded = matches!(status, GenerationStatus::Success { .. });
        let state = self
            .states
            .entry(job.state_key)
            .or_insert_with(|| KindState::new(job.period_key.clone()));
        state.status = status.clone();
        state.has_generated = state.has_generated || succeeded;
        status
    }

    /// Whether a generation has already succeeded in the current period.
    pub fn has_generated(&self, kind: PeriodKind, now: DateTime<Local>) -> bool {
        let state_key = InsightKind::from(kind).as_str();
        self.states
            .get(state_key)
            .map(|s| s.has_generated && s.period_key == period_key(kind, now))
            .unwrap_or(false)
    }

    /// Pending counts per kind against the currently cached snapshots.
    /// Call after every moment mutation and on snapshot load.
    pub fn pending(
        &self,
        moments: &[Moment],
        now: DateTime<Local>,
    ) -> Result<HashMap<PeriodKind, PendingInfo>> {
        let mut snapshots = HashMap::new();
        for kind in PeriodKind::ALL {
            let key = period_key(kind, now);
            if let Some(snapshot) =
                self.store
                    .get_snapshot(self.user_id.as_deref(), InsightKind::from(kind), &key)?
            {
                snapshots.insert(kind, snapshot);
            }
        }
        Ok(compute_pending(moments, &snapshots, now))
    }

    /// Cache-aside read of one day's mood flow: serve the cached row when
    /// present, otherwise derive from the given moments and backfill.
    pub fn daily_flow(
        &self,
        day_moments: &[&Moment],
        day: DateTime<Local>,
    ) -> Result<DailyMoodFlow> {
        let key = day_key(day);
        if let Some(cached) = self.store.get_flow(self.user_id.as_deref(), &key)? {
            return Ok(cached);
        }
        let flow = compute_daily_flow(day_moments);
        self.store.put_flow(self.user_id.as_deref(), &key, &flow)?;
        Ok(flow)
    }

    /// Recompute one day's flow from source and overwrite the cached row.
    /// Call after a capture is added to or deleted from that day.
    pub fn refresh_daily_flow(
        &self,
        day_moments: &[&Moment],
        day: DateTime<Local>,
    ) -> Result<DailyMoodFlow> {
        let key = day_key(day);
        let flow = compute_daily_flow(day_moments);
        self.store.put_flow(self.user_id.as_deref(), &key, &flow)?;
        Ok(flow)
    }

    /// Month phrase with the unlock and regeneration gates applied.
    ///
    /// Serves the cached phrase while the capture-count delta stays under
    /// the threshold; clears a phrase the data no longer supports; `force`
    /// bypasses the regeneration gate only.
    pub fn load_monthly_summary(
        &mut self,
        moments: &[Moment],
        now: DateTime<Local>,
        force: bool,
    ) -> Result<Option<MonthlySummary>> {
        let period = period_for(PeriodKind::Monthly, now);
        let eligible = filter_for_period(moments, &period);
        let key = month_key(now);
        let cached = self.store.get_monthly(self.user_id.as_deref(), &key)?;

        if !monthly::supports_phrase(eligible.len()) {
            // Too little data for a phrase; never show a stale one, even
            // one generated back when the month still had the captures.
            return match cached {
                Some(mut summary) if summary.phrase.is_some() || summary.reasoning.is_some() => {
                    summary.phrase = None;
                    summary.reasoning = None;
                    summary.total_moments = eligible.len() as u32;
                    summary.generated_at = now;
                    self.store.upsert_monthly(self.user_id.as_deref(), &summary)?;
                    Ok(Some(summary))
                }
                other => Ok(other),
            };
        }

        // Below the unlock bar nothing new is generated; whatever was
        // cached before is still served.
        if !monthly::is_unlocked(start_of_month(now), monthly::active_days(&eligible), now) {
            return Ok(cached);
        }

        let current_total = eligible.len() as u32;
        if !monthly::needs_regeneration(cached.as_ref(), current_total, force) {
            return Ok(cached);
        }

        let request = SummaryRequest {
            period_label: now.format("%B %Y").to_string(),
            structured_captures: eligible.iter().map(|m| CapturePayload::from_moment(m)).collect(),
            tone_style: self.tone_style.clone(),
        };
        let response = self.summarizer.summarize(&request)?;

        // First line is the phrase; anything after it is the reasoning.
        let (phrase, reasoning) = match response.text.split_once('\n') {
            Some((first, rest)) if !rest.trim().is_empty() => {
                (first.trim().to_string(), Some(rest.trim().to_string()))
            }
            _ => (response.text.trim().to_string(), None),
        };

        let summary = MonthlySummary {
            month_key: key,
            phrase: Some(phrase),
            reasoning,
            total_moments: current_total,
            mood_totals: monthly::mood_totals(&eligible),
            generated_at: now,
        };
        self.store.upsert_monthly(self.user_id.as_deref(), &summary)?;
        Ok(Some(summary))
    }
}

fn album_state_key(album_id: &str) -> String {
    format!("album:{album_id}")
}

/// Fail fast on input the summarizer must never see.
fn validate_moments(moments: &[&Moment]) -> Result<(), SummarizeError> {
    for m in moments {
        if m.id.trim().is_empty() {
            return Err(SummarizeError::new(
                Stage::Validate,
                "moment with an empty identifier",
            ));
        }
        if m.mood.raw().trim().is_empty() {
            return Err(SummarizeError::new(
                Stage::Validate,
                format!("moment {} has an unresolvable mood", m.id),
            ));
        }
    }
    Ok(())
}

fn period_label(kind: PeriodKind, now: DateTime<Local>) -> String {
    match kind {
        PeriodKind::Daily => now.format("%A, %B %-d").to_string(),
        PeriodKind::Weekly => format!(
            "Week of {}",
            crate::period::start_of_week(now).format("%B %-d")
        ),
        PeriodKind::Monthly => now.format("%B %Y").to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::moment::MoodId;
    use crate::store::SqliteStore;
    use crate::summarizer::Summarizer;
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    fn at(d: u32, h: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(2026, 3, d, h, 0, 0).unwrap()
    }

    fn moment(id: &str, created_at: DateTime<Local>, mood: &str) -> Moment {
        Moment {
            id: id.to_string(),
            user_id: Some("u1".to_string()),
            created_at,
            mood: MoodId::parse(mood),
            mood_name: None,
            note: None,
            image_ref: None,
            tags: Vec::new(),
            include_in_insights: true,
        }
    }

    /// Scripted summarizer double; panics when called more often than
    /// scripted, which doubles as a "no network call" assertion.
    struct ScriptedSummarizer {
        outcomes: Mutex<Vec<Result<SummaryResponse, SummarizeError>>>,
        calls: Arc<AtomicUsize>,
    }

    impl Summarizer for ScriptedSummarizer {
        fn summarize(&self, _request: &SummaryRequest) -> Result<SummaryResponse, SummarizeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.outcomes
                .lock()
                .expect("lock poisoned")
                .pop()
                .expect("summarizer called more often than scripted")
        }

        fn provider_name(&self) -> &'static str {
            "scripted"
        }
    }

    fn engine_with(
        outcomes: Vec<Result<SummaryResponse, SummarizeError>>,
    ) -> (InsightEngine, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let summarizer = SummarizerClient::new(Arc::new(ScriptedSummarizer {
            outcomes: Mutex::new(outcomes),
            calls: Arc::clone(&calls),
        }));
        let store = Box::new(SqliteStore::open_in_memory().expect("in-memory store"));
        let engine = InsightEngine::new(summarizer, store, Some("u1".to_string()), "warm".to_string());
        (engine, calls)
    }

    fn ok_response(text: &str) -> Result<SummaryResponse, SummarizeError> {
        Ok(SummaryResponse {
            text: text.to_string(),
            request_id: "req-7".to_string(),
        })
    }

    #[test]
    fn successful_refresh_persists_the_snapshot() {
        let (mut engine, _) = engine_with(vec![ok_response("a gentle day")]);
        let now = at(5, 18);
        let moments = vec![moment("m1", at(5, 9), "happy"), moment("m2", at(5, 12), "calm")];

        let status = engine.refresh(PeriodKind::Daily, &moments, now);
        assert!(matches!(status, GenerationStatus::Success { ref narrative, .. } if narrative == "a gentle day"));
        assert!(engine.has_generated(PeriodKind::Daily, now));

        // The snapshot landed with the exact id set it was built from.
        let pending = engine.pending(&moments, now).unwrap();
        assert_eq!(pending[&PeriodKind::Daily].pending, 0);
        assert_eq!(pending[&PeriodKind::Daily].total_eligible, 2);
    }

    #[test]
    fn new_moments_after_generation_show_as_pending() {
        let (mut engine, _) = engine_with(vec![ok_response("a gentle day")]);
        let now = at(5, 18);
        let mut moments = vec![moment("m1", at(5, 9), "happy")];
        engine.refresh(PeriodKind::Daily, &moments, now);

        moments.push(moment("m2", at(5, 16), "calm"));
        let pending = engine.pending(&moments, now).unwrap();
        assert_eq!(pending[&PeriodKind::Daily].pending, 1);
        assert_eq!(pending[&PeriodKind::Daily].total_eligible, 2);
    }

    #[test]
    fn empty_period_never_reaches_the_summarizer() {
        let (mut engine, calls) = engine_with(vec![]);
        let status = engine.refresh(PeriodKind::Daily, &[], at(5, 18));
        assert_eq!(status, GenerationStatus::Idle);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn summarizer_failure_surfaces_its_stage() {
        let (mut engine, _) = engine_with(vec![Err(SummarizeError::new(
            Stage::Auth,
            "token expired",
        ))]);
        let moments = vec![moment("m1", at(5, 9), "happy")];

        let status = engine.refresh(PeriodKind::Daily, &moments, at(5, 18));
        assert!(matches!(status, GenerationStatus::Error { stage: Stage::Auth, .. }));
    }

    #[test]
    fn invalid_input_fails_fast_before_the_network() {
        let (mut engine, calls) = engine_with(vec![]);
        let moments = vec![moment("", at(5, 9), "happy")];

        let status = engine.refresh(PeriodKind::Daily, &moments, at(5, 18));
        assert!(matches!(status, GenerationStatus::Error { stage: Stage::Validate, .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn second_begin_while_loading_is_a_no_op() {
        let (mut engine, _) = engine_with(vec![]);
        let now = at(5, 18);
        let moments = vec![moment("m1", at(5, 9), "happy")];

        let first = engine.begin_generation(PeriodKind::Daily, &moments, now);
        assert!(first.is_some());
        assert!(engine.status(PeriodKind::Daily).is_loading());

        let second = engine.begin_generation(PeriodKind::Daily, &moments, now);
        assert!(second.is_none());
        assert!(engine.status(PeriodKind::Daily).is_loading());
    }

    #[test]
    fn result_from_an_expired_period_is_discarded() {
        let (mut engine, _) = engine_with(vec![]);
        let moments = vec![moment("m1", at(5, 9), "happy")];

        let job = engine
            .begin_generation(PeriodKind::Daily, &moments, at(5, 18))
            .expect("job admitted");
        // Midnight passed while the call was in flight.
        let status = engine.finish_generation(job, ok_response("yesterday's text"), at(6, 0));

        assert_eq!(status, GenerationStatus::Idle);
        assert!(!engine.has_generated(PeriodKind::Daily, at(6, 0)));
        let pending = engine.pending(&moments, at(6, 1)).unwrap();
        assert_eq!(pending[&PeriodKind::Daily].pending, 0); // moment is from the 5th
    }

    #[test]
    fn rollover_check_resets_stale_kind_state() {
        let (mut engine, _) = engine_with(vec![ok_response("a gentle day")]);
        let moments = vec![moment("m1", at(5, 9), "happy")];
        engine.refresh(PeriodKind::Daily, &moments, at(5, 18));
        assert!(engine.has_generated(PeriodKind::Daily, at(5, 18)));

        engine.check_rollover(at(6, 8));
        assert_eq!(engine.status(PeriodKind::Daily), GenerationStatus::Idle);
        assert!(!engine.has_generated(PeriodKind::Daily, at(6, 8)));
    }

    #[test]
    fn kinds_generate_independently() {
        let (mut engine, _) = engine_with(vec![ok_response("weekly"), ok_response("daily")]);
        let now = at(5, 18);
        let moments = vec![moment("m1", at(5, 9), "happy"), moment("m2", at(3, 9), "calm")];

        let daily = engine.refresh(PeriodKind::Daily, &moments, now);
        let weekly = engine.refresh(PeriodKind::Weekly, &moments, now);
        assert!(matches!(daily, GenerationStatus::Success { ref narrative, .. } if narrative == "daily"));
        assert!(matches!(weekly, GenerationStatus::Success { ref narrative, .. } if narrative == "weekly"));
    }

    #[test]
    fn album_refresh_covers_members_regardless_of_window() {
        let (mut engine, _) = engine_with(vec![ok_response("the trip")]);
        let moments = vec![
            moment("m1", Local.with_ymd_and_hms(2025, 7, 2, 10, 0, 0).unwrap(), "happy"),
            moment("m2", at(5, 9), "calm"),
            moment("m3", at(5, 11), "calm"),
        ];
        let album = Album {
            id: "a1".to_string(),
            name: "Summer trip".to_string(),
            moment_ids: vec!["m1".to_string(), "m2".to_string()],
        };

        let status = engine.refresh_album(&album, &moments, at(5, 18));
        assert!(matches!(status, GenerationStatus::Success { ref narrative, .. } if narrative == "the trip"));
        assert!(matches!(engine.album_status("a1"), GenerationStatus::Success { .. }));
        // The other kind's state is untouched.
        assert_eq!(engine.status(PeriodKind::Daily), GenerationStatus::Idle);
    }

    #[test]
    fn daily_flow_is_cache_aside() {
        let (engine, _) = engine_with(vec![]);
        let m = moment("m1", at(5, 14), "calm");

        let first = engine.daily_flow(&[&m], at(5, 18)).unwrap();
        assert_eq!(first.total_moments, 1);

        // Cached row is served even when the inputs change underneath;
        // refresh_daily_flow is the explicit invalidation path.
        let served = engine.daily_flow(&[], at(5, 18)).unwrap();
        assert_eq!(served.total_moments, 1);

        let refreshed = engine.refresh_daily_flow(&[], at(5, 18)).unwrap();
        assert_eq!(refreshed.total_moments, 0);
    }

    fn month_of_moments() -> Vec<Moment> {
        // 12 captures across 8 distinct days of March.
        (0..12)
            .map(|i| moment(&format!("m{i}"), at(1 + (i % 8), 8 + (i / 8)), "happy"))
            .collect()
    }

    #[test]
    fn monthly_phrase_generates_once_unlocked() {
        let (mut engine, calls) = engine_with(vec![ok_response("A bright stretch\nMornings carried it")]);
        let moments = month_of_moments();

        let summary = engine
            .load_monthly_summary(&moments, at(10, 12), false)
            .unwrap()
            .expect("summary present");
        assert_eq!(summary.phrase.as_deref(), Some("A bright stretch"));
        assert_eq!(summary.reasoning.as_deref(), Some("Mornings carried it"));
        assert_eq!(summary.total_moments, 12);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn locked_month_yields_nothing() {
        let (mut engine, calls) = engine_with(vec![]);
        // Day 5: elapsed-days condition fails despite 8 active days.
        let moments = month_of_moments();
        let result = engine.load_monthly_summary(&moments, at(5, 12), false).unwrap();
        assert!(result.is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn phrase_is_cleared_once_the_month_stops_supporting_it() {
        let (mut engine, calls) = engine_with(vec![ok_response("A bright stretch\nbecause")]);
        let moments = month_of_moments();
        engine.load_monthly_summary(&moments, at(10, 12), false).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // Mass deletion leaves two captures; the cached phrase must go.
        let remaining: Vec<Moment> = moments.into_iter().take(2).collect();
        let cleared = engine
            .load_monthly_summary(&remaining, at(10, 13), false)
            .unwrap()
            .expect("row kept");
        assert!(cleared.phrase.is_none());
        assert!(cleared.reasoning.is_none());
        assert_eq!(cleared.total_moments, 2);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn small_delta_serves_the_cached_phrase_without_a_call() {
        let (mut engine, calls) = engine_with(vec![ok_response("A bright stretch\nbecause")]);
        let mut moments = month_of_moments();
        engine.load_monthly_summary(&moments, at(10, 12), false).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // 5 more captures: under the regeneration threshold.
        for i in 0..5 {
            moments.push(moment(&format!("x{i}"), at(9, 10 + i), "calm"));
        }
        let cached = engine
            .load_monthly_summary(&moments, at(10, 13), false)
            .unwrap()
            .expect("summary present");
        assert_eq!(cached.phrase.as_deref(), Some("A bright stretch"));
        assert_eq!(cached.total_moments, 12);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn large_delta_regenerates() {
        let (mut engine, calls) = engine_with(vec![
            ok_response("A fuller month"),
            ok_response("A bright stretch"),
        ]);
        let mut moments = month_of_moments();
        engine.load_monthly_summary(&moments, at(10, 12), false).unwrap();

        for i in 0..10 {
            moments.push(moment(&format!("x{i}"), at(9, 8 + (i % 12)), "calm"));
        }
        let summary = engine
            .load_monthly_summary(&moments, at(10, 13), false)
            .unwrap()
            .expect("summary present");
        assert_eq!(summary.phrase.as_deref(), Some("A fuller month"));
        assert_eq!(summary.total_moments, 22);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn force_regenerates_through_the_gate() {
        let (mut engine, calls) = engine_with(vec![
            ok_response("Rewritten"),
            ok_response("A bright stretch"),
        ]);
        let moments = month_of_moments();
        engine.load_monthly_summary(&moments, at(10, 12), false).unwrap();

        let summary = engine
            .load_monthly_summary(&moments, at(10, 13), true)
            .unwrap()
            .expect("summary present");
        assert_eq!(summary.phrase.as_deref(), Some("Rewritten"));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
