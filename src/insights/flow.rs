//! Daily mood-flow aggregation and lightweight day-level analytics.
//!
//! A day's captures become an ordered sequence of time-positioned mood
//! segments for timeline rendering, plus a dominant mood for narrative
//! context. The persisted flow rows are a cache; this module can always
//! recompute them from the live collection.

use std::collections::HashSet;

use chrono::{DateTime, Days, Local};
use serde::{Deserialize, Serialize};

use crate::mood::{fnv1a, resolve_color, resolve_label};
use crate::moment::Moment;
use crate::period::{day_key, day_part, fraction_of_day};

/// One capture positioned on the day timeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowSegment {
    /// Fraction of the day elapsed at capture time, in `[0, 1)`.
    pub time_percent: f64,
    pub mood: String,
    pub color: String,
    /// Decorative weight for rendering; stable per moment id.
    pub intensity: f64,
}

/// A full day of segments. Re-derivable from captures at any time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyMoodFlow {
    pub segments: Vec<FlowSegment>,
    /// Most frequent resolved label; ties go to the first-occurring label.
    pub dominant: Option<String>,
    pub total_moments: usize,
}

impl DailyMoodFlow {
    pub fn empty() -> Self {
        Self {
            segments: Vec::new(),
            dominant: None,
            total_moments: 0,
        }
    }
}

/// Aggregate one day's moments into a timeline flow.
pub fn compute_daily_flow(day_moments: &[&Moment]) -> DailyMoodFlow {
    if day_moments.is_empty() {
        return DailyMoodFlow::empty();
    }

    let mut ordered: Vec<&Moment> = day_moments.to_vec();
    ordered.sort_by_key(|m| m.created_at);

    let segments = ordered
        .iter()
        .map(|m| FlowSegment {
            time_percent: fraction_of_day(m.created_at),
            mood: resolve_label(&m.mood, m.mood_name.as_deref()),
            color: resolve_color(&m.mood, m.mood_name.as_deref()),
            intensity: segment_intensity(&m.id),
        })
        .collect::<Vec<_>>();

    let dominant = dominant_label(segments.iter().map(|s| s.mood.as_str()));

    DailyMoodFlow {
        dominant,
        total_moments: segments.len(),
        segments,
    }
}

/// Consecutive days with at least one eligible capture, counting backwards
/// from today. A day without captures yet does not break the streak until
/// it is over, so an empty today falls back to counting from yesterday.
pub fn current_streak(moments: &[Moment], now: DateTime<Local>) -> u32 {
    let active: HashSet<String> = moments
        .iter()
        .filter(|m| m.is_eligible())
        .map(|m| day_key(m.created_at))
        .collect();

    let mut cursor = now.date_naive();
    if !active.contains(&cursor.format("%Y-%m-%d").to_string()) {
        cursor = match cursor.checked_sub_days(Days::new(1)) {
            Some(d) => d,
            None => return 0,
        };
    }

    let mut streak = 0;
    while active.contains(&cursor.format("%Y-%m-%d").to_string()) {
        streak += 1;
        cursor = match cursor.checked_sub_days(Days::new(1)) {
            Some(d) => d,
            None => break,
        };
    }
    streak
}

/// Mood ranking per part of day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayPartMood {
    pub part: &'static str,
    /// Most frequent label within the part, ties to first occurrence.
    pub top_mood: Option<String>,
    pub moments: usize,
}

/// Bucket moments by part of day and rank the mood in each bucket.
/// All four parts are always present, in clock order.
pub fn mood_by_day_part(moments: &[&Moment]) -> Vec<DayPartMood> {
    ["morning", "afternoon", "evening", "night"]
        .into_iter()
        .map(|part| {
            let labels: Vec<String> = moments
                .iter()
                .filter(|m| day_part(m.created_at) == part)
                .map(|m| resolve_label(&m.mood, m.mood_name.as_deref()))
                .collect();
            DayPartMood {
                part,
                moments: labels.len(),
                top_mood: dominant_label(labels.iter().map(String::as_str)),
            }
        })
        .collect()
}

/// Mode of a label sequence; ties break to the first-occurring label.
fn dominant_label<'a>(labels: impl Iterator<Item = &'a str>) -> Option<String> {
    let mut counts: Vec<(&str, usize)> = Vec::new();
    for label in labels {
        match counts.iter_mut().find(|(l, _)| *l == label) {
            Some((_, n)) => *n += 1,
            None => counts.push((label, 1)),
        }
    }

    let mut best: Option<(&str, usize)> = None;
    for (label, count) in counts {
        if best.map_or(true, |(_, max)| count > max) {
            best = Some((label, count));
        }
    }
    best.map(|(label, _)| label.to_string())
}

fn segment_intensity(moment_id: &str) -> f64 {
    0.55 + (fnv1a(moment_id) % 40) as f64 / 100.0
}
