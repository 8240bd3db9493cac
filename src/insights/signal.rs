//! Weekly mood-signal detection.
//!
//! A week's captures become per-day dot clouds, a mood-weight ranking, and
//! one of four pattern categories. The three detectors are independent and
//! not mutually exclusive; evaluation order encodes priority.

use chrono::{DateTime, Datelike, Local, Timelike};

use crate::mood::{fnv1a, resolve_color, resolve_label};
use crate::moment::Moment;
use crate::period::fraction_of_day;

/// Weeks with fewer captures than this never reach the detectors.
pub const MIN_WEEK_MOMENTS: usize = 3;

const TIME_LINK_MIN_TOTAL: usize = 5;
const TIME_LINK_SHARE: f64 = 0.40;
const CLUSTER_RATIO: f64 = 1.8;
const CLUSTER_MIN_BUSIEST: usize = 3;
const DRIFT_MIN_ACTIVE_DAYS: usize = 4;

const SPARSE_HEADLINE: &str = "Not enough check-ins yet to read this week's pattern.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeekPattern {
    TimeLinked,
    DayClustering,
    MoodDrift,
    None,
}

impl WeekPattern {
    pub fn as_str(&self) -> &'static str {
        match self {
            WeekPattern::TimeLinked => "time-linked",
            WeekPattern::DayClustering => "day-clustering",
            WeekPattern::MoodDrift => "mood-drift",
            WeekPattern::None => "none",
        }
    }
}

/// One capture plotted inside a day slot.
#[derive(Debug, Clone)]
pub struct Dot {
    pub time_percent: f64,
    /// Decorative jitter, stable per moment id; not semantically meaningful.
    pub intensity: f64,
    pub color: String,
    pub mood: String,
}

/// One of the seven week-day slots, index 0 = Sunday.
#[derive(Debug, Clone, Default)]
pub struct DaySlot {
    pub dots: Vec<Dot>,
    /// Set on the busiest day when the week is day-clustered.
    pub highlighted: bool,
}

/// A mood's share of the week, for the legend/ranking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoodWeight {
    pub mood: String,
    pub color: String,
    pub count: usize,
}

/// Fully derived, never persisted; recomputed on demand.
#[derive(Debug, Clone)]
pub struct WeeklyMoodSignal {
    pub pattern: WeekPattern,
    pub headline: String,
    pub days: Vec<DaySlot>,
    pub weights: Vec<MoodWeight>,
}

/// Classify a week of already period-filtered moments.
///
/// `week_start` is the Sunday the week's slots index from; `now` feeds the
/// time-varying headline selection and nothing else.
pub fn compute_weekly_signal(
    week_moments: &[&Moment],
    week_start: DateTime<Local>,
    now: DateTime<Local>,
) -> WeeklyMoodSignal {
    // The ranking is legend data; it is produced even for sparse weeks.
    let weights = mood_weights(week_moments);

    if week_moments.len() < MIN_WEEK_MOMENTS {
        return WeeklyMoodSignal {
            pattern: WeekPattern::None,
            headline: SPARSE_HEADLINE.to_string(),
            days: (0..7).map(|_| DaySlot::default()).collect(),
            weights,
        };
    }

    let mut days: Vec<DaySlot> = (0..7).map(|_| DaySlot::default()).collect();
    for m in week_moments {
        let index = (m.created_at.date_naive() - week_start.date_naive()).num_days();
        if !(0..7).contains(&index) {
            continue;
        }
        days[index as usize].dots.push(Dot {
            time_percent: fraction_of_day(m.created_at),
            intensity: dot_intensity(&m.id),
            color: resolve_color(&m.mood, m.mood_name.as_deref()),
            mood: resolve_label(&m.mood, m.mood_name.as_deref()),
        });
    }

    let day_counts: Vec<usize> = days.iter().map(|slot| slot.dots.len()).collect();

    // First match wins; the categories overlap by construction.
    let pattern = if detect_time_linked(week_moments) {
        WeekPattern::TimeLinked
    } else if let Some(busiest) = detect_day_clustering(&day_counts) {
        days[busiest].highlighted = true;
        WeekPattern::DayClustering
    } else if detect_mood_drift(&day_counts) {
        WeekPattern::MoodDrift
    } else {
        WeekPattern::None
    };

    let top_mood = weights.first().map(|w| w.mood.clone()).unwrap_or_else(|| "mixed".to_string());
    let headline = select_headline(pattern, &top_mood, week_start, now);

    WeeklyMoodSignal {
        pattern,
        headline,
        days,
        weights,
    }
}

/// Occurrence count per mood, resolved and sorted descending. Ties sort by
/// label so the ranking is deterministic.
fn mood_weights(moments: &[&Moment]) -> Vec<MoodWeight> {
    let mut weights: Vec<MoodWeight> = Vec::new();
    for m in moments {
        let label = resolve_label(&m.mood, m.mood_name.as_deref());
        match weights.iter_mut().find(|w| w.mood == label) {
            Some(w) => w.count += 1,
            None => weights.push(MoodWeight {
                color: resolve_color(&m.mood, m.mood_name.as_deref()),
                mood: label,
                count: 1,
            }),
        }
    }
    weights.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.mood.cmp(&b.mood)));
    weights
}

/// True when one hour of day holds at least 40% of a week with 5+ captures.
fn detect_time_linked(moments: &[&Moment]) -> bool {
    if moments.len() < TIME_LINK_MIN_TOTAL {
        return false;
    }
    let mut hour_counts = [0usize; 24];
    for m in moments {
        hour_counts[m.created_at.hour() as usize] += 1;
    }
    let busiest = hour_counts.iter().copied().max().unwrap_or(0);
    busiest as f64 >= moments.len() as f64 * TIME_LINK_SHARE
}

/// True when the busiest day clearly outweighs the week's other active
/// days: more than 1.8x the average count over days that have captures,
/// and at least 3 captures on that day. Returns the busiest slot index.
fn detect_day_clustering(day_counts: &[usize]) -> Option<usize> {
    let total: usize = day_counts.iter().sum();
    let active_days = day_counts.iter().filter(|&&n| n > 0).count();
    if total == 0 || active_days == 0 {
        return None;
    }

    let (busiest_index, &busiest) = day_counts
        .iter()
        .enumerate()
        .max_by_key(|(_, &n)| n)?;

    let average = total as f64 / active_days as f64;
    (busiest >= CLUSTER_MIN_BUSIEST && busiest as f64 > average * CLUSTER_RATIO)
        .then_some(busiest_index)
}

/// Breadth-of-activity signal: captures landed on most days of the week.
fn detect_mood_drift(day_counts: &[usize]) -> bool {
    day_counts.iter().filter(|&&n| n > 0).count() >= DRIFT_MIN_ACTIVE_DAYS
}

const TIME_LINKED_POOL: &[&str] = &[
    "Your {mood} check-ins keep landing around the same hour.",
    "One time of day anchors this week, and {mood} owns it.",
    "There's a rhythm here: {mood} shows up on schedule.",
    "Same hour, same feeling. {mood} has a routine this week.",
];

const DAY_CLUSTERING_POOL: &[&str] = &[
    "One day carried most of this week, colored {mood}.",
    "This week peaked on a single day, with {mood} out front.",
    "A burst of moments on one day set the tone: {mood}.",
];

const MOOD_DRIFT_POOL: &[&str] = &[
    "Moments spread across the week, with {mood} leading the mix.",
    "You showed up most days. {mood} came along most often.",
    "A steady week, day after day, mostly {mood}.",
];

const NONE_POOL: &[&str] = &[
    "No strong pattern this week. {mood} was the through-line.",
    "A week without a rhythm, but {mood} kept appearing.",
    "Nothing repeating yet. {mood} led the week anyway.",
];

/// Pick a headline from the pattern's pool.
///
/// The index is a pure function of (week-start day-of-month, pattern-name
/// length, current day-of-month, hour, minute-bucket-of-15): it varies
/// through the day so re-opening the screen doesn't always show the same
/// sentence, but stays fixed within any 15-minute window.
fn select_headline(
    pattern: WeekPattern,
    top_mood: &str,
    week_start: DateTime<Local>,
    now: DateTime<Local>,
) -> String {
    let pool = match pattern {
        WeekPattern::TimeLinked => TIME_LINKED_POOL,
        WeekPattern::DayClustering => DAY_CLUSTERING_POOL,
        WeekPattern::MoodDrift => MOOD_DRIFT_POOL,
        WeekPattern::None => NONE_POOL,
    };

    let seed = week_start.day() as usize
        + pattern.as_str().len()
        + now.day() as usize
        + now.hour() as usize
        + (now.minute() / 15) as usize;

    pool[seed % pool.len()].replace("{mood}", top_mood)
}

fn dot_intensity(moment_id: &str) -> f64 {
    0.4 + (fnv1a(moment_id) % 60) as f64 / 100.0
}
