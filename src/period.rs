//! Time window and period key resolution.
//!
//! Every insight kind maps a reference instant to a half-open window that
//! ends at that instant, never at the calendar boundary: a weekly window
//! mid-week only covers the elapsed days, so eligible/pending counts never
//! include the future. Weeks start on Sunday everywhere in this crate.

use chrono::{DateTime, Datelike, Days, Local, LocalResult, NaiveDate, NaiveTime, TimeZone, Timelike};

/// Time scope of a periodic insight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PeriodKind {
    Daily,
    Weekly,
    Monthly,
}

impl PeriodKind {
    pub const ALL: [PeriodKind; 3] = [PeriodKind::Daily, PeriodKind::Weekly, PeriodKind::Monthly];

    pub fn as_str(&self) -> &'static str {
        match self {
            PeriodKind::Daily => "daily",
            PeriodKind::Weekly => "weekly",
            PeriodKind::Monthly => "monthly",
        }
    }
}

/// An inclusive time window. Ties at either bound belong to the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Period {
    pub start: DateTime<Local>,
    pub end: DateTime<Local>,
}

impl Period {
    pub fn contains(&self, instant: DateTime<Local>) -> bool {
        self.start <= instant && instant <= self.end
    }
}

/// Resolve the window for a kind relative to `now`.
pub fn period_for(kind: PeriodKind, now: DateTime<Local>) -> Period {
    let start = match kind {
        PeriodKind::Daily => start_of_day(now),
        PeriodKind::Weekly => start_of_week(now),
        PeriodKind::Monthly => start_of_month(now),
    };
    Period { start, end: now }
}

/// Stable cache key for the period containing `now`.
///
/// Daily keys use local calendar fields, so two instants on the same local
/// day always produce the same key. Weekly keys are the day key of the
/// week's Sunday.
pub fn period_key(kind: PeriodKind, now: DateTime<Local>) -> String {
    match kind {
        PeriodKind::Daily => day_key(now),
        PeriodKind::Weekly => day_key(start_of_week(now)),
        PeriodKind::Monthly => month_key(now),
    }
}

/// `yyyy-MM-dd` from local-zone fields.
pub fn day_key(instant: DateTime<Local>) -> String {
    instant.format("%Y-%m-%d").to_string()
}

/// `yyyy-MM` from local-zone fields.
pub fn month_key(instant: DateTime<Local>) -> String {
    instant.format("%Y-%m").to_string()
}

pub fn start_of_day(instant: DateTime<Local>) -> DateTime<Local> {
    local_midnight(instant.date_naive())
}

/// Sunday 00:00 of the week containing `instant`.
pub fn start_of_week(instant: DateTime<Local>) -> DateTime<Local> {
    let back = instant.weekday().num_days_from_sunday() as u64;
    let date = instant
        .date_naive()
        .checked_sub_days(Days::new(back))
        .unwrap_or_else(|| instant.date_naive());
    local_midnight(date)
}

pub fn start_of_month(instant: DateTime<Local>) -> DateTime<Local> {
    let date = instant.date_naive().with_day(1).unwrap_or_else(|| instant.date_naive());
    local_midnight(date)
}

/// Last calendar day of the month containing `instant`, at end of day.
pub fn end_of_month(instant: DateTime<Local>) -> DateTime<Local> {
    let first = instant.date_naive().with_day(1).unwrap_or_else(|| instant.date_naive());
    let next_month = first
        .checked_add_months(chrono::Months::new(1))
        .unwrap_or(first);
    let last = next_month.pred_opt().unwrap_or(first);
    match last
        .and_time(NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN))
        .and_local_timezone(Local)
    {
        LocalResult::Single(dt) | LocalResult::Ambiguous(_, dt) => dt,
        LocalResult::None => local_midnight(last),
    }
}

/// Fraction of the local day elapsed at `instant`, in `[0, 1)`.
pub fn fraction_of_day(instant: DateTime<Local>) -> f64 {
    let minutes = instant.hour() * 60 + instant.minute();
    f64::from(minutes) / 1440.0
}

/// Coarse part-of-day label used in summarizer payloads.
pub fn day_part(instant: DateTime<Local>) -> &'static str {
    match instant.hour() {
        5..=11 => "morning",
        12..=16 => "afternoon",
        17..=20 => "evening",
        _ => "night",
    }
}

/// Hour-of-day label, e.g. `"08:00"`.
pub fn hour_bucket(instant: DateTime<Local>) -> String {
    format!("{:02}:00", instant.hour())
}

/// Midnight can be skipped or doubled by DST transitions; take the earliest
/// valid instant of the day in either case.
fn local_midnight(date: NaiveDate) -> DateTime<Local> {
    match date.and_time(NaiveTime::MIN).and_local_timezone(Local) {
        LocalResult::Single(dt) => dt,
        LocalResult::Ambiguous(dt, _) => dt,
        LocalResult::None => Local
            .from_local_datetime(&date.and_time(NaiveTime::from_hms_opt(1, 0, 0).unwrap_or(NaiveTime::MIN)))
            .earliest()
            .unwrap_or_else(Local::now),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    #[test]
    fn day_key_ignores_time_of_day() {
        assert_eq!(day_key(at(2026, 3, 5, 0, 1)), day_key(at(2026, 3, 5, 23, 58)));
        assert_eq!(day_key(at(2026, 3, 5, 12, 0)), "2026-03-05");
    }

    #[test]
    fn periods_end_at_now_not_calendar_boundary() {
        // 2026-03-05 is a Thursday
        let now = at(2026, 3, 5, 14, 30);
        for kind in PeriodKind::ALL {
            assert_eq!(period_for(kind, now).end, now);
        }
    }

    #[test]
    fn weekly_window_starts_on_sunday() {
        let thursday = at(2026, 3, 5, 14, 30);
        let period = period_for(PeriodKind::Weekly, thursday);
        assert_eq!(period.start.weekday(), chrono::Weekday::Sun);
        assert_eq!(day_key(period.start), "2026-03-01");

        // A Sunday is its own week start
        let sunday = at(2026, 3, 1, 9, 0);
        assert_eq!(day_key(start_of_week(sunday)), "2026-03-01");
    }

    #[test]
    fn period_keys_are_stable_within_their_period() {
        let morning = at(2026, 3, 5, 8, 0);
        let evening = at(2026, 3, 5, 21, 0);
        assert_eq!(period_key(PeriodKind::Daily, morning), period_key(PeriodKind::Daily, evening));
        assert_eq!(period_key(PeriodKind::Weekly, morning), "2026-03-01");
        assert_eq!(period_key(PeriodKind::Monthly, morning), "2026-03");
    }

    #[test]
    fn monthly_window_starts_on_the_first() {
        let period = period_for(PeriodKind::Monthly, at(2026, 2, 17, 10, 0));
        assert_eq!(day_key(period.start), "2026-02-01");
        assert_eq!(day_key(end_of_month(period.start)), "2026-02-28");
    }

    #[test]
    fn fraction_of_day_matches_minutes() {
        let f = fraction_of_day(at(2026, 3, 5, 14, 30));
        assert!((f - 870.0 / 1440.0).abs() < 1e-9);
        assert_eq!(fraction_of_day(at(2026, 3, 5, 0, 0)), 0.0);
    }

    #[test]
    fn day_parts_cover_the_clock() {
        assert_eq!(day_part(at(2026, 3, 5, 8, 0)), "morning");
        assert_eq!(day_part(at(2026, 3, 5, 13, 0)), "afternoon");
        assert_eq!(day_part(at(2026, 3, 5, 19, 0)), "evening");
        assert_eq!(day_part(at(2026, 3, 5, 2, 0)), "night");
        assert_eq!(hour_bucket(at(2026, 3, 5, 8, 15)), "08:00");
    }

    #[test]
    fn period_contains_is_inclusive_at_both_bounds() {
        let now = at(2026, 3, 5, 14, 30);
        let period = period_for(PeriodKind::Daily, now);
        assert!(period.contains(period.start));
        assert!(period.contains(period.end));
        assert!(!period.contains(now + chrono::Duration::seconds(1)));
    }
}
