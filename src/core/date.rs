use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, Weekday};

/// Canonical day-key format. Lexicographic order on keys matches
/// chronological order, so buckets can be compared as plain strings.
pub const DAY_KEY_FORMAT: &str = "%Y-%m-%d";

/// Canonical bucket key for a calendar day.
pub fn day_key(date: NaiveDate) -> String {
    date.format(DAY_KEY_FORMAT).to_string()
}

/// Bucket key for an instant; the time-of-day component is ignored.
pub fn day_key_at(moment: NaiveDateTime) -> String {
    day_key(moment.date())
}

pub fn parse_day_key(key: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(key, DAY_KEY_FORMAT).ok()
}

pub fn add_days(date: NaiveDate, n: i64) -> NaiveDate {
    date + Duration::days(n)
}

pub fn add_weeks(date: NaiveDate, n: i64) -> NaiveDate {
    date + Duration::weeks(n)
}

/// First day of the week containing `date`, for the given week-start day.
pub fn week_start(date: NaiveDate, starts_on: Weekday) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().days_since(starts_on)))
}

/// Inclusive (start, end) of the week containing `date`. Display label
/// only; bucketing never depends on week boundaries.
pub fn week_range(date: NaiveDate, starts_on: Weekday) -> (NaiveDate, NaiveDate) {
    let start = week_start(date, starts_on);
    (start, start + Duration::days(6))
}
