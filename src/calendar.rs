//! Business-day arithmetic.
//!
//! Dates are plain calendar dates: callers truncate to local midnight before
//! asking (see [`crate::clock::Clock::today`]). Holidays are not modelled and
//! DST transitions have no effect since no time-of-day is involved.

use chrono::{Datelike, NaiveDate, Weekday};

/// Whether `day` falls Monday through Friday.
pub fn is_business_day(day: NaiveDate) -> bool {
    !matches!(day.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Count business days in the inclusive range `[start, end]`.
///
/// Returns 0 when `start > end`. Callers wanting a signed "days overdue" value
/// swap the arguments and negate the result themselves.
pub fn business_days_between(start: NaiveDate, end: NaiveDate) -> i64 {
    if start > end {
        return 0;
    }
    start
        .iter_days()
        .take_while(|d| *d <= end)
        .filter(|d| is_business_day(*d))
        .count() as i64
}
