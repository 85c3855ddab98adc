//! Wall-clock source.
//!
//! Everything in the engine takes `now` (ms since the epoch) and `today`
//! (local calendar date) as plain values; this trait is how the host obtains
//! them, and lets tests pin time.

use chrono::{DateTime, Duration, Local, NaiveDate, TimeZone, Utc};

/// Milliseconds since the Unix epoch.
pub type Millis = i64;

pub const DAY_MS: Millis = 86_400_000;

pub trait Clock {
    /// Current instant in ms since the epoch.
    fn now(&self) -> Millis;

    /// Today's calendar date, already truncated to local midnight.
    fn today(&self) -> NaiveDate;

    /// The next local midnight strictly after `now()`, in ms.
    fn next_midnight(&self) -> Millis;
}

/// The machine's local clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Millis {
        Utc::now().timestamp_millis()
    }

    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }

    fn next_midnight(&self) -> Millis {
        next_midnight_after(&Local::now()).timestamp_millis()
    }
}

/// A clock frozen at a given UTC instant. "Today" is the UTC date.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    pub at: DateTime<Utc>,
}

impl FixedClock {
    /// Clock pinned at `at`.
    pub fn new(at: DateTime<Utc>) -> Self {
        FixedClock { at }
    }

    /// Clock pinned at `ms` since the epoch.
    pub fn from_millis(ms: Millis) -> Self {
        FixedClock {
            at: Utc.timestamp_millis_opt(ms).single().unwrap_or_default(),
        }
    }

    /// Move the pinned instant forward by `by`.
    pub fn advance(&mut self, by: Duration) {
        self.at += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> Millis {
        self.at.timestamp_millis()
    }

    fn today(&self) -> NaiveDate {
        self.at.date_naive()
    }

    fn next_midnight(&self) -> Millis {
        next_midnight_after(&self.at).timestamp_millis()
    }
}

/// First midnight of the day after `now`, in `now`'s timezone.
///
/// When midnight does not exist locally (a DST gap at 00:00) the first valid
/// instant of that day is used instead.
pub fn next_midnight_after<Tz: TimeZone>(now: &DateTime<Tz>) -> DateTime<Tz> {
    let tz = now.timezone();
    let tomorrow = now.date_naive() + Duration::days(1);
    let mut candidate = tomorrow.and_hms_opt(0, 0, 0).unwrap_or_default();
    for _ in 0..4 {
        if let Some(dt) = tz.from_local_datetime(&candidate).earliest() {
            return dt;
        }
        candidate += Duration::minutes(30);
    }
    now.clone() + Duration::days(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_midnight_is_start_of_following_day() {
        let at = Utc.with_ymd_and_hms(2025, 1, 3, 15, 42, 7).unwrap();
        let next = next_midnight_after(&at);
        assert_eq!(next, Utc.with_ymd_and_hms(2025, 1, 4, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_next_midnight_from_midnight_skips_a_full_day() {
        let at = Utc.with_ymd_and_hms(2025, 1, 3, 0, 0, 0).unwrap();
        let next = next_midnight_after(&at);
        assert_eq!(next - at, Duration::days(1));
    }

    #[test]
    fn test_fixed_clock_reports_pinned_values() {
        let mut clock = FixedClock::new(Utc.with_ymd_and_hms(2025, 1, 3, 23, 0, 0).unwrap());
        assert_eq!(clock.today(), NaiveDate::from_ymd_opt(2025, 1, 3).unwrap());
        clock.advance(Duration::hours(2));
        assert_eq!(clock.today(), NaiveDate::from_ymd_opt(2025, 1, 4).unwrap());
        assert_eq!(clock.now(), clock.at.timestamp_millis());
    }
}
