//! The nightly archive sweep.
//!
//! The engine only knows how to archive done tasks
//! ([`Database::archive_done`]). When that runs is decided here: a single
//! deadline set to the next local midnight, replaced (never duplicated) each
//! time it is scheduled, and pushed to the following midnight after each run.
//! The host drives it by calling [`MidnightSweep::poll`] from its own loop or
//! timer.

use tracing::{debug, info};

use crate::clock::{Clock, Millis};
use crate::db::Database;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MidnightSweep {
    next_run: Option<Millis>,
}

/// Outcome of a sweep that actually ran.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweepReport {
    /// Done tasks archived by the sweep itself.
    pub archived: usize,
    /// Projects archived by the follow-up reconcile.
    pub projects: Vec<String>,
    pub next_run: Millis,
}

impl MidnightSweep {
    /// A sweep already scheduled for the next midnight.
    pub fn start(clock: &dyn Clock) -> Self {
        let mut sweep = MidnightSweep::default();
        sweep.schedule(clock);
        sweep
    }

    /// Clear any pending deadline and set a fresh one for the next midnight.
    pub fn schedule(&mut self, clock: &dyn Clock) -> Millis {
        self.cancel();
        let at = clock.next_midnight();
        self.next_run = Some(at);
        debug!(at, "midnight sweep scheduled");
        at
    }

    /// Drop the pending deadline; `poll` does nothing until rescheduled.
    pub fn cancel(&mut self) {
        self.next_run = None;
    }

    /// Pending deadline in ms, if any.
    pub fn next_run(&self) -> Option<Millis> {
        self.next_run
    }

    /// Whether the deadline has been reached.
    pub fn is_due(&self, now: Millis) -> bool {
        self.next_run.is_some_and(|at| now >= at)
    }

    /// Time left until the deadline, zero when due, `None` when cancelled.
    pub fn remaining(&self, now: Millis) -> Option<Millis> {
        self.next_run.map(|at| (at - now).max(0))
    }

    /// Run the sweep if its deadline has passed, then reschedule.
    pub fn poll(&mut self, db: &mut Database, clock: &dyn Clock) -> Option<SweepReport> {
        let now = clock.now();
        if !self.is_due(now) {
            return None;
        }
        let archived = db.archive_done(now);
        let projects = db.reconcile(now);
        let next_run = self.schedule(clock);
        info!(archived, projects = projects.len(), "midnight sweep ran");
        Some(SweepReport {
            archived,
            projects,
            next_run,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::fields::Status;
    use crate::task::NewTask;
    use chrono::{Duration, TimeZone, Utc};

    fn clock_at(h: u32, m: u32) -> FixedClock {
        FixedClock::new(Utc.with_ymd_and_hms(2025, 1, 8, h, m, 0).unwrap())
    }

    #[test]
    fn test_schedules_for_next_midnight() {
        let clock = clock_at(18, 30);
        let sweep = MidnightSweep::start(&clock);
        let midnight = Utc.with_ymd_and_hms(2025, 1, 9, 0, 0, 0).unwrap().timestamp_millis();
        assert_eq!(sweep.next_run(), Some(midnight));
        assert!(!sweep.is_due(clock.now()));
        assert_eq!(sweep.remaining(clock.now()), Some(midnight - clock.now()));
    }

    #[test]
    fn test_rescheduling_replaces_the_deadline() {
        let mut clock = clock_at(10, 0);
        let mut sweep = MidnightSweep::start(&clock);
        let first = sweep.next_run();
        clock.advance(Duration::days(1));
        sweep.schedule(&clock);
        assert_ne!(sweep.next_run(), first);
        sweep.cancel();
        assert_eq!(sweep.next_run(), None);
        assert!(!sweep.is_due(i64::MAX));
    }

    #[test]
    fn test_poll_runs_once_per_midnight() {
        let mut clock = clock_at(23, 0);
        let mut db = Database::default();
        let done = db
            .add_task(NewTask { status: Some(Status::Done), ..NewTask::titled("a") }, clock.now())
            .unwrap();
        let open = db.add_task(NewTask::titled("b"), clock.now()).unwrap();
        let mut sweep = MidnightSweep::start(&clock);

        assert_eq!(sweep.poll(&mut db, &clock), None);
        assert!(!db.get(&done).unwrap().archived);

        clock.advance(Duration::hours(1));
        let report = sweep.poll(&mut db, &clock).unwrap();
        assert_eq!(report.archived, 1);
        assert!(db.get(&done).unwrap().archived);
        assert!(!db.get(&open).unwrap().archived);
        assert_eq!(report.next_run, clock.now() + 86_400_000);

        // same instant again: already rescheduled, nothing to do
        assert_eq!(sweep.poll(&mut db, &clock), None);
    }
}
