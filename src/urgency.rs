//! Urgency classification and board ordering.
//!
//! A task's urgency is derived from the business days left until its due date
//! and, separately, from how long it has sat untouched in `doing`.

use chrono::NaiveDate;
use serde::Serialize;

use crate::calendar::business_days_between;
use crate::clock::{Millis, DAY_MS};
use crate::fields::{Status, StatusSet};
use crate::task::Task;

/// A `doing` task untouched for longer than this is stale.
pub const STALE_AFTER_MS: Millis = 3 * DAY_MS;

/// Color bucket for remaining business days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum UrgencyTier {
    /// Past the due date.
    Overdue,
    /// Fewer than 3 business days left (includes "due today").
    Critical,
    /// 3 to 7 business days left.
    Warning,
    /// More than 7 business days left.
    Normal,
    /// No due date, or already done.
    None,
}

impl UrgencyTier {
    /// Bucket a business-day countdown.
    pub fn from_days(days: Option<i64>) -> Self {
        match days {
            None => UrgencyTier::None,
            Some(d) if d < 0 => UrgencyTier::Overdue,
            Some(d) if d < 3 => UrgencyTier::Critical,
            Some(d) if d <= 7 => UrgencyTier::Warning,
            Some(_) => UrgencyTier::Normal,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Urgency {
    pub remaining_business_days: Option<i64>,
    pub tier: UrgencyTier,
    pub stale: bool,
}

impl Urgency {
    /// Short countdown text shown on a card.
    pub fn label(&self) -> String {
        match self.remaining_business_days {
            None => "no deadline".into(),
            Some(0) => "due today".into(),
            Some(d) if d < 0 => format!("overdue by {} business day{}", -d, plural(-d)),
            Some(d) => format!("{} business day{} left", d, plural(d)),
        }
    }
}

fn plural(n: i64) -> &'static str {
    if n == 1 {
        ""
    } else {
        "s"
    }
}

/// Signed business-day countdown to the due date, `None` when there is no
/// due date or the task is done.
pub fn remaining_business_days(task: &Task, today: NaiveDate) -> Option<i64> {
    if task.status == Status::Done {
        return None;
    }
    let due = task.due?;
    if due < today {
        Some(-business_days_between(due, today))
    } else {
        Some(business_days_between(today, due))
    }
}

/// Whether a `doing` task has gone more than three days without a change.
pub fn is_stale(task: &Task, now: Millis) -> bool {
    let last_touched = task.updated_at.max(task.created_at);
    task.status == Status::Doing && now - last_touched > STALE_AFTER_MS
}

/// Countdown, tier and stale flag of one task.
pub fn classify(task: &Task, today: NaiveDate, now: Millis) -> Urgency {
    let remaining = remaining_business_days(task, today);
    Urgency {
        remaining_business_days: remaining,
        tier: UrgencyTier::from_days(remaining),
        stale: is_stale(task, now),
    }
}

/// Stable sort of one column: soonest first, tasks without a countdown last.
pub fn sort_column(tasks: &mut [&Task], today: NaiveDate) {
    tasks.sort_by_key(|t| match remaining_business_days(t, today) {
        Some(d) => (0, d),
        None => (1, 0),
    });
}

/// One board column: a status and its urgency-ordered active tasks.
#[derive(Debug)]
pub struct Column<'a> {
    pub status: Status,
    pub tasks: Vec<&'a Task>,
}

/// Group non-archived tasks into the board's columns, each urgency-sorted.
///
/// Tasks whose status the board does not carry are left out.
pub fn board<'a>(
    tasks: impl IntoIterator<Item = &'a Task>,
    statuses: &StatusSet,
    today: NaiveDate,
) -> Vec<Column<'a>> {
    let mut columns: Vec<Column<'a>> = statuses
        .iter()
        .map(|status| Column {
            status,
            tasks: Vec::new(),
        })
        .collect();
    for task in tasks.into_iter().filter(|t| !t.archived) {
        if let Some(col) = columns.iter_mut().find(|c| c.status == task.status) {
            col.tasks.push(task);
        }
    }
    for col in columns.iter_mut() {
        sort_column(&mut col.tasks, today);
    }
    columns
}
