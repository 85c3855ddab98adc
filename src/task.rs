//! Task data structures.
//!
//! A `Task` is one Kanban card: its column, due date, project, assignee,
//! lifecycle timestamps and an owned, ordered list of `Subtask`s. Records are
//! only changed through the named mutations on [`crate::db::Database`], which
//! keep the timestamp invariants below intact:
//!
//! - `completed_at` is set iff `status == Done`
//! - `archived_at` is set iff `archived`
//! - `project` is upper-cased (see [`crate::project::normalise_project`])

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::clock::Millis;
use crate::fields::{Priority, Status};

/// Title given to tasks created without one.
pub const DEFAULT_TITLE: &str = "Untitled task";

/// Generate a fresh identifier for a task or subtask.
pub fn new_id() -> String {
    Ulid::new().to_string().to_lowercase()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    pub project: String,
    pub due: Option<NaiveDate>,
    pub priority: Priority,
    pub status: Status,
    pub assigned_to: String,
    pub created_at: Millis,
    pub updated_at: Millis,
    pub completed_at: Option<Millis>,
    pub archived: bool,
    pub archived_at: Option<Millis>,
    pub subtasks: Vec<Subtask>,
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subtask {
    pub id: String,
    pub title: String,
    pub completed: bool,
    pub created_at: Millis,
    pub completed_at: Option<Millis>,
}

/// Completed/total subtask counts with an integer percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SubtaskProgress {
    pub completed: usize,
    pub total: usize,
    pub percentage: u8,
}

/// Fields a caller supplies when creating a task. Everything else is derived.
#[derive(Debug, Clone, Default)]
pub struct NewTask {
    pub title: String,
    pub project: Option<String>,
    pub due: Option<NaiveDate>,
    pub priority: Priority,
    pub status: Option<Status>,
    pub assigned_to: Option<String>,
    pub notes: String,
}

impl NewTask {
    pub fn titled(title: impl Into<String>) -> Self {
        NewTask {
            title: title.into(),
            ..NewTask::default()
        }
    }
}

impl Task {
    /// Whether the task sits in the done column.
    pub fn is_done(&self) -> bool {
        self.status == Status::Done
    }

    /// Subtask completion, or `None` when the task has no subtasks.
    pub fn subtask_progress(&self) -> Option<SubtaskProgress> {
        let total = self.subtasks.len();
        if total == 0 {
            return None;
        }
        let completed = self.subtasks.iter().filter(|s| s.completed).count();
        Some(SubtaskProgress {
            completed,
            total,
            percentage: percent_rounded(completed, total),
        })
    }

    /// Subtask by exact id.
    pub fn subtask(&self, subtask_id: &str) -> Option<&Subtask> {
        self.subtasks.iter().find(|s| s.id == subtask_id)
    }

    /// Apply a status change and its completion side effects.
    pub(crate) fn transition(&mut self, status: Status, now: Millis) {
        let was_done = self.is_done();
        self.status = status;
        match (was_done, self.is_done()) {
            (false, true) => self.completed_at = Some(now),
            (true, false) => self.completed_at = None,
            _ => {}
        }
        self.updated_at = now;
    }

    /// Returns false when the task was already archived.
    pub(crate) fn archive(&mut self, now: Millis) -> bool {
        if self.archived {
            return false;
        }
        self.archived = true;
        self.archived_at = Some(now);
        true
    }

    pub(crate) fn unarchive(&mut self) -> bool {
        if !self.archived {
            return false;
        }
        self.archived = false;
        self.archived_at = None;
        true
    }
}

impl Subtask {
    pub(crate) fn new(title: &str, now: Millis) -> Self {
        Subtask {
            id: new_id(),
            title: title.to_string(),
            completed: false,
            created_at: now,
            completed_at: None,
        }
    }

    pub(crate) fn toggle(&mut self, now: Millis) {
        self.completed = !self.completed;
        self.completed_at = if self.completed { Some(now) } else { None };
    }
}

/// `round(part / whole * 100)` with halves rounded up; 0 for an empty whole.
pub fn percent_rounded(part: usize, whole: usize) -> u8 {
    if whole == 0 {
        return 0;
    }
    ((200 * part + whole) / (2 * whole)).min(100) as u8
}

/// Trimmed text, or `None` when nothing but whitespace was given.
pub(crate) fn non_blank(s: &str) -> Option<&str> {
    let t = s.trim();
    if t.is_empty() {
        None
    } else {
        Some(t)
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::task;
    use super::*;

    #[test]
    fn test_subtask_progress_rounds() {
        let mut t = task("a", "ACME", Status::Todo, 0);
        assert_eq!(t.subtask_progress(), None);

        t.subtasks = vec![Subtask::new("one", 0), Subtask::new("two", 0), Subtask::new("three", 0)];
        t.subtasks[0].toggle(5);
        assert_eq!(
            t.subtask_progress(),
            Some(SubtaskProgress { completed: 1, total: 3, percentage: 33 })
        );
        t.subtasks[1].toggle(6);
        assert_eq!(t.subtask_progress().map(|p| p.percentage), Some(67));
    }

    #[test]
    fn test_percent_rounded_half_up() {
        assert_eq!(percent_rounded(1, 8), 13); // 12.5
        assert_eq!(percent_rounded(1, 3), 33);
        assert_eq!(percent_rounded(2, 3), 67);
        assert_eq!(percent_rounded(3, 3), 100);
        assert_eq!(percent_rounded(0, 0), 0);
    }

    #[test]
    fn test_transition_sets_and_clears_completion() {
        let mut t = task("a", "ACME", Status::Todo, 0);
        t.transition(Status::Done, 10);
        assert_eq!(t.completed_at, Some(10));
        assert_eq!(t.updated_at, 10);

        // done -> done keeps the original completion time
        t.transition(Status::Done, 20);
        assert_eq!(t.completed_at, Some(10));

        t.transition(Status::Review, 30);
        assert_eq!(t.completed_at, None);
        assert_eq!(t.updated_at, 30);
    }

    #[test]
    fn test_subtask_toggle_mirrors_completion() {
        let mut s = Subtask::new("write docs", 1);
        s.toggle(2);
        assert!(s.completed);
        assert_eq!(s.completed_at, Some(2));
        s.toggle(3);
        assert!(!s.completed);
        assert_eq!(s.completed_at, None);
    }

    #[test]
    fn test_task_json_uses_camel_case() {
        let t = task("a", "ACME", Status::Done, 7);
        let json = serde_json::to_value(&t).unwrap();
        assert_eq!(json["assignedTo"], "unassigned");
        assert_eq!(json["completedAt"], 7);
        assert_eq!(json["status"], "done");
        assert!(json["archivedAt"].is_null());
    }
}
