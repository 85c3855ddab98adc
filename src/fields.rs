//! Enumerations and field types for task management.
//!
//! This module defines the structured values a task carries (status, priority)
//! and the set of statuses a board is configured to allow.

use std::fmt;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Kanban column a task sits in.
///
/// `Backlog` and `Blocked` are only available on boards whose configuration
/// enables them; the default board uses the four canonical columns.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum Status {
    Backlog,
    Todo,
    Doing,
    Review,
    Blocked,
    Done,
}

impl Status {
    /// Stored and command-line spelling.
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Backlog => "backlog",
            Status::Todo => "todo",
            Status::Doing => "doing",
            Status::Review => "review",
            Status::Blocked => "blocked",
            Status::Done => "done",
        }
    }

    /// Parse a stored status string, case-insensitively.
    pub fn parse(s: &str) -> Option<Status> {
        match s.trim().to_lowercase().as_str() {
            "backlog" => Some(Status::Backlog),
            "todo" | "to-do" | "to do" => Some(Status::Todo),
            "doing" | "in-progress" | "in_progress" => Some(Status::Doing),
            "review" => Some(Status::Review),
            "blocked" => Some(Status::Blocked),
            "done" => Some(Status::Done),
            _ => None,
        }
    }

    /// Column heading for display.
    pub fn title(self) -> &'static str {
        match self {
            Status::Backlog => "Backlog",
            Status::Todo => "To do",
            Status::Doing => "Doing",
            Status::Review => "Review",
            Status::Blocked => "Blocked",
            Status::Done => "Done",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Task importance.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, ValueEnum, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    /// Parse a stored priority, case-insensitively.
    pub fn parse(s: &str) -> Option<Priority> {
        match s.trim().to_lowercase().as_str() {
            "low" => Some(Priority::Low),
            "medium" => Some(Priority::Medium),
            "high" => Some(Priority::High),
            _ => None,
        }
    }
}

/// Format a priority for display.
pub fn format_priority(p: Priority) -> &'static str {
    match p {
        Priority::Low => "Low",
        Priority::Medium => "Medium",
        Priority::High => "High",
    }
}

/// Ordered set of statuses a board accepts, in column order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatusSet(Vec<Status>);

impl StatusSet {
    /// Build a set, dropping duplicates while keeping first-seen order.
    pub fn new(statuses: impl IntoIterator<Item = Status>) -> Self {
        let mut out: Vec<Status> = Vec::new();
        for s in statuses {
            if !out.contains(&s) {
                out.push(s);
            }
        }
        StatusSet(out)
    }

    /// The six-column layout with backlog and blocked.
    pub fn extended() -> Self {
        StatusSet(vec![
            Status::Backlog,
            Status::Todo,
            Status::Doing,
            Status::Review,
            Status::Blocked,
            Status::Done,
        ])
    }

    /// Whether the board has a column for `status`.
    pub fn contains(&self, status: Status) -> bool {
        self.0.contains(&status)
    }

    /// Statuses in column order.
    pub fn iter(&self) -> impl Iterator<Item = Status> + '_ {
        self.0.iter().copied()
    }

    /// Map a status that this board does not carry onto one it does.
    ///
    /// Legacy `backlog` items become `todo` and `blocked` items become
    /// `doing`; anything else unknown lands in `todo`.
    pub fn coerce(&self, status: Status) -> Status {
        if self.contains(status) {
            return status;
        }
        match status {
            Status::Blocked if self.contains(Status::Doing) => Status::Doing,
            _ => Status::Todo,
        }
    }
}

impl Default for StatusSet {
    fn default() -> Self {
        StatusSet(vec![Status::Todo, Status::Doing, Status::Review, Status::Done])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_status() {
        assert_eq!(Status::parse("DONE"), Some(Status::Done));
        assert_eq!(Status::parse(" doing "), Some(Status::Doing));
        assert_eq!(Status::parse("in_progress"), Some(Status::Doing));
        assert_eq!(Status::parse("archived"), None);
    }

    #[test]
    fn test_status_serde_is_lowercase() {
        let json = serde_json::to_string(&Status::Review).unwrap();
        assert_eq!(json, "\"review\"");
        let back: Status = serde_json::from_str("\"blocked\"").unwrap();
        assert_eq!(back, Status::Blocked);
    }

    #[test]
    fn test_status_set_dedups_and_coerces() {
        let set = StatusSet::new([Status::Todo, Status::Doing, Status::Todo, Status::Done]);
        assert_eq!(set.iter().count(), 3);
        assert_eq!(set.coerce(Status::Blocked), Status::Doing);
        assert_eq!(set.coerce(Status::Backlog), Status::Todo);
        assert_eq!(set.coerce(Status::Review), Status::Todo);
        assert_eq!(StatusSet::extended().coerce(Status::Blocked), Status::Blocked);
    }
}
