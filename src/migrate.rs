//! Load-boundary migration of stored task records.
//!
//! Older data files predate subtasks, archiving and completion timestamps,
//! and some carry statuses from the six-column board. Records are read into
//! the permissive `LegacyTask` shape and converted once, here, into a
//! canonical [`Task`] whose invariants hold. Nothing past this point deals
//! with missing fields.

use chrono::NaiveDate;
use serde::Deserialize;
use tracing::warn;

use crate::clock::Millis;
use crate::fields::{Priority, Status, StatusSet};
use crate::project::normalise_project;
use crate::task::{new_id, non_blank, Subtask, Task, DEFAULT_TITLE};
use crate::user::UNASSIGNED_USER_ID;

/// Current on-disk schema version.
pub const SCHEMA_VERSION: u32 = 2;

/// A stored task as it may appear in any schema version.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LegacyTask {
    pub id: Option<String>,
    pub title: Option<String>,
    pub project: Option<String>,
    #[serde(deserialize_with = "lenient_date")]
    pub due: Option<NaiveDate>,
    pub priority: Option<String>,
    pub status: Option<String>,
    pub assigned_to: Option<String>,
    pub created_at: Option<Millis>,
    pub updated_at: Option<Millis>,
    pub completed_at: Option<Millis>,
    pub archived: Option<bool>,
    pub archived_at: Option<Millis>,
    pub subtasks: Option<Vec<LegacySubtask>>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LegacySubtask {
    pub id: Option<String>,
    pub title: Option<String>,
    pub completed: Option<bool>,
    pub created_at: Option<Millis>,
    pub completed_at: Option<Millis>,
}

/// Dates were stored as `YYYY-MM-DD`, sometimes with a time suffix, and
/// sometimes as an empty string for "no due date".
fn lenient_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.and_then(|s| {
        let s = s.trim();
        let day = s.get(..10).unwrap_or(s);
        NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
    }))
}

/// Convert a stored record into a canonical task.
///
/// `assigned_to` is carried over as-is; resolving it against the user list is
/// the store's job.
pub fn migrate_task(raw: LegacyTask, statuses: &StatusSet, now: Millis) -> Task {
    let id = raw.id.filter(|id| !id.trim().is_empty()).unwrap_or_else(|| {
        warn!("stored task without id, assigning a fresh one");
        new_id()
    });

    let status = match raw.status.as_deref().map(|s| (s, Status::parse(s))) {
        Some((_, Some(status))) => statuses.coerce(status),
        Some((unknown, None)) => {
            warn!(task = %id, status = unknown, "unknown status, moving to todo");
            statuses.coerce(Status::Todo)
        }
        None => statuses.coerce(Status::Todo),
    };

    let created_at = raw.created_at.or(raw.updated_at).unwrap_or(now);
    let updated_at = raw.updated_at.unwrap_or(created_at).max(created_at);

    let completed_at = if status == Status::Done {
        Some(raw.completed_at.unwrap_or(updated_at))
    } else {
        None
    };

    let archived = raw.archived.unwrap_or(false);
    let archived_at = if archived {
        Some(raw.archived_at.unwrap_or(updated_at))
    } else {
        None
    };

    let subtasks = raw
        .subtasks
        .unwrap_or_default()
        .into_iter()
        .map(|s| migrate_subtask(s, created_at))
        .collect();

    Task {
        id,
        title: raw
            .title
            .as_deref()
            .and_then(non_blank)
            .unwrap_or(DEFAULT_TITLE)
            .to_string(),
        project: normalise_project(raw.project.as_deref().unwrap_or_default()),
        due: raw.due,
        priority: raw
            .priority
            .as_deref()
            .and_then(Priority::parse)
            .unwrap_or_default(),
        status,
        assigned_to: raw
            .assigned_to
            .filter(|u| !u.trim().is_empty())
            .unwrap_or_else(|| UNASSIGNED_USER_ID.to_string()),
        created_at,
        updated_at,
        completed_at,
        archived,
        archived_at,
        subtasks,
        notes: raw.notes.unwrap_or_default(),
    }
}

fn migrate_subtask(raw: LegacySubtask, parent_created_at: Millis) -> Subtask {
    let created_at = raw.created_at.unwrap_or(parent_created_at);
    let completed = raw.completed.unwrap_or(false);
    Subtask {
        id: raw.id.filter(|id| !id.trim().is_empty()).unwrap_or_else(new_id),
        title: raw
            .title
            .as_deref()
            .and_then(non_blank)
            .unwrap_or(DEFAULT_TITLE)
            .to_string(),
        completed,
        created_at,
        completed_at: if completed {
            Some(raw.completed_at.unwrap_or(created_at))
        } else {
            None
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> LegacyTask {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_bare_record_gets_every_default() {
        let t = migrate_task(parse(r#"{"title": "  "}"#), &StatusSet::default(), 500);
        assert!(!t.id.is_empty());
        assert_eq!(t.title, DEFAULT_TITLE);
        assert_eq!(t.project, "DIVERS");
        assert_eq!(t.status, Status::Todo);
        assert_eq!(t.priority, Priority::Medium);
        assert_eq!(t.assigned_to, UNASSIGNED_USER_ID);
        assert_eq!((t.created_at, t.updated_at), (500, 500));
        assert_eq!(t.completed_at, None);
        assert!(!t.archived);
        assert_eq!(t.archived_at, None);
        assert!(t.subtasks.is_empty());
    }

    #[test]
    fn test_done_record_gets_completed_at_from_updated_at() {
        let t = migrate_task(
            parse(r#"{"id":"t1","status":"done","createdAt":10,"updatedAt":40,"project":"acme"}"#),
            &StatusSet::default(),
            999,
        );
        assert_eq!(t.completed_at, Some(40));
        assert_eq!(t.project, "ACME");
    }

    #[test]
    fn test_stale_completed_at_is_cleared() {
        let t = migrate_task(
            parse(r#"{"id":"t1","status":"doing","completedAt":40}"#),
            &StatusSet::default(),
            0,
        );
        assert_eq!(t.completed_at, None);
    }

    #[test]
    fn test_archive_flag_and_timestamp_agree() {
        let t = migrate_task(
            parse(r#"{"id":"t1","archived":true,"updatedAt":70}"#),
            &StatusSet::default(),
            0,
        );
        assert_eq!(t.archived_at, Some(70));

        let t = migrate_task(
            parse(r#"{"id":"t1","archived":false,"archivedAt":70}"#),
            &StatusSet::default(),
            0,
        );
        assert_eq!(t.archived_at, None);
    }

    #[test]
    fn test_six_column_statuses_fold_into_four() {
        let four = StatusSet::default();
        let backlog = migrate_task(parse(r#"{"status":"backlog"}"#), &four, 0);
        assert_eq!(backlog.status, Status::Todo);
        let blocked = migrate_task(parse(r#"{"status":"blocked"}"#), &four, 0);
        assert_eq!(blocked.status, Status::Doing);
        let weird = migrate_task(parse(r#"{"status":"someday"}"#), &four, 0);
        assert_eq!(weird.status, Status::Todo);

        let six = StatusSet::extended();
        let kept = migrate_task(parse(r#"{"status":"blocked"}"#), &six, 0);
        assert_eq!(kept.status, Status::Blocked);
    }

    #[test]
    fn test_subtasks_are_normalised() {
        let t = migrate_task(
            parse(
                r#"{"createdAt":5,"subtasks":[
                    {"id":"s1","title":"a","completed":true},
                    {"title":"b","completed":false,"completedAt":9}
                ]}"#,
            ),
            &StatusSet::default(),
            0,
        );
        assert_eq!(t.subtasks.len(), 2);
        assert_eq!(t.subtasks[0].completed_at, Some(5));
        assert_eq!(t.subtasks[1].completed_at, None);
        assert!(!t.subtasks[1].id.is_empty());
    }

    #[test]
    fn test_due_dates_are_read_leniently() {
        let t = migrate_task(parse(r#"{"due":"2025-01-06T00:00:00.000Z"}"#), &StatusSet::default(), 0);
        assert_eq!(t.due, NaiveDate::from_ymd_opt(2025, 1, 6));
        let t = migrate_task(parse(r#"{"due":""}"#), &StatusSet::default(), 0);
        assert_eq!(t.due, None);
        let t = migrate_task(parse(r#"{"due":null}"#), &StatusSet::default(), 0);
        assert_eq!(t.due, None);
    }
}
