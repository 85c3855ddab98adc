//! Import/export of whole boards.
//!
//! A snapshot is `{ tasks, directories, projectHistory, users }`. Imports are
//! parsed and migrated completely before the store is touched, so a bad file
//! never leaves a half-applied state behind.
//!
//! Merge policy, applied uniformly by key:
//! - tasks: by id, the copy with the later `updatedAt` wins (local on ties)
//! - users: by id, local wins
//! - directories: by project, imported wins
//! - project history: local order first, unseen imported names appended

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::clock::Millis;
use crate::db::Database;
use crate::error::{Error, Result};
use crate::fields::StatusSet;
use crate::migrate::{migrate_task, LegacyTask};
use crate::project::{normalise_project, ProjectHistory};
use crate::task::Task;
use crate::user::{User, UNASSIGNED_USER_ID};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub tasks: Vec<Task>,
    pub directories: BTreeMap<String, PathBuf>,
    pub project_history: ProjectHistory,
    pub users: Vec<User>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSnapshot {
    tasks: Vec<LegacyTask>,
    #[serde(default)]
    directories: BTreeMap<String, PathBuf>,
    #[serde(default)]
    project_history: Vec<String>,
    #[serde(default)]
    users: Vec<User>,
}

/// What an import changed.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ImportSummary {
    pub tasks_added: usize,
    pub tasks_updated: usize,
    pub tasks_kept: usize,
    pub users_added: usize,
    pub directories_set: usize,
}

impl Snapshot {
    /// Parse an exported file. Fails on invalid JSON or a missing `tasks`
    /// array.
    pub fn parse(json: &str, statuses: &StatusSet, now: Millis) -> Result<Snapshot> {
        let value: Value =
            serde_json::from_str(json).map_err(|e| Error::MalformedImport(e.to_string()))?;
        match value.get("tasks") {
            Some(Value::Array(_)) => {}
            Some(_) => return Err(Error::MalformedImport("`tasks` is not an array".into())),
            None => return Err(Error::MalformedImport("missing `tasks`".into())),
        }
        let raw: RawSnapshot =
            serde_json::from_value(value).map_err(|e| Error::MalformedImport(e.to_string()))?;
        Ok(Snapshot {
            tasks: raw
                .tasks
                .into_iter()
                .map(|t| migrate_task(t, statuses, now))
                .collect(),
            directories: raw.directories,
            project_history: ProjectHistory::new(raw.project_history),
            users: raw.users,
        })
    }
}

impl Database {
    /// Owned copy of everything an export file carries.
    pub fn export(&self) -> Snapshot {
        Snapshot {
            tasks: self.tasks.clone(),
            directories: self.directories.clone(),
            project_history: self.project_history.clone(),
            users: self.users.clone(),
        }
    }

    /// Merge a parsed snapshot into this board.
    ///
    /// Projects of imported tasks that are added or win the merge are
    /// recorded in the history after the local and imported names.
    pub fn import(&mut self, snapshot: Snapshot) -> ImportSummary {
        let mut summary = ImportSummary::default();

        for user in snapshot.users {
            if user.id != UNASSIGNED_USER_ID && self.user(&user.id).is_none() {
                self.users.push(user);
                summary.users_added += 1;
            }
        }

        summary.directories_set = snapshot.directories.len();
        self.directories.extend(
            snapshot
                .directories
                .into_iter()
                .map(|(project, path)| (normalise_project(&project), path)),
        );
        self.project_history.union(&snapshot.project_history);

        let mut index: HashMap<String, usize> = self
            .tasks
            .iter()
            .enumerate()
            .map(|(i, t)| (t.id.clone(), i))
            .collect();
        for mut task in snapshot.tasks {
            if self.user(&task.assigned_to).is_none() {
                task.assigned_to = UNASSIGNED_USER_ID.to_string();
            }
            match index.get(&task.id) {
                Some(&i) if task.updated_at > self.tasks[i].updated_at => {
                    self.project_history.append(&task.project);
                    self.tasks[i] = task;
                    summary.tasks_updated += 1;
                }
                Some(_) => summary.tasks_kept += 1,
                None => {
                    self.project_history.append(&task.project);
                    index.insert(task.id.clone(), self.tasks.len());
                    self.tasks.push(task);
                    summary.tasks_added += 1;
                }
            }
        }

        info!(
            added = summary.tasks_added,
            updated = summary.tasks_updated,
            kept = summary.tasks_kept,
            users = summary.users_added,
            "import merged"
        );
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::Status;
    use crate::task::NewTask;

    const T0: Millis = 1_736_000_000_000;

    fn parse(json: &str) -> Result<Snapshot> {
        Snapshot::parse(json, &StatusSet::default(), T0)
    }

    #[test]
    fn test_rejects_invalid_json_and_missing_tasks() {
        assert!(matches!(parse("{"), Err(Error::MalformedImport(_))));
        assert!(matches!(parse(r#"{"users": []}"#), Err(Error::MalformedImport(_))));
        assert!(matches!(parse(r#"{"tasks": {}}"#), Err(Error::MalformedImport(_))));
        assert!(matches!(parse("[]"), Err(Error::MalformedImport(_))));
    }

    #[test]
    fn test_failed_parse_leaves_board_untouched() {
        let mut db = Database::default();
        db.add_task(NewTask::titled("keep"), T0).unwrap();
        let before = db.export();
        if let Ok(snapshot) = parse(r#"{"tasks": [1, 2]}"#) {
            db.import(snapshot);
        }
        assert_eq!(db.export(), before);
    }

    #[test]
    fn test_export_then_parse_is_lossless() {
        let mut db = Database::default();
        let id = db.add_task(NewTask { project: Some("acme".into()), ..NewTask::titled("a") }, T0).unwrap();
        db.set_status(&id, Status::Done, T0 + 1).unwrap();
        db.add_user("Ana", "ana@x.io").unwrap();
        let json = serde_json::to_string(&db.export()).unwrap();
        assert_eq!(parse(&json).unwrap(), db.export());
    }

    #[test]
    fn test_users_keep_local_copy_on_conflict() {
        let mut db = Database::default();
        db.users.push(User {
            id: "u1".into(),
            name: "Ana".into(),
            email: "local@x.io".into(),
        });
        let snapshot = parse(
            r#"{"tasks": [], "users": [
                {"id":"u1","name":"Ana","email":"imported@x.io"},
                {"id":"u2","name":"Bo","email":"bo@x.io"},
                {"id":"unassigned","name":"Nobody","email":""}
            ]}"#,
        )
        .unwrap();
        let summary = db.import(snapshot);
        assert_eq!(summary.users_added, 1);
        assert_eq!(db.user("u1").unwrap().email, "local@x.io");
        assert_eq!(db.user("u2").unwrap().name, "Bo");
        assert_eq!(db.user(UNASSIGNED_USER_ID).unwrap().name, "Unassigned");
    }

    #[test]
    fn test_directories_prefer_imported_and_history_unions() {
        let mut db = Database::default();
        db.set_directory("acme", PathBuf::from("/old"));
        db.set_directory("beta", PathBuf::from("/beta"));
        db.project_history.push("ACME");
        let snapshot = parse(
            r#"{"tasks": [], "directories": {"ACME": "/new"}, "projectHistory": ["ZED", "ACME"]}"#,
        )
        .unwrap();
        db.import(snapshot);
        assert_eq!(db.directories["ACME"], PathBuf::from("/new"));
        assert_eq!(db.directories["BETA"], PathBuf::from("/beta"));
        assert_eq!(db.project_history.names(), ["ACME", "ZED"]);
    }

    #[test]
    fn test_tasks_merge_by_id_last_write_wins() {
        let mut db = Database::default();
        let older = db.add_task(NewTask::titled("local older"), T0).unwrap();
        let newer = db.add_task(NewTask::titled("local newer"), T0 + 100).unwrap();
        let json = format!(
            r#"{{"tasks": [
                {{"id":"{older}","title":"imported","createdAt":{T0},"updatedAt":{}}},
                {{"id":"{newer}","title":"imported stale","createdAt":{T0},"updatedAt":{T0}}},
                {{"id":"fresh","title":"brand new","project":"gamma","assignedTo":"ghost"}}
            ]}}"#,
            T0 + 50
        );
        let summary = db.import(parse(&json).unwrap());
        assert_eq!(
            (summary.tasks_added, summary.tasks_updated, summary.tasks_kept),
            (1, 1, 1)
        );
        assert_eq!(db.get(&older).unwrap().title, "imported");
        assert_eq!(db.get(&newer).unwrap().title, "local newer");
        let fresh = db.get("fresh").unwrap();
        assert_eq!(fresh.project, "GAMMA");
        assert_eq!(fresh.assigned_to, UNASSIGNED_USER_ID);
        assert!(db.project_history.names().contains(&"GAMMA".to_string()));
    }

    #[test]
    fn test_imported_history_is_normalised_against_local_names() {
        let mut db = Database::default();
        db.add_task(NewTask { project: Some("acme".into()), ..NewTask::titled("a") }, T0).unwrap();
        let snapshot = parse(r#"{"tasks": [], "projectHistory": ["acme", "Beta", "BETA"]}"#).unwrap();
        db.import(snapshot);
        assert_eq!(db.project_history.names(), ["ACME", "BETA"]);
        assert_eq!(db.project_history.suggest("a"), ["ACME"]);
    }

    #[test]
    fn test_replaced_task_records_its_project() {
        let mut db = Database::default();
        let id = db.add_task(NewTask { project: Some("acme".into()), ..NewTask::titled("a") }, T0).unwrap();
        let json = format!(
            r#"{{"tasks": [{{"id":"{id}","title":"a","project":"zeta","createdAt":{T0},"updatedAt":{}}}]}}"#,
            T0 + 10
        );
        let summary = db.import(parse(&json).unwrap());
        assert_eq!(summary.tasks_updated, 1);
        assert_eq!(db.get(&id).unwrap().project, "ZETA");
        assert_eq!(db.project_history.names(), ["ACME", "ZETA"]);
    }
}
