//! The task store and its state transitions.
//!
//! `Database` owns the canonical task list together with the users, the
//! project-name history and the project directory map. Every change goes
//! through a named operation here so the lifecycle invariants hold after each
//! call:
//!
//! - `completed_at` is set iff the task is done
//! - `archived_at` is set iff the task is archived
//! - every field mutation refreshes `updated_at`; archive/unarchive do not
//! - `assigned_to` names an existing user or the placeholder user

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::clock::Millis;
use crate::error::{Error, Result};
use crate::fields::{Priority, Status, StatusSet};
use crate::migrate::{migrate_task, LegacyTask, SCHEMA_VERSION};
use crate::project::{
    auto_archive_eligible, compute_project_stats, normalise_project, ProjectHistory, ProjectStat,
};
use crate::task::{new_id, non_blank, NewTask, Subtask, Task, DEFAULT_TITLE};
use crate::user::{ensure_unassigned, validate_user_fields, User, UNASSIGNED_USER_ID};

/// In-memory store for one board.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Database {
    pub version: u32,
    pub tasks: Vec<Task>,
    pub users: Vec<User>,
    pub project_history: ProjectHistory,
    /// Project key → folder on disk.
    pub directories: BTreeMap<String, PathBuf>,
    #[serde(skip)]
    statuses: StatusSet,
}

/// The persisted shape, accepting files from any schema version.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct StoredDatabase {
    version: Option<u32>,
    tasks: Vec<LegacyTask>,
    users: Vec<User>,
    project_history: Vec<String>,
    directories: BTreeMap<String, PathBuf>,
}

impl Default for Database {
    fn default() -> Self {
        Database::new(StatusSet::default())
    }
}

impl Database {
    /// Empty board accepting `statuses`, with only the placeholder user.
    pub fn new(statuses: StatusSet) -> Self {
        Database {
            version: SCHEMA_VERSION,
            tasks: Vec::new(),
            users: vec![User::unassigned()],
            project_history: ProjectHistory::default(),
            directories: BTreeMap::new(),
            statuses,
        }
    }

    /// Load from a JSON file, starting empty if it does not exist yet.
    ///
    /// Every stored task passes through [`migrate_task`].
    pub fn load(path: &Path, statuses: StatusSet, now: Millis) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "no data file yet, starting empty");
            return Ok(Database::new(statuses));
        }
        let mut buf = String::new();
        File::open(path)?.read_to_string(&mut buf)?;
        let stored: StoredDatabase = serde_json::from_str(&buf)?;
        let version = stored.version.unwrap_or(1);
        if version < SCHEMA_VERSION {
            info!(from = version, to = SCHEMA_VERSION, "migrating data file");
        }
        Ok(Database::from_stored(stored, statuses, now))
    }

    fn from_stored(stored: StoredDatabase, statuses: StatusSet, now: Millis) -> Self {
        let mut db = Database {
            version: SCHEMA_VERSION,
            tasks: Vec::with_capacity(stored.tasks.len()),
            users: stored.users,
            project_history: ProjectHistory::new(stored.project_history),
            directories: stored.directories,
            statuses,
        };
        ensure_unassigned(&mut db.users);
        for raw in stored.tasks {
            let mut task = migrate_task(raw, &db.statuses, now);
            task.assigned_to = db.resolve_user(Some(task.assigned_to.as_str()));
            db.tasks.push(task);
        }
        db
    }

    /// Save to a JSON file using atomic write (temp file + rename).
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let tmp = path.with_extension("json.tmp");
        let data = serde_json::to_string_pretty(self)?;
        let mut f = File::create(&tmp)?;
        f.write_all(data.as_bytes())?;
        f.flush()?;
        fs::rename(tmp, path)?;
        debug!(path = %path.display(), tasks = self.tasks.len(), "saved");
        Ok(())
    }

    /// Columns this board accepts, in display order.
    pub fn statuses(&self) -> &StatusSet {
        &self.statuses
    }

    /// Task by exact id.
    pub fn get(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    fn task_mut(&mut self, id: &str) -> Result<&mut Task> {
        self.tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| Error::TaskNotFound(id.to_string()))
    }

    /// Tasks shown on the board, stats and filters.
    pub fn active(&self) -> impl Iterator<Item = &Task> {
        self.tasks.iter().filter(|t| !t.archived)
    }

    /// Tasks shown only in the archive view.
    pub fn archived(&self) -> impl Iterator<Item = &Task> {
        self.tasks.iter().filter(|t| t.archived)
    }

    /// Resolve a task identifier: exact id, unique id prefix, or unique
    /// case-insensitive title.
    pub fn resolve(&self, identifier: &str) -> Result<String> {
        let needle = identifier.trim();
        if let Some(t) = self.get(needle) {
            return Ok(t.id.clone());
        }
        let lower = needle.to_lowercase();
        let by_prefix: Vec<&Task> = self
            .tasks
            .iter()
            .filter(|t| !lower.is_empty() && t.id.starts_with(&lower))
            .collect();
        let matches: Vec<&Task> = if by_prefix.is_empty() {
            self.tasks
                .iter()
                .filter(|t| t.title.to_lowercase() == lower)
                .collect()
        } else {
            by_prefix
        };
        match matches.as_slice() {
            [] => Err(Error::TaskNotFound(needle.to_string())),
            [one] => Ok(one.id.clone()),
            many => {
                let mut msg = format!("'{needle}' matches {} tasks:", many.len());
                for t in many {
                    msg.push_str(&format!("\n  {} {} [{}]", t.id, t.title, t.project));
                }
                msg.push_str("\nPlease use the full id instead.");
                Err(Error::InvalidArgument(msg))
            }
        }
    }

    // ---- task lifecycle ----------------------------------------------------

    /// Create a task and return its id.
    pub fn add_task(&mut self, new: NewTask, now: Millis) -> Result<String> {
        let status = new.status.unwrap_or(Status::Todo);
        self.check_status(status)?;
        let project = normalise_project(new.project.as_deref().unwrap_or_default());
        let task = Task {
            id: new_id(),
            title: non_blank(&new.title).unwrap_or(DEFAULT_TITLE).to_string(),
            project: project.clone(),
            due: new.due,
            priority: new.priority,
            status,
            assigned_to: self.resolve_user(new.assigned_to.as_deref()),
            created_at: now,
            updated_at: now,
            completed_at: (status == Status::Done).then_some(now),
            archived: false,
            archived_at: None,
            subtasks: Vec::new(),
            notes: new.notes,
        };
        let id = task.id.clone();
        debug!(task = %id, project = %project, %status, "task added");
        self.tasks.push(task);
        self.project_history.push(&project);
        Ok(id)
    }

    /// Move a task to another column. Entering `done` stamps `completed_at`,
    /// leaving it clears the stamp.
    pub fn set_status(&mut self, id: &str, status: Status, now: Millis) -> Result<()> {
        self.check_status(status)?;
        let task = self.task_mut(id)?;
        let from = task.status;
        task.transition(status, now);
        debug!(task = %id, %from, to = %status, "status changed");
        Ok(())
    }

    /// Set or clear the due date.
    pub fn set_due(&mut self, id: &str, due: Option<NaiveDate>, now: Millis) -> Result<()> {
        let task = self.task_mut(id)?;
        task.due = due;
        task.updated_at = now;
        Ok(())
    }

    /// Change a task's priority.
    pub fn set_priority(&mut self, id: &str, priority: Priority, now: Millis) -> Result<()> {
        let task = self.task_mut(id)?;
        task.priority = priority;
        task.updated_at = now;
        Ok(())
    }

    /// Rename a task. Blank titles are rejected.
    pub fn rename(&mut self, id: &str, title: &str, now: Millis) -> Result<()> {
        let title = non_blank(title).ok_or_else(|| Error::invalid_field("title", "cannot be blank"))?;
        let task = self.task_mut(id)?;
        task.title = title.to_string();
        task.updated_at = now;
        Ok(())
    }

    /// Move a task to a project, recording the name in the history.
    pub fn set_project(&mut self, id: &str, project: &str, now: Millis) -> Result<()> {
        let project = normalise_project(project);
        let task = self.task_mut(id)?;
        task.project = project.clone();
        task.updated_at = now;
        self.project_history.push(&project);
        Ok(())
    }

    /// Assign a task. Unknown user ids fall back to the placeholder user.
    pub fn assign(&mut self, id: &str, user_id: &str, now: Millis) -> Result<()> {
        let user = self.resolve_user(Some(user_id));
        let task = self.task_mut(id)?;
        task.assigned_to = user;
        task.updated_at = now;
        Ok(())
    }

    /// Replace a task's free-text notes.
    pub fn set_notes(&mut self, id: &str, notes: &str, now: Millis) -> Result<()> {
        let task = self.task_mut(id)?;
        task.notes = notes.to_string();
        task.updated_at = now;
        Ok(())
    }

    /// Archive one task. Already-archived tasks are left untouched.
    pub fn archive(&mut self, id: &str, now: Millis) -> Result<bool> {
        let changed = self.task_mut(id)?.archive(now);
        if changed {
            debug!(task = %id, "archived");
        }
        Ok(changed)
    }

    /// Put an archived task back on the board. Returns false when it was not
    /// archived; `updated_at` is left alone either way.
    pub fn unarchive(&mut self, id: &str) -> Result<bool> {
        let changed = self.task_mut(id)?.unarchive();
        if changed {
            debug!(task = %id, "unarchived");
        }
        Ok(changed)
    }

    /// Archive every task of a project, done or not. Returns the ids that
    /// changed.
    pub fn archive_project(&mut self, project: &str, now: Millis) -> Vec<String> {
        let project = normalise_project(project);
        let ids: Vec<String> = self
            .tasks
            .iter_mut()
            .filter(|t| t.project == project)
            .filter_map(|t| t.archive(now).then(|| t.id.clone()))
            .collect();
        if !ids.is_empty() {
            info!(project = %project, count = ids.len(), "project archived");
        }
        ids
    }

    /// Midnight sweep: archive every done task that is still active.
    pub fn archive_done(&mut self, now: Millis) -> usize {
        let mut count = 0;
        for task in self.tasks.iter_mut().filter(|t| t.is_done()) {
            if task.archive(now) {
                count += 1;
            }
        }
        if count > 0 {
            info!(count, "archived done tasks");
        }
        count
    }

    /// Hard removal by id.
    pub fn delete(&mut self, id: &str) -> Result<Task> {
        let idx = self
            .tasks
            .iter()
            .position(|t| t.id == id)
            .ok_or_else(|| Error::TaskNotFound(id.to_string()))?;
        debug!(task = %id, "deleted");
        Ok(self.tasks.remove(idx))
    }

    /// Completion stats of every project with active tasks.
    pub fn project_stats(&self) -> Vec<ProjectStat> {
        compute_project_stats(&self.tasks)
    }

    /// Archive every project that has been fully done for two days.
    ///
    /// Hosts call this after each change to the task list, since completion
    /// times move whenever a done task is edited. Returns the projects
    /// archived.
    pub fn reconcile(&mut self, now: Millis) -> Vec<String> {
        let eligible = auto_archive_eligible(&self.project_stats(), now);
        for project in &eligible {
            self.archive_project(project, now);
        }
        eligible
    }

    // ---- subtasks ------------------------------------------------------------

    /// Append a subtask. Blank titles are ignored and yield `None`.
    pub fn add_subtask(&mut self, task_id: &str, title: &str, now: Millis) -> Result<Option<String>> {
        let task = self.task_mut(task_id)?;
        let Some(title) = non_blank(title) else {
            return Ok(None);
        };
        let subtask = Subtask::new(title, now);
        let id = subtask.id.clone();
        task.subtasks.push(subtask);
        task.updated_at = now;
        Ok(Some(id))
    }

    /// Flip a subtask's completion.
    pub fn toggle_subtask(&mut self, task_id: &str, subtask_id: &str, now: Millis) -> Result<bool> {
        let task = self.task_mut(task_id)?;
        let subtask = find_subtask(task, subtask_id)?;
        subtask.toggle(now);
        let completed = subtask.completed;
        task.updated_at = now;
        Ok(completed)
    }

    /// Remove a subtask from its task.
    pub fn delete_subtask(&mut self, task_id: &str, subtask_id: &str, now: Millis) -> Result<()> {
        let task = self.task_mut(task_id)?;
        let before = task.subtasks.len();
        task.subtasks.retain(|s| s.id != subtask_id);
        if task.subtasks.len() == before {
            return Err(Error::SubtaskNotFound {
                task: task_id.to_string(),
                subtask: subtask_id.to_string(),
            });
        }
        task.updated_at = now;
        Ok(())
    }

    /// Rename a subtask. Blank titles are ignored.
    pub fn update_subtask_title(
        &mut self,
        task_id: &str,
        subtask_id: &str,
        title: &str,
        now: Millis,
    ) -> Result<bool> {
        let task = self.task_mut(task_id)?;
        let subtask = find_subtask(task, subtask_id)?;
        let Some(title) = non_blank(title) else {
            return Ok(false);
        };
        subtask.title = title.to_string();
        task.updated_at = now;
        Ok(true)
    }

    /// Move the subtask at `from` so it ends up at `to`.
    ///
    /// An out-of-range `from` is a no-op; `to` is clamped to the last slot.
    pub fn reorder_subtasks(&mut self, task_id: &str, from: usize, to: usize, now: Millis) -> Result<bool> {
        let task = self.task_mut(task_id)?;
        let len = task.subtasks.len();
        if from >= len {
            return Ok(false);
        }
        let to = to.min(len - 1);
        let moved = task.subtasks.remove(from);
        task.subtasks.insert(to, moved);
        task.updated_at = now;
        Ok(true)
    }

    // ---- users -----------------------------------------------------------------

    /// User by exact id.
    pub fn user(&self, id: &str) -> Option<&User> {
        self.users.iter().find(|u| u.id == id)
    }

    /// Existing user id, or the placeholder user.
    fn resolve_user(&self, id: Option<&str>) -> String {
        match id.map(str::trim).filter(|id| !id.is_empty()) {
            Some(id) if self.user(id).is_some() => id.to_string(),
            Some(id) => {
                debug!(user = id, "unknown assignee, using placeholder");
                UNASSIGNED_USER_ID.to_string()
            }
            None => UNASSIGNED_USER_ID.to_string(),
        }
    }

    /// Create a user from a validated name and email; returns the new id.
    pub fn add_user(&mut self, name: &str, email: &str) -> Result<String> {
        let (name, email) = validate_user_fields(name, email)?;
        let user = User {
            id: new_id(),
            name: name.to_string(),
            email: email.to_string(),
        };
        let id = user.id.clone();
        self.users.push(user);
        Ok(id)
    }

    /// Edit a user. Both fields are validated before anything is written.
    pub fn update_user(&mut self, id: &str, name: &str, email: &str) -> Result<()> {
        let (name, email) = validate_user_fields(name, email)?;
        let user = self
            .users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or_else(|| Error::UserNotFound(id.to_string()))?;
        user.name = name.to_string();
        user.email = email.to_string();
        Ok(())
    }

    /// Remove a user; their tasks go back to the placeholder user. The
    /// placeholder itself cannot be removed.
    pub fn delete_user(&mut self, id: &str, now: Millis) -> Result<User> {
        if id == UNASSIGNED_USER_ID {
            return Err(Error::ProtectedUser(id.to_string()));
        }
        let idx = self
            .users
            .iter()
            .position(|u| u.id == id)
            .ok_or_else(|| Error::UserNotFound(id.to_string()))?;
        let user = self.users.remove(idx);
        for task in self.tasks.iter_mut().filter(|t| t.assigned_to == id) {
            task.assigned_to = UNASSIGNED_USER_ID.to_string();
            task.updated_at = now;
        }
        Ok(user)
    }

    // ---- project directories ---------------------------------------------------

    /// Link a project to a folder on disk, replacing any earlier link.
    pub fn set_directory(&mut self, project: &str, path: PathBuf) {
        self.directories.insert(normalise_project(project), path);
    }

    /// The folder linked to a project, checked to exist.
    pub fn project_directory(&self, project: &str) -> Result<&Path> {
        let key = normalise_project(project);
        let path = self
            .directories
            .get(&key)
            .ok_or_else(|| Error::DirectoryNotSet(key.clone()))?;
        if !path.is_dir() {
            return Err(Error::DirectoryMissing(path.clone()));
        }
        Ok(path.as_path())
    }

    fn check_status(&self, status: Status) -> Result<()> {
        if self.statuses.contains(status) {
            Ok(())
        } else {
            Err(Error::StatusNotAllowed(status))
        }
    }
}

fn find_subtask<'a>(task: &'a mut Task, subtask_id: &str) -> Result<&'a mut Subtask> {
    let task_id = task.id.clone();
    task.subtasks
        .iter_mut()
        .find(|s| s.id == subtask_id)
        .ok_or_else(|| Error::SubtaskNotFound {
            task: task_id,
            subtask: subtask_id.to_string(),
        })
}
