//! Project tracking: completion stats, auto-archive eligibility, name history
//! and colour assignment.
//!
//! A project is not a stored entity; it is the upper-cased `project` key that
//! tasks share. Stats are derived from the active (non-archived) tasks on
//! every call.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::clock::{Millis, DAY_MS};
use crate::task::{percent_rounded, Task};

/// Bucket for tasks without a project.
pub const DEFAULT_PROJECT: &str = "DIVERS";

/// A fully done project is archived once it has stayed done this long.
pub const AUTO_ARCHIVE_AFTER_MS: Millis = 2 * DAY_MS;

/// Normalise a project name for storage: trimmed and upper-cased, with blank
/// names falling back to [`DEFAULT_PROJECT`].
pub fn normalise_project(raw: &str) -> String {
    let name = raw.trim();
    if name.is_empty() {
        DEFAULT_PROJECT.to_string()
    } else {
        name.to_uppercase()
    }
}

/// Completion summary for one project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectStat {
    pub project: String,
    pub total: usize,
    pub done: usize,
    pub pct: u8,
    /// Latest `updated_at` among done tasks; only set when `pct == 100`.
    pub completed_at: Option<Millis>,
}

/// Per-project totals over active tasks, ordered by project name.
pub fn compute_project_stats<'a>(tasks: impl IntoIterator<Item = &'a Task>) -> Vec<ProjectStat> {
    #[derive(Default)]
    struct Acc {
        total: usize,
        done: usize,
        last_done: Option<Millis>,
    }

    let mut by_project: BTreeMap<String, Acc> = BTreeMap::new();
    for task in tasks.into_iter().filter(|t| !t.archived) {
        let acc = by_project.entry(normalise_project(&task.project)).or_default();
        acc.total += 1;
        if task.is_done() {
            acc.done += 1;
            acc.last_done = acc.last_done.max(Some(task.updated_at));
        }
    }

    by_project
        .into_iter()
        .map(|(project, acc)| {
            let pct = percent_rounded(acc.done, acc.total);
            ProjectStat {
                project,
                total: acc.total,
                done: acc.done,
                pct,
                completed_at: if pct == 100 { acc.last_done } else { None },
            }
        })
        .collect()
}

/// Projects that are 100% done and have been for at least two days.
pub fn auto_archive_eligible(stats: &[ProjectStat], now: Millis) -> Vec<String> {
    stats
        .iter()
        .filter(|s| s.pct == 100)
        .filter_map(|s| {
            let completed_at = s.completed_at?;
            (now - completed_at >= AUTO_ARCHIVE_AFTER_MS).then(|| s.project.clone())
        })
        .collect()
}

/// Most-recently-used project names, unique, newest first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct ProjectHistory(Vec<String>);

impl From<Vec<String>> for ProjectHistory {
    fn from(names: Vec<String>) -> Self {
        ProjectHistory::new(names)
    }
}

impl From<ProjectHistory> for Vec<String> {
    fn from(history: ProjectHistory) -> Self {
        history.0
    }
}

impl ProjectHistory {
    /// Build from stored or imported names, oldest duplicates dropped.
    /// Names are normalised, so "acme" and "ACME" collapse into one entry.
    pub fn new(names: Vec<String>) -> Self {
        let mut history = ProjectHistory::default();
        for name in names.into_iter().rev() {
            history.push(&name);
        }
        history
    }

    /// Move `name` to the front. The default bucket is never recorded.
    pub fn push(&mut self, name: &str) {
        let Some(key) = history_key(name) else {
            return;
        };
        self.0.retain(|n| *n != key);
        self.0.insert(0, key);
    }

    /// Add `name` at the back unless it is already known.
    pub fn append(&mut self, name: &str) {
        let Some(key) = history_key(name) else {
            return;
        };
        if !self.0.contains(&key) {
            self.0.push(key);
        }
    }

    /// Append names not yet present, keeping the existing order in front.
    pub fn union(&mut self, other: &ProjectHistory) {
        for name in &other.0 {
            self.append(name);
        }
    }

    /// Recorded names, newest first.
    pub fn names(&self) -> &[String] {
        &self.0
    }

    /// Autocomplete candidates for `prefix`, in history order.
    pub fn suggest(&self, prefix: &str) -> Vec<&str> {
        let prefix = prefix.trim().to_uppercase();
        self.0
            .iter()
            .filter(|n| n.starts_with(&prefix))
            .map(String::as_str)
            .collect()
    }
}

/// Normalised history entry for `name`, `None` for the default bucket.
fn history_key(name: &str) -> Option<String> {
    let key = normalise_project(name);
    (key != DEFAULT_PROJECT).then_some(key)
}

/// Default palette for project badges.
pub fn default_palette() -> Vec<String> {
    ["#3b82f6", "#10b981", "#f59e0b", "#ef4444", "#8b5cf6", "#ec4899", "#14b8a6", "#f97316"]
        .iter()
        .map(|c| c.to_string())
        .collect()
}

/// Deterministic project → palette colour mapping with a memo table.
///
/// Owned by whoever renders; there is no process-wide instance.
#[derive(Debug, Clone)]
pub struct ProjectColors {
    palette: Vec<String>,
    cache: HashMap<String, usize>,
}

impl ProjectColors {
    /// An empty palette is replaced with the default one.
    pub fn new(palette: Vec<String>) -> Self {
        let palette = if palette.is_empty() { default_palette() } else { palette };
        ProjectColors {
            palette,
            cache: HashMap::new(),
        }
    }

    /// Sum of the name's char codes modulo the palette size.
    pub fn palette_index(&self, project: &str) -> usize {
        let sum: u64 = project.chars().map(|c| c as u64).sum();
        (sum % self.palette.len() as u64) as usize
    }

    /// Palette entry for `project`, memoised per name.
    pub fn color_for(&mut self, project: &str) -> &str {
        let idx = match self.cache.get(project) {
            Some(&idx) => idx,
            None => {
                let idx = self.palette_index(project);
                self.cache.insert(project.to_string(), idx);
                idx
            }
        };
        &self.palette[idx]
    }
}

impl Default for ProjectColors {
    fn default() -> Self {
        ProjectColors::new(default_palette())
    }
}
