//! Command implementations for the CLI interface.
//!
//! Each subcommand loads the board, applies one named operation from
//! [`crate::db::Database`], re-checks project auto-archiving and saves. The
//! handlers return errors instead of exiting so `main` can map them to exit
//! codes.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration as StdDuration;

use chrono::{Datelike, Duration, Local, NaiveDate, TimeZone, Utc};
use clap::Subcommand;
use clap_complete::{generate, Shell};
use tracing::{info, warn};

use crate::clock::{Clock, Millis};
use crate::db::Database;
use crate::error::{Error, Result};
use crate::fields::{format_priority, Priority, Status};
use crate::project::ProjectColors;
use crate::schedule::MidnightSweep;
use crate::snapshot::Snapshot;
use crate::task::{NewTask, Task};
use crate::urgency::{board, classify, UrgencyTier};

#[derive(Subcommand)]
pub enum Commands {
    /// Add a new task.
    Add {
        /// Short title for the task.
        title: String,
        /// Project name (stored upper-case).
        #[arg(long)]
        project: Option<String>,
        /// Due date: YYYY-MM-DD, "today", "tomorrow", "friday", "in Nd".
        #[arg(long)]
        due: Option<String>,
        #[arg(long, value_enum, default_value_t = Priority::Medium)]
        priority: Priority,
        #[arg(long, value_enum, default_value_t = Status::Todo)]
        status: Status,
        /// User id to assign.
        #[arg(long)]
        assign: Option<String>,
        #[arg(long)]
        notes: Option<String>,
    },

    /// Show the board, one column per status, most urgent first.
    List {
        /// Only this column.
        #[arg(long, value_enum)]
        status: Option<Status>,
        /// Only this project.
        #[arg(long)]
        project: Option<String>,
        /// Only stale `doing` tasks.
        #[arg(long)]
        stale: bool,
        /// Show the archive instead of the board.
        #[arg(long)]
        archived: bool,
    },

    /// View a single task by id, id prefix or title.
    View { id: String },

    /// Move a task to another column.
    Move {
        id: String,
        #[arg(value_enum)]
        status: Status,
    },

    /// Update fields on a task.
    Update {
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        project: Option<String>,
        #[arg(long)]
        due: Option<String>,
        /// Clear the due date.
        #[arg(long, conflicts_with = "due")]
        clear_due: bool,
        #[arg(long, value_enum)]
        priority: Option<Priority>,
        /// User id to assign.
        #[arg(long)]
        assign: Option<String>,
        #[arg(long)]
        notes: Option<String>,
    },

    /// Archive a task, or every task of a project.
    Archive {
        /// Task to archive (mutually exclusive with --project)
        id: Option<String>,
        /// Archive the whole project
        #[arg(long, conflicts_with = "id")]
        project: Option<String>,
    },

    /// Bring an archived task back to the board.
    Unarchive { id: String },

    /// Permanently delete an archived task.
    Delete { id: String },

    /// Manage a task's checklist.
    Subtask {
        #[command(subcommand)]
        action: SubtaskAction,
    },

    /// Project completion stats.
    Projects,

    /// Recently used project names, optionally filtered by prefix.
    History { prefix: Option<String> },

    /// Archive done tasks and fully completed projects now.
    Sweep,

    /// Stay running and sweep done tasks every midnight.
    Watch {
        /// Seconds between checks of the data file.
        #[arg(long, default_value_t = 60)]
        interval: u64,
    },

    /// Manage users.
    User {
        #[command(subcommand)]
        action: UserAction,
    },

    /// Link projects to folders on disk.
    Dir {
        #[command(subcommand)]
        action: DirAction,
    },

    /// Export the board as a JSON snapshot.
    Export {
        /// Output file path (default: stdout)
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Merge a JSON snapshot into the board.
    Import {
        input: PathBuf,
        /// Skip creating backup before import
        #[arg(long)]
        no_backup: bool,
    },

    /// Generate shell completion scripts.
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand)]
pub enum SubtaskAction {
    /// Append a checklist item.
    Add { id: String, title: String },
    /// Tick or untick an item (1-based position or id).
    Toggle { id: String, subtask: String },
    /// Rename an item.
    Rename {
        id: String,
        subtask: String,
        title: String,
    },
    /// Remove an item.
    Rm { id: String, subtask: String },
    /// Move an item from one 1-based position to another.
    Mv { id: String, from: usize, to: usize },
}

#[derive(Subcommand)]
pub enum UserAction {
    /// List users.
    List,
    Add { name: String, email: String },
    Edit {
        id: String,
        name: String,
        email: String,
    },
    Rm { id: String },
}

#[derive(Subcommand)]
pub enum DirAction {
    /// Link a project to a folder.
    Set { project: String, path: PathBuf },
    /// Print a project's folder, checking that it exists.
    Show { project: String },
}

/// Re-check project auto-archiving, then save.
fn commit(db: &mut Database, db_path: &Path, now: Millis) -> Result<()> {
    for project in db.reconcile(now) {
        println!("Project {project} has been done for two days; archived.");
    }
    db.save(db_path)
}

/// Create a task from the command-line fields.
pub fn cmd_add(
    db: &mut Database,
    db_path: &Path,
    clock: &dyn Clock,
    title: String,
    project: Option<String>,
    due: Option<String>,
    priority: Priority,
    status: Status,
    assign: Option<String>,
    notes: Option<String>,
) -> Result<()> {
    let due = due
        .as_deref()
        .map(|s| parse_due_arg(s, clock.today()))
        .transpose()?;
    let now = clock.now();
    let id = db.add_task(
        NewTask {
            title,
            project,
            due,
            priority,
            status: Some(status),
            assigned_to: assign,
            notes: notes.unwrap_or_default(),
        },
        now,
    )?;
    commit(db, db_path, now)?;
    println!("Added task {id}");
    Ok(())
}

/// Print the board, or the archive with `--archived`.
pub fn cmd_list(
    db: &Database,
    clock: &dyn Clock,
    colors: &mut ProjectColors,
    status: Option<Status>,
    project: Option<String>,
    stale: bool,
    archived: bool,
) -> Result<()> {
    let today = clock.today();
    let now = clock.now();
    let project = project.map(|p| crate::project::normalise_project(&p));
    let keep = |t: &&Task| {
        project.as_ref().map_or(true, |p| &t.project == p)
            && (!stale || classify(t, today, now).stale)
    };

    if archived {
        let mut tasks: Vec<&Task> = db.archived().filter(keep).collect();
        tasks.sort_by_key(|t| std::cmp::Reverse(t.archived_at));
        println!("{:<10} {:<12} {:<14} {}", "ID", "Archived", "Project", "Title");
        for t in tasks {
            println!(
                "{:<10} {:<12} {:<14} {}",
                short_id(&t.id),
                t.archived_at.map(format_date).unwrap_or_else(|| "-".into()),
                truncate(&t.project, 14),
                t.title
            );
        }
        return Ok(());
    }

    for column in board(db.active().filter(keep), db.statuses(), today) {
        if status.is_some_and(|s| s != column.status) {
            continue;
        }
        println!("== {} ({})", column.status.title(), column.tasks.len());
        print_column(&column.tasks, today, now, colors);
        println!();
    }
    Ok(())
}

/// Print one column's cards in a table.
fn print_column(tasks: &[&Task], today: NaiveDate, now: Millis, colors: &mut ProjectColors) {
    for t in tasks {
        let urgency = classify(t, today, now);
        let marker = match urgency.tier {
            UrgencyTier::Overdue => "!!",
            UrgencyTier::Critical => "! ",
            UrgencyTier::Warning => "~ ",
            UrgencyTier::Normal | UrgencyTier::None => "  ",
        };
        let progress = t
            .subtask_progress()
            .map(|p| format!(" [{}/{}]", p.completed, p.total))
            .unwrap_or_default();
        println!(
            "{} {:<10} {:<7} {:<14} {:<9} {:<26} {}{}{}",
            marker,
            short_id(&t.id),
            format_priority(t.priority),
            truncate(&t.project, 14),
            colors.color_for(&t.project),
            urgency.label(),
            t.title,
            progress,
            if urgency.stale { " (stale)" } else { "" },
        );
    }
}

/// Print every field of one task, its countdown and its checklist.
pub fn cmd_view(db: &Database, clock: &dyn Clock, id: String) -> Result<()> {
    let task_id = db.resolve(&id)?;
    let task = db.get(&task_id).ok_or(Error::TaskNotFound(task_id.clone()))?;
    let urgency = classify(task, clock.today(), clock.now());
    let assignee = db
        .user(&task.assigned_to)
        .map(|u| u.name.clone())
        .unwrap_or_else(|| task.assigned_to.clone());

    println!("ID:           {}", task.id);
    println!("Title:        {}", task.title);
    println!("Status:       {}", task.status.title());
    println!("Priority:     {}", format_priority(task.priority));
    println!("Project:      {}", task.project);
    println!("Assigned to:  {}", assignee);
    println!(
        "Due:          {}",
        match task.due {
            Some(d) => format!("{d} ({})", urgency.label()),
            None => "-".into(),
        }
    );
    if urgency.stale {
        println!("Stale:        untouched in doing for more than 3 days");
    }
    println!("Created:      {}", format_timestamp(task.created_at));
    println!("Updated:      {}", format_timestamp(task.updated_at));
    if let Some(at) = task.completed_at {
        println!("Completed:    {}", format_timestamp(at));
    }
    if let Some(at) = task.archived_at {
        println!("Archived:     {}", format_timestamp(at));
    }
    match task.subtask_progress() {
        Some(p) => {
            println!("Subtasks:     {}/{} ({}%)", p.completed, p.total, p.percentage);
            for (i, s) in task.subtasks.iter().enumerate() {
                println!("  {}. [{}] {}", i + 1, if s.completed { "x" } else { " " }, s.title);
            }
        }
        None => println!("Subtasks:     -"),
    }
    println!("Notes:\n{}\n", if task.notes.is_empty() { "-" } else { task.notes.as_str() });
    Ok(())
}

/// Move a task to another column.
pub fn cmd_move(db: &mut Database, db_path: &Path, clock: &dyn Clock, id: String, status: Status) -> Result<()> {
    let task_id = db.resolve(&id)?;
    let now = clock.now();
    db.set_status(&task_id, status, now)?;
    commit(db, db_path, now)?;
    println!("Moved {} to {}", short_id(&task_id), status.title());
    Ok(())
}

/// Apply the given field changes to one task.
pub fn cmd_update(
    db: &mut Database,
    db_path: &Path,
    clock: &dyn Clock,
    id: String,
    title: Option<String>,
    project: Option<String>,
    due: Option<String>,
    clear_due: bool,
    priority: Option<Priority>,
    assign: Option<String>,
    notes: Option<String>,
) -> Result<()> {
    let task_id = db.resolve(&id)?;
    // Parse everything up front so a bad date leaves the task untouched.
    let due = due
        .as_deref()
        .map(|s| parse_due_arg(s, clock.today()))
        .transpose()?;
    let now = clock.now();

    if let Some(title) = title {
        db.rename(&task_id, &title, now)?;
    }
    if let Some(project) = project {
        db.set_project(&task_id, &project, now)?;
    }
    if clear_due {
        db.set_due(&task_id, None, now)?;
    } else if let Some(due) = due {
        db.set_due(&task_id, Some(due), now)?;
    }
    if let Some(priority) = priority {
        db.set_priority(&task_id, priority, now)?;
    }
    if let Some(user) = assign {
        db.assign(&task_id, &user, now)?;
    }
    if let Some(notes) = notes {
        db.set_notes(&task_id, &notes, now)?;
    }
    commit(db, db_path, now)?;
    println!("Updated {}", short_id(&task_id));
    Ok(())
}

/// Archive one task, or every task of `--project`.
pub fn cmd_archive(
    db: &mut Database,
    db_path: &Path,
    clock: &dyn Clock,
    id: Option<String>,
    project: Option<String>,
) -> Result<()> {
    let now = clock.now();
    match (id, project) {
        (Some(id), None) => {
            let task_id = db.resolve(&id)?;
            if db.archive(&task_id, now)? {
                println!("Archived {}", short_id(&task_id));
            } else {
                println!("{} was already archived", short_id(&task_id));
            }
        }
        (None, Some(project)) => {
            let ids = db.archive_project(&project, now);
            println!("Archived {} task(s)", ids.len());
        }
        _ => {
            return Err(Error::InvalidArgument(
                "specify exactly one of <ID> or --project".into(),
            ))
        }
    }
    commit(db, db_path, now)
}

/// Bring a task back to the board.
///
/// A task whose project is still complete is archived again by the
/// auto-archive check, and the message says so.
pub fn cmd_unarchive(db: &mut Database, db_path: &Path, clock: &dyn Clock, id: String) -> Result<()> {
    let task_id = db.resolve(&id)?;
    let restored = db.unarchive(&task_id)?;
    commit(db, db_path, clock.now())?;
    match db.get(&task_id) {
        Some(t) if restored && t.archived => println!(
            "{} went straight back to the archive: project {} is complete",
            short_id(&task_id),
            t.project
        ),
        Some(_) if restored => println!("Restored {}", short_id(&task_id)),
        _ => println!("{} is not archived", short_id(&task_id)),
    }
    Ok(())
}

/// Delete only from the archive, as the board does.
pub fn cmd_delete(db: &mut Database, db_path: &Path, clock: &dyn Clock, id: String) -> Result<()> {
    let task_id = db.resolve(&id)?;
    if db.get(&task_id).is_some_and(|t| !t.archived) {
        return Err(Error::NotArchived(task_id));
    }
    let task = db.delete(&task_id)?;
    commit(db, db_path, clock.now())?;
    println!("Deleted {} ({})", short_id(&task.id), task.title);
    Ok(())
}

/// Checklist edits; items are named by 1-based position or id prefix.
pub fn cmd_subtask(db: &mut Database, db_path: &Path, clock: &dyn Clock, action: SubtaskAction) -> Result<()> {
    let now = clock.now();
    match action {
        SubtaskAction::Add { id, title } => {
            let task_id = db.resolve(&id)?;
            match db.add_subtask(&task_id, &title, now)? {
                Some(_) => println!("Added subtask to {}", short_id(&task_id)),
                None => println!("Nothing added: title is blank"),
            }
        }
        SubtaskAction::Toggle { id, subtask } => {
            let task_id = db.resolve(&id)?;
            let subtask_id = resolve_subtask(db, &task_id, &subtask)?;
            let done = db.toggle_subtask(&task_id, &subtask_id, now)?;
            println!("Subtask {}", if done { "completed" } else { "reopened" });
        }
        SubtaskAction::Rename { id, subtask, title } => {
            let task_id = db.resolve(&id)?;
            let subtask_id = resolve_subtask(db, &task_id, &subtask)?;
            if !db.update_subtask_title(&task_id, &subtask_id, &title, now)? {
                println!("Nothing renamed: title is blank");
            }
        }
        SubtaskAction::Rm { id, subtask } => {
            let task_id = db.resolve(&id)?;
            let subtask_id = resolve_subtask(db, &task_id, &subtask)?;
            db.delete_subtask(&task_id, &subtask_id, now)?;
            println!("Removed subtask");
        }
        SubtaskAction::Mv { id, from, to } => {
            let task_id = db.resolve(&id)?;
            if from == 0 || to == 0 {
                return Err(Error::InvalidArgument("positions start at 1".into()));
            }
            if !db.reorder_subtasks(&task_id, from - 1, to - 1, now)? {
                println!("No subtask at position {from}");
            }
        }
    }
    commit(db, db_path, now)
}

/// A subtask named by 1-based position or by id (prefix).
fn resolve_subtask(db: &Database, task_id: &str, needle: &str) -> Result<String> {
    let task = db.get(task_id).ok_or_else(|| Error::TaskNotFound(task_id.to_string()))?;
    let found = match needle.parse::<usize>() {
        Ok(pos) if pos >= 1 => task.subtasks.get(pos - 1),
        _ => task.subtasks.iter().find(|s| s.id.starts_with(&needle.to_lowercase())),
    };
    found.map(|s| s.id.clone()).ok_or_else(|| Error::SubtaskNotFound {
        task: task_id.to_string(),
        subtask: needle.to_string(),
    })
}

/// Print completion stats and the badge colour of each active project.
pub fn cmd_projects(db: &Database, colors: &mut ProjectColors) {
    println!("{:<16} {:<9} {:>5} {:>5} {:>5}  {}", "Project", "Colour", "Done", "Total", "%", "Completed");
    for stat in db.project_stats() {
        println!(
            "{:<16} {:<9} {:>5} {:>5} {:>4}%  {}",
            truncate(&stat.project, 16),
            colors.color_for(&stat.project),
            stat.done,
            stat.total,
            stat.pct,
            stat.completed_at.map(format_timestamp).unwrap_or_else(|| "-".into())
        );
    }
}

/// Print recorded project names, newest first, filtered by prefix.
pub fn cmd_history(db: &Database, prefix: Option<String>) {
    let names = db.project_history.suggest(prefix.as_deref().unwrap_or_default());
    for name in names {
        println!("{name}");
    }
}

/// Run the midnight sweep immediately.
pub fn cmd_sweep(db: &mut Database, db_path: &Path, clock: &dyn Clock) -> Result<()> {
    let now = clock.now();
    let archived = db.archive_done(now);
    println!("Archived {archived} done task(s)");
    commit(db, db_path, now)
}

/// Host loop for the nightly sweep. The data file is reloaded on each tick so
/// edits from other `kb` invocations are picked up.
pub fn cmd_watch(db_path: &Path, clock: &dyn Clock, load: impl Fn() -> Result<Database>, interval: u64) -> Result<()> {
    let mut sweep = MidnightSweep::start(clock);
    info!(path = %db_path.display(), "watching");
    loop {
        let tick = Millis::try_from(interval.max(1).saturating_mul(1000)).unwrap_or(Millis::MAX);
        let wait = sweep.remaining(clock.now()).unwrap_or(0).clamp(0, tick);
        std::thread::sleep(StdDuration::from_millis(wait as u64));

        let mut db = match load() {
            Ok(db) => db,
            Err(e) => {
                warn!(error = %e, "could not reload data file, retrying");
                continue;
            }
        };
        let before = db.export();
        if let Some(report) = sweep.poll(&mut db, clock) {
            println!(
                "Midnight sweep: archived {} task(s), next run {}",
                report.archived,
                format_timestamp(report.next_run)
            );
        }
        db.reconcile(clock.now());
        if db.export() != before {
            db.save(db_path)?;
        }
    }
}

/// List, add, edit or remove users.
pub fn cmd_user(db: &mut Database, db_path: &Path, clock: &dyn Clock, action: UserAction) -> Result<()> {
    match action {
        UserAction::List => {
            println!("{:<28} {:<20} {}", "ID", "Name", "Email");
            for u in &db.users {
                println!("{:<28} {:<20} {}", u.id, truncate(&u.name, 20), u.email);
            }
            return Ok(());
        }
        UserAction::Add { name, email } => {
            let id = db.add_user(&name, &email)?;
            println!("Added user {id}");
        }
        UserAction::Edit { id, name, email } => {
            db.update_user(&id, &name, &email)?;
            println!("Updated user {id}");
        }
        UserAction::Rm { id } => {
            let user = db.delete_user(&id, clock.now())?;
            println!("Removed user {} ({})", user.id, user.name);
        }
    }
    commit(db, db_path, clock.now())
}

/// Link a project to a folder, or print the linked folder.
pub fn cmd_dir(db: &mut Database, db_path: &Path, action: DirAction) -> Result<()> {
    match action {
        DirAction::Set { project, path } => {
            db.set_directory(&project, path);
            db.save(db_path)
        }
        DirAction::Show { project } => {
            println!("{}", db.project_directory(&project)?.display());
            Ok(())
        }
    }
}

/// Write the board snapshot to a file, or to stdout.
pub fn cmd_export(db: &Database, output: Option<PathBuf>) -> Result<()> {
    let data = serde_json::to_string_pretty(&db.export())?;
    match output {
        Some(path) => {
            fs::write(&path, data)?;
            println!("Exported {} task(s) to {}", db.tasks.len(), path.display());
        }
        None => println!("{data}"),
    }
    Ok(())
}

/// Create a timestamped backup of the data file.
pub fn create_backup(db_path: &Path) -> Result<PathBuf> {
    if !db_path.exists() {
        return Err(Error::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "data file does not exist",
        )));
    }
    let parent_dir = db_path.parent().unwrap_or_else(|| Path::new("."));
    let backup_dir = parent_dir.join("backup");
    fs::create_dir_all(&backup_dir)?;

    let timestamp = Local::now().format("%Y-%m-%d_%H-%M-%S");
    let file_name = db_path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("board.json");
    let backup_path = backup_dir.join(format!("{timestamp}_{file_name}"));
    fs::copy(db_path, &backup_path)?;
    Ok(backup_path)
}

/// Merge a snapshot file into the board, backing up the data file first.
pub fn cmd_import(db: &mut Database, db_path: &Path, clock: &dyn Clock, input: PathBuf, no_backup: bool) -> Result<()> {
    let content = fs::read_to_string(&input)?;
    let now = clock.now();
    // Parse fully before touching anything.
    let snapshot = Snapshot::parse(&content, db.statuses(), now)?;

    if !no_backup && db_path.exists() {
        let backup = create_backup(db_path)?;
        println!("Created backup: {}", backup.display());
    }
    let summary = db.import(snapshot);
    commit(db, db_path, now)?;
    println!(
        "Imported: {} new, {} updated, {} kept local, {} user(s) added",
        summary.tasks_added, summary.tasks_updated, summary.tasks_kept, summary.users_added
    );
    Ok(())
}

/// Print a completion script for `shell` to stdout.
pub fn cmd_completions(shell: Shell) {
    use crate::cli::Cli;
    use clap::CommandFactory;

    let mut app = Cli::command();
    let app_name = app.get_name().to_string();
    generate(shell, &mut app, app_name, &mut std::io::stdout());
}

/// Parse human-readable due date input.
///
/// Supports:
/// - "today", "tomorrow"
/// - weekday names ("friday", "next monday")
/// - "end of week", "end of month"
/// - "in 3d", "in 2w"
/// - "YYYY-MM-DD" format
pub fn parse_due_input(s: &str, today: NaiveDate) -> Option<NaiveDate> {
    let s = s.trim().to_lowercase();

    match s.as_str() {
        "today" => return Some(today),
        "tomorrow" => return Some(today + Duration::days(1)),
        "end of week" | "eow" => {
            // Friday of the current week: the last business day
            let weekday = today.weekday().num_days_from_monday() as i64;
            return Some(today + Duration::days(4 - weekday.min(4)));
        }
        "end of month" | "eom" => {
            let (year, month) = if today.month() == 12 {
                (today.year() + 1, 1)
            } else {
                (today.year(), today.month() + 1)
            };
            let first_of_next = NaiveDate::from_ymd_opt(year, month, 1)?;
            return Some(first_of_next - Duration::days(1));
        }
        _ => {}
    }

    if let Some(rest) = s.strip_prefix("in ") {
        if let Some(nd) = rest.strip_suffix('d') {
            if let Ok(days) = nd.trim().parse::<i64>() {
                return Some(today + Duration::days(days));
            }
        }
        if let Some(nw) = rest.strip_suffix('w') {
            if let Ok(weeks) = nw.trim().parse::<i64>() {
                return Some(today + Duration::weeks(weeks));
            }
        }
    }

    let weekdays = [
        ("monday", 0), ("tuesday", 1), ("wednesday", 2), ("thursday", 3),
        ("friday", 4), ("saturday", 5), ("sunday", 6),
        ("mon", 0), ("tue", 1), ("wed", 2), ("thu", 3),
        ("fri", 4), ("sat", 5), ("sun", 6),
    ];
    let current = today.weekday().num_days_from_monday() as i64;
    for (name, target) in weekdays {
        let days_ahead = (target + 7 - current) % 7;
        if s == name || s == format!("this {name}") {
            return Some(today + Duration::days(days_ahead));
        }
        if s == format!("next {name}") {
            let days = if days_ahead == 0 { 7 } else { days_ahead + 7 };
            return Some(today + Duration::days(days));
        }
    }

    NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok()
}

fn parse_due_arg(s: &str, today: NaiveDate) -> Result<NaiveDate> {
    parse_due_input(s, today).ok_or_else(|| Error::invalid_field("due date", format!("cannot read '{s}'")))
}

/// First characters of an id, enough to type back.
fn short_id(id: &str) -> &str {
    id.get(..10).unwrap_or(id)
}

fn format_timestamp(ms: Millis) -> String {
    Utc.timestamp_millis_opt(ms)
        .single()
        .map(|t| t.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".into())
}

fn format_date(ms: Millis) -> String {
    Utc.timestamp_millis_opt(ms)
        .single()
        .map(|t| t.with_timezone(&Local).format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "-".into())
}

/// Truncate a string to a maximum width, adding ellipsis if needed.
pub fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        s.to_string()
    } else {
        let mut out = String::new();
        for (i, ch) in s.chars().enumerate() {
            if i + 1 >= width {
                out.push('…');
                break;
            }
            out.push(ch);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::fields::StatusSet;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_parse_due_input() {
        let wed = d(2025, 1, 8);
        assert_eq!(parse_due_input("today", wed), Some(wed));
        assert_eq!(parse_due_input("Tomorrow", wed), Some(d(2025, 1, 9)));
        assert_eq!(parse_due_input("friday", wed), Some(d(2025, 1, 10)));
        assert_eq!(parse_due_input("wed", wed), Some(wed));
        assert_eq!(parse_due_input("next wednesday", wed), Some(d(2025, 1, 15)));
        assert_eq!(parse_due_input("next monday", wed), Some(d(2025, 1, 20)));
        assert_eq!(parse_due_input("in 3d", wed), Some(d(2025, 1, 11)));
        assert_eq!(parse_due_input("in 2w", wed), Some(d(2025, 1, 22)));
        assert_eq!(parse_due_input("eow", wed), Some(d(2025, 1, 10)));
        assert_eq!(parse_due_input("eow", d(2025, 1, 11)), Some(d(2025, 1, 11)));
        assert_eq!(parse_due_input("end of month", d(2024, 12, 3)), Some(d(2024, 12, 31)));
        assert_eq!(parse_due_input("2025-02-28", wed), Some(d(2025, 2, 28)));
        assert_eq!(parse_due_input("someday", wed), None);
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a long project name", 6), "a lon…");
    }

    #[test]
    fn test_delete_requires_archive() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("board.json");
        let clock = FixedClock::from_millis(1_736_000_000_000);
        let mut db = Database::new(StatusSet::default());
        let id = db.add_task(NewTask::titled("a"), clock.now()).unwrap();

        let err = cmd_delete(&mut db, &path, &clock, id.clone()).unwrap_err();
        assert!(matches!(err, Error::NotArchived(_)));

        cmd_archive(&mut db, &path, &clock, Some(id.clone()), None).unwrap();
        cmd_delete(&mut db, &path, &clock, id).unwrap();
        assert!(db.tasks.is_empty());
        let saved = Database::load(&path, StatusSet::default(), clock.now()).unwrap();
        assert!(saved.tasks.is_empty());
    }

    #[test]
    fn test_bad_due_date_leaves_task_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("board.json");
        let clock = FixedClock::from_millis(1_736_000_000_000);
        let mut db = Database::default();
        let id = db.add_task(NewTask::titled("a"), 0).unwrap();
        let err = cmd_update(
            &mut db, &path, &clock, id.clone(), Some("renamed".into()), None,
            Some("whenever".into()), false, None, None, None,
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidField { .. }));
        assert_eq!(db.get(&id).unwrap().title, "a");
        assert!(!path.exists());
    }

    #[test]
    fn test_import_rejects_malformed_file_without_backup() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("board.json");
        let input = dir.path().join("in.json");
        fs::write(&input, r#"{"users": []}"#).unwrap();
        let clock = FixedClock::from_millis(1_736_000_000_000);
        let mut db = Database::default();
        db.add_task(NewTask::titled("a"), 0).unwrap();
        db.save(&path).unwrap();

        let err = cmd_import(&mut db, &path, &clock, input, false).unwrap_err();
        assert!(matches!(err, Error::MalformedImport(_)));
        assert_eq!(db.tasks.len(), 1);
        assert!(!dir.path().join("backup").exists());
    }

    #[test]
    fn test_resolve_subtask_by_position() {
        let mut db = Database::default();
        let id = db.add_task(NewTask::titled("a"), 0).unwrap();
        let s1 = db.add_subtask(&id, "one", 0).unwrap().unwrap();
        let s2 = db.add_subtask(&id, "two", 0).unwrap().unwrap();
        assert_eq!(resolve_subtask(&db, &id, "1").unwrap(), s1);
        assert_eq!(resolve_subtask(&db, &id, "2").unwrap(), s2);
        assert!(resolve_subtask(&db, &id, "3").is_err());
    }

    fn done_project(db: &mut Database, project: &str, at: Millis) -> Vec<String> {
        (0..2)
            .map(|n| {
                db.add_task(
                    NewTask {
                        project: Some(project.into()),
                        status: Some(Status::Done),
                        ..NewTask::titled(format!("{project} {n}"))
                    },
                    at,
                )
                .unwrap()
            })
            .collect()
    }

    #[test]
    fn test_any_change_archives_projects_done_for_two_days() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("board.json");
        let clock = FixedClock::from_millis(1_736_000_000_000);
        let mut db = Database::default();
        let finished = done_project(&mut db, "acme", clock.now() - 2 * crate::clock::DAY_MS);
        let other = db.add_task(NewTask::titled("unrelated"), clock.now()).unwrap();

        cmd_move(&mut db, &path, &clock, other.clone(), Status::Doing).unwrap();

        let saved = Database::load(&path, StatusSet::default(), clock.now()).unwrap();
        for id in &finished {
            let t = saved.get(id).unwrap();
            assert!(t.archived);
            assert_eq!(t.archived_at, Some(clock.now()));
        }
        assert!(!saved.get(&other).unwrap().archived);
    }

    #[test]
    fn test_recently_done_project_stays_on_the_board() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("board.json");
        let clock = FixedClock::from_millis(1_736_000_000_000);
        let mut db = Database::default();
        let finished = done_project(&mut db, "acme", clock.now() - crate::clock::DAY_MS);
        let other = db.add_task(NewTask::titled("unrelated"), clock.now()).unwrap();

        cmd_update(
            &mut db, &path, &clock, other, None, None, None, true, Some(Priority::High), None, None,
        )
        .unwrap();

        let saved = Database::load(&path, StatusSet::default(), clock.now()).unwrap();
        assert!(finished.iter().all(|id| !saved.get(id).unwrap().archived));
    }

    #[test]
    fn test_unarchive_into_complete_project_is_archived_again() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("board.json");
        let clock = FixedClock::from_millis(1_736_000_000_000);
        let mut db = Database::default();
        let finished = done_project(&mut db, "acme", clock.now() - 3 * crate::clock::DAY_MS);
        db.archive(&finished[0], clock.now() - crate::clock::DAY_MS).unwrap();

        cmd_unarchive(&mut db, &path, &clock, finished[0].clone()).unwrap();

        let t = db.get(&finished[0]).unwrap();
        assert!(t.archived);
        assert_eq!(t.archived_at, Some(clock.now()));
        assert!(db.get(&finished[1]).unwrap().archived);
    }
}
