use std::path::{Path, PathBuf};

use clap::Parser;
use tracing::debug;

use crate::clock::{Clock, SystemClock};
use crate::cmd::*;
use crate::config::{default_dir, Config, CONFIG_FILE};
use crate::db::Database;
use crate::error::Result;
use crate::project::ProjectColors;

/// File-backed Kanban board.
/// Storage defaults to ~/.kanban/board.json or a path passed via --db.
#[derive(Parser)]
#[command(name = "kb", version, about = "Kanban board with business-day urgency and auto-archiving")]
pub struct Cli {
    /// Path to the JSON data file.
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Path to the TOML config file.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn run(self) -> Result<()> {
        if let Commands::Completions { shell } = self.command {
            cmd_completions(shell);
            return Ok(());
        }

        let config_path = self
            .config
            .clone()
            .unwrap_or_else(|| default_dir().join(CONFIG_FILE));
        let config = Config::load(&config_path)?;
        let base_dir = config_path.parent().unwrap_or_else(|| Path::new("."));
        let db_path = config.data_path(base_dir, self.db.as_deref());
        debug!(config = %config_path.display(), db = %db_path.display(), "resolved paths");

        let clock = SystemClock;
        let load = || Database::load(&db_path, config.statuses.clone(), clock.now());
        let mut colors = ProjectColors::new(config.palette.clone());

        if let Commands::Watch { interval } = self.command {
            return cmd_watch(&db_path, &clock, load, interval);
        }

        let mut db = load()?;
        match self.command {
            Commands::Add { title, project, due, priority, status, assign, notes } => {
                cmd_add(&mut db, &db_path, &clock, title, project, due, priority, status, assign, notes)
            }
            Commands::List { status, project, stale, archived } => {
                cmd_list(&db, &clock, &mut colors, status, project, stale, archived)
            }
            Commands::View { id } => cmd_view(&db, &clock, id),
            Commands::Move { id, status } => cmd_move(&mut db, &db_path, &clock, id, status),
            Commands::Update { id, title, project, due, clear_due, priority, assign, notes } => {
                cmd_update(&mut db, &db_path, &clock, id, title, project, due, clear_due, priority, assign, notes)
            }
            Commands::Archive { id, project } => cmd_archive(&mut db, &db_path, &clock, id, project),
            Commands::Unarchive { id } => cmd_unarchive(&mut db, &db_path, &clock, id),
            Commands::Delete { id } => cmd_delete(&mut db, &db_path, &clock, id),
            Commands::Subtask { action } => cmd_subtask(&mut db, &db_path, &clock, action),
            Commands::Projects => {
                cmd_projects(&db, &mut colors);
                Ok(())
            }
            Commands::History { prefix } => {
                cmd_history(&db, prefix);
                Ok(())
            }
            Commands::Sweep => cmd_sweep(&mut db, &db_path, &clock),
            Commands::User { action } => cmd_user(&mut db, &db_path, &clock, action),
            Commands::Dir { action } => cmd_dir(&mut db, &db_path, action),
            Commands::Export { output } => cmd_export(&db, output),
            Commands::Import { input, no_backup } => cmd_import(&mut db, &db_path, &clock, input, no_backup),
            Commands::Watch { .. } | Commands::Completions { .. } => unreachable!("handled above"),
        }
    }
}
