//! kb - Kanban board CLI
//!
//! Columns of tasks ordered by business-day urgency, with per-task checklists,
//! project auto-archiving and a nightly sweep of finished work.
//!
//! Data is stored in `~/.kanban/board.json`; board columns and the project
//! palette can be set in `~/.kanban/config.toml`.

use clap::Parser;
use kanban::cli::Cli;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn main() {
    // Tracing is opt-in via RUST_LOG; ignore invalid filters.
    let filter = std::env::var("RUST_LOG")
        .ok()
        .and_then(|raw| {
            let raw = raw.trim();
            if raw.is_empty() {
                return None;
            }
            EnvFilter::try_new(raw).ok()
        })
        .unwrap_or_else(|| EnvFilter::new("off"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let cli = Cli::parse();
    if let Err(err) = cli.run() {
        eprintln!("Error: {err}");
        std::process::exit(err.exit_code());
    }
}
