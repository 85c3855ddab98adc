//! # kanban - task lifecycle and scheduling rules for a Kanban board
//!
//! The library is the rules engine behind the `kb` binary:
//!
//! - **Business calendar** ([`calendar`]): weekday counting between dates
//! - **Urgency** ([`urgency`]): business-day countdowns, tiers, stale `doing`
//!   cards and column ordering
//! - **Projects** ([`project`]): completion stats, two-day auto-archive,
//!   most-recently-used name history and colour assignment
//! - **Store** ([`db`]): named task, subtask and user mutations that keep the
//!   completion/archive timestamps consistent
//! - **Boundaries** ([`migrate`], [`snapshot`], [`schedule`]): legacy record
//!   migration, import/export merging and the nightly archive sweep
//!
//! Time never comes from the engine itself; callers pass `now` in
//! milliseconds and `today` as a calendar date, usually from a
//! [`clock::Clock`].
//!
//! ```
//! use kanban::db::Database;
//! use kanban::fields::Status;
//! use kanban::task::NewTask;
//!
//! let mut db = Database::default();
//! let id = db.add_task(NewTask::titled("Ship release"), 0).unwrap();
//! db.set_status(&id, Status::Done, 10).unwrap();
//! assert_eq!(db.get(&id).unwrap().completed_at, Some(10));
//! ```

pub mod calendar;
pub mod cli;
pub mod clock;
pub mod cmd;
pub mod config;
pub mod db;
pub mod error;
pub mod fields;
pub mod migrate;
pub mod project;
pub mod schedule;
pub mod snapshot;
pub mod task;
pub mod urgency;
pub mod user;
