//! Error types for the rules engine and the `kb` binary.
//!
//! Exit codes:
//! - 0: Success
//! - 2: User error (unknown id, invalid field, bad config)
//! - 3: Blocked (protected user, deleting an active task)
//! - 4: Operation failed (malformed import, IO, parse errors)

use std::path::PathBuf;
use thiserror::Error;

use crate::fields::Status;

/// Exit codes for the `kb` binary
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const USER_ERROR: i32 = 2;
    pub const BLOCKED: i32 = 3;
    pub const OPERATION_FAILED: i32 = 4;
}

#[derive(Error, Debug)]
pub enum Error {
    // User errors (exit code 2)
    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("Subtask {subtask} not found on task {task}")]
    SubtaskNotFound { task: String, subtask: String },

    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("Invalid {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },

    #[error("Status '{0}' is not enabled on this board")]
    StatusNotAllowed(Status),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("No directory configured for project {0}")]
    DirectoryNotSet(String),

    // Blocked (exit code 3)
    #[error("User '{0}' is protected and cannot be deleted")]
    ProtectedUser(String),

    #[error("Task {0} is not archived; archive it before deleting")]
    NotArchived(String),

    // Operation failures (exit code 4)
    #[error("Malformed import: {0}")]
    MalformedImport(String),

    #[error("Project directory does not exist: {0}")]
    DirectoryMissing(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

impl Error {
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::TaskNotFound(_)
            | Error::SubtaskNotFound { .. }
            | Error::UserNotFound(_)
            | Error::InvalidField { .. }
            | Error::StatusNotAllowed(_)
            | Error::InvalidArgument(_)
            | Error::InvalidConfig(_)
            | Error::DirectoryNotSet(_) => exit_codes::USER_ERROR,

            Error::ProtectedUser(_) | Error::NotArchived(_) => exit_codes::BLOCKED,

            Error::MalformedImport(_)
            | Error::DirectoryMissing(_)
            | Error::Io(_)
            | Error::Json(_)
            | Error::TomlParse(_) => exit_codes::OPERATION_FAILED,
        }
    }

    pub(crate) fn invalid_field(field: &'static str, reason: impl Into<String>) -> Self {
        Error::InvalidField {
            field,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
