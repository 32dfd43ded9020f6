//! # Error Handling
//!
//! This module defines the centralized error type for the `function-deploy`
//! library. It uses `thiserror` to describe every failure either pipeline can
//! hit, with enough context in each variant to print a useful diagnostic.
//!
//! ## Key Components
//!
//! - **`Error`**: every failure mode of the deploy and import pipelines,
//!   from a malformed `deploy.json` to an external command that exited
//!   non-zero.
//!
//! - **`Result<T>`**: a type alias for `std::result::Result<T, Error>`.
//!
//! - **`Error::exit_code`**: maps an error to the process exit status the
//!   binary reports. A failed deploy or policy-apply command surfaces its own
//!   status unchanged, so callers scripting around the tool see the backend's
//!   exit code.

use thiserror::Error;

/// Exit status used for errors that do not carry a status of their own.
pub const EXIT_FAILURE: u8 = 1;

/// Exit status used when an external command exceeded its timeout.
pub const EXIT_TIMEOUT: u8 = 124;

/// Exit status used when an external command could not be started.
pub const EXIT_NOT_RUNNABLE: u8 = 127;

/// Main error type for function-deploy operations
#[derive(Error, Debug)]
pub enum Error {
    /// The project-local override document exists but could not be parsed.
    #[error("Configuration parsing error in {path}: {message}{}", hint.as_ref().map(|h| format!("\n  hint: {}", h)).unwrap_or_default())]
    ConfigParse {
        path: String,
        message: String,
        /// Optional hint for how to fix the document
        hint: Option<String>,
    },

    /// A remote URI did not look like `https://host/owner/repo.git`.
    #[error("Invalid remote reference: {uri} (expected https://<host>/<owner>/<repo>.git)")]
    InvalidReference { uri: String },

    /// Cloning a remote failed, timed out or `git` could not be started.
    #[error("Could not clone '{uri}' branch '{branch}': {message}")]
    FetchFailed {
        uri: String,
        branch: String,
        message: String,
    },

    /// The deploy or policy-apply command exited with a non-zero status.
    ///
    /// `status` is `None` when the process was terminated by a signal.
    #[error("Command '{command}' failed with {}{}", status.map(|s| format!("exit status {}", s)).unwrap_or_else(|| "no exit status".to_string()), if stderr.trim().is_empty() { String::new() } else { format!(": {}", stderr.trim()) })]
    ExternalCommandFailed {
        command: String,
        status: Option<i32>,
        stderr: String,
    },

    /// An external command ran longer than the configured timeout and was killed.
    #[error("Command '{command}' timed out after {timeout_secs}s")]
    CommandTimedOut { command: String, timeout_secs: u64 },

    /// An external program could not be started at all.
    #[error("Could not run '{program}': {message}")]
    CommandSpawn { program: String, message: String },

    /// A function or common path is missing or is not a directory.
    #[error("'{path}' is not a valid directory")]
    InvalidTree { path: String },

    /// The function package could not be derived from the common package.
    #[error("Could not resolve function package from common package '{common_package}' (common directory '{common_dir}')\n  hint: check --common-package, or consider specifying --function-package")]
    PackageResolution {
        common_package: String,
        common_dir: String,
    },

    /// A parameter required by a later step was not resolved.
    #[error("Missing deploy parameter: {key}")]
    MissingParameter { key: String },

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A JSON (de)serialization error, wrapped from `serde_json::Error`.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A regular expression error, wrapped from `regex::Error`.
    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    /// A directory traversal error, wrapped from `walkdir::Error`.
    #[error("Directory walk error: {0}")]
    Walk(#[from] walkdir::Error),
}

impl Error {
    /// The process exit status that reports this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            Error::ExternalCommandFailed {
                status: Some(status),
                ..
            } => u8::try_from(*status)
                .ok()
                .filter(|code| *code != 0)
                .unwrap_or(EXIT_FAILURE),
            Error::CommandTimedOut { .. } => EXIT_TIMEOUT,
            Error::CommandSpawn { .. } => EXIT_NOT_RUNNABLE,
            _ => EXIT_FAILURE,
        }
    }
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
