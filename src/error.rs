//! Error types for the media sorter

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for media sorter operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the media sorter
///
/// Only conditions that abort a run live here. Metadata read failures and
/// hashing failures are handled where they occur and never surface as errors.
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to copy {src} to {dst}: {source}")]
    Copy {
        src: PathBuf,
        dst: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to open action log {path}: {source}")]
    LogOpen {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    #[error("Action log error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Unknown action kind in log: {0}")]
    UnknownAction(String),

    #[error("Invalid file name: {path}")]
    InvalidFileName { path: PathBuf },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Directory traversal error: {0}")]
    WalkDir(#[from] walkdir::Error),
}
