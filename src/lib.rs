//! Media Sorter - copy photos and videos into a date-organized library
//!
//! This library provides:
//! - Capture date resolution from EXIF, video container metadata (FFprobe),
//!   filename patterns and file system timestamps
//! - SHA-256 content fingerprints for duplicate detection
//! - A persistent SQLite action log that records every decision
//! - Collision-safe copying that never overwrites an existing file
//! - Parallel date resolution with Rayon

pub mod action_log;
pub mod cli;
pub mod config;
pub mod copy;
pub mod error;
pub mod hash;
pub mod process;
pub mod time;

pub use action_log::{ActionKind, ActionLog, ActionRecord};
pub use cli::Cli;
pub use config::{Config, ConfigError, MediaKind};
pub use copy::{CopyOutcome, SafeCopier};
pub use error::{Error, Result};
pub use hash::Fingerprint;
pub use process::{FileResult, MediaFile, ProcessingStats, Processor};
pub use time::{DateResolver, DateSource, ResolvedDate, TimeSource};
