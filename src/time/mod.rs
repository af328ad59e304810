//! Capture date resolution
//!
//! A date is resolved by walking an ordered chain of [`DateSource`]s, first
//! success wins:
//! - EXIF `DateTimeOriginal` (images)
//! - Container creation date via FFprobe (videos)
//! - Filename date patterns
//! - File system modification time
//!
//! Every source swallows its own failures, so resolution never fails.

pub mod exif;
pub mod filename;
pub mod video;

use crate::config::MediaKind;
use chrono::{DateTime, Local, NaiveDateTime};
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

/// Source of the resolved timestamp
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeSource {
    /// Extracted from EXIF metadata
    Exif,
    /// Extracted from video container metadata
    VideoMetadata,
    /// Parsed from filename
    Filename,
    /// From file system modification time
    FileSystem,
    /// Nothing could be read, not even file metadata
    Fallback,
}

/// Result of date resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedDate {
    /// The resolved timestamp
    pub timestamp: NaiveDateTime,
    /// Source of the timestamp
    pub source: TimeSource,
}

/// One step of the resolution chain
pub trait DateSource: Send + Sync {
    /// Which source a successful lookup is attributed to
    fn source(&self) -> TimeSource;

    /// Try to produce a date; `None` falls through to the next source
    fn resolve(&self, path: &Path, kind: MediaKind) -> Option<NaiveDateTime>;
}

/// EXIF `DateTimeOriginal`, images only
#[derive(Debug, Default)]
pub struct ExifDate;

impl DateSource for ExifDate {
    fn source(&self) -> TimeSource {
        TimeSource::Exif
    }

    fn resolve(&self, path: &Path, kind: MediaKind) -> Option<NaiveDateTime> {
        if kind != MediaKind::Image {
            return None;
        }
        exif::extract_exif_time(path)
            .map_err(|e| debug!(?path, error = %e, "No EXIF capture time"))
            .ok()
    }
}

/// Container creation date read with FFprobe, videos only
#[derive(Debug, Default)]
pub struct FfprobeDate;

impl DateSource for FfprobeDate {
    fn source(&self) -> TimeSource {
        TimeSource::VideoMetadata
    }

    fn resolve(&self, path: &Path, kind: MediaKind) -> Option<NaiveDateTime> {
        if kind != MediaKind::Video {
            return None;
        }
        video::extract_video_time(path)
            .map_err(|e| debug!(?path, error = %e, "No container creation date"))
            .ok()
    }
}

/// Date patterns in the file stem
#[derive(Debug, Default)]
pub struct FilenameDate;

impl DateSource for FilenameDate {
    fn source(&self) -> TimeSource {
        TimeSource::Filename
    }

    fn resolve(&self, path: &Path, _kind: MediaKind) -> Option<NaiveDateTime> {
        filename::parse_path_date(path)
    }
}

/// File system modification time in local time
#[derive(Debug, Default)]
pub struct ModifiedDate;

impl DateSource for ModifiedDate {
    fn source(&self) -> TimeSource {
        TimeSource::FileSystem
    }

    fn resolve(&self, path: &Path, _kind: MediaKind) -> Option<NaiveDateTime> {
        let modified = fs::metadata(path)
            .and_then(|m| m.modified())
            .map_err(|e| warn!(?path, error = %e, "Cannot read modification time"))
            .ok()?;
        let local: DateTime<Local> = modified.into();
        Some(local.naive_local())
    }
}

/// Ordered chain of date sources
pub struct DateResolver {
    sources: Vec<Box<dyn DateSource>>,
}

impl Default for DateResolver {
    fn default() -> Self {
        Self::new(vec![
            Box::new(ExifDate),
            Box::new(FfprobeDate),
            Box::new(FilenameDate),
            Box::new(ModifiedDate),
        ])
    }
}

impl DateResolver {
    /// Build a resolver from an explicit chain, tried in order
    pub fn new(sources: Vec<Box<dyn DateSource>>) -> Self {
        Self { sources }
    }

    /// Resolve the capture date of a file. Always returns a date.
    pub fn resolve(&self, path: &Path, kind: MediaKind) -> ResolvedDate {
        for source in &self.sources {
            if let Some(timestamp) = source.resolve(path, kind) {
                debug!(?path, source = ?source.source(), %timestamp, "Resolved capture date");
                return ResolvedDate {
                    timestamp,
                    source: source.source(),
                };
            }
        }

        warn!(?path, "No usable date for file, using the Unix epoch");
        ResolvedDate {
            timestamp: NaiveDateTime::default(),
            source: TimeSource::Fallback,
        }
    }
}
