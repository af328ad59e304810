//! Media sort orchestration
//!
//! Handles the core logic of:
//! - Scanning the source tree
//! - Resolving capture dates (in parallel)
//! - Ordering files newest first
//! - Driving the safe copy for each file in order

use crate::action_log::{ActionKind, ActionLog};
use crate::config::{Config, MediaKind};
use crate::copy::SafeCopier;
use crate::error::{Error, Result};
use crate::time::{DateResolver, ResolvedDate};
use chrono::{Datelike, NaiveDateTime};
use rayon::prelude::*;
use std::ffi::{OsStr, OsString};
use std::path::PathBuf;
use tracing::{Level, debug, info, span, warn};
use walkdir::WalkDir;

/// A source file selected for sorting
#[derive(Debug, Clone)]
pub struct MediaFile {
    pub path: PathBuf,
    pub kind: MediaKind,
    pub date: ResolvedDate,
}

/// Result of processing a single file
#[derive(Debug, Clone)]
pub struct FileResult {
    /// Source file path
    pub source: PathBuf,
    /// Target path recorded in the action log
    pub destination: PathBuf,
    /// Resolved capture date
    pub date: ResolvedDate,
    /// Logged decision
    pub action: ActionKind,
}

/// Processing statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessingStats {
    pub total_files: usize,
    pub copied: usize,
    pub duplicates: usize,
    pub duplicate_refs: usize,
    pub dry_run: usize,
}

impl ProcessingStats {
    pub fn new() -> Self {
        Self::default()
    }

    fn count(&mut self, action: ActionKind) {
        match action {
            ActionKind::Copy => self.copied += 1,
            ActionKind::DuplicateSeen => self.duplicates += 1,
            ActionKind::DuplicateRef => self.duplicate_refs += 1,
            ActionKind::DryRun => self.dry_run += 1,
        }
    }

    pub fn processed(&self) -> usize {
        self.copied + self.duplicates + self.duplicate_refs + self.dry_run
    }

    pub fn summary(&self) -> String {
        format!(
            "Total: {}, Copied: {}, Duplicates: {}, Already at destination: {}, Dry run: {}",
            self.total_files, self.copied, self.duplicates, self.duplicate_refs, self.dry_run
        )
    }
}

/// Main processor for sorting media files
pub struct Processor {
    config: Config,
    resolver: DateResolver,
    stats: ProcessingStats,
}

impl Processor {
    /// Create a new processor with the default date resolution chain
    pub fn new(config: Config) -> Result<Self> {
        Self::with_resolver(config, DateResolver::default())
    }

    /// Create a processor with a custom date resolution chain
    pub fn with_resolver(config: Config, resolver: DateResolver) -> Result<Self> {
        if config.source.as_os_str().is_empty() {
            return Err(Error::Config("source directory is not set".into()));
        }
        if config.destination.as_os_str().is_empty() {
            return Err(Error::Config("destination directory is not set".into()));
        }

        if config.threads > 0 {
            rayon::ThreadPoolBuilder::new()
                .num_threads(config.threads)
                .build_global()
                .ok(); // Ignore if already initialized
        }

        Ok(Self {
            config,
            resolver,
            stats: ProcessingStats::new(),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run the sort without progress reporting
    pub fn run(&mut self) -> Result<Vec<FileResult>> {
        self.run_with_progress(|_, _, _| {})
    }

    /// Run the sort, calling `on_file(done, total, result)` after each file
    pub fn run_with_progress<F>(&mut self, mut on_file: F) -> Result<Vec<FileResult>>
    where
        F: FnMut(usize, usize, &FileResult),
    {
        let _span = span!(Level::INFO, "sort_run").entered();
        self.stats = ProcessingStats::new();

        let log = ActionLog::open(&self.config.db_path())?;
        info!(db = %log.path().display(), "Action log ready");

        info!(source = %self.config.source.display(), "Scanning source directory...");
        let files = self.collect_files()?;

        if files.is_empty() {
            warn!(source = %self.config.source.display(), "No media files found");
            return Ok(Vec::new());
        }
        info!(count = files.len(), "Found media files");
        self.stats.total_files = files.len();

        let media = self.resolve_dates(files);

        let copier = SafeCopier::new(&log, self.config.dry_run);
        let total = media.len();
        let mut results = Vec::with_capacity(total);

        for (index, file) in media.into_iter().enumerate() {
            let _file_span = span!(Level::DEBUG, "process_file", path = ?file.path).entered();

            let file_name = file.path.file_name().ok_or_else(|| Error::InvalidFileName {
                path: file.path.clone(),
            })?;

            let dest_dir = destination_dir(&self.config, &file.date.timestamp);
            let target_name = target_file_name(&self.config, file_name);

            let outcome = copier.copy(&file.path, &dest_dir, &target_name)?;
            self.stats.count(outcome.action);

            let result = FileResult {
                source: file.path,
                destination: outcome.target,
                date: file.date,
                action: outcome.action,
            };
            on_file(index + 1, total, &result);
            results.push(result);
        }

        info!("{}", self.stats.summary());

        Ok(results)
    }

    /// Collect supported media files under the source directory, in file
    /// name order
    fn collect_files(&self) -> Result<Vec<(PathBuf, MediaKind)>> {
        let mut files = Vec::new();

        for entry in WalkDir::new(&self.config.source)
            .follow_links(true)
            .sort_by_file_name()
        {
            let entry = match entry {
                Ok(entry) => entry,
                // The source root itself is unreadable
                Err(e) if e.depth() == 0 => return Err(e.into()),
                Err(e) => {
                    warn!(error = %e, "Skipping unreadable entry");
                    continue;
                }
            };
            let path = entry.path();
            if !entry.file_type().is_file() {
                continue;
            }

            let Some(kind) = self.config.media_kind(path) else {
                continue;
            };

            let name = entry.file_name().to_string_lossy();
            if !self.config.passes_prefix_filter(&name) {
                debug!(?path, "Skipping file without prefix marker");
                continue;
            }

            files.push((path.to_path_buf(), kind));
        }

        Ok(files)
    }

    /// Resolve capture dates and order files newest first.
    ///
    /// Resolution runs on the rayon pool; the collected order matches the
    /// scan order, and the stable sort keeps ties in that order.
    fn resolve_dates(&self, files: Vec<(PathBuf, MediaKind)>) -> Vec<MediaFile> {
        info!("Resolving capture dates...");
        let resolver = &self.resolver;
        let mut media: Vec<MediaFile> = files
            .into_par_iter()
            .map(|(path, kind)| {
                let date = resolver.resolve(&path, kind);
                MediaFile { path, kind, date }
            })
            .collect();

        media.sort_by(|a, b| b.date.timestamp.cmp(&a.date.timestamp));
        media
    }

    /// Get processing statistics
    pub fn stats(&self) -> &ProcessingStats {
        &self.stats
    }
}

/// `destination/YYYY/MM[/qualifier]` for a capture date
pub fn destination_dir(config: &Config, timestamp: &NaiveDateTime) -> PathBuf {
    let mut dest = config.destination.clone();
    dest.push(format!("{}", timestamp.year()));
    dest.push(format!("{:02}", timestamp.month()));
    if let Some(qualifier) = config.qualifier_dir() {
        dest.push(qualifier);
    }
    dest
}

/// `[PREFIX_]file_name`, kept as an `OsString` so non-UTF-8 names survive
pub fn target_file_name(config: &Config, file_name: &OsStr) -> OsString {
    let mut name = OsString::from(config.qualifier_prefix());
    name.push(file_name);
    name
}
