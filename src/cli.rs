//! CLI argument parsing with clap

use crate::config::Config;
use clap::Parser;
use std::path::PathBuf;

/// Media Sorter - copy photos and videos into dated folders
///
/// Copies (never moves) media files from SOURCE into
/// DESTINATION/YYYY/MM[/QUALIFIER], skipping files whose content was already
/// imported, and records every decision in an SQLite log.
#[derive(Parser, Debug)]
#[command(name = "media-sorter")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Directory containing media to sort
    pub source: Option<PathBuf>,

    /// Destination directory
    pub destination: Option<PathBuf>,

    /// Path to configuration file (TOML format)
    ///
    /// Settings from the file are used as defaults; CLI arguments override them.
    #[arg(short = 'C', long)]
    pub config: Option<PathBuf>,

    /// Optional qualifier for sub-categorisation (e.g. a trip name)
    #[arg(short, long)]
    pub qualifier: Option<String>,

    /// Simulate without copying files (decisions are still logged)
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Only process files whose name starts with the prefix marker
    #[arg(long)]
    pub filter_prefix: bool,

    /// Prefix marker used by --filter-prefix
    #[arg(long, env = "MEDIA_SORTER_PREFIX_MARKER")]
    pub prefix_marker: Option<String>,

    /// Number of threads for date resolution (0 = auto)
    #[arg(short = 't', long)]
    pub threads: Option<usize>,

    /// Action log database path (default: DESTINATION/media_sort_log.sqlite3)
    #[arg(long)]
    pub log_db: Option<PathBuf>,

    /// Directory for run log files (default: Log/ next to the executable)
    #[arg(long)]
    pub log_dir: Option<PathBuf>,

    /// Enable debug output
    #[arg(short, long)]
    pub verbose: bool,

    /// Output log file as JSON
    #[arg(long)]
    pub json_log: bool,
}

impl Cli {
    /// Merge CLI arguments with config from file
    /// CLI arguments take precedence over config file settings
    pub fn merge_with_config(&self, mut config: Config) -> Config {
        if let Some(ref source) = self.source {
            config.source = source.clone();
        }
        if let Some(ref destination) = self.destination {
            config.destination = destination.clone();
        }
        if let Some(ref qualifier) = self.qualifier {
            config.qualifier = Some(qualifier.clone());
        }
        if self.dry_run {
            config.dry_run = true;
        }
        if self.filter_prefix {
            config.filter_prefix = true;
        }
        if let Some(ref marker) = self.prefix_marker {
            config.prefix_marker = marker.clone();
        }
        if let Some(threads) = self.threads {
            config.threads = threads;
        }
        if let Some(ref log_db) = self.log_db {
            config.log_db = Some(log_db.clone());
        }
        if self.verbose {
            config.verbose = true;
        }

        config
    }

    /// Convert CLI arguments to Config (when no config file is used)
    pub fn to_config(&self) -> Config {
        self.merge_with_config(Config::default())
    }
}
