//! Media Sorter - copy photos and videos into a dated library
//!
//! A CLI tool that files media under `YYYY/MM[/qualifier]` using the best
//! available capture date (EXIF, video container metadata, filename, file
//! system time), never overwriting and never importing the same content twice.

use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use media_sorter::{ActionKind, Cli, Config, Processor};
use std::path::{Path, PathBuf};
use tracing::{Level, error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

// CLI Output Module
mod cli_output {
    //! Colored summary output for the terminal

    use crossterm::{
        ExecutableCommand,
        style::{Color, Print, Stylize, style},
    };
    use std::io::stdout;

    /// CLI theme colors
    pub struct CliTheme;

    impl CliTheme {
        pub const SUCCESS: Color = Color::Green;
        pub const WARNING: Color = Color::Yellow;
        pub const HINT: Color = Color::DarkGrey;
        pub const ACCENT: Color = Color::Cyan;
    }

    pub fn print_separator() {
        let _ = stdout().execute(Print(&format!("{}\n", "─".repeat(60))));
    }

    /// Print a centered title
    pub fn print_title(title: &str) {
        let width: usize = 60;
        let padding = width.saturating_sub(title.len()) / 2;
        let left_pad = " ".repeat(padding.saturating_sub(1));

        let _ = stdout().execute(Print(&format!("{}{}\n\n", left_pad, title.bold())));
    }

    pub fn print_warning(msg: &str) {
        let _ = stdout().execute(Print(style("⚠ ").with(CliTheme::WARNING).bold()));
        let _ = stdout().execute(Print(format!("{}\n", msg)));
    }

    pub fn print_hint(msg: &str) {
        let _ = stdout().execute(Print(style("→ ").with(CliTheme::HINT)));
        let _ = stdout().execute(Print(format!("{}\n", msg)));
    }

    pub fn print_key_value(key: &str, value: &str) {
        let _ = stdout().execute(Print("  "));
        let _ = stdout().execute(Print(style(key).with(CliTheme::HINT)));
        let _ = stdout().execute(Print(": "));
        let _ = stdout().execute(Print(style(value).bold()));
        let _ = stdout().execute(Print("\n"));
    }

    pub fn print_stat(key: &str, value: usize, color: Color) {
        let _ = stdout().execute(Print("  "));
        let _ = stdout().execute(Print(style(key).with(CliTheme::HINT)));
        let _ = stdout().execute(Print(": "));
        let _ = stdout().execute(Print(style(value.to_string()).with(color).bold()));
        let _ = stdout().execute(Print("\n"));
    }

    /// Print one per-file result line
    pub fn print_result(status_icon: &str, status_color: Color, source: &str, dest_or_msg: &str) {
        let _ = stdout().execute(Print("  "));
        let _ = stdout().execute(Print(style(status_icon).with(status_color).bold()));
        let _ = stdout().execute(Print(" "));
        let _ = stdout().execute(Print(style(source).italic()));
        let _ = stdout().execute(Print(" "));
        let _ = stdout().execute(Print(style(dest_or_msg).with(CliTheme::HINT)));
        let _ = stdout().execute(Print("\n"));
    }

    pub fn print_blank() {
        let _ = stdout().execute(Print("\n"));
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let exe_dir = get_executable_dir()?;
    let log_path = get_log_path(&exe_dir, &cli);

    // Config is loaded first so a `verbose = true` file setting raises the level
    let config = load_config(&cli);
    let verbose = config.as_ref().map_or(cli.verbose, |c| c.verbose);
    let guard = setup_logging(log_level(verbose), cli.json_log, &log_path)?;

    info!(version = env!("CARGO_PKG_VERSION"), "Media Sorter starting");
    if config.is_ok()
        && let Some(ref config_file) = cli.config
    {
        info!(config_file = %config_file.display(), "Loaded configuration from file");
    }

    if let Err(e) = config.and_then(|config| run(config, &log_path)) {
        error!(error = %format!("{:#}", e), "Sort failed");
        eprintln!("Error: {:#}", e);
        // Flush the file writer before exiting
        drop(guard);
        std::process::exit(1);
    }

    Ok(())
}

fn run(config: Config, log_path: &Path) -> Result<()> {
    if config.verbose {
        info!(?config, "Configuration loaded");
    }
    info!(log_file = %log_path.display(), "Log file location");

    validate_config(&config);

    let mut processor = Processor::new(config)?;

    let progress = ProgressBar::new(0);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("█▓░"),
    );

    let results = processor.run_with_progress(|done, total, result| {
        progress.set_length(total as u64);
        progress.set_position(done as u64);
        if let Some(name) = result.source.file_name() {
            progress.set_message(name.to_string_lossy().into_owned());
        }
    });
    progress.finish_and_clear();
    let results = results?;

    print_summary(&processor, &results, log_path);
    info!(log_file = %log_path.display(), "Sort complete. Log saved to");

    Ok(())
}

fn print_summary(processor: &Processor, results: &[media_sorter::FileResult], log_path: &Path) {
    use cli_output::*;

    let config = processor.config();
    let stats = processor.stats();

    print_separator();
    print_title("Sort complete");
    print_separator();

    print_blank();
    print_stat("Files found", stats.total_files, CliTheme::ACCENT);
    print_stat("Copied", stats.copied, CliTheme::SUCCESS);
    print_stat("Already imported", stats.duplicates, CliTheme::WARNING);
    print_stat("Already at destination", stats.duplicate_refs, CliTheme::WARNING);
    print_stat("Dry run", stats.dry_run, CliTheme::ACCENT);
    print_blank();

    if config.verbose && !results.is_empty() {
        print_separator();
        print_hint("Per-file results");
        print_blank();

        for result in results {
            let (icon, color, label) = match result.action {
                ActionKind::Copy => ("✓", CliTheme::SUCCESS, "→"),
                ActionKind::DuplicateSeen => {
                    ("≡", CliTheme::WARNING, "already imported, skipped for")
                }
                ActionKind::DuplicateRef => ("≡", CliTheme::WARNING, "identical file at"),
                ActionKind::DryRun => ("~", CliTheme::ACCENT, "would copy to"),
            };
            print_result(
                icon,
                color,
                &result.source.display().to_string(),
                &format!("{} {}", label, result.destination.display()),
            );
        }
        print_blank();
    }

    if config.dry_run {
        print_separator();
        print_warning("Dry run: no files were copied. Decisions were still logged.");
    }

    print_separator();
    print_key_value("Action log", &config.db_path().display().to_string());
    print_key_value("Log file", &log_path.display().to_string());
}

/// Get the directory where the executable is located
fn get_executable_dir() -> Result<PathBuf> {
    let exe_path = std::env::current_exe()?;
    Ok(exe_path
        .parent()
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".")))
}

/// `<log-dir>/SortRun_<timestamp>.log`, with `Log/` next to the executable
/// as the default directory
fn get_log_path(exe_dir: &Path, cli: &Cli) -> PathBuf {
    let log_dir = cli
        .log_dir
        .clone()
        .unwrap_or_else(|| exe_dir.join("Log"));
    let timestamp = Local::now().format("%Y%m%d_%H%M%S");
    log_dir.join(format!("SortRun_{}.log", timestamp))
}

/// Load configuration from file and CLI arguments, then make paths absolute
fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = if let Some(ref config_path) = cli.config {
        let file_config = Config::load_from_file(config_path)?;
        cli.merge_with_config(file_config)
    } else {
        cli.to_config()
    };

    if config.source.as_os_str().is_empty() {
        anyhow::bail!("No source directory given");
    }
    if config.destination.as_os_str().is_empty() {
        anyhow::bail!("No destination directory given");
    }

    config.source = config
        .source
        .canonicalize()
        .with_context(|| format!("Source directory not found: {}", config.source.display()))?;
    if !config.source.is_dir() {
        anyhow::bail!("Source is not a directory: {}", config.source.display());
    }

    config.destination = std::path::absolute(&config.destination).with_context(|| {
        format!("Cannot resolve destination: {}", config.destination.display())
    })?;

    Ok(config)
}

/// Default log level for the merged `verbose` setting
fn log_level(verbose: bool) -> Level {
    if verbose { Level::DEBUG } else { Level::INFO }
}

/// Setup logging (file + console)
fn setup_logging(level: Level, json_log: bool, log_path: &Path) -> Result<WorkerGuard> {
    let env_filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Cannot create log directory {}", parent.display()))?;
    }

    let file = std::fs::OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(log_path)
        .with_context(|| format!("Cannot open log file {}", log_path.display()))?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    let subscriber = tracing_subscriber::registry().with(env_filter);

    if json_log {
        subscriber
            .with(fmt::layer().json().with_ansi(false).with_writer(non_blocking))
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    } else {
        subscriber
            .with(fmt::layer().with_ansi(false).with_writer(non_blocking))
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    Ok(guard)
}

/// Warn about risky but allowed setups
fn validate_config(config: &Config) {
    if config.destination.starts_with(&config.source) {
        warn!(
            source = %config.source.display(),
            destination = %config.destination.display(),
            "Destination is inside the source directory; sorted files will be scanned on later runs"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_verbose_from_config_file_enables_debug() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("card");
        fs::create_dir_all(&source).unwrap();
        let config_path = dir.path().join("sorter.toml");
        fs::write(
            &config_path,
            format!(
                "source = {:?}\ndestination = {:?}\nverbose = true\n",
                source.display().to_string(),
                dir.path().join("library").display().to_string()
            ),
        )
        .unwrap();

        let cli = Cli::parse_from(["media-sorter", "-C", config_path.to_str().unwrap()]);
        assert!(!cli.verbose);

        let config = load_config(&cli).unwrap();
        assert!(config.verbose);
        assert_eq!(log_level(config.verbose), Level::DEBUG);
        assert_eq!(log_level(false), Level::INFO);
    }

    #[test]
    fn test_missing_source_is_rejected() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("nowhere");
        let cli = Cli::parse_from([
            "media-sorter",
            missing.to_str().unwrap(),
            dir.path().join("library").to_str().unwrap(),
        ]);

        let err = load_config(&cli).unwrap_err();
        assert!(format!("{:#}", err).contains("Source directory not found"));
    }
}
