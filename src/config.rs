//! Configuration types for the media sorter

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// File name of the action log database inside the destination directory
pub const DB_FILENAME: &str = "media_sort_log.sqlite3";

/// Default marker for `filter_prefix` (Pixel camera files start with `PXL`)
pub const DEFAULT_PREFIX_MARKER: &str = "PXL";

/// Media kind, derived from the file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
}

/// Configuration for the media sorter
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory tree to read media from
    pub source: PathBuf,

    /// Root of the date-organized destination tree
    pub destination: PathBuf,

    /// Optional sub-folder below `YYYY/MM`, also used for the filename prefix
    pub qualifier: Option<String>,

    /// Log decisions without touching the destination tree
    pub dry_run: bool,

    /// Only process files whose name starts with `prefix_marker`
    pub filter_prefix: bool,

    /// Case-insensitive filename marker used by `filter_prefix`
    pub prefix_marker: String,

    /// Verbose output
    pub verbose: bool,

    /// Number of threads for date resolution (0 = auto)
    pub threads: usize,

    /// Action log location, defaults to `<destination>/media_sort_log.sqlite3`
    pub log_db: Option<PathBuf>,

    /// Supported image extensions
    pub image_extensions: Vec<String>,

    /// Supported video extensions
    pub video_extensions: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source: PathBuf::new(),
            destination: PathBuf::new(),
            qualifier: None,
            dry_run: false,
            filter_prefix: false,
            prefix_marker: DEFAULT_PREFIX_MARKER.to_string(),
            verbose: false,
            threads: 0,
            log_db: None,
            image_extensions: vec![
                "png".into(),
                "jpg".into(),
                "jpeg".into(),
                "gif".into(),
                "bmp".into(),
            ],
            video_extensions: vec![
                "mp4".into(),
                "mov".into(),
                "avi".into(),
                "mkv".into(),
                "flv".into(),
                "wmv".into(),
            ],
        }
    }
}

impl Config {
    /// Create a config for the given source and destination with defaults
    /// for everything else
    pub fn new(source: impl Into<PathBuf>, destination: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
            ..Self::default()
        }
    }

    /// Check if a file extension is a supported image format
    pub fn is_image(&self, ext: &str) -> bool {
        let ext_lower = ext.to_lowercase();
        self.image_extensions.iter().any(|e| e.to_lowercase() == ext_lower)
    }

    /// Check if a file extension is a supported video format
    pub fn is_video(&self, ext: &str) -> bool {
        let ext_lower = ext.to_lowercase();
        self.video_extensions.iter().any(|e| e.to_lowercase() == ext_lower)
    }

    /// Check if a file extension is supported
    pub fn is_supported(&self, ext: &str) -> bool {
        self.is_image(ext) || self.is_video(ext)
    }

    /// Classify a path by its extension
    pub fn media_kind(&self, path: &Path) -> Option<MediaKind> {
        let ext = path.extension().and_then(|e| e.to_str())?;
        if self.is_image(ext) {
            Some(MediaKind::Image)
        } else if self.is_video(ext) {
            Some(MediaKind::Video)
        } else {
            None
        }
    }

    /// Check whether a file name passes the prefix-marker filter
    pub fn passes_prefix_filter(&self, file_name: &str) -> bool {
        !self.filter_prefix
            || file_name
                .to_uppercase()
                .starts_with(&self.prefix_marker.to_uppercase())
    }

    /// The qualifier, if one is configured and non-empty
    pub fn qualifier_dir(&self) -> Option<&str> {
        self.qualifier.as_deref().filter(|q| !q.is_empty())
    }

    /// Filename prefix derived from the qualifier: `T_` for `Trip`
    pub fn qualifier_prefix(&self) -> String {
        match self.qualifier_dir().and_then(|q| q.chars().next()) {
            Some(first) => format!("{}_", first.to_uppercase()),
            None => String::new(),
        }
    }

    /// Action log database path
    pub fn db_path(&self) -> PathBuf {
        self.log_db
            .clone()
            .unwrap_or_else(|| self.destination.join(DB_FILENAME))
    }

    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })?;

        Ok(config)
    }
}

/// Errors that can occur when loading configuration
#[derive(Debug)]
pub enum ConfigError {
    /// Failed to read configuration file
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Failed to parse configuration file
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ReadError { path, source } => {
                write!(f, "Failed to read config file '{}': {}", path.display(), source)
            }
            ConfigError::ParseError { path, source } => {
                write!(f, "Failed to parse config file '{}': {}", path.display(), source)
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::ReadError { source, .. } => Some(source),
            ConfigError::ParseError { source, .. } => Some(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_extension_classification() {
        let config = Config::default();
        assert!(config.is_image("jpg"));
        assert!(config.is_image("JPEG"));
        assert!(config.is_video("MOV"));
        assert!(!config.is_supported("heic"));
        assert_eq!(config.media_kind(Path::new("a/b.Png")), Some(MediaKind::Image));
        assert_eq!(config.media_kind(Path::new("clip.wmv")), Some(MediaKind::Video));
        assert_eq!(config.media_kind(Path::new("notes.txt")), None);
        assert_eq!(config.media_kind(Path::new("README")), None);
    }

    #[test]
    fn test_qualifier_prefix() {
        let mut config = Config::default();
        assert_eq!(config.qualifier_prefix(), "");
        assert_eq!(config.qualifier_dir(), None);

        config.qualifier = Some("Trip".into());
        assert_eq!(config.qualifier_prefix(), "T_");
        assert_eq!(config.qualifier_dir(), Some("Trip"));

        config.qualifier = Some("wedding".into());
        assert_eq!(config.qualifier_prefix(), "W_");

        config.qualifier = Some(String::new());
        assert_eq!(config.qualifier_prefix(), "");
        assert_eq!(config.qualifier_dir(), None);
    }

    #[test]
    fn test_prefix_filter() {
        let mut config = Config::default();
        assert!(config.passes_prefix_filter("IMG_0001.jpg"));

        config.filter_prefix = true;
        assert!(config.passes_prefix_filter("PXL_20240101_000000.jpg"));
        assert!(config.passes_prefix_filter("pxl_20240101_000000.jpg"));
        assert!(!config.passes_prefix_filter("IMG_0001.jpg"));
    }

    #[test]
    fn test_db_path() {
        let mut config = Config::new("/src", "/dst");
        assert_eq!(config.db_path(), PathBuf::from("/dst").join(DB_FILENAME));

        config.log_db = Some(PathBuf::from("/var/log/sort.db"));
        assert_eq!(config.db_path(), PathBuf::from("/var/log/sort.db"));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sorter.toml");
        fs::write(
            &path,
            r#"
source = "/media/card"
destination = "/media/library"
qualifier = "Trip"
dry_run = true
video_extensions = ["mp4"]
"#,
        )
        .unwrap();

        let config = Config::load_from_file(&path).unwrap();
        assert_eq!(config.source, PathBuf::from("/media/card"));
        assert_eq!(config.qualifier.as_deref(), Some("Trip"));
        assert!(config.dry_run);
        assert!(!config.filter_prefix);
        assert_eq!(config.prefix_marker, DEFAULT_PREFIX_MARKER);
        assert!(config.is_video("mp4"));
        assert!(!config.is_video("mov"));
        assert!(config.is_image("bmp"));
    }

    #[test]
    fn test_load_from_missing_file() {
        let dir = tempdir().unwrap();
        let err = Config::load_from_file(dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::ReadError { .. }));
        assert!(err.to_string().contains("absent.toml"));
    }
}
