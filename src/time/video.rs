//! Video creation date extraction via FFprobe

use chrono::{DateTime, NaiveDateTime};
use std::path::Path;
use std::process::Command;
use std::sync::OnceLock;
use tracing::{debug, trace};

/// Metadata keys to try for creation date
const CREATION_DATE_KEYS: &[&str] = &[
    "creation_time",
    "com.apple.quicktime.creationdate",
    "date",
    "date_recorded",
];

/// Cached FFprobe availability check
static FFPROBE_AVAILABLE: OnceLock<bool> = OnceLock::new();

/// Check if ffprobe is available (cached)
fn is_ffprobe_available() -> bool {
    *FFPROBE_AVAILABLE.get_or_init(|| Command::new("ffprobe").arg("-version").output().is_ok())
}

/// Why a container creation date could not be read
#[derive(Debug)]
pub enum VideoTimeError {
    FfprobeNotFound,
    Probe(String),
    NoCreationDate,
}

impl std::fmt::Display for VideoTimeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VideoTimeError::FfprobeNotFound => write!(f, "ffprobe not found in PATH"),
            VideoTimeError::Probe(message) => write!(f, "ffprobe failed: {}", message),
            VideoTimeError::NoCreationDate => write!(f, "no creation date in container metadata"),
        }
    }
}

/// Extract the container creation date of a video using FFprobe
pub fn extract_video_time(path: &Path) -> Result<NaiveDateTime, VideoTimeError> {
    if !is_ffprobe_available() {
        return Err(VideoTimeError::FfprobeNotFound);
    }

    let output = Command::new("ffprobe")
        .args([
            "-v",
            "quiet",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
        ])
        .arg(path)
        .output()
        .map_err(|e| VideoTimeError::Probe(e.to_string()))?;

    if !output.status.success() {
        return Err(VideoTimeError::Probe(
            String::from_utf8_lossy(&output.stderr).into_owned(),
        ));
    }

    let json_str = String::from_utf8_lossy(&output.stdout);
    trace!(?path, "FFprobe output: {}", json_str);

    let json: serde_json::Value =
        serde_json::from_str(&json_str).map_err(|e| VideoTimeError::Probe(e.to_string()))?;

    creation_time_from_probe(&json).ok_or(VideoTimeError::NoCreationDate)
}

/// Find a creation date in ffprobe JSON, format tags first, then stream tags
pub fn creation_time_from_probe(json: &serde_json::Value) -> Option<NaiveDateTime> {
    let format_tags = json.get("format").and_then(|f| f.get("tags"));
    if let Some(dt) = format_tags.and_then(creation_time_from_tags) {
        return Some(dt);
    }

    json.get("streams")
        .and_then(|s| s.as_array())?
        .iter()
        .filter_map(|stream| stream.get("tags"))
        .find_map(creation_time_from_tags)
}

fn creation_time_from_tags(tags: &serde_json::Value) -> Option<NaiveDateTime> {
    for key in CREATION_DATE_KEYS {
        for tag_key in [key.to_string(), key.to_uppercase()] {
            if let Some(value) = tags.get(&tag_key).and_then(|v| v.as_str())
                && let Some(dt) = parse_creation_time(value)
            {
                debug!(key = %tag_key, %dt, "Found video creation time");
                return Some(dt);
            }
        }
    }
    None
}

/// Parse a container creation date.
///
/// Accepts a structured RFC 3339 timestamp (`2022-01-01T00:00:00.000000Z`)
/// or a plain `YYYY-MM-DD HH:MM:SS` string. The wall-clock value is kept
/// as stored; no timezone shift is applied.
pub fn parse_creation_time(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_local());
    }

    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(dt);
    }

    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f").ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};
    use serde_json::json;

    #[test]
    fn test_parse_creation_time() {
        let dt = parse_creation_time("2022-01-01 00:00:00").unwrap();
        assert_eq!((dt.year(), dt.month(), dt.day()), (2022, 1, 1));

        let dt = parse_creation_time("2024-01-15T14:30:00.000000Z").unwrap();
        assert_eq!(dt.hour(), 14);

        // Offset is not applied to the wall-clock value
        let dt = parse_creation_time("2024-01-15T14:30:00+08:00").unwrap();
        assert_eq!(dt.hour(), 14);

        let dt = parse_creation_time("2024-01-15T14:30:00").unwrap();
        assert_eq!(dt.minute(), 30);

        assert!(parse_creation_time("invalid").is_none());
        assert!(parse_creation_time("").is_none());
    }

    #[test]
    fn test_creation_time_from_format_tags() {
        let probe = json!({
            "format": { "tags": { "creation_time": "2022-01-01T00:00:00.000000Z" } },
            "streams": [ { "tags": { "creation_time": "2019-05-05T05:05:05Z" } } ]
        });
        let dt = creation_time_from_probe(&probe).unwrap();
        assert_eq!(dt.year(), 2022);
    }

    #[test]
    fn test_creation_time_from_stream_tags() {
        let probe = json!({
            "format": { "tags": { "encoder": "Lavf58" } },
            "streams": [
                { "codec_type": "audio" },
                { "tags": { "CREATION_TIME": "2019-05-05 05:05:05" } }
            ]
        });
        let dt = creation_time_from_probe(&probe).unwrap();
        assert_eq!((dt.year(), dt.month(), dt.day()), (2019, 5, 5));
    }

    #[test]
    fn test_no_creation_time() {
        assert!(creation_time_from_probe(&json!({})).is_none());
        let probe = json!({ "format": { "tags": { "creation_time": "garbage" } } });
        assert!(creation_time_from_probe(&probe).is_none());
    }
}
