//! EXIF capture time extraction for images

use chrono::NaiveDateTime;
use exif::{In, Reader, Tag, Value};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::trace;

/// Fixed EXIF datetime layout: "YYYY:MM:DD HH:MM:SS"
const EXIF_DATETIME_FORMAT: &str = "%Y:%m:%d %H:%M:%S";

/// Why an EXIF capture time could not be read
#[derive(Debug)]
pub enum ExifTimeError {
    Io(std::io::Error),
    Exif(exif::Error),
    MissingTag,
    Parse(String),
}

impl std::fmt::Display for ExifTimeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExifTimeError::Io(e) => write!(f, "failed to open file: {}", e),
            ExifTimeError::Exif(e) => write!(f, "failed to read EXIF: {}", e),
            ExifTimeError::MissingTag => write!(f, "no DateTimeOriginal tag"),
            ExifTimeError::Parse(value) => write!(f, "unparsable DateTimeOriginal {:?}", value),
        }
    }
}

/// Read the `DateTimeOriginal` tag of an image
pub fn extract_exif_time(path: &Path) -> Result<NaiveDateTime, ExifTimeError> {
    let file = File::open(path).map_err(ExifTimeError::Io)?;
    let mut reader = BufReader::new(file);

    let exif = Reader::new()
        .read_from_container(&mut reader)
        .map_err(ExifTimeError::Exif)?;

    let field = exif
        .get_field(Tag::DateTimeOriginal, In::PRIMARY)
        .ok_or(ExifTimeError::MissingTag)?;

    let raw = match &field.value {
        Value::Ascii(parts) => parts
            .first()
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
            .unwrap_or_default(),
        other => format!("{:?}", other),
    };

    let datetime = parse_exif_datetime(&raw).ok_or(ExifTimeError::Parse(raw))?;
    trace!(?path, %datetime, "Found EXIF DateTimeOriginal");
    Ok(datetime)
}

/// Parse an EXIF datetime string in the fixed "YYYY:MM:DD HH:MM:SS" layout
pub fn parse_exif_datetime(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim().trim_end_matches('\0');
    NaiveDateTime::parse_from_str(s, EXIF_DATETIME_FORMAT).ok()
}

/// Build a minimal JPEG carrying only an EXIF `DateTimeOriginal` tag
#[cfg(test)]
pub(crate) fn jpeg_with_date_time_original(value: &str) -> Vec<u8> {
    // Little-endian TIFF: header, IFD0 with an Exif IFD pointer, Exif IFD
    // with one ASCII entry, then the string itself.
    let mut ascii = value.as_bytes().to_vec();
    ascii.push(0);
    let exif_ifd_offset: u32 = 8 + 18;
    let data_offset: u32 = exif_ifd_offset + 18;

    let mut tiff = Vec::new();
    tiff.extend_from_slice(b"II");
    tiff.extend_from_slice(&42u16.to_le_bytes());
    tiff.extend_from_slice(&8u32.to_le_bytes());

    tiff.extend_from_slice(&1u16.to_le_bytes());
    tiff.extend_from_slice(&0x8769u16.to_le_bytes());
    tiff.extend_from_slice(&4u16.to_le_bytes());
    tiff.extend_from_slice(&1u32.to_le_bytes());
    tiff.extend_from_slice(&exif_ifd_offset.to_le_bytes());
    tiff.extend_from_slice(&0u32.to_le_bytes());

    tiff.extend_from_slice(&1u16.to_le_bytes());
    tiff.extend_from_slice(&0x9003u16.to_le_bytes());
    tiff.extend_from_slice(&2u16.to_le_bytes());
    tiff.extend_from_slice(&(ascii.len() as u32).to_le_bytes());
    tiff.extend_from_slice(&data_offset.to_le_bytes());
    tiff.extend_from_slice(&0u32.to_le_bytes());

    tiff.extend_from_slice(&ascii);

    let mut app1 = b"Exif\0\0".to_vec();
    app1.extend_from_slice(&tiff);

    let mut jpeg = vec![0xFF, 0xD8, 0xFF, 0xE1];
    jpeg.extend_from_slice(&((app1.len() + 2) as u16).to_be_bytes());
    jpeg.extend_from_slice(&app1);
    jpeg.extend_from_slice(&[0xFF, 0xD9]);
    jpeg
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};
    use tempfile::tempdir;

    #[test]
    fn test_parse_exif_datetime() {
        let dt = parse_exif_datetime("2024:01:15 14:30:00").unwrap();
        assert_eq!(dt.year(), 2024);
        assert_eq!(dt.month(), 1);
        assert_eq!(dt.day(), 15);
        assert_eq!(dt.hour(), 14);
        assert_eq!(dt.minute(), 30);
        assert_eq!(dt.second(), 0);

        // Only the EXIF layout is accepted
        assert!(parse_exif_datetime("2024-01-15 14:30:00").is_none());
        assert!(parse_exif_datetime("0000:00:00 00:00:00").is_none());
        assert!(parse_exif_datetime("invalid").is_none());
    }

    #[test]
    fn test_extract_from_jpeg() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("holiday.jpg");
        std::fs::write(&path, jpeg_with_date_time_original("2019:07:04 10:20:30")).unwrap();

        let dt = extract_exif_time(&path).unwrap();
        assert_eq!(dt.year(), 2019);
        assert_eq!(dt.month(), 7);
        assert_eq!(dt.day(), 4);
        assert_eq!(dt.hour(), 10);
    }

    #[test]
    fn test_extract_from_non_image() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("fake.jpg");
        std::fs::write(&path, b"not a jpeg at all").unwrap();

        assert!(extract_exif_time(&path).is_err());
        assert!(matches!(
            extract_exif_time(&dir.path().join("missing.jpg")),
            Err(ExifTimeError::Io(_))
        ));
    }
}
