//! Filename date parsing
//!
//! Patterns are tried in a fixed order against the file stem, and the first
//! one that both matches and yields a valid calendar date wins. Both
//! `YYYYMMDD` and `MMDDYYYY` match any run of eight digits; `YYYYMMDD` goes
//! first.

use chrono::{NaiveDate, NaiveDateTime};
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;
use tracing::{debug, trace};

/// A filename pattern with the chrono layout its captures are parsed with.
/// Captures are joined with `-` before parsing.
struct DatePattern {
    name: &'static str,
    regex: Regex,
    layout: &'static str,
}

static DATE_PATTERNS: OnceLock<Vec<DatePattern>> = OnceLock::new();

fn date_patterns() -> &'static [DatePattern] {
    DATE_PATTERNS.get_or_init(|| {
        let pattern = |name, regex: &str, layout| DatePattern {
            name,
            regex: Regex::new(regex).expect("static date pattern"),
            layout,
        };
        vec![
            pattern("YYYYMMDD", r"(\d{4})(\d{2})(\d{2})", "%Y-%m-%d"),
            pattern("MMDDYYYY", r"(\d{2})(\d{2})(\d{4})", "%m-%d-%Y"),
            pattern("YYYY-MM-DD", r"(\d{4})[-/.](\d{2})[-/.](\d{2})", "%Y-%m-%d"),
            pattern("DD-MM-YYYY", r"(\d{2})[-/.](\d{2})[-/.](\d{4})", "%d-%m-%Y"),
            pattern("YY-MM-DD", r"(\d{2})[-/.](\d{2})[-/.](\d{2})", "%y-%m-%d"),
            pattern("DD-MM-YY", r"(\d{2})[-/.](\d{2})[-/.](\d{2})", "%d-%m-%y"),
        ]
    })
}

/// Parse a date from the stem of `path`
pub fn parse_path_date(path: &Path) -> Option<NaiveDateTime> {
    let stem = path.file_stem()?.to_str()?;
    parse_stem_date(stem)
}

/// Parse a date from a file stem (no extension)
pub fn parse_stem_date(stem: &str) -> Option<NaiveDateTime> {
    for pattern in date_patterns() {
        let Some(caps) = pattern.regex.captures(stem) else {
            continue;
        };

        let joined = caps
            .iter()
            .skip(1)
            .flatten()
            .map(|m| m.as_str())
            .collect::<Vec<_>>()
            .join("-");

        match NaiveDate::parse_from_str(&joined, pattern.layout) {
            Ok(date) => {
                trace!(stem, pattern = pattern.name, "Matched filename date pattern");
                return date.and_hms_opt(0, 0, 0);
            }
            Err(e) => {
                debug!(stem, pattern = pattern.name, error = %e, "Filename date parse error");
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    fn ymd(dt: NaiveDateTime) -> (i32, u32, u32) {
        (dt.year(), dt.month(), dt.day())
    }

    #[test]
    fn test_compact_date() {
        let dt = parse_stem_date("IMG_20230815_120000").unwrap();
        assert_eq!(ymd(dt), (2023, 8, 15));
        assert_eq!(dt.hour(), 0);
        assert_eq!(dt.minute(), 0);

        let dt = parse_path_date(Path::new("/card/DCIM/PXL_20240102_093000123.jpg")).unwrap();
        assert_eq!(ymd(dt), (2024, 1, 2));
    }

    #[test]
    fn test_yyyymmdd_preferred_over_mmddyyyy() {
        // Valid under both groupings; the first pattern wins.
        let dt = parse_stem_date("10111012").unwrap();
        assert_eq!(ymd(dt), (1011, 10, 12));

        // Year 0102 with month 20 is invalid, so MMDDYYYY applies
        let dt = parse_stem_date("01022020").unwrap();
        assert_eq!(ymd(dt), (2020, 1, 2));
    }

    #[test]
    fn test_mmddyyyy_when_first_grouping_is_invalid() {
        // Month 20 under YYYYMMDD, so MMDDYYYY applies
        let dt = parse_stem_date("scan_08152023").unwrap();
        assert_eq!(ymd(dt), (2023, 8, 15));
    }

    #[test]
    fn test_separated_dates() {
        assert_eq!(ymd(parse_stem_date("holiday 2021-12-24").unwrap()), (2021, 12, 24));
        assert_eq!(ymd(parse_stem_date("2021.12.24 tree").unwrap()), (2021, 12, 24));
        assert_eq!(ymd(parse_stem_date("party_24-12-2021").unwrap()), (2021, 12, 24));
        assert_eq!(ymd(parse_stem_date("note 21.12.24").unwrap()), (2021, 12, 24));
    }

    #[test]
    fn test_two_digit_day_first_fallback() {
        // Day 99 fails YY-MM-DD, so DD-MM-YY is used
        assert_eq!(ymd(parse_stem_date("memo 31-12-99").unwrap()), (1999, 12, 31));
    }

    #[test]
    fn test_two_digit_year_pivot() {
        assert_eq!(ymd(parse_stem_date("69-01-01").unwrap()), (2069, 1, 1));
        assert_eq!(ymd(parse_stem_date("70-01-01").unwrap()), (1970, 1, 1));
    }

    #[test]
    fn test_no_date() {
        assert!(parse_stem_date("random_file").is_none());
        assert!(parse_stem_date("photo").is_none());
        assert!(parse_stem_date("99999999").is_none());
        assert!(parse_path_date(Path::new("video1.mp4")).is_none());
    }
}
