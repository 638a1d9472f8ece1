//! Date helper functions

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;
use std::fmt::Write;

/// Format a date using a Moment.js-compatible format string
///
/// # Examples
/// ```ignore
/// format_date(&date, "YYYY/MM/DD") // -> "2024/01/15"
/// ```
pub fn format_date(date: &NaiveDate, format: &str) -> String {
    let mut out = String::new();
    if write!(out, "{}", date.format(&moment_to_chrono_format(format))).is_err() {
        return date.format("%Y-%m-%d").to_string();
    }
    out
}

/// Whether `format` converts to a chrono format string without errors
pub fn is_valid_date_format(format: &str) -> bool {
    let chrono_format = moment_to_chrono_format(format);
    !StrftimeItems::new(&chrono_format).any(|item| matches!(item, Item::Error))
}

/// Midnight of `date` in `tz`, as UTC
pub fn start_of_day(date: &NaiveDate, tz: Tz) -> DateTime<Utc> {
    let midnight = date.and_hms_opt(0, 0, 0).unwrap_or_default();
    tz.from_local_datetime(&midnight)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| Utc.from_utc_datetime(&midnight))
}

/// Convert Moment.js format to chrono format
fn moment_to_chrono_format(format: &str) -> String {
    let replacements = [
        // Year
        ("YYYY", "%Y"),
        ("YY", "%y"),
        // Month
        ("MMMM", "%B"),
        ("MMM", "%b"),
        ("MM", "%m"),
        // Day of month
        ("DDDD", "%j"),
        ("DD", "%d"),
        // Day of week
        ("dddd", "%A"),
        ("ddd", "%a"),
    ];

    // Literal percent signs would otherwise start chrono specifiers
    let mut result = format.replace('%', "%%");

    for (from, to) in replacements {
        result = result.replace(from, to);
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_date() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        assert_eq!(format_date(&date, "YYYY-MM-DD"), "2024-01-15");
        assert_eq!(format_date(&date, "YYYY/MM/DD"), "2024/01/15");
        assert_eq!(format_date(&date, "MMMM DD, YYYY"), "January 15, 2024");
        assert_eq!(format_date(&date, "YYYY年MM月DD日"), "2024年01月15日");
    }

    #[test]
    fn test_format_date_literal_percent() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        assert_eq!(format_date(&date, "YYYY-MM-DD 100%"), "2024-01-15 100%");
        assert_eq!(format_date(&date, "%H:%M YYYY"), "%H:%M 2024");
        assert!(is_valid_date_format("YYYY-MM-DD 100%"));
        assert!(is_valid_date_format("YYYY/MM/DD"));
    }

    #[test]
    fn test_start_of_day() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        assert_eq!(
            start_of_day(&date, chrono_tz::Asia::Tokyo).to_rfc3339(),
            "2024-01-14T15:00:00+00:00"
        );
        assert_eq!(
            start_of_day(&date, chrono_tz::UTC).to_rfc3339(),
            "2024-01-15T00:00:00+00:00"
        );
    }

    #[test]
    fn test_moment_to_chrono() {
        assert_eq!(moment_to_chrono_format("YYYY-MM-DD"), "%Y-%m-%d");
        assert_eq!(moment_to_chrono_format("ddd, DD MMM"), "%a, %d %b");
        assert_eq!(moment_to_chrono_format("DD%"), "%d%%");
    }
}
