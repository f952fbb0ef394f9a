//! Timestamp parsing for the `strptime` builtin.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use logmeter_core::Timestamp;

/// Parse `value` with a strftime-style `format`.
///
/// Formats that carry an offset (`%z`, `%:z`) or an epoch (`%s`) are
/// converted to UTC; formats without one are taken as UTC wall time.
/// A date-only format resolves to midnight.
pub fn parse_time(value: &str, format: &str) -> Result<Timestamp, chrono::ParseError> {
    let with_offset = match DateTime::parse_from_str(value, format) {
        Ok(parsed) => return Ok(parsed.with_timezone(&Utc)),
        Err(err) => err,
    };

    if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
        return Ok(naive.and_utc());
    }

    match NaiveDate::parse_from_str(value, format) {
        Ok(date) => Ok(date.and_time(chrono::NaiveTime::MIN).and_utc()),
        Err(_) => Err(with_offset),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_epoch_seconds() {
        let parsed = parse_time("1700000000", "%s").unwrap();
        assert_eq!(parsed.timestamp(), 1_700_000_000);
    }

    #[test]
    fn test_naive_datetime_is_utc() {
        let parsed = parse_time("2024/03/05 12:34:56", "%Y/%m/%d %H:%M:%S").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2024, 3, 5, 12, 34, 56).unwrap());
    }

    #[test]
    fn test_offset_is_converted() {
        let parsed = parse_time("2024-03-05 12:00:00 +0200", "%Y-%m-%d %H:%M:%S %z").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2024, 3, 5, 10, 0, 0).unwrap());
    }

    #[test]
    fn test_date_only_is_midnight() {
        let parsed = parse_time("2024-03-05", "%Y-%m-%d").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2024, 3, 5, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_mismatch_is_error() {
        assert!(parse_time("yesterday", "%s").is_err());
        assert!(parse_time("2024-03-05", "%H:%M").is_err());
    }
}
