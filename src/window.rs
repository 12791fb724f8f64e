// 📅 Date window - inclusive [start, end] filter shared by both loaders

use crate::error::{ReconError, Result};
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

/// Form-field date format
pub const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

/// Parse a date that must print back exactly as given.
///
/// chrono accepts "2025-1-5" for `%Y-%m-%d`; the zero-padded round trip
/// rejects it, along with surrounding whitespace.
pub fn parse_date_exact(raw: &str, format: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw, format)
        .ok()
        .filter(|date| date.format(format).to_string() == raw)
}

/// Timestamp counterpart of `parse_date_exact`
pub fn parse_datetime_exact(raw: &str, format: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw, format)
        .ok()
        .filter(|at| at.format(format).to_string() == raw)
}

impl DateWindow {
    /// Day-inclusive window: start at 00:00:00, end extended by 23h59m59s
    pub fn from_dates(start: NaiveDate, end: NaiveDate) -> Self {
        let midnight = NaiveTime::default();
        let last_second = Duration::hours(23) + Duration::minutes(59) + Duration::seconds(59);

        DateWindow {
            start: start.and_time(midnight),
            end: end.and_time(midnight) + last_second,
        }
    }

    /// Validate the two form values. start_date is checked first.
    pub fn parse(start: &str, end: &str) -> Result<Self> {
        let start = parse_date_exact(start, DATE_FORMAT).ok_or(ReconError::InvalidStartDate)?;
        let end = parse_date_exact(end, DATE_FORMAT).ok_or(ReconError::InvalidEndDate)?;

        Ok(DateWindow::from_dates(start, end))
    }

    pub fn contains(&self, at: NaiveDateTime) -> bool {
        at >= self.start && at <= self.end
    }

    pub fn contains_date(&self, date: NaiveDate) -> bool {
        self.contains(date.and_time(NaiveTime::default()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    #[test]
    fn test_parse_extends_end_to_last_second() {
        let window = DateWindow::parse("2025-01-15", "2025-01-17").unwrap();
        assert_eq!(window.start, at("2025-01-15 00:00:00"));
        assert_eq!(window.end, at("2025-01-17 23:59:59"));
    }

    #[test]
    fn test_parse_errors_checked_start_first() {
        let err = DateWindow::parse("15-01-2025", "garbage").unwrap_err();
        assert!(matches!(err, ReconError::InvalidStartDate));

        let err = DateWindow::parse("2025-01-15", "17/01/2025").unwrap_err();
        assert!(matches!(err, ReconError::InvalidEndDate));
        assert!(err.to_string().contains("invalid end_date"));
    }

    #[test]
    fn test_parse_requires_zero_padded_dates() {
        assert!(matches!(
            DateWindow::parse("2025-1-5", "2025-01-07").unwrap_err(),
            ReconError::InvalidStartDate
        ));
        assert!(matches!(
            DateWindow::parse("2025-01-05", "2025-1-7").unwrap_err(),
            ReconError::InvalidEndDate
        ));
        assert!(matches!(
            DateWindow::parse(" 2025-01-05 ", "2025-01-07").unwrap_err(),
            ReconError::InvalidStartDate
        ));
    }

    #[test]
    fn test_exact_timestamp_shape() {
        let format = "%Y-%m-%d %H:%M:%S";
        assert_eq!(parse_datetime_exact("2025-01-05 09:03:07", format), Some(at("2025-01-05 09:03:07")));
        assert_eq!(parse_datetime_exact("2025-1-5 9:3:7", format), None);
        assert_eq!(parse_date_exact("2025-02-30", DATE_FORMAT), None);
    }

    #[test]
    fn test_contains_is_inclusive() {
        let window = DateWindow::parse("2025-01-15", "2025-01-17").unwrap();

        assert!(window.contains(at("2025-01-15 00:00:00")));
        assert!(window.contains(at("2025-01-17 23:59:59")));
        assert!(!window.contains(at("2025-01-14 23:59:59")));
        assert!(!window.contains(at("2025-01-18 00:00:00")));

        assert!(window.contains_date(NaiveDate::from_ymd_opt(2025, 1, 17).unwrap()));
        assert!(!window.contains_date(NaiveDate::from_ymd_opt(2025, 1, 18).unwrap()));
    }
}
