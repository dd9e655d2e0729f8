//! Date normalization utilities
//!
//! Task dates are stored as ISO-8601 strings. Incoming values may be native
//! chrono timestamps, ISO-8601 strings with or without an offset, or arbitrary
//! JSON. [`normalize_date`] turns any of them into a storable string and never
//! fails; [`try_normalize_date`] is the strict variant used on create.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tasktree_common::{DATETIME_FORMATS, DATETIME_OFFSET_FORMATS, DATE_FORMATS};
use thiserror::Error;
use tracing::warn;

/// A date as supplied by a caller, before normalization
#[derive(Debug, Clone, PartialEq)]
pub enum DateValue {
    Utc(DateTime<Utc>),
    Offset(DateTime<FixedOffset>),
    Naive(NaiveDateTime),
    Text(String),
    /// Any non-string JSON value (numbers, booleans, objects, arrays)
    Other(Value),
}

impl From<DateTime<Utc>> for DateValue {
    fn from(value: DateTime<Utc>) -> Self {
        Self::Utc(value)
    }
}

impl From<DateTime<FixedOffset>> for DateValue {
    fn from(value: DateTime<FixedOffset>) -> Self {
        Self::Offset(value)
    }
}

impl From<NaiveDateTime> for DateValue {
    fn from(value: NaiveDateTime) -> Self {
        Self::Naive(value)
    }
}

impl From<&str> for DateValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for DateValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl<'de> Deserialize<'de> for DateValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Value::deserialize(deserializer)? {
            Value::String(s) => Self::Text(s),
            other => Self::Other(other),
        })
    }
}

/// Errors that can occur during date conversion
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DateConversionError {
    /// Date string parsing failed
    #[error("Failed to parse date string '{string}': not an ISO-8601 date or datetime")]
    ParseError { string: String },

    /// The value is not a string or a timestamp
    #[error("Unsupported date value: {0}")]
    UnsupportedType(String),
}

/// Errors that can occur during date validation
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DateValidationError {
    /// Due date cannot be before start date
    #[error("Due date {due_date} cannot be before start date {start_date}")]
    DueBeforeStart { start_date: String, due_date: String },
}

/// Result of [`normalize_date`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedDate {
    /// ISO-8601 string ready to store
    pub value: String,
    /// `true` when the input was unusable and the current time was substituted
    pub fell_back: bool,
}

/// Current UTC time as RFC 3339
#[must_use]
pub fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, false)
}

/// Parse an ISO-8601 string into a UTC-based naive datetime
///
/// A trailing `Z` is treated as `+00:00`. Values without an offset are taken
/// as UTC; plain dates map to midnight.
#[must_use]
pub fn parse_iso8601(s: &str) -> Option<NaiveDateTime> {
    let candidate = match s.strip_suffix('Z').or_else(|| s.strip_suffix('z')) {
        Some(stem) => format!("{stem}+00:00"),
        None => s.to_string(),
    };

    if let Ok(dt) = DateTime::parse_from_rfc3339(&candidate) {
        return Some(dt.naive_utc());
    }
    for fmt in DATETIME_OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(&candidate, fmt) {
            return Some(dt.naive_utc());
        }
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(&candidate, fmt) {
            return Some(dt);
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(&candidate, fmt) {
            return date.and_hms_opt(0, 0, 0);
        }
    }
    None
}

/// Check whether a string is an accepted ISO-8601 date or datetime
#[must_use]
pub fn is_iso8601(s: &str) -> bool {
    parse_iso8601(s).is_some()
}

/// Convert a date value to an ISO-8601 string, or report why it can't be
///
/// Native timestamps are serialized with their offset (naive values without
/// one); accepted strings pass through unchanged.
///
/// # Errors
///
/// Returns an error for unparseable strings and non-date JSON values
pub fn try_normalize_date(value: &DateValue) -> Result<String, DateConversionError> {
    match value {
        DateValue::Utc(dt) => Ok(dt.to_rfc3339_opts(SecondsFormat::AutoSi, false)),
        DateValue::Offset(dt) => Ok(dt.to_rfc3339_opts(SecondsFormat::AutoSi, false)),
        DateValue::Naive(dt) => Ok(dt.format("%Y-%m-%dT%H:%M:%S%.f").to_string()),
        DateValue::Text(s) if is_iso8601(s) => Ok(s.clone()),
        DateValue::Text(s) => Err(DateConversionError::ParseError { string: s.clone() }),
        DateValue::Other(v) => Err(DateConversionError::UnsupportedType(v.to_string())),
    }
}

/// Normalize a date value, falling back to the current time
///
/// Never fails: unusable input is logged with the field name and replaced by
/// the current UTC time, with `fell_back` set.
#[must_use]
pub fn normalize_date(field: &str, value: &DateValue) -> NormalizedDate {
    match try_normalize_date(value) {
        Ok(value) => NormalizedDate {
            value,
            fell_back: false,
        },
        Err(e) => {
            warn!(field, error = %e, "Date conversion failed, falling back to current time");
            NormalizedDate {
                value: now_iso(),
                fell_back: true,
            }
        }
    }
}

/// Check that a due date is not before a start date
///
/// Values that don't parse are not compared.
///
/// # Errors
///
/// Returns an error if `due_date` is strictly before `start_date`
pub fn validate_date_order(start_date: &str, due_date: &str) -> Result<(), DateValidationError> {
    if let (Some(start), Some(due)) = (parse_iso8601(start_date), parse_iso8601(due_date)) {
        if due < start {
            return Err(DateValidationError::DueBeforeStart {
                start_date: start_date.to_string(),
                due_date: due_date.to_string(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_accepts_iso_variants() {
        for s in [
            "2024-03-01",
            "2024-03-01T10:00:00",
            "2024-03-01T10:00:00.123456",
            "2024-03-01 10:00:00",
            "2024-03-01T10:00",
            "2024-03-01T10:00:00Z",
            "2024-03-01T10:00:00+09:00",
            "2024-03-01T10:00:00.5-05:00",
        ] {
            assert!(is_iso8601(s), "{s} should be accepted");
        }
    }

    #[test]
    fn test_rejects_garbage() {
        for s in ["", "not-a-date", "2024-13-01", "03/01/2024", "2024-03-01T25:00:00"] {
            assert!(!is_iso8601(s), "{s} should be rejected");
        }
    }

    #[test]
    fn test_strings_pass_through_unchanged() {
        let value = DateValue::from("2024-03-01T10:00:00Z");
        let normalized = normalize_date("due_date", &value);

        assert_eq!(normalized.value, "2024-03-01T10:00:00Z");
        assert!(!normalized.fell_back);
    }

    #[test]
    fn test_normalization_is_idempotent() {
        let first = normalize_date("start_date", &DateValue::from(Utc::now()));
        let second = normalize_date("start_date", &DateValue::from(first.value.clone()));

        assert_eq!(first.value, second.value);
        assert!(!second.fell_back);
    }

    #[test]
    fn test_native_timestamps_keep_offset() {
        let utc = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        assert_eq!(
            try_normalize_date(&utc.into()).unwrap(),
            "2024-03-01T12:00:00+00:00"
        );

        let tokyo = FixedOffset::east_opt(9 * 3600)
            .unwrap()
            .with_ymd_and_hms(2024, 3, 1, 21, 0, 0)
            .unwrap();
        assert_eq!(
            try_normalize_date(&tokyo.into()).unwrap(),
            "2024-03-01T21:00:00+09:00"
        );

        let naive = NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(8, 30, 0)
            .unwrap();
        assert_eq!(
            try_normalize_date(&naive.into()).unwrap(),
            "2024-03-01T08:30:00"
        );
    }

    #[test]
    fn test_fallback_on_unparseable_string() {
        let normalized = normalize_date("due_date", &DateValue::from("not-a-date"));

        assert!(normalized.fell_back);
        assert!(is_iso8601(&normalized.value));
    }

    #[test]
    fn test_fallback_on_non_string_values() {
        for raw in [json!(12345), json!(true), json!({"a": 1}), json!(null)] {
            let normalized = normalize_date("start_date", &DateValue::Other(raw));
            assert!(normalized.fell_back);
            assert!(is_iso8601(&normalized.value));
        }
    }

    #[test]
    fn test_try_normalize_reports_errors() {
        assert!(matches!(
            try_normalize_date(&DateValue::from("garbage")),
            Err(DateConversionError::ParseError { .. })
        ));
        assert!(matches!(
            try_normalize_date(&DateValue::Other(json!(42))),
            Err(DateConversionError::UnsupportedType(_))
        ));
    }

    #[test]
    fn test_deserialize_date_value() {
        let text: DateValue = serde_json::from_value(json!("2024-03-01")).unwrap();
        assert_eq!(text, DateValue::Text("2024-03-01".to_string()));

        let number: DateValue = serde_json::from_value(json!(7)).unwrap();
        assert_eq!(number, DateValue::Other(json!(7)));
    }

    #[test]
    fn test_parse_iso8601_normalizes_to_utc() {
        let a = parse_iso8601("2024-03-01T09:00:00+09:00").unwrap();
        let b = parse_iso8601("2024-03-01T00:00:00Z").unwrap();
        assert_eq!(a, b);

        let midnight = parse_iso8601("2024-03-01").unwrap();
        assert_eq!(midnight, b);
    }

    #[test]
    fn test_validate_date_order() {
        assert!(validate_date_order("2024-03-01", "2024-03-05").is_ok());
        assert!(validate_date_order("2024-03-01", "2024-03-01").is_ok());
        assert!(matches!(
            validate_date_order("2024-03-05", "2024-03-01"),
            Err(DateValidationError::DueBeforeStart { .. })
        ));
        // Unparseable values are not compared
        assert!(validate_date_order("garbage", "2024-03-01").is_ok());
    }

    #[test]
    fn test_now_iso_is_accepted() {
        assert!(is_iso8601(&now_iso()));
    }
}
