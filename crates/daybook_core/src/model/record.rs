//! Field access over dynamic collection records.
//!
//! # Responsibility
//! - Extract identity and timestamp fields from arbitrary JSON records.
//! - Hold the known-collection list used by repair, backup and archival.
//!
//! # Invariants
//! - Timestamp precedence is `date`, then `createdAt`, then `dueDate`.
//! - Plain `YYYY-MM-DD` dates resolve to midnight UTC.

use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value;

/// Domain collections the core knows by name.
///
/// This is the contract list shared with UI collaborators; repair and
/// archival only ever touch these keys.
pub const KNOWN_COLLECTIONS: &[&str] = &[
    "tasks",
    "habits",
    "habitsEnhanced",
    "wellness",
    "focusSessions",
    "expenses",
    "books",
    "recipes",
    "ideas",
    "learning",
    "enhancedEvents",
];

/// Key prefix reserved for automatic backup snapshots.
pub const AUTO_BACKUP_PREFIX: &str = "auto_backup_";

/// Builds the archive key for a collection and archival year.
pub fn archive_key(collection: &str, year: i32) -> String {
    format!("{collection}_archive_{year}")
}

/// Returns the record's `id` when present and non-empty.
pub fn record_id(record: &Value) -> Option<&str> {
    record
        .get("id")
        .and_then(Value::as_str)
        .filter(|id| !id.trim().is_empty())
}

/// Returns the record's relevant instant for time-windowed filtering.
///
/// Tries `date`, `createdAt`, `dueDate` in that order and returns the first
/// field that parses. Records without any parseable timestamp are excluded
/// from windowed computations by callers.
pub fn record_instant(record: &Value) -> Option<DateTime<Utc>> {
    ["date", "createdAt", "dueDate"]
        .iter()
        .filter_map(|field| record.get(*field).and_then(Value::as_str))
        .find_map(parse_instant)
}

/// Parses an RFC3339 instant or a plain `YYYY-MM-DD` date (midnight UTC).
pub fn parse_instant(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(instant) = DateTime::parse_from_rfc3339(text) {
        return Some(instant.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Returns a numeric field as `f64`, accepting both integers and floats.
pub fn number_field(record: &Value, field: &str) -> Option<f64> {
    record.get(field).and_then(Value::as_f64)
}

/// Returns a boolean field; absent or non-boolean values read as `false`.
pub fn flag_field(record: &Value, field: &str) -> bool {
    record.get(field).and_then(Value::as_bool).unwrap_or(false)
}

/// Returns a string field as an owned value when present and non-empty.
pub fn text_field(record: &Value, field: &str) -> Option<String> {
    record
        .get(field)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::{parse_instant, record_id, record_instant};
    use chrono::{Datelike, Timelike};
    use serde_json::json;

    #[test]
    fn record_id_rejects_blank_and_missing() {
        assert_eq!(record_id(&json!({"id": "a-1"})), Some("a-1"));
        assert_eq!(record_id(&json!({"id": "  "})), None);
        assert_eq!(record_id(&json!({"id": 42})), None);
        assert_eq!(record_id(&json!({})), None);
    }

    #[test]
    fn record_instant_prefers_date_over_created_at() {
        let record = json!({"date": "2024-03-01", "createdAt": "2020-01-01"});
        let instant = record_instant(&record).unwrap();
        assert_eq!((instant.year(), instant.month()), (2024, 3));
    }

    #[test]
    fn record_instant_falls_back_through_precedence() {
        let record = json!({"createdAt": "not a date", "dueDate": "2023-07-15"});
        let instant = record_instant(&record).unwrap();
        assert_eq!(instant.day(), 15);
    }

    #[test]
    fn parse_instant_accepts_rfc3339_and_plain_dates() {
        let full = parse_instant("2024-01-02T10:30:00Z").unwrap();
        assert_eq!(full.hour(), 10);

        let plain = parse_instant("2024-01-02").unwrap();
        assert_eq!((plain.hour(), plain.minute()), (0, 0));

        assert!(parse_instant("yesterday").is_none());
    }
}
