//! Duplicate and malformed-record repair across known collections.
//!
//! # Responsibility
//! - Deduplicate records by `id`, keeping the first occurrence in order.
//! - Synthesize ids for records that lack one.
//! - Isolate per-collection failures so one broken collection never blocks
//!   repair of the others.
//!
//! # Invariants
//! - After a repair pass, no two records in a collection share an `id` and
//!   every record has a non-empty one.
//! - Running the pass twice in a row repairs nothing on the second run.

use crate::codec;
use crate::model::record::{record_id, KNOWN_COLLECTIONS};
use crate::store::DataStore;
use log::info;
use serde_json::{json, Value};
use std::collections::HashSet;
use uuid::Uuid;

/// Outcome of one repair pass. Both lists may be empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepairReport {
    /// Human-readable summaries of collections that were changed.
    pub repaired: Vec<String>,
    /// Per-collection inspection failures (collection name + cause).
    pub errors: Vec<String>,
}

/// Repair facade over a store.
pub struct IntegrityManager<'store> {
    store: &'store DataStore,
}

impl<'store> IntegrityManager<'store> {
    pub fn new(store: &'store DataStore) -> Self {
        Self { store }
    }

    /// Scans every known collection and repairs what it can.
    ///
    /// Missing collections are skipped. Collections whose stored form cannot
    /// be inspected are reported in `errors` and left untouched.
    pub fn validate_and_repair(&self) -> RepairReport {
        let mut report = RepairReport::default();

        for key in KNOWN_COLLECTIONS {
            match self.inspect(key) {
                Ok(None) => {}
                Ok(Some(records)) => self.repair_collection(key, records, &mut report),
                Err(cause) => report.errors.push(format!("{key}: {cause}")),
            }
        }

        info!(
            "event=repair_pass module=integrity status=ok repaired={} errors={}",
            report.repaired.len(),
            report.errors.len()
        );
        report
    }

    /// Loads one collection for inspection.
    ///
    /// Reads the stored form directly so corruption surfaces as an error
    /// here instead of being masked by the read-path default.
    fn inspect(&self, key: &str) -> Result<Option<Vec<Value>>, String> {
        let Some(stored) = self.store.stored(key) else {
            return Ok(None);
        };

        let parsed: Value = serde_json::from_str(&stored)
            .map_err(|err| format!("stored value is not valid JSON ({err})"))?;
        let value = codec::decode_if_envelope(parsed).map_err(|err| err.to_string())?;

        match value {
            Value::Array(records) => Ok(Some(records)),
            other => Err(format!(
                "expected a record sequence, found {}",
                json_kind(&other)
            )),
        }
    }

    fn repair_collection(&self, key: &str, records: Vec<Value>, report: &mut RepairReport) {
        let mut seen: HashSet<String> = HashSet::new();
        let mut kept: Vec<Value> = Vec::with_capacity(records.len());
        let mut duplicates = 0usize;
        let mut assigned = 0usize;

        for mut record in records {
            match record_id(&record) {
                Some(id) => {
                    if !seen.insert(id.to_string()) {
                        duplicates += 1;
                        continue;
                    }
                }
                None => {
                    let id = Uuid::new_v4().to_string();
                    if let Some(object) = record.as_object_mut() {
                        object.insert("id".to_string(), json!(id));
                    } else {
                        // Scalar entries cannot carry an id; wrap them so
                        // identity survives without losing the payload.
                        record = json!({"id": id, "value": record});
                    }
                    seen.insert(id);
                    assigned += 1;
                }
            }
            kept.push(record);
        }

        if duplicates == 0 && assigned == 0 {
            return;
        }

        if !self.store.set_data(key, &Value::Array(kept)) {
            report
                .errors
                .push(format!("{key}: failed to persist repaired collection"));
            return;
        }

        if duplicates > 0 {
            report
                .repaired
                .push(format!("{key}: removed {duplicates} duplicate records"));
        }
        if assigned > 0 {
            report
                .repaired
                .push(format!("{key}: assigned {assigned} missing ids"));
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a sequence",
        Value::Object(_) => "an object",
    }
}
