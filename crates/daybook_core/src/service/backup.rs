//! Snapshot export/import, automatic backups, archival and usage reporting.
//!
//! # Responsibility
//! - Serialize the whole namespace into a restorable snapshot envelope.
//! - Maintain a sliding window of daily automatic backups.
//! - Move records past the retention horizon into year-stamped archives.
//!
//! # Invariants
//! - Snapshots exclude automatic-backup keys and are sufficient to
//!   reconstruct the namespace.
//! - The automatic-backup pass never fails or blocks the write that
//!   triggered it; failures are logged and swallowed.
//! - Archival never discards a record: everything lands in the active
//!   collection or its archive.

use crate::model::record::{archive_key, record_instant, AUTO_BACKUP_PREFIX, KNOWN_COLLECTIONS};
use crate::store::{ChangeEvent, DataStore};
use chrono::{DateTime, Datelike, Duration, Months, Utc};
use log::{info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::{json, Map, Value};

/// Snapshot envelope format version.
pub const EXPORT_VERSION: &str = "1.0";

static AUTO_BACKUP_KEY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^auto_backup_\d{4}-\d{2}-\d{2}$").expect("valid backup key regex"));

/// Per-key usage entry for the storage report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyUsage {
    pub key: String,
    /// Human-readable stored size, e.g. `3.20 KB`.
    pub size: String,
}

/// Namespace usage summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageInfo {
    /// Human-readable total of all stored values.
    pub total_size: String,
    /// Same total in bytes, for programmatic callers.
    pub total_bytes: u64,
    /// Percentage of the assumed capacity in use.
    pub utilization_percent: f64,
    /// Ten largest keys by stored size, largest first.
    pub top_keys: Vec<KeyUsage>,
    /// Approximate record count: sequence lengths, 1 per scalar value.
    pub item_count: u64,
}

/// Backup and archival facade over a store.
pub struct BackupManager<'store> {
    store: &'store DataStore,
}

impl<'store> BackupManager<'store> {
    pub fn new(store: &'store DataStore) -> Self {
        Self { store }
    }

    /// Serializes every non-backup key into a snapshot envelope.
    pub fn export_all_data(&self) -> String {
        self.export_all_data_at(Utc::now())
    }

    /// Snapshot variant taking an explicit reference instant.
    pub fn export_all_data_at(&self, now: DateTime<Utc>) -> String {
        snapshot_envelope(self.store, now).to_string()
    }

    /// Restores a snapshot produced by [`Self::export_all_data`].
    ///
    /// # Contract
    /// - Returns `false` when the envelope is unparseable or its `data`
    ///   field is missing or not an object; nothing is written in that case.
    /// - On success, first takes an automatic backup of the current state
    ///   (restoring that backup undoes the import), then overwrites each
    ///   key from `data` one at a time, then broadcasts a namespace-wide
    ///   change event.
    /// - Keys are written individually; an interrupted import can leave a
    ///   partially-restored namespace. The pre-import backup is the
    ///   recovery path.
    pub fn import_all_data(&self, snapshot: &str) -> bool {
        self.import_all_data_at(snapshot, Utc::now())
    }

    /// Import variant taking an explicit reference instant.
    pub fn import_all_data_at(&self, snapshot: &str, now: DateTime<Utc>) -> bool {
        let parsed: Value = match serde_json::from_str(snapshot) {
            Ok(value) => value,
            Err(err) => {
                warn!("event=import_rejected module=backup status=error error={err}");
                return false;
            }
        };

        let Some(data) = parsed.get("data").and_then(Value::as_object) else {
            warn!(
                "event=import_rejected module=backup status=error error=missing `data` object"
            );
            return false;
        };

        // Forced refresh: the undo snapshot must capture the exact
        // pre-import state even when a backup for today already exists.
        self.write_daily_snapshot(now, true);

        let mut written = 0usize;
        for (key, value) in data {
            if self.store.set_data(key, value) {
                written += 1;
            }
        }

        self.store.notify(ChangeEvent {
            key: "*".to_string(),
            value: Value::Null,
        });
        info!(
            "event=import_applied module=backup status=ok keys={} written={written}",
            data.len()
        );
        true
    }

    /// Runs the daily backup pass for the current day.
    pub fn create_auto_backup(&self) {
        self.create_auto_backup_at(Utc::now());
    }

    /// Daily backup pass anchored at an explicit instant.
    ///
    /// Writes today's snapshot under `auto_backup_<yyyy-mm-dd>`, one per
    /// calendar day: once the day's snapshot exists, later passes are
    /// no-ops, so a snapshot taken before an import survives subsequent
    /// writes. After writing, prunes snapshots beyond the retention
    /// window, newest kept first. Best-effort: every failure is logged,
    /// none propagate.
    pub fn create_auto_backup_at(&self, now: DateTime<Utc>) {
        self.write_daily_snapshot(now, false);
    }

    fn write_daily_snapshot(&self, now: DateTime<Utc>, force: bool) {
        let key = format!("{AUTO_BACKUP_PREFIX}{}", now.format("%Y-%m-%d"));
        if !force && self.store.stored(&key).is_some() {
            return;
        }

        let snapshot = json!({
            "version": EXPORT_VERSION,
            "createdAt": now.to_rfc3339(),
            "data": snapshot_data(self.store),
        });

        if !self.store.set_data(&key, &snapshot) {
            warn!("event=backup_failed module=backup status=error key={key}");
            return;
        }
        info!("event=backup_created module=backup status=ok key={key}");

        self.prune_auto_backups();
    }

    fn prune_auto_backups(&self) {
        let mut backup_keys: Vec<String> = self
            .store
            .keys()
            .into_iter()
            .filter(|key| AUTO_BACKUP_KEY_RE.is_match(key))
            .collect();

        // Date-stamped keys sort chronologically; newest first after reverse.
        backup_keys.sort();
        backup_keys.reverse();

        let retention = self.store.config().backup_retention;
        for stale in backup_keys.iter().skip(retention) {
            if self.store.remove_data(stale) {
                info!("event=backup_pruned module=backup status=ok key={stale}");
            }
        }
    }

    /// Moves records older than the retention horizon into archives.
    pub fn archive_old_data(&self) -> Vec<String> {
        self.archive_old_data_at(Utc::now())
    }

    /// Archival pass anchored at an explicit instant.
    ///
    /// For each known collection, records whose timestamp predates
    /// `now - max_history_years` move to `<name>_archive_<year>`; records
    /// without a parseable timestamp stay active. Returns one summary line
    /// per collection that changed.
    pub fn archive_old_data_at(&self, now: DateTime<Utc>) -> Vec<String> {
        let horizon_months = self.store.config().max_history_years.max(0) as u32 * 12;
        let cutoff = now
            .checked_sub_months(Months::new(horizon_months))
            .unwrap_or(now - Duration::days(i64::from(horizon_months) * 30));

        let mut summaries = Vec::new();
        for key in KNOWN_COLLECTIONS {
            let Some(records) = self.store.get_data(key, Value::Null).as_array().cloned() else {
                continue;
            };

            let (old, active): (Vec<Value>, Vec<Value>) =
                records.into_iter().partition(|record| {
                    record_instant(record)
                        .map(|instant| instant < cutoff)
                        .unwrap_or(false)
                });

            if old.is_empty() {
                continue;
            }

            let archive = archive_key(key, now.year());
            let mut archived = self
                .store
                .get_data(&archive, json!([]))
                .as_array()
                .cloned()
                .unwrap_or_default();
            let moved = old.len();
            archived.extend(old);

            // Archive is written before the active collection shrinks, so an
            // interruption duplicates records instead of losing them.
            if !self.store.set_data(&archive, &Value::Array(archived)) {
                continue;
            }
            self.store.set_data(key, &Value::Array(active));
            summaries.push(format!("{key}: archived {moved} records to {archive}"));
        }

        info!(
            "event=archive_pass module=backup status=ok collections={}",
            summaries.len()
        );
        summaries
    }

    /// Reports namespace usage against the assumed capacity.
    pub fn get_storage_info(&self) -> StorageInfo {
        let mut total_bytes = 0u64;
        let mut usage: Vec<(String, u64)> = Vec::new();
        let mut item_count = 0u64;

        for key in self.store.keys() {
            let size = self
                .store
                .stored(&key)
                .map(|stored| stored.len() as u64)
                .unwrap_or(0);
            total_bytes += size;

            match self.store.get_data(&key, Value::Null) {
                Value::Array(records) => item_count += records.len() as u64,
                _ => item_count += 1,
            }

            usage.push((key, size));
        }

        usage.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        let capacity = self.store.config().capacity_bytes;
        let utilization = if capacity == 0 {
            0.0
        } else {
            (total_bytes as f64 / capacity as f64 * 10_000.0).round() / 100.0
        };

        StorageInfo {
            total_size: format_size(total_bytes),
            total_bytes,
            utilization_percent: utilization,
            top_keys: usage
                .into_iter()
                .take(10)
                .map(|(key, size)| KeyUsage {
                    key,
                    size: format_size(size),
                })
                .collect(),
            item_count,
        }
    }
}

/// Builds the export envelope for the namespace at `now`.
fn snapshot_envelope(store: &DataStore, now: DateTime<Utc>) -> Value {
    json!({
        "version": EXPORT_VERSION,
        "exportedAt": now.to_rfc3339(),
        "data": snapshot_data(store),
    })
}

/// Collects every non-backup key into a snapshot `data` object.
fn snapshot_data(store: &DataStore) -> Value {
    let mut data = Map::new();
    for key in store.keys() {
        if key.starts_with(AUTO_BACKUP_PREFIX) {
            continue;
        }
        data.insert(key.clone(), store.get_data(&key, Value::Null));
    }
    Value::Object(data)
}

/// Daily backup hook invoked from the store write path.
///
/// Kept free of error returns on purpose: the triggering write already
/// succeeded and must not be failed retroactively.
pub(crate) fn auto_backup_pass(store: &DataStore) {
    BackupManager::new(store).create_auto_backup_at(Utc::now());
}

/// Formats a byte count as `B`, `KB` or `MB` with two decimals.
pub fn format_size(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = 1024.0 * 1024.0;

    let bytes = bytes as f64;
    if bytes >= MB {
        format!("{:.2} MB", bytes / MB)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes / KB)
    } else {
        format!("{bytes:.0} B")
    }
}
