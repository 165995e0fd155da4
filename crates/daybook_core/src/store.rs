//! Key-value store facade over an injected storage backend.
//!
//! # Responsibility
//! - Provide the `get_data`/`set_data` contract UI collaborators rely on.
//! - Apply the payload codec transparently on both sides of persistence.
//! - Broadcast change events to registered observers.
//!
//! # Invariants
//! - `get_data` never raises; any failure is masked by the caller default.
//! - `set_data` never raises; failures are logged and reported as `false`.
//! - Callers never observe whether the stored bytes were encoded.
//! - Automatic backup failures never block or fail the triggering write.

use crate::codec;
use crate::model::record::AUTO_BACKUP_PREFIX;
use crate::service::backup;
use crate::storage::StorageBackend;
use log::{debug, error, warn};
use serde_json::Value;
use std::sync::Arc;

/// Tunables for store behavior.
///
/// Defaults mirror the application contract: a 10k-character encode
/// threshold, daily auto-backups with a 7-snapshot retention window, a
/// 10-year archival horizon and a 5 MiB assumed capacity.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Serialized-size threshold above which values are encoded.
    pub encode_threshold: usize,
    /// Whether successful writes trigger the daily backup pass.
    pub auto_backup: bool,
    /// Number of daily snapshots kept by the retention sweep.
    pub backup_retention: usize,
    /// Age in years beyond which records are archived.
    pub max_history_years: i32,
    /// Assumed namespace capacity used for utilization reporting.
    pub capacity_bytes: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            encode_threshold: 10_000,
            auto_backup: true,
            backup_retention: 7,
            max_history_years: 10,
            capacity_bytes: 5 * 1024 * 1024,
        }
    }
}

/// Payload delivered to observers after a successful write.
#[derive(Debug, Clone)]
pub struct ChangeEvent {
    pub key: String,
    pub value: Value,
}

/// Receiver for data-change broadcasts.
///
/// Delivery is at-least-once and fire-and-forget; observer order is
/// unspecified and must not be relied upon for correctness.
pub trait ChangeObserver {
    fn data_changed(&self, event: &ChangeEvent);
}

/// Namespace store all core services operate through.
pub struct DataStore {
    backend: Box<dyn StorageBackend>,
    config: StoreConfig,
    observers: Vec<Arc<dyn ChangeObserver>>,
}

impl DataStore {
    /// Creates a store with default configuration.
    pub fn new(backend: Box<dyn StorageBackend>) -> Self {
        Self::with_config(backend, StoreConfig::default())
    }

    /// Creates a store with explicit configuration.
    pub fn with_config(backend: Box<dyn StorageBackend>, config: StoreConfig) -> Self {
        Self {
            backend,
            config,
            observers: Vec::new(),
        }
    }

    /// Returns the active configuration.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Registers a change observer.
    ///
    /// Observers are registered during setup, before the store is shared;
    /// registration is not available on shared references.
    pub fn subscribe(&mut self, observer: Arc<dyn ChangeObserver>) {
        self.observers.push(observer);
    }

    /// Returns the value stored under `key`, or `default` when the key is
    /// absent or its stored form cannot be read back.
    ///
    /// # Contract
    /// - Never raises; read and decode failures are logged and masked.
    /// - Encoded payloads are reversed transparently.
    pub fn get_data(&self, key: &str, default: Value) -> Value {
        let stored = match self.backend.read(key) {
            Ok(Some(text)) => text,
            Ok(None) => return default,
            Err(err) => {
                warn!("event=kv_read_masked module=store status=error key={key} error={err}");
                return default;
            }
        };

        let parsed: Value = match serde_json::from_str(&stored) {
            Ok(value) => value,
            Err(err) => {
                warn!("event=kv_read_masked module=store status=error key={key} error={err}");
                return default;
            }
        };

        match codec::decode_if_envelope(parsed) {
            Ok(value) => value,
            Err(err) => {
                warn!("event=decode_failed module=store status=error key={key} error={err}");
                default
            }
        }
    }

    /// Persists `value` under `key` and broadcasts a change event.
    ///
    /// Values whose serialized form crosses the encode threshold are wrapped
    /// in the codec envelope before persistence.
    ///
    /// # Contract
    /// - Returns `false` and logs on any failure; never raises.
    /// - On success, triggers the daily backup pass when auto-backup is
    ///   enabled and the key is not itself a backup snapshot.
    pub fn set_data(&self, key: &str, value: &Value) -> bool {
        let serialized = match serde_json::to_string(value) {
            Ok(text) => text,
            Err(err) => {
                error!("event=kv_write_failed module=store status=error key={key} error={err}");
                return false;
            }
        };

        let stored = if serialized.chars().count() > self.config.encode_threshold {
            match codec::encode(value).and_then(|envelope| {
                serde_json::to_string(&envelope).map_err(codec::CodecError::from)
            }) {
                Ok(text) => text,
                Err(err) => {
                    error!(
                        "event=kv_write_failed module=store status=error key={key} error={err}"
                    );
                    return false;
                }
            }
        } else {
            serialized
        };

        if let Err(err) = self.backend.write(key, &stored) {
            error!("event=kv_write_failed module=store status=error key={key} error={err}");
            return false;
        }

        debug!("event=kv_write module=store status=ok key={key} bytes={}", stored.len());
        self.notify(ChangeEvent {
            key: key.to_string(),
            value: value.clone(),
        });

        if self.config.auto_backup && !key.starts_with(AUTO_BACKUP_PREFIX) {
            backup::auto_backup_pass(self);
        }

        true
    }

    /// Removes `key` from the namespace. Returns `false` on backend failure.
    pub fn remove_data(&self, key: &str) -> bool {
        match self.backend.remove(key) {
            Ok(()) => true,
            Err(err) => {
                error!("event=kv_remove_failed module=store status=error key={key} error={err}");
                false
            }
        }
    }

    /// Returns every key in the namespace, sorted ascending.
    ///
    /// Backend failures are masked as an empty list.
    pub fn keys(&self) -> Vec<String> {
        match self.backend.keys() {
            Ok(keys) => keys,
            Err(err) => {
                warn!("event=kv_read_masked module=store status=error key=* error={err}");
                Vec::new()
            }
        }
    }

    /// Returns the stored serialized form of `key` without reversing the
    /// codec envelope. Used for size accounting.
    pub fn stored(&self, key: &str) -> Option<String> {
        self.backend.read(key).ok().flatten()
    }

    /// Broadcasts one change event to all registered observers.
    pub(crate) fn notify(&self, event: ChangeEvent) {
        for observer in &self.observers {
            observer.data_changed(&event);
        }
    }
}
