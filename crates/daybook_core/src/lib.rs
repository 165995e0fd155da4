//! Local data core for Daybook.
//! This crate is the single source of truth for namespace persistence,
//! analytics, integrity repair, backups and derived insights.

pub mod codec;
pub mod logging;
pub mod model;
pub mod service;
pub mod storage;
pub mod store;

pub use codec::{CodecError, CodecResult, EncodedEnvelope};
pub use logging::{default_log_level, init_logging, logging_status};
pub use service::analytics::{AnalyticsEngine, AnalyticsReport, InvalidPeriod, Period};
pub use service::backup::{BackupManager, KeyUsage, StorageInfo, EXPORT_VERSION};
pub use service::insight::{Correlation, InsightEngine, MIN_PAIRED_DAYS};
pub use service::integrity::{IntegrityManager, RepairReport};
pub use storage::{
    open_backend, open_backend_in_memory, MemoryBackend, SqliteBackend, StorageBackend,
    StorageError, StorageResult,
};
pub use store::{ChangeEvent, ChangeObserver, DataStore, StoreConfig};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
