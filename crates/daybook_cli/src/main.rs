//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `daybook_core` linkage.
//! - Keep output deterministic for quick local sanity checks.

use daybook_core::{BackupManager, DataStore, MemoryBackend};

fn main() {
    let store = DataStore::new(Box::new(MemoryBackend::new()));
    let info = BackupManager::new(&store).get_storage_info();

    println!("daybook_core version={}", daybook_core::core_version());
    println!(
        "daybook_core empty_namespace total={} items={}",
        info.total_size, info.item_count
    );
}
