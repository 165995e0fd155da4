use chrono::{DateTime, Utc};
use daybook_core::{BackupManager, DataStore, MemoryBackend, StoreConfig};
use serde_json::{json, Value};

fn store() -> DataStore {
    DataStore::with_config(
        Box::new(MemoryBackend::new()),
        StoreConfig {
            auto_backup: false,
            ..StoreConfig::default()
        },
    )
}

fn day(text: &str) -> DateTime<Utc> {
    format!("{text}T10:00:00Z").parse().unwrap()
}

#[test]
fn export_wraps_every_collection_in_an_envelope() {
    let store = store();
    store.set_data("tasks", &json!([{"id": "t-1"}]));
    store.set_data("wellness", &json!([{"id": "w-1", "mood": 7}]));

    let snapshot = BackupManager::new(&store).export_all_data();
    let parsed: Value = serde_json::from_str(&snapshot).unwrap();

    assert_eq!(parsed["version"], "1.0");
    assert!(parsed["exportedAt"].as_str().is_some());
    assert_eq!(parsed["data"]["tasks"], json!([{"id": "t-1"}]));
    assert_eq!(parsed["data"]["wellness"][0]["mood"], 7);
}

#[test]
fn export_excludes_automatic_backups() {
    let store = store();
    store.set_data("tasks", &json!([{"id": "t-1"}]));

    let manager = BackupManager::new(&store);
    manager.create_auto_backup_at(day("2024-06-01"));

    let snapshot = manager.export_all_data();
    let parsed: Value = serde_json::from_str(&snapshot).unwrap();
    let data = parsed["data"].as_object().unwrap();

    assert!(data.contains_key("tasks"));
    assert!(!data.keys().any(|key| key.starts_with("auto_backup_")));
}

#[test]
fn snapshot_roundtrip_restores_the_namespace() {
    let source = store();
    source.set_data("tasks", &json!([{"id": "t-1", "completed": true}]));
    source.set_data("expenses", &json!([{"id": "e-1", "amount": 9.99}]));

    let snapshot = BackupManager::new(&source).export_all_data();

    let target = store();
    assert!(BackupManager::new(&target).import_all_data(&snapshot));

    assert_eq!(
        target.get_data("tasks", Value::Null),
        json!([{"id": "t-1", "completed": true}])
    );
    assert_eq!(
        target.get_data("expenses", Value::Null),
        json!([{"id": "e-1", "amount": 9.99}])
    );
}

#[test]
fn import_rejects_snapshots_without_a_data_object() {
    let store = store();
    store.set_data("tasks", &json!([{"id": "keep-me"}]));

    let manager = BackupManager::new(&store);
    assert!(!manager.import_all_data("not json at all"));
    assert!(!manager.import_all_data(r#"{"version": "1.0"}"#));
    assert!(!manager.import_all_data(r#"{"version": "1.0", "data": [1, 2]}"#));

    assert_eq!(store.get_data("tasks", Value::Null), json!([{"id": "keep-me"}]));
}

#[test]
fn import_takes_an_undo_backup_of_the_current_state() {
    let store = store();
    store.set_data("tasks", &json!([{"id": "original"}]));

    let manager = BackupManager::new(&store);
    let incoming = r#"{"version": "1.0", "data": {"tasks": [{"id": "imported"}]}}"#;
    let now = day("2024-06-20");
    assert!(manager.import_all_data_at(incoming, now));

    assert_eq!(store.get_data("tasks", Value::Null), json!([{"id": "imported"}]));

    // The pre-import snapshot restores the original state.
    let backup = store.get_data("auto_backup_2024-06-20", Value::Null);
    assert_eq!(backup["data"]["tasks"], json!([{"id": "original"}]));

    assert!(manager.import_all_data_at(&backup.to_string(), now));
    assert_eq!(store.get_data("tasks", Value::Null), json!([{"id": "original"}]));
}

#[test]
fn auto_backup_writes_one_snapshot_per_day() {
    let store = store();
    store.set_data("tasks", &json!([{"id": "t-1"}]));

    let manager = BackupManager::new(&store);
    manager.create_auto_backup_at(day("2024-06-01"));

    store.set_data("tasks", &json!([{"id": "t-1"}, {"id": "t-2"}]));
    manager.create_auto_backup_at(day("2024-06-01"));

    // The first snapshot of the day wins.
    let backup = store.get_data("auto_backup_2024-06-01", Value::Null);
    assert_eq!(backup["data"]["tasks"].as_array().unwrap().len(), 1);
}

#[test]
fn retention_keeps_the_seven_most_recent_daily_snapshots() {
    let store = store();
    store.set_data("tasks", &json!([{"id": "t-1"}]));

    let manager = BackupManager::new(&store);
    for day_of_month in 1..=10 {
        manager.create_auto_backup_at(day(&format!("2024-06-{day_of_month:02}")));
    }

    let backups: Vec<String> = store
        .keys()
        .into_iter()
        .filter(|key| key.starts_with("auto_backup_"))
        .collect();

    assert_eq!(backups.len(), 7);
    assert_eq!(backups.first().unwrap(), "auto_backup_2024-06-04");
    assert_eq!(backups.last().unwrap(), "auto_backup_2024-06-10");
}

#[test]
fn archive_partitions_records_without_losing_any() {
    let store = store();
    store.set_data(
        "tasks",
        &json!([
            {"id": "ancient", "date": "2010-01-01"},
            {"id": "old", "date": "2013-05-05"},
            {"id": "recent", "date": "2024-01-01"}
        ]),
    );

    let manager = BackupManager::new(&store);
    let now = day("2024-06-15");
    let summaries = manager.archive_old_data_at(now);

    assert_eq!(summaries.len(), 1);
    assert!(summaries[0].contains("tasks: archived 2 records"));

    let active = store.get_data("tasks", json!([]));
    let archived = store.get_data("tasks_archive_2024", json!([]));
    assert_eq!(active.as_array().unwrap().len(), 1);
    assert_eq!(active[0]["id"], "recent");
    assert_eq!(archived.as_array().unwrap().len(), 2);

    let total = active.as_array().unwrap().len() + archived.as_array().unwrap().len();
    assert_eq!(total, 3);
}

#[test]
fn archive_appends_to_an_existing_archive_collection() {
    let store = store();
    store.set_data("tasks_archive_2024", &json!([{"id": "previously-archived"}]));
    store.set_data("tasks", &json!([{"id": "old", "date": "2012-03-03"}]));

    BackupManager::new(&store).archive_old_data_at(day("2024-06-15"));

    let archived = store.get_data("tasks_archive_2024", json!([]));
    assert_eq!(archived.as_array().unwrap().len(), 2);
}

#[test]
fn records_without_timestamps_stay_active() {
    let store = store();
    store.set_data("ideas", &json!([{"id": "undated"}]));

    let summaries = BackupManager::new(&store).archive_old_data_at(day("2024-06-15"));

    assert!(summaries.is_empty());
    assert_eq!(store.get_data("ideas", json!([])).as_array().unwrap().len(), 1);
}

#[test]
fn storage_info_reports_sizes_and_item_counts() {
    let store = store();
    store.set_data("tasks", &json!([{"id": "t-1"}, {"id": "t-2"}]));
    store.set_data("settings", &json!({"theme": "dark"}));

    let info = BackupManager::new(&store).get_storage_info();

    assert!(info.total_bytes > 0);
    assert!(info.total_size.ends_with(" B") || info.total_size.ends_with(" KB"));
    assert!(info.utilization_percent > 0.0);
    assert_eq!(info.item_count, 3);
    assert_eq!(info.top_keys.len(), 2);
    // Largest key first.
    assert_eq!(info.top_keys[0].key, "tasks");
}

#[test]
fn storage_info_on_empty_namespace_is_all_zero() {
    let store = store();
    let info = BackupManager::new(&store).get_storage_info();

    assert_eq!(info.total_bytes, 0);
    assert_eq!(info.total_size, "0 B");
    assert_eq!(info.utilization_percent, 0.0);
    assert_eq!(info.item_count, 0);
    assert!(info.top_keys.is_empty());
}
