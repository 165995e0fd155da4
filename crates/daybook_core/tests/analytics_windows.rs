use chrono::{DateTime, Utc};
use daybook_core::{AnalyticsEngine, DataStore, MemoryBackend, Period, StoreConfig};
use serde_json::json;

fn store() -> DataStore {
    DataStore::with_config(
        Box::new(MemoryBackend::new()),
        StoreConfig {
            auto_backup: false,
            ..StoreConfig::default()
        },
    )
}

fn now() -> DateTime<Utc> {
    "2024-06-15T12:00:00Z".parse().unwrap()
}

#[test]
fn empty_namespace_yields_all_zero_rates_and_averages() {
    let store = store();
    let report = AnalyticsEngine::new(&store).report_at(Period::Month, now());

    assert_eq!(report.tasks.total, 0);
    assert_eq!(report.tasks.completion_rate, 0.0);
    assert_eq!(report.habits.average_completion_rate, 0.0);
    assert_eq!(report.wellness.average_mood, 0.0);
    assert_eq!(report.wellness.average_sleep_hours, 0.0);
    assert_eq!(report.productivity.average_session_minutes, 0.0);
    assert_eq!(report.productivity.average_quality, 0.0);
    assert_eq!(report.financial.total_expenses, 0.0);

    assert!(report.tasks.completion_rate.is_finite());
    assert!(report.habits.average_completion_rate.is_finite());
}

#[test]
fn tasks_outside_the_window_are_excluded() {
    let store = store();
    store.set_data(
        "tasks",
        &json!([
            {"id": "t-1", "date": "2024-06-10", "completed": true},
            {"id": "t-2", "date": "2024-06-12", "completed": false},
            {"id": "t-3", "date": "2023-01-01", "completed": true},
            {"id": "t-4", "title": "no timestamp at all"}
        ]),
    );

    let report = AnalyticsEngine::new(&store).report_at(Period::Month, now());
    assert_eq!(report.tasks.total, 2);
    assert_eq!(report.tasks.completed, 1);
    assert_eq!(report.tasks.completion_rate, 50.0);
}

#[test]
fn task_group_bys_count_category_and_priority() {
    let store = store();
    store.set_data(
        "tasks",
        &json!([
            {"id": "t-1", "date": "2024-06-10", "category": "home", "priority": "high"},
            {"id": "t-2", "date": "2024-06-11", "category": "home", "priority": "low"},
            {"id": "t-3", "date": "2024-06-12", "category": "work", "priority": "high"}
        ]),
    );

    let report = AnalyticsEngine::new(&store).report_at(Period::Week, now());
    assert_eq!(report.tasks.by_category["home"], 2);
    assert_eq!(report.tasks.by_category["work"], 1);
    assert_eq!(report.tasks.by_priority["high"], 2);
}

#[test]
fn window_boundaries_are_inclusive() {
    let store = store();
    let week_start = Period::Week.window_start(now());
    store.set_data(
        "tasks",
        &json!([
            {"id": "t-edge", "date": week_start.to_rfc3339(), "completed": true},
            {"id": "t-now", "date": now().to_rfc3339(), "completed": true}
        ]),
    );

    let report = AnalyticsEngine::new(&store).report_at(Period::Week, now());
    assert_eq!(report.tasks.total, 2);
}

#[test]
fn habit_stats_count_only_active_habits_for_completions() {
    let store = store();
    store.set_data(
        "habits",
        &json!([
            {
                "id": "h-1", "name": "stretch", "active": true, "category": "health",
                "completions": {"2024-06-10": true, "2024-06-11": true, "2024-06-12": false}
            },
            {
                "id": "h-2", "name": "read", "active": true, "category": "mind",
                "completions": {"2024-06-13": true, "2023-06-13": true}
            },
            {
                "id": "h-3", "name": "abandoned", "active": false,
                "completions": {"2024-06-10": true}
            }
        ]),
    );

    let report = AnalyticsEngine::new(&store).report_at(Period::Week, now());
    assert_eq!(report.habits.total, 3);
    assert_eq!(report.habits.active, 2);
    // h-1 has two true entries in the window, h-2 one; the inactive habit
    // and the out-of-window completion do not count.
    assert_eq!(report.habits.completions, 3);
    assert_eq!(report.habits.by_category["health"], 1);
    assert_eq!(report.habits.by_category["mind"], 1);
    // 3 completions over 2 active habits * 7 days.
    assert_eq!(report.habits.average_completion_rate, 21.43);
}

#[test]
fn wellness_averages_and_totals() {
    let store = store();
    store.set_data(
        "wellness",
        &json!([
            {"id": "w-1", "date": "2024-06-13", "mood": 8, "sleepHours": 7.5, "energyLevel": 6, "waterGlasses": 5, "steps": 9000},
            {"id": "w-2", "date": "2024-06-14", "mood": 6, "sleepHours": 6.5, "energyLevel": 4, "waterGlasses": 3, "steps": 4000}
        ]),
    );

    let report = AnalyticsEngine::new(&store).report_at(Period::Week, now());
    assert_eq!(report.wellness.entries, 2);
    assert_eq!(report.wellness.average_mood, 7.0);
    assert_eq!(report.wellness.average_sleep_hours, 7.0);
    assert_eq!(report.wellness.average_energy, 5.0);
    assert_eq!(report.wellness.total_water_glasses, 8.0);
    assert_eq!(report.wellness.total_steps, 13000.0);
}

#[test]
fn productivity_aggregates_focus_sessions() {
    let store = store();
    store.set_data(
        "focusSessions",
        &json!([
            {"id": "f-1", "date": "2024-06-13", "duration": 50, "completed": true, "quality": 4},
            {"id": "f-2", "date": "2024-06-14", "duration": 30, "completed": false, "quality": 2},
            {"id": "f-3", "date": "2024-01-01", "duration": 90, "completed": true, "quality": 5}
        ]),
    );

    let report = AnalyticsEngine::new(&store).report_at(Period::Week, now());
    assert_eq!(report.productivity.sessions, 2);
    assert_eq!(report.productivity.total_minutes, 80.0);
    assert_eq!(report.productivity.completed_sessions, 1);
    assert_eq!(report.productivity.average_session_minutes, 40.0);
    assert_eq!(report.productivity.average_quality, 3.0);
}

#[test]
fn financial_stats_split_income_and_expenses() {
    let store = store();
    store.set_data(
        "expenses",
        &json!([
            {"id": "e-1", "date": "2024-06-10", "type": "expense", "amount": 40.0, "category": "groceries"},
            {"id": "e-2", "date": "2024-06-11", "type": "expense", "amount": 10.0, "category": "groceries"},
            {"id": "e-3", "date": "2024-06-12", "type": "expense", "amount": 25.0, "category": "transport"},
            {"id": "e-4", "date": "2024-06-13", "type": "income", "amount": 500.0}
        ]),
    );

    let report = AnalyticsEngine::new(&store).report_at(Period::Week, now());
    assert_eq!(report.financial.total_expenses, 75.0);
    assert_eq!(report.financial.total_income, 500.0);
    assert_eq!(report.financial.expenses_by_category["groceries"], 50.0);
    assert_eq!(report.financial.expenses_by_category["transport"], 25.0);
    assert_eq!(report.financial.transactions, 4);
}

#[test]
fn year_window_spans_a_full_calendar_year() {
    let store = store();
    store.set_data(
        "tasks",
        &json!([
            {"id": "t-1", "date": "2023-07-01", "completed": true},
            {"id": "t-2", "date": "2023-06-01", "completed": true}
        ]),
    );

    let report = AnalyticsEngine::new(&store).report_at(Period::Year, now());
    assert_eq!(report.tasks.total, 1);
}

#[test]
fn created_at_is_used_when_date_is_absent() {
    let store = store();
    store.set_data(
        "tasks",
        &json!([{"id": "t-1", "createdAt": "2024-06-14T09:00:00Z", "completed": true}]),
    );

    let report = AnalyticsEngine::new(&store).report_at(Period::Week, now());
    assert_eq!(report.tasks.total, 1);
}
