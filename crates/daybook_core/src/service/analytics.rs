//! Windowed cross-collection analytics.
//!
//! # Responsibility
//! - Aggregate tasks, habits, wellness, focus and expense records over a
//!   rolling calendar window into a fixed-shape report.
//!
//! # Invariants
//! - The window is `[start, now]` inclusive; records without a parseable
//!   timestamp are excluded.
//! - Month/year windows use calendar-aware subtraction, not fixed day
//!   counts.
//! - Every rate and average guards the zero-denominator case and yields 0,
//!   never NaN.

use crate::model::record::{flag_field, number_field, record_instant, text_field};
use crate::store::DataStore;
use chrono::{DateTime, Duration, Months, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Rolling window length for a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    Week,
    Month,
    Year,
}

/// Error for unrecognized period names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidPeriod(pub String);

impl Display for InvalidPeriod {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid period `{}`; expected week|month|year", self.0)
    }
}

impl Error for InvalidPeriod {}

impl FromStr for Period {
    type Err = InvalidPeriod;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "week" => Ok(Self::Week),
            "month" => Ok(Self::Month),
            "year" => Ok(Self::Year),
            other => Err(InvalidPeriod(other.to_string())),
        }
    }
}

impl Period {
    /// Returns the window start for a report anchored at `now`.
    ///
    /// Month and year subtraction land on the same day-of-month in the
    /// earlier month, clamped when that day does not exist (Mar 31 → Feb 28).
    pub fn window_start(self, now: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            Self::Week => now - Duration::days(7),
            Self::Month => now
                .checked_sub_months(Months::new(1))
                .unwrap_or(now - Duration::days(30)),
            Self::Year => now
                .checked_sub_months(Months::new(12))
                .unwrap_or(now - Duration::days(365)),
        }
    }
}

/// Task section of the report.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStats {
    pub total: u64,
    pub completed: u64,
    pub completion_rate: f64,
    pub by_category: BTreeMap<String, u64>,
    pub by_priority: BTreeMap<String, u64>,
}

/// Habit section of the report.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HabitStats {
    pub active: u64,
    pub total: u64,
    pub completions: u64,
    pub by_category: BTreeMap<String, u64>,
    pub average_completion_rate: f64,
}

/// Wellness section of the report.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WellnessStats {
    pub entries: u64,
    pub average_mood: f64,
    pub average_sleep_hours: f64,
    pub average_energy: f64,
    pub total_water_glasses: f64,
    pub total_steps: f64,
}

/// Focus-session section of the report.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductivityStats {
    pub sessions: u64,
    pub total_minutes: f64,
    pub completed_sessions: u64,
    pub average_session_minutes: f64,
    pub average_quality: f64,
}

/// Financial section of the report.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinancialStats {
    pub total_expenses: f64,
    pub total_income: f64,
    pub expenses_by_category: BTreeMap<String, f64>,
    pub transactions: u64,
}

/// Fixed-shape aggregate over the five analytics collections.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsReport {
    pub period: Period,
    pub window_start: String,
    pub window_end: String,
    pub tasks: TaskStats,
    pub habits: HabitStats,
    pub wellness: WellnessStats,
    pub productivity: ProductivityStats,
    pub financial: FinancialStats,
}

/// Read-only analytics facade over a store.
pub struct AnalyticsEngine<'store> {
    store: &'store DataStore,
}

impl<'store> AnalyticsEngine<'store> {
    pub fn new(store: &'store DataStore) -> Self {
        Self { store }
    }

    /// Builds the report for a window ending now.
    pub fn report(&self, period: Period) -> AnalyticsReport {
        self.report_at(period, Utc::now())
    }

    /// Builds the report for a window ending at an explicit instant.
    pub fn report_at(&self, period: Period, now: DateTime<Utc>) -> AnalyticsReport {
        let start = period.window_start(now);
        let window_days = (now - start).num_days().max(1) as u64;

        AnalyticsReport {
            period,
            window_start: start.to_rfc3339(),
            window_end: now.to_rfc3339(),
            tasks: self.task_stats(start, now),
            habits: self.habit_stats(start, now, window_days),
            wellness: self.wellness_stats(start, now),
            productivity: self.productivity_stats(start, now),
            financial: self.financial_stats(start, now),
        }
    }

    fn collection(&self, key: &str) -> Vec<Value> {
        self.store
            .get_data(key, json!([]))
            .as_array()
            .cloned()
            .unwrap_or_default()
    }

    fn in_window(records: &[Value], start: DateTime<Utc>, end: DateTime<Utc>) -> Vec<&Value> {
        records
            .iter()
            .filter(|record| {
                record_instant(record)
                    .map(|instant| instant >= start && instant <= end)
                    .unwrap_or(false)
            })
            .collect()
    }

    fn task_stats(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> TaskStats {
        let all = self.collection("tasks");
        let tasks = Self::in_window(&all, start, end);

        let total = tasks.len() as u64;
        let completed = tasks
            .iter()
            .filter(|task| flag_field(task, "completed"))
            .count() as u64;

        let mut by_category = BTreeMap::new();
        let mut by_priority = BTreeMap::new();
        for task in &tasks {
            if let Some(category) = text_field(task, "category") {
                *by_category.entry(category).or_insert(0) += 1;
            }
            if let Some(priority) = text_field(task, "priority") {
                *by_priority.entry(priority).or_insert(0) += 1;
            }
        }

        TaskStats {
            total,
            completed,
            completion_rate: percent(completed as f64, total as f64),
            by_category,
            by_priority,
        }
    }

    fn habit_stats(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        window_days: u64,
    ) -> HabitStats {
        let habits = self.collection("habits");
        let total = habits.len() as u64;
        let active: Vec<&Value> = habits
            .iter()
            .filter(|habit| flag_field(habit, "active"))
            .collect();

        let mut completions = 0u64;
        let mut by_category = BTreeMap::new();
        for habit in &active {
            completions += completions_in_window(habit, start, end);
            if let Some(category) = text_field(habit, "category") {
                *by_category.entry(category).or_insert(0) += 1;
            }
        }

        let possible = active.len() as f64 * window_days as f64;

        HabitStats {
            active: active.len() as u64,
            total,
            completions,
            by_category,
            average_completion_rate: percent(completions as f64, possible),
        }
    }

    fn wellness_stats(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> WellnessStats {
        let all = self.collection("wellness");
        let entries = Self::in_window(&all, start, end);
        let count = entries.len() as u64;

        let sum = |field: &str| -> f64 {
            entries
                .iter()
                .filter_map(|entry| number_field(entry, field))
                .sum()
        };

        WellnessStats {
            entries: count,
            average_mood: average(sum("mood"), count as f64),
            average_sleep_hours: average(sum("sleepHours"), count as f64),
            average_energy: average(sum("energyLevel"), count as f64),
            total_water_glasses: sum("waterGlasses"),
            total_steps: sum("steps"),
        }
    }

    fn productivity_stats(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> ProductivityStats {
        let all = self.collection("focusSessions");
        let sessions = Self::in_window(&all, start, end);
        let count = sessions.len() as u64;

        let total_minutes: f64 = sessions
            .iter()
            .filter_map(|session| number_field(session, "duration"))
            .sum();
        let completed = sessions
            .iter()
            .filter(|session| flag_field(session, "completed"))
            .count() as u64;
        let quality_sum: f64 = sessions
            .iter()
            .filter_map(|session| number_field(session, "quality"))
            .sum();

        ProductivityStats {
            sessions: count,
            total_minutes,
            completed_sessions: completed,
            average_session_minutes: average(total_minutes, count as f64),
            average_quality: average(quality_sum, count as f64),
        }
    }

    fn financial_stats(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> FinancialStats {
        let all = self.collection("expenses");
        let transactions = Self::in_window(&all, start, end);

        let mut total_expenses = 0.0;
        let mut total_income = 0.0;
        let mut expenses_by_category: BTreeMap<String, f64> = BTreeMap::new();

        for transaction in &transactions {
            let amount = number_field(transaction, "amount").unwrap_or(0.0);
            match text_field(transaction, "type").as_deref() {
                Some("income") => total_income += amount,
                // Untyped transactions count as expenses; the expense view
                // is the collection's default shape.
                _ => {
                    total_expenses += amount;
                    if let Some(category) = text_field(transaction, "category") {
                        *expenses_by_category.entry(category).or_insert(0.0) += amount;
                    }
                }
            }
        }

        FinancialStats {
            total_expenses,
            total_income,
            expenses_by_category,
            transactions: transactions.len() as u64,
        }
    }
}

/// Counts `true` completion entries whose date key falls inside the window.
fn completions_in_window(habit: &Value, start: DateTime<Utc>, end: DateTime<Utc>) -> u64 {
    let Some(completions) = habit.get("completions").and_then(Value::as_object) else {
        return 0;
    };

    completions
        .iter()
        .filter(|(date, done)| {
            done.as_bool().unwrap_or(false)
                && crate::model::record::parse_instant(date)
                    .map(|instant| instant >= start && instant <= end)
                    .unwrap_or(false)
        })
        .count() as u64
}

fn percent(part: f64, whole: f64) -> f64 {
    if whole == 0.0 {
        return 0.0;
    }
    round2(part / whole * 100.0)
}

fn average(sum: f64, count: f64) -> f64 {
    if count == 0.0 {
        return 0.0;
    }
    round2(sum / count)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
