//! Derived observations over analytics output and habit/mood pairing.
//!
//! # Responsibility
//! - Turn the monthly report into short natural-language observations.
//! - Surface habit↔mood correlation signals from paired daily series.
//!
//! # Invariants
//! - Thresholds are independent and non-exclusive; any subset can fire.
//! - An empty observation list is a valid outcome.
//! - A habit needs at least [`MIN_PAIRED_DAYS`] paired days before it is
//!   considered for correlation.

use crate::model::record::{number_field, record_instant, text_field};
use crate::service::analytics::{AnalyticsEngine, Period};
use crate::store::DataStore;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;

/// Minimum paired (completion, mood) days before a habit is considered.
pub const MIN_PAIRED_DAYS: usize = 6;

/// Mood-point gap a habit must exceed to register as a correlation.
const CORRELATION_GAP: f64 = 0.5;

/// Gap above which a correlation counts as strong.
const STRONG_GAP: f64 = 1.0;

/// One habit↔mood correlation signal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Correlation {
    /// Signal family; currently always `habit-mood`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Habit display name.
    pub habit: String,
    /// Human-readable effect size, e.g. `+1.3 mood points when completed`.
    pub correlation: String,
    /// `strong` or `moderate`.
    pub strength: String,
}

/// Insight facade over a store.
pub struct InsightEngine<'store> {
    store: &'store DataStore,
}

impl<'store> InsightEngine<'store> {
    pub fn new(store: &'store DataStore) -> Self {
        Self { store }
    }

    /// Emits observations for the month ending now.
    pub fn generate_personal_insights(&self) -> Vec<String> {
        self.generate_personal_insights_at(Utc::now())
    }

    /// Observation variant taking an explicit reference instant.
    ///
    /// Each threshold is evaluated independently against the monthly
    /// report; sections without data stay silent rather than firing
    /// suggestions off empty denominators.
    pub fn generate_personal_insights_at(&self, now: DateTime<Utc>) -> Vec<String> {
        let report = AnalyticsEngine::new(self.store).report_at(Period::Month, now);
        let mut insights = Vec::new();

        if report.tasks.total > 0 {
            if report.tasks.completion_rate > 80.0 {
                insights.push(format!(
                    "Great job! You completed {:.0}% of your tasks this month.",
                    report.tasks.completion_rate
                ));
            } else if report.tasks.completion_rate < 50.0 {
                insights.push(
                    "Less than half of this month's tasks are done. Consider breaking large tasks into smaller steps.".to_string(),
                );
            }
        }

        if report.habits.active > 0 && report.habits.average_completion_rate > 75.0 {
            insights.push(format!(
                "Your habits are on track: {:.0}% average completion this month.",
                report.habits.average_completion_rate
            ));
        }

        if report.wellness.entries > 0 {
            if report.wellness.average_mood > 7.0 {
                insights.push(format!(
                    "Your average mood has been high this month ({:.1}/10). Keep it up!",
                    report.wellness.average_mood
                ));
            }
            if report.wellness.average_sleep_hours < 7.0 {
                insights.push(format!(
                    "You averaged {:.1} hours of sleep. Aiming for 7 or more could help your energy.",
                    report.wellness.average_sleep_hours
                ));
            }
        }

        if report.productivity.total_minutes > 1000.0 {
            insights.push(format!(
                "Impressive focus: {:.0} minutes of deep work this month.",
                report.productivity.total_minutes
            ));
        }

        if report.financial.total_income > report.financial.total_expenses {
            insights.push(format!(
                "You saved {:.2} this month (income minus expenses).",
                report.financial.total_income - report.financial.total_expenses
            ));
        }

        insights
    }

    /// Computes habit↔mood correlation signals over the full history.
    ///
    /// For every day with a recorded mood, a habit contributes one paired
    /// point (completed that day, mood that day); absent completion
    /// entries read as not completed. Habits with fewer than
    /// [`MIN_PAIRED_DAYS`] pairs, no completed days, or no mood gap above
    /// the threshold emit nothing.
    pub fn find_data_correlations(&self) -> Vec<Correlation> {
        let mood_by_day = self.mood_by_day();
        if mood_by_day.len() < MIN_PAIRED_DAYS {
            return Vec::new();
        }

        let habits = self
            .store
            .get_data("habits", json!([]))
            .as_array()
            .cloned()
            .unwrap_or_default();

        let mut correlations = Vec::new();
        for habit in &habits {
            let Some(name) =
                text_field(habit, "name").or_else(|| text_field(habit, "id"))
            else {
                continue;
            };

            let completions = habit.get("completions").and_then(Value::as_object);
            let mut completed_moods = Vec::new();
            let mut other_moods = Vec::new();

            for (day, mood) in &mood_by_day {
                let done = completions
                    .and_then(|map| map.get(day))
                    .and_then(Value::as_bool)
                    .unwrap_or(false);
                if done {
                    completed_moods.push(*mood);
                } else {
                    other_moods.push(*mood);
                }
            }

            if completed_moods.is_empty() || other_moods.is_empty() {
                continue;
            }

            let gap = mean(&completed_moods) - mean(&other_moods);
            if gap <= CORRELATION_GAP {
                continue;
            }

            correlations.push(Correlation {
                kind: "habit-mood".to_string(),
                habit: name,
                correlation: format!("+{:.1} mood points when completed", gap),
                strength: if gap > STRONG_GAP {
                    "strong".to_string()
                } else {
                    "moderate".to_string()
                },
            });
        }

        correlations
    }

    /// Collapses wellness entries into a day → mood map.
    ///
    /// Later entries for the same day win, matching read-back order.
    fn mood_by_day(&self) -> BTreeMap<String, f64> {
        let entries = self
            .store
            .get_data("wellness", json!([]))
            .as_array()
            .cloned()
            .unwrap_or_default();

        let mut moods = BTreeMap::new();
        for entry in &entries {
            let Some(instant) = record_instant(entry) else {
                continue;
            };
            let Some(mood) = number_field(entry, "mood") else {
                continue;
            };
            moods.insert(instant.format("%Y-%m-%d").to_string(), mood);
        }
        moods
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}
