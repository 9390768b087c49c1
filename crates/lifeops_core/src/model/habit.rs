//! Habit record, log entries and derived streak counters.
//!
//! # Invariants
//! - Streak counters are never stored; `compute_streaks` derives them from
//!   the log on every read.
//! - A period qualifies when its summed log value is positive (binary) or
//!   reaches `goal_target` (quantity).
//! - The current period not yet qualifying does not break the streak.

use super::{new_entity_id, EntityId};
use chrono::{Datelike, Months, NaiveDate, TimeDelta};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HabitFrequency {
    #[default]
    Daily,
    Weekly,
    Monthly,
}

impl HabitFrequency {
    pub const SUPPORTED: &'static [&'static str] = &["daily", "weekly", "monthly"];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "daily" | "day" | "every day" => Some(Self::Daily),
            "weekly" | "week" | "every week" => Some(Self::Weekly),
            "monthly" | "month" | "every month" => Some(Self::Monthly),
            _ => None,
        }
    }

    /// First day of the period containing `date`.
    pub fn period_start(self, date: NaiveDate) -> NaiveDate {
        match self {
            Self::Daily => date,
            Self::Weekly => {
                date - TimeDelta::days(i64::from(date.weekday().num_days_from_monday()))
            }
            Self::Monthly => date.with_day(1).unwrap_or(date),
        }
    }

    /// Start of the period immediately before the one starting at `period_start`.
    fn previous_period(self, period_start: NaiveDate) -> Option<NaiveDate> {
        match self {
            Self::Daily => period_start.pred_opt(),
            Self::Weekly => period_start.checked_sub_signed(TimeDelta::days(7)),
            Self::Monthly => period_start.checked_sub_months(Months::new(1)),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TrackingType {
    /// Done / not done.
    #[default]
    Binary,
    /// Numeric amount compared against `goal_target`.
    Quantity,
}

impl TrackingType {
    pub const SUPPORTED: &'static [&'static str] = &["binary", "quantity"];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Binary => "binary",
            Self::Quantity => "quantity",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "binary" | "boolean" | "bool" | "yes_no" | "check" | "checkbox" => Some(Self::Binary),
            "quantity" | "count" | "numeric" | "number" | "amount" => Some(Self::Quantity),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Habit {
    pub id: EntityId,
    pub name: String,
    pub notes: Option<String>,
    pub frequency: HabitFrequency,
    pub tracking_type: TrackingType,
    /// Per-period target; meaningful for `TrackingType::Quantity`.
    pub goal_target: f64,
    pub unit: Option<String>,
    pub category_id: Option<EntityId>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Habit {
    pub fn new(name: impl Into<String>, now_ms: i64) -> Self {
        Self {
            id: new_entity_id(),
            name: name.into(),
            notes: None,
            frequency: HabitFrequency::default(),
            tracking_type: TrackingType::default(),
            goal_target: 1.0,
            unit: None,
            category_id: None,
            created_at: now_ms,
            updated_at: now_ms,
        }
    }

    fn qualifies(&self, period_total: f64) -> bool {
        match self.tracking_type {
            TrackingType::Binary => period_total > 0.0,
            TrackingType::Quantity => period_total >= self.goal_target,
        }
    }
}

/// One dated, valued entry for a habit.
#[derive(Debug, Clone, PartialEq)]
pub struct HabitLog {
    pub id: EntityId,
    pub habit_id: EntityId,
    pub logged_on: NaiveDate,
    pub value: f64,
    pub notes: Option<String>,
    pub created_at: i64,
}

impl HabitLog {
    pub fn new(habit_id: EntityId, logged_on: NaiveDate, value: f64, now_ms: i64) -> Self {
        Self {
            id: new_entity_id(),
            habit_id,
            logged_on,
            value,
            notes: None,
            created_at: now_ms,
        }
    }
}

/// Streak counters derived from a habit log.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StreakSummary {
    /// Consecutive qualifying periods ending at the current (or previous) period.
    pub current_streak: u32,
    /// Longest run of consecutive qualifying periods in history.
    pub longest_streak: u32,
    /// Summed value logged in the period containing `today`.
    pub current_period_value: f64,
    /// Whether the period containing `today` already qualifies.
    pub completed_current_period: bool,
    pub total_logs: usize,
}

/// Recomputes streak counters for `habit` from its log entries.
///
/// Entries dated after `today` are ignored.
pub fn compute_streaks(habit: &Habit, logs: &[HabitLog], today: NaiveDate) -> StreakSummary {
    let frequency = habit.frequency;
    let mut totals: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    let mut total_logs = 0;
    for log in logs.iter().filter(|log| log.logged_on <= today) {
        *totals
            .entry(frequency.period_start(log.logged_on))
            .or_insert(0.0) += log.value;
        total_logs += 1;
    }

    let qualifying: Vec<NaiveDate> = totals
        .iter()
        .filter(|(_, total)| habit.qualifies(**total))
        .map(|(period, _)| *period)
        .collect();

    let mut longest_streak = 0;
    let mut run = 0;
    let mut previous: Option<NaiveDate> = None;
    for period in &qualifying {
        run = match previous {
            Some(prev) if frequency.previous_period(*period) == Some(prev) => run + 1,
            _ => 1,
        };
        longest_streak = longest_streak.max(run);
        previous = Some(*period);
    }

    let current_start = frequency.period_start(today);
    let current_period_value = totals.get(&current_start).copied().unwrap_or(0.0);
    let completed_current_period = habit.qualifies(current_period_value);

    let mut cursor = if completed_current_period {
        Some(current_start)
    } else {
        frequency.previous_period(current_start)
    };
    let mut current_streak = 0;
    while let Some(period) = cursor {
        let qualifies = totals
            .get(&period)
            .is_some_and(|total| habit.qualifies(*total));
        if !qualifies {
            break;
        }
        current_streak += 1;
        cursor = frequency.previous_period(period);
    }

    StreakSummary {
        current_streak,
        longest_streak,
        current_period_value,
        completed_current_period,
        total_logs,
    }
}

#[cfg(test)]
mod tests {
    use super::{compute_streaks, Habit, HabitFrequency, HabitLog, TrackingType};
    use chrono::NaiveDate;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn logs_on(habit: &Habit, days: &[(NaiveDate, f64)]) -> Vec<HabitLog> {
        days.iter()
            .map(|(date, value)| HabitLog::new(habit.id, *date, *value, 0))
            .collect()
    }

    #[test]
    fn daily_streak_counts_consecutive_days_including_today() {
        let habit = Habit::new("stretch", 0);
        let logs = logs_on(
            &habit,
            &[
                (day(2025, 3, 1), 1.0),
                (day(2025, 3, 2), 1.0),
                (day(2025, 3, 4), 1.0),
                (day(2025, 3, 5), 1.0),
                (day(2025, 3, 6), 1.0),
            ],
        );

        let summary = compute_streaks(&habit, &logs, day(2025, 3, 6));
        assert_eq!(summary.current_streak, 3);
        assert_eq!(summary.longest_streak, 3);
        assert!(summary.completed_current_period);
        assert_eq!(summary.total_logs, 5);
    }

    #[test]
    fn unfinished_today_does_not_break_streak() {
        let habit = Habit::new("read", 0);
        let logs = logs_on(&habit, &[(day(2025, 3, 4), 1.0), (day(2025, 3, 5), 1.0)]);

        let summary = compute_streaks(&habit, &logs, day(2025, 3, 6));
        assert_eq!(summary.current_streak, 2);
        assert!(!summary.completed_current_period);

        let broken = compute_streaks(&habit, &logs, day(2025, 3, 7));
        assert_eq!(broken.current_streak, 0);
        assert_eq!(broken.longest_streak, 2);
    }

    #[test]
    fn quantity_habit_qualifies_on_summed_value() {
        let mut habit = Habit::new("water", 0);
        habit.tracking_type = TrackingType::Quantity;
        habit.goal_target = 8.0;
        let logs = logs_on(
            &habit,
            &[
                (day(2025, 3, 5), 8.0),
                (day(2025, 3, 6), 5.0),
                (day(2025, 3, 6), 3.0),
                (day(2025, 3, 7), 2.0),
            ],
        );

        let summary = compute_streaks(&habit, &logs, day(2025, 3, 7));
        assert_eq!(summary.current_streak, 2);
        assert_eq!(summary.current_period_value, 2.0);
        assert!(!summary.completed_current_period);
    }

    #[test]
    fn weekly_habit_counts_iso_weeks() {
        let mut habit = Habit::new("long run", 0);
        habit.frequency = HabitFrequency::Weekly;
        // Mondays: 2025-03-03, 2025-03-10, 2025-03-17
        let logs = logs_on(
            &habit,
            &[
                (day(2025, 3, 5), 1.0),
                (day(2025, 3, 15), 1.0),
                (day(2025, 3, 17), 1.0),
            ],
        );

        let summary = compute_streaks(&habit, &logs, day(2025, 3, 19));
        assert_eq!(summary.current_streak, 3);
        assert_eq!(summary.longest_streak, 3);
    }

    #[test]
    fn future_entries_are_ignored() {
        let habit = Habit::new("meditate", 0);
        let logs = logs_on(&habit, &[(day(2025, 3, 10), 1.0)]);
        let summary = compute_streaks(&habit, &logs, day(2025, 3, 1));
        assert_eq!(summary.total_logs, 0);
        assert_eq!(summary.longest_streak, 0);
    }
}
