//! Domain model for the entities the action core manipulates.
//!
//! # Responsibility
//! - Define the canonical records for events, tasks, habits, goals and
//!   categories, plus the state transitions each record allows.
//! - Keep storage and request decoding concerns out of the records.
//!
//! # Invariants
//! - Every record is identified by a stable `EntityId` assigned at construction.
//! - Timestamps are UTC epoch milliseconds; calendar dates are `NaiveDate`.
//! - References between records are ids only; records never own each other,
//!   except habit logs which belong to exactly one habit.

pub mod category;
pub mod event;
pub mod goal;
pub mod habit;
pub mod task;

use chrono::{DateTime, NaiveDate, NaiveTime, SecondsFormat, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier shared by every stored record.
pub type EntityId = Uuid;

/// Record kinds known to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Event,
    Task,
    Habit,
    HabitLog,
    Goal,
    Category,
}

impl EntityKind {
    /// Human-readable singular label used in result messages.
    pub fn label(self) -> &'static str {
        match self {
            Self::Event => "event",
            Self::Task => "task",
            Self::Habit => "habit",
            Self::HabitLog => "habit log",
            Self::Goal => "goal",
            Self::Category => "category",
        }
    }

    /// Plural label used in bulk result messages.
    pub fn plural(self) -> &'static str {
        match self {
            Self::Event => "events",
            Self::Task => "tasks",
            Self::Habit => "habits",
            Self::HabitLog => "habit logs",
            Self::Goal => "goals",
            Self::Category => "categories",
        }
    }

    /// Returns `label` or `plural` depending on `count`.
    pub fn counted(self, count: usize) -> &'static str {
        if count == 1 {
            self.label()
        } else {
            self.plural()
        }
    }
}

impl Display for EntityKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Priority shared by events, tasks and goals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

impl Priority {
    pub const SUPPORTED: &'static [&'static str] = &["high", "medium", "low"];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }

    /// Parses a loosely-spelled priority (`High`, `urgent`, `normal`, `3`).
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "high" | "urgent" | "important" | "1" => Some(Self::High),
            "medium" | "normal" | "default" | "2" => Some(Self::Medium),
            "low" | "minor" | "3" => Some(Self::Low),
            _ => None,
        }
    }
}

/// Converts epoch milliseconds into a UTC timestamp.
///
/// Out-of-range values clamp to the Unix epoch instead of panicking.
pub fn timestamp_from_ms(epoch_ms: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(epoch_ms)
        .single()
        .unwrap_or(DateTime::UNIX_EPOCH)
}

/// Formats epoch milliseconds as an RFC 3339 string with second precision.
pub fn format_timestamp(epoch_ms: i64) -> String {
    timestamp_from_ms(epoch_ms).to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Returns the UTC calendar date containing `epoch_ms`.
pub fn date_of(epoch_ms: i64) -> NaiveDate {
    timestamp_from_ms(epoch_ms).date_naive()
}

/// Returns `[start, end)` epoch milliseconds for one UTC calendar day.
pub fn day_bounds(date: NaiveDate) -> (i64, i64) {
    let start = date.and_time(NaiveTime::MIN).and_utc();
    let end = date
        .succ_opt()
        .map(|next| next.and_time(NaiveTime::MIN).and_utc())
        .unwrap_or(start);
    (start.timestamp_millis(), end.timestamp_millis())
}

/// Formats a calendar date as `YYYY-MM-DD`.
pub fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Generates a fresh record identifier.
pub fn new_entity_id() -> EntityId {
    Uuid::new_v4()
}

#[cfg(test)]
mod tests {
    use super::{day_bounds, format_timestamp, Priority};
    use chrono::NaiveDate;

    #[test]
    fn priority_parse_accepts_aliases() {
        assert_eq!(Priority::parse(" HIGH "), Some(Priority::High));
        assert_eq!(Priority::parse("normal"), Some(Priority::Medium));
        assert_eq!(Priority::parse("3"), Some(Priority::Low));
        assert_eq!(Priority::parse("someday"), None);
    }

    #[test]
    fn day_bounds_cover_exactly_one_day() {
        let date = NaiveDate::from_ymd_opt(2025, 1, 1).expect("valid date");
        let (start, end) = day_bounds(date);
        assert_eq!(end - start, 24 * 60 * 60 * 1000);
        assert_eq!(format_timestamp(start), "2025-01-01T00:00:00Z");
    }
}
