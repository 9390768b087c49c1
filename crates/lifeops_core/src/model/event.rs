//! Calendar event record.
//!
//! # Invariants
//! - `start_at <= end_at` is checked by request validation, not by the record.
//! - `recurrence_rule` is opaque here; expansion belongs to the recurrence engine.

use super::{new_entity_id, EntityId, Priority};

/// Default duration applied when an event is created without an end time.
pub const DEFAULT_EVENT_DURATION_MS: i64 = 60 * 60 * 1000;
/// Default duration applied to all-day events created without an end time.
pub const ALL_DAY_DURATION_MS: i64 = 24 * 60 * 60 * 1000;

#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub id: EntityId,
    pub title: String,
    pub start_at: i64,
    pub end_at: i64,
    pub is_all_day: bool,
    pub category_id: Option<EntityId>,
    pub notes: Option<String>,
    pub location: Option<String>,
    pub is_completed: bool,
    pub priority: Priority,
    pub tags: Vec<String>,
    /// Minutes reserved before `start_at`.
    pub buffer_before_minutes: i64,
    /// Minutes reserved after `end_at`.
    pub buffer_after_minutes: i64,
    pub recurrence_rule: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Event {
    /// Creates an event with default optional fields.
    pub fn new(title: impl Into<String>, start_at: i64, end_at: i64, now_ms: i64) -> Self {
        Self {
            id: new_entity_id(),
            title: title.into(),
            start_at,
            end_at,
            is_all_day: false,
            category_id: None,
            notes: None,
            location: None,
            is_completed: false,
            priority: Priority::default(),
            tags: Vec::new(),
            buffer_before_minutes: 0,
            buffer_after_minutes: 0,
            recurrence_rule: None,
            created_at: now_ms,
            updated_at: now_ms,
        }
    }

    /// Returns whether `[start_at, end_at]` intersects `[range_start, range_end)`.
    pub fn overlaps(&self, range_start: i64, range_end: i64) -> bool {
        self.start_at < range_end && self.end_at >= range_start
    }
}
