//! Task record and its completion state machine.
//!
//! `open --(complete)--> completed --(reopen)--> open`, fully reversible.

use super::{new_entity_id, EntityId, Priority};

#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    pub id: EntityId,
    pub title: String,
    pub notes: Option<String>,
    pub due_at: Option<i64>,
    pub is_completed: bool,
    /// Set exactly while `is_completed` is true.
    pub completed_at: Option<i64>,
    pub priority: Priority,
    pub category_id: Option<EntityId>,
    /// Single-level parent reference. Only self-reference is rejected.
    pub parent_task_id: Option<EntityId>,
    pub linked_event_id: Option<EntityId>,
    pub tags: Vec<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Task {
    pub fn new(title: impl Into<String>, now_ms: i64) -> Self {
        Self {
            id: new_entity_id(),
            title: title.into(),
            notes: None,
            due_at: None,
            is_completed: false,
            completed_at: None,
            priority: Priority::default(),
            category_id: None,
            parent_task_id: None,
            linked_event_id: None,
            tags: Vec::new(),
            created_at: now_ms,
            updated_at: now_ms,
        }
    }

    /// Applies a completion transition.
    ///
    /// Re-completing an already completed task keeps the original timestamp.
    pub fn set_completed(&mut self, completed: bool, now_ms: i64) {
        if completed {
            if !self.is_completed {
                self.completed_at = Some(now_ms);
            }
            self.is_completed = true;
        } else {
            self.is_completed = false;
            self.completed_at = None;
        }
    }

    /// Open tasks whose due time has passed.
    pub fn is_overdue(&self, now_ms: i64) -> bool {
        !self.is_completed && self.due_at.is_some_and(|due| due < now_ms)
    }
}
