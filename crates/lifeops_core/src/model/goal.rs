//! Goal record and its completion state machine.
//!
//! `not_completed --(progress reaches target | explicit completion)--> completed`.
//! There is no transition out of `completed`.

use super::{new_entity_id, EntityId, Priority};
use chrono::NaiveDate;

#[derive(Debug, Clone, PartialEq)]
pub struct Goal {
    pub id: EntityId,
    pub title: String,
    pub notes: Option<String>,
    pub target_value: f64,
    pub current_value: f64,
    pub unit: Option<String>,
    pub target_date: Option<NaiveDate>,
    pub priority: Priority,
    pub category_id: Option<EntityId>,
    pub is_completed: bool,
    pub completed_at: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Progress input accepted by `Goal::apply_progress`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GoalProgress {
    /// Replace `current_value`.
    Absolute(f64),
    /// Add to `current_value` (may be negative).
    Increment(f64),
}

impl Goal {
    pub fn new(title: impl Into<String>, target_value: f64, now_ms: i64) -> Self {
        Self {
            id: new_entity_id(),
            title: title.into(),
            notes: None,
            target_value,
            current_value: 0.0,
            unit: None,
            target_date: None,
            priority: Priority::default(),
            category_id: None,
            is_completed: false,
            completed_at: None,
            created_at: now_ms,
            updated_at: now_ms,
        }
    }

    /// Applies value progress and flips completion once the target is reached.
    ///
    /// Returns `true` when this call transitioned the goal into `completed`.
    pub fn apply_progress(&mut self, progress: GoalProgress, now_ms: i64) -> bool {
        self.current_value = match progress {
            GoalProgress::Absolute(value) => value,
            GoalProgress::Increment(delta) => self.current_value + delta,
        };

        if !self.is_completed && self.current_value >= self.target_value {
            self.mark_completed(now_ms);
            return true;
        }
        false
    }

    /// Explicit completion, independent of the current value.
    pub fn mark_completed(&mut self, now_ms: i64) {
        if !self.is_completed {
            self.is_completed = true;
            self.completed_at = Some(now_ms);
        }
    }

    /// Fraction of the target reached, clamped to `[0, 1]`.
    pub fn progress_ratio(&self) -> f64 {
        if self.target_value <= 0.0 {
            return if self.is_completed { 1.0 } else { 0.0 };
        }
        (self.current_value / self.target_value).clamp(0.0, 1.0)
    }

    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        !self.is_completed && self.target_date.is_some_and(|date| date < today)
    }
}

#[cfg(test)]
mod tests {
    use super::{Goal, GoalProgress};

    #[test]
    fn increment_reaching_target_completes_goal() {
        let mut goal = Goal::new("read books", 100.0, 0);
        goal.current_value = 90.0;

        let completed = goal.apply_progress(GoalProgress::Increment(10.0), 500);

        assert!(completed);
        assert_eq!(goal.current_value, 100.0);
        assert!(goal.is_completed);
        assert_eq!(goal.completed_at, Some(500));
    }

    #[test]
    fn progress_below_target_keeps_goal_open() {
        let mut goal = Goal::new("save", 10.0, 0);
        assert!(!goal.apply_progress(GoalProgress::Absolute(9.5), 1));
        assert!(!goal.is_completed);
        assert_eq!(goal.completed_at, None);
    }

    #[test]
    fn completed_goal_stays_completed_when_value_drops() {
        let mut goal = Goal::new("run", 5.0, 0);
        goal.apply_progress(GoalProgress::Absolute(5.0), 10);
        assert!(!goal.apply_progress(GoalProgress::Increment(-3.0), 20));
        assert!(goal.is_completed);
        assert_eq!(goal.completed_at, Some(10));
    }
}
