//! Column mappings for every stored record type.

use super::{StoreError, StoreResult, StoredEntity};
use crate::model::category::Category;
use crate::model::event::Event;
use crate::model::goal::Goal;
use crate::model::habit::{Habit, HabitFrequency, HabitLog, TrackingType};
use crate::model::task::Task;
use crate::model::{format_date, EntityId, EntityKind, Priority};
use chrono::NaiveDate;
use rusqlite::types::Value;
use rusqlite::Row;
use uuid::Uuid;

impl StoredEntity for Category {
    const KIND: EntityKind = EntityKind::Category;
    const TABLE: &'static str = "categories";
    const COLUMNS: &'static [&'static str] =
        &["id", "name", "color", "icon", "sort_index", "created_at"];
    const ORDER_BY: &'static str = "sort_index ASC, created_at ASC, rowid ASC";

    fn id(&self) -> EntityId {
        self.id
    }

    fn to_values(&self) -> Vec<Value> {
        vec![
            id_value(self.id),
            Value::Text(self.name.clone()),
            Value::Text(self.color.clone()),
            Value::Text(self.icon.clone()),
            Value::Integer(self.sort_index),
            Value::Integer(self.created_at),
        ]
    }

    fn from_row(row: &Row<'_>) -> StoreResult<Self> {
        Ok(Self {
            id: parse_id(row, "categories.id")?,
            name: row.get("name")?,
            color: row.get("color")?,
            icon: row.get("icon")?,
            sort_index: row.get("sort_index")?,
            created_at: row.get("created_at")?,
        })
    }

    fn validate(&self) -> StoreResult<()> {
        require_non_empty(&self.name, "category name")
    }
}

impl StoredEntity for Event {
    const KIND: EntityKind = EntityKind::Event;
    const TABLE: &'static str = "events";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "title",
        "start_at",
        "end_at",
        "is_all_day",
        "category_id",
        "notes",
        "location",
        "is_completed",
        "priority",
        "tags",
        "buffer_before_minutes",
        "buffer_after_minutes",
        "recurrence_rule",
        "created_at",
        "updated_at",
    ];
    const ORDER_BY: &'static str = "start_at ASC, rowid ASC";

    fn id(&self) -> EntityId {
        self.id
    }

    fn to_values(&self) -> Vec<Value> {
        vec![
            id_value(self.id),
            Value::Text(self.title.clone()),
            Value::Integer(self.start_at),
            Value::Integer(self.end_at),
            bool_value(self.is_all_day),
            opt_id_value(self.category_id),
            opt_text_value(self.notes.as_deref()),
            opt_text_value(self.location.as_deref()),
            bool_value(self.is_completed),
            Value::Text(self.priority.as_str().to_string()),
            tags_value(&self.tags),
            Value::Integer(self.buffer_before_minutes),
            Value::Integer(self.buffer_after_minutes),
            opt_text_value(self.recurrence_rule.as_deref()),
            Value::Integer(self.created_at),
            Value::Integer(self.updated_at),
        ]
    }

    fn from_row(row: &Row<'_>) -> StoreResult<Self> {
        Ok(Self {
            id: parse_id(row, "events.id")?,
            title: row.get("title")?,
            start_at: row.get("start_at")?,
            end_at: row.get("end_at")?,
            is_all_day: parse_bool(row, "is_all_day")?,
            category_id: parse_opt_id(row, "category_id")?,
            notes: row.get("notes")?,
            location: row.get("location")?,
            is_completed: parse_bool(row, "is_completed")?,
            priority: parse_priority(row)?,
            tags: parse_tags(row)?,
            buffer_before_minutes: row.get("buffer_before_minutes")?,
            buffer_after_minutes: row.get("buffer_after_minutes")?,
            recurrence_rule: row.get("recurrence_rule")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }

    fn validate(&self) -> StoreResult<()> {
        require_non_empty(&self.title, "event title")?;
        if self.buffer_before_minutes < 0 || self.buffer_after_minutes < 0 {
            return Err(StoreError::Validation(
                "event buffer minutes must not be negative".to_string(),
            ));
        }
        Ok(())
    }
}

impl StoredEntity for Task {
    const KIND: EntityKind = EntityKind::Task;
    const TABLE: &'static str = "tasks";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "title",
        "notes",
        "due_at",
        "is_completed",
        "completed_at",
        "priority",
        "category_id",
        "parent_task_id",
        "linked_event_id",
        "tags",
        "created_at",
        "updated_at",
    ];

    fn id(&self) -> EntityId {
        self.id
    }

    fn to_values(&self) -> Vec<Value> {
        vec![
            id_value(self.id),
            Value::Text(self.title.clone()),
            opt_text_value(self.notes.as_deref()),
            opt_int_value(self.due_at),
            bool_value(self.is_completed),
            opt_int_value(self.completed_at),
            Value::Text(self.priority.as_str().to_string()),
            opt_id_value(self.category_id),
            opt_id_value(self.parent_task_id),
            opt_id_value(self.linked_event_id),
            tags_value(&self.tags),
            Value::Integer(self.created_at),
            Value::Integer(self.updated_at),
        ]
    }

    fn from_row(row: &Row<'_>) -> StoreResult<Self> {
        Ok(Self {
            id: parse_id(row, "tasks.id")?,
            title: row.get("title")?,
            notes: row.get("notes")?,
            due_at: row.get("due_at")?,
            is_completed: parse_bool(row, "is_completed")?,
            completed_at: row.get("completed_at")?,
            priority: parse_priority(row)?,
            category_id: parse_opt_id(row, "category_id")?,
            parent_task_id: parse_opt_id(row, "parent_task_id")?,
            linked_event_id: parse_opt_id(row, "linked_event_id")?,
            tags: parse_tags(row)?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }

    fn validate(&self) -> StoreResult<()> {
        require_non_empty(&self.title, "task title")?;
        if self.parent_task_id == Some(self.id) {
            return Err(StoreError::Validation(
                "a task cannot be its own parent".to_string(),
            ));
        }
        Ok(())
    }
}

impl StoredEntity for Goal {
    const KIND: EntityKind = EntityKind::Goal;
    const TABLE: &'static str = "goals";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "title",
        "notes",
        "target_value",
        "current_value",
        "unit",
        "target_date",
        "priority",
        "category_id",
        "is_completed",
        "completed_at",
        "created_at",
        "updated_at",
    ];

    fn id(&self) -> EntityId {
        self.id
    }

    fn to_values(&self) -> Vec<Value> {
        vec![
            id_value(self.id),
            Value::Text(self.title.clone()),
            opt_text_value(self.notes.as_deref()),
            Value::Real(self.target_value),
            Value::Real(self.current_value),
            opt_text_value(self.unit.as_deref()),
            self.target_date
                .map_or(Value::Null, |date| Value::Text(format_date(date))),
            Value::Text(self.priority.as_str().to_string()),
            opt_id_value(self.category_id),
            bool_value(self.is_completed),
            opt_int_value(self.completed_at),
            Value::Integer(self.created_at),
            Value::Integer(self.updated_at),
        ]
    }

    fn from_row(row: &Row<'_>) -> StoreResult<Self> {
        let target_date = match row.get::<_, Option<String>>("target_date")? {
            Some(text) => Some(parse_date(&text, "goals.target_date")?),
            None => None,
        };
        Ok(Self {
            id: parse_id(row, "goals.id")?,
            title: row.get("title")?,
            notes: row.get("notes")?,
            target_value: row.get("target_value")?,
            current_value: row.get("current_value")?,
            unit: row.get("unit")?,
            target_date,
            priority: parse_priority(row)?,
            category_id: parse_opt_id(row, "category_id")?,
            is_completed: parse_bool(row, "is_completed")?,
            completed_at: row.get("completed_at")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }

    fn validate(&self) -> StoreResult<()> {
        require_non_empty(&self.title, "goal title")?;
        if !self.target_value.is_finite() || !self.current_value.is_finite() {
            return Err(StoreError::Validation(
                "goal values must be finite numbers".to_string(),
            ));
        }
        Ok(())
    }
}

impl StoredEntity for Habit {
    const KIND: EntityKind = EntityKind::Habit;
    const TABLE: &'static str = "habits";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "name",
        "notes",
        "frequency",
        "tracking_type",
        "goal_target",
        "unit",
        "category_id",
        "created_at",
        "updated_at",
    ];

    fn id(&self) -> EntityId {
        self.id
    }

    fn to_values(&self) -> Vec<Value> {
        vec![
            id_value(self.id),
            Value::Text(self.name.clone()),
            opt_text_value(self.notes.as_deref()),
            Value::Text(self.frequency.as_str().to_string()),
            Value::Text(self.tracking_type.as_str().to_string()),
            Value::Real(self.goal_target),
            opt_text_value(self.unit.as_deref()),
            opt_id_value(self.category_id),
            Value::Integer(self.created_at),
            Value::Integer(self.updated_at),
        ]
    }

    fn from_row(row: &Row<'_>) -> StoreResult<Self> {
        let frequency_text: String = row.get("frequency")?;
        let frequency = HabitFrequency::parse(&frequency_text).ok_or_else(|| {
            StoreError::InvalidData(format!(
                "invalid frequency `{frequency_text}` in habits.frequency"
            ))
        })?;
        let tracking_text: String = row.get("tracking_type")?;
        let tracking_type = TrackingType::parse(&tracking_text).ok_or_else(|| {
            StoreError::InvalidData(format!(
                "invalid tracking type `{tracking_text}` in habits.tracking_type"
            ))
        })?;

        Ok(Self {
            id: parse_id(row, "habits.id")?,
            name: row.get("name")?,
            notes: row.get("notes")?,
            frequency,
            tracking_type,
            goal_target: row.get("goal_target")?,
            unit: row.get("unit")?,
            category_id: parse_opt_id(row, "category_id")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }

    fn validate(&self) -> StoreResult<()> {
        require_non_empty(&self.name, "habit name")?;
        if !self.goal_target.is_finite() || self.goal_target <= 0.0 {
            return Err(StoreError::Validation(
                "habit goal target must be a positive number".to_string(),
            ));
        }
        Ok(())
    }
}

impl StoredEntity for HabitLog {
    const KIND: EntityKind = EntityKind::HabitLog;
    const TABLE: &'static str = "habit_logs";
    const COLUMNS: &'static [&'static str] =
        &["id", "habit_id", "logged_on", "value", "notes", "created_at"];
    const ORDER_BY: &'static str = "logged_on ASC, rowid ASC";

    fn id(&self) -> EntityId {
        self.id
    }

    fn to_values(&self) -> Vec<Value> {
        vec![
            id_value(self.id),
            id_value(self.habit_id),
            Value::Text(format_date(self.logged_on)),
            Value::Real(self.value),
            opt_text_value(self.notes.as_deref()),
            Value::Integer(self.created_at),
        ]
    }

    fn from_row(row: &Row<'_>) -> StoreResult<Self> {
        let habit_text: String = row.get("habit_id")?;
        let logged_text: String = row.get("logged_on")?;
        Ok(Self {
            id: parse_id(row, "habit_logs.id")?,
            habit_id: parse_uuid(&habit_text, "habit_logs.habit_id")?,
            logged_on: parse_date(&logged_text, "habit_logs.logged_on")?,
            value: row.get("value")?,
            notes: row.get("notes")?,
            created_at: row.get("created_at")?,
        })
    }

    fn validate(&self) -> StoreResult<()> {
        if !self.value.is_finite() {
            return Err(StoreError::Validation(
                "habit log value must be a finite number".to_string(),
            ));
        }
        Ok(())
    }
}

fn require_non_empty(value: &str, field: &str) -> StoreResult<()> {
    if value.trim().is_empty() {
        return Err(StoreError::Validation(format!("{field} must not be empty")));
    }
    Ok(())
}

fn id_value(id: EntityId) -> Value {
    Value::Text(id.to_string())
}

fn opt_id_value(id: Option<EntityId>) -> Value {
    id.map_or(Value::Null, id_value)
}

fn opt_text_value(value: Option<&str>) -> Value {
    value.map_or(Value::Null, |text| Value::Text(text.to_string()))
}

fn opt_int_value(value: Option<i64>) -> Value {
    value.map_or(Value::Null, Value::Integer)
}

fn bool_value(value: bool) -> Value {
    Value::Integer(i64::from(value))
}

fn tags_value(tags: &[String]) -> Value {
    // Serializing a list of strings cannot fail.
    Value::Text(serde_json::to_string(tags).unwrap_or_else(|_| "[]".to_string()))
}

fn parse_uuid(value: &str, column: &str) -> StoreResult<EntityId> {
    Uuid::parse_str(value)
        .map_err(|_| StoreError::InvalidData(format!("invalid uuid value `{value}` in {column}")))
}

fn parse_id(row: &Row<'_>, column: &str) -> StoreResult<EntityId> {
    let text: String = row.get("id")?;
    parse_uuid(&text, column)
}

fn parse_opt_id(row: &Row<'_>, column: &str) -> StoreResult<Option<EntityId>> {
    match row.get::<_, Option<String>>(column)? {
        Some(text) => Ok(Some(parse_uuid(&text, column)?)),
        None => Ok(None),
    }
}

fn parse_bool(row: &Row<'_>, column: &str) -> StoreResult<bool> {
    match row.get::<_, i64>(column)? {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(StoreError::InvalidData(format!(
            "invalid boolean value `{other}` in {column}"
        ))),
    }
}

fn parse_priority(row: &Row<'_>) -> StoreResult<Priority> {
    let text: String = row.get("priority")?;
    Priority::parse(&text)
        .ok_or_else(|| StoreError::InvalidData(format!("invalid priority `{text}`")))
}

fn parse_tags(row: &Row<'_>) -> StoreResult<Vec<String>> {
    let text: String = row.get("tags")?;
    serde_json::from_str(&text)
        .map_err(|err| StoreError::InvalidData(format!("invalid tags `{text}`: {err}")))
}

fn parse_date(value: &str, column: &str) -> StoreResult<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| StoreError::InvalidData(format!("invalid date `{value}` in {column}")))
}
