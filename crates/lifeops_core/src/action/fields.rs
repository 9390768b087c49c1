//! Field tables: every logical request field and its accepted key spellings.
//!
//! Keys are tried in the listed order; the first present key wins.

use super::params::Field;
use crate::model::EntityKind;

/// Identifier and collection keys for one domain.
#[derive(Debug, Clone, Copy)]
pub struct DomainKeys {
    pub kind: EntityKind,
    /// Single identifier (`id` or entity-specific alias).
    pub id: Field,
    /// Explicit identifier list for bulk update/delete.
    pub ids: Field,
    /// Array of request objects for bulk create/update.
    pub items: Field,
    /// Shared filter keys this domain evaluates; any other is rejected.
    pub filters: &'static [FilterKey],
}

/// Shared filter keys beyond identifiers, `filter` and `limit`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKey {
    Date,
    Range,
    Completion,
    Category,
}

impl FilterKey {
    pub const ALL: &'static [FilterKey] = &[
        FilterKey::Date,
        FilterKey::Range,
        FilterKey::Completion,
        FilterKey::Category,
    ];

    pub fn fields(self) -> &'static [Field] {
        match self {
            Self::Date => DATE_FIELDS,
            Self::Range => RANGE_FIELDS,
            Self::Completion => COMPLETION_FIELDS,
            Self::Category => CATEGORY_FIELDS,
        }
    }
}

const DATE_FIELDS: &[Field] = &[DATE];
const RANGE_FIELDS: &[Field] = &[RANGE_START, RANGE_END];
const COMPLETION_FIELDS: &[Field] = &[IS_COMPLETED];
const CATEGORY_FIELDS: &[Field] = &[CATEGORY, CATEGORY_ID, CATEGORY_NAME];

pub const EVENT_KEYS: DomainKeys = DomainKeys {
    kind: EntityKind::Event,
    id: Field::new("id", &["id", "event_id", "eventId"]),
    ids: Field::new("ids", &["ids", "event_ids", "eventIds"]),
    items: Field::new("items", &["items", "events"]),
    filters: FilterKey::ALL,
};

pub const TASK_KEYS: DomainKeys = DomainKeys {
    kind: EntityKind::Task,
    id: Field::new("id", &["id", "task_id", "taskId"]),
    ids: Field::new("ids", &["ids", "task_ids", "taskIds"]),
    items: Field::new("items", &["items", "tasks"]),
    filters: FilterKey::ALL,
};

pub const HABIT_KEYS: DomainKeys = DomainKeys {
    kind: EntityKind::Habit,
    id: Field::new("id", &["id", "habit_id", "habitId"]),
    ids: Field::new("ids", &["ids", "habit_ids", "habitIds"]),
    items: Field::new("items", &["items", "habits"]),
    filters: &[FilterKey::Completion, FilterKey::Category],
};

pub const GOAL_KEYS: DomainKeys = DomainKeys {
    kind: EntityKind::Goal,
    id: Field::new("id", &["id", "goal_id", "goalId"]),
    ids: Field::new("ids", &["ids", "goal_ids", "goalIds"]),
    items: Field::new("items", &["items", "goals"]),
    filters: FilterKey::ALL,
};

pub const CATEGORY_KEYS: DomainKeys = DomainKeys {
    kind: EntityKind::Category,
    id: Field::new("id", &["id", "category_id", "categoryId"]),
    ids: Field::new("ids", &["ids", "category_ids", "categoryIds"]),
    items: Field::new("items", &["items", "categories"]),
    filters: &[],
};

// Shared across domains.
pub const TITLE: Field = Field::new("title", &["title", "name"]);
pub const NAME: Field = Field::new("name", &["name", "title"]);
pub const NOTES: Field = Field::new("notes", &["notes", "note", "description", "details"]);
pub const PRIORITY: Field = Field::new("priority", &["priority"]);
pub const TAGS: Field = Field::new("tags", &["tags", "tag"]);
pub const IS_COMPLETED: Field = Field::new(
    "isCompleted",
    &["is_completed", "isCompleted", "completed", "done"],
);
pub const UNIT: Field = Field::new("unit", &["unit", "units"]);

pub const CATEGORY_ID: Field = Field::new("categoryId", &["category_id", "categoryId"]);
pub const CATEGORY_NAME: Field = Field::new("categoryName", &["category_name", "categoryName"]);
/// Either an identifier or a name.
pub const CATEGORY: Field = Field::new("category", &["category"]);

// Bulk / filter controls.
pub const CONFIRM: Field = Field::new("confirm", &["confirm", "confirmed"]);
pub const DELETE_ALL: Field = Field::new("deleteAll", &["deleteAll", "delete_all", "all"]);
pub const UPDATE_ALL: Field = Field::new("updateAll", &["updateAll", "update_all", "all"]);
pub const FILTER: Field = Field::new("filter", &["filter", "status", "when"]);
pub const DATE: Field = Field::new("date", &["date", "day", "on"]);
pub const RANGE_START: Field = Field::new("startDate", &["start_date", "startDate", "from"]);
pub const RANGE_END: Field = Field::new("endDate", &["end_date", "endDate", "to", "until"]);
pub const LIMIT: Field = Field::new("limit", &["limit", "max", "count"]);

// Events.
pub const EVENT_START: Field = Field::new(
    "startTime",
    &["start_time", "startTime", "start", "start_date", "startDate"],
);
pub const EVENT_END: Field = Field::new(
    "endTime",
    &["end_time", "endTime", "end", "end_date", "endDate"],
);
pub const IS_ALL_DAY: Field = Field::new(
    "isAllDay",
    &["is_all_day", "isAllDay", "all_day", "allDay"],
);
pub const LOCATION: Field = Field::new("location", &["location", "place"]);
pub const BUFFER_BEFORE: Field = Field::new(
    "bufferBefore",
    &["buffer_before", "bufferBefore", "buffer_before_minutes", "bufferBeforeMinutes"],
);
pub const BUFFER_AFTER: Field = Field::new(
    "bufferAfter",
    &["buffer_after", "bufferAfter", "buffer_after_minutes", "bufferAfterMinutes"],
);
pub const RECURRENCE: Field = Field::new(
    "recurrenceRule",
    &["recurrence_rule", "recurrenceRule", "recurrence", "rrule", "repeat"],
);

// Tasks.
pub const DUE: Field = Field::new("dueDate", &["due_date", "dueDate", "due", "deadline"]);
pub const PARENT_ID: Field = Field::new(
    "parentTaskId",
    &["parent_task_id", "parentTaskId", "parent_id", "parentId"],
);
pub const PARENT_TITLE: Field = Field::new(
    "parentTaskTitle",
    &["parent_task_title", "parentTaskTitle", "parent_title", "parentTitle"],
);
pub const PARENT: Field = Field::new("parent", &["parent", "parent_task", "parentTask"]);
pub const LINKED_EVENT_ID: Field = Field::new(
    "linkedEventId",
    &["linked_event_id", "linkedEventId", "event_id", "eventId"],
);
pub const LINKED_EVENT_TITLE: Field = Field::new(
    "linkedEventTitle",
    &["linked_event_title", "linkedEventTitle", "event_title", "eventTitle"],
);
pub const LINKED_EVENT: Field = Field::new(
    "linkedEvent",
    &["linked_event", "linkedEvent", "event"],
);

// Habits.
pub const FREQUENCY: Field = Field::new("frequency", &["frequency", "cadence", "repeat"]);
pub const TRACKING_TYPE: Field = Field::new(
    "trackingType",
    &["tracking_type", "trackingType", "tracking", "type"],
);
pub const GOAL_TARGET: Field = Field::new(
    "goalTarget",
    &["goal_target", "goalTarget", "target", "target_value", "targetValue", "goal"],
);
pub const HABIT_ID: Field = Field::new("habitId", &["habit_id", "habitId", "id"]);
pub const HABIT_NAME: Field = Field::new(
    "habitName",
    &["habit_name", "habitName", "name", "title"],
);
/// Either an identifier or a name.
pub const HABIT: Field = Field::new("habit", &["habit"]);
pub const LOG_VALUE: Field = Field::new("value", &["value", "amount", "quantity"]);
pub const LOG_DATE: Field = Field::new("date", &["date", "day", "logged_on", "loggedOn", "on"]);

// Goals.
pub const TARGET_VALUE: Field = Field::new(
    "targetValue",
    &["target_value", "targetValue", "target"],
);
pub const CURRENT_VALUE: Field = Field::new(
    "currentValue",
    &["current_value", "currentValue", "current"],
);
pub const TARGET_DATE: Field = Field::new(
    "targetDate",
    &["target_date", "targetDate", "deadline", "due_date", "dueDate"],
);
pub const PROGRESS_VALUE: Field = Field::new(
    "value",
    &["value", "current_value", "currentValue", "progress"],
);
pub const PROGRESS_INCREMENT: Field = Field::new(
    "increment",
    &["increment", "delta", "amount", "add", "by"],
);

// Categories.
pub const COLOR: Field = Field::new("color", &["color", "colour", "hex"]);
pub const ICON: Field = Field::new("icon", &["icon", "symbol", "emoji"]);
pub const SORT_INDEX: Field = Field::new(
    "sortIndex",
    &["sort_index", "sortIndex", "order", "position"],
);
