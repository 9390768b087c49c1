//! Task handler.
//!
//! Completion is reversible: completing stamps `completedAt`, reopening
//! clears it. Subtasks reference one parent; only self-parenting is
//! rejected.

use super::{
    apply_resolution, category_name, category_names, decode_reference, list_result,
    optional_text, replacement_text, View,
};
use crate::action::bulk::{BulkDomain, BulkExecutor, Created};
use crate::action::context::ActionContext;
use crate::action::error::{ActionError, ActionOutcome};
use crate::action::fields::{
    DomainKeys, DUE, IS_COMPLETED, LINKED_EVENT, LINKED_EVENT_ID, LINKED_EVENT_TITLE, NOTES,
    PARENT, PARENT_ID, PARENT_TITLE, PRIORITY, TAGS, TASK_KEYS, TITLE,
};
use crate::action::filter::{resolve_filter, ListFilter, NamedFilter, CATEGORY_REF};
use crate::action::params::Params;
use crate::action::resolver::{ReferenceFields, Resolution};
use crate::action::result::{ActionResult, ItemView};
use crate::model::category::Category;
use crate::model::event::Event;
use crate::model::task::Task;
use crate::model::{day_bounds, EntityId, EntityKind, Priority};
use crate::store::EntityStore;
use std::collections::HashMap;

pub const PARENT_REF: ReferenceFields = ReferenceFields {
    label: "parent task",
    id: PARENT_ID,
    name: PARENT_TITLE,
    either: PARENT,
};

pub const LINKED_EVENT_REF: ReferenceFields = ReferenceFields {
    label: "linked event",
    id: LINKED_EVENT_ID,
    name: LINKED_EVENT_TITLE,
    either: LINKED_EVENT,
};

const SUPPORTED_FILTERS: &[NamedFilter] = &[
    NamedFilter::Today,
    NamedFilter::Upcoming,
    NamedFilter::Overdue,
    NamedFilter::Completed,
    NamedFilter::Incomplete,
];

/// Partial update; `None` leaves a field unchanged.
#[derive(Debug)]
pub struct TaskPatch {
    title: Option<String>,
    notes: Option<Option<String>>,
    due_at: Option<Option<i64>>,
    is_completed: Option<bool>,
    priority: Option<Priority>,
    tags: Option<Vec<String>>,
    category: Resolution,
    parent: Resolution,
    linked_event: Resolution,
    warnings: Vec<String>,
}

pub struct TaskHandler<'a, S: EntityStore> {
    ctx: &'a ActionContext<S>,
}

impl<'a, S: EntityStore> TaskHandler<'a, S> {
    pub fn new(ctx: &'a ActionContext<S>) -> Self {
        Self { ctx }
    }

    pub fn create(&self, params: &Params) -> ActionResult {
        BulkExecutor::<S, Self>::new(self).create(params)
    }

    pub fn update(&self, params: &Params) -> ActionResult {
        BulkExecutor::<S, Self>::new(self).update(params)
    }

    pub fn delete(&self, params: &Params) -> ActionResult {
        BulkExecutor::<S, Self>::new(self).delete(params)
    }

    pub fn list(&self, params: &Params) -> ActionResult {
        self.try_list(params)
            .unwrap_or_else(|err| ActionResult::failure(&err))
    }

    fn try_list(&self, params: &Params) -> ActionOutcome<ActionResult> {
        let filter = self.decode_filter(params)?;
        let names = category_names(self.ctx)?;
        let items = self
            .ctx
            .store()
            .fetch(|task: &Task| self.matches(&filter, task))?
            .iter()
            .map(|task| self.view(task, &names))
            .collect();
        Ok(list_result(EntityKind::Task, items, &filter))
    }

    pub fn view(&self, task: &Task, categories: &HashMap<EntityId, String>) -> ItemView {
        View::new(task.id)
            .text("title", &task.title)
            .opt_text("notes", task.notes.as_deref())
            .opt_timestamp("dueDate", task.due_at)
            .flag("isCompleted", task.is_completed)
            .opt_timestamp("completedAt", task.completed_at)
            .text("priority", task.priority.as_str())
            .opt_id("categoryId", task.category_id)
            .opt_text("categoryName", category_name(categories, task.category_id))
            .opt_id("parentTaskId", task.parent_task_id)
            .opt_id("linkedEventId", task.linked_event_id)
            .tags("tags", &task.tags)
            .flag("isOverdue", task.is_overdue(self.ctx.now_ms()))
            .timestamp("createdAt", task.created_at)
            .timestamp("updatedAt", task.updated_at)
            .build()
    }
}

impl<S: EntityStore> BulkDomain<S> for TaskHandler<'_, S> {
    type Entity = Task;
    type Patch = TaskPatch;

    fn keys(&self) -> &'static DomainKeys {
        &TASK_KEYS
    }

    fn ctx(&self) -> &ActionContext<S> {
        self.ctx
    }

    fn create_one(&self, params: &Params) -> ActionOutcome<Created<Task>> {
        let now = self.ctx.now();
        let now_ms = now.timestamp_millis();
        let mut task = Task::new(params.required_string(&TITLE)?, now_ms);
        task.notes = optional_text(params, &NOTES)?;
        task.due_at = params.timestamp(&DUE, self.ctx.temporal(), now)?;
        if let Some(priority) = params.choice(&PRIORITY, Priority::parse, Priority::SUPPORTED)? {
            task.priority = priority;
        }
        task.tags = params.string_list(&TAGS)?.unwrap_or_default();

        let mut warnings = Vec::new();
        let category =
            decode_reference::<S, Category>(self.ctx, &CATEGORY_REF, params, &mut warnings)?;
        apply_resolution(&mut task.category_id, &category);
        let parent = decode_reference::<S, Task>(self.ctx, &PARENT_REF, params, &mut warnings)?;
        apply_resolution(&mut task.parent_task_id, &parent);
        let linked =
            decode_reference::<S, Event>(self.ctx, &LINKED_EVENT_REF, params, &mut warnings)?;
        apply_resolution(&mut task.linked_event_id, &linked);

        if params.flag(&IS_COMPLETED)? {
            task.set_completed(true, now_ms);
        }

        self.ctx.store().insert(&task)?;
        Ok(Created {
            entity: task,
            notes: warnings,
        })
    }

    fn decode_patch(&self, params: &Params) -> ActionOutcome<TaskPatch> {
        let now = self.ctx.now();
        let mut warnings = Vec::new();
        Ok(TaskPatch {
            title: replacement_text(params, &TITLE)?,
            notes: params.clearable_string(&NOTES)?,
            due_at: params.clearable_timestamp(&DUE, self.ctx.temporal(), now)?,
            is_completed: params.bool(&IS_COMPLETED)?,
            priority: params.choice(&PRIORITY, Priority::parse, Priority::SUPPORTED)?,
            tags: params.string_list(&TAGS)?,
            category: decode_reference::<S, Category>(
                self.ctx,
                &CATEGORY_REF,
                params,
                &mut warnings,
            )?,
            parent: decode_reference::<S, Task>(self.ctx, &PARENT_REF, params, &mut warnings)?,
            linked_event: decode_reference::<S, Event>(
                self.ctx,
                &LINKED_EVENT_REF,
                params,
                &mut warnings,
            )?,
            warnings,
        })
    }

    fn patch_notes<'p>(&self, patch: &'p TaskPatch) -> &'p [String] {
        &patch.warnings
    }

    fn apply_patch(&self, task: &mut Task, patch: &TaskPatch) -> ActionOutcome<()> {
        let now_ms = self.ctx.now_ms();
        if let Some(title) = &patch.title {
            task.title = title.clone();
        }
        if let Some(notes) = &patch.notes {
            task.notes = notes.clone();
        }
        if let Some(due_at) = patch.due_at {
            task.due_at = due_at;
        }
        if let Some(priority) = patch.priority {
            task.priority = priority;
        }
        if let Some(tags) = &patch.tags {
            task.tags = tags.clone();
        }
        apply_resolution(&mut task.category_id, &patch.category);
        apply_resolution(&mut task.parent_task_id, &patch.parent);
        apply_resolution(&mut task.linked_event_id, &patch.linked_event);
        if task.parent_task_id == Some(task.id) {
            return Err(ActionError::validation("a task cannot be its own parent"));
        }
        if let Some(completed) = patch.is_completed {
            task.set_completed(completed, now_ms);
        }
        task.updated_at = now_ms;
        Ok(())
    }

    fn decode_filter(&self, params: &Params) -> ActionOutcome<ListFilter> {
        let mut filter = ListFilter::decode(self.ctx, params, &TASK_KEYS, SUPPORTED_FILTERS)?;
        filter.parent = resolve_filter::<S, Task>(
            self.ctx,
            &PARENT_REF.decode(params)?,
            PARENT_REF.label,
        )?;
        Ok(filter)
    }

    fn matches(&self, filter: &ListFilter, task: &Task) -> bool {
        let named = match filter.named {
            Some(NamedFilter::Today) => {
                let (start, end) = day_bounds(filter.today);
                task.due_at.is_some_and(|due| due >= start && due < end)
            }
            Some(NamedFilter::Upcoming) => {
                !task.is_completed && task.due_at.is_some_and(|due| due >= filter.now_ms)
            }
            Some(NamedFilter::Overdue) => task.is_overdue(filter.now_ms),
            _ => true,
        };
        named
            && filter.matches_id(task.id)
            && filter.category.matches(task.category_id)
            && filter.parent.matches(task.parent_task_id)
            && filter.matches_completion(task.is_completed)
            && filter.matches_instant(task.due_at)
    }
}
