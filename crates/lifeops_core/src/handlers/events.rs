//! Event handler.
//!
//! # Invariants
//! - `start <= end` is checked only when a request supplies both.
//! - A missing end defaults to one hour after start (a full day for
//!   all-day events).
//! - A recurrence rule must expand to at least one occurrence.

use super::{
    apply_resolution, category_name, category_names, decode_reference, list_result,
    optional_text, replacement_text, View,
};
use crate::action::bulk::{BulkDomain, BulkExecutor, Created};
use crate::action::context::ActionContext;
use crate::action::error::{ActionError, ActionOutcome};
use crate::action::fields::{
    DomainKeys, BUFFER_AFTER, BUFFER_BEFORE, EVENT_END, EVENT_KEYS, EVENT_START, IS_ALL_DAY,
    IS_COMPLETED, LOCATION, NOTES, PRIORITY, RECURRENCE, TAGS, TITLE,
};
use crate::action::filter::{ListFilter, NamedFilter, CATEGORY_REF};
use crate::action::params::{missing, Field, Params};
use crate::action::resolver::Resolution;
use crate::action::result::{ActionResult, ItemView};
use crate::model::category::Category;
use crate::model::event::{Event, ALL_DAY_DURATION_MS, DEFAULT_EVENT_DURATION_MS};
use crate::model::{day_bounds, format_timestamp, timestamp_from_ms, EntityId, EntityKind, Priority};
use crate::store::EntityStore;
use std::collections::HashMap;

const SUPPORTED_FILTERS: &[NamedFilter] = &[
    NamedFilter::Today,
    NamedFilter::Upcoming,
    NamedFilter::Past,
    NamedFilter::Completed,
    NamedFilter::Incomplete,
];

/// Upper bound on occurrences scanned when looking for the next one.
const NEXT_OCCURRENCE_SCAN: usize = 4096;

#[derive(Debug)]
pub struct EventPatch {
    title: Option<String>,
    start_at: Option<i64>,
    end_at: Option<i64>,
    is_all_day: Option<bool>,
    notes: Option<Option<String>>,
    location: Option<Option<String>>,
    is_completed: Option<bool>,
    priority: Option<Priority>,
    tags: Option<Vec<String>>,
    buffer_before_minutes: Option<i64>,
    buffer_after_minutes: Option<i64>,
    recurrence_rule: Option<Option<String>>,
    category: Resolution,
    warnings: Vec<String>,
}

pub struct EventHandler<'a, S: EntityStore> {
    ctx: &'a ActionContext<S>,
}

impl<'a, S: EntityStore> EventHandler<'a, S> {
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
            .fetch(|event: &Event| self.matches(&filter, event))?
            .iter()
            .map(|event| self.view(event, &names))
            .collect();
        Ok(list_result(EntityKind::Event, items, &filter))
    }

    pub fn view(&self, event: &Event, categories: &HashMap<EntityId, String>) -> ItemView {
        View::new(event.id)
            .text("title", &event.title)
            .timestamp("startTime", event.start_at)
            .timestamp("endTime", event.end_at)
            .flag("isAllDay", event.is_all_day)
            .opt_id("categoryId", event.category_id)
            .opt_text("categoryName", category_name(categories, event.category_id))
            .opt_text("notes", event.notes.as_deref())
            .opt_text("location", event.location.as_deref())
            .flag("isCompleted", event.is_completed)
            .text("priority", event.priority.as_str())
            .tags("tags", &event.tags)
            .integer("bufferBefore", event.buffer_before_minutes)
            .integer("bufferAfter", event.buffer_after_minutes)
            .opt_text("recurrenceRule", event.recurrence_rule.as_deref())
            .opt_timestamp("nextOccurrence", self.next_occurrence(event))
            .timestamp("createdAt", event.created_at)
            .timestamp("updatedAt", event.updated_at)
            .build()
    }

    /// First occurrence at or after now, for recurring events only.
    fn next_occurrence(&self, event: &Event) -> Option<i64> {
        let rule = event.recurrence_rule.as_deref()?;
        let now_ms = self.ctx.now_ms();
        self.ctx
            .recurrence()
            .expand(rule, timestamp_from_ms(event.start_at), NEXT_OCCURRENCE_SCAN)
            .into_iter()
            .map(|at| at.timestamp_millis())
            .find(|at| *at >= now_ms)
    }

    fn check_recurrence(&self, rule: &str, start_at: i64) -> ActionOutcome<()> {
        let occurrences = self
            .ctx
            .recurrence()
            .expand(rule, timestamp_from_ms(start_at), 1);
        if occurrences.is_empty() {
            return Err(ActionError::validation(format!(
                "recurrence rule `{rule}` produces no occurrences"
            )));
        }
        Ok(())
    }

    fn buffer(&self, params: &Params, field: &Field) -> ActionOutcome<Option<i64>> {
        match params.integer(field)? {
            Some(minutes) if minutes < 0 => Err(ActionError::validation(format!(
                "field `{}` must not be negative",
                field.name
            ))),
            other => Ok(other),
        }
    }
}

fn check_time_range(start_at: i64, end_at: i64) -> ActionOutcome<()> {
    if end_at < start_at {
        return Err(ActionError::validation(format!(
            "invalid time range: end {} is before start {}",
            format_timestamp(end_at),
            format_timestamp(start_at)
        )));
    }
    Ok(())
}

impl<S: EntityStore> BulkDomain<S> for EventHandler<'_, S> {
    type Entity = Event;
    type Patch = EventPatch;

    fn keys(&self) -> &'static DomainKeys {
        &EVENT_KEYS
    }

    fn ctx(&self) -> &ActionContext<S> {
        self.ctx
    }

    fn create_one(&self, params: &Params) -> ActionOutcome<Created<Event>> {
        let now = self.ctx.now();
        let title = params.required_string(&TITLE)?;
        let is_all_day = params.flag(&IS_ALL_DAY)?;
        let mut start_at = params
            .timestamp(&EVENT_START, self.ctx.temporal(), now)?
            .ok_or_else(|| missing(&EVENT_START))?;
        if is_all_day {
            start_at = day_bounds(timestamp_from_ms(start_at).date_naive()).0;
        }
        let end_at = match params.timestamp(&EVENT_END, self.ctx.temporal(), now)? {
            Some(end_at) => {
                check_time_range(start_at, end_at)?;
                end_at
            }
            None => {
                let duration = if is_all_day {
                    ALL_DAY_DURATION_MS
                } else {
                    DEFAULT_EVENT_DURATION_MS
                };
                start_at.checked_add(duration).ok_or_else(|| {
                    ActionError::validation(format!(
                        "field `{}` is too late to derive an end time",
                        EVENT_START.name
                    ))
                })?
            }
        };

        let mut event = Event::new(title, start_at, end_at, now.timestamp_millis());
        event.is_all_day = is_all_day;
        event.notes = optional_text(params, &NOTES)?;
        event.location = optional_text(params, &LOCATION)?;
        event.is_completed = params.flag(&IS_COMPLETED)?;
        if let Some(priority) = params.choice(&PRIORITY, Priority::parse, Priority::SUPPORTED)? {
            event.priority = priority;
        }
        event.tags = params.string_list(&TAGS)?.unwrap_or_default();
        event.buffer_before_minutes = self.buffer(params, &BUFFER_BEFORE)?.unwrap_or(0);
        event.buffer_after_minutes = self.buffer(params, &BUFFER_AFTER)?.unwrap_or(0);
        event.recurrence_rule = optional_text(params, &RECURRENCE)?;
        if let Some(rule) = &event.recurrence_rule {
            self.check_recurrence(rule, event.start_at)?;
        }

        let mut warnings = Vec::new();
        let category =
            decode_reference::<S, Category>(self.ctx, &CATEGORY_REF, params, &mut warnings)?;
        apply_resolution(&mut event.category_id, &category);

        self.ctx.store().insert(&event)?;
        Ok(Created {
            entity: event,
            notes: warnings,
        })
    }

    fn decode_patch(&self, params: &Params) -> ActionOutcome<EventPatch> {
        let now = self.ctx.now();
        let start_at = params.timestamp(&EVENT_START, self.ctx.temporal(), now)?;
        let end_at = params.timestamp(&EVENT_END, self.ctx.temporal(), now)?;
        if let (Some(start_at), Some(end_at)) = (start_at, end_at) {
            check_time_range(start_at, end_at)?;
        }

        let mut warnings = Vec::new();
        Ok(EventPatch {
            title: replacement_text(params, &TITLE)?,
            start_at,
            end_at,
            is_all_day: params.bool(&IS_ALL_DAY)?,
            notes: params.clearable_string(&NOTES)?,
            location: params.clearable_string(&LOCATION)?,
            is_completed: params.bool(&IS_COMPLETED)?,
            priority: params.choice(&PRIORITY, Priority::parse, Priority::SUPPORTED)?,
            tags: params.string_list(&TAGS)?,
            buffer_before_minutes: self.buffer(params, &BUFFER_BEFORE)?,
            buffer_after_minutes: self.buffer(params, &BUFFER_AFTER)?,
            recurrence_rule: params.clearable_string(&RECURRENCE)?,
            category: decode_reference::<S, Category>(
                self.ctx,
                &CATEGORY_REF,
                params,
                &mut warnings,
            )?,
            warnings,
        })
    }

    fn patch_notes<'p>(&self, patch: &'p EventPatch) -> &'p [String] {
        &patch.warnings
    }

    fn apply_patch(&self, event: &mut Event, patch: &EventPatch) -> ActionOutcome<()> {
        if let Some(title) = &patch.title {
            event.title = title.clone();
        }
        if let Some(start_at) = patch.start_at {
            event.start_at = start_at;
        }
        if let Some(end_at) = patch.end_at {
            event.end_at = end_at;
        }
        if let Some(is_all_day) = patch.is_all_day {
            event.is_all_day = is_all_day;
        }
        if let Some(notes) = &patch.notes {
            event.notes = notes.clone();
        }
        if let Some(location) = &patch.location {
            event.location = location.clone();
        }
        if let Some(is_completed) = patch.is_completed {
            event.is_completed = is_completed;
        }
        if let Some(priority) = patch.priority {
            event.priority = priority;
        }
        if let Some(tags) = &patch.tags {
            event.tags = tags.clone();
        }
        if let Some(minutes) = patch.buffer_before_minutes {
            event.buffer_before_minutes = minutes;
        }
        if let Some(minutes) = patch.buffer_after_minutes {
            event.buffer_after_minutes = minutes;
        }
        if let Some(rule) = &patch.recurrence_rule {
            event.recurrence_rule = rule.clone();
        }
        if patch.recurrence_rule.is_some() || patch.start_at.is_some() {
            if let Some(rule) = &event.recurrence_rule {
                self.check_recurrence(rule, event.start_at)?;
            }
        }
        apply_resolution(&mut event.category_id, &patch.category);
        event.updated_at = self.ctx.now_ms();
        Ok(())
    }

    fn decode_filter(&self, params: &Params) -> ActionOutcome<ListFilter> {
        ListFilter::decode(self.ctx, params, &EVENT_KEYS, SUPPORTED_FILTERS)
    }

    fn matches(&self, filter: &ListFilter, event: &Event) -> bool {
        let named = match filter.named {
            Some(NamedFilter::Today) => {
                let (start, end) = day_bounds(filter.today);
                event.overlaps(start, end)
            }
            Some(NamedFilter::Upcoming) => event.start_at >= filter.now_ms,
            Some(NamedFilter::Past) => event.end_at < filter.now_ms,
            _ => true,
        };
        let windowed = filter
            .window()
            .map_or(true, |(start, end)| event.overlaps(start, end));
        named
            && windowed
            && filter.matches_id(event.id)
            && filter.category.matches(event.category_id)
            && filter.matches_completion(event.is_completed)
    }
}
