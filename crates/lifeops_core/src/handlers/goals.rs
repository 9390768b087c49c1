//! Goal handler, including `progress`.
//!
//! Completion is terminal. It is reached either by progress meeting the
//! target or by an explicit `isCompleted: true` update; generic updates may
//! not change `currentValue` or reopen a goal.

use super::{
    apply_resolution, category_name, category_names, decode_reference, list_result,
    optional_text, replacement_text, View,
};
use crate::action::bulk::{BulkDomain, BulkExecutor, Created};
use crate::action::context::ActionContext;
use crate::action::error::{ActionError, ActionOutcome};
use crate::action::fields::{
    DomainKeys, CURRENT_VALUE, GOAL_KEYS, IS_COMPLETED, NOTES, PRIORITY, PROGRESS_INCREMENT,
    PROGRESS_VALUE, TARGET_DATE, TARGET_VALUE, TITLE, UNIT,
};
use crate::action::filter::{ListFilter, NamedFilter, CATEGORY_REF};
use crate::action::params::{missing, Field, Params};
use crate::action::resolver::{
    ReferenceFields, ReferenceInput, ReferencePatch, ReferenceResolver, Resolution,
};
use crate::action::result::{ActionResult, ItemView};
use crate::model::category::Category;
use crate::model::goal::{Goal, GoalProgress};
use crate::model::{EntityId, EntityKind, Priority};
use crate::store::EntityStore;
use chrono::NaiveDate;
use log::info;
use std::collections::HashMap;

const GOAL_TITLE: Field = Field::new("goalTitle", &["goal_title", "goalTitle", "title", "name"]);
const GOAL: Field = Field::new("goal", &["goal"]);

pub const GOAL_REF: ReferenceFields = ReferenceFields {
    label: "goal",
    id: GOAL_KEYS.id,
    name: GOAL_TITLE,
    either: GOAL,
};

const SUPPORTED_FILTERS: &[NamedFilter] = &[
    NamedFilter::Completed,
    NamedFilter::Incomplete,
    NamedFilter::Overdue,
];

#[derive(Debug)]
pub struct GoalPatch {
    title: Option<String>,
    notes: Option<Option<String>>,
    target_value: Option<f64>,
    unit: Option<Option<String>>,
    target_date: Option<Option<NaiveDate>>,
    priority: Option<Priority>,
    is_completed: Option<bool>,
    category: Resolution,
    warnings: Vec<String>,
}

pub struct GoalHandler<'a, S: EntityStore> {
    ctx: &'a ActionContext<S>,
}

impl<'a, S: EntityStore> GoalHandler<'a, S> {
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
            .fetch(|goal: &Goal| self.matches(&filter, goal))?
            .iter()
            .map(|goal| self.view(goal, &names))
            .collect();
        Ok(list_result(EntityKind::Goal, items, &filter))
    }

    /// Sets (`value`) or adds to (`increment`) the current value; reaching
    /// the target completes the goal.
    pub fn progress(&self, params: &Params) -> ActionResult {
        self.try_progress(params)
            .unwrap_or_else(|err| ActionResult::failure(&err))
    }

    fn try_progress(&self, params: &Params) -> ActionOutcome<ActionResult> {
        let value = params.number(&PROGRESS_VALUE)?;
        let increment = params.number(&PROGRESS_INCREMENT)?;
        let progress = match (value, increment) {
            (Some(_), Some(_)) => {
                return Err(ActionError::validation(format!(
                    "supply either `{}` or `{}`, not both",
                    PROGRESS_VALUE.name, PROGRESS_INCREMENT.name
                )))
            }
            (Some(value), None) => GoalProgress::Absolute(value),
            (None, Some(delta)) => GoalProgress::Increment(delta),
            (None, None) => {
                return Err(ActionError::validation(format!(
                    "missing progress; supply {} or {}",
                    PROGRESS_VALUE.describe(),
                    PROGRESS_INCREMENT.describe()
                )))
            }
        };

        let mut goal = self.resolve_goal(params)?;
        let now_ms = self.ctx.now_ms();
        let just_completed = goal.apply_progress(progress, now_ms);
        goal.updated_at = now_ms;
        self.ctx.store().update(&goal)?;
        info!(
            "event=goal_progress module=goals status=ok goal_id={} completed={}",
            goal.id, goal.is_completed
        );

        let unit = goal.unit.as_deref().map(|unit| format!(" {unit}")).unwrap_or_default();
        let mut message = format!(
            "Updated progress on '{}': {}/{}{unit}.",
            goal.title, goal.current_value, goal.target_value
        );
        if just_completed {
            message.push_str(" Goal completed!");
        }
        let names = category_names(self.ctx)?;
        Ok(ActionResult::success(message)
            .with_id(goal.id)
            .with_updated(1)
            .with_items(vec![self.view(&goal, &names)]))
    }

    /// An explicit id must be well-formed; a title is resolved by name.
    fn resolve_goal(&self, params: &Params) -> ActionOutcome<Goal> {
        let input = if params.contains(&GOAL_KEYS.id) {
            ReferenceInput::by_id(params.id(&GOAL_KEYS.id)?.to_string())
        } else {
            match GOAL_REF.decode(params)? {
                ReferencePatch::Set(input) => input,
                _ => return Err(missing(&GOAL_KEYS.id)),
            }
        };
        ReferenceResolver::new(self.ctx.store())
            .resolve::<Goal>(&input)?
            .ok_or_else(|| {
                let wanted = input.id.as_deref().or(input.name.as_deref()).unwrap_or("");
                ActionError::not_found(EntityKind::Goal, wanted)
            })
    }

    pub fn view(&self, goal: &Goal, categories: &HashMap<EntityId, String>) -> ItemView {
        View::new(goal.id)
            .text("title", &goal.title)
            .opt_text("notes", goal.notes.as_deref())
            .number("targetValue", goal.target_value)
            .number("currentValue", goal.current_value)
            .opt_text("unit", goal.unit.as_deref())
            .opt_date("targetDate", goal.target_date)
            .text("priority", goal.priority.as_str())
            .opt_id("categoryId", goal.category_id)
            .opt_text("categoryName", category_name(categories, goal.category_id))
            .flag("isCompleted", goal.is_completed)
            .opt_timestamp("completedAt", goal.completed_at)
            .number("progress", goal.progress_ratio())
            .flag("isOverdue", goal.is_overdue(self.ctx.today()))
            .timestamp("createdAt", goal.created_at)
            .timestamp("updatedAt", goal.updated_at)
            .build()
    }

    fn target_value(&self, params: &Params) -> ActionOutcome<Option<f64>> {
        match params.number(&TARGET_VALUE)? {
            Some(target) if target <= 0.0 => Err(ActionError::validation(format!(
                "field `{}` must be a positive number",
                TARGET_VALUE.name
            ))),
            other => Ok(other),
        }
    }
}

impl<S: EntityStore> BulkDomain<S> for GoalHandler<'_, S> {
    type Entity = Goal;
    type Patch = GoalPatch;

    fn keys(&self) -> &'static DomainKeys {
        &GOAL_KEYS
    }

    fn ctx(&self) -> &ActionContext<S> {
        self.ctx
    }

    fn create_one(&self, params: &Params) -> ActionOutcome<Created<Goal>> {
        let now = self.ctx.now();
        let now_ms = now.timestamp_millis();
        let title = params.required_string(&TITLE)?;
        let target_value = self
            .target_value(params)?
            .ok_or_else(|| missing(&TARGET_VALUE))?;

        let mut goal = Goal::new(title, target_value, now_ms);
        goal.notes = optional_text(params, &NOTES)?;
        goal.unit = optional_text(params, &UNIT)?;
        goal.target_date = params.date(&TARGET_DATE, self.ctx.temporal(), now)?;
        if let Some(priority) = params.choice(&PRIORITY, Priority::parse, Priority::SUPPORTED)? {
            goal.priority = priority;
        }
        if let Some(current) = params.number(&CURRENT_VALUE)? {
            goal.apply_progress(GoalProgress::Absolute(current), now_ms);
        }
        if params.flag(&IS_COMPLETED)? {
            goal.mark_completed(now_ms);
        }

        let mut warnings = Vec::new();
        let category =
            decode_reference::<S, Category>(self.ctx, &CATEGORY_REF, params, &mut warnings)?;
        apply_resolution(&mut goal.category_id, &category);

        self.ctx.store().insert(&goal)?;
        Ok(Created {
            entity: goal,
            notes: warnings,
        })
    }

    fn decode_patch(&self, params: &Params) -> ActionOutcome<GoalPatch> {
        if params.contains(&CURRENT_VALUE) {
            return Err(ActionError::validation(format!(
                "field `{}` cannot be changed by update; use the `progress` action",
                CURRENT_VALUE.name
            )));
        }
        let now = self.ctx.now();
        let mut warnings = Vec::new();
        Ok(GoalPatch {
            title: replacement_text(params, &TITLE)?,
            notes: params.clearable_string(&NOTES)?,
            target_value: self.target_value(params)?,
            unit: params.clearable_string(&UNIT)?,
            target_date: params.clearable_date(&TARGET_DATE, self.ctx.temporal(), now)?,
            priority: params.choice(&PRIORITY, Priority::parse, Priority::SUPPORTED)?,
            is_completed: params.bool(&IS_COMPLETED)?,
            category: decode_reference::<S, Category>(
                self.ctx,
                &CATEGORY_REF,
                params,
                &mut warnings,
            )?,
            warnings,
        })
    }

    fn patch_notes<'p>(&self, patch: &'p GoalPatch) -> &'p [String] {
        &patch.warnings
    }

    fn apply_patch(&self, goal: &mut Goal, patch: &GoalPatch) -> ActionOutcome<()> {
        if patch.is_completed == Some(false) && goal.is_completed {
            return Err(ActionError::validation(
                "a completed goal cannot be marked incomplete",
            ));
        }
        let now_ms = self.ctx.now_ms();
        if let Some(title) = &patch.title {
            goal.title = title.clone();
        }
        if let Some(notes) = &patch.notes {
            goal.notes = notes.clone();
        }
        if let Some(target) = patch.target_value {
            goal.target_value = target;
        }
        if let Some(unit) = &patch.unit {
            goal.unit = unit.clone();
        }
        if let Some(target_date) = patch.target_date {
            goal.target_date = target_date;
        }
        if let Some(priority) = patch.priority {
            goal.priority = priority;
        }
        if patch.is_completed == Some(true) {
            goal.mark_completed(now_ms);
        }
        apply_resolution(&mut goal.category_id, &patch.category);
        goal.updated_at = now_ms;
        Ok(())
    }

    fn decode_filter(&self, params: &Params) -> ActionOutcome<ListFilter> {
        ListFilter::decode(self.ctx, params, &GOAL_KEYS, SUPPORTED_FILTERS)
    }

    fn matches(&self, filter: &ListFilter, goal: &Goal) -> bool {
        let named = match filter.named {
            Some(NamedFilter::Overdue) => goal.is_overdue(filter.today),
            _ => true,
        };
        named
            && filter.matches_id(goal.id)
            && filter.category.matches(goal.category_id)
            && filter.matches_completion(goal.is_completed)
            && filter.matches_day(goal.target_date)
    }
}
