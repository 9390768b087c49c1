//! Habit handler, including `log`.
//!
//! Streak counters are derived from the log on every read and never stored.

use super::{
    apply_resolution, category_name, category_names, decode_reference, list_result,
    optional_text, replacement_text, View,
};
use crate::action::bulk::{BulkDomain, BulkExecutor, Created};
use crate::action::context::ActionContext;
use crate::action::error::{ActionError, ActionOutcome};
use crate::action::fields::{
    DomainKeys, FREQUENCY, GOAL_TARGET, HABIT, HABIT_ID, HABIT_KEYS, HABIT_NAME, LOG_DATE,
    LOG_VALUE, NAME, NOTES, TRACKING_TYPE, UNIT,
};
use crate::action::filter::{ListFilter, NamedFilter, CATEGORY_REF};
use crate::action::params::{parse_entity_id, Params};
use crate::action::resolver::{ReferenceFields, ReferencePatch, ReferenceResolver, Resolution};
use crate::action::result::{ActionResult, ItemView};
use crate::model::category::Category;
use crate::model::habit::{
    compute_streaks, Habit, HabitFrequency, HabitLog, StreakSummary, TrackingType,
};
use crate::model::{format_date, EntityId, EntityKind};
use crate::store::EntityStore;
use log::info;
use once_cell::unsync::OnceCell;
use std::collections::HashMap;

pub const HABIT_REF: ReferenceFields = ReferenceFields {
    label: "habit",
    id: HABIT_ID,
    name: HABIT_NAME,
    either: HABIT,
};

const SUPPORTED_FILTERS: &[NamedFilter] = &[
    NamedFilter::Daily,
    NamedFilter::Weekly,
    NamedFilter::Monthly,
    NamedFilter::Completed,
    NamedFilter::Incomplete,
];

#[derive(Debug)]
pub struct HabitPatch {
    name: Option<String>,
    notes: Option<Option<String>>,
    frequency: Option<HabitFrequency>,
    tracking_type: Option<TrackingType>,
    goal_target: Option<f64>,
    unit: Option<Option<String>>,
    category: Resolution,
    warnings: Vec<String>,
}

pub struct HabitHandler<'a, S: EntityStore> {
    ctx: &'a ActionContext<S>,
    /// Logs grouped by habit, loaded once per request when needed.
    logs: OnceCell<HashMap<EntityId, Vec<HabitLog>>>,
}

impl<'a, S: EntityStore> HabitHandler<'a, S> {
    pub fn new(ctx: &'a ActionContext<S>) -> Self {
        Self {
            ctx,
            logs: OnceCell::new(),
        }
    }

    pub fn create(&self, params: &Params) -> ActionResult {
        BulkExecutor::<S, Self>::new(self).create(params)
    }

    pub fn update(&self, params: &Params) -> ActionResult {
        BulkExecutor::<S, Self>::new(self).update(params)
    }

    /// Logs are removed with their habit.
    pub fn delete(&self, params: &Params) -> ActionResult {
        BulkExecutor::<S, Self>::new(self).delete(params)
    }

    pub fn list(&self, params: &Params) -> ActionResult {
        self.try_list(params)
            .unwrap_or_else(|err| ActionResult::failure(&err))
    }

    fn try_list(&self, params: &Params) -> ActionOutcome<ActionResult> {
        let filter = self.decode_filter(params)?;
        self.load_logs()?;
        let names = category_names(self.ctx)?;
        let items = self
            .ctx
            .store()
            .fetch(|habit: &Habit| self.matches(&filter, habit))?
            .iter()
            .map(|habit| self.view(habit, &self.summary(habit), &names))
            .collect();
        Ok(list_result(EntityKind::Habit, items, &filter))
    }

    /// Appends a dated log entry and reports the recomputed streak.
    pub fn log(&self, params: &Params) -> ActionResult {
        self.try_log(params)
            .unwrap_or_else(|err| ActionResult::failure(&err))
    }

    fn try_log(&self, params: &Params) -> ActionOutcome<ActionResult> {
        let now = self.ctx.now();
        let habit = self.resolve_habit(params)?;

        let value = params.number(&LOG_VALUE)?.unwrap_or(1.0);
        if value < 0.0 {
            return Err(ActionError::validation(format!(
                "field `{}` must not be negative",
                LOG_VALUE.name
            )));
        }
        let logged_on = params
            .date(&LOG_DATE, self.ctx.temporal(), now)?
            .unwrap_or_else(|| now.date_naive());

        let mut entry = HabitLog::new(habit.id, logged_on, value, now.timestamp_millis());
        entry.notes = optional_text(params, &NOTES)?;
        self.ctx.store().insert(&entry)?;

        let logs = self
            .ctx
            .store()
            .fetch(|log: &HabitLog| log.habit_id == habit.id)?;
        let summary = compute_streaks(&habit, &logs, now.date_naive());
        info!(
            "event=habit_log module=habits status=ok habit_id={} current_streak={} total_logs={}",
            habit.id, summary.current_streak, summary.total_logs
        );

        let names = category_names(self.ctx)?;
        let message = format!(
            "Logged {} for '{}' on {}. Current streak: {} {}.",
            format_value(value, habit.unit.as_deref()),
            habit.name,
            format_date(logged_on),
            summary.current_streak,
            period_label(habit.frequency, summary.current_streak)
        );
        Ok(ActionResult::success(message)
            .with_id(entry.id)
            .with_updated(1)
            .with_items(vec![self.view(&habit, &summary, &names)]))
    }

    fn resolve_habit(&self, params: &Params) -> ActionOutcome<Habit> {
        let ReferencePatch::Set(input) = HABIT_REF.decode(params)? else {
            return Err(ActionError::validation(format!(
                "missing habit; supply {} or {}",
                HABIT_ID.describe(),
                HABIT_NAME.describe()
            )));
        };
        if let Some(raw_id) = &input.id {
            parse_entity_id(raw_id)?;
        }
        ReferenceResolver::new(self.ctx.store())
            .resolve::<Habit>(&input)?
            .ok_or_else(|| {
                let wanted = input.id.as_deref().or(input.name.as_deref()).unwrap_or("");
                ActionError::not_found(EntityKind::Habit, wanted)
            })
    }

    fn load_logs(&self) -> ActionOutcome<&HashMap<EntityId, Vec<HabitLog>>> {
        self.logs.get_or_try_init(|| -> ActionOutcome<_> {
            let mut grouped: HashMap<EntityId, Vec<HabitLog>> = HashMap::new();
            for log in self.ctx.store().fetch_all::<HabitLog>()? {
                grouped.entry(log.habit_id).or_default().push(log);
            }
            Ok(grouped)
        })
    }

    /// Streaks from the preloaded logs; empty when logs were never loaded.
    fn summary(&self, habit: &Habit) -> StreakSummary {
        let logs = self
            .logs
            .get()
            .and_then(|grouped| grouped.get(&habit.id))
            .map(Vec::as_slice)
            .unwrap_or(&[]);
        compute_streaks(habit, logs, self.ctx.today())
    }

    pub fn view(
        &self,
        habit: &Habit,
        summary: &StreakSummary,
        categories: &HashMap<EntityId, String>,
    ) -> ItemView {
        View::new(habit.id)
            .text("name", &habit.name)
            .opt_text("notes", habit.notes.as_deref())
            .text("frequency", habit.frequency.as_str())
            .text("trackingType", habit.tracking_type.as_str())
            .number("goalTarget", habit.goal_target)
            .opt_text("unit", habit.unit.as_deref())
            .opt_id("categoryId", habit.category_id)
            .opt_text("categoryName", category_name(categories, habit.category_id))
            .integer("currentStreak", i64::from(summary.current_streak))
            .integer("longestStreak", i64::from(summary.longest_streak))
            .number("currentPeriodValue", summary.current_period_value)
            .flag("completedCurrentPeriod", summary.completed_current_period)
            .integer("totalLogs", summary.total_logs as i64)
            .timestamp("createdAt", habit.created_at)
            .timestamp("updatedAt", habit.updated_at)
            .build()
    }

    fn goal_target(&self, params: &Params) -> ActionOutcome<Option<f64>> {
        match params.number(&GOAL_TARGET)? {
            Some(target) if target <= 0.0 => Err(ActionError::validation(format!(
                "field `{}` must be a positive number",
                GOAL_TARGET.name
            ))),
            other => Ok(other),
        }
    }
}

fn period_label(frequency: HabitFrequency, count: u32) -> &'static str {
    match (frequency, count == 1) {
        (HabitFrequency::Daily, true) => "day",
        (HabitFrequency::Daily, false) => "days",
        (HabitFrequency::Weekly, true) => "week",
        (HabitFrequency::Weekly, false) => "weeks",
        (HabitFrequency::Monthly, true) => "month",
        (HabitFrequency::Monthly, false) => "months",
    }
}

fn format_value(value: f64, unit: Option<&str>) -> String {
    match unit {
        Some(unit) => format!("{value} {unit}"),
        None => format!("{value}"),
    }
}

impl<S: EntityStore> BulkDomain<S> for HabitHandler<'_, S> {
    type Entity = Habit;
    type Patch = HabitPatch;

    fn keys(&self) -> &'static DomainKeys {
        &HABIT_KEYS
    }

    fn ctx(&self) -> &ActionContext<S> {
        self.ctx
    }

    fn create_one(&self, params: &Params) -> ActionOutcome<Created<Habit>> {
        let mut habit = Habit::new(params.required_string(&NAME)?, self.ctx.now_ms());
        habit.notes = optional_text(params, &NOTES)?;
        if let Some(frequency) =
            params.choice(&FREQUENCY, HabitFrequency::parse, HabitFrequency::SUPPORTED)?
        {
            habit.frequency = frequency;
        }
        if let Some(tracking_type) =
            params.choice(&TRACKING_TYPE, TrackingType::parse, TrackingType::SUPPORTED)?
        {
            habit.tracking_type = tracking_type;
        }
        if let Some(target) = self.goal_target(params)? {
            habit.goal_target = target;
        }
        habit.unit = optional_text(params, &UNIT)?;

        let mut warnings = Vec::new();
        let category =
            decode_reference::<S, Category>(self.ctx, &CATEGORY_REF, params, &mut warnings)?;
        apply_resolution(&mut habit.category_id, &category);

        self.ctx.store().insert(&habit)?;
        Ok(Created {
            entity: habit,
            notes: warnings,
        })
    }

    fn decode_patch(&self, params: &Params) -> ActionOutcome<HabitPatch> {
        let mut warnings = Vec::new();
        Ok(HabitPatch {
            name: replacement_text(params, &NAME)?,
            notes: params.clearable_string(&NOTES)?,
            frequency: params.choice(&FREQUENCY, HabitFrequency::parse, HabitFrequency::SUPPORTED)?,
            tracking_type: params.choice(
                &TRACKING_TYPE,
                TrackingType::parse,
                TrackingType::SUPPORTED,
            )?,
            goal_target: self.goal_target(params)?,
            unit: params.clearable_string(&UNIT)?,
            category: decode_reference::<S, Category>(
                self.ctx,
                &CATEGORY_REF,
                params,
                &mut warnings,
            )?,
            warnings,
        })
    }

    fn patch_notes<'p>(&self, patch: &'p HabitPatch) -> &'p [String] {
        &patch.warnings
    }

    fn apply_patch(&self, habit: &mut Habit, patch: &HabitPatch) -> ActionOutcome<()> {
        if let Some(name) = &patch.name {
            habit.name = name.clone();
        }
        if let Some(notes) = &patch.notes {
            habit.notes = notes.clone();
        }
        if let Some(frequency) = patch.frequency {
            habit.frequency = frequency;
        }
        if let Some(tracking_type) = patch.tracking_type {
            habit.tracking_type = tracking_type;
        }
        if let Some(target) = patch.goal_target {
            habit.goal_target = target;
        }
        if let Some(unit) = &patch.unit {
            habit.unit = unit.clone();
        }
        apply_resolution(&mut habit.category_id, &patch.category);
        habit.updated_at = self.ctx.now_ms();
        Ok(())
    }

    fn decode_filter(&self, params: &Params) -> ActionOutcome<ListFilter> {
        let filter = ListFilter::decode(self.ctx, params, &HABIT_KEYS, SUPPORTED_FILTERS)?;
        let needs_streaks = filter.is_completed.is_some()
            || matches!(
                filter.named,
                Some(NamedFilter::Completed | NamedFilter::Incomplete)
            );
        if needs_streaks {
            self.load_logs()?;
        }
        Ok(filter)
    }

    fn matches(&self, filter: &ListFilter, habit: &Habit) -> bool {
        let named = match filter.named {
            Some(NamedFilter::Daily) => habit.frequency == HabitFrequency::Daily,
            Some(NamedFilter::Weekly) => habit.frequency == HabitFrequency::Weekly,
            Some(NamedFilter::Monthly) => habit.frequency == HabitFrequency::Monthly,
            _ => true,
        };
        let wants_completion = filter.is_completed.is_some()
            || matches!(
                filter.named,
                Some(NamedFilter::Completed | NamedFilter::Incomplete)
            );
        let completion = !wants_completion
            || filter.matches_completion(self.summary(habit).completed_current_period);
        named
            && completion
            && filter.matches_id(habit.id)
            && filter.category.matches(habit.category_id)
    }
}
