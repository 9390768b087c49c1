//! Domain handlers: one per entity kind.
//!
//! # Responsibility
//! - Decode typed requests from `Params`, resolve references, and build or
//!   patch records.
//! - Project records into flattened, string-keyed views.
//! - Delegate update/delete/bulk mechanics to `action::bulk`.

mod categories;
mod events;
mod goals;
mod habits;
mod tasks;

pub use categories::CategoryHandler;
pub use events::EventHandler;
pub use goals::GoalHandler;
pub use habits::HabitHandler;
pub use tasks::TaskHandler;

use crate::action::context::ActionContext;
use crate::action::error::{ActionError, ActionOutcome};
use crate::action::filter::ListFilter;
use crate::action::params::{Field, Params};
use crate::action::resolver::{ReferenceFields, ReferenceResolver, Referenceable, Resolution};
use crate::action::result::{ActionResult, ItemView};
use crate::model::category::Category;
use crate::model::{format_date, format_timestamp, EntityId, EntityKind};
use crate::store::EntityStore;
use chrono::NaiveDate;
use serde_json::{Number, Value};
use std::collections::HashMap;

/// Builder for flattened record views. Absent optionals are emitted as `null`.
pub(crate) struct View(ItemView);

impl View {
    pub(crate) fn new(id: EntityId) -> Self {
        let mut map = ItemView::new();
        map.insert("id".to_string(), Value::String(id.to_string()));
        Self(map)
    }

    fn put(mut self, key: &str, value: Value) -> Self {
        self.0.insert(key.to_string(), value);
        self
    }

    pub(crate) fn text(self, key: &str, value: &str) -> Self {
        self.put(key, Value::String(value.to_string()))
    }

    pub(crate) fn opt_text(self, key: &str, value: Option<&str>) -> Self {
        self.put(key, value.map_or(Value::Null, |text| Value::String(text.to_string())))
    }

    pub(crate) fn flag(self, key: &str, value: bool) -> Self {
        self.put(key, Value::Bool(value))
    }

    pub(crate) fn number(self, key: &str, value: f64) -> Self {
        self.put(key, Number::from_f64(value).map_or(Value::Null, Value::Number))
    }

    pub(crate) fn integer(self, key: &str, value: i64) -> Self {
        self.put(key, Value::from(value))
    }

    pub(crate) fn timestamp(self, key: &str, epoch_ms: i64) -> Self {
        self.put(key, Value::String(format_timestamp(epoch_ms)))
    }

    pub(crate) fn opt_timestamp(self, key: &str, epoch_ms: Option<i64>) -> Self {
        self.put(key, epoch_ms.map_or(Value::Null, |ms| Value::String(format_timestamp(ms))))
    }

    pub(crate) fn opt_date(self, key: &str, date: Option<NaiveDate>) -> Self {
        self.put(key, date.map_or(Value::Null, |date| Value::String(format_date(date))))
    }

    pub(crate) fn opt_id(self, key: &str, id: Option<EntityId>) -> Self {
        self.put(key, id.map_or(Value::Null, |id| Value::String(id.to_string())))
    }

    pub(crate) fn tags(self, key: &str, tags: &[String]) -> Self {
        self.put(
            key,
            Value::Array(tags.iter().cloned().map(Value::String).collect()),
        )
    }

    pub(crate) fn build(self) -> ItemView {
        self.0
    }
}

/// Category id -> name, for `categoryName` in views.
pub(crate) fn category_names<S: EntityStore>(
    ctx: &ActionContext<S>,
) -> ActionOutcome<HashMap<EntityId, String>> {
    Ok(ctx
        .store()
        .fetch_all::<Category>()?
        .into_iter()
        .map(|category| (category.id, category.name))
        .collect())
}

pub(crate) fn category_name(
    names: &HashMap<EntityId, String>,
    id: Option<EntityId>,
) -> Option<&str> {
    id.and_then(|id| names.get(&id)).map(String::as_str)
}

/// Optional replacement text that must not be blank when supplied.
pub(crate) fn replacement_text(params: &Params, field: &Field) -> ActionOutcome<Option<String>> {
    match params.string(field)? {
        Some(text) if text.is_empty() => Err(ActionError::validation(format!(
            "field `{}` must not be empty",
            field.name
        ))),
        other => Ok(other),
    }
}

/// Optional text where blank means "none".
pub(crate) fn optional_text(params: &Params, field: &Field) -> ActionOutcome<Option<String>> {
    Ok(params.string(field)?.filter(|text| !text.is_empty()))
}

/// Decodes and resolves one reference; unresolved references become notes.
pub(crate) fn decode_reference<S: EntityStore, E: Referenceable>(
    ctx: &ActionContext<S>,
    fields: &ReferenceFields,
    params: &Params,
    notes: &mut Vec<String>,
) -> ActionOutcome<Resolution> {
    let patch = fields.decode(params)?;
    let resolution = ReferenceResolver::new(ctx.store()).resolve_patch::<E>(&patch, fields.label)?;
    if let Resolution::Unresolved(note) = &resolution {
        notes.push(format!("{note}; left unset"));
    }
    Ok(resolution)
}

/// Applies a resolved reference. Unresolved references leave the value alone.
pub(crate) fn apply_resolution(target: &mut Option<EntityId>, resolution: &Resolution) {
    match resolution {
        Resolution::Unchanged | Resolution::Unresolved(_) => {}
        Resolution::Cleared => *target = None,
        Resolution::Linked(id) => *target = Some(*id),
    }
}

/// Shared envelope for `list`: every match is counted, at most `limit` returned.
pub(crate) fn list_result(
    kind: EntityKind,
    mut items: Vec<ItemView>,
    filter: &ListFilter,
) -> ActionResult {
    let matched = items.len();
    filter.truncate(&mut items);
    let message = match (matched, items.len()) {
        (0, _) => format!("No {} found.", kind.plural()),
        (total, shown) if shown < total => {
            format!("Found {total} {} (showing {shown}).", kind.counted(total))
        }
        (total, _) => format!("Found {total} {}.", kind.counted(total)),
    };
    let mut result = ActionResult::success(message).with_items(items);
    result.matched_count = Some(matched);
    result
}
