//! List filters shared by `list` and all-matching bulk operations.
//!
//! Decoding is generic; each handler evaluates the decoded filter against
//! its own records via the `matches_*` helpers plus its named predicates.

use super::context::ActionContext;
use super::error::{ActionError, ActionOutcome};
use super::fields::{
    DomainKeys, FilterKey, CATEGORY, CATEGORY_ID, CATEGORY_NAME, DATE, FILTER, IS_COMPLETED,
    LIMIT, RANGE_END, RANGE_START,
};
use super::params::{parse_entity_id, Params};
use super::resolver::{
    ReferenceFields, ReferencePatch, ReferenceResolver, Referenceable, Resolution,
};
use crate::model::category::Category;
use crate::model::{day_bounds, EntityId};
use crate::store::EntityStore;
use chrono::NaiveDate;
use std::fmt::{Display, Formatter};

pub const CATEGORY_REF: ReferenceFields = ReferenceFields {
    label: "category",
    id: CATEGORY_ID,
    name: CATEGORY_NAME,
    either: CATEGORY,
};

/// Named list predicates. Not every domain supports every name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamedFilter {
    Today,
    Upcoming,
    Past,
    Overdue,
    Completed,
    Incomplete,
    Daily,
    Weekly,
    Monthly,
}

impl NamedFilter {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Today => "today",
            Self::Upcoming => "upcoming",
            Self::Past => "past",
            Self::Overdue => "overdue",
            Self::Completed => "completed",
            Self::Incomplete => "incomplete",
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
        }
    }

    /// `Some(None)` means "no narrowing" (`all`).
    pub fn parse(value: &str) -> Option<Option<Self>> {
        let normalized = value.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        let named = match normalized.as_str() {
            "" | "all" | "any" | "everything" => return Some(None),
            "today" => Self::Today,
            "upcoming" | "future" | "next" | "scheduled" => Self::Upcoming,
            "past" | "previous" | "history" => Self::Past,
            "overdue" | "late" => Self::Overdue,
            "completed" | "complete" | "done" | "finished" => Self::Completed,
            "incomplete" | "pending" | "open" | "active" | "todo" | "not_completed"
            | "uncompleted" => Self::Incomplete,
            "daily" => Self::Daily,
            "weekly" => Self::Weekly,
            "monthly" => Self::Monthly,
            _ => return None,
        };
        Some(Some(named))
    }
}

impl Display for NamedFilter {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Narrowing by a referenced record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReferenceFilter {
    #[default]
    Any,
    Only(EntityId),
    /// Explicitly "no reference".
    Unset,
    /// Requested reference matched nothing; the filter matches no record.
    Unresolved,
}

impl ReferenceFilter {
    pub fn matches(self, reference: Option<EntityId>) -> bool {
        match self {
            Self::Any => true,
            Self::Only(id) => reference == Some(id),
            Self::Unset => reference.is_none(),
            Self::Unresolved => false,
        }
    }

    pub fn from_resolution(resolution: Resolution) -> Self {
        match resolution {
            Resolution::Unchanged => Self::Any,
            Resolution::Cleared => Self::Unset,
            Resolution::Linked(id) => Self::Only(id),
            Resolution::Unresolved(_) => Self::Unresolved,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListFilter {
    pub named: Option<NamedFilter>,
    pub ids: Option<Vec<EntityId>>,
    pub date: Option<NaiveDate>,
    pub range_start: Option<NaiveDate>,
    pub range_end: Option<NaiveDate>,
    pub category: ReferenceFilter,
    pub parent: ReferenceFilter,
    pub is_completed: Option<bool>,
    pub limit: Option<usize>,
    /// Evaluation instant, captured at decode time.
    pub now_ms: i64,
    pub today: NaiveDate,
}

impl ListFilter {
    /// Decodes the shared filter keys. `supported` lists the named filters
    /// the calling domain understands. Shared keys outside `keys.filters`
    /// are a validation error.
    pub fn decode<S: EntityStore>(
        ctx: &ActionContext<S>,
        params: &Params,
        keys: &DomainKeys,
        supported: &[NamedFilter],
    ) -> ActionOutcome<Self> {
        reject_foreign_keys(params, keys, supported)?;
        let now = ctx.now();
        let mut filter = Self {
            now_ms: now.timestamp_millis(),
            today: now.date_naive(),
            ..Self::default()
        };

        if let Some(text) = params.string(&FILTER)? {
            let named = NamedFilter::parse(&text).ok_or_else(|| unsupported(&text, supported))?;
            if let Some(named) = named {
                if !supported.contains(&named) {
                    return Err(unsupported(&text, supported));
                }
                filter.named = Some(named);
            }
        }

        filter.ids = decode_ids(params, keys)?;
        if keys.filters.contains(&FilterKey::Date) {
            filter.date = params.date(&DATE, ctx.temporal(), now)?;
        }
        if keys.filters.contains(&FilterKey::Range) {
            filter.range_start = params.date(&RANGE_START, ctx.temporal(), now)?;
            filter.range_end = params.date(&RANGE_END, ctx.temporal(), now)?;
        }
        if let (Some(start), Some(end)) = (filter.range_start, filter.range_end) {
            if end < start {
                return Err(ActionError::validation(format!(
                    "`{}` must not be before `{}`",
                    RANGE_END.name, RANGE_START.name
                )));
            }
        }

        if keys.filters.contains(&FilterKey::Completion) {
            filter.is_completed = params.bool(&IS_COMPLETED)?;
        }
        if keys.filters.contains(&FilterKey::Category) {
            let patch = CATEGORY_REF.decode(params)?;
            filter.category = resolve_filter::<S, Category>(ctx, &patch, CATEGORY_REF.label)?;
        }

        filter.limit = match params.integer(&LIMIT)? {
            Some(limit) if limit <= 0 => {
                return Err(ActionError::validation(format!(
                    "field `{}` must be a positive integer",
                    LIMIT.name
                )))
            }
            Some(limit) => Some(limit as usize),
            None => ctx.config().default_list_limit.map(|limit| limit as usize),
        };

        Ok(filter)
    }

    /// True when any narrowing key was supplied (limit excluded).
    pub fn is_narrowed(&self) -> bool {
        self.named.is_some()
            || self.ids.is_some()
            || self.date.is_some()
            || self.range_start.is_some()
            || self.range_end.is_some()
            || self.category != ReferenceFilter::Any
            || self.parent != ReferenceFilter::Any
            || self.is_completed.is_some()
    }

    /// `[start, end)` window in epoch ms from `date` or the inclusive date range.
    pub fn window(&self) -> Option<(i64, i64)> {
        if let Some(date) = self.date {
            return Some(day_bounds(date));
        }
        if self.range_start.is_none() && self.range_end.is_none() {
            return None;
        }
        let start = self.range_start.map_or(i64::MIN, |date| day_bounds(date).0);
        let end = self.range_end.map_or(i64::MAX, |date| day_bounds(date).1);
        Some((start, end))
    }

    pub fn matches_id(&self, id: EntityId) -> bool {
        self.ids.as_ref().map_or(true, |ids| ids.contains(&id))
    }

    pub fn matches_completion(&self, is_completed: bool) -> bool {
        self.is_completed.map_or(true, |wanted| wanted == is_completed)
            && match self.named {
                Some(NamedFilter::Completed) => is_completed,
                Some(NamedFilter::Incomplete) => !is_completed,
                _ => true,
            }
    }

    /// A point in time must fall inside the window; records without one never match a window.
    pub fn matches_instant(&self, at: Option<i64>) -> bool {
        match self.window() {
            None => true,
            Some((start, end)) => at.is_some_and(|at| at >= start && at < end),
        }
    }

    pub fn matches_day(&self, day: Option<NaiveDate>) -> bool {
        self.matches_instant(day.map(|day| day_bounds(day).0))
    }

    /// Caps `items` at `limit`.
    pub fn truncate<T>(&self, items: &mut Vec<T>) {
        if let Some(limit) = self.limit {
            items.truncate(limit);
        }
    }
}

/// Resolves a reference patch for filtering purposes.
pub fn resolve_filter<S: EntityStore, E: Referenceable>(
    ctx: &ActionContext<S>,
    patch: &ReferencePatch,
    label: &str,
) -> ActionOutcome<ReferenceFilter> {
    let resolution = ReferenceResolver::new(ctx.store()).resolve_patch::<E>(patch, label)?;
    Ok(ReferenceFilter::from_resolution(resolution))
}

fn decode_ids(params: &Params, keys: &DomainKeys) -> ActionOutcome<Option<Vec<EntityId>>> {
    let raw = match params.id_list(&keys.ids)? {
        Some(list) => Some(list),
        None => match params.id_list(&keys.id)? {
            Some(list) => Some(list),
            None => params.string(&keys.id)?.map(|id| vec![id]),
        },
    };
    raw.map(|list| list.iter().map(|id| parse_entity_id(id)).collect())
        .transpose()
}

fn reject_foreign_keys(
    params: &Params,
    keys: &DomainKeys,
    supported: &[NamedFilter],
) -> ActionOutcome<()> {
    let is_identifier = |key: &str| {
        keys.id.keys.iter().chain(keys.ids.keys).any(|alias| *alias == key)
    };
    let foreign = FilterKey::ALL
        .iter()
        .filter(|filter_key| !keys.filters.contains(*filter_key))
        .flat_map(|filter_key| filter_key.fields())
        .find_map(|field| {
            params
                .raw(field)
                .map(|(key, _)| key)
                .filter(|key| !is_identifier(*key))
        });
    let Some(key) = foreign else {
        return Ok(());
    };

    let mut accepted = vec![keys.id.name, keys.ids.name];
    if !supported.is_empty() {
        accepted.push(FILTER.name);
    }
    accepted.extend(
        keys.filters
            .iter()
            .flat_map(|filter_key| filter_key.fields())
            .map(|field| field.name),
    );
    accepted.push(LIMIT.name);
    Err(ActionError::validation(format!(
        "{} cannot be filtered by `{key}`; supported filter keys: {}",
        keys.kind.plural(),
        accepted.join(", ")
    )))
}

fn unsupported(text: &str, supported: &[NamedFilter]) -> ActionError {
    let names: Vec<&str> = supported.iter().map(|named| named.as_str()).collect();
    let expected = if names.is_empty() {
        "no named filters are supported".to_string()
    } else {
        format!("expected one of: all, {}", names.join(", "))
    };
    ActionError::validation(format!(
        "field `{}` has unsupported value `{}`; {expected}",
        FILTER.name,
        text.trim()
    ))
}

#[cfg(test)]
mod tests {
    use super::{ListFilter, NamedFilter, ReferenceFilter};
    use chrono::NaiveDate;
    use uuid::Uuid;

    #[test]
    fn named_filter_aliases() {
        assert_eq!(NamedFilter::parse("Pending"), Some(Some(NamedFilter::Incomplete)));
        assert_eq!(NamedFilter::parse("not completed"), Some(Some(NamedFilter::Incomplete)));
        assert_eq!(NamedFilter::parse("done"), Some(Some(NamedFilter::Completed)));
        assert_eq!(NamedFilter::parse("all"), Some(None));
        assert_eq!(NamedFilter::parse("someday"), None);
    }

    #[test]
    fn window_prefers_single_date_and_is_half_open() {
        let day = NaiveDate::from_ymd_opt(2025, 1, 2).expect("date");
        let filter = ListFilter {
            date: Some(day),
            range_start: NaiveDate::from_ymd_opt(2024, 1, 1),
            ..ListFilter::default()
        };
        let (start, end) = filter.window().expect("window");
        assert!(filter.matches_instant(Some(start)));
        assert!(!filter.matches_instant(Some(end)));
        assert!(!filter.matches_instant(None));
    }

    #[test]
    fn unresolved_reference_matches_nothing() {
        let id = Uuid::new_v4();
        assert!(ReferenceFilter::Any.matches(None));
        assert!(ReferenceFilter::Only(id).matches(Some(id)));
        assert!(ReferenceFilter::Unset.matches(None));
        assert!(!ReferenceFilter::Unresolved.matches(Some(id)));
        assert!(!ReferenceFilter::Unresolved.matches(None));
    }
}
