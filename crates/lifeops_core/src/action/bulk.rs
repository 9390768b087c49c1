//! Shared single / multiple / all-matching execution for create, update and
//! delete.
//!
//! # Invariants
//! - Targets are processed sequentially in request order (or store order for
//!   all-matching); one failing item never aborts the batch.
//! - Each item commits on its own, so later items observe earlier ones.
//! - `deleteAll`, and any all-matching operation above the configured
//!   threshold, requires `confirm: true`; a refused operation mutates nothing
//!   and still reports the candidate count.
//! - `success` is true as long as at least one item succeeded.

use super::context::ActionContext;
use super::error::{ActionError, ActionOutcome};
use super::fields::{DomainKeys, CONFIRM, DELETE_ALL, FILTER, TITLE, UPDATE_ALL};
use super::filter::ListFilter;
use super::params::{missing, parse_entity_id, Field, Params};
use super::resolver::Referenceable;
use super::result::{ActionResult, ItemView};
use crate::model::{EntityId, EntityKind};
use crate::store::{EntityStore, StoredEntity};
use log::{info, warn};
use serde_json::{Map, Value};

/// Nested filter object used by `updateAll`, so filter keys never collide
/// with the fields being written.
pub const WHERE: Field = Field::new("where", &["where", "match", "matching"]);

/// A record built by `create`, plus non-fatal notes for the caller.
#[derive(Debug, Clone)]
pub struct Created<E> {
    pub entity: E,
    pub notes: Vec<String>,
}

impl<E> Created<E> {
    pub fn new(entity: E) -> Self {
        Self {
            entity,
            notes: Vec::new(),
        }
    }
}

/// Domain hooks consumed by `BulkExecutor`.
pub trait BulkDomain<S: EntityStore> {
    type Entity: Referenceable;
    type Patch;

    fn keys(&self) -> &'static DomainKeys;

    fn ctx(&self) -> &ActionContext<S>;

    /// Decodes, resolves and persists one new record.
    fn create_one(&self, params: &Params) -> ActionOutcome<Created<Self::Entity>>;

    /// Decodes a partial patch. Resolution notes are carried by the patch.
    fn decode_patch(&self, params: &Params) -> ActionOutcome<Self::Patch>;

    fn patch_notes<'p>(&self, patch: &'p Self::Patch) -> &'p [String];

    /// Applies `patch` in memory; persisting is left to the executor.
    fn apply_patch(&self, entity: &mut Self::Entity, patch: &Self::Patch) -> ActionOutcome<()>;

    fn decode_filter(&self, params: &Params) -> ActionOutcome<ListFilter>;

    fn matches(&self, filter: &ListFilter, entity: &Self::Entity) -> bool;
}

/// Which records an update/delete request targets.
#[derive(Debug, Clone, PartialEq)]
pub enum Target {
    Single(String),
    Multiple(Vec<String>),
    AllMatching {
        filter: ListFilter,
        /// `deleteAll` was requested explicitly and is always guarded.
        /// `updateAll` is guarded only above the threshold.
        explicit: bool,
    },
}

/// Per-item tally for one bulk operation.
#[derive(Debug)]
pub struct BulkOutcome {
    kind: EntityKind,
    verb: &'static str,
    matched: usize,
    updated: usize,
    failures: Vec<(String, ActionError)>,
    items: Option<Vec<ItemView>>,
    notes: Vec<String>,
}

impl BulkOutcome {
    pub fn new(kind: EntityKind, verb: &'static str, matched: usize) -> Self {
        Self {
            kind,
            verb,
            matched,
            updated: 0,
            failures: Vec::new(),
            items: None,
            notes: Vec::new(),
        }
    }

    pub fn succeeded(&mut self) {
        self.updated += 1;
    }

    pub fn failed(&mut self, label: impl Into<String>, error: ActionError) {
        self.failures.push((label.into(), error));
    }

    pub fn push_item(&mut self, item: ItemView) {
        self.items.get_or_insert_with(Vec::new).push(item);
    }

    pub fn note(&mut self, notes: &[String]) {
        self.notes.extend(notes.iter().cloned());
    }

    pub fn into_result(self) -> ActionResult {
        let mut message = if self.failures.is_empty() {
            if self.matched == 0 {
                format!("No {} matched.", self.kind.plural())
            } else {
                format!(
                    "{} {} {}.",
                    self.verb,
                    self.updated,
                    self.kind.counted(self.updated)
                )
            }
        } else {
            let details: Vec<String> = self
                .failures
                .iter()
                .map(|(label, error)| format!("{label}: {error}"))
                .collect();
            format!(
                "{} {} of {} {}. {} failed: {}",
                self.verb,
                self.updated,
                self.matched,
                self.kind.counted(self.matched),
                self.failures.len(),
                details.join("; ")
            )
        };
        append_notes(&mut message, &self.notes);

        let mut result = if self.updated > 0 {
            ActionResult::success(message)
        } else {
            let mut failed = ActionResult::success(message);
            failed.success = false;
            failed.error_kind = self.failures.first().map(|(_, error)| error.kind());
            failed
        };
        result = result.with_counts(self.matched, self.updated);
        if let Some(items) = self.items {
            result = result.with_items(items);
        }
        result
    }
}

/// Runs create/update/delete over a `BulkDomain`.
pub struct BulkExecutor<'h, S: EntityStore, D: BulkDomain<S>> {
    domain: &'h D,
    _store: std::marker::PhantomData<S>,
}

impl<'h, S: EntityStore, D: BulkDomain<S>> BulkExecutor<'h, S, D> {
    pub fn new(domain: &'h D) -> Self {
        Self {
            domain,
            _store: std::marker::PhantomData,
        }
    }

    fn kind(&self) -> EntityKind {
        self.domain.keys().kind
    }

    pub fn create(&self, params: &Params) -> ActionResult {
        let keys = self.domain.keys();
        if let Some(elements) = params.array(&keys.items) {
            return self.create_many(elements);
        }

        match self.domain.create_one(params) {
            Ok(created) => {
                let mut message = format!(
                    "Created {} '{}'.",
                    self.kind(),
                    created.entity.reference_name()
                );
                append_notes(&mut message, &created.notes);
                ActionResult::success(message)
                    .with_id(created.entity.id())
                    .with_updated(1)
            }
            Err(err) => ActionResult::failure(&err),
        }
    }

    fn create_many(&self, elements: &[Value]) -> ActionResult {
        let mut outcome = BulkOutcome::new(self.kind(), "Created", elements.len());
        for (index, element) in elements.iter().enumerate() {
            let params = Params::from_value(element.clone());
            let label = params
                .as_ref()
                .ok()
                .and_then(item_title)
                .map_or_else(|| format!("item {}", index + 1), |title| format!("'{title}'"));
            let created = params.and_then(|params| self.domain.create_one(&params));
            match created {
                Ok(created) => {
                    outcome.succeeded();
                    outcome.note(&created.notes);
                    outcome.push_item(summary(&created.entity));
                }
                Err(err) => outcome.failed(label, err),
            }
        }
        self.finish("create", "multiple", outcome)
    }

    pub fn update(&self, params: &Params) -> ActionResult {
        let keys = self.domain.keys();
        if let Some(elements) = params.array(&keys.items) {
            if elements.iter().all(Value::is_object) {
                return self.update_many(elements);
            }
        }

        self.try_update(params)
            .unwrap_or_else(|err| ActionResult::failure(&err))
    }

    fn try_update(&self, params: &Params) -> ActionOutcome<ActionResult> {
        let patch = self.domain.decode_patch(params)?;
        let target = self.select(params, &UPDATE_ALL, false)?;
        self.run_update(target, params, &patch)
    }

    fn update_many(&self, elements: &[Value]) -> ActionResult {
        let keys = self.domain.keys();
        let mut outcome = BulkOutcome::new(self.kind(), "Updated", elements.len());
        for (index, element) in elements.iter().enumerate() {
            let mut label = format!("item {}", index + 1);
            let updated = Params::from_value(element.clone()).and_then(|params| {
                let id = params.id(&keys.id)?;
                label = id.to_string();
                let patch = self.domain.decode_patch(&params)?;
                self.update_one(id, &patch)?;
                Ok(patch)
            });
            match updated {
                Ok(patch) => {
                    outcome.succeeded();
                    outcome.note(self.domain.patch_notes(&patch));
                }
                Err(err) => outcome.failed(label, err),
            }
        }
        self.finish("update", "multiple", outcome)
    }

    fn run_update(
        &self,
        target: Target,
        params: &Params,
        patch: &D::Patch,
    ) -> ActionOutcome<ActionResult> {
        let notes = self.domain.patch_notes(patch);
        match target {
            Target::Single(raw) => {
                let id = parse_entity_id(&raw)?;
                let entity = self.update_one(id, patch)?;
                let mut message = format!(
                    "Updated {} '{}'.",
                    self.kind(),
                    entity.reference_name()
                );
                append_notes(&mut message, notes);
                Ok(ActionResult::success(message).with_id(id).with_updated(1))
            }
            Target::Multiple(raw_ids) => {
                let mut outcome = BulkOutcome::new(self.kind(), "Updated", raw_ids.len());
                for raw in raw_ids {
                    match parse_entity_id(&raw).and_then(|id| self.update_one(id, patch)) {
                        Ok(_) => outcome.succeeded(),
                        Err(err) => outcome.failed(raw, err),
                    }
                }
                outcome.note(notes);
                Ok(self.finish("update", "multiple", outcome))
            }
            Target::AllMatching { filter, explicit } => {
                let candidates = self.candidates(&filter)?;
                self.guard(params, "update", candidates.len(), explicit)?;
                let mut outcome = BulkOutcome::new(self.kind(), "Updated", candidates.len());
                for mut entity in candidates {
                    let label = format!("'{}'", entity.reference_name());
                    let saved = self
                        .domain
                        .apply_patch(&mut entity, patch)
                        .and_then(|()| {
                            self.domain
                                .ctx()
                                .store()
                                .update(&entity)
                                .map_err(ActionError::from)
                        });
                    match saved {
                        Ok(()) => outcome.succeeded(),
                        Err(err) => outcome.failed(label, err),
                    }
                }
                outcome.note(notes);
                Ok(self.finish("update", "all_matching", outcome))
            }
        }
    }

    fn update_one(&self, id: EntityId, patch: &D::Patch) -> ActionOutcome<D::Entity> {
        let store = self.domain.ctx().store();
        let mut entity = store
            .get::<D::Entity>(id)?
            .ok_or_else(|| ActionError::not_found(self.kind(), id))?;
        self.domain.apply_patch(&mut entity, patch)?;
        store.update(&entity)?;
        Ok(entity)
    }

    pub fn delete(&self, params: &Params) -> ActionResult {
        self.select(params, &DELETE_ALL, true)
            .and_then(|target| self.run_delete(target, params))
            .unwrap_or_else(|err| ActionResult::failure(&err))
    }

    fn run_delete(&self, target: Target, params: &Params) -> ActionOutcome<ActionResult> {
        match target {
            Target::Single(raw) => {
                let id = parse_entity_id(&raw)?;
                let entity = self.delete_one(id)?;
                Ok(ActionResult::success(format!(
                    "Deleted {} '{}'.",
                    self.kind(),
                    entity.reference_name()
                ))
                .with_id(id)
                .with_updated(1))
            }
            Target::Multiple(raw_ids) => {
                let mut outcome = BulkOutcome::new(self.kind(), "Deleted", raw_ids.len());
                for raw in raw_ids {
                    match parse_entity_id(&raw).and_then(|id| self.delete_one(id)) {
                        Ok(_) => outcome.succeeded(),
                        Err(err) => outcome.failed(raw, err),
                    }
                }
                Ok(self.finish("delete", "multiple", outcome))
            }
            Target::AllMatching { filter, explicit } => {
                let candidates = self.candidates(&filter)?;
                self.guard(params, "delete", candidates.len(), explicit)?;
                let store = self.domain.ctx().store();
                let mut outcome = BulkOutcome::new(self.kind(), "Deleted", candidates.len());
                for entity in candidates {
                    match store.delete::<D::Entity>(entity.id()) {
                        Ok(()) => outcome.succeeded(),
                        Err(err) => {
                            outcome.failed(format!("'{}'", entity.reference_name()), err.into())
                        }
                    }
                }
                Ok(self.finish("delete", "all_matching", outcome))
            }
        }
    }

    fn delete_one(&self, id: EntityId) -> ActionOutcome<D::Entity> {
        let store = self.domain.ctx().store();
        let entity = store
            .get::<D::Entity>(id)?
            .ok_or_else(|| ActionError::not_found(self.kind(), id))?;
        store.delete::<D::Entity>(id)?;
        Ok(entity)
    }

    /// Picks the execution mode for update/delete.
    ///
    /// An all-matching flag wins; then explicit identifiers; then, for
    /// delete only, a bare filter.
    pub fn select(
        &self,
        params: &Params,
        all_flag: &Field,
        is_delete: bool,
    ) -> ActionOutcome<Target> {
        let keys = self.domain.keys();
        if params.flag(all_flag)? {
            let filter = if is_delete {
                self.domain.decode_filter(params)?
            } else {
                self.domain.decode_filter(&update_filter_params(params)?)?
            };
            return Ok(Target::AllMatching {
                filter,
                explicit: is_delete,
            });
        }

        if let Some(ids) = params.string_list(&keys.ids)? {
            return multiple(ids);
        }
        if let Some(ids) = params.id_list(&keys.id)? {
            return multiple(ids);
        }
        if let Some(id) = params.string(&keys.id)?.filter(|id| !id.is_empty()) {
            return Ok(Target::Single(id));
        }

        if is_delete {
            let filter = self.domain.decode_filter(params)?;
            if filter.is_narrowed() {
                return Ok(Target::AllMatching {
                    filter,
                    explicit: false,
                });
            }
        }
        Err(missing(&keys.id))
    }

    fn candidates(&self, filter: &ListFilter) -> ActionOutcome<Vec<D::Entity>> {
        Ok(self
            .domain
            .ctx()
            .store()
            .fetch(|entity: &D::Entity| self.domain.matches(filter, entity))?)
    }

    fn guard(
        &self,
        params: &Params,
        verb: &str,
        matched: usize,
        explicit: bool,
    ) -> ActionOutcome<()> {
        let threshold = self.domain.ctx().config().bulk_guard_threshold;
        if !explicit && matched <= threshold {
            return Ok(());
        }
        if params.flag(&CONFIRM)? {
            return Ok(());
        }
        warn!(
            "event=bulk_guard module=bulk status=refused kind={} verb={verb} matched={matched} threshold={threshold}",
            self.kind()
        );
        Err(ActionError::Guard {
            matched,
            message: format!(
                "Refusing to {verb} {matched} {} without confirmation; repeat the request with `confirm: true`.",
                self.kind().counted(matched)
            ),
        })
    }

    fn finish(&self, verb: &str, mode: &str, outcome: BulkOutcome) -> ActionResult {
        info!(
            "event=bulk_execute module=bulk status={} kind={} verb={verb} mode={mode} matched={} updated={} failed={}",
            if outcome.updated > 0 { "ok" } else { "error" },
            self.kind(),
            outcome.matched,
            outcome.updated,
            outcome.failures.len()
        );
        outcome.into_result()
    }
}

fn multiple(ids: Vec<String>) -> ActionOutcome<Target> {
    if ids.is_empty() {
        return Err(ActionError::validation("identifier list is empty"));
    }
    Ok(Target::Multiple(ids))
}

/// Filter parameters for `updateAll`: the `where` object if given, else only
/// the named `filter` string.
fn update_filter_params(params: &Params) -> ActionOutcome<Params> {
    if let Some((_, value)) = params.raw(&WHERE) {
        return Params::from_value(value.clone());
    }
    let mut map = Map::new();
    if let Some(named) = params.string(&FILTER)? {
        map.insert(FILTER.name.to_string(), Value::String(named));
    }
    Ok(Params::from_map(map))
}

/// Title (or name) of a bulk element, used to label its failure.
fn item_title(params: &Params) -> Option<String> {
    params
        .string(&TITLE)
        .ok()
        .flatten()
        .filter(|title| !title.trim().is_empty())
}

fn summary<E: Referenceable>(entity: &E) -> ItemView {
    let mut view = ItemView::new();
    view.insert("id".to_string(), Value::String(entity.id().to_string()));
    view.insert(
        "title".to_string(),
        Value::String(entity.reference_name().to_string()),
    );
    view
}

fn append_notes(message: &mut String, notes: &[String]) {
    for note in notes {
        message.push_str(&format!(" Note: {note}."));
    }
}

#[cfg(test)]
mod tests {
    use super::BulkOutcome;
    use crate::action::error::{ActionError, ErrorKind};
    use crate::model::EntityKind;

    #[test]
    fn partial_failure_names_each_failed_item() {
        let mut outcome = BulkOutcome::new(EntityKind::Category, "Created", 2);
        outcome.succeeded();
        outcome.failed("item 2", ActionError::validation("field `name` must not be empty"));

        let result = outcome.into_result();
        assert!(result.success);
        assert_eq!(result.updated_count, Some(1));
        assert_eq!(result.matched_count, Some(2));
        assert!(result.message.starts_with("Created 1 of 2 categories. 1 failed: item 2:"));
    }

    #[test]
    fn all_failed_reports_first_error_kind() {
        let mut outcome = BulkOutcome::new(EntityKind::Task, "Deleted", 1);
        outcome.failed("abc", ActionError::validation("malformed identifier `abc`"));

        let result = outcome.into_result();
        assert!(!result.success);
        assert_eq!(result.updated_count, Some(0));
        assert_eq!(result.error_kind, Some(ErrorKind::Validation));
    }

    #[test]
    fn empty_match_is_not_a_success() {
        let result = BulkOutcome::new(EntityKind::Event, "Deleted", 0).into_result();
        assert!(!result.success);
        assert_eq!(result.message, "No events matched.");
        assert_eq!(result.error_kind, None);
    }
}
