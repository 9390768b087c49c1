//! Cross-entity reference resolution by identifier or by name.
//!
//! # Invariants
//! - A supplied identifier is looked up directly; a name is only consulted
//!   when no identifier was supplied.
//! - Unparseable or unknown identifiers resolve to "no reference", never an
//!   error. Callers decide whether that is acceptable.
//! - Names match case-insensitively and exactly. With duplicates, the most
//!   recently created record wins.
//! - Resolution never creates records.

use super::error::ActionOutcome;
use super::params::{Field, Params};
use crate::model::category::Category;
use crate::model::event::Event;
use crate::model::goal::Goal;
use crate::model::habit::Habit;
use crate::model::task::Task;
use crate::model::EntityId;
use crate::store::{EntityStore, StoreResult, StoredEntity};
use log::debug;
use uuid::Uuid;

/// Records that can be referenced by name.
pub trait Referenceable: StoredEntity {
    fn reference_name(&self) -> &str;
}

impl Referenceable for Category {
    fn reference_name(&self) -> &str {
        &self.name
    }
}

impl Referenceable for Task {
    fn reference_name(&self) -> &str {
        &self.title
    }
}

impl Referenceable for Event {
    fn reference_name(&self) -> &str {
        &self.title
    }
}

impl Referenceable for Habit {
    fn reference_name(&self) -> &str {
        &self.name
    }
}

impl Referenceable for Goal {
    fn reference_name(&self) -> &str {
        &self.title
    }
}

/// Identifier and/or name supplied for one reference.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferenceInput {
    pub id: Option<String>,
    pub name: Option<String>,
}

impl ReferenceInput {
    pub fn by_id(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            name: None,
        }
    }

    pub fn by_name(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: Some(name.into()),
        }
    }

    fn describe(&self) -> String {
        match (&self.id, &self.name) {
            (Some(id), _) => format!("`{id}`"),
            (None, Some(name)) => format!("'{name}'"),
            (None, None) => "(empty)".to_string(),
        }
    }
}

/// What a request asked for one reference field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReferencePatch {
    /// No key present.
    Unchanged,
    /// Explicit null / empty value.
    Clear,
    Set(ReferenceInput),
}

/// Outcome of resolving a `ReferencePatch`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Unchanged,
    Cleared,
    Linked(EntityId),
    /// Reference was requested but matched nothing; carries a description.
    Unresolved(String),
}

/// Keys accepted for one reference: by id, by name, or either.
#[derive(Debug, Clone, Copy)]
pub struct ReferenceFields {
    pub label: &'static str,
    pub id: Field,
    pub name: Field,
    /// Value that is treated as an id when it parses as one, as a name otherwise.
    pub either: Field,
}

impl ReferenceFields {
    pub fn decode(&self, params: &Params) -> ActionOutcome<ReferencePatch> {
        let id = params.clearable_string(&self.id)?;
        let name = params.clearable_string(&self.name)?;
        let either = params.clearable_string(&self.either)?;

        if id.is_none() && name.is_none() && either.is_none() {
            return Ok(ReferencePatch::Unchanged);
        }

        let mut input = ReferenceInput {
            id: id.flatten(),
            name: name.flatten(),
        };
        if let Some(Some(value)) = either {
            if Uuid::parse_str(&value).is_ok() {
                input.id.get_or_insert(value);
            } else {
                input.name.get_or_insert(value);
            }
        }

        if input.id.is_none() && input.name.is_none() {
            return Ok(ReferencePatch::Clear);
        }
        Ok(ReferencePatch::Set(input))
    }
}

pub struct ReferenceResolver<'a, S: EntityStore> {
    store: &'a S,
}

impl<'a, S: EntityStore> ReferenceResolver<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Resolves an id-or-name input to an existing record.
    pub fn resolve<E: Referenceable>(&self, input: &ReferenceInput) -> StoreResult<Option<E>> {
        if let Some(raw_id) = input.id.as_deref() {
            let Ok(id) = Uuid::parse_str(raw_id.trim()) else {
                debug!(
                    "event=reference_resolve module=resolver status=unparseable kind={}",
                    E::KIND
                );
                return Ok(None);
            };
            return self.store.get::<E>(id);
        }

        match input.name.as_deref() {
            Some(name) => self.find_by_name(name),
            None => Ok(None),
        }
    }

    /// Case-insensitive exact name lookup; the most recently created match wins.
    pub fn find_by_name<E: Referenceable>(&self, name: &str) -> StoreResult<Option<E>> {
        let wanted = name.trim().to_lowercase();
        if wanted.is_empty() {
            return Ok(None);
        }
        let matches = self.store.fetch_newest_first(|entity: &E| {
            entity.reference_name().trim().to_lowercase() == wanted
        })?;
        if matches.len() > 1 {
            debug!(
                "event=reference_resolve module=resolver status=duplicate kind={} matches={}",
                E::KIND,
                matches.len()
            );
        }
        Ok(matches.into_iter().next())
    }

    /// Resolves a decoded patch into the reference change to apply.
    pub fn resolve_patch<E: Referenceable>(
        &self,
        patch: &ReferencePatch,
        label: &str,
    ) -> StoreResult<Resolution> {
        match patch {
            ReferencePatch::Unchanged => Ok(Resolution::Unchanged),
            ReferencePatch::Clear => Ok(Resolution::Cleared),
            ReferencePatch::Set(input) => Ok(match self.resolve::<E>(input)? {
                Some(entity) => Resolution::Linked(entity.id()),
                None => Resolution::Unresolved(format!(
                    "{label} {} not found",
                    input.describe()
                )),
            }),
        }
    }
}
