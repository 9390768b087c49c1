//! Data store contracts used by the action handlers.
//!
//! # Responsibility
//! - Define the narrow persistence boundary handlers depend on:
//!   insert, update, delete, get by id, fetch by predicate.
//! - Map records to column values and back (`StoredEntity`).
//!
//! # Invariants
//! - Write paths call `StoredEntity::validate()` before SQL mutations.
//! - Read paths reject invalid persisted state instead of masking it.
//! - Every call commits immediately; there is no deferred `save()`.

mod records;
mod sqlite;

pub use sqlite::SqliteStore;

use crate::db::DbError;
use crate::model::{EntityId, EntityKind};
use rusqlite::types::Value;
use rusqlite::Row;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence-layer error.
#[derive(Debug)]
pub enum StoreError {
    /// Record failed its own structural check before writing.
    Validation(String),
    Db(DbError),
    NotFound { kind: EntityKind, id: EntityId },
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Persisted row cannot be converted into a valid record.
    InvalidData(String),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(message) => write!(f, "{message}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound { kind, id } => write!(f, "{kind} not found: {id}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "store requires schema version {expected_version}, got {actual_version}"
            ),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Mapping between one record type and its table.
pub trait StoredEntity: Sized {
    const KIND: EntityKind;
    const TABLE: &'static str;
    /// Column names in binding order. The first column is the primary key `id`.
    const COLUMNS: &'static [&'static str];

    fn id(&self) -> EntityId;

    /// Column values in `COLUMNS` order.
    fn to_values(&self) -> Vec<Value>;

    fn from_row(row: &Row<'_>) -> StoreResult<Self>;

    /// Orders fetched records. Defaults to insertion-time order.
    const ORDER_BY: &'static str = "created_at ASC, rowid ASC";

    fn validate(&self) -> StoreResult<()> {
        Ok(())
    }
}

/// Persistence boundary consumed by the handlers.
pub trait EntityStore {
    /// Persists a new record. Identity is assigned by the record constructor.
    fn insert<E: StoredEntity>(&self, entity: &E) -> StoreResult<EntityId>;

    /// Overwrites an existing record, failing with `NotFound` when absent.
    fn update<E: StoredEntity>(&self, entity: &E) -> StoreResult<()>;

    /// Deletes a record by id, failing with `NotFound` when absent.
    fn delete<E: StoredEntity>(&self, id: EntityId) -> StoreResult<()>;

    fn get<E: StoredEntity>(&self, id: EntityId) -> StoreResult<Option<E>>;

    /// Returns every record accepted by `predicate`, in `ORDER_BY` order.
    fn fetch<E: StoredEntity>(&self, predicate: impl Fn(&E) -> bool) -> StoreResult<Vec<E>>;

    /// Like `fetch`, ordered by creation time descending; insertion order
    /// breaks ties, later first.
    fn fetch_newest_first<E: StoredEntity>(
        &self,
        predicate: impl Fn(&E) -> bool,
    ) -> StoreResult<Vec<E>>;

    fn fetch_all<E: StoredEntity>(&self) -> StoreResult<Vec<E>> {
        self.fetch(|_: &E| true)
    }

    fn count<E: StoredEntity>(&self) -> StoreResult<usize> {
        Ok(self.fetch_all::<E>()?.len())
    }
}
