//! Error taxonomy for action execution.
//!
//! Handlers convert every `ActionError` into a failed `ActionResult`; the
//! error never crosses the coordinator boundary as a Rust `Err`.

use crate::model::EntityKind;
use crate::store::StoreError;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type ActionOutcome<T> = Result<T, ActionError>;

/// Failure classes reported in the result envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    NotFound,
    Guard,
    Persistence,
}

#[derive(Debug)]
pub enum ActionError {
    /// Missing/invalid field, malformed identifier, bad enum value or an
    /// invalid field combination.
    Validation(String),
    /// A well-formed identifier that resolves to nothing.
    NotFound { kind: EntityKind, id: String },
    /// Destructive all-matching operation attempted without `confirm`.
    Guard { matched: usize, message: String },
    /// The store failed to commit a change.
    Persistence(StoreError),
}

impl ActionError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn not_found(kind: EntityKind, id: impl ToString) -> Self {
        Self::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Guard { .. } => ErrorKind::Guard,
            Self::Persistence(_) => ErrorKind::Persistence,
        }
    }
}

impl Display for ActionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(message) => write!(f, "invalid request: {message}"),
            Self::NotFound { kind, id } => write!(f, "{kind} not found: {id}"),
            Self::Guard { message, .. } => write!(f, "{message}"),
            Self::Persistence(err) => write!(f, "failed to save changes: {err}"),
        }
    }
}

impl Error for ActionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Persistence(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StoreError> for ActionError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Validation(message) => Self::Validation(message),
            StoreError::NotFound { kind, id } => Self::not_found(kind, id),
            other => Self::Persistence(other),
        }
    }
}
