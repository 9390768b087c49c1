//! Action execution core for LifeOps.
//!
//! Structured requests (`domain`, `action`, parameters) come in through the
//! [`Coordinator`]; every request ends in exactly one [`ActionResult`].
//! This crate is the single source of truth for record invariants.

pub mod action;
pub mod config;
pub mod db;
pub mod handlers;
pub mod logging;
pub mod model;
pub mod recurrence;
pub mod store;
pub mod temporal;

pub use action::{
    Action, ActionContext, ActionError, ActionRequest, ActionResult, Clock, Coordinator, Domain,
    ErrorKind, FixedClock, ItemView, SystemClock,
};
pub use config::ActionConfig;
pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use logging::{default_log_level, init_logging, init_stderr_logging, logging_status};
pub use store::{EntityStore, SqliteStore, StoreError, StoreResult};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
