//! Action execution core: decoding, resolution, bulk execution and dispatch.
//!
//! # Responsibility
//! - Turn loosely-typed `(domain, action, parameters)` requests into typed
//!   handler calls.
//! - Fold every outcome, including failures, into an `ActionResult`.

pub mod bulk;
pub mod context;
pub mod coordinator;
pub mod error;
pub mod fields;
pub mod filter;
pub mod params;
pub mod resolver;
pub mod result;

pub use context::{ActionContext, Clock, FixedClock, SystemClock};
pub use coordinator::{Action, ActionRequest, Coordinator, Domain};
pub use error::{ActionError, ActionOutcome, ErrorKind};
pub use params::{Field, Params};
pub use result::{ActionResult, ItemView};
