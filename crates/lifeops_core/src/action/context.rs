//! Service bundle shared by the coordinator and every handler.
//!
//! One context owns the store session and the external collaborators; it is
//! built once and passed by reference, so handlers never reach for globals.

use crate::config::ActionConfig;
use crate::recurrence::{RecurrenceEngine, RuleRecurrence};
use crate::store::EntityStore;
use crate::temporal::{NaturalDateParser, TemporalParser};
use chrono::{DateTime, NaiveDate, Utc};

/// Source of "now" for completion stamps, overdue checks and streaks.
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock pinned to one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

pub struct ActionContext<S: EntityStore> {
    store: S,
    temporal: Box<dyn TemporalParser>,
    recurrence: Box<dyn RecurrenceEngine>,
    clock: Box<dyn Clock>,
    config: ActionConfig,
}

impl<S: EntityStore> ActionContext<S> {
    /// Context with default collaborators and configuration.
    pub fn new(store: S) -> Self {
        Self {
            store,
            temporal: Box::new(NaturalDateParser),
            recurrence: Box::new(RuleRecurrence),
            clock: Box::new(SystemClock),
            config: ActionConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ActionConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn with_temporal_parser(mut self, parser: impl TemporalParser + 'static) -> Self {
        self.temporal = Box::new(parser);
        self
    }

    pub fn with_recurrence_engine(mut self, engine: impl RecurrenceEngine + 'static) -> Self {
        self.recurrence = Box::new(engine);
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn temporal(&self) -> &dyn TemporalParser {
        self.temporal.as_ref()
    }

    pub fn recurrence(&self) -> &dyn RecurrenceEngine {
        self.recurrence.as_ref()
    }

    pub fn config(&self) -> &ActionConfig {
        &self.config
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn now_ms(&self) -> i64 {
        self.now().timestamp_millis()
    }

    pub fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}
