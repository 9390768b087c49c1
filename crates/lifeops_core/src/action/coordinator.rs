//! Entry point: routes `(domain, action)` pairs to handler operations.
//!
//! # Responsibility
//! - Parse domain/action names (case-insensitive, with aliases).
//! - Look the pair up in a routing table built once at construction.
//! - Always answer with an `ActionResult`; unknown pairs are validation
//!   failures listing what is supported.

use super::context::ActionContext;
use super::error::ActionError;
use super::params::Params;
use super::result::ActionResult;
use crate::handlers::{
    CategoryHandler, EventHandler, GoalHandler, HabitHandler, TaskHandler,
};
use crate::store::EntityStore;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Domain {
    Events,
    Tasks,
    Habits,
    Goals,
    Categories,
}

impl Domain {
    pub const ALL: [Domain; 5] = [
        Self::Events,
        Self::Tasks,
        Self::Habits,
        Self::Goals,
        Self::Categories,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Events => "events",
            Self::Tasks => "tasks",
            Self::Habits => "habits",
            Self::Goals => "goals",
            Self::Categories => "categories",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "events" | "event" | "calendar" => Some(Self::Events),
            "tasks" | "task" | "todos" | "todo" => Some(Self::Tasks),
            "habits" | "habit" => Some(Self::Habits),
            "goals" | "goal" => Some(Self::Goals),
            "categories" | "category" => Some(Self::Categories),
            _ => None,
        }
    }
}

impl Display for Domain {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Action {
    Create,
    Update,
    Delete,
    List,
    Log,
    Progress,
}

impl Action {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::List => "list",
            Self::Log => "log",
            Self::Progress => "progress",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        let normalized = value.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        match normalized.as_str() {
            "create" | "add" | "new" => Some(Self::Create),
            "update" | "edit" | "modify" => Some(Self::Update),
            "delete" | "remove" => Some(Self::Delete),
            "list" | "get" | "fetch" | "query" => Some(Self::List),
            "log" | "log_entry" | "record" => Some(Self::Log),
            "progress" | "update_progress" | "updateprogress" => Some(Self::Progress),
            _ => None,
        }
    }
}

impl Display for Action {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `(domain, action, parameters)` triple as submitted by a front end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionRequest {
    pub domain: String,
    pub action: String,
    #[serde(default, alias = "params")]
    pub parameters: Value,
}

type Route<S> = fn(&ActionContext<S>, &Params) -> ActionResult;

pub struct Coordinator<S: EntityStore> {
    ctx: ActionContext<S>,
    routes: BTreeMap<(Domain, Action), Route<S>>,
}

impl<S: EntityStore> Coordinator<S> {
    pub fn new(ctx: ActionContext<S>) -> Self {
        let mut routes: BTreeMap<(Domain, Action), Route<S>> = BTreeMap::new();

        routes.insert((Domain::Events, Action::Create), |ctx, p| EventHandler::new(ctx).create(p));
        routes.insert((Domain::Events, Action::Update), |ctx, p| EventHandler::new(ctx).update(p));
        routes.insert((Domain::Events, Action::Delete), |ctx, p| EventHandler::new(ctx).delete(p));
        routes.insert((Domain::Events, Action::List), |ctx, p| EventHandler::new(ctx).list(p));

        routes.insert((Domain::Tasks, Action::Create), |ctx, p| TaskHandler::new(ctx).create(p));
        routes.insert((Domain::Tasks, Action::Update), |ctx, p| TaskHandler::new(ctx).update(p));
        routes.insert((Domain::Tasks, Action::Delete), |ctx, p| TaskHandler::new(ctx).delete(p));
        routes.insert((Domain::Tasks, Action::List), |ctx, p| TaskHandler::new(ctx).list(p));

        routes.insert((Domain::Habits, Action::Create), |ctx, p| HabitHandler::new(ctx).create(p));
        routes.insert((Domain::Habits, Action::Update), |ctx, p| HabitHandler::new(ctx).update(p));
        routes.insert((Domain::Habits, Action::Delete), |ctx, p| HabitHandler::new(ctx).delete(p));
        routes.insert((Domain::Habits, Action::List), |ctx, p| HabitHandler::new(ctx).list(p));
        routes.insert((Domain::Habits, Action::Log), |ctx, p| HabitHandler::new(ctx).log(p));

        routes.insert((Domain::Goals, Action::Create), |ctx, p| GoalHandler::new(ctx).create(p));
        routes.insert((Domain::Goals, Action::Update), |ctx, p| GoalHandler::new(ctx).update(p));
        routes.insert((Domain::Goals, Action::Delete), |ctx, p| GoalHandler::new(ctx).delete(p));
        routes.insert((Domain::Goals, Action::List), |ctx, p| GoalHandler::new(ctx).list(p));
        routes.insert((Domain::Goals, Action::Progress), |ctx, p| {
            GoalHandler::new(ctx).progress(p)
        });

        routes.insert((Domain::Categories, Action::Create), |ctx, p| {
            CategoryHandler::new(ctx).create(p)
        });
        routes.insert((Domain::Categories, Action::Update), |ctx, p| {
            CategoryHandler::new(ctx).update(p)
        });
        routes.insert((Domain::Categories, Action::Delete), |ctx, p| {
            CategoryHandler::new(ctx).delete(p)
        });
        routes.insert((Domain::Categories, Action::List), |ctx, p| {
            CategoryHandler::new(ctx).list(p)
        });

        Self { ctx, routes }
    }

    pub fn context(&self) -> &ActionContext<S> {
        &self.ctx
    }

    /// Actions routed for `domain`, in declaration order.
    pub fn supported_actions(&self, domain: Domain) -> Vec<Action> {
        self.routes
            .keys()
            .filter(|(routed, _)| *routed == domain)
            .map(|(_, action)| *action)
            .collect()
    }

    pub fn handle(&self, request: ActionRequest) -> ActionResult {
        self.dispatch(&request.domain, &request.action, request.parameters)
    }

    pub fn dispatch(&self, domain: &str, action: &str, parameters: Value) -> ActionResult {
        let started_at = Instant::now();
        let result = match self.route(domain, action) {
            Ok((domain, action, route)) => match Params::from_value(parameters) {
                Ok(params) => {
                    let result = route(&self.ctx, &params);
                    log_dispatch(domain.as_str(), action.as_str(), &result, started_at);
                    return result;
                }
                Err(err) => ActionResult::failure(&err),
            },
            Err(err) => ActionResult::failure(&err),
        };
        log_dispatch("-", "-", &result, started_at);
        result
    }

    fn route(&self, domain: &str, action: &str) -> Result<(Domain, Action, Route<S>), ActionError> {
        let parsed_domain = Domain::parse(domain).ok_or_else(|| {
            let supported: Vec<&str> = Domain::ALL.iter().map(|domain| domain.as_str()).collect();
            ActionError::validation(format!(
                "unknown domain `{}`; supported domains: {}",
                domain.trim(),
                supported.join(", ")
            ))
        })?;

        let unsupported = || {
            let supported: Vec<&str> = self
                .supported_actions(parsed_domain)
                .into_iter()
                .map(Action::as_str)
                .collect();
            ActionError::validation(format!(
                "unsupported action `{}` for {parsed_domain}; supported actions: {}",
                action.trim(),
                supported.join(", ")
            ))
        };

        let parsed_action = Action::parse(action).ok_or_else(unsupported)?;
        let route = self
            .routes
            .get(&(parsed_domain, parsed_action))
            .copied()
            .ok_or_else(unsupported)?;
        Ok((parsed_domain, parsed_action, route))
    }
}

fn log_dispatch(domain: &str, action: &str, result: &ActionResult, started_at: Instant) {
    let duration_ms = started_at.elapsed().as_millis();
    if result.success {
        info!(
            "event=action_dispatch module=coordinator status=ok domain={domain} action={action} updated={} duration_ms={duration_ms}",
            result.updated_count.unwrap_or(0)
        );
    } else {
        let kind = result
            .error_kind
            .map(|kind| format!("{kind:?}"))
            .unwrap_or_else(|| "none".to_string());
        warn!(
            "event=action_dispatch module=coordinator status=error domain={domain} action={action} error_kind={kind} duration_ms={duration_ms}"
        );
    }
}
