//! Runtime configuration for the action core.
//!
//! Values come from defaults, optionally overridden by environment
//! variables. Invalid overrides fall back to the default and are logged.

use log::warn;

/// Environment variable overriding `ActionConfig::bulk_guard_threshold`.
pub const ENV_BULK_GUARD_THRESHOLD: &str = "LIFEOPS_BULK_GUARD_THRESHOLD";
/// Environment variable overriding `ActionConfig::default_list_limit`.
pub const ENV_LIST_LIMIT: &str = "LIFEOPS_LIST_LIMIT";

pub const DEFAULT_BULK_GUARD_THRESHOLD: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionConfig {
    /// All-matching operations targeting more items than this require `confirm`.
    pub bulk_guard_threshold: usize,
    /// Cap applied to `list` when the request carries no `limit`.
    pub default_list_limit: Option<u32>,
}

impl Default for ActionConfig {
    fn default() -> Self {
        Self {
            bulk_guard_threshold: DEFAULT_BULK_GUARD_THRESHOLD,
            default_list_limit: None,
        }
    }
}

impl ActionConfig {
    /// Builds a config from defaults plus environment overrides.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(raw) = lookup(ENV_BULK_GUARD_THRESHOLD) {
            match raw.trim().parse::<usize>() {
                Ok(value) => config.bulk_guard_threshold = value,
                Err(_) => warn!(
                    "event=config_load module=config status=fallback key={ENV_BULK_GUARD_THRESHOLD}"
                ),
            }
        }

        if let Some(raw) = lookup(ENV_LIST_LIMIT) {
            match raw.trim().parse::<u32>() {
                Ok(0) => config.default_list_limit = None,
                Ok(value) => config.default_list_limit = Some(value),
                Err(_) => {
                    warn!("event=config_load module=config status=fallback key={ENV_LIST_LIMIT}")
                }
            }
        }

        config
    }
}
