//! Category record.
//!
//! Categories are referenced (never owned) by events, tasks, habits and goals.

use super::{new_entity_id, EntityId};
use once_cell::sync::Lazy;
use regex::Regex;

static HEX_COLOR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^#(?:[0-9A-Fa-f]{3}|[0-9A-Fa-f]{6}|[0-9A-Fa-f]{8})$").expect("valid color regex")
});

const NAMED_COLORS: &[(&str, &str)] = &[
    ("red", "#FF3B30"),
    ("orange", "#FF9500"),
    ("yellow", "#FFCC00"),
    ("green", "#34C759"),
    ("teal", "#30B0C7"),
    ("blue", "#4A90D9"),
    ("indigo", "#5856D6"),
    ("purple", "#AF52DE"),
    ("pink", "#FF2D55"),
    ("brown", "#A2845E"),
    ("gray", "#8E8E93"),
    ("grey", "#8E8E93"),
];

pub const DEFAULT_CATEGORY_COLOR: &str = "#4A90D9";
pub const DEFAULT_CATEGORY_ICON: &str = "folder";

#[derive(Debug, Clone, PartialEq)]
pub struct Category {
    pub id: EntityId,
    pub name: String,
    /// Hex color string, e.g. `#FF9500`.
    pub color: String,
    /// Symbolic icon name chosen by the front end.
    pub icon: String,
    /// Ascending display order.
    pub sort_index: i64,
    pub created_at: i64,
}

impl Category {
    pub fn new(name: impl Into<String>, sort_index: i64, now_ms: i64) -> Self {
        Self {
            id: new_entity_id(),
            name: name.into(),
            color: DEFAULT_CATEGORY_COLOR.to_string(),
            icon: DEFAULT_CATEGORY_ICON.to_string(),
            sort_index,
            created_at: now_ms,
        }
    }
}

/// Normalizes `#RGB`, `#RRGGBB`, `#RRGGBBAA` (with or without `#`) or a
/// basic color name into an uppercase hex string.
pub fn normalize_color(value: &str) -> Option<String> {
    let trimmed = value.trim();
    let lowered = trimmed.to_ascii_lowercase();
    if let Some((_, hex)) = NAMED_COLORS.iter().find(|(name, _)| *name == lowered) {
        return Some((*hex).to_string());
    }
    let candidate = if trimmed.starts_with('#') {
        trimmed.to_string()
    } else {
        format!("#{trimmed}")
    };
    HEX_COLOR_RE
        .is_match(&candidate)
        .then(|| candidate.to_ascii_uppercase())
}
