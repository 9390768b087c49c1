//! Result envelope returned by every action.

use super::error::{ActionError, ErrorKind};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Flattened, string-keyed projection of one record.
pub type ItemView = Map<String, Value>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionResult {
    pub success: bool,
    pub message: String,
    /// Identifier of the single record created/updated/deleted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Records returned by `list`, or created by a bulk `create`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<ItemView>>,
    /// How many records a bulk/filtered operation targeted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matched_count: Option<usize>,
    /// How many operations actually succeeded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
}

impl ActionResult {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            id: None,
            items: None,
            matched_count: None,
            updated_count: None,
            error_kind: None,
        }
    }

    pub fn failure(error: &ActionError) -> Self {
        let mut result = Self {
            success: false,
            message: error.to_string(),
            id: None,
            items: None,
            matched_count: None,
            updated_count: None,
            error_kind: Some(error.kind()),
        };
        if let ActionError::Guard { matched, .. } = error {
            result.matched_count = Some(*matched);
            result.updated_count = Some(0);
        }
        result
    }

    pub fn with_id(mut self, id: impl ToString) -> Self {
        self.id = Some(id.to_string());
        self
    }

    pub fn with_items(mut self, items: Vec<ItemView>) -> Self {
        self.items = Some(items);
        self
    }

    pub fn with_counts(mut self, matched: usize, updated: usize) -> Self {
        self.matched_count = Some(matched);
        self.updated_count = Some(updated);
        self
    }

    pub fn with_updated(mut self, updated: usize) -> Self {
        self.updated_count = Some(updated);
        self
    }
}

impl From<ActionError> for ActionResult {
    fn from(value: ActionError) -> Self {
        Self::failure(&value)
    }
}

#[cfg(test)]
mod tests {
    use super::ActionResult;
    use crate::action::error::ActionError;
    use serde_json::json;

    #[test]
    fn serializes_camel_case_and_omits_absent_fields() {
        let result = ActionResult::success("Deleted 2 tasks.").with_counts(3, 2);
        let value = serde_json::to_value(&result).expect("serialize result");
        assert_eq!(
            value,
            json!({
                "success": true,
                "message": "Deleted 2 tasks.",
                "matchedCount": 3,
                "updatedCount": 2
            })
        );
    }

    #[test]
    fn guard_failure_reports_matched_count() {
        let result = ActionResult::from(ActionError::Guard {
            matched: 50,
            message: "confirm required".to_string(),
        });
        assert!(!result.success);
        assert_eq!(result.matched_count, Some(50));
        assert_eq!(result.updated_count, Some(0));
        assert_eq!(
            serde_json::to_value(&result).expect("serialize")["errorKind"],
            "guard"
        );
    }
}
