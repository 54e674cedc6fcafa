//! Action request model — one intercepted tool invocation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An identified attempt to invoke a governed tool.
///
/// The `action_id` is assigned exactly once, at interception time, and is
/// the sole join key across the workflow instance, risk assessment, and
/// audit trail for this action.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct ActionRequest {
    /// Unique correlation key for the entire authorization lifecycle.
    pub action_id: String,
    /// Name of the governed capability being requested.
    pub tool_name: String,
    /// Opaque tool parameters, passed through unmodified to the risk
    /// evaluator and the audit log.
    pub arguments: serde_json::Map<String, serde_json::Value>,
    /// Interception timestamp.
    pub requested_at: DateTime<Utc>,
}

impl ActionRequest {
    /// Construct a new action request with a freshly assigned `action_id`.
    #[must_use]
    pub fn new(
        tool_name: String,
        arguments: serde_json::Map<String, serde_json::Value>,
    ) -> Self {
        Self {
            action_id: Uuid::new_v4().to_string(),
            tool_name,
            arguments,
            requested_at: Utc::now(),
        }
    }
}
