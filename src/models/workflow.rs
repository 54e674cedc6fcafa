//! Workflow instance model — the durable state of one governance decision.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of a workflow instance.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowState {
    /// Created at interception; risk call not yet dispatched.
    Created,
    /// Risk evaluation in flight.
    Assessing,
    /// Terminal: classified low risk and approved without human input.
    AutoApproved,
    /// Parked until a correlated decision signal arrives or the deadline
    /// elapses. Survives process restarts.
    AwaitingDecision,
    /// Terminal: a reviewer approved the action.
    Approved,
    /// Terminal: a reviewer denied the action.
    Denied,
    /// Terminal: no decision arrived before the deadline.
    Expired,
}

impl WorkflowState {
    /// Whether this state is terminal. Terminal instances are immutable and
    /// never reused under the same `action_id`.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::AutoApproved | Self::Approved | Self::Denied | Self::Expired
        )
    }
}

/// Durable state of one governance decision process, one per action request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct WorkflowInstance {
    /// Correlation key, 1:1 with the action request.
    pub action_id: String,
    /// Current lifecycle state.
    pub state: WorkflowState,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Timestamp of the most recent state transition.
    pub last_transition_at: DateTime<Utc>,
    /// Decision deadline, set when entering `AwaitingDecision`.
    pub deadline_at: Option<DateTime<Utc>>,
    /// Reviewer identity recorded when a decision resolves the instance.
    pub decided_by: Option<String>,
}

impl WorkflowInstance {
    /// Construct a new instance in the `Created` state.
    #[must_use]
    pub fn new(action_id: String) -> Self {
        let now = Utc::now();
        Self {
            action_id,
            state: WorkflowState::Created,
            created_at: now,
            last_transition_at: now,
            deadline_at: None,
            decided_by: None,
        }
    }
}
