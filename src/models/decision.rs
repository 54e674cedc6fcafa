//! Decision signal model — an external human approval or denial.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Reviewer verdict carried by a decision signal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Decision {
    /// The reviewer authorized the action.
    Approved,
    /// The reviewer denied the action.
    Denied,
}

/// An external human decision correlated to a waiting workflow instance.
///
/// At most one signal is ever accepted per `event_id`; later signals for an
/// already-resolved workflow are rejected, not reprocessed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct DecisionSignal {
    /// Correlation reference surfaced to the reviewer; equals the
    /// `action_id` of the waiting workflow.
    pub event_id: String,
    /// The verdict.
    pub decision: Decision,
    /// Opaque reviewer identity.
    pub decided_by: String,
    /// Timestamp the signal was received.
    pub decided_at: DateTime<Utc>,
}

impl DecisionSignal {
    /// Construct a signal stamped with the current time.
    #[must_use]
    pub fn new(event_id: String, decision: Decision, decided_by: String) -> Self {
        Self {
            event_id,
            decision,
            decided_by,
            decided_at: Utc::now(),
        }
    }
}
