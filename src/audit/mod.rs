//! Append-only audit trail of governance state transitions.
//!
//! Provides the [`AuditLog`] trait and associated types. The primary
//! implementation, [`JsonlAuditLog`], appends JSONL records to
//! daily-rotating files that remain readable and replayable without the
//! engine process.

pub mod writer;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::workflow::WorkflowState;

/// A structured record of a single workflow state transition.
///
/// Entries are immutable once appended. The sequence of entries for one
/// `action_id`, read in append order, replays that action's full
/// authorization lifecycle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuditEntry {
    /// ISO 8601 timestamp with timezone.
    pub timestamp: DateTime<Utc>,
    /// Correlation key of the governed action.
    pub action_id: String,
    /// State before the transition; absent for the creation record.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prior_state: Option<WorkflowState>,
    /// State after the transition.
    pub new_state: WorkflowState,
    /// Human-readable rationale for the transition.
    pub rationale: String,
    /// Risk score, recorded on branch transitions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<u8>,
    /// Reviewer identity, recorded on decision transitions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decided_by: Option<String>,
}

impl AuditEntry {
    /// Construct an entry for a state transition.
    #[must_use]
    pub fn new(
        action_id: String,
        prior_state: Option<WorkflowState>,
        new_state: WorkflowState,
        rationale: String,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            action_id,
            prior_state,
            new_state,
            rationale,
            score: None,
            decided_by: None,
        }
    }

    /// Attach the risk score to this entry.
    #[must_use]
    pub fn with_score(mut self, score: u8) -> Self {
        self.score = Some(score);
        self
    }

    /// Attach the reviewer identity to this entry.
    #[must_use]
    pub fn with_decided_by(mut self, decided_by: String) -> Self {
        self.decided_by = Some(decided_by);
        self
    }
}

/// Appends and reads structured audit entries in a persistent store.
///
/// `append` must never fail silently: a state transition is not reported
/// committed until its audit append succeeded. Implementations must be
/// [`Send`] and [`Sync`] to allow sharing across async task boundaries via
/// [`std::sync::Arc`].
pub trait AuditLog: Send + Sync {
    /// Record a single audit entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying write operation fails.
    fn append(&self, entry: AuditEntry) -> crate::Result<()>;

    /// Return the ordered transition sequence for one action.
    ///
    /// Entries are ordered by append position, which is stable even for
    /// simultaneous timestamps.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying store cannot be read.
    fn query(&self, action_id: &str) -> crate::Result<Vec<AuditEntry>>;
}

pub use writer::JsonlAuditLog;
