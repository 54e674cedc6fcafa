//! Interception façade.
//!
//! The boundary the tool-calling transport uses: submits an intercepted
//! invocation for governance and maps the engine's provisional status into
//! the caller-visible result. Never blocks waiting on a terminal state.

use std::sync::Arc;

use tracing::{info, info_span, Instrument};

use crate::engine::{GovernanceEngine, ProvisionalStatus};
use crate::{AppError, Result};

/// Caller-visible result of intercepting one tool invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InterceptOutcome {
    /// Low risk; the caller may execute the tool immediately.
    Authorized {
        /// Correlation key for the audit trail.
        action_id: String,
        /// The assessed risk score.
        score: u8,
    },
    /// Escalated for human review. The caller must surface `action_id` to
    /// the reviewer-facing side of the system and retry out of band once a
    /// decision lands.
    PendingReview {
        /// Reference the reviewer resolves against.
        action_id: String,
        /// The assessed (or fail-closed) risk score.
        score: u8,
    },
}

/// Thin adapter between the transport layer and the governance engine.
pub struct InterceptionFacade {
    engine: Arc<GovernanceEngine>,
}

impl InterceptionFacade {
    /// Create a façade bound to the engine.
    #[must_use]
    pub fn new(engine: Arc<GovernanceEngine>) -> Self {
        Self { engine }
    }

    /// Submit one tool invocation for governance.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` if `tool_name` is empty, or the
    /// engine's intake error if the workflow could not be persisted; in
    /// either case the action is reported failed at intake, never silently
    /// dropped.
    pub async fn intercept(
        &self,
        tool_name: &str,
        arguments: serde_json::Map<String, serde_json::Value>,
    ) -> Result<InterceptOutcome> {
        if tool_name.trim().is_empty() {
            return Err(AppError::Validation("tool_name must not be empty".into()));
        }

        let span = info_span!("intercept", tool_name = %tool_name);

        async move {
            let submission = self.engine.submit(tool_name.to_owned(), arguments).await?;

            let outcome = match submission.status {
                ProvisionalStatus::Authorized => InterceptOutcome::Authorized {
                    action_id: submission.action_id,
                    score: submission.score,
                },
                ProvisionalStatus::PendingReview => InterceptOutcome::PendingReview {
                    action_id: submission.action_id,
                    score: submission.score,
                },
            };

            info!(outcome = outcome_kind(&outcome), "interception complete");
            Ok(outcome)
        }
        .instrument(span)
        .await
    }
}

fn outcome_kind(outcome: &InterceptOutcome) -> &'static str {
    match outcome {
        InterceptOutcome::Authorized { .. } => "authorized",
        InterceptOutcome::PendingReview { .. } => "pending",
    }
}
