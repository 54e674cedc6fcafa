//! Decision signal router.
//!
//! Receives external reviewer decisions, validates and correlates them to a
//! waiting workflow instance, and delivers each decision to the governance
//! engine exactly once. Rejections are answers, not failures: repeated
//! delivery for an already-resolved instance is a no-op that never corrupts
//! engine state.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, info_span, Instrument};

use crate::engine::GovernanceEngine;
use crate::models::decision::{Decision, DecisionSignal};
use crate::{AppError, GlobalConfig, Result};

/// Outcome of routing one decision signal.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ResolveOutcome {
    /// Whether the decision was delivered to a waiting workflow.
    pub accepted: bool,
    /// Rejection reason when `accepted` is false.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl ResolveOutcome {
    fn accepted() -> Self {
        Self {
            accepted: true,
            reason: None,
        }
    }

    fn rejected(reason: &str) -> Self {
        Self {
            accepted: false,
            reason: Some(reason.to_owned()),
        }
    }
}

/// Routes reviewer decisions to the governance engine.
pub struct DecisionRouter {
    engine: Arc<GovernanceEngine>,
    authorized_reviewer_ids: Vec<String>,
}

impl DecisionRouter {
    /// Create a router bound to the engine, with the configured reviewer
    /// allow-list.
    #[must_use]
    pub fn new(engine: Arc<GovernanceEngine>, config: &GlobalConfig) -> Self {
        Self {
            engine,
            authorized_reviewer_ids: config.authorized_reviewer_ids.clone(),
        }
    }

    /// Validate and deliver one reviewer decision.
    ///
    /// Accepts only instances currently awaiting a decision. Anything else
    /// — an unknown reference, an already-resolved or expired instance, a
    /// not-yet-branched workflow, or an unauthorized reviewer — yields
    /// `accepted: false` with a reason.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db`/`AppError::Audit` only on persistence
    /// failure; validation rejections are reported in the outcome.
    pub async fn resolve(
        &self,
        event_id: &str,
        decision: Decision,
        decided_by: &str,
    ) -> Result<ResolveOutcome> {
        let span = info_span!(
            "resolve_decision",
            event_id = %event_id,
            decision = ?decision,
            decided_by = %decided_by,
        );

        async move {
            if event_id.trim().is_empty() {
                return Ok(ResolveOutcome::rejected("unknown reference"));
            }

            if !self.authorized_reviewer_ids.is_empty()
                && !self.authorized_reviewer_ids.iter().any(|id| id == decided_by)
            {
                info!("rejected decision from unauthorized reviewer");
                return Ok(ResolveOutcome::rejected("reviewer not authorized"));
            }

            let signal =
                DecisionSignal::new(event_id.to_owned(), decision, decided_by.to_owned());

            match self.engine.apply_decision(&signal).await {
                Ok(_) => {
                    info!("decision delivered");
                    Ok(ResolveOutcome::accepted())
                }
                Err(AppError::UnknownReference(_)) => {
                    Ok(ResolveOutcome::rejected("unknown reference"))
                }
                Err(AppError::AlreadyResolved(_)) => {
                    Ok(ResolveOutcome::rejected("already resolved"))
                }
                Err(AppError::Expired(_)) => Ok(ResolveOutcome::rejected("expired")),
                Err(AppError::NotAwaitingDecision(_)) => {
                    Ok(ResolveOutcome::rejected("not awaiting decision"))
                }
                Err(err) => Err(err),
            }
        }
        .instrument(span)
        .await
    }
}
