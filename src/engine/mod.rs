//! Governance workflow engine — the durable state machine.
//!
//! One workflow instance tracks one intercepted action from interception to
//! exactly one terminal state. The `SQLite` store is authoritative: waiting
//! for a decision parks the instance in the store rather than holding a
//! task, and every state is reconstructible after a restart. Guarded
//! transitions (conditional update on the prior state, committed only after
//! the audit append) serialize contenders within one `action_id`.

pub mod sweeper;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, info_span, warn, Instrument};

use crate::audit::{AuditEntry, AuditLog};
use crate::evaluator::RiskEvaluator;
use crate::models::action::ActionRequest;
use crate::models::assessment::{RiskAssessment, RiskClassification};
use crate::models::decision::{Decision, DecisionSignal};
use crate::models::workflow::{WorkflowInstance, WorkflowState};
use crate::persistence::action_repo::ActionRepo;
use crate::persistence::assessment_repo::AssessmentRepo;
use crate::persistence::db::Database;
use crate::persistence::workflow_repo::WorkflowRepo;
use crate::{AppError, GlobalConfig, Result};

/// Provisional answer produced by `submit`, before any human involvement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisionalStatus {
    /// Classified low risk; the caller may proceed immediately.
    Authorized,
    /// Parked for human review; the caller must surface the `action_id`
    /// to the reviewer-facing side of the system.
    PendingReview,
}

/// Result of submitting one intercepted action for governance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    /// Correlation key for the action's entire lifecycle.
    pub action_id: String,
    /// Immediate branch outcome.
    pub status: ProvisionalStatus,
    /// The assessed (or fail-closed) risk score.
    pub score: u8,
}

/// The durable governance state machine.
pub struct GovernanceEngine {
    db: Arc<Database>,
    audit: Arc<dyn AuditLog>,
    evaluator: Arc<dyn RiskEvaluator>,
    risk_threshold: u8,
    decision_timeout: chrono::Duration,
}

impl GovernanceEngine {
    /// Create an engine bound to the given store, audit log, and evaluator.
    #[must_use]
    pub fn new(
        db: Arc<Database>,
        audit: Arc<dyn AuditLog>,
        evaluator: Arc<dyn RiskEvaluator>,
        config: &GlobalConfig,
    ) -> Self {
        Self {
            db,
            audit,
            evaluator,
            risk_threshold: config.risk_threshold,
            decision_timeout: config.decision_timeout(),
        }
    }

    /// Submit one intercepted action for governance.
    ///
    /// Returns as soon as the workflow has branched: auto-approval for a
    /// low-risk score, a pending reference otherwise. Never waits for a
    /// human decision. An evaluator failure escalates fail-closed — an
    /// unassessable action is never auto-approved.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` or `AppError::Audit` if persisting the
    /// workflow or its audit trail fails; the action is then reported
    /// failed at intake rather than silently dropped.
    pub async fn submit(
        &self,
        tool_name: String,
        arguments: serde_json::Map<String, serde_json::Value>,
    ) -> Result<Submission> {
        let action = ActionRequest::new(tool_name, arguments);
        let action_id = action.action_id.clone();
        let span = info_span!(
            "governance_submit",
            action_id = %action_id,
            tool_name = %action.tool_name,
        );

        async move {
            self.create_instance(&action).await?;

            let dispatched = self
                .transition_audited(
                    &action_id,
                    WorkflowState::Created,
                    WorkflowState::Assessing,
                    None,
                    None,
                    AuditEntry::new(
                        action_id.clone(),
                        Some(WorkflowState::Created),
                        WorkflowState::Assessing,
                        "risk evaluation dispatched".into(),
                    ),
                )
                .await?;
            if !dispatched {
                return Err(AppError::Db(format!(
                    "workflow {action_id} left created state unexpectedly"
                )));
            }

            let (assessment, evaluator_failure) = match self.evaluator.assess(&action).await {
                Ok(assessment) => (assessment, None),
                Err(err) => {
                    warn!(%err, "risk evaluation failed; escalating fail-closed");
                    let reason = err.to_string();
                    (
                        RiskAssessment::fail_closed(self.risk_threshold, &reason),
                        Some(reason),
                    )
                }
            };

            self.branch(&action_id, &assessment, evaluator_failure)
                .await
        }
        .instrument(span)
        .await
    }

    /// Deliver a correlated decision signal to a waiting instance.
    ///
    /// Exactly one decision is ever applied per `action_id`: the guarded
    /// transition claims the instance atomically, so a racing expiry sweep
    /// and a decision resolve to a single terminal state.
    ///
    /// # Errors
    ///
    /// Returns `AppError::UnknownReference` if no instance exists,
    /// `AppError::AlreadyResolved` if the instance already reached a
    /// decision, `AppError::Expired` if the deadline passed first,
    /// `AppError::NotAwaitingDecision` if the workflow has not branched
    /// yet, or `AppError::Db`/`AppError::Audit` on persistence failure.
    pub async fn apply_decision(&self, signal: &DecisionSignal) -> Result<WorkflowInstance> {
        let action_id = signal.event_id.clone();
        let span = info_span!(
            "apply_decision",
            action_id = %action_id,
            decision = ?signal.decision,
            decided_by = %signal.decided_by,
        );

        async move {
            let repo = WorkflowRepo::new(Arc::clone(&self.db));
            let instance = repo
                .get_by_id(&action_id)
                .await?
                .ok_or_else(|| {
                    AppError::UnknownReference(format!("no workflow for reference {action_id}"))
                })?;

            match instance.state {
                WorkflowState::AwaitingDecision => {}
                WorkflowState::Expired => {
                    return Err(AppError::Expired(format!(
                        "workflow {action_id} expired before the decision arrived"
                    )));
                }
                WorkflowState::AutoApproved
                | WorkflowState::Approved
                | WorkflowState::Denied => {
                    return Err(AppError::AlreadyResolved(format!(
                        "workflow {action_id} is already resolved"
                    )));
                }
                WorkflowState::Created | WorkflowState::Assessing => {
                    return Err(AppError::NotAwaitingDecision(format!(
                        "workflow {action_id} has not branched yet"
                    )));
                }
            }

            let target = match signal.decision {
                Decision::Approved => WorkflowState::Approved,
                Decision::Denied => WorkflowState::Denied,
            };
            let verdict = match signal.decision {
                Decision::Approved => "approved",
                Decision::Denied => "denied",
            };

            let entry = AuditEntry::new(
                action_id.clone(),
                Some(WorkflowState::AwaitingDecision),
                target,
                format!("{verdict} by reviewer {}", signal.decided_by),
            )
            .with_decided_by(signal.decided_by.clone());

            let claimed = self
                .transition_audited(
                    &action_id,
                    WorkflowState::AwaitingDecision,
                    target,
                    None,
                    Some(&signal.decided_by),
                    entry,
                )
                .await?;

            if !claimed {
                // Lost the race; report what actually happened.
                let current = repo.get_by_id(&action_id).await?.ok_or_else(|| {
                    AppError::UnknownReference(format!("no workflow for reference {action_id}"))
                })?;
                return Err(match current.state {
                    WorkflowState::Expired => AppError::Expired(format!(
                        "workflow {action_id} expired before the decision arrived"
                    )),
                    _ => AppError::AlreadyResolved(format!(
                        "workflow {action_id} is already resolved"
                    )),
                });
            }

            info!(state = ?target, "decision applied");

            repo.get_by_id(&action_id).await?.ok_or_else(|| {
                AppError::Db(format!("workflow {action_id} vanished after transition"))
            })
        }
        .instrument(span)
        .await
    }

    /// Expire every awaiting instance whose deadline has passed.
    ///
    /// Runs from the periodic sweep. Instances claimed by a concurrent
    /// decision between the scan and the transition are skipped.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db`/`AppError::Audit` on persistence failure.
    pub async fn expire_overdue(&self) -> Result<u64> {
        let repo = WorkflowRepo::new(Arc::clone(&self.db));
        let overdue = repo.list_overdue(Utc::now()).await?;

        let mut expired = 0u64;
        for instance in overdue {
            let deadline = instance
                .deadline_at
                .map_or_else(|| "unknown".to_owned(), |dt| dt.to_rfc3339());
            let entry = AuditEntry::new(
                instance.action_id.clone(),
                Some(WorkflowState::AwaitingDecision),
                WorkflowState::Expired,
                format!("no decision received before deadline {deadline}"),
            );

            if self
                .transition_audited(
                    &instance.action_id,
                    WorkflowState::AwaitingDecision,
                    WorkflowState::Expired,
                    None,
                    None,
                    entry,
                )
                .await?
            {
                info!(action_id = %instance.action_id, "authorization expired");
                expired += 1;
            }
        }

        Ok(expired)
    }

    /// Retrieve the workflow instance for an action, if any.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails.
    pub async fn instance(&self, action_id: &str) -> Result<Option<WorkflowInstance>> {
        WorkflowRepo::new(Arc::clone(&self.db))
            .get_by_id(action_id)
            .await
    }

    /// Retrieve the recorded risk assessment for an action, if any.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails.
    pub async fn assessment(&self, action_id: &str) -> Result<Option<RiskAssessment>> {
        AssessmentRepo::new(Arc::clone(&self.db))
            .get_by_action_id(action_id)
            .await
    }

    /// Count of instances currently parked awaiting a decision.
    ///
    /// The pending-correlation registry is exactly this set of rows; at
    /// startup it is rebuilt by query, so a restart loses nothing.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails.
    pub async fn pending_count(&self) -> Result<u64> {
        WorkflowRepo::new(Arc::clone(&self.db)).count_awaiting().await
    }

    /// The ordered audit trail for one action.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Audit` if the log cannot be read.
    pub fn audit_trail(&self, action_id: &str) -> Result<Vec<AuditEntry>> {
        self.audit.query(action_id)
    }

    /// Persist the action request and its workflow instance atomically,
    /// with the creation audit record.
    async fn create_instance(&self, action: &ActionRequest) -> Result<()> {
        let instance = WorkflowInstance::new(action.action_id.clone());

        let mut tx = self.db.begin().await?;
        ActionRepo::create_tx(&mut *tx, action).await?;
        WorkflowRepo::create_tx(&mut *tx, &instance).await?;
        self.audit.append(AuditEntry::new(
            action.action_id.clone(),
            None,
            WorkflowState::Created,
            format!("intercepted invocation of '{}'", action.tool_name),
        ))?;
        tx.commit().await?;
        Ok(())
    }

    /// Record the assessment and branch the workflow on its classification.
    async fn branch(
        &self,
        action_id: &str,
        assessment: &RiskAssessment,
        evaluator_failure: Option<String>,
    ) -> Result<Submission> {
        let (target, deadline, rationale) = match assessment.classification {
            RiskClassification::LowRisk => {
                let mut rationale = format!(
                    "score {} below threshold {}; auto-approved",
                    assessment.score, self.risk_threshold
                );
                if let Some(ref oracle) = assessment.rationale {
                    rationale.push_str(": ");
                    rationale.push_str(oracle);
                }
                (WorkflowState::AutoApproved, None, rationale)
            }
            RiskClassification::HighRisk => {
                let deadline = Utc::now() + self.decision_timeout;
                let rationale = evaluator_failure.map_or_else(
                    || {
                        format!(
                            "score {} at or above threshold {}; escalated for human review",
                            assessment.score, self.risk_threshold
                        )
                    },
                    |reason| {
                        format!("risk evaluator failed: {reason}; escalated fail-closed for human review")
                    },
                );
                (WorkflowState::AwaitingDecision, Some(deadline), rationale)
            }
        };

        let entry = AuditEntry::new(
            action_id.to_owned(),
            Some(WorkflowState::Assessing),
            target,
            rationale,
        )
        .with_score(assessment.score);

        let mut tx = self.db.begin().await?;
        AssessmentRepo::record_tx(&mut *tx, action_id, assessment).await?;
        let claimed = WorkflowRepo::transition_tx(
            &mut *tx,
            action_id,
            WorkflowState::Assessing,
            target,
            deadline,
            None,
        )
        .await?;
        if !claimed {
            tx.rollback().await?;
            return Err(AppError::Db(format!(
                "workflow {action_id} left assessing state unexpectedly"
            )));
        }
        self.audit.append(entry)?;
        tx.commit().await?;

        let status = match target {
            WorkflowState::AutoApproved => {
                info!(score = assessment.score, "auto-approved");
                ProvisionalStatus::Authorized
            }
            _ => {
                info!(score = assessment.score, deadline = ?deadline, "parked for human review");
                ProvisionalStatus::PendingReview
            }
        };

        Ok(Submission {
            action_id: action_id.to_owned(),
            status,
            score: assessment.score,
        })
    }

    /// Attempt a guarded transition, committing only after the audit
    /// append succeeds.
    ///
    /// Returns `false` when another contender already moved the instance
    /// on; the caller observes the terminal state and becomes a no-op.
    async fn transition_audited(
        &self,
        action_id: &str,
        from: WorkflowState,
        to: WorkflowState,
        deadline: Option<DateTime<Utc>>,
        decided_by: Option<&str>,
        entry: AuditEntry,
    ) -> Result<bool> {
        let mut tx = self.db.begin().await?;
        let claimed =
            WorkflowRepo::transition_tx(&mut *tx, action_id, from, to, deadline, decided_by).await?;
        if !claimed {
            tx.rollback().await?;
            return Ok(false);
        }
        self.audit.append(entry)?;
        tx.commit().await?;
        Ok(true)
    }
}
