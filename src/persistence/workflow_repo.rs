//! Workflow instance repository for `SQLite` persistence.
//!
//! The store is the authoritative source of workflow state. Guarded
//! transitions use a conditional update on the prior state so that two
//! contenders for the same instance (a decision signal and an expiry
//! sweep) resolve to exactly one winner.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;

use crate::models::workflow::{WorkflowInstance, WorkflowState};
use crate::{AppError, Result};

use super::db::Database;

/// Repository wrapper around `SQLite` for workflow instance records.
#[derive(Clone)]
pub struct WorkflowRepo {
    db: Arc<Database>,
}

/// Internal row struct for `SQLite` deserialization.
#[derive(sqlx::FromRow)]
struct WorkflowRow {
    action_id: String,
    state: String,
    created_at: String,
    last_transition_at: String,
    deadline_at: Option<String>,
    decided_by: Option<String>,
}

impl WorkflowRow {
    /// Convert a database row into the domain model.
    fn into_instance(self) -> Result<WorkflowInstance> {
        let state = parse_state(&self.state)?;
        let created_at = parse_timestamp(&self.created_at, "created_at")?;
        let last_transition_at = parse_timestamp(&self.last_transition_at, "last_transition_at")?;
        let deadline_at = self
            .deadline_at
            .as_deref()
            .map(|s| parse_timestamp(s, "deadline_at"))
            .transpose()?;

        Ok(WorkflowInstance {
            action_id: self.action_id,
            state,
            created_at,
            last_transition_at,
            deadline_at,
            decided_by: self.decided_by,
        })
    }
}

fn parse_timestamp(s: &str, field: &str) -> Result<DateTime<Utc>> {
    chrono::DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| AppError::Db(format!("invalid {field}: {e}")))
}

fn parse_state(s: &str) -> Result<WorkflowState> {
    match s {
        "created" => Ok(WorkflowState::Created),
        "assessing" => Ok(WorkflowState::Assessing),
        "auto_approved" => Ok(WorkflowState::AutoApproved),
        "awaiting_decision" => Ok(WorkflowState::AwaitingDecision),
        "approved" => Ok(WorkflowState::Approved),
        "denied" => Ok(WorkflowState::Denied),
        "expired" => Ok(WorkflowState::Expired),
        other => Err(AppError::Db(format!("invalid workflow state: {other}"))),
    }
}

fn state_str(s: WorkflowState) -> &'static str {
    match s {
        WorkflowState::Created => "created",
        WorkflowState::Assessing => "assessing",
        WorkflowState::AutoApproved => "auto_approved",
        WorkflowState::AwaitingDecision => "awaiting_decision",
        WorkflowState::Approved => "approved",
        WorkflowState::Denied => "denied",
        WorkflowState::Expired => "expired",
    }
}

impl WorkflowRepo {
    /// Create a new repository instance.
    #[must_use]
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Insert a new workflow instance record inside an open transaction.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the insert fails or an instance already
    /// exists for the `action_id`.
    pub async fn create_tx(conn: &mut SqliteConnection, instance: &WorkflowInstance) -> Result<()> {
        let state = state_str(instance.state);
        let created_at = instance.created_at.to_rfc3339();
        let last_transition_at = instance.last_transition_at.to_rfc3339();
        let deadline_at = instance.deadline_at.map(|dt| dt.to_rfc3339());

        sqlx::query(
            "INSERT INTO workflow_instance
             (action_id, state, created_at, last_transition_at, deadline_at, decided_by)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )
        .bind(&instance.action_id)
        .bind(state)
        .bind(&created_at)
        .bind(&last_transition_at)
        .bind(&deadline_at)
        .bind(&instance.decided_by)
        .execute(conn)
        .await?;

        Ok(())
    }

    /// Retrieve a workflow instance by its `action_id`.
    ///
    /// Returns `Ok(None)` if the instance does not exist.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails.
    pub async fn get_by_id(&self, action_id: &str) -> Result<Option<WorkflowInstance>> {
        let row: Option<WorkflowRow> =
            sqlx::query_as("SELECT * FROM workflow_instance WHERE action_id = ?1")
                .bind(action_id)
                .fetch_optional(self.db.as_ref())
                .await?;

        row.map(WorkflowRow::into_instance).transpose()
    }

    /// Attempt a guarded state transition inside an open transaction.
    ///
    /// Updates the row only if it is still in `from`. Returns `true` when
    /// this caller won the transition, `false` when another contender
    /// already moved the instance on.
    ///
    /// `deadline_at` and `decided_by`, when supplied, are recorded with the
    /// transition; otherwise the stored values are left untouched.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the update fails.
    pub async fn transition_tx(
        conn: &mut SqliteConnection,
        action_id: &str,
        from: WorkflowState,
        to: WorkflowState,
        deadline_at: Option<DateTime<Utc>>,
        decided_by: Option<&str>,
    ) -> Result<bool> {
        let now = Utc::now().to_rfc3339();
        let deadline = deadline_at.map(|dt| dt.to_rfc3339());

        let result = sqlx::query(
            "UPDATE workflow_instance
             SET state = ?1,
                 last_transition_at = ?2,
                 deadline_at = COALESCE(?3, deadline_at),
                 decided_by = COALESCE(?4, decided_by)
             WHERE action_id = ?5 AND state = ?6",
        )
        .bind(state_str(to))
        .bind(&now)
        .bind(&deadline)
        .bind(decided_by)
        .bind(action_id)
        .bind(state_str(from))
        .execute(conn)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// List all instances currently parked awaiting a decision.
    ///
    /// This is the pending-correlation registry: rebuilt from the store by
    /// this query, it survives process restarts without any in-memory
    /// bookkeeping.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails.
    pub async fn list_awaiting(&self) -> Result<Vec<WorkflowInstance>> {
        let rows: Vec<WorkflowRow> =
            sqlx::query_as("SELECT * FROM workflow_instance WHERE state = 'awaiting_decision'")
                .fetch_all(self.db.as_ref())
                .await?;

        rows.into_iter().map(WorkflowRow::into_instance).collect()
    }

    /// List awaiting instances whose deadline has passed.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails.
    pub async fn list_overdue(&self, now: DateTime<Utc>) -> Result<Vec<WorkflowInstance>> {
        let cutoff = now.to_rfc3339();
        let rows: Vec<WorkflowRow> = sqlx::query_as(
            "SELECT * FROM workflow_instance
             WHERE state = 'awaiting_decision'
               AND deadline_at IS NOT NULL
               AND deadline_at < ?1",
        )
        .bind(&cutoff)
        .fetch_all(self.db.as_ref())
        .await?;

        rows.into_iter().map(WorkflowRow::into_instance).collect()
    }

    /// Count instances currently awaiting a decision.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails.
    pub async fn count_awaiting(&self) -> Result<u64> {
        let count: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM workflow_instance WHERE state = 'awaiting_decision'",
        )
        .fetch_one(self.db.as_ref())
        .await?;

        Ok(u64::try_from(count.0).unwrap_or(0))
    }
}
