//! `SQLite` schema bootstrap logic.
//!
//! All table definitions use `CREATE TABLE IF NOT EXISTS` — safe to
//! re-run on every server startup. Produces a convergent result.

use sqlx::SqlitePool;

use crate::Result;

/// Apply all table definitions to the connected `SQLite` database.
///
/// Creates all three tables idempotently. Safe to call on every startup.
///
/// # Errors
///
/// Returns `AppError::Db` if any DDL statement fails.
pub async fn bootstrap_schema(pool: &SqlitePool) -> Result<()> {
    let ddl = r"
CREATE TABLE IF NOT EXISTS action_request (
    action_id       TEXT PRIMARY KEY NOT NULL,
    tool_name       TEXT NOT NULL,
    arguments       TEXT NOT NULL,
    requested_at    TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS workflow_instance (
    action_id          TEXT PRIMARY KEY NOT NULL,
    state              TEXT NOT NULL CHECK(state IN ('created','assessing','auto_approved','awaiting_decision','approved','denied','expired')),
    created_at         TEXT NOT NULL,
    last_transition_at TEXT NOT NULL,
    deadline_at        TEXT,
    decided_by         TEXT
);

CREATE TABLE IF NOT EXISTS risk_assessment (
    action_id       TEXT PRIMARY KEY NOT NULL,
    score           INTEGER NOT NULL CHECK(score BETWEEN 0 AND 100),
    classification  TEXT NOT NULL CHECK(classification IN ('low_risk','high_risk')),
    rationale       TEXT,
    evaluated_at    TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_workflow_state ON workflow_instance(state);
CREATE INDEX IF NOT EXISTS idx_workflow_deadline ON workflow_instance(state, deadline_at);
";

    sqlx::raw_sql(ddl).execute(pool).await?;
    Ok(())
}
