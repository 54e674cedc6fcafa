//! Action request repository for `SQLite` persistence.

use std::sync::Arc;

use chrono::Utc;
use sqlx::SqliteConnection;

use crate::models::action::ActionRequest;
use crate::{AppError, Result};

use super::db::Database;

/// Repository wrapper around `SQLite` for action request records.
#[derive(Clone)]
pub struct ActionRepo {
    db: Arc<Database>,
}

/// Internal row struct for `SQLite` deserialization.
#[derive(sqlx::FromRow)]
struct ActionRow {
    action_id: String,
    tool_name: String,
    arguments: String,
    requested_at: String,
}

impl ActionRow {
    /// Convert a database row into the domain model.
    fn into_action(self) -> Result<ActionRequest> {
        let arguments: serde_json::Map<String, serde_json::Value> =
            serde_json::from_str(&self.arguments)
                .map_err(|e| AppError::Db(format!("invalid arguments json: {e}")))?;
        let requested_at = chrono::DateTime::parse_from_rfc3339(&self.requested_at)
            .map_err(|e| AppError::Db(format!("invalid requested_at: {e}")))?
            .with_timezone(&Utc);

        Ok(ActionRequest {
            action_id: self.action_id,
            tool_name: self.tool_name,
            arguments,
            requested_at,
        })
    }
}

impl ActionRepo {
    /// Create a new repository instance.
    #[must_use]
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Insert a new action request record inside an open transaction.
    ///
    /// The primary key on `action_id` enforces that an action is recorded
    /// exactly once.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the insert fails or the `action_id` is
    /// already present.
    pub async fn create_tx(conn: &mut SqliteConnection, request: &ActionRequest) -> Result<()> {
        let arguments = serde_json::to_string(&request.arguments)
            .map_err(|e| AppError::Db(format!("failed to serialize arguments: {e}")))?;
        let requested_at = request.requested_at.to_rfc3339();

        sqlx::query(
            "INSERT INTO action_request (action_id, tool_name, arguments, requested_at)
             VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(&request.action_id)
        .bind(&request.tool_name)
        .bind(&arguments)
        .bind(&requested_at)
        .execute(conn)
        .await?;

        Ok(())
    }

    /// Retrieve an action request by identifier.
    ///
    /// Returns `Ok(None)` if the action does not exist.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails.
    pub async fn get_by_id(&self, action_id: &str) -> Result<Option<ActionRequest>> {
        let row: Option<ActionRow> =
            sqlx::query_as("SELECT * FROM action_request WHERE action_id = ?1")
                .bind(action_id)
                .fetch_optional(self.db.as_ref())
                .await?;

        row.map(ActionRow::into_action).transpose()
    }
}
