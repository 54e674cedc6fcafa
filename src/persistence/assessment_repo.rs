//! Risk assessment repository for `SQLite` persistence.

use std::sync::Arc;

use chrono::Utc;
use sqlx::SqliteConnection;

use crate::models::assessment::{RiskAssessment, RiskClassification};
use crate::{AppError, Result};

use super::db::Database;

/// Repository wrapper around `SQLite` for risk assessment records.
#[derive(Clone)]
pub struct AssessmentRepo {
    db: Arc<Database>,
}

/// Internal row struct for `SQLite` deserialization.
#[derive(sqlx::FromRow)]
struct AssessmentRow {
    score: i64,
    classification: String,
    rationale: Option<String>,
    evaluated_at: String,
}

impl AssessmentRow {
    /// Convert a database row into the domain model.
    fn into_assessment(self) -> Result<RiskAssessment> {
        let score = u8::try_from(self.score)
            .map_err(|_| AppError::Db(format!("score out of range: {}", self.score)))?;
        let classification = parse_classification(&self.classification)?;
        let evaluated_at = chrono::DateTime::parse_from_rfc3339(&self.evaluated_at)
            .map_err(|e| AppError::Db(format!("invalid evaluated_at: {e}")))?
            .with_timezone(&Utc);

        Ok(RiskAssessment {
            score,
            classification,
            rationale: self.rationale,
            evaluated_at,
        })
    }
}

fn parse_classification(s: &str) -> Result<RiskClassification> {
    match s {
        "low_risk" => Ok(RiskClassification::LowRisk),
        "high_risk" => Ok(RiskClassification::HighRisk),
        other => Err(AppError::Db(format!("invalid classification: {other}"))),
    }
}

fn classification_str(c: RiskClassification) -> &'static str {
    match c {
        RiskClassification::LowRisk => "low_risk",
        RiskClassification::HighRisk => "high_risk",
    }
}

impl AssessmentRepo {
    /// Create a new repository instance.
    #[must_use]
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Record the single assessment for an action inside an open transaction.
    ///
    /// The primary key on `action_id` enforces that exactly one assessment
    /// exists per action — a stale duplicate can never re-trigger branching.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the insert fails or an assessment is
    /// already recorded for the `action_id`.
    pub async fn record_tx(
        conn: &mut SqliteConnection,
        action_id: &str,
        assessment: &RiskAssessment,
    ) -> Result<()> {
        let classification = classification_str(assessment.classification);
        let evaluated_at = assessment.evaluated_at.to_rfc3339();

        sqlx::query(
            "INSERT INTO risk_assessment (action_id, score, classification, rationale, evaluated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(action_id)
        .bind(i64::from(assessment.score))
        .bind(classification)
        .bind(&assessment.rationale)
        .bind(&evaluated_at)
        .execute(conn)
        .await?;

        Ok(())
    }

    /// Retrieve the assessment recorded for an action.
    ///
    /// Returns `Ok(None)` if no assessment exists.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails.
    pub async fn get_by_action_id(&self, action_id: &str) -> Result<Option<RiskAssessment>> {
        let row: Option<AssessmentRow> = sqlx::query_as(
            "SELECT score, classification, rationale, evaluated_at
             FROM risk_assessment WHERE action_id = ?1",
        )
        .bind(action_id)
        .fetch_optional(self.db.as_ref())
        .await?;

        row.map(AssessmentRow::into_assessment).transpose()
    }
}
