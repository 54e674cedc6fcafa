//! Risk assessment model produced by the scoring oracle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Score recorded when the oracle could not be consulted. Guarantees the
/// fail-closed path classifies as high risk under any valid threshold.
pub const FAIL_CLOSED_SCORE: u8 = 100;

/// Risk classification derived from the numeric score via the configured
/// threshold. Never settable independently of the score.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RiskClassification {
    /// Score below the threshold; eligible for auto-approval.
    LowRisk,
    /// Score at or above the threshold; requires a human decision.
    HighRisk,
}

impl RiskClassification {
    /// Derive the classification from a score and threshold.
    #[must_use]
    pub fn from_score(score: u8, threshold: u8) -> Self {
        if score < threshold {
            Self::LowRisk
        } else {
            Self::HighRisk
        }
    }
}

/// Result of evaluating one action request. Exactly one exists per action;
/// re-evaluation after the workflow has branched is not permitted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct RiskAssessment {
    /// Numeric risk score in `[0, 100]`.
    pub score: u8,
    /// Classification derived from the score.
    pub classification: RiskClassification,
    /// Oracle-supplied reasoning, when available.
    pub rationale: Option<String>,
    /// Evaluation timestamp.
    pub evaluated_at: DateTime<Utc>,
}

impl RiskAssessment {
    /// Build an assessment from an oracle score, deriving the classification.
    #[must_use]
    pub fn from_score(score: u8, threshold: u8, rationale: Option<String>) -> Self {
        Self {
            score,
            classification: RiskClassification::from_score(score, threshold),
            rationale,
            evaluated_at: Utc::now(),
        }
    }

    /// Build the synthetic fail-closed assessment recorded when the oracle
    /// call failed. An unassessable action is never auto-approved.
    #[must_use]
    pub fn fail_closed(threshold: u8, reason: &str) -> Self {
        Self::from_score(
            FAIL_CLOSED_SCORE,
            threshold,
            Some(format!("evaluator failure: {reason}")),
        )
    }
}
