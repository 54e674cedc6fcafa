//! Risk evaluator client abstraction.
//!
//! The [`RiskEvaluator`] trait decouples the governance engine from the
//! external scoring oracle. The production implementation,
//! [`HttpRiskEvaluator`], adapts an action into an HTTP inference call;
//! tests substitute a scripted implementation.

pub mod http;

use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;

use crate::models::action::ActionRequest;
use crate::models::assessment::RiskAssessment;

/// Failure modes of a single oracle call.
///
/// Both kinds are treated identically by the engine: the action escalates
/// fail-closed to human review and is never auto-approved.
#[derive(Debug)]
pub enum EvaluatorError {
    /// The oracle could not be reached or timed out.
    Unavailable(String),
    /// The oracle responded, but its output could not be parsed into a
    /// score.
    InvalidResponse(String),
}

impl Display for EvaluatorError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unavailable(msg) => write!(f, "evaluator unavailable: {msg}"),
            Self::InvalidResponse(msg) => write!(f, "evaluator invalid response: {msg}"),
        }
    }
}

impl std::error::Error for EvaluatorError {}

/// Adapts an action description into a call to the external scoring oracle.
///
/// No retries are performed for a single `assess` call: once the workflow
/// has branched on an assessment, a stale duplicate must never re-trigger
/// branching.
pub trait RiskEvaluator: Send + Sync {
    /// Obtain the risk assessment for one action.
    ///
    /// # Errors
    ///
    /// Returns [`EvaluatorError::Unavailable`] on network or timeout
    /// failure, [`EvaluatorError::InvalidResponse`] if the oracle output
    /// cannot be parsed.
    fn assess<'a>(
        &'a self,
        action: &'a ActionRequest,
    ) -> Pin<Box<dyn Future<Output = Result<RiskAssessment, EvaluatorError>> + Send + 'a>>;
}

pub use http::HttpRiskEvaluator;
