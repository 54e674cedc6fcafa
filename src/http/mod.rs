//! HTTP surface of the gateway.
//!
//! Exposes the interception façade to the tool-calling transport, the
//! decision ingress to the reviewer-facing side, and read-only status and
//! audit lookups. All `/v1` routes sit behind a bearer token; `/health` is
//! open for liveness probes.

pub mod auth;
pub mod server;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::engine::GovernanceEngine;
use crate::gateway::InterceptionFacade;
use crate::models::decision::Decision;
use crate::models::workflow::WorkflowState;
use crate::router::DecisionRouter;

pub use server::serve;

/// Shared state for all HTTP handlers.
pub struct AppState {
    /// Interception façade for the transport boundary.
    pub facade: InterceptionFacade,
    /// Decision signal router for the reviewer boundary.
    pub router: DecisionRouter,
    /// Engine handle for status and audit lookups.
    pub engine: Arc<GovernanceEngine>,
    /// Bearer token protecting the `/v1` routes. Empty means not yet
    /// provisioned; every authenticated request is then rejected.
    pub api_token: String,
}

/// Body of `POST /v1/actions`.
#[derive(Debug, Clone, Deserialize)]
pub struct InterceptRequest {
    /// Name of the governed tool being invoked.
    pub tool_name: String,
    /// Opaque tool parameters.
    #[serde(default)]
    pub arguments: serde_json::Map<String, serde_json::Value>,
}

/// Successful response of `POST /v1/actions`.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum InterceptResponse {
    /// Low risk; the transport may execute the tool.
    Authorized {
        /// Correlation key for the audit trail.
        action_id: String,
        /// Assessed risk score.
        score: u8,
    },
    /// Escalated; the transport must surface the reference and wait for a
    /// reviewer decision out of band.
    Pending {
        /// Reference the reviewer resolves against.
        action_id: String,
        /// Assessed (or fail-closed) risk score.
        score: u8,
    },
}

/// Body of `POST /v1/decisions`.
#[derive(Debug, Clone, Deserialize)]
pub struct DecisionRequest {
    /// Correlation reference surfaced to the reviewer.
    pub event_id: String,
    /// The verdict, `APPROVED` or `DENIED`.
    pub decision: Decision,
    /// Opaque reviewer identity.
    pub decided_by: String,
}

/// Response of `GET /v1/actions/{action_id}`.
#[derive(Debug, Clone, Serialize)]
pub struct ActionStatusResponse {
    /// Correlation key.
    pub action_id: String,
    /// Current workflow state.
    pub state: WorkflowState,
    /// Assessed risk score, once recorded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<u8>,
    /// Reviewer identity, once resolved by a decision.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decided_by: Option<String>,
    /// Decision deadline while awaiting review.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadline_at: Option<DateTime<Utc>>,
    /// Instance creation time.
    pub created_at: DateTime<Utc>,
    /// Most recent transition time.
    pub last_transition_at: DateTime<Utc>,
}

/// Structured error body for failed requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Human-readable failure reason.
    pub error: String,
}
