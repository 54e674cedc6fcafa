//! Axum router and request handlers for the gateway surface.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::middleware;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::gateway::InterceptOutcome;
use crate::{AppError, Result};

use super::{
    auth, ActionStatusResponse, AppState, DecisionRequest, ErrorResponse, InterceptRequest,
    InterceptResponse,
};

/// Start the HTTP surface on `port`, shutting down when `ct` is cancelled.
///
/// # Errors
///
/// Returns `AppError::Http` if the listener cannot bind or the server
/// fails while running.
pub async fn serve(state: Arc<AppState>, port: u16, ct: CancellationToken) -> Result<()> {
    let protected = Router::new()
        .route("/v1/actions", post(intercept))
        .route("/v1/actions/{action_id}", get(action_status))
        .route("/v1/actions/{action_id}/audit", get(action_audit))
        .route("/v1/decisions", post(resolve_decision))
        .layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            auth::require_bearer,
        ));

    let app = Router::new()
        .route("/health", get(health))
        .merge(protected)
        .with_state(state);

    let bind = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .map_err(|err| AppError::Http(format!("failed to bind {bind}: {err}")))?;
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "gateway http surface listening");
    }

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { ct.cancelled().await })
        .await
        .map_err(|err| AppError::Http(format!("http server failed: {err}")))
}

/// Handler for `GET /health` — returns 200 OK with a plain-text body.
///
/// Useful for probing liveness without authenticating.
async fn health() -> &'static str {
    "ok"
}

/// Handler for `POST /v1/actions` — submit one tool invocation for
/// governance.
async fn intercept(
    State(state): State<Arc<AppState>>,
    Json(request): Json<InterceptRequest>,
) -> Response {
    match state
        .facade
        .intercept(&request.tool_name, request.arguments)
        .await
    {
        Ok(InterceptOutcome::Authorized { action_id, score }) => (
            StatusCode::OK,
            Json(InterceptResponse::Authorized { action_id, score }),
        )
            .into_response(),
        Ok(InterceptOutcome::PendingReview { action_id, score }) => (
            StatusCode::ACCEPTED,
            Json(InterceptResponse::Pending { action_id, score }),
        )
            .into_response(),
        Err(AppError::Validation(msg)) => {
            (StatusCode::BAD_REQUEST, Json(ErrorResponse { error: msg })).into_response()
        }
        Err(err) => {
            error!(%err, "interception failed at intake");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: err.to_string(),
                }),
            )
                .into_response()
        }
    }
}

/// Handler for `GET /v1/actions/{action_id}` — workflow status lookup.
async fn action_status(
    State(state): State<Arc<AppState>>,
    Path(action_id): Path<String>,
) -> Response {
    let instance = match state.engine.instance(&action_id).await {
        Ok(Some(instance)) => instance,
        Ok(None) => return not_found(),
        Err(err) => return internal_error(&err),
    };

    let score = match state.engine.assessment(&action_id).await {
        Ok(assessment) => assessment.map(|a| a.score),
        Err(err) => return internal_error(&err),
    };

    Json(ActionStatusResponse {
        action_id: instance.action_id,
        state: instance.state,
        score,
        decided_by: instance.decided_by,
        deadline_at: instance.deadline_at,
        created_at: instance.created_at,
        last_transition_at: instance.last_transition_at,
    })
    .into_response()
}

/// Handler for `GET /v1/actions/{action_id}/audit` — the ordered audit
/// trail.
async fn action_audit(
    State(state): State<Arc<AppState>>,
    Path(action_id): Path<String>,
) -> Response {
    match state.engine.instance(&action_id).await {
        Ok(Some(_)) => {}
        Ok(None) => return not_found(),
        Err(err) => return internal_error(&err),
    }

    match state.engine.audit_trail(&action_id) {
        Ok(entries) => Json(entries).into_response(),
        Err(err) => internal_error(&err),
    }
}

/// Handler for `POST /v1/decisions` — reviewer decision ingress.
///
/// Validation rejections are part of the response contract and answered
/// with 200; only persistence failures surface as server errors.
async fn resolve_decision(
    State(state): State<Arc<AppState>>,
    Json(request): Json<DecisionRequest>,
) -> Response {
    match state
        .router
        .resolve(&request.event_id, request.decision, &request.decided_by)
        .await
    {
        Ok(outcome) => Json(outcome).into_response(),
        Err(err) => internal_error(&err),
    }
}

fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            error: "unknown reference".into(),
        }),
    )
        .into_response()
}

fn internal_error(err: &AppError) -> Response {
    error!(%err, "request failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: err.to_string(),
        }),
    )
        .into_response()
}
