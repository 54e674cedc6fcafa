//! Bearer-token authentication middleware for the `/v1` routes.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::warn;

use super::{AppState, ErrorResponse};

/// Require a valid `Authorization: Bearer <token>` header.
///
/// Fail-safe when no token is provisioned: every request is rejected with
/// 503 rather than letting the gateway run open.
pub async fn require_bearer(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    if state.api_token.is_empty() {
        warn!("api token not configured; rejecting request");
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ErrorResponse {
                error: "server api token not configured".into(),
            }),
        )
            .into_response();
    }

    let authorized = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .is_some_and(|token| token == state.api_token);

    if !authorized {
        return (
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse {
                error: "invalid or missing bearer token".into(),
            }),
        )
            .into_response();
    }

    next.run(request).await
}
