//! Integration tests for the HTTP gateway surface.
//!
//! Spawns the real axum server on an ephemeral port and drives the full
//! governance flow over the wire with a live client.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use atlas_gateway::gateway::InterceptionFacade;
use atlas_gateway::http::{serve, AppState};
use atlas_gateway::router::DecisionRouter;

use super::test_helpers::{test_context, Script, TestContext};

const TOKEN: &str = "test-token";

/// Spawn the gateway over the given context, returning its base URL.
///
/// Caller must cancel `ct` to shut the server down.
async fn spawn_gateway(ctx: &TestContext, api_token: &str) -> (String, CancellationToken) {
    // Bind a temporary listener to discover a free port, then release it
    // for the server to claim.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral");
    let port = listener.local_addr().expect("local addr").port();
    drop(listener);

    let state = Arc::new(AppState {
        facade: InterceptionFacade::new(Arc::clone(&ctx.engine)),
        router: DecisionRouter::new(Arc::clone(&ctx.engine), &ctx.config),
        engine: Arc::clone(&ctx.engine),
        api_token: api_token.to_owned(),
    });

    let ct = CancellationToken::new();
    let server_ct = ct.clone();
    tokio::spawn(async move {
        let _ = serve(state, port, server_ct).await;
    });

    // Give the listener a moment to come up.
    tokio::time::sleep(Duration::from_millis(150)).await;

    (format!("http://127.0.0.1:{port}"), ct)
}

fn client() -> reqwest::Client {
    reqwest::Client::new()
}

#[tokio::test]
async fn health_endpoint_is_open() {
    let ctx = test_context(Script::Score(10)).await;
    let (base, ct) = spawn_gateway(&ctx, TOKEN).await;

    let response = client()
        .get(format!("{base}/health"))
        .send()
        .await
        .expect("request");
    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await.expect("body"), "ok");

    ct.cancel();
}

#[tokio::test]
async fn v1_routes_require_a_bearer_token() {
    let ctx = test_context(Script::Score(10)).await;
    let (base, ct) = spawn_gateway(&ctx, TOKEN).await;

    let response = client()
        .post(format!("{base}/v1/actions"))
        .json(&serde_json::json!({"tool_name": "check_payment_status"}))
        .send()
        .await
        .expect("request");
    assert_eq!(response.status(), 401);

    let response = client()
        .post(format!("{base}/v1/actions"))
        .header("authorization", "Bearer wrong-token")
        .json(&serde_json::json!({"tool_name": "check_payment_status"}))
        .send()
        .await
        .expect("request");
    assert_eq!(response.status(), 401);

    ct.cancel();
}

#[tokio::test]
async fn unprovisioned_token_fails_safe() {
    let ctx = test_context(Script::Score(10)).await;
    let (base, ct) = spawn_gateway(&ctx, "").await;

    let response = client()
        .post(format!("{base}/v1/actions"))
        .header("authorization", "Bearer anything")
        .json(&serde_json::json!({"tool_name": "check_payment_status"}))
        .send()
        .await
        .expect("request");
    assert_eq!(response.status(), 503);

    ct.cancel();
}

#[tokio::test]
async fn low_risk_interception_is_authorized_over_the_wire() {
    let ctx = test_context(Script::ByToolName).await;
    let (base, ct) = spawn_gateway(&ctx, TOKEN).await;

    let response = client()
        .post(format!("{base}/v1/actions"))
        .header("authorization", format!("Bearer {TOKEN}"))
        .json(&serde_json::json!({
            "tool_name": "check_payment_status",
            "arguments": {"id": "BEN-1"}
        }))
        .send()
        .await
        .expect("request");
    assert_eq!(response.status(), 200);

    let body: serde_json::Value = response.json().await.expect("json");
    assert_eq!(body["status"], "authorized");
    assert_eq!(body["score"], 10);
    assert!(body["action_id"].as_str().is_some());

    ct.cancel();
}

#[tokio::test]
async fn full_review_flow_over_the_wire() {
    let ctx = test_context(Script::ByToolName).await;
    let (base, ct) = spawn_gateway(&ctx, TOKEN).await;
    let http = client();
    let auth = format!("Bearer {TOKEN}");

    // 1. Intercept a high-risk call: parked, pending reference returned.
    let response = http
        .post(format!("{base}/v1/actions"))
        .header("authorization", &auth)
        .json(&serde_json::json!({
            "tool_name": "request_payment_extension",
            "arguments": {"beneficiary_id": "BEN-123", "reason": "Hardship"}
        }))
        .send()
        .await
        .expect("request");
    assert_eq!(response.status(), 202);
    let body: serde_json::Value = response.json().await.expect("json");
    assert_eq!(body["status"], "pending");
    let action_id = body["action_id"].as_str().expect("action_id").to_owned();

    // 2. Status shows the parked workflow.
    let response = http
        .get(format!("{base}/v1/actions/{action_id}"))
        .header("authorization", &auth)
        .send()
        .await
        .expect("request");
    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.expect("json");
    assert_eq!(body["state"], "awaiting_decision");
    assert!(body["deadline_at"].as_str().is_some());

    // 3. The reviewer approves through the decision ingress.
    let response = http
        .post(format!("{base}/v1/decisions"))
        .header("authorization", &auth)
        .json(&serde_json::json!({
            "event_id": action_id,
            "decision": "APPROVED",
            "decided_by": "reviewer1"
        }))
        .send()
        .await
        .expect("request");
    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.expect("json");
    assert_eq!(body["accepted"], true);

    // 4. A duplicate delivery is rejected, not reprocessed.
    let response = http
        .post(format!("{base}/v1/decisions"))
        .header("authorization", &auth)
        .json(&serde_json::json!({
            "event_id": action_id,
            "decision": "DENIED",
            "decided_by": "reviewer2"
        }))
        .send()
        .await
        .expect("request");
    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.expect("json");
    assert_eq!(body["accepted"], false);
    assert_eq!(body["reason"], "already resolved");

    // 5. Terminal state and reviewer visible in the status lookup.
    let response = http
        .get(format!("{base}/v1/actions/{action_id}"))
        .header("authorization", &auth)
        .send()
        .await
        .expect("request");
    let body: serde_json::Value = response.json().await.expect("json");
    assert_eq!(body["state"], "approved");
    assert_eq!(body["decided_by"], "reviewer1");

    // 6. The audit trail replays the full lifecycle.
    let response = http
        .get(format!("{base}/v1/actions/{action_id}/audit"))
        .header("authorization", &auth)
        .send()
        .await
        .expect("request");
    assert_eq!(response.status(), 200);
    let trail: serde_json::Value = response.json().await.expect("json");
    let entries = trail.as_array().expect("array");
    assert_eq!(entries.len(), 4);
    assert_eq!(entries[0]["new_state"], "created");
    assert_eq!(entries[3]["new_state"], "approved");

    ct.cancel();
}

#[tokio::test]
async fn unknown_action_lookup_is_404() {
    let ctx = test_context(Script::Score(10)).await;
    let (base, ct) = spawn_gateway(&ctx, TOKEN).await;

    let response = client()
        .get(format!("{base}/v1/actions/no-such-id"))
        .header("authorization", format!("Bearer {TOKEN}"))
        .send()
        .await
        .expect("request");
    assert_eq!(response.status(), 404);
    let body: serde_json::Value = response.json().await.expect("json");
    assert_eq!(body["error"], "unknown reference");

    ct.cancel();
}

#[tokio::test]
async fn blank_tool_name_is_a_bad_request() {
    let ctx = test_context(Script::Score(10)).await;
    let (base, ct) = spawn_gateway(&ctx, TOKEN).await;

    let response = client()
        .post(format!("{base}/v1/actions"))
        .header("authorization", format!("Bearer {TOKEN}"))
        .json(&serde_json::json!({"tool_name": ""}))
        .send()
        .await
        .expect("request");
    assert_eq!(response.status(), 400);

    ct.cancel();
}
