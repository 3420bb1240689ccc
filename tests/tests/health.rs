//! Tests for health check endpoints.
//!
//! The health registry is process-global, so tests that flip store health
//! live in a single test function.

use axum::http::StatusCode;
use integration_tests::setup::TestContext;

/// Test /health endpoint returns proper structure
#[tokio::test]
async fn test_health_endpoint_structure() {
    let ctx = TestContext::new();
    let server = ctx.server();

    let response = server.get("/health").await;
    response.assert_status_ok();

    let body: serde_json::Value = response.json();

    assert!(
        body.get("status").is_some(),
        "Response should have 'status' field"
    );
    assert!(
        body.get("store_connected").is_some(),
        "Response should have 'store_connected' field"
    );
    assert!(
        body.get("active_sessions").is_some(),
        "Response should have 'active_sessions' field"
    );

    let status = body["status"].as_str().unwrap_or("");
    assert!(
        status == "healthy" || status == "unhealthy",
        "Status should be 'healthy' or 'unhealthy', got '{}'",
        status
    );
}

/// Test /health/live always succeeds
#[tokio::test]
async fn test_liveness_probe() {
    let ctx = TestContext::new();
    let server = ctx.server();

    let response = server.get("/health/live").await;
    response.assert_status(StatusCode::OK);
}

/// Test readiness follows the store
#[tokio::test]
async fn test_readiness_follows_store() {
    let ctx = TestContext::new();
    let server = ctx.server();

    let response = server.get("/health/ready").await;
    response.assert_status(StatusCode::OK);

    ctx.set_store_failure(true);
    let response = server.get("/health/ready").await;
    response.assert_status(StatusCode::SERVICE_UNAVAILABLE);

    let body: serde_json::Value = server.get("/health").await.json();
    assert_eq!(body["store_connected"], false);

    ctx.set_store_failure(false);
    let response = server.get("/health/ready").await;
    response.assert_status(StatusCode::OK);
}
