//! Integration tests for the API endpoints
//!
//! These tests require proper test infrastructure setup.
//! For now, they are marked as ignored until the full test harness is implemented.

use axum::Router;
use axum_test::TestServer;
use serde_json::json;

/// Create a test application router
///
/// This is a minimal router for basic health check testing.
/// For full integration tests with authentication, database, and RAG
/// pipelines, you would need to:
/// 1. Use `TursoClient::new_local(":memory:")` for an in-memory database
/// 2. Set up test JWT tokens
/// 3. Construct a `RagEngine` with a temp `PipelineRegistry` data root
///
/// See `db_tests.rs` for examples of using in-memory database testing.
async fn create_test_app() -> Router {
    // Minimal router for testing basic connectivity.
    // The full app additionally requires AppState (TursoClient, AuthService, RagEngine).
    use axum::routing::get;

    Router::new().route("/health", get(|| async { "OK" }))
}

/// Create a test server with the full application
async fn create_test_server() -> TestServer {
    let app = create_test_app().await;
    TestServer::new(app).expect("Failed to create test server")
}

#[tokio::test]
async fn test_health_check() {
    let server = create_test_server().await;

    let response = server.get("/health").await;
    response.assert_status_ok();
    response.assert_text("OK");
}

#[tokio::test]
#[ignore = "Requires full test infrastructure with database mocking"]
async fn test_register_and_login() {
    let server = create_test_server().await;

    // Register
    let response = server
        .post("/api/auth/register")
        .json(&json!({
            "email": "test@example.com",
            "password": "password123",
            "name": "Test User"
        }))
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert!(body["access_token"].is_string());

    // Login
    let response = server
        .post("/api/auth/login")
        .json(&json!({
            "email": "test@example.com",
            "password": "password123"
        }))
        .await;

    response.assert_status_ok();
}

#[tokio::test]
#[ignore = "Requires full test infrastructure with a RAG pipeline and embeddings"]
async fn test_query_pipeline_endpoint() {
    let server = create_test_server().await;

    // This test would require:
    // 1. A valid JWT token
    // 2. A pipeline created and documents ingested
    // 3. A local embedding model available to fastembed

    let response = server
        .post("/api/v1/rag/pipelines/some-pipeline-id/query")
        .add_header(axum::http::header::AUTHORIZATION, "Bearer test-token")
        .json(&json!({
            "query": "What is the capital of France?"
        }))
        .await;

    // For now, we expect this to fail without proper setup
    // In a full implementation, we would assert success
    assert!(response.status_code().is_client_error() || response.status_code().is_success());
}
