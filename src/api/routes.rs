use crate::AppState;
use axum::{
    Router,
    routing::{delete, get, post},
};

pub fn create_router() -> Router<AppState> {
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/auth/register", post(crate::api::handlers::auth::register))
        .route("/auth/login", post(crate::api::handlers::auth::login))
        .route(
            "/auth/refresh",
            post(crate::api::handlers::auth::refresh_token),
        );

    // RAG pipeline routes
    #[cfg(all(feature = "local-embeddings", feature = "ares-vector"))]
    let rag_routes = Router::new()
        .route(
            "/v1/rag/pipelines",
            get(crate::api::handlers::rag::list_pipelines).post(crate::api::handlers::rag::create_pipeline),
        )
        .route(
            "/v1/rag/pipelines/{id}",
            get(crate::api::handlers::rag::get_pipeline).delete(crate::api::handlers::rag::delete_pipeline),
        )
        .route(
            "/v1/rag/pipelines/{id}/documents",
            get(crate::api::handlers::rag::list_documents).post(crate::api::handlers::rag::upload_document),
        )
        .route(
            "/v1/rag/pipelines/{id}/documents/{document_id}",
            delete(crate::api::handlers::rag::delete_document),
        )
        .route(
            "/v1/rag/pipelines/{id}/query",
            post(crate::api::handlers::rag::query_pipeline),
        )
        .route(
            "/v1/rag/pipelines/{id}/stats",
            get(crate::api::handlers::rag::pipeline_stats),
        )
        .route(
            "/v1/rag/config/options",
            get(crate::api::handlers::rag::config_options),
        );

    #[cfg(not(all(feature = "local-embeddings", feature = "ares-vector")))]
    let rag_routes = Router::new();

    // Merge all routes
    Router::new().merge(public_routes).merge(rag_routes)
}
