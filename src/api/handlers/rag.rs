//! RAG pipeline API handlers.
//!
//! Pipelines are created, ingested into, queried and inspected through a
//! small REST surface mounted under `/api/v1/rag`. All state lives behind
//! [`crate::rag::engine::RagEngine`] on [`AppState`]; these handlers only
//! parse requests, call the engine, and shape responses.

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::Json;

use crate::types::{
    AppError, ConfigOptions, CreatePipelineRequest, DocumentUploadResponse, Pipeline,
    PipelineStatistics, RagDocument, RagQueryRequest, RagQueryResponse, Result,
};
use crate::AppState;

/// Create a new RAG pipeline.
#[utoipa::path(
    post,
    path = "/api/v1/rag/pipelines",
    request_body = CreatePipelineRequest,
    responses(
        (status = 201, description = "Pipeline created", body = Pipeline),
        (status = 400, description = "Invalid configuration"),
    ),
    tag = "rag",
    security(("bearer" = []))
)]
pub async fn create_pipeline(
    State(state): State<AppState>,
    Json(payload): Json<CreatePipelineRequest>,
) -> Result<(StatusCode, Json<Pipeline>)> {
    let pipeline = state.rag_engine.create_pipeline(payload).await?;
    Ok((StatusCode::CREATED, Json(pipeline)))
}

/// List all RAG pipelines.
#[utoipa::path(
    get,
    path = "/api/v1/rag/pipelines",
    responses((status = 200, description = "Pipelines listed", body = Vec<Pipeline>)),
    tag = "rag",
    security(("bearer" = []))
)]
pub async fn list_pipelines(State(state): State<AppState>) -> Result<Json<Vec<Pipeline>>> {
    let pipelines = state.rag_engine.registry().list().await?;
    Ok(Json(pipelines))
}

/// Fetch a single pipeline.
#[utoipa::path(
    get,
    path = "/api/v1/rag/pipelines/{id}",
    params(("id" = String, Path, description = "Pipeline id")),
    responses(
        (status = 200, description = "Pipeline found", body = Pipeline),
        (status = 404, description = "Pipeline not found"),
    ),
    tag = "rag",
    security(("bearer" = []))
)]
pub async fn get_pipeline(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Pipeline>> {
    let pipeline = state.rag_engine.registry().get(&id).await?;
    Ok(Json(pipeline))
}

/// Delete a pipeline and its vector collection.
#[utoipa::path(
    delete,
    path = "/api/v1/rag/pipelines/{id}",
    params(("id" = String, Path, description = "Pipeline id")),
    responses(
        (status = 204, description = "Pipeline deleted"),
        (status = 404, description = "Pipeline not found"),
    ),
    tag = "rag",
    security(("bearer" = []))
)]
pub async fn delete_pipeline(State(state): State<AppState>, Path(id): Path<String>) -> Result<StatusCode> {
    state.rag_engine.registry().delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Upload a document to a pipeline for ingest.
#[utoipa::path(
    post,
    path = "/api/v1/rag/pipelines/{id}/documents",
    params(("id" = String, Path, description = "Pipeline id")),
    responses(
        (status = 200, description = "Document ingested", body = DocumentUploadResponse),
        (status = 400, description = "Invalid or unsupported file"),
        (status = 409, description = "Embedding model mismatch"),
    ),
    tag = "rag",
    security(("bearer" = []))
)]
pub async fn upload_document(
    State(state): State<AppState>,
    Path(pipeline_id): Path<String>,
    mut multipart: Multipart,
) -> Result<Json<DocumentUploadResponse>> {
    let field = multipart
        .next_field()
        .await
        .map_err(|e| AppError::ValidationError(format!("invalid multipart body: {e}")))?
        .ok_or_else(|| AppError::ValidationError("multipart body had no file field".to_string()))?;

    let file_name = field
        .file_name()
        .map(str::to_string)
        .ok_or_else(|| AppError::ValidationError("multipart field had no file name".to_string()))?;

    let bytes = field
        .bytes()
        .await
        .map_err(|e| AppError::ValidationError(format!("failed to read upload body: {e}")))?;

    let (document, warning) = state
        .rag_engine
        .ingest_document(&pipeline_id, &file_name, &bytes)
        .await?;

    Ok(Json(DocumentUploadResponse { document, warning }))
}

/// List documents ingested into a pipeline.
#[utoipa::path(
    get,
    path = "/api/v1/rag/pipelines/{id}/documents",
    params(("id" = String, Path, description = "Pipeline id")),
    responses((status = 200, description = "Documents listed", body = Vec<RagDocument>)),
    tag = "rag",
    security(("bearer" = []))
)]
pub async fn list_documents(
    State(state): State<AppState>,
    Path(pipeline_id): Path<String>,
) -> Result<Json<Vec<RagDocument>>> {
    let documents = state.rag_engine.registry().list_documents(&pipeline_id).await?;
    Ok(Json(documents))
}

/// Delete a document from a pipeline.
#[utoipa::path(
    delete,
    path = "/api/v1/rag/pipelines/{id}/documents/{document_id}",
    params(
        ("id" = String, Path, description = "Pipeline id"),
        ("document_id" = String, Path, description = "Document id"),
    ),
    responses(
        (status = 204, description = "Document deleted"),
        (status = 404, description = "Document not found"),
    ),
    tag = "rag",
    security(("bearer" = []))
)]
pub async fn delete_document(
    State(state): State<AppState>,
    Path((pipeline_id, document_id)): Path<(String, String)>,
) -> Result<StatusCode> {
    state.rag_engine.registry().delete_document(&pipeline_id, &document_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Query a pipeline: retrieve, optionally rerank, optionally synthesize an answer.
#[utoipa::path(
    post,
    path = "/api/v1/rag/pipelines/{id}/query",
    params(("id" = String, Path, description = "Pipeline id")),
    request_body = RagQueryRequest,
    responses(
        (status = 200, description = "Query results", body = RagQueryResponse),
        (status = 400, description = "Pipeline not ready for queries"),
    ),
    tag = "rag",
    security(("bearer" = []))
)]
pub async fn query_pipeline(
    State(state): State<AppState>,
    Path(pipeline_id): Path<String>,
    Json(payload): Json<RagQueryRequest>,
) -> Result<Json<RagQueryResponse>> {
    if payload.query.trim().is_empty() {
        return Err(AppError::ValidationError("query must not be empty".to_string()));
    }
    let response = state.rag_engine.query(&pipeline_id, payload).await?;
    Ok(Json(response))
}

/// Fetch a pipeline's ingest/query statistics.
#[utoipa::path(
    get,
    path = "/api/v1/rag/pipelines/{id}/stats",
    params(("id" = String, Path, description = "Pipeline id")),
    responses((status = 200, description = "Pipeline statistics", body = PipelineStatistics)),
    tag = "rag",
    security(("bearer" = []))
)]
pub async fn pipeline_stats(
    State(state): State<AppState>,
    Path(pipeline_id): Path<String>,
) -> Result<Json<PipelineStatistics>> {
    let stats = state.rag_engine.registry().stats(&pipeline_id).await?;
    Ok(Json(stats))
}

/// List the enumerated config choices clients can pick from when creating a pipeline.
#[utoipa::path(
    get,
    path = "/api/v1/rag/config/options",
    responses((status = 200, description = "Available config options", body = ConfigOptions)),
    tag = "rag",
    security(("bearer" = []))
)]
pub async fn config_options() -> Json<ConfigOptions> {
    Json(ConfigOptions::default())
}
