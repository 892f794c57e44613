//! HTTP API Handlers and Routes
//!
//! This module provides the REST API layer for A.R.E.S, built on the Axum web framework.
//!
//! # Module Structure
//!
//! - [`api::handlers`](crate::api::handlers) - Request handlers for each endpoint
//! - [`api::routes`](crate::api::routes) - Route definitions and router configuration
//!
//! # API Endpoints
//!
//! ## Authentication (`/api/auth`)
//! - `POST /api/auth/register` - Register new user
//! - `POST /api/auth/login` - Login and receive JWT token
//! - `POST /api/auth/refresh` - Exchange a refresh token for a new access token
//!
//! ## RAG (`/api/v1/rag`)
//! - `POST /api/v1/rag/pipelines` - Create a pipeline
//! - `GET /api/v1/rag/pipelines` - List pipelines
//! - `GET /api/v1/rag/pipelines/{id}` - Fetch a pipeline
//! - `DELETE /api/v1/rag/pipelines/{id}` - Delete a pipeline
//! - `POST /api/v1/rag/pipelines/{id}/documents` - Upload a document for ingest
//! - `GET /api/v1/rag/pipelines/{id}/documents` - List ingested documents
//! - `DELETE /api/v1/rag/pipelines/{id}/documents/{document_id}` - Delete a document
//! - `POST /api/v1/rag/pipelines/{id}/query` - Retrieve, rerank and optionally answer a query
//! - `GET /api/v1/rag/pipelines/{id}/stats` - Pipeline ingest/query statistics
//! - `GET /api/v1/rag/config/options` - Enumerated config choices for pipeline creation
//!
//! ## Health (`/health`)
//! - `GET /health` - Health check endpoint
//!
//! # Authentication
//!
//! Most endpoints require a valid JWT token in the `Authorization` header:
//! ```text
//! Authorization: Bearer <token>
//! ```
//!
//! # OpenAPI Documentation
//!
//! When the `swagger-ui` feature is enabled, interactive API documentation
//! is available at `/swagger-ui/`.

/// Request and response handlers for all API endpoints.
pub mod handlers;
/// Router configuration and route definitions.
pub mod routes;
