//! API request handlers.
//!
//! This module contains all HTTP request handlers organized by functionality.

/// Authentication handlers (login, register, refresh).
pub mod auth;
/// RAG pipeline handlers (pipelines, documents, query, stats, config options).
/// Requires the `local-embeddings` feature (for ONNX-based embeddings) and
/// `ares-vector` feature (for the embedded vector database).
#[cfg(all(feature = "local-embeddings", feature = "ares-vector"))]
pub mod rag;
