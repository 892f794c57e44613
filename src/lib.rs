//! # A.R.E.S - Agentic Retrieval Enhanced Server
//!
//! A production-grade Retrieval Augmented Generation (RAG) server built in
//! Rust: document ingest, chunking, embedding, vector search, reranking and
//! answer synthesis behind a small REST surface.
//!
//! ## Overview
//!
//! A.R.E.S can be used in two ways:
//!
//! 1. **As a standalone server** - Run the `ares-server` binary
//! 2. **As a library** - Import components into your own Rust project
//!
//! ## Quick Start (Library Usage)
//!
//! Add to your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! ares-server = "0.6"
//! ```
//!
//! ### Basic Example
//!
//! ```rust,ignore
//! use ares::rag::engine::RagEngine;
//! use ares::rag::pipeline::PipelineRegistry;
//! use std::sync::Arc;
//!
//! # async fn run(turso: Arc<ares::db::TursoClient>) -> ares::Result<()> {
//! let registry = Arc::new(PipelineRegistry::new(turso, "./data".into()));
//! let engine = RagEngine::new(registry);
//! # Ok(())
//! # }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `local-db` | Local SQLite database (default) |
//! | `turso` | Remote Turso database |
//! | `ares-vector` | Embedded pure-Rust HNSW vector store (default) |
//! | `local-embeddings` | fastembed-backed local embedding/reranker models (default) |
//! | `swagger-ui` | Interactive API documentation (default) |
//!
//! ## Modules
//!
//! - [`api`] - REST API handlers and routes
//! - [`auth`] - JWT authentication and middleware
//! - [`db`] - Database abstraction (SQLite, Turso)
//! - [`rag`] - RAG pipeline: parsing, chunking, embedding, retrieval, reranking, synthesis
//! - [`types`] - Common types and error handling
//!
//! ## Architecture
//!
//! Infrastructure configuration (server, auth, database, RAG defaults) lives
//! in `ares.toml`, loaded and hot-reloaded by [`utils::toml_config`].

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

/// HTTP API handlers and routes.
pub mod api;
/// JWT authentication and middleware.
pub mod auth;
/// Database clients (Turso/SQLite).
pub mod db;
/// Retrieval Augmented Generation (RAG) components.
pub mod rag;
/// Core types (requests, responses, errors).
pub mod types;
/// Configuration utilities (TOML).
pub mod utils;

// Re-export commonly used types
pub use db::TursoClient;
pub use types::{AppError, Result};
pub use utils::toml_config::{AresConfig, AresConfigManager};

use crate::auth::jwt::AuthService;
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// TOML-based infrastructure configuration with hot-reload support
    pub config_manager: Arc<AresConfigManager>,
    /// Database client
    pub turso: Arc<TursoClient>,
    /// Authentication service
    pub auth_service: Arc<AuthService>,
    /// RAG pipeline engine (ingest, retrieval, reranking, answer synthesis)
    pub rag_engine: Arc<rag::engine::RagEngine>,
}
