//! Retrieval Augmented Generation (RAG) pipeline engine.
//!
//! Each pipeline owns a chunker, an embedding model, a vector collection, a
//! retriever and an optional reranker/answer synthesizer. Documents flow
//! through [`parser`] → [`chunker`] → [`embedding_dispatch`] → [`vector_adapter`]
//! under [`ingest`]; queries flow through [`embedding_dispatch`] →
//! [`vector_adapter`] → [`retriever`] → [`reranker`] → [`synthesizer`].
//! [`pipeline`] is the durable registry tying a pipeline's identity to its
//! config and vector collection, and [`engine`] is the composition root the
//! HTTP layer talks to.

pub mod chunker;
pub mod embedding_dispatch;
pub mod embeddings;
pub mod engine;
pub mod ingest;
pub mod llm_dispatch;
pub mod parser;
pub mod pipeline;
pub mod reranker;
pub mod retriever;
pub mod synthesizer;
pub mod vector_adapter;
