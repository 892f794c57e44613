//! End-to-end RAG pipeline tests against real local models.
//!
//! These exercise `RagEngine` with an actual fastembed embedding model (and,
//! for the rerank test, the local cross-encoder), which means downloading
//! ONNX weights on first run. They're gated behind `RAG_LIVE_TESTS=1` so the
//! regular test suite stays fast and offline.
//!
//! ```bash
//! RAG_LIVE_TESTS=1 cargo test --features ares-vector,local-embeddings --test rag_live_tests
//! ```
#![cfg(feature = "ares-vector")]

use std::sync::Arc;

use ares::db::TursoClient;
use ares::rag::engine::RagEngine;
use ares::rag::pipeline::PipelineRegistry;
use ares::types::{
    ChunkingConfig, CreatePipelineRequest, EmbeddingConfig, EmbeddingProvider, PipelineChunkingStrategy,
    PipelineConfig, PipelineStatus, RagQueryRequest, RetrievalConfig,
};

fn should_run_live_tests() -> bool {
    std::env::var("RAG_LIVE_TESTS").as_deref() == Ok("1")
}

macro_rules! skip_if_not_live {
    () => {
        if !should_run_live_tests() {
            eprintln!("skipping live RAG test (set RAG_LIVE_TESTS=1 to run)");
            return;
        }
    };
}

async fn test_engine() -> (RagEngine, tempfile::TempDir) {
    let dir = tempfile::tempdir().expect("create temp data root");
    let db = Arc::new(
        TursoClient::new_local(":memory:")
            .await
            .expect("create in-memory catalog"),
    );
    let registry = Arc::new(PipelineRegistry::new(db, dir.path().to_path_buf()));
    (RagEngine::new(registry), dir)
}

fn sample_documents() -> Vec<(&'static str, &'static str)> {
    vec![
        (
            "paris.txt",
            "Paris is the capital and most populous city of France. \
             It is known for the Eiffel Tower, the Louvre museum, and the Seine river.",
        ),
        (
            "tokyo.txt",
            "Tokyo is the capital of Japan. It is one of the most populous metropolitan \
             areas in the world and home to the Tokyo Tower and Shibuya Crossing.",
        ),
        (
            "rust.txt",
            "Rust is a systems programming language focused on safety, speed, and \
             concurrency. It achieves memory safety without a garbage collector.",
        ),
    ]
}

fn long_document() -> String {
    let paragraph = "Retrieval augmented generation combines a search step over a \
        document collection with a language model that synthesizes an answer from the \
        retrieved passages. ";
    paragraph.repeat(50)
}

async fn create_ready_pipeline(engine: &RagEngine, name: &str) -> ares::types::Pipeline {
    let config = PipelineConfig {
        chunking: ChunkingConfig {
            strategy: PipelineChunkingStrategy::Recursive,
            chunk_size: 200,
            chunk_overlap: 20,
        },
        embedding: EmbeddingConfig {
            provider: EmbeddingProvider::BgeSmall,
            model: None,
        },
        retrieval: RetrievalConfig {
            top_k: 3,
            ..Default::default()
        },
        ..Default::default()
    };

    engine
        .create_pipeline(CreatePipelineRequest {
            name: name.to_string(),
            description: None,
            config,
        })
        .await
        .expect("pipeline creation should succeed")
}

#[tokio::test]
async fn ingest_and_query_returns_the_matching_document() {
    skip_if_not_live!();

    let (engine, _dir) = test_engine().await;
    let pipeline = create_ready_pipeline(&engine, "geography").await;

    for (file_name, content) in sample_documents() {
        engine
            .ingest_document(&pipeline.id, file_name, content.as_bytes())
            .await
            .unwrap_or_else(|e| panic!("ingest of {file_name} failed: {e}"));
    }

    let response = engine
        .query(
            &pipeline.id,
            RagQueryRequest {
                query: "What is the capital of France?".to_string(),
                top_k: Some(2),
                score_threshold: None,
                metadata_filters: Vec::new(),
                generate_answer: Some(false),
                rerank: Some(false),
            },
        )
        .await
        .expect("query should succeed");

    assert!(!response.results.is_empty());
    assert!(response.results[0].content.contains("Paris"));
    assert!(!response.reranking_applied);
    assert!(response.answer.is_none());
}

#[tokio::test]
async fn reranking_reorders_candidates_by_cross_encoder_score() {
    skip_if_not_live!();

    let (engine, _dir) = test_engine().await;
    let pipeline = create_ready_pipeline(&engine, "geography-reranked").await;

    for (file_name, content) in sample_documents() {
        engine
            .ingest_document(&pipeline.id, file_name, content.as_bytes())
            .await
            .unwrap_or_else(|e| panic!("ingest of {file_name} failed: {e}"));
    }

    let response = engine
        .query(
            &pipeline.id,
            RagQueryRequest {
                query: "Tell me about Japan's capital city".to_string(),
                top_k: Some(2),
                score_threshold: None,
                metadata_filters: Vec::new(),
                generate_answer: Some(false),
                rerank: Some(true),
            },
        )
        .await
        .expect("query should succeed");

    assert!(response.reranking_applied);
    assert!(response.results[0].rerank_score.is_some());
    assert!(response.results[0].content.contains("Tokyo"));
}

#[tokio::test]
async fn long_document_is_chunked_into_multiple_vectors() {
    skip_if_not_live!();

    let (engine, _dir) = test_engine().await;
    let pipeline = create_ready_pipeline(&engine, "chunking").await;

    let (document, warning) = engine
        .ingest_document(&pipeline.id, "rag_overview.txt", long_document().as_bytes())
        .await
        .expect("ingest should succeed");

    assert!(document.chunk_count > 1, "expected multiple chunks for a long document");
    assert!(warning.is_none());

    let stats = engine
        .registry()
        .stats(&pipeline.id)
        .await
        .expect("stats should be readable");
    assert_eq!(stats.chunk_count, document.chunk_count);
    assert_eq!(stats.status, PipelineStatus::Ready);
}

#[tokio::test]
async fn score_threshold_filters_out_irrelevant_matches() {
    skip_if_not_live!();

    let (engine, _dir) = test_engine().await;
    let pipeline = create_ready_pipeline(&engine, "thresholded").await;

    for (file_name, content) in sample_documents() {
        engine
            .ingest_document(&pipeline.id, file_name, content.as_bytes())
            .await
            .unwrap_or_else(|e| panic!("ingest of {file_name} failed: {e}"));
    }

    let response = engine
        .query(
            &pipeline.id,
            RagQueryRequest {
                query: "What is the capital of France?".to_string(),
                top_k: Some(10),
                score_threshold: Some(0.99),
                metadata_filters: Vec::new(),
                generate_answer: Some(false),
                rerank: Some(false),
            },
        )
        .await
        .expect("query should succeed");

    assert!(
        response.results.iter().all(|r| r.score >= 0.99),
        "a near-impossible threshold should only admit near-perfect matches"
    );
}
