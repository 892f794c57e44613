//! Document ingest orchestration.
//!
//! Drives one document through parse -> chunk -> embed -> vector-store
//! insert -> catalog write -> counter update, following the compensating-
//! delete pattern described alongside `vector_adapter`: the vector store and
//! the relational catalog aren't updated inside a shared transaction, so any
//! failure after a partial vector insert must clean up those vectors before
//! surfacing the error.

use std::sync::Arc;

use chrono::Utc;

use crate::rag::chunker::TextChunker;
use crate::rag::embedding_dispatch::EmbeddingDispatcher;
use crate::rag::parser;
use crate::rag::pipeline::PipelineRegistry;
use crate::rag::vector_adapter::{EmbeddedChunk, VectorAdapter};
use crate::types::{AppError, ChunkMetadata, Pipeline, PipelineStatus, RagDocument, RagDocumentStatus, Result};

const MAX_FILE_SIZE_BYTES: u64 = 20 * 1024 * 1024;
const ALLOWED_EXTENSIONS: [&str; 8] = ["txt", "pdf", "md", "csv", "json", "docx", "html", "htm"];

/// Orchestrates document ingest for a single pipeline.
pub struct IngestCoordinator {
    registry: Arc<PipelineRegistry>,
    embeddings: Arc<EmbeddingDispatcher>,
}

impl IngestCoordinator {
    pub fn new(registry: Arc<PipelineRegistry>, embeddings: Arc<EmbeddingDispatcher>) -> Self {
        Self { registry, embeddings }
    }

    /// Ingest `bytes` (named `file_name`) into `pipeline_id`. Returns the
    /// created document row plus an optional non-fatal warning (e.g. an
    /// embedding provider fallback).
    pub async fn ingest(
        &self,
        pipeline_id: &str,
        file_name: &str,
        bytes: &[u8],
    ) -> Result<(RagDocument, Option<String>)> {
        if bytes.is_empty() {
            return Err(AppError::EmptyFile(file_name.to_string()));
        }
        if bytes.len() as u64 > MAX_FILE_SIZE_BYTES {
            return Err(AppError::ValidationError(format!(
                "'{file_name}' exceeds the 20MB upload limit"
            )));
        }
        let extension = file_name
            .rsplit('.')
            .next()
            .map(|e| e.to_lowercase())
            .unwrap_or_default();
        if !ALLOWED_EXTENSIONS.contains(&extension.as_str()) {
            return Err(AppError::UnsupportedFileType(extension));
        }

        let pipeline = self.registry.get(pipeline_id).await?;
        let had_prior_documents = pipeline.document_count > 0;
        self.registry.set_status(pipeline_id, PipelineStatus::Ingesting).await?;

        let document_id = uuid::Uuid::new_v4().to_string();
        let started = std::time::Instant::now();
        let outcome = self.run(&pipeline, &document_id, file_name, &extension, bytes).await;
        let processing_time_ms = started.elapsed().as_millis() as u64;

        match outcome {
            Ok((chunk_count, character_count, word_count, warning)) => {
                let document = RagDocument {
                    id: document_id.clone(),
                    pipeline_id: pipeline_id.to_string(),
                    file_name: file_name.to_string(),
                    file_size_bytes: bytes.len() as u64,
                    file_type: extension,
                    chunk_count: chunk_count as u64,
                    character_count,
                    word_count,
                    status: RagDocumentStatus::Processed,
                    error_message: None,
                    processing_time_ms,
                    created_at: Utc::now(),
                };

                if let Err(e) = self.registry.create_document(&document).await {
                    tracing::warn!(
                        pipeline_id, document_id = %document_id, error = %e,
                        "catalog write failed after vector insert, compensating"
                    );
                    self.compensate(pipeline_id, &document_id).await;
                    self.registry
                        .set_status(pipeline_id, fallback_status(had_prior_documents))
                        .await
                        .ok();
                    return Err(e);
                }

                self.registry
                    .add_ingest_counts(pipeline_id, 1, chunk_count as i64)
                    .await?;
                self.registry.set_status(pipeline_id, PipelineStatus::Ready).await?;
                tracing::info!(pipeline_id, document_id = %document_id, chunk_count, "document ingested");
                Ok((document, warning))
            }
            Err(e) => {
                let document = RagDocument {
                    id: document_id.clone(),
                    pipeline_id: pipeline_id.to_string(),
                    file_name: file_name.to_string(),
                    file_size_bytes: bytes.len() as u64,
                    file_type: extension,
                    chunk_count: 0,
                    character_count: 0,
                    word_count: 0,
                    status: RagDocumentStatus::Error,
                    error_message: Some(e.to_string()),
                    processing_time_ms,
                    created_at: Utc::now(),
                };
                let _ = self.registry.create_document(&document).await;
                self.registry
                    .set_status(pipeline_id, fallback_status(had_prior_documents))
                    .await
                    .ok();
                tracing::warn!(pipeline_id, document_id = %document_id, error = %e, "document ingest failed");
                Err(e)
            }
        }
    }

    async fn run(
        &self,
        pipeline: &Pipeline,
        document_id: &str,
        file_name: &str,
        extension: &str,
        bytes: &[u8],
    ) -> Result<(usize, u64, u64, Option<String>)> {
        let text = parser::parse_document(file_name, bytes)?;
        if text.trim().is_empty() {
            return Err(AppError::EmptyText(file_name.to_string()));
        }

        let resolved = self.embeddings.resolve(pipeline.config.embedding.provider);

        if let Some(recorded) = VectorAdapter::recorded_model(self.registry.data_root(), &pipeline.id).await? {
            if recorded != resolved.model_id {
                return Err(AppError::EmbeddingMismatch(format!(
                    "pipeline's collection was embedded with '{recorded}', cannot ingest with '{}'",
                    resolved.model_id
                )));
            }
        }

        let local_service = self.embeddings.local_service(resolved.provider).await;
        let chunker = TextChunker::new(
            pipeline.config.chunking.strategy,
            pipeline.config.chunking.chunk_size,
            pipeline.config.chunking.chunk_overlap,
        );
        let chunks = chunker.chunk(&text, local_service.as_deref()).await;
        if chunks.is_empty() {
            return Err(AppError::EmptyText(file_name.to_string()));
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let vectors = self.embeddings.embed_texts(&resolved, &texts).await?;
        if vectors.len() != chunks.len() {
            return Err(AppError::Internal(
                "embedding dispatcher returned a mismatched vector count".to_string(),
            ));
        }

        let chunk_total = chunks.len();
        let ingested_at = Utc::now();
        let embedded_chunks: Vec<EmbeddedChunk> = chunks
            .iter()
            .zip(vectors.into_iter())
            .map(|(chunk, embedding)| {
                let metadata = ChunkMetadata {
                    file_name: file_name.to_string(),
                    document_id: document_id.to_string(),
                    chunk_index: chunk.index,
                    chunk_total,
                    pipeline_id: pipeline.id.clone(),
                    file_type: extension.to_string(),
                    ingested_at,
                };
                EmbeddedChunk {
                    id: format!("{}_{}_{}", pipeline.id, document_id, chunk.index),
                    embedding,
                    content: chunk.content.clone(),
                    metadata: serde_json::to_value(metadata).unwrap_or(serde_json::Value::Null),
                }
            })
            .collect();

        let adapter = VectorAdapter::open(self.registry.data_root(), &pipeline.id, resolved.dimensions).await?;
        if let Err(e) = adapter.insert_batch(&embedded_chunks).await {
            self.compensate(&pipeline.id, document_id).await;
            return Err(e);
        }
        if let Err(e) = adapter.persist().await {
            self.compensate(&pipeline.id, document_id).await;
            return Err(e);
        }

        if VectorAdapter::recorded_model(self.registry.data_root(), &pipeline.id)
            .await?
            .is_none()
        {
            VectorAdapter::record_model(self.registry.data_root(), &pipeline.id, &resolved.model_id).await?;
        }

        let character_count = text.chars().count() as u64;
        let word_count = text.split_whitespace().count() as u64;
        Ok((chunk_total, character_count, word_count, resolved.warning))
    }

    async fn compensate(&self, pipeline_id: &str, document_id: &str) {
        match VectorAdapter::open(self.registry.data_root(), pipeline_id, 1).await {
            Ok(adapter) => {
                if let Err(e) = adapter.delete_by_document(document_id).await {
                    tracing::error!(pipeline_id, document_id, error = %e, "compensation delete failed");
                } else if let Err(e) = adapter.persist().await {
                    tracing::error!(pipeline_id, document_id, error = %e, "compensation persist failed");
                }
            }
            Err(e) => {
                tracing::error!(pipeline_id, document_id, error = %e, "compensation delete could not open collection");
            }
        }
    }
}

fn fallback_status(had_prior_documents: bool) -> PipelineStatus {
    if had_prior_documents {
        PipelineStatus::Ready
    } else {
        PipelineStatus::Error
    }
}
