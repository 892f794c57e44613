//! Durable pipeline registry.
//!
//! Ties a pipeline's relational catalog row (`db::rag_store`) to its vector
//! collection (`vector_adapter`). The catalog is the source of truth for
//! existence; the vector collection is the source of truth for content, so
//! every operation that touches both follows a fixed order designed to never
//! leave an orphaned collection with no catalog row, or a catalog row
//! pointing at nothing.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;

use crate::db::TursoClient;
use crate::rag::embedding_dispatch::EmbeddingDispatcher;
use crate::rag::vector_adapter::VectorAdapter;
use crate::types::{
    AppError, CreatePipelineRequest, Pipeline, PipelineStatistics, PipelineStatus,
    RagDocument, Result,
};

/// Durable CRUD over pipelines and their documents.
pub struct PipelineRegistry {
    db: Arc<TursoClient>,
    data_root: PathBuf,
}

impl PipelineRegistry {
    pub fn new(db: Arc<TursoClient>, data_root: PathBuf) -> Self {
        Self { db, data_root }
    }

    pub fn data_root(&self) -> &std::path::Path {
        &self.data_root
    }

    /// Validate `request.config`, open a vector collection sized for its
    /// embedding choice, then write the catalog row. Rolls back the
    /// collection if the catalog write fails.
    pub async fn create(
        &self,
        request: CreatePipelineRequest,
        embeddings: &EmbeddingDispatcher,
    ) -> Result<Pipeline> {
        request.config.validate()?;

        let id = uuid::Uuid::new_v4().to_string();
        let resolved = embeddings.resolve(request.config.embedding.provider);

        VectorAdapter::open(&self.data_root, &id, resolved.dimensions).await?;

        let now = Utc::now();
        let pipeline = Pipeline {
            id: id.clone(),
            name: request.name,
            description: request.description,
            status: PipelineStatus::Created,
            config: request.config,
            document_count: 0,
            chunk_count: 0,
            total_queries: 0,
            last_query_at: None,
            created_at: now,
            updated_at: now,
        };

        if let Err(e) = self.db.create_pipeline(&pipeline).await {
            tracing::warn!(pipeline_id = %id, error = %e, "catalog write failed after collection creation, rolling back collection");
            let _ = VectorAdapter::drop_pipeline(&self.data_root, &id).await;
            return Err(e);
        }

        tracing::info!(pipeline_id = %id, name = %pipeline.name, "pipeline created");
        Ok(pipeline)
    }

    pub async fn get(&self, id: &str) -> Result<Pipeline> {
        self.db
            .get_pipeline(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("pipeline '{id}'")))
    }

    pub async fn list(&self) -> Result<Vec<Pipeline>> {
        self.db.list_pipelines().await
    }

    /// Remove the vector collection, then the document rows, then the
    /// pipeline row, in that order, so a failure never leaves vectors with
    /// no owning catalog row.
    pub async fn delete(&self, id: &str) -> Result<()> {
        self.get(id).await?;
        VectorAdapter::drop_pipeline(&self.data_root, id).await?;
        self.db.delete_pipeline(id).await?;
        tracing::info!(pipeline_id = %id, "pipeline deleted");
        Ok(())
    }

    pub async fn set_status(&self, id: &str, status: PipelineStatus) -> Result<()> {
        self.db.update_pipeline_status(id, status).await
    }

    pub async fn add_ingest_counts(&self, id: &str, documents_delta: i64, chunks_delta: i64) -> Result<()> {
        self.db.add_pipeline_ingest_counts(id, documents_delta, chunks_delta).await
    }

    pub async fn record_query(&self, id: &str) -> Result<()> {
        self.db.record_pipeline_query(id).await
    }

    pub async fn create_document(&self, document: &RagDocument) -> Result<()> {
        self.db.create_rag_document(document).await
    }

    pub async fn get_document(&self, id: &str) -> Result<RagDocument> {
        self.db
            .get_rag_document(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("document '{id}'")))
    }

    pub async fn list_documents(&self, pipeline_id: &str) -> Result<Vec<RagDocument>> {
        self.db.list_rag_documents(pipeline_id).await
    }

    /// Delete a document's catalog row and its chunks from the owning
    /// pipeline's vector collection, decrementing pipeline counters.
    pub async fn delete_document(&self, pipeline_id: &str, document_id: &str) -> Result<()> {
        let document = self.get_document(document_id).await?;
        if document.pipeline_id != pipeline_id {
            return Err(AppError::NotFound(format!("document '{document_id}'")));
        }

        let adapter = VectorAdapter::open(&self.data_root, pipeline_id, 1).await;
        // `dimensions` is irrelevant here since the collection already exists;
        // `open` only uses it when creating a brand new collection.
        if let Ok(adapter) = adapter {
            adapter.delete_by_document(document_id).await?;
            adapter.persist().await?;
        }

        self.db.delete_rag_document(document_id).await?;
        self.add_ingest_counts(pipeline_id, -1, -(document.chunk_count as i64)).await?;
        tracing::info!(pipeline_id, document_id, "document deleted");
        Ok(())
    }

    pub async fn stats(&self, id: &str) -> Result<PipelineStatistics> {
        let pipeline = self.get(id).await?;
        Ok(PipelineStatistics {
            pipeline_id: pipeline.id,
            document_count: pipeline.document_count,
            chunk_count: pipeline.chunk_count,
            total_queries: pipeline.total_queries,
            last_query_at: pipeline.last_query_at,
            status: pipeline.status,
        })
    }
}
