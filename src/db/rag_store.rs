//! Durable relational storage for RAG pipelines and their ingested documents.
//!
//! Chunk content and embeddings live in the vector store; this module only
//! keeps the catalog rows (pipeline config + lifecycle, per-document ingest
//! record) needed to list, configure and audit pipelines across restarts.

use crate::types::{
    AppError, Pipeline, PipelineConfig, PipelineStatus, RagDocument, RagDocumentStatus, Result,
};
use chrono::{DateTime, TimeZone, Utc};

use super::turso::TursoClient;

impl TursoClient {
    /// Create the `rag_pipelines` and `rag_documents` tables if they don't exist yet.
    pub async fn initialize_rag_schema(&self) -> Result<()> {
        let conn = self.connection()?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS rag_pipelines (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                description TEXT,
                status TEXT NOT NULL,
                config TEXT NOT NULL,
                document_count INTEGER NOT NULL DEFAULT 0,
                chunk_count INTEGER NOT NULL DEFAULT 0,
                total_queries INTEGER NOT NULL DEFAULT 0,
                last_query_at INTEGER,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            )",
            (),
        )
        .await
        .map_err(|e| AppError::Database(format!("Failed to create rag_pipelines table: {e}")))?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS rag_documents (
                id TEXT PRIMARY KEY,
                pipeline_id TEXT NOT NULL,
                file_name TEXT NOT NULL,
                file_size_bytes INTEGER NOT NULL,
                file_type TEXT NOT NULL,
                chunk_count INTEGER NOT NULL,
                character_count INTEGER NOT NULL,
                word_count INTEGER NOT NULL,
                status TEXT NOT NULL,
                error_message TEXT,
                processing_time_ms INTEGER NOT NULL,
                created_at INTEGER NOT NULL,
                FOREIGN KEY (pipeline_id) REFERENCES rag_pipelines(id)
            )",
            (),
        )
        .await
        .map_err(|e| AppError::Database(format!("Failed to create rag_documents table: {e}")))?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_rag_documents_pipeline ON rag_documents(pipeline_id)",
            (),
        )
        .await
        .map_err(|e| AppError::Database(format!("Failed to create rag_documents index: {e}")))?;

        Ok(())
    }

    pub async fn create_pipeline(&self, pipeline: &Pipeline) -> Result<()> {
        let conn = self.connection()?;
        let config_json = serde_json::to_string(&pipeline.config)
            .map_err(|e| AppError::Internal(format!("Failed to serialize pipeline config: {e}")))?;

        conn.execute(
            "INSERT INTO rag_pipelines
                (id, name, description, status, config, document_count, chunk_count,
                 total_queries, last_query_at, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            (
                pipeline.id.as_str(),
                pipeline.name.as_str(),
                pipeline.description.as_deref(),
                pipeline.status.to_string(),
                config_json,
                pipeline.document_count as i64,
                pipeline.chunk_count as i64,
                pipeline.total_queries as i64,
                pipeline.last_query_at.map(|t| t.timestamp()),
                pipeline.created_at.timestamp(),
                pipeline.updated_at.timestamp(),
            ),
        )
        .await
        .map_err(|e| AppError::Database(format!("Failed to create pipeline: {e}")))?;

        Ok(())
    }

    pub async fn get_pipeline(&self, id: &str) -> Result<Option<Pipeline>> {
        let conn = self.connection()?;

        let mut rows = conn
            .query(
                "SELECT id, name, description, status, config, document_count, chunk_count,
                        total_queries, last_query_at, created_at, updated_at
                 FROM rag_pipelines WHERE id = ?",
                [id],
            )
            .await
            .map_err(|e| AppError::Database(format!("Failed to query pipeline: {e}")))?;

        if let Some(row) = rows
            .next()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?
        {
            Ok(Some(row_to_pipeline(&row)?))
        } else {
            Ok(None)
        }
    }

    pub async fn list_pipelines(&self) -> Result<Vec<Pipeline>> {
        let conn = self.connection()?;

        let mut rows = conn
            .query(
                "SELECT id, name, description, status, config, document_count, chunk_count,
                        total_queries, last_query_at, created_at, updated_at
                 FROM rag_pipelines ORDER BY created_at DESC",
                (),
            )
            .await
            .map_err(|e| AppError::Database(format!("Failed to list pipelines: {e}")))?;

        let mut pipelines = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?
        {
            pipelines.push(row_to_pipeline(&row)?);
        }

        Ok(pipelines)
    }

    pub async fn update_pipeline_status(&self, id: &str, status: PipelineStatus) -> Result<()> {
        let conn = self.connection()?;
        let now = Utc::now().timestamp();

        let changed = conn
            .execute(
                "UPDATE rag_pipelines SET status = ?, updated_at = ? WHERE id = ?",
                (status.to_string(), now, id),
            )
            .await
            .map_err(|e| AppError::Database(format!("Failed to update pipeline status: {e}")))?;

        if changed == 0 {
            return Err(AppError::NotFound(format!("pipeline '{id}'")));
        }
        Ok(())
    }

    /// Apply deltas from a finished ingest to the pipeline's running totals.
    pub async fn add_pipeline_ingest_counts(
        &self,
        id: &str,
        documents_delta: i64,
        chunks_delta: i64,
    ) -> Result<()> {
        let conn = self.connection()?;
        let now = Utc::now().timestamp();

        let changed = conn
            .execute(
                "UPDATE rag_pipelines
                 SET document_count = document_count + ?,
                     chunk_count = chunk_count + ?,
                     updated_at = ?
                 WHERE id = ?",
                (documents_delta, chunks_delta, now, id),
            )
            .await
            .map_err(|e| AppError::Database(format!("Failed to update pipeline counts: {e}")))?;

        if changed == 0 {
            return Err(AppError::NotFound(format!("pipeline '{id}'")));
        }
        Ok(())
    }

    pub async fn record_pipeline_query(&self, id: &str) -> Result<()> {
        let conn = self.connection()?;
        let now = Utc::now().timestamp();

        let changed = conn
            .execute(
                "UPDATE rag_pipelines
                 SET total_queries = total_queries + 1, last_query_at = ?
                 WHERE id = ?",
                (now, id),
            )
            .await
            .map_err(|e| AppError::Database(format!("Failed to record pipeline query: {e}")))?;

        if changed == 0 {
            return Err(AppError::NotFound(format!("pipeline '{id}'")));
        }
        Ok(())
    }

    pub async fn delete_pipeline(&self, id: &str) -> Result<()> {
        let conn = self.connection()?;

        conn.execute("DELETE FROM rag_documents WHERE pipeline_id = ?", [id])
            .await
            .map_err(|e| AppError::Database(format!("Failed to delete pipeline documents: {e}")))?;

        let changed = conn
            .execute("DELETE FROM rag_pipelines WHERE id = ?", [id])
            .await
            .map_err(|e| AppError::Database(format!("Failed to delete pipeline: {e}")))?;

        if changed == 0 {
            return Err(AppError::NotFound(format!("pipeline '{id}'")));
        }
        Ok(())
    }

    pub async fn create_rag_document(&self, document: &RagDocument) -> Result<()> {
        let conn = self.connection()?;

        conn.execute(
            "INSERT INTO rag_documents
                (id, pipeline_id, file_name, file_size_bytes, file_type, chunk_count,
                 character_count, word_count, status, error_message, processing_time_ms,
                 created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            (
                document.id.as_str(),
                document.pipeline_id.as_str(),
                document.file_name.as_str(),
                document.file_size_bytes as i64,
                document.file_type.as_str(),
                document.chunk_count as i64,
                document.character_count as i64,
                document.word_count as i64,
                document.status.to_string(),
                document.error_message.as_deref(),
                document.processing_time_ms as i64,
                document.created_at.timestamp(),
            ),
        )
        .await
        .map_err(|e| AppError::Database(format!("Failed to create rag document: {e}")))?;

        Ok(())
    }

    pub async fn get_rag_document(&self, id: &str) -> Result<Option<RagDocument>> {
        let conn = self.connection()?;

        let mut rows = conn
            .query(
                "SELECT id, pipeline_id, file_name, file_size_bytes, file_type, chunk_count,
                        character_count, word_count, status, error_message, processing_time_ms,
                        created_at
                 FROM rag_documents WHERE id = ?",
                [id],
            )
            .await
            .map_err(|e| AppError::Database(format!("Failed to query rag document: {e}")))?;

        if let Some(row) = rows
            .next()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?
        {
            Ok(Some(row_to_document(&row)?))
        } else {
            Ok(None)
        }
    }

    pub async fn list_rag_documents(&self, pipeline_id: &str) -> Result<Vec<RagDocument>> {
        let conn = self.connection()?;

        let mut rows = conn
            .query(
                "SELECT id, pipeline_id, file_name, file_size_bytes, file_type, chunk_count,
                        character_count, word_count, status, error_message, processing_time_ms,
                        created_at
                 FROM rag_documents WHERE pipeline_id = ? ORDER BY created_at DESC",
                [pipeline_id],
            )
            .await
            .map_err(|e| AppError::Database(format!("Failed to list rag documents: {e}")))?;

        let mut documents = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?
        {
            documents.push(row_to_document(&row)?);
        }

        Ok(documents)
    }

    pub async fn delete_rag_document(&self, id: &str) -> Result<()> {
        let conn = self.connection()?;

        let changed = conn
            .execute("DELETE FROM rag_documents WHERE id = ?", [id])
            .await
            .map_err(|e| AppError::Database(format!("Failed to delete rag document: {e}")))?;

        if changed == 0 {
            return Err(AppError::NotFound(format!("document '{id}'")));
        }
        Ok(())
    }
}

fn timestamp_to_utc(secs: i64) -> Result<DateTime<Utc>> {
    Utc.timestamp_opt(secs, 0)
        .single()
        .ok_or_else(|| AppError::Internal(format!("corrupt timestamp in catalog: {secs}")))
}

fn row_to_pipeline(row: &libsql::Row) -> Result<Pipeline> {
    let db_err = |e: libsql::Error| AppError::Database(e.to_string());

    let status: String = row.get(3).map_err(db_err)?;
    let config_json: String = row.get(4).map_err(db_err)?;
    let last_query_at: Option<i64> = row.get(8).map_err(db_err)?;

    let config: PipelineConfig = serde_json::from_str(&config_json)
        .map_err(|e| AppError::Internal(format!("corrupt pipeline config in catalog: {e}")))?;

    Ok(Pipeline {
        id: row.get(0).map_err(db_err)?,
        name: row.get(1).map_err(db_err)?,
        description: row.get(2).map_err(db_err)?,
        status: status.parse()?,
        config,
        document_count: {
            let v: i64 = row.get(5).map_err(db_err)?;
            v as u64
        },
        chunk_count: {
            let v: i64 = row.get(6).map_err(db_err)?;
            v as u64
        },
        total_queries: {
            let v: i64 = row.get(7).map_err(db_err)?;
            v as u64
        },
        last_query_at: last_query_at.map(timestamp_to_utc).transpose()?,
        created_at: {
            let v: i64 = row.get(9).map_err(db_err)?;
            timestamp_to_utc(v)?
        },
        updated_at: {
            let v: i64 = row.get(10).map_err(db_err)?;
            timestamp_to_utc(v)?
        },
    })
}

fn row_to_document(row: &libsql::Row) -> Result<RagDocument> {
    let db_err = |e: libsql::Error| AppError::Database(e.to_string());

    let status: String = row.get(8).map_err(db_err)?;
    let created_at: i64 = row.get(11).map_err(db_err)?;

    Ok(RagDocument {
        id: row.get(0).map_err(db_err)?,
        pipeline_id: row.get(1).map_err(db_err)?,
        file_name: row.get(2).map_err(db_err)?,
        file_size_bytes: {
            let v: i64 = row.get(3).map_err(db_err)?;
            v as u64
        },
        file_type: row.get(4).map_err(db_err)?,
        chunk_count: {
            let v: i64 = row.get(5).map_err(db_err)?;
            v as u64
        },
        character_count: {
            let v: i64 = row.get(6).map_err(db_err)?;
            v as u64
        },
        word_count: {
            let v: i64 = row.get(7).map_err(db_err)?;
            v as u64
        },
        status: status.parse::<RagDocumentStatus>()?,
        error_message: row.get(9).map_err(db_err)?,
        processing_time_ms: {
            let v: i64 = row.get(10).map_err(db_err)?;
            v as u64
        },
        created_at: timestamp_to_utc(created_at)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ChunkingConfig, EmbeddingConfig, LLMProvider, PipelineLLMConfig, RetrievalConfig, VectorStoreConfig};

    async fn memory_client() -> TursoClient {
        let client = TursoClient::new_local(":memory:")
            .await
            .expect("in-memory turso client");
        client
            .initialize_rag_schema()
            .await
            .expect("schema init");
        client
    }

    fn sample_pipeline(id: &str) -> Pipeline {
        let now = Utc::now();
        Pipeline {
            id: id.to_string(),
            name: "docs".to_string(),
            description: Some("test pipeline".to_string()),
            status: PipelineStatus::Created,
            config: PipelineConfig {
                chunking: ChunkingConfig::default(),
                embedding: EmbeddingConfig::default(),
                vector_store: VectorStoreConfig::default(),
                retrieval: RetrievalConfig::default(),
                llm: PipelineLLMConfig {
                    provider: LLMProvider::Gemini,
                    model: None,
                    generate_answer: false,
                },
            },
            document_count: 0,
            chunk_count: 0,
            total_queries: 0,
            last_query_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn create_and_fetch_pipeline_round_trips() {
        let client = memory_client().await;
        let pipeline = sample_pipeline("pipe-1");
        client.create_pipeline(&pipeline).await.unwrap();

        let fetched = client.get_pipeline("pipe-1").await.unwrap().unwrap();
        assert_eq!(fetched.name, "docs");
        assert_eq!(fetched.status, PipelineStatus::Created);
        assert_eq!(fetched.config.chunking.chunk_size, 1000);
    }

    #[tokio::test]
    async fn updating_status_and_counts_persists() {
        let client = memory_client().await;
        client.create_pipeline(&sample_pipeline("pipe-2")).await.unwrap();

        client
            .update_pipeline_status("pipe-2", PipelineStatus::Ready)
            .await
            .unwrap();
        client
            .add_pipeline_ingest_counts("pipe-2", 2, 17)
            .await
            .unwrap();
        client.record_pipeline_query("pipe-2").await.unwrap();

        let fetched = client.get_pipeline("pipe-2").await.unwrap().unwrap();
        assert_eq!(fetched.status, PipelineStatus::Ready);
        assert_eq!(fetched.document_count, 2);
        assert_eq!(fetched.chunk_count, 17);
        assert_eq!(fetched.total_queries, 1);
        assert!(fetched.last_query_at.is_some());
    }

    #[tokio::test]
    async fn deleting_pipeline_removes_its_documents() {
        let client = memory_client().await;
        client.create_pipeline(&sample_pipeline("pipe-3")).await.unwrap();

        let doc = RagDocument {
            id: "doc-1".to_string(),
            pipeline_id: "pipe-3".to_string(),
            file_name: "a.txt".to_string(),
            file_size_bytes: 10,
            file_type: "txt".to_string(),
            chunk_count: 1,
            character_count: 10,
            word_count: 2,
            status: RagDocumentStatus::Processed,
            error_message: None,
            processing_time_ms: 5,
            created_at: Utc::now(),
        };
        client.create_rag_document(&doc).await.unwrap();
        assert_eq!(client.list_rag_documents("pipe-3").await.unwrap().len(), 1);

        client.delete_pipeline("pipe-3").await.unwrap();
        assert!(client.get_pipeline("pipe-3").await.unwrap().is_none());
        assert_eq!(client.list_rag_documents("pipe-3").await.unwrap().len(), 0);
    }
}
