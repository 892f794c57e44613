//! Composition root for the RAG pipeline: wires the registry, ingest
//! coordinator, retriever, reranker and answer synthesizer into the single
//! query/ingest surface the API handlers call.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;

use crate::rag::embedding_dispatch::EmbeddingDispatcher;
use crate::rag::ingest::IngestCoordinator;
use crate::rag::pipeline::PipelineRegistry;
use crate::rag::reranker::Reranker;
use crate::rag::retriever::Retriever;
use crate::rag::synthesizer::AnswerSynthesizer;
use crate::types::{
    CreatePipelineRequest, MetadataFilter, Pipeline, RagDocument, RagQueryRequest, RagQueryResponse,
    Result,
};

/// Top-level handle shared across the API layer: one instance per server
/// process, holding the process-resident embedding/LLM clients and the
/// pipeline catalog.
pub struct RagEngine {
    registry: Arc<PipelineRegistry>,
    embeddings: Arc<EmbeddingDispatcher>,
    ingest: IngestCoordinator,
    retriever: Retriever,
    reranker: Reranker,
    synthesizer: AnswerSynthesizer,
    data_root: PathBuf,
}

impl RagEngine {
    pub fn new(registry: Arc<PipelineRegistry>) -> Self {
        let embeddings = Arc::new(EmbeddingDispatcher::new());
        let data_root = registry.data_root().to_path_buf();
        Self {
            ingest: IngestCoordinator::new(Arc::clone(&registry), Arc::clone(&embeddings)),
            retriever: Retriever::new(Arc::clone(&embeddings)),
            reranker: Reranker::new(),
            synthesizer: AnswerSynthesizer::new(),
            registry,
            embeddings,
            data_root,
        }
    }

    pub fn registry(&self) -> &Arc<PipelineRegistry> {
        &self.registry
    }

    pub async fn create_pipeline(&self, request: CreatePipelineRequest) -> Result<Pipeline> {
        self.registry.create(request, &self.embeddings).await
    }

    pub async fn ingest_document(
        &self,
        pipeline_id: &str,
        file_name: &str,
        bytes: &[u8],
    ) -> Result<(RagDocument, Option<String>)> {
        self.ingest.ingest(pipeline_id, file_name, bytes).await
    }

    /// Run a query end to end: retrieve (C7), optionally rerank (C8),
    /// optionally synthesize an answer (C9), and record the query against the
    /// pipeline's stats.
    pub async fn query(&self, pipeline_id: &str, request: RagQueryRequest) -> Result<RagQueryResponse> {
        let started = Instant::now();
        let pipeline = self.registry.get(pipeline_id).await?;

        let top_k = request.top_k.unwrap_or(pipeline.config.retrieval.top_k);
        let score_threshold = request.score_threshold.or(pipeline.config.retrieval.score_threshold);
        let reranking_enabled = request.rerank.unwrap_or(pipeline.config.retrieval.reranking_enabled);
        let metadata_filters: &[MetadataFilter] = &request.metadata_filters;

        let retrieved = self
            .retriever
            .retrieve(
                &self.data_root,
                &pipeline,
                &request.query,
                top_k,
                score_threshold,
                metadata_filters,
                reranking_enabled,
            )
            .await?;

        let (results, reranking_applied) = if reranking_enabled && !retrieved.is_empty() {
            self.reranker
                .rerank(
                    &request.query,
                    retrieved,
                    pipeline.config.retrieval.reranker_model,
                    pipeline.config.llm.provider,
                    pipeline.config.retrieval.reranking_top_k.min(top_k).max(1),
                )
                .await
        } else {
            let mut results = retrieved;
            results.truncate(top_k);
            (results, false)
        };

        let generate_answer = request.generate_answer.unwrap_or(pipeline.config.llm.generate_answer);
        let answer = if generate_answer {
            self.synthesizer
                .synthesize(
                    &request.query,
                    &results,
                    pipeline.config.llm.provider,
                    pipeline.config.llm.model.clone(),
                )
                .await
        } else {
            None
        };

        self.registry.record_query(pipeline_id).await?;

        Ok(RagQueryResponse {
            total_results: results.len(),
            results,
            reranking_applied,
            answer,
            warning: None,
            duration_ms: started.elapsed().as_millis() as u64,
        })
    }

    pub async fn last_updated(&self, pipeline_id: &str) -> Result<chrono::DateTime<Utc>> {
        Ok(self.registry.get(pipeline_id).await?.updated_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PipelineLLMConfig, RetrievalConfig};

    #[test]
    fn reranking_top_k_is_at_least_one_and_capped_by_requested_top_k() {
        let retrieval = RetrievalConfig {
            top_k: 5,
            reranking_top_k: 20,
            ..Default::default()
        };
        let effective = retrieval.reranking_top_k.min(5).max(1);
        assert_eq!(effective, 5);
        let _ = PipelineLLMConfig::default();
    }
}
