//! Query-time retrieval: embed the query, search the pipeline's vector
//! collection, apply the score threshold, and hand candidates to the
//! reranker/synthesizer stages.
//!
//! Over-fetches by a small, fixed margin when reranking is enabled so the
//! reranker has a few extra candidates to reorder, capped well below the
//! reranker's own 10-candidate input limit (`rag::reranker`).

use std::sync::Arc;

use crate::rag::embedding_dispatch::EmbeddingDispatcher;
use crate::rag::vector_adapter::{search_result_content, search_result_metadata_json, VectorAdapter};
use crate::types::{AppError, MetadataFilter, Pipeline, PipelineStatus, Result, RetrievedChunk};

/// A retriever fetch widens `top_k` by up to this many extra candidates when
/// reranking is enabled, capped at this absolute ceiling.
const RERANK_FETCH_MARGIN: usize = 5;
const RERANK_FETCH_CAP: usize = 15;

/// Embeds a query, runs ANN search against a pipeline's collection, and
/// filters by score threshold. Reranking and answer synthesis are separate
/// stages composed on top of this in [`crate::rag::engine`].
pub struct Retriever {
    embeddings: Arc<EmbeddingDispatcher>,
}

impl Retriever {
    pub fn new(embeddings: Arc<EmbeddingDispatcher>) -> Self {
        Self { embeddings }
    }

    /// Run the ANN search leg of a query: `pipeline` must be `READY`.
    /// `requested_top_k` is the caller's `top_k` (or the pipeline's default);
    /// `fetch_k` is computed here from whether reranking is requested.
    pub async fn retrieve(
        &self,
        data_root: &std::path::Path,
        pipeline: &Pipeline,
        query: &str,
        requested_top_k: usize,
        score_threshold: Option<f32>,
        metadata_filters: &[MetadataFilter],
        reranking_enabled: bool,
    ) -> Result<Vec<RetrievedChunk>> {
        if pipeline.status != PipelineStatus::Ready {
            return Err(AppError::PipelineNotReady(format!(
                "pipeline '{}' is '{}', not ready for queries",
                pipeline.id, pipeline.status
            )));
        }

        let fetch_k = if reranking_enabled {
            (requested_top_k + RERANK_FETCH_MARGIN).min(RERANK_FETCH_CAP)
        } else {
            requested_top_k
        };

        let resolved = self.embeddings.resolve(pipeline.config.embedding.provider);
        let adapter = VectorAdapter::open(data_root, &pipeline.id, resolved.dimensions).await?;

        let count = adapter.count()? as usize;
        if count == 0 {
            return Ok(Vec::new());
        }
        let limit = fetch_k.min(count);

        let query_vectors = self.embeddings.embed_texts(&resolved, &[query.to_string()]).await?;
        let query_vector = query_vectors
            .into_iter()
            .next()
            .ok_or_else(|| AppError::Internal("embedding dispatcher returned no query vector".to_string()))?;

        let hits = adapter.search(&query_vector, limit, metadata_filters).await?;

        let threshold = score_threshold.unwrap_or(0.0);
        let results = hits
            .into_iter()
            .map(|hit| RetrievedChunk {
                content: search_result_content(&hit),
                metadata: search_result_metadata_json(&hit),
                score: hit.score.clamp(0.0, 1.0),
                rerank_score: None,
            })
            .filter(|chunk| chunk.score >= threshold)
            .collect();

        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_k_widens_when_reranking_and_respects_cap() {
        let widened = (5 + RERANK_FETCH_MARGIN).min(RERANK_FETCH_CAP);
        assert_eq!(widened, 10);
        let capped = (50 + RERANK_FETCH_MARGIN).min(RERANK_FETCH_CAP);
        assert_eq!(capped, RERANK_FETCH_CAP);
    }
}
