//! Reranking for improving retrieval relevance.
//!
//! Two strategies back [`RerankerModel`]: a local cross-encoder
//! (`RerankerModel::Qwen3`), loaded once as a process-resident singleton the
//! same way `rag::embeddings` loads its fastembed models, and an LLM-scored
//! fallback (`RerankerModel::Llm`) that asks a chat model to score every
//! candidate in a single prompt. Either way, reranking never turns a query
//! into a hard failure: any error here is swallowed and the caller gets the
//! unreranked candidates back with `reranking_applied = false`.

use std::sync::Arc;

use fastembed::{RerankInitOptions, RerankerModel as FastEmbedRerankerModel, TextRerank};
use tokio::sync::{Mutex, OnceCell};

use crate::rag::llm_dispatch::{GenerationRequest, LLMDispatcher};
use crate::types::{AppError, LLMProvider, RerankerModel, Result, RetrievedChunk};

/// Reranking never considers more than this many candidates, matching the
/// retriever's own fetch cap (`rag::retriever::RERANK_FETCH_CAP`).
const MAX_CANDIDATES: usize = 10;
/// Candidate content is truncated to this many characters before being sent
/// to the cross-encoder or the LLM, so long chunks don't blow out the prompt.
const CANDIDATE_PREVIEW_CHARS: usize = 500;
const LLM_CANDIDATE_PREVIEW_CHARS: usize = 300;

static CROSS_ENCODER: OnceCell<Arc<Mutex<TextRerank>>> = OnceCell::const_new();

async fn cross_encoder() -> Result<Arc<Mutex<TextRerank>>> {
    CROSS_ENCODER
        .get_or_try_init(|| async {
            tokio::task::spawn_blocking(|| {
                // fastembed has no Qwen3 reranker release; BGERerankerBase is the
                // closest-quality cross-encoder it ships (see DESIGN.md).
                let options = RerankInitOptions::new(FastEmbedRerankerModel::BGERerankerBase)
                    .with_show_download_progress(false);
                let model = TextRerank::try_new(options)
                    .map_err(|e| AppError::Internal(format!("failed to load cross-encoder reranker: {e}")))?;
                Ok(Arc::new(Mutex::new(model)))
            })
            .await
            .map_err(|e| AppError::Internal(format!("reranker init task failed: {e}")))?
        })
        .await
        .map(Arc::clone)
}

/// Reranks retrieved chunks for a query using `model`, returning the
/// reordered list and whether reranking actually took effect.
pub struct Reranker {
    llm: LLMDispatcher,
}

impl Default for Reranker {
    fn default() -> Self {
        Self::new()
    }
}

impl Reranker {
    pub fn new() -> Self {
        Self { llm: LLMDispatcher::new() }
    }

    /// Rerank `chunks` for `query`, keeping at most `top_k` of them. Input
    /// beyond [`MAX_CANDIDATES`] is dropped before scoring (the retriever
    /// already caps its fetch near this bound, so this is a backstop, not the
    /// primary limiter). On any internal failure, returns the original
    /// `chunks` truncated to `top_k` with `reranking_applied = false`.
    pub async fn rerank(
        &self,
        query: &str,
        mut chunks: Vec<RetrievedChunk>,
        model: RerankerModel,
        llm_provider: LLMProvider,
        top_k: usize,
    ) -> (Vec<RetrievedChunk>, bool) {
        if chunks.is_empty() {
            return (chunks, false);
        }
        if chunks.len() > MAX_CANDIDATES {
            chunks.truncate(MAX_CANDIDATES);
        }

        let result = match model {
            RerankerModel::Qwen3 => self.rerank_cross_encoder(query, &chunks).await,
            RerankerModel::Llm => self.rerank_llm(query, &chunks, llm_provider).await,
        };

        match result {
            Ok(mut scores) => {
                for (chunk, score) in chunks.iter_mut().zip(scores.drain(..)) {
                    chunk.rerank_score = Some(score);
                }
                chunks.sort_by(|a, b| {
                    b.rerank_score
                        .partial_cmp(&a.rerank_score)
                        .unwrap_or(std::cmp::Ordering::Equal)
                });
                chunks.truncate(top_k);
                (chunks, true)
            }
            Err(e) => {
                tracing::warn!(error = %e, %model, "reranking failed, returning unreranked results");
                chunks.truncate(top_k);
                (chunks, false)
            }
        }
    }

    async fn rerank_cross_encoder(&self, query: &str, chunks: &[RetrievedChunk]) -> Result<Vec<f32>> {
        let model = cross_encoder().await?;
        let documents: Vec<String> = chunks.iter().map(|c| preview(&c.content, CANDIDATE_PREVIEW_CHARS)).collect();
        let query = query.to_string();

        let scored = tokio::task::spawn_blocking(move || {
            let mut model = model.blocking_lock();
            model.rerank(query, &documents, true, None)
        })
        .await
        .map_err(|e| AppError::Internal(format!("reranker task failed: {e}")))?
        .map_err(|e| AppError::Internal(format!("reranking failed: {e}")))?;

        let mut scores = vec![0.0f32; chunks.len()];
        for result in scored {
            if let Some(slot) = scores.get_mut(result.index) {
                *slot = result.score;
            }
        }
        Ok(scores)
    }

    async fn rerank_llm(&self, query: &str, chunks: &[RetrievedChunk], provider: LLMProvider) -> Result<Vec<f32>> {
        let prompt = build_llm_prompt(query, chunks);
        let request = GenerationRequest {
            system_prompt: "You are a relevance-scoring assistant. Respond with ONLY a JSON array \
                of numbers, one per candidate, in the same order as given, each between 0.0 and 1.0. \
                No prose, no markdown fencing."
                .to_string(),
            user_prompt: prompt,
            model: None,
            max_tokens: 200,
            temperature: 0.0,
        };

        let response = self.llm.generate(provider, &request).await?;
        let scores = parse_score_array(&response)?;
        if scores.len() != chunks.len() {
            return Err(AppError::Internal(format!(
                "LLM reranker returned {} scores for {} candidates",
                scores.len(),
                chunks.len()
            )));
        }
        Ok(scores)
    }
}

fn preview(content: &str, max_chars: usize) -> String {
    content.chars().take(max_chars).collect()
}

fn build_llm_prompt(query: &str, chunks: &[RetrievedChunk]) -> String {
    let mut prompt = format!("Query: {query}\n\nCandidates:\n");
    for (i, chunk) in chunks.iter().enumerate() {
        prompt.push_str(&format!(
            "{}. {}\n",
            i + 1,
            preview(&chunk.content, LLM_CANDIDATE_PREVIEW_CHARS)
        ));
    }
    prompt.push_str("\nScore each candidate's relevance to the query as a JSON array of floats, in order.");
    prompt
}

fn parse_score_array(response: &str) -> Result<Vec<f32>> {
    let start = response.find('[').ok_or_else(|| AppError::External("LLM reranker response had no array".to_string()))?;
    let end = response
        .rfind(']')
        .ok_or_else(|| AppError::External("LLM reranker response had no array".to_string()))?;
    let slice = &response[start..=end];
    serde_json::from_str::<Vec<f32>>(slice)
        .map_err(|e| AppError::External(format!("LLM reranker response was not a numeric array: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn chunk(content: &str, score: f32) -> RetrievedChunk {
        RetrievedChunk {
            content: content.to_string(),
            metadata: json!({}),
            score,
            rerank_score: None,
        }
    }

    #[tokio::test]
    async fn rerank_empty_is_a_noop() {
        let reranker = Reranker::new();
        let (results, applied) = reranker
            .rerank("q", Vec::new(), RerankerModel::Qwen3, LLMProvider::Gemini, 5)
            .await;
        assert!(results.is_empty());
        assert!(!applied);
    }

    #[test]
    fn parse_score_array_extracts_bracketed_json_from_chatty_response() {
        let response = "Sure, here are the scores:\n[0.9, 0.2, 0.5]\nHope that helps!";
        let scores = parse_score_array(response).unwrap();
        assert_eq!(scores, vec![0.9, 0.2, 0.5]);
    }

    #[test]
    fn parse_score_array_rejects_missing_brackets() {
        assert!(parse_score_array("no array here").is_err());
    }

    #[test]
    fn candidates_beyond_cap_are_truncated() {
        let chunks: Vec<RetrievedChunk> = (0..15).map(|i| chunk(&format!("c{i}"), 0.5)).collect();
        assert_eq!(chunks.len(), 15);
        let mut truncated = chunks;
        truncated.truncate(MAX_CANDIDATES);
        assert_eq!(truncated.len(), MAX_CANDIDATES);
    }

    #[test]
    fn preview_truncates_to_char_budget() {
        let long = "a".repeat(1000);
        assert_eq!(preview(&long, CANDIDATE_PREVIEW_CHARS).chars().count(), CANDIDATE_PREVIEW_CHARS);
    }
}
