//! Answer synthesis: assembles a grounded prompt from retrieved chunks and
//! dispatches it to an LLM provider, with provider fallback handled by
//! [`crate::rag::llm_dispatch::LLMDispatcher`].
//!
//! Absence of an answer (no provider configured, or every provider failed)
//! is not a query failure: callers get `None` back and still see their
//! retrieved chunks.

use crate::rag::llm_dispatch::{GenerationRequest, LLMDispatcher};
use crate::types::{LLMProvider, RetrievedChunk};

const SYSTEM_PROMPT: &str = "You are a retrieval-augmented assistant. Answer the user's question \
using ONLY the context provided below. If the context does not contain enough information to \
answer, say so explicitly rather than guessing. Format your answer in Markdown and cite the \
sources you used inline, referencing them as [Source: file_name, Chunk i]. Never fabricate facts \
that are not present in the context.";

const MAX_TOKENS: u32 = 1500;
const TEMPERATURE: f32 = 0.3;

/// Builds the grounded-answer prompt and dispatches it through C10.
pub struct AnswerSynthesizer {
    llm: LLMDispatcher,
}

impl Default for AnswerSynthesizer {
    fn default() -> Self {
        Self::new()
    }
}

impl AnswerSynthesizer {
    pub fn new() -> Self {
        Self { llm: LLMDispatcher::new() }
    }

    /// Synthesize an answer to `query` grounded in `chunks`. Returns `None`
    /// (never an error) if no provider could be reached.
    pub async fn synthesize(
        &self,
        query: &str,
        chunks: &[RetrievedChunk],
        provider: LLMProvider,
        model: Option<String>,
    ) -> Option<String> {
        if chunks.is_empty() {
            return None;
        }

        let context = build_context_block(chunks);
        let user_prompt = format!(
            "Context:\n{context}\n\nQuestion: {query}\n\nAnswer the question using only the context above."
        );

        let request = GenerationRequest {
            system_prompt: SYSTEM_PROMPT.to_string(),
            user_prompt,
            model,
            max_tokens: MAX_TOKENS,
            temperature: TEMPERATURE,
        };

        match self.llm.generate(provider, &request).await {
            Ok(answer) => Some(answer),
            Err(e) => {
                tracing::warn!(error = %e, "answer synthesis failed for all providers, returning no answer");
                None
            }
        }
    }
}

/// Renders each chunk as `[Source: file_name, Chunk i, Score: s.sss]` followed
/// by its content, in retrieval order.
fn build_context_block(chunks: &[RetrievedChunk]) -> String {
    chunks
        .iter()
        .enumerate()
        .map(|(i, chunk)| {
            let file_name = chunk
                .metadata
                .get("file_name")
                .and_then(|v| v.as_str())
                .unwrap_or("unknown");
            let chunk_index = chunk
                .metadata
                .get("chunk_index")
                .and_then(|v| v.as_u64())
                .unwrap_or(i as u64);
            format!(
                "[Source: {file_name}, Chunk {chunk_index}, Score: {:.3}]\n{}",
                chunk.score, chunk.content
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn chunk(file_name: &str, chunk_index: u64, score: f32, content: &str) -> RetrievedChunk {
        RetrievedChunk {
            content: content.to_string(),
            metadata: json!({ "file_name": file_name, "chunk_index": chunk_index }),
            score,
            rerank_score: None,
        }
    }

    #[test]
    fn context_block_formats_source_header() {
        let chunks = vec![chunk("a.txt", 0, 0.875, "hello world")];
        let block = build_context_block(&chunks);
        assert!(block.contains("[Source: a.txt, Chunk 0, Score: 0.875]"));
        assert!(block.contains("hello world"));
    }

    #[tokio::test]
    async fn synthesize_returns_none_for_empty_chunks() {
        let synthesizer = AnswerSynthesizer::new();
        let answer = synthesizer
            .synthesize("what happened?", &[], LLMProvider::Gemini, None)
            .await;
        assert!(answer.is_none());
    }
}
