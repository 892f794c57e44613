//! Text chunking for RAG pipeline ingestion.
//!
//! Implements the five strategies a pipeline can select for splitting parsed
//! document text into the units that get embedded and stored: fixed-size,
//! recursive separator cascade, sentence, paragraph, and embedding-based
//! semantic chunking.

use crate::rag::embeddings::EmbeddingService;
use crate::types::PipelineChunkingStrategy;

/// A single chunk produced by the chunker, in document order.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    pub index: usize,
    pub content: String,
}

const RECURSIVE_SEPARATORS: [&str; 4] = ["\n\n", "\n", ". ", " "];

/// Splits text per a pipeline's chunking configuration.
#[derive(Debug, Clone, Default)]
pub struct TextChunker {
    strategy: PipelineChunkingStrategy,
    chunk_size: usize,
    chunk_overlap: usize,
}

impl TextChunker {
    pub fn new(strategy: PipelineChunkingStrategy, chunk_size: usize, chunk_overlap: usize) -> Self {
        Self {
            strategy,
            chunk_size,
            chunk_overlap,
        }
    }

    /// Split `text`, dispatching to the configured strategy. Semantic
    /// chunking needs an embedding service to score sentence boundaries;
    /// pass `None` to force the Recursive fallback (e.g. when no local
    /// model is available).
    pub async fn chunk(&self, text: &str, embeddings: Option<&EmbeddingService>) -> Vec<Chunk> {
        if text.trim().is_empty() {
            return Vec::new();
        }

        let parts = match self.strategy {
            PipelineChunkingStrategy::FixedSize => self.chunk_fixed_size(text),
            PipelineChunkingStrategy::Recursive => self.chunk_recursive(text),
            PipelineChunkingStrategy::Sentence => self.chunk_sentence(text),
            PipelineChunkingStrategy::Paragraph => self.chunk_paragraph(text),
            PipelineChunkingStrategy::Semantic => match embeddings {
                Some(svc) => self.chunk_semantic(text, svc).await,
                None => self.chunk_recursive(text),
            },
        };

        parts
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .enumerate()
            .map(|(index, content)| Chunk { index, content })
            .collect()
    }

    fn chunk_fixed_size(&self, text: &str) -> Vec<String> {
        let chars: Vec<char> = text.chars().collect();
        if chars.is_empty() {
            return Vec::new();
        }

        let step = self.chunk_size.saturating_sub(self.chunk_overlap).max(1);
        let mut chunks = Vec::new();
        let mut start = 0;

        while start < chars.len() {
            let end = (start + self.chunk_size).min(chars.len());
            let slice: String = chars[start..end].iter().collect();
            if !slice.trim().is_empty() {
                chunks.push(slice);
            }
            if end == chars.len() {
                break;
            }
            start += step;
        }

        chunks
    }

    /// Try separators in cascade order, greedily packing parts so the
    /// running chunk stays under `chunk_size`. A part that alone exceeds
    /// `chunk_size` is recursively re-split with the next separator; once
    /// separators are exhausted, fixed-size chunking is the backstop.
    fn chunk_recursive(&self, text: &str) -> Vec<String> {
        self.split_recursive(text, 0)
    }

    fn split_recursive(&self, text: &str, sep_index: usize) -> Vec<String> {
        if text.len() <= self.chunk_size {
            return vec![text.to_string()];
        }

        let Some(sep) = RECURSIVE_SEPARATORS.get(sep_index) else {
            return self.chunk_fixed_size(text);
        };

        let parts: Vec<&str> = if *sep == " " {
            text.split_whitespace().collect()
        } else {
            text.split(sep.as_ref() as &str).collect()
        };

        if parts.len() <= 1 {
            return self.split_recursive(text, sep_index + 1);
        }

        let mut chunks = Vec::new();
        let mut current = String::new();

        for part in parts {
            if part.is_empty() {
                continue;
            }

            if part.len() > self.chunk_size {
                if !current.is_empty() {
                    chunks.push(std::mem::take(&mut current));
                }
                chunks.extend(self.split_recursive(part, sep_index + 1));
                continue;
            }

            let candidate_len = if current.is_empty() {
                part.len()
            } else {
                current.len() + sep.len() + part.len()
            };

            if candidate_len > self.chunk_size && !current.is_empty() {
                chunks.push(std::mem::take(&mut current));
            }

            if !current.is_empty() {
                current.push_str(sep);
            }
            current.push_str(part);
        }

        if !current.is_empty() {
            chunks.push(current);
        }

        chunks
    }

    fn chunk_sentence(&self, text: &str) -> Vec<String> {
        let sentences = split_into_sentences(text);
        pack_greedily(&sentences, self.chunk_size)
    }

    fn chunk_paragraph(&self, text: &str) -> Vec<String> {
        let paragraphs: Vec<&str> = text
            .split("\n\n")
            .map(|p| p.trim())
            .filter(|p| !p.is_empty())
            .collect();

        let mut chunks = Vec::new();
        for paragraph in paragraphs {
            if paragraph.len() > self.chunk_size {
                chunks.extend(self.chunk_sentence(paragraph));
            } else {
                chunks.push(paragraph.to_string());
            }
        }
        chunks
    }

    /// Sentence-level semantic boundary detection: embed every sentence,
    /// compute cosine similarity between consecutive sentences, and break
    /// when similarity drops below `mean - 1 std-dev` and the current chunk
    /// has already reached 30% of the target size (or would otherwise
    /// overflow it).
    async fn chunk_semantic(&self, text: &str, embeddings: &EmbeddingService) -> Vec<String> {
        let sentences = split_into_sentences(text);
        if sentences.len() <= 1 {
            return sentences;
        }

        let Ok(vectors) = embeddings.embed_texts(&sentences).await else {
            return self.chunk_recursive(text);
        };
        if vectors.len() != sentences.len() {
            return self.chunk_recursive(text);
        }

        let similarities: Vec<f32> = vectors
            .windows(2)
            .map(|pair| cosine_similarity(&pair[0], &pair[1]))
            .collect();

        if similarities.is_empty() {
            return sentences;
        }

        let mean: f32 = similarities.iter().sum::<f32>() / similarities.len() as f32;
        let variance: f32 = similarities
            .iter()
            .map(|s| (s - mean).powi(2))
            .sum::<f32>()
            / similarities.len() as f32;
        let threshold = mean - variance.sqrt();
        let min_chunk_len = ((self.chunk_size as f32) * 0.3) as usize;

        let mut chunks = Vec::new();
        let mut current = sentences[0].clone();

        for (i, sentence) in sentences.iter().enumerate().skip(1) {
            let similarity = similarities[i - 1];
            let would_overflow = current.len() + 1 + sentence.len() > self.chunk_size;
            let weak_boundary = similarity < threshold && current.len() >= min_chunk_len;

            if weak_boundary || would_overflow {
                chunks.push(std::mem::take(&mut current));
                current = sentence.clone();
            } else {
                current.push(' ');
                current.push_str(sentence);
            }
        }

        if !current.is_empty() {
            chunks.push(current);
        }

        chunks
    }
}

fn split_into_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        current.push(c);
        if matches!(c, '.' | '!' | '?') {
            let next_is_whitespace = chars.peek().map(|n| n.is_whitespace()).unwrap_or(true);
            if next_is_whitespace {
                let trimmed = current.trim().to_string();
                if !trimmed.is_empty() {
                    sentences.push(trimmed);
                }
                current.clear();
            }
        }
    }

    let trailing = current.trim().to_string();
    if !trailing.is_empty() {
        sentences.push(trailing);
    }

    sentences
}

fn pack_greedily(units: &[String], size: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();

    for unit in units {
        let candidate_len = if current.is_empty() {
            unit.len()
        } else {
            current.len() + 1 + unit.len()
        };

        if candidate_len > size && !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
        }

        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(unit);
    }

    if !current.is_empty() {
        chunks.push(current);
    }

    chunks
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fixed_size_advances_by_size_minus_overlap() {
        let chunker = TextChunker::new(PipelineChunkingStrategy::FixedSize, 10, 2);
        let text = "abcdefghijklmnopqrstuvwxyz";
        let chunks = chunker.chunk(text, None).await;

        assert!(chunks.len() > 1);
        for c in &chunks {
            assert!(c.content.len() <= 10);
        }
    }

    #[tokio::test]
    async fn fixed_size_skips_whitespace_only_slices() {
        let chunker = TextChunker::new(PipelineChunkingStrategy::FixedSize, 5, 0);
        let text = "abcde     fghij";
        let chunks = chunker.chunk(text, None).await;
        assert!(chunks.iter().all(|c| !c.content.trim().is_empty()));
    }

    #[tokio::test]
    async fn recursive_prefers_paragraph_boundaries() {
        let chunker = TextChunker::new(PipelineChunkingStrategy::Recursive, 40, 0);
        let text = "First paragraph here.\n\nSecond paragraph that follows.\n\nThird one.";
        let chunks = chunker.chunk(text, None).await;

        assert!(!chunks.is_empty());
        for c in &chunks {
            assert!(c.content.len() <= 60, "chunk too long: {}", c.content);
        }
    }

    #[tokio::test]
    async fn recursive_falls_back_to_fixed_size_for_unbreakable_text() {
        let chunker = TextChunker::new(PipelineChunkingStrategy::Recursive, 10, 0);
        let text = "abcdefghijklmnopqrstuvwxyz";
        let chunks = chunker.chunk(text, None).await;
        assert!(chunks.len() > 1);
    }

    #[tokio::test]
    async fn sentence_packs_sentences_under_size() {
        let chunker = TextChunker::new(PipelineChunkingStrategy::Sentence, 50, 0);
        let text = "One sentence here. Another one follows. And a third.";
        let chunks = chunker.chunk(text, None).await;
        assert!(!chunks.is_empty());
        for c in &chunks {
            assert!(c.content.len() <= 60);
        }
    }

    #[tokio::test]
    async fn paragraph_splits_on_blank_lines() {
        let chunker = TextChunker::new(PipelineChunkingStrategy::Paragraph, 1000, 0);
        let text = "Para one.\n\nPara two.\n\nPara three.";
        let chunks = chunker.chunk(text, None).await;
        assert_eq!(chunks.len(), 3);
    }

    #[tokio::test]
    async fn paragraph_cascades_oversized_blocks_to_sentence_chunker() {
        let chunker = TextChunker::new(PipelineChunkingStrategy::Paragraph, 20, 0);
        let text = "This is sentence one. This is sentence two. This is sentence three.";
        let chunks = chunker.chunk(text, None).await;
        assert!(chunks.len() > 1);
    }

    #[tokio::test]
    async fn semantic_without_embedding_service_falls_back_to_recursive() {
        let chunker = TextChunker::new(PipelineChunkingStrategy::Semantic, 30, 0);
        let text = "First paragraph.\n\nSecond paragraph that is different.";
        let chunks = chunker.chunk(text, None).await;
        assert!(!chunks.is_empty());
    }

    #[tokio::test]
    async fn empty_text_produces_no_chunks() {
        let chunker = TextChunker::new(PipelineChunkingStrategy::FixedSize, 100, 10);
        assert!(chunker.chunk("", None).await.is_empty());
        assert!(chunker.chunk("   \n  ", None).await.is_empty());
    }

    #[tokio::test]
    async fn chunks_are_emitted_in_document_order() {
        let chunker = TextChunker::new(PipelineChunkingStrategy::FixedSize, 10, 0);
        let text = "aaaaaaaaaa".to_string() + "bbbbbbbbbb" + "cccccccccc";
        let chunks = chunker.chunk(&text, None).await;
        for (i, c) in chunks.iter().enumerate() {
            assert_eq!(c.index, i);
        }
    }
}
