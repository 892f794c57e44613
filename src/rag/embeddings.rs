//! Local embedding model loading for RAG pipelines.
//!
//! Wraps fastembed's ONNX models behind a small, pipeline-selectable enum and
//! a lazily-initialized singleton, mirroring the pattern used for the local
//! reranker in `rag::reranker`.

use std::fmt::Display;
use std::str::FromStr;
use std::sync::Arc;

use fastembed::{EmbeddingModel as FastEmbedModel, InitOptions, TextEmbedding};
use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;

use crate::types::{AppError, EmbeddingProvider, Result};

/// Local fastembed models backing the pipeline-selectable [`EmbeddingProvider`]
/// variants that aren't served by a remote API.
///
/// `qwen3_embed` has no fastembed-packaged ONNX release at the time of
/// writing; it is backed by `GteBaseEnV15`, the closest-quality local model
/// fastembed ships (see DESIGN.md).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum EmbeddingModelType {
    /// BAAI/bge-small-en-v1.5 - 384 dimensions. Backs `chroma_default` and `bge_small`.
    #[default]
    BgeSmallEnV15,
    /// sentence-transformers/all-mpnet-base-v2 - 768 dimensions. Backs `st_mpnet`.
    AllMpnetBaseV2,
    /// sentence-transformers/paraphrase-MiniLM-L12-v2 - 384 dimensions. Backs `st_roberta`.
    ParaphraseMiniLmL12V2,
    /// Alibaba-NLP/gte-base-en-v1.5 - 768 dimensions. Substitute for `qwen3_embed`.
    GteBaseEnV15,
    /// Generic local sentence-transformers model. Backs `sentence_transformers`.
    AllMiniLmL6V2,
}

impl EmbeddingModelType {
    /// The local model that backs a given non-remote [`EmbeddingProvider`].
    ///
    /// Panics if called with a remote provider; callers must check
    /// [`EmbeddingProvider::is_remote`] first.
    pub fn for_provider(provider: EmbeddingProvider) -> Self {
        match provider {
            EmbeddingProvider::ChromaDefault | EmbeddingProvider::BgeSmall => Self::BgeSmallEnV15,
            EmbeddingProvider::StMpnet => Self::AllMpnetBaseV2,
            EmbeddingProvider::StRoberta => Self::ParaphraseMiniLmL12V2,
            EmbeddingProvider::Qwen3Embed => Self::GteBaseEnV15,
            EmbeddingProvider::SentenceTransformers => Self::AllMiniLmL6V2,
            EmbeddingProvider::Openai | EmbeddingProvider::Google | EmbeddingProvider::Huggingface => {
                unreachable!("remote embedding providers are not backed by a local model")
            }
        }
    }

    pub fn to_fastembed_model(&self) -> FastEmbedModel {
        match self {
            Self::BgeSmallEnV15 => FastEmbedModel::BGESmallENV15,
            Self::AllMpnetBaseV2 => FastEmbedModel::AllMpnetBaseV2,
            Self::ParaphraseMiniLmL12V2 => FastEmbedModel::ParaphraseMLMiniLML12V2,
            Self::GteBaseEnV15 => FastEmbedModel::GTEBaseENV15,
            Self::AllMiniLmL6V2 => FastEmbedModel::AllMiniLML6V2,
        }
    }

    /// Output dimensionality. Used to size the vector collection before the
    /// first embedding call.
    pub fn dimensions(&self) -> usize {
        match self {
            Self::BgeSmallEnV15 => 384,
            Self::AllMpnetBaseV2 => 768,
            Self::ParaphraseMiniLmL12V2 => 384,
            Self::GteBaseEnV15 => 768,
            Self::AllMiniLmL6V2 => 384,
        }
    }
}

impl Display for EmbeddingModelType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::BgeSmallEnV15 => "bge-small-en-v1.5",
            Self::AllMpnetBaseV2 => "all-mpnet-base-v2",
            Self::ParaphraseMiniLmL12V2 => "paraphrase-minilm-l12-v2",
            Self::GteBaseEnV15 => "gte-base-en-v1.5",
            Self::AllMiniLmL6V2 => "all-minilm-l6-v2",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for EmbeddingModelType {
    type Err = AppError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "bge-small-en-v1.5" | "bge-small" => Ok(Self::BgeSmallEnV15),
            "all-mpnet-base-v2" | "mpnet" => Ok(Self::AllMpnetBaseV2),
            "paraphrase-minilm-l12-v2" => Ok(Self::ParaphraseMiniLmL12V2),
            "gte-base-en-v1.5" | "gte-base" => Ok(Self::GteBaseEnV15),
            "all-minilm-l6-v2" | "minilm-l6" => Ok(Self::AllMiniLmL6V2),
            other => Err(AppError::Internal(format!(
                "unknown local embedding model '{other}'"
            ))),
        }
    }
}

/// Config for a single local embedding model instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default)]
    pub model: EmbeddingModelType,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_show_progress")]
    pub show_download_progress: bool,
}

fn default_batch_size() -> usize {
    32
}

fn default_show_progress() -> bool {
    true
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: EmbeddingModelType::default(),
            batch_size: default_batch_size(),
            show_download_progress: default_show_progress(),
        }
    }
}

/// Local embedding model, loaded once on first use and kept resident for the
/// lifetime of the service.
pub struct EmbeddingService {
    config: EmbeddingConfig,
    model: OnceCell<Arc<tokio::sync::Mutex<TextEmbedding>>>,
}

impl EmbeddingService {
    pub fn new(config: EmbeddingConfig) -> Self {
        Self {
            config,
            model: OnceCell::new(),
        }
    }

    pub fn with_model(model: EmbeddingModelType) -> Self {
        Self::new(EmbeddingConfig {
            model,
            ..Default::default()
        })
    }

    pub fn model_type(&self) -> EmbeddingModelType {
        self.config.model
    }

    pub fn dimensions(&self) -> usize {
        self.config.model.dimensions()
    }

    async fn get_model(&self) -> Result<Arc<tokio::sync::Mutex<TextEmbedding>>> {
        self.model
            .get_or_try_init(|| async {
                let config = self.config.clone();
                tokio::task::spawn_blocking(move || {
                    let model = TextEmbedding::try_new(
                        InitOptions::new(config.model.to_fastembed_model())
                            .with_show_download_progress(config.show_download_progress),
                    )
                    .map_err(|e| {
                        AppError::Internal(format!("Failed to initialize embedding model: {e}"))
                    })?;
                    Ok(Arc::new(tokio::sync::Mutex::new(model)))
                })
                .await
                .map_err(|e| AppError::Internal(format!("Embedding init task failed: {e}")))?
            })
            .await
            .map(Arc::clone)
    }

    /// Embed a single text.
    pub async fn embed_text(&self, text: &str) -> Result<Vec<f32>> {
        let mut embeddings = self.embed_texts(&[text.to_string()]).await?;
        embeddings
            .pop()
            .ok_or_else(|| AppError::Internal("no embedding generated".to_string()))
    }

    /// Embed a batch of texts, internally chunked at `batch_size`.
    pub async fn embed_texts<S: AsRef<str> + Send + Sync + 'static>(
        &self,
        texts: &[S],
    ) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let model = self.get_model().await?;
        let texts_owned: Vec<String> = texts.iter().map(|s| s.as_ref().to_string()).collect();
        let batch_size = self.config.batch_size;

        tokio::task::spawn_blocking(move || {
            let mut model = model.blocking_lock();
            let refs: Vec<&str> = texts_owned.iter().map(|s| s.as_str()).collect();
            model
                .embed(refs, Some(batch_size))
                .map_err(|e| AppError::Internal(format!("Embedding failed: {e}")))
        })
        .await
        .map_err(|e| AppError::Internal(format!("Embedding task failed: {e}")))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_dimensions_match_provider_choice() {
        assert_eq!(
            EmbeddingModelType::for_provider(EmbeddingProvider::ChromaDefault),
            EmbeddingModelType::BgeSmallEnV15
        );
        assert_eq!(
            EmbeddingModelType::for_provider(EmbeddingProvider::StMpnet).dimensions(),
            768
        );
        assert_eq!(
            EmbeddingModelType::for_provider(EmbeddingProvider::Qwen3Embed),
            EmbeddingModelType::GteBaseEnV15
        );
    }

    #[test]
    fn model_from_str_round_trips_display() {
        for model in [
            EmbeddingModelType::BgeSmallEnV15,
            EmbeddingModelType::AllMpnetBaseV2,
            EmbeddingModelType::ParaphraseMiniLmL12V2,
            EmbeddingModelType::GteBaseEnV15,
            EmbeddingModelType::AllMiniLmL6V2,
        ] {
            let parsed: EmbeddingModelType = model.to_string().parse().unwrap();
            assert_eq!(parsed, model);
        }
    }

    #[test]
    fn default_config_uses_bge_small() {
        let config = EmbeddingConfig::default();
        assert_eq!(config.model, EmbeddingModelType::BgeSmallEnV15);
        assert_eq!(config.batch_size, 32);
    }
}
