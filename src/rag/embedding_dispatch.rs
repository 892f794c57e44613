//! Embedding dispatch: resolves a pipeline's embedding config to vectors.
//!
//! Local providers route through the fastembed-backed singleton pool in
//! [`crate::rag::embeddings`], one [`EmbeddingService`] cached per distinct
//! local model so two pipelines sharing a model share its loaded weights.
//! Remote providers (OpenAI, Google, HuggingFace) are thin `reqwest` clients,
//! matching the shape of `rag::llm_dispatch`'s provider clients. An explicit
//! remote choice with no configured API key falls back to the bundled
//! default and reports a warning the caller can surface in its response.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, Response, StatusCode};
use serde_json::json;
use tokio::sync::Mutex;

use crate::rag::embeddings::{EmbeddingModelType, EmbeddingService};
use crate::types::{AppError, EmbeddingProvider, Result};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Outcome of resolving a pipeline's configured [`EmbeddingProvider`]: which
/// provider will actually be used, its output dimensionality, and an
/// optional warning when the configured choice couldn't be honored.
#[derive(Debug, Clone)]
pub struct ResolvedEmbedding {
    pub provider: EmbeddingProvider,
    pub model_id: String,
    pub dimensions: usize,
    pub warning: Option<String>,
}

/// Dispatches embedding requests to local models or remote provider APIs.
pub struct EmbeddingDispatcher {
    client: Client,
    local_models: Mutex<HashMap<EmbeddingModelType, Arc<EmbeddingService>>>,
}

impl Default for EmbeddingDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl EmbeddingDispatcher {
    pub fn new() -> Self {
        Self {
            client: Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .expect("reqwest client builder with static config cannot fail"),
            local_models: Mutex::new(HashMap::new()),
        }
    }

    /// Resolve `provider` to what will actually be used to embed text,
    /// falling back to [`EmbeddingProvider::ChromaDefault`] when `provider`
    /// is remote and no API key is configured for it.
    pub fn resolve(&self, provider: EmbeddingProvider) -> ResolvedEmbedding {
        if provider.is_remote() && Self::api_key_for(provider).is_none() {
            tracing::warn!(
                %provider,
                "no API key configured for embedding provider, falling back to chroma_default"
            );
            let fallback = EmbeddingProvider::ChromaDefault;
            return ResolvedEmbedding {
                provider: fallback,
                model_id: fallback.to_string(),
                dimensions: EmbeddingModelType::for_provider(fallback).dimensions(),
                warning: Some(format!(
                    "embedding provider '{provider}' has no API key configured; used '{fallback}' instead"
                )),
            };
        }

        let dimensions = if provider.is_remote() {
            Self::remote_dimensions(provider)
        } else {
            EmbeddingModelType::for_provider(provider).dimensions()
        };

        ResolvedEmbedding {
            provider,
            model_id: provider.to_string(),
            dimensions,
            warning: None,
        }
    }

    fn remote_dimensions(provider: EmbeddingProvider) -> usize {
        match provider {
            EmbeddingProvider::Openai => 1536,
            EmbeddingProvider::Google => 768,
            EmbeddingProvider::Huggingface => 384,
            _ => unreachable!("remote_dimensions called with a non-remote provider"),
        }
    }

    fn api_key_for(provider: EmbeddingProvider) -> Option<String> {
        let var = match provider {
            EmbeddingProvider::Openai => "OPENAI_API_KEY",
            EmbeddingProvider::Google => "GOOGLE_API_KEY",
            EmbeddingProvider::Huggingface => "HUGGINGFACE_API_KEY",
            _ => return None,
        };
        std::env::var(var).ok().filter(|v| !v.is_empty())
    }

    fn api_key(env_var: &str) -> Result<String> {
        std::env::var(env_var)
            .ok()
            .filter(|v| !v.is_empty())
            .ok_or_else(|| AppError::ProviderAuth(format!("{env_var} is not set")))
    }

    /// Embed a batch of texts using `resolved.provider`.
    pub async fn embed_texts(
        &self,
        resolved: &ResolvedEmbedding,
        texts: &[String],
    ) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        if resolved.provider.is_remote() {
            self.embed_remote(resolved.provider, texts).await
        } else {
            self.embed_local(resolved.provider, texts).await
        }
    }

    async fn embed_local(
        &self,
        provider: EmbeddingProvider,
        texts: &[String],
    ) -> Result<Vec<Vec<f32>>> {
        let service = self
            .local_service(provider)
            .await
            .expect("embed_local called with a remote provider");
        service.embed_texts(texts).await
    }

    /// The cached local [`EmbeddingService`] backing `provider`, or `None` if
    /// `provider` is remote. Exposed so the chunker's semantic strategy can
    /// reuse the same resident model instead of loading its own.
    pub async fn local_service(&self, provider: EmbeddingProvider) -> Option<Arc<EmbeddingService>> {
        if provider.is_remote() {
            return None;
        }
        let model_type = EmbeddingModelType::for_provider(provider);
        let mut models = self.local_models.lock().await;
        Some(Arc::clone(
            models
                .entry(model_type)
                .or_insert_with(|| Arc::new(EmbeddingService::with_model(model_type))),
        ))
    }

    async fn embed_remote(
        &self,
        provider: EmbeddingProvider,
        texts: &[String],
    ) -> Result<Vec<Vec<f32>>> {
        match provider {
            EmbeddingProvider::Openai => self.embed_openai(texts).await,
            EmbeddingProvider::Google => self.embed_google(texts).await,
            EmbeddingProvider::Huggingface => self.embed_huggingface(texts).await,
            _ => unreachable!("embed_remote called with a non-remote provider"),
        }
    }

    async fn embed_openai(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let api_key = Self::api_key("OPENAI_API_KEY")?;
        let body = json!({ "model": "text-embedding-3-small", "input": texts });

        let response = self
            .client
            .post("https://api.openai.com/v1/embeddings")
            .bearer_auth(&api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::ProviderTimeout(format!("openai embeddings request failed: {e}")))?;

        let payload = Self::json_or_status_error("openai embeddings", response).await?;
        payload["data"]
            .as_array()
            .ok_or_else(|| AppError::External("openai embeddings response missing data".to_string()))?
            .iter()
            .map(|item| {
                item["embedding"]
                    .as_array()
                    .map(|v| v.iter().filter_map(|n| n.as_f64()).map(|n| n as f32).collect())
                    .ok_or_else(|| AppError::External("openai embeddings item missing embedding".to_string()))
            })
            .collect()
    }

    async fn embed_google(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let api_key = Self::api_key("GOOGLE_API_KEY")?;
        let url = format!(
            "https://generativelanguage.googleapis.com/v1beta/models/embedding-001:batchEmbedContents?key={api_key}"
        );
        let requests: Vec<_> = texts
            .iter()
            .map(|text| {
                json!({
                    "model": "models/embedding-001",
                    "content": {"parts": [{"text": text}]},
                })
            })
            .collect();
        let body = json!({ "requests": requests });

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::ProviderTimeout(format!("google embeddings request failed: {e}")))?;

        let payload = Self::json_or_status_error("google embeddings", response).await?;
        payload["embeddings"]
            .as_array()
            .ok_or_else(|| AppError::External("google embeddings response missing embeddings".to_string()))?
            .iter()
            .map(|item| {
                item["values"]
                    .as_array()
                    .map(|v| v.iter().filter_map(|n| n.as_f64()).map(|n| n as f32).collect())
                    .ok_or_else(|| AppError::External("google embeddings item missing values".to_string()))
            })
            .collect()
    }

    async fn embed_huggingface(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let api_key = Self::api_key("HUGGINGFACE_API_KEY")?;
        let model = "sentence-transformers/all-MiniLM-L6-v2";
        let url = format!("https://api-inference.huggingface.co/pipeline/feature-extraction/{model}");
        let body = json!({ "inputs": texts, "options": {"wait_for_model": true} });

        let response = self
            .client
            .post(&url)
            .bearer_auth(&api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::ProviderTimeout(format!("huggingface embeddings request failed: {e}")))?;

        let payload = Self::json_or_status_error("huggingface embeddings", response).await?;
        payload
            .as_array()
            .ok_or_else(|| AppError::External("huggingface embeddings response was not an array".to_string()))?
            .iter()
            .map(|item| {
                item.as_array()
                    .map(|v| v.iter().filter_map(|n| n.as_f64()).map(|n| n as f32).collect())
                    .ok_or_else(|| AppError::External("huggingface embeddings item was not an array".to_string()))
            })
            .collect()
    }

    async fn json_or_status_error(label: &str, response: Response) -> Result<serde_json::Value> {
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(AppError::ProviderAuth(format!("{label} rejected credentials")));
        }
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(AppError::ProviderRateLimit(format!("{label} rate limited the request")));
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(AppError::External(format!("{label} returned {status}: {text}")));
        }
        response
            .json()
            .await
            .map_err(|e| AppError::External(format!("invalid JSON from {label}: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_local_provider_keeps_choice() {
        let dispatcher = EmbeddingDispatcher::new();
        let resolved = dispatcher.resolve(EmbeddingProvider::BgeSmall);
        assert_eq!(resolved.provider, EmbeddingProvider::BgeSmall);
        assert_eq!(resolved.dimensions, 384);
        assert!(resolved.warning.is_none());
    }

    #[test]
    fn resolve_remote_without_key_falls_back_with_warning() {
        // SAFETY: single-threaded test process, variable is not read concurrently elsewhere.
        unsafe {
            std::env::remove_var("OPENAI_API_KEY");
        }
        let dispatcher = EmbeddingDispatcher::new();
        let resolved = dispatcher.resolve(EmbeddingProvider::Openai);
        assert_eq!(resolved.provider, EmbeddingProvider::ChromaDefault);
        assert!(resolved.warning.is_some());
    }
}
