//! Remote LLM dispatch for RAG answer synthesis.
//!
//! Pipelines configure a preferred [`LLMProvider`], but answer generation
//! falls back through [`LLMProvider::FALLBACK_ORDER`] whenever the preferred
//! provider has no API key configured or returns a transient failure, so a
//! pipeline can still answer queries if one upstream provider is down.
//!
//! Each provider is a thin `reqwest` client against its native chat API -
//! this module intentionally doesn't route through `llm::client::LLMClient`,
//! since none of the providers it dispatches to (Gemini, Groq, OpenRouter,
//! DeepSeek) are modeled there.

use std::time::Duration;

use reqwest::Client;
use serde_json::json;

use crate::types::{AppError, LLMProvider, Result};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// A single answer-generation request, independent of the chosen provider.
pub struct GenerationRequest {
    pub system_prompt: String,
    pub user_prompt: String,
    pub model: Option<String>,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// Dispatches generation requests to remote LLM providers, reading API keys
/// from environment variables and falling back across providers on failure.
pub struct LLMDispatcher {
    client: Client,
}

impl Default for LLMDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl LLMDispatcher {
    pub fn new() -> Self {
        Self {
            client: Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .expect("reqwest client builder with static config cannot fail"),
        }
    }

    /// Generate a completion using `preferred`, falling back through
    /// [`LLMProvider::FALLBACK_ORDER`] (skipping `preferred`, since it was
    /// already tried first) on failure or missing credentials.
    pub async fn generate(
        &self,
        preferred: LLMProvider,
        request: &GenerationRequest,
    ) -> Result<String> {
        let mut tried = Vec::new();
        let mut last_error = None;

        let order = std::iter::once(preferred).chain(
            LLMProvider::FALLBACK_ORDER
                .into_iter()
                .filter(|p| *p != preferred),
        );

        for provider in order {
            match self.try_provider(provider, request).await {
                Ok(answer) => return Ok(answer),
                Err(AppError::ProviderAuth(msg)) => {
                    tracing::debug!(%provider, %msg, "provider has no credentials configured, skipping");
                    tried.push(provider.to_string());
                    last_error = Some(AppError::ProviderAuth(msg));
                }
                Err(e) => {
                    tracing::warn!(%provider, error = %e, "provider generation failed, trying next");
                    tried.push(provider.to_string());
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            AppError::LLM(format!(
                "no LLM provider succeeded, tried: {}",
                tried.join(", ")
            ))
        }))
    }

    async fn try_provider(
        &self,
        provider: LLMProvider,
        request: &GenerationRequest,
    ) -> Result<String> {
        match provider {
            LLMProvider::Gemini => self.call_gemini(request).await,
            LLMProvider::Anthropic => self.call_anthropic(request).await,
            LLMProvider::Groq => {
                self.call_openai_compatible(
                    "GROQ_API_KEY",
                    "https://api.groq.com/openai/v1/chat/completions",
                    "llama-3.3-70b-versatile",
                    request,
                )
                .await
            }
            LLMProvider::Openrouter => {
                self.call_openai_compatible(
                    "OPENROUTER_API_KEY",
                    "https://openrouter.ai/api/v1/chat/completions",
                    "openai/gpt-4o-mini",
                    request,
                )
                .await
            }
            LLMProvider::Openai => {
                self.call_openai_compatible(
                    "OPENAI_API_KEY",
                    "https://api.openai.com/v1/chat/completions",
                    "gpt-4o-mini",
                    request,
                )
                .await
            }
            LLMProvider::Deepseek => {
                self.call_openai_compatible(
                    "DEEPSEEK_API_KEY",
                    "https://api.deepseek.com/chat/completions",
                    "deepseek-chat",
                    request,
                )
                .await
            }
        }
    }

    fn api_key(env_var: &str) -> Result<String> {
        std::env::var(env_var)
            .ok()
            .filter(|v| !v.is_empty())
            .ok_or_else(|| AppError::ProviderAuth(format!("{env_var} is not set")))
    }

    /// OpenAI-compatible `/chat/completions` call shared by Groq, OpenRouter,
    /// OpenAI and DeepSeek - they all speak the same request/response shape.
    async fn call_openai_compatible(
        &self,
        api_key_env: &str,
        url: &str,
        default_model: &str,
        request: &GenerationRequest,
    ) -> Result<String> {
        let api_key = Self::api_key(api_key_env)?;
        let model = request.model.clone().unwrap_or_else(|| default_model.to_string());

        let body = json!({
            "model": model,
            "messages": [
                {"role": "system", "content": request.system_prompt},
                {"role": "user", "content": request.user_prompt},
            ],
            "max_tokens": request.max_tokens,
            "temperature": request.temperature,
        });

        let response = self
            .client
            .post(url)
            .bearer_auth(&api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::ProviderTimeout(format!("request to {url} failed: {e}")))?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(AppError::ProviderAuth(format!("{url} rejected credentials")));
        }
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(AppError::ProviderRateLimit(format!("{url} rate limited the request")));
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(AppError::External(format!("{url} returned {status}: {text}")));
        }

        let payload: serde_json::Value = response
            .json()
            .await
            .map_err(|e| AppError::External(format!("invalid JSON from {url}: {e}")))?;

        payload["choices"][0]["message"]["content"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| AppError::External(format!("{url} response missing message content")))
    }

    async fn call_anthropic(&self, request: &GenerationRequest) -> Result<String> {
        let api_key = Self::api_key("ANTHROPIC_API_KEY")?;
        let model = request
            .model
            .clone()
            .unwrap_or_else(|| "claude-3-5-haiku-latest".to_string());

        let body = json!({
            "model": model,
            "system": request.system_prompt,
            "messages": [{"role": "user", "content": request.user_prompt}],
            "max_tokens": request.max_tokens,
            "temperature": request.temperature,
        });

        let response = self
            .client
            .post("https://api.anthropic.com/v1/messages")
            .header("x-api-key", &api_key)
            .header("anthropic-version", "2023-06-01")
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::ProviderTimeout(format!("anthropic request failed: {e}")))?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(AppError::ProviderAuth("anthropic rejected credentials".to_string()));
        }
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(AppError::ProviderRateLimit("anthropic rate limited the request".to_string()));
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(AppError::External(format!("anthropic returned {status}: {text}")));
        }

        let payload: serde_json::Value = response
            .json()
            .await
            .map_err(|e| AppError::External(format!("invalid JSON from anthropic: {e}")))?;

        payload["content"][0]["text"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| AppError::External("anthropic response missing content".to_string()))
    }

    async fn call_gemini(&self, request: &GenerationRequest) -> Result<String> {
        let api_key = Self::api_key("GOOGLE_API_KEY").or_else(|_| Self::api_key("GEMINI_API_KEY"))?;
        let model = request
            .model
            .clone()
            .unwrap_or_else(|| "gemini-2.0-flash".to_string());

        let url = format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{model}:generateContent?key={api_key}"
        );

        let body = json!({
            "systemInstruction": {"parts": [{"text": request.system_prompt}]},
            "contents": [{"role": "user", "parts": [{"text": request.user_prompt}]}],
            "generationConfig": {
                "maxOutputTokens": request.max_tokens,
                "temperature": request.temperature,
            },
        });

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::ProviderTimeout(format!("gemini request failed: {e}")))?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(AppError::ProviderAuth("gemini rejected credentials".to_string()));
        }
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(AppError::ProviderRateLimit("gemini rate limited the request".to_string()));
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(AppError::External(format!("gemini returned {status}: {text}")));
        }

        let payload: serde_json::Value = response
            .json()
            .await
            .map_err(|e| AppError::External(format!("invalid JSON from gemini: {e}")))?;

        payload["candidates"][0]["content"]["parts"][0]["text"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| AppError::External("gemini response missing candidate text".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_key_errors_when_unset() {
        // SAFETY: single-threaded test process, variable is not read concurrently elsewhere.
        unsafe {
            std::env::remove_var("ARES_RAG_TEST_UNSET_KEY");
        }
        let result = LLMDispatcher::api_key("ARES_RAG_TEST_UNSET_KEY");
        assert!(matches!(result, Err(AppError::ProviderAuth(_))));
    }

    #[test]
    fn fallback_order_excludes_preferred_duplicate() {
        let preferred = LLMProvider::Openai;
        let order: Vec<LLMProvider> = std::iter::once(preferred)
            .chain(LLMProvider::FALLBACK_ORDER.into_iter().filter(|p| *p != preferred))
            .collect();
        assert_eq!(order[0], LLMProvider::Openai);
        assert_eq!(order.iter().filter(|p| **p == LLMProvider::Openai).count(), 1);
        assert_eq!(order.len(), LLMProvider::FALLBACK_ORDER.len());
    }
}
