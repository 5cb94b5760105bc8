//! HTTP client for chat and embedding providers
//!
//! One client implements both collaborator traits: chat completions against
//! the configured provider (OpenAI, Groq, or an OpenAI-compatible Ollama),
//! embeddings always against OpenAI. Rate-limited requests are retried with
//! exponential backoff.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client as HttpClient, StatusCode};
use tracing::{debug, warn};

use crate::config::{AppConfig, LlmProvider};
use crate::error::{Error, Result};

use super::types::{ChatRequest, ChatResponse, EmbeddingRequest, EmbeddingResponse, Message};
use super::{ChatModel, EmbeddingModel};

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";
const OLLAMA_BASE_URL: &str = "http://localhost:11434/v1";

/// Embedding model used for all graph nodes (1536 dimensions)
pub(crate) const EMBEDDING_MODEL: &str = "text-embedding-3-small";

/// Maximum attempts for rate-limited requests
const MAX_RETRY_ATTEMPTS: u32 = 3;

/// Base delay for exponential backoff
const BACKOFF_BASE_MS: u64 = 1000;

/// Chat timeout; large resumes on slow local models take minutes
const DEFAULT_CHAT_TIMEOUT_SECS: u64 = 600;

const DEFAULT_EMBED_TIMEOUT_SECS: u64 = 30;

/// Client for the chat and embedding HTTP APIs
#[derive(Clone)]
pub struct LlmClient {
    http_client: HttpClient,
    provider: LlmProvider,
    model: String,
    api_key: String,
    base_url: String,
    embedding_base_url: String,
    embedding_api_key: String,
}

impl std::fmt::Debug for LlmClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmClient")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// Builder for creating an LlmClient
pub struct LlmClientBuilder {
    provider: LlmProvider,
    model: String,
    api_key: String,
    base_url: Option<String>,
    embedding_base_url: Option<String>,
    embedding_api_key: String,
    timeout_secs: u64,
}

impl LlmClientBuilder {
    pub fn new(provider: LlmProvider, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            api_key: String::new(),
            base_url: None,
            embedding_base_url: None,
            embedding_api_key: String::new(),
            timeout_secs: DEFAULT_CHAT_TIMEOUT_SECS,
        }
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = key.into();
        self
    }

    pub fn embedding_api_key(mut self, key: impl Into<String>) -> Self {
        self.embedding_api_key = key.into();
        self
    }

    /// Override the chat base URL (used by tests and self-hosted gateways)
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Override the embedding base URL
    pub fn embedding_base_url(mut self, url: impl Into<String>) -> Self {
        self.embedding_base_url = Some(url.into());
        self
    }

    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn build(self) -> Result<LlmClient> {
        let default_base = match self.provider {
            LlmProvider::OpenAi => OPENAI_BASE_URL,
            LlmProvider::Groq => GROQ_BASE_URL,
            LlmProvider::Ollama => OLLAMA_BASE_URL,
            LlmProvider::None => OPENAI_BASE_URL,
        };

        let http_client = HttpClient::builder()
            .timeout(Duration::from_secs(self.timeout_secs))
            .build()?;

        Ok(LlmClient {
            http_client,
            provider: self.provider,
            model: self.model,
            api_key: self.api_key,
            base_url: self.base_url.unwrap_or_else(|| default_base.to_string()),
            embedding_base_url: self
                .embedding_base_url
                .unwrap_or_else(|| OPENAI_BASE_URL.to_string()),
            embedding_api_key: self.embedding_api_key,
        })
    }
}

impl LlmClient {
    /// Build a chat client from the application configuration
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        LlmClientBuilder::new(config.llm_provider, config.llm_model.clone())
            .api_key(config.llm_api_key.clone())
            .embedding_api_key(config.openai_api_key.clone().unwrap_or_default())
            .build()
    }

    /// Build an embedding-only client (provider-independent; always OpenAI)
    pub fn embedder_from_config(config: &AppConfig) -> Result<Self> {
        let key = config
            .openai_api_key
            .clone()
            .ok_or_else(|| Error::Config("OPENAI_API_KEY is required for embeddings".into()))?;

        LlmClientBuilder::new(config.llm_provider, config.llm_model.clone())
            .api_key(config.llm_api_key.clone())
            .embedding_api_key(key)
            .timeout_secs(DEFAULT_EMBED_TIMEOUT_SECS)
            .build()
    }

    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse> {
        if self.provider == LlmProvider::None {
            return Err(Error::Llm("LLM provider not configured".into()));
        }

        let url = format!("{}/chat/completions", self.base_url);

        for attempt in 0..MAX_RETRY_ATTEMPTS {
            let mut req = self.http_client.post(&url).json(request);
            if !self.api_key.is_empty() {
                req = req.bearer_auth(&self.api_key);
            }

            let response = req.send().await?;
            let status = response.status();

            if status == StatusCode::TOO_MANY_REQUESTS {
                let delay = Duration::from_millis(BACKOFF_BASE_MS * 2u64.pow(attempt));
                warn!(attempt, delay_ms = delay.as_millis() as u64, "Rate limited, backing off");
                tokio::time::sleep(delay).await;
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(Error::Llm(format!("chat API error {status}: {body}")));
            }

            let parsed: ChatResponse = response.json().await?;
            debug!(
                model = %parsed.model,
                tokens = parsed.usage.as_ref().map(|u| u.total_tokens).unwrap_or(0),
                "Chat completion received"
            );
            return Ok(parsed);
        }

        Err(Error::Llm(format!(
            "rate limited after {MAX_RETRY_ATTEMPTS} attempts"
        )))
    }
}

#[async_trait]
impl ChatModel for LlmClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let request = ChatRequest::new(self.model.clone(), vec![Message::user(prompt)])
            .with_temperature(0.1);

        let response = self.complete(&request).await?;
        response
            .content()
            .map(|c| c.to_string())
            .ok_or_else(|| Error::Llm("chat response contained no choices".into()))
    }
}

#[async_trait]
impl EmbeddingModel for LlmClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if self.embedding_api_key.is_empty() {
            return Err(Error::EmbeddingFailed(
                "embedding provider not configured".into(),
            ));
        }

        let url = format!("{}/embeddings", self.embedding_base_url);
        let request = EmbeddingRequest::new(EMBEDDING_MODEL, text);

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.embedding_api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::EmbeddingFailed(format!(
                "embedding API error {status}: {body}"
            )));
        }

        let parsed: EmbeddingResponse = response.json().await?;
        parsed
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| Error::EmbeddingFailed("no embedding returned".into()))
    }

    fn model_name(&self) -> &str {
        EMBEDDING_MODEL
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let client = LlmClientBuilder::new(LlmProvider::Groq, "llama-3.3-70b-versatile")
            .api_key("gsk-test")
            .build()
            .unwrap();

        assert_eq!(client.base_url, GROQ_BASE_URL);
        assert_eq!(client.embedding_base_url, OPENAI_BASE_URL);
        assert_eq!(client.model, "llama-3.3-70b-versatile");
    }

    #[test]
    fn test_builder_overrides() {
        let client = LlmClientBuilder::new(LlmProvider::OpenAi, "gpt-4o-mini")
            .api_key("sk-test")
            .base_url("http://localhost:9999/v1")
            .build()
            .unwrap();

        assert_eq!(client.base_url, "http://localhost:9999/v1");
    }

    #[tokio::test]
    async fn test_unconfigured_provider_rejects_chat() {
        let client = LlmClientBuilder::new(LlmProvider::None, "any").build().unwrap();
        let err = client.generate("hello").await.unwrap_err();
        assert!(matches!(err, Error::Llm(_)));
    }

    #[tokio::test]
    async fn test_missing_embedding_key_rejected() {
        let client = LlmClientBuilder::new(LlmProvider::OpenAi, "gpt-4o-mini")
            .api_key("sk-test")
            .build()
            .unwrap();
        let err = client.embed("hello").await.unwrap_err();
        assert!(matches!(err, Error::EmbeddingFailed(_)));
    }
}
