//! Application configuration
//!
//! Configuration is read from the environment exactly once at startup and
//! passed into components as a frozen record. Components never touch the
//! environment themselves.

use std::env;
use std::path::PathBuf;

use crate::error::{Error, Result};

/// Default chat model when LLM_MODEL is not set
const DEFAULT_LLM_MODEL: &str = "gpt-4o-mini";

/// Default directory for raw uploaded resume bytes
const DEFAULT_UPLOADS_DIR: &str = "uploads";

/// Default HTTP port
const DEFAULT_PORT: u16 = 8080;

/// Supported chat-completion providers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmProvider {
    OpenAi,
    Groq,
    Ollama,
    /// No provider configured; LLM-dependent paths degrade or fail per operation
    None,
}

impl LlmProvider {
    pub fn parse(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "groq" => Ok(Self::Groq),
            "ollama" => Ok(Self::Ollama),
            "none" => Ok(Self::None),
            other => Err(Error::Config(format!("unsupported LLM provider: {other}"))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Groq => "groq",
            Self::Ollama => "ollama",
            Self::None => "none",
        }
    }
}

impl std::fmt::Display for LlmProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Frozen application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// SQL DSN (required)
    pub database_url: String,
    /// Chat provider selection
    pub llm_provider: LlmProvider,
    /// Chat model identifier
    pub llm_model: String,
    /// Credential for the selected chat provider (empty for ollama/none)
    pub llm_api_key: String,
    /// OpenAI key for the embedding collaborator. Absence disables the
    /// vector retriever and the hybrid endpoint.
    pub openai_api_key: Option<String>,
    /// Where raw resume bytes land
    pub uploads_dir: PathBuf,
    /// TCP port for the HTTP server
    pub port: u16,
}

impl AppConfig {
    /// Load configuration from environment variables (and .env if present)
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .map_err(|_| Error::Config("DATABASE_URL is required".into()))?;

        let llm_provider =
            LlmProvider::parse(&env::var("LLM_PROVIDER").unwrap_or_else(|_| "openai".into()))?;
        let llm_model = env::var("LLM_MODEL").unwrap_or_else(|_| DEFAULT_LLM_MODEL.into());

        let openai_api_key = env::var("OPENAI_API_KEY").ok().filter(|k| !k.is_empty());

        let llm_api_key = match llm_provider {
            LlmProvider::OpenAi => openai_api_key.clone().unwrap_or_default(),
            LlmProvider::Groq => env::var("GROQ_API_KEY").unwrap_or_default(),
            LlmProvider::Ollama | LlmProvider::None => String::new(),
        };

        let uploads_dir =
            PathBuf::from(env::var("UPLOADS_DIR").unwrap_or_else(|_| DEFAULT_UPLOADS_DIR.into()));

        let port = match env::var("PORT") {
            Ok(raw) => raw
                .parse::<u16>()
                .map_err(|_| Error::Config(format!("invalid PORT: {raw}")))?,
            Err(_) => DEFAULT_PORT,
        };

        Ok(Self {
            database_url,
            llm_provider,
            llm_model,
            llm_api_key,
            openai_api_key,
            uploads_dir,
            port,
        })
    }

    /// Whether the embedding collaborator is configured
    pub fn embeddings_enabled(&self) -> bool {
        self.openai_api_key.is_some()
    }

    /// Whether a chat provider is configured
    pub fn chat_enabled(&self) -> bool {
        self.llm_provider != LlmProvider::None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_parsing() {
        assert_eq!(LlmProvider::parse("openai").unwrap(), LlmProvider::OpenAi);
        assert_eq!(LlmProvider::parse("GROQ").unwrap(), LlmProvider::Groq);
        assert_eq!(LlmProvider::parse("ollama").unwrap(), LlmProvider::Ollama);
        assert_eq!(LlmProvider::parse("none").unwrap(), LlmProvider::None);
        assert!(LlmProvider::parse("gemini").is_err());
    }

    #[test]
    fn test_provider_display() {
        assert_eq!(LlmProvider::OpenAi.to_string(), "openai");
        assert_eq!(LlmProvider::None.to_string(), "none");
    }

    #[test]
    fn test_embeddings_gate() {
        let config = AppConfig {
            database_url: "sqlite::memory:".into(),
            llm_provider: LlmProvider::Groq,
            llm_model: "llama-3.3-70b-versatile".into(),
            llm_api_key: "gsk-test".into(),
            openai_api_key: None,
            uploads_dir: PathBuf::from("uploads"),
            port: 8080,
        };
        assert!(!config.embeddings_enabled());
        assert!(config.chat_enabled());

        let with_key = AppConfig {
            openai_api_key: Some("sk-test".into()),
            ..config
        };
        assert!(with_key.embeddings_enabled());
    }
}
