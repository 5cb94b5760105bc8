//! LLM integration: provider traits, wire types, and the HTTP client
//!
//! The core consumes two collaborator interfaces: [`ChatModel`] for
//! chat-completion prompts and [`EmbeddingModel`] for text embeddings.
//! [`LlmClient`] is the reqwest-based implementation of both for the
//! supported providers (OpenAI, Groq, Ollama).

mod client;
mod types;

pub use client::{LlmClient, LlmClientBuilder};
pub use types::{
    ChatRequest, ChatResponse, Choice, EmbeddingRequest, EmbeddingResponse, Message, MessageRole,
    Usage,
};

use async_trait::async_trait;

use crate::error::Result;

/// Chat-completion collaborator
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Send a single prompt and return the model's text response
    async fn generate(&self, prompt: &str) -> Result<String>;
}

/// Embedding collaborator
#[async_trait]
pub trait EmbeddingModel: Send + Sync {
    /// Embed a text into a fixed-dimension vector
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Model identifier recorded next to stored embeddings
    fn model_name(&self) -> &str;
}

/// Extract the first balanced `{...}` region from free text.
///
/// LLM responses frequently wrap JSON in markdown fences or prose; scanning
/// for brace balance tolerates both. Returns `None` when no complete object
/// is present.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let mut start = None;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, ch) in text.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        match ch {
            '"' if start.is_some() => in_string = true,
            '{' => {
                if start.is_none() {
                    start = Some(i);
                }
                depth += 1;
            }
            '}' => {
                if depth > 0 {
                    depth -= 1;
                    if depth == 0 {
                        let s = start.expect("open brace seen before close");
                        return Some(&text[s..=i]);
                    }
                }
            }
            _ => {}
        }
    }

    None
}
