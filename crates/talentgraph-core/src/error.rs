//! Error types for talentgraph

use thiserror::Error;

/// Result type alias using talentgraph's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Talentgraph error types
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Embedding generation failed: {0}")]
    EmbeddingFailed(String),

    #[error("Entity extraction failed: {0}")]
    ExtractionFailed(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("Queue full: {0}")]
    QueueFull(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// True for errors caused by an unreachable or unconfigured collaborator,
    /// which the HTTP layer surfaces as 503 rather than 500.
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            Self::Network(_) | Self::Llm(_) | Self::EmbeddingFailed(_) | Self::Config(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        let err = Error::InvalidInput("query cannot be empty".into());
        assert_eq!(err.to_string(), "Invalid input: query cannot be empty");

        let err = Error::NotFound("job 42".into());
        assert_eq!(err.to_string(), "job 42 not found");
    }

    #[test]
    fn test_unavailable_classification() {
        assert!(Error::Llm("provider not configured".into()).is_unavailable());
        assert!(!Error::InvalidInput("bad".into()).is_unavailable());
        assert!(!Error::Other("misc".into()).is_unavailable());
    }

    #[test]
    fn test_from_serde_json() {
        let parse_err = serde_json::from_str::<serde_json::Value>("{nope").unwrap_err();
        let err: Error = parse_err.into();
        assert!(matches!(err, Error::Serialization(_)));
    }
}
