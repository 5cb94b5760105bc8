//! Talentgraph Core Library
//!
//! Candidate search over a resume knowledge graph:
//! - Graph store (typed nodes/edges over SQLite, optional embeddings)
//! - Community classification from skill sets
//! - Hybrid retrieval (keyword + vector + graph) with rank fusion
//! - LLM candidate scoring with a TTL cache
//! - CV ingest pipeline with content-hash dedup and background extraction
//! - Rate-paced background embedding worker
//! - Offline structural community detection

pub mod community;
pub mod community_detect;
pub mod config;
pub mod embedding;
pub mod error;
pub mod graph;
pub mod ingest;
pub mod llm;
pub mod search;
pub mod storage;

pub use error::{Error, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::{AppConfig, LlmProvider};
    pub use crate::error::{Error, Result};
    pub use crate::search::{HybridConfig, HybridSearchEngine};
    pub use crate::storage::Database;
}
