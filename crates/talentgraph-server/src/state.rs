//! Shared application state

use std::path::PathBuf;
use std::sync::Arc;

use talentgraph_core::community_detect::CommunityDetector;
use talentgraph_core::embedding::EmbeddingQueue;
use talentgraph_core::graph::GraphStore;
use talentgraph_core::ingest::{IngestPipeline, TextExtractor};
use talentgraph_core::search::HybridSearchEngine;
use talentgraph_core::storage::CvStore;

/// State handed to every handler via Axum's `State` extractor
#[derive(Clone)]
pub struct AppState {
    pub cv_store: CvStore,
    pub graph: GraphStore,
    /// None when the embedding collaborator is unconfigured; the hybrid
    /// endpoint answers 503 in that case
    pub engine: Option<Arc<HybridSearchEngine>>,
    pub pipeline: IngestPipeline,
    pub text_extractor: Arc<dyn TextExtractor>,
    /// None when embeddings are disabled
    pub embeddings: Option<EmbeddingQueue>,
    pub detector: CommunityDetector,
    /// Where raw uploaded resume bytes land
    pub uploads_dir: PathBuf,
}
