use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use talentgraph_core::community_detect::CommunityDetector;
use talentgraph_core::config::AppConfig;
use talentgraph_core::embedding::{
    EmbeddingQueue, EmbeddingWorker, EMBEDDING_QUEUE_CAPACITY,
};
use talentgraph_core::graph::GraphStore;
use talentgraph_core::ingest::{
    CvExtractor, IngestPipeline, IngestWorker, Utf8TextExtractor, INGEST_QUEUE_CAPACITY,
};
use talentgraph_core::llm::{ChatModel, EmbeddingModel, LlmClient};
use talentgraph_core::search::HybridSearchEngine;
use talentgraph_core::storage::{CvStore, Database};
use talentgraph_server::api::create_router;
use talentgraph_server::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = AppConfig::from_env()?;
    info!(
        provider = %config.llm_provider,
        model = %config.llm_model,
        embeddings = config.embeddings_enabled(),
        "Configuration loaded"
    );

    let db = Database::connect(&config.database_url).await?;
    let pool = db.pool().clone();

    let cv_store = CvStore::new(pool.clone());
    let graph = GraphStore::new(pool.clone());
    let detector = CommunityDetector::new(pool.clone());

    // Chat client exists even for provider "none": extraction jobs then
    // fail with a clear message instead of the queue silently stalling.
    let chat: Arc<dyn ChatModel> = Arc::new(LlmClient::from_config(&config)?);

    // The embedding collaborator is optional; without it the vector
    // retriever and the hybrid endpoint are disabled.
    let embedder: Option<Arc<dyn EmbeddingModel>> = if config.embeddings_enabled() {
        Some(Arc::new(LlmClient::embedder_from_config(&config)?))
    } else {
        None
    };

    let embeddings = embedder.clone().map(|embedder| {
        let (tx, rx) = mpsc::channel(EMBEDDING_QUEUE_CAPACITY);
        tokio::spawn(EmbeddingWorker::new(rx, graph.clone(), embedder).run());
        EmbeddingQueue::new(tx)
    });

    let (ingest_tx, ingest_rx) = mpsc::channel(INGEST_QUEUE_CAPACITY);
    tokio::spawn(
        IngestWorker::new(
            ingest_rx,
            cv_store.clone(),
            graph.clone(),
            CvExtractor::new(chat.clone()),
            embeddings.clone(),
        )
        .run(),
    );

    let engine = embedder.map(|embedder| {
        Arc::new(HybridSearchEngine::new(pool.clone(), chat.clone(), embedder))
    });
    if engine.is_none() {
        info!("OPENAI_API_KEY not set; hybrid search disabled (503)");
    }

    let state = AppState {
        pipeline: IngestPipeline::new(cv_store.clone(), ingest_tx),
        cv_store,
        graph,
        engine,
        text_extractor: Arc::new(Utf8TextExtractor),
        embeddings,
        detector,
        uploads_dir: config.uploads_dir.clone(),
    };

    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(addr = %addr, "talentgraph ready");

    axum::serve(listener, app)
        .with_graceful_shutdown(wait_for_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn wait_for_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT"),
        _ = terminate => info!("Received SIGTERM"),
    }

    info!("Shutting down gracefully, draining in-flight requests...");
}
