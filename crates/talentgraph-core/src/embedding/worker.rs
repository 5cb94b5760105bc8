//! Embedding worker and its bounded queue
//!
//! Jobs carry node-id lists. The worker serialises each node into a short
//! text, requests an embedding, writes it back, and pauses between requests
//! so bursts stay inside the provider's rate budget. The queue never
//! blocks producers: when full, the job is dropped and counted; the next
//! batch request will pick the nodes up again.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::graph::{GraphNode, GraphStore, NodeProperties};
use crate::llm::EmbeddingModel;

/// Bounded embedding queue size
pub const EMBEDDING_QUEUE_CAPACITY: usize = 100;

/// Pause between embedding requests (provider rate budget)
pub const EMBED_PACING: Duration = Duration::from_millis(200);

/// One batch of nodes to embed
#[derive(Debug)]
pub struct EmbeddingJob {
    /// Originating resume, or 0 for corpus-wide batches
    pub cv_file_id: i64,
    pub node_ids: Vec<String>,
}

/// Producer handle with non-blocking enqueue and a drop counter
#[derive(Clone)]
pub struct EmbeddingQueue {
    tx: mpsc::Sender<EmbeddingJob>,
    dropped: Arc<AtomicU64>,
}

impl EmbeddingQueue {
    pub fn new(tx: mpsc::Sender<EmbeddingJob>) -> Self {
        Self {
            tx,
            dropped: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Try to queue a job; a full or closed queue drops it. Search
    /// correctness is unaffected: unembedded nodes stay invisible to the
    /// vector retriever until a later batch.
    pub fn enqueue(&self, cv_file_id: i64, node_ids: Vec<String>) {
        let count = node_ids.len();
        match self.tx.try_send(EmbeddingJob { cv_file_id, node_ids }) {
            Ok(()) => {
                info!(cv_file_id, nodes = count, "Embedding job queued");
            }
            Err(_) => {
                let total = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                warn!(cv_file_id, nodes = count, dropped_total = total, "Embedding queue full, job dropped");
            }
        }
    }

    /// Jobs dropped since startup
    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// Long-lived embedding worker
pub struct EmbeddingWorker {
    jobs: mpsc::Receiver<EmbeddingJob>,
    store: GraphStore,
    embedder: Arc<dyn EmbeddingModel>,
    pacing: Duration,
}

impl EmbeddingWorker {
    pub fn new(
        jobs: mpsc::Receiver<EmbeddingJob>,
        store: GraphStore,
        embedder: Arc<dyn EmbeddingModel>,
    ) -> Self {
        Self {
            jobs,
            store,
            embedder,
            pacing: EMBED_PACING,
        }
    }

    /// Override the pacing interval (tests)
    pub fn with_pacing(mut self, pacing: Duration) -> Self {
        self.pacing = pacing;
        self
    }

    pub async fn run(mut self) {
        info!("Embedding worker started");

        while let Some(job) = self.jobs.recv().await {
            let total = job.node_ids.len();
            info!(cv_file_id = job.cv_file_id, nodes = total, "Embedding batch started");

            let mut succeeded = 0usize;
            let mut failed = 0usize;

            for (i, node_id) in job.node_ids.iter().enumerate() {
                match self.embed_node(node_id).await {
                    Ok(()) => succeeded += 1,
                    Err(e) => {
                        warn!(node_id = %node_id, error = %e, "Failed to embed node");
                        failed += 1;
                    }
                }

                if i + 1 < total {
                    tokio::time::sleep(self.pacing).await;
                }
            }

            info!(
                cv_file_id = job.cv_file_id,
                succeeded, failed, "Embedding batch finished"
            );
        }

        info!("Embedding worker stopped");
    }

    async fn embed_node(&self, node_id: &str) -> crate::error::Result<()> {
        let Some(node) = self.store.get_node_any(node_id).await? else {
            return Err(crate::error::Error::NotFound(format!("node {node_id}")));
        };

        let text = node_text(&node);
        let embedding = self.embedder.embed(&text).await?;
        self.store
            .write_embedding(node_id, &embedding, self.embedder.model_name())
            .await
    }
}

/// Short text representation of a node, appropriate to its type
pub fn node_text(node: &GraphNode) -> String {
    match &node.properties {
        NodeProperties::Person(p) => {
            let years = p
                .total_experience_years
                .map(|y| y.to_string())
                .unwrap_or_else(|| "unknown".into());
            format!(
                "{}: {} with {} years experience. Seniority: {}",
                p.name, p.current_position, years, p.seniority
            )
        }
        NodeProperties::Skill(p) => {
            format!("{} skill (proficiency: {})", p.name, p.proficiency)
        }
        NodeProperties::Company(p) => format!("{} company", p.name),
        NodeProperties::Education(p) => {
            format!("{} degree in {} from {}", p.degree, p.field, p.institution)
        }
    }
}
