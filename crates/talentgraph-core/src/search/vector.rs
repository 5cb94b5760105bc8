//! Vector retriever over stored person embeddings
//!
//! Embeds the query, then ranks embedded person nodes by cosine similarity.
//! Persons without an embedding are invisible here; the background worker
//! fills them in over time.

use std::sync::Arc;

use crate::error::Result;
use crate::graph::GraphStore;
use crate::llm::EmbeddingModel;

/// Semantic retriever producing (person-id, similarity) pairs
#[derive(Clone)]
pub struct VectorRetriever {
    store: GraphStore,
    embedder: Arc<dyn EmbeddingModel>,
}

impl VectorRetriever {
    pub fn new(store: GraphStore, embedder: Arc<dyn EmbeddingModel>) -> Self {
        Self { store, embedder }
    }

    pub async fn search(&self, query: &str, top_k: usize) -> Result<Vec<(String, f64)>> {
        let query_embedding = self.embedder.embed(query).await?;
        let stored = self.store.person_embeddings().await?;

        let mut results: Vec<(String, f64)> = stored
            .into_iter()
            .map(|(node_id, embedding)| {
                let similarity = f64::from(cosine_similarity(&query_embedding, &embedding));
                (node_id, similarity)
            })
            .collect();

        results.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        results.truncate(top_k);

        Ok(results)
    }
}

/// Cosine similarity; zero for mismatched dimensions or zero vectors
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}
