//! Background embedding generation for graph nodes

mod worker;

pub use worker::{
    node_text, EmbeddingJob, EmbeddingQueue, EmbeddingWorker, EMBEDDING_QUEUE_CAPACITY,
    EMBED_PACING,
};
