//! Upload path: dedup by content hash, persist, enqueue
//!
//! Re-uploading a byte-identical resume returns the original row without
//! touching the graph. The enqueue is non-blocking; a full queue marks the
//! job failed rather than stalling the HTTP caller.

use sha2::{Digest, Sha256};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::error::Result;
use crate::storage::{CvFile, CvStore, JobStatus, NewCvFile};

use super::worker::IngestJob;

/// Result of one upload
#[derive(Debug, Clone)]
pub enum UploadOutcome {
    /// This text was seen before; nothing new was created
    Duplicate { existing: CvFile },
    /// New resume stored and queued for extraction
    Accepted { cv_id: i64, job_id: i64 },
}

/// Deduplicating upload pipeline
#[derive(Clone)]
pub struct IngestPipeline {
    cv_store: CvStore,
    job_tx: mpsc::Sender<IngestJob>,
}

impl IngestPipeline {
    pub fn new(cv_store: CvStore, job_tx: mpsc::Sender<IngestJob>) -> Self {
        Self { cv_store, job_tx }
    }

    /// Store an uploaded resume and queue its extraction job.
    pub async fn ingest(
        &self,
        filename: &str,
        file_path: &str,
        file_type: &str,
        file_size: i64,
        text: String,
    ) -> Result<UploadOutcome> {
        let hash = content_hash(&text);

        if let Some(existing) = self.cv_store.find_by_hash(&hash).await? {
            info!(
                cv_id = existing.id,
                filename,
                hash_prefix = &hash[..16],
                "Duplicate resume detected"
            );
            return Ok(UploadOutcome::Duplicate { existing });
        }

        let cv_id = self
            .cv_store
            .insert_file(&NewCvFile {
                filename: filename.to_string(),
                file_path: file_path.to_string(),
                file_type: file_type.to_string(),
                file_size,
                parsed_text: text.clone(),
                content_hash: hash,
            })
            .await?;

        let job_id = self.cv_store.create_job(cv_id).await?;

        let job = IngestJob {
            job_id,
            cv_file_id: cv_id,
            text,
        };

        match self.job_tx.try_send(job) {
            Ok(()) => {
                info!(cv_id, job_id, filename, "Resume queued for extraction");
            }
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(cv_id, job_id, "Ingest queue full, dropping job");
                self.cv_store
                    .update_job_status(job_id, JobStatus::Failed, Some("queue full, job dropped"))
                    .await?;
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                warn!(cv_id, job_id, "Ingest worker gone, marking job failed");
                self.cv_store
                    .update_job_status(job_id, JobStatus::Failed, Some("processing worker unavailable"))
                    .await?;
            }
        }

        Ok(UploadOutcome::Accepted { cv_id, job_id })
    }
}

/// Hex SHA-256 over the extracted text
pub fn content_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}
