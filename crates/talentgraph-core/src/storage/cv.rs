//! CV file and upload-job persistence
//!
//! `cv_files` rows are deduplicated by the SHA-256 of the extracted text;
//! `cv_upload_jobs` tracks the async extraction state machine
//! pending -> processing -> completed | failed.

use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use tracing::debug;

use crate::error::{Error, Result};

/// State of an async CV processing job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "processing" => Some(Self::Processing),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A stored resume
#[derive(Debug, Clone)]
pub struct CvFile {
    pub id: i64,
    pub candidate_id: Option<i64>,
    pub filename: String,
    pub file_path: String,
    pub file_type: String,
    pub file_size: i64,
    pub parsed_text: String,
    pub content_hash: String,
    pub uploaded_at: DateTime<Utc>,
}

/// Fields for inserting a new resume row
#[derive(Debug, Clone)]
pub struct NewCvFile {
    pub filename: String,
    pub file_path: String,
    pub file_type: String,
    pub file_size: i64,
    pub parsed_text: String,
    pub content_hash: String,
}

/// An async CV processing job
#[derive(Debug, Clone)]
pub struct CvJob {
    pub id: i64,
    pub cv_file_id: i64,
    pub status: JobStatus,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub retry_count: i64,
    pub max_retries: i64,
}

#[derive(FromRow)]
struct CvFileRow {
    id: i64,
    candidate_id: Option<i64>,
    filename: String,
    file_path: String,
    file_type: String,
    file_size: i64,
    parsed_text: String,
    content_hash: String,
    uploaded_at: String,
}

impl CvFileRow {
    fn into_file(self) -> Result<CvFile> {
        Ok(CvFile {
            id: self.id,
            candidate_id: self.candidate_id,
            filename: self.filename,
            file_path: self.file_path,
            file_type: self.file_type,
            file_size: self.file_size,
            parsed_text: self.parsed_text,
            content_hash: self.content_hash,
            uploaded_at: parse_timestamp(&self.uploaded_at)?,
        })
    }
}

#[derive(FromRow)]
struct CvJobRow {
    id: i64,
    cv_file_id: i64,
    status: String,
    error_message: Option<String>,
    created_at: String,
    started_at: Option<String>,
    completed_at: Option<String>,
    retry_count: i64,
    max_retries: i64,
}

impl CvJobRow {
    fn into_job(self) -> Result<CvJob> {
        let status = JobStatus::parse(&self.status)
            .ok_or_else(|| Error::Other(format!("unknown job status: {}", self.status)))?;

        Ok(CvJob {
            id: self.id,
            cv_file_id: self.cv_file_id,
            status,
            error_message: self.error_message,
            created_at: parse_timestamp(&self.created_at)?,
            started_at: self.started_at.as_deref().map(parse_timestamp).transpose()?,
            completed_at: self.completed_at.as_deref().map(parse_timestamp).transpose()?,
            retry_count: self.retry_count,
            max_retries: self.max_retries,
        })
    }
}

/// Store for CV files, jobs, and extraction provenance
#[derive(Debug, Clone)]
pub struct CvStore {
    pool: SqlitePool,
}

impl CvStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Look up a resume by content hash
    pub async fn find_by_hash(&self, content_hash: &str) -> Result<Option<CvFile>> {
        let row: Option<CvFileRow> = sqlx::query_as(
            r#"
            SELECT id, candidate_id, filename, file_path, file_type, file_size,
                   parsed_text, content_hash, uploaded_at
            FROM cv_files WHERE content_hash = ?
            "#,
        )
        .bind(content_hash)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| r.into_file()).transpose()
    }

    /// Insert a new resume row, returning its id
    pub async fn insert_file(&self, file: &NewCvFile) -> Result<i64> {
        let (id,): (i64,) = sqlx::query_as(
            r#"
            INSERT INTO cv_files (filename, file_path, file_type, file_size, parsed_text, content_hash, uploaded_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(&file.filename)
        .bind(&file.file_path)
        .bind(&file.file_type)
        .bind(file.file_size)
        .bind(&file.parsed_text)
        .bind(&file.content_hash)
        .bind(Utc::now().to_rfc3339())
        .fetch_one(&self.pool)
        .await?;

        debug!(cv_id = id, filename = %file.filename, "CV file stored");
        Ok(id)
    }

    /// Create a pending processing job for a resume
    pub async fn create_job(&self, cv_file_id: i64) -> Result<i64> {
        let (id,): (i64,) = sqlx::query_as(
            r#"
            INSERT INTO cv_upload_jobs (cv_file_id, status, created_at)
            VALUES (?, 'pending', ?)
            RETURNING id
            "#,
        )
        .bind(cv_file_id)
        .bind(Utc::now().to_rfc3339())
        .fetch_one(&self.pool)
        .await?;

        Ok(id)
    }

    pub async fn get_job(&self, job_id: i64) -> Result<Option<CvJob>> {
        let row: Option<CvJobRow> = sqlx::query_as(
            r#"
            SELECT id, cv_file_id, status, error_message, created_at,
                   started_at, completed_at, retry_count, max_retries
            FROM cv_upload_jobs WHERE id = ?
            "#,
        )
        .bind(job_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| r.into_job()).transpose()
    }

    /// Move a job through its state machine, stamping transition times
    pub async fn update_job_status(
        &self,
        job_id: i64,
        status: JobStatus,
        error_message: Option<&str>,
    ) -> Result<()> {
        let now = Utc::now().to_rfc3339();

        match status {
            JobStatus::Processing => {
                sqlx::query(
                    "UPDATE cv_upload_jobs SET status = ?, started_at = ? WHERE id = ?",
                )
                .bind(status.as_str())
                .bind(&now)
                .bind(job_id)
                .execute(&self.pool)
                .await?;
            }
            JobStatus::Completed | JobStatus::Failed => {
                sqlx::query(
                    "UPDATE cv_upload_jobs SET status = ?, error_message = ?, completed_at = ? WHERE id = ?",
                )
                .bind(status.as_str())
                .bind(error_message)
                .bind(&now)
                .bind(job_id)
                .execute(&self.pool)
                .await?;
            }
            JobStatus::Pending => {
                sqlx::query("UPDATE cv_upload_jobs SET status = ? WHERE id = ?")
                    .bind(status.as_str())
                    .bind(job_id)
                    .execute(&self.pool)
                    .await?;
            }
        }

        debug!(job_id, status = %status, "Job status updated");
        Ok(())
    }

    /// Record an extracted entity for provenance (write-only)
    pub async fn save_entity(
        &self,
        cv_file_id: i64,
        entity_type: &str,
        entity_value: &str,
        confidence: f64,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO cv_entities (cv_file_id, entity_type, entity_value, confidence, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(cv_file_id)
        .bind(entity_type)
        .bind(entity_value)
        .bind(confidence)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::Other(format!("invalid timestamp {raw:?}: {e}")))
}
