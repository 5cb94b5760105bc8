//! HTTP request handlers

use std::path::Path as FsPath;
use std::time::{Duration, Instant};

use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::{info, warn};

use talentgraph_core::embedding::EMBED_PACING;
use talentgraph_core::ingest::UploadOutcome;
use talentgraph_core::storage::JobStatus;

use crate::state::AppState;

use super::errors::ApiError;
use super::models::{
    AcceptedUploadResponse, CandidateResponse, DetectParams, DuplicateUploadResponse,
    HybridSearchRequest, HybridSearchResponse, JobStatusResponse,
};

/// Accepted resume file extensions
const ALLOWED_EXTENSIONS: &[&str] = &[".pdf", ".docx", ".doc", ".txt"];

/// `GET /health`
pub async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "healthy" }))
}

/// `POST /api/search/hybrid`
pub async fn hybrid_search(
    State(state): State<AppState>,
    Json(request): Json<HybridSearchRequest>,
) -> Result<Json<HybridSearchResponse>, ApiError> {
    let Some(engine) = &state.engine else {
        return Err(ApiError::ServiceUnavailable(
            "Hybrid search not available (OpenAI API key required)".into(),
        ));
    };

    if request.query.is_empty() {
        return Err(ApiError::BadRequest("Query cannot be empty".into()));
    }

    let config = request.to_config();
    if !config.weights_valid() {
        return Err(ApiError::BadRequest("Weights must sum to 1.0".into()));
    }

    info!(
        query = %request.query,
        bm25 = config.bm25_weight,
        vector = config.vector_weight,
        graph = config.graph_weight,
        "Hybrid search request"
    );

    let started = Instant::now();
    let outcome = engine.search(&request.query, &config).await?;
    let elapsed = started.elapsed();

    let candidates: Vec<CandidateResponse> =
        outcome.candidates.into_iter().map(CandidateResponse::from).collect();

    info!(
        query = %request.query,
        total = candidates.len(),
        elapsed_ms = elapsed.as_millis() as u64,
        "Hybrid search answered"
    );

    Ok(Json(HybridSearchResponse {
        query: request.query,
        total_found: candidates.len(),
        candidates,
        processing_time: format!("{elapsed:?}"),
        method: "hybrid_fusion_llm".into(),
        config,
    }))
}

/// `POST /api/cv/upload` (multipart/form-data)
pub async fn upload_cv(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Response, ApiError> {
    let started = Instant::now();

    let mut upload: Option<(String, Vec<u8>)> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("invalid multipart body: {e}")))?
    {
        if field.name() == Some("file") {
            let filename = field.file_name().unwrap_or("resume").to_string();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ApiError::BadRequest(format!("failed to read file: {e}")))?;
            upload = Some((filename, bytes.to_vec()));
            break;
        }
    }

    let Some((filename, bytes)) = upload else {
        return Err(ApiError::BadRequest("no file uploaded".into()));
    };

    let extension = file_extension(&filename);
    if !ALLOWED_EXTENSIONS.contains(&extension.as_str()) {
        return Err(ApiError::BadRequest(
            "invalid file type (supported: PDF, DOCX, TXT)".into(),
        ));
    }

    let text = state.text_extractor.extract(&filename, &bytes)?;
    info!(filename = %filename, text_len = text.len(), "Resume parsed");

    let file_path = state.uploads_dir.join(&filename);
    let file_size = bytes.len() as i64;

    let outcome = state
        .pipeline
        .ingest(
            &filename,
            &file_path.to_string_lossy(),
            &extension,
            file_size,
            text.clone(),
        )
        .await?;

    match outcome {
        UploadOutcome::Duplicate { existing } => {
            let body = DuplicateUploadResponse {
                cv_id: existing.id,
                filename: existing.filename,
                file_size: existing.file_size,
                status: "duplicate".into(),
                message: "This CV has already been uploaded".into(),
                original_upload_at: existing.uploaded_at.to_rfc3339(),
                duplicate: true,
            };
            Ok((StatusCode::OK, Json(body)).into_response())
        }
        UploadOutcome::Accepted { cv_id, job_id } => {
            // Raw bytes land on disk only for new uploads
            if let Err(e) = persist_upload(&state, &file_path, &bytes).await {
                warn!(filename = %filename, error = %e, "Could not persist raw resume bytes");
            }

            let body = AcceptedUploadResponse {
                cv_id,
                job_id,
                filename,
                file_type: extension,
                file_size,
                text_length: text.len(),
                status: "pending".into(),
                message: "CV uploaded successfully. Processing in background.".into(),
                processing_time_ms: started.elapsed().as_millis() as u64,
                check_status_url: format!("/api/cv/job/{job_id}"),
            };
            Ok((StatusCode::ACCEPTED, Json(body)).into_response())
        }
    }
}

async fn persist_upload(
    state: &AppState,
    file_path: &FsPath,
    bytes: &[u8],
) -> std::io::Result<()> {
    tokio::fs::create_dir_all(&state.uploads_dir).await?;
    tokio::fs::write(file_path, bytes).await
}

fn file_extension(filename: &str) -> String {
    FsPath::new(filename)
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy().to_lowercase()))
        .unwrap_or_default()
}

/// `GET /api/cv/job/{job_id}`
pub async fn job_status(
    State(state): State<AppState>,
    Path(job_id): Path<i64>,
) -> Result<Json<JobStatusResponse>, ApiError> {
    let Some(job) = state.cv_store.get_job(job_id).await? else {
        return Err(ApiError::NotFound("job not found".into()));
    };

    let message = match job.status {
        JobStatus::Pending => "CV processing queued",
        JobStatus::Processing => "CV processing in progress",
        JobStatus::Completed => "CV processing completed successfully",
        JobStatus::Failed => "CV processing failed",
    };

    Ok(Json(JobStatusResponse {
        job_id: job.id,
        cv_file_id: job.cv_file_id,
        status: job.status.to_string(),
        created_at: job.created_at.to_rfc3339(),
        started_at: job.started_at.map(|t| t.to_rfc3339()),
        completed_at: job.completed_at.map(|t| t.to_rfc3339()),
        error: job.error_message,
        message: message.into(),
    }))
}

/// `POST /api/graphrag/embeddings/generate`
pub async fn generate_embeddings(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let Some(queue) = &state.embeddings else {
        return Err(ApiError::ServiceUnavailable(
            "Vector embeddings not available (OpenAI API key not configured)".into(),
        ));
    };

    let node_ids = state.graph.nodes_without_embeddings().await?;
    if node_ids.is_empty() {
        return Ok(Json(json!({
            "success": true,
            "message": "All nodes already have embeddings",
            "stats": { "pending_nodes": 0 }
        })));
    }

    let pending = node_ids.len();
    // CV id 0 marks corpus-wide batches
    queue.enqueue(0, node_ids);

    let estimate = EMBED_PACING * pending as u32;
    Ok(Json(json!({
        "success": true,
        "message": format!("Background embedding generation started for {pending} nodes"),
        "pending_nodes": pending,
        "estimated_time": format_duration(estimate),
        "rate_limit_info": "0.2 seconds between requests",
    })))
}

/// `POST /api/graphrag/communities/detect?level=<int>`
pub async fn detect_communities(
    State(state): State<AppState>,
    Query(params): Query<DetectParams>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let started = Instant::now();
    let summary = state.detector.detect(params.level).await?;

    Ok(Json(json!({
        "success": true,
        "processing_time": format!("{:?}", started.elapsed()),
        "level": summary.level,
        "stats": {
            "total_communities": summary.communities,
            "total_members": summary.members,
        },
        "message": "Community detection completed successfully",
    })))
}

/// `GET /api/graph/stats`
pub async fn graph_stats(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let total_nodes = state.graph.count_nodes().await?;
    let total_edges = state.graph.count_edges().await?;
    let node_types: serde_json::Map<String, serde_json::Value> = state
        .graph
        .node_type_counts()
        .await?
        .into_iter()
        .map(|(t, n)| (t, json!(n)))
        .collect();

    Ok(Json(json!({
        "total_nodes": total_nodes,
        "total_edges": total_edges,
        "node_types": node_types,
    })))
}

/// `GET /api/graph/skills/popular`
pub async fn popular_skills(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let skills: Vec<serde_json::Value> = state
        .graph
        .popular_skills(20)
        .await?
        .into_iter()
        .map(|(skill, count)| json!({ "skill": skill, "count": count }))
        .collect();

    Ok(Json(json!({
        "total": skills.len(),
        "skills": skills,
    })))
}

fn format_duration(d: Duration) -> String {
    format!("{:.1}s", d.as_secs_f64())
}
