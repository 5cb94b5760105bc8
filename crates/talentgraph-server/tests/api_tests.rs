//! HTTP surface tests against a live server on a random port

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use tempfile::TempDir;
use tokio::sync::mpsc;

use talentgraph_core::community_detect::CommunityDetector;
use talentgraph_core::error::Result;
use talentgraph_core::graph::{GraphStore, EMBEDDING_DIM};
use talentgraph_core::ingest::{IngestPipeline, Utf8TextExtractor, INGEST_QUEUE_CAPACITY};
use talentgraph_core::llm::{ChatModel, EmbeddingModel};
use talentgraph_core::search::HybridSearchEngine;
use talentgraph_core::storage::{CvStore, Database};
use talentgraph_server::api::create_router;
use talentgraph_server::state::AppState;

struct StubChat;

#[async_trait]
impl ChatModel for StubChat {
    async fn generate(&self, prompt: &str) -> Result<String> {
        if prompt.contains("query analyzer") {
            Ok(r#"{"skills": [], "companies": [], "positions": [], "seniority": "", "education": [], "min_experience": null, "max_experience": null, "location": []}"#.into())
        } else {
            Ok(r#"{"candidates": [], "summary": ""}"#.into())
        }
    }
}

struct StubEmbedder;

#[async_trait]
impl EmbeddingModel for StubEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Ok(vec![0.1_f32; EMBEDDING_DIM])
    }

    fn model_name(&self) -> &str {
        "stub-embedder"
    }
}

async fn spawn_app(with_engine: bool) -> (String, TempDir) {
    let tmp_dir = TempDir::new().expect("Failed to create temp dir");

    let db = Database::in_memory().await.expect("Failed to open database");
    let pool = db.pool().clone();

    let engine = if with_engine {
        Some(Arc::new(HybridSearchEngine::new(
            pool.clone(),
            Arc::new(StubChat),
            Arc::new(StubEmbedder),
        )))
    } else {
        None
    };

    // Jobs queue up but nothing processes them; uploads stay pending
    let (ingest_tx, mut ingest_rx) = mpsc::channel(INGEST_QUEUE_CAPACITY);
    tokio::spawn(async move { while ingest_rx.recv().await.is_some() {} });

    let state = AppState {
        cv_store: CvStore::new(pool.clone()),
        graph: GraphStore::new(pool.clone()),
        engine,
        pipeline: IngestPipeline::new(CvStore::new(pool.clone()), ingest_tx),
        text_extractor: Arc::new(Utf8TextExtractor),
        embeddings: None,
        detector: CommunityDetector::new(pool),
        uploads_dir: tmp_dir.path().join("uploads"),
    };

    let app = create_router(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{addr}"), tmp_dir)
}

fn multipart_file(filename: &str, bytes: &[u8]) -> reqwest::multipart::Form {
    reqwest::multipart::Form::new().part(
        "file",
        reqwest::multipart::Part::bytes(bytes.to_vec()).file_name(filename.to_string()),
    )
}

#[tokio::test]
async fn test_health() {
    let (base_url, _tmp) = spawn_app(true).await;

    let response = Client::new()
        .get(format!("{base_url}/health"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_hybrid_search_empty_corpus() {
    let (base_url, _tmp) = spawn_app(true).await;

    let response = Client::new()
        .post(format!("{base_url}/api/search/hybrid"))
        .json(&serde_json::json!({ "query": "anything" }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["total_found"], 0);
    assert_eq!(body["candidates"].as_array().unwrap().len(), 0);
    assert_eq!(body["method"], "hybrid_fusion_llm");
}

#[tokio::test]
async fn test_hybrid_search_empty_query_rejected() {
    let (base_url, _tmp) = spawn_app(true).await;

    let response = Client::new()
        .post(format!("{base_url}/api/search/hybrid"))
        .json(&serde_json::json!({ "query": "" }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn test_hybrid_search_invalid_weights_rejected() {
    let (base_url, _tmp) = spawn_app(true).await;

    let response = Client::new()
        .post(format!("{base_url}/api/search/hybrid"))
        .json(&serde_json::json!({
            "query": "x",
            "bm25_weight": 0.5,
            "vector_weight": 0.5,
            "graph_weight": 0.5
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn test_hybrid_search_zero_weight_accepted() {
    let (base_url, _tmp) = spawn_app(true).await;

    let response = Client::new()
        .post(format!("{base_url}/api/search/hybrid"))
        .json(&serde_json::json!({
            "query": "x",
            "bm25_weight": 0.0,
            "vector_weight": 0.6,
            "graph_weight": 0.4
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn test_hybrid_search_unavailable_without_embeddings() {
    let (base_url, _tmp) = spawn_app(false).await;

    let response = Client::new()
        .post(format!("{base_url}/api/search/hybrid"))
        .json(&serde_json::json!({ "query": "java" }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 503);
}

#[tokio::test]
async fn test_upload_requires_file() {
    let (base_url, _tmp) = spawn_app(true).await;

    let form = reqwest::multipart::Form::new().text("note", "no file here");
    let response = Client::new()
        .post(format!("{base_url}/api/cv/upload"))
        .multipart(form)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn test_upload_rejects_unsupported_extension() {
    let (base_url, _tmp) = spawn_app(true).await;

    let response = Client::new()
        .post(format!("{base_url}/api/cv/upload"))
        .multipart(multipart_file("malware.exe", b"hello"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn test_upload_then_duplicate() {
    let (base_url, _tmp) = spawn_app(true).await;
    let client = Client::new();

    let first = client
        .post(format!("{base_url}/api/cv/upload"))
        .multipart(multipart_file("resume.txt", b"hello world"))
        .send()
        .await
        .unwrap();
    assert_eq!(first.status(), 202);

    let first_body: serde_json::Value = first.json().await.unwrap();
    let cv_id = first_body["cv_id"].as_i64().unwrap();
    let job_id = first_body["job_id"].as_i64().unwrap();
    assert_eq!(first_body["status"], "pending");
    assert_eq!(
        first_body["check_status_url"],
        format!("/api/cv/job/{job_id}")
    );

    // Same text in a differently named file is still a duplicate
    let second = client
        .post(format!("{base_url}/api/cv/upload"))
        .multipart(multipart_file("copy.txt", b"hello world"))
        .send()
        .await
        .unwrap();
    assert_eq!(second.status(), 200);

    let second_body: serde_json::Value = second.json().await.unwrap();
    assert_eq!(second_body["status"], "duplicate");
    assert_eq!(second_body["cv_id"].as_i64().unwrap(), cv_id);
    assert_eq!(second_body["duplicate"], true);
}

#[tokio::test]
async fn test_job_status() {
    let (base_url, _tmp) = spawn_app(true).await;
    let client = Client::new();

    let missing = client
        .get(format!("{base_url}/api/cv/job/999"))
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status(), 404);

    let upload = client
        .post(format!("{base_url}/api/cv/upload"))
        .multipart(multipart_file("resume.txt", b"some resume text"))
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = upload.json().await.unwrap();
    let job_id = body["job_id"].as_i64().unwrap();

    let status = client
        .get(format!("{base_url}/api/cv/job/{job_id}"))
        .send()
        .await
        .unwrap();
    assert_eq!(status.status(), 200);

    let status_body: serde_json::Value = status.json().await.unwrap();
    assert_eq!(status_body["job_id"].as_i64().unwrap(), job_id);
    assert_eq!(status_body["status"], "pending");
    assert_eq!(status_body["message"], "CV processing queued");
}

#[tokio::test]
async fn test_embeddings_generate_unavailable_without_provider() {
    let (base_url, _tmp) = spawn_app(true).await;

    let response = Client::new()
        .post(format!("{base_url}/api/graphrag/embeddings/generate"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 503);
}

#[tokio::test]
async fn test_graph_stats_empty() {
    let (base_url, _tmp) = spawn_app(true).await;

    let response = Client::new()
        .get(format!("{base_url}/api/graph/stats"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["total_nodes"], 0);
    assert_eq!(body["total_edges"], 0);
}

#[tokio::test]
async fn test_communities_detect_empty_graph() {
    let (base_url, _tmp) = spawn_app(true).await;

    let response = Client::new()
        .post(format!("{base_url}/api/graphrag/communities/detect?level=0"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["stats"]["total_communities"], 0);
}
