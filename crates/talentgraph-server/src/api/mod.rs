//! API router and HTTP surface

pub mod errors;
pub mod handlers;
pub mod models;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Uploads above this size are rejected
const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Build the application router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/search/hybrid", post(handlers::hybrid_search))
        .route("/api/cv/upload", post(handlers::upload_cv))
        .route("/api/cv/job/{job_id}", get(handlers::job_status))
        .route(
            "/api/graphrag/embeddings/generate",
            post(handlers::generate_embeddings),
        )
        .route(
            "/api/graphrag/communities/detect",
            post(handlers::detect_communities),
        )
        .route("/api/graph/stats", get(handlers::graph_stats))
        .route("/api/graph/skills/popular", get(handlers::popular_skills))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
