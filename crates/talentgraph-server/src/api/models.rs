//! Request and response bodies
//!
//! The candidate shape is part of the public contract; field names and
//! nesting match the clients that depend on them.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use talentgraph_core::search::{FusedCandidate, HybridConfig};

/// `POST /api/search/hybrid` request.
///
/// Weights are optional: absence picks the default, an explicit 0.0 is
/// honoured (a zero weight is a valid way to switch a retriever off).
#[derive(Debug, Deserialize)]
pub struct HybridSearchRequest {
    #[serde(default)]
    pub query: String,
    pub bm25_weight: Option<f64>,
    pub vector_weight: Option<f64>,
    pub graph_weight: Option<f64>,
    pub top_k: Option<usize>,
    pub final_top_n: Option<usize>,
}

impl HybridSearchRequest {
    /// Merge request overrides onto the default configuration
    pub fn to_config(&self) -> HybridConfig {
        let defaults = HybridConfig::default();
        HybridConfig {
            bm25_weight: self.bm25_weight.unwrap_or(defaults.bm25_weight),
            vector_weight: self.vector_weight.unwrap_or(defaults.vector_weight),
            graph_weight: self.graph_weight.unwrap_or(defaults.graph_weight),
            top_k: self.top_k.filter(|k| *k > 0).unwrap_or(defaults.top_k),
            final_top_n: self.final_top_n.unwrap_or(defaults.final_top_n),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SkillResponse {
    pub name: String,
    pub proficiency: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub years_of_experience: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct CompanyResponse {
    pub name: String,
    pub position: String,
    pub is_current: bool,
}

/// One ranked candidate in the hybrid search response
#[derive(Debug, Serialize)]
pub struct CandidateResponse {
    pub person_id: String,
    pub name: String,
    pub current_position: String,
    pub seniority: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_experience_years: Option<i64>,
    pub skills: Vec<SkillResponse>,
    pub companies: Vec<CompanyResponse>,
    pub community: String,
    pub communities: Vec<String>,
    pub community_scores: HashMap<String, f64>,
    pub bm25_score: f64,
    pub vector_score: f64,
    pub graph_score: f64,
    pub fusion_score: f64,
    pub llm_score: f64,
    pub llm_reasoning: String,
    pub rank: usize,
}

impl From<FusedCandidate> for CandidateResponse {
    fn from(c: FusedCandidate) -> Self {
        Self {
            person_id: c.person_id,
            name: c.name,
            current_position: c.current_position,
            seniority: c.seniority,
            total_experience_years: c.total_experience_years,
            skills: c
                .skills
                .into_iter()
                .map(|s| SkillResponse {
                    name: s.name,
                    proficiency: s.proficiency,
                    years_of_experience: s.years_of_experience,
                })
                .collect(),
            companies: c
                .companies
                .into_iter()
                .map(|co| CompanyResponse {
                    name: co.name,
                    position: co.position,
                    is_current: co.is_current,
                })
                .collect(),
            community: c.community,
            communities: c.communities,
            community_scores: c.community_scores,
            bm25_score: c.bm25_score,
            vector_score: c.vector_score,
            graph_score: c.graph_score,
            fusion_score: c.fusion_score,
            llm_score: c.llm_score,
            llm_reasoning: c.llm_reasoning,
            rank: c.rank,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HybridSearchResponse {
    pub query: String,
    pub candidates: Vec<CandidateResponse>,
    pub total_found: usize,
    pub processing_time: String,
    pub method: String,
    pub config: HybridConfig,
}

/// 200 body for a duplicate upload
#[derive(Debug, Serialize)]
pub struct DuplicateUploadResponse {
    pub cv_id: i64,
    pub filename: String,
    pub file_size: i64,
    pub status: String,
    pub message: String,
    pub original_upload_at: String,
    pub duplicate: bool,
}

/// 202 body for a newly accepted upload
#[derive(Debug, Serialize)]
pub struct AcceptedUploadResponse {
    pub cv_id: i64,
    pub job_id: i64,
    pub filename: String,
    pub file_type: String,
    pub file_size: i64,
    pub text_length: usize,
    pub status: String,
    pub message: String,
    pub processing_time_ms: u64,
    pub check_status_url: String,
}

#[derive(Debug, Serialize)]
pub struct JobStatusResponse {
    pub job_id: i64,
    pub cv_file_id: i64,
    pub status: String,
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct DetectParams {
    #[serde(default)]
    pub level: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_weights_take_defaults() {
        let request: HybridSearchRequest =
            serde_json::from_str(r#"{"query": "java"}"#).unwrap();
        let config = request.to_config();

        assert_eq!(config.bm25_weight, 0.3);
        assert_eq!(config.vector_weight, 0.4);
        assert_eq!(config.graph_weight, 0.3);
        assert_eq!(config.top_k, 100);
        assert_eq!(config.final_top_n, 0);
    }

    #[test]
    fn test_explicit_zero_weight_is_honoured() {
        let request: HybridSearchRequest = serde_json::from_str(
            r#"{"query": "java", "bm25_weight": 0, "vector_weight": 0.6, "graph_weight": 0.4}"#,
        )
        .unwrap();
        let config = request.to_config();

        assert_eq!(config.bm25_weight, 0.0);
        assert!(config.weights_valid());
    }

    #[test]
    fn test_invalid_weight_sum_detected() {
        let request: HybridSearchRequest = serde_json::from_str(
            r#"{"query": "x", "bm25_weight": 0.5, "vector_weight": 0.5, "graph_weight": 0.5}"#,
        )
        .unwrap();

        assert!(!request.to_config().weights_valid());
    }
}
