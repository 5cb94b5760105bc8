//! Hybrid search orchestrator
//!
//! Runs the three retrievers concurrently, joins their outputs before
//! fusion, enriches and classifies the fused slice, hands it to the LLM
//! scorer, and produces the final ordering. Retriever failures degrade to
//! empty lists; scorer failures fall back to fusion scores. The query
//! always succeeds unless storage itself is gone.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::community::{self, MEMBERSHIP_THRESHOLD};
use crate::error::Result;
use crate::graph::GraphStore;
use crate::llm::{ChatModel, EmbeddingModel};

use super::criteria::QueryAnalyzer;
use super::enrich::Enricher;
use super::fusion::{fuse, FusedCandidate};
use super::graph::GraphRetriever;
use super::keyword::KeywordRetriever;
use super::scorer::LlmScorer;
use super::vector::VectorRetriever;

/// Weights and limits for one hybrid search
#[derive(Debug, Clone, Serialize)]
pub struct HybridConfig {
    pub bm25_weight: f64,
    pub vector_weight: f64,
    pub graph_weight: f64,
    /// Per-retriever result limit
    pub top_k: usize,
    /// Candidates forwarded to the LLM; 0 means all
    pub final_top_n: usize,
}

impl Default for HybridConfig {
    fn default() -> Self {
        Self {
            bm25_weight: 0.3,
            vector_weight: 0.4,
            graph_weight: 0.3,
            top_k: 100,
            final_top_n: 0,
        }
    }
}

impl HybridConfig {
    pub fn weight_sum(&self) -> f64 {
        self.bm25_weight + self.vector_weight + self.graph_weight
    }

    /// Weights must sum to roughly one
    pub fn weights_valid(&self) -> bool {
        (0.9..=1.1).contains(&self.weight_sum())
    }
}

/// Wall-clock per pipeline stage, for observability
#[derive(Debug, Clone, Default, Serialize)]
pub struct StageTimings {
    pub retrieval_ms: u64,
    pub fusion_ms: u64,
    pub enrichment_ms: u64,
    pub scoring_ms: u64,
}

/// Result of one hybrid search
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub candidates: Vec<FusedCandidate>,
    pub timings: StageTimings,
}

/// End-to-end driver of the retrieval-and-ranking pipeline
pub struct HybridSearchEngine {
    keyword: KeywordRetriever,
    vector: VectorRetriever,
    graph: GraphRetriever,
    analyzer: QueryAnalyzer,
    enricher: Enricher,
    scorer: LlmScorer,
}

impl HybridSearchEngine {
    pub fn new(
        pool: SqlitePool,
        chat: Arc<dyn ChatModel>,
        embedder: Arc<dyn EmbeddingModel>,
    ) -> Self {
        let store = GraphStore::new(pool.clone());

        Self {
            keyword: KeywordRetriever::new(pool.clone()),
            vector: VectorRetriever::new(store.clone(), embedder),
            graph: GraphRetriever::new(pool),
            analyzer: QueryAnalyzer::new(chat.clone()),
            enricher: Enricher::new(store),
            scorer: LlmScorer::new(chat),
        }
    }

    /// Run the full pipeline for one query
    pub async fn search(&self, query: &str, config: &HybridConfig) -> Result<SearchOutcome> {
        let mut timings = StageTimings::default();
        info!(query, ?config, "Hybrid search started");

        // Three retrievers in parallel, joined before fusion. Each failure
        // degrades to an empty list.
        let stage = Instant::now();
        let (keyword_results, vector_results, graph_results) = tokio::join!(
            async {
                self.keyword.search(query, config.top_k).await.unwrap_or_else(|e| {
                    warn!(error = %e, "Keyword retrieval failed, continuing without it");
                    Vec::new()
                })
            },
            async {
                self.vector.search(query, config.top_k).await.unwrap_or_else(|e| {
                    warn!(error = %e, "Vector retrieval failed, continuing without it");
                    Vec::new()
                })
            },
            async {
                match self.analyzer.analyze(query).await {
                    Ok(criteria) => self.graph.search(&criteria).await.unwrap_or_else(|e| {
                        warn!(error = %e, "Graph retrieval failed, continuing without it");
                        Vec::new()
                    }),
                    Err(e) => {
                        warn!(error = %e, "Graph retrieval skipped (criteria extraction failed)");
                        Vec::new()
                    }
                }
            },
        );
        timings.retrieval_ms = stage.elapsed().as_millis() as u64;

        info!(
            keyword = keyword_results.len(),
            vector = vector_results.len(),
            graph = graph_results.len(),
            "Retrievers joined"
        );

        let stage = Instant::now();
        let mut candidates = fuse(
            &keyword_results,
            &vector_results,
            &graph_results,
            (config.bm25_weight, config.vector_weight, config.graph_weight),
            config.final_top_n,
        );
        timings.fusion_ms = stage.elapsed().as_millis() as u64;

        let stage = Instant::now();
        for candidate in &mut candidates {
            self.enrich_candidate(candidate).await;
        }
        timings.enrichment_ms = stage.elapsed().as_millis() as u64;

        let stage = Instant::now();
        self.apply_llm_scores(query, &mut candidates).await;
        timings.scoring_ms = stage.elapsed().as_millis() as u64;

        // Final ordering is the LLM's; rows without an identity are dropped
        candidates.sort_by(|a, b| {
            b.llm_score
                .partial_cmp(&a.llm_score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.person_id.cmp(&b.person_id))
        });
        candidates.retain(|c| !c.person_id.is_empty() && !c.name.is_empty());
        for (i, candidate) in candidates.iter_mut().enumerate() {
            candidate.rank = i + 1;
        }

        info!(
            total = candidates.len(),
            retrieval_ms = timings.retrieval_ms,
            fusion_ms = timings.fusion_ms,
            enrichment_ms = timings.enrichment_ms,
            scoring_ms = timings.scoring_ms,
            "Hybrid search complete"
        );

        Ok(SearchOutcome { candidates, timings })
    }

    /// Hydrate one candidate and classify its communities. Best-effort.
    async fn enrich_candidate(&self, candidate: &mut FusedCandidate) {
        let profile = match self.enricher.enrich(&candidate.person_id).await {
            Ok(profile) => profile,
            Err(e) => {
                warn!(person_id = %candidate.person_id, error = %e, "Enrichment failed");
                return;
            }
        };

        let skill_names: Vec<String> = profile.skills.iter().map(|s| s.name.clone()).collect();
        let communities = community::classify(&skill_names, MEMBERSHIP_THRESHOLD);

        candidate.name = profile.name;
        candidate.current_position = profile.current_position;
        candidate.seniority = profile.seniority;
        candidate.total_experience_years = profile.total_experience_years;
        candidate.skills = profile.skills;
        candidate.companies = profile.companies;
        candidate.education = profile.education;
        candidate.community = communities.primary;
        candidate.communities = communities.communities;
        candidate.community_scores = communities.scores;
    }

    /// Score via the LLM; on any failure every candidate keeps its fusion
    /// score as the LLM score and reasoning stays empty.
    async fn apply_llm_scores(&self, query: &str, candidates: &mut [FusedCandidate]) {
        let scores = match self.scorer.score_candidates(query, candidates).await {
            Ok(scores) => scores,
            Err(e) => {
                warn!(error = %e, "LLM scoring failed, falling back to fusion scores");
                for candidate in candidates.iter_mut() {
                    candidate.llm_score = candidate.fusion_score;
                }
                return;
            }
        };

        let by_person: HashMap<&str, _> = scores
            .iter()
            .map(|s| (s.person_id.as_str(), s))
            .collect();

        for candidate in candidates.iter_mut() {
            match by_person.get(candidate.person_id.as_str()) {
                Some(score) => {
                    candidate.llm_score = score.score;
                    candidate.llm_reasoning = score.reasoning.clone();
                }
                None => {
                    // The LLM skipped this candidate
                    candidate.llm_score = candidate.fusion_score;
                }
            }
        }
    }
}
