//! Fusion of the three retriever outputs
//!
//! Each list contributes `(score/max_score + 1/(60+rank))/2` per person;
//! absence from a list contributes zero on that axis. The weighted sum
//! orders the fused set. Deterministic for fixed inputs: ties break on
//! ascending person-id.

use std::collections::HashMap;

use serde::Serialize;

use super::enrich::{CompanyInfo, EducationInfo, SkillInfo};

/// Ranked output of a single retriever: (person-id, raw score)
pub type RetrievedList = Vec<(String, f64)>;

/// Reciprocal-rank constant; 60 is the customary value
const RRF_K: f64 = 60.0;

/// A candidate carrying per-source scores and, after enrichment, the full
/// profile handed to the LLM scorer
#[derive(Debug, Clone, Default, Serialize)]
pub struct FusedCandidate {
    pub person_id: String,
    pub name: String,
    pub current_position: String,
    pub seniority: String,
    pub total_experience_years: Option<i64>,
    pub skills: Vec<SkillInfo>,
    pub companies: Vec<CompanyInfo>,
    pub education: Vec<EducationInfo>,
    /// Primary community tag, computed fresh from HAS_SKILL edges
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

impl FusedCandidate {
    fn new(person_id: &str) -> Self {
        Self {
            person_id: person_id.to_string(),
            ..Default::default()
        }
    }
}

/// Per-list contribution of a person at 1-based `rank` with raw score
/// `score`, where `max_score` is the list's maximum raw score.
fn contribution(score: f64, max_score: f64, rank: usize) -> f64 {
    let normalised = score / max_score;
    let rrf = 1.0 / (RRF_K + rank as f64);
    (normalised + rrf) / 2.0
}

/// Maximum raw score of a list; 1.0 keeps the division defined for empty
/// or all-zero lists.
fn max_raw(list: &[(String, f64)]) -> f64 {
    let max = list.iter().map(|(_, s)| *s).fold(0.0, f64::max);
    if max > 0.0 {
        max
    } else {
        1.0
    }
}

/// Fuse the three ranked lists into one ordered candidate set.
///
/// `final_top_n` of zero means no truncation.
pub fn fuse(
    keyword: &[(String, f64)],
    vector: &[(String, f64)],
    graph: &[(String, f64)],
    weights: (f64, f64, f64),
    final_top_n: usize,
) -> Vec<FusedCandidate> {
    let (w_keyword, w_vector, w_graph) = weights;
    let mut by_person: HashMap<String, FusedCandidate> = HashMap::new();

    let max_keyword = max_raw(keyword);
    for (i, (person_id, score)) in keyword.iter().enumerate() {
        by_person
            .entry(person_id.clone())
            .or_insert_with(|| FusedCandidate::new(person_id))
            .bm25_score = contribution(*score, max_keyword, i + 1);
    }

    let max_vector = max_raw(vector);
    for (i, (person_id, score)) in vector.iter().enumerate() {
        by_person
            .entry(person_id.clone())
            .or_insert_with(|| FusedCandidate::new(person_id))
            .vector_score = contribution(*score, max_vector, i + 1);
    }

    let max_graph = max_raw(graph);
    for (i, (person_id, score)) in graph.iter().enumerate() {
        by_person
            .entry(person_id.clone())
            .or_insert_with(|| FusedCandidate::new(person_id))
            .graph_score = contribution(*score, max_graph, i + 1);
    }

    let mut fused: Vec<FusedCandidate> = by_person
        .into_values()
        .map(|mut c| {
            c.fusion_score =
                w_keyword * c.bm25_score + w_vector * c.vector_score + w_graph * c.graph_score;
            c
        })
        .collect();

    fused.sort_by(|a, b| {
        b.fusion_score
            .partial_cmp(&a.fusion_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.person_id.cmp(&b.person_id))
    });

    if final_top_n > 0 && fused.len() > final_top_n {
        fused.truncate(final_top_n);
    }

    for (i, candidate) in fused.iter_mut().enumerate() {
        candidate.rank = i + 1;
    }

    fused
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEFAULT_WEIGHTS: (f64, f64, f64) = (0.3, 0.4, 0.3);

    fn list(items: &[(&str, f64)]) -> Vec<(String, f64)> {
        items.iter().map(|(id, s)| ((*id).to_string(), *s)).collect()
    }

    #[test]
    fn test_contribution_formula() {
        // rank 1 with the max score: (1.0 + 1/61) / 2
        let expected = (1.0 + 1.0 / 61.0) / 2.0;
        assert!((contribution(0.8, 0.8, 1) - expected).abs() < 1e-12);

        // rank 3 with half the max: (0.5 + 1/63) / 2
        let expected = (0.5 + 1.0 / 63.0) / 2.0;
        assert!((contribution(0.4, 0.8, 3) - expected).abs() < 1e-12);
    }

    #[test]
    fn test_absent_list_contributes_zero() {
        let fused = fuse(
            &[],
            &list(&[("person_1", 0.9)]),
            &[],
            DEFAULT_WEIGHTS,
            0,
        );

        assert_eq!(fused.len(), 1);
        assert_eq!(fused[0].bm25_score, 0.0);
        assert_eq!(fused[0].graph_score, 0.0);
        assert!(fused[0].vector_score > 0.0);
        assert!((fused[0].fusion_score - 0.4 * fused[0].vector_score).abs() < 1e-12);
    }

    #[test]
    fn test_fusion_is_weighted_sum() {
        let fused = fuse(
            &list(&[("person_1", 2.0)]),
            &list(&[("person_1", 0.9)]),
            &list(&[("person_1", 3.0)]),
            DEFAULT_WEIGHTS,
            0,
        );

        let c = &fused[0];
        let expected = 0.3 * c.bm25_score + 0.4 * c.vector_score + 0.3 * c.graph_score;
        assert!((c.fusion_score - expected).abs() < 1e-12);
    }

    #[test]
    fn test_overlap_outranks_single_source() {
        let fused = fuse(
            &list(&[("person_1", 1.0)]),
            &list(&[("person_1", 0.9), ("person_2", 0.9)]),
            &[],
            DEFAULT_WEIGHTS,
            0,
        );

        assert_eq!(fused[0].person_id, "person_1");
        assert!(fused[0].fusion_score > fused[1].fusion_score);
    }

    #[test]
    fn test_deterministic_with_id_tiebreak() {
        // Identical scores: ordering must fall back to ascending person-id
        let vector = list(&[("person_b", 0.5), ("person_a", 0.5)]);
        let first = fuse(&[], &vector, &[], DEFAULT_WEIGHTS, 0);
        let second = fuse(&[], &vector, &[], DEFAULT_WEIGHTS, 0);

        let order: Vec<&str> = first.iter().map(|c| c.person_id.as_str()).collect();
        assert_eq!(
            order,
            second.iter().map(|c| c.person_id.as_str()).collect::<Vec<_>>()
        );
        // person_b sits at rank 1 in the input, so its contribution is
        // higher; equal contributions only arise at equal ranks
        assert_eq!(order[0], "person_b");
    }

    #[test]
    fn test_equal_contributions_sorted_by_id() {
        // Same person sets at the same ranks in different lists with the
        // same weights on both sides of the tie
        let fused = fuse(
            &[],
            &list(&[("person_z", 1.0)]),
            &list(&[("person_a", 1.0)]),
            (0.0, 0.5, 0.5),
            0,
        );

        assert_eq!(fused[0].person_id, "person_a");
        assert_eq!(fused[1].person_id, "person_z");
        assert_eq!(fused[0].rank, 1);
        assert_eq!(fused[1].rank, 2);
    }

    #[test]
    fn test_final_top_n_truncation() {
        let vector = list(&[("person_1", 0.9), ("person_2", 0.8), ("person_3", 0.7)]);

        let unlimited = fuse(&[], &vector, &[], DEFAULT_WEIGHTS, 0);
        assert_eq!(unlimited.len(), 3);

        let capped = fuse(&[], &vector, &[], DEFAULT_WEIGHTS, 2);
        assert_eq!(capped.len(), 2);
        assert_eq!(capped[0].person_id, "person_1");
    }

    #[test]
    fn test_empty_inputs() {
        assert!(fuse(&[], &[], &[], DEFAULT_WEIGHTS, 0).is_empty());
    }

    #[test]
    fn test_all_zero_graph_scores() {
        // A graph list with zero criteria yields zero raw scores; the RRF
        // component still orders by rank
        let graph = list(&[("person_1", 0.0), ("person_2", 0.0)]);
        let fused = fuse(&[], &[], &graph, DEFAULT_WEIGHTS, 0);

        assert_eq!(fused.len(), 2);
        assert_eq!(fused[0].person_id, "person_1");
        assert!(fused[0].graph_score > fused[1].graph_score);
    }
}
