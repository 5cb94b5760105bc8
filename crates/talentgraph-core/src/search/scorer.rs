//! LLM candidate scoring
//!
//! One prompt carries every enriched candidate; the model returns a score,
//! confidence, reasoning, evidence, and a fit label per candidate. These
//! are the sole input to the final ordering. Results are cached per
//! (query, candidate set); any scorer failure is the caller's signal to
//! fall back to fusion scores.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::llm::{extract_json_object, ChatModel};

use super::cache::ScoreCache;
use super::enrich::{CompanyInfo, SkillInfo};
use super::fusion::FusedCandidate;

/// The LLM's evaluation of one candidate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateScore {
    #[serde(default)]
    pub person_id: String,
    /// 0-100, clamped on parse
    #[serde(default)]
    pub score: f64,
    /// 0-1, clamped on parse
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub reasoning: String,
    #[serde(default)]
    pub evidence: Vec<String>,
    /// excellent | good | fair | poor; imputed from the score when missing
    #[serde(default)]
    pub fit: String,
}

#[derive(Debug, Deserialize)]
struct ScoreResponse {
    #[serde(default)]
    candidates: Vec<CandidateScore>,
    #[serde(default)]
    #[allow(dead_code)]
    summary: String,
}

/// Pure-LLM candidate scorer with a TTL result cache
pub struct LlmScorer {
    chat: Arc<dyn ChatModel>,
    cache: ScoreCache,
}

impl LlmScorer {
    pub fn new(chat: Arc<dyn ChatModel>) -> Self {
        Self::with_cache(chat, ScoreCache::new(super::cache::DEFAULT_TTL))
    }

    pub fn with_cache(chat: Arc<dyn ChatModel>, cache: ScoreCache) -> Self {
        Self { chat, cache }
    }

    pub fn with_ttl(chat: Arc<dyn ChatModel>, ttl: Duration) -> Self {
        Self::with_cache(chat, ScoreCache::new(ttl))
    }

    /// Score every candidate against the query.
    ///
    /// Cache hits skip the LLM entirely. Errors propagate so the caller can
    /// engage its fusion-score fallback.
    pub async fn score_candidates(
        &self,
        query: &str,
        candidates: &[FusedCandidate],
    ) -> Result<Vec<CandidateScore>> {
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let candidate_ids: Vec<String> =
            candidates.iter().map(|c| c.person_id.clone()).collect();

        if let Some(cached) = self.cache.get(query, &candidate_ids) {
            info!(query, candidates = cached.len(), "Score cache hit, skipping LLM");
            return Ok(cached);
        }

        debug!(query, candidates = candidates.len(), "Scoring candidates via LLM");

        let prompt = build_scoring_prompt(query, candidates);
        let response = self.chat.generate(&prompt).await?;
        let scores = parse_score_response(&response)?;

        info!(query, scored = scores.len(), "Candidates scored");
        self.cache.put(query, &candidate_ids, scores.clone());

        Ok(scores)
    }
}

/// Build the single scoring prompt listing every candidate
fn build_scoring_prompt(query: &str, candidates: &[FusedCandidate]) -> String {
    let mut prompt = format!(
        r#"You are an expert technical recruiter. Score each candidate for this job query.

**Job Query:** {query}

**Your Task:**
1. Evaluate each candidate's match quality (0-100 score)
2. Provide confidence level (0-1)
3. Explain your reasoning
4. List key evidence (skills, experience, etc.)
5. Assign fit level: excellent/good/fair/poor

**Scoring Guidelines:**
- 90-100: Perfect match (exceeds requirements)
- 80-89: Excellent match (meets all requirements)
- 70-79: Strong match (meets most requirements)
- 60-69: Good match (meets many requirements)
- 40-59: Fair match (meets some requirements)
- 0-39: Poor match (does not meet requirements)

**Rules:**
- Within the same community, a candidate with more years of experience MUST score higher than one with fewer years
- A community match is more important than a job-title match
- Be objective and evidence-based

**Candidates:**
"#
    );

    for (i, c) in candidates.iter().enumerate() {
        let communities = if c.communities.is_empty() {
            "general".to_string()
        } else {
            c.communities.join(", ")
        };
        let experience = c
            .total_experience_years
            .map(|y| y.to_string())
            .unwrap_or_else(|| "unknown".into());

        prompt.push_str(&format!(
            r#"
---
Candidate {n}:
- Person ID: {person_id}
- Name: {name}
- Current Position: {position}
- Community: {communities}
- Seniority: {seniority}
- Total Experience Years: {experience}
- Skills: {skills}
- Companies: {companies}

"#,
            n = i + 1,
            person_id = c.person_id,
            name = c.name,
            position = c.current_position,
            communities = communities,
            seniority = c.seniority,
            experience = experience,
            skills = format_skills(&c.skills),
            companies = format_companies(&c.companies),
        ));
    }

    prompt.push_str(
        r#"
**Response Format (JSON):**
{
  "candidates": [
    {
      "person_id": "person_xxx",
      "score": 85.5,
      "confidence": 0.9,
      "reasoning": "Strong backend experience with Go and microservices.",
      "evidence": ["Go expert", "Led migration to microservices"],
      "fit": "excellent"
    }
  ],
  "summary": "Found 3 strong candidates."
}

**Important:**
- Score ALL candidates in the list
- Return ONLY valid JSON, no markdown formatting
"#,
    );

    prompt
}

/// Parse, clamp, and normalise the LLM's score response
fn parse_score_response(response: &str) -> Result<Vec<CandidateScore>> {
    let json = extract_json_object(response)
        .ok_or_else(|| Error::Llm("no JSON object in score response".into()))?;

    let parsed: ScoreResponse = serde_json::from_str(json)
        .map_err(|e| Error::Llm(format!("unparseable score response: {e}")))?;

    let mut scores = parsed.candidates;
    for score in &mut scores {
        score.score = score.score.clamp(0.0, 100.0);
        score.confidence = score.confidence.clamp(0.0, 1.0);
        if score.fit.is_empty() {
            score.fit = impute_fit(score.score).to_string();
        }
    }

    Ok(scores)
}

fn impute_fit(score: f64) -> &'static str {
    if score >= 75.0 {
        "excellent"
    } else if score >= 60.0 {
        "good"
    } else if score >= 40.0 {
        "fair"
    } else {
        "poor"
    }
}

/// `Name (Proficiency, N yrs)` per skill
fn format_skills(skills: &[SkillInfo]) -> String {
    if skills.is_empty() {
        return "None listed".into();
    }

    skills
        .iter()
        .map(|s| match (&s.proficiency, s.years_of_experience) {
            (p, Some(years)) if !p.is_empty() => format!("{} ({p}, {years} yrs)", s.name),
            (p, None) if !p.is_empty() => format!("{} ({p})", s.name),
            (_, Some(years)) => format!("{} ({years} yrs)", s.name),
            _ => s.name.clone(),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn format_companies(companies: &[CompanyInfo]) -> String {
    if companies.is_empty() {
        return "None listed".into();
    }

    companies
        .iter()
        .map(|c| {
            if c.is_current {
                format!("{} (Current)", c.name)
            } else {
                c.name.clone()
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}
