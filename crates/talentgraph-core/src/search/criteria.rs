//! Structured search criteria extracted from free-text queries
//!
//! The graph retriever cannot traverse prose; an LLM call turns the query
//! into a criterion object first. Queries often mix languages, so the
//! normalisation rules live in the prompt rather than in code.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::llm::{extract_json_object, ChatModel};

/// Structured criteria for graph traversal; every field may be empty
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SearchCriteria {
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub companies: Vec<String>,
    #[serde(default)]
    pub positions: Vec<String>,
    #[serde(default)]
    pub seniority: String,
    #[serde(default)]
    pub education: Vec<String>,
    #[serde(default)]
    pub min_experience: Option<i64>,
    #[serde(default)]
    pub max_experience: Option<i64>,
    #[serde(default)]
    pub location: Vec<String>,
}

impl SearchCriteria {
    /// Number of criteria the traversal enforces as a conjunction.
    ///
    /// Positions and location are extracted for the LLM scorer's benefit but
    /// are not part of the traversal, so they do not count.
    pub fn traversal_criteria_count(&self) -> usize {
        let mut count = self.skills.len() + self.companies.len() + self.education.len();
        if !self.seniority.is_empty() {
            count += 1;
        }
        if self.min_experience.map_or(false, |v| v > 0) {
            count += 1;
        }
        if self.max_experience.map_or(false, |v| v > 0) {
            count += 1;
        }
        count
    }
}

/// Turns a natural-language query into [`SearchCriteria`] via the LLM
#[derive(Clone)]
pub struct QueryAnalyzer {
    chat: Arc<dyn ChatModel>,
}

impl QueryAnalyzer {
    pub fn new(chat: Arc<dyn ChatModel>) -> Self {
        Self { chat }
    }

    pub async fn analyze(&self, query: &str) -> Result<SearchCriteria> {
        let prompt = build_analysis_prompt(query);
        let response = self.chat.generate(&prompt).await?;

        let json = extract_json_object(&response)
            .ok_or_else(|| Error::Llm("no JSON object in query analysis response".into()))?;

        let criteria: SearchCriteria = serde_json::from_str(json)
            .map_err(|e| Error::Llm(format!("unparseable query analysis: {e}")))?;

        debug!(?criteria, "Query analyzed");
        Ok(criteria)
    }
}

fn build_analysis_prompt(query: &str) -> String {
    format!(
        r#"You are a talent search query analyzer. Extract structured search criteria from the user's natural language query.

User Query: "{query}"

Extract and return ONLY valid JSON with this structure:
{{
  "skills": ["skill names in canonical form"],
  "companies": ["company names"],
  "positions": ["job titles"],
  "seniority": "Junior|Mid-level|Senior|Lead|Architect",
  "education": ["institution names or degree types"],
  "min_experience": null,
  "max_experience": null,
  "location": ["city or country names"]
}}

Rules:
- Normalize skill names (e.g., "JS" -> "JavaScript", "K8s" -> "Kubernetes")
- Extract implicit requirements (e.g., "senior Java dev" -> skills: ["Java"], seniority: "Senior")
- "developer", "engineer", "architect" are job titles/positions, NOT skills
- For experience: "5+ years" -> min_experience: 5, "3-5 years" -> min_experience: 3, max_experience: 5
- Return empty arrays for missing criteria, not null
- If no specific seniority is mentioned, leave it an empty string ""
- The query may mix languages; extract criteria regardless of language

Now analyze this query and return ONLY the JSON:"#
    )
}
