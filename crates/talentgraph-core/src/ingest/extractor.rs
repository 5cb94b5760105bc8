//! LLM-based entity extraction from resume text
//!
//! The prompt owns skill-name normalisation ("K8s" -> "Kubernetes"), so a
//! single canonical skill node serves the whole corpus. Numeric fields
//! arrive from the model as ints, floats, strings, or null; deserialisation
//! is lenient about all of them.

use std::sync::Arc;

use serde::{Deserialize, Deserializer};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::llm::{extract_json_object, ChatModel};

/// Headline facts about the candidate
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExtractedCandidate {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub current_position: String,
    #[serde(default)]
    pub seniority: String,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub total_experience_years: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExtractedSkill {
    #[serde(rename = "skill", default)]
    pub name: String,
    #[serde(default)]
    pub proficiency: String,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub years: Option<i64>,
    #[serde(default = "default_confidence")]
    pub confidence: f64,
    #[serde(default)]
    pub normalized_from: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExtractedCompany {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub position: String,
    #[serde(default)]
    pub is_current: bool,
    #[serde(default = "default_confidence")]
    pub confidence: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExtractedEducation {
    #[serde(default)]
    pub degree: String,
    #[serde(default)]
    pub field: String,
    #[serde(default)]
    pub institution: String,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub graduation_year: Option<i64>,
}

/// Everything the LLM pulled out of one resume
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CvExtraction {
    #[serde(default)]
    pub candidate: ExtractedCandidate,
    #[serde(default)]
    pub skills: Vec<ExtractedSkill>,
    #[serde(default)]
    pub companies: Vec<ExtractedCompany>,
    #[serde(default)]
    pub education: Vec<ExtractedEducation>,
    #[serde(default)]
    pub locations: Vec<String>,
    #[serde(default)]
    pub languages: Vec<String>,
}

fn default_confidence() -> f64 {
    0.6
}

/// Accept ints, floats, numeric strings, and null for year-like fields
fn lenient_i64<'de, D>(deserializer: D) -> std::result::Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| match v {
        serde_json::Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.round() as i64)),
        serde_json::Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }))
}

/// Resume parser backed by the chat collaborator
#[derive(Clone)]
pub struct CvExtractor {
    chat: Arc<dyn ChatModel>,
}

impl CvExtractor {
    pub fn new(chat: Arc<dyn ChatModel>) -> Self {
        Self { chat }
    }

    pub async fn extract(&self, cv_text: &str) -> Result<CvExtraction> {
        debug!(text_len = cv_text.len(), "Extracting entities from resume");

        let prompt = build_extraction_prompt(cv_text);
        let response = self.chat.generate(&prompt).await?;

        let json = extract_json_object(&response)
            .ok_or_else(|| Error::ExtractionFailed("no JSON object in response".into()))?;

        let extraction: CvExtraction = serde_json::from_str(json)
            .map_err(|e| Error::ExtractionFailed(format!("invalid response: {e}")))?;

        info!(
            candidate = %extraction.candidate.name,
            skills = extraction.skills.len(),
            companies = extraction.companies.len(),
            education = extraction.education.len(),
            "Entities extracted"
        );

        Ok(extraction)
    }
}

fn build_extraction_prompt(cv_text: &str) -> String {
    format!(
        r#"You are an expert CV parser. Extract structured information from this CV.

CV Text:
"""
{cv_text}
"""

Extract and return ONLY valid JSON (no markdown, no explanation) with this exact structure:
{{
  "candidate": {{
    "name": "Full name",
    "current_position": "Current job title",
    "seniority": "Junior|Mid-level|Senior|Lead|Architect",
    "total_experience_years": 0
  }},
  "skills": [
    {{
      "skill": "Canonical skill name",
      "proficiency": "Beginner|Intermediate|Advanced|Expert",
      "years": null,
      "confidence": 0.95,
      "normalized_from": "Original text if normalized"
    }}
  ],
  "companies": [
    {{
      "name": "Company name",
      "position": "Job title",
      "is_current": false,
      "confidence": 0.95
    }}
  ],
  "education": [
    {{
      "degree": "Degree type",
      "field": "Field of study",
      "institution": "University name",
      "graduation_year": null
    }}
  ],
  "locations": ["City names"],
  "languages": ["Language names"]
}}

Rules:
- Use canonical skill names: "K8s" -> "Kubernetes", "JS" -> "JavaScript", "postgres" -> "PostgreSQL"
- Record the original wording in normalized_from when you normalize a skill
- Mark at most one company as is_current
- Use null for numbers you cannot determine, never guess
- The CV may mix languages; extract regardless of language"#
    )
}
