//! Graph node kinds and their typed properties
//!
//! One person node per resume (`person_<cvID>`); skills, companies and
//! education institutions are shared across people through their canonical
//! node ids.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// Embedding dimension of the reference provider (text-embedding-3-small)
pub const EMBEDDING_DIM: usize = 1536;

/// Node kinds of the knowledge graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Person,
    Skill,
    Company,
    Education,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Person => "person",
            Self::Skill => "skill",
            Self::Company => "company",
            Self::Education => "education",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "person" => Some(Self::Person),
            "skill" => Some(Self::Skill),
            "company" => Some(Self::Company),
            "education" => Some(Self::Education),
            _ => None,
        }
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Person attributes; one node per resume
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PersonProps {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cv_id: Option<i64>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub current_position: String,
    /// One of Junior, Mid-level, Senior, Lead, Architect, or empty
    #[serde(default)]
    pub seniority: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_experience_years: Option<i64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Skill attributes; the node id carries the canonical name
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SkillProps {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub proficiency: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompanyProps {
    #[serde(default)]
    pub name: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EducationProps {
    #[serde(default)]
    pub institution: String,
    #[serde(default)]
    pub degree: String,
    #[serde(default)]
    pub field: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub graduation_year: Option<i64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Typed node properties, one variant per node kind
#[derive(Debug, Clone)]
pub enum NodeProperties {
    Person(PersonProps),
    Skill(SkillProps),
    Company(CompanyProps),
    Education(EducationProps),
}

impl NodeProperties {
    pub fn kind(&self) -> NodeKind {
        match self {
            Self::Person(_) => NodeKind::Person,
            Self::Skill(_) => NodeKind::Skill,
            Self::Company(_) => NodeKind::Company,
            Self::Education(_) => NodeKind::Education,
        }
    }

    /// Serialize to the JSON stored in the properties column
    pub fn to_json(&self) -> Result<String> {
        let json = match self {
            Self::Person(p) => serde_json::to_string(p)?,
            Self::Skill(p) => serde_json::to_string(p)?,
            Self::Company(p) => serde_json::to_string(p)?,
            Self::Education(p) => serde_json::to_string(p)?,
        };
        Ok(json)
    }

    /// Deserialize from the stored JSON, dispatching on the node_type column
    pub fn from_json(kind: NodeKind, raw: &str) -> Result<Self> {
        let props = match kind {
            NodeKind::Person => Self::Person(serde_json::from_str(raw)?),
            NodeKind::Skill => Self::Skill(serde_json::from_str(raw)?),
            NodeKind::Company => Self::Company(serde_json::from_str(raw)?),
            NodeKind::Education => Self::Education(serde_json::from_str(raw)?),
        };
        Ok(props)
    }

    /// Display name of the underlying entity
    pub fn display_name(&self) -> &str {
        match self {
            Self::Person(p) => &p.name,
            Self::Skill(p) => &p.name,
            Self::Company(p) => &p.name,
            Self::Education(p) => &p.institution,
        }
    }

    pub fn as_person(&self) -> Option<&PersonProps> {
        match self {
            Self::Person(p) => Some(p),
            _ => None,
        }
    }
}

/// A node loaded from the store
#[derive(Debug, Clone)]
pub struct GraphNode {
    /// Internal row id, used as edge endpoint
    pub db_id: i64,
    /// Opaque external id (`person_3`, `skill_Java`, ...)
    pub node_id: String,
    pub properties: NodeProperties,
}

impl GraphNode {
    pub fn kind(&self) -> NodeKind {
        self.properties.kind()
    }

    pub fn invalid_properties(node_id: &str, err: Error) -> Error {
        Error::Other(format!("node {node_id} has invalid properties: {err}"))
    }
}

pub fn person_node_id(cv_id: i64) -> String {
    format!("person_{cv_id}")
}

pub fn skill_node_id(name: &str) -> String {
    format!("skill_{name}")
}

pub fn company_node_id(name: &str) -> String {
    format!("company_{name}")
}

pub fn education_node_id(institution: &str) -> String {
    format!("education_{institution}")
}
