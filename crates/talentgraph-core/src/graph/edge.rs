//! Graph edge kinds and their typed properties
//!
//! All edges point from a person outward. A person holds at most one
//! WORKS_AT edge; WORKED_AT may repeat.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Result;

/// Edge kinds of the knowledge graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeKind {
    HasSkill,
    WorksAt,
    WorkedAt,
    GraduatedFrom,
}

impl EdgeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HasSkill => "HAS_SKILL",
            Self::WorksAt => "WORKS_AT",
            Self::WorkedAt => "WORKED_AT",
            Self::GraduatedFrom => "GRADUATED_FROM",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "HAS_SKILL" => Some(Self::HasSkill),
            "WORKS_AT" => Some(Self::WorksAt),
            "WORKED_AT" => Some(Self::WorkedAt),
            "GRADUATED_FROM" => Some(Self::GraduatedFrom),
            _ => None,
        }
    }
}

impl std::fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// HAS_SKILL edge properties. Proficiency and years are conventions from
/// extraction; years need not be monotone with proficiency.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HasSkillProps {
    #[serde(default)]
    pub proficiency: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub years_of_experience: Option<i64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// WORKS_AT / WORKED_AT edge properties
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EmploymentProps {
    #[serde(default)]
    pub position: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// GRADUATED_FROM edge properties
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraduationProps {
    #[serde(default)]
    pub degree: String,
    #[serde(default)]
    pub field: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Typed edge properties, one variant per edge kind
#[derive(Debug, Clone)]
pub enum EdgeProperties {
    HasSkill(HasSkillProps),
    WorksAt(EmploymentProps),
    WorkedAt(EmploymentProps),
    GraduatedFrom(GraduationProps),
}

impl EdgeProperties {
    pub fn kind(&self) -> EdgeKind {
        match self {
            Self::HasSkill(_) => EdgeKind::HasSkill,
            Self::WorksAt(_) => EdgeKind::WorksAt,
            Self::WorkedAt(_) => EdgeKind::WorkedAt,
            Self::GraduatedFrom(_) => EdgeKind::GraduatedFrom,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        let json = match self {
            Self::HasSkill(p) => serde_json::to_string(p)?,
            Self::WorksAt(p) | Self::WorkedAt(p) => serde_json::to_string(p)?,
            Self::GraduatedFrom(p) => serde_json::to_string(p)?,
        };
        Ok(json)
    }

    pub fn from_json(kind: EdgeKind, raw: &str) -> Result<Self> {
        let props = match kind {
            EdgeKind::HasSkill => Self::HasSkill(serde_json::from_str(raw)?),
            EdgeKind::WorksAt => Self::WorksAt(serde_json::from_str(raw)?),
            EdgeKind::WorkedAt => Self::WorkedAt(serde_json::from_str(raw)?),
            EdgeKind::GraduatedFrom => Self::GraduatedFrom(serde_json::from_str(raw)?),
        };
        Ok(props)
    }
}
