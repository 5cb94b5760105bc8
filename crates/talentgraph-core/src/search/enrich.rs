//! Candidate enrichment: hydrating a person-id into a full profile
//!
//! One single-hop traversal per person. Enrichment is best-effort: a person
//! missing from the graph or an unreadable edge yields empty fields, never
//! a failed query.

use serde::Serialize;
use tracing::warn;

use crate::error::Result;
use crate::graph::{EdgeKind, EdgeProperties, GraphStore, NodeKind, NodeProperties};

/// A skill held by a candidate; proficiency and years come from the edge
#[derive(Debug, Clone, Default, Serialize)]
pub struct SkillInfo {
    pub name: String,
    pub proficiency: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub years_of_experience: Option<i64>,
}

/// An employment entry; `is_current` derives from the edge type
#[derive(Debug, Clone, Default, Serialize)]
pub struct CompanyInfo {
    pub name: String,
    pub position: String,
    pub is_current: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct EducationInfo {
    pub institution: String,
    pub degree: String,
    pub field: String,
}

/// A fully hydrated candidate profile
#[derive(Debug, Clone, Default)]
pub struct CandidateProfile {
    pub person_id: String,
    pub name: String,
    pub current_position: String,
    pub seniority: String,
    pub total_experience_years: Option<i64>,
    pub skills: Vec<SkillInfo>,
    pub companies: Vec<CompanyInfo>,
    pub education: Vec<EducationInfo>,
}

/// Hydrates person-ids from the graph
#[derive(Debug, Clone)]
pub struct Enricher {
    store: GraphStore,
}

impl Enricher {
    pub fn new(store: GraphStore) -> Self {
        Self { store }
    }

    /// Load the profile for a person. Missing data yields empty fields.
    pub async fn enrich(&self, person_id: &str) -> Result<CandidateProfile> {
        let mut profile = CandidateProfile {
            person_id: person_id.to_string(),
            ..Default::default()
        };

        match self.store.get_node(NodeKind::Person, person_id).await {
            Ok(Some(node)) => {
                if let NodeProperties::Person(person) = node.properties {
                    profile.name = person.name;
                    profile.current_position = person.current_position;
                    profile.seniority = person.seniority;
                    profile.total_experience_years = person.total_experience_years;
                }
            }
            Ok(None) => return Ok(profile),
            Err(e) => {
                warn!(person_id, error = %e, "Failed to load person node");
                return Ok(profile);
            }
        }

        let neighbors = match self
            .store
            .neighbors(
                person_id,
                &[
                    EdgeKind::HasSkill,
                    EdgeKind::WorksAt,
                    EdgeKind::WorkedAt,
                    EdgeKind::GraduatedFrom,
                ],
            )
            .await
        {
            Ok(neighbors) => neighbors,
            Err(e) => {
                warn!(person_id, error = %e, "Failed to traverse person edges");
                return Ok(profile);
            }
        };

        for (edge, node) in neighbors {
            match (edge, node.properties) {
                (EdgeProperties::HasSkill(edge), NodeProperties::Skill(skill)) => {
                    let proficiency = if edge.proficiency.is_empty() {
                        skill.proficiency
                    } else {
                        edge.proficiency
                    };
                    profile.skills.push(SkillInfo {
                        name: skill.name,
                        proficiency,
                        years_of_experience: edge.years_of_experience,
                    });
                }
                (EdgeProperties::WorksAt(edge), NodeProperties::Company(company)) => {
                    profile.companies.push(CompanyInfo {
                        name: company.name,
                        position: edge.position,
                        is_current: true,
                    });
                }
                (EdgeProperties::WorkedAt(edge), NodeProperties::Company(company)) => {
                    profile.companies.push(CompanyInfo {
                        name: company.name,
                        position: edge.position,
                        is_current: false,
                    });
                }
                (EdgeProperties::GraduatedFrom(edge), NodeProperties::Education(education)) => {
                    profile.education.push(EducationInfo {
                        institution: education.institution,
                        degree: if edge.degree.is_empty() {
                            education.degree
                        } else {
                            edge.degree
                        },
                        field: if edge.field.is_empty() {
                            education.field
                        } else {
                            edge.field
                        },
                    });
                }
                // Edge/node kind mismatches are skipped rather than failed
                _ => {}
            }
        }

        Ok(profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{
        company_node_id, education_node_id, person_node_id, skill_node_id, CompanyProps,
        EducationProps, EmploymentProps, GraduationProps, HasSkillProps, PersonProps, SkillProps,
    };
    use crate::storage::Database;
    use serde_json::Map;

    async fn setup() -> (Enricher, GraphStore) {
        let db = Database::in_memory().await.unwrap();
        let store = GraphStore::new(db.pool().clone());
        (Enricher::new(store.clone()), store)
    }

    #[tokio::test]
    async fn test_full_profile() {
        let (enricher, store) = setup().await;

        let p = store
            .upsert_node(
                &person_node_id(1),
                &NodeProperties::Person(PersonProps {
                    cv_id: Some(1),
                    name: "Ada".into(),
                    current_position: "Backend Developer".into(),
                    seniority: "Senior".into(),
                    total_experience_years: Some(13),
                    extra: Map::new(),
                }),
            )
            .await
            .unwrap();

        let java = store
            .upsert_node(
                &skill_node_id("Java"),
                &NodeProperties::Skill(SkillProps {
                    name: "Java".into(),
                    proficiency: String::new(),
                    extra: Map::new(),
                }),
            )
            .await
            .unwrap();
        store
            .upsert_edge(
                p,
                java,
                &EdgeProperties::HasSkill(HasSkillProps {
                    proficiency: "Expert".into(),
                    years_of_experience: Some(13),
                    extra: Map::new(),
                }),
            )
            .await
            .unwrap();

        let acme = store
            .upsert_node(
                &company_node_id("Acme"),
                &NodeProperties::Company(CompanyProps {
                    name: "Acme".into(),
                    extra: Map::new(),
                }),
            )
            .await
            .unwrap();
        store
            .upsert_edge(
                p,
                acme,
                &EdgeProperties::WorksAt(EmploymentProps {
                    position: "Backend Developer".into(),
                    extra: Map::new(),
                }),
            )
            .await
            .unwrap();

        let globex = store
            .upsert_node(
                &company_node_id("Globex"),
                &NodeProperties::Company(CompanyProps {
                    name: "Globex".into(),
                    extra: Map::new(),
                }),
            )
            .await
            .unwrap();
        store
            .upsert_edge(
                p,
                globex,
                &EdgeProperties::WorkedAt(EmploymentProps {
                    position: "Junior Developer".into(),
                    extra: Map::new(),
                }),
            )
            .await
            .unwrap();

        let mit = store
            .upsert_node(
                &education_node_id("MIT"),
                &NodeProperties::Education(EducationProps {
                    institution: "MIT".into(),
                    degree: "BSc".into(),
                    field: "Computer Science".into(),
                    graduation_year: Some(2010),
                    extra: Map::new(),
                }),
            )
            .await
            .unwrap();
        store
            .upsert_edge(
                p,
                mit,
                &EdgeProperties::GraduatedFrom(GraduationProps {
                    degree: "BSc".into(),
                    field: "Computer Science".into(),
                    extra: Map::new(),
                }),
            )
            .await
            .unwrap();

        let profile = enricher.enrich("person_1").await.unwrap();

        assert_eq!(profile.name, "Ada");
        assert_eq!(profile.total_experience_years, Some(13));

        assert_eq!(profile.skills.len(), 1);
        assert_eq!(profile.skills[0].proficiency, "Expert");
        assert_eq!(profile.skills[0].years_of_experience, Some(13));

        assert_eq!(profile.companies.len(), 2);
        let current: Vec<_> = profile.companies.iter().filter(|c| c.is_current).collect();
        assert_eq!(current.len(), 1);
        assert_eq!(current[0].name, "Acme");

        assert_eq!(profile.education.len(), 1);
        assert_eq!(profile.education[0].institution, "MIT");
    }

    #[tokio::test]
    async fn test_unknown_person_yields_empty_profile() {
        let (enricher, _store) = setup().await;

        let profile = enricher.enrich("person_404").await.unwrap();
        assert_eq!(profile.person_id, "person_404");
        assert!(profile.name.is_empty());
        assert!(profile.skills.is_empty());
    }

    #[tokio::test]
    async fn test_person_without_edges() {
        let (enricher, store) = setup().await;
        store
            .upsert_node(
                &person_node_id(2),
                &NodeProperties::Person(PersonProps {
                    cv_id: Some(2),
                    name: "Bob".into(),
                    current_position: String::new(),
                    seniority: String::new(),
                    total_experience_years: None,
                    extra: Map::new(),
                }),
            )
            .await
            .unwrap();

        let profile = enricher.enrich("person_2").await.unwrap();
        assert_eq!(profile.name, "Bob");
        assert!(profile.skills.is_empty());
        assert!(profile.companies.is_empty());
        assert!(profile.education.is_empty());
    }
}
