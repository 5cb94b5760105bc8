//! Graph retriever: criteria-driven traversal
//!
//! Builds one conjunctive query over persons: every supplied skill must be
//! held, every company worked at (current or past), every education
//! attended, seniority matched exactly, experience within range. The raw
//! score is the number of criteria a person matched, not a similarity.

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::Result;

use super::criteria::SearchCriteria;

/// Safety cap on traversal results
const GRAPH_RESULT_CAP: usize = 50;

/// Criteria-based retriever producing (person-id, matched-criteria) pairs
#[derive(Debug, Clone)]
pub struct GraphRetriever {
    pool: SqlitePool,
}

impl GraphRetriever {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn search(&self, criteria: &SearchCriteria) -> Result<Vec<(String, f64)>> {
        let (query, binds) = build_query(criteria);

        let mut q = sqlx::query_as::<_, (String,)>(&query);
        for bind in binds {
            q = q.bind(bind);
        }

        let rows = q.fetch_all(&self.pool).await?;
        let score = criteria.traversal_criteria_count() as f64;

        debug!(
            matched = rows.len(),
            criteria_count = score,
            "Graph traversal complete"
        );

        Ok(rows.into_iter().map(|(id,)| (id, score)).collect())
    }
}

/// Assemble the conjunctive SQL and its bind values
fn build_query(criteria: &SearchCriteria) -> (String, Vec<String>) {
    let mut conditions: Vec<String> = Vec::new();
    let mut binds: Vec<String> = Vec::new();

    if !criteria.seniority.is_empty() {
        conditions.push("json_extract(p.properties, '$.seniority') = ?".into());
        binds.push(criteria.seniority.clone());
    }

    for skill in &criteria.skills {
        conditions.push(
            r#"EXISTS (
                SELECT 1 FROM graph_edges e
                JOIN graph_nodes s ON e.target_node_id = s.id
                WHERE e.source_node_id = p.id
                  AND e.edge_type = 'HAS_SKILL'
                  AND s.node_id = ?
            )"#
            .into(),
        );
        binds.push(format!("skill_{skill}"));
    }

    if !criteria.companies.is_empty() {
        let mut company_conditions = Vec::new();
        for company in &criteria.companies {
            // Canonical id or substring on the stored name; SQLite LIKE is
            // case-insensitive for ASCII
            company_conditions.push(
                r#"EXISTS (
                    SELECT 1 FROM graph_edges e
                    JOIN graph_nodes c ON e.target_node_id = c.id
                    WHERE e.source_node_id = p.id
                      AND e.edge_type IN ('WORKS_AT', 'WORKED_AT')
                      AND (c.node_id LIKE ? OR json_extract(c.properties, '$.name') LIKE ?)
                )"#
                .to_string(),
            );
            binds.push(format!("%company_{company}%"));
            binds.push(format!("%{company}%"));
        }
        conditions.push(format!("({})", company_conditions.join(" OR ")));
    }

    if !criteria.education.is_empty() {
        let mut edu_conditions = Vec::new();
        for institution in &criteria.education {
            edu_conditions.push(
                r#"EXISTS (
                    SELECT 1 FROM graph_edges e
                    JOIN graph_nodes ed ON e.target_node_id = ed.id
                    WHERE e.source_node_id = p.id
                      AND e.edge_type = 'GRADUATED_FROM'
                      AND ed.node_id = ?
                )"#
                .to_string(),
            );
            binds.push(format!("education_{institution}"));
        }
        conditions.push(format!("({})", edu_conditions.join(" OR ")));
    }

    if let Some(min) = criteria.min_experience.filter(|v| *v > 0) {
        conditions
            .push("CAST(json_extract(p.properties, '$.total_experience_years') AS INTEGER) >= ?".into());
        binds.push(min.to_string());
    }

    if let Some(max) = criteria.max_experience.filter(|v| *v > 0) {
        conditions
            .push("CAST(json_extract(p.properties, '$.total_experience_years') AS INTEGER) <= ?".into());
        binds.push(max.to_string());
    }

    let mut query = String::from(
        "SELECT DISTINCT p.node_id FROM graph_nodes p WHERE p.node_type = 'person'",
    );
    for condition in &conditions {
        query.push_str(" AND ");
        query.push_str(condition);
    }
    query.push_str(&format!(" ORDER BY p.node_id LIMIT {GRAPH_RESULT_CAP}"));

    (query, binds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{
        company_node_id, person_node_id, skill_node_id, CompanyProps, EdgeProperties,
        EmploymentProps, GraphStore, HasSkillProps, NodeProperties, PersonProps, SkillProps,
    };
    use crate::storage::Database;
    use serde_json::Map;

    async fn seed() -> (GraphRetriever, GraphStore) {
        let db = Database::in_memory().await.unwrap();
        let store = GraphStore::new(db.pool().clone());
        let retriever = GraphRetriever::new(db.pool().clone());

        // person_1: Senior Java dev at Acme, 13 years
        // person_2: Junior Python dev at Globex, 2 years
        let p1 = store
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
        let p2 = store
            .upsert_node(
                &person_node_id(2),
                &NodeProperties::Person(PersonProps {
                    cv_id: Some(2),
                    name: "Bob".into(),
                    current_position: "Developer".into(),
                    seniority: "Junior".into(),
                    total_experience_years: Some(2),
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
                    proficiency: "Expert".into(),
                    extra: Map::new(),
                }),
            )
            .await
            .unwrap();
        let python = store
            .upsert_node(
                &skill_node_id("Python"),
                &NodeProperties::Skill(SkillProps {
                    name: "Python".into(),
                    proficiency: "Beginner".into(),
                    extra: Map::new(),
                }),
            )
            .await
            .unwrap();

        let acme = store
            .upsert_node(
                &company_node_id("Acme Bank"),
                &NodeProperties::Company(CompanyProps {
                    name: "Acme Bank".into(),
                    extra: Map::new(),
                }),
            )
            .await
            .unwrap();

        let has_skill = EdgeProperties::HasSkill(HasSkillProps::default());
        store.upsert_edge(p1, java, &has_skill).await.unwrap();
        store.upsert_edge(p2, python, &has_skill).await.unwrap();
        store
            .upsert_edge(
                p1,
                acme,
                &EdgeProperties::WorksAt(EmploymentProps {
                    position: "Backend Developer".into(),
                    extra: Map::new(),
                }),
            )
            .await
            .unwrap();

        (retriever, store)
    }

    #[tokio::test]
    async fn test_skill_conjunction() {
        let (retriever, _store) = seed().await;

        let criteria = SearchCriteria {
            skills: vec!["Java".into()],
            ..Default::default()
        };
        let results = retriever.search(&criteria).await.unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].0, "person_1");
        assert_eq!(results[0].1, 1.0);
    }

    #[tokio::test]
    async fn test_seniority_and_experience_range() {
        let (retriever, _store) = seed().await;

        let criteria = SearchCriteria {
            seniority: "Senior".into(),
            min_experience: Some(10),
            ..Default::default()
        };
        let results = retriever.search(&criteria).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].0, "person_1");
        assert_eq!(results[0].1, 2.0);

        let too_much = SearchCriteria {
            min_experience: Some(20),
            ..Default::default()
        };
        assert!(retriever.search(&too_much).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_company_substring_match() {
        let (retriever, _store) = seed().await;

        let criteria = SearchCriteria {
            companies: vec!["acme".into()],
            ..Default::default()
        };
        let results = retriever.search(&criteria).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].0, "person_1");
    }

    #[tokio::test]
    async fn test_conjunction_excludes_partial_matches() {
        let (retriever, _store) = seed().await;

        // person_1 has Java but not Python; nobody has both
        let criteria = SearchCriteria {
            skills: vec!["Java".into(), "Python".into()],
            ..Default::default()
        };
        assert!(retriever.search(&criteria).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_criteria_matches_everyone() {
        let (retriever, _store) = seed().await;

        let results = retriever.search(&SearchCriteria::default()).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].1, 0.0);
    }
}
