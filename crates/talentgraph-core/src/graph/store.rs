//! SQLite persistence for the knowledge graph
//!
//! Node upserts merge properties via `json_patch`, so a partial re-upsert
//! never loses keys the patch does not mention. Edge upserts are keyed by
//! (source, target, type). Embedding access is kept separate from property
//! access so the scoring path never pays for vector deserialisation.

use chrono::Utc;
use sqlx::{FromRow, SqlitePool};
use tracing::debug;

use crate::error::{Error, Result};

use super::edge::{EdgeKind, EdgeProperties};
use super::node::{GraphNode, NodeKind, NodeProperties, EMBEDDING_DIM};

/// Persistence layer for graph nodes and edges
#[derive(Debug, Clone)]
pub struct GraphStore {
    pool: SqlitePool,
}

#[derive(FromRow)]
struct NodeRow {
    id: i64,
    node_type: String,
    node_id: String,
    properties: String,
}

impl NodeRow {
    fn into_node(self) -> Result<GraphNode> {
        let kind = NodeKind::parse(&self.node_type)
            .ok_or_else(|| Error::Other(format!("unknown node type: {}", self.node_type)))?;
        let properties = NodeProperties::from_json(kind, &self.properties)
            .map_err(|e| GraphNode::invalid_properties(&self.node_id, e))?;

        Ok(GraphNode {
            db_id: self.id,
            node_id: self.node_id,
            properties,
        })
    }
}

impl GraphStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Insert or merge a node by (type, id), returning its internal row id
    pub async fn upsert_node(&self, node_id: &str, properties: &NodeProperties) -> Result<i64> {
        let props_json = properties.to_json()?;

        let (id,): (i64,) = sqlx::query_as(
            r#"
            INSERT INTO graph_nodes (node_type, node_id, properties, created_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT (node_type, node_id)
            DO UPDATE SET properties = json_patch(graph_nodes.properties, excluded.properties)
            RETURNING id
            "#,
        )
        .bind(properties.kind().as_str())
        .bind(node_id)
        .bind(&props_json)
        .bind(Utc::now().to_rfc3339())
        .fetch_one(&self.pool)
        .await?;

        debug!(node_id, node_type = %properties.kind(), "Node upserted");
        Ok(id)
    }

    /// Insert or update an edge by (source, target, type).
    ///
    /// Writing a WORKS_AT edge first removes any WORKS_AT pointing at a
    /// different company, keeping the one-current-employer invariant.
    pub async fn upsert_edge(
        &self,
        source_db_id: i64,
        target_db_id: i64,
        properties: &EdgeProperties,
    ) -> Result<()> {
        let kind = properties.kind();

        if kind == EdgeKind::WorksAt {
            sqlx::query(
                r#"
                DELETE FROM graph_edges
                WHERE source_node_id = ? AND edge_type = 'WORKS_AT' AND target_node_id != ?
                "#,
            )
            .bind(source_db_id)
            .bind(target_db_id)
            .execute(&self.pool)
            .await?;
        }

        sqlx::query(
            r#"
            INSERT INTO graph_edges (source_node_id, target_node_id, edge_type, properties, created_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT (source_node_id, target_node_id, edge_type)
            DO UPDATE SET properties = excluded.properties
            "#,
        )
        .bind(source_db_id)
        .bind(target_db_id)
        .bind(kind.as_str())
        .bind(properties.to_json()?)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get_node(&self, kind: NodeKind, node_id: &str) -> Result<Option<GraphNode>> {
        let row: Option<NodeRow> = sqlx::query_as(
            "SELECT id, node_type, node_id, properties FROM graph_nodes WHERE node_type = ? AND node_id = ?",
        )
        .bind(kind.as_str())
        .bind(node_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| r.into_node()).transpose()
    }

    /// Look up a node by its external id alone; ids are unique across kinds
    /// through their prefixes.
    pub async fn get_node_any(&self, node_id: &str) -> Result<Option<GraphNode>> {
        let row: Option<NodeRow> = sqlx::query_as(
            "SELECT id, node_type, node_id, properties FROM graph_nodes WHERE node_id = ?",
        )
        .bind(node_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| r.into_node()).transpose()
    }

    /// One-hop traversal from a person, filtered by edge kinds
    pub async fn neighbors(
        &self,
        person_node_id: &str,
        kinds: &[EdgeKind],
    ) -> Result<Vec<(EdgeProperties, GraphNode)>> {
        if kinds.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = kinds.iter().map(|_| "?").collect::<Vec<_>>().join(", ");
        let query = format!(
            r#"
            SELECT t.id, t.node_type, t.node_id, t.properties,
                   e.edge_type, e.properties AS edge_properties
            FROM graph_nodes p
            JOIN graph_edges e ON e.source_node_id = p.id
            JOIN graph_nodes t ON t.id = e.target_node_id
            WHERE p.node_type = 'person' AND p.node_id = ?
              AND e.edge_type IN ({placeholders})
            ORDER BY t.node_id
            "#
        );

        let mut q = sqlx::query_as::<_, NeighborRow>(&query).bind(person_node_id);
        for kind in kinds {
            q = q.bind(kind.as_str());
        }

        let rows = q.fetch_all(&self.pool).await?;
        rows.into_iter().map(|r| r.into_pair()).collect()
    }

    /// Write a node's embedding vector. The dimension must match the
    /// configured constant.
    pub async fn write_embedding(
        &self,
        node_id: &str,
        embedding: &[f32],
        model: &str,
    ) -> Result<()> {
        if embedding.len() != EMBEDDING_DIM {
            return Err(Error::InvalidInput(format!(
                "embedding dimension {} does not match expected {}",
                embedding.len(),
                EMBEDDING_DIM
            )));
        }

        let result = sqlx::query(
            r#"
            UPDATE graph_nodes
            SET embedding = ?, embedding_model = ?, embedding_created_at = ?
            WHERE node_id = ?
            "#,
        )
        .bind(embedding_to_bytes(embedding))
        .bind(model)
        .bind(Utc::now().to_rfc3339())
        .bind(node_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("node {node_id}")));
        }
        Ok(())
    }

    pub async fn read_embedding(&self, node_id: &str) -> Result<Option<Vec<f32>>> {
        let row: Option<(Option<Vec<u8>>,)> =
            sqlx::query_as("SELECT embedding FROM graph_nodes WHERE node_id = ?")
                .bind(node_id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.and_then(|(blob,)| blob).map(|b| embedding_from_bytes(&b)))
    }

    /// External ids of nodes the embedding worker has not processed yet,
    /// newest first
    pub async fn nodes_without_embeddings(&self) -> Result<Vec<String>> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT node_id FROM graph_nodes WHERE embedding IS NULL ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    /// All embedded person nodes with their decoded vectors
    pub async fn person_embeddings(&self) -> Result<Vec<(String, Vec<f32>)>> {
        let rows: Vec<(String, Vec<u8>)> = sqlx::query_as(
            r#"
            SELECT node_id, embedding
            FROM graph_nodes
            WHERE embedding IS NOT NULL AND node_type = 'person'
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(id, blob)| (id, embedding_from_bytes(&blob)))
            .collect())
    }

    /// All person node ids, ordered
    pub async fn person_node_ids(&self) -> Result<Vec<String>> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT node_id FROM graph_nodes WHERE node_type = 'person' ORDER BY node_id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    pub async fn count_nodes(&self) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM graph_nodes")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    pub async fn count_edges(&self) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM graph_edges")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    pub async fn node_type_counts(&self) -> Result<Vec<(String, i64)>> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            "SELECT node_type, COUNT(*) FROM graph_nodes GROUP BY node_type ORDER BY node_type",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Skills ranked by how many distinct people hold them
    pub async fn popular_skills(&self, limit: i64) -> Result<Vec<(String, i64)>> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            r#"
            SELECT json_extract(n.properties, '$.name') AS skill,
                   COUNT(DISTINCT e.source_node_id) AS holders
            FROM graph_nodes n
            JOIN graph_edges e ON e.target_node_id = n.id AND e.edge_type = 'HAS_SKILL'
            WHERE n.node_type = 'skill'
            GROUP BY skill
            HAVING holders > 0
            ORDER BY holders DESC, skill
            LIMIT ?
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

#[derive(FromRow)]
struct NeighborRow {
    id: i64,
    node_type: String,
    node_id: String,
    properties: String,
    edge_type: String,
    edge_properties: String,
}

impl NeighborRow {
    fn into_pair(self) -> Result<(EdgeProperties, GraphNode)> {
        let edge_kind = EdgeKind::parse(&self.edge_type)
            .ok_or_else(|| Error::Other(format!("unknown edge type: {}", self.edge_type)))?;
        let edge_props = EdgeProperties::from_json(edge_kind, &self.edge_properties)?;

        let node = NodeRow {
            id: self.id,
            node_type: self.node_type,
            node_id: self.node_id,
            properties: self.properties,
        }
        .into_node()?;

        Ok((edge_props, node))
    }
}

/// Serialize an embedding to the stored little-endian f32 BLOB
pub fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
}

/// Deserialize an embedding from its stored BLOB
pub fn embedding_from_bytes(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::edge::{EmploymentProps, HasSkillProps};
    use crate::graph::node::{
        person_node_id, skill_node_id, CompanyProps, PersonProps, SkillProps,
    };
    use crate::storage::Database;
    use serde_json::Map;

    async fn setup() -> GraphStore {
        let db = Database::in_memory().await.unwrap();
        GraphStore::new(db.pool().clone())
    }

    fn person(cv_id: i64, name: &str) -> NodeProperties {
        NodeProperties::Person(PersonProps {
            cv_id: Some(cv_id),
            name: name.into(),
            current_position: "Backend Developer".into(),
            seniority: "Senior".into(),
            total_experience_years: Some(10),
            extra: Map::new(),
        })
    }

    fn skill(name: &str) -> NodeProperties {
        NodeProperties::Skill(SkillProps {
            name: name.into(),
            proficiency: "Expert".into(),
            extra: Map::new(),
        })
    }

    #[tokio::test]
    async fn test_upsert_node_is_stable() {
        let store = setup().await;

        let first = store.upsert_node("person_1", &person(1, "Ada")).await.unwrap();
        let second = store.upsert_node("person_1", &person(1, "Ada")).await.unwrap();
        assert_eq!(first, second);

        assert_eq!(store.count_nodes().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_upsert_merge_keeps_unmentioned_properties() {
        let store = setup().await;
        store.upsert_node("person_1", &person(1, "Ada")).await.unwrap();

        // Re-upsert without the experience field
        let partial = NodeProperties::Person(PersonProps {
            cv_id: Some(1),
            name: "Ada Lovelace".into(),
            current_position: "Backend Developer".into(),
            seniority: "Senior".into(),
            total_experience_years: None,
            extra: Map::new(),
        });
        store.upsert_node("person_1", &partial).await.unwrap();

        let node = store
            .get_node(NodeKind::Person, "person_1")
            .await
            .unwrap()
            .unwrap();
        let props = node.properties.as_person().unwrap();
        assert_eq!(props.name, "Ada Lovelace");
        assert_eq!(props.total_experience_years, Some(10));
    }

    #[tokio::test]
    async fn test_single_current_employer() {
        let store = setup().await;
        let p = store.upsert_node("person_1", &person(1, "Ada")).await.unwrap();
        let acme = store
            .upsert_node(
                "company_Acme",
                &NodeProperties::Company(CompanyProps {
                    name: "Acme".into(),
                    extra: Map::new(),
                }),
            )
            .await
            .unwrap();
        let globex = store
            .upsert_node(
                "company_Globex",
                &NodeProperties::Company(CompanyProps {
                    name: "Globex".into(),
                    extra: Map::new(),
                }),
            )
            .await
            .unwrap();

        let works_at = |position: &str| {
            EdgeProperties::WorksAt(EmploymentProps {
                position: position.into(),
                extra: Map::new(),
            })
        };

        store.upsert_edge(p, acme, &works_at("Engineer")).await.unwrap();
        store.upsert_edge(p, globex, &works_at("Staff Engineer")).await.unwrap();

        let current = store
            .neighbors("person_1", &[EdgeKind::WorksAt])
            .await
            .unwrap();
        assert_eq!(current.len(), 1);
        assert_eq!(current[0].1.node_id, "company_Globex");
    }

    #[tokio::test]
    async fn test_neighbors_filtered_by_edge_kind() {
        let store = setup().await;
        let p = store.upsert_node(&person_node_id(1), &person(1, "Ada")).await.unwrap();
        let s = store.upsert_node(&skill_node_id("Java"), &skill("Java")).await.unwrap();

        store
            .upsert_edge(
                p,
                s,
                &EdgeProperties::HasSkill(HasSkillProps {
                    proficiency: "Expert".into(),
                    years_of_experience: Some(13),
                    extra: Map::new(),
                }),
            )
            .await
            .unwrap();

        let skills = store.neighbors("person_1", &[EdgeKind::HasSkill]).await.unwrap();
        assert_eq!(skills.len(), 1);
        match &skills[0].0 {
            EdgeProperties::HasSkill(props) => {
                assert_eq!(props.years_of_experience, Some(13));
            }
            other => panic!("expected HAS_SKILL, got {:?}", other.kind()),
        }

        let companies = store.neighbors("person_1", &[EdgeKind::WorksAt]).await.unwrap();
        assert!(companies.is_empty());
    }

    #[tokio::test]
    async fn test_embedding_round_trip_and_dimension_check() {
        let store = setup().await;
        store.upsert_node("person_1", &person(1, "Ada")).await.unwrap();

        let bad = vec![0.5_f32; 8];
        let err = store
            .write_embedding("person_1", &bad, "text-embedding-3-small")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));

        let mut vector = vec![0.0_f32; EMBEDDING_DIM];
        vector[0] = 1.0;
        vector[7] = -0.25;
        store
            .write_embedding("person_1", &vector, "text-embedding-3-small")
            .await
            .unwrap();

        let restored = store.read_embedding("person_1").await.unwrap().unwrap();
        assert_eq!(restored.len(), EMBEDDING_DIM);
        assert_eq!(restored[0], 1.0);
        assert_eq!(restored[7], -0.25);

        assert!(store.nodes_without_embeddings().await.unwrap().is_empty());
        assert_eq!(store.person_embeddings().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_pending_embedding_listing() {
        let store = setup().await;
        store.upsert_node("person_1", &person(1, "Ada")).await.unwrap();
        store.upsert_node("skill_Java", &skill("Java")).await.unwrap();

        let pending = store.nodes_without_embeddings().await.unwrap();
        assert_eq!(pending.len(), 2);
    }

    #[tokio::test]
    async fn test_popular_skills() {
        let store = setup().await;
        let p1 = store.upsert_node("person_1", &person(1, "Ada")).await.unwrap();
        let p2 = store.upsert_node("person_2", &person(2, "Grace")).await.unwrap();
        let java = store.upsert_node("skill_Java", &skill("Java")).await.unwrap();
        let rust = store.upsert_node("skill_Rust", &skill("Rust")).await.unwrap();

        let has_skill = EdgeProperties::HasSkill(HasSkillProps::default());
        store.upsert_edge(p1, java, &has_skill).await.unwrap();
        store.upsert_edge(p2, java, &has_skill).await.unwrap();
        store.upsert_edge(p1, rust, &has_skill).await.unwrap();

        let popular = store.popular_skills(10).await.unwrap();
        assert_eq!(popular[0], ("Java".to_string(), 2));
        assert_eq!(popular[1], ("Rust".to_string(), 1));
    }

    #[test]
    fn test_embedding_codec() {
        let vector = vec![1.0_f32, -2.5, 0.0, 3.25];
        let bytes = embedding_to_bytes(&vector);
        assert_eq!(bytes.len(), 16);
        assert_eq!(embedding_from_bytes(&bytes), vector);
    }
}
