//! Structural community detection over the whole graph
//!
//! A Leiden-style local-moving pass: every node starts in its own
//! community, and each sweep moves nodes to the neighbouring community
//! with the strongest connection gain until no move improves. Results are
//! stored per level in `graph_communities`/`community_members`. This is an
//! offline tool; query-time community tags come from the skill classifier.

use std::collections::HashMap;

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::info;

use crate::error::Result;

/// Sweeps before the pass gives up on convergence
const MAX_ITERATIONS: usize = 100;

/// Communities smaller than this are noise and are not stored
const MIN_COMMUNITY_SIZE: usize = 2;

/// Outcome of one detection run
#[derive(Debug, Clone)]
pub struct DetectionSummary {
    pub level: i64,
    pub communities: usize,
    pub members: usize,
}

/// Offline graph community detector
#[derive(Debug, Clone)]
pub struct CommunityDetector {
    pool: SqlitePool,
}

impl CommunityDetector {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Run detection and replace the stored communities at this level
    pub async fn detect(&self, level: i64) -> Result<DetectionSummary> {
        let nodes: Vec<(i64, String)> =
            sqlx::query_as("SELECT id, node_type FROM graph_nodes")
                .fetch_all(&self.pool)
                .await?;

        let edges: Vec<(i64, i64)> =
            sqlx::query_as("SELECT source_node_id, target_node_id FROM graph_edges")
                .fetch_all(&self.pool)
                .await?;

        info!(level, nodes = nodes.len(), edges = edges.len(), "Community detection started");

        let node_types: HashMap<i64, String> = nodes.iter().cloned().collect();
        let communities = local_moving(&nodes, &edges);

        // Replace previous results at this level
        sqlx::query("DELETE FROM graph_communities WHERE level = ?")
            .bind(level)
            .execute(&self.pool)
            .await?;

        let now = Utc::now().to_rfc3339();
        let mut stored = 0usize;
        let mut members_total = 0usize;

        for (community_id, members) in communities {
            if members.len() < MIN_COMMUNITY_SIZE {
                continue;
            }

            let title = community_title(&members, &node_types);
            let (db_id,): (i64,) = sqlx::query_as(
                r#"
                INSERT INTO graph_communities (level, community_id, title, node_count, created_at, updated_at)
                VALUES (?, ?, ?, ?, ?, ?)
                RETURNING id
                "#,
            )
            .bind(level)
            .bind(format!("community_{level}_{community_id}"))
            .bind(&title)
            .bind(members.len() as i64)
            .bind(&now)
            .bind(&now)
            .fetch_one(&self.pool)
            .await?;

            for node_id in &members {
                sqlx::query(
                    "INSERT INTO community_members (community_id, node_id, membership_strength) VALUES (?, ?, 1.0)",
                )
                .bind(db_id)
                .bind(node_id)
                .execute(&self.pool)
                .await?;
                members_total += 1;
            }

            stored += 1;
        }

        info!(level, communities = stored, members = members_total, "Community detection finished");

        Ok(DetectionSummary {
            level,
            communities: stored,
            members: members_total,
        })
    }
}

/// Local-moving modularity pass. Deterministic: nodes are visited in
/// ascending id order each sweep.
fn local_moving(nodes: &[(i64, String)], edges: &[(i64, i64)]) -> HashMap<i64, Vec<i64>> {
    let mut neighbors: HashMap<i64, Vec<i64>> = HashMap::new();
    for (source, target) in edges {
        neighbors.entry(*source).or_default().push(*target);
        neighbors.entry(*target).or_default().push(*source);
    }

    let mut community: HashMap<i64, i64> = nodes.iter().map(|(id, _)| (*id, *id)).collect();
    let mut node_ids: Vec<i64> = nodes.iter().map(|(id, _)| *id).collect();
    node_ids.sort_unstable();

    for _ in 0..MAX_ITERATIONS {
        let mut improved = false;

        for node_id in &node_ids {
            let Some(node_neighbors) = neighbors.get(node_id) else {
                continue;
            };
            if node_neighbors.is_empty() {
                continue;
            }

            let current = community[node_id];

            // Connections into each neighbouring community
            let mut connections: HashMap<i64, usize> = HashMap::new();
            for neighbor in node_neighbors {
                if let Some(c) = community.get(neighbor) {
                    *connections.entry(*c).or_insert(0) += 1;
                }
            }

            let degree = node_neighbors.len() as f64;
            let mut best_community = current;
            // A move must beat the node's connectivity into its current
            // community, or sweeps oscillate between symmetric choices
            let mut best_gain =
                connections.get(&current).copied().unwrap_or(0) as f64 / degree;

            let mut candidates: Vec<(i64, usize)> = connections.into_iter().collect();
            candidates.sort_unstable();
            for (candidate, count) in candidates {
                if candidate == current {
                    continue;
                }
                let gain = count as f64 / degree;
                if gain > best_gain {
                    best_gain = gain;
                    best_community = candidate;
                }
            }

            if best_community != current {
                community.insert(*node_id, best_community);
                improved = true;
            }
        }

        if !improved {
            break;
        }
    }

    let mut grouped: HashMap<i64, Vec<i64>> = HashMap::new();
    for (node, c) in community {
        grouped.entry(c).or_default().push(node);
    }
    for members in grouped.values_mut() {
        members.sort_unstable();
    }
    grouped
}

/// Title from the dominant node type, e.g. "skill Community (14 members)"
fn community_title(members: &[i64], node_types: &HashMap<i64, String>) -> String {
    let mut type_counts: HashMap<&str, usize> = HashMap::new();
    for member in members {
        if let Some(node_type) = node_types.get(member) {
            *type_counts.entry(node_type.as_str()).or_insert(0) += 1;
        }
    }

    let dominant = type_counts
        .into_iter()
        .max_by(|a, b| a.1.cmp(&b.1).then_with(|| b.0.cmp(a.0)))
        .map(|(t, _)| t)
        .unwrap_or("mixed");

    format!("{dominant} Community ({} members)", members.len())
}
