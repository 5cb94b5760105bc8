//! Keyword retriever over the candidates full-text index
//!
//! Tokenises the query, drops short tokens, and conjoins the rest into an
//! FTS5 MATCH expression. The full-text source is optional; when it is
//! missing or unpopulated the retriever yields an empty list and the fusion
//! layer carries on without a special case.

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::Result;
use crate::graph::person_node_id;

/// Tokens this short carry no retrieval signal
const MIN_TOKEN_LEN: usize = 3;

/// Full-text retriever producing (person-id, relevance) pairs
#[derive(Debug, Clone)]
pub struct KeywordRetriever {
    pool: SqlitePool,
}

impl KeywordRetriever {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn search(&self, query: &str, top_k: usize) -> Result<Vec<(String, f64)>> {
        let Some(match_expr) = build_match_expression(query) else {
            debug!(query, "Keyword query reduced to nothing after tokenisation");
            return Ok(Vec::new());
        };

        // bm25() is smaller-is-better; negate so higher means more relevant
        let rows: Vec<(i64, f64)> = sqlx::query_as(
            r#"
            SELECT rowid, -bm25(candidates_fts) AS relevance
            FROM candidates_fts
            WHERE candidates_fts MATCH ?
            ORDER BY relevance DESC
            LIMIT ?
            "#,
        )
        .bind(&match_expr)
        .bind(top_k as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(id, relevance)| (person_node_id(id), relevance))
            .collect())
    }
}

/// Build the conjunctive FTS5 expression, or None when no token survives.
///
/// Tokens are double-quoted so punctuation in queries cannot reach the FTS5
/// expression parser.
fn build_match_expression(query: &str) -> Option<String> {
    let tokens: Vec<String> = query
        .split_whitespace()
        .filter(|t| t.chars().count() >= MIN_TOKEN_LEN)
        .map(|t| format!("\"{}\"", t.replace('"', "")))
        .filter(|t| t.len() > 2)
        .collect();

    if tokens.is_empty() {
        return None;
    }

    Some(tokens.join(" AND "))
}
