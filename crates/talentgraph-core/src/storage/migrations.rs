//! Database migrations
//!
//! Versioned schema migrations applied automatically on connection.

use sqlx::SqlitePool;

use crate::error::Result;

/// Current schema version
pub const CURRENT_VERSION: i32 = 2;

const CREATE_MIGRATIONS_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS _migrations (
        version INTEGER PRIMARY KEY NOT NULL,
        applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
    );
"#;

/// Migration 1: knowledge graph and CV ingest tables
const MIGRATION_V1: &str = r#"
    CREATE TABLE IF NOT EXISTS graph_nodes (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        node_type TEXT NOT NULL CHECK (node_type IN ('person', 'skill', 'company', 'education')),
        node_id TEXT NOT NULL,
        properties TEXT NOT NULL DEFAULT '{}',
        embedding BLOB,
        embedding_model TEXT,
        embedding_created_at TEXT,
        created_at TEXT NOT NULL DEFAULT (datetime('now')),
        UNIQUE (node_type, node_id)
    );

    CREATE INDEX IF NOT EXISTS idx_graph_nodes_node_id ON graph_nodes(node_id);
    CREATE INDEX IF NOT EXISTS idx_graph_nodes_type ON graph_nodes(node_type);

    CREATE TABLE IF NOT EXISTS graph_edges (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        source_node_id INTEGER NOT NULL REFERENCES graph_nodes(id) ON DELETE CASCADE,
        target_node_id INTEGER NOT NULL REFERENCES graph_nodes(id) ON DELETE CASCADE,
        edge_type TEXT NOT NULL CHECK (edge_type IN ('HAS_SKILL', 'WORKS_AT', 'WORKED_AT', 'GRADUATED_FROM')),
        properties TEXT NOT NULL DEFAULT '{}',
        created_at TEXT NOT NULL DEFAULT (datetime('now')),
        UNIQUE (source_node_id, target_node_id, edge_type)
    );

    CREATE INDEX IF NOT EXISTS idx_graph_edges_source ON graph_edges(source_node_id);
    CREATE INDEX IF NOT EXISTS idx_graph_edges_target ON graph_edges(target_node_id);
    CREATE INDEX IF NOT EXISTS idx_graph_edges_type ON graph_edges(edge_type);

    CREATE TABLE IF NOT EXISTS cv_files (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        candidate_id INTEGER,
        filename TEXT NOT NULL,
        file_path TEXT NOT NULL DEFAULT '',
        file_type TEXT NOT NULL DEFAULT '',
        file_size INTEGER NOT NULL DEFAULT 0,
        parsed_text TEXT NOT NULL,
        content_hash TEXT NOT NULL UNIQUE,
        uploaded_at TEXT NOT NULL DEFAULT (datetime('now')),
        parsed_at TEXT
    );

    CREATE UNIQUE INDEX IF NOT EXISTS idx_cv_files_content_hash ON cv_files(content_hash);

    -- Write-only extraction provenance
    CREATE TABLE IF NOT EXISTS cv_entities (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        cv_file_id INTEGER NOT NULL REFERENCES cv_files(id) ON DELETE CASCADE,
        entity_type TEXT NOT NULL,
        entity_value TEXT NOT NULL,
        confidence REAL NOT NULL DEFAULT 0.0,
        created_at TEXT NOT NULL DEFAULT (datetime('now'))
    );

    CREATE INDEX IF NOT EXISTS idx_cv_entities_cv_file_id ON cv_entities(cv_file_id);

    -- retry_count/max_retries are recorded but no retry loop consults them
    CREATE TABLE IF NOT EXISTS cv_upload_jobs (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        cv_file_id INTEGER NOT NULL REFERENCES cv_files(id) ON DELETE CASCADE,
        status TEXT NOT NULL DEFAULT 'pending' CHECK (status IN ('pending', 'processing', 'completed', 'failed')),
        error_message TEXT,
        progress TEXT NOT NULL DEFAULT '{}',
        created_at TEXT NOT NULL DEFAULT (datetime('now')),
        started_at TEXT,
        completed_at TEXT,
        retry_count INTEGER NOT NULL DEFAULT 0,
        max_retries INTEGER NOT NULL DEFAULT 3
    );

    CREATE INDEX IF NOT EXISTS idx_cv_upload_jobs_status ON cv_upload_jobs(status);

    -- Full-text source for the keyword retriever. Nothing in the ingest
    -- path populates it; the retriever yields zero rows until it is filled
    -- out of band.
    CREATE VIRTUAL TABLE IF NOT EXISTS candidates_fts USING fts5(
        name, skills, experience
    );
"#;

/// Migration 2: structural community detection output
const MIGRATION_V2: &str = r#"
    CREATE TABLE IF NOT EXISTS graph_communities (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        level INTEGER NOT NULL,
        community_id TEXT NOT NULL,
        title TEXT NOT NULL,
        node_count INTEGER NOT NULL DEFAULT 0,
        summary TEXT,
        created_at TEXT NOT NULL DEFAULT (datetime('now')),
        updated_at TEXT NOT NULL DEFAULT (datetime('now'))
    );

    CREATE INDEX IF NOT EXISTS idx_graph_communities_level ON graph_communities(level);

    CREATE TABLE IF NOT EXISTS community_members (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        community_id INTEGER NOT NULL REFERENCES graph_communities(id) ON DELETE CASCADE,
        node_id INTEGER NOT NULL REFERENCES graph_nodes(id) ON DELETE CASCADE,
        membership_strength REAL NOT NULL DEFAULT 1.0
    );

    CREATE INDEX IF NOT EXISTS idx_community_members_community ON community_members(community_id);
"#;

/// Apply all pending migrations
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    sqlx::raw_sql(CREATE_MIGRATIONS_TABLE).execute(pool).await?;

    let (applied,): (Option<i32>,) = sqlx::query_as("SELECT MAX(version) FROM _migrations")
        .fetch_one(pool)
        .await?;
    let applied = applied.unwrap_or(0);

    for (version, sql) in [(1, MIGRATION_V1), (2, MIGRATION_V2)] {
        if version > applied {
            sqlx::raw_sql(sql).execute(pool).await?;
            sqlx::query("INSERT INTO _migrations (version) VALUES (?)")
                .bind(version)
                .execute(pool)
                .await?;
            tracing::info!(version, "Applied migration");
        }
    }

    Ok(())
}
