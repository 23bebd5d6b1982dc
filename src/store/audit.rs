//! Graph build audit log (`graph_builds`).

use chrono::Utc;
use rusqlite::params;
use serde::Serialize;
use uuid::Uuid;

use super::PersistSummary;
use crate::db::Db;
use crate::error::Result;

/// One completed rebuild as recorded in `graph_builds`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildRecord {
    pub build_id: String,
    pub finished_at: String,
    pub node_count: i64,
    pub edge_count: i64,
    pub duplicate_edges: i64,
}

/// Record a finished rebuild.
///
/// Returns the generated build_id (UUID).
pub async fn log_build(db: &Db, summary: &PersistSummary) -> Result<String> {
    let build_id = Uuid::new_v4().to_string();
    let finished_at = Utc::now().to_rfc3339();

    let id = build_id.clone();
    let nodes = summary.nodes_created as i64;
    let edges = summary.edges_created as i64;
    let duplicates = summary.duplicate_edges as i64;

    db.with_connection(move |conn| {
        conn.execute(
            "INSERT INTO graph_builds (build_id, finished_at, node_count, edge_count, duplicate_edges) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![id, finished_at, nodes, edges, duplicates],
        )?;
        Ok(())
    })
    .await?;

    Ok(build_id)
}

/// Most recent builds, newest first
pub async fn recent_builds(db: &Db, limit: usize) -> Result<Vec<BuildRecord>> {
    let limit = limit as i64;
    db.with_connection(move |conn| {
        let mut stmt = conn.prepare(
            "SELECT build_id, finished_at, node_count, edge_count, duplicate_edges \
             FROM graph_builds ORDER BY finished_at DESC LIMIT ?1",
        )?;
        let builds = stmt
            .query_map(params![limit], |row| {
                Ok(BuildRecord {
                    build_id: row.get(0)?,
                    finished_at: row.get(1)?,
                    node_count: row.get(2)?,
                    edge_count: row.get(3)?,
                    duplicate_edges: row.get(4)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;
        Ok(builds)
    })
    .await
}
