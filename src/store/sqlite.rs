use async_trait::async_trait;
use rusqlite::{ffi, params, Connection, Row};
use std::collections::BTreeSet;
use std::path::Path;

use super::{audit, Collection, GraphSink, GraphSource, PersistSummary, UpsertOutcome};
use crate::db::{migrate, Db};
use crate::error::{ArtistGraphError, Result};
use crate::graph::{ArtistNode, RelationEdge};

/// Graph store backed by the `artist` and `artist_relation` SQLite tables
#[derive(Debug, Clone)]
pub struct SqliteGraphStore {
    db: Db,
}

impl SqliteGraphStore {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &Db {
        &self.db
    }

    /// Apply pending schema migrations
    pub async fn migrate(&self, migrations_dir: &Path) -> Result<()> {
        let dir = migrations_dir.to_path_buf();
        self.db
            .with_connection(move |conn| migrate::run_migrations(conn, &dir))
            .await
    }
}

fn is_duplicate_key(err: &ffi::Error) -> bool {
    err.extended_code == ffi::SQLITE_CONSTRAINT_PRIMARYKEY || err.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE
}

fn artist_row(row: &Row<'_>) -> rusqlite::Result<(String, String, String, Option<f64>, u32)> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
}

fn relation_row(row: &Row<'_>) -> rusqlite::Result<RelationEdge> {
    Ok(RelationEdge {
        id: row.get(0)?,
        from: row.get(1)?,
        to: row.get(2)?,
    })
}

fn read_artists(conn: &Connection) -> Result<Vec<ArtistNode>> {
    let mut stmt = conn.prepare("SELECT id, name, genres_json, popularity, level FROM artist")?;
    let rows = stmt
        .query_map([], artist_row)?
        .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;

    rows.into_iter()
        .map(|(id, name, genres_json, popularity, level)| {
            let genres: BTreeSet<String> = serde_json::from_str(&genres_json)
                .map_err(|e| ArtistGraphError::Parse(format!("artist {} has malformed genres: {}", id, e)))?;
            Ok(ArtistNode {
                id,
                name,
                genres,
                popularity,
                level,
            })
        })
        .collect()
}

#[async_trait]
impl GraphSink for SqliteGraphStore {
    async fn clear_collection(&self, collection: Collection) -> Result<usize> {
        let sql = format!("DELETE FROM {}", collection.name());
        self.db
            .with_connection(move |conn| Ok(conn.execute(&sql, [])?))
            .await
    }

    async fn upsert_node(&self, node: &ArtistNode) -> Result<UpsertOutcome> {
        let genres_json = serde_json::to_string(&node.genres)?;
        let node = node.clone();
        self.db
            .with_connection(move |conn| {
                let changed = conn.execute(
                    "INSERT INTO artist (id, name, genres_json, popularity, level) \
                     VALUES (?1, ?2, ?3, ?4, ?5) \
                     ON CONFLICT(id) DO NOTHING",
                    params![node.id, node.name, genres_json, node.popularity, node.level],
                )?;
                Ok(if changed == 0 {
                    UpsertOutcome::Existing
                } else {
                    UpsertOutcome::Created
                })
            })
            .await
    }

    async fn create_edge(&self, edge: &RelationEdge) -> Result<()> {
        let edge = edge.clone();
        self.db
            .with_connection(move |conn| {
                let inserted = conn.execute(
                    "INSERT INTO artist_relation (id, from_id, to_id) VALUES (?1, ?2, ?3)",
                    params![edge.id, edge.from, edge.to],
                );
                match inserted {
                    Ok(_) => Ok(()),
                    Err(rusqlite::Error::SqliteFailure(err, _)) if is_duplicate_key(&err) => {
                        let stored: (String, String) = conn.query_row(
                            "SELECT from_id, to_id FROM artist_relation WHERE id = ?1",
                            params![edge.id],
                            |row| Ok((row.get(0)?, row.get(1)?)),
                        )?;
                        if stored == (edge.from.clone(), edge.to.clone()) {
                            Err(ArtistGraphError::Conflict(format!("relation {}", edge.id)))
                        } else {
                            Err(ArtistGraphError::InvalidInput(format!(
                                "relation id {} already names {} -> {}, cannot store {} -> {}",
                                edge.id, stored.0, stored.1, edge.from, edge.to
                            )))
                        }
                    }
                    Err(rusqlite::Error::SqliteFailure(err, _))
                        if err.extended_code == ffi::SQLITE_CONSTRAINT_FOREIGNKEY =>
                    {
                        Err(ArtistGraphError::InvalidInput(format!(
                            "relation {} references an artist that is not stored",
                            edge.id
                        )))
                    }
                    Err(e) => Err(e.into()),
                }
            })
            .await
    }

    async fn record_build(&self, summary: &PersistSummary) -> Result<()> {
        let build_id = audit::log_build(&self.db, summary).await?;
        log::debug!("Recorded graph build {}", build_id);
        Ok(())
    }
}

#[async_trait]
impl GraphSource for SqliteGraphStore {
    async fn select_artists(&self) -> Result<Vec<ArtistNode>> {
        self.db.with_connection(|conn| read_artists(conn)).await
    }

    async fn select_relations(&self) -> Result<Vec<RelationEdge>> {
        self.db
            .with_connection(|conn| {
                let mut stmt = conn.prepare("SELECT id, from_id, to_id FROM artist_relation")?;
                let edges = stmt
                    .query_map([], relation_row)?
                    .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;
                Ok(edges)
            })
            .await
    }

    async fn select_relations_from(&self, from: &str) -> Result<Vec<RelationEdge>> {
        let from = from.to_string();
        self.db
            .with_connection(move |conn| {
                let mut stmt =
                    conn.prepare("SELECT id, from_id, to_id FROM artist_relation WHERE from_id = ?1 ORDER BY to_id")?;
                let edges = stmt
                    .query_map(params![from], relation_row)?
                    .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;
                Ok(edges)
            })
            .await
    }
}
