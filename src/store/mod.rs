//! Graph store capabilities and their implementations.
//!
//! `GraphSink` is the write side used by persistence, `GraphSource` the read
//! side used by the loader. Both collections (`artist`, `artist_relation`)
//! belong to a single pipeline run at a time; nothing here locks them.

mod audit;
mod loader;
mod memory;
mod rebuild;
mod sqlite;

pub use audit::{log_build, recent_builds, BuildRecord};
pub use loader::load;
pub use memory::MemoryGraphStore;
pub use rebuild::{persist, GraphRebuild, PersistOptions, PersistSummary};
pub use sqlite::SqliteGraphStore;

use async_trait::async_trait;

use crate::error::Result;
use crate::graph::{ArtistNode, RelationEdge};

/// The two collections a rebuild owns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Artist,
    ArtistRelation,
}

impl Collection {
    pub fn name(&self) -> &'static str {
        match self {
            Collection::Artist => "artist",
            Collection::ArtistRelation => "artist_relation",
        }
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Created,
    /// A node with the same id was already stored; nothing changed
    Existing,
}

#[async_trait]
pub trait GraphSink: Send + Sync {
    /// Remove every record of `collection`, returning how many were removed
    async fn clear_collection(&self, collection: Collection) -> Result<usize>;

    /// Store `node` in the artist collection unless its id is already present
    async fn upsert_node(&self, node: &ArtistNode) -> Result<UpsertOutcome>;

    /// Store `edge` in the relation collection; an existing id is a `Conflict`
    async fn create_edge(&self, edge: &RelationEdge) -> Result<()>;

    /// Called once after a rebuild finished writing
    async fn record_build(&self, _summary: &PersistSummary) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
pub trait GraphSource: Send + Sync {
    async fn select_artists(&self) -> Result<Vec<ArtistNode>>;

    async fn select_relations(&self) -> Result<Vec<RelationEdge>>;

    /// Outgoing relations of one artist
    async fn select_relations_from(&self, from: &str) -> Result<Vec<RelationEdge>>;
}
