use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use super::{Collection, GraphSink, GraphSource, PersistSummary, UpsertOutcome};
use crate::error::{ArtistGraphError, Result};
use crate::graph::{ArtistNode, RelationEdge};

#[derive(Debug, Default)]
struct MemoryGraph {
    nodes: Vec<ArtistNode>,
    node_index: HashMap<String, usize>,
    edges: Vec<RelationEdge>,
    edge_ids: HashSet<String>,
    builds: Vec<PersistSummary>,
}

/// In-process graph store with the same write semantics as the SQLite store.
///
/// Used by tests and by dry runs; `set_offline(true)` makes every operation
/// fail with a connectivity error.
#[derive(Debug, Default)]
pub struct MemoryGraphStore {
    graph: Mutex<MemoryGraph>,
    offline: AtomicBool,
}

impl MemoryGraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Summaries passed to `record_build`, oldest first
    pub fn builds(&self) -> Vec<PersistSummary> {
        self.graph.lock().map(|g| g.builds.clone()).unwrap_or_default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryGraph>> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(ArtistGraphError::Connectivity("memory store is offline".to_string()));
        }
        self.graph
            .lock()
            .map_err(|_| ArtistGraphError::Connectivity("memory store lock poisoned".to_string()))
    }
}

#[async_trait]
impl GraphSink for MemoryGraphStore {
    async fn clear_collection(&self, collection: Collection) -> Result<usize> {
        let mut graph = self.lock()?;
        let removed = match collection {
            Collection::Artist => {
                graph.node_index.clear();
                // relations cannot outlive their endpoints
                graph.edges.clear();
                graph.edge_ids.clear();
                std::mem::take(&mut graph.nodes).len()
            }
            Collection::ArtistRelation => {
                graph.edge_ids.clear();
                std::mem::take(&mut graph.edges).len()
            }
        };
        Ok(removed)
    }

    async fn upsert_node(&self, node: &ArtistNode) -> Result<UpsertOutcome> {
        let mut graph = self.lock()?;
        if graph.node_index.contains_key(&node.id) {
            return Ok(UpsertOutcome::Existing);
        }
        let index = graph.nodes.len();
        graph.node_index.insert(node.id.clone(), index);
        graph.nodes.push(node.clone());
        Ok(UpsertOutcome::Created)
    }

    async fn create_edge(&self, edge: &RelationEdge) -> Result<()> {
        let mut graph = self.lock()?;
        if graph.edge_ids.contains(&edge.id) {
            return match graph.edges.iter().find(|e| e.id == edge.id) {
                Some(stored) if stored.from != edge.from || stored.to != edge.to => {
                    Err(ArtistGraphError::InvalidInput(format!(
                        "relation id {} already names {} -> {}, cannot store {} -> {}",
                        edge.id, stored.from, stored.to, edge.from, edge.to
                    )))
                }
                _ => Err(ArtistGraphError::Conflict(format!("relation {}", edge.id))),
            };
        }
        if !graph.node_index.contains_key(&edge.from) || !graph.node_index.contains_key(&edge.to) {
            return Err(ArtistGraphError::InvalidInput(format!(
                "relation {} references an artist that is not stored",
                edge.id
            )));
        }
        graph.edge_ids.insert(edge.id.clone());
        graph.edges.push(edge.clone());
        Ok(())
    }

    async fn record_build(&self, summary: &PersistSummary) -> Result<()> {
        self.lock()?.builds.push(summary.clone());
        Ok(())
    }
}

#[async_trait]
impl GraphSource for MemoryGraphStore {
    async fn select_artists(&self) -> Result<Vec<ArtistNode>> {
        Ok(self.lock()?.nodes.clone())
    }

    async fn select_relations(&self) -> Result<Vec<RelationEdge>> {
        Ok(self.lock()?.edges.clone())
    }

    async fn select_relations_from(&self, from: &str) -> Result<Vec<RelationEdge>> {
        let mut edges: Vec<RelationEdge> = self.lock()?.edges.iter().filter(|e| e.from == from).cloned().collect();
        edges.sort_by(|a, b| a.to.cmp(&b.to));
        Ok(edges)
    }
}
