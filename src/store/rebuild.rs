//! Graph rebuild transaction and the `persist` entry point.

use serde::{Deserialize, Serialize};

use super::{Collection, GraphSink, UpsertOutcome};
use crate::crawl::CrawlResult;
use crate::error::{ArtistGraphError, Result};
use crate::graph::{replay, ArtistNode, GraphWrite, RelationEdge};

#[derive(Debug, Clone, Copy)]
pub struct PersistOptions {
    /// Create the synthetic `root` node and a `root -> artist` edge per seed
    pub root_anchor: bool,
}

impl Default for PersistOptions {
    fn default() -> Self {
        Self { root_anchor: true }
    }
}

/// Counts reported by one rebuild
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistSummary {
    /// Crawl log records replayed
    pub records: usize,
    pub nodes_created: usize,
    /// Node writes skipped because the id was already stored
    pub nodes_existing: usize,
    pub edges_created: usize,
    /// Edge writes rejected as conflicts and swallowed
    pub duplicate_edges: usize,
}

/// Rebuild of both collections from scratch.
///
/// `reset` clears the store, `write_node`/`write_edge` apply the replayed
/// writes and `finish` reports the counts to the sink. An incremental mode
/// would replace `reset` only.
pub struct GraphRebuild<'a, S: GraphSink + ?Sized> {
    sink: &'a S,
    summary: PersistSummary,
}

impl<'a, S: GraphSink + ?Sized> GraphRebuild<'a, S> {
    /// Clear relations first, then artists
    pub async fn reset(sink: &'a S) -> Result<Self> {
        let relations = sink.clear_collection(Collection::ArtistRelation).await?;
        let artists = sink.clear_collection(Collection::Artist).await?;
        log::info!("Cleared {} artist(s) and {} relation(s)", artists, relations);

        Ok(Self {
            sink,
            summary: PersistSummary::default(),
        })
    }

    pub async fn write_node(&mut self, node: &ArtistNode) -> Result<()> {
        match self.sink.upsert_node(node).await? {
            UpsertOutcome::Created => {
                log::debug!("upsert: level={} id={} name={}", node.level, node.id, node.name);
                self.summary.nodes_created += 1;
            }
            UpsertOutcome::Existing => self.summary.nodes_existing += 1,
        }
        Ok(())
    }

    pub async fn write_edge(&mut self, edge: &RelationEdge) -> Result<()> {
        match self.sink.create_edge(edge).await {
            Ok(()) => self.summary.edges_created += 1,
            Err(ArtistGraphError::Conflict(what)) => {
                log::debug!("{} already stored, skipping", what);
                self.summary.duplicate_edges += 1;
            }
            Err(e) => return Err(e),
        }
        Ok(())
    }

    pub async fn write(&mut self, write: &GraphWrite) -> Result<()> {
        match write {
            GraphWrite::Node(node) => self.write_node(node).await,
            GraphWrite::Edge(edge) => self.write_edge(edge).await,
        }
    }

    pub async fn finish(self) -> Result<PersistSummary> {
        self.sink.record_build(&self.summary).await?;
        Ok(self.summary)
    }
}

/// Rebuild the store from a crawl log.
///
/// The log is fully replayed before the store is touched, so an invalid log
/// leaves the previous graph in place. Persisting the same log twice yields
/// the same node and edge sets.
pub async fn persist<S: GraphSink + ?Sized>(
    result: CrawlResult,
    sink: &S,
    options: &PersistOptions,
) -> Result<PersistSummary> {
    let writes = replay(&result, options.root_anchor)?;

    let mut rebuild = GraphRebuild::reset(sink).await?;
    rebuild.summary.records = result.len();
    for write in &writes {
        rebuild.write(write).await?;
    }
    let summary = rebuild.finish().await?;

    log::info!(
        "Persisted {} record(s): {} artist(s), {} relation(s), {} duplicate relation(s) skipped",
        summary.records,
        summary.nodes_created,
        summary.edges_created,
        summary.duplicate_edges
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawl::{assemble, CancelFlag, CrawlOptions, CrawlRecord};
    use crate::db::{migrate, Db};
    use crate::provider::{ArtistEntity, MemoryProvider};
    use crate::store::{load, GraphSource, MemoryGraphStore, SqliteGraphStore};
    use serde_json::json;
    use std::collections::{BTreeSet, HashMap};
    use std::path::Path;
    use tempfile::TempDir;

    fn radiohead_provider() -> MemoryProvider {
        MemoryProvider::new()
            .with_artist("Radiohead", ArtistEntity::new("r1", "Radiohead"))
            .with_related("r1", vec![ArtistEntity::new("a1", "Thom Yorke"), ArtistEntity::new("a2", "Atoms for Peace")])
    }

    async fn crawl(provider: &MemoryProvider, seeds: &[&str], options: &CrawlOptions) -> Result<CrawlResult> {
        let seeds: BTreeSet<String> = seeds.iter().map(|s| s.to_string()).collect();
        assemble(&seeds, provider, options, &CancelFlag::new()).await
    }

    async fn snapshot<S: GraphSource>(store: &S) -> (BTreeSet<String>, BTreeSet<String>) {
        let nodes = store.select_artists().await.unwrap().into_iter().map(|n| n.id).collect();
        let edges = store.select_relations().await.unwrap().into_iter().map(|e| e.id).collect();
        (nodes, edges)
    }

    async fn sorted_contents<S: GraphSource>(store: &S) -> (Vec<ArtistNode>, Vec<RelationEdge>) {
        let mut nodes = store.select_artists().await.unwrap();
        nodes.sort_by(|a, b| a.id.cmp(&b.id));
        let mut edges = store.select_relations().await.unwrap();
        edges.sort_by(|a, b| a.id.cmp(&b.id));
        (nodes, edges)
    }

    fn ids(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    async fn sqlite_store() -> (SqliteGraphStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db = Db::new(temp_dir.path().join("graph.db"));
        let migrations_dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("migrations");
        db.with_connection(move |conn| migrate::run_migrations(conn, &migrations_dir))
            .await
            .unwrap();
        (SqliteGraphStore::new(db), temp_dir)
    }

    #[tokio::test]
    async fn test_radiohead_scenario() {
        let result = crawl(&radiohead_provider(), &["Radiohead"], &CrawlOptions::default()).await.unwrap();
        let store = MemoryGraphStore::new();

        let summary = persist(result, &store, &PersistOptions::default()).await.unwrap();
        assert_eq!(summary.records, 2);
        assert_eq!(summary.nodes_created, 4);
        assert_eq!(summary.edges_created, 3);

        let (nodes, edges) = snapshot(&store).await;
        assert_eq!(nodes, ids(&["root", "r1", "a1", "a2"]));
        assert_eq!(edges, ids(&["root_r1", "r1_a1", "r1_a2"]));
    }

    #[tokio::test]
    async fn test_radiohead_scenario_without_anchor() {
        let result = crawl(&radiohead_provider(), &["Radiohead"], &CrawlOptions::default()).await.unwrap();
        let (store, _temp) = sqlite_store().await;

        persist(result, &store, &PersistOptions { root_anchor: false }).await.unwrap();

        let (nodes, edges) = snapshot(&store).await;
        assert_eq!(nodes, ids(&["r1", "a1", "a2"]));
        assert_eq!(edges, ids(&["r1_a1", "r1_a2"]));
    }

    #[tokio::test]
    async fn test_persist_is_idempotent() {
        let result = crawl(&radiohead_provider(), &["Radiohead"], &CrawlOptions::default()).await.unwrap();
        let (store, _temp) = sqlite_store().await;

        persist(result.clone(), &store, &PersistOptions::default()).await.unwrap();
        let first = sorted_contents(&store).await;
        persist(result, &store, &PersistOptions::default()).await.unwrap();
        let second = sorted_contents(&store).await;

        assert_eq!(first.0.len(), 4);
        assert_eq!(first.1.len(), 3);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_rebuild_drops_previous_graph() {
        let provider = MemoryProvider::new()
            .with_artist("X", ArtistEntity::new("x", "X"))
            .with_artist("Y", ArtistEntity::new("y", "Y"))
            .with_related("x", vec![ArtistEntity::new("x1", "X One")])
            .with_related("y", vec![ArtistEntity::new("y1", "Y One")]);
        let (store, _temp) = sqlite_store().await;

        let first = crawl(&provider, &["X"], &CrawlOptions::default()).await.unwrap();
        persist(first, &store, &PersistOptions::default()).await.unwrap();
        assert_eq!(snapshot(&store).await.0, ids(&["root", "x", "x1"]));

        let second = crawl(&provider, &["Y"], &CrawlOptions::default()).await.unwrap();
        let summary = persist(second, &store, &PersistOptions::default()).await.unwrap();
        assert_eq!(summary.nodes_existing, 0);

        let (nodes, edges) = snapshot(&store).await;
        assert_eq!(nodes, ids(&["root", "y", "y1"]));
        assert_eq!(edges, ids(&["root_y", "y_y1"]));
    }

    #[tokio::test]
    async fn test_separator_in_artist_id_rejected_before_reset() {
        let store = MemoryGraphStore::new();
        persist(
            crawl(&radiohead_provider(), &["Radiohead"], &CrawlOptions::default()).await.unwrap(),
            &store,
            &PersistOptions::default(),
        )
        .await
        .unwrap();
        let before = sorted_contents(&store).await;

        // a -> b_c would share the relation id a_b_c with a_b -> c
        let bad = CrawlResult::new(vec![
            CrawlRecord::new(json!({"artists": {"items": [{"id": "a", "name": "A"}]}}), "A", 0),
            CrawlRecord::new(json!({"artists": [{"id": "b_c", "name": "BC"}]}), "a", 1),
        ]);
        let err = persist(bad, &store, &PersistOptions::default()).await.unwrap_err();
        assert!(matches!(err, ArtistGraphError::Parse(ref m) if m.contains("b_c")));
        assert_eq!(sorted_contents(&store).await, before);
    }

    #[tokio::test]
    async fn test_minimum_level_wins() {
        // a1 is related to both seeds and is itself a seed
        let provider = MemoryProvider::new()
            .with_artist("Radiohead", ArtistEntity::new("r1", "Radiohead"))
            .with_artist("Thom Yorke", ArtistEntity::new("a1", "Thom Yorke"))
            .with_related("r1", vec![ArtistEntity::new("a1", "Thom Yorke"), ArtistEntity::new("a2", "Atoms for Peace")])
            .with_related("a1", vec![ArtistEntity::new("r1", "Radiohead")])
            .with_related("a2", vec![ArtistEntity::new("a3", "Flea")]);
        let options = CrawlOptions {
            relation_depth: 2,
            ..CrawlOptions::default()
        };
        let result = crawl(&provider, &["Radiohead", "Thom Yorke"], &options).await.unwrap();
        let store = MemoryGraphStore::new();
        persist(result, &store, &PersistOptions::default()).await.unwrap();

        let levels: HashMap<String, u32> =
            store.select_artists().await.unwrap().into_iter().map(|n| (n.id, n.level)).collect();
        assert_eq!(levels["r1"], 0);
        assert_eq!(levels["a1"], 0);
        assert_eq!(levels["a2"], 1);
        assert_eq!(levels["a3"], 2);
    }

    #[tokio::test]
    async fn test_duplicate_edges_swallowed() {
        // two queries resolving to the same artist replay r1's relations twice
        let provider = MemoryProvider::new()
            .with_artist("Radiohead", ArtistEntity::new("r1", "Radiohead"))
            .with_artist("radiohead uk", ArtistEntity::new("r1", "Radiohead"))
            .with_related("r1", vec![ArtistEntity::new("a1", "Thom Yorke")]);
        let result = crawl(&provider, &["Radiohead", "radiohead uk"], &CrawlOptions::default()).await.unwrap();
        let (store, _temp) = sqlite_store().await;

        let summary = persist(result, &store, &PersistOptions::default()).await.unwrap();
        assert_eq!(summary.duplicate_edges, 2, "root_r1 and r1_a1 are each written twice");

        let edges = store.select_relations().await.unwrap();
        let unique: BTreeSet<_> = edges.iter().map(|e| e.id.clone()).collect();
        assert_eq!(edges.len(), unique.len());
        assert_eq!(unique, ids(&["root_r1", "r1_a1"]));
    }

    #[tokio::test]
    async fn test_abort_policy_persists_nothing() {
        let provider = radiohead_provider();
        let store = MemoryGraphStore::new();
        persist(
            crawl(&provider, &["Radiohead"], &CrawlOptions::default()).await.unwrap(),
            &store,
            &PersistOptions::default(),
        )
        .await
        .unwrap();

        let err = crawl(&provider, &["Radiohead", "Nobody"], &CrawlOptions::default()).await.unwrap_err();
        assert!(matches!(err, ArtistGraphError::Resolution(ref q) if q == "Nobody"));

        // a log that still carries an unresolved seed is rejected before the reset
        let bad = CrawlResult::new(vec![CrawlRecord::new(json!({"artists": {"items": []}}), "Nobody", 0)]);
        assert!(persist(bad, &store, &PersistOptions::default()).await.is_err());
        assert_eq!(snapshot(&store).await.0.len(), 4);

        let empty = MemoryGraphStore::new();
        let bad = CrawlResult::new(vec![CrawlRecord::new(json!({"artists": {"items": []}}), "Nobody", 0)]);
        assert!(persist(bad, &empty, &PersistOptions::default()).await.is_err());
        assert!(snapshot(&empty).await.0.is_empty());
    }

    #[tokio::test]
    async fn test_load_round_trip() {
        let result = crawl(&radiohead_provider(), &["Radiohead"], &CrawlOptions::default()).await.unwrap();
        let (store, _temp) = sqlite_store().await;
        persist(result.clone(), &store, &PersistOptions::default()).await.unwrap();

        let (nodes, edges) = load(&store).await.unwrap();

        // expected graph read straight off the crawl log
        let mut expected_nodes = ids(&["root"]);
        let mut expected_pairs = BTreeSet::new();
        for record in &result.records {
            if record.level == 0 {
                let id = record.result["artists"]["items"][0]["id"].as_str().unwrap().to_string();
                expected_pairs.insert(("root".to_string(), id.clone()));
                expected_nodes.insert(id);
            } else {
                for artist in record.result["artists"].as_array().unwrap() {
                    let id = artist["id"].as_str().unwrap().to_string();
                    expected_pairs.insert((record.query.clone(), id.clone()));
                    expected_nodes.insert(id);
                }
            }
        }
        assert_eq!(expected_nodes, ids(&["root", "r1", "a1", "a2"]));

        assert_eq!(nodes.iter().map(|n| n.id.clone()).collect::<BTreeSet<_>>(), expected_nodes);
        let pairs: BTreeSet<(String, String)> = edges.iter().map(|e| (e.from.clone(), e.to.clone())).collect();
        assert_eq!(edges.len(), pairs.len());
        assert_eq!(pairs, expected_pairs);
    }

    #[tokio::test]
    async fn test_finish_records_build() {
        let result = crawl(&radiohead_provider(), &["Radiohead"], &CrawlOptions::default()).await.unwrap();
        let store = MemoryGraphStore::new();
        let summary = persist(result, &store, &PersistOptions::default()).await.unwrap();
        assert_eq!(store.builds(), vec![summary]);
    }

    #[tokio::test]
    async fn test_unreachable_store() {
        let result = crawl(&radiohead_provider(), &["Radiohead"], &CrawlOptions::default()).await.unwrap();
        let store = MemoryGraphStore::new();
        store.set_offline(true);
        let err = persist(result, &store, &PersistOptions::default()).await.unwrap_err();
        assert!(matches!(err, ArtistGraphError::Connectivity(_)));
    }
}
