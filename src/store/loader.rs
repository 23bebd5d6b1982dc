use super::GraphSource;
use crate::error::Result;
use crate::graph::{validate_graph, ArtistNode, RelationEdge};

/// Read the whole graph back from `source`.
///
/// No filtering and no ordering guarantee. An unreachable store surfaces as
/// a connectivity error and is not retried.
pub async fn load<S: GraphSource + ?Sized>(source: &S) -> Result<(Vec<ArtistNode>, Vec<RelationEdge>)> {
    let nodes = source.select_artists().await?;
    let edges = source.select_relations().await?;
    validate_graph(&nodes, &edges)?;

    log::info!("Loaded {} artist(s) and {} relation(s)", nodes.len(), edges.len());
    Ok((nodes, edges))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Db;
    use crate::error::ArtistGraphError;
    use crate::store::{GraphSink, MemoryGraphStore, SqliteGraphStore};
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_load_empty_store() {
        let store = MemoryGraphStore::new();
        let (nodes, edges) = load(&store).await.unwrap();
        assert!(nodes.is_empty());
        assert!(edges.is_empty());
    }

    #[tokio::test]
    async fn test_load_returns_everything() {
        let store = MemoryGraphStore::new();
        store.upsert_node(&ArtistNode::root()).await.unwrap();
        let mut r1 = ArtistNode::root();
        r1.id = "r1".to_string();
        r1.name = "Radiohead".to_string();
        store.upsert_node(&r1).await.unwrap();
        store.create_edge(&RelationEdge::new("root", "r1")).await.unwrap();

        let (nodes, edges) = load(&store).await.unwrap();
        assert_eq!(nodes.len(), 2);
        assert_eq!(edges, vec![RelationEdge::new("root", "r1")]);
    }

    #[tokio::test]
    async fn test_unreachable_store_is_connectivity_error() {
        let temp_dir = TempDir::new().unwrap();
        let store = SqliteGraphStore::new(Db::read_only(temp_dir.path().join("missing.db")));

        let err = load(&store).await.unwrap_err();
        assert!(matches!(err, ArtistGraphError::Connectivity(_)));
    }
}
