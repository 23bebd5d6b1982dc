use std::collections::HashSet;

use super::{ArtistNode, RelationEdge};
use crate::error::{ArtistGraphError, Result};

/// Check a node/edge set read back from a store before handing it to a renderer.
///
/// Node ids must be non-empty and unique, every edge id must be the derived
/// `from_to` id, and both endpoints of every edge must be loaded nodes.
pub fn validate_graph(nodes: &[ArtistNode], edges: &[RelationEdge]) -> Result<()> {
    let mut ids = HashSet::with_capacity(nodes.len());
    for node in nodes {
        if node.id.is_empty() {
            return Err(ArtistGraphError::Parse(format!("artist {:?} has an empty id", node.name)));
        }
        if !ids.insert(node.id.as_str()) {
            return Err(ArtistGraphError::Parse(format!("artist {} loaded twice", node.id)));
        }
    }

    let mut edge_ids = HashSet::with_capacity(edges.len());
    for edge in edges {
        let expected = RelationEdge::derive_id(&edge.from, &edge.to);
        if edge.id != expected {
            return Err(ArtistGraphError::Parse(format!(
                "relation {} should have id {}",
                edge.id, expected
            )));
        }
        if !edge_ids.insert(edge.id.as_str()) {
            return Err(ArtistGraphError::Parse(format!("relation {} loaded twice", edge.id)));
        }
        for endpoint in [&edge.from, &edge.to] {
            if !ids.contains(endpoint.as_str()) {
                return Err(ArtistGraphError::Parse(format!(
                    "relation {} references unknown artist {}",
                    edge.id, endpoint
                )));
            }
        }
    }

    Ok(())
}
