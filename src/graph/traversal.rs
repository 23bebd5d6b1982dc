//! BFS traversal over stored artist relations.

use std::collections::{HashSet, VecDeque};

use super::RelationEdge;
use crate::error::Result;
use crate::store::GraphSource;

/// Traverse the relation graph breadth-first from `start`.
/// Returns the relations that discovered a new artist within `max_depth` hops.
pub async fn traverse_graph<S: GraphSource + ?Sized>(
    source: &S,
    start: &str,
    max_depth: usize,
) -> Result<Vec<RelationEdge>> {
    let mut visited = HashSet::new();
    let mut queue = VecDeque::new();
    let mut result = Vec::new();

    queue.push_back((start.to_string(), 0));
    visited.insert(start.to_string());

    while let Some((artist, depth)) = queue.pop_front() {
        if depth >= max_depth {
            continue;
        }

        for edge in source.select_relations_from(&artist).await? {
            if visited.insert(edge.to.clone()) {
                queue.push_back((edge.to.clone(), depth + 1));
                result.push(edge);
            }
        }
    }

    Ok(result)
}
