//! Replay a crawl log into an ordered list of node and edge writes.

use super::{ArtistNode, RelationEdge, ROOT_ID};
use crate::crawl::CrawlResult;
use crate::error::{ArtistGraphError, Result};
use crate::provider::{parse_related, parse_search, SearchOutcome};
use std::collections::HashSet;

/// A single write against a graph sink
#[derive(Debug, Clone, PartialEq)]
pub enum GraphWrite {
    Node(ArtistNode),
    Edge(RelationEdge),
}

fn reject_root_id(query: &str, id: &str) -> Result<()> {
    if id == ROOT_ID {
        return Err(ArtistGraphError::Parse(format!(
            "record for {:?}: artist id {:?} collides with the anchor node",
            query, ROOT_ID
        )));
    }
    Ok(())
}

/// Turn a crawl log into graph writes.
///
/// Records are replayed in level order (stable within a level), so the first
/// write of any artist carries its lowest level. Writes are not deduplicated
/// here; sinks treat repeated node ids and edge ids as no-ops. Level-0
/// records contribute their artist (and a `root` edge when `root_anchor` is
/// set); deeper records contribute each related artist and an edge from the
/// expanded artist.
///
/// The whole log is parsed before anything is returned, so a malformed log
/// is rejected without touching the store.
pub fn replay(result: &CrawlResult, root_anchor: bool) -> Result<Vec<GraphWrite>> {
    let mut records: Vec<_> = result.records.iter().collect();
    records.sort_by_key(|r| r.level);

    let mut writes = Vec::new();
    let mut known: HashSet<String> = HashSet::new();

    if root_anchor {
        writes.push(GraphWrite::Node(ArtistNode::root()));
        known.insert(ROOT_ID.to_string());
    }

    for record in records {
        if record.level == 0 {
            let artist = match parse_search(&record.result)
                .map_err(|e| ArtistGraphError::Parse(format!("record for {:?}: {}", record.query, e)))?
            {
                SearchOutcome::Artist(artist) => artist,
                SearchOutcome::Empty => return Err(ArtistGraphError::Resolution(record.query.clone())),
            };
            reject_root_id(&record.query, &artist.id)?;

            known.insert(artist.id.clone());
            writes.push(GraphWrite::Node(ArtistNode::from_entity(&artist, 0)));
            if root_anchor {
                writes.push(GraphWrite::Edge(RelationEdge::new(ROOT_ID, artist.id)));
            }
        } else {
            if !known.contains(&record.query) {
                return Err(ArtistGraphError::Parse(format!(
                    "level {} record expands {:?}, which no earlier level discovered",
                    record.level, record.query
                )));
            }
            let related = parse_related(&record.result)
                .map_err(|e| ArtistGraphError::Parse(format!("record for {:?}: {}", record.query, e)))?;

            for artist in related {
                reject_root_id(&record.query, &artist.id)?;
                known.insert(artist.id.clone());
                writes.push(GraphWrite::Node(ArtistNode::from_entity(&artist, record.level)));
                writes.push(GraphWrite::Edge(RelationEdge::new(record.query.clone(), artist.id)));
            }
        }
    }

    Ok(writes)
}
