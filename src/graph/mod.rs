//! Artist graph model: nodes, directed relation edges, and how a crawl log
//! turns into graph writes.

mod replay;
mod traversal;
mod validate;

pub use replay::{replay, GraphWrite};
pub use traversal::traverse_graph;
pub use validate::validate_graph;

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::provider::ArtistEntity;

/// Identity of the synthetic node anchoring the seed artists
pub const ROOT_ID: &str = "root";

/// Joins `from` and `to` in a relation id; never part of an artist id
pub const EDGE_ID_SEPARATOR: char = '_';

/// An artist in the graph, keyed by provider artist id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtistNode {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub genres: BTreeSet<String>,
    #[serde(default)]
    pub popularity: Option<f64>,
    /// Lowest crawl level the artist was discovered at (0 = seed)
    pub level: u32,
}

impl ArtistNode {
    pub fn from_entity(entity: &ArtistEntity, level: u32) -> Self {
        Self {
            id: entity.id.clone(),
            name: entity.name.clone(),
            genres: entity.genres.iter().cloned().collect(),
            popularity: entity.popularity,
            level,
        }
    }

    /// The synthetic anchor node
    pub fn root() -> Self {
        Self {
            id: ROOT_ID.to_string(),
            name: ROOT_ID.to_string(),
            genres: BTreeSet::new(),
            popularity: None,
            level: 0,
        }
    }

    pub fn is_root(&self) -> bool {
        self.id == ROOT_ID
    }
}

/// Directed "`to` is related to `from`" edge.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RelationEdge {
    /// Always `from + "_" + to`
    pub id: String,
    pub from: String,
    pub to: String,
}

impl RelationEdge {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        let from = from.into();
        let to = to.into();
        Self {
            id: Self::derive_id(&from, &to),
            from,
            to,
        }
    }

    pub fn derive_id(from: &str, to: &str) -> String {
        format!("{}{}{}", from, EDGE_ID_SEPARATOR, to)
    }
}
