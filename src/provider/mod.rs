//! Catalog provider capability: free-text entity search and related-artist lookup.
//!
//! Providers return the raw JSON body of each call so it can be recorded in the
//! crawl log verbatim; `response` turns those bodies into typed values.

mod memory;
mod response;
mod spotify;

pub use memory::MemoryProvider;
pub use response::{parse_related, parse_search, ArtistEntity, SearchOutcome};
pub use spotify::SpotifyClient;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;

/// Entity kinds the catalog search understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Artist,
    Album,
    Track,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Artist => "artist",
            EntityKind::Album => "album",
            EntityKind::Track => "track",
        }
    }
}

#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Search the catalog; the body has the shape `{"<kind>s": {"items": [...]}}`.
    async fn search_entity(&self, query: &str, kind: EntityKind, limit: u32) -> Result<Value>;

    /// Related artists of `artist_id`; the body has the shape `{"artists": [...]}`.
    async fn related_artists(&self, artist_id: &str) -> Result<Value>;
}
