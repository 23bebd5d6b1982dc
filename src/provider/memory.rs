use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use super::{ArtistEntity, EntityKind, SearchProvider};
use crate::error::{ArtistGraphError, Result};

/// In-memory catalog answering with the same response shapes as the Spotify API.
///
/// Queries match case-insensitively. Every call is recorded so callers can
/// check how many provider requests a crawl issued.
#[derive(Debug, Default)]
pub struct MemoryProvider {
    search: HashMap<String, Vec<ArtistEntity>>,
    related: HashMap<String, Vec<ArtistEntity>>,
    failing: HashSet<String>,
    calls: Mutex<Vec<String>>,
}

impl MemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `query` resolve to `artist`
    pub fn with_artist(mut self, query: &str, artist: ArtistEntity) -> Self {
        self.search.entry(query.to_lowercase()).or_default().push(artist);
        self
    }

    /// Set the related artists returned for `artist_id`
    pub fn with_related(mut self, artist_id: &str, related: Vec<ArtistEntity>) -> Self {
        self.related.insert(artist_id.to_string(), related);
        self
    }

    /// Make any call mentioning `key` (a query or an artist id) fail with a provider error
    pub fn failing_on(mut self, key: &str) -> Self {
        self.failing.insert(key.to_string());
        self
    }

    /// Calls made so far, as `search:<query>` or `related:<id>`
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    fn record(&self, call: String) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
    }

    fn check_failure(&self, key: &str) -> Result<()> {
        if self.failing.contains(key) {
            return Err(ArtistGraphError::Provider(format!("HTTP 503 Service Unavailable for {}", key)));
        }
        Ok(())
    }
}

#[async_trait]
impl SearchProvider for MemoryProvider {
    async fn search_entity(&self, query: &str, kind: EntityKind, limit: u32) -> Result<Value> {
        self.record(format!("search:{}", query));
        self.check_failure(query)?;

        let items: Vec<&ArtistEntity> = match kind {
            EntityKind::Artist => self
                .search
                .get(&query.to_lowercase())
                .map(|found| found.iter().take(limit as usize).collect())
                .unwrap_or_default(),
            _ => Vec::new(),
        };

        let key = format!("{}s", kind.as_str());
        let total = items.len();
        Ok(json!({ key: { "items": items, "limit": limit, "total": total } }))
    }

    async fn related_artists(&self, artist_id: &str) -> Result<Value> {
        self.record(format!("related:{}", artist_id));
        self.check_failure(artist_id)?;

        let artists = self.related.get(artist_id).cloned().unwrap_or_default();
        Ok(json!({ "artists": artists }))
    }
}
