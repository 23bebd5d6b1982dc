//! Crawl stage: seed queries in, replayable leveled crawl log out.
//!
//! The log (`CrawlResult`) is the interchange format between the crawl and
//! persistence stages, serialized as a pretty-printed JSON array of
//! `{result, query, level}` objects.

mod assembler;

pub use assembler::assemble;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{ArtistGraphError, Result};

/// What to do with a seed query that matches no artist
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolutionPolicy {
    /// Fail the whole crawl with a resolution error
    #[default]
    Abort,
    /// Log a warning and leave the query out of the crawl log
    Skip,
}

#[derive(Debug, Clone)]
pub struct CrawlOptions {
    /// Number of relation hops expanded after the seeds (1 = seeds and their related artists)
    pub relation_depth: u32,
    pub resolution_policy: ResolutionPolicy,
    /// Maximum provider calls in flight within one level
    pub workers: usize,
}

impl Default for CrawlOptions {
    fn default() -> Self {
        Self {
            relation_depth: 1,
            resolution_policy: ResolutionPolicy::Abort,
            workers: 1,
        }
    }
}

/// Shared flag that stops a crawl from issuing further provider calls
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// One provider response in the crawl log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrawlRecord {
    /// Raw provider response body
    pub result: Value,
    /// Seed query for level 0, expanded artist id for deeper levels
    pub query: String,
    pub level: u32,
}

impl CrawlRecord {
    pub fn new(result: Value, query: impl Into<String>, level: u32) -> Self {
        Self {
            result,
            query: query.into(),
            level,
        }
    }
}

/// Ordered crawl log of one assembler run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CrawlResult {
    pub records: Vec<CrawlRecord>,
}

impl CrawlResult {
    pub fn new(records: Vec<CrawlRecord>) -> Self {
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records at `level`, in log order
    pub fn at_level(&self, level: u32) -> impl Iterator<Item = &CrawlRecord> {
        self.records.iter().filter(move |r| r.level == level)
    }

    /// Write as pretty-printed UTF-8 JSON, creating parent directories
    pub fn write_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn read_from(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let result: CrawlResult = serde_json::from_str(&text)?;
        Ok(result)
    }
}

/// Deduplicate seed queries: one per trimmed, non-empty line.
///
/// A `limit` of 0 keeps every seed; otherwise only the first `limit` in
/// sorted order are kept.
pub fn parse_seed_queries(text: &str, limit: usize) -> BTreeSet<String> {
    let seeds = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string);

    if limit == 0 {
        seeds.collect()
    } else {
        seeds.collect::<BTreeSet<_>>().into_iter().take(limit).collect()
    }
}

/// Read a seed file (one artist query per line)
pub fn read_seed_file(path: &Path, limit: usize) -> Result<BTreeSet<String>> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        ArtistGraphError::InvalidInput(format!("cannot read seed file {}: {}", path.display(), e))
    })?;
    Ok(parse_seed_queries(&text, limit))
}
