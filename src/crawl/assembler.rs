//! Graph assembler: resolves seeds, then expands related artists level by level.

use futures_util::stream::{self, StreamExt, TryStreamExt};
use serde_json::Value;
use std::collections::{BTreeSet, HashMap, HashSet};

use super::{CancelFlag, CrawlOptions, CrawlRecord, CrawlResult, ResolutionPolicy};
use crate::error::{ArtistGraphError, Result};
use crate::provider::{parse_related, parse_search, ArtistEntity, EntityKind, SearchOutcome, SearchProvider};

struct Resolved {
    query: String,
    raw: Value,
    artist: ArtistEntity,
}

struct Expansion {
    raw: Value,
    related: Vec<ArtistEntity>,
}

fn ensure_running(cancel: &CancelFlag) -> Result<()> {
    if cancel.is_cancelled() {
        return Err(ArtistGraphError::Cancelled("crawl cancelled before completion".to_string()));
    }
    Ok(())
}

fn with_subject(err: ArtistGraphError, subject: &str) -> ArtistGraphError {
    match err {
        ArtistGraphError::Parse(message) => ArtistGraphError::Parse(format!("{}: {}", subject, message)),
        other => other,
    }
}

async fn resolve_seed<P>(
    provider: &P,
    query: &str,
    policy: ResolutionPolicy,
    cancel: &CancelFlag,
) -> Result<Option<Resolved>>
where
    P: SearchProvider + ?Sized,
{
    ensure_running(cancel)?;
    let raw = provider.search_entity(query, EntityKind::Artist, 1).await?;

    match parse_search(&raw).map_err(|e| with_subject(e, &format!("search {:?}", query)))? {
        SearchOutcome::Artist(artist) => {
            log::info!("Resolved {:?} -> {} ({})", query, artist.name, artist.id);
            Ok(Some(Resolved {
                query: query.to_string(),
                raw,
                artist,
            }))
        }
        SearchOutcome::Empty => match policy {
            ResolutionPolicy::Abort => Err(ArtistGraphError::Resolution(query.to_string())),
            ResolutionPolicy::Skip => {
                log::warn!("No artist matched {:?}, skipping it", query);
                Ok(None)
            }
        },
    }
}

async fn expand<P>(provider: &P, artist_id: String, cancel: &CancelFlag) -> Result<(String, Expansion)>
where
    P: SearchProvider + ?Sized,
{
    ensure_running(cancel)?;
    let raw = provider.related_artists(&artist_id).await?;
    let related = parse_related(&raw).map_err(|e| with_subject(e, &format!("related artists of {}", artist_id)))?;
    log::debug!("{} has {} related artists", artist_id, related.len());
    Ok((artist_id, Expansion { raw, related }))
}

/// Crawl the catalog from `seeds`.
///
/// Produces one level-0 record per resolved seed (keyed by the query) and,
/// for each of those, one level-1 record keyed by the resolved artist id.
/// Deeper levels expand every artist first discovered on the previous level.
/// Provider calls within a level run up to `options.workers` at a time; the
/// log order follows seed order and discovery order regardless.
pub async fn assemble<P>(
    seeds: &BTreeSet<String>,
    provider: &P,
    options: &CrawlOptions,
    cancel: &CancelFlag,
) -> Result<CrawlResult>
where
    P: SearchProvider + ?Sized,
{
    let workers = options.workers.max(1);
    log::info!(
        "Crawling {} seed(s), depth {}, {} worker(s), policy {:?}",
        seeds.len(),
        options.relation_depth,
        workers,
        options.resolution_policy
    );

    let resolved: Vec<Option<Resolved>> = stream::iter(seeds.iter())
        .map(|query| resolve_seed(provider, query, options.resolution_policy, cancel))
        .buffered(workers)
        .try_collect()
        .await?;

    let mut records = Vec::new();
    // Only this task touches `levels`, so the first (lowest) level recorded wins.
    let mut levels: HashMap<String, u32> = HashMap::new();
    let mut frontier: Vec<String> = Vec::new();

    for seed in resolved.into_iter().flatten() {
        levels.entry(seed.artist.id.clone()).or_insert(0);
        frontier.push(seed.artist.id);
        records.push(CrawlRecord::new(seed.raw, seed.query, 0));
    }
    let seed_count = records.len();

    let mut expanded: HashMap<String, Expansion> = HashMap::new();
    for level in 1..=options.relation_depth {
        if frontier.is_empty() {
            break;
        }

        let mut queued = HashSet::new();
        let pending: Vec<String> = frontier
            .iter()
            .filter(|id| !expanded.contains_key(*id) && queued.insert((*id).clone()))
            .cloned()
            .collect();

        let fetched: Vec<(String, Expansion)> = stream::iter(pending)
            .map(|id| expand(provider, id, cancel))
            .buffered(workers)
            .try_collect()
            .await?;
        expanded.extend(fetched);

        let mut next = Vec::new();
        for id in frontier {
            let Some(expansion) = expanded.get(&id) else {
                continue;
            };
            for related in &expansion.related {
                if !levels.contains_key(&related.id) {
                    levels.insert(related.id.clone(), level);
                    next.push(related.id.clone());
                }
            }
            records.push(CrawlRecord::new(expansion.raw.clone(), id, level));
        }

        log::info!("Level {}: {} new artist(s) discovered", level, next.len());
        frontier = next;
    }

    ensure_running(cancel)?;
    log::info!(
        "Crawl complete: {} seed record(s), {} expansion record(s), {} distinct artist(s)",
        seed_count,
        records.len() - seed_count,
        levels.len()
    );

    Ok(CrawlResult::new(records))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawl::parse_seed_queries;
    use crate::provider::MemoryProvider;

    fn artist(id: &str) -> ArtistEntity {
        ArtistEntity::new(id, id.to_uppercase())
    }

    fn seeds(lines: &[&str]) -> BTreeSet<String> {
        parse_seed_queries(&lines.join("\n"), 0)
    }

    fn radiohead() -> MemoryProvider {
        MemoryProvider::new()
            .with_artist("Radiohead", artist("r1"))
            .with_related("r1", vec![artist("a1"), artist("a2")])
    }

    #[tokio::test]
    async fn test_single_seed_scenario() {
        let provider = radiohead();
        let result = assemble(&seeds(&["Radiohead"]), &provider, &CrawlOptions::default(), &CancelFlag::new())
            .await
            .unwrap();

        assert_eq!(result.len(), 2);
        assert_eq!(result.records[0].query, "Radiohead");
        assert_eq!(result.records[0].level, 0);
        assert_eq!(result.records[1].query, "r1");
        assert_eq!(result.records[1].level, 1);
        let related = parse_related(&result.records[1].result).unwrap();
        assert_eq!(related.len(), 2);
    }

    #[tokio::test]
    async fn test_one_level0_record_per_seed() {
        let provider = MemoryProvider::new()
            .with_artist("A", artist("a"))
            .with_artist("B", artist("b"))
            .with_artist("C", artist("c"));
        let result = assemble(&seeds(&["A", "B", "C", "B "]), &provider, &CrawlOptions::default(), &CancelFlag::new())
            .await
            .unwrap();

        let level0: Vec<&str> = result.at_level(0).map(|r| r.query.as_str()).collect();
        assert_eq!(level0, vec!["A", "B", "C"]);
        assert_eq!(result.at_level(1).count(), 3);
    }

    #[tokio::test]
    async fn test_duplicate_seed_searched_once() {
        let provider = MemoryProvider::new().with_artist("X", artist("x"));
        let result = assemble(&seeds(&["X", "  X "]), &provider, &CrawlOptions::default(), &CancelFlag::new())
            .await
            .unwrap();

        assert_eq!(result.at_level(0).count(), 1);
        let searches = provider.calls().iter().filter(|c| c.starts_with("search:")).count();
        assert_eq!(searches, 1);
    }

    #[tokio::test]
    async fn test_unresolved_seed_aborts() {
        let provider = radiohead();
        let err = assemble(&seeds(&["Radiohead", "Nobody"]), &provider, &CrawlOptions::default(), &CancelFlag::new())
            .await
            .unwrap_err();

        match err {
            ArtistGraphError::Resolution(query) => assert_eq!(query, "Nobody"),
            other => panic!("expected resolution error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unresolved_seed_skipped() {
        let provider = radiohead();
        let options = CrawlOptions {
            resolution_policy: ResolutionPolicy::Skip,
            ..CrawlOptions::default()
        };
        let result = assemble(&seeds(&["Radiohead", "Nobody"]), &provider, &options, &CancelFlag::new())
            .await
            .unwrap();

        assert_eq!(result.at_level(0).count(), 1);
        assert_eq!(result.at_level(1).count(), 1);
        assert!(result.records.iter().all(|r| r.query != "Nobody"));
    }

    #[tokio::test]
    async fn test_two_queries_same_artist() {
        let provider = MemoryProvider::new()
            .with_artist("Radiohead", artist("r1"))
            .with_artist("radio head", artist("r1"))
            .with_related("r1", vec![artist("a1")]);
        let result = assemble(&seeds(&["Radiohead", "radio head"]), &provider, &CrawlOptions::default(), &CancelFlag::new())
            .await
            .unwrap();

        assert_eq!(result.at_level(0).count(), 2);
        assert_eq!(result.at_level(1).count(), 2);
        let related_calls = provider.calls().iter().filter(|c| c.starts_with("related:")).count();
        assert_eq!(related_calls, 1);
    }

    #[tokio::test]
    async fn test_depth_two_keeps_minimum_level() {
        // r1 -> a1, a2; a1 -> r1 (seed), a2 (already level 1), b1 (new)
        let provider = radiohead()
            .with_related("a1", vec![artist("r1"), artist("a2"), artist("b1")])
            .with_related("a2", vec![artist("a1")]);
        let options = CrawlOptions {
            relation_depth: 2,
            ..CrawlOptions::default()
        };
        let result = assemble(&seeds(&["Radiohead"]), &provider, &options, &CancelFlag::new())
            .await
            .unwrap();

        let level2: Vec<&str> = result.at_level(2).map(|r| r.query.as_str()).collect();
        assert_eq!(level2, vec!["a1", "a2"]);
        // b1 is only discovered at level 2 and depth stops there
        assert!(!provider.calls().contains(&"related:b1".to_string()));
        let r1_calls = provider.calls().iter().filter(|c| *c == "related:r1").count();
        assert_eq!(r1_calls, 1);
    }

    #[tokio::test]
    async fn test_depth_zero_only_resolves() {
        let provider = radiohead();
        let options = CrawlOptions {
            relation_depth: 0,
            ..CrawlOptions::default()
        };
        let result = assemble(&seeds(&["Radiohead"]), &provider, &options, &CancelFlag::new())
            .await
            .unwrap();
        assert_eq!(result.len(), 1);
    }

    #[tokio::test]
    async fn test_provider_error_propagates() {
        let provider = radiohead().failing_on("r1");
        let err = assemble(&seeds(&["Radiohead"]), &provider, &CrawlOptions::default(), &CancelFlag::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ArtistGraphError::Provider(_)));
    }

    #[tokio::test]
    async fn test_cancelled_run_issues_no_calls() {
        let provider = radiohead();
        let cancel = CancelFlag::new();
        cancel.cancel();
        let err = assemble(&seeds(&["Radiohead"]), &provider, &CrawlOptions::default(), &cancel)
            .await
            .unwrap_err();

        assert!(matches!(err, ArtistGraphError::Cancelled(_)));
        assert!(provider.calls().is_empty());
    }

    #[tokio::test]
    async fn test_parallel_crawl_matches_sequential() {
        let build = || {
            let mut provider = MemoryProvider::new();
            for i in 0..8 {
                let id = format!("s{}", i);
                provider = provider
                    .with_artist(&format!("Seed {}", i), artist(&id))
                    .with_related(&id, vec![artist(&format!("rel{}", i)), artist(&format!("rel{}", i + 1))]);
            }
            provider
        };
        let queries: Vec<String> = (0..8).map(|i| format!("Seed {}", i)).collect();
        let seed_set: BTreeSet<String> = queries.into_iter().collect();

        let sequential = assemble(&seed_set, &build(), &CrawlOptions::default(), &CancelFlag::new())
            .await
            .unwrap();
        let parallel_options = CrawlOptions {
            workers: 4,
            ..CrawlOptions::default()
        };
        let parallel = assemble(&seed_set, &build(), &parallel_options, &CancelFlag::new())
            .await
            .unwrap();

        assert_eq!(sequential, parallel);
    }

    #[tokio::test]
    async fn test_empty_seed_set() {
        let provider = MemoryProvider::new();
        let result = assemble(&BTreeSet::new(), &provider, &CrawlOptions::default(), &CancelFlag::new())
            .await
            .unwrap();
        assert!(result.is_empty());
    }
}
