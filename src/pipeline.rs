//! End-to-end run: assemble -> persist -> load -> render.

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::config::Config;
use crate::crawl::{assemble, CancelFlag, CrawlOptions};
use crate::db::Db;
use crate::error::ArtistGraphError;
use crate::provider::{SearchProvider, SpotifyClient};
use crate::render::{GraphRenderer, HtmlRenderer, RenderGraph};
use crate::store::{load, persist, GraphSink, GraphSource, PersistOptions, PersistSummary, SqliteGraphStore};

/// File names written into the pipeline output directory
pub const CRAWL_LOG_FILE: &str = "artist_crawl.json";
pub const GRAPH_HTML_FILE: &str = "graph.html";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Assemble,
    Persist,
    Load,
    Render,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Assemble => write!(f, "assemble"),
            Stage::Persist => write!(f, "persist"),
            Stage::Load => write!(f, "load"),
            Stage::Render => write!(f, "render"),
        }
    }
}

/// An error tagged with the stage it stopped the run in
#[derive(Debug, Error)]
#[error("{stage} stage failed: {source}")]
pub struct PipelineError {
    pub stage: Stage,
    pub source: ArtistGraphError,
}

trait StageExt<T> {
    fn stage(self, stage: Stage) -> std::result::Result<T, PipelineError>;
}

impl<T> StageExt<T> for crate::error::Result<T> {
    fn stage(self, stage: Stage) -> std::result::Result<T, PipelineError> {
        self.map_err(|source| PipelineError { stage, source })
    }
}

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub crawl: CrawlOptions,
    pub persist: PersistOptions,
    /// Receives the crawl log and the rendered page
    pub output_dir: PathBuf,
}

#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub crawl_records: usize,
    pub persisted: PersistSummary,
    pub loaded_nodes: usize,
    pub loaded_edges: usize,
    pub crawl_log: PathBuf,
    pub graph_html: PathBuf,
}

/// Run every stage in order against `provider` and `store`.
pub async fn run_pipeline<P, S>(
    seeds: &BTreeSet<String>,
    provider: &P,
    store: &S,
    options: &PipelineOptions,
    cancel: &CancelFlag,
) -> std::result::Result<PipelineReport, PipelineError>
where
    P: SearchProvider + ?Sized,
    S: GraphSink + GraphSource + ?Sized,
{
    let result = assemble(seeds, provider, &options.crawl, cancel)
        .await
        .stage(Stage::Assemble)?;
    let crawl_log = options.output_dir.join(CRAWL_LOG_FILE);
    result.write_to(&crawl_log).stage(Stage::Assemble)?;
    let crawl_records = result.len();

    let persisted = persist(result, store, &options.persist).await.stage(Stage::Persist)?;

    let (nodes, edges) = load(store).await.stage(Stage::Load)?;

    let graph_html = options.output_dir.join(GRAPH_HTML_FILE);
    let html = HtmlRenderer::default()
        .render(&RenderGraph::from_parts(&nodes, &edges))
        .stage(Stage::Render)?;
    std::fs::write(&graph_html, html)
        .map_err(ArtistGraphError::from)
        .stage(Stage::Render)?;

    log::info!("Pipeline complete, graph written to {}", graph_html.display());
    Ok(PipelineReport {
        crawl_records,
        persisted,
        loaded_nodes: nodes.len(),
        loaded_edges: edges.len(),
        crawl_log,
        graph_html,
    })
}

/// Spotify client configured from `[provider]`
pub fn spotify_client(config: &Config) -> anyhow::Result<SpotifyClient> {
    let token = config.provider_token()?;
    let client = SpotifyClient::new(&config.provider.base_url, token, config.provider_timeout())?
        .with_market(config.provider.market.clone());
    Ok(client)
}

/// SQLite graph store configured from `[store]`, migrations applied
pub async fn open_store(config: &Config) -> anyhow::Result<SqliteGraphStore> {
    let db = Db::new(config.db_path()).with_busy_timeout(config.busy_timeout());
    let store = SqliteGraphStore::new(db);
    store.migrate(config.migrations_dir()).await?;
    Ok(store)
}

/// SQLite graph store for reading an existing database
pub fn open_store_read_only(config: &Config) -> SqliteGraphStore {
    SqliteGraphStore::new(Db::read_only(config.db_path()).with_busy_timeout(config.busy_timeout()))
}

/// Output directory from `[artistgraph]`, or `override_dir` when given
pub fn output_dir(config: &Config, override_dir: Option<&Path>) -> PathBuf {
    override_dir.unwrap_or_else(|| config.data_dir()).to_path_buf()
}
