use anyhow::{Context, Result};
use artistgraph::crawl::{read_seed_file, CancelFlag};
use artistgraph::db::migrate;
use artistgraph::pipeline::{self, PipelineOptions};
use artistgraph::store::{recent_builds, PersistOptions};
use artistgraph::{ArtistGraphError, Config};
use std::path::Path;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load()?;

    env_logger::Builder::from_env(
        env_logger::Env::default()
            .filter_or("RUST_LOG", config.artistgraph.log_level.as_str())
    ).init();

    // Parse command-line arguments
    let args: Vec<String> = std::env::args().collect();
    let command = args.get(1).map(|s| s.as_str()).unwrap_or("verify");

    match command {
        "run" => {
            let seeds = args
                .get(2)
                .context("Usage: artistgraph run <seeds-file>")?;
            run_full_pipeline(&config, Path::new(seeds)).await?;
        }
        _ => {
            // Default: verify database schema
            run_schema_verification(&config).await?;
        }
    }

    Ok(())
}

/// Crawl, persist, load and render in one process
async fn run_full_pipeline(config: &Config, seeds_path: &Path) -> Result<()> {
    log::info!("Starting artistgraph v{}", env!("CARGO_PKG_VERSION"));

    let seeds = read_seed_file(seeds_path, config.crawl.seed_limit)?;
    log::info!("Loaded {} seed(s) from {}", seeds.len(), seeds_path.display());

    let provider = pipeline::spotify_client(config)?;
    let store = pipeline::open_store(config).await?;

    let cancel = CancelFlag::new();
    let flag = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("Interrupt received, stopping after in-flight requests");
            flag.cancel();
        }
    });

    let options = PipelineOptions {
        crawl: config.crawl_options(),
        persist: PersistOptions {
            root_anchor: config.crawl.root_anchor,
        },
        output_dir: pipeline::output_dir(config, None),
    };

    let report = pipeline::run_pipeline(&seeds, &provider, &store, &options, &cancel).await?;

    log::info!(
        "Crawl log: {} ({} records)",
        report.crawl_log.display(),
        report.crawl_records
    );
    log::info!(
        "Graph: {} artists, {} relations ({} duplicate relations skipped)",
        report.loaded_nodes,
        report.loaded_edges,
        report.persisted.duplicate_edges
    );
    log::info!("Rendered: {}", report.graph_html.display());
    Ok(())
}

/// Run database schema verification
async fn run_schema_verification(config: &Config) -> Result<()> {
    log::info!("Starting artistgraph v{}", env!("CARGO_PKG_VERSION"));
    log::info!("Database path: {}", config.db_path().display());
    log::info!("Catalog provider: {}", config.provider.base_url);

    let store = pipeline::open_store(config).await?;
    log::info!("Database initialized successfully");

    store.db().with_connection(|conn| {
        let missing = migrate::missing_tables(conn)?;
        if !missing.is_empty() {
            return Err(ArtistGraphError::Config(format!("Missing tables: {}", missing.join(", "))));
        }
        log::debug!("✓ {} tables present", migrate::EXPECTED_TABLES.len());

        let applied = migrate::get_applied_migrations(conn)?;
        log::debug!("✓ {} migrations applied", applied.len());

        let foreign_keys: i32 = conn.query_row("PRAGMA foreign_keys", [], |row| row.get(0))?;
        if foreign_keys != 1 {
            return Err(ArtistGraphError::Config("Foreign keys not enabled".to_string()));
        }
        log::debug!("✓ Foreign keys enabled");

        let integrity: String = conn.query_row("PRAGMA integrity_check", [], |row| row.get(0))?;
        if integrity != "ok" {
            return Err(ArtistGraphError::Config(format!("Database integrity check failed: {}", integrity)));
        }
        log::info!("✓ Database integrity: OK");

        Ok(())
    }).await?;

    match recent_builds(store.db(), 1).await?.first() {
        Some(build) => log::info!(
            "Last graph build {} at {}: {} artists, {} relations",
            build.build_id, build.finished_at, build.node_count, build.edge_count
        ),
        None => log::info!("No graph built yet"),
    }

    log::info!("✓ Database schema verification complete");
    Ok(())
}
