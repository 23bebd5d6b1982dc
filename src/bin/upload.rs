use anyhow::{Context, Result};
use artistgraph::crawl::CrawlResult;
use artistgraph::pipeline;
use artistgraph::store::{persist, PersistOptions};
use artistgraph::Config;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "upload")]
#[command(about = "Rebuild the artist graph store from a crawl log")]
struct Args {
    /// Crawl log written by `crawl`
    input: PathBuf,

    /// Also write the persist summary as JSON
    #[arg(short, long)]
    summary: Option<PathBuf>,

    /// Do not create the synthetic root node
    #[arg(long)]
    no_root: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = Config::load()?;

    env_logger::Builder::from_env(
        env_logger::Env::default()
            .filter_or("RUST_LOG", config.artistgraph.log_level.as_str())
    ).init();

    let result = CrawlResult::read_from(&args.input)
        .with_context(|| format!("Failed to read crawl log {}", args.input.display()))?;
    log::info!("Read {} record(s) from {}", result.len(), args.input.display());

    let store = pipeline::open_store(&config).await?;
    log::info!("Database path: {}", config.db_path().display());

    let options = PersistOptions {
        root_anchor: config.crawl.root_anchor && !args.no_root,
    };
    let summary = persist(result, &store, &options).await.context("Upload failed")?;

    if let Some(path) = &args.summary {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(&summary)?)
            .with_context(|| format!("Failed to write summary {}", path.display()))?;
        log::info!("Summary written to {}", path.display());
    }

    log::info!(
        "Upload complete: {} artist(s), {} relation(s)",
        summary.nodes_created,
        summary.edges_created
    );
    Ok(())
}
