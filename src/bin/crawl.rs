use anyhow::{Context, Result};
use artistgraph::crawl::{assemble, read_seed_file, CancelFlag, ResolutionPolicy};
use artistgraph::pipeline;
use artistgraph::Config;
use clap::Parser;
use std::path::PathBuf;
use std::time::Instant;

#[derive(Parser, Debug)]
#[command(name = "crawl")]
#[command(about = "Resolve seed artists and crawl their related artists into a replayable log")]
struct Args {
    /// Seed file, one artist query per line
    seeds: PathBuf,

    /// Where to write the crawl log (JSON)
    output: PathBuf,

    /// Only crawl the first N seeds (sorted); 0 keeps all
    #[arg(short, long)]
    limit: Option<usize>,

    /// Relation hops to expand after the seeds
    #[arg(short, long)]
    depth: Option<u32>,

    /// Leave unresolved seed queries out instead of failing the crawl
    #[arg(long)]
    skip_unresolved: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = Config::load()?;

    env_logger::Builder::from_env(
        env_logger::Env::default()
            .filter_or("RUST_LOG", config.artistgraph.log_level.as_str())
    ).init();

    let mut options = config.crawl_options();
    if let Some(depth) = args.depth {
        anyhow::ensure!(depth >= 1, "--depth must be at least 1");
        options.relation_depth = depth;
    }
    if args.skip_unresolved {
        options.resolution_policy = ResolutionPolicy::Skip;
    }
    let limit = args.limit.unwrap_or(config.crawl.seed_limit);

    let seeds = read_seed_file(&args.seeds, limit)?;
    log::info!("Loaded {} seed(s) from {}", seeds.len(), args.seeds.display());

    let provider = pipeline::spotify_client(&config)?;

    let cancel = CancelFlag::new();
    let flag = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("Interrupt received, stopping after in-flight requests");
            flag.cancel();
        }
    });

    let start = Instant::now();
    let result = assemble(&seeds, &provider, &options, &cancel)
        .await
        .context("Crawl failed")?;

    result
        .write_to(&args.output)
        .with_context(|| format!("Failed to write crawl log {}", args.output.display()))?;

    log::info!(
        "Wrote {} record(s) to {} in {:.1}s",
        result.len(),
        args.output.display(),
        start.elapsed().as_secs_f64()
    );
    Ok(())
}
