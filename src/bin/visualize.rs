use anyhow::{Context, Result};
use artistgraph::pipeline;
use artistgraph::render::{write_exports, GraphRenderer, OutputFormat, RenderGraph};
use artistgraph::store::load;
use artistgraph::{traverse_graph, Config};
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "visualize")]
#[command(about = "Render the stored artist graph")]
struct Args {
    /// Output file
    output: PathBuf,

    /// Output format: html or json
    #[arg(short, long, default_value = "html")]
    format: String,

    /// Also export artists.json and artist_relations.json into this directory
    #[arg(long)]
    json: Option<PathBuf>,

    /// Only draw the neighbourhood of this artist id
    #[arg(long)]
    focus: Option<String>,

    /// Hops followed from --focus
    #[arg(long, default_value_t = 2)]
    depth: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = Config::load()?;

    env_logger::Builder::from_env(
        env_logger::Env::default()
            .filter_or("RUST_LOG", config.artistgraph.log_level.as_str())
    ).init();

    let format: OutputFormat = args.format.parse()?;
    let store = pipeline::open_store_read_only(&config);

    let (nodes, edges) = load(&store)
        .await
        .with_context(|| format!("Failed to load graph from {}", config.db_path().display()))?;

    let graph = match &args.focus {
        Some(focus) => {
            let reached = traverse_graph(&store, focus, args.depth).await?;
            log::info!("{} relation(s) within {} hop(s) of {}", reached.len(), args.depth, focus);
            RenderGraph::neighbourhood(&nodes, &reached, focus)
        }
        None => RenderGraph::from_parts(&nodes, &edges),
    };

    let rendered = format.renderer().render(&graph)?;
    if let Some(parent) = args.output.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&args.output, rendered)
        .with_context(|| format!("Failed to write {}", args.output.display()))?;
    log::info!(
        "Rendered {} artist(s) and {} relation(s) to {}",
        graph.nodes.len(),
        graph.edges.len(),
        args.output.display()
    );

    if let Some(dir) = &args.json {
        write_exports(dir, &nodes, &edges)?;
    }

    Ok(())
}
