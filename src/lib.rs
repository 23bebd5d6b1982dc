pub mod config;
pub mod error;
pub mod db;
pub mod provider;
pub mod crawl;
pub mod graph;
pub mod store;
pub mod render;
pub mod pipeline;

pub use config::Config;
pub use error::{ArtistGraphError, Result};
pub use crawl::{assemble, CancelFlag, CrawlOptions, CrawlRecord, CrawlResult, ResolutionPolicy};
pub use graph::{ArtistNode, RelationEdge, traverse_graph};
pub use store::{load, persist, GraphSink, GraphSource, PersistOptions, PersistSummary};
pub use pipeline::{run_pipeline, PipelineError, Stage};
