use std::fs;
use std::path::{Path, PathBuf};

use super::{GraphRenderer, RenderGraph};
use crate::error::Result;
use crate::graph::{ArtistNode, RelationEdge};

/// Render graph as a pretty `{nodes, edges}` JSON document
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonRenderer;

impl GraphRenderer for JsonRenderer {
    fn render(&self, graph: &RenderGraph) -> Result<String> {
        Ok(serde_json::to_string_pretty(graph)?)
    }
}

/// Write `artists.json` and `artist_relations.json` into `dir`.
///
/// Returns the two paths written.
pub fn write_exports(dir: &Path, nodes: &[ArtistNode], edges: &[RelationEdge]) -> Result<(PathBuf, PathBuf)> {
    fs::create_dir_all(dir)?;

    let artists_path = dir.join("artists.json");
    fs::write(&artists_path, serde_json::to_string_pretty(nodes)?)?;

    let relations_path = dir.join("artist_relations.json");
    fs::write(&relations_path, serde_json::to_string_pretty(edges)?)?;

    log::info!("Exported {} artist(s) and {} relation(s) to {}", nodes.len(), edges.len(), dir.display());
    Ok((artists_path, relations_path))
}
