//! Graph renderers
//!
//! Supports:
//! - `html` - Standalone vis-network page
//! - `json` - `{nodes, edges}` document of the render graph
//!
//! plus raw `artists.json` / `artist_relations.json` exports of a loaded graph.

mod html;
mod json;

pub use html::HtmlRenderer;
pub use json::{write_exports, JsonRenderer};

use serde::Serialize;
use std::collections::HashSet;
use std::str::FromStr;

use crate::error::{ArtistGraphError, Result};
use crate::graph::{ArtistNode, RelationEdge};

/// A node as a renderer draws it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderNode {
    pub id: String,
    pub label: String,
    /// Crawl level of the artist
    pub group: u32,
    pub size: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderEdge {
    pub from: String,
    pub to: String,
}

/// Node size for a popularity score; never decreases as popularity grows.
pub fn size_hint(popularity: Option<f64>) -> f64 {
    let popularity = popularity.filter(|p| p.is_finite()).unwrap_or(0.0).clamp(0.0, 100.0);
    10.0 + 0.4 * popularity
}

/// Renderer input, sorted by id so output is stable across loads
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RenderGraph {
    pub nodes: Vec<RenderNode>,
    pub edges: Vec<RenderEdge>,
}

impl RenderGraph {
    pub fn from_parts(nodes: &[ArtistNode], edges: &[RelationEdge]) -> Self {
        let mut render_nodes: Vec<RenderNode> = nodes
            .iter()
            .map(|node| RenderNode {
                id: node.id.clone(),
                label: node.name.clone(),
                group: node.level,
                size: size_hint(node.popularity),
            })
            .collect();
        render_nodes.sort_by(|a, b| a.id.cmp(&b.id));

        let mut render_edges: Vec<RenderEdge> = edges
            .iter()
            .map(|edge| RenderEdge {
                from: edge.from.clone(),
                to: edge.to.clone(),
            })
            .collect();
        render_edges.sort_by(|a, b| (&a.from, &a.to).cmp(&(&b.from, &b.to)));

        Self {
            nodes: render_nodes,
            edges: render_edges,
        }
    }

    /// Keep only `edges` and the nodes they touch, plus `focus` itself
    pub fn neighbourhood(nodes: &[ArtistNode], edges: &[RelationEdge], focus: &str) -> Self {
        let mut keep: HashSet<&str> = edges.iter().flat_map(|e| [e.from.as_str(), e.to.as_str()]).collect();
        keep.insert(focus);
        let nodes: Vec<ArtistNode> = nodes.iter().filter(|n| keep.contains(n.id.as_str())).cloned().collect();
        Self::from_parts(&nodes, edges)
    }
}

pub trait GraphRenderer {
    fn render(&self, graph: &RenderGraph) -> Result<String>;
}

/// Supported output formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Html,
    Json,
}

impl FromStr for OutputFormat {
    type Err = ArtistGraphError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "html" | "htm" => Ok(OutputFormat::Html),
            "json" => Ok(OutputFormat::Json),
            _ => Err(ArtistGraphError::InvalidInput(format!(
                "Unknown format '{}'. Valid formats: html, json",
                s
            ))),
        }
    }
}

impl OutputFormat {
    pub fn renderer(&self) -> Box<dyn GraphRenderer> {
        match self {
            OutputFormat::Html => Box::new(HtmlRenderer::default()),
            OutputFormat::Json => Box::new(JsonRenderer),
        }
    }
}
