//! Standalone HTML page drawing the graph with vis-network.

use super::{GraphRenderer, RenderGraph};
use crate::error::Result;

const VIS_NETWORK_URL: &str = "https://unpkg.com/vis-network@9.1.9/standalone/umd/vis-network.min.js";

#[derive(Debug, Clone)]
pub struct HtmlRenderer {
    pub title: String,
}

impl Default for HtmlRenderer {
    fn default() -> Self {
        Self {
            title: "Artist graph".to_string(),
        }
    }
}

impl GraphRenderer for HtmlRenderer {
    fn render(&self, graph: &RenderGraph) -> Result<String> {
        let nodes = script_json(&serde_json::to_string(&graph.nodes)?);
        let edges = script_json(&serde_json::to_string(&graph.edges)?);

        Ok(format!(
            r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>{title}</title>
    <script src="{vis}"></script>
    <style>
        body {{ margin: 0; font-family: sans-serif; }}
        #graph {{ width: 100%; height: 800px; }}
        .summary {{ padding: 8px 12px; color: #475569; }}
    </style>
</head>
<body>
<div class="summary">{title}: {node_count} artists, {edge_count} relations</div>
<div id="graph"></div>
<script>
    const nodes = new vis.DataSet({nodes});
    const edges = new vis.DataSet({edges});
    new vis.Network(
        document.getElementById("graph"),
        {{ nodes: nodes, edges: edges }},
        {{ edges: {{ arrows: "to" }}, nodes: {{ shape: "dot" }}, physics: {{ stabilization: true }} }}
    );
</script>
</body>
</html>
"#,
            title = html_escape(&self.title),
            vis = VIS_NETWORK_URL,
            node_count = graph.nodes.len(),
            edge_count = graph.edges.len(),
            nodes = nodes,
            edges = edges,
        ))
    }
}

/// JSON embedded in a `<script>` block must not close it
fn script_json(json: &str) -> String {
    json.replace("</", "<\\/")
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
