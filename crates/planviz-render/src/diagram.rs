//! Rooted diagram tree shared by the DOT and Mermaid writers.
//!
//! One `DiagramNode` per visible plan node, following visible links from the
//! root. Edges point from parent to child here; DOT draws them child to
//! parent under `rankdir=BT`.


use tracing::debug;

use planviz_core::config::RenderOptions;
use planviz_core::error::{Error, Result};
use planviz_core::graph::PlanGraph;
use planviz_core::plan::{ChildLink, PlanNode};
use planviz_core::schema::{QueryStats, RowType};

use crate::escape::{left_aligned, GraphvizHtml, LabelDialect};
use crate::label::{LabelContent, LabelContentBuilder};

/// Name of the optional query text node.
pub const QUERY_NODE_NAME: &str = "query";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EdgeStyle {
    #[default]
    Solid,
    /// Remote call to another cluster node.
    Dashed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DiagramEdge {
    /// Link type after `Input` relabeling; may be empty.
    pub link_type: String,
    pub style: EdgeStyle,
    pub child: DiagramNode,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DiagramNode {
    pub index: usize,
    /// `node<index>`.
    pub name: String,
    pub content: LabelContent,
    /// YAML dump of the plan node.
    pub tooltip: String,
    pub edges: Vec<DiagramEdge>,
}

/// Query text and its sorted `key: value` stats lines.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct QueryNode {
    pub text: String,
    pub stats: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Diagram {
    pub root: DiagramNode,
    pub query: Option<QueryNode>,
}

impl Diagram {
    /// Nodes in pre-order, root first.
    pub fn nodes(&self) -> Vec<&DiagramNode> {
        let mut out = Vec::new();
        collect_nodes(&self.root, &mut out);
        out
    }

    /// `(parent, edge)` pairs in visit order: an edge precedes its child's subtree.
    pub fn edges(&self) -> Vec<(&DiagramNode, &DiagramEdge)> {
        let mut out = Vec::new();
        collect_edges(&self.root, &mut out);
        out
    }
}

fn collect_nodes<'a>(node: &'a DiagramNode, out: &mut Vec<&'a DiagramNode>) {
    out.push(node);
    for edge in &node.edges {
        collect_nodes(&edge.child, out);
    }
}

fn collect_edges<'a>(node: &'a DiagramNode, out: &mut Vec<(&'a DiagramNode, &'a DiagramEdge)>) {
    for edge in &node.edges {
        out.push((node, edge));
        collect_edges(&edge.child, out);
    }
}

/// Build the diagram tree for `graph`.
///
/// The query node exists when `query_stats` is present and either
/// `show_query` or `show_query_stats` is set.
pub fn build_diagram(
    graph: &PlanGraph,
    options: &RenderOptions,
    row_type: Option<&RowType>,
    query_stats: Option<&QueryStats>,
) -> Result<Diagram> {
    let builder = DiagramBuilder {
        graph,
        labels: LabelContentBuilder::new(graph, options, row_type),
    };
    let mut on_path = vec![false; graph.len()];
    let root = builder.node(None, &mut on_path)?;

    let query = query_stats
        .filter(|_| options.show_query || options.show_query_stats)
        .map(|qs| QueryNode {
            text: qs.query_text().to_string(),
            stats: if options.show_query_stats {
                qs.stat_lines()
            } else {
                Vec::new()
            },
        });

    debug!(query = query.is_some(), "diagram built");
    Ok(Diagram { root, query })
}

struct DiagramBuilder<'a> {
    graph: &'a PlanGraph,
    labels: LabelContentBuilder<'a>,
}

impl DiagramBuilder<'_> {
    fn node(&self, link: Option<&ChildLink>, on_path: &mut [bool]) -> Result<DiagramNode> {
        let plan_node = self.graph.child(link);
        if on_path[plan_node.index] {
            return Err(Error::GraphConstruction(format!(
                "cycle through node {}",
                plan_node.index
            )));
        }
        on_path[plan_node.index] = true;

        let mut edges = Vec::new();
        for child_link in self.graph.visible_child_links(plan_node) {
            edges.push(DiagramEdge {
                link_type: self.graph.link_type(child_link).to_string(),
                style: if self.graph.is_remote_call(plan_node, child_link) {
                    EdgeStyle::Dashed
                } else {
                    EdgeStyle::Solid
                },
                child: self.node(Some(child_link), on_path)?,
            });
        }

        on_path[plan_node.index] = false;
        Ok(DiagramNode {
            index: plan_node.index,
            name: format!("node{}", plan_node.index),
            content: self.labels.build(plan_node)?,
            tooltip: tooltip(plan_node)?,
            edges,
        })
    }
}

fn tooltip(node: &PlanNode) -> Result<String> {
    serde_yaml::to_string(node).map_err(|e| Error::Encode {
        what: "node tooltip",
        reason: e.to_string(),
    })
}

/// Escape a DOT double-quoted string.
pub fn escape_dot_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            _ => out.push(c),
        }
    }
    out
}

/// Query node body: bold query text, italic stats.
pub fn query_label(query: &QueryNode) -> String {
    let mut out = format!("<b>{}</b>", left_aligned(&query.text));
    if !query.stats.is_empty() {
        out.push_str(&format!("<i>{}</i>", left_aligned(&query.stats.join("\n"))));
    }
    out
}

/// DOT source for `diagram`: child-to-parent edges, bottom-to-top ranks.
pub fn render_dot(diagram: &Diagram) -> String {
    let mut out = String::new();
    out.push_str("digraph {\n");
    out.push_str("  rankdir=BT\n");
    out.push_str("  node [shape=box]\n");

    for node in diagram.nodes() {
        out.push_str(&format!(
            "  {} [label=<{}>, tooltip=\"{}\"]\n",
            node.name,
            GraphvizHtml.render(&node.content),
            escape_dot_string(&node.tooltip)
        ));
    }

    for (parent, edge) in diagram.edges() {
        let mut attrs = Vec::new();
        if !edge.link_type.is_empty() {
            attrs.push(format!("label=\"{}\"", escape_dot_string(&edge.link_type)));
        }
        if edge.style == EdgeStyle::Dashed {
            attrs.push("style=dashed".to_string());
        }
        out.push_str(&format!("  {} -> {}", edge.child.name, parent.name));
        if !attrs.is_empty() {
            out.push_str(&format!(" [{}]", attrs.join(", ")));
        }
        out.push('\n');
    }

    if let Some(query) = &diagram.query {
        out.push_str(&format!(
            "  {QUERY_NODE_NAME} [label=<{}>, shape=box, style=rounded]\n",
            query_label(query)
        ));
        out.push_str(&format!("  {} -> {QUERY_NODE_NAME}\n", diagram.root.name));
    }

    out.push_str("}\n");
    out
}
