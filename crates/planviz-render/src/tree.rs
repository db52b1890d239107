//! Pre-order projection of the plan graph into ASCII tree rows.
//!
//! ```text
//! Distributed Union
//! +- Local Distributed Union
//!    +- Serialize Result
//!       +- Index Scan (Index: SongsBySingerAlbumSongNameDesc)
//! ```
//!
//! Only visible links are followed. Each row carries its predicates
//! (`<type>: <description>` of predicate children), its scalar parameters
//! grouped by link type and a typed stats snapshot.

use std::collections::BTreeMap;

use tracing::trace;

use planviz_core::config::RenderOptions;
use planviz_core::error::{Error, Result};
use planviz_core::graph::PlanGraph;
use planviz_core::plan::{ChildLink, PlanNode, PlanNodeKind};
use planviz_core::stats::ExecutionStats;

use crate::title::node_title;
use crate::wrap::wrap_words;

/// Tree drawing constants for one layout.
#[derive(Debug, Clone, Copy)]
pub struct TreeGlyphs {
    pub link: &'static str,
    pub branch: &'static str,
    pub indent: usize,
    pub branch_gap: &'static str,
}

impl TreeGlyphs {
    pub const STANDARD: TreeGlyphs = TreeGlyphs {
        link: "|",
        branch: "+-",
        indent: 2,
        branch_gap: " ",
    };

    pub const COMPACT: TreeGlyphs = TreeGlyphs {
        link: "|",
        branch: "+",
        indent: 0,
        branch_gap: "",
    };

    pub fn for_layout(compact: bool) -> Self {
        if compact {
            Self::COMPACT
        } else {
            Self::STANDARD
        }
    }

    fn connector(&self) -> String {
        format!("{}{}", self.link, " ".repeat(self.indent))
    }

    fn blank(&self) -> String {
        " ".repeat(self.link.chars().count() + self.indent)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TreeRow {
    pub id: usize,
    /// Prefix of the first line (connectors plus branch glyph).
    pub tree_part: String,
    /// Prefix of every wrapped continuation line.
    pub continuation_part: String,
    /// `[<link type>] <title>`, newline-separated when wrapped.
    pub node_text: String,
    pub predicates: Vec<String>,
    /// Scalar parameter items by link type.
    pub params: BTreeMap<String, Vec<String>>,
    pub stats: ExecutionStats,
}

impl TreeRow {
    /// `*<id>` when the row has predicates, else `<id>`.
    pub fn format_id(&self) -> String {
        if self.predicates.is_empty() {
            self.id.to_string()
        } else {
            format!("*{}", self.id)
        }
    }

    pub fn lines(&self) -> Vec<String> {
        self.node_text
            .split('\n')
            .enumerate()
            .map(|(i, line)| {
                let prefix = if i == 0 {
                    &self.tree_part
                } else {
                    &self.continuation_part
                };
                format!("{prefix}{line}")
            })
            .collect()
    }

    pub fn text(&self) -> String {
        self.lines().join("\n")
    }
}

pub struct TreeProjector<'a> {
    graph: &'a PlanGraph,
    options: &'a RenderOptions,
    glyphs: TreeGlyphs,
}

impl<'a> TreeProjector<'a> {
    pub fn new(graph: &'a PlanGraph, options: &'a RenderOptions) -> Self {
        Self {
            graph,
            options,
            glyphs: TreeGlyphs::for_layout(options.title.compact),
        }
    }

    /// All rows in pre-order, root first.
    pub fn project(&self) -> Result<Vec<TreeRow>> {
        let mut rows = Vec::with_capacity(self.graph.len());
        let mut ended = Vec::new();
        let mut on_path = vec![false; self.graph.len()];
        self.walk(None, &mut ended, &mut on_path, &mut rows)?;
        Ok(rows)
    }

    fn walk(
        &self,
        link: Option<&ChildLink>,
        ended: &mut Vec<bool>,
        on_path: &mut [bool],
        rows: &mut Vec<TreeRow>,
    ) -> Result<()> {
        let node = self.graph.child(link);
        if on_path[node.index] {
            return Err(Error::GraphConstruction(format!(
                "cycle through node {}",
                node.index
            )));
        }
        on_path[node.index] = true;

        let row = self.row(node, link, ended)?;
        trace!(id = row.id, depth = ended.len(), "tree row");
        rows.push(row);

        let children: Vec<&ChildLink> = self.graph.visible_child_links(node).collect();
        for (i, child) in children.iter().enumerate() {
            ended.push(i + 1 == children.len());
            self.walk(Some(child), ended, on_path, rows)?;
            ended.pop();
        }

        on_path[node.index] = false;
        Ok(())
    }

    fn row(&self, node: &PlanNode, link: Option<&ChildLink>, ended: &[bool]) -> Result<TreeRow> {
        let depth = ended.len();
        let g = &self.glyphs;

        let tree_part = match ended.split_last() {
            None => String::new(),
            Some((_, ancestors)) => {
                let mut s: String = ancestors
                    .iter()
                    .map(|&done| if done { g.blank() } else { g.connector() })
                    .collect();
                s.push_str(g.branch);
                s.push_str(g.branch_gap);
                s
            }
        };

        let link_type = link.map(|l| self.graph.link_type(l)).unwrap_or("");
        let type_prefix = if link_type.is_empty() {
            String::new()
        } else {
            format!("[{link_type}] ")
        };
        let prefix_width = type_prefix.chars().count();

        let title = node_title(node, &self.options.title);
        let node_lines = match self.options.wrap_width {
            0 => vec![title],
            width => {
                let available = width
                    .saturating_sub(depth * (g.indent + 1))
                    .saturating_sub(prefix_width);
                wrap_words(&title, available)
            }
        };
        let node_text = format!("{type_prefix}{}", node_lines.join("\n"));
        let continuation_part =
            format!("{}{}", g.connector().repeat(depth), " ".repeat(prefix_width));

        Ok(TreeRow {
            id: node.index,
            tree_part,
            continuation_part,
            node_text,
            predicates: self.predicates(node),
            params: self.params(node),
            stats: ExecutionStats::from_raw(
                node.execution_stats.as_ref(),
                self.options.strict_stats,
            )?,
        })
    }

    fn predicates(&self, node: &PlanNode) -> Vec<String> {
        node.child_links
            .iter()
            .filter(|l| self.graph.is_predicate(l))
            .map(|l| format!("{}: {}", l.link_type, self.graph.child(Some(l)).description()))
            .collect()
    }

    fn params(&self, node: &PlanNode) -> BTreeMap<String, Vec<String>> {
        let mut params: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for link in &node.child_links {
            let child = self.graph.child(Some(link));
            if child.kind != PlanNodeKind::Scalar
                || link.link_type.is_empty()
                || self.graph.is_predicate(link)
            {
                continue;
            }
            let item = match link.variable() {
                Some(var) => format!("${var}:={}", child.description()),
                None => child.description().to_string(),
            };
            params.entry(link.link_type.clone()).or_default().push(item);
        }
        params
    }
}
