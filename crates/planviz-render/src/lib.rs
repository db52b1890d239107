#![forbid(unsafe_code)]
//! planviz-render: turns a `PlanGraph` into text trees, labels and diagrams.
//!
//! Design:
//! - `title` formats one node's metadata into its one-line title.
//! - `tree` projects the graph into pre-order `TreeRow`s (ASCII tree prefixes,
//!   wrapping, predicate and parameter annotations); `table` lays them out.
//! - `label` builds the target-neutral `LabelContent` per node; `escape`
//!   renders it for plain text, Graphviz HTML labels or Mermaid.
//! - `diagram` builds the rooted node/edge tree and writes DOT; `mermaid`
//!   writes Mermaid flowchart text from the same tree.
//! - `lint` is a thin advisory consumer of the graph API.
//!
//! Everything is synchronous and allocation-only; the graph is never mutated.

pub mod diagram;
pub mod escape;
pub mod label;
pub mod lint;
pub mod mermaid;
pub mod table;
pub mod title;
pub mod tree;
pub mod wrap;

pub use diagram::{build_diagram, render_dot, Diagram, DiagramEdge, DiagramNode, EdgeStyle};
pub use escape::{GraphvizHtml, LabelDialect, MermaidLabel, PlainText};
pub use label::{LabelContent, LabelContentBuilder};
pub use lint::{
    lint_plan, render_lint, render_table_usage, table_usage, JoinPoint, LintFinding, TableScan,
    TableUsage,
};
pub use mermaid::render_mermaid;
pub use table::{render_table, TableMode};
pub use title::node_title;
pub use tree::{TreeProjector, TreeRow};
