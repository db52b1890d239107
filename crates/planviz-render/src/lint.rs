//! Rule-based advisories over the plan graph.
//!
//! Findings come out in node index order. Key orders are printed with
//! `$variable` references resolved through the plan's variable bindings.
//! The table usage report groups scans by table and names the operator
//! where two scans of the same table meet.

use std::collections::{BTreeMap, HashMap};

use tracing::debug;

use planviz_core::config::TitleOptions;
use planviz_core::graph::PlanGraph;
use planviz_core::plan::PlanNode;

use crate::title::{is_true, node_title};

/// Advisories for one node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LintFinding {
    pub index: usize,
    pub title: String,
    pub messages: Vec<String>,
}

/// Variable name → the node bound to it. Later bindings win.
struct Bindings<'a> {
    graph: &'a PlanGraph,
    vars: HashMap<&'a str, usize>,
}

impl<'a> Bindings<'a> {
    fn new(graph: &'a PlanGraph) -> Self {
        let mut vars = HashMap::new();
        for node in graph.nodes() {
            for link in &node.child_links {
                if let Some(var) = link.variable() {
                    vars.insert(var, link.child_index);
                }
            }
        }
        Self { graph, vars }
    }

    fn lookup(&self, reference: &'a str) -> &'a str {
        let mut current = reference;
        let mut seen: Vec<&str> = Vec::new();
        while let Some(name) = current.strip_prefix('$') {
            if seen.contains(&name) {
                break;
            }
            let Some(node) = self.vars.get(name).and_then(|&i| self.graph.node(i)) else {
                break;
            };
            seen.push(name);
            current = node.description();
        }
        current
    }

    /// `$v (DESC)` → `<resolved v> DESC`.
    fn key_elem(&self, desc: &'a str) -> String {
        match desc.split_once(' ') {
            None => self.lookup(desc).to_string(),
            Some((first, rest)) => {
                let rest = rest.strip_prefix('(').unwrap_or(rest);
                let rest = rest.strip_suffix(')').unwrap_or(rest);
                format!("{} {rest}", self.lookup(first))
            }
        }
    }

    fn keys(&self, node: &PlanNode, link_type: &str) -> Vec<String> {
        node.child_links
            .iter()
            .filter(|l| l.link_type == link_type)
            .filter_map(|l| self.graph.node(l.child_index))
            .map(|child| self.key_elem(child.description()))
            .collect()
    }
}

fn operator_message(b: &Bindings<'_>, node: &PlanNode) -> Option<String> {
    let name = node.display_name.as_str();
    if name == "Filter" {
        return Some(
            "Expensive operator Filter can't utilize index: Can't you use Filter Scan with Seek Condition?"
                .to_string(),
        );
    }
    if name.contains("Hash") {
        return Some(format!(
            "Expensive execution {name}: Can't you modify to use Cross Apply or Merge Join?"
        ));
    }
    if name.contains("Minor Sort") {
        let mut order = b.keys(node, "MajorKey");
        order.extend(b.keys(node, "MinorKey"));
        return Some(format!(
            "Expensive operator Minor Sort is cheaper than Sort but it may be not optimal: Can't you create the same ordered index? Order: {}",
            order.join(", ")
        ));
    }
    if name.contains("Sort") {
        return Some(format!(
            "Expensive operator Sort: Can't you create the same ordered index? : {}",
            b.keys(node, "Key").join(", ")
        ));
    }
    None
}

fn node_messages(b: &Bindings<'_>, node: &PlanNode) -> Vec<String> {
    let mut msgs: Vec<String> = operator_message(b, node).into_iter().collect();

    for link in &node.child_links {
        if link.link_type == "Residual Condition" {
            msgs.push(format!(
                "{}: Expensive Residual Condition: Try to translate it to Scan Condition",
                link.link_type
            ));
        }
    }

    for (key, value) in node.metadata.iter() {
        match key {
            "Full scan" if is_true(value) => {
                msgs.push("Expensive execution full scan: Do you really want full scan?".to_string());
            }
            "iterator_type" if value.as_str() == Some("Hash") => {
                let name = &node.display_name;
                msgs.push(format!(
                    "Expensive execution Hash {name}: Can't you modify to use Stream {name}? Key: {}",
                    b.keys(node, "Key").join(", ")
                ));
            }
            _ => {}
        }
    }
    msgs
}

/// Every node that draws at least one advisory.
pub fn lint_plan(graph: &PlanGraph) -> Vec<LintFinding> {
    let bindings = Bindings::new(graph);
    let title_opts = TitleOptions::default();
    graph
        .nodes()
        .iter()
        .filter_map(|node| {
            let messages = node_messages(&bindings, node);
            if messages.is_empty() {
                return None;
            }
            Some(LintFinding {
                index: node.index,
                title: node_title(node, &title_opts),
                messages,
            })
        })
        .collect()
}

pub fn render_lint(findings: &[LintFinding]) -> String {
    let mut out = String::new();
    for f in findings {
        out.push_str(&format!("{}: {}\n", f.index, f.title));
        for msg in &f.messages {
            out.push_str(&format!("    {msg}\n"));
        }
    }
    out
}

/// One `Scan` node reading a table, directly or through an index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableScan {
    pub index: usize,
    /// `TableScan` or `IndexScan`.
    pub scan_type: String,
    pub scan_target: String,
}

impl TableScan {
    /// `4:Table Scan(Singers)`
    pub fn describe(&self) -> String {
        let kind = self.scan_type.strip_suffix("Scan").unwrap_or(&self.scan_type);
        format!("{}:{kind} Scan({})", self.index, self.scan_target)
    }
}

/// Where the scans of one table meet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinPoint {
    Single,
    /// Deepest operator above both scans.
    At(usize),
    /// Two scans with no common ancestor.
    Unrelated,
    TooMany,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableUsage {
    pub table: String,
    pub scans: Vec<TableScan>,
    pub join: JoinPoint,
}

/// Index and parent chain from the root down to `index`.
fn root_path(graph: &PlanGraph, index: usize) -> Vec<usize> {
    let mut path = vec![index];
    let mut current = index;
    while let Some(parent) = graph.parent_of(current) {
        if path.contains(&parent.index) {
            break;
        }
        path.push(parent.index);
        current = parent.index;
    }
    path.reverse();
    path
}

fn lowest_common_ancestor(graph: &PlanGraph, a: usize, b: usize) -> Option<usize> {
    root_path(graph, a)
        .into_iter()
        .zip(root_path(graph, b))
        .take_while(|(x, y)| x == y)
        .last()
        .map(|(x, _)| x)
}

/// Group `Scan` nodes by the table they read, tables in name order.
///
/// Table scans key on `scan_target`. Index scans join the group of the
/// table `index_tables` maps their index to, and are skipped otherwise.
pub fn table_usage(graph: &PlanGraph, index_tables: &HashMap<String, String>) -> Vec<TableUsage> {
    let mut by_table: BTreeMap<String, Vec<TableScan>> = BTreeMap::new();
    for node in graph.nodes() {
        if node.display_name != "Scan" {
            continue;
        }
        let scan_type = node.metadata.get_str("scan_type");
        let scan_target = node.metadata.get_str("scan_target");
        let table = match scan_type {
            "TableScan" => scan_target.to_string(),
            "IndexScan" => match index_tables.get(scan_target) {
                Some(table) => table.clone(),
                None => {
                    debug!(index = scan_target, node = node.index, "index scan without a table mapping");
                    continue;
                }
            },
            _ => continue,
        };
        by_table.entry(table).or_default().push(TableScan {
            index: node.index,
            scan_type: scan_type.to_string(),
            scan_target: scan_target.to_string(),
        });
    }

    by_table
        .into_iter()
        .map(|(table, scans)| {
            let join = match scans.as_slice() {
                [_] => JoinPoint::Single,
                [first, second] => lowest_common_ancestor(graph, first.index, second.index)
                    .map_or(JoinPoint::Unrelated, JoinPoint::At),
                _ => JoinPoint::TooMany,
            };
            TableUsage { table, scans, join }
        })
        .collect()
}

/// `Table Usages` section; empty when the plan scans nothing.
pub fn render_table_usage(usages: &[TableUsage]) -> String {
    if usages.is_empty() {
        return String::new();
    }
    let mut out = String::from("Table Usages\n");
    for usage in usages {
        let scans: Vec<String> = usage.scans.iter().map(TableScan::describe).collect();
        out.push_str(&format!("  {} [{}]\n", usage.table, scans.join(", ")));
        match usage.join {
            JoinPoint::At(index) => out.push_str(&format!("    Joined at {index}?\n")),
            JoinPoint::TooMany => out.push_str("    Too many appearances to analyze joins\n"),
            JoinPoint::Single | JoinPoint::Unrelated => {}
        }
    }
    out
}
