//! Column-aligned text table over projected tree rows.
//!
//! ```text
//! +----+-------------------+
//! | ID | Operator          |
//! +----+-------------------+
//! |  0 | Distributed Union |
//! | *1 | +- Scan           |
//! +----+-------------------+
//! Predicates (identified by ID):
//!  1: Residual Condition: ($a > 1)
//! ```

use std::str::FromStr;

use crate::tree::TreeRow;

/// PLAN shows the tree only; PROFILE adds per-node runtime columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TableMode {
    #[default]
    Plan,
    Profile,
}

impl FromStr for TableMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "" | "PLAN" => Ok(TableMode::Plan),
            "PROFILE" => Ok(TableMode::Profile),
            other => Err(format!("unknown mode {other:?} (expected PLAN or PROFILE)")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Align {
    Left,
    Right,
}

struct Column {
    name: &'static str,
    align: Align,
    cell: fn(&TreeRow) -> Vec<String>,
}

fn id_cell(row: &TreeRow) -> Vec<String> {
    vec![row.format_id()]
}

fn operator_cell(row: &TreeRow) -> Vec<String> {
    row.lines()
}

fn rows_cell(row: &TreeRow) -> Vec<String> {
    vec![row.stats.rows().map(|v| v.total.clone()).unwrap_or_default()]
}

fn executions_cell(row: &TreeRow) -> Vec<String> {
    vec![row.stats.summary.num_executions.clone()]
}

fn latency_cell(row: &TreeRow) -> Vec<String> {
    vec![row.stats.latency().map(|v| v.to_string()).unwrap_or_default()]
}

fn columns(mode: TableMode) -> Vec<Column> {
    let mut cols = vec![
        Column {
            name: "ID",
            align: Align::Right,
            cell: id_cell,
        },
        Column {
            name: "Operator",
            align: Align::Left,
            cell: operator_cell,
        },
    ];
    if mode == TableMode::Profile {
        cols.push(Column {
            name: "Rows",
            align: Align::Right,
            cell: rows_cell,
        });
        cols.push(Column {
            name: "Exec.",
            align: Align::Right,
            cell: executions_cell,
        });
        cols.push(Column {
            name: "Latency",
            align: Align::Right,
            cell: latency_cell,
        });
    }
    cols
}

fn width(s: &str) -> usize {
    s.chars().count()
}

fn pad(s: &str, w: usize, align: Align) -> String {
    match align {
        Align::Left => format!("{s:<w$}"),
        Align::Right => format!("{s:>w$}"),
    }
}

fn border(widths: &[usize]) -> String {
    let mut s = String::from("+");
    for w in widths {
        s.push_str(&"-".repeat(w + 2));
        s.push('+');
    }
    s
}

fn line(cells: &[String], widths: &[usize], aligns: &[Align]) -> String {
    let mut s = String::from("|");
    for ((cell, w), align) in cells.iter().zip(widths).zip(aligns) {
        s.push_str(&format!(" {} |", pad(cell, *w, *align)));
    }
    s
}

/// Draw the table followed by the predicate and parameter listings.
///
/// No table is drawn for an empty row list.
pub fn render_table(rows: &[TreeRow], mode: TableMode) -> String {
    let mut out = String::new();
    if !rows.is_empty() {
        draw_table(&mut out, rows, mode);
    }
    out.push_str(&render_predicates(rows));
    out.push_str(&render_parameters(rows));
    out
}

fn draw_table(out: &mut String, rows: &[TreeRow], mode: TableMode) {
    let cols = columns(mode);
    let cells: Vec<Vec<Vec<String>>> = rows
        .iter()
        .map(|row| cols.iter().map(|c| (c.cell)(row)).collect())
        .collect();

    let mut widths: Vec<usize> = cols.iter().map(|c| width(c.name)).collect();
    for row in &cells {
        for (w, cell) in widths.iter_mut().zip(row) {
            for l in cell {
                *w = (*w).max(width(l));
            }
        }
    }

    let header: Vec<String> = cols.iter().map(|c| c.name.to_string()).collect();
    let header_aligns = vec![Align::Left; cols.len()];
    let aligns: Vec<Align> = cols.iter().map(|c| c.align).collect();
    let rule = border(&widths);

    out.push_str(&format!("{rule}\n"));
    out.push_str(&format!("{}\n", line(&header, &widths, &header_aligns)));
    out.push_str(&format!("{rule}\n"));
    for row in &cells {
        let height = row.iter().map(Vec::len).max().unwrap_or(1);
        for i in 0..height {
            let physical: Vec<String> = row
                .iter()
                .map(|cell| cell.get(i).cloned().unwrap_or_default())
                .collect();
            out.push_str(&line(&physical, &widths, &aligns));
            out.push('\n');
        }
    }
    out.push_str(&format!("{rule}\n"));
}

fn id_width(rows: &[TreeRow]) -> usize {
    rows.iter().map(|r| r.id.to_string().len()).max().unwrap_or(0)
}

/// `Predicates (identified by ID):` listing; empty when no row has predicates.
pub fn render_predicates(rows: &[TreeRow]) -> String {
    let w = id_width(rows);
    let mut lines = Vec::new();
    for row in rows {
        for (i, predicate) in row.predicates.iter().enumerate() {
            lines.push(format!(" {} {predicate}", listing_prefix(row.id, i, w)));
        }
    }
    listing("Predicates (identified by ID):", lines)
}

/// `Node Parameters (identified by ID):` listing, one `<type>=<items>` line per link type.
pub fn render_parameters(rows: &[TreeRow]) -> String {
    let w = id_width(rows);
    let mut lines = Vec::new();
    for row in rows {
        for (i, (link_type, items)) in row.params.iter().enumerate() {
            lines.push(format!(
                " {} {link_type}={}",
                listing_prefix(row.id, i, w),
                items.join(", ")
            ));
        }
    }
    listing("Node Parameters (identified by ID):", lines)
}

fn listing_prefix(id: usize, i: usize, w: usize) -> String {
    if i == 0 {
        format!("{id:>w$}:")
    } else {
        " ".repeat(w + 1)
    }
}

fn listing(header: &str, lines: Vec<String>) -> String {
    if lines.is_empty() {
        return String::new();
    }
    let mut out = format!("{header}\n");
    for l in lines {
        out.push_str(&l);
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use planviz_core::stats::{ExecutionStats, StatsValue};
    use pretty_assertions::assert_eq;
    use std::collections::BTreeMap;

    fn row(id: usize, tree_part: &str, text: &str) -> TreeRow {
        TreeRow {
            id,
            tree_part: tree_part.to_string(),
            continuation_part: String::new(),
            node_text: text.to_string(),
            predicates: Vec::new(),
            params: BTreeMap::new(),
            stats: ExecutionStats::default(),
        }
    }

    #[test]
    fn plan_table_with_predicates() {
        let mut scan = row(12, "+- ", "Scan");
        scan.predicates = vec![
            "Seek Condition: ($a = 1)".into(),
            "Residual Condition: ($b > 2)".into(),
        ];
        let rows = vec![row(0, "", "Distributed Union"), scan];
        assert_eq!(
            render_table(&rows, TableMode::Plan),
            concat!(
                "+-----+-------------------+\n",
                "| ID  | Operator          |\n",
                "+-----+-------------------+\n",
                "|   0 | Distributed Union |\n",
                "| *12 | +- Scan           |\n",
                "+-----+-------------------+\n",
                "Predicates (identified by ID):\n",
                " 12: Seek Condition: ($a = 1)\n",
                "     Residual Condition: ($b > 2)\n",
            )
        );
    }

    #[test]
    fn wrapped_rows_show_id_once() {
        let mut wrapped = row(1, "+- ", "Local\nUnion");
        wrapped.continuation_part = "   ".into();
        let text = render_table(&[row(0, "", "Root"), wrapped], TableMode::Plan);
        assert!(text.contains("|  1 | +- Local |\n|    |    Union |\n"));
    }

    #[test]
    fn profile_columns() {
        let mut r = row(0, "", "Scan");
        r.stats.values.insert(
            "rows".into(),
            StatsValue {
                total: "42".into(),
                unit: "rows".into(),
                ..Default::default()
            },
        );
        r.stats.values.insert(
            "latency".into(),
            StatsValue {
                total: "1.5".into(),
                unit: "msecs".into(),
                ..Default::default()
            },
        );
        r.stats.summary.num_executions = "1".into();
        assert_eq!(
            render_table(&[r], TableMode::Profile),
            concat!(
                "+----+----------+------+-------+-----------+\n",
                "| ID | Operator | Rows | Exec. | Latency   |\n",
                "+----+----------+------+-------+-----------+\n",
                "|  0 | Scan     |   42 |     1 | 1.5 msecs |\n",
                "+----+----------+------+-------+-----------+\n",
            )
        );
    }

    #[test]
    fn parameters_listing_sorted_by_type() {
        let mut r = row(3, "", "Sort Limit");
        r.params.insert("Limit".into(), vec!["10".into()]);
        r.params.insert("Key".into(), vec!["$a".into(), "$b (DESC)".into()]);
        assert_eq!(
            render_parameters(&[r]),
            "Node Parameters (identified by ID):\n 3: Key=$a, $b (DESC)\n    Limit=10\n"
        );
    }

    #[test]
    fn empty_rows_render_nothing() {
        assert_eq!(render_table(&[], TableMode::Profile), "");
    }

    #[test]
    fn mode_parses_ignoring_case() {
        assert_eq!("profile".parse::<TableMode>(), Ok(TableMode::Profile));
        assert_eq!("".parse::<TableMode>(), Ok(TableMode::Plan));
        assert!("explain".parse::<TableMode>().is_err());
    }
}
