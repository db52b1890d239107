//! DOT and Mermaid output plus lint findings over decoded fixtures.


use std::collections::HashMap;

use planviz_core::config::{MermaidConfig, RenderOptions, SectionSwitches};
use planviz_render::{
    build_diagram, lint_plan, render_dot, render_lint, render_mermaid, render_table_usage,
    table_usage, Diagram, EdgeStyle, JoinPoint,
};
use pretty_assertions::assert_eq;

use plan_fixtures::{load, APPLY_PLAN, SELF_JOIN_PLAN, SINGERS_RESULT_SET};

fn diagram(src: &str, opts: &RenderOptions) -> Diagram {
    let plan = load(src);
    build_diagram(
        &plan.graph,
        opts,
        plan.row_type.as_ref(),
        plan.query_stats.as_ref(),
    )
    .unwrap()
}

fn edge_lines(text: &str, marker: &str) -> Vec<String> {
    text.lines()
        .filter(|l| l.contains(marker))
        .map(str::to_string)
        .collect()
}

#[test]
fn diagram_follows_visible_links() {
    let d = diagram(SINGERS_RESULT_SET, &RenderOptions::default());
    let names: Vec<&str> = d.nodes().iter().map(|n| n.name.as_str()).collect();
    assert_eq!(names, vec!["node0", "node1", "node2", "node3", "node4"]);

    let styles: Vec<(usize, usize, EdgeStyle)> = d
        .edges()
        .iter()
        .map(|(p, e)| (p.index, e.child.index, e.style))
        .collect();
    assert_eq!(
        styles,
        vec![
            (0, 1, EdgeStyle::Dashed),
            (1, 2, EdgeStyle::Solid),
            (2, 3, EdgeStyle::Solid),
            (3, 4, EdgeStyle::Solid),
        ]
    );
    assert!(d.query.is_none());
}

#[test]
fn dot_edges_point_from_child_to_parent() {
    let text = render_dot(&diagram(APPLY_PLAN, &RenderOptions::default()));
    assert!(text.starts_with("digraph {\n  rankdir=BT\n  node [shape=box]\n"));
    assert!(text.ends_with("}\n"));
    assert_eq!(
        edge_lines(&text, " -> "),
        vec![
            "  node1 -> node0",
            "  node2 -> node1 [label=\"Input\"]",
            "  node4 -> node1 [label=\"Map\"]",
            "  node5 -> node4",
            "  node6 -> node4 [label=\"Scalar\"]",
        ]
    );
    assert!(text.contains("  node6 [label=<<b>Array Subquery</b><br align=\"CENTER\"/>ARRAY(SELECT 1)<br align=\"left\" />>, tooltip=\""));
}

#[test]
fn dot_query_node_with_stats() {
    let opts = RenderOptions {
        show_query_stats: true,
        ..Default::default()
    };
    let text = render_dot(&diagram(SINGERS_RESULT_SET, &opts));
    assert!(text.ends_with(concat!(
        "  query [label=<<b>SELECT SingerId, FirstName FROM Singers WHERE FirstName = \"Alice\"<br align=\"left\" /></b>",
        "<i>elapsed_time: 1.2 msecs<br align=\"left\" />rows_returned: 1<br align=\"left\" /></i>>, shape=box, style=rounded]\n",
        "  node0 -> query\n",
        "}\n",
    )));
    assert!(text.contains("  node1 -> node0 [style=dashed]\n"));
}

#[test]
fn query_text_alone_without_stats() {
    let opts = RenderOptions {
        show_query: true,
        ..Default::default()
    };
    let d = diagram(SINGERS_RESULT_SET, &opts);
    let query = d.query.as_ref().unwrap();
    assert!(query.stats.is_empty());

    let bare = diagram(APPLY_PLAN, &opts);
    assert!(bare.query.is_none());
}

#[test]
fn mermaid_flowchart_for_result_set() {
    let opts = RenderOptions {
        show_query_stats: true,
        ..Default::default()
    };
    let text = render_mermaid(&diagram(SINGERS_RESULT_SET, &opts), &MermaidConfig::default());

    let mut lines = text.lines();
    assert!(lines.next().unwrap().starts_with("%%{ init: {"));
    assert_eq!(lines.next(), Some("graph TD"));

    let query_line = lines.next().unwrap();
    assert!(query_line.starts_with("    query[\"<b>SELECT&nbsp;SingerId,&nbsp;FirstName"));
    assert!(query_line.contains("&quot;Alice&quot;"));

    assert!(text.ends_with(concat!(
        "    query --> node0\n",
        "    node0 -.-> node1\n",
        "    node1 --> node2\n",
        "    node2 --> node3\n",
        "    node3 --> node4\n",
    )));
}

#[test]
fn mermaid_edges_carry_link_types() {
    let text = render_mermaid(
        &diagram(APPLY_PLAN, &RenderOptions::default()),
        &MermaidConfig::default(),
    );
    assert_eq!(
        edge_lines(&text, "--"),
        vec![
            "    node0 --> node1",
            "    node1 -->|Input| node2",
            "    node1 -->|Map| node4",
            "    node4 --> node5",
            "    node4 -->|Scalar| node6",
        ]
    );
    assert!(text.contains("    node2[\"<b>Index&nbsp;Scan</b>\nIndex\\:&nbsp;AlbumsByTitle\"]\n"));
}

#[test]
fn full_sections_do_not_change_the_shape() {
    let plain = diagram(SINGERS_RESULT_SET, &RenderOptions::default());
    let full = diagram(
        SINGERS_RESULT_SET,
        &RenderOptions {
            sections: SectionSwitches::full(),
            ..Default::default()
        },
    );
    let shape = |d: &Diagram| -> Vec<(usize, usize)> {
        d.edges()
            .iter()
            .map(|(p, e)| (p.index, e.child.index))
            .collect()
    };
    assert_eq!(shape(&plain), shape(&full));
    assert_ne!(render_dot(&plain), render_dot(&full));
}

#[test]
fn lint_report_for_apply_plan() {
    let plan = load(APPLY_PLAN);
    assert_eq!(
        render_lint(&lint_plan(&plan.graph)),
        concat!(
            "0: Sort\n",
            "    Expensive operator Sort: Can't you create the same ordered index? : AlbumId DESC\n",
            "2: Index Scan (Full scan: true, Index: AlbumsByTitle)\n",
            "    Expensive execution full scan: Do you really want full scan?\n",
            "4: Filter\n",
            "    Expensive operator Filter can't utilize index: Can't you use Filter Scan with Seek Condition?\n",
        )
    );
}

#[test]
fn lint_findings_for_result_set() {
    let plan = load(SINGERS_RESULT_SET);
    let findings = lint_plan(&plan.graph);
    let indexes: Vec<usize> = findings.iter().map(|f| f.index).collect();
    assert_eq!(indexes, vec![3, 4]);
    assert_eq!(
        findings[0].messages,
        vec!["Residual Condition: Expensive Residual Condition: Try to translate it to Scan Condition"]
    );
    assert_eq!(
        findings[1].title,
        "Table Scan (Full scan: true, Table: Singers, execution_method: Row)"
    );
}

#[test]
fn self_join_scans_meet_at_the_hash_join() {
    let plan = load(SELF_JOIN_PLAN);
    let usages = table_usage(&plan.graph, &HashMap::new());
    assert_eq!(usages.len(), 1);
    assert_eq!(usages[0].join, JoinPoint::At(0));
    assert_eq!(
        format!(
            "{}{}",
            render_table_usage(&usages),
            render_lint(&lint_plan(&plan.graph))
        ),
        concat!(
            "Table Usages\n",
            "  Singers [2:Table Scan(Singers), 4:Table Scan(Singers)]\n",
            "    Joined at 0?\n",
            "0: Hash Join\n",
            "    Expensive execution Hash Join: Can't you modify to use Cross Apply or Merge Join?\n",
            "4: Table Scan (Full scan: true, Table: Singers)\n",
            "    Expensive execution full scan: Do you really want full scan?\n",
        )
    );
}

#[test]
fn index_scan_usage_needs_a_table_mapping() {
    let plan = load(APPLY_PLAN);
    let bare = render_table_usage(&table_usage(&plan.graph, &HashMap::new()));
    assert_eq!(bare, "Table Usages\n  Songs [5:Table Scan(Songs)]\n");

    let mapped: HashMap<String, String> = [("AlbumsByTitle".to_string(), "Albums".to_string())].into();
    assert_eq!(
        render_table_usage(&table_usage(&plan.graph, &mapped)),
        concat!(
            "Table Usages\n",
            "  Albums [2:Index Scan(AlbumsByTitle)]\n",
            "  Songs [5:Table Scan(Songs)]\n",
        )
    );
}
