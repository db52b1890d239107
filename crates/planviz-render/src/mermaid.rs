//! Mermaid flowchart writer.
//!
//! Node declarations come first in pre-order, then every edge in visit
//! order. Labels go through `MermaidLabel`, so they never contain a raw `"`.

use serde_json::json;

use planviz_core::config::MermaidConfig;

use crate::diagram::{Diagram, EdgeStyle, QUERY_NODE_NAME};
use crate::escape::{escape_mermaid, LabelDialect, MermaidLabel};

/// `%%{ init: {...} }%%` directive for `config`.
pub fn init_directive(config: &MermaidConfig) -> String {
    let init = json!({
        "theme": config.theme,
        "themeVariables": {"wrap": false},
        "flowchart": {
            "curve": config.curve,
            "markdownAutoWrap": config.markdown_auto_wrap,
            "wrappingWidth": config.wrapping_width,
        },
    });
    format!("%%{{ init: {init} }}%%")
}

fn arrow(style: EdgeStyle) -> &'static str {
    match style {
        EdgeStyle::Solid => "-->",
        EdgeStyle::Dashed => "-.->",
    }
}

pub fn render_mermaid(diagram: &Diagram, config: &MermaidConfig) -> String {
    let mut out = String::new();
    out.push_str(&init_directive(config));
    out.push('\n');
    out.push_str("graph TD\n");

    if let Some(query) = &diagram.query {
        let mut parts = vec![format!("<b>{}</b>", escape_mermaid(&query.text))];
        parts.extend(query.stats.iter().map(|s| format!("<i>{}</i>", escape_mermaid(s))));
        out.push_str(&format!("    {QUERY_NODE_NAME}[\"{}\"]\n", parts.join("\n")));
        out.push_str(&format!("    style {QUERY_NODE_NAME} text-align:left;\n"));
    }

    for node in diagram.nodes() {
        out.push_str(&format!("    {}[\"{}\"]\n", node.name, MermaidLabel.render(&node.content)));
        out.push_str(&format!("    style {} text-align:left;\n", node.name));
    }

    if diagram.query.is_some() {
        out.push_str(&format!("    {QUERY_NODE_NAME} --> {}\n", diagram.root.name));
    }

    for (parent, edge) in diagram.edges() {
        let label = if edge.link_type.is_empty() {
            String::new()
        } else {
            format!("|{}|", escape_mermaid(&edge.link_type))
        };
        out.push_str(&format!(
            "    {} {}{} {}\n",
            parent.name,
            arrow(edge.style),
            label,
            edge.child.name
        ));
    }

    out
}
