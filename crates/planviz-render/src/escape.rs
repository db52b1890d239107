//! Label dialects: where `LabelContent` meets a target's markup rules.
//!
//! Content is escaped exactly once, here, after it is fully assembled.

use crate::label::LabelContent;

/// Graphviz HTML-label line break that left-aligns the preceding line.
pub const LEFT_BREAK: &str = r#"<br align="left" />"#;

const CENTER_BREAK: &str = r#"<br align="CENTER"/>"#;

/// Renders one node's label content for a specific output target.
pub trait LabelDialect {
    fn render(&self, content: &LabelContent) -> String;
}

/// HTML-escaped lines, each terminated with a left-aligning break.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainText;

/// Graphviz HTML-like label body (without the surrounding `<` `>`).
#[derive(Debug, Clone, Copy, Default)]
pub struct GraphvizHtml;

/// Mermaid node label text.
#[derive(Debug, Clone, Copy, Default)]
pub struct MermaidLabel;

impl LabelDialect for PlainText {
    fn render(&self, content: &LabelContent) -> String {
        let mut lines = vec![content.title.clone()];
        lines.extend(content.body_lines());
        lines.extend(content.stats_lines());
        left_aligned(&lines.join("\n"))
    }
}

impl LabelDialect for GraphvizHtml {
    fn render(&self, content: &LabelContent) -> String {
        let title = format!("<b>{}</b>", escape_html(&content.title));
        let body = content.body_lines();
        let stats = content.stats_lines();
        if body.is_empty() && stats.is_empty() {
            return title;
        }

        let mut out = title;
        out.push_str(CENTER_BREAK);
        out.push_str(&left_aligned(&body.join("\n")));
        if !stats.is_empty() {
            out.push_str("<i>");
            out.push_str(&left_aligned(&stats.join("\n")));
            out.push_str("</i>");
        }
        out
    }
}

impl LabelDialect for MermaidLabel {
    fn render(&self, content: &LabelContent) -> String {
        let mut parts = vec![format!("<b>{}</b>", escape_mermaid(&content.title))];

        let plain = |parts: &mut Vec<String>, lines: &[String]| {
            parts.extend(lines.iter().map(|l| escape_mermaid(l)));
        };

        if !content.short_representation.is_empty() {
            parts.push(escape_mermaid(&content.short_representation));
        }
        if let Some(info) = &content.scan_info {
            parts.push(escape_mermaid(info));
        }
        plain(&mut parts, &content.serialize_result);
        plain(&mut parts, &content.non_variable_scalars);
        parts.extend(
            content
                .metadata
                .iter()
                .map(|(k, v)| format!("{}: {}", escape_mermaid(k), escape_mermaid(v))),
        );
        plain(&mut parts, &content.variable_scalars);
        parts.extend(
            content
                .stats
                .iter()
                .map(|(k, v)| format!("<i>{}: {}</i>", escape_mermaid(k), escape_mermaid(v))),
        );

        let summary = content.summary_lines();
        if !summary.is_empty() {
            let lines: Vec<String> = summary.iter().map(|l| escape_mermaid(l)).collect();
            parts.push(format!("<i>{}</i>", lines.join("\n")));
        }

        parts.join("\n")
    }
}

/// Escape `&`, `<` and `>` for HTML-like text.
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

/// Escape each line and terminate it with a left-aligning break.
///
/// Empty text stays empty.
pub fn left_aligned(text: &str) -> String {
    text.lines()
        .map(|line| format!("{}{LEFT_BREAK}", escape_html(line)))
        .collect()
}

/// Escape text for a Mermaid markdown label.
///
/// Markdown punctuation gets a backslash; `& < > "` become entities and
/// spaces become `&nbsp;` so Mermaid neither wraps nor collapses them.
pub fn escape_mermaid(s: &str) -> String {
    let mut out = String::with_capacity(s.len() * 2);
    for c in s.chars() {
        match c {
            '\\' | '`' | '*' | '_' | '{' | '}' | '[' | ']' | '(' | ')' | '#' | '+' | '-' | '.'
            | '!' | '|' | ':' | '~' => {
                out.push('\\');
                out.push(c);
            }
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            ' ' => out.push_str("&nbsp;"),
            _ => out.push(c),
        }
    }
    out
}
