//! Greedy whitespace word wrap. Widths count chars.

/// Wrap `text` to lines of at most `width` chars where possible.
///
/// Words longer than `width` get a line of their own and are not split.
/// A `width` of 0 is treated as 1. Text without words yields one empty line.
pub fn wrap_words(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for word in text.split_whitespace() {
        let len = word.chars().count();
        if current_len > 0 && current_len + 1 + len > width {
            lines.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if current_len > 0 {
            current.push(' ');
            current_len += 1;
        }
        current.push_str(word);
        current_len += len;
    }

    if !current.is_empty() || lines.is_empty() {
        lines.push(current);
    }
    lines
}
