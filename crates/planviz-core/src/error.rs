use thiserror::Error;

/// Canonical result for planviz.
pub type Result<T> = std::result::Result<T, Error>;

/// Longest input prefix quoted back in an `InputFormat` error.
pub const INPUT_SNIPPET_LEN: usize = 140;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid input: {reason}\ninput: {snippet}")]
    InputFormat { reason: String, snippet: String },

    #[error("cannot construct plan graph: {0}")]
    GraphConstruction(String),

    #[error("node {parent} links to child index {child}, but the plan has {len} nodes")]
    Reference {
        parent: usize,
        child: usize,
        len: usize,
    },

    #[error("invalid timestamp {value:?}: {reason}")]
    TimestampFormat { value: String, reason: String },

    #[error("unknown execution stats field: {path}")]
    UnknownStatsField { path: String },

    #[error("cannot encode {what}: {reason}")]
    Encode { what: &'static str, reason: String },
}

impl Error {
    /// Build an `InputFormat` error quoting the (trimmed, truncated) input.
    pub fn input_format(reason: impl Into<String>, input: &str) -> Self {
        Error::InputFormat {
            reason: reason.into(),
            snippet: snippet(input),
        }
    }
}

fn snippet(input: &str) -> String {
    let trimmed = input.trim();
    if trimmed.chars().count() <= INPUT_SNIPPET_LEN {
        return trimmed.to_string();
    }
    let mut s: String = trimmed.chars().take(INPUT_SNIPPET_LEN).collect();
    s.push_str("(collapsed)");
    s
}
