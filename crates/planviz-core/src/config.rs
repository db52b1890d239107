//! Render options that downstream crates thread through every render call.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// How `execution_method` metadata shows up in a node title.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMethodFormat {
    /// Ordinary `execution_method: Row` field.
    #[default]
    Raw,
    /// `<Row>` right after the operator phrase.
    Angle,
}

/// How the scan target (`scan_target` / `distribution_table`) shows up in a node title.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetMetadataFormat {
    /// Ordinary fields; the scan target reads `<scan type>: <target>`.
    #[default]
    Raw,
    /// `on <target>` appended to the operator phrase.
    On,
}

/// How boolean flags such as `Full scan` show up in a node title.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KnownFlagFormat {
    #[default]
    Raw,
    /// Bare label when true, omitted when false.
    Label,
}

macro_rules! text_enum {
    ($ty:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl FromStr for $ty {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_ascii_lowercase().as_str() {
                    $($text => Ok($ty::$variant),)+
                    other => Err(format!(
                        "unknown {} {:?} (expected one of: {})",
                        stringify!($ty),
                        other,
                        [$($text),+].join(", ")
                    )),
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(match self {
                    $($ty::$variant => $text,)+
                })
            }
        }
    };
}

text_enum!(ExecutionMethodFormat { Raw => "raw", Angle => "angle" });
text_enum!(TargetMetadataFormat { Raw => "raw", On => "on" });
text_enum!(KnownFlagFormat { Raw => "raw", Label => "label" });

/// Switches consumed by the node title formatter.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TitleOptions {
    pub execution_method: ExecutionMethodFormat,
    pub target_metadata: TargetMetadataFormat,
    pub known_flag: KnownFlagFormat,
    pub compact: bool,
    /// Drop the parenthesized metadata suffix; diagram labels list metadata separately.
    pub hide_metadata: bool,
}

/// Optional label sections of the diagram outputs.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SectionSwitches {
    pub non_variable_scalar: bool,
    pub variable_scalar: bool,
    pub metadata: bool,
    pub execution_stats: bool,
    pub execution_summary: bool,
    pub serialize_result: bool,
}

impl SectionSwitches {
    /// Everything on.
    pub fn full() -> Self {
        let mut s = Self::default();
        s.apply_full();
        s
    }

    pub fn apply_full(&mut self) {
        self.non_variable_scalar = true;
        self.variable_scalar = true;
        self.metadata = true;
        self.execution_stats = true;
        self.execution_summary = true;
        self.serialize_result = true;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderOptions {
    pub title: TitleOptions,

    /// Tree text wrap width; 0 disables wrapping.
    pub wrap_width: usize,

    /// Omit the `<scan type>: <target>` line from diagram labels.
    pub hide_scan_target: bool,

    /// Metadata keys never listed in diagram labels.
    pub hide_metadata: Vec<String>,

    pub show_query: bool,
    pub show_query_stats: bool,

    pub sections: SectionSwitches,

    /// Reject unknown execution stats fields instead of ignoring them.
    pub strict_stats: bool,
}

impl RenderOptions {
    pub fn is_hidden_metadata(&self, key: &str) -> bool {
        self.hide_metadata.iter().any(|k| k == key)
    }
}

/// Settings written into the Mermaid `%%{ init: ... }%%` header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MermaidConfig {
    pub theme: Option<String>,
    pub curve: String,
    pub wrapping_width: u32,
    pub markdown_auto_wrap: bool,
}

impl Default for MermaidConfig {
    fn default() -> Self {
        Self {
            theme: None,
            curve: "linear".to_string(),
            wrapping_width: 2000,
            markdown_auto_wrap: false,
        }
    }
}

/// Process-level configuration: render options plus diagram settings.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanvizConfig {
    pub render: RenderOptions,
    pub mermaid: MermaidConfig,
}

impl PlanvizConfig {
    /// Create a config from environment variables, falling back to defaults.
    ///
    /// Environment variables:
    /// - `PLANVIZ_WRAP_WIDTH`: tree wrap width (0 = unlimited)
    /// - `PLANVIZ_COMPACT`: compact tree layout (`1`/`true`)
    /// - `PLANVIZ_STRICT_STATS`: reject unknown stats fields (`1`/`true`)
    /// - `PLANVIZ_HIDE_METADATA`: comma-separated metadata keys to hide
    /// - `PLANVIZ_MERMAID_WRAPPING_WIDTH`: Mermaid flowchart wrapping width
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as `from_env` with an explicit variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut cfg = Self::default();

        if let Some(s) = lookup("PLANVIZ_WRAP_WIDTH") {
            if let Ok(v) = s.trim().parse::<usize>() {
                cfg.render.wrap_width = v;
            }
        }

        if let Some(s) = lookup("PLANVIZ_COMPACT") {
            if let Some(v) = parse_flag(&s) {
                cfg.render.title.compact = v;
            }
        }

        if let Some(s) = lookup("PLANVIZ_STRICT_STATS") {
            if let Some(v) = parse_flag(&s) {
                cfg.render.strict_stats = v;
            }
        }

        if let Some(s) = lookup("PLANVIZ_HIDE_METADATA") {
            cfg.render.hide_metadata = s
                .split(',')
                .map(str::trim)
                .filter(|k| !k.is_empty())
                .map(str::to_string)
                .collect();
        }

        if let Some(s) = lookup("PLANVIZ_MERMAID_WRAPPING_WIDTH") {
            if let Ok(v) = s.trim().parse::<u32>() {
                cfg.mermaid.wrapping_width = v;
            }
        }

        cfg
    }
}

fn parse_flag(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
