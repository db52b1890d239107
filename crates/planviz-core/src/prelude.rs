//! Convenient re-exports for downstream crates.

pub use crate::config::{
    ExecutionMethodFormat, KnownFlagFormat, MermaidConfig, PlanvizConfig, RenderOptions,
    SectionSwitches, TargetMetadataFormat, TitleOptions,
};
pub use crate::error::{Error, Result};
pub use crate::graph::{ChildLinkEntry, ChildLinkGroup, PlanGraph, ResolvedChildLink};
pub use crate::plan::{ChildLink, Metadata, PlanNode, PlanNodeKind, ShortRepresentation, StatsMap};
pub use crate::schema::{QueryStats, RowField, RowType};
pub use crate::stats::{ExecutionStats, ExecutionSummary, StatsValue};
