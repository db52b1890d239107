#![forbid(unsafe_code)]
//! planviz-core: decoded plan model, the plan graph, render options and errors.
//!
//! Design:
//! - `plan` holds the wire-shaped data (`PlanNode`, `ChildLink`, metadata and
//!   raw stats maps) exactly as the decoder hands it over.
//! - `graph` wraps the node array in an immutable `PlanGraph` and implements
//!   link classification (predicate / function call / visible) and relabeling.
//! - `stats` turns the raw stats map into a typed snapshot (strict or lenient).
//! - `config` carries every render switch as plain values.
//!
//! No I/O and no rendering here; `planviz-render` consumes these types.

pub mod config;
pub mod error;
pub mod graph;
pub mod plan;
pub mod prelude;
pub mod schema;
pub mod stats;

/// Crate version, reported by the CLI.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
