#![forbid(unsafe_code)]
//! affinity-graph library.
//!
//! Turns relation matrices into petgraph graphs and ranks their nodes by
//! degree centrality.
//!
//! # Conventions
//!
//! - **Errors**: `thiserror` enums for library failures ([`graph::BuildError`]).
//! - **Logging**: Use `tracing` macros (`info!`, `warn!`, `error!`, `debug!`, `trace!`).

pub mod analysis;
pub mod graph;
pub mod metrics;

pub use analysis::{Analysis, GraphKind, GraphReport, analyze};
pub use graph::{GraphMode, Partition, RelationGraph};
pub use metrics::degree::{CentralityOutcome, NodeCentrality};
