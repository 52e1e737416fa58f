//! Node metrics over relation graphs.
//!
//! Only degree centrality is provided: the fraction of the other nodes a
//! node is directly connected to.
//!
//! ```rust,ignore
//! use affinity_graph::metrics::degree::{rank, CentralityOutcome};
//!
//! match rank(&graph) {
//!     CentralityOutcome::Ranked { top, .. } => println!("{} ({:.2})", top.label, top.centrality),
//!     CentralityOutcome::Degenerate { node_count } => println!("no central node ({node_count} nodes)"),
//! }
//! ```

pub mod degree;
