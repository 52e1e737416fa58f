//! Relation graphs built from labeled matrices.
//!
//! # Pipeline
//!
//! ```text
//! incidence matrix ──build(Bipartite)──────────▶ incidence graph
//! similarity matrix ─build(UnipartiteWeighted)─▶ similarity graph
//! co-occurrence ─────build(UnipartiteWeighted)─▶ co-occurrence graph
//! ```
//!
//! All three variants go through [`RelationGraph::build`]; only the
//! [`GraphMode`] differs.
//!
//! ## Determinism
//!
//! [`RelationGraph::content_hash`] is a BLAKE3 hash of the sorted edge list.
//! Two runs over the same matrix produce the same hash.

pub mod build;

pub use build::{BuildError, GraphEdge, GraphMode, GraphNode, Partition, RelationGraph};
