//! Degree centrality and top-node selection.
//!
//! `centrality(v) = degree(v) / (n - 1)` for a graph of `n >= 2` nodes. In a
//! simple graph the degree is at most `n - 1`, so every score lies in
//! `[0, 1]`.
//!
//! Graphs with fewer than two nodes have no meaningful ranking and yield
//! [`CentralityOutcome::Degenerate`]; callers must handle both variants.

use serde::Serialize;
use tracing::debug;

use crate::graph::{Partition, RelationGraph};

/// Degree and normalized centrality of one node.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeCentrality {
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partition: Option<Partition>,
    pub degree: usize,
    pub centrality: f64,
}

/// Result of ranking a graph by degree centrality.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CentralityOutcome {
    /// `scores` is sorted by centrality, highest first; equal scores keep
    /// node insertion order. `top` is `scores[0]`.
    Ranked {
        top: NodeCentrality,
        scores: Vec<NodeCentrality>,
    },
    /// Fewer than two nodes: no central node.
    Degenerate { node_count: usize },
}

impl CentralityOutcome {
    #[must_use]
    pub const fn top(&self) -> Option<&NodeCentrality> {
        match self {
            Self::Ranked { top, .. } => Some(top),
            Self::Degenerate { .. } => None,
        }
    }

    #[must_use]
    pub const fn is_degenerate(&self) -> bool {
        matches!(self, Self::Degenerate { .. })
    }
}

/// Degree centrality for every node, in node insertion order.
///
/// Nodes of a singleton graph score 0; an empty graph yields an empty vec.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn degree_centrality(graph: &RelationGraph) -> Vec<NodeCentrality> {
    let n = graph.node_count();
    let denominator = n.saturating_sub(1);

    graph
        .graph
        .node_indices()
        .map(|idx| {
            let node = &graph.graph[idx];
            let degree = graph.degree(idx);
            let centrality = if denominator == 0 {
                0.0
            } else {
                degree as f64 / denominator as f64
            };
            NodeCentrality {
                label: node.label.clone(),
                partition: node.partition,
                degree,
                centrality,
            }
        })
        .collect()
}

/// Rank nodes by degree centrality and pick the top node.
///
/// Ties resolve to the node inserted first.
#[must_use]
pub fn rank(graph: &RelationGraph) -> CentralityOutcome {
    let node_count = graph.node_count();
    if node_count < 2 {
        debug!(node_count, "graph too small for centrality ranking");
        return CentralityOutcome::Degenerate { node_count };
    }

    let mut scores = degree_centrality(graph);
    // Stable sort keeps insertion order among equal scores.
    scores.sort_by(|a, b| b.centrality.total_cmp(&a.centrality));

    match scores.first().cloned() {
        Some(top) => CentralityOutcome::Ranked { top, scores },
        None => CentralityOutcome::Degenerate { node_count },
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
