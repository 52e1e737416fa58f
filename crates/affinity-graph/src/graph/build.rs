//! Graph construction from labeled matrices.
//!
//! # Overview
//!
//! One builder serves every graph variant. The [`GraphMode`] decides how
//! matrix cells become nodes and edges:
//!
//! - [`GraphMode::Bipartite`]: rows become [`Partition::Subject`] nodes and
//!   columns [`Partition::Item`] nodes. An edge `(row, col)` exists iff the
//!   cell is `>= 1`. Only presence is kept; the edge has no weight.
//! - [`GraphMode::UnipartiteWeighted`]: the matrix must be square with the
//!   same labels on both axes. An edge `(u, v)`, `u != v`, exists iff the
//!   cell `(u, v)` or `(v, u)` is `> 0`. The edge weight is the larger of
//!   the two cells, so a symmetric matrix keeps its cell value and each
//!   pair yields one edge.
//!
//! ## Node order
//!
//! Nodes are inserted in matrix label order (rows, then columns in bipartite
//! mode). That order is the tie-break order for centrality ranking.

#![allow(clippy::module_name_repetitions)]

use std::collections::HashMap;
use std::fmt;

use affinity_core::LabeledMatrix;
use petgraph::graph::{EdgeIndex, NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;
use serde::Serialize;
use tracing::{debug, instrument};

/// Minimum incidence value that counts as a bipartite edge.
pub const BIPARTITE_EDGE_THRESHOLD: f64 = 1.0;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// How a matrix is turned into a graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum GraphMode {
    Bipartite,
    UnipartiteWeighted,
}

impl fmt::Display for GraphMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bipartite => f.write_str("bipartite"),
            Self::UnipartiteWeighted => f.write_str("unipartite-weighted"),
        }
    }
}

/// Side of a bipartite graph a node belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Partition {
    Subject,
    Item,
}

impl Partition {
    /// Numeric partition tag: 0 for subjects, 1 for items.
    #[must_use]
    pub const fn tag(self) -> u8 {
        match self {
            Self::Subject => 0,
            Self::Item => 1,
        }
    }
}

/// Node payload. `partition` is set only in bipartite graphs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct GraphNode {
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partition: Option<Partition>,
}

/// Borrowed view of one undirected edge.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GraphEdge<'a> {
    pub source: &'a str,
    pub target: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
}

/// Errors raised when a matrix does not fit the requested mode.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BuildError {
    #[error("unipartite graph needs a square matrix, got {rows}x{cols}")]
    NotSquare { rows: usize, cols: usize },

    #[error("unipartite graph needs identical row and column labels")]
    LabelMismatch,
}

// ---------------------------------------------------------------------------
// RelationGraph
// ---------------------------------------------------------------------------

/// An undirected simple graph derived from one relation matrix.
///
/// Edge weights are `None` in bipartite mode and `Some(value)` in
/// unipartite-weighted mode.
#[derive(Debug, Clone)]
pub struct RelationGraph {
    pub mode: GraphMode,
    pub graph: UnGraph<GraphNode, Option<f64>>,
    node_map: HashMap<(Option<Partition>, String), NodeIndex>,
    /// BLAKE3 hash of the sorted edge list.
    pub content_hash: String,
}

impl RelationGraph {
    /// Build a graph from `matrix` under `mode`.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError`] if `mode` is unipartite and the matrix is not
    /// square with matching row and column labels.
    #[instrument(skip(matrix), fields(shape = ?matrix.shape()))]
    pub fn build(matrix: &LabeledMatrix, mode: GraphMode) -> Result<Self, BuildError> {
        let built = match mode {
            GraphMode::Bipartite => Self::bipartite(matrix),
            GraphMode::UnipartiteWeighted => Self::unipartite(matrix)?,
        };
        debug!(
            nodes = built.node_count(),
            edges = built.edge_count(),
            hash = %built.content_hash,
            "graph built"
        );
        Ok(built)
    }

    fn bipartite(matrix: &LabeledMatrix) -> Self {
        let mut builder = Builder::new(GraphMode::Bipartite);
        let subjects: Vec<NodeIndex> = matrix
            .rows()
            .iter()
            .map(|label| builder.add_node(label, Some(Partition::Subject)))
            .collect();
        let items: Vec<NodeIndex> = matrix
            .cols()
            .iter()
            .map(|label| builder.add_node(label, Some(Partition::Item)))
            .collect();

        for (i, &s) in subjects.iter().enumerate() {
            for (j, &t) in items.iter().enumerate() {
                if matrix.at(i, j) >= BIPARTITE_EDGE_THRESHOLD {
                    builder.add_edge(s, t, None);
                }
            }
        }

        builder.finish()
    }

    fn unipartite(matrix: &LabeledMatrix) -> Result<Self, BuildError> {
        let (rows, cols) = matrix.shape();
        if rows != cols {
            return Err(BuildError::NotSquare { rows, cols });
        }
        if matrix.rows() != matrix.cols() {
            return Err(BuildError::LabelMismatch);
        }

        let mut builder = Builder::new(GraphMode::UnipartiteWeighted);
        let nodes: Vec<NodeIndex> = matrix
            .rows()
            .iter()
            .map(|label| builder.add_node(label, None))
            .collect();

        for i in 0..rows {
            for j in (i + 1)..cols {
                let value = matrix.at(i, j).max(matrix.at(j, i));
                if value > 0.0 {
                    builder.add_edge(nodes[i], nodes[j], Some(value));
                }
            }
        }

        Ok(builder.finish())
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Look up a node of a unipartite graph by label.
    #[must_use]
    pub fn node_index(&self, label: &str) -> Option<NodeIndex> {
        self.find(None, label)
    }

    /// Look up a subject node of a bipartite graph.
    #[must_use]
    pub fn subject_index(&self, label: &str) -> Option<NodeIndex> {
        self.find(Some(Partition::Subject), label)
    }

    /// Look up an item node of a bipartite graph.
    #[must_use]
    pub fn item_index(&self, label: &str) -> Option<NodeIndex> {
        self.find(Some(Partition::Item), label)
    }

    #[must_use]
    pub fn find(&self, partition: Option<Partition>, label: &str) -> Option<NodeIndex> {
        self.node_map.get(&(partition, label.to_string())).copied()
    }

    /// The node payload at `idx`.
    #[must_use]
    pub fn node(&self, idx: NodeIndex) -> Option<&GraphNode> {
        self.graph.node_weight(idx)
    }

    /// Nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &GraphNode> {
        self.graph.node_indices().map(|idx| &self.graph[idx])
    }

    /// Edges in insertion order.
    pub fn edges(&self) -> impl Iterator<Item = GraphEdge<'_>> {
        self.graph.edge_references().map(|edge| GraphEdge {
            source: self.graph[edge.source()].label.as_str(),
            target: self.graph[edge.target()].label.as_str(),
            weight: *edge.weight(),
        })
    }

    /// The edge between two nodes, if any.
    #[must_use]
    pub fn edge_between(&self, a: NodeIndex, b: NodeIndex) -> Option<EdgeIndex> {
        self.graph.find_edge(a, b)
    }

    /// Weight of the edge between two nodes: `Some(None)` for an unweighted
    /// edge, `None` when there is no edge.
    #[must_use]
    pub fn edge_weight(&self, a: NodeIndex, b: NodeIndex) -> Option<Option<f64>> {
        self.edge_between(a, b)
            .and_then(|e| self.graph.edge_weight(e).copied())
    }

    /// Number of edges incident to `idx`.
    #[must_use]
    pub fn degree(&self, idx: NodeIndex) -> usize {
        self.graph.edges(idx).count()
    }
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

struct Builder {
    mode: GraphMode,
    graph: UnGraph<GraphNode, Option<f64>>,
    node_map: HashMap<(Option<Partition>, String), NodeIndex>,
}

impl Builder {
    fn new(mode: GraphMode) -> Self {
        Self {
            mode,
            graph: UnGraph::default(),
            node_map: HashMap::new(),
        }
    }

    fn add_node(&mut self, label: &str, partition: Option<Partition>) -> NodeIndex {
        let graph = &mut self.graph;
        *self
            .node_map
            .entry((partition, label.to_string()))
            .or_insert_with(|| {
                graph.add_node(GraphNode {
                    label: label.to_string(),
                    partition,
                })
            })
    }

    fn add_edge(&mut self, a: NodeIndex, b: NodeIndex, weight: Option<f64>) {
        // Simple graph: no self-loops, no parallel edges.
        if a != b && self.graph.find_edge(a, b).is_none() {
            self.graph.add_edge(a, b, weight);
        }
    }

    fn finish(self) -> RelationGraph {
        let content_hash = compute_edge_hash(&self.graph);
        RelationGraph {
            mode: self.mode,
            graph: self.graph,
            node_map: self.node_map,
            content_hash,
        }
    }
}

/// BLAKE3 over the sorted `(endpoint, endpoint, weight)` list. Endpoints
/// are ordered within each edge so direction never affects the hash.
fn compute_edge_hash(graph: &UnGraph<GraphNode, Option<f64>>) -> String {
    let key = |n: &GraphNode| (n.partition.map_or(u8::MAX, Partition::tag), n.label.clone());

    let mut edges: Vec<_> = graph
        .edge_references()
        .map(|edge| {
            let a = key(&graph[edge.source()]);
            let b = key(&graph[edge.target()]);
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            (lo, hi, edge.weight().map(f64::to_bits))
        })
        .collect();
    edges.sort_unstable();

    let mut hasher = blake3::Hasher::new();
    for ((lo_tag, lo), (hi_tag, hi), weight) in &edges {
        hasher.update(&[*lo_tag]);
        hasher.update(lo.as_bytes());
        hasher.update(b"\x00");
        hasher.update(&[*hi_tag]);
        hasher.update(hi.as_bytes());
        hasher.update(b"\x00");
        if let Some(bits) = weight {
            hasher.update(&bits.to_le_bytes());
        }
        hasher.update(b"\x00");
    }
    format!("blake3:{}", hasher.finalize())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn incidence() -> LabeledMatrix {
        LabeledMatrix::from_rows(
            &["A", "B", "C"],
            &["X", "Y", "Z"],
            &[&[1.0, 1.0, 0.0], &[1.0, 0.0, 5.0], &[0.0, 0.5, 0.0]],
        )
        .expect("valid matrix")
    }

    fn square(labels: &[&str], data: &[&[f64]]) -> LabeledMatrix {
        LabeledMatrix::from_rows(labels, labels, data).expect("valid matrix")
    }

    #[test]
    fn bipartite_partitions_and_order() {
        let g = RelationGraph::build(&incidence(), GraphMode::Bipartite).expect("build");
        assert_eq!(g.node_count(), 6);
        let tags: Vec<_> = g.nodes().map(|n| (n.label.as_str(), n.partition)).collect();
        assert_eq!(
            tags,
            vec![
                ("A", Some(Partition::Subject)),
                ("B", Some(Partition::Subject)),
                ("C", Some(Partition::Subject)),
                ("X", Some(Partition::Item)),
                ("Y", Some(Partition::Item)),
                ("Z", Some(Partition::Item)),
            ]
        );
    }

    #[test]
    fn bipartite_thresholds_at_one() {
        let g = RelationGraph::build(&incidence(), GraphMode::Bipartite).expect("build");
        // A-X, A-Y, B-X, B-Z (weight 5 still one edge); C-Y at 0.5 is dropped.
        assert_eq!(g.edge_count(), 4);
        let b = g.subject_index("B").expect("B");
        let z = g.item_index("Z").expect("Z");
        assert_eq!(g.edge_weight(b, z), Some(None));
        let c = g.subject_index("C").expect("C");
        let y = g.item_index("Y").expect("Y");
        assert!(g.edge_between(c, y).is_none());
        assert_eq!(g.degree(c), 0);
    }

    #[test]
    fn bipartite_keeps_same_label_on_both_sides_apart() {
        let m = LabeledMatrix::from_rows(&["rust"], &["rust"], &[&[1.0]]).expect("valid");
        let g = RelationGraph::build(&m, GraphMode::Bipartite).expect("build");
        assert_eq!(g.node_count(), 2);
        assert_eq!(g.edge_count(), 1);
        assert_ne!(g.subject_index("rust"), g.item_index("rust"));
    }

    #[test]
    fn unipartite_weighted_edges() {
        let m = square(
            &["A", "B", "C"],
            &[&[0.0, 2.0, 0.0], &[2.0, 0.0, 1.0], &[0.0, 1.0, 0.0]],
        );
        let g = RelationGraph::build(&m, GraphMode::UnipartiteWeighted).expect("build");
        assert_eq!(g.node_count(), 3);
        assert_eq!(g.edge_count(), 2);
        let a = g.node_index("A").expect("A");
        let b = g.node_index("B").expect("B");
        let c = g.node_index("C").expect("C");
        assert_eq!(g.edge_weight(a, b), Some(Some(2.0)));
        assert_eq!(g.edge_weight(b, a), Some(Some(2.0)));
        assert_eq!(g.edge_weight(a, c), None);
    }

    #[test]
    fn unipartite_reads_cells_below_the_diagonal() {
        let m = square(&["A", "B"], &[&[0.0, 0.0], &[2.0, 0.0]]);
        let g = RelationGraph::build(&m, GraphMode::UnipartiteWeighted).expect("build");
        assert_eq!(g.edge_count(), 1);
        let a = g.node_index("A").expect("A");
        let b = g.node_index("B").expect("B");
        assert_eq!(g.edge_weight(a, b), Some(Some(2.0)));
    }

    #[test]
    fn unipartite_asymmetric_pair_takes_larger_cell() {
        let m = square(&["A", "B"], &[&[0.0, 1.0], &[3.0, 0.0]]);
        let g = RelationGraph::build(&m, GraphMode::UnipartiteWeighted).expect("build");
        assert_eq!(g.edge_count(), 1);
        let a = g.node_index("A").expect("A");
        let b = g.node_index("B").expect("B");
        assert_eq!(g.edge_weight(b, a), Some(Some(3.0)));
    }

    #[test]
    fn unipartite_ignores_diagonal() {
        let m = square(&["A", "B"], &[&[3.0, 0.0], &[0.0, 3.0]]);
        let g = RelationGraph::build(&m, GraphMode::UnipartiteWeighted).expect("build");
        assert_eq!(g.edge_count(), 0);
        assert_eq!(g.node_count(), 2);
    }

    #[test]
    fn unipartite_rejects_rectangular() {
        let err = RelationGraph::build(&incidence(), GraphMode::UnipartiteWeighted)
            .expect_err("should fail");
        assert!(matches!(err, BuildError::LabelMismatch));

        let m = LabeledMatrix::from_rows(&["A"], &["X", "Y"], &[&[1.0, 1.0]]).expect("valid");
        let err = RelationGraph::build(&m, GraphMode::UnipartiteWeighted).expect_err("fail");
        assert_eq!(err, BuildError::NotSquare { rows: 1, cols: 2 });
    }

    #[test]
    fn single_node_graph_has_no_edges() {
        let m = square(&["A"], &[&[0.0]]);
        let g = RelationGraph::build(&m, GraphMode::UnipartiteWeighted).expect("build");
        assert_eq!(g.node_count(), 1);
        assert_eq!(g.edge_count(), 0);
    }

    #[test]
    fn content_hash_is_stable_and_edge_sensitive() {
        let m = square(&["A", "B"], &[&[0.0, 1.0], &[1.0, 0.0]]);
        let h1 = RelationGraph::build(&m, GraphMode::UnipartiteWeighted)
            .expect("build")
            .content_hash;
        let h2 = RelationGraph::build(&m, GraphMode::UnipartiteWeighted)
            .expect("build")
            .content_hash;
        assert_eq!(h1, h2);
        assert!(h1.starts_with("blake3:"));

        let heavier = square(&["A", "B"], &[&[0.0, 2.0], &[2.0, 0.0]]);
        let h3 = RelationGraph::build(&heavier, GraphMode::UnipartiteWeighted)
            .expect("build")
            .content_hash;
        assert_ne!(h1, h3, "hash must change when a weight changes");
    }

    #[test]
    fn edges_iterate_with_labels() {
        let g = RelationGraph::build(&incidence(), GraphMode::Bipartite).expect("build");
        let first = g.edges().next().expect("an edge");
        assert_eq!((first.source, first.target), ("A", "X"));
        assert_eq!(first.weight, None);
    }
}
