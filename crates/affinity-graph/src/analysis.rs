//! End-to-end analysis of one incidence matrix.
//!
//! # Pipeline
//!
//! ```text
//! incidence ─┬─────────────────────────── build(Bipartite) ──────────┐
//!            ├─ similarity(M)    ──────── build(UnipartiteWeighted) ─┼─ rank
//!            └─ co_occurrence(M) ──────── build(UnipartiteWeighted) ─┘
//! ```
//!
//! Each stage is timed under a stable stage name when timing is enabled.
//! The three [`GraphReport`]s carry everything an external renderer needs:
//! partitioned nodes, weighted edges, and the centrality outcome.

use std::fmt;

use affinity_core::LabeledMatrix;
use affinity_core::matrix::DerivedMatrices;
use affinity_core::timing::timed;
use serde::Serialize;
use tracing::{info, instrument};

use crate::graph::{BuildError, GraphEdge, GraphMode, GraphNode, RelationGraph};
use crate::metrics::degree::{CentralityOutcome, rank};

/// The three graphs derived from a dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum GraphKind {
    Incidence,
    Similarity,
    CoOccurrence,
}

impl GraphKind {
    pub const ALL: [Self; 3] = [Self::Incidence, Self::Similarity, Self::CoOccurrence];

    /// Logical output identifier; the I/O layer maps it to a path.
    #[must_use]
    pub const fn slug(self) -> &'static str {
        match self {
            Self::Incidence => "incidence",
            Self::Similarity => "similarity",
            Self::CoOccurrence => "co-occurrence",
        }
    }

    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::Incidence => "Incidence graph (subjects x items)",
            Self::Similarity => "Similarity graph (between subjects)",
            Self::CoOccurrence => "Co-occurrence graph (between items)",
        }
    }

    #[must_use]
    pub const fn mode(self) -> GraphMode {
        match self {
            Self::Incidence => GraphMode::Bipartite,
            Self::Similarity | Self::CoOccurrence => GraphMode::UnipartiteWeighted,
        }
    }

    /// Layout a renderer should use: two columns for the bipartite graph,
    /// force-directed otherwise.
    #[must_use]
    pub const fn layout(self) -> &'static str {
        match self.mode() {
            GraphMode::Bipartite => "bipartite",
            GraphMode::UnipartiteWeighted => "spring",
        }
    }
}

impl fmt::Display for GraphKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

/// One built graph and its centrality outcome.
#[derive(Debug, Clone)]
pub struct GraphReport {
    pub kind: GraphKind,
    pub graph: RelationGraph,
    pub centrality: CentralityOutcome,
}

/// Serializable hand-off for a renderer: nodes, edges, ranking, and hints.
#[derive(Debug, Clone, Serialize)]
pub struct GraphExport<'a> {
    pub id: &'static str,
    pub title: &'static str,
    pub mode: GraphMode,
    pub layout: &'static str,
    pub content_hash: &'a str,
    pub nodes: Vec<&'a GraphNode>,
    pub edges: Vec<GraphEdge<'a>>,
    pub centrality: &'a CentralityOutcome,
}

impl GraphReport {
    fn new(kind: GraphKind, matrix: &LabeledMatrix) -> Result<Self, BuildError> {
        let graph = timed(&format!("graph.{}", kind.slug()), || {
            RelationGraph::build(matrix, kind.mode())
        })?;
        let centrality = timed(&format!("centrality.{}", kind.slug()), || rank(&graph));

        match centrality.top() {
            Some(top) => info!(
                graph = %kind,
                nodes = graph.node_count(),
                edges = graph.edge_count(),
                top = %top.label,
                centrality = top.centrality,
                "graph analyzed"
            ),
            None => info!(
                graph = %kind,
                nodes = graph.node_count(),
                "graph analyzed, no central node"
            ),
        }

        Ok(Self {
            kind,
            graph,
            centrality,
        })
    }

    #[must_use]
    pub fn export(&self) -> GraphExport<'_> {
        GraphExport {
            id: self.kind.slug(),
            title: self.kind.title(),
            mode: self.graph.mode,
            layout: self.kind.layout(),
            content_hash: &self.graph.content_hash,
            nodes: self.graph.nodes().collect(),
            edges: self.graph.edges().collect(),
            centrality: &self.centrality,
        }
    }
}

/// Matrices and graphs computed from one incidence matrix.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub incidence: LabeledMatrix,
    pub derived: DerivedMatrices,
    /// Always in [`GraphKind::ALL`] order.
    pub graphs: Vec<GraphReport>,
}

impl Analysis {
    #[must_use]
    pub fn graph(&self, kind: GraphKind) -> Option<&GraphReport> {
        self.graphs.iter().find(|g| g.kind == kind)
    }

    #[must_use]
    pub const fn matrix(&self, kind: GraphKind) -> &LabeledMatrix {
        match kind {
            GraphKind::Incidence => &self.incidence,
            GraphKind::Similarity => &self.derived.similarity,
            GraphKind::CoOccurrence => &self.derived.co_occurrence,
        }
    }
}

/// Derive both square matrices, build all three graphs, and rank each.
///
/// # Errors
///
/// Returns [`BuildError`] only if a derived matrix is not square, which the
/// derivation never produces.
#[instrument(skip_all, fields(shape = ?incidence.shape()))]
pub fn analyze(incidence: &LabeledMatrix) -> Result<Analysis, BuildError> {
    let derived = timed("derive", || DerivedMatrices::from_incidence(incidence));

    let inputs = [
        (GraphKind::Incidence, incidence),
        (GraphKind::Similarity, &derived.similarity),
        (GraphKind::CoOccurrence, &derived.co_occurrence),
    ];
    let graphs = inputs
        .into_iter()
        .map(|(kind, matrix)| GraphReport::new(kind, matrix))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Analysis {
        incidence: incidence.clone(),
        derived,
        graphs,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
