//! Labeled dense matrices and the two derived relation matrices.
//!
//! # Overview
//!
//! A [`LabeledMatrix`] pairs a dense `nalgebra` matrix with row and column
//! label arenas. The incidence matrix is subjects × items; from it we derive:
//!
//! ```text
//! incidence M (subjects × items)
//!        ├─ similarity(M)    = M · Mᵀ   subjects × subjects, diagonal 0
//!        └─ co_occurrence(M) = Mᵀ · M   items × items,       diagonal 0
//! ```
//!
//! Both products are symmetric by construction. No thresholding happens
//! here; raw non-negative values are kept and the graph builder decides
//! which cells become edges.

use std::collections::HashMap;

use nalgebra::DMatrix;
use serde::ser::{Serialize, SerializeStruct, Serializer};
use tracing::{debug, instrument};

/// Errors raised when assembling a [`LabeledMatrix`] from parts.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MatrixError {
    /// Label count does not match the matrix dimension.
    #[error("shape mismatch: {rows} row labels x {cols} column labels for a {actual_rows}x{actual_cols} matrix")]
    ShapeMismatch {
        rows: usize,
        cols: usize,
        actual_rows: usize,
        actual_cols: usize,
    },

    /// The same label appears twice on one axis.
    #[error("duplicate label on {axis} axis: {label}")]
    DuplicateLabel { axis: &'static str, label: String },
}

/// A dense `f64` matrix with string labels on both axes.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledMatrix {
    rows: Vec<String>,
    cols: Vec<String>,
    row_index: HashMap<String, usize>,
    col_index: HashMap<String, usize>,
    values: DMatrix<f64>,
}

impl LabeledMatrix {
    /// Assemble a matrix from labels and values.
    ///
    /// # Errors
    ///
    /// Returns [`MatrixError`] if the label counts do not match the value
    /// shape or a label repeats on either axis.
    pub fn new(
        rows: Vec<String>,
        cols: Vec<String>,
        values: DMatrix<f64>,
    ) -> Result<Self, MatrixError> {
        if rows.len() != values.nrows() || cols.len() != values.ncols() {
            return Err(MatrixError::ShapeMismatch {
                rows: rows.len(),
                cols: cols.len(),
                actual_rows: values.nrows(),
                actual_cols: values.ncols(),
            });
        }

        let row_index = index_labels(&rows, "row")?;
        let col_index = index_labels(&cols, "column")?;

        Ok(Self {
            rows,
            cols,
            row_index,
            col_index,
            values,
        })
    }

    /// Assemble from labels already known to be distinct and to match the
    /// value shape.
    pub(crate) fn from_unique_labels(
        rows: Vec<String>,
        cols: Vec<String>,
        values: DMatrix<f64>,
    ) -> Self {
        debug_assert_eq!(rows.len(), values.nrows());
        debug_assert_eq!(cols.len(), values.ncols());
        let row_index = rows.iter().cloned().zip(0..).collect();
        let col_index = cols.iter().cloned().zip(0..).collect();
        Self {
            rows,
            cols,
            row_index,
            col_index,
            values,
        }
    }

    /// Build from row-major nested slices. Convenient for tests and callers
    /// that already hold a small dense table.
    ///
    /// # Errors
    ///
    /// Returns [`MatrixError::ShapeMismatch`] if any row has the wrong width.
    pub fn from_rows(
        rows: &[&str],
        cols: &[&str],
        data: &[&[f64]],
    ) -> Result<Self, MatrixError> {
        if data.len() != rows.len() || data.iter().any(|r| r.len() != cols.len()) {
            return Err(MatrixError::ShapeMismatch {
                rows: rows.len(),
                cols: cols.len(),
                actual_rows: data.len(),
                actual_cols: data.first().map_or(0, |r| r.len()),
            });
        }
        let values = DMatrix::from_fn(rows.len(), cols.len(), |i, j| data[i][j]);
        Self::new(
            rows.iter().map(|s| (*s).to_string()).collect(),
            cols.iter().map(|s| (*s).to_string()).collect(),
            values,
        )
    }

    /// Row labels in index order.
    #[must_use]
    pub fn rows(&self) -> &[String] {
        &self.rows
    }

    /// Column labels in index order.
    #[must_use]
    pub fn cols(&self) -> &[String] {
        &self.cols
    }

    /// The underlying dense values.
    #[must_use]
    pub const fn values(&self) -> &DMatrix<f64> {
        &self.values
    }

    /// `(rows, cols)`.
    #[must_use]
    pub fn shape(&self) -> (usize, usize) {
        self.values.shape()
    }

    #[must_use]
    pub fn is_square(&self) -> bool {
        self.values.is_square()
    }

    /// Value at a row/column index pair.
    #[must_use]
    pub fn at(&self, row: usize, col: usize) -> f64 {
        self.values[(row, col)]
    }

    /// Value at a row/column label pair, or `None` if either label is unknown.
    #[must_use]
    pub fn get(&self, row: &str, col: &str) -> Option<f64> {
        let i = *self.row_index.get(row)?;
        let j = *self.col_index.get(col)?;
        Some(self.values[(i, j)])
    }

    #[must_use]
    pub fn row_position(&self, label: &str) -> Option<usize> {
        self.row_index.get(label).copied()
    }

    #[must_use]
    pub fn col_position(&self, label: &str) -> Option<usize> {
        self.col_index.get(label).copied()
    }

    /// Returns `true` if the matrix is square and `m[i][j] == m[j][i]` for
    /// all cells.
    #[must_use]
    pub fn is_symmetric(&self) -> bool {
        self.is_square() && self.values == self.values.transpose()
    }

    /// Returns `true` if every diagonal cell is exactly zero.
    #[must_use]
    #[allow(clippy::float_cmp)]
    pub fn has_zero_diagonal(&self) -> bool {
        self.values.diagonal().iter().all(|v| *v == 0.0)
    }

    /// Sum of all cells.
    #[must_use]
    pub fn total(&self) -> f64 {
        self.values.sum()
    }

    /// Row-major copy of the values.
    #[must_use]
    pub fn to_row_vecs(&self) -> Vec<Vec<f64>> {
        self.values
            .row_iter()
            .map(|row| row.iter().copied().collect())
            .collect()
    }
}

impl Serialize for LabeledMatrix {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("LabeledMatrix", 3)?;
        state.serialize_field("rows", &self.rows)?;
        state.serialize_field("cols", &self.cols)?;
        state.serialize_field("values", &self.to_row_vecs())?;
        state.end()
    }
}

fn index_labels(
    labels: &[String],
    axis: &'static str,
) -> Result<HashMap<String, usize>, MatrixError> {
    let mut index = HashMap::with_capacity(labels.len());
    for (i, label) in labels.iter().enumerate() {
        if index.insert(label.clone(), i).is_some() {
            return Err(MatrixError::DuplicateLabel {
                axis,
                label: label.clone(),
            });
        }
    }
    Ok(index)
}

// ---------------------------------------------------------------------------
// Derivation
// ---------------------------------------------------------------------------

/// Subject-similarity matrix `M · Mᵀ` with the diagonal zeroed.
///
/// Cell `(i, j)` is the weighted count of items shared by subjects `i` and
/// `j`.
#[must_use]
#[instrument(skip_all, fields(subjects = incidence.rows.len()))]
pub fn similarity(incidence: &LabeledMatrix) -> LabeledMatrix {
    let mut product = &incidence.values * incidence.values.transpose();
    product.fill_diagonal(0.0);
    debug!(total = product.sum(), "similarity derived");
    square(incidence.rows.clone(), incidence.row_index.clone(), product)
}

/// Item-co-occurrence matrix `Mᵀ · M` with the diagonal zeroed.
///
/// Cell `(i, j)` is the weighted count of subjects that chose both items.
#[must_use]
#[instrument(skip_all, fields(items = incidence.cols.len()))]
pub fn co_occurrence(incidence: &LabeledMatrix) -> LabeledMatrix {
    let mut product = incidence.values.tr_mul(&incidence.values);
    product.fill_diagonal(0.0);
    debug!(total = product.sum(), "co-occurrence derived");
    square(incidence.cols.clone(), incidence.col_index.clone(), product)
}

fn square(
    labels: Vec<String>,
    index: HashMap<String, usize>,
    values: DMatrix<f64>,
) -> LabeledMatrix {
    LabeledMatrix {
        cols: labels.clone(),
        rows: labels,
        col_index: index.clone(),
        row_index: index,
        values,
    }
}

/// The similarity and co-occurrence matrices derived from one incidence
/// matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedMatrices {
    pub similarity: LabeledMatrix,
    pub co_occurrence: LabeledMatrix,
}

impl DerivedMatrices {
    #[must_use]
    pub fn from_incidence(incidence: &LabeledMatrix) -> Self {
        Self {
            similarity: similarity(incidence),
            co_occurrence: co_occurrence(incidence),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
