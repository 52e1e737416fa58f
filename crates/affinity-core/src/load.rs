//! Relation loader: delimited triples → incidence matrix.
//!
//! # Column roles
//!
//! Columns are positional. Column 0 is the subject, column 1 the item,
//! column 2 the weight. Header names are ignored. A two-column table has no
//! weight column and every triple gets weight `1.0`; columns past the third
//! are ignored.
//!
//! # Pivot
//!
//! Rows are the distinct subjects and columns the distinct items, both in
//! sorted order. A cell holds the weight of its `(subject, item)` triple or
//! `0.0` when none was observed. When a pair repeats, the **last** triple
//! wins; weights are never summed.
//!
//! # Failure policy
//!
//! Any [`LoadError`] is fatal for the run. Dataset-size checks only produce
//! [`ValidationWarning`]s.

use std::collections::BTreeSet;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use nalgebra::DMatrix;
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::config::ValidationConfig;
use crate::error::ErrorCode;
use crate::matrix::LabeledMatrix;
use crate::table::{Delimiter, RawTable};

/// Minimum number of columns a usable table must have.
pub const MIN_COLUMNS: usize = 2;

/// Weight assigned when the table has no weight column.
pub const DEFAULT_WEIGHT: f64 = 1.0;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A single subject → item selection with its weight.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Triple {
    pub subject: String,
    pub item: String,
    pub weight: f64,
}

impl Triple {
    #[must_use]
    pub fn new(subject: impl Into<String>, item: impl Into<String>, weight: f64) -> Self {
        Self {
            subject: subject.into(),
            item: item.into(),
            weight,
        }
    }
}

/// Fatal loading failures. No matrix is produced when one of these occurs.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The header has fewer than two columns under every candidate delimiter.
    #[error("expected at least 2 columns, found {found} (tried comma and semicolon)")]
    TooFewColumns { found: usize },

    #[error("line {line}: unterminated quoted field")]
    UnterminatedQuote { line: usize },

    #[error("line {line}: expected {expected} fields, found {found}")]
    ShortRecord {
        line: usize,
        expected: usize,
        found: usize,
    },

    #[error("line {line}: empty {field}")]
    EmptyField { line: usize, field: &'static str },

    #[error("line {line}: invalid weight '{value}' (must be a finite number >= 0)")]
    InvalidWeight { line: usize, value: String },

    /// Parsing succeeded but produced no triples.
    #[error("dataset contains no triples")]
    Empty,
}

impl LoadError {
    /// Stable machine-readable code for this failure.
    #[must_use]
    pub const fn error_code(&self) -> ErrorCode {
        match self {
            Self::Io { .. } => ErrorCode::SourceUnreadable,
            Self::TooFewColumns { .. } => ErrorCode::TooFewColumns,
            Self::UnterminatedQuote { .. } | Self::ShortRecord { .. } | Self::EmptyField { .. } => {
                ErrorCode::MalformedRecord
            }
            Self::InvalidWeight { .. } => ErrorCode::InvalidWeight,
            Self::Empty => ErrorCode::EmptyDataset,
        }
    }
}

/// Non-fatal dataset-size findings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationWarning {
    TooFewSubjects { found: usize, min: usize },
    TooFewItems { found: usize, min: usize },
}

impl fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooFewSubjects { found, min } => {
                write!(f, "dataset has {found} distinct subjects, expected at least {min}")
            }
            Self::TooFewItems { found, min } => {
                write!(f, "dataset has {found} distinct items, expected at least {min}")
            }
        }
    }
}

/// The result of a successful load.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedDataset {
    /// Delimiter used when the source was text, `None` for in-memory triples.
    pub delimiter: Option<Delimiter>,
    /// Number of triples read, duplicates included.
    pub triple_count: usize,
    /// Subjects × items.
    pub incidence: LabeledMatrix,
    pub warnings: Vec<ValidationWarning>,
}

impl LoadedDataset {
    #[must_use]
    pub fn subject_count(&self) -> usize {
        self.incidence.rows().len()
    }

    #[must_use]
    pub fn item_count(&self) -> usize {
        self.incidence.cols().len()
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Load a dataset file. `delimiter = None` enables comma/semicolon detection.
///
/// # Errors
///
/// Returns [`LoadError`] if the file cannot be read or its contents do not
/// yield at least one valid triple.
#[instrument(skip(path, validation), fields(path = %path.display()))]
pub fn load_path(
    path: &Path,
    delimiter: Option<Delimiter>,
    validation: &ValidationConfig,
) -> Result<LoadedDataset, LoadError> {
    let text = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    load_str(&text, delimiter, validation)
}

/// Load a dataset from delimited text.
///
/// # Errors
///
/// Returns [`LoadError`] on an unterminated quote, too few columns, malformed
/// records, or an empty dataset.
pub fn load_str(
    text: &str,
    delimiter: Option<Delimiter>,
    validation: &ValidationConfig,
) -> Result<LoadedDataset, LoadError> {
    let table = delimiter
        .map_or_else(|| RawTable::detect(text), |d| RawTable::parse(text, d))
        .map_err(|e| LoadError::UnterminatedQuote { line: e.line })?;
    let triples = triples_from_table(&table)?;
    let mut dataset = load_triples(&triples, validation)?;
    dataset.delimiter = Some(table.delimiter);
    Ok(dataset)
}

/// Pivot in-memory triples and run the advisory size checks.
///
/// # Errors
///
/// Returns [`LoadError::Empty`] if `triples` is empty.
pub fn load_triples(
    triples: &[Triple],
    validation: &ValidationConfig,
) -> Result<LoadedDataset, LoadError> {
    let incidence = pivot(triples)?;
    let warnings = validate(&incidence, validation);
    for warning in &warnings {
        warn!(%warning, "dataset smaller than expected");
    }

    info!(
        subjects = incidence.rows().len(),
        items = incidence.cols().len(),
        triples = triples.len(),
        "dataset loaded"
    );

    Ok(LoadedDataset {
        delimiter: None,
        triple_count: triples.len(),
        incidence,
        warnings,
    })
}

/// Convert table records into triples by column position.
///
/// # Errors
///
/// Returns [`LoadError`] if the header is too narrow or any record is
/// malformed.
pub fn triples_from_table(table: &RawTable) -> Result<Vec<Triple>, LoadError> {
    let columns = table.column_count();
    if columns < MIN_COLUMNS {
        return Err(LoadError::TooFewColumns { found: columns });
    }
    let has_weight = columns > MIN_COLUMNS;
    let expected = if has_weight { 3 } else { MIN_COLUMNS };

    let mut triples = Vec::with_capacity(table.records.len());
    for record in &table.records {
        let fields = &record.fields;
        if fields.len() < expected {
            return Err(LoadError::ShortRecord {
                line: record.line,
                expected,
                found: fields.len(),
            });
        }

        let subject = &fields[0];
        let item = &fields[1];
        if subject.is_empty() {
            return Err(LoadError::EmptyField {
                line: record.line,
                field: "subject",
            });
        }
        if item.is_empty() {
            return Err(LoadError::EmptyField {
                line: record.line,
                field: "item",
            });
        }

        let weight = if has_weight {
            parse_weight(&fields[2]).ok_or_else(|| LoadError::InvalidWeight {
                line: record.line,
                value: fields[2].clone(),
            })?
        } else {
            DEFAULT_WEIGHT
        };

        triples.push(Triple::new(subject.as_str(), item.as_str(), weight));
    }

    Ok(triples)
}

/// Pivot triples into a sorted subjects × items matrix, last triple winning.
///
/// # Errors
///
/// Returns [`LoadError::Empty`] if `triples` is empty.
pub fn pivot(triples: &[Triple]) -> Result<LabeledMatrix, LoadError> {
    if triples.is_empty() {
        return Err(LoadError::Empty);
    }

    let subjects: Vec<String> = triples
        .iter()
        .map(|t| t.subject.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let items: Vec<String> = triples
        .iter()
        .map(|t| t.item.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let mut values = DMatrix::<f64>::zeros(subjects.len(), items.len());
    for triple in triples {
        // Labels come from the same triples, so both searches succeed.
        if let (Ok(i), Ok(j)) = (
            subjects.binary_search(&triple.subject),
            items.binary_search(&triple.item),
        ) {
            values[(i, j)] = triple.weight;
        }
    }

    Ok(LabeledMatrix::from_unique_labels(subjects, items, values))
}

/// Compare distinct subject/item counts against configured minimums.
#[must_use]
pub fn validate(incidence: &LabeledMatrix, config: &ValidationConfig) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();
    let subjects = incidence.rows().len();
    let items = incidence.cols().len();
    if subjects < config.min_subjects {
        warnings.push(ValidationWarning::TooFewSubjects {
            found: subjects,
            min: config.min_subjects,
        });
    }
    if items < config.min_items {
        warnings.push(ValidationWarning::TooFewItems {
            found: items,
            min: config.min_items,
        });
    }
    warnings
}

fn parse_weight(raw: &str) -> Option<f64> {
    let value = raw.trim().parse::<f64>().ok()?;
    (value.is_finite() && value >= 0.0).then_some(value)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
