//! `affinity matrices`: print the incidence, similarity, and co-occurrence
//! matrices of a dataset.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use affinity_core::LabeledMatrix;
use affinity_core::matrix::DerivedMatrices;
use affinity_core::table::Delimiter;
use affinity_core::timing::timed;
use clap::{Args, ValueEnum};
use serde::Serialize;

use crate::cmd::{load_config, load_dataset};
use crate::output::{OutputMode, pretty_section, render_mode};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatrixKind {
    Incidence,
    Similarity,
    CoOccurrence,
}

impl MatrixKind {
    const ALL: [Self; 3] = [Self::Incidence, Self::Similarity, Self::CoOccurrence];

    const fn slug(self) -> &'static str {
        match self {
            Self::Incidence => "incidence",
            Self::Similarity => "similarity",
            Self::CoOccurrence => "co-occurrence",
        }
    }

    const fn title(self) -> &'static str {
        match self {
            Self::Incidence => "Incidence (subjects x items)",
            Self::Similarity => "Similarity (subjects x subjects)",
            Self::CoOccurrence => "Co-occurrence (items x items)",
        }
    }
}

#[derive(Args, Debug)]
pub struct MatricesArgs {
    /// Dataset file: a header line, then subject,item[,weight] rows.
    pub file: PathBuf,

    /// Print only this matrix.
    #[arg(long, value_enum)]
    pub which: Option<MatrixKind>,

    /// Field separator. Detected from the header when omitted.
    #[arg(long, value_name = "comma|semicolon")]
    pub delimiter: Option<Delimiter>,
}

#[derive(Debug, Serialize)]
struct MatrixEntry<'a> {
    id: MatrixKind,
    #[serde(skip)]
    title: &'static str,
    matrix: &'a LabeledMatrix,
}

#[derive(Debug, Serialize)]
struct MatricesOutput<'a> {
    matrices: Vec<MatrixEntry<'a>>,
}

/// Run `affinity matrices`.
///
/// # Errors
///
/// Returns an error if the config or dataset cannot be loaded.
pub fn run_matrices(
    args: &MatricesArgs,
    config_path: Option<&Path>,
    output: OutputMode,
    project_root: &Path,
) -> anyhow::Result<()> {
    let config = load_config(config_path, project_root, output)?;
    let dataset = load_dataset(&args.file, args.delimiter, &config.validation, output)?;
    let derived = timed("derive", || DerivedMatrices::from_incidence(&dataset.incidence));

    let kinds = args.which.map_or_else(|| MatrixKind::ALL.to_vec(), |k| vec![k]);
    let result = MatricesOutput {
        matrices: kinds
            .into_iter()
            .map(|id| MatrixEntry {
                id,
                title: id.title(),
                matrix: match id {
                    MatrixKind::Incidence => &dataset.incidence,
                    MatrixKind::Similarity => &derived.similarity,
                    MatrixKind::CoOccurrence => &derived.co_occurrence,
                },
            })
            .collect(),
    };

    render_mode(output, &result, render_text, render_pretty)
}

/// Tab-separated, one block per matrix, header row of column labels.
fn render_text(out: &MatricesOutput<'_>, w: &mut dyn Write) -> io::Result<()> {
    for (i, entry) in out.matrices.iter().enumerate() {
        if i > 0 {
            writeln!(w)?;
        }
        writeln!(w, "# {}", entry.id.slug())?;
        let m = entry.matrix;
        writeln!(w, "\t{}", m.cols().join("\t"))?;
        for (r, label) in m.rows().iter().enumerate() {
            write!(w, "{label}")?;
            for c in 0..m.cols().len() {
                write!(w, "\t{}", m.at(r, c))?;
            }
            writeln!(w)?;
        }
    }
    Ok(())
}

fn render_pretty(out: &MatricesOutput<'_>, w: &mut dyn Write) -> io::Result<()> {
    for (i, entry) in out.matrices.iter().enumerate() {
        if i > 0 {
            writeln!(w)?;
        }
        pretty_section(w, entry.title)?;
        let m = entry.matrix;
        let cells: Vec<Vec<String>> = (0..m.rows().len())
            .map(|r| (0..m.cols().len()).map(|c| m.at(r, c).to_string()).collect())
            .collect();

        let label_width = m.rows().iter().map(String::len).max().unwrap_or(0);
        let col_width = m
            .cols()
            .iter()
            .map(String::len)
            .chain(cells.iter().flatten().map(String::len))
            .max()
            .unwrap_or(0);

        write!(w, "{:label_width$}", "")?;
        for col in m.cols() {
            write!(w, "  {col:>col_width$}")?;
        }
        writeln!(w)?;
        for (label, row) in m.rows().iter().zip(&cells) {
            write!(w, "{label:<label_width$}")?;
            for cell in row {
                write!(w, "  {cell:>col_width$}")?;
            }
            writeln!(w)?;
        }
    }
    Ok(())
}
