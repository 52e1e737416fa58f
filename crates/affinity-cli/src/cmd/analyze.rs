//! `affinity analyze`: load a dataset, build the three graphs, rank nodes,
//! and export each graph for rendering.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use affinity_core::config::{AnalysisConfig, ValidationConfig};
use affinity_core::error::ErrorCode;
use affinity_core::table::Delimiter;
use affinity_core::{LoadedDataset, ValidationWarning};
use affinity_graph::analysis::{Analysis, GraphKind, GraphReport, analyze};
use affinity_graph::metrics::degree::NodeCentrality;
use clap::Args;
use serde::Serialize;
use tracing::warn;

use crate::cmd::{load_config, load_dataset};
use crate::export::write_exports;
use crate::output::{
    CliError, OutputMode, fail_reported, pretty_kv, pretty_section, render_mode,
};

#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// Dataset file: a header line, then subject,item[,weight] rows.
    pub file: PathBuf,

    /// Directory for graph exports. Overrides [output].dir.
    #[arg(long, value_name = "DIR")]
    pub out: Option<PathBuf>,

    /// Skip writing graph exports.
    #[arg(long)]
    pub no_export: bool,

    /// Field separator. Detected from the header when omitted.
    #[arg(long, value_name = "comma|semicolon")]
    pub delimiter: Option<Delimiter>,

    /// Expected minimum distinct subjects. Overrides [validation].min_subjects.
    #[arg(long, value_name = "N")]
    pub min_subjects: Option<usize>,

    /// Expected minimum distinct items. Overrides [validation].min_items.
    #[arg(long, value_name = "N")]
    pub min_items: Option<usize>,
}

impl AnalyzeArgs {
    fn validation(&self, config: &AnalysisConfig) -> ValidationConfig {
        ValidationConfig {
            min_subjects: self.min_subjects.unwrap_or(config.validation.min_subjects),
            min_items: self.min_items.unwrap_or(config.validation.min_items),
        }
    }

    fn export_dir(&self, config: &AnalysisConfig) -> Option<PathBuf> {
        if self.no_export || (!config.output.export && self.out.is_none()) {
            return None;
        }
        Some(self.out.clone().unwrap_or_else(|| config.output.dir.clone()))
    }
}

#[derive(Debug, Serialize)]
struct DatasetSummary {
    source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    delimiter: Option<Delimiter>,
    subjects: usize,
    items: usize,
    triples: usize,
}

#[derive(Debug, Serialize)]
struct GraphSummary<'a> {
    id: GraphKind,
    title: &'static str,
    nodes: usize,
    edges: usize,
    content_hash: &'a str,
    /// `None` when the graph has fewer than two nodes.
    top: Option<&'a NodeCentrality>,
}

impl<'a> GraphSummary<'a> {
    fn new(report: &'a GraphReport) -> Self {
        Self {
            id: report.kind,
            title: report.kind.title(),
            nodes: report.graph.node_count(),
            edges: report.graph.edge_count(),
            content_hash: &report.graph.content_hash,
            top: report.centrality.top(),
        }
    }

    fn top_display(&self) -> String {
        self.top.map_or_else(
            || format!("none ({} node(s), no central node)", self.nodes),
            |t| format!("{} ({:.2})", t.label, t.centrality),
        )
    }
}

/// Exports are best-effort: a failure is reported alongside the analysis.
#[derive(Debug, Serialize)]
struct ExportFailure {
    code: &'static str,
    message: String,
}

impl ExportFailure {
    fn new(err: &anyhow::Error) -> Self {
        Self {
            code: ErrorCode::ExportFailed.code(),
            message: format!("{err:#}"),
        }
    }
}

#[derive(Debug, Serialize)]
struct AnalyzeOutput<'a> {
    dataset: DatasetSummary,
    warnings: &'a [ValidationWarning],
    graphs: Vec<GraphSummary<'a>>,
    exports: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    export_error: Option<ExportFailure>,
    #[serde(skip)]
    quiet: bool,
}

/// Run `affinity analyze`.
///
/// # Errors
///
/// Returns an error if the config or dataset cannot be loaded. A failed
/// export is reported in the output and does not fail the run.
pub fn run_analyze(
    args: &AnalyzeArgs,
    config_path: Option<&Path>,
    output: OutputMode,
    quiet: bool,
    project_root: &Path,
) -> anyhow::Result<()> {
    let config = load_config(config_path, project_root, output)?;
    let dataset = load_dataset(&args.file, args.delimiter, &args.validation(&config), output)?;

    let analysis = match analyze(&dataset.incidence) {
        Ok(analysis) => analysis,
        Err(e) => {
            let error = CliError::coded(ErrorCode::InternalUnexpected, e.to_string());
            return fail_reported(output, &error, e);
        }
    };

    let mut export_error = None;
    let exports = match args.export_dir(&config) {
        Some(dir) => match write_exports(&project_root.join(dir), &analysis) {
            Ok(paths) => paths,
            Err(e) => {
                warn!(error = %format!("{e:#}"), "graph export failed");
                export_error = Some(ExportFailure::new(&e));
                Vec::new()
            }
        },
        None => Vec::new(),
    };

    let mut result = summarize(&args.file, &dataset, &analysis, &exports, quiet);
    result.export_error = export_error;
    render_mode(output, &result, render_text, render_pretty)
}

fn summarize<'a>(
    source: &Path,
    dataset: &'a LoadedDataset,
    analysis: &'a Analysis,
    exports: &[PathBuf],
    quiet: bool,
) -> AnalyzeOutput<'a> {
    AnalyzeOutput {
        dataset: DatasetSummary {
            source: source.display().to_string(),
            delimiter: dataset.delimiter,
            subjects: dataset.subject_count(),
            items: dataset.item_count(),
            triples: dataset.triple_count,
        },
        warnings: &dataset.warnings,
        graphs: analysis.graphs.iter().map(GraphSummary::new).collect(),
        exports: exports.iter().map(|p| p.display().to_string()).collect(),
        export_error: None,
        quiet,
    }
}

fn render_text(out: &AnalyzeOutput<'_>, w: &mut dyn Write) -> io::Result<()> {
    let d = &out.dataset;
    writeln!(
        w,
        "dataset subjects={} items={} triples={}",
        d.subjects, d.items, d.triples
    )?;
    if !out.quiet {
        for warning in out.warnings {
            writeln!(w, "warning {warning}")?;
        }
    }
    for g in &out.graphs {
        match g.top {
            Some(top) => writeln!(
                w,
                "graph {} nodes={} edges={} top={} centrality={:.2}",
                g.id, g.nodes, g.edges, top.label, top.centrality
            )?,
            None => writeln!(
                w,
                "graph {} nodes={} edges={} top=- degenerate",
                g.id, g.nodes, g.edges
            )?,
        }
    }
    for path in &out.exports {
        writeln!(w, "export {path}")?;
    }
    if let Some(failure) = &out.export_error {
        writeln!(w, "export-failed[{}] {}", failure.code, failure.message)?;
    }
    Ok(())
}

fn render_pretty(out: &AnalyzeOutput<'_>, w: &mut dyn Write) -> io::Result<()> {
    let d = &out.dataset;
    pretty_section(w, "Dataset")?;
    pretty_kv(w, "Source", &d.source)?;
    if let Some(delimiter) = d.delimiter {
        pretty_kv(w, "Delimiter", delimiter.to_string())?;
    }
    pretty_kv(w, "Dimensions", format!("{} subjects x {} items", d.subjects, d.items))?;
    pretty_kv(w, "Triples", d.triples.to_string())?;

    if !out.quiet && !out.warnings.is_empty() {
        writeln!(w)?;
        pretty_section(w, "Warnings")?;
        for warning in out.warnings {
            writeln!(w, "  ! {warning}")?;
        }
    }

    for g in &out.graphs {
        writeln!(w)?;
        pretty_section(w, g.title)?;
        pretty_kv(w, "Nodes", g.nodes.to_string())?;
        pretty_kv(w, "Edges", g.edges.to_string())?;
        pretty_kv(w, "Top node", g.top_display())?;
    }

    if !out.exports.is_empty() || out.export_error.is_some() {
        writeln!(w)?;
        pretty_section(w, "Exports")?;
        for path in &out.exports {
            writeln!(w, "  {path}")?;
        }
        if let Some(failure) = &out.export_error {
            writeln!(w, "  ! error[{}]: {}", failure.code, failure.message)?;
        }
    }
    Ok(())
}
