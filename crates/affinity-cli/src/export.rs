//! Graph export files for external renderers.
//!
//! Each graph is written to `<dir>/<slug>.json` (`incidence.json`,
//! `similarity.json`, `co-occurrence.json`). The directory is created when
//! missing; existing files are overwritten.

use std::fs;
use std::path::{Path, PathBuf};

use affinity_graph::analysis::Analysis;
use anyhow::Context;
use tracing::{debug, instrument};

/// Write one JSON export per graph and return the written paths in graph order.
///
/// # Errors
///
/// Returns an error if the directory cannot be created or a file cannot be
/// serialized or written.
#[instrument(skip(analysis), fields(dir = %dir.display()))]
pub fn write_exports(dir: &Path, analysis: &Analysis) -> anyhow::Result<Vec<PathBuf>> {
    fs::create_dir_all(dir)
        .with_context(|| format!("failed to create output directory {}", dir.display()))?;

    analysis
        .graphs
        .iter()
        .map(|report| {
            let path = dir.join(format!("{}.json", report.kind.slug()));
            let mut body = serde_json::to_string_pretty(&report.export())
                .with_context(|| format!("failed to serialize {} graph", report.kind))?;
            body.push('\n');
            fs::write(&path, body)
                .with_context(|| format!("failed to write {}", path.display()))?;
            debug!(path = %path.display(), "graph exported");
            Ok(path)
        })
        .collect()
}
