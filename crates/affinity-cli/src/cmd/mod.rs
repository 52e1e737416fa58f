pub mod analyze;
pub mod completions;
pub mod matrices;

use std::path::Path;

use affinity_core::LoadedDataset;
use affinity_core::config::{AnalysisConfig, ValidationConfig, discover_config, load_config_file};
use affinity_core::load::load_path;
use affinity_core::table::Delimiter;
use affinity_core::timing::timed;

use crate::output::{CliError, OutputMode, fail_reported};

/// Load `--config` when given, else `affinity.toml` in `project_root`, else
/// defaults. Failures are rendered before being returned.
pub fn load_config(
    explicit: Option<&Path>,
    project_root: &Path,
    output: OutputMode,
) -> anyhow::Result<AnalysisConfig> {
    let loaded = explicit.map_or_else(|| discover_config(project_root), load_config_file);
    match loaded {
        Ok(config) => Ok(config),
        Err(e) => fail_reported(output, &CliError::from(&e), e),
    }
}

/// Read and pivot a dataset file. Failures are rendered before being returned.
pub fn load_dataset(
    path: &Path,
    delimiter: Option<Delimiter>,
    validation: &ValidationConfig,
    output: OutputMode,
) -> anyhow::Result<LoadedDataset> {
    match timed("load", || load_path(path, delimiter, validation)) {
        Ok(dataset) => Ok(dataset),
        Err(e) => fail_reported(output, &CliError::from(&e), e),
    }
}
