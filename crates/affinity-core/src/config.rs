use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::ErrorCode;

/// Default config file name looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "affinity.toml";

/// Errors raised while reading `affinity.toml`.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

impl ConfigError {
    #[must_use]
    pub const fn error_code(&self) -> ErrorCode {
        match self {
            Self::Read { .. } => ErrorCode::ConfigReadFailed,
            Self::Parse { .. } => ErrorCode::ConfigParseError,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct AnalysisConfig {
    #[serde(default)]
    pub validation: ValidationConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Advisory dataset-size expectations. Falling short only warns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationConfig {
    #[serde(default = "default_min_subjects")]
    pub min_subjects: usize,
    #[serde(default = "default_min_items")]
    pub min_items: usize,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            min_subjects: default_min_subjects(),
            min_items: default_min_items(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory that graph exports are written into.
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,
    #[serde(default = "default_true")]
    pub export: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            export: default_true(),
        }
    }
}

impl AnalysisConfig {
    /// Parse a config from TOML text. `origin` is only used in errors.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] on malformed TOML or mistyped fields.
    pub fn from_toml_str(content: &str, origin: &Path) -> Result<Self, ConfigError> {
        toml::from_str::<Self>(content).map_err(|source| ConfigError::Parse {
            path: origin.to_path_buf(),
            source,
        })
    }
}

/// Load config from an explicit path, which must exist.
///
/// # Errors
///
/// Returns [`ConfigError`] if the file cannot be read or parsed.
pub fn load_config_file(path: &Path) -> Result<AnalysisConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    AnalysisConfig::from_toml_str(&content, path)
}

/// Load `affinity.toml` from `dir`, falling back to defaults when absent.
///
/// # Errors
///
/// Returns [`ConfigError`] if the file exists but cannot be read or parsed.
pub fn discover_config(dir: &Path) -> Result<AnalysisConfig, ConfigError> {
    let path = dir.join(CONFIG_FILE_NAME);
    if !path.exists() {
        return Ok(AnalysisConfig::default());
    }
    load_config_file(&path)
}

const fn default_min_subjects() -> usize {
    10
}

const fn default_min_items() -> usize {
    4
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("results")
}

const fn default_true() -> bool {
    true
}
