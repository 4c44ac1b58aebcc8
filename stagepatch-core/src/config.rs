//! Pipeline configuration
//!
//! Defines the optional `stagepatch.toml` file. Every field has a default, so
//! a missing file behaves the same as an empty one.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::workspace::{MarkerSet, TieBreak, WorkspaceError, WorkspaceLayout, DEFAULT_MARKERS};

/// File looked up in the working directory when no `--config` is given
pub const CONFIG_FILE_NAME: &str = "stagepatch.toml";

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineConfig {
    /// Workspace composition and normalization settings
    #[serde(default)]
    pub workspace: WorkspaceConfig,
}

/// `[workspace]` table
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceConfig {
    /// Folder, name suffix and file names of the composed workspace
    #[serde(flatten)]
    pub layout: WorkspaceLayout,

    /// Build-output directory names, highest priority first
    #[serde(default = "default_markers")]
    pub markers: Vec<String>,

    /// How to resolve a path containing several markers
    #[serde(default)]
    pub tie_break: TieBreak,
}

fn default_markers() -> Vec<String> {
    DEFAULT_MARKERS.iter().map(|s| s.to_string()).collect()
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            layout: WorkspaceLayout::default(),
            markers: default_markers(),
            tie_break: TieBreak::default(),
        }
    }
}

impl WorkspaceConfig {
    /// Marker set for normalization, optionally replacing the configured markers
    pub fn marker_set(&self, overrides: &[String]) -> Result<MarkerSet, WorkspaceError> {
        let names: &[String] = if overrides.is_empty() {
            &self.markers
        } else {
            overrides
        };
        Ok(MarkerSet::new(names.iter().cloned())?.with_tie_break(self.tie_break))
    }
}

/// Errors that can occur when loading configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Config file not found at {0}")]
    NotFound(String),
}

impl PipelineConfig {
    /// Parse a config file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }
        let content = fs::read_to_string(path)?;
        let config: PipelineConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load `explicit` if given, else `stagepatch.toml` in `dir` if present,
    /// else the defaults
    pub fn discover(explicit: Option<&Path>, dir: &Path) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }

        let candidate: PathBuf = dir.join(CONFIG_FILE_NAME);
        if candidate.is_file() {
            tracing::debug!("Using config {}", candidate.display());
            return Self::from_file(candidate);
        }

        Ok(Self::default())
    }
}
