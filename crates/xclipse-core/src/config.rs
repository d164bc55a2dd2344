use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use xclipse_common::platform;

use crate::error::LayerError;

/// Top-level layer configuration, loaded from xclipse_layer.toml.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerConfig {
    #[serde(default)]
    pub pipelines: PipelineConfig,
    #[serde(default)]
    pub memory: MemoryConfig,
    #[serde(default)]
    pub submission: SubmissionConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Rewrite rasterization state with mobile defaults
    #[serde(default = "default_true")]
    pub rasterization_defaults: bool,
    /// Upper bound for multisample rasterization samples (power of two)
    #[serde(default = "default_max_samples")]
    pub max_rasterization_samples: u32,
    /// Run the usage pass over freshly created compute pipelines
    #[serde(default = "default_true")]
    pub compute_post_pass: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Round allocation sizes up to `allocation_alignment`
    #[serde(default = "default_true")]
    pub align_allocations: bool,
    /// Allocation granularity in bytes (power of two)
    #[serde(default = "default_alignment")]
    pub allocation_alignment: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionConfig {
    /// Classify queue submissions for bookkeeping
    #[serde(default = "default_true")]
    pub classify: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            rasterization_defaults: true,
            max_rasterization_samples: default_max_samples(),
            compute_post_pass: true,
        }
    }
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            align_allocations: true,
            allocation_alignment: default_alignment(),
        }
    }
}

impl Default for SubmissionConfig {
    fn default() -> Self {
        Self { classify: true }
    }
}

impl LayerConfig {
    /// Parse configuration from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self, LayerError> {
        let config: LayerConfig = toml::from_str(content)?;
        Ok(config.validated())
    }

    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, LayerError> {
        if path.is_dir() {
            return Err(LayerError::Config(format!(
                "{} is a directory, expected a TOML file",
                path.display()
            )));
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Load configuration from file if it exists, otherwise return defaults.
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            debug!("no layer config at {}, using defaults", path.display());
            return Self::default();
        }
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!("ignoring layer config {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Replace policy values the interceptors cannot honour with defaults.
    pub fn validated(mut self) -> Self {
        let alignment = self.memory.allocation_alignment;
        if !alignment.is_power_of_two() {
            warn!(
                "allocation_alignment {} is not a power of two, using {}",
                alignment,
                default_alignment()
            );
            self.memory.allocation_alignment = default_alignment();
        }

        let samples = self.pipelines.max_rasterization_samples;
        if !samples.is_power_of_two() || samples > 64 {
            warn!(
                "max_rasterization_samples {} is not a valid sample count, using {}",
                samples,
                default_max_samples()
            );
            self.pipelines.max_rasterization_samples = default_max_samples();
        }
        self
    }
}

/// Returns the config file path to read.
/// Search order:
/// 1. `XCLIPSE_LAYER_CONFIG` if set
/// 2. Platform locations from `xclipse_common::platform::config_search_paths`
/// 3. Local fallback: `./xclipse_layer.toml`
pub fn default_config_path() -> PathBuf {
    if let Ok(path) = std::env::var(platform::CONFIG_ENV) {
        return PathBuf::from(path);
    }
    platform::config_search_paths()
        .into_iter()
        .find(|p| p.exists())
        .unwrap_or_else(|| PathBuf::from(platform::CONFIG_FILE_NAME))
}

fn default_alignment() -> u64 {
    64
}

fn default_max_samples() -> u32 {
    4
}

fn default_true() -> bool {
    true
}
