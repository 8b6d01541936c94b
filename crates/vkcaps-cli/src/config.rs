//! Configuration loading

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;
use vkcaps_core::FilterRules;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub rules: FilterRules,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputConfig {
    /// Registry document (`vk.xml`)
    #[serde(default = "default_registry")]
    pub registry: PathBuf,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            registry: default_registry(),
        }
    }
}

fn default_registry() -> PathBuf {
    PathBuf::from("registry/vk.xml")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Generated Rust module
    #[serde(default = "default_module")]
    pub module: PathBuf,
    /// Generated traversal header
    #[serde(default = "default_header")]
    pub header: PathBuf,
    /// Model dump, skipped when unset
    #[serde(default)]
    pub model_json: Option<PathBuf>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            module: default_module(),
            header: default_header(),
            model_json: None,
        }
    }
}

fn default_module() -> PathBuf {
    PathBuf::from("out/vk_registry.rs")
}

fn default_header() -> PathBuf {
    PathBuf::from("out/vkjson.h")
}

/// Load configuration from file, falling back to defaults when it is absent
pub fn load_config(path: &Path) -> Result<Config> {
    if path.exists() {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Invalid configuration {}", path.display()))?;
        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    } else {
        info!(
            path = %path.display(),
            "Configuration file not found, using defaults"
        );
        Ok(Config::default())
    }
}
