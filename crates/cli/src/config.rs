//! Configuration management for the CLI

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// CLI configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// API endpoint URL
    pub api_url: Option<String>,
    /// Default namespace filter for metric queries
    pub default_namespace: Option<String>,
    /// Default output format
    pub default_format: Option<String>,
    /// Request timeout in seconds
    pub timeout_secs: Option<u64>,
}

impl Config {
    /// Load configuration from the config file, overlaid with COSTDASH_* env vars
    pub fn load() -> Result<Self> {
        let path = config_dir()?.join("config.json");
        Self::load_from(&path)
    }

    /// Load configuration from an explicit file path. A missing file is not an error.
    pub fn load_from(path: &Path) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(
                config::File::from(path)
                    .format(config::FileFormat::Json)
                    .required(false),
            )
            .add_source(config::Environment::with_prefix("COSTDASH"))
            .build()
            .context("Failed to read configuration")?;

        settings
            .try_deserialize()
            .context("Failed to parse configuration")
    }
}

/// Directory holding config.json and state.json
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs_next::home_dir().context("Could not determine home directory")?;
    Ok(home.join(".config").join("costdash"))
}

/// Path of the persisted client store
pub fn state_path() -> Result<PathBuf> {
    Ok(config_dir()?.join("state.json"))
}
