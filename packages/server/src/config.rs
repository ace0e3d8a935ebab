//! Engine configuration.
//!
//! Defaults are embedded from `config/engine.toml`. Setting
//! `AIS_MAP_CONFIG` to a path loads that file instead; keys it leaves out
//! keep their defaults.

use std::path::{Path, PathBuf};

use ais_map_dataset::DatasetConfig;
use ais_map_spatial::{FootprintConfig, FramingConfig};
use serde::{Deserialize, Serialize};

/// Environment variable holding the path of an engine config file.
pub const CONFIG_PATH_ENV: &str = "AIS_MAP_CONFIG";

const EMBEDDED_CONFIG: &str = include_str!("../config/engine.toml");

/// Errors loading the engine configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("Failed to read config file {}: {source}", .path.display())]
    Io {
        /// Path that was read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid TOML for [`EngineConfig`].
    #[error("Invalid engine config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Tunables of every engine component.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Map framing.
    pub framing: FramingConfig,
    /// Footprint calibration.
    pub footprint: FootprintConfig,
    /// Assembly and display filters.
    pub dataset: DatasetConfig,
}

impl EngineConfig {
    /// Parses a TOML document.
    ///
    /// # Errors
    ///
    /// * [`ConfigError::Parse`] if the document is malformed.
    pub fn parse(input: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(input)?)
    }

    /// The embedded defaults.
    ///
    /// # Errors
    ///
    /// * [`ConfigError::Parse`] if the embedded file is malformed.
    pub fn embedded() -> Result<Self, ConfigError> {
        Self::parse(EMBEDDED_CONFIG)
    }

    /// Reads and parses the file at `path`.
    ///
    /// # Errors
    ///
    /// * [`ConfigError::Io`] if the file cannot be read.
    /// * [`ConfigError::Parse`] if it is malformed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let input = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&input)
    }

    /// Loads the file named by `AIS_MAP_CONFIG`, or the embedded defaults
    /// when it is unset.
    ///
    /// # Errors
    ///
    /// Propagates [`ConfigError`] from [`Self::from_file`] or
    /// [`Self::embedded`].
    pub fn load() -> Result<Self, ConfigError> {
        match std::env::var_os(CONFIG_PATH_ENV) {
            Some(path) => {
                let path = PathBuf::from(path);
                log::info!("Loading engine config from {}", path.display());
                Self::from_file(&path)
            }
            None => Self::embedded(),
        }
    }
}
