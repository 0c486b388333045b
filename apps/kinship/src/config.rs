//! # App Configuration
//!
//! Optional TOML file with two tables:
//!
//! ```toml
//! [engine]
//! suggestion_depth = 3
//! transplant_attempts = 3
//!
//! [storage]
//! database = "family.redb"
//! ```
//!
//! Missing tables and fields fall back to defaults. Command-line flags win
//! over file values.

use kinship_core::{EngineConfig, KinshipError};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// File read when `--config` is not given, if it exists.
pub const DEFAULT_CONFIG_FILE: &str = "kinship.toml";

/// Database used when neither the flag nor the file names one.
pub const DEFAULT_DATABASE: &str = "kinship.redb";

/// Maximum config file size (1 MB).
const MAX_CONFIG_FILE_SIZE: u64 = 1024 * 1024;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    pub database: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub engine: EngineConfig,
    pub storage: StorageConfig,
}

impl AppConfig {
    pub fn from_toml(text: &str) -> Result<Self, KinshipError> {
        toml::from_str(text).map_err(|e| KinshipError::Serialization(format!("config: {}", e)))
    }

    /// Read `path`, or `kinship.toml` when `None`.
    ///
    /// An explicit path must exist; the default file is optional.
    pub fn load(path: Option<&Path>) -> Result<Self, KinshipError> {
        let (path, required) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
        };
        if !path.exists() {
            if required {
                return Err(KinshipError::Storage(format!(
                    "Config file '{}' not found",
                    path.display()
                )));
            }
            return Ok(Self::default());
        }

        let metadata = std::fs::metadata(&path)
            .map_err(|e| KinshipError::Storage(format!("Cannot read config metadata: {}", e)))?;
        if metadata.len() > MAX_CONFIG_FILE_SIZE {
            return Err(KinshipError::Serialization(format!(
                "Config file size {} bytes exceeds maximum allowed {} bytes",
                metadata.len(),
                MAX_CONFIG_FILE_SIZE
            )));
        }
        let text = std::fs::read_to_string(&path)
            .map_err(|e| KinshipError::Storage(format!("Read config: {}", e)))?;
        tracing::debug!(path = %path.display(), "config loaded");
        Self::from_toml(&text)
    }

    /// Database path: flag, then file, then the default.
    pub fn database(&self, flag: Option<&Path>) -> PathBuf {
        flag.map(Path::to_path_buf)
            .or_else(|| self.storage.database.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATABASE))
    }

    /// Engine config with a command-line depth override applied.
    pub fn engine(&self, depth: Option<usize>) -> EngineConfig {
        let mut engine = self.engine;
        if let Some(d) = depth {
            engine.suggestion_depth = d;
        }
        engine.clamped()
    }
}
