//! Store configuration via `stash.toml`
//!
//! A registry opened on a directory reads `stash.toml` from it, creating a
//! commented default file on first open. To change settings, edit the file
//! and restart.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use stash_core::{Error, Result};
use stash_storage::{get_codec, StorageCodec, DEFAULT_COMPRESSION_LEVEL};
use tracing::warn;

/// Config file name placed in the data directory.
pub const CONFIG_FILE_NAME: &str = "stash.toml";

/// Data directory used when nothing else is configured.
pub const DEFAULT_DATA_DIR: &str = "stash-data";

/// Environment variable overriding the data directory.
pub const ENV_DATA_DIR: &str = "STASH_DATA_DIR";

/// Environment variable overriding the save delay in milliseconds.
pub const ENV_SAVE_DELAY_MS: &str = "STASH_SAVE_DELAY_MS";

/// Store configuration loaded from `stash.toml`.
///
/// # Example
///
/// ```toml
/// # Quiet period after the last mutation before a collection is saved
/// save_delay_ms = 1000
///
/// # Codec for persisted collections: "zstd" (default) or "identity"
/// codec = "zstd"
/// compression_level = 3
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StashConfig {
    /// Directory holding one blob per collection. Not stored in the file;
    /// it is the directory the file lives in.
    #[serde(skip, default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Debounce delay in milliseconds.
    #[serde(default = "default_save_delay_ms")]
    pub save_delay_ms: u64,
    /// Codec identifier: `"zstd"` or `"identity"`.
    #[serde(default = "default_codec")]
    pub codec: String,
    /// Zstd compression level (1..=22). Ignored by other codecs.
    #[serde(default = "default_compression_level")]
    pub compression_level: i32,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from(DEFAULT_DATA_DIR)
}

fn default_save_delay_ms() -> u64 {
    1000
}

fn default_codec() -> String {
    "zstd".to_string()
}

fn default_compression_level() -> i32 {
    DEFAULT_COMPRESSION_LEVEL
}

impl Default for StashConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            save_delay_ms: default_save_delay_ms(),
            codec: default_codec(),
            compression_level: default_compression_level(),
        }
    }
}

impl StashConfig {
    /// Default configuration rooted at `data_dir`.
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Self::default()
        }
    }

    /// Debounce delay as a `Duration`.
    pub fn save_delay(&self) -> Duration {
        Duration::from_millis(self.save_delay_ms)
    }

    /// Check codec id and compression level.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` for an unknown codec or an out-of-range level.
    pub fn validate(&self) -> Result<()> {
        match self.codec.as_str() {
            "identity" => Ok(()),
            "zstd" if (1..=22).contains(&self.compression_level) => Ok(()),
            "zstd" => Err(Error::Config(format!(
                "Invalid compression_level {} in {}. Expected 1..=22.",
                self.compression_level, CONFIG_FILE_NAME
            ))),
            other => Err(Error::Config(format!(
                "Invalid codec '{}' in {}. Expected \"zstd\" or \"identity\".",
                other, CONFIG_FILE_NAME
            ))),
        }
    }

    /// Build the configured codec.
    pub fn build_codec(&self) -> Result<Arc<dyn StorageCodec>> {
        self.validate()?;
        let codec = get_codec(&self.codec, self.compression_level)
            .map_err(|e| Error::Config(e.to_string()))?;
        Ok(Arc::from(codec))
    }

    /// Defaults overridden by `STASH_DATA_DIR` and `STASH_SAVE_DELAY_MS`.
    ///
    /// An unparsable delay is ignored with a warning.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(dir) = std::env::var_os(ENV_DATA_DIR) {
            config.data_dir = PathBuf::from(dir);
        }
        if let Ok(raw) = std::env::var(ENV_SAVE_DELAY_MS) {
            match raw.trim().parse::<u64>() {
                Ok(ms) => config.save_delay_ms = ms,
                Err(e) => warn!(
                    target: "stash::config",
                    value = %raw,
                    error = %e,
                    "Ignoring invalid {}", ENV_SAVE_DELAY_MS
                ),
            }
        }
        config
    }

    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# Stash configuration
#
# Quiet period (milliseconds) after the last mutation before a collection
# is written to disk. Bursts of writes inside this window become one save.
save_delay_ms = 1000

# Codec for persisted collections: "zstd" (default) or "identity"
codec = "zstd"

# Zstd compression level, 1..=22 (default: 3)
compression_level = 3
"#
    }

    /// Read and parse config from a file path.
    ///
    /// `data_dir` is set to the directory containing the file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or validated.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        let mut config: StashConfig = toml::from_str(&content).map_err(|e| {
            Error::Config(format!(
                "Failed to parse config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        if let Some(dir) = path.parent() {
            config.data_dir = dir.to_path_buf();
        }
        config.validate()?;
        Ok(config)
    }

    /// Write the default config file if it does not already exist.
    pub fn write_default_if_missing(path: &Path) -> Result<()> {
        if !path.exists() {
            std::fs::write(path, Self::default_toml()).map_err(|e| {
                Error::Config(format!(
                    "Failed to write default config file '{}': {}",
                    path.display(),
                    e
                ))
            })?;
        }
        Ok(())
    }

    /// Serialize this config to TOML and write it to the given path.
    pub fn write_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content).map_err(|e| {
            Error::Config(format!(
                "Failed to write config file '{}': {}",
                path.display(),
                e
            ))
        })
    }
}
