use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::encode::Quality;
use crate::storage::DEFAULT_KEY_PREFIX;

/// Top-level configuration for upright.
///
/// Controls how images are normalized, where they are stored, and where
/// the CLI writes its output.
///
/// # Loading
///
/// ```rust,no_run
/// use upright::config::{Config, StorageBackend};
///
/// // From a JSON file
/// let config = Config::load(Some("config.json".as_ref())).unwrap();
///
/// // Or use defaults and customize
/// let mut config = Config::default();
/// config.storage.backend = StorageBackend::Directory;
/// config.storage.directory = "./uploads".into();
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Orientation correction and re-encoding.
    pub normalize: NormalizeConfig,
    /// Where uploaded images go.
    pub storage: StorageConfig,
    /// Local output behavior (output directory, dry run).
    pub output: OutputConfig,
}

/// Normalization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizeConfig {
    /// JPEG quality factor in (0, 1].
    pub quality: Quality,
    /// If `true`, images that need no correction are passed through untouched
    /// instead of being re-encoded.
    pub passthrough_upright: bool,
    /// Reject inputs larger than this many bytes.
    pub max_input_bytes: Option<usize>,
}

/// Which storage backend uploads go to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// No uploads.
    #[default]
    None,
    /// Files under [`StorageConfig::directory`].
    Directory,
    /// `PUT` to [`StorageConfig::endpoint`].
    Http,
}

/// Storage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// Root directory for the `directory` backend.
    pub directory: String,
    /// Base URL for the `http` backend.
    pub endpoint: String,
    /// Bearer token for the `http` backend. Empty means no auth header.
    pub token: String,
    /// Object key prefix, e.g. `Images/Events`.
    pub key_prefix: String,
}

/// Output behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory to write normalized files into. `None` keeps them in memory.
    pub out_dir: Option<String>,
    /// Appended to the file stem of written files.
    pub suffix: String,
    /// If `true`, report what would happen without writing or uploading.
    pub dry_run: bool,
}

impl Default for NormalizeConfig {
    fn default() -> Self {
        Self {
            quality: Quality::DEFAULT,
            passthrough_upright: false,
            max_input_bytes: None,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::None,
            directory: "uploads".to_string(),
            endpoint: String::new(),
            token: String::new(),
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            out_dir: None,
            suffix: "-upright".to_string(),
            dry_run: false,
        }
    }
}

impl Config {
    /// Resolve the config file path, in the same directory as the executable.
    pub fn config_path() -> Result<PathBuf> {
        let exe_path = std::env::current_exe().context("Failed to get executable path")?;
        let exe_dir = exe_path
            .parent()
            .context("Failed to get executable directory")?;
        Ok(exe_dir.join("config.json"))
    }

    /// Load config from the given path, or from the default location.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::config_path()?,
        };

        if !config_path.exists() {
            log::warn!(
                "Config file not found at {}. Using defaults.",
                config_path.display()
            );
            return Ok(Self::default());
        }

        let contents =
            std::fs::read_to_string(&config_path).context("Failed to read config file")?;
        let config: Config =
            serde_json::from_str(&contents).context("Failed to parse config file")?;
        Ok(config)
    }

    /// Save config to the given path, or to the default location.
    pub fn save(&self, path: Option<&Path>) -> Result<()> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::config_path()?,
        };

        let contents = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(&config_path, contents).context("Failed to write config file")?;
        log::info!("Config saved to {}", config_path.display());
        Ok(())
    }
}
