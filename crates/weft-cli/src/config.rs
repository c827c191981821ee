//! Application configuration.
//!
//! [`AppConfig`] is loaded once at startup and passed down by value. The
//! core and adapter crates never see it.
//!
//! # Resolution order (highest priority first)
//!
//! 1. CLI flags (applied by each command)
//! 2. Environment variables: `WEFT_` prefix, `__` between sections,
//!    e.g. `WEFT_PROXY__MODE=subclass`
//! 3. Config file (`--config`, or the platform config directory)
//! 4. Built-in defaults

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use serde::{Deserialize, Serialize};
use tracing::debug;

use weft_core::domain::ProxyMode;

const ENV_PREFIX: &str = "WEFT";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub catalog: CatalogConfig,
    pub aspects: AspectsConfig,
    pub proxy: ProxyConfig,
    pub output: OutputConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Directories or files holding `*.toml` type manifests.
    pub paths: Vec<PathBuf>,
    pub include_builtins: bool,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            paths: Vec::new(),
            include_builtins: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AspectsConfig {
    /// Directories or files holding `*.toml` aspect manifests.
    pub paths: Vec<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    pub mode: ProxyMode,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub no_color: bool,
    pub format: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            no_color: false,
            format: "human".into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Empty means no log file.
    pub file: String,
}

impl LoggingConfig {
    pub fn file(&self) -> Option<&Path> {
        (!self.file.trim().is_empty()).then(|| Path::new(&self.file))
    }
}

impl AppConfig {
    /// Layer defaults, the config file and the environment.
    ///
    /// An explicit `config_file` must exist when `required` is set; the
    /// default location is always optional.
    pub fn load(config_file: Option<&Path>, required: bool) -> anyhow::Result<Self> {
        use ::config::{Config, Environment, File};

        let (path, required) = match config_file {
            Some(path) => (path.to_path_buf(), required),
            None => (Self::config_path(), false),
        };
        debug!(path = %path.display(), required, "Loading configuration");

        let settings = Config::builder()
            .add_source(File::from(path.as_path()).required(required))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .with_context(|| format!("reading configuration from {}", path.display()))?;

        settings
            .try_deserialize()
            .with_context(|| format!("invalid configuration in {}", path.display()))
    }

    /// Default configuration file location.
    ///
    /// Uses `directories::ProjectDirs`, falling back to `.weft.toml` in the
    /// current directory.
    pub fn config_path() -> PathBuf {
        directories::ProjectDirs::from("dev", "weft", "weft")
            .map(|d| d.config_dir().join("config.toml"))
            .unwrap_or_else(|| PathBuf::from(".weft.toml"))
    }

    /// The file `load` read from for the given `--config` value.
    pub fn active_path(config_file: Option<&Path>) -> PathBuf {
        config_file
            .map(Path::to_path_buf)
            .unwrap_or_else(Self::config_path)
    }
}
