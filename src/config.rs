//! Settings for the command-line tools
//!
//! Loaded in layers, later ones winning:
//! - Default values
//! - Config file (skaffold-schema.toml)
//! - User config directory
//! - An explicit `--config` file
//! - Environment variables (SKAFFOLD_SCHEMA__*)
//!
//! ## Example config file (skaffold-schema.toml):
//! ```toml
//! [parse]
//! default_filename = "skaffold.yaml"
//!
//! [fix]
//! overwrite = false
//! show_diff = true
//!
//! [scan]
//! max_depth = 8
//! skip_dirs = [".git", "node_modules", "target", "vendor"]
//!
//! [logging]
//! filter = "warn"
//! ```

use std::path::PathBuf;

use config_crate::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

/// Main configuration for the schema tools
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolConfig {
    #[serde(default)]
    pub parse: ParseConfig,

    #[serde(default)]
    pub fix: FixConfig,

    #[serde(default)]
    pub scan: ScanConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParseConfig {
    /// File read when no path is given
    #[serde(default = "default_filename")]
    pub default_filename: PathBuf,
}

/// Behaviour of `schema-fix upgrade`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixConfig {
    /// Write the upgraded config back instead of printing it
    #[serde(default)]
    pub overwrite: bool,

    /// Print a unified diff of what the upgrade changed
    #[serde(default = "default_true")]
    pub show_diff: bool,
}

/// Behaviour of `schema-fix scan`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    /// Directory names never descended into
    #[serde(default = "default_skip_dirs")]
    pub skip_dirs: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `tracing` filter used when RUST_LOG is unset
    #[serde(default = "default_filter")]
    pub filter: String,
}

fn default_filename() -> PathBuf {
    PathBuf::from("skaffold.yaml")
}

fn default_true() -> bool {
    true
}

fn default_max_depth() -> usize {
    8
}

fn default_skip_dirs() -> Vec<String> {
    [".git", "node_modules", "target", "vendor"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_filter() -> String {
    "warn".to_string()
}

impl Default for ParseConfig {
    fn default() -> Self {
        Self {
            default_filename: default_filename(),
        }
    }
}

impl Default for FixConfig {
    fn default() -> Self {
        Self {
            overwrite: false,
            show_diff: true,
        }
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
            skip_dirs: default_skip_dirs(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_filter(),
        }
    }
}

impl ToolConfig {
    /// Load configuration, adding a required file on top of the defaults
    pub fn load_from(config_path: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        for location in [
            "skaffold-schema.toml",
            ".skaffold-schema.toml",
            "config/skaffold-schema.toml",
        ] {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        if let Some(user_config) = Self::user_config_path() {
            if user_config.exists() {
                builder = builder.add_source(File::from(user_config).required(false));
            }
        }

        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // SKAFFOLD_SCHEMA__FIX__OVERWRITE=true
        builder = builder.add_source(
            Environment::with_prefix("SKAFFOLD_SCHEMA")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }

    /// Where the per-user config file lives on this platform
    pub fn user_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("dev", "skaffold", "skaffold-schema")
            .map(|dirs| dirs.config_dir().join("skaffold-schema.toml"))
    }

    /// Save configuration to a file
    pub fn save(&self, path: &str) -> std::io::Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)
    }

    /// Sanity checks `config_crate` cannot express
    pub fn validate(&self) -> Result<(), String> {
        if self.parse.default_filename.as_os_str().is_empty() {
            return Err("parse.default_filename must not be empty".to_string());
        }
        if self.scan.max_depth == 0 {
            return Err("scan.max_depth must be at least 1".to_string());
        }
        if self.logging.filter.trim().is_empty() {
            return Err("logging.filter must not be empty".to_string());
        }
        Ok(())
    }
}
