//! Configuration loading and root folder resolution
//!
//! Bootstrap settings come from a per-module TOML file. A missing file is not
//! an error: the module logs a warning and starts on compiled defaults.
//!
//! Root folder priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable `DEEPSEA_ROOT_FOLDER`
//! 3. TOML config file (`root_folder`)
//! 4. OS-dependent compiled default (fallback)

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Environment variable overriding the root folder
pub const ROOT_FOLDER_ENV: &str = "DEEPSEA_ROOT_FOLDER";

/// File name of the enrichment cache database inside the root folder
pub const CACHE_DATABASE_FILE: &str = "species_cache.db";

/// Bootstrap configuration loaded from a module's TOML file
///
/// Every field is optional so that a partial file (or no file at all) still
/// yields a usable configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct TomlConfig {
    /// Folder holding the cache database
    #[serde(default)]
    pub root_folder: Option<PathBuf>,

    /// Path to the species dataset (JSON array of records)
    #[serde(default)]
    pub dataset_path: Option<PathBuf>,

    /// HTTP server port
    #[serde(default)]
    pub port: Option<u16>,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// External catalog endpoints
    #[serde(default)]
    pub sources: SourcesToml,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// External catalog settings as written in TOML
///
/// Unset fields fall back to the public service endpoints when the
/// enrichment module resolves its runtime settings.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct SourcesToml {
    /// Encyclopedia (Wikipedia) base URL
    #[serde(default)]
    pub wikipedia_url: Option<String>,
    /// Knowledge base (Wikidata) base URL
    #[serde(default)]
    pub wikidata_url: Option<String>,
    /// Observation catalog (iNaturalist) API base URL
    #[serde(default)]
    pub inaturalist_api_url: Option<String>,
    /// Observation catalog (iNaturalist) website base URL, used for links
    #[serde(default)]
    pub inaturalist_site_url: Option<String>,
    /// Per-request timeout in seconds
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
    /// User-Agent sent to every catalog
    #[serde(default)]
    pub user_agent: Option<String>,
}

/// Compiled defaults used when nothing else is configured
#[derive(Debug, Clone)]
pub struct CompiledDefaults {
    pub root_folder: PathBuf,
}

impl CompiledDefaults {
    /// Defaults for the platform this binary was built for
    pub fn for_current_platform() -> Self {
        Self {
            root_folder: default_root_folder(),
        }
    }
}

/// Get OS-dependent default root folder path
fn default_root_folder() -> PathBuf {
    if cfg!(target_os = "linux") {
        // ~/.local/share/deepsea (or /var/lib/deepsea for system-wide)
        dirs::data_local_dir()
            .map(|d| d.join("deepsea"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/deepsea"))
    } else if cfg!(target_os = "macos") {
        dirs::data_dir()
            .map(|d| d.join("deepsea"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/deepsea"))
    } else if cfg!(target_os = "windows") {
        dirs::data_local_dir()
            .map(|d| d.join("deepsea"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\deepsea"))
    } else {
        PathBuf::from("./deepsea_data")
    }
}

/// Default TOML path for a module: `<config dir>/deepsea/<module>.toml`
pub fn default_config_path(module_name: &str) -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("deepsea").join(format!("{}.toml", module_name)))
}

/// Load a module's TOML configuration
///
/// A missing file logs a warning and returns defaults. A file that exists but
/// cannot be read or parsed is a configuration error.
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    if !path.exists() {
        warn!(
            "Config file {} not found, starting with compiled defaults",
            path.display()
        );
        return Ok(TomlConfig::default());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read TOML failed: {}", e)))?;
    let config: TomlConfig = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))?;

    info!("Loaded configuration from {}", path.display());
    Ok(config)
}

/// Resolves the root folder from CLI, environment, TOML and defaults
pub struct RootFolderResolver {
    module_name: String,
    cli_arg: Option<PathBuf>,
    toml_value: Option<PathBuf>,
}

impl RootFolderResolver {
    pub fn new(module_name: impl Into<String>) -> Self {
        Self {
            module_name: module_name.into(),
            cli_arg: None,
            toml_value: None,
        }
    }

    /// Highest-priority override from the command line
    pub fn with_cli_arg(mut self, path: Option<PathBuf>) -> Self {
        self.cli_arg = path;
        self
    }

    /// Value read from the module's TOML file
    pub fn with_toml_value(mut self, path: Option<PathBuf>) -> Self {
        self.toml_value = path;
        self
    }

    pub fn resolve(&self) -> PathBuf {
        if let Some(path) = &self.cli_arg {
            debug!(module = %self.module_name, "Root folder from command line");
            return path.clone();
        }

        if let Ok(path) = std::env::var(ROOT_FOLDER_ENV) {
            if !path.trim().is_empty() {
                debug!(module = %self.module_name, "Root folder from {}", ROOT_FOLDER_ENV);
                return PathBuf::from(path);
            }
        }

        if let Some(path) = &self.toml_value {
            debug!(module = %self.module_name, "Root folder from TOML config");
            return path.clone();
        }

        CompiledDefaults::for_current_platform().root_folder
    }
}

/// Creates the root folder and locates files inside it
pub struct RootFolderInitializer {
    root_folder: PathBuf,
}

impl RootFolderInitializer {
    pub fn new(root_folder: PathBuf) -> Self {
        Self { root_folder }
    }

    /// Create the root folder if missing
    pub fn ensure_directory_exists(&self) -> Result<()> {
        if !self.root_folder.exists() {
            info!("Creating root folder: {}", self.root_folder.display());
            std::fs::create_dir_all(&self.root_folder)?;
        }
        Ok(())
    }

    /// Path of the enrichment cache database
    pub fn cache_database_path(&self) -> PathBuf {
        self.root_folder.join(CACHE_DATABASE_FILE)
    }

    pub fn root_folder(&self) -> &Path {
        &self.root_folder
    }
}
