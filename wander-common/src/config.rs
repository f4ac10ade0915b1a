//! Configuration loading and data folder resolution
//!
//! Every setting resolves in the same priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! A missing or unreadable config file never aborts startup: it is logged and
//! the compiled defaults apply.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Environment variable overriding the recommendation service URL
pub const SERVICE_URL_ENV: &str = "WANDER_SERVICE_URL";
/// Environment variable overriding the data folder
pub const DATA_FOLDER_ENV: &str = "WANDER_DATA_FOLDER";

const DEFAULT_SERVICE_URL: &str = "http://127.0.0.1:8000";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Contents of `config.toml`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Base URL of the recommendation service
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_url: Option<String>,

    /// Upper bound on each remote call, in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout_secs: Option<u64>,

    /// Folder holding the favorites slot
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_folder: Option<PathBuf>,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Built-in defaults for the current platform
#[derive(Debug, Clone)]
pub struct CompiledDefaults {
    pub service_url: String,
    pub request_timeout: Duration,
    pub data_folder: PathBuf,
    pub log_level: String,
}

impl CompiledDefaults {
    pub fn for_current_platform() -> Self {
        Self {
            service_url: DEFAULT_SERVICE_URL.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            data_folder: default_data_folder(),
            log_level: default_log_level(),
        }
    }
}

/// OS-dependent default data folder
pub fn default_data_folder() -> PathBuf {
    if cfg!(target_os = "linux") {
        // ~/.local/share/wander
        dirs::data_local_dir()
            .map(|d| d.join("wander"))
            .unwrap_or_else(|| PathBuf::from("./wander_data"))
    } else if cfg!(target_os = "macos") {
        // ~/Library/Application Support/wander
        dirs::data_dir()
            .map(|d| d.join("wander"))
            .unwrap_or_else(|| PathBuf::from("./wander_data"))
    } else if cfg!(target_os = "windows") {
        // %LOCALAPPDATA%\wander
        dirs::data_local_dir()
            .map(|d| d.join("wander"))
            .unwrap_or_else(|| PathBuf::from("./wander_data"))
    } else {
        PathBuf::from("./wander_data")
    }
}

/// Locate the config file for the platform
///
/// Linux checks `~/.config/wander/config.toml` first, then
/// `/etc/wander/config.toml`. Returns `None` when neither exists.
pub fn find_config_file() -> Option<PathBuf> {
    let user_config = user_config_path();
    if let Some(path) = &user_config {
        if path.exists() {
            return user_config;
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/wander/config.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

/// Per-user config file location, whether or not it exists
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("wander").join("config.toml"))
}

/// Read and parse a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
}

/// Load the config file, degrading to defaults on any failure
///
/// An explicit `path` is used as given; otherwise the platform locations are
/// searched.
pub fn load_toml_config_or_default(path: Option<&Path>) -> TomlConfig {
    let path = match path.map(Path::to_path_buf).or_else(find_config_file) {
        Some(path) => path,
        None => {
            info!("No config file found, using defaults");
            return TomlConfig::default();
        }
    };

    match load_toml_config(&path) {
        Ok(config) => {
            info!("Loaded configuration from {}", path.display());
            config
        }
        Err(e) => {
            warn!("{}; using defaults", e);
            TomlConfig::default()
        }
    }
}

/// Write a TOML config file atomically
pub fn write_toml_config(config: &TomlConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Serialize TOML failed: {}", e)))?;
    atomic_write(path, content.as_bytes())
}

/// Replace `path` with `contents` via a temp file and rename
///
/// Readers see either the old contents or the new ones, never a partial write.
/// Missing parent directories are created.
pub fn atomic_write(path: &Path, contents: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let mut temp_name = path.as_os_str().to_owned();
    temp_name.push(".tmp");
    let temp_path = PathBuf::from(temp_name);

    {
        let mut file = std::fs::File::create(&temp_path)?;
        file.write_all(contents)?;
        file.sync_all()?;
    }

    if let Err(e) = std::fs::rename(&temp_path, path) {
        let _ = std::fs::remove_file(&temp_path);
        return Err(e.into());
    }

    Ok(())
}

/// Command-line overrides, highest priority
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub service_url: Option<String>,
    pub request_timeout_secs: Option<u64>,
    pub data_folder: Option<PathBuf>,
    pub log_level: Option<String>,
}

/// Fully resolved client settings
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub service_url: String,
    pub request_timeout: Duration,
    pub data_folder: PathBuf,
    pub logging: LoggingConfig,
}

impl ResolvedConfig {
    /// Apply CLI → environment → TOML → default priority to each setting
    pub fn resolve(overrides: ConfigOverrides, toml_config: &TomlConfig) -> Self {
        let defaults = CompiledDefaults::for_current_platform();

        let service_url = overrides
            .service_url
            .or_else(|| non_empty_env(SERVICE_URL_ENV))
            .or_else(|| toml_config.service_url.clone())
            .unwrap_or(defaults.service_url);

        let data_folder = overrides
            .data_folder
            .or_else(|| non_empty_env(DATA_FOLDER_ENV).map(PathBuf::from))
            .or_else(|| toml_config.data_folder.clone())
            .unwrap_or(defaults.data_folder);

        let request_timeout = overrides
            .request_timeout_secs
            .or(toml_config.request_timeout_secs)
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
            .unwrap_or(defaults.request_timeout);

        let mut logging = toml_config.logging.clone();
        if let Some(level) = overrides.log_level {
            logging.level = level;
        }

        Self {
            service_url: service_url.trim_end_matches('/').to_string(),
            request_timeout,
            data_folder,
            logging,
        }
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}
