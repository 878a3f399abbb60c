//! Configuration loading and root folder resolution

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable overriding the root folder
pub const ROOT_FOLDER_ENV: &str = "TEMPOKEY_ROOT_FOLDER";

/// Name of the persisted library snapshot inside the root folder
pub const LIBRARY_FILE_NAME: &str = "library.json";

/// Bootstrap configuration loaded from TOML file
///
/// Read once at startup. Every field has a built-in default so a missing or
/// partial file still yields a usable configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct TomlConfig {
    /// Root folder holding `input/`, `output/` and the library snapshot
    #[serde(default)]
    pub root_folder: Option<PathBuf>,

    /// HTTP server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// HTTP bind address
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Maximum accepted upload body size in bytes
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,

    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,

    /// External analyzer configuration (optional)
    #[serde(default)]
    pub analyzer: AnalyzerConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

/// External analyzer tool configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AnalyzerConfig {
    /// Extractor executable, looked up in PATH unless absolute
    #[serde(default = "default_analyzer_binary")]
    pub binary: String,
}

fn default_port() -> u16 {
    5731
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_max_upload_bytes() -> usize {
    512 * 1024 * 1024
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_analyzer_binary() -> String {
    "essentia_streaming_extractor_music".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            binary: default_analyzer_binary(),
        }
    }
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            root_folder: None,
            port: default_port(),
            bind_address: default_bind_address(),
            max_upload_bytes: default_max_upload_bytes(),
            logging: LoggingConfig::default(),
            analyzer: AnalyzerConfig::default(),
        }
    }
}

impl TomlConfig {
    /// Parse a TOML config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))
    }

    /// Load the config file, degrading to defaults on any problem
    ///
    /// An explicit path that cannot be read is reported; an absent default
    /// file is expected and only noted at info level.
    pub fn load_or_default(explicit: Option<&Path>) -> Self {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => match default_config_path() {
                Some(path) if path.exists() => path,
                _ => {
                    info!("No config file found, using built-in defaults");
                    return Self::default();
                }
            },
        };

        match Self::load(&path) {
            Ok(config) => {
                info!("Loaded config from {}", path.display());
                config
            }
            Err(e) => {
                warn!("{} ({}), using built-in defaults", e, path.display());
                Self::default()
            }
        }
    }
}

/// Platform config file location: `<config_dir>/tempokey/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("tempokey").join("config.toml"))
}

/// OS-dependent default root folder path
fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("tempokey"))
        .unwrap_or_else(|| PathBuf::from("./tempokey_data"))
}

/// Root folder resolution, in priority order:
/// 1. Command-line argument
/// 2. Environment variable
/// 3. TOML config file
/// 4. OS-dependent default
#[derive(Debug, Clone)]
pub struct RootFolderResolver {
    module_name: String,
    cli_arg: Option<PathBuf>,
    toml_root: Option<PathBuf>,
}

impl RootFolderResolver {
    pub fn new(module_name: &str) -> Self {
        Self {
            module_name: module_name.to_string(),
            cli_arg: None,
            toml_root: None,
        }
    }

    pub fn with_cli_arg(mut self, path: Option<PathBuf>) -> Self {
        self.cli_arg = path;
        self
    }

    pub fn with_toml(mut self, config: &TomlConfig) -> Self {
        self.toml_root = config.root_folder.clone();
        self
    }

    pub fn resolve(&self) -> PathBuf {
        if let Some(path) = &self.cli_arg {
            info!(module = %self.module_name, "Root folder from command line: {}", path.display());
            return path.clone();
        }

        if let Ok(path) = std::env::var(ROOT_FOLDER_ENV) {
            if !path.trim().is_empty() {
                info!(module = %self.module_name, "Root folder from {}: {}", ROOT_FOLDER_ENV, path);
                return PathBuf::from(path);
            }
        }

        if let Some(path) = &self.toml_root {
            info!(module = %self.module_name, "Root folder from config file: {}", path.display());
            return path.clone();
        }

        let path = default_root_folder();
        info!(module = %self.module_name, "Root folder from platform default: {}", path.display());
        path
    }
}

/// Creates and describes the on-disk layout under the root folder
#[derive(Debug, Clone)]
pub struct RootFolderInitializer {
    root_folder: PathBuf,
}

impl RootFolderInitializer {
    pub fn new(root_folder: PathBuf) -> Self {
        Self { root_folder }
    }

    /// Create the root, input and output directories if missing
    pub fn ensure_directory_exists(&self) -> Result<()> {
        for dir in [self.root_folder.clone(), self.input_dir(), self.output_dir()] {
            std::fs::create_dir_all(&dir).map_err(|e| {
                Error::Config(format!("Failed to create {}: {}", dir.display(), e))
            })?;
        }
        Ok(())
    }

    pub fn root_folder(&self) -> &Path {
        &self.root_folder
    }

    /// Directory holding the active upload
    pub fn input_dir(&self) -> PathBuf {
        self.root_folder.join("input")
    }

    /// Directory accumulating exported copies
    pub fn output_dir(&self) -> PathBuf {
        self.root_folder.join("output")
    }

    /// Persisted library snapshot
    pub fn library_path(&self) -> PathBuf {
        self.root_folder.join(LIBRARY_FILE_NAME)
    }
}
