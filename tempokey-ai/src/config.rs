//! Runtime configuration for tempokey-ai
//!
//! Built once at startup from the resolved root folder, the bootstrap TOML
//! file and command-line overrides. Cannot change while running.

use std::net::SocketAddr;
use std::path::PathBuf;
use tempokey_common::config::{RootFolderInitializer, TomlConfig};
use tempokey_common::{Error, Result};

/// Resolved service configuration
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Root folder containing the data layout
    pub root_folder: PathBuf,
    /// Directory holding the active upload
    pub input_dir: PathBuf,
    /// Directory holding exported copies
    pub output_dir: PathBuf,
    /// Library snapshot file
    pub library_path: PathBuf,
    /// HTTP bind address
    pub bind_address: String,
    /// HTTP port
    pub port: u16,
    /// Upload body limit in bytes
    pub max_upload_bytes: usize,
    /// Analyzer executable
    pub analyzer_binary: String,
}

impl ServiceConfig {
    /// Combine the data layout under `root_folder` with TOML settings
    pub fn new(root_folder: PathBuf, toml: &TomlConfig) -> Self {
        let layout = RootFolderInitializer::new(root_folder.clone());
        Self {
            input_dir: layout.input_dir(),
            output_dir: layout.output_dir(),
            library_path: layout.library_path(),
            root_folder,
            bind_address: toml.bind_address.clone(),
            port: toml.port,
            max_upload_bytes: toml.max_upload_bytes,
            analyzer_binary: toml.analyzer.binary.clone(),
        }
    }

    /// Defaults for everything except the root folder
    pub fn for_root(root_folder: PathBuf) -> Self {
        Self::new(root_folder, &TomlConfig::default())
    }

    pub fn with_port(mut self, port: Option<u16>) -> Self {
        if let Some(port) = port {
            self.port = port;
        }
        self
    }

    pub fn with_bind_address(mut self, bind_address: Option<String>) -> Self {
        if let Some(bind_address) = bind_address {
            self.bind_address = bind_address;
        }
        self
    }

    /// Socket address to listen on
    pub fn listen_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.bind_address, self.port)
            .parse()
            .map_err(|e| {
                Error::Config(format!(
                    "Invalid listen address {}:{}: {}",
                    self.bind_address, self.port, e
                ))
            })
    }
}
