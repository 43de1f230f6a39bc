//! Application configuration: a JSON file plus environment overrides.

use filedeck_core::{RemoteError, RemoteResult};
use filedeck_ftp::ftp::DataChannelMode;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub ftp: FtpDefaults,
    pub sftp: SftpDefaults,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    /// Request body cap for batch uploads.
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".into(),
            port: 3001,
            max_upload_bytes: 512 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingConfig {
    /// `EnvFilter` directives; `RUST_LOG` wins when set.
    pub filter: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".into(),
            json: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FtpDefaults {
    pub connect_timeout_secs: u64,
    pub data_timeout_secs: u64,
    pub data_channel_mode: DataChannelMode,
    pub accept_invalid_certs: bool,
}

impl Default for FtpDefaults {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 30,
            data_timeout_secs: 60,
            data_channel_mode: DataChannelMode::Passive,
            accept_invalid_certs: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SftpDefaults {
    pub timeout_secs: u64,
    pub keepalive_interval_secs: u64,
}

impl Default for SftpDefaults {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            keepalive_interval_secs: 0,
        }
    }
}

impl AppConfig {
    /// `FILEDECK_CONFIG`, else `<config dir>/filedeck/config.json`.
    pub fn default_path() -> Option<PathBuf> {
        std::env::var_os("FILEDECK_CONFIG")
            .map(PathBuf::from)
            .or_else(|| dirs::config_dir().map(|d| d.join("filedeck").join("config.json")))
    }

    /// Load from the default path and apply environment overrides.
    pub fn load() -> RemoteResult<Self> {
        let mut config = match Self::default_path() {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// A missing file means defaults.
    pub fn from_file(path: &Path) -> RemoteResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path).map_err(|e| {
            RemoteError::config(format!("Cannot read config {}: {}", path.display(), e))
        })?;
        serde_json::from_str(&raw).map_err(|e| {
            RemoteError::config(format!("Invalid config {}: {}", path.display(), e))
        })
    }

    pub fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) -> RemoteResult<()> {
        if let Some(port) = var("FILEDECK_PORT").or_else(|| var("PORT")) {
            self.server.port = port
                .trim()
                .parse()
                .map_err(|_| RemoteError::config(format!("Invalid port override '{}'", port)))?;
        }
        if let Some(bind) = var("FILEDECK_BIND") {
            self.server.bind_address = bind;
        }
        if let Some(filter) = var("FILEDECK_LOG") {
            self.logging.filter = filter;
        }
        Ok(())
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.server.bind_address, self.server.port)
    }
}
