//! Shared types for the FTP crate.

use filedeck_core::{RemoteError, RemoteResult};
use serde::{Deserialize, Serialize};

// ─── Connection ──────────────────────────────────────────────────────

/// Security mode for the control channel.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum FtpSecurityMode {
    /// Plain-text FTP.
    #[default]
    None,
    /// Explicit FTPS: starts plain, upgrades via AUTH TLS, data channels
    /// protected with PROT P.
    Explicit,
}

/// Transfer mode selected for the data channel.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum DataChannelMode {
    #[default]
    Passive,
    ExtendedPassive,
    Active,
    ExtendedActive,
}

/// Configuration for a single FTP connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FtpConnectionConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    #[serde(skip_serializing)]
    pub password: String,
    #[serde(default)]
    pub security: FtpSecurityMode,
    #[serde(default)]
    pub data_channel_mode: DataChannelMode,
    /// Control connection timeout in seconds.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_sec: u64,
    /// Data-channel connect/accept timeout in seconds.
    #[serde(default = "default_data_timeout")]
    pub data_timeout_sec: u64,
    /// Accept self-signed / untrusted certificates.
    #[serde(default)]
    pub accept_invalid_certs: bool,
    /// UTF-8 encoding (OPTS UTF8 ON).
    #[serde(default = "default_true")]
    pub utf8: bool,
    /// Local address to bind for active-mode data connections.
    #[serde(default)]
    pub active_bind_address: Option<String>,
}

fn default_connect_timeout() -> u64 {
    30
}
fn default_data_timeout() -> u64 {
    60
}
fn default_true() -> bool {
    true
}

impl Default for FtpConnectionConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: 21,
            username: "anonymous".into(),
            password: "anonymous@".into(),
            security: FtpSecurityMode::None,
            data_channel_mode: DataChannelMode::Passive,
            connect_timeout_sec: default_connect_timeout(),
            data_timeout_sec: default_data_timeout(),
            accept_invalid_certs: false,
            utf8: true,
            active_bind_address: None,
        }
    }
}

impl FtpConnectionConfig {
    pub fn validate(&self) -> RemoteResult<()> {
        if self.host.trim().is_empty() {
            return Err(RemoteError::config("Host must not be empty"));
        }
        if self.port == 0 {
            return Err(RemoteError::config("Port must be between 1 and 65535"));
        }
        if self.username.is_empty() {
            return Err(RemoteError::config("Username must not be empty"));
        }
        if self.username.contains(['\r', '\n']) || self.password.contains(['\r', '\n']) {
            return Err(RemoteError::config("Credentials must not contain line breaks"));
        }
        Ok(())
    }
}

// ─── Replies ─────────────────────────────────────────────────────────

/// A complete (possibly multi-line) control-channel reply.
#[derive(Debug, Clone, PartialEq)]
pub struct FtpResponse {
    pub code: u16,
    pub lines: Vec<String>,
}

impl FtpResponse {
    /// Text of the final line without the code prefix.
    pub fn text(&self) -> String {
        self.lines
            .last()
            .map(|l| l.get(4..).unwrap_or("").trim().to_string())
            .unwrap_or_default()
    }

    /// 1xx
    pub fn is_preliminary(&self) -> bool {
        (100..200).contains(&self.code)
    }

    /// 2xx
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.code)
    }

    /// 3xx
    pub fn is_intermediate(&self) -> bool {
        (300..400).contains(&self.code)
    }
}

// ─── Server features (FEAT) ──────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ServerFeatures {
    pub mlsd: bool,
    pub mlst: bool,
    pub size: bool,
    pub utf8: bool,
    pub epsv: bool,
    pub raw_features: Vec<String>,
}

impl ServerFeatures {
    /// Build from the body lines of a `211` FEAT reply.
    pub fn from_feat_lines(lines: &[String]) -> Self {
        let raw: Vec<String> = lines
            .iter()
            .filter(|l| !l.starts_with("211"))
            .map(|l| l.trim().to_uppercase())
            .filter(|l| !l.is_empty())
            .collect();

        let has = |feat: &str| raw.iter().any(|l| l.starts_with(feat));

        Self {
            mlsd: has("MLSD") || has("MLST"),
            mlst: has("MLST"),
            size: has("SIZE"),
            utf8: has("UTF8"),
            epsv: has("EPSV"),
            raw_features: raw,
        }
    }
}
