//! Adapter selection: a connect request becomes a tagged connection
//! configuration, and a `Connector` turns that into a live adapter.

use crate::config::AppConfig;
use async_trait::async_trait;
use filedeck_core::{Protocol, RemoteError, RemoteFs, RemoteResult};
use filedeck_ftp::ftp::{FtpClient, FtpConnectionConfig, FtpSecurityMode};
use filedeck_sftp::sftp::{SftpClient, SftpConnectionConfig};
use serde::Deserialize;

/// One arm per wire protocol. FTPS is FTP with explicit TLS.
#[derive(Debug, Clone)]
pub enum ConnectionConfig {
    Ftp(FtpConnectionConfig),
    Sftp(SftpConnectionConfig),
}

impl ConnectionConfig {
    pub fn protocol(&self) -> Protocol {
        match self {
            Self::Ftp(c) if c.security == FtpSecurityMode::Explicit => Protocol::Ftps,
            Self::Ftp(_) => Protocol::Ftp,
            Self::Sftp(_) => Protocol::Sftp,
        }
    }

    pub fn host(&self) -> &str {
        match self {
            Self::Ftp(c) => &c.host,
            Self::Sftp(c) => &c.host,
        }
    }

    pub fn port(&self) -> u16 {
        match self {
            Self::Ftp(c) => c.port,
            Self::Sftp(c) => c.port,
        }
    }

    pub fn username(&self) -> &str {
        match self {
            Self::Ftp(c) => &c.username,
            Self::Sftp(c) => &c.username,
        }
    }
}

/// Connect parameters as a caller supplies them.
#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectRequest {
    pub protocol: Protocol,
    pub host: String,
    #[serde(default)]
    pub port: Option<u16>,
    pub username: String,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub private_key: Option<String>,
    #[serde(default)]
    pub passphrase: Option<String>,
}

impl std::fmt::Debug for ConnectRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectRequest")
            .field("protocol", &self.protocol)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

impl ConnectRequest {
    /// Fill in defaults and validate. Every failure here is a `Config`
    /// error raised before any network I/O.
    pub fn into_config(self, app: &AppConfig) -> RemoteResult<ConnectionConfig> {
        let port = self.port.unwrap_or_else(|| self.protocol.default_port());
        let config = match self.protocol {
            Protocol::Ftp | Protocol::Ftps => {
                if self.private_key.is_some() {
                    return Err(RemoteError::config(
                        "Private-key authentication is only available for SFTP",
                    ));
                }
                let security = if self.protocol == Protocol::Ftps {
                    FtpSecurityMode::Explicit
                } else {
                    FtpSecurityMode::None
                };
                let cfg = FtpConnectionConfig {
                    host: self.host.trim().to_string(),
                    port,
                    username: self.username,
                    password: self.password.unwrap_or_default(),
                    security,
                    data_channel_mode: app.ftp.data_channel_mode,
                    connect_timeout_sec: app.ftp.connect_timeout_secs,
                    data_timeout_sec: app.ftp.data_timeout_secs,
                    accept_invalid_certs: app.ftp.accept_invalid_certs,
                    ..Default::default()
                };
                cfg.validate()?;
                ConnectionConfig::Ftp(cfg)
            }
            Protocol::Sftp => {
                let cfg = SftpConnectionConfig {
                    host: self.host.trim().to_string(),
                    port,
                    username: self.username,
                    password: self.password,
                    private_key: self.private_key,
                    passphrase: self.passphrase,
                    timeout_secs: app.sftp.timeout_secs,
                    keepalive_interval_secs: app.sftp.keepalive_interval_secs,
                };
                cfg.validate()?;
                ConnectionConfig::Sftp(cfg)
            }
        };
        Ok(config)
    }
}

/// Opens an adapter for a configuration.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, config: &ConnectionConfig) -> RemoteResult<Box<dyn RemoteFs>>;
}

/// The production connector: FTP/FTPS or SFTP by configuration arm.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProtocolConnector;

#[async_trait]
impl Connector for ProtocolConnector {
    async fn connect(&self, config: &ConnectionConfig) -> RemoteResult<Box<dyn RemoteFs>> {
        match config {
            ConnectionConfig::Ftp(cfg) => {
                let client = FtpClient::connect(cfg.clone()).await?;
                Ok(Box::new(client))
            }
            ConnectionConfig::Sftp(cfg) => {
                let client = SftpClient::connect(cfg.clone()).await?;
                Ok(Box::new(client))
            }
        }
    }
}
