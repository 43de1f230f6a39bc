// ── SFTP connection types ────────────────────────────────────────────────────

use filedeck_core::{RemoteError, RemoteResult};
use serde::{Deserialize, Serialize};

fn default_sftp_port() -> u16 {
    22
}
fn default_timeout_secs() -> u64 {
    30
}

/// Everything needed to open one SFTP session. Secrets are accepted on
/// input and never serialized back out.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SftpConnectionConfig {
    pub host: String,
    #[serde(default = "default_sftp_port")]
    pub port: u16,
    pub username: String,
    #[serde(default, skip_serializing)]
    pub password: Option<String>,
    /// PEM / OpenSSH private key text.
    #[serde(default, skip_serializing)]
    pub private_key: Option<String>,
    #[serde(default, skip_serializing)]
    pub passphrase: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// 0 disables keepalives.
    #[serde(default)]
    pub keepalive_interval_secs: u64,
}

impl Default for SftpConnectionConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: default_sftp_port(),
            username: String::new(),
            password: None,
            private_key: None,
            passphrase: None,
            timeout_secs: default_timeout_secs(),
            keepalive_interval_secs: 0,
        }
    }
}

impl SftpConnectionConfig {
    pub fn validate(&self) -> RemoteResult<()> {
        if self.host.trim().is_empty() {
            return Err(RemoteError::config("Host is required"));
        }
        if self.port == 0 {
            return Err(RemoteError::config("Port must be between 1 and 65535"));
        }
        if self.username.trim().is_empty() {
            return Err(RemoteError::config("Username is required"));
        }
        let has_password = self.password.as_deref().is_some_and(|p| !p.is_empty());
        let has_key = self.private_key.as_deref().is_some_and(|k| !k.trim().is_empty());
        if !has_password && !has_key {
            return Err(RemoteError::config(
                "SFTP requires a password or a private key",
            ));
        }
        Ok(())
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
