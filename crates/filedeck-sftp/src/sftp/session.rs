// ── SftpClient – session lifecycle ───────────────────────────────────────────

use crate::sftp::error::{classify, worker_failed};
use crate::sftp::types::SftpConnectionConfig;
use filedeck_core::{RemoteError, RemoteErrorKind, RemoteResult};
use log::{info, warn};
use ssh2::{Session, Sftp};
use std::io::Write;
use std::net::{TcpStream, ToSocketAddrs};
use std::path::Path;
use std::time::Duration;

/// One authenticated SSH session with an SFTP subsystem.
///
/// SFTP has no server-side working directory; `cwd` is tracked here and
/// only moves after the target was confirmed to be a directory.
pub struct SftpClient {
    pub(crate) session: Session,
    pub host: String,
    pub username: String,
    pub(crate) cwd: String,
    pub(crate) connected: bool,
}

impl SftpClient {
    // ── Connect ──────────────────────────────────────────────────────────────

    pub async fn connect(config: SftpConnectionConfig) -> RemoteResult<Self> {
        config.validate()?;
        let host = config.host.clone();
        let username = config.username.clone();
        let (session, home) = tokio::task::spawn_blocking(move || open_session(&config))
            .await
            .map_err(worker_failed)??;

        Ok(Self {
            session,
            host,
            username,
            cwd: home,
            connected: true,
        })
    }

    // ── Disconnect ───────────────────────────────────────────────────────────

    pub async fn close(&mut self) {
        if !self.connected {
            return;
        }
        self.connected = false;
        let session = self.session.clone();
        let closed = tokio::task::spawn_blocking(move || {
            session.disconnect(None, "Client disconnecting", None)
        })
        .await;
        if let Ok(Err(e)) = closed {
            warn!("[sftp] disconnect from {} was not clean: {}", self.host, e);
        }
        info!("[sftp] {}@{} disconnected", self.username, self.host);
    }

    // ── Blocking bridge ──────────────────────────────────────────────────────

    /// Run `op` with a fresh SFTP channel on the blocking pool.
    pub(crate) async fn with_sftp<T, F>(&mut self, op: F) -> RemoteResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Sftp) -> RemoteResult<T> + Send + 'static,
    {
        let session = self.session.clone();
        let result = tokio::task::spawn_blocking(move || {
            let sftp = session.sftp().map_err(|e| classify(&e, None))?;
            op(&sftp)
        })
        .await
        .map_err(worker_failed)
        .and_then(|r| r);
        self.track(result)
    }

    /// A network failure means the SSH transport is gone.
    pub(crate) fn track<T>(&mut self, result: RemoteResult<T>) -> RemoteResult<T> {
        if let Err(e) = &result {
            if e.is(RemoteErrorKind::Network) && self.connected {
                warn!("[sftp] {} lost: {}", self.host, e.message);
                self.connected = false;
            }
        }
        result
    }

    /// Resolve `path` against the simulated working directory.
    pub(crate) fn resolve(&self, path: &str) -> String {
        match path {
            "" => self.cwd.clone(),
            p if p.starts_with('/') => p.to_string(),
            p => filedeck_core::path::join_child(&self.cwd, p),
        }
    }
}

// ── Blocking helpers (run on the blocking pool) ──────────────────────────────

fn open_session(config: &SftpConnectionConfig) -> RemoteResult<(Session, String)> {
    let addr = config.addr();
    info!("[sftp] connecting to {}", addr);
    let timeout = Duration::from_secs(config.timeout_secs);

    let sock_addr = addr
        .to_socket_addrs()
        .map_err(|e| RemoteError::network(format!("Cannot resolve {}: {}", addr, e)))?
        .next()
        .ok_or_else(|| RemoteError::network(format!("No address for {}", addr)))?;

    let tcp = TcpStream::connect_timeout(&sock_addr, timeout)
        .map_err(|e| RemoteError::network(format!("TCP connection to {} failed: {}", addr, e)))?;

    let mut session = Session::new()
        .map_err(|e| RemoteError::protocol(format!("Failed to create SSH session: {}", e)))?;
    session.set_tcp_stream(tcp);
    session.set_timeout(u32::try_from(timeout.as_millis()).unwrap_or(u32::MAX));
    session.handshake().map_err(|e| {
        let mut err = classify(&e, None);
        if err.is(RemoteErrorKind::Protocol) {
            err.kind = RemoteErrorKind::Network;
        }
        err.message = format!("SSH handshake with {} failed: {}", addr, e.message());
        err
    })?;

    let method = authenticate(&session, config)?;
    info!("[sftp] {}@{} authenticated via {}", config.username, addr, method);

    let keepalive = config.keepalive_interval_secs;
    session.set_keepalive(keepalive > 0, u32::try_from(keepalive).unwrap_or(u32::MAX));

    let home = session
        .sftp()
        .and_then(|sftp| sftp.realpath(Path::new(".")))
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or_else(|_| "/".to_string());

    Ok((session, home))
}

fn authenticate(session: &Session, config: &SftpConnectionConfig) -> RemoteResult<&'static str> {
    // 1. Private key (PEM in memory): libssh2 wants a file, so write it
    //    to a private temp file that is removed when dropped.
    if let Some(key) = config.private_key.as_deref().filter(|k| !k.trim().is_empty()) {
        let mut file = tempfile::NamedTempFile::new()
            .map_err(|e| RemoteError::config(format!("Cannot stage private key: {}", e)))?;
        file.write_all(key.as_bytes())
            .and_then(|_| file.flush())
            .map_err(|e| RemoteError::config(format!("Cannot stage private key: {}", e)))?;
        let result = session.userauth_pubkey_file(
            &config.username,
            None,
            file.path(),
            config.passphrase.as_deref(),
        );
        match result {
            Ok(()) if session.authenticated() => return Ok("publickey"),
            Ok(()) => {}
            Err(e) if config.password.is_none() => {
                return Err(RemoteError::auth(format!(
                    "Public-key authentication failed: {}",
                    e.message()
                )))
            }
            Err(e) => warn!("[sftp] public-key auth failed, trying password: {}", e.message()),
        }
    }

    // 2. Password, then keyboard-interactive with the same password.
    if let Some(password) = config.password.as_deref() {
        if session.userauth_password(&config.username, password).is_ok() && session.authenticated() {
            return Ok("password");
        }

        struct PasswordPrompt<'a>(&'a str);

        impl ssh2::KeyboardInteractivePrompt for PasswordPrompt<'_> {
            fn prompt(
                &mut self,
                _username: &str,
                _instructions: &str,
                prompts: &[ssh2::Prompt],
            ) -> Vec<String> {
                prompts.iter().map(|_| self.0.to_string()).collect()
            }
        }

        let mut prompt = PasswordPrompt(password);
        if session
            .userauth_keyboard_interactive(&config.username, &mut prompt)
            .is_ok()
            && session.authenticated()
        {
            return Ok("keyboard-interactive");
        }
    }

    Err(RemoteError::auth(format!(
        "Authentication failed for {}@{}",
        config.username, config.host
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn invalid_config_fails_before_network() {
        let cfg = SftpConnectionConfig {
            host: "sftp.invalid".into(),
            username: "u".into(),
            ..Default::default()
        };
        let err = SftpClient::connect(cfg).await.err().unwrap();
        assert_eq!(err.kind, RemoteErrorKind::Config);
    }

    #[tokio::test]
    async fn refused_port_is_network_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        let cfg = SftpConnectionConfig {
            host: "127.0.0.1".into(),
            port,
            username: "u".into(),
            password: Some("p".into()),
            timeout_secs: 2,
            ..Default::default()
        };
        let err = SftpClient::connect(cfg).await.err().unwrap();
        assert_eq!(err.kind, RemoteErrorKind::Network);
    }

    #[test]
    fn relative_paths_resolve_against_cwd() {
        let client = SftpClient {
            session: Session::new().unwrap(),
            host: "h".into(),
            username: "u".into(),
            cwd: "/home/u".into(),
            connected: false,
        };
        assert_eq!(client.resolve("docs"), "/home/u/docs");
        assert_eq!(client.resolve("/etc"), "/etc");
        assert_eq!(client.resolve(""), "/home/u");
    }
}
