//! Stateful FTP client: owns the control connection and issues commands.
//!
//! Lifecycle: `connect()` → optional AUTH TLS → USER/PASS → PBSZ/PROT →
//! FEAT → OPTS UTF8 → TYPE I → PWD.
//!
//! The client exposes low-level command helpers used by `directory.rs`
//! and `file_ops.rs` for higher-level operations.

use crate::ftp::connection;
use crate::ftp::error::from_reply;
use crate::ftp::parser;
use crate::ftp::protocol::FtpCodec;
use crate::ftp::tls::FtpTls;
use crate::ftp::transfer::{self, DataChannelParams, DataStream, PendingData};
use crate::ftp::types::*;
use filedeck_core::{Entry, EntryKind, RemoteError, RemoteErrorKind, RemoteResult};
use std::net::IpAddr;
use std::time::Duration;

/// A connected FTP client session.
pub struct FtpClient {
    pub codec: FtpCodec,
    pub config: FtpConnectionConfig,
    pub features: ServerFeatures,
    pub current_directory: String,
    tls: Option<FtpTls>,
    peer_ip: Option<IpAddr>,
    local_ip: Option<IpAddr>,
    connected: bool,
}

impl FtpClient {
    /// Establish and authenticate a new FTP session.
    pub async fn connect(config: FtpConnectionConfig) -> RemoteResult<Self> {
        config.validate()?;
        let (mut codec, _banner) = connection::connect(&config).await?;
        let (peer_ip, local_ip) = socket_addrs(&codec);

        // ── Explicit FTPS: AUTH TLS ──────────────────────────────
        let tls = if config.security == FtpSecurityMode::Explicit {
            let tls = FtpTls::new(&config.host, config.accept_invalid_certs)?;
            let resp = codec.execute("AUTH TLS").await?;
            if resp.code != 234 {
                return Err(RemoteError::protocol(format!(
                    "Server refused AUTH TLS: {}",
                    resp.text()
                ))
                .with_code(resp.code));
            }
            codec = tls.upgrade(codec).await?;
            Some(tls)
        } else {
            None
        };

        // ── Authenticate ─────────────────────────────────────────
        Self::login(&mut codec, &config).await?;

        if tls.is_some() {
            codec.expect_ok("PBSZ 0").await?;
            codec.expect_ok("PROT P").await?;
        }

        // ── FEAT / OPTS / TYPE ───────────────────────────────────
        let features = Self::probe_features(&mut codec).await;
        if config.utf8 && features.utf8 {
            let _ = codec.execute("OPTS UTF8 ON").await;
        }
        codec.expect_ok("TYPE I").await?;

        let current_directory = Self::get_pwd(&mut codec).await?;

        log::info!(
            "[ftp] {}@{}:{} connected ({}), cwd {}",
            config.username,
            config.host,
            config.port,
            if tls.is_some() { "explicit TLS" } else { "plain" },
            current_directory
        );

        Ok(Self {
            codec,
            config,
            features,
            current_directory,
            tls,
            peer_ip,
            local_ip,
            connected: true,
        })
    }

    async fn login(codec: &mut FtpCodec, config: &FtpConnectionConfig) -> RemoteResult<()> {
        let user_resp = codec.execute(&format!("USER {}", config.username)).await?;
        let final_resp = if user_resp.code == 331 || user_resp.code == 332 {
            codec.execute(&format!("PASS {}", config.password)).await?
        } else {
            user_resp
        };
        if final_resp.is_success() {
            return Ok(());
        }
        let err = from_reply(final_resp.code, &final_resp.text());
        // A negative reply to USER/PASS other than 421 is a credential problem.
        if err.is(RemoteErrorKind::Network) {
            Err(err)
        } else {
            Err(RemoteError::auth(format!("Login failed: {}", final_resp.text()))
                .with_code(final_resp.code))
        }
    }

    // ─── FEAT probe ──────────────────────────────────────────────

    async fn probe_features(codec: &mut FtpCodec) -> ServerFeatures {
        match codec.execute("FEAT").await {
            Ok(resp) if resp.is_success() => ServerFeatures::from_feat_lines(&resp.lines),
            _ => ServerFeatures::default(),
        }
    }

    // ─── PWD / CWD ───────────────────────────────────────────────

    /// Parse the current working directory from a PWD reply.
    pub async fn get_pwd(codec: &mut FtpCodec) -> RemoteResult<String> {
        let resp = codec.expect_ok("PWD").await?;
        parse_pwd(&resp.text())
    }

    pub async fn pwd(&mut self) -> RemoteResult<String> {
        let pwd = Self::get_pwd(&mut self.codec).await?;
        self.current_directory = pwd.clone();
        Ok(pwd)
    }

    /// Change into `path` and return the server-confirmed directory.
    pub async fn cwd(&mut self, path: &str) -> RemoteResult<String> {
        self.codec.expect_ok(&format!("CWD {}", path)).await?;
        self.pwd().await
    }

    // ─── Existence probe ─────────────────────────────────────────

    /// What, if anything, exists at `path`. Never moves the server's
    /// working directory for the caller.
    pub async fn probe(&mut self, path: &str) -> RemoteResult<Option<EntryKind>> {
        if self.features.mlst {
            let resp = self.codec.execute(&format!("MLST {}", path)).await?;
            if !resp.is_success() {
                return Ok(None);
            }
            let kind = resp
                .lines
                .iter()
                .filter(|l| l.starts_with(' '))
                .find_map(|l| parser::parse_line(l))
                .map(|e| e.kind)
                .unwrap_or(EntryKind::Unknown);
            return Ok(Some(kind));
        }

        let resp = self.codec.execute(&format!("CWD {}", path)).await?;
        if resp.is_success() {
            let back = self.current_directory.clone();
            self.codec.expect_ok(&format!("CWD {}", back)).await?;
            return Ok(Some(EntryKind::Directory));
        }
        match self.size(path).await {
            Ok(_) => Ok(Some(EntryKind::File)),
            Err(e) if e.is(RemoteErrorKind::Network) => Err(e),
            Err(_) => Ok(None),
        }
    }

    // ─── Data channel helper ─────────────────────────────────────

    fn data_timeout(&self) -> Duration {
        Duration::from_secs(self.config.data_timeout_sec)
    }

    /// Open a data channel, send `cmd`, and return the established stream
    /// once the server has accepted the command.
    pub async fn open_transfer(&mut self, cmd: &str) -> RemoteResult<DataStream> {
        let params = DataChannelParams {
            mode: self.config.data_channel_mode,
            host: &self.config.host,
            control_peer: self.peer_ip,
            control_local: self.local_ip,
            timeout: self.data_timeout(),
            active_bind: self.config.active_bind_address.as_deref(),
        };
        let pending: PendingData = transfer::prepare(&mut self.codec, &params).await?;

        let resp = self.codec.execute(cmd).await?;
        if !resp.is_preliminary() {
            return Err(from_reply(resp.code, &resp.text()));
        }
        pending.establish(self.tls.as_ref(), self.data_timeout()).await
    }

    /// Read the `226` that closes a transfer.
    pub async fn finish_transfer(&mut self) -> RemoteResult<()> {
        let done = tokio::time::timeout(self.data_timeout(), self.codec.read_response()).await??;
        if !done.is_success() {
            return Err(from_reply(done.code, &done.text()));
        }
        Ok(())
    }

    // ─── Listing ─────────────────────────────────────────────────

    /// Retrieve a directory listing (MLSD when available, else LIST).
    ///
    /// `LIST` answers a missing path with an empty body and a file path
    /// with that file's row, so the target is probed first.
    pub async fn list(&mut self, path: &str) -> RemoteResult<Vec<Entry>> {
        if !self.features.mlsd && !path.is_empty() {
            match self.probe(path).await? {
                Some(EntryKind::Directory) => {}
                Some(_) => return Err(RemoteError::protocol(format!("Not a directory: {}", path))),
                None => return Err(RemoteError::not_found(path)),
            }
        }
        let verb = if self.features.mlsd { "MLSD" } else { "LIST" };
        let cmd = if path.is_empty() {
            verb.to_string()
        } else {
            format!("{} {}", verb, path)
        };
        let stream = self.open_transfer(&cmd).await?;
        let body = stream.read_to_end().await;
        let finished = self.finish_transfer().await;
        let body = body?;
        finished?;
        Ok(parser::parse_listing(&String::from_utf8_lossy(&body)))
    }

    // ─── QUIT ────────────────────────────────────────────────────

    /// Gracefully close the session.
    pub async fn quit(&mut self) {
        if self.connected {
            let _ = tokio::time::timeout(Duration::from_secs(5), self.codec.execute("QUIT")).await;
            log::info!("[ftp] {}@{} disconnected", self.config.username, self.config.host);
        }
        self.connected = false;
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub(crate) fn mark_disconnected(&mut self) {
        self.connected = false;
    }
}

// ─── Helpers ─────────────────────────────────────────────────────────

fn socket_addrs(codec: &FtpCodec) -> (Option<IpAddr>, Option<IpAddr>) {
    use crate::ftp::protocol::WriteHalf;
    match &codec.writer {
        WriteHalf::Plain(w) => (
            w.peer_addr().ok().map(|a| a.ip()),
            w.local_addr().ok().map(|a| a.ip()),
        ),
        WriteHalf::Tls(_) => (None, None),
    }
}

/// Parse `257 "/some/path"` into the path string. Embedded quotes are
/// doubled per RFC 959.
pub(crate) fn parse_pwd(text: &str) -> RemoteResult<String> {
    let start = text
        .find('"')
        .ok_or_else(|| RemoteError::protocol(format!("Cannot parse PWD reply: {}", text)))?;
    let mut out = String::new();
    let mut chars = text[start + 1..].chars().peekable();
    while let Some(c) = chars.next() {
        if c == '"' {
            if chars.peek() == Some(&'"') {
                chars.next();
                out.push('"');
                continue;
            }
            return Ok(out);
        }
        out.push(c);
    }
    Err(RemoteError::protocol(format!("Cannot parse PWD reply: {}", text)))
}
