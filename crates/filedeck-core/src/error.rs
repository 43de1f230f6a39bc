//! Error taxonomy shared by every layer.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::ErrorKind as IoKind;

/// Categorised remote-file error.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteError {
    pub kind: RemoteErrorKind,
    pub message: String,
    /// Server reply code that triggered the error, if any.
    pub code: Option<u16>,
    pub session_id: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum RemoteErrorKind {
    /// Malformed connection parameters or request input.
    Config,
    /// Credentials rejected by the server.
    Auth,
    /// Unreachable host, refused or dropped connection, timeout.
    Network,
    /// Remote-side refusal: missing path, not a directory, permission.
    Protocol,
    /// Target already exists.
    Conflict,
    /// Unknown (or already disconnected) session id.
    SessionNotFound,
    /// Byte stream interrupted mid-transfer.
    Transfer,
}

pub type RemoteResult<T> = Result<T, RemoteError>;

// ── Construction helpers ─────────────────────────────────────────────

impl RemoteError {
    pub fn new(kind: RemoteErrorKind, msg: impl Into<String>) -> Self {
        Self {
            kind,
            message: msg.into(),
            code: None,
            session_id: None,
        }
    }

    pub fn with_code(mut self, code: u16) -> Self {
        self.code = Some(code);
        self
    }

    pub fn with_session(mut self, id: impl Into<String>) -> Self {
        self.session_id = Some(id.into());
        self
    }

    pub fn is(&self, kind: RemoteErrorKind) -> bool {
        self.kind == kind
    }

    // ── Convenience constructors ─────────────────────────────────

    pub fn config(msg: impl Into<String>) -> Self {
        Self::new(RemoteErrorKind::Config, msg)
    }

    pub fn auth(msg: impl Into<String>) -> Self {
        Self::new(RemoteErrorKind::Auth, msg)
    }

    pub fn network(msg: impl Into<String>) -> Self {
        Self::new(RemoteErrorKind::Network, msg)
    }

    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::new(RemoteErrorKind::Protocol, msg)
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::new(RemoteErrorKind::Conflict, msg)
    }

    pub fn transfer(msg: impl Into<String>) -> Self {
        Self::new(RemoteErrorKind::Transfer, msg)
    }

    pub fn not_found(path: &str) -> Self {
        Self::protocol(format!("Not found: {}", path))
    }

    pub fn already_exists(path: &str) -> Self {
        Self::conflict(format!("Already exists: {}", path))
    }

    pub fn session_not_found(id: &str) -> Self {
        Self::new(
            RemoteErrorKind::SessionNotFound,
            format!("Session '{}' not found", id),
        )
        .with_session(id)
    }

    /// Classify a local I/O failure; connection-level kinds are `Network`,
    /// everything else happened while bytes were moving.
    pub fn from_io(context: &str, e: &std::io::Error) -> Self {
        let kind = match e.kind() {
            IoKind::ConnectionRefused
            | IoKind::ConnectionReset
            | IoKind::ConnectionAborted
            | IoKind::NotConnected
            | IoKind::AddrNotAvailable
            | IoKind::TimedOut
            | IoKind::BrokenPipe
            | IoKind::UnexpectedEof => RemoteErrorKind::Network,
            _ => RemoteErrorKind::Transfer,
        };
        Self::new(kind, format!("{}: {}", context, e))
    }
}

impl fmt::Display for RemoteErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Config => "ConfigError",
            Self::Auth => "AuthError",
            Self::Network => "NetworkError",
            Self::Protocol => "ProtocolError",
            Self::Conflict => "ConflictError",
            Self::SessionNotFound => "SessionNotFoundError",
            Self::Transfer => "TransferError",
        };
        f.write_str(label)
    }
}

impl fmt::Display for RemoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(code) = self.code {
            write!(f, "[{} {}] {}", self.kind, code, self.message)
        } else {
            write!(f, "[{}] {}", self.kind, self.message)
        }
    }
}

impl std::error::Error for RemoteError {}

impl From<std::io::Error> for RemoteError {
    fn from(e: std::io::Error) -> Self {
        Self::from_io("I/O error", &e)
    }
}

impl From<tokio::time::error::Elapsed> for RemoteError {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        Self::network("Operation timed out")
    }
}

impl From<RemoteError> for String {
    fn from(e: RemoteError) -> String {
        e.message
    }
}
