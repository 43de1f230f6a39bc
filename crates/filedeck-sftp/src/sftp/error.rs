// ── libssh2 error classification ─────────────────────────────────────────────

use filedeck_core::{RemoteError, RemoteErrorKind};
use ssh2::ErrorCode;

// SFTP status codes (draft-ietf-secsh-filexfer-02 and later).
const FX_NO_SUCH_FILE: i32 = 2;
const FX_PERMISSION_DENIED: i32 = 3;
const FX_NO_CONNECTION: i32 = 6;
const FX_CONNECTION_LOST: i32 = 7;
const FX_NO_SUCH_PATH: i32 = 10;
const FX_FILE_ALREADY_EXISTS: i32 = 11;

// libssh2 session error codes.
const SOCKET_NONE: i32 = -1;
const BANNER_RECV: i32 = -2;
const BANNER_SEND: i32 = -3;
const SOCKET_SEND: i32 = -7;
const TIMEOUT: i32 = -9;
const SOCKET_DISCONNECT: i32 = -13;
const PASSWORD_EXPIRED: i32 = -15;
const AUTHENTICATION_FAILED: i32 = -18;
const PUBLICKEY_UNVERIFIED: i32 = -19;
const SOCKET_RECV: i32 = -43;

/// Map a libssh2 failure to the shared taxonomy. `path` names the remote
/// path the call was about, when there is one.
pub fn classify(e: &ssh2::Error, path: Option<&str>) -> RemoteError {
    let kind = kind_of(e.code());
    let message = match (kind, e.code(), path) {
        (RemoteErrorKind::Protocol, ErrorCode::SFTP(FX_NO_SUCH_FILE | FX_NO_SUCH_PATH), Some(p)) => {
            format!("Not found: {}", p)
        }
        (RemoteErrorKind::Conflict, _, Some(p)) => format!("Already exists: {}", p),
        (_, _, Some(p)) => format!("{}: {}", p, e.message()),
        (_, _, None) => e.message().to_string(),
    };
    RemoteError::new(kind, message)
}

fn kind_of(code: ErrorCode) -> RemoteErrorKind {
    match code {
        ErrorCode::SFTP(FX_FILE_ALREADY_EXISTS) => RemoteErrorKind::Conflict,
        ErrorCode::SFTP(FX_NO_CONNECTION | FX_CONNECTION_LOST) => RemoteErrorKind::Network,
        ErrorCode::SFTP(FX_NO_SUCH_FILE | FX_NO_SUCH_PATH | FX_PERMISSION_DENIED) => {
            RemoteErrorKind::Protocol
        }
        ErrorCode::Session(
            SOCKET_NONE | BANNER_RECV | BANNER_SEND | SOCKET_SEND | TIMEOUT | SOCKET_DISCONNECT
            | SOCKET_RECV,
        ) => RemoteErrorKind::Network,
        ErrorCode::Session(PASSWORD_EXPIRED | AUTHENTICATION_FAILED | PUBLICKEY_UNVERIFIED) => {
            RemoteErrorKind::Auth
        }
        _ => RemoteErrorKind::Protocol,
    }
}

/// A read or write failed after bytes had started moving.
pub fn interrupted(path: &str, e: impl std::fmt::Display) -> RemoteError {
    RemoteError::transfer(format!("Transfer of {} interrupted: {}", path, e))
}

/// The blocking worker panicked or was cancelled.
pub fn worker_failed(e: tokio::task::JoinError) -> RemoteError {
    RemoteError::protocol(format!("SFTP worker failed: {}", e))
}
