//! Classification of FTP replies and transport failures into `RemoteError`.

use filedeck_core::{RemoteError, RemoteErrorKind};

/// Classify a negative FTP reply into the most appropriate error kind.
pub fn from_reply(code: u16, text: &str) -> RemoteError {
    let kind = match code {
        421 => RemoteErrorKind::Network,
        425 | 426 => RemoteErrorKind::Transfer,
        332 | 430 | 530 => RemoteErrorKind::Auth,
        450 | 550 | 553 => {
            if reports_existing(text) {
                RemoteErrorKind::Conflict
            } else {
                RemoteErrorKind::Protocol
            }
        }
        451 | 452 | 552 => RemoteErrorKind::Transfer,
        _ => RemoteErrorKind::Protocol,
    };
    let message = if text.is_empty() {
        format!("Server replied {}", code)
    } else {
        text.to_string()
    };
    RemoteError::new(kind, message).with_code(code)
}

/// Servers phrase "already exists" in several ways; "does not exist"
/// must not match.
fn reports_existing(text: &str) -> bool {
    let lower = text.to_lowercase();
    if lower.contains("not exist") || lower.contains("no such") {
        return false;
    }
    lower.contains("exists")
}

/// Failure while opening or wrapping a data connection.
pub(crate) fn data_channel(msg: impl Into<String>) -> RemoteError {
    RemoteError::transfer(msg)
}

/// TLS setup or handshake failure.
pub(crate) fn tls_failed(msg: impl Into<String>) -> RemoteError {
    RemoteError::network(msg)
}
