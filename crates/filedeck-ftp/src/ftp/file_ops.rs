//! File-level operations: streamed RETR / STOR and SIZE.
//!
//! Bytes flow straight between the data connection and the caller's
//! sink or source; nothing is buffered beyond the copy buffer.

use crate::ftp::client::FtpClient;
use filedeck_core::{ByteSink, ByteSource, RemoteError, RemoteResult};
use std::time::Duration;

/// How long to wait for the closing reply after a broken transfer.
const RESYNC_TIMEOUT: Duration = Duration::from_secs(10);

impl FtpClient {
    // ─── DOWNLOAD (RETR) ─────────────────────────────────────────

    /// Stream a remote file into `sink`.
    pub async fn retrieve(&mut self, remote_path: &str, sink: &mut ByteSink<'_>) -> RemoteResult<u64> {
        let ds = self.open_transfer(&format!("RETR {}", remote_path)).await?;
        match ds.copy_to(sink).await {
            Ok(bytes) => {
                self.finish_transfer().await?;
                log::debug!("[ftp] RETR {} ({} bytes)", remote_path, bytes);
                Ok(bytes)
            }
            Err(e) => {
                self.resync().await;
                Err(RemoteError::transfer(format!(
                    "Download of {} interrupted: {}",
                    remote_path, e
                )))
            }
        }
    }

    // ─── UPLOAD (STOR) ───────────────────────────────────────────

    /// Stream `source` into a remote file, replacing it.
    pub async fn store(&mut self, remote_path: &str, source: &mut ByteSource<'_>) -> RemoteResult<u64> {
        let ds = self.open_transfer(&format!("STOR {}", remote_path)).await?;
        match ds.copy_from(source).await {
            Ok(bytes) => {
                self.finish_transfer().await?;
                log::debug!("[ftp] STOR {} ({} bytes)", remote_path, bytes);
                Ok(bytes)
            }
            Err(e) => {
                self.resync().await;
                Err(RemoteError::transfer(format!(
                    "Upload of {} interrupted: {}",
                    remote_path, e
                )))
            }
        }
    }

    /// After the data connection was dropped mid-transfer the server
    /// still owes a 426/451 reply; consume it so the next command lines
    /// up with its answer. If it never arrives the control channel is
    /// unusable.
    async fn resync(&mut self) {
        match tokio::time::timeout(RESYNC_TIMEOUT, self.codec.read_response()).await {
            Ok(Ok(resp)) => log::debug!("[ftp] transfer aborted, server said {} {}", resp.code, resp.text()),
            _ => {
                log::warn!("[ftp] control channel out of sync after failed transfer");
                self.mark_disconnected();
            }
        }
    }

    // ─── SIZE ────────────────────────────────────────────────────

    /// Get the size of a remote file (RFC 3659).
    pub async fn size(&mut self, path: &str) -> RemoteResult<u64> {
        let resp = self.codec.expect_ok(&format!("SIZE {}", path)).await?;
        resp.text()
            .trim()
            .parse::<u64>()
            .map_err(|_| RemoteError::protocol(format!("Cannot parse SIZE reply: {}", resp.text())))
    }
}
