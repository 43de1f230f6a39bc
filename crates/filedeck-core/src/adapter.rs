//! The capability set every protocol adapter implements.

use crate::entry::Entry;
use crate::error::RemoteResult;
use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};

/// Destination of a streamed download.
pub type ByteSink<'a> = dyn AsyncWrite + Unpin + Send + 'a;
/// Source of a streamed upload.
pub type ByteSource<'a> = dyn AsyncRead + Unpin + Send + 'a;

/// One exclusively-owned remote connection.
///
/// Callers must not issue overlapping calls on one adapter; the session
/// coordinator serializes them. Listings come back normalized but
/// unsorted.
#[async_trait]
pub trait RemoteFs: Send {
    /// Best-effort close. Safe to call more than once.
    async fn disconnect(&mut self);

    /// List a directory. `Protocol` error if it is missing or not a
    /// directory.
    async fn list(&mut self, path: &str) -> RemoteResult<Vec<Entry>>;

    async fn print_working_directory(&mut self) -> RemoteResult<String>;

    /// Change directory and return the new path.
    async fn change_directory(&mut self, path: &str) -> RemoteResult<String>;

    /// Create a directory and any missing parents. `Conflict` if the
    /// target itself already exists.
    async fn create_directory(&mut self, path: &str) -> RemoteResult<()>;

    /// Remove a directory tree.
    async fn remove_directory(&mut self, path: &str) -> RemoteResult<()>;

    async fn delete_file(&mut self, path: &str) -> RemoteResult<()>;

    async fn rename(&mut self, from: &str, to: &str) -> RemoteResult<()>;

    /// Stream a remote file into `sink` and return the byte count. On a
    /// `Transfer` error the sink holds whatever arrived before it.
    async fn download_to(&mut self, path: &str, sink: &mut ByteSink<'_>) -> RemoteResult<u64>;

    /// Stream `source` into a remote file. After a failure the remote
    /// file's contents are undefined.
    async fn upload_from(&mut self, path: &str, source: &mut ByteSource<'_>) -> RemoteResult<u64>;

    /// Local liveness flag; no network round trip.
    fn is_connected(&self) -> bool;
}
