//! `RemoteFs` over an FTP / FTPS control connection.

use crate::ftp::client::FtpClient;
use async_trait::async_trait;
use filedeck_core::{ByteSink, ByteSource, Entry, RemoteErrorKind, RemoteFs, RemoteResult};

/// A network failure means the control connection is gone; later calls
/// should see `is_connected() == false`.
fn track<T>(client: &mut FtpClient, result: RemoteResult<T>) -> RemoteResult<T> {
    if let Err(e) = &result {
        if e.is(RemoteErrorKind::Network) {
            log::warn!("[ftp] {} lost: {}", client.config.host, e.message);
            client.mark_disconnected();
        }
    }
    result
}

#[async_trait]
impl RemoteFs for FtpClient {
    async fn disconnect(&mut self) {
        self.quit().await;
    }

    async fn list(&mut self, path: &str) -> RemoteResult<Vec<Entry>> {
        let r = FtpClient::list(self, path).await;
        track(self, r)
    }

    async fn print_working_directory(&mut self) -> RemoteResult<String> {
        let r = self.pwd().await;
        track(self, r)
    }

    async fn change_directory(&mut self, path: &str) -> RemoteResult<String> {
        let r = self.cwd(path).await;
        track(self, r)
    }

    async fn create_directory(&mut self, path: &str) -> RemoteResult<()> {
        let r = FtpClient::create_directory(self, path).await;
        track(self, r)
    }

    async fn remove_directory(&mut self, path: &str) -> RemoteResult<()> {
        let r = self.rmdir_recursive(path).await;
        track(self, r)
    }

    async fn delete_file(&mut self, path: &str) -> RemoteResult<()> {
        let r = self.delete(path).await;
        track(self, r)
    }

    async fn rename(&mut self, from: &str, to: &str) -> RemoteResult<()> {
        let r = FtpClient::rename(self, from, to).await;
        track(self, r)
    }

    async fn download_to(&mut self, path: &str, sink: &mut ByteSink<'_>) -> RemoteResult<u64> {
        let r = self.retrieve(path, sink).await;
        track(self, r)
    }

    async fn upload_from(&mut self, path: &str, source: &mut ByteSource<'_>) -> RemoteResult<u64> {
        let r = self.store(path, source).await;
        track(self, r)
    }

    fn is_connected(&self) -> bool {
        FtpClient::is_connected(self)
    }
}
