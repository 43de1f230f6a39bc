// ── RemoteFs over SFTP ───────────────────────────────────────────────────────

use crate::sftp::session::SftpClient;
use async_trait::async_trait;
use filedeck_core::{ByteSink, ByteSource, Entry, RemoteFs, RemoteResult};

#[async_trait]
impl RemoteFs for SftpClient {
    async fn disconnect(&mut self) {
        self.close().await;
    }

    async fn list(&mut self, path: &str) -> RemoteResult<Vec<Entry>> {
        self.list_directory(path).await
    }

    async fn print_working_directory(&mut self) -> RemoteResult<String> {
        Ok(self.working_directory())
    }

    async fn change_directory(&mut self, path: &str) -> RemoteResult<String> {
        self.set_working_directory(path).await
    }

    async fn create_directory(&mut self, path: &str) -> RemoteResult<()> {
        self.make_directory(path).await
    }

    async fn remove_directory(&mut self, path: &str) -> RemoteResult<()> {
        self.remove_tree(path).await
    }

    async fn delete_file(&mut self, path: &str) -> RemoteResult<()> {
        self.delete(path).await
    }

    async fn rename(&mut self, from: &str, to: &str) -> RemoteResult<()> {
        self.rename_path(from, to).await
    }

    async fn download_to(&mut self, path: &str, sink: &mut ByteSink<'_>) -> RemoteResult<u64> {
        self.download(path, sink).await
    }

    async fn upload_from(&mut self, path: &str, source: &mut ByteSource<'_>) -> RemoteResult<u64> {
        self.upload(path, source).await
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}
