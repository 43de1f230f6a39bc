//! Directory operations: mkdir, rmdir, rename, delete.

use crate::ftp::client::FtpClient;
use crate::ftp::error::from_reply;
use filedeck_core::path::{ancestors, join_child, parent};
use filedeck_core::{EntryKind, RemoteError, RemoteErrorKind, RemoteResult};

impl FtpClient {
    // ─── MKD ─────────────────────────────────────────────────────

    /// Issue a single `MKD`.
    pub async fn mkd(&mut self, path: &str) -> RemoteResult<()> {
        self.codec.expect_ok(&format!("MKD {}", path)).await?;
        Ok(())
    }

    /// Create `path` and any missing parents. Fails with `Conflict` when
    /// `path` itself already exists.
    pub async fn create_directory(&mut self, path: &str) -> RemoteResult<()> {
        let first = match self.mkd(path).await {
            Ok(()) => return Ok(()),
            Err(e) => e,
        };
        if first.is(RemoteErrorKind::Network) || first.is(RemoteErrorKind::Conflict) {
            return Err(first);
        }

        // Most servers answer 550 for both "exists" and "no parent".
        if self.probe(path).await?.is_some() {
            return Err(RemoteError::already_exists(path).with_code(first.code.unwrap_or(550)));
        }
        let parent_missing = match parent(path) {
            Some(p) if p != "/" => self.probe(&p).await?.is_none(),
            _ => false,
        };
        if !parent_missing {
            return Err(first);
        }

        for dir in ancestors(path) {
            if self.probe(&dir).await?.is_none() {
                log::debug!("[ftp] creating missing parent {}", dir);
                self.mkd(&dir).await?;
            }
        }
        self.mkd(path).await
    }

    // ─── RMD ─────────────────────────────────────────────────────

    /// Remove an empty directory.
    pub async fn rmdir(&mut self, path: &str) -> RemoteResult<()> {
        self.codec.expect_ok(&format!("RMD {}", path)).await?;
        Ok(())
    }

    /// Recursively remove a directory and all its contents. Links are
    /// deleted, never followed.
    pub async fn rmdir_recursive(&mut self, path: &str) -> RemoteResult<()> {
        let entries = self.list(path).await?;

        for entry in entries {
            if entry.name == "." || entry.name == ".." {
                continue;
            }
            let name = entry.name.rsplit('/').next().unwrap_or(&entry.name);
            let full_path = join_child(path, name);
            match entry.kind {
                EntryKind::Directory => {
                    Box::pin(self.rmdir_recursive(&full_path)).await?;
                }
                _ => self.delete(&full_path).await?,
            }
        }

        self.rmdir(path).await
    }

    // ─── RNFR / RNTO ────────────────────────────────────────────

    /// Rename (or move) a file or directory.
    pub async fn rename(&mut self, from: &str, to: &str) -> RemoteResult<()> {
        let rnfr = self.codec.execute(&format!("RNFR {}", from)).await?;
        if !rnfr.is_intermediate() && !rnfr.is_success() {
            return Err(from_reply(rnfr.code, &rnfr.text()));
        }
        self.codec.expect_ok(&format!("RNTO {}", to)).await?;
        Ok(())
    }

    // ─── DELE ────────────────────────────────────────────────────

    /// Delete a remote file.
    pub async fn delete(&mut self, path: &str) -> RemoteResult<()> {
        self.codec.expect_ok(&format!("DELE {}", path)).await?;
        Ok(())
    }
}
