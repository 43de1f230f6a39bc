// ── Streamed downloads / uploads ─────────────────────────────────────────────
//
// The remote file is read or written on the blocking pool; chunks cross to
// the async side through a bounded channel, so at most `CHANNEL_DEPTH`
// chunks are ever held in memory.

use crate::sftp::error::{classify, interrupted, worker_failed};
use crate::sftp::session::SftpClient;
use filedeck_core::{ByteSink, ByteSource, RemoteResult};
use log::debug;
use std::io::{Read, Write};
use std::path::Path;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::mpsc;

const CHUNK_SIZE: usize = 32 * 1024;
const CHANNEL_DEPTH: usize = 8;

impl SftpClient {
    // ── Download ─────────────────────────────────────────────────────────────

    pub async fn download(&mut self, path: &str, sink: &mut ByteSink<'_>) -> RemoteResult<u64> {
        let remote = self.resolve(path);
        let session = self.session.clone();
        let (tx, mut rx) = mpsc::channel::<Vec<u8>>(CHANNEL_DEPTH);

        let worker_path = remote.clone();
        let worker = tokio::task::spawn_blocking(move || -> RemoteResult<()> {
            let sftp = session.sftp().map_err(|e| classify(&e, None))?;
            let mut file = sftp
                .open(Path::new(&worker_path))
                .map_err(|e| classify(&e, Some(&worker_path)))?;
            let mut buf = vec![0u8; CHUNK_SIZE];
            loop {
                let n = file.read(&mut buf).map_err(|e| interrupted(&worker_path, e))?;
                if n == 0 {
                    return Ok(());
                }
                if tx.blocking_send(buf[..n].to_vec()).is_err() {
                    // receiver gave up; its error is the one reported
                    return Ok(());
                }
            }
        });

        let mut written: u64 = 0;
        let mut sink_error = None;
        while let Some(chunk) = rx.recv().await {
            if let Err(e) = sink.write_all(&chunk).await {
                sink_error = Some(interrupted(&remote, e));
                break;
            }
            written += chunk.len() as u64;
        }
        drop(rx);

        let worker_result = worker.await.map_err(worker_failed).and_then(|r| r);
        let result = match (worker_result, sink_error) {
            (Err(e), _) => Err(e),
            (Ok(()), Some(e)) => Err(e),
            (Ok(()), None) => match sink.flush().await {
                Ok(()) => Ok(written),
                Err(e) => Err(interrupted(&remote, e)),
            },
        };
        if result.is_ok() {
            debug!("[sftp] downloaded {} ({} bytes)", remote, written);
        }
        self.track(result)
    }

    // ── Upload ───────────────────────────────────────────────────────────────

    pub async fn upload(&mut self, path: &str, source: &mut ByteSource<'_>) -> RemoteResult<u64> {
        let remote = self.resolve(path);
        let session = self.session.clone();
        let (tx, mut rx) = mpsc::channel::<Vec<u8>>(CHANNEL_DEPTH);

        let worker_path = remote.clone();
        let worker = tokio::task::spawn_blocking(move || -> RemoteResult<u64> {
            let sftp = session.sftp().map_err(|e| classify(&e, None))?;
            let mut file = sftp
                .create(Path::new(&worker_path))
                .map_err(|e| classify(&e, Some(&worker_path)))?;
            let mut total: u64 = 0;
            while let Some(chunk) = rx.blocking_recv() {
                file.write_all(&chunk).map_err(|e| interrupted(&worker_path, e))?;
                total += chunk.len() as u64;
            }
            file.flush().map_err(|e| interrupted(&worker_path, e))?;
            Ok(total)
        });

        let mut source_error = None;
        let mut buf = vec![0u8; CHUNK_SIZE];
        loop {
            let n = match source.read(&mut buf).await {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) => {
                    source_error = Some(interrupted(&remote, e));
                    break;
                }
            };
            if tx.send(buf[..n].to_vec()).await.is_err() {
                // the worker stopped; its own error explains why
                break;
            }
        }
        drop(tx);

        let worker_result = worker.await.map_err(worker_failed).and_then(|r| r);
        let result = match (worker_result, source_error) {
            (Err(e), _) => Err(e),
            (Ok(_), Some(e)) => Err(e),
            (Ok(total), None) => Ok(total),
        };
        if let Ok(total) = &result {
            debug!("[sftp] uploaded {} ({} bytes)", remote, total);
        }
        self.track(result)
    }
}
