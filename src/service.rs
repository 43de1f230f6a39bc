//! The operation surface: every call names a session id and runs inside
//! that session's operation slot.

use crate::batch::{self, BatchReport, UploadItem};
use crate::config::AppConfig;
use crate::connector::{ConnectRequest, Connector};
use crate::session::{acquire, release, with_session, Session, SessionInfo, SessionRegistry};
use chrono::Utc;
use filedeck_core::normalize::normalize_listing;
use filedeck_core::path::file_name;
use filedeck_core::{ByteSink, Entry, RemoteError, RemoteResult};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

pub type RemoteFileServiceState = Arc<RemoteFileService>;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectResult {
    pub session: SessionInfo,
    pub files: Vec<Entry>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryChange {
    pub path: String,
    pub files: Vec<Entry>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadResult {
    /// Suggested name for the saved file.
    pub filename: String,
    pub bytes: u64,
}

pub struct RemoteFileService {
    registry: SessionRegistry,
    connector: Arc<dyn Connector>,
    config: AppConfig,
}

impl RemoteFileService {
    pub fn new(connector: Arc<dyn Connector>, config: AppConfig) -> RemoteFileServiceState {
        Arc::new(RemoteFileService {
            registry: SessionRegistry::new(),
            connector,
            config,
        })
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    // ── Lifecycle ────────────────────────────────────────────────────────────

    /// Connect, read the initial directory and list it. The session is
    /// registered only when all three succeed.
    pub async fn connect(&self, request: ConnectRequest) -> RemoteResult<ConnectResult> {
        let config = request.into_config(&self.config)?;
        info!(protocol = %config.protocol(), host = config.host(), user = config.username(), "connecting");

        let mut adapter = self.connector.connect(&config).await?;
        let initial = async {
            let path = adapter.print_working_directory().await?;
            let files = normalize_listing(adapter.list(&path).await?);
            Ok::<_, RemoteError>((path, files))
        }
        .await;
        let (path, files) = match initial {
            Ok(v) => v,
            Err(e) => {
                adapter.disconnect().await;
                return Err(e);
            }
        };

        let id = Uuid::new_v4().to_string();
        let info = SessionInfo {
            id: id.clone(),
            protocol: config.protocol(),
            host: config.host().to_string(),
            port: config.port(),
            username: config.username().to_string(),
            current_path: path,
            connected_at: Utc::now(),
            connected: true,
        };
        let session = Arc::new(Session::new(info.clone(), adapter));
        self.registry.create(&id, session).await?;
        info!(session = %id, path = %info.current_path, "session opened");

        Ok(ConnectResult { session: info, files })
    }

    /// Close the adapter, then forget the session. Operations already
    /// queued behind this one fail with `SessionNotFound`.
    pub async fn disconnect(&self, id: &str) -> RemoteResult<()> {
        with_session(&self.registry, id, |s| {
            Box::pin(async move {
                s.adapter.disconnect().await;
                s.retired = true;
                Ok(())
            })
        })
        .await?;
        self.registry.delete(id).await;
        info!(session = %id, "session closed");
        Ok(())
    }

    pub async fn disconnect_all(&self) {
        for id in self.registry.ids().await {
            if let Err(e) = self.disconnect(&id).await {
                warn!(session = %id, error = %e, "disconnect failed");
            }
        }
    }

    pub async fn session_info(&self, id: &str) -> RemoteResult<SessionInfo> {
        self.registry
            .get(id)
            .await
            .map(|s| s.info())
            .ok_or_else(|| RemoteError::session_not_found(id))
    }

    pub async fn session_count(&self) -> usize {
        self.registry.len().await
    }

    // ── Navigation ───────────────────────────────────────────────────────────

    /// List `path`, or the session's current path.
    pub async fn list(&self, id: &str, path: Option<String>) -> RemoteResult<Vec<Entry>> {
        with_session(&self.registry, id, |s| {
            Box::pin(async move {
                let path = non_empty(path).unwrap_or_else(|| s.current_path.clone());
                Ok(normalize_listing(s.adapter.list(&path).await?))
            })
        })
        .await
    }

    /// Change directory and list the new one. The session's current path
    /// moves only if both steps succeed.
    pub async fn change_directory(&self, id: &str, path: String) -> RemoteResult<DirectoryChange> {
        with_session(&self.registry, id, |s| {
            Box::pin(async move {
                let previous = s.current_path.clone();
                let new_path = s.adapter.change_directory(&path).await?;
                match s.adapter.list(&new_path).await {
                    Ok(files) => {
                        s.current_path = new_path.clone();
                        Ok(DirectoryChange {
                            path: new_path,
                            files: normalize_listing(files),
                        })
                    }
                    Err(e) => {
                        if new_path != previous {
                            if let Err(restore) = s.adapter.change_directory(&previous).await {
                                warn!(error = %restore, "could not return to {}", previous);
                            }
                        }
                        Err(e)
                    }
                }
            })
        })
        .await
    }

    /// The adapter's working directory. Does not move the session's
    /// current path.
    pub async fn print_working_directory(&self, id: &str) -> RemoteResult<String> {
        with_session(&self.registry, id, |s| {
            Box::pin(async move { s.adapter.print_working_directory().await })
        })
        .await
    }

    // ── Mutations (each answers with a fresh listing) ────────────────────────

    pub async fn make_directory(
        &self,
        id: &str,
        path: String,
        listing: Option<String>,
    ) -> RemoteResult<Vec<Entry>> {
        with_session(&self.registry, id, |s| {
            Box::pin(async move {
                s.adapter.create_directory(&path).await?;
                let listing = non_empty(listing).unwrap_or_else(|| s.current_path.clone());
                Ok(normalize_listing(s.adapter.list(&listing).await?))
            })
        })
        .await
    }

    pub async fn remove_directory(
        &self,
        id: &str,
        path: String,
        listing: Option<String>,
    ) -> RemoteResult<Vec<Entry>> {
        with_session(&self.registry, id, |s| {
            Box::pin(async move {
                s.adapter.remove_directory(&path).await?;
                let listing = non_empty(listing).unwrap_or_else(|| s.current_path.clone());
                Ok(normalize_listing(s.adapter.list(&listing).await?))
            })
        })
        .await
    }

    pub async fn delete_file(
        &self,
        id: &str,
        path: String,
        listing: Option<String>,
    ) -> RemoteResult<Vec<Entry>> {
        with_session(&self.registry, id, |s| {
            Box::pin(async move {
                s.adapter.delete_file(&path).await?;
                let listing = non_empty(listing).unwrap_or_else(|| s.current_path.clone());
                Ok(normalize_listing(s.adapter.list(&listing).await?))
            })
        })
        .await
    }

    pub async fn rename(
        &self,
        id: &str,
        from: String,
        to: String,
        listing: Option<String>,
    ) -> RemoteResult<Vec<Entry>> {
        with_session(&self.registry, id, |s| {
            Box::pin(async move {
                s.adapter.rename(&from, &to).await?;
                let listing = non_empty(listing).unwrap_or_else(|| s.current_path.clone());
                Ok(normalize_listing(s.adapter.list(&listing).await?))
            })
        })
        .await
    }

    // ── Transfers ────────────────────────────────────────────────────────────

    /// Stream `path` into `sink`. After a `Transfer` error the sink holds
    /// whatever arrived before the interruption.
    ///
    /// The sink is borrowed, so unlike the other operations this one runs
    /// on the caller's task; the HTTP binding drives it from a spawned one.
    pub async fn download(
        &self,
        id: &str,
        path: &str,
        sink: &mut ByteSink<'_>,
    ) -> RemoteResult<DownloadResult> {
        let mut guard = acquire(&self.registry, id).await?;
        let result = guard.adapter.download_to(path, sink).await;
        release(&self.registry, id, guard).await;
        let bytes = result.map_err(|e| e.with_session(id))?;
        info!(session = %id, path, bytes, "download finished");
        Ok(DownloadResult {
            filename: file_name(path),
            bytes,
        })
    }

    /// Upload a batch as one operation. Per-file failures are reported in
    /// the result; only an empty batch or a failed final listing fail the
    /// whole call.
    pub async fn upload_batch(
        &self,
        id: &str,
        base: String,
        items: Vec<UploadItem>,
    ) -> RemoteResult<BatchReport> {
        let count = items.len();
        let report = with_session(&self.registry, id, |s| {
            Box::pin(async move { batch::upload_batch(s, &base, items).await })
        })
        .await?;
        info!(session = %id, files = count, success = report.success(), "batch upload finished");
        Ok(report)
    }
}

fn non_empty(path: Option<String>) -> Option<String> {
    path.filter(|p| !p.trim().is_empty())
}
