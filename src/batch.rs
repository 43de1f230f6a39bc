//! Multi-file upload under a single operation slot, with per-file failure
//! isolation.

use crate::session::SessionState;
use bytes::Bytes;
use filedeck_core::normalize::normalize_listing;
use filedeck_core::path::{join_upload_path, parent, sanitize_relative};
use filedeck_core::{Entry, RemoteError, RemoteErrorKind, RemoteResult};
use serde::Serialize;
use std::collections::HashSet;

/// One file of a batch: where it goes relative to the base directory and
/// its content.
#[derive(Debug, Clone)]
pub struct UploadItem {
    pub relative_path: String,
    pub content: Bytes,
}

/// Result for one submitted file, in submission order.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UploadOutcome {
    /// The relative path as submitted.
    pub name: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    pub uploads: Vec<UploadOutcome>,
    pub files: Vec<Entry>,
}

impl BatchReport {
    pub fn success(&self) -> bool {
        self.uploads.iter().all(|u| u.success)
    }
}

/// Upload every item, creating parent directories as needed. A directory
/// that already exists is fine here (unlike a direct mkdir); any other
/// failure is recorded against that item and the batch moves on.
pub async fn upload_batch(
    state: &mut SessionState,
    base: &str,
    items: Vec<UploadItem>,
) -> RemoteResult<BatchReport> {
    if items.is_empty() {
        return Err(RemoteError::config("No files to upload"));
    }

    let mut created: HashSet<String> = HashSet::new();
    let mut uploads = Vec::with_capacity(items.len());

    for item in items {
        let outcome = match upload_one(state, base, &item, &mut created).await {
            Ok(bytes) => {
                tracing::debug!(path = %item.relative_path, bytes, "batch entry uploaded");
                UploadOutcome {
                    name: item.relative_path,
                    success: true,
                    error: None,
                }
            }
            Err(e) => {
                tracing::warn!(path = %item.relative_path, error = %e, "batch entry failed");
                UploadOutcome {
                    name: item.relative_path,
                    success: false,
                    error: Some(e.message),
                }
            }
        };
        uploads.push(outcome);
    }

    let listing_path = if base.is_empty() {
        state.current_path.clone()
    } else {
        base.to_string()
    };
    let files = normalize_listing(state.adapter.list(&listing_path).await?);
    Ok(BatchReport { uploads, files })
}

async fn upload_one(
    state: &mut SessionState,
    base: &str,
    item: &UploadItem,
    created: &mut HashSet<String>,
) -> RemoteResult<u64> {
    let relative = sanitize_relative(&item.relative_path)?;
    let remote = join_upload_path(base, &relative);

    if let Some(dir) = parent(&remote).filter(|d| d != "/") {
        if !created.contains(&dir) {
            match state.adapter.create_directory(&dir).await {
                Ok(()) => {}
                Err(e) if e.is(RemoteErrorKind::Conflict) => {}
                Err(e) => return Err(e),
            }
            created.insert(dir);
        }
    }

    let mut source: &[u8] = &item.content;
    state.adapter.upload_from(&remote, &mut source).await
}
