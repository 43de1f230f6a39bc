use axum::{
    body::Body,
    extract::{
        multipart::{MultipartError, MultipartRejection},
        rejection::{JsonRejection, QueryRejection},
        DefaultBodyLimit, Multipart, Query, State,
    },
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use bytes::Bytes;
use filedeck_core::path::file_name;
use filedeck_core::{Entry, RemoteError, RemoteErrorKind, RemoteResult};
use futures::{stream, StreamExt};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::Deserialize;
use std::collections::HashMap;
use std::io;
use tokio::io::{AsyncReadExt, DuplexStream};
use tokio::task::JoinHandle;

use crate::{
    batch::{BatchReport, UploadItem},
    connector::ConnectRequest,
    envelope::ApiResponse,
    service::{ConnectResult, DirectoryChange, DownloadResult, RemoteFileServiceState},
    session::SessionInfo,
};

const DOWNLOAD_CHUNK: usize = 64 * 1024;

/// `encodeURIComponent`-style set for the attachment filename.
const FILENAME: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~')
    .remove(b'!')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

pub fn create_router(service: RemoteFileServiceState) -> Router {
    let body_limit = service.config().server.max_upload_bytes;
    let ftp = Router::new()
        .route("/connect", post(connect))
        .route("/disconnect", post(disconnect))
        .route("/list", get(list))
        .route("/cd", post(change_directory))
        .route("/pwd", get(print_working_directory))
        .route("/mkdir", post(make_directory))
        .route("/rmdir", post(remove_directory))
        .route("/delete", post(delete_file))
        .route("/rename", post(rename))
        .route("/download", get(download))
        .route("/upload", post(upload))
        .route("/session", get(session_info));

    Router::new()
        .route("/api/health", get(health_check))
        .nest("/api/ftp", ftp)
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(service)
}

// ── Errors ───────────────────────────────────────────────────────────────────

/// A `RemoteError` on its way out as an envelope.
#[derive(Debug)]
pub struct ApiError(pub RemoteError);

impl ApiError {
    fn status(&self) -> StatusCode {
        match self.0.kind {
            RemoteErrorKind::SessionNotFound => StatusCode::NOT_FOUND,
            RemoteErrorKind::Config => StatusCode::BAD_REQUEST,
            RemoteErrorKind::Auth => StatusCode::UNAUTHORIZED,
            RemoteErrorKind::Conflict => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::warn!(kind = %self.0.kind, session = ?self.0.session_id, "{}", self.0.message);
        }
        (status, Json(ApiResponse::<()>::failed(&self.0))).into_response()
    }
}

impl From<RemoteError> for ApiError {
    fn from(e: RemoteError) -> Self {
        Self(e)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(e: JsonRejection) -> Self {
        Self(RemoteError::config(e.body_text()))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(e: QueryRejection) -> Self {
        Self(RemoteError::config(e.body_text()))
    }
}

impl From<MultipartRejection> for ApiError {
    fn from(e: MultipartRejection) -> Self {
        Self(RemoteError::config(e.body_text()))
    }
}

impl From<MultipartError> for ApiError {
    fn from(e: MultipartError) -> Self {
        Self(RemoteError::config(format!("Malformed upload: {}", e.body_text())))
    }
}

type Reply<T> = Result<Json<ApiResponse<T>>, ApiError>;

// ── Requests ─────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionRequest {
    session_id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListQuery {
    session_id: String,
    #[serde(default)]
    path: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PathRequest {
    session_id: String,
    path: String,
}

/// A mutation on `path`, answered with a listing of `current_path`.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MutationRequest {
    session_id: String,
    path: String,
    #[serde(default)]
    current_path: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RenameRequest {
    session_id: String,
    old_path: String,
    new_path: String,
    #[serde(default)]
    current_path: Option<String>,
}

// ── Handlers ─────────────────────────────────────────────────────────────────

async fn health_check(
    State(service): State<RemoteFileServiceState>,
) -> Json<ApiResponse<serde_json::Value>> {
    Json(ApiResponse::ok(serde_json::json!({
        "status": "ok",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "sessions": service.session_count().await,
    })))
}

async fn connect(
    State(service): State<RemoteFileServiceState>,
    payload: Result<Json<ConnectRequest>, JsonRejection>,
) -> Reply<ConnectResult> {
    let Json(req) = payload?;
    Ok(Json(ApiResponse::ok(service.connect(req).await?)))
}

async fn disconnect(
    State(service): State<RemoteFileServiceState>,
    payload: Result<Json<SessionRequest>, JsonRejection>,
) -> Reply<()> {
    let Json(req) = payload?;
    service.disconnect(&req.session_id).await?;
    Ok(Json(ApiResponse::done()))
}

async fn list(
    State(service): State<RemoteFileServiceState>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Reply<Vec<Entry>> {
    let Query(q) = query?;
    Ok(Json(ApiResponse::ok(service.list(&q.session_id, q.path).await?)))
}

async fn change_directory(
    State(service): State<RemoteFileServiceState>,
    payload: Result<Json<PathRequest>, JsonRejection>,
) -> Reply<DirectoryChange> {
    let Json(req) = payload?;
    let change = service.change_directory(&req.session_id, req.path).await?;
    Ok(Json(ApiResponse::ok(change)))
}

async fn print_working_directory(
    State(service): State<RemoteFileServiceState>,
    query: Result<Query<SessionRequest>, QueryRejection>,
) -> Reply<serde_json::Value> {
    let Query(q) = query?;
    let path = service.print_working_directory(&q.session_id).await?;
    Ok(Json(ApiResponse::ok(serde_json::json!({ "path": path }))))
}

async fn make_directory(
    State(service): State<RemoteFileServiceState>,
    payload: Result<Json<MutationRequest>, JsonRejection>,
) -> Reply<Vec<Entry>> {
    let Json(req) = payload?;
    let files = service
        .make_directory(&req.session_id, req.path, req.current_path)
        .await?;
    Ok(Json(ApiResponse::ok(files)))
}

async fn remove_directory(
    State(service): State<RemoteFileServiceState>,
    payload: Result<Json<MutationRequest>, JsonRejection>,
) -> Reply<Vec<Entry>> {
    let Json(req) = payload?;
    let files = service
        .remove_directory(&req.session_id, req.path, req.current_path)
        .await?;
    Ok(Json(ApiResponse::ok(files)))
}

async fn delete_file(
    State(service): State<RemoteFileServiceState>,
    payload: Result<Json<MutationRequest>, JsonRejection>,
) -> Reply<Vec<Entry>> {
    let Json(req) = payload?;
    let files = service
        .delete_file(&req.session_id, req.path, req.current_path)
        .await?;
    Ok(Json(ApiResponse::ok(files)))
}

async fn rename(
    State(service): State<RemoteFileServiceState>,
    payload: Result<Json<RenameRequest>, JsonRejection>,
) -> Reply<Vec<Entry>> {
    let Json(req) = payload?;
    let files = service
        .rename(&req.session_id, req.old_path, req.new_path, req.current_path)
        .await?;
    Ok(Json(ApiResponse::ok(files)))
}

async fn session_info(
    State(service): State<RemoteFileServiceState>,
    query: Result<Query<SessionRequest>, QueryRejection>,
) -> Reply<SessionInfo> {
    let Query(q) = query?;
    Ok(Json(ApiResponse::ok(service.session_info(&q.session_id).await?)))
}

// ── Download ─────────────────────────────────────────────────────────────────

type DownloadTask = JoinHandle<RemoteResult<DownloadResult>>;

/// Stream a remote file. The transfer runs in its own task writing into an
/// in-memory pipe; the response head goes out only once the first chunk
/// (or a clean end of file) has arrived, so early failures still get an
/// error envelope. A failure after that aborts the body.
async fn download(
    State(service): State<RemoteFileServiceState>,
    query: Result<Query<PathRequest>, QueryRejection>,
) -> Result<Response, ApiError> {
    let Query(q) = query?;
    let filename = file_name(&q.path);

    let (mut reader, mut writer) = tokio::io::duplex(DOWNLOAD_CHUNK);
    let task: DownloadTask = tokio::spawn(async move {
        service.download(&q.session_id, &q.path, &mut writer).await
    });

    let mut buf = vec![0u8; DOWNLOAD_CHUNK];
    let n = reader
        .read(&mut buf)
        .await
        .map_err(|e| RemoteError::from_io("Download", &e))?;

    let body = if n == 0 {
        finish(task).await?;
        Body::empty()
    } else {
        buf.truncate(n);
        let first = stream::once(async move { Ok::<_, io::Error>(Bytes::from(buf)) });
        Body::from_stream(first.chain(remaining(reader, task)))
    };

    let disposition = format!(
        "attachment; filename=\"{}\"",
        utf8_percent_encode(&filename, FILENAME)
    );
    Ok((
        [
            (header::CONTENT_TYPE, "application/octet-stream".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response())
}

async fn finish(task: DownloadTask) -> RemoteResult<DownloadResult> {
    task.await
        .map_err(|e| RemoteError::protocol(format!("Download task failed: {}", e)))?
}

/// Everything after the first chunk. At end of pipe the transfer task's
/// result decides between a clean end and an aborted body.
fn remaining(
    reader: DuplexStream,
    task: DownloadTask,
) -> impl futures::Stream<Item = Result<Bytes, io::Error>> + Send {
    stream::unfold(Some((reader, task)), |state| async move {
        let (mut reader, task) = state?;
        let mut buf = vec![0u8; DOWNLOAD_CHUNK];
        match reader.read(&mut buf).await {
            Ok(0) => match finish(task).await {
                Ok(_) => None,
                Err(e) => {
                    tracing::warn!(error = %e, "download aborted mid-stream");
                    Some((Err(io::Error::other(e.message)), None))
                }
            },
            Ok(n) => {
                buf.truncate(n);
                Some((Ok(Bytes::from(buf)), Some((reader, task))))
            }
            Err(e) => Some((Err(e), None)),
        }
    })
}

// ── Upload ───────────────────────────────────────────────────────────────────

/// Multipart batch upload: `sessionId`, `basePath`, repeated `files` parts
/// and optional `relativePaths[i]` fields naming where file `i` goes.
async fn upload(
    State(service): State<RemoteFileServiceState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Reply<BatchReport> {
    let mut multipart = multipart?;
    let mut session_id: Option<String> = None;
    let mut base_path = String::new();
    let mut files: Vec<(Option<String>, Bytes)> = Vec::new();
    let mut relative_paths: HashMap<usize, String> = HashMap::new();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "sessionId" => session_id = Some(field.text().await?),
            "basePath" => base_path = field.text().await?,
            "files" => {
                let original = field.file_name().map(str::to_string);
                files.push((original, field.bytes().await?));
            }
            other => {
                if let Some(index) = relative_path_index(other) {
                    relative_paths.insert(index, field.text().await?);
                }
            }
        }
    }

    let session_id = session_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| RemoteError::config("sessionId is required"))?;
    let items = files
        .into_iter()
        .enumerate()
        .map(|(i, (original, content))| UploadItem {
            relative_path: relative_paths
                .remove(&i)
                .or(original)
                .unwrap_or_default(),
            content,
        })
        .collect();

    let report = service.upload_batch(&session_id, base_path, items).await?;
    let success = report.success();
    Ok(Json(ApiResponse::partial(report, success)))
}

fn relative_path_index(field: &str) -> Option<usize> {
    field
        .strip_prefix("relativePaths[")?
        .strip_suffix(']')?
        .parse()
        .ok()
}
