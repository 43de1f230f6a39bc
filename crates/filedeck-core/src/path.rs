//! Remote path helpers. Remote paths are always `/`-separated, whatever
//! the local platform is.

use crate::error::{RemoteError, RemoteResult};

/// Join an upload base directory and a relative path. An empty or root
/// base places the file directly under `/`.
pub fn join_upload_path(base: &str, relative: &str) -> String {
    let relative = relative.trim_start_matches('/');
    if base.is_empty() || base == "/" {
        format!("/{}", relative)
    } else {
        format!("{}/{}", base.trim_end_matches('/'), relative)
    }
}

/// Join a directory and a child name.
pub fn join_child(dir: &str, name: &str) -> String {
    if dir.ends_with('/') {
        format!("{}{}", dir, name)
    } else {
        format!("{}/{}", dir, name)
    }
}

/// Everything before the last `/`. `None` for a bare relative name;
/// `/` for a top-level absolute path.
pub fn parent(path: &str) -> Option<String> {
    let trimmed = path.trim_end_matches('/');
    match trimmed.rfind('/') {
        Some(0) => Some("/".to_string()),
        Some(pos) => Some(trimmed[..pos].to_string()),
        None => None,
    }
}

/// Final path segment; used as the suggested download file name.
pub fn file_name(path: &str) -> String {
    path.trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|s| !s.is_empty())
        .unwrap_or("download")
        .to_string()
}

/// Every proper prefix directory of `path`, shortest first.
/// `/a/b/c` yields `/a`, `/a/b`; `a/b/c` yields `a`, `a/b`.
pub fn ancestors(path: &str) -> Vec<String> {
    let absolute = path.starts_with('/');
    let parts: Vec<&str> = path.split('/').filter(|p| !p.is_empty()).collect();
    let mut out = Vec::new();
    let mut current = String::new();
    for part in parts.iter().take(parts.len().saturating_sub(1)) {
        if absolute || !current.is_empty() {
            current.push('/');
        }
        current.push_str(part);
        out.push(current.clone());
    }
    out
}

/// Validate a client-supplied relative upload path: `\` separators are
/// accepted, empty and `..` segments are not.
pub fn sanitize_relative(relative: &str) -> RemoteResult<String> {
    let unified = relative.replace('\\', "/");
    let segments: Vec<&str> = unified
        .split('/')
        .filter(|s| !s.is_empty() && *s != ".")
        .collect();
    if segments.is_empty() {
        return Err(RemoteError::config("Empty relative path"));
    }
    if segments.iter().any(|s| *s == "..") {
        return Err(RemoteError::config(format!(
            "Relative path must not contain '..': {}",
            relative
        )));
    }
    Ok(segments.join("/"))
}
