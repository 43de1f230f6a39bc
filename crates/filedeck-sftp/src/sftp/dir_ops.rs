// ── Directory operations ─────────────────────────────────────────────────────

use crate::sftp::error::classify;
use crate::sftp::session::SftpClient;
use chrono::{TimeZone, Utc};
use filedeck_core::normalize::{kind_from_mode, permissions_from_mode};
use filedeck_core::path::{ancestors, join_child, parent};
use filedeck_core::{Entry, EntryKind, RemoteError, RemoteErrorKind, RemoteResult};
use log::debug;
use ssh2::{FileStat, Sftp};
use std::path::{Path, PathBuf};

const DIR_MODE: i32 = 0o755;

impl SftpClient {
    // ── List directory ───────────────────────────────────────────────────────

    pub async fn list_directory(&mut self, path: &str) -> RemoteResult<Vec<Entry>> {
        let path = self.resolve(path);
        self.with_sftp(move |sftp| read_dir(sftp, &path)).await
    }

    // ── Working directory (simulated) ────────────────────────────────────────

    pub fn working_directory(&self) -> String {
        self.cwd.clone()
    }

    /// Move the simulated working directory. Nothing changes on the server;
    /// the target only has to exist and be a directory.
    pub async fn set_working_directory(&mut self, path: &str) -> RemoteResult<String> {
        let target = self.resolve(path);
        let probe = target.clone();
        let stat = self
            .with_sftp(move |sftp| match sftp.stat(Path::new(&probe)) {
                Ok(stat) => Ok(Some(stat)),
                Err(e) => {
                    let err = classify(&e, Some(&probe));
                    if err.is(RemoteErrorKind::Network) {
                        Err(err)
                    } else {
                        Ok(None)
                    }
                }
            })
            .await?;
        self.enter_directory(path, target, stat.as_ref())
    }

    /// Move `cwd` to `target` only if `stat` shows a directory there.
    pub(crate) fn enter_directory(
        &mut self,
        requested: &str,
        target: String,
        stat: Option<&FileStat>,
    ) -> RemoteResult<String> {
        match stat {
            Some(stat) if is_dir(stat) => {
                self.cwd = target.clone();
                Ok(target)
            }
            Some(_) => Err(RemoteError::protocol(format!("Not a directory: {}", requested))),
            None => Err(RemoteError::protocol(format!("Directory not found: {}", requested))),
        }
    }

    // ── Create directory ─────────────────────────────────────────────────────

    pub async fn make_directory(&mut self, path: &str) -> RemoteResult<()> {
        let path = self.resolve(path);
        self.with_sftp(move |sftp| mkdir_parents(sftp, &path)).await
    }

    // ── Remove directory (recursive) ─────────────────────────────────────────

    pub async fn remove_tree(&mut self, path: &str) -> RemoteResult<()> {
        let path = self.resolve(path);
        self.with_sftp(move |sftp| remove_recursive(sftp, Path::new(&path))).await
    }

    // ── Delete / rename ──────────────────────────────────────────────────────

    pub async fn delete(&mut self, path: &str) -> RemoteResult<()> {
        let path = self.resolve(path);
        self.with_sftp(move |sftp| {
            sftp.unlink(Path::new(&path)).map_err(|e| classify(&e, Some(&path)))
        })
        .await
    }

    pub async fn rename_path(&mut self, from: &str, to: &str) -> RemoteResult<()> {
        let from = self.resolve(from);
        let to = self.resolve(to);
        self.with_sftp(move |sftp| {
            sftp.rename(Path::new(&from), Path::new(&to), None)
                .map_err(|e| classify(&e, Some(&from)))
        })
        .await
    }
}

// ── Blocking helpers ─────────────────────────────────────────────────────────

pub(crate) fn to_entry(entry_path: &Path, stat: &FileStat) -> Option<Entry> {
    let name = entry_path.file_name()?.to_string_lossy().to_string();
    if name == "." || name == ".." {
        return None;
    }
    let (kind, permissions) = match stat.perm {
        Some(mode) => (kind_from_mode(mode), Some(permissions_from_mode(mode))),
        None => (EntryKind::Unknown, None),
    };
    let modified = stat
        .mtime
        .and_then(|t| i64::try_from(t).ok())
        .and_then(|t| Utc.timestamp_opt(t, 0).single());
    Some(Entry::new(
        name,
        kind,
        stat.size.unwrap_or(0),
        modified,
        permissions,
    ))
}

/// Mode bits say directory. A stat without mode bits is not one.
pub(crate) fn is_dir(stat: &FileStat) -> bool {
    stat.perm.map(kind_from_mode) == Some(EntryKind::Directory)
}

fn read_dir(sftp: &Sftp, path: &str) -> RemoteResult<Vec<Entry>> {
    let raw = sftp
        .readdir(Path::new(path))
        .map_err(|e| classify(&e, Some(path)))?;
    Ok(raw
        .iter()
        .filter_map(|(entry_path, stat)| to_entry(entry_path, stat))
        .collect())
}

fn exists(sftp: &Sftp, path: &str) -> RemoteResult<bool> {
    match sftp.lstat(Path::new(path)) {
        Ok(_) => Ok(true),
        Err(e) => {
            let err = classify(&e, Some(path));
            if err.is(RemoteErrorKind::Network) {
                Err(err)
            } else {
                Ok(false)
            }
        }
    }
}

/// `mkdir -p`, except that an existing target is a `Conflict`.
fn mkdir_parents(sftp: &Sftp, path: &str) -> RemoteResult<()> {
    let first = match sftp.mkdir(Path::new(path), DIR_MODE) {
        Ok(()) => return Ok(()),
        Err(e) => classify(&e, Some(path)),
    };
    if first.is(RemoteErrorKind::Network) || first.is(RemoteErrorKind::Conflict) {
        return Err(first);
    }
    // Most servers report a plain FX_FAILURE for both cases.
    if exists(sftp, path)? {
        return Err(RemoteError::already_exists(path));
    }
    let parent_missing = match parent(path) {
        Some(p) if p != "/" => !exists(sftp, &p)?,
        _ => false,
    };
    if !parent_missing {
        return Err(first);
    }
    for dir in ancestors(path) {
        if !exists(sftp, &dir)? {
            debug!("[sftp] creating missing parent {}", dir);
            sftp.mkdir(Path::new(&dir), DIR_MODE)
                .map_err(|e| classify(&e, Some(&dir)))?;
        }
    }
    sftp.mkdir(Path::new(path), DIR_MODE)
        .map_err(|e| classify(&e, Some(path)))
}

/// Children first; links are unlinked, never followed.
fn remove_recursive(sftp: &Sftp, path: &Path) -> RemoteResult<()> {
    let shown = path.to_string_lossy().to_string();
    let children: Vec<(PathBuf, FileStat)> = sftp
        .readdir(path)
        .map_err(|e| classify(&e, Some(&shown)))?;

    for (child, stat) in children {
        let name = match child.file_name() {
            Some(n) => n.to_string_lossy().to_string(),
            None => continue,
        };
        if name == "." || name == ".." {
            continue;
        }
        let child = PathBuf::from(join_child(&shown, &name));
        let kind = stat.perm.map(kind_from_mode).unwrap_or(EntryKind::Unknown);
        if kind == EntryKind::Directory {
            remove_recursive(sftp, &child)?;
        } else {
            sftp.unlink(&child)
                .map_err(|e| classify(&e, Some(&child.to_string_lossy())))?;
        }
    }

    sftp.rmdir(path).map_err(|e| classify(&e, Some(&shown)))
}
