//! In-memory `RemoteFs` and `Connector` doubles with timing capture and
//! failure injection.

#![allow(dead_code)]

use async_trait::async_trait;
use filedeck_core::path::{join_child, parent};
use filedeck_core::{ByteSink, ByteSource, Entry, EntryKind, RemoteError, RemoteFs, RemoteResult};
use filedeck_lib::config::AppConfig;
use filedeck_lib::connector::{ConnectRequest, ConnectionConfig, Connector};
use filedeck_lib::service::{RemoteFileService, RemoteFileServiceState};
use filedeck_core::Protocol;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

#[derive(Debug, Clone)]
pub enum Node {
    Dir,
    File(Vec<u8>),
}

/// The remote filesystem one host exposes, plus knobs for making
/// individual operations fail.
#[derive(Debug)]
pub struct MockTree {
    pub nodes: BTreeMap<String, Node>,
    pub cwd: String,
    pub fail_upload: HashSet<String>,
    pub fail_mkdir: HashSet<String>,
    pub fail_list: HashSet<String>,
    /// Listing one of these drops the connection.
    pub sever_on_list: HashSet<String>,
    pub link_down: bool,
    /// Cut downloads off after this many bytes.
    pub download_cut_after: Option<usize>,
    pub mkdir_calls: Vec<String>,
    pub cwd_calls: Vec<String>,
}

impl MockTree {
    /// `/home/alice` with files `b`, `a` and directory `A`.
    pub fn seeded() -> Self {
        let mut nodes = BTreeMap::new();
        nodes.insert("/".to_string(), Node::Dir);
        nodes.insert("/home".to_string(), Node::Dir);
        nodes.insert("/home/alice".to_string(), Node::Dir);
        nodes.insert("/home/alice/b".to_string(), Node::File(b"bee".to_vec()));
        nodes.insert("/home/alice/A".to_string(), Node::Dir);
        nodes.insert("/home/alice/a".to_string(), Node::File(b"ay".to_vec()));
        Self {
            nodes,
            cwd: "/home/alice".to_string(),
            fail_upload: HashSet::new(),
            fail_mkdir: HashSet::new(),
            fail_list: HashSet::new(),
            sever_on_list: HashSet::new(),
            link_down: false,
            download_cut_after: None,
            mkdir_calls: Vec::new(),
            cwd_calls: Vec::new(),
        }
    }

    fn resolve(&self, path: &str) -> String {
        let joined = if path.is_empty() {
            self.cwd.clone()
        } else if path.starts_with('/') {
            path.to_string()
        } else {
            join_child(&self.cwd, path)
        };
        let trimmed = joined.trim_end_matches('/');
        if trimmed.is_empty() {
            "/".to_string()
        } else {
            trimmed.to_string()
        }
    }

    fn is_dir(&self, path: &str) -> bool {
        matches!(self.nodes.get(path), Some(Node::Dir))
    }

    pub fn file(&self, path: &str) -> Option<Vec<u8>> {
        match self.nodes.get(path) {
            Some(Node::File(data)) => Some(data.clone()),
            _ => None,
        }
    }

    pub fn has(&self, path: &str) -> bool {
        self.nodes.contains_key(path)
    }

    fn children(&self, dir: &str) -> Vec<(String, Node)> {
        self.nodes
            .iter()
            .filter(|(p, _)| p.as_str() != "/" && parent(p).as_deref() == Some(dir))
            .map(|(p, n)| (p.rsplit('/').next().unwrap_or_default().to_string(), n.clone()))
            .collect()
    }

    fn subtree(&self, root: &str) -> Vec<String> {
        let prefix = format!("{}/", root);
        self.nodes
            .keys()
            .filter(|p| p.as_str() == root || p.starts_with(&prefix))
            .cloned()
            .collect()
    }
}

pub type SharedTree = Arc<Mutex<MockTree>>;

/// One recorded adapter call.
#[derive(Debug, Clone)]
pub struct OpSpan {
    pub host: String,
    pub op: &'static str,
    pub start: Instant,
    pub end: Instant,
}

pub type OpLog = Arc<Mutex<Vec<OpSpan>>>;

pub struct MockRemote {
    host: String,
    tree: SharedTree,
    log: OpLog,
    delay: Duration,
    connected: bool,
}

impl MockRemote {
    async fn traced<T>(
        &self,
        op: &'static str,
        f: impl FnOnce(&mut MockTree) -> RemoteResult<T>,
    ) -> RemoteResult<T> {
        let start = Instant::now();
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let result = {
            let mut tree = self.tree.lock().unwrap();
            f(&mut tree)
        };
        self.log.lock().unwrap().push(OpSpan {
            host: self.host.clone(),
            op,
            start,
            end: Instant::now(),
        });
        result
    }
}

#[async_trait]
impl RemoteFs for MockRemote {
    async fn disconnect(&mut self) {
        self.connected = false;
    }

    async fn list(&mut self, path: &str) -> RemoteResult<Vec<Entry>> {
        self.traced("list", |t| {
            let dir = t.resolve(path);
            if t.sever_on_list.contains(&dir) {
                t.link_down = true;
                return Err(RemoteError::network("Connection reset by peer"));
            }
            if t.fail_list.contains(&dir) {
                return Err(RemoteError::protocol(format!("Cannot list {}", dir)));
            }
            if !t.is_dir(&dir) {
                return Err(RemoteError::not_found(&dir));
            }
            Ok(t.children(&dir)
                .into_iter()
                .map(|(name, node)| match node {
                    Node::Dir => Entry::new(name, EntryKind::Directory, 0, None, Some("rwxr-xr-x".into())),
                    Node::File(d) => Entry::new(name, EntryKind::File, d.len() as u64, None, Some("rw-r-----".into())),
                })
                .collect())
        })
        .await
    }

    async fn print_working_directory(&mut self) -> RemoteResult<String> {
        self.traced("pwd", |t| Ok(t.cwd.clone())).await
    }

    async fn change_directory(&mut self, path: &str) -> RemoteResult<String> {
        self.traced("cd", |t| {
            let target = t.resolve(path);
            t.cwd_calls.push(target.clone());
            if !t.is_dir(&target) {
                return Err(RemoteError::protocol(format!("Directory not found: {}", target)));
            }
            t.cwd = target.clone();
            Ok(target)
        })
        .await
    }

    async fn create_directory(&mut self, path: &str) -> RemoteResult<()> {
        self.traced("mkdir", |t| {
            let target = t.resolve(path);
            t.mkdir_calls.push(target.clone());
            if t.fail_mkdir.contains(&target) {
                return Err(RemoteError::protocol(format!("Permission denied: {}", target)));
            }
            if t.has(&target) {
                return Err(RemoteError::already_exists(&target));
            }
            let mut dir = target.clone();
            let mut missing = vec![dir.clone()];
            while let Some(p) = parent(&dir) {
                if t.has(&p) {
                    break;
                }
                missing.push(p.clone());
                dir = p;
            }
            for d in missing {
                t.nodes.insert(d, Node::Dir);
            }
            Ok(())
        })
        .await
    }

    async fn remove_directory(&mut self, path: &str) -> RemoteResult<()> {
        self.traced("rmdir", |t| {
            let target = t.resolve(path);
            if !t.is_dir(&target) {
                return Err(RemoteError::not_found(&target));
            }
            for p in t.subtree(&target) {
                t.nodes.remove(&p);
            }
            Ok(())
        })
        .await
    }

    async fn delete_file(&mut self, path: &str) -> RemoteResult<()> {
        self.traced("delete", |t| {
            let target = t.resolve(path);
            match t.nodes.get(&target) {
                Some(Node::File(_)) => {
                    t.nodes.remove(&target);
                    Ok(())
                }
                _ => Err(RemoteError::not_found(&target)),
            }
        })
        .await
    }

    async fn rename(&mut self, from: &str, to: &str) -> RemoteResult<()> {
        self.traced("rename", |t| {
            let (from, to) = (t.resolve(from), t.resolve(to));
            if !t.has(&from) {
                return Err(RemoteError::not_found(&from));
            }
            if t.has(&to) {
                return Err(RemoteError::already_exists(&to));
            }
            for old in t.subtree(&from) {
                if let Some(node) = t.nodes.remove(&old) {
                    let new = format!("{}{}", to, &old[from.len()..]);
                    t.nodes.insert(new, node);
                }
            }
            Ok(())
        })
        .await
    }

    async fn download_to(&mut self, path: &str, sink: &mut ByteSink<'_>) -> RemoteResult<u64> {
        let (data, cut) = self
            .traced("download", |t| {
                let target = t.resolve(path);
                let data = t.file(&target).ok_or_else(|| RemoteError::not_found(&target))?;
                Ok((data, t.download_cut_after))
            })
            .await?;
        let send = cut.map_or(data.len(), |n| n.min(data.len()));
        sink.write_all(&data[..send])
            .await
            .map_err(|e| RemoteError::from_io("Download", &e))?;
        sink.flush().await.map_err(|e| RemoteError::from_io("Download", &e))?;
        if cut.is_some() {
            return Err(RemoteError::transfer(format!("Download of {} interrupted", path)));
        }
        Ok(send as u64)
    }

    async fn upload_from(&mut self, path: &str, source: &mut ByteSource<'_>) -> RemoteResult<u64> {
        let mut data = Vec::new();
        source
            .read_to_end(&mut data)
            .await
            .map_err(|e| RemoteError::from_io("Upload", &e))?;
        self.traced("upload", move |t| {
            let target = t.resolve(path);
            if t.fail_upload.contains(&target) {
                return Err(RemoteError::protocol(format!("Permission denied: {}", target)));
            }
            match parent(&target) {
                Some(dir) if t.is_dir(&dir) => {}
                _ => return Err(RemoteError::protocol(format!("No parent for {}", target))),
            }
            let len = data.len() as u64;
            t.nodes.insert(target, Node::File(data));
            Ok(len)
        })
        .await
    }

    fn is_connected(&self) -> bool {
        self.connected && !self.tree.lock().unwrap().link_down
    }
}

/// Hands out `MockRemote`s, one filesystem per host. Host `down.example`
/// is unreachable, user `nobody` is rejected and a host in `empty_home`
/// fails its initial listing.
#[derive(Default)]
pub struct MockConnector {
    trees: Mutex<HashMap<String, SharedTree>>,
    pub log: OpLog,
    pub delay: Duration,
    pub connects: Mutex<usize>,
}

impl MockConnector {
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Default::default()
        }
    }

    pub fn tree(&self, host: &str) -> SharedTree {
        self.trees
            .lock()
            .unwrap()
            .entry(host.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(MockTree::seeded())))
            .clone()
    }

    pub fn spans(&self) -> Vec<OpSpan> {
        self.log.lock().unwrap().clone()
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn connect(&self, config: &ConnectionConfig) -> RemoteResult<Box<dyn RemoteFs>> {
        *self.connects.lock().unwrap() += 1;
        if config.host() == "down.example" {
            return Err(RemoteError::network("Connection refused"));
        }
        if config.username() == "nobody" {
            return Err(RemoteError::auth("Login failed"));
        }
        Ok(Box::new(MockRemote {
            host: config.host().to_string(),
            tree: self.tree(config.host()),
            log: self.log.clone(),
            delay: self.delay,
            connected: true,
        }))
    }
}

pub fn request(protocol: Protocol, host: &str) -> ConnectRequest {
    ConnectRequest {
        protocol,
        host: host.to_string(),
        port: None,
        username: "alice".to_string(),
        password: Some("secret".to_string()),
        private_key: None,
        passphrase: None,
    }
}

pub fn service(connector: Arc<MockConnector>) -> RemoteFileServiceState {
    RemoteFileService::new(connector, AppConfig::default())
}

pub async fn open(service: &RemoteFileServiceState, host: &str) -> String {
    service
        .connect(request(Protocol::Sftp, host))
        .await
        .unwrap()
        .session
        .id
}
