//! Live sessions: one exclusively-owned adapter plus its current-path
//! cursor, addressed by an opaque id.
//!
//! - `registry`: the process-wide id → session map
//! - `serializer`: per-session FIFO execution of operations

pub mod registry;
pub mod serializer;

pub use registry::SessionRegistry;
pub use serializer::{acquire, release, with_session, SessionGuard};

use chrono::{DateTime, Utc};
use filedeck_core::{Protocol, RemoteFs};
use serde::Serialize;
use std::sync::{Arc, RwLock};
use tokio::sync::Mutex;

/// Session metadata as reported to callers. Never carries credentials.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    pub id: String,
    pub protocol: Protocol,
    pub host: String,
    pub port: u16,
    pub username: String,
    pub current_path: String,
    pub connected_at: DateTime<Utc>,
    pub connected: bool,
}

/// State only ever touched while holding the session's operation slot.
pub struct SessionState {
    pub adapter: Box<dyn RemoteFs>,
    pub current_path: String,
    /// Set by disconnect; operations queued behind it see a missing session.
    pub(crate) retired: bool,
}

pub struct Session {
    /// Snapshot readable without waiting for the operation slot.
    info: RwLock<SessionInfo>,
    /// `tokio::sync::Mutex` grants the lock in request order.
    pub(crate) state: Arc<Mutex<SessionState>>,
}

impl Session {
    pub fn new(info: SessionInfo, adapter: Box<dyn RemoteFs>) -> Self {
        let current_path = info.current_path.clone();
        Self {
            info: RwLock::new(info),
            state: Arc::new(Mutex::new(SessionState {
                adapter,
                current_path,
                retired: false,
            })),
        }
    }

    pub fn id(&self) -> String {
        self.info().id
    }

    pub fn info(&self) -> SessionInfo {
        match self.info.read() {
            Ok(info) => info.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Mirror the path and liveness of `state` into the snapshot.
    pub(crate) fn publish(&self, state: &SessionState) {
        let mut info = match self.info.write() {
            Ok(info) => info,
            Err(poisoned) => poisoned.into_inner(),
        };
        info.current_path = state.current_path.clone();
        info.connected = !state.retired && state.adapter.is_connected();
    }
}
