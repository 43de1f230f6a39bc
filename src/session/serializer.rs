//! Per-session operation slot.
//!
//! Each session owns one fair mutex around its adapter and current path.
//! Waiters are granted the lock in the order they asked for it, so
//! operations on one session run one at a time in submission order while
//! different sessions never wait on each other. A failed operation simply
//! releases the slot; its error goes to its own caller only. A session is
//! registered only while its adapter reports a live connection.

use super::{Session, SessionRegistry, SessionState};
use filedeck_core::{RemoteError, RemoteResult};
use futures::future::BoxFuture;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use tokio::sync::OwnedMutexGuard;
use tracing::warn;

/// Exclusive access to one session's state. Dropping it publishes the
/// state to the session snapshot and frees the slot for the next waiter.
pub struct SessionGuard {
    session: Arc<Session>,
    state: OwnedMutexGuard<SessionState>,
}

impl SessionGuard {
    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }
}

impl Deref for SessionGuard {
    type Target = SessionState;

    fn deref(&self) -> &SessionState {
        &self.state
    }
}

impl DerefMut for SessionGuard {
    fn deref_mut(&mut self) -> &mut SessionState {
        &mut self.state
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.session.publish(&self.state);
    }
}

/// Wait for the session's slot. `SessionNotFound` if the id is unknown,
/// if the session was disconnected while this caller was queued, or if its
/// adapter has lost the connection. A lost session is dropped from the
/// registry on the spot.
pub async fn acquire(registry: &SessionRegistry, id: &str) -> RemoteResult<SessionGuard> {
    let session = registry
        .get(id)
        .await
        .ok_or_else(|| RemoteError::session_not_found(id))?;
    let mut state = session.state.clone().lock_owned().await;
    if state.retired {
        return Err(RemoteError::session_not_found(id));
    }
    if !state.adapter.is_connected() {
        state.retired = true;
        session.publish(&state);
        drop(state);
        registry.delete(id).await;
        warn!(session = %id, "connection lost, session dropped");
        return Err(RemoteError::session_not_found(id));
    }
    Ok(SessionGuard { session, state })
}

/// Free the slot. If the operation left the adapter disconnected the
/// session is retired first, so every waiter sees it as gone, and then
/// removed from the registry.
pub async fn release(registry: &SessionRegistry, id: &str, mut guard: SessionGuard) {
    let lost = !guard.retired && !guard.adapter.is_connected();
    if lost {
        guard.retired = true;
    }
    drop(guard);
    if lost {
        registry.delete(id).await;
        warn!(session = %id, "connection lost, session dropped");
    }
}

/// Run `op` against the session's state once every earlier operation on
/// the same session has finished, and hand back `op`'s own result.
///
/// Once the slot is granted `op` runs on its own task: a caller that stops
/// waiting does not cut the operation short, and the next waiter only gets
/// the slot after it has finished.
pub async fn with_session<T, F>(registry: &SessionRegistry, id: &str, op: F) -> RemoteResult<T>
where
    T: Send + 'static,
    F: for<'s> FnOnce(&'s mut SessionState) -> BoxFuture<'s, RemoteResult<T>> + Send + 'static,
{
    let mut guard = acquire(registry, id).await?;
    let registry = registry.clone();
    let owner = id.to_string();
    let task = tokio::spawn(async move {
        let result = op(&mut *guard).await;
        release(&registry, &owner, guard).await;
        result
    });
    let result = match task.await {
        Ok(result) => result,
        Err(e) => Err(RemoteError::protocol(format!("Operation aborted: {}", e))),
    };
    result.map_err(|e| match e.session_id {
        Some(_) => e,
        None => e.with_session(id),
    })
}
