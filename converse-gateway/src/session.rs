//! Conversation session lifecycle.
//!
//! A [`SessionManager`] owns one caller's remote session id. The remote
//! service expires idle sessions on its own, so the manager tracks the last
//! access locally and treats an id as gone once the idle timeout has passed,
//! rather than sending a message against an id the service has reclaimed.
//!
//! [`SessionStore`] keys managers by caller so concurrent users never share a
//! conversation.

use converse_remote::{DialogueService, RemoteError};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;

/// Outcome of a best-effort session delete.
///
/// Local state is cleared in every case; a remote failure is reported here
/// only so the caller can log it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cleanup {
    /// No session was held; nothing was sent.
    NothingHeld,
    /// The remote session was deleted.
    Deleted,
    /// The remote delete failed and was ignored.
    RemoteFailed(String),
}

#[derive(Debug)]
struct SessionSlot {
    session_id: Option<String>,
    last_access: Instant,
}

/// Owns at most one live remote session.
pub struct SessionManager {
    dialogue: Arc<dyn DialogueService>,
    timeout: Duration,
    slot: Mutex<SessionSlot>,
}

impl SessionManager {
    pub fn new(dialogue: Arc<dyn DialogueService>, timeout: Duration) -> Self {
        Self {
            dialogue,
            timeout,
            slot: Mutex::new(SessionSlot {
                session_id: None,
                last_access: Instant::now(),
            }),
        }
    }

    /// The dialogue service sessions are opened against.
    pub fn dialogue(&self) -> &dyn DialogueService {
        self.dialogue.as_ref()
    }

    /// Return a live session id, creating one if needed.
    ///
    /// An id idle for longer than the timeout is dropped without a remote
    /// delete. The access time is refreshed on every call, including calls
    /// whose create fails.
    pub async fn get_session(&self) -> Result<String, RemoteError> {
        let mut slot = self.slot.lock().await;
        let now = Instant::now();

        if now.duration_since(slot.last_access) > self.timeout {
            if let Some(stale) = slot.session_id.take() {
                tracing::debug!(session_id = %stale, "Session idle past timeout, discarded");
            }
        }
        slot.last_access = now;

        if let Some(session_id) = &slot.session_id {
            return Ok(session_id.clone());
        }

        let session_id = self.dialogue.create_session().await?;
        slot.session_id = Some(session_id.clone());
        Ok(session_id)
    }

    /// Delete the held session, if any.
    ///
    /// After return the manager holds no session, whatever the remote
    /// outcome.
    pub async fn delete_session(&self) -> Cleanup {
        let mut slot = self.slot.lock().await;
        let Some(session_id) = slot.session_id.take() else {
            return Cleanup::NothingHeld;
        };

        match self.dialogue.delete_session(&session_id).await {
            Ok(()) => Cleanup::Deleted,
            Err(e) => Cleanup::RemoteFailed(e.to_string()),
        }
    }

    /// Currently held session id, without touching the access time.
    pub async fn current_session(&self) -> Option<String> {
        self.slot.lock().await.session_id.clone()
    }

    /// Whether the manager has gone unused for longer than its timeout.
    ///
    /// Creation counts as a use. A manager that is busy (its slot locked by
    /// a request in flight) is never idle.
    pub fn is_idle(&self, now: Instant) -> bool {
        match self.slot.try_lock() {
            Ok(slot) => now.duration_since(slot.last_access) > self.timeout,
            Err(_) => false,
        }
    }
}

/// Per-caller session managers.
pub struct SessionStore {
    dialogue: Arc<dyn DialogueService>,
    timeout: Duration,
    sessions: RwLock<HashMap<String, Arc<SessionManager>>>,
}

impl SessionStore {
    pub fn new(dialogue: Arc<dyn DialogueService>, timeout: Duration) -> Self {
        Self {
            dialogue,
            timeout,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Manager for `caller`, created on first use.
    pub async fn session_for(&self, caller: &str) -> Arc<SessionManager> {
        if let Some(manager) = self.sessions.read().await.get(caller) {
            return manager.clone();
        }

        let mut sessions = self.sessions.write().await;
        sessions
            .entry(caller.to_string())
            .or_insert_with(|| {
                tracing::debug!(caller = %caller, "Tracking new caller");
                Arc::new(SessionManager::new(self.dialogue.clone(), self.timeout))
            })
            .clone()
    }

    /// Drop managers idle past the timeout. Returns how many were dropped.
    ///
    /// Their remote sessions have already expired, so nothing is deleted
    /// remotely.
    pub async fn evict_idle(&self) -> usize {
        let now = Instant::now();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, manager| !manager.is_idle(now));
        let evicted = before - sessions.len();
        if evicted > 0 {
            tracing::debug!(evicted, remaining = sessions.len(), "Evicted idle callers");
        }
        evicted
    }

    /// Number of tracked callers.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}
