//! Registry of live sessions shared by all connections.
//!
//! Identifiers come from a monotonically increasing counter and are never
//! reused. Every map operation goes through one mutex, so concurrent
//! connections always observe a consistent view. Removal is idempotent.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::{Session, SessionId};

#[derive(Debug)]
pub struct SessionRegistry {
    next_id: AtomicU64,
    sessions: Mutex<HashMap<SessionId, Arc<Session>>>,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionRegistry {
    /// Create a new empty registry. The first identifier is 1.
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            sessions: Mutex::new(HashMap::new()),
        }
    }

    fn sessions(&self) -> MutexGuard<'_, HashMap<SessionId, Arc<Session>>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Allocate a fresh identifier
    pub fn next_id(&self) -> SessionId {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Register a session.
    ///
    /// Returns `false` if the identifier is already taken; the existing
    /// entry is left untouched.
    pub fn insert(&self, session: Arc<Session>) -> bool {
        let mut sessions = self.sessions();
        if sessions.contains_key(&session.id()) {
            return false;
        }
        sessions.insert(session.id(), session);
        true
    }

    /// Deregister a session. `None` if it was not registered.
    pub fn remove(&self, id: SessionId) -> Option<Arc<Session>> {
        self.sessions().remove(&id)
    }

    pub fn get(&self, id: SessionId) -> Option<Arc<Session>> {
        self.sessions().get(&id).cloned()
    }

    pub fn contains(&self, id: SessionId) -> bool {
        self.sessions().contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.sessions().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions().is_empty()
    }

    /// Registered identifiers in ascending order
    pub fn ids(&self) -> Vec<SessionId> {
        let mut ids: Vec<SessionId> = self.sessions().keys().copied().collect();
        ids.sort_unstable();
        ids
    }
}
