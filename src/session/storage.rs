//! Session storage backends.
//!
//! A storage maps ids to shared handles. Each handle carries its own mutex,
//! so requests for one session are serialized while different sessions never
//! contend beyond the brief map lookup.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use super::{Session, SessionId};

/// Shared, individually locked session.
pub type SessionHandle = Arc<Mutex<Session>>;

/// Keyed container for sessions.
pub trait SessionStorage: Send + Sync {
    /// Store `session` under its own id and return its handle.
    fn insert(&self, session: Session) -> SessionHandle;

    fn get(&self, id: &SessionId) -> Option<SessionHandle>;

    /// Drop a session; returns whether it existed.
    fn remove(&self, id: &SessionId) -> bool;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Process-local storage; sessions live until removed.
#[derive(Default)]
pub struct InMemoryStorage {
    sessions: RwLock<HashMap<SessionId, SessionHandle>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStorage for InMemoryStorage {
    fn insert(&self, session: Session) -> SessionHandle {
        let id = session.id();
        let handle = Arc::new(Mutex::new(session));
        self.sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, Arc::clone(&handle));
        handle
    }

    fn get(&self, id: &SessionId) -> Option<SessionHandle> {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    fn remove(&self, id: &SessionId) -> bool {
        self.sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id)
            .is_some()
    }

    fn len(&self) -> usize {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
