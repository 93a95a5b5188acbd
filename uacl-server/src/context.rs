//! Session context registry
//!
//! Tracks the sessions open against a server together with the optional
//! context object each one carries. Methods declared with a session context
//! receive the context of the calling session.

use crate::model::SessionContext;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{PoisonError, RwLock};

/// Server-side identifier of an open session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(pub u32);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session#{}", self.0)
    }
}

/// Registry of open sessions and their contexts
pub struct SessionContexts {
    next_id: AtomicU32,
    sessions: RwLock<HashMap<SessionId, Option<SessionContext>>>,
}

impl SessionContexts {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU32::new(1),
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Register a new session
    pub fn open(&self, context: Option<SessionContext>) -> SessionId {
        let id = SessionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, context);
        log::debug!("Opened {}", id);
        id
    }

    /// Release a session
    ///
    /// # Returns
    /// `false` if the session was not open
    pub fn close(&self, id: SessionId) -> bool {
        let removed = self
            .sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id)
            .is_some();
        if removed {
            log::debug!("Closed {}", id);
        }
        removed
    }

    pub fn is_open(&self, id: SessionId) -> bool {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&id)
    }

    /// Context of an open session, `None` for unknown sessions or sessions
    /// opened without context
    pub fn get(&self, id: SessionId) -> Option<SessionContext> {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .cloned()
            .flatten()
    }

    pub fn clear(&self) {
        self.sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    pub fn len(&self) -> usize {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for SessionContexts {
    fn default() -> Self {
        Self::new()
    }
}
