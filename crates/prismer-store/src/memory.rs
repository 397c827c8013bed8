//! In-memory session store.

use std::collections::HashMap;

use parking_lot::RwLock;
use prismer_core::SessionId;

use crate::error::{Result, StoreError};
use crate::types::SessionRecord;
use crate::{sort_by_activity, SessionStore};

/// A `SessionStore` backed by a map; contents are lost on restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    sessions: RwLock<HashMap<SessionId, SessionRecord>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    /// Whether the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }
}

impl SessionStore for MemoryStore {
    fn put_session(&self, record: &SessionRecord) -> Result<()> {
        self.sessions
            .write()
            .insert(record.id.clone(), record.clone());
        Ok(())
    }

    fn get_session(&self, id: &SessionId) -> Result<Option<SessionRecord>> {
        Ok(self.sessions.read().get(id).cloned())
    }

    fn delete_session(&self, id: &SessionId) -> Result<()> {
        self.sessions
            .write()
            .remove(id)
            .map(|_| ())
            .ok_or(StoreError::NotFound)
    }

    fn list_sessions(&self) -> Result<Vec<SessionRecord>> {
        let mut records: Vec<_> = self.sessions.read().values().cloned().collect();
        sort_by_activity(&mut records);
        Ok(records)
    }
}
