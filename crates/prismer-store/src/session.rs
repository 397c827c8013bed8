//! Session bookkeeping on top of any [`SessionStore`].

use chrono::Utc;
use prismer_core::SessionId;

use crate::error::Result;
use crate::types::SessionRecord;
use crate::SessionStore;

/// Create a session, generating an id when none is given.
///
/// An existing record with the same id is returned unchanged.
///
/// # Errors
///
/// Returns an error if the store fails.
pub fn create_session<S: SessionStore + ?Sized>(
    store: &S,
    id: Option<SessionId>,
) -> Result<SessionRecord> {
    let id = id.unwrap_or_else(SessionId::generate);
    if let Some(existing) = store.get_session(&id)? {
        return Ok(existing);
    }

    let record = SessionRecord::new(id);
    store.put_session(&record)?;
    tracing::debug!(session_id = %record.id, "Session created");
    Ok(record)
}

/// Note one more message in a session, creating the record on first use.
///
/// # Errors
///
/// Returns an error if the store fails.
pub fn record_activity<S: SessionStore + ?Sized>(
    store: &S,
    id: &SessionId,
) -> Result<SessionRecord> {
    let mut record = store
        .get_session(id)?
        .unwrap_or_else(|| SessionRecord::new(id.clone()));
    record.message_count += 1;
    record.last_active_at = Utc::now();
    store.put_session(&record)?;
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryStore;

    #[test]
    fn create_generates_id() {
        let store = MemoryStore::new();
        let record = create_session(&store, None).unwrap();
        assert!(record.id.as_str().starts_with("session-"));
        assert_eq!(record.message_count, 0);
    }

    #[test]
    fn create_is_idempotent_for_known_id() {
        let store = MemoryStore::new();
        let id: SessionId = "agent-run-1".parse().unwrap();
        let first = create_session(&store, Some(id.clone())).unwrap();
        record_activity(&store, &id).unwrap();
        let second = create_session(&store, Some(id)).unwrap();
        assert_eq!(second.created_at, first.created_at);
        assert_eq!(second.message_count, 1);
    }

    #[test]
    fn activity_creates_and_counts() {
        let store = MemoryStore::new();
        let id = SessionId::generate();
        record_activity(&store, &id).unwrap();
        let record = record_activity(&store, &id).unwrap();
        assert_eq!(record.message_count, 2);
        assert!(record.last_active_at >= record.created_at);
        assert_eq!(store.len(), 1);
    }
}
