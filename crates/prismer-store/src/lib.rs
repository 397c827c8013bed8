//! Storage collaborators for prismer.
//!
//! This crate provides the two pieces of state the gateway keeps outside the
//! chat stream itself:
//!
//! - **Sessions**: a key-value [`SessionStore`] with an in-memory
//!   implementation for development and tests and a `RocksDB` one for
//!   deployments that want sessions to survive restarts.
//! - **Workspace files**: [`WorkspaceFs`], path-scoped file CRUD and the
//!   artifact lister, rejecting any path that resolves outside its root.
//!
//! # Example
//!
//! ```
//! use prismer_store::{session, MemoryStore, SessionStore};
//!
//! let store = MemoryStore::new();
//! let record = session::create_session(&store, None).unwrap();
//! assert_eq!(store.get_session(&record.id).unwrap(), Some(record));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod keys;
pub mod memory;
pub mod rocks;
pub mod schema;
pub mod session;
pub mod types;
pub mod workspace;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use rocks::RocksStore;
pub use types::SessionRecord;
pub use workspace::{DirEntry, FileContent, WorkspaceFs};

use prismer_core::SessionId;

/// Session bookkeeping storage.
///
/// Implementations are interchangeable; the gateway only ever talks to this
/// trait.
pub trait SessionStore: Send + Sync {
    /// Insert or replace a session record.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store fails.
    fn put_session(&self, record: &SessionRecord) -> Result<()>;

    /// Get a session by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store fails.
    fn get_session(&self, id: &SessionId) -> Result<Option<SessionRecord>>;

    /// Delete a session by id.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the session doesn't exist.
    fn delete_session(&self, id: &SessionId) -> Result<()>;

    /// List all sessions, most recently active first.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store fails.
    fn list_sessions(&self) -> Result<Vec<SessionRecord>>;
}

/// Sort records most recently active first.
pub(crate) fn sort_by_activity(records: &mut [SessionRecord]) {
    records.sort_by(|a, b| b.last_active_at.cmp(&a.last_active_at));
}
