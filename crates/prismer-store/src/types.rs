//! Records persisted by the session store.

use chrono::{DateTime, Utc};
use prismer_core::SessionId;
use serde::{Deserialize, Serialize};

/// Bookkeeping for one conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    /// Opaque session token.
    pub id: SessionId,
    /// When the session was first seen.
    pub created_at: DateTime<Utc>,
    /// When the last message was sent in it.
    pub last_active_at: DateTime<Utc>,
    /// Number of user messages sent in it.
    pub message_count: u64,
}

impl SessionRecord {
    /// A fresh record with no messages.
    #[must_use]
    pub fn new(id: SessionId) -> Self {
        let now = Utc::now();
        Self {
            id,
            created_at: now,
            last_active_at: now,
            message_count: 0,
        }
    }
}
