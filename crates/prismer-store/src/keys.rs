//! Key encoding for `RocksDB`.
//!
//! Session ids are restricted to printable ASCII, so their bytes are used
//! as keys directly and sort the same way the ids do.

use prismer_core::SessionId;

use crate::error::{Result, StoreError};

/// Encode a session key.
#[must_use]
pub fn session_key(session_id: &SessionId) -> Vec<u8> {
    session_id.as_bytes().to_vec()
}

/// Decode a session key back into its id.
///
/// # Errors
///
/// Returns `StoreError::Serialization` if the key is not a valid session id.
pub fn decode_session_key(key: &[u8]) -> Result<SessionId> {
    let raw = std::str::from_utf8(key).map_err(|e| StoreError::Serialization(e.to_string()))?;
    raw.parse()
        .map_err(|e: prismer_core::IdError| StoreError::Serialization(e.to_string()))
}
