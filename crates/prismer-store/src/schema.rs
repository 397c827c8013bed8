//! Column families of the `RocksDB` session database.

/// Column family names.
pub mod cf {
    /// Session records, keyed by session id.
    pub const SESSIONS: &str = "sessions";
}

/// Returns all column family names for database initialization.
#[must_use]
pub fn all_column_families() -> Vec<&'static str> {
    vec![cf::SESSIONS]
}
