//! `RocksDB` session store.

use std::path::Path;
use std::sync::Arc;

use prismer_core::SessionId;
use rocksdb::{
    BoundColumnFamily, ColumnFamilyDescriptor, DBWithThreadMode, IteratorMode, MultiThreaded,
    Options,
};

use crate::error::{Result, StoreError};
use crate::keys;
use crate::schema::{all_column_families, cf};
use crate::types::SessionRecord;
use crate::{sort_by_activity, SessionStore};

/// RocksDB-backed `SessionStore`; records are CBOR-encoded.
pub struct RocksStore {
    db: Arc<DBWithThreadMode<MultiThreaded>>,
}

impl RocksStore {
    /// Open or create a `RocksDB` database at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or created.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_descriptors: Vec<_> = all_column_families()
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect();

        let db = DBWithThreadMode::open_cf_descriptors(&opts, path, cf_descriptors)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(Self { db: Arc::new(db) })
    }

    fn cf(&self, name: &str) -> Result<Arc<BoundColumnFamily<'_>>> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StoreError::Database(format!("column family not found: {name}")))
    }

    fn serialize<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(value, &mut buf)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(buf)
    }

    fn deserialize<T: serde::de::DeserializeOwned>(data: &[u8]) -> Result<T> {
        ciborium::from_reader(data).map_err(|e| StoreError::Serialization(e.to_string()))
    }
}

impl SessionStore for RocksStore {
    fn put_session(&self, record: &SessionRecord) -> Result<()> {
        let cf = self.cf(cf::SESSIONS)?;
        let value = Self::serialize(record)?;
        self.db
            .put_cf(&cf, keys::session_key(&record.id), value)
            .map_err(|e| StoreError::Database(e.to_string()))
    }

    fn get_session(&self, id: &SessionId) -> Result<Option<SessionRecord>> {
        let cf = self.cf(cf::SESSIONS)?;
        self.db
            .get_cf(&cf, keys::session_key(id))
            .map_err(|e| StoreError::Database(e.to_string()))?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }

    fn delete_session(&self, id: &SessionId) -> Result<()> {
        if self.get_session(id)?.is_none() {
            return Err(StoreError::NotFound);
        }
        let cf = self.cf(cf::SESSIONS)?;
        self.db
            .delete_cf(&cf, keys::session_key(id))
            .map_err(|e| StoreError::Database(e.to_string()))
    }

    fn list_sessions(&self) -> Result<Vec<SessionRecord>> {
        let cf = self.cf(cf::SESSIONS)?;
        let mut records = Vec::new();

        for item in self.db.iterator_cf(&cf, IteratorMode::Start) {
            let (key, value) = item.map_err(|e| StoreError::Database(e.to_string()))?;
            let record: SessionRecord = Self::deserialize(&value)?;
            if keys::decode_session_key(&key)? != record.id {
                tracing::warn!(session_id = %record.id, "Session key does not match record");
                continue;
            }
            records.push(record);
        }

        sort_by_activity(&mut records);
        Ok(records)
    }
}
