use std::path::Path;

use chrono::{DateTime, Utc};
use rocksdb::{DBCompressionType, IteratorMode, Options, TransactionDB, TransactionDBOptions};
use tracing::{debug, warn};

use super::{Increment, RecordStore, StoreError};
use crate::paste::{PasteId, PasteRecord};
use crate::policy;

/// How long a transaction waits on a row lock held by another request.
const LOCK_TIMEOUT_MS: i64 = 2_000;

const PING_KEY: &[u8] = b"\0ping";

impl From<rocksdb::Error> for StoreError {
    fn from(e: rocksdb::Error) -> Self {
        Self::Unavailable(e.into_string())
    }
}

/// RocksDB backed store. Mutations run in pessimistic transactions, so the
/// read half of every read-modify-write holds the row lock until commit.
pub struct RocksStore {
    db: TransactionDB,
}

impl RocksStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.set_compression_type(DBCompressionType::Zstd);

        let mut txn_opts = TransactionDBOptions::default();
        txn_opts.set_txn_lock_timeout(LOCK_TIMEOUT_MS);

        let db = TransactionDB::open(&opts, &txn_opts, path)?;
        Ok(Self { db })
    }
}

impl RecordStore for RocksStore {
    fn create(&self, record: &PasteRecord) -> Result<(), StoreError> {
        let key = record.id.as_bytes();
        let value = record.encode()?;

        let txn = self.db.transaction();
        if txn.get_for_update(key, true)?.is_some() {
            return Err(StoreError::DuplicateId);
        }
        txn.put(key, value)?;
        txn.commit()?;
        Ok(())
    }

    fn get(&self, id: &PasteId) -> Result<Option<PasteRecord>, StoreError> {
        self.db
            .get(id.as_bytes())?
            .map(|data| PasteRecord::decode(&data))
            .transpose()
            .map_err(StoreError::from)
    }

    fn increment_view(&self, id: &PasteId) -> Result<Option<Increment>, StoreError> {
        let key = id.as_bytes();

        let txn = self.db.transaction();
        let mut record = match txn.get_for_update(key, true)? {
            Some(data) => PasteRecord::decode(&data)?,
            None => return Ok(None),
        };

        let outcome = Increment::apply(&mut record)?;
        if let Increment::Counted(_) = outcome {
            txn.put(key, record.encode()?)?;
            txn.commit()?;
        }

        Ok(Some(outcome))
    }

    fn delete(&self, id: &PasteId) -> Result<bool, StoreError> {
        let key = id.as_bytes();

        let txn = self.db.transaction();
        if txn.get_for_update(key, true)?.is_none() {
            return Ok(false);
        }
        txn.delete(key)?;
        txn.commit()?;
        Ok(true)
    }

    fn ping(&self) -> Result<(), StoreError> {
        self.db.get(PING_KEY)?;
        Ok(())
    }

    fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize, StoreError> {
        let mut purged = 0;
        for item in self.db.iterator(IteratorMode::Start) {
            let (key, value) = item?;
            // TODO: only partially decode struct for max perf
            let expired = match PasteRecord::decode(&value) {
                Ok(record) => policy::is_time_expired(&record, now),
                Err(e) => {
                    warn!("Skipping undecodable paste during purge: {}", e);
                    false
                }
            };

            if expired {
                self.db.delete(&key)?;
                purged += 1;
            }
        }

        debug!(purged, "Purged expired pastes");
        Ok(purged)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tempfile::TempDir;

    use super::*;
    use crate::store::tests as shared;

    fn open() -> (TempDir, RocksStore) {
        let dir = TempDir::new().unwrap();
        let store = RocksStore::open(dir.path()).unwrap();
        (dir, store)
    }

    #[test]
    fn create_then_get() {
        let (_dir, store) = open();
        shared::create_then_get(&store);
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let (_dir, store) = open();
        shared::duplicate_ids_are_rejected(&store);
    }

    #[test]
    fn increment_returns_new_count() {
        let (_dir, store) = open();
        shared::increment_returns_new_count(&store);
    }

    #[test]
    fn increment_stops_at_limit() {
        let (_dir, store) = open();
        shared::increment_stops_at_limit(&store);
    }

    #[test]
    fn saturated_count_is_an_error() {
        let (_dir, store) = open();
        shared::saturated_count_is_an_error(&store);
    }

    #[test]
    fn delete_is_idempotent() {
        let (_dir, store) = open();
        shared::delete_is_idempotent(&store);
    }

    #[test]
    fn purge_only_removes_expired() {
        let (_dir, store) = open();
        shared::purge_only_removes_expired(&store);
    }

    #[test]
    fn concurrent_increments_are_linearizable() {
        let (_dir, store) = open();
        shared::concurrent_increments_are_linearizable(Arc::new(store));
    }

    #[test]
    fn records_survive_reopening() {
        let dir = TempDir::new().unwrap();
        let paste = shared::record("persisted_", Some(3));
        {
            let store = RocksStore::open(dir.path()).unwrap();
            store.create(&paste).unwrap();
            store.increment_view(&paste.id).unwrap();
        }

        let store = RocksStore::open(dir.path()).unwrap();
        let stored = store.get(&paste.id).unwrap().unwrap();
        assert_eq!(stored.view_count, 1);
        assert_eq!(stored.max_views, Some(3));
        store.ping().unwrap();
    }
}
