//! Keyed storage for paste records.
//!
//! Every method is a single atomic unit against the backing store. Methods
//! block; async callers are expected to hop onto the blocking pool.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::paste::{PasteId, PasteRecord};

mod memory;
mod rocks;

pub use memory::MemoryStore;
pub use rocks::RocksStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("a paste with this id already exists")]
    DuplicateId,
    #[error("storage unavailable: {0}")]
    Unavailable(String),
    #[error("stored paste is corrupt: {0}")]
    Corrupt(String),
}

impl From<bincode::Error> for StoreError {
    fn from(e: bincode::Error) -> Self {
        Self::Corrupt(e.to_string())
    }
}

/// Result of a conditional view increment.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Increment {
    /// The view was counted; holds the count after incrementing.
    Counted(u32),
    /// Every permitted view was already handed out. Nothing changed.
    LimitReached,
}

impl Increment {
    /// Applies one view to `record` in place.
    ///
    /// # Errors
    ///
    /// Fails without touching `record` if the count cannot grow any further.
    pub fn apply(record: &mut PasteRecord) -> Result<Self, StoreError> {
        if crate::policy::is_view_exhausted(record) {
            return Ok(Self::LimitReached);
        }
        record.view_count = record
            .view_count
            .checked_add(1)
            .ok_or_else(|| StoreError::Corrupt("view count overflow".to_string()))?;
        Ok(Self::Counted(record.view_count))
    }
}

pub trait RecordStore: Send + Sync + 'static {
    /// Persists a new record. Fails with [`StoreError::DuplicateId`] if the id
    /// is taken.
    fn create(&self, record: &PasteRecord) -> Result<(), StoreError>;

    fn get(&self, id: &PasteId) -> Result<Option<PasteRecord>, StoreError>;

    /// Adds one to the view count unless the view limit was already reached,
    /// or returns `None` if the record does not exist. Concurrent callers never
    /// observe the same count, and the count never passes `max_views`.
    fn increment_view(&self, id: &PasteId) -> Result<Option<Increment>, StoreError>;

    /// Removes the record. Returns whether anything was removed.
    fn delete(&self, id: &PasteId) -> Result<bool, StoreError>;

    /// Cheap round trip confirming the backend is reachable.
    fn ping(&self) -> Result<(), StoreError>;

    /// Deletes every record whose expiry lies before `now`, returning how many
    /// were removed.
    fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize, StoreError>;
}

#[cfg(test)]
pub(crate) mod tests {
    //! Behaviour every backend must share.

    use std::collections::HashSet;
    use std::sync::Arc;

    use chrono::Duration;

    use super::*;

    pub fn record(id: &str, max_views: Option<u32>) -> PasteRecord {
        PasteRecord::new(
            id.parse().unwrap(),
            "Untitled".into(),
            "hello".into(),
            Utc::now(),
            None,
            max_views,
        )
    }

    pub fn create_then_get<S: RecordStore>(store: &S) {
        let paste = record("create_get", None);
        store.create(&paste).unwrap();
        assert_eq!(store.get(&paste.id).unwrap(), Some(paste));
        assert_eq!(store.get(&"missing___".parse().unwrap()).unwrap(), None);
    }

    pub fn duplicate_ids_are_rejected<S: RecordStore>(store: &S) {
        let paste = record("duplicated", None);
        store.create(&paste).unwrap();
        assert!(matches!(
            store.create(&paste),
            Err(StoreError::DuplicateId)
        ));
    }

    pub fn increment_returns_new_count<S: RecordStore>(store: &S) {
        let paste = record("increments", None);
        store.create(&paste).unwrap();
        for expected in 1..=5 {
            assert_eq!(
                store.increment_view(&paste.id).unwrap(),
                Some(Increment::Counted(expected))
            );
        }
        assert_eq!(store.get(&paste.id).unwrap().unwrap().view_count, 5);
        assert_eq!(
            store.increment_view(&"missing___".parse().unwrap()).unwrap(),
            None
        );
    }

    pub fn increment_stops_at_limit<S: RecordStore>(store: &S) {
        let paste = record("limited___", Some(2));
        store.create(&paste).unwrap();
        assert_eq!(
            store.increment_view(&paste.id).unwrap(),
            Some(Increment::Counted(1))
        );
        assert_eq!(
            store.increment_view(&paste.id).unwrap(),
            Some(Increment::Counted(2))
        );
        assert_eq!(
            store.increment_view(&paste.id).unwrap(),
            Some(Increment::LimitReached)
        );
        assert_eq!(store.get(&paste.id).unwrap().unwrap().view_count, 2);
    }

    pub fn saturated_count_is_an_error<S: RecordStore>(store: &S) {
        let mut paste = record("saturated_", None);
        paste.view_count = u32::MAX;
        store.create(&paste).unwrap();
        assert!(matches!(
            store.increment_view(&paste.id),
            Err(StoreError::Corrupt(_))
        ));
        assert_eq!(store.get(&paste.id).unwrap().unwrap().view_count, u32::MAX);
    }

    pub fn delete_is_idempotent<S: RecordStore>(store: &S) {
        let paste = record("deleteable", None);
        store.create(&paste).unwrap();
        assert!(store.delete(&paste.id).unwrap());
        assert!(!store.delete(&paste.id).unwrap());
        assert_eq!(store.get(&paste.id).unwrap(), None);
    }

    pub fn purge_only_removes_expired<S: RecordStore>(store: &S) {
        let now = Utc::now();
        let mut stale = record("stale_____", None);
        stale.expires_at = Some(now - Duration::minutes(1));
        let mut fresh = record("fresh_____", None);
        fresh.expires_at = Some(now + Duration::minutes(1));
        let forever = record("forever___", None);
        for paste in [&stale, &fresh, &forever] {
            store.create(paste).unwrap();
        }

        assert_eq!(store.purge_expired(now).unwrap(), 1);
        assert_eq!(store.get(&stale.id).unwrap(), None);
        assert!(store.get(&fresh.id).unwrap().is_some());
        assert!(store.get(&forever.id).unwrap().is_some());
    }

    pub fn concurrent_increments_are_linearizable<S: RecordStore>(store: Arc<S>) {
        const THREADS: usize = 8;
        const PER_THREAD: usize = 25;

        let paste = record("contended_", None);
        store.create(&paste).unwrap();

        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let store = Arc::clone(&store);
                let id = paste.id;
                std::thread::spawn(move || {
                    (0..PER_THREAD)
                        .map(|_| match store.increment_view(&id).unwrap() {
                            Some(Increment::Counted(count)) => count,
                            other => panic!("unexpected increment outcome: {other:?}"),
                        })
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let seen: Vec<u32> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        let unique: HashSet<_> = seen.iter().copied().collect();
        let total = u32::try_from(THREADS * PER_THREAD).unwrap();

        assert_eq!(seen.len(), unique.len());
        assert_eq!(unique, (1..=total).collect::<HashSet<_>>());
    }
}
