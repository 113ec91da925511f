use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};

use super::{Increment, RecordStore, StoreError};
use crate::paste::{PasteId, PasteRecord};
use crate::policy;

/// Process-local store. Every operation runs under one lock.
#[derive(Default)]
pub struct MemoryStore {
    pastes: Mutex<HashMap<PasteId, PasteRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<PasteId, PasteRecord>>, StoreError> {
        self.pastes
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))
    }
}

impl RecordStore for MemoryStore {
    fn create(&self, record: &PasteRecord) -> Result<(), StoreError> {
        let mut pastes = self.lock()?;
        if pastes.contains_key(&record.id) {
            return Err(StoreError::DuplicateId);
        }
        pastes.insert(record.id, record.clone());
        Ok(())
    }

    fn get(&self, id: &PasteId) -> Result<Option<PasteRecord>, StoreError> {
        Ok(self.lock()?.get(id).cloned())
    }

    fn increment_view(&self, id: &PasteId) -> Result<Option<Increment>, StoreError> {
        self.lock()?.get_mut(id).map(Increment::apply).transpose()
    }

    fn delete(&self, id: &PasteId) -> Result<bool, StoreError> {
        Ok(self.lock()?.remove(id).is_some())
    }

    fn ping(&self) -> Result<(), StoreError> {
        self.lock().map(drop)
    }

    fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize, StoreError> {
        let mut pastes = self.lock()?;
        let before = pastes.len();
        pastes.retain(|_, record| !policy::is_time_expired(record, now));
        Ok(before - pastes.len())
    }
}
