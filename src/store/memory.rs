use super::{RecordRef, SharedRecord, SharedRecordStore};
use crate::error::StoreError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    records: Mutex<HashMap<RecordRef, SharedRecord>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current stored state, without creating anything.
    pub fn snapshot(&self, location: &RecordRef) -> Option<SharedRecord> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(location)
            .cloned()
    }
}

#[async_trait]
impl SharedRecordStore for MemoryRecordStore {
    async fn get_or_create(&self, location: &RecordRef) -> Result<SharedRecord, StoreError> {
        let mut records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(records
            .entry(location.clone())
            .or_insert_with(|| SharedRecord::empty(location))
            .clone())
    }

    async fn update(&self, record: &SharedRecord) -> Result<SharedRecord, StoreError> {
        let location = record.location();
        let mut records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        let stored = records.get_mut(&location).ok_or_else(|| StoreError::NotFound {
            namespace: location.namespace.clone(),
            name: location.name.clone(),
        })?;

        if stored.version != record.version {
            return Err(StoreError::Conflict {
                namespace: location.namespace,
                name: location.name,
                expected: record.version,
            });
        }

        stored.data.clone_from(&record.data);
        stored.version += 1;
        Ok(stored.clone())
    }
}
