//! Externally persisted key/value records shared between replicas.
//!
//! Layout:
//! - `memory.rs`: process-local store (tests, single replica)
//! - `sqlite.rs`: SQLite-backed store reachable by every replica
//! - `schema.rs`: SQL DDL for the SQLite store

mod memory;
mod schema;
mod sqlite;

pub use memory::MemoryRecordStore;
pub use schema::SQLITE_INIT;
pub use sqlite::SqliteRecordStore;

use crate::error::StoreError;
use async_trait::async_trait;
use std::collections::BTreeMap;

/// Location of a shared record.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordRef {
    pub namespace: String,
    pub name: String,
}

impl RecordRef {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl std::fmt::Display for RecordRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Flat string map plus the version it was read at.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct SharedRecord {
    pub namespace: String,
    pub name: String,
    pub data: BTreeMap<String, String>,
    pub version: u64,
}

impl SharedRecord {
    pub fn empty(location: &RecordRef) -> Self {
        Self {
            namespace: location.namespace.clone(),
            name: location.name.clone(),
            data: BTreeMap::new(),
            version: 0,
        }
    }

    pub fn location(&self) -> RecordRef {
        RecordRef::new(&self.namespace, &self.name)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.data.get(key).map(String::as_str)
    }
}

// Values may hold credentials; only keys are printed.
impl std::fmt::Debug for SharedRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedRecord")
            .field("namespace", &self.namespace)
            .field("name", &self.name)
            .field("keys", &self.data.keys().collect::<Vec<_>>())
            .field("version", &self.version)
            .finish()
    }
}

#[async_trait]
pub trait SharedRecordStore: Send + Sync {
    /// Returns the record, creating an empty one first if it does not exist.
    async fn get_or_create(&self, location: &RecordRef) -> Result<SharedRecord, StoreError>;

    /// Replaces the record's data if its stored version still equals `record.version`.
    ///
    /// Returns the stored record with its new version, or [`StoreError::Conflict`] when
    /// another writer got there first.
    async fn update(&self, record: &SharedRecord) -> Result<SharedRecord, StoreError>;
}
