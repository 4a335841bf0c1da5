//! Remote store call surface
//!
//! The store itself is an external collaborator. This module only fixes the
//! contract the rest of the workspace relies on:
//! - `get` is idempotent and reports a missing record as `Ok(None)`
//! - `put` replaces the whole document (no patch semantics)

use crate::address::RecordAddress;
use crate::error::TransportError;
use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Key-value data store holding one JSON document per address
#[async_trait]
pub trait RemoteStore: Send + Sync + 'static {
    /// Fetch the document at `address`, `None` if it does not exist
    async fn get(&self, address: &RecordAddress) -> Result<Option<Value>, TransportError>;

    /// Replace the document at `address`
    async fn put(&self, address: &RecordAddress, value: &Value) -> Result<(), TransportError>;
}

#[async_trait]
impl<S: RemoteStore + ?Sized> RemoteStore for Arc<S> {
    async fn get(&self, address: &RecordAddress) -> Result<Option<Value>, TransportError> {
        (**self).get(address).await
    }

    async fn put(&self, address: &RecordAddress, value: &Value) -> Result<(), TransportError> {
        (**self).put(address, value).await
    }
}

/// In-process store backed by a concurrent map
///
/// Cloning shares the underlying documents.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    records: Arc<DashMap<RecordAddress, Value>>,
}

impl MemoryStore {
    /// Create empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Put a document without going through the async contract
    pub fn seed(&self, address: RecordAddress, value: Value) {
        self.records.insert(address, value);
    }

    /// Current document at `address`
    #[must_use]
    pub fn current(&self, address: &RecordAddress) -> Option<Value> {
        self.records.get(address).map(|v| v.value().clone())
    }

    /// All documents, ordered by address
    #[must_use]
    pub fn snapshot(&self) -> BTreeMap<RecordAddress, Value> {
        self.records
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect()
    }

    /// Number of stored documents
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the store holds no documents
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl RemoteStore for MemoryStore {
    async fn get(&self, address: &RecordAddress) -> Result<Option<Value>, TransportError> {
        Ok(self.current(address))
    }

    async fn put(&self, address: &RecordAddress, value: &Value) -> Result<(), TransportError> {
        self.records.insert(address.clone(), value.clone());
        Ok(())
    }
}
