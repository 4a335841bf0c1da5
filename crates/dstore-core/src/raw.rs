//! Raw record accessor
//!
//! Reads and writes opaque JSON at an address. There is no cache, no
//! validation and no merge: a caller that wants to append to a list must
//! read, merge and write itself, and two interleaved writers race with the
//! last write winning.

use crate::address::RecordAddress;
use crate::error::TransportError;
use crate::remote::RemoteStore;
use serde_json::Value;
use tracing::instrument;

/// Unvalidated, uncached access to records in a [`RemoteStore`]
#[derive(Debug, Clone)]
pub struct RawAccessor<S> {
    store: S,
}

impl<S: RemoteStore> RawAccessor<S> {
    /// Wrap a store
    #[inline]
    #[must_use]
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Underlying store
    #[inline]
    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Read the record at `address`
    ///
    /// # Errors
    /// `TransportError` if the remote call fails. A missing record is `Ok(None)`.
    #[instrument(level = "debug", skip_all, fields(address = %address))]
    pub async fn read(&self, address: &RecordAddress) -> Result<Option<Value>, TransportError> {
        let value = self.store.get(address).await.map_err(|e| {
            tracing::warn!(error = %e, "record read failed");
            e
        })?;
        tracing::debug!(found = value.is_some(), "record read");
        Ok(value)
    }

    /// Replace the record at `address`
    ///
    /// # Errors
    /// `TransportError` if the remote call fails
    #[instrument(level = "debug", skip_all, fields(address = %address))]
    pub async fn write(&self, address: &RecordAddress, value: &Value) -> Result<(), TransportError> {
        self.store.put(address, value).await.map_err(|e| {
            tracing::warn!(error = %e, "record write failed");
            e
        })?;
        tracing::info!("record written");
        Ok(())
    }
}
