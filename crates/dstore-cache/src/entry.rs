//! Cache entry state and observers
//!
//! Each address has one entry holding what the layers above render from:
//! the last known value, fetch status, and the write currently in flight.
//! State is published through a `tokio::sync::watch` channel so observers
//! see every transition without polling.

use crate::manager::CacheManager;
use chrono::{DateTime, Utc};
use dstore_core::{RecordAddress, RecordError};
use serde_json::Value;
use tokio::sync::watch;

/// Fetch status of an entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FetchStatus {
    /// No fetch running
    #[default]
    Idle,
    /// Fetch in flight
    Loading,
    /// Last fetch failed
    Error,
}

/// Point-in-time view of one cache entry
#[derive(Debug, Clone, PartialEq)]
pub struct EntrySnapshot {
    /// Address of the record
    pub address: RecordAddress,
    /// Last known value (`None` if absent or never loaded)
    pub value: Option<Value>,
    /// Whether any read has completed successfully
    pub loaded: bool,
    /// Fetch status
    pub status: FetchStatus,
    /// Error from the last failed read or write
    pub error: Option<RecordError>,
    /// Value must be re-fetched before it is served again
    pub stale: bool,
    /// Number of writes in flight
    pub writes_in_flight: usize,
    /// Input of the most recent write in flight
    pub pending_write: Option<Value>,
    /// Time of the last successful read
    pub updated_at: Option<DateTime<Utc>>,
    pub(crate) fetches_in_flight: usize,
}

impl EntrySnapshot {
    pub(crate) fn empty(address: RecordAddress) -> Self {
        Self {
            address,
            value: None,
            loaded: false,
            status: FetchStatus::Idle,
            error: None,
            stale: false,
            writes_in_flight: 0,
            pending_write: None,
            updated_at: None,
            fetches_in_flight: 0,
        }
    }

    /// Whether a write is in flight
    #[inline]
    #[must_use]
    pub fn is_writing(&self) -> bool {
        self.writes_in_flight > 0
    }

    /// No fetch or write is running against the entry
    pub(crate) fn is_settled(&self) -> bool {
        self.fetches_in_flight == 0 && self.writes_in_flight == 0
    }

    pub(crate) fn begin_fetch(&mut self) {
        self.fetches_in_flight += 1;
        self.status = FetchStatus::Loading;
    }

    pub(crate) fn fetched(&mut self, value: Option<Value>) {
        self.fetches_in_flight = self.fetches_in_flight.saturating_sub(1);
        self.value = value;
        self.loaded = true;
        if self.fetches_in_flight == 0 {
            self.status = FetchStatus::Idle;
        }
        self.error = None;
        self.stale = false;
        self.updated_at = Some(Utc::now());
    }

    pub(crate) fn fetch_failed(&mut self, error: RecordError) {
        self.fetches_in_flight = self.fetches_in_flight.saturating_sub(1);
        self.status = FetchStatus::Error;
        self.error = Some(error);
    }

    pub(crate) fn begin_write(&mut self, value: Value) {
        self.writes_in_flight += 1;
        self.pending_write = Some(value);
    }

    pub(crate) fn write_settled(&mut self, error: Option<RecordError>) {
        self.writes_in_flight = self.writes_in_flight.saturating_sub(1);
        if self.writes_in_flight == 0 {
            self.pending_write = None;
        }
        match error {
            Some(e) => self.error = Some(e),
            None => {
                self.stale = true;
                self.error = None;
            }
        }
    }
}

/// Live view of one entry
///
/// While at least one observer exists the entry is kept and refreshed in
/// the background after writes. Dropping the last observer discards it.
#[derive(Debug)]
pub struct RecordObserver {
    address: RecordAddress,
    rx: watch::Receiver<EntrySnapshot>,
    cache: CacheManager,
}

impl RecordObserver {
    pub(crate) fn new(
        address: RecordAddress,
        rx: watch::Receiver<EntrySnapshot>,
        cache: CacheManager,
    ) -> Self {
        Self { address, rx, cache }
    }

    /// Observed address
    #[inline]
    #[must_use]
    pub fn address(&self) -> &RecordAddress {
        &self.address
    }

    /// Current state of the entry
    #[must_use]
    pub fn current(&self) -> EntrySnapshot {
        self.rx.borrow().clone()
    }

    /// Wait for the next state change
    ///
    /// Returns `None` if the entry was discarded.
    pub async fn changed(&mut self) -> Option<EntrySnapshot> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }

    /// Wait until the entry satisfies `predicate`
    ///
    /// Returns `None` if the entry was discarded first.
    pub async fn wait_for(
        &mut self,
        mut predicate: impl FnMut(&EntrySnapshot) -> bool,
    ) -> Option<EntrySnapshot> {
        self.rx
            .wait_for(|snapshot| predicate(snapshot))
            .await
            .ok()
            .map(|snapshot| snapshot.clone())
    }
}

impl Drop for RecordObserver {
    fn drop(&mut self) {
        self.cache.release(&self.address);
    }
}
