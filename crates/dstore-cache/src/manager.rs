//! Per-address cache table
//!
//! One `CacheManager` owns every cache entry for the accessors it is handed
//! to. Cloning yields another handle on the same table; there is no
//! process-wide instance.
//!
//! Values live in a `moka` cache keyed by `(address, generation)`. Every
//! successful write moves the address to a fresh generation, so a fetch that
//! started before the write can only ever fill a key nobody reads any more.
//! Generations come from one counter and are never reused.
//!
//! Entry metadata (status, errors, in-flight writes) lives beside the values
//! in a `DashMap` of watch channels. An entry is kept only while it is
//! observed or has a fetch or write running.

use crate::entry::{EntrySnapshot, RecordObserver};
use dashmap::DashMap;
use dstore_core::{RecordAddress, StoreConfig};
use moka::future::Cache;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{watch, Mutex, OwnedMutexGuard};

/// Key of a cached value
pub(crate) type ValueKey = (RecordAddress, u64);

/// Statistics for cache monitoring
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Approximate number of cached values
    pub entry_count: u64,
    /// Number of entries with metadata (observed or busy)
    pub tracked_entries: usize,
    /// Reads served from the cache
    pub hits: u64,
    /// Reads that had to wait for a fetch
    pub misses: u64,
}

#[derive(Debug)]
struct Inner {
    config: StoreConfig,
    values: Cache<ValueKey, Option<Value>>,
    generations: moka::sync::Cache<RecordAddress, u64>,
    next_generation: AtomicU64,
    entries: DashMap<RecordAddress, watch::Sender<EntrySnapshot>>,
    write_locks: DashMap<RecordAddress, Arc<Mutex<()>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

/// Owner of the per-address cache table
#[derive(Debug, Clone)]
pub struct CacheManager {
    inner: Arc<Inner>,
}

impl CacheManager {
    /// Create cache with the given configuration
    #[must_use]
    pub fn new(config: StoreConfig) -> Self {
        let mut values = Cache::builder().max_capacity(config.cache.max_capacity);
        let mut generations =
            moka::sync::Cache::builder().max_capacity(config.cache.max_capacity);
        if let Some(ttl) = config.cache.ttl() {
            values = values.time_to_live(ttl);
            generations = generations.time_to_live(ttl);
        }

        Self {
            inner: Arc::new(Inner {
                config,
                values: values.build(),
                generations: generations.build(),
                next_generation: AtomicU64::new(0),
                entries: DashMap::new(),
                write_locks: DashMap::new(),
                hits: AtomicU64::new(0),
                misses: AtomicU64::new(0),
            }),
        }
    }

    /// Configuration this cache was built with
    #[inline]
    #[must_use]
    pub fn config(&self) -> &StoreConfig {
        &self.inner.config
    }

    /// Current state of the entry for `address`, if one exists
    #[must_use]
    pub fn snapshot(&self, address: &RecordAddress) -> Option<EntrySnapshot> {
        self.inner
            .entries
            .get(address)
            .map(|tx| tx.borrow().clone())
    }

    /// Observe the entry for `address`, creating it if needed
    #[must_use]
    pub fn subscribe(&self, address: &RecordAddress) -> RecordObserver {
        let rx = self
            .inner
            .entries
            .entry(address.clone())
            .or_insert_with(|| new_entry(address))
            .subscribe();
        RecordObserver::new(address.clone(), rx, self.clone())
    }

    /// Number of live observers of `address`
    #[must_use]
    pub fn observer_count(&self, address: &RecordAddress) -> usize {
        self.inner
            .entries
            .get(address)
            .map_or(0, |tx| tx.receiver_count())
    }

    /// Mark the entry stale so the next read fetches from the store
    pub async fn invalidate(&self, address: &RecordAddress) {
        let replaced = self.advance_generation(address);
        if let Some(tx) = self.inner.entries.get(address) {
            tx.send_modify(|s| s.stale = true);
        }
        self.forget_value(address, replaced).await;
        tracing::debug!(%address, "cache entry invalidated");
    }

    /// Drop every cached value
    pub fn invalidate_all(&self) {
        self.inner.generations.invalidate_all();
        self.inner.values.invalidate_all();
        for entry in &self.inner.entries {
            entry.send_modify(|s| s.stale = true);
        }
    }

    /// Get cache statistics
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entry_count: self.inner.values.entry_count(),
            tracked_entries: self.inner.entries.len(),
            hits: self.inner.hits.load(Ordering::Relaxed),
            misses: self.inner.misses.load(Ordering::Relaxed),
        }
    }

    pub(crate) fn values(&self) -> &Cache<ValueKey, Option<Value>> {
        &self.inner.values
    }

    pub(crate) fn record_hit(&self) {
        self.inner.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_miss(&self) {
        self.inner.misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Generation values for `address` are currently read and written under
    pub(crate) fn generation(&self, address: &RecordAddress) -> u64 {
        self.inner
            .generations
            .get_with(address.clone(), || self.fresh_generation())
    }

    /// Move `address` to a fresh generation, returning the one it replaced
    pub(crate) fn advance_generation(&self, address: &RecordAddress) -> Option<u64> {
        let replaced = self.inner.generations.get(address);
        self.inner
            .generations
            .insert(address.clone(), self.fresh_generation());
        replaced
    }

    /// Drop the value cached under a replaced generation
    pub(crate) async fn forget_value(&self, address: &RecordAddress, generation: Option<u64>) {
        if let Some(generation) = generation {
            self.inner
                .values
                .invalidate(&(address.clone(), generation))
                .await;
        }
    }

    /// Apply `f` to the entry for `address`, creating it if needed
    ///
    /// Modifications of one address are serialized. Once `f` leaves the
    /// entry settled and unobserved, the entry is discarded.
    pub(crate) fn modify<R>(
        &self,
        address: &RecordAddress,
        f: impl FnOnce(&mut EntrySnapshot) -> R,
    ) -> R {
        let mut out = None;
        self.inner
            .entries
            .entry(address.clone())
            .or_insert_with(|| new_entry(address))
            .send_modify(|s| out = Some(f(s)));
        self.prune(address, 0);
        match out {
            Some(out) => out,
            None => unreachable!("send_modify always runs its closure"),
        }
    }

    /// Acquire the per-address write lock
    pub(crate) async fn lock_writes(&self, address: &RecordAddress) -> OwnedMutexGuard<()> {
        let lock = self
            .inner
            .write_locks
            .entry(address.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        lock.lock_owned().await
    }

    /// Forget the write lock for `address` once nobody holds or waits on it
    pub(crate) fn release_write_lock(&self, address: &RecordAddress) {
        self.inner
            .write_locks
            .remove_if(address, |_, lock| Arc::strong_count(lock) == 1);
    }

    /// Called when an observer is dropped
    pub(crate) fn release(&self, address: &RecordAddress) {
        // The dropping observer's receiver is still alive here
        if !self.prune(address, 1) {
            return;
        }

        tracing::debug!(%address, "last observer dropped, discarding entry");
        let replaced = self.inner.generations.remove(address);
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            let this = self.clone();
            let address = address.clone();
            handle.spawn(async move { this.forget_value(&address, replaced).await });
        }
    }

    /// Remove the entry if it has at most `observers` receivers and nothing
    /// running against it
    fn prune(&self, address: &RecordAddress, observers: usize) -> bool {
        self.inner
            .entries
            .remove_if(address, |_, tx| {
                tx.receiver_count() <= observers && tx.borrow().is_settled()
            })
            .is_some()
    }

    fn fresh_generation(&self) -> u64 {
        self.inner.next_generation.fetch_add(1, Ordering::SeqCst)
    }
}

fn new_entry(address: &RecordAddress) -> watch::Sender<EntrySnapshot> {
    watch::channel(EntrySnapshot::empty(address.clone())).0
}

impl Default for CacheManager {
    /// Create cache with default configuration
    fn default() -> Self {
        Self::new(StoreConfig::default())
    }
}
