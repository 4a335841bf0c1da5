//! Cache-aware record accessor
//!
//! Reads and writes for an address go through the same cache entry:
//! - concurrent reads collapse into one remote `get`
//! - a successful write marks the entry stale and, if anyone is observing
//!   it, re-reads it in the background
//! - failures are recorded on the entry and returned; nothing is retried

use crate::entry::RecordObserver;
use crate::manager::CacheManager;
use dstore_core::{
    RawAccessor, RecordAddress, RecordError, RecordResult, RemoteStore, TransportError,
    WritePolicy,
};
use serde_json::Value;
use std::sync::Arc;
use tracing::instrument;

/// Record accessor backed by a shared [`CacheManager`]
#[derive(Debug)]
pub struct CachedAccessor<S> {
    raw: Arc<RawAccessor<S>>,
    cache: CacheManager,
}

impl<S> Clone for CachedAccessor<S> {
    fn clone(&self) -> Self {
        Self {
            raw: Arc::clone(&self.raw),
            cache: self.cache.clone(),
        }
    }
}

impl<S: RemoteStore> CachedAccessor<S> {
    /// Create accessor over `store` using `cache`
    #[must_use]
    pub fn new(store: S, cache: &CacheManager) -> Self {
        Self {
            raw: Arc::new(RawAccessor::new(store)),
            cache: cache.clone(),
        }
    }

    /// Cache this accessor reads through
    #[inline]
    #[must_use]
    pub fn cache(&self) -> &CacheManager {
        &self.cache
    }

    /// Raw accessor underneath the cache
    #[inline]
    #[must_use]
    pub fn raw(&self) -> &RawAccessor<S> {
        &self.raw
    }

    /// Observe the cache entry for `address`
    #[must_use]
    pub fn subscribe(&self, address: &RecordAddress) -> RecordObserver {
        self.cache.subscribe(address)
    }

    /// Read the record at `address`, from cache when fresh
    ///
    /// Concurrent calls for the same address share one remote fetch. A read
    /// never returns a value fetched before a write that completed before
    /// the read started.
    ///
    /// # Errors
    /// `RecordError::Transport` if the fetch fails. Failures are not cached.
    #[instrument(level = "debug", skip_all, fields(address = %address))]
    pub async fn read(&self, address: &RecordAddress) -> RecordResult<Option<Value>> {
        let mut generation = self.cache.generation(address);
        if let Some(value) = self
            .cache
            .values()
            .get(&(address.clone(), generation))
            .await
        {
            tracing::debug!("cache hit");
            self.cache.record_hit();
            return Ok(value);
        }

        tracing::debug!("cache miss");
        self.cache.record_miss();
        self.cache.modify(address, |s| s.begin_fetch());

        loop {
            let fetched = self
                .cache
                .values()
                .try_get_with((address.clone(), generation), self.raw.read(address))
                .await;

            let value = match fetched {
                Ok(value) => value,
                Err(e) => return Err(self.fetch_failed(address, (*e).clone())),
            };
            if self.publish(address, generation, value.as_ref()) {
                return Ok(value);
            }

            tracing::debug!("write landed during fetch, fetching again");
            self.cache.forget_value(address, Some(generation)).await;
            generation = self.cache.generation(address);
        }
    }

    /// Read the record from the store, bypassing any cached value
    ///
    /// The fresh value replaces whatever was cached.
    ///
    /// # Errors
    /// `RecordError::Transport` if the fetch fails
    #[instrument(level = "debug", skip_all, fields(address = %address))]
    pub async fn refresh(&self, address: &RecordAddress) -> RecordResult<Option<Value>> {
        self.cache.modify(address, |s| s.begin_fetch());

        loop {
            let generation = self.cache.generation(address);
            let value = match self.raw.read(address).await {
                Ok(value) => value,
                Err(e) => return Err(self.fetch_failed(address, e)),
            };

            self.cache
                .values()
                .insert((address.clone(), generation), value.clone())
                .await;
            if self.publish(address, generation, value.as_ref()) {
                return Ok(value);
            }

            tracing::debug!("write landed during refresh, fetching again");
            self.cache.forget_value(address, Some(generation)).await;
        }
    }

    /// Replace the record at `address`
    ///
    /// While the write is in flight the entry exposes `value` as its pending
    /// write. On success the entry is marked stale; observed entries are
    /// re-read in the background when `refetch_on_write` is set. On failure
    /// the cached value is left untouched.
    ///
    /// # Errors
    /// `RecordError::Transport` if the remote call fails
    #[instrument(level = "debug", skip_all, fields(address = %address))]
    pub async fn write(&self, address: &RecordAddress, value: Value) -> RecordResult<()> {
        let pending = value.clone();
        self.cache.modify(address, |s| s.begin_write(pending));

        match self.raw.write(address, &value).await {
            Ok(()) => {
                let replaced = self.cache.modify(address, |s| {
                    let replaced = self.cache.advance_generation(address);
                    s.write_settled(None);
                    replaced
                });
                self.cache.forget_value(address, replaced).await;
                self.refetch_if_observed(address);
                Ok(())
            }
            Err(e) => {
                let error = RecordError::Transport(e);
                let recorded = error.clone();
                self.cache.modify(address, |s| s.write_settled(Some(recorded)));
                Err(error)
            }
        }
    }

    /// Read-modify-write the record at `address`
    ///
    /// `f` receives the current value (`None` if absent) and returns the
    /// value to write, or `None` to leave the record alone. Returns what was
    /// written.
    ///
    /// Coordination follows the configured [`WritePolicy`]:
    /// - `LastWriteWins` merges from the cached snapshot without locking;
    ///   two overlapping updates can lose one of them
    /// - `Serialized` holds a per-address lock across a fresh read, `f`, and
    ///   the write, so overlapping updates apply one after another
    ///
    /// # Errors
    /// Transport errors from the read or write, or whatever `f` returns
    #[instrument(level = "debug", skip_all, fields(address = %address))]
    pub async fn update<F>(&self, address: &RecordAddress, f: F) -> RecordResult<Option<Value>>
    where
        F: FnOnce(Option<Value>) -> RecordResult<Option<Value>>,
    {
        match self.cache.config().write_policy {
            WritePolicy::LastWriteWins => {
                let current = self.read(address).await?;
                self.apply(address, current, f).await
            }
            WritePolicy::Serialized => {
                let guard = self.cache.lock_writes(address).await;
                let result = match self.refresh(address).await {
                    Ok(current) => self.apply(address, current, f).await,
                    Err(e) => Err(e),
                };
                drop(guard);
                self.cache.release_write_lock(address);
                result
            }
        }
    }

    async fn apply<F>(
        &self,
        address: &RecordAddress,
        current: Option<Value>,
        f: F,
    ) -> RecordResult<Option<Value>>
    where
        F: FnOnce(Option<Value>) -> RecordResult<Option<Value>>,
    {
        let Some(next) = f(current)? else {
            tracing::debug!("update declined, nothing written");
            return Ok(None);
        };
        self.write(address, next.clone()).await?;
        Ok(Some(next))
    }

    /// Publish a fetched value unless a write moved the address on since
    /// the fetch began
    fn publish(&self, address: &RecordAddress, generation: u64, value: Option<&Value>) -> bool {
        self.cache.modify(address, |s| {
            if self.cache.generation(address) != generation {
                return false;
            }
            s.fetched(value.cloned());
            true
        })
    }

    fn fetch_failed(&self, address: &RecordAddress, error: TransportError) -> RecordError {
        let error = RecordError::Transport(error);
        let recorded = error.clone();
        self.cache.modify(address, |s| s.fetch_failed(recorded));
        error
    }

    fn refetch_if_observed(&self, address: &RecordAddress) {
        if !self.cache.config().refetch_on_write || self.cache.observer_count(address) == 0 {
            return;
        }
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            return;
        };

        let this = self.clone();
        let address = address.clone();
        handle.spawn(async move {
            if let Err(e) = this.read(&address).await {
                tracing::warn!(%address, error = %e, "background refetch failed");
            }
        });
    }
}
