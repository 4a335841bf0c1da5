//! Validated record accessor
//!
//! Every value leaving the cache passes through a [`Validate`] step before
//! callers see it. Writes are typed but not re-validated.

use crate::validate::{SerdeSchema, Validate};
use dstore_cache::{CachedAccessor, EntrySnapshot, RecordObserver};
use dstore_core::{RecordAddress, RecordError, RecordResult, RemoteStore, SchemaError};
use serde::Serialize;
use serde_json::Value;
use std::marker::PhantomData;
use std::sync::Arc;

/// Typed view over a [`CachedAccessor`]
pub struct ValidatedAccessor<T, S, V = SerdeSchema<T>> {
    cached: CachedAccessor<S>,
    validator: Arc<V>,
    _marker: PhantomData<fn() -> T>,
}

impl<T, S, V> Clone for ValidatedAccessor<T, S, V> {
    fn clone(&self) -> Self {
        Self {
            cached: self.cached.clone(),
            validator: Arc::clone(&self.validator),
            _marker: PhantomData,
        }
    }
}

impl<T, S, V> std::fmt::Debug for ValidatedAccessor<T, S, V>
where
    S: std::fmt::Debug,
    V: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidatedAccessor")
            .field("cached", &self.cached)
            .field("validator", &self.validator)
            .finish()
    }
}

impl<T, S, V> ValidatedAccessor<T, S, V>
where
    T: Serialize + Send,
    S: RemoteStore,
    V: Validate<T>,
{
    /// Wrap a cached accessor with a validator
    #[must_use]
    pub fn new(cached: CachedAccessor<S>, validator: V) -> Self {
        Self {
            cached,
            validator: Arc::new(validator),
            _marker: PhantomData,
        }
    }

    /// Cached accessor underneath
    #[inline]
    #[must_use]
    pub fn cached(&self) -> &CachedAccessor<S> {
        &self.cached
    }

    /// Validator applied to reads
    #[inline]
    #[must_use]
    pub fn validator(&self) -> &V {
        &self.validator
    }

    /// Observe the cache entry for `address`
    #[must_use]
    pub fn subscribe(&self, address: &RecordAddress) -> RecordObserver {
        self.cached.subscribe(address)
    }

    /// Read and validate the record at `address`
    ///
    /// # Errors
    /// - `RecordError::Transport` if the fetch fails
    /// - `RecordError::Schema` if the stored value does not conform
    pub async fn read(&self, address: &RecordAddress) -> RecordResult<Option<T>> {
        let raw = self.cached.read(address).await?;
        self.check(address, raw.as_ref())
    }

    /// Fetch fresh from the store and validate
    ///
    /// # Errors
    /// Same as [`read`](Self::read)
    pub async fn refresh(&self, address: &RecordAddress) -> RecordResult<Option<T>> {
        let raw = self.cached.refresh(address).await?;
        self.check(address, raw.as_ref())
    }

    /// Validate the last known value in a snapshot without fetching
    ///
    /// # Errors
    /// `RecordError::Schema` if the cached value does not conform
    pub fn validate_snapshot(&self, snapshot: &EntrySnapshot) -> RecordResult<Option<T>> {
        self.check(&snapshot.address, snapshot.value.as_ref())
    }

    /// Validate an arbitrary raw value, e.g. a pending write
    ///
    /// # Errors
    /// `SchemaError` if `raw` does not conform
    pub fn validate_value(&self, raw: &Value) -> Result<T, SchemaError> {
        self.validator.validate(raw)
    }

    /// Replace the record at `address`
    ///
    /// # Errors
    /// - `RecordError::Encode` if `value` cannot be represented as JSON
    /// - `RecordError::Transport` if the write fails
    pub async fn write(&self, address: &RecordAddress, value: &T) -> RecordResult<()> {
        let raw = encode(value)?;
        self.cached.write(address, raw).await
    }

    /// Read-modify-write with typed values
    ///
    /// `f` receives the validated current value (`None` if absent) and
    /// returns the value to write, or `None` to skip the write. Coordination
    /// follows the cache's write policy.
    ///
    /// # Errors
    /// Transport errors, schema errors on the current value, or `f`'s error
    pub async fn update<F>(&self, address: &RecordAddress, f: F) -> RecordResult<Option<T>>
    where
        F: FnOnce(Option<T>) -> RecordResult<Option<T>> + Send,
    {
        let mut written = None;
        let slot = &mut written;
        self.cached
            .update(address, |raw| {
                let current = self.check(address, raw.as_ref())?;
                let Some(next) = f(current)? else {
                    return Ok(None);
                };
                let encoded = encode(&next)?;
                *slot = Some(next);
                Ok(Some(encoded))
            })
            .await?;
        Ok(written)
    }

    fn check(&self, address: &RecordAddress, raw: Option<&Value>) -> RecordResult<Option<T>> {
        let Some(raw) = raw else {
            return Ok(None);
        };
        self.validator.validate(raw).map(Some).map_err(|e| {
            tracing::warn!(%address, error = %e, "record failed validation");
            e.into()
        })
    }
}

fn encode<T: Serialize>(value: &T) -> RecordResult<Value> {
    serde_json::to_value(value).map_err(|e| RecordError::Encode(e.to_string()))
}
