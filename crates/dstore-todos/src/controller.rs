//! List-mutation controller
//!
//! Hides the read-merge-write of a list record behind two intentions:
//! append an item, remove the item at an index. Callers never touch the
//! raw document.

use crate::record::{ListRecord, TodosRecord};
use dstore_cache::{CacheManager, CachedAccessor, FetchStatus, RecordObserver};
use dstore_core::{RecordAddress, RecordError, RecordResult, RemoteStore};
use dstore_schema::{SerdeSchema, Validate, ValidatedAccessor};
use tracing::instrument;

/// Result of a controller mutation
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation<R> {
    /// Record written with this value
    Written(R),
    /// Nothing was written, e.g. `add_item` was given an empty string
    Skipped,
}

impl<R> Mutation<R> {
    /// Whether the record was written
    #[inline]
    #[must_use]
    pub fn is_written(&self) -> bool {
        matches!(self, Self::Written(_))
    }

    /// Written record, if any
    #[must_use]
    pub fn written(self) -> Option<R> {
        match self {
            Self::Written(record) => Some(record),
            Self::Skipped => None,
        }
    }
}

/// What a view needs to render the list
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ControllerState {
    /// Current items, `None` until the first successful read
    pub items: Option<Vec<String>>,
    /// Fetch status of the underlying entry
    pub status: FetchStatus,
    /// Last transport error, or a schema error in the cached value
    pub error: Option<RecordError>,
    /// Whether a write is in flight
    pub is_writing: bool,
    /// Item being appended by the write in flight, for an optimistic preview
    pub pending_item: Option<String>,
}

/// Controller for one list record
///
/// Bound to a single address for its whole lifetime.
pub struct ListController<R, S, V = SerdeSchema<R>> {
    address: RecordAddress,
    accessor: ValidatedAccessor<R, S, V>,
}

impl<R, S, V> Clone for ListController<R, S, V> {
    fn clone(&self) -> Self {
        Self {
            address: self.address.clone(),
            accessor: self.accessor.clone(),
        }
    }
}

impl<R, S, V> std::fmt::Debug for ListController<R, S, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListController")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

impl<R, S, V> ListController<R, S, V>
where
    R: ListRecord,
    S: RemoteStore,
    V: Validate<R>,
{
    /// Create controller for the record at `address`
    #[must_use]
    pub fn new(address: RecordAddress, accessor: ValidatedAccessor<R, S, V>) -> Self {
        Self { address, accessor }
    }

    /// Controlled address
    #[inline]
    #[must_use]
    pub fn address(&self) -> &RecordAddress {
        &self.address
    }

    /// Validated accessor underneath
    #[inline]
    #[must_use]
    pub fn accessor(&self) -> &ValidatedAccessor<R, S, V> {
        &self.accessor
    }

    /// Current items, loading the record if needed (empty if absent)
    ///
    /// # Errors
    /// Transport or schema errors from the read
    pub async fn items(&self) -> RecordResult<Vec<String>> {
        let record = self.accessor.read(&self.address).await?;
        Ok(record.map(|r| r.items().to_vec()).unwrap_or_default())
    }

    /// Re-read the record from the store
    ///
    /// # Errors
    /// Transport or schema errors from the read
    pub async fn refresh(&self) -> RecordResult<Vec<String>> {
        let record = self.accessor.refresh(&self.address).await?;
        Ok(record.map(|r| r.items().to_vec()).unwrap_or_default())
    }

    /// Append `value` to the list
    ///
    /// An empty `value` is skipped without reading or writing. An absent
    /// record is treated as an empty list.
    ///
    /// # Errors
    /// Transport or schema errors from the read or write
    #[instrument(level = "debug", skip_all, fields(address = %self.address))]
    pub async fn add_item(&self, value: impl Into<String>) -> RecordResult<Mutation<R>> {
        let value = value.into();
        if value.is_empty() {
            tracing::debug!("empty input, nothing to add");
            return Ok(Mutation::Skipped);
        }

        let written = self
            .accessor
            .update(&self.address, move |current| {
                let current = current.unwrap_or_default();
                let mut items = current.items().to_vec();
                items.push(value);
                Ok(Some(current.with_items(items)))
            })
            .await?;

        Ok(Self::finish(written))
    }

    /// Remove the item at `index`
    ///
    /// Out-of-range indices are rejected, never clamped, and nothing is
    /// written.
    ///
    /// # Errors
    /// - `RecordError::IndexOutOfRange` if `index >= len`
    /// - transport or schema errors from the read or write
    #[instrument(level = "debug", skip_all, fields(address = %self.address, index = index))]
    pub async fn remove_item_at(&self, index: usize) -> RecordResult<Mutation<R>> {
        let written = self
            .accessor
            .update(&self.address, move |current| {
                let current = current.unwrap_or_default();
                let items = current.items();
                if index >= items.len() {
                    return Err(RecordError::IndexOutOfRange {
                        index,
                        len: items.len(),
                    });
                }
                let remaining = items[..index]
                    .iter()
                    .chain(&items[index + 1..])
                    .cloned()
                    .collect();
                Ok(Some(current.with_items(remaining)))
            })
            .await?;

        Ok(Self::finish(written))
    }

    /// Observe the underlying cache entry
    #[must_use]
    pub fn subscribe(&self) -> RecordObserver {
        self.accessor.subscribe(&self.address)
    }

    /// Render state from the cache entry, without fetching
    #[must_use]
    pub fn state(&self) -> ControllerState {
        let Some(snapshot) = self.accessor.cached().cache().snapshot(&self.address) else {
            return ControllerState::default();
        };

        let mut state = ControllerState {
            items: None,
            status: snapshot.status,
            error: snapshot.error.clone(),
            is_writing: snapshot.is_writing(),
            pending_item: None,
        };

        if snapshot.loaded {
            match self.accessor.validate_snapshot(&snapshot) {
                Ok(record) => {
                    state.items = Some(record.map(|r| r.items().to_vec()).unwrap_or_default());
                }
                Err(e) => state.error = Some(e),
            }
        }

        // Only an append has a new trailing item worth previewing
        if let Some(pending) = snapshot
            .pending_write
            .as_ref()
            .and_then(|raw| self.accessor.validate_value(raw).ok())
        {
            let known = state.items.as_ref().map_or(0, Vec::len);
            if pending.items().len() > known {
                state.pending_item = pending.items().last().cloned();
            }
        }

        state
    }

    fn finish(written: Option<R>) -> Mutation<R> {
        match written {
            Some(record) => {
                tracing::info!(items = record.items().len(), "list record written");
                Mutation::Written(record)
            }
            None => Mutation::Skipped,
        }
    }
}

/// Controller for the `maintenance/todos` record
pub type TodosController<S> = ListController<TodosRecord, S>;

impl<S: RemoteStore> ListController<TodosRecord, S> {
    /// Todos controller over `store`, sharing `cache`
    #[must_use]
    pub fn todos(store: S, cache: &CacheManager) -> Self {
        let cached = CachedAccessor::new(store, cache);
        Self::new(
            TodosRecord::address(),
            ValidatedAccessor::new(cached, SerdeSchema::new()),
        )
    }
}
