//! dstore Cache Layer
//!
//! A request-deduplicating, address-keyed cache in front of a
//! [`RemoteStore`](dstore_core::RemoteStore).
//!
//! # Core Concepts
//!
//! - [`CacheManager`]: explicit owner of the per-address cache table
//! - [`CachedAccessor`]: read/write/update through the cache
//! - [`RecordObserver`]: live view of one entry (value, status, pending write)
//!
//! # Example
//!
//! ```rust,ignore
//! use dstore_cache::{CacheManager, CachedAccessor};
//! use dstore_core::{MemoryStore, RecordAddress, StoreConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let cache = CacheManager::new(StoreConfig::default());
//! let todos = CachedAccessor::new(MemoryStore::new(), &cache);
//! let address = RecordAddress::new("maintenance", "todos")?;
//!
//! let current = todos.read(&address).await?;
//! todos.write(&address, serde_json::json!({ "todos": ["buy milk"] })).await?;
//! // entry is now stale; the next read fetches again
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod accessor;
mod entry;
mod manager;

pub use accessor::CachedAccessor;
pub use entry::{EntrySnapshot, FetchStatus, RecordObserver};
pub use manager::{CacheManager, CacheStats};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
