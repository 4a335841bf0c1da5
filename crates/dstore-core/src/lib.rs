//! dstore Core
//!
//! The boundary between application code and a remote key-value data store.
//!
//! # Core Concepts
//!
//! - [`RecordAddress`]: `(namespace, key)` pair naming one JSON document
//! - [`RemoteStore`]: the call surface of the store (`get` / `put`)
//! - [`RawAccessor`]: unvalidated, uncached read/write of a record
//! - [`StoreConfig`]: cache and write-policy settings shared by the layers above
//!
//! # Architecture
//!
//! ```text
//! ListController → ValidatedAccessor → CachedAccessor → RawAccessor → RemoteStore
//!                        ↑ validate         ↑ CacheManager (per-address table)
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use dstore_core::{MemoryStore, RawAccessor, RecordAddress};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let address = RecordAddress::new("maintenance", "todos")?;
//! let raw = RawAccessor::new(MemoryStore::new());
//!
//! // Caller owns the merge
//! let current = raw.read(&address).await?;
//! raw.write(&address, &serde_json::json!({ "todos": ["buy milk"] })).await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod address;
pub mod config;
pub mod error;
pub mod file;
pub mod raw;
pub mod remote;

pub use address::RecordAddress;
pub use config::{CacheConfig, StoreConfig, WritePolicy};
pub use error::{AddressError, ConfigError, RecordError, RecordResult, SchemaError, TransportError};
pub use file::FileStore;
pub use raw::RawAccessor;
pub use remote::{MemoryStore, RemoteStore};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with dstore records
    pub use crate::address::RecordAddress;
    pub use crate::config::{StoreConfig, WritePolicy};
    pub use crate::error::{RecordError, RecordResult, SchemaError, TransportError};
    pub use crate::remote::{MemoryStore, RemoteStore};
}
