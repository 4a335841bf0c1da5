//! Store configuration
//!
//! Settings shared by the cache and controller layers. Loadable from TOML:
//!
//! ```toml
//! write_policy = "serialized"
//! refetch_on_write = true
//!
//! [cache]
//! max_capacity = 1000
//! ttl_secs = 300
//! ```

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// How concurrent read-modify-write updates to one address are coordinated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WritePolicy {
    /// No coordination: updates merge from the cached snapshot and the
    /// last `put` wins, so concurrent updates can be lost
    LastWriteWins,
    /// Updates to one address run one at a time, each reading the record
    /// fresh from the store before merging
    #[default]
    Serialized,
}

/// Cache sizing and expiry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum number of cached records
    pub max_capacity: u64,
    /// Time-to-live for cached values, `None` keeps them until invalidated
    pub ttl_secs: Option<u64>,
}

impl CacheConfig {
    /// TTL as a duration
    #[inline]
    #[must_use]
    pub fn ttl(&self) -> Option<Duration> {
        self.ttl_secs.map(Duration::from_secs)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_capacity: 10_000,
            ttl_secs: None,
        }
    }
}

/// Configuration for record access
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Cache settings
    pub cache: CacheConfig,
    /// Coordination of concurrent updates
    pub write_policy: WritePolicy,
    /// Re-read observed records in the background after a successful write
    pub refetch_on_write: bool,
}

impl StoreConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With write policy
    #[inline]
    #[must_use]
    pub fn with_write_policy(mut self, policy: WritePolicy) -> Self {
        self.write_policy = policy;
        self
    }

    /// With cache capacity
    #[inline]
    #[must_use]
    pub fn with_max_capacity(mut self, max_capacity: u64) -> Self {
        self.cache.max_capacity = max_capacity;
        self
    }

    /// With cache TTL
    #[inline]
    #[must_use]
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.cache.ttl_secs = Some(ttl.as_secs());
        self
    }

    /// With background refetch after writes
    #[inline]
    #[must_use]
    pub fn with_refetch_on_write(mut self, refetch: bool) -> Self {
        self.refetch_on_write = refetch;
        self
    }

    /// Parse from TOML
    ///
    /// # Errors
    /// `ConfigError::Parse` if the document is not a valid configuration
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    /// Load from a TOML file
    ///
    /// # Errors
    /// `ConfigError::Io` if the file cannot be read, `ConfigError::Parse` if invalid
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            cache: CacheConfig::default(),
            write_policy: WritePolicy::default(),
            refetch_on_write: true,
        }
    }
}
