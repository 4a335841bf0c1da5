//! Record addresses
//!
//! A record lives at `namespace/key` in the data store. Both segments are
//! validated once on construction so every layer above can treat the
//! address as an opaque, hashable key.

use crate::error::AddressError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Address of a single JSON document in the remote store
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RecordAddress {
    namespace: String,
    key: String,
}

impl RecordAddress {
    /// Create a new address
    ///
    /// # Errors
    /// - `AddressError::Empty` if either segment is empty
    /// - `AddressError::InvalidSegment` if a segment contains `/` or `\`
    /// - `AddressError::Reserved` if a segment is `.` or `..`
    pub fn new(namespace: impl Into<String>, key: impl Into<String>) -> Result<Self, AddressError> {
        let namespace = namespace.into();
        let key = key.into();
        check_segment("namespace", &namespace)?;
        check_segment("key", &key)?;
        Ok(Self { namespace, key })
    }

    /// Namespace segment
    #[inline]
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Key segment
    #[inline]
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }
}

fn check_segment(field: &'static str, value: &str) -> Result<(), AddressError> {
    if value.is_empty() {
        return Err(AddressError::Empty(field));
    }
    if value.contains(|c| c == '/' || c == '\\') {
        return Err(AddressError::InvalidSegment {
            field,
            value: value.to_string(),
        });
    }
    // Segments become path components in file-backed stores
    if value == "." || value == ".." {
        return Err(AddressError::Reserved {
            field,
            value: value.to_string(),
        });
    }
    Ok(())
}

impl fmt::Display for RecordAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.key)
    }
}

impl FromStr for RecordAddress {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (namespace, key) = s
            .split_once('/')
            .ok_or_else(|| AddressError::Malformed(s.to_string()))?;
        Self::new(namespace, key)
    }
}

impl TryFrom<String> for RecordAddress {
    type Error = AddressError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<RecordAddress> for String {
    fn from(address: RecordAddress) -> Self {
        address.to_string()
    }
}
