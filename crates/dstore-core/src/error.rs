//! Error types for dstore
//!
//! Provides error handling for:
//! - Remote calls (transport failures)
//! - Validation of retrieved records (schema failures)
//! - List mutations (index out of range)
//! - Addresses and configuration
//!
//! Every error that can reach a deduplicated read is `Clone`, so one failed
//! fetch can be handed to every caller waiting on it.

use crate::address::RecordAddress;
use std::path::PathBuf;

/// Remote call failed (network, auth, server, or unreadable payload)
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// Store could not be reached or refused service
    #[error("store unavailable for {address}: {message}")]
    Unavailable {
        address: RecordAddress,
        message: String,
    },

    /// Local IO failure while talking to the store
    #[error("io error for {address}: {message}")]
    Io {
        address: RecordAddress,
        message: String,
    },

    /// Store returned bytes that are not JSON
    #[error("undecodable payload for {address}: {message}")]
    Decode {
        address: RecordAddress,
        message: String,
    },

    /// Store rejected the request (e.g. unauthorized, too large)
    #[error("request for {address} rejected: {message}")]
    Rejected {
        address: RecordAddress,
        message: String,
    },
}

impl TransportError {
    /// Create unavailable error for address
    pub fn unavailable(address: &RecordAddress, message: impl Into<String>) -> Self {
        Self::Unavailable {
            address: address.clone(),
            message: message.into(),
        }
    }

    /// Create IO error for address
    pub fn io(address: &RecordAddress, source: &std::io::Error) -> Self {
        Self::Io {
            address: address.clone(),
            message: source.to_string(),
        }
    }

    /// Create decode error for address
    pub fn decode(address: &RecordAddress, message: impl Into<String>) -> Self {
        Self::Decode {
            address: address.clone(),
            message: message.into(),
        }
    }

    /// Create rejected error for address
    pub fn rejected(address: &RecordAddress, message: impl Into<String>) -> Self {
        Self::Rejected {
            address: address.clone(),
            message: message.into(),
        }
    }

    /// Address the failed call was made against
    #[must_use]
    pub fn address(&self) -> &RecordAddress {
        match self {
            Self::Unavailable { address, .. }
            | Self::Io { address, .. }
            | Self::Decode { address, .. }
            | Self::Rejected { address, .. } => address,
        }
    }
}

/// Retrieved value does not conform to the declared schema
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("schema validation failed{}", render_violations(.violations))]
pub struct SchemaError {
    /// One entry per violation: (instance path, message)
    pub violations: Vec<(String, String)>,
}

impl SchemaError {
    /// Single violation at the given path
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            violations: vec![(path.into(), message.into())],
        }
    }

    /// Build from a list of violations
    #[must_use]
    pub fn from_violations(violations: Vec<(String, String)>) -> Self {
        Self { violations }
    }
}

fn render_violations(violations: &[(String, String)]) -> String {
    let mut out = String::new();
    for (i, (path, message)) in violations.iter().enumerate() {
        out.push_str(if i == 0 { ": " } else { "; " });
        if !path.is_empty() {
            out.push_str(path);
            out.push_str(": ");
        }
        out.push_str(message);
    }
    out
}

/// Errors surfaced by record reads, writes and list mutations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecordError {
    /// Remote call failed
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Retrieved value failed validation
    #[error("{0}")]
    Schema(#[from] SchemaError),

    /// List removal index past the end of the list
    #[error("index {index} out of range for list of length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    /// Typed value could not be turned into JSON for a write
    #[error("record could not be encoded: {0}")]
    Encode(String),
}

impl RecordError {
    /// Check if error is a transport failure
    #[inline]
    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    /// Check if error is a schema failure
    #[inline]
    #[must_use]
    pub fn is_schema(&self) -> bool {
        matches!(self, Self::Schema(_))
    }

    /// Check if retrying the same call could succeed
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Transport(TransportError::Unavailable { .. } | TransportError::Io { .. })
        )
    }
}

/// Invalid record address
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AddressError {
    /// Segment is empty
    #[error("{0} must not be empty")]
    Empty(&'static str),

    /// Segment contains a path separator
    #[error("{field} must not contain '/' or '\\': '{value}'")]
    InvalidSegment { field: &'static str, value: String },

    /// Segment is `.` or `..`
    #[error("{field} must not be a relative path component: '{value}'")]
    Reserved { field: &'static str, value: String },

    /// String form is not `namespace/key`
    #[error("malformed address '{0}', expected 'namespace/key'")]
    Malformed(String),
}

/// Configuration loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// IO error reading config file
    #[error("io error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Config is not valid TOML for `StoreConfig`
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Result type alias for record operations
pub type RecordResult<T> = Result<T, RecordError>;
