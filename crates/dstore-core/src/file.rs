//! Directory-backed store
//!
//! Each record is a pretty-printed JSON file at `<root>/<namespace>/<key>.json`.
//! Every write goes to its own uniquely named temp file in the same
//! directory and is renamed into place, so a reader never observes a
//! half-written document and overlapping writers leave exactly one of their
//! documents behind.

use crate::address::RecordAddress;
use crate::error::TransportError;
use crate::remote::RemoteStore;
use async_trait::async_trait;
use serde_json::Value;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

/// Store persisting records as JSON files under a root directory
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Create store rooted at `root` (created lazily on first write)
    #[inline]
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory
    #[inline]
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File holding the record at `address`
    #[must_use]
    pub fn path_for(&self, address: &RecordAddress) -> PathBuf {
        self.root
            .join(address.namespace())
            .join(format!("{}.json", address.key()))
    }
}

#[async_trait]
impl RemoteStore for FileStore {
    async fn get(&self, address: &RecordAddress) -> Result<Option<Value>, TransportError> {
        let path = self.path_for(address);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(TransportError::io(address, &e)),
        };

        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| TransportError::decode(address, e.to_string()))
    }

    async fn put(&self, address: &RecordAddress, value: &Value) -> Result<(), TransportError> {
        let path = self.path_for(address);
        let dir = path
            .parent()
            .ok_or_else(|| TransportError::rejected(address, "record path has no parent"))?;
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| TransportError::io(address, &e))?;

        let body = serde_json::to_vec_pretty(value)
            .map_err(|e| TransportError::rejected(address, e.to_string()))?;

        let dir = dir.to_path_buf();
        let target = path.clone();
        tokio::task::spawn_blocking(move || -> std::io::Result<()> {
            let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
            tmp.write_all(&body)?;
            tmp.as_file().sync_all()?;
            tmp.persist(&target).map_err(|e| e.error)?;
            Ok(())
        })
        .await
        .map_err(|e| TransportError::io(address, &std::io::Error::other(e)))?
        .map_err(|e| TransportError::io(address, &e))?;

        tracing::trace!(path = %path.display(), "record file written");
        Ok(())
    }
}
