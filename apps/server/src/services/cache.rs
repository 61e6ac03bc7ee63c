// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Disk-based upload store using cacache.
//!
//! Uploaded IFC bytes are kept under their SHA-256 so a session can reload
//! a model without sending it again.

use crate::error::ApiError;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::PathBuf;

/// Upload details stored next to the model bytes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadInfo {
    pub file_name: String,
    pub size: usize,
}

/// Content-addressable disk cache.
#[derive(Debug, Clone)]
pub struct DiskCache {
    cache_dir: PathBuf,
}

impl DiskCache {
    /// Create a new cache in the specified directory.
    pub async fn new(cache_dir: &str) -> Self {
        let path = PathBuf::from(cache_dir);

        if let Err(e) = tokio::fs::create_dir_all(&path).await {
            tracing::warn!(
                error = %e,
                path = %path.display(),
                "Failed to create cache directory"
            );
        }

        Self { cache_dir: path }
    }

    /// Cache key from file content (SHA-256, hex).
    pub fn generate_key(data: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(data);
        hex::encode(hasher.finalize())
    }

    fn info_key(key: &str) -> String {
        format!("{}:info", key)
    }

    /// Get a cached value by key.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, ApiError> {
        match self.get_bytes(key).await? {
            Some(data) => Ok(Some(serde_json::from_slice(&data)?)),
            None => Ok(None),
        }
    }

    /// Set a cached value.
    pub async fn set<T: Serialize>(&self, key: &str, value: &T) -> Result<(), ApiError> {
        let data = serde_json::to_vec(value)?;
        self.set_bytes(key, &data).await
    }

    /// Check if a key exists in the cache.
    pub async fn has(&self, key: &str) -> bool {
        cacache::metadata(&self.cache_dir, key)
            .await
            .map(|m| m.is_some())
            .unwrap_or(false)
    }

    pub async fn get_bytes(&self, key: &str) -> Result<Option<Vec<u8>>, ApiError> {
        match cacache::read(&self.cache_dir, key).await {
            Ok(data) => Ok(Some(data)),
            Err(cacache::Error::EntryNotFound(_, _)) => Ok(None),
            Err(e) => Err(ApiError::Cache(e.to_string())),
        }
    }

    pub async fn set_bytes(&self, key: &str, data: &[u8]) -> Result<(), ApiError> {
        cacache::write(&self.cache_dir, key, data).await?;
        tracing::debug!(key = %key, size = data.len(), "Cached raw bytes");
        Ok(())
    }

    /// Store an upload; returns its key
    pub async fn store_upload(&self, file_name: &str, data: &[u8]) -> Result<String, ApiError> {
        let key = Self::generate_key(data);
        if !self.has(&key).await {
            self.set_bytes(&key, data).await?;
        }
        let info = UploadInfo {
            file_name: file_name.to_string(),
            size: data.len(),
        };
        self.set(&Self::info_key(&key), &info).await?;
        Ok(key)
    }

    /// Bytes and details of a stored upload
    pub async fn load_upload(&self, key: &str) -> Result<Option<(UploadInfo, Vec<u8>)>, ApiError> {
        let Some(data) = self.get_bytes(key).await? else {
            return Ok(None);
        };
        let info = self
            .get::<UploadInfo>(&Self::info_key(key))
            .await?
            .unwrap_or_else(|| UploadInfo {
                file_name: format!("{}.ifc", key),
                size: data.len(),
            });
        Ok(Some((info, data)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_key() {
        let key = DiskCache::generate_key(b"ISO-10303-21;");
        assert_eq!(key.len(), 64);
        assert_eq!(key, DiskCache::generate_key(b"ISO-10303-21;"));
        assert_ne!(key, DiskCache::generate_key(b"ISO-10303-21;\n"));
    }
}
