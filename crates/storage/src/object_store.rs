//! Object storage interface for the magnetometer archive (public S3 compatible).

use bytes::Bytes;
use object_store::{
    aws::AmazonS3Builder, local::LocalFileSystem, memory::InMemory, path::Path, ObjectStore,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, instrument};

use geomag_common::{GeomagError, GeomagResult};

/// Configuration for the upstream archive connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObjectStorageConfig {
    /// Bucket name
    pub bucket: String,
    /// AWS region of the bucket
    pub region: String,
    /// Custom endpoint URL (S3-compatible mirrors); None for AWS itself
    pub endpoint: Option<String>,
    /// Allow HTTP (for local mirrors)
    pub allow_http: bool,
    /// Read from a local directory instead of a bucket
    pub local_root: Option<PathBuf>,
}

impl Default for ObjectStorageConfig {
    fn default() -> Self {
        Self {
            bucket: "geonet-open-data".to_string(),
            region: "ap-southeast-2".to_string(),
            endpoint: None,
            allow_http: false,
            local_root: None,
        }
    }
}

/// Read-mostly object storage client.
pub struct ObjectStorage {
    store: Arc<dyn ObjectStore>,
    bucket: String,
}

impl ObjectStorage {
    /// Create a client from config.
    ///
    /// The archive is publicly readable, so S3 requests are sent unsigned.
    pub fn new(config: &ObjectStorageConfig) -> GeomagResult<Self> {
        if let Some(root) = &config.local_root {
            let store = LocalFileSystem::new_with_prefix(root).map_err(|e| {
                GeomagError::StorageError(format!(
                    "Failed to open local archive {}: {}",
                    root.display(),
                    e
                ))
            })?;
            return Ok(Self {
                store: Arc::new(store),
                bucket: root.display().to_string(),
            });
        }

        let mut builder = AmazonS3Builder::new()
            .with_bucket_name(&config.bucket)
            .with_region(&config.region)
            .with_skip_signature(true);

        if let Some(endpoint) = &config.endpoint {
            builder = builder.with_endpoint(endpoint);
        }
        if config.allow_http {
            builder = builder.with_allow_http(true);
        }

        let store = builder
            .build()
            .map_err(|e| GeomagError::StorageError(format!("Failed to create S3 client: {}", e)))?;

        Ok(Self {
            store: Arc::new(store),
            bucket: config.bucket.clone(),
        })
    }

    /// Wrap an existing store.
    pub fn from_store(store: Arc<dyn ObjectStore>, bucket: impl Into<String>) -> Self {
        Self {
            store,
            bucket: bucket.into(),
        }
    }

    /// Empty in-memory store, mostly for tests.
    pub fn in_memory() -> Self {
        Self::from_store(Arc::new(InMemory::new()), "memory")
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Write bytes to a path in the bucket.
    #[instrument(skip(self, data), fields(bucket = %self.bucket, path = %path))]
    pub async fn put(&self, path: &str, data: Bytes) -> GeomagResult<()> {
        let location = Path::from(path);
        debug!(size = data.len(), "Writing object");

        self.store
            .put(&location, data.into())
            .await
            .map_err(|e| GeomagError::StorageError(format!("Failed to write {}: {}", path, e)))?;

        Ok(())
    }

    /// Read bytes from a path.
    ///
    /// A missing object is `GeomagError::NotFound`, distinct from transport
    /// failures.
    #[instrument(skip(self), fields(bucket = %self.bucket, path = %path))]
    pub async fn get(&self, path: &str) -> GeomagResult<Bytes> {
        let location = Path::from(path);

        let result = match self.store.get(&location).await {
            Ok(result) => result,
            Err(object_store::Error::NotFound { .. }) => {
                return Err(GeomagError::NotFound(path.to_string()))
            }
            Err(e) => {
                return Err(GeomagError::StorageError(format!(
                    "Failed to read {}: {}",
                    path, e
                )))
            }
        };

        let bytes = result
            .bytes()
            .await
            .map_err(|e| GeomagError::StorageError(format!("Failed to read bytes: {}", e)))?;

        debug!(size = bytes.len(), "Read object");
        Ok(bytes)
    }

    /// List object keys under a prefix, sorted.
    ///
    /// A prefix with nothing under it yields an empty list, not an error.
    pub async fn list(&self, prefix: &str) -> GeomagResult<Vec<String>> {
        use futures::TryStreamExt;

        let prefix_path = Path::from(prefix);
        let mut paths = Vec::new();

        let mut stream = self.store.list(Some(&prefix_path));
        loop {
            match stream.try_next().await {
                Ok(Some(meta)) => paths.push(meta.location.to_string()),
                Ok(None) => break,
                Err(object_store::Error::NotFound { .. }) => break,
                Err(e) => {
                    return Err(GeomagError::StorageError(format!(
                        "List {} failed: {}",
                        prefix, e
                    )))
                }
            }
        }

        paths.sort();
        debug!(prefix = %prefix, count = paths.len(), "Listed objects");
        Ok(paths)
    }
}
