//! Object storage holding generated product files (S3 compatible or local disk).

use std::collections::HashMap;
use std::path::Path as FsPath;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use object_store::{aws::AmazonS3Builder, local::LocalFileSystem, path::Path, ObjectStore};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, instrument};

use ncanimate_common::{NcAnimateError, NcAnimateResult};

/// Access to stored files by URI.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Last modification of the file at `uri`, `None` if it does not exist.
    async fn last_modified(&self, uri: &str) -> NcAnimateResult<Option<DateTime<Utc>>>;

    /// Copy the file at `uri` to a local path.
    async fn download(&self, uri: &str, destination: &FsPath) -> NcAnimateResult<()>;
}

/// Configuration for an S3 compatible store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectStorageConfig {
    /// S3 endpoint URL, unset for AWS
    #[serde(default)]
    pub endpoint: Option<String>,
    pub bucket: String,
    #[serde(default)]
    pub access_key_id: Option<String>,
    #[serde(default)]
    pub secret_access_key: Option<String>,
    #[serde(default = "default_region")]
    pub region: String,
    /// Allow HTTP (for local MinIO)
    #[serde(default)]
    pub allow_http: bool,
}

fn default_region() -> String {
    "ap-southeast-2".to_string()
}

/// `object_store` backed storage.
pub struct ObjectStorage {
    store: Arc<dyn ObjectStore>,
    /// Bucket of `s3://` URIs, unset for local disk
    bucket: Option<String>,
}

impl ObjectStorage {
    /// Create an S3 client from config.
    pub fn new(config: &ObjectStorageConfig) -> NcAnimateResult<Self> {
        let mut builder = AmazonS3Builder::from_env()
            .with_bucket_name(&config.bucket)
            .with_region(&config.region);

        if let Some(endpoint) = &config.endpoint {
            builder = builder.with_endpoint(endpoint);
        }
        if let (Some(key), Some(secret)) = (&config.access_key_id, &config.secret_access_key) {
            builder = builder.with_access_key_id(key).with_secret_access_key(secret);
        }
        if config.allow_http {
            builder = builder.with_allow_http(true);
        }

        let store = builder
            .build()
            .map_err(|e| NcAnimateError::Storage(format!("Failed to create S3 client: {}", e)))?;

        Ok(Self {
            store: Arc::new(store),
            bucket: Some(config.bucket.clone()),
        })
    }

    /// Storage over the local filesystem, URIs being absolute paths.
    pub fn local() -> Self {
        Self {
            store: Arc::new(LocalFileSystem::new()),
            bucket: None,
        }
    }

    /// Map a URI to a location in the store.
    fn location(&self, uri: &str) -> NcAnimateResult<Path> {
        let key = if let Some(rest) = uri.strip_prefix("s3://") {
            let (bucket, key) = rest.split_once('/').unwrap_or((rest, ""));
            match &self.bucket {
                Some(expected) if expected == bucket => key,
                _ => {
                    return Err(NcAnimateError::Storage(format!(
                        "URI {} is outside the configured bucket",
                        uri
                    )))
                }
            }
        } else {
            uri.strip_prefix("file://").unwrap_or(uri)
        };

        let key = key.trim_start_matches('/');
        if key.is_empty() {
            return Err(NcAnimateError::Storage(format!("Invalid storage URI: {}", uri)));
        }
        Ok(Path::from(key))
    }
}

#[async_trait]
impl StorageBackend for ObjectStorage {
    #[instrument(skip(self))]
    async fn last_modified(&self, uri: &str) -> NcAnimateResult<Option<DateTime<Utc>>> {
        let location = self.location(uri)?;

        match self.store.head(&location).await {
            Ok(meta) => {
                debug!(last_modified = %meta.last_modified, "Found object");
                Ok(Some(meta.last_modified))
            }
            Err(object_store::Error::NotFound { .. }) => Ok(None),
            Err(e) => Err(NcAnimateError::Storage(format!("Failed to check {}: {}", uri, e))),
        }
    }

    #[instrument(skip(self), fields(destination = %destination.display()))]
    async fn download(&self, uri: &str, destination: &FsPath) -> NcAnimateResult<()> {
        let location = self.location(uri)?;

        let result = self
            .store
            .get(&location)
            .await
            .map_err(|e| NcAnimateError::Storage(format!("Failed to read {}: {}", uri, e)))?;

        let bytes = result
            .bytes()
            .await
            .map_err(|e| NcAnimateError::Storage(format!("Failed to read bytes: {}", e)))?;

        if let Some(parent) = destination.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(destination, &bytes).await?;

        debug!(size = bytes.len(), "Downloaded object");
        Ok(())
    }
}

#[derive(Debug, Clone)]
struct StoredObject {
    data: Bytes,
    last_modified: DateTime<Utc>,
}

/// Storage held in memory, with caller-controlled modification times.
#[derive(Debug, Default)]
pub struct InMemoryStorage {
    objects: RwLock<HashMap<String, StoredObject>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn put(&self, uri: impl Into<String>, data: Bytes, last_modified: DateTime<Utc>) {
        self.objects
            .write()
            .await
            .insert(uri.into(), StoredObject { data, last_modified });
    }

    /// Record an empty file modified at `last_modified`.
    pub async fn touch(&self, uri: impl Into<String>, last_modified: DateTime<Utc>) {
        self.put(uri, Bytes::new(), last_modified).await;
    }

    pub async fn remove(&self, uri: &str) -> bool {
        self.objects.write().await.remove(uri).is_some()
    }

    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.objects.read().await.is_empty()
    }
}

#[async_trait]
impl StorageBackend for InMemoryStorage {
    async fn last_modified(&self, uri: &str) -> NcAnimateResult<Option<DateTime<Utc>>> {
        Ok(self.objects.read().await.get(uri).map(|o| o.last_modified))
    }

    async fn download(&self, uri: &str, destination: &FsPath) -> NcAnimateResult<()> {
        let data = self
            .objects
            .read()
            .await
            .get(uri)
            .map(|o| o.data.clone())
            .ok_or_else(|| NcAnimateError::Storage(format!("Object not found: {}", uri)))?;

        tokio::fs::write(destination, &data).await?;
        Ok(())
    }
}
