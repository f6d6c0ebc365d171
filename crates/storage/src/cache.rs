//! Per-job metadata session caching catalog lookups.
//!
//! A session is opened at the start of a scheduling job and closed at its end.
//! Coverage listings are cached for the lifetime of the session; output
//! records are always read from the catalog.

use std::collections::BTreeMap;
use std::num::NonZeroUsize;
use std::sync::Arc;

use async_trait::async_trait;
use lru::LruCache;
use metrics::counter;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info};

use ncanimate_common::{FileMetadata, NcAnimateResult, OutputRecord};

use crate::catalog::MetadataCatalog;

#[derive(Debug, Default, Clone, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }
}

/// Caching decorator over a [`MetadataCatalog`].
pub struct MetadataSession {
    catalog: Arc<dyn MetadataCatalog>,
    /// definition id -> coverage listing
    coverage: Mutex<LruCache<String, BTreeMap<String, FileMetadata>>>,
    stats: Mutex<CacheStats>,
}

impl MetadataSession {
    /// Open a session caching up to `capacity` source definitions.
    pub fn open(catalog: Arc<dyn MetadataCatalog>, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            catalog,
            coverage: Mutex::new(LruCache::new(capacity)),
            stats: Mutex::new(CacheStats::default()),
        }
    }

    pub async fn stats(&self) -> CacheStats {
        self.stats.lock().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.coverage.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.coverage.lock().await.is_empty()
    }

    /// Evict every cached listing, returning the session statistics.
    pub async fn close(&self) -> CacheStats {
        self.coverage.lock().await.clear();

        let mut stats = self.stats.lock().await;
        let closed = std::mem::take(&mut *stats);
        info!(
            hits = closed.hits,
            misses = closed.misses,
            hit_rate = closed.hit_rate(),
            "Closed metadata session"
        );
        closed
    }
}

#[async_trait]
impl MetadataCatalog for MetadataSession {
    async fn list_source_coverage(&self, definition_id: &str) -> NcAnimateResult<BTreeMap<String, FileMetadata>> {
        {
            let mut cache = self.coverage.lock().await;
            if let Some(files) = cache.get(definition_id) {
                self.stats.lock().await.hits += 1;
                counter!("ncanimate_metadata_cache_hits_total").increment(1);
                return Ok(files.clone());
            }
        }

        let files = self.catalog.list_source_coverage(definition_id).await?;
        counter!("ncanimate_metadata_cache_misses_total").increment(1);

        {
            let mut cache = self.coverage.lock().await;
            let mut stats = self.stats.lock().await;
            stats.misses += 1;
            if cache.len() >= cache.cap().get() && !cache.contains(definition_id) {
                stats.evictions += 1;
            }
            cache.put(definition_id.to_string(), files.clone());
        }

        debug!(definition = %definition_id, count = files.len(), "Cached source coverage");
        Ok(files)
    }

    async fn get_output_record(&self, definition_id: &str, output_id: &str) -> NcAnimateResult<Option<OutputRecord>> {
        self.catalog.get_output_record(definition_id, output_id).await
    }

    async fn delete_output_record(&self, definition_id: &str, output_id: &str) -> NcAnimateResult<bool> {
        self.catalog.delete_output_record(definition_id, output_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::InMemoryCatalog;

    #[tokio::test]
    async fn test_session_caches_coverage_until_closed() {
        let catalog = Arc::new(InMemoryCatalog::new());
        catalog.insert_source(FileMetadata::new("downloads/gbr4_v2", "a.nc")).await;

        let session = MetadataSession::open(catalog.clone(), 8);
        assert_eq!(session.list_source_coverage("downloads/gbr4_v2").await.unwrap().len(), 1);
        assert_eq!(session.list_source_coverage("downloads/gbr4_v2").await.unwrap().len(), 1);
        assert_eq!(catalog.coverage_requests(), 1);

        let stats = session.close().await;
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert!(session.is_empty().await);

        catalog.insert_source(FileMetadata::new("downloads/gbr4_v2", "b.nc")).await;
        assert_eq!(session.list_source_coverage("downloads/gbr4_v2").await.unwrap().len(), 2);
        assert_eq!(catalog.coverage_requests(), 2);
    }

    #[tokio::test]
    async fn test_session_evicts_least_recent() {
        let catalog = Arc::new(InMemoryCatalog::new());
        let session = MetadataSession::open(catalog.clone(), 1);

        session.list_source_coverage("a").await.unwrap();
        session.list_source_coverage("b").await.unwrap();
        session.list_source_coverage("a").await.unwrap();

        assert_eq!(catalog.coverage_requests(), 3);
        assert_eq!(session.stats().await.evictions, 2);
    }
}
