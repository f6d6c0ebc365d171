//! Metadata catalog of input files and generated product files.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info, instrument};

use ncanimate_common::{FileMetadata, NcAnimateError, NcAnimateResult, OutputRecord};

/// Read/write access to the metadata catalog.
///
/// Implementations must be safe for concurrent reads: products are
/// scheduled in parallel against one catalog.
#[async_trait]
pub trait MetadataCatalog: Send + Sync {
    /// Every file of a source definition, keyed by dataset id.
    async fn list_source_coverage(&self, definition_id: &str) -> NcAnimateResult<BTreeMap<String, FileMetadata>>;

    /// The recorded output file `output_id` of a product definition.
    async fn get_output_record(&self, definition_id: &str, output_id: &str) -> NcAnimateResult<Option<OutputRecord>>;

    /// Delete an output record. Returns false when there was nothing to delete.
    async fn delete_output_record(&self, definition_id: &str, output_id: &str) -> NcAnimateResult<bool>;
}

/// Serialized form of a catalog.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogSnapshot {
    #[serde(default)]
    pub sources: Vec<FileMetadata>,
    #[serde(default)]
    pub outputs: Vec<OutputRecord>,
}

/// Catalog held in memory, loadable from a JSON snapshot.
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    /// definition id -> dataset id -> metadata
    sources: RwLock<BTreeMap<String, BTreeMap<String, FileMetadata>>>,
    /// (definition id, output id) -> record
    outputs: RwLock<BTreeMap<(String, String), OutputRecord>>,
    coverage_requests: AtomicUsize,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: CatalogSnapshot) -> Self {
        let mut sources: BTreeMap<String, BTreeMap<String, FileMetadata>> = BTreeMap::new();
        for file in snapshot.sources {
            sources
                .entry(file.definition_id.clone())
                .or_default()
                .insert(file.dataset_id.clone(), file);
        }

        let outputs = snapshot
            .outputs
            .into_iter()
            .map(|record| ((record.definition_id.clone(), record.id.clone()), record))
            .collect();

        Self {
            sources: RwLock::new(sources),
            outputs: RwLock::new(outputs),
            coverage_requests: AtomicUsize::new(0),
        }
    }

    /// Load a catalog snapshot from a JSON file.
    pub async fn load(path: &Path) -> NcAnimateResult<Self> {
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            NcAnimateError::Catalog(format!("Failed to read catalog snapshot {}: {}", path.display(), e))
        })?;
        let snapshot: CatalogSnapshot = serde_json::from_str(&content)?;

        info!(
            path = %path.display(),
            sources = snapshot.sources.len(),
            outputs = snapshot.outputs.len(),
            "Loaded catalog snapshot"
        );
        Ok(Self::from_snapshot(snapshot))
    }

    pub async fn snapshot(&self) -> CatalogSnapshot {
        let sources = self
            .sources
            .read()
            .await
            .values()
            .flat_map(|files| files.values().cloned())
            .collect();
        let outputs = self.outputs.read().await.values().cloned().collect();
        CatalogSnapshot { sources, outputs }
    }

    pub async fn insert_source(&self, file: FileMetadata) {
        self.sources
            .write()
            .await
            .entry(file.definition_id.clone())
            .or_default()
            .insert(file.dataset_id.clone(), file);
    }

    pub async fn insert_output(&self, record: OutputRecord) {
        self.outputs
            .write()
            .await
            .insert((record.definition_id.clone(), record.id.clone()), record);
    }

    pub async fn output_count(&self) -> usize {
        self.outputs.read().await.len()
    }

    /// Number of coverage listings served so far.
    pub fn coverage_requests(&self) -> usize {
        self.coverage_requests.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl MetadataCatalog for InMemoryCatalog {
    #[instrument(skip(self))]
    async fn list_source_coverage(&self, definition_id: &str) -> NcAnimateResult<BTreeMap<String, FileMetadata>> {
        self.coverage_requests.fetch_add(1, Ordering::Relaxed);
        let files = self
            .sources
            .read()
            .await
            .get(definition_id)
            .cloned()
            .unwrap_or_default();

        debug!(count = files.len(), "Listed source coverage");
        Ok(files)
    }

    async fn get_output_record(&self, definition_id: &str, output_id: &str) -> NcAnimateResult<Option<OutputRecord>> {
        let key = (definition_id.to_string(), output_id.to_string());
        Ok(self.outputs.read().await.get(&key).cloned())
    }

    #[instrument(skip(self))]
    async fn delete_output_record(&self, definition_id: &str, output_id: &str) -> NcAnimateResult<bool> {
        let key = (definition_id.to_string(), output_id.to_string());
        let removed = self.outputs.write().await.remove(&key).is_some();
        debug!(removed, "Deleted output record");
        Ok(removed)
    }
}
