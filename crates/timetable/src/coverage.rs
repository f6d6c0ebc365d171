//! Snapshot of the input files available to a product.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use tracing::{debug, instrument, warn};

use ncanimate_common::{DateTimeRange, FileMetadata, NcAnimateResult, ProductConfig, Timestamp};
use storage::MetadataCatalog;

/// Valid input files of a product, by source definition id then dataset id.
#[derive(Debug, Clone, Default)]
pub struct SourceCoverage {
    sources: BTreeMap<String, BTreeMap<String, Arc<FileMetadata>>>,
}

impl SourceCoverage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the coverage of every layer input of `config` from the catalog.
    ///
    /// Files whose status is not valid are skipped.
    #[instrument(skip(config, catalog), fields(product = %config.id))]
    pub async fn discover(config: &ProductConfig, catalog: &dyn MetadataCatalog) -> NcAnimateResult<Self> {
        let mut coverage = Self::new();

        for definition_id in config.input_definition_ids() {
            let files = catalog.list_source_coverage(&definition_id).await?;
            debug!(definition = %definition_id, count = files.len(), "Discovered input files");

            for file in files.into_values() {
                if file.is_valid() {
                    coverage.insert(file);
                } else {
                    warn!(file = %file.id, status = ?file.status, "Skipping input file with invalid status");
                }
            }
        }

        Ok(coverage)
    }

    pub fn insert(&mut self, file: FileMetadata) {
        self.sources
            .entry(file.definition_id.clone())
            .or_default()
            .insert(file.dataset_id.clone(), Arc::new(file));
    }

    pub fn files(&self, definition_id: &str) -> impl Iterator<Item = &Arc<FileMetadata>> {
        self.sources
            .get(definition_id)
            .into_iter()
            .flat_map(|files| files.values())
    }

    pub fn definition_ids(&self) -> impl Iterator<Item = &str> {
        self.sources.keys().map(String::as_str)
    }

    pub fn file_count(&self) -> usize {
        self.sources.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.file_count() == 0
    }

    /// Earliest and latest dates covered by the variables the product uses.
    ///
    /// Only sources in `definitions` are considered, or every source when it
    /// is empty. `None` when no considered file has a temporal domain.
    pub fn date_range(&self, config: &ProductConfig, definitions: &BTreeSet<String>) -> Option<DateTimeRange> {
        let mut variables: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
        for layer in config.layers() {
            if let Some(input) = &layer.input {
                variables
                    .entry(input.id.as_str())
                    .or_default()
                    .extend(layer.variables.iter().map(String::as_str));
            }
        }

        let mut min_date: Option<Timestamp> = None;
        let mut max_date: Option<Timestamp> = None;

        for (definition_id, used) in variables {
            if !definitions.is_empty() && !definitions.contains(definition_id) {
                continue;
            }
            for file in self.files(definition_id) {
                for domain in used.iter().filter_map(|v| file.temporal_domain(v)) {
                    if let Some(min) = domain.min_date {
                        min_date = Some(min_date.map_or(min, |m| m.min(min)));
                    }
                    max_date = max_date.max(domain.max_date);
                }
            }
        }

        match (min_date, max_date) {
            (Some(min), Some(max)) => Some(DateTimeRange::bounded(min, max)),
            _ => None,
        }
    }
}
