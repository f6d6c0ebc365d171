//! One scheduling job over every configured product.

use std::sync::Arc;

use anyhow::{Context, Result};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use tracing::{error, info, instrument};

use ncanimate_common::{DateTimeRange, ProductConfig};
use storage::{CacheStats, MetadataCatalog, MetadataSession, StorageBackend};
use timetable::{
    GenerateFile, OutputKind, PlaceholderResolver, ProductTimetable, Staleness, TemplateResolver,
    TimetableSummary,
};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileReport {
    pub id: String,
    pub kind: OutputKind,
    pub file_id: String,
    pub date_range: DateTimeRange,
    pub staleness: Staleness,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductReport {
    pub product_id: String,
    pub timetable: TimetableSummary,
    pub files: Vec<FileReport>,
    pub outdated: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductFailure {
    pub product_id: String,
    pub error: String,
}

/// Outcome of a job.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobReport {
    pub products: Vec<ProductReport>,
    pub failures: Vec<ProductFailure>,
    pub metadata_cache: CacheStats,
}

impl JobReport {
    pub fn outdated_count(&self) -> usize {
        self.products.iter().map(|p| p.outdated).sum()
    }
}

pub struct Scheduler {
    session: Arc<MetadataSession>,
    storage: Arc<dyn StorageBackend>,
    resolver: Arc<dyn TemplateResolver>,
    region: Option<String>,
    max_concurrent: usize,
}

impl Scheduler {
    pub fn new(
        catalog: Arc<dyn MetadataCatalog>,
        storage: Arc<dyn StorageBackend>,
        session_capacity: usize,
        max_concurrent: usize,
    ) -> Self {
        Self {
            session: Arc::new(MetadataSession::open(catalog, session_capacity)),
            storage,
            resolver: Arc::new(PlaceholderResolver),
            region: None,
            max_concurrent: max_concurrent.max(1),
        }
    }

    /// Only check the output files of one region.
    pub fn with_region(mut self, region: Option<String>) -> Self {
        self.region = region;
        self
    }

    /// Schedule `products` concurrently, then close the metadata session.
    ///
    /// A failing product is reported and does not stop the others.
    pub async fn run(&self, products: Vec<ProductConfig>) -> JobReport {
        info!(products = products.len(), max_concurrent = self.max_concurrent, "Starting scheduling job");

        let outcomes: Vec<(String, Result<ProductReport>)> = stream::iter(products)
            .map(|config| async move {
                let product_id = config.id.clone();
                (product_id, self.schedule_product(config).await)
            })
            .buffer_unordered(self.max_concurrent)
            .collect()
            .await;

        let mut report = JobReport {
            products: Vec::new(),
            failures: Vec::new(),
            metadata_cache: CacheStats::default(),
        };
        for (product_id, outcome) in outcomes {
            match outcome {
                Ok(product) => report.products.push(product),
                Err(e) => {
                    error!(product = %product_id, error = %format!("{:#}", e), "Failed to schedule product");
                    report.failures.push(ProductFailure {
                        product_id,
                        error: format!("{:#}", e),
                    });
                }
            }
        }
        report.products.sort_by(|a, b| a.product_id.cmp(&b.product_id));
        report.failures.sort_by(|a, b| a.product_id.cmp(&b.product_id));
        report.metadata_cache = self.session.close().await;

        info!(
            products = report.products.len(),
            failures = report.failures.len(),
            outdated = report.outdated_count(),
            "Scheduling job completed"
        );
        report
    }

    #[instrument(skip(self, config), fields(product = %config.id))]
    async fn schedule_product(&self, config: ProductConfig) -> Result<ProductReport> {
        let product_id = config.id.clone();
        let catalog: &dyn MetadataCatalog = self.session.as_ref();

        let timetable = ProductTimetable::discover(Arc::new(config), catalog)
            .await
            .context("Failed to build product timetable")?;

        let mut units: Vec<GenerateFile> = timetable
            .map_output_files(catalog, self.resolver.as_ref())
            .await
            .context("Failed to list map output files")?;
        units.extend(
            timetable
                .video_output_files(catalog, self.resolver.as_ref())
                .await
                .context("Failed to list video output files")?,
        );

        let mut files = Vec::with_capacity(units.len());
        for unit in units {
            let staleness = timetable
                .check_outdated(&unit, self.storage.as_ref(), self.resolver.as_ref(), self.region.as_deref())
                .await
                .with_context(|| format!("Failed to check output file {}", unit.file_id))?;
            files.push(FileReport {
                id: unit.id,
                kind: unit.kind,
                file_id: unit.file_id,
                date_range: unit.date_range,
                staleness,
            });
        }

        let outdated = files.iter().filter(|f| f.staleness.is_outdated()).count();
        info!(files = files.len(), outdated, "Scheduled product");

        Ok(ProductReport {
            product_id,
            timetable: timetable.summary(),
            files,
            outdated,
        })
    }
}
