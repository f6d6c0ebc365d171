//! NcAnimate product scheduler.
//!
//! Builds the timetable of every configured product against a catalog
//! snapshot, lists the maps and videos each product should have and reports
//! which of them are missing or outdated.

mod config;
mod schedule;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use config::{load_product_configs, SchedulerConfig, StorageSettings};
use schedule::Scheduler;
use storage::{InMemoryCatalog, ObjectStorage, StorageBackend};

#[derive(Parser, Debug)]
#[command(name = "ncanimate-scheduler")]
#[command(about = "Plan NcAnimate product files and report the outdated ones")]
struct Args {
    /// Job file path
    #[arg(short, long, env = "NCANIMATE_CONFIG", default_value = "/etc/ncanimate/scheduler.yaml")]
    config: PathBuf,

    /// Product configuration directory (overrides the job file)
    #[arg(long, env = "NCANIMATE_CONFIG_DIR")]
    config_dir: Option<PathBuf>,

    /// Catalog snapshot (overrides the job file)
    #[arg(long, env = "NCANIMATE_CATALOG")]
    catalog: Option<PathBuf>,

    /// Only schedule this product
    #[arg(short, long)]
    product: Option<String>,

    /// Only check output files of this region
    #[arg(short, long)]
    region: Option<String>,

    /// Products scheduled at the same time (overrides the job file)
    #[arg(long, env = "NCANIMATE_MAX_CONCURRENT")]
    max_concurrent: Option<usize>,

    /// Log level, used when RUST_LOG is unset
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Log as JSON
    #[arg(long, env = "LOG_JSON")]
    log_json: bool,

    /// Serve Prometheus metrics on this address
    #[arg(long, env = "METRICS_ADDR")]
    metrics_addr: Option<SocketAddr>,
}

fn init_tracing(args: &Args) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&args.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = FmtSubscriber::builder().with_env_filter(filter).with_target(true);
    if args.log_json {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }
    Ok(())
}

fn open_storage(settings: &StorageSettings) -> Result<Arc<dyn StorageBackend>> {
    let storage = match settings {
        StorageSettings::Local => ObjectStorage::local(),
        StorageSettings::S3(s3) => ObjectStorage::new(s3).context("Failed to open S3 storage")?,
    };
    Ok(Arc::new(storage))
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let args = Args::parse();
    init_tracing(&args)?;

    if let Some(addr) = args.metrics_addr {
        PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()
            .context("Failed to install Prometheus exporter")?;
        info!(addr = %addr, "Prometheus metrics exporter initialized");
    }

    let mut job = SchedulerConfig::load(&args.config)?;
    if let Some(config_dir) = args.config_dir.clone() {
        job.config_dir = config_dir;
    }
    if let Some(catalog) = args.catalog.clone() {
        job.catalog = catalog;
    }
    if let Some(max_concurrent) = args.max_concurrent {
        job.max_concurrent = max_concurrent;
    }
    info!(config_dir = ?job.config_dir, catalog = ?job.catalog, "Loaded job configuration");

    let mut products = load_product_configs(&job.config_dir)?;
    if let Some(product_id) = &args.product {
        products.retain(|id, _| id == product_id);
        if products.is_empty() {
            warn!(product = %product_id, "Product not found in the configuration directory");
        }
    }

    let catalog = InMemoryCatalog::load(&job.catalog)
        .await
        .with_context(|| format!("Failed to load catalog {:?}", job.catalog))?;
    let storage = open_storage(&job.storage)?;

    let scheduler = Scheduler::new(Arc::new(catalog), storage, job.session_capacity, job.max_concurrent)
        .with_region(args.region.clone());
    let report = scheduler.run(products.into_values().collect()).await;

    println!("{}", serde_json::to_string_pretty(&report)?);

    if !report.failures.is_empty() {
        anyhow::bail!("{} product(s) failed to schedule", report.failures.len());
    }
    Ok(())
}
