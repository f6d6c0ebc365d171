//! Scheduler job configuration.
//!
//! The job file names where product configurations live, the catalog
//! snapshot to schedule against and the storage holding generated files.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use ncanimate_common::ProductConfig;
use storage::ObjectStorageConfig;

/// Where generated product files are stored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StorageSettings {
    /// Absolute paths on the local filesystem
    #[default]
    Local,
    S3(ObjectStorageConfig),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulerConfig {
    /// Directory of product configuration files (`*.yaml`, `*.yml`, `*.json`)
    pub config_dir: PathBuf,

    /// JSON catalog snapshot
    pub catalog: PathBuf,

    #[serde(default)]
    pub storage: StorageSettings,

    /// Products scheduled at the same time
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,

    /// Source definitions kept in the metadata session
    #[serde(default = "default_session_capacity")]
    pub session_capacity: usize,
}

fn default_max_concurrent() -> usize {
    4
}

fn default_session_capacity() -> usize {
    64
}

impl SchedulerConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).with_context(|| format!("Failed to read job file {:?}", path))?;
        let config: Self = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse job file {:?}", path))?;
        Ok(config)
    }
}

fn is_config_file(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|s| s.to_str()),
        Some("yaml") | Some("yml") | Some("json")
    )
}

/// Load every product configuration of a directory, keyed by product id.
///
/// Files that fail to load are skipped with a warning. Two files defining
/// the same product are an error.
pub fn load_product_configs<P: AsRef<Path>>(config_dir: P) -> Result<BTreeMap<String, ProductConfig>> {
    let config_dir = config_dir.as_ref();
    let mut products = BTreeMap::new();

    let entries = fs::read_dir(config_dir)
        .with_context(|| format!("Failed to read product config directory {:?}", config_dir))?;

    let mut paths = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if path.is_file() && is_config_file(&path) {
            paths.push(path);
        }
    }
    paths.sort();

    for path in paths {
        let config = match ProductConfig::load(&path) {
            Ok(config) => config,
            Err(e) => {
                warn!(path = ?path, error = %e, "Skipping invalid product configuration");
                continue;
            }
        };
        debug!(product = %config.id, path = ?path, "Loaded product configuration");

        if products.contains_key(&config.id) {
            anyhow::bail!("Product {} is defined more than once (duplicate in {:?})", config.id, path);
        }
        products.insert(config.id.clone(), config);
    }

    Ok(products)
}
