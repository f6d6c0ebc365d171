//! Product configurations and catalogs shared by the test suite.

use std::path::PathBuf;
use std::sync::Arc;

use tempfile::TempDir;

use ncanimate_common::{FileMetadata, ProductConfig, RegionConfig};
use storage::InMemoryCatalog;

/// Hourly GBR4 product with yearly videos, two map and two video formats.
pub const HOURLY_PRODUCT_YAML: &str = r#"
id: gbr4_v2_temp-wind-salt-current
lastModified: "2019-01-01T00:00:00Z"
frameTimeIncrement: { increment: 1, unit: HOUR }
panels:
  - id: temp
    layers:
      - id: gbr4_temp
        input:
          id: downloads/gbr4_v2
          timeIncrement: { increment: 1, unit: HOUR }
        variables: [temp]
      - id: world
render:
  utcOffsetMinutes: 600
  directoryUri: /home/ereefs/derived/ncanimate/products/${id}
  videoTimeIncrement: { increment: 1, unit: YEAR }
  maps:
    svgMap: { format: SVG }
    pngMap: { format: PNG }
  videos:
    mp4Video: { format: MP4, fps: 12 }
    wmvVideo: { format: WMV, fps: 10 }
"#;

/// Monthly product comparing GBR4 and GBR1 side by side.
pub const MONTHLY_PRODUCT_YAML: &str = r#"
id: gbr4-gbr1_temp_monthly
lastModified: "2019-01-01T00:00:00Z"
frameTimeIncrement: { increment: 1, unit: MONTH }
panels:
  - id: gbr4
    layers:
      - id: gbr4_temp
        input:
          id: downloads/gbr4_v2
          timeIncrement: { increment: 1, unit: MONTH }
        variables: [temp]
  - id: gbr1
    layers:
      - id: gbr1_temp
        input:
          id: downloads/gbr1_2-0
          timeIncrement: { increment: 1, unit: MONTH }
        variables: [temp]
render:
  utcOffsetMinutes: 600
  directoryUri: /products/${id}
  videoTimeIncrement: { increment: 1, unit: MONTH }
  videos:
    mp4Video: { format: MP4, fps: 1 }
"#;

pub fn hourly_product_config() -> ProductConfig {
    ProductConfig::from_yaml_str(HOURLY_PRODUCT_YAML).unwrap()
}

pub fn monthly_product_config() -> ProductConfig {
    ProductConfig::from_yaml_str(MONTHLY_PRODUCT_YAML).unwrap()
}

/// The monthly product, focused on one of its layers.
pub fn focused_monthly_product_config(layer_id: &str) -> ProductConfig {
    let mut config = monthly_product_config();
    config.focus_layers = vec![layer_id.to_string()];
    config
}

/// `config`, rendered for the given regions.
pub fn with_regions(mut config: ProductConfig, region_ids: &[&str]) -> ProductConfig {
    config.regions = region_ids
        .iter()
        .map(|id| RegionConfig {
            id: id.to_string(),
            label: None,
        })
        .collect();
    config
}

/// A catalog holding `files` as source coverage.
pub async fn catalog_with(files: impl IntoIterator<Item = FileMetadata>) -> Arc<InMemoryCatalog> {
    let catalog = InMemoryCatalog::new();
    for file in files {
        catalog.insert_source(file).await;
    }
    Arc::new(catalog)
}

/// A temporary directory holding the given `(file name, content)` pairs.
pub fn config_dir(files: &[(&str, &str)]) -> (TempDir, PathBuf) {
    let dir = TempDir::new().unwrap();
    for (name, content) in files {
        std::fs::write(dir.path().join(name), content).unwrap();
    }
    let path = dir.path().to_path_buf();
    (dir, path)
}
