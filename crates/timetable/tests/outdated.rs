//! Staleness of product files against storage and catalog timestamps.

use std::collections::BTreeMap;
use std::sync::Arc;

use ncanimate_common::{ConfigPart, DateTimeRange, NcAnimateError, ProductConfig};
use storage::{InMemoryCatalog, InMemoryStorage};
use test_utils::{
    catalog_with, fake_hourly_files, file_with_times, ts, utc, GBR4_DEFINITION, HOURLY_PRODUCT_YAML,
};
use timetable::{
    check_outdated, GenerateFile, OutputKind, PlaceholderResolver, ProductTimetable, StaleReason, Staleness,
};

const MP4_URI: &str = "/home/ereefs/derived/ncanimate/products/gbr4_v2_temp-wind-salt-current/\
gbr4_v2_temp-wind-salt-current_video_yearly_2010_qld_-1.5.mp4";
const WMV_URI: &str = "/home/ereefs/derived/ncanimate/products/gbr4_v2_temp-wind-salt-current/\
gbr4_v2_temp-wind-salt-current_video_yearly_2010_qld_-1.5.wmv";

fn regional_config() -> ProductConfig {
    let yaml = format!(
        "{}regions:\n  - id: qld\n    label: Queensland\ntargetHeights: [-1.5]\n",
        HOURLY_PRODUCT_YAML
    );
    ProductConfig::from_yaml_str(&yaml).unwrap()
}

async fn catalog() -> Arc<InMemoryCatalog> {
    catalog_with(fake_hourly_files(
        GBR4_DEFINITION,
        "FAKE",
        ts(2010, 9, 1, 5, 0),
        30,
        utc(2019, 1, 1, 0),
    ))
    .await
}

async fn video(config: ProductConfig, catalog: &InMemoryCatalog) -> (ProductTimetable, GenerateFile) {
    let timetable = ProductTimetable::discover(Arc::new(config), catalog).await.unwrap();
    let mut files = timetable
        .video_output_files(catalog, &PlaceholderResolver)
        .await
        .unwrap();
    assert_eq!(files.len(), 1);
    let file = files.remove(0);
    (timetable, file)
}

async fn storage_with_outputs() -> InMemoryStorage {
    let storage = InMemoryStorage::new();
    storage.touch(MP4_URI, utc(2020, 1, 1, 0)).await;
    storage.touch(WMV_URI, utc(2020, 2, 1, 0)).await;
    storage
}

#[tokio::test]
async fn test_missing_output_is_outdated() {
    let catalog = catalog().await;
    let (timetable, file) = video(regional_config(), &catalog).await;

    let storage = InMemoryStorage::new();
    storage.touch(WMV_URI, utc(2020, 1, 1, 0)).await;

    let staleness = timetable
        .check_outdated(&file, &storage, &PlaceholderResolver, None)
        .await
        .unwrap();
    assert_eq!(
        staleness,
        Staleness::Stale(StaleReason::MissingOutput {
            uri: MP4_URI.to_string()
        })
    );
    assert!(staleness.is_outdated());
}

#[tokio::test]
async fn test_outputs_newer_than_inputs_are_fresh() {
    let catalog = catalog().await;
    let (timetable, file) = video(regional_config(), &catalog).await;
    let storage = storage_with_outputs().await;

    let staleness = timetable
        .check_outdated(&file, &storage, &PlaceholderResolver, None)
        .await
        .unwrap();
    assert_eq!(staleness, Staleness::Fresh);

    let regional = timetable
        .check_outdated(&file, &storage, &PlaceholderResolver, Some("qld"))
        .await
        .unwrap();
    assert_eq!(regional, Staleness::Fresh);
}

#[tokio::test]
async fn test_product_without_regions_has_nothing_to_generate() {
    let yaml = format!("{}regions: []\n", HOURLY_PRODUCT_YAML);
    let config = ProductConfig::from_yaml_str(&yaml).unwrap();
    assert!(config.regions.is_empty());

    let catalog = catalog().await;
    let (timetable, file) = video(config, &catalog).await;
    assert!(file.render_files.values().all(|target| target.file_uri.contains("${ctx.region.id}")));
    let storage = storage_with_outputs().await;

    let staleness = timetable
        .check_outdated(&file, &storage, &PlaceholderResolver, None)
        .await
        .unwrap();
    assert_eq!(staleness, Staleness::NothingToGenerate);
    assert!(!staleness.is_outdated());
}

#[tokio::test]
async fn test_newer_input_is_compared_with_oldest_output() {
    let catalog = catalog().await;
    catalog
        .insert_source(
            file_with_times(GBR4_DEFINITION, "FAKE_3", vec![ts(2010, 9, 1, 8, 0)])
                .with_last_modified(utc(2020, 1, 15, 0)),
        )
        .await;
    let (timetable, file) = video(regional_config(), &catalog).await;
    let storage = storage_with_outputs().await;

    let staleness = timetable
        .check_outdated(&file, &storage, &PlaceholderResolver, None)
        .await
        .unwrap();
    assert_eq!(
        staleness,
        Staleness::Stale(StaleReason::InputNewer {
            input_id: "downloads/gbr4_v2/FAKE_3".to_string(),
            input_last_modified: utc(2020, 1, 15, 0),
            output_last_modified: utc(2020, 1, 1, 0),
        })
    );
}

#[tokio::test]
async fn test_input_without_timestamp_is_outdated() {
    let catalog = catalog().await;
    let mut undated = file_with_times(GBR4_DEFINITION, "FAKE_7", vec![ts(2010, 9, 1, 12, 0)]);
    undated.last_modified = None;
    catalog.insert_source(undated).await;
    let (timetable, file) = video(regional_config(), &catalog).await;
    let storage = storage_with_outputs().await;

    let staleness = timetable
        .check_outdated(&file, &storage, &PlaceholderResolver, None)
        .await
        .unwrap();
    assert_eq!(
        staleness,
        Staleness::Stale(StaleReason::MissingInputTimestamp {
            input_id: "downloads/gbr4_v2/FAKE_7".to_string()
        })
    );
}

#[tokio::test]
async fn test_newer_config_part_is_outdated() {
    let catalog = catalog().await;
    let mut config = regional_config();
    config.parts.push(ConfigPart {
        id: "ereefs-regions".to_string(),
        last_modified: Some(utc(2021, 1, 1, 0)),
    });
    let (timetable, file) = video(config, &catalog).await;
    let storage = storage_with_outputs().await;

    let staleness = timetable
        .check_outdated(&file, &storage, &PlaceholderResolver, None)
        .await
        .unwrap();
    assert_eq!(
        staleness,
        Staleness::Stale(StaleReason::ConfigNewer {
            config_last_modified: utc(2021, 1, 1, 0),
            output_last_modified: utc(2020, 1, 1, 0),
        })
    );
}

#[tokio::test]
async fn test_unknown_region_is_an_error() {
    let catalog = catalog().await;
    let (timetable, file) = video(regional_config(), &catalog).await;
    let storage = storage_with_outputs().await;

    let err = timetable
        .check_outdated(&file, &storage, &PlaceholderResolver, Some("nsw"))
        .await
        .unwrap_err();
    assert!(matches!(err, NcAnimateError::UnknownRegion { region, .. } if region == "nsw"));
}

#[tokio::test]
async fn test_file_without_render_target_has_nothing_to_generate() {
    let catalog = catalog().await;
    let (timetable, unit) = video(regional_config(), &catalog).await;
    let file = GenerateFile::new(
        OutputKind::Video,
        &unit.definition_id,
        &unit.directory_uri,
        &unit.file_id,
        &BTreeMap::new(),
        unit.date_range,
    )
    .unwrap();
    let frames = timetable.frames_for(OutputKind::Video, &file.date_range).unwrap();

    let staleness = check_outdated(
        &InMemoryStorage::new(),
        &PlaceholderResolver,
        timetable.config(),
        &file,
        frames,
        None,
    )
    .await
    .unwrap();
    assert_eq!(staleness, Staleness::NothingToGenerate);
    assert!(!staleness.is_outdated());
}

#[tokio::test]
async fn test_file_outside_timetable_has_no_inputs() {
    let catalog = catalog().await;
    let (timetable, unit) = video(regional_config(), &catalog).await;
    let mut file = unit.clone();
    file.date_range = DateTimeRange::bounded(ts(2011, 1, 1, 0, 0), ts(2011, 2, 1, 0, 0));
    let storage = storage_with_outputs().await;

    let staleness = timetable
        .check_outdated(&file, &storage, &PlaceholderResolver, None)
        .await
        .unwrap();
    assert_eq!(staleness, Staleness::Stale(StaleReason::NoInputs));
}

#[test]
fn test_staleness_serialization() {
    let stale = Staleness::Stale(StaleReason::MissingOutput {
        uri: "/tmp/a.mp4".to_string(),
    });
    let json = serde_json::to_value(&stale).unwrap();
    assert_eq!(json["status"], "stale");
    assert_eq!(json["detail"]["reason"], "missingOutput");
    assert_eq!(json["detail"]["uri"], "/tmp/a.mp4");

    assert_eq!(serde_json::to_value(Staleness::Fresh).unwrap()["status"], "fresh");
}
