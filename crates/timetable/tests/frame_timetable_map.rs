//! Slot filling against synthetic GBR4 coverage.

use ncanimate_common::{DateTimeRange, FileMetadata, FileStatus, TemporalDomain, TimeIncrement};
use test_utils::{
    assert_slot_files, catalog_with, fake_hourly_files, file_with_times, hourly_product_config, real_partial_file, ts,
    utc, GBR4_DEFINITION, TEMP_VARIABLE,
};
use timetable::{FrameTimetableMap, SourceCoverage};

fn hour_slot(day: u32, hour: u32) -> DateTimeRange {
    DateTimeRange::bounded(ts(2010, 9, day, hour, 0), ts(2010, 9, day, hour + 1, 0))
}

fn coverage(files: impl IntoIterator<Item = FileMetadata>) -> SourceCoverage {
    let mut coverage = SourceCoverage::new();
    for file in files {
        coverage.insert(file);
    }
    coverage
}

fn gbr4_files() -> Vec<FileMetadata> {
    let mut files = vec![real_partial_file()];
    files.extend(fake_hourly_files(
        GBR4_DEFINITION,
        "FAKE",
        ts(2010, 9, 1, 5, 0),
        30,
        utc(2019, 1, 1, 0),
    ));
    files
}

#[test]
fn test_five_days_of_hourly_slots() {
    let config = hourly_product_config();
    let window = DateTimeRange::bounded(ts(2010, 9, 1, 0, 0), ts(2010, 9, 6, 0, 0));
    let map = FrameTimetableMap::build(&config, window, &coverage(gbr4_files())).unwrap();

    assert_eq!(map.slot_count(), 120);
    assert_eq!(map.covered_range(), window);
    // Two real hours, then 30 fake ones.
    assert_eq!(map.filled_slot_count(), 32);
}

#[test]
fn test_slots_take_the_last_available_data() {
    let config = hourly_product_config();
    let window = DateTimeRange::bounded(ts(2010, 9, 1, 0, 0), ts(2010, 9, 6, 0, 0));
    let map = FrameTimetableMap::build(&config, window, &coverage(gbr4_files())).unwrap();

    let real_id = "downloads/gbr4_v2/gbr4_v2_2010-09-01_00h00-02h00_nc";
    assert_slot_files!(map, hour_slot(1, 0), "gbr4_temp", [real_id]);
    assert_slot_files!(map, hour_slot(1, 1), "gbr4_temp", [real_id]);
    assert_slot_files!(map, hour_slot(1, 2), "gbr4_temp", []);
    assert_slot_files!(map, hour_slot(1, 3), "gbr4_temp", []);
    assert_slot_files!(map, hour_slot(1, 4), "gbr4_temp", []);
    assert_slot_files!(map, hour_slot(1, 5), "gbr4_temp", ["downloads/gbr4_v2/FAKE_0"]);
    assert_slot_files!(map, hour_slot(2, 10), "gbr4_temp", ["downloads/gbr4_v2/FAKE_29"]);
    assert_slot_files!(map, hour_slot(2, 11), "gbr4_temp", []);

    // Decoration layers have no input and never get frames.
    let table = map.get(&hour_slot(1, 5)).unwrap();
    assert!(!table.contains_layer("world"));

    let frame = table.get("gbr4_temp").unwrap().first().unwrap();
    assert_eq!(frame.frame_date_time(), ts(2010, 9, 1, 5, 0));
    assert_eq!(frame.variable_id(), TEMP_VARIABLE);
}

#[test]
fn test_file_with_wider_domain_is_best_match() {
    let config = hourly_product_config();
    let mut files = gbr4_files();
    files.push(
        FileMetadata::new(GBR4_DEFINITION, "NEWER").with_variable(
            TEMP_VARIABLE,
            TemporalDomain::from_time_values(vec![
                ts(2010, 9, 1, 5, 0),
                ts(2010, 9, 1, 6, 0),
                ts(2010, 9, 1, 7, 0),
            ]),
        ),
    );

    let window = DateTimeRange::bounded(ts(2010, 9, 1, 5, 0), ts(2010, 9, 1, 8, 0));
    let map = FrameTimetableMap::build(&config, window, &coverage(files)).unwrap();

    assert_eq!(map.slot_count(), 3);
    assert_slot_files!(
        map,
        hour_slot(1, 5),
        "gbr4_temp",
        ["downloads/gbr4_v2/NEWER", "downloads/gbr4_v2/FAKE_0"]
    );
    assert_slot_files!(
        map,
        hour_slot(1, 7),
        "gbr4_temp",
        ["downloads/gbr4_v2/NEWER", "downloads/gbr4_v2/FAKE_2"]
    );
}

#[test]
fn test_input_without_time_increment_fills_every_slot() {
    let mut config = hourly_product_config();
    for panel in &mut config.panels {
        for layer in &mut panel.layers {
            if let Some(input) = &mut layer.input {
                input.time_increment = None;
            }
        }
    }

    let files = vec![file_with_times(GBR4_DEFINITION, "static.nc", vec![ts(2000, 1, 1, 0, 0)])];
    let window = DateTimeRange::bounded(ts(2010, 9, 1, 0, 0), ts(2010, 9, 2, 0, 0));
    let map = FrameTimetableMap::build(&config, window, &coverage(files)).unwrap();

    assert_eq!(map.slot_count(), 24);
    assert_eq!(map.filled_slot_count(), 24);
}

#[test]
fn test_eternity_slot_keeps_only_inputs_within_the_window() {
    let mut config = hourly_product_config();
    config.frame_time_increment = TimeIncrement::eternity();

    let files = vec![
        file_with_times(GBR4_DEFINITION, "before", vec![ts(2010, 8, 31, 10, 0)]),
        // Ends exactly at the window start.
        file_with_times(GBR4_DEFINITION, "touching", vec![ts(2010, 8, 31, 23, 0)]),
        file_with_times(GBR4_DEFINITION, "spanning", vec![ts(2010, 8, 31, 23, 0), ts(2010, 9, 1, 0, 0)]),
        file_with_times(GBR4_DEFINITION, "inside", vec![ts(2010, 9, 2, 10, 0)]),
        file_with_times(GBR4_DEFINITION, "at_end", vec![ts(2010, 9, 6, 0, 0)]),
        file_with_times(GBR4_DEFINITION, "after", vec![ts(2010, 9, 7, 0, 0)]),
    ];
    let window = DateTimeRange::bounded(ts(2010, 9, 1, 0, 0), ts(2010, 9, 6, 0, 0));
    let map = FrameTimetableMap::build(&config, window, &coverage(files)).unwrap();

    assert_eq!(map.slot_count(), 1);
    assert_slot_files!(
        map,
        DateTimeRange::AllTime,
        "gbr4_temp",
        ["downloads/gbr4_v2/inside", "downloads/gbr4_v2/spanning"]
    );
}

#[test]
fn test_input_last_modified_uses_best_frames() {
    let config = hourly_product_config();
    let window = DateTimeRange::bounded(ts(2010, 9, 1, 5, 0), ts(2010, 9, 1, 7, 0));
    let map = FrameTimetableMap::build(&config, window, &coverage(gbr4_files())).unwrap();

    let inputs = map.input_last_modified();
    assert_eq!(inputs.len(), 2);
    assert_eq!(inputs["downloads/gbr4_v2/FAKE_1"], Some(utc(2019, 1, 1, 0)));
}

#[tokio::test]
async fn test_discovery_skips_invalid_files() {
    let config = hourly_product_config();
    let mut files = gbr4_files();
    files.push(
        file_with_times(GBR4_DEFINITION, "BROKEN", vec![ts(2010, 9, 1, 3, 0)]).with_status(FileStatus::Corrupted),
    );
    let catalog = catalog_with(files).await;

    let coverage = SourceCoverage::discover(&config, catalog.as_ref()).await.unwrap();
    assert_eq!(coverage.file_count(), 31);

    let window = DateTimeRange::bounded(ts(2010, 9, 1, 0, 0), ts(2010, 9, 1, 5, 0));
    let map = FrameTimetableMap::build(&config, window, &coverage).unwrap();
    assert_slot_files!(map, hour_slot(1, 3), "gbr4_temp", []);
}

#[test]
fn test_timetable_serializes_slots_by_range() {
    let config = hourly_product_config();
    let window = DateTimeRange::bounded(ts(2010, 9, 1, 5, 0), ts(2010, 9, 1, 6, 0));
    let map = FrameTimetableMap::build(&config, window, &coverage(gbr4_files())).unwrap();

    let json = serde_json::to_value(&map).unwrap();
    let frames = json["frames"].as_object().unwrap();
    assert_eq!(frames.len(), 1);
    assert!(frames.keys().next().unwrap().starts_with("2010-09-01T05:00:00+10:00"));
}
