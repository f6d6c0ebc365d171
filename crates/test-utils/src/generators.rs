//! Catalog file generators.
//!
//! Every generated file has a single `temp` variable whose time axis is
//! derived from the arguments, so tests can predict which slot each file
//! should land in.

use chrono::{DateTime, Duration, FixedOffset, TimeZone, Utc};

use ncanimate_common::{FileMetadata, TemporalDomain, Timestamp};

/// Variable carried by generated files.
pub const TEMP_VARIABLE: &str = "temp";

/// Definition id of the GBR4 hydro downloads.
pub const GBR4_DEFINITION: &str = "downloads/gbr4_v2";

/// Definition id of the GBR1 hydro downloads.
pub const GBR1_DEFINITION: &str = "downloads/gbr1_2-0";

/// Australia/Brisbane, which has no daylight saving.
pub fn brisbane() -> FixedOffset {
    FixedOffset::east_opt(10 * 3600).unwrap()
}

/// A Brisbane timestamp.
pub fn ts(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> Timestamp {
    brisbane()
        .with_ymd_and_hms(year, month, day, hour, minute, 0)
        .unwrap()
}

pub fn utc(year: i32, month: u32, day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, hour, 0, 0).unwrap()
}

/// A file whose single variable holds `time_values`.
pub fn file_with_times(definition_id: &str, dataset_id: &str, time_values: Vec<Timestamp>) -> FileMetadata {
    FileMetadata::new(definition_id, dataset_id)
        .with_last_modified(utc(2019, 1, 1, 0))
        .with_variable(TEMP_VARIABLE, TemporalDomain::from_time_values(time_values))
}

/// The first two hours of a real GBR4 download: 00:00 and 01:00 on the
/// 1st of September 2010.
pub fn real_partial_file() -> FileMetadata {
    file_with_times(
        GBR4_DEFINITION,
        "gbr4_v2_2010-09-01_00h00-02h00.nc",
        vec![ts(2010, 9, 1, 0, 0), ts(2010, 9, 1, 1, 0)],
    )
}

/// `count` files named `{prefix}_{i}`, each holding one hour starting from
/// `start + i hours`.
pub fn fake_hourly_files(
    definition_id: &str,
    prefix: &str,
    start: Timestamp,
    count: usize,
    last_modified: DateTime<Utc>,
) -> Vec<FileMetadata> {
    (0..count)
        .map(|i| {
            let time = start + Duration::hours(i as i64);
            file_with_times(definition_id, &format!("{}_{}", prefix, i), vec![time]).with_last_modified(last_modified)
        })
        .collect()
}

/// `count` files named `{prefix}_{i}`, each holding one day of hourly
/// values starting from `start + i days`.
pub fn fake_daily_files(definition_id: &str, prefix: &str, start: Timestamp, count: usize) -> Vec<FileMetadata> {
    (0..count)
        .map(|i| {
            let day = start + Duration::days(i as i64);
            let times = (0..24).map(|h| day + Duration::hours(h)).collect();
            file_with_times(definition_id, &format!("{}_{}", prefix, i), times)
        })
        .collect()
}

/// One file per month named `{prefix}_{year}-{month}`, holding a single
/// value at midnight on the 1st.
pub fn fake_monthly_files(definition_id: &str, prefix: &str, year: i32, months: &[u32]) -> Vec<FileMetadata> {
    months
        .iter()
        .map(|&month| {
            file_with_times(
                definition_id,
                &format!("{}_{}-{:02}", prefix, year, month),
                vec![ts(year, month, 1, 0, 0)],
            )
        })
        .collect()
}
