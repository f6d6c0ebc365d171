//! Window planning and output files of whole products.

use std::sync::Arc;

use ncanimate_common::{DateTimeRange, OutputRecord, ProductConfig, TimeIncrement};
use storage::{InMemoryCatalog, MetadataCatalog, MetadataSession};
use test_utils::{
    catalog_with, fake_hourly_files, fake_monthly_files, focused_monthly_product_config, hourly_product_config,
    monthly_product_config, ts, utc, GBR1_DEFINITION, GBR4_DEFINITION,
};
use timetable::{OutputKind, PlaceholderResolver, ProductTimetable};

const PRODUCT_ID: &str = "gbr4_v2_temp-wind-salt-current";

async fn hourly_catalog() -> Arc<InMemoryCatalog> {
    catalog_with(fake_hourly_files(
        GBR4_DEFINITION,
        "FAKE",
        ts(2010, 9, 1, 5, 0),
        30,
        utc(2019, 1, 1, 0),
    ))
    .await
}

async fn monthly_catalog() -> Arc<InMemoryCatalog> {
    let mut files = fake_monthly_files(GBR4_DEFINITION, "gbr4", 2010, &[1, 2, 3, 4, 8]);
    files.extend(fake_monthly_files(GBR1_DEFINITION, "gbr1", 2010, &[3, 4, 5, 6, 9]));
    catalog_with(files).await
}

fn month(m: u32) -> DateTimeRange {
    let end = if m == 12 { ts(2011, 1, 1, 0, 0) } else { ts(2010, m + 1, 1, 0, 0) };
    DateTimeRange::bounded(ts(2010, m, 1, 0, 0), end)
}

async fn timetable(config: ProductConfig, catalog: &dyn MetadataCatalog) -> ProductTimetable {
    ProductTimetable::discover(Arc::new(config), catalog).await.unwrap()
}

#[tokio::test]
async fn test_yearly_video_is_clipped_to_available_data() {
    let catalog = hourly_catalog().await;
    let timetable = timetable(hourly_product_config(), catalog.as_ref()).await;

    assert_eq!(timetable.video_time_increment(), Some(TimeIncrement::years(1)));
    let windows: Vec<_> = timetable.video_frames().keys().copied().collect();
    assert_eq!(
        windows,
        vec![DateTimeRange::bounded(ts(2010, 9, 1, 5, 0), ts(2010, 9, 2, 11, 0))]
    );

    let frames = timetable.frames_for(OutputKind::Video, &windows[0]).unwrap();
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].slot_count(), 30);
    assert_eq!(frames[0].filled_slot_count(), 30);
}

#[tokio::test]
async fn test_video_output_file() {
    let catalog = hourly_catalog().await;
    let timetable = timetable(hourly_product_config(), catalog.as_ref()).await;

    let files = timetable
        .video_output_files(catalog.as_ref(), &PlaceholderResolver)
        .await
        .unwrap();
    assert_eq!(files.len(), 1);

    let video = &files[0];
    assert_eq!(video.kind, OutputKind::Video);
    assert_eq!(video.file_id, format!("{}_video_yearly_2010", PRODUCT_ID));
    assert_eq!(video.directory_uri, format!("/home/ereefs/derived/ncanimate/products/{}", PRODUCT_ID));
    assert_eq!(
        video.render_file("mp4Video").unwrap().file_uri,
        format!(
            "/home/ereefs/derived/ncanimate/products/{id}/{id}_video_yearly_2010_${{ctx.region.id}}_${{ctx.targetHeight}}.mp4",
            id = PRODUCT_ID
        )
    );
    assert_eq!(video.render_file("wmvVideo").unwrap().file_extension, "wmv");
    assert_eq!(video.render_files.len(), 2);
    assert_eq!(
        video.id,
        format!("{id}/{id}_video_yearly_2010_${{ctx.region.id}}_${{ctx.targetHeight}}", id = PRODUCT_ID)
    );
    assert!(video.preview_file_uri.ends_with("_preview"));
}

#[tokio::test]
async fn test_hourly_map_output_files() {
    let catalog = hourly_catalog().await;
    let timetable = timetable(hourly_product_config(), catalog.as_ref()).await;

    let files = timetable
        .map_output_files(catalog.as_ref(), &PlaceholderResolver)
        .await
        .unwrap();
    assert_eq!(files.len(), 30);
    assert_eq!(files[0].file_id, format!("{}_map_hourly_2010-09-01_05h00", PRODUCT_ID));
    assert_eq!(files[29].file_id, format!("{}_map_hourly_2010-09-02_10h00", PRODUCT_ID));
    assert_eq!(
        files[0].date_range,
        DateTimeRange::bounded(ts(2010, 9, 1, 5, 0), ts(2010, 9, 1, 6, 0))
    );
    assert!(files.iter().all(|file| file.render_files.len() == 2));
}

#[tokio::test]
async fn test_start_and_end_dates_limit_windows() {
    let catalog = hourly_catalog().await;
    let mut config = hourly_product_config();
    config.render.start_date = Some("2010-09-01T12:00:00+10:00".to_string());
    config.render.end_date = Some("2010-09-01T18:00:00+10:00".to_string());
    let timetable = timetable(config, catalog.as_ref()).await;

    assert_eq!(timetable.map_frames().len(), 6);
    assert_eq!(
        timetable.video_frames().keys().next().copied(),
        Some(DateTimeRange::bounded(ts(2010, 9, 1, 12, 0), ts(2010, 9, 1, 18, 0)))
    );
}

#[tokio::test]
async fn test_data_outside_product_dates_gives_no_window() {
    let catalog = hourly_catalog().await;
    let mut config = hourly_product_config();
    config.render.end_date = Some("2010-08-01".to_string());
    let timetable = timetable(config, catalog.as_ref()).await;

    assert!(timetable.map_frames().is_empty());
    assert!(timetable.video_frames().is_empty());
}

#[tokio::test]
async fn test_empty_catalog_gives_no_window() {
    let catalog = InMemoryCatalog::new();
    let timetable = timetable(hourly_product_config(), &catalog).await;

    assert!(timetable.map_frames().is_empty());
    assert!(timetable.video_frames().is_empty());
    assert!(timetable
        .video_output_files(&catalog, &PlaceholderResolver)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_monthly_windows_without_focus() {
    let catalog = monthly_catalog().await;
    let timetable = timetable(monthly_product_config(), catalog.as_ref()).await;

    assert!(timetable.map_frames().is_empty());
    let windows: Vec<_> = timetable.video_frames().keys().copied().collect();
    let expected: Vec<_> = [1, 2, 3, 4, 5, 6, 8, 9].into_iter().map(month).collect();
    assert_eq!(windows, expected);
}

#[tokio::test]
async fn test_focus_layer_drives_windows() {
    let catalog = monthly_catalog().await;
    let timetable = timetable(focused_monthly_product_config("gbr1_temp"), catalog.as_ref()).await;

    let windows: Vec<_> = timetable.video_frames().keys().copied().collect();
    let expected: Vec<_> = [3, 4, 5, 6, 9].into_iter().map(month).collect();
    assert_eq!(windows, expected);

    for window in &windows {
        let frames = timetable.frames_for(OutputKind::Video, window).unwrap();
        assert_eq!(frames[0].slot_count(), 1);
        let set = frames[0].get(window).unwrap().get("gbr1_temp").unwrap();
        assert_eq!(set.len(), 1);
        assert_eq!(set.first().unwrap().frame_date_time(), window.start().unwrap());
    }

    let files = timetable
        .video_output_files(catalog.as_ref(), &PlaceholderResolver)
        .await
        .unwrap();
    assert_eq!(files[0].file_id, "gbr4-gbr1_temp_monthly_video_monthly_2010-03");
}

#[tokio::test]
async fn test_invalid_focus_layer_is_ignored() {
    let catalog = monthly_catalog().await;
    let timetable = timetable(focused_monthly_product_config("unknown_layer"), catalog.as_ref()).await;

    // Every window still needs data for the focus layer, which has none.
    assert!(timetable.video_frames().is_empty());
}

#[tokio::test]
async fn test_stale_output_record_is_deleted() {
    let catalog = hourly_catalog().await;
    let file_id = format!("{}_video_yearly_2010", PRODUCT_ID);
    catalog
        .insert_output(OutputRecord::new(
            PRODUCT_ID,
            file_id.as_str(),
            &DateTimeRange::bounded(ts(2010, 9, 1, 5, 0), ts(2010, 9, 2, 10, 0)),
        ))
        .await;
    catalog
        .insert_output(OutputRecord::new(
            PRODUCT_ID,
            format!("{}_map_hourly_2010-09-01_05h00", PRODUCT_ID),
            &DateTimeRange::bounded(ts(2010, 9, 1, 5, 0), ts(2010, 9, 1, 6, 0)),
        ))
        .await;

    let timetable = timetable(hourly_product_config(), catalog.as_ref()).await;
    timetable
        .video_output_files(catalog.as_ref(), &PlaceholderResolver)
        .await
        .unwrap();
    timetable
        .map_output_files(catalog.as_ref(), &PlaceholderResolver)
        .await
        .unwrap();

    assert!(catalog.get_output_record(PRODUCT_ID, &file_id).await.unwrap().is_none());
    assert_eq!(catalog.output_count().await, 1);
}

#[tokio::test]
async fn test_session_lists_each_definition_once() {
    let catalog = monthly_catalog().await;
    let session = MetadataSession::open(catalog.clone(), 8);

    let first = timetable(monthly_product_config(), &session).await;
    let second = timetable(focused_monthly_product_config("gbr4_temp"), &session).await;

    assert_eq!(catalog.coverage_requests(), 2);
    assert_eq!(first.video_frames().len(), 8);
    assert_eq!(second.video_frames().len(), 5);

    let stats = session.close().await;
    assert_eq!(stats.misses, 2);
    assert_eq!(stats.hits, 2);
}

#[tokio::test]
async fn test_summary_reports_windows() {
    let catalog = hourly_catalog().await;
    let timetable = timetable(hourly_product_config(), catalog.as_ref()).await;

    let summary = timetable.summary();
    assert_eq!(summary.product_id, PRODUCT_ID);
    assert_eq!(summary.map_windows.len(), 30);
    assert_eq!(summary.video_windows[0].slots, 30);
    assert_eq!(summary.video_windows[0].filled_slots, 30);
    assert!(summary.video_windows[0].layers.contains("gbr4_temp"));

    let json = serde_json::to_value(&summary).unwrap();
    assert_eq!(json["videoTimeIncrement"]["unit"], "YEAR");
}
