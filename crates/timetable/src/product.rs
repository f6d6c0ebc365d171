//! Product timetable: the map and video files a product should have.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use metrics::counter;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use ncanimate_common::{
    start_of_year, DateTimeRange, NcAnimateError, NcAnimateResult, ProductConfig, RenderFile, TimeIncrement,
    TimeIncrementUnit, Timestamp,
};
use storage::{MetadataCatalog, StorageBackend};

use crate::coverage::SourceCoverage;
use crate::generate_file::{GenerateFile, OutputKind};
use crate::outdated::{check_outdated, StaleReason, Staleness};
use crate::template::{GeneratorContext, TemplateResolver};
use crate::timetable_map::FrameTimetableMap;

/// Accepted windows of a product and their frame timetables.
///
/// Windows without data, or without data for a focus layer, are left out.
#[derive(Debug, Clone)]
pub struct ProductTimetable {
    config: Arc<ProductConfig>,
    map_time_increment: Option<TimeIncrement>,
    video_time_increment: Option<TimeIncrement>,
    map_frames: BTreeMap<DateTimeRange, Vec<FrameTimetableMap>>,
    video_frames: BTreeMap<DateTimeRange, Vec<FrameTimetableMap>>,
}

/// Serializable overview of a timetable.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimetableSummary {
    pub product_id: String,
    pub map_time_increment: Option<TimeIncrement>,
    pub video_time_increment: Option<TimeIncrement>,
    pub map_windows: Vec<WindowSummary>,
    pub video_windows: Vec<WindowSummary>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowSummary {
    pub date_range: DateTimeRange,
    pub slots: usize,
    pub filled_slots: usize,
    pub layers: BTreeSet<String>,
}

/// `start + increment`, capped at `end`.
fn next_date_time(start: &Timestamp, end: &Timestamp, increment: &TimeIncrement) -> Timestamp {
    match increment.add_to(start) {
        Some(next) if next < *end => next,
        _ => *end,
    }
}

/// Step back from `first` by `increment` while staying in the year of `first`.
fn align_start(first: Timestamp, increment: &TimeIncrement) -> Timestamp {
    if increment.is_eternity() {
        return first;
    }
    let Some(ideal) = start_of_year(&first) else {
        return first;
    };

    let mut start = first;
    let mut previous = first;
    while previous >= ideal {
        start = previous;
        match increment.subtract_from(&start) {
            Some(p) => previous = p,
            None => break,
        }
    }
    start
}

/// Windows of `increment` from `start` to `end`, skipping those that end
/// before `first_date`. Video windows are clipped to the data span.
fn windows(
    kind: OutputKind,
    increment: &TimeIncrement,
    start: Timestamp,
    end: Timestamp,
    first_date: Timestamp,
) -> Vec<DateTimeRange> {
    if increment.is_eternity() {
        return vec![DateTimeRange::AllTime];
    }

    let mut windows = Vec::new();
    let mut window_start = start;
    let mut window_end = next_date_time(&start, &end, increment);

    loop {
        if first_date < window_end {
            let window = match kind {
                OutputKind::Map => DateTimeRange::bounded(window_start, window_end),
                OutputKind::Video => DateTimeRange::bounded(window_start.max(first_date), window_end.min(end)),
            };
            windows.push(window);
        }

        window_start = window_end;
        window_end = match increment.add_to(&window_start) {
            Some(next) => next.min(end),
            None => break,
        };
        if window_start >= end {
            break;
        }
    }

    windows
}

fn file_id(prefix: &str, increment: &TimeIncrement, range: &DateTimeRange) -> NcAnimateResult<String> {
    if increment.is_eternity() {
        return Ok(format!("{}_all", prefix));
    }
    let start = range
        .start()
        .ok_or_else(|| NcAnimateError::Internal(format!("Window {} has no start date", range)))?;

    let id = match increment.unit {
        // Minute products share the hourly naming of existing catalog records.
        TimeIncrementUnit::Minute => format!("{}_hourly_{}", prefix, start.format("%Y-%m-%d_%Hh%M")),
        TimeIncrementUnit::Hour => format!("{}_hourly_{}", prefix, start.format("%Y-%m-%d_%Hh00")),
        TimeIncrementUnit::Day => format!("{}_daily_{}", prefix, start.format("%Y-%m-%d")),
        TimeIncrementUnit::Month => format!("{}_monthly_{}", prefix, start.format("%Y-%m")),
        TimeIncrementUnit::Year => format!("{}_yearly_{}", prefix, start.format("%Y")),
        TimeIncrementUnit::Eternity => format!("{}_all", prefix),
    };
    Ok(id)
}

impl ProductTimetable {
    /// Discover the product's input coverage, then build its timetable.
    pub async fn discover(config: Arc<ProductConfig>, catalog: &dyn MetadataCatalog) -> NcAnimateResult<Self> {
        let coverage = SourceCoverage::discover(&config, catalog).await?;
        Self::build(config, &coverage)
    }

    /// Build the timetable from a coverage snapshot.
    #[instrument(skip_all, fields(product = %config.id))]
    pub fn build(config: Arc<ProductConfig>, coverage: &SourceCoverage) -> NcAnimateResult<Self> {
        let timezone = config.timezone()?;
        let mut timetable = Self {
            map_time_increment: config.map_time_increment(),
            video_time_increment: config.video_time_increment(),
            map_frames: BTreeMap::new(),
            video_frames: BTreeMap::new(),
            config: config.clone(),
        };

        if timetable.map_time_increment.is_none() && timetable.video_time_increment.is_none() {
            debug!("Product has no map nor video render file");
            return Ok(timetable);
        }

        let start_date = config.start_date()?;
        let max_end_date = config.end_date()?;

        let focus_layers: BTreeSet<String> = config.focus_layers.iter().cloned().collect();
        let mut focus_definitions = BTreeSet::new();
        for layer_id in &focus_layers {
            match config.layer(layer_id).and_then(|layer| layer.input.as_ref()) {
                Some(input) => {
                    focus_definitions.insert(input.id.clone());
                }
                None => warn!(layer = %layer_id, "Invalid focus layer ID"),
            }
        }

        let Some(input_range) = coverage.date_range(&config, &focus_definitions) else {
            debug!("No input data, nothing to schedule");
            return Ok(timetable);
        };
        let (Some(first_date), Some(input_end)) = (input_range.start(), input_range.end()) else {
            return Ok(timetable);
        };
        let first_date = first_date.with_timezone(&timezone);
        let input_end = input_end.with_timezone(&timezone);

        let frame_increment = config.frame_time_increment;
        let start = start_date.unwrap_or_else(|| align_start(first_date, &frame_increment));
        let mut end = if frame_increment.is_eternity() {
            input_end
        } else {
            frame_increment.add_to(&input_end).unwrap_or(input_end)
        };
        if let Some(max_end) = max_end_date {
            end = end.min(max_end);
        }

        if start >= end {
            debug!(start = %start, end = %end, "Input data outside of the product date range");
            return Ok(timetable);
        }
        debug!(start = %start, end = %end, "Product date range");

        let plans = [
            (OutputKind::Map, timetable.map_time_increment),
            (OutputKind::Video, timetable.video_time_increment),
        ];
        for (kind, increment) in plans {
            let Some(increment) = increment else {
                continue;
            };
            for window in windows(kind, &increment, start, end, first_date) {
                let map = FrameTimetableMap::build(&config, window, coverage)?;
                timetable.add_frame_timetable(kind, window, map, &focus_layers);
            }
        }

        info!(
            maps = timetable.map_frames.len(),
            videos = timetable.video_frames.len(),
            "Built product timetable"
        );
        Ok(timetable)
    }

    fn add_frame_timetable(
        &mut self,
        kind: OutputKind,
        window: DateTimeRange,
        map: FrameTimetableMap,
        focus_layers: &BTreeSet<String>,
    ) {
        if !Self::accept(&map, focus_layers) {
            debug!(kind = %kind, window = %window, "Skipping window without usable data");
            counter!("ncanimate_windows_rejected_total", "kind" => kind.file_id_suffix()).increment(1);
            return;
        }

        counter!("ncanimate_windows_accepted_total", "kind" => kind.file_id_suffix()).increment(1);
        let frames = match kind {
            OutputKind::Map => &mut self.map_frames,
            OutputKind::Video => &mut self.video_frames,
        };
        frames.entry(window).or_default().push(map);
    }

    /// A window needs data, and data for a focus layer when there are any.
    fn accept(map: &FrameTimetableMap, focus_layers: &BTreeSet<String>) -> bool {
        if map.is_empty() {
            return false;
        }
        focus_layers.is_empty() || focus_layers.iter().any(|layer_id| map.contains_layer(layer_id))
    }

    pub fn config(&self) -> &ProductConfig {
        &self.config
    }

    pub fn product_id(&self) -> &str {
        &self.config.id
    }

    pub fn map_time_increment(&self) -> Option<TimeIncrement> {
        self.map_time_increment
    }

    pub fn video_time_increment(&self) -> Option<TimeIncrement> {
        self.video_time_increment
    }

    pub fn map_frames(&self) -> &BTreeMap<DateTimeRange, Vec<FrameTimetableMap>> {
        &self.map_frames
    }

    pub fn video_frames(&self) -> &BTreeMap<DateTimeRange, Vec<FrameTimetableMap>> {
        &self.video_frames
    }

    pub fn frames(&self, kind: OutputKind) -> &BTreeMap<DateTimeRange, Vec<FrameTimetableMap>> {
        match kind {
            OutputKind::Map => &self.map_frames,
            OutputKind::Video => &self.video_frames,
        }
    }

    /// Frame timetables of the window `date_range`.
    pub fn frames_for(&self, kind: OutputKind, date_range: &DateTimeRange) -> Option<&[FrameTimetableMap]> {
        self.frames(kind).get(date_range).map(Vec::as_slice)
    }

    pub async fn map_output_files(
        &self,
        catalog: &dyn MetadataCatalog,
        resolver: &dyn TemplateResolver,
    ) -> NcAnimateResult<Vec<GenerateFile>> {
        self.output_files(OutputKind::Map, catalog, resolver).await
    }

    pub async fn video_output_files(
        &self,
        catalog: &dyn MetadataCatalog,
        resolver: &dyn TemplateResolver,
    ) -> NcAnimateResult<Vec<GenerateFile>> {
        self.output_files(OutputKind::Video, catalog, resolver).await
    }

    /// One generation unit per accepted window.
    ///
    /// A catalog record of the same file with other dates is deleted so the
    /// file gets regenerated.
    #[instrument(skip(self, catalog, resolver), fields(product = %self.config.id))]
    pub async fn output_files(
        &self,
        kind: OutputKind,
        catalog: &dyn MetadataCatalog,
        resolver: &dyn TemplateResolver,
    ) -> NcAnimateResult<Vec<GenerateFile>> {
        let increment = match kind {
            OutputKind::Map => self.map_time_increment,
            OutputKind::Video => self.video_time_increment,
        };
        let Some(increment) = increment else {
            return Ok(Vec::new());
        };

        let render_files: BTreeMap<String, RenderFile> = match kind {
            OutputKind::Map => self
                .config
                .render
                .maps
                .iter()
                .map(|(name, map)| (name.clone(), RenderFile::Map(map.clone())))
                .collect(),
            OutputKind::Video => self
                .config
                .render
                .videos
                .iter()
                .map(|(name, video)| (name.clone(), RenderFile::Video(video.clone())))
                .collect(),
        };

        let prefix = format!("{}_{}", self.config.id, kind.file_id_suffix());
        let definition_id = self.config.definition_id();
        let mut files = Vec::new();

        for date_range in self.frames(kind).keys() {
            let context = GeneratorContext::new(&self.config)
                .with_date_range(*date_range)
                .with_frame_increment(increment);
            let directory_uri = resolver.resolve_lenient(&self.config.render.directory_uri, &context);
            let file_id = file_id(&prefix, &increment, date_range)?;

            let file = GenerateFile::new(kind, definition_id, &directory_uri, &file_id, &render_files, *date_range)?;

            if let Some(record) = catalog.get_output_record(definition_id, &file_id).await? {
                if record.dates_differ(date_range) {
                    info!(file = %file_id, "Product dates have changed, deleting catalog record");
                    catalog.delete_output_record(definition_id, &file_id).await?;
                    counter!("ncanimate_stale_records_deleted_total").increment(1);
                }
            }

            files.push(file);
        }

        Ok(files)
    }

    /// Staleness of a unit built by this timetable.
    ///
    /// A unit whose window is not in this timetable is `Stale(NoInputs)`.
    pub async fn check_outdated(
        &self,
        file: &GenerateFile,
        storage: &dyn StorageBackend,
        resolver: &dyn TemplateResolver,
        region_id: Option<&str>,
    ) -> NcAnimateResult<Staleness> {
        match self.frames_for(file.kind, &file.date_range) {
            Some(frames) => check_outdated(storage, resolver, &self.config, file, frames, region_id).await,
            None => {
                warn!(file = %file.file_id, "No frame timetable for the file date range");
                Ok(Staleness::Stale(StaleReason::NoInputs))
            }
        }
    }

    pub fn summary(&self) -> TimetableSummary {
        let summarize = |frames: &BTreeMap<DateTimeRange, Vec<FrameTimetableMap>>| {
            frames
                .iter()
                .map(|(date_range, maps)| WindowSummary {
                    date_range: *date_range,
                    slots: maps.iter().map(FrameTimetableMap::slot_count).sum(),
                    filled_slots: maps.iter().map(FrameTimetableMap::filled_slot_count).sum(),
                    layers: maps
                        .iter()
                        .flat_map(|map| map.slots())
                        .flat_map(|(_, table)| table.layer_ids())
                        .map(str::to_string)
                        .collect(),
                })
                .collect::<Vec<_>>()
        };

        TimetableSummary {
            product_id: self.config.id.clone(),
            map_time_increment: self.map_time_increment,
            video_time_increment: self.video_time_increment,
            map_windows: summarize(&self.map_frames),
            video_windows: summarize(&self.video_frames),
        }
    }
}
