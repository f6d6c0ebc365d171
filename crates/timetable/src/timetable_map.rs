//! Slot grid of one output window, filled with candidate frames.

use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset, Utc};
use serde::ser::{Serialize, SerializeMap, SerializeStruct, Serializer};

use ncanimate_common::{DateTimeRange, NcAnimateError, NcAnimateResult, ProductConfig, TimeIncrement};

use crate::coverage::SourceCoverage;
use crate::frame::MetadataFrame;
use crate::frame_timetable::FrameTimetable;

/// Frame timetables of one window, one per slot of the frame increment.
///
/// Slots are contiguous and ascending. An eternity frame increment, or an
/// `AllTime` window, gives a single `AllTime` slot.
#[derive(Debug, Clone)]
pub struct FrameTimetableMap {
    covered: DateTimeRange,
    slots: Vec<(DateTimeRange, FrameTimetable)>,
}

impl FrameTimetableMap {
    /// Empty slots covering `covered` at `frame_increment`.
    ///
    /// The last slot is the last one ending at or before the window end;
    /// a window shorter than one increment still gets one slot.
    pub fn with_slots(
        covered: DateTimeRange,
        frame_increment: &TimeIncrement,
        timezone: &FixedOffset,
    ) -> NcAnimateResult<Self> {
        if covered.is_all_time() || frame_increment.is_eternity() {
            return Ok(Self {
                covered,
                slots: vec![(DateTimeRange::AllTime, FrameTimetable::new())],
            });
        }

        let (start, end) = match (covered.start(), covered.end()) {
            (Some(start), Some(end)) => (start.with_timezone(timezone), end.with_timezone(timezone)),
            _ => {
                return Err(NcAnimateError::Internal(format!(
                    "Cannot build frame slots over half-open range {}",
                    covered
                )))
            }
        };

        let mut slots = Vec::new();
        let mut current = DateTimeRange::from_start(start, frame_increment);
        loop {
            slots.push((current, FrameTimetable::new()));
            current = current.next(frame_increment);
            match current.end() {
                Some(slot_end) if slot_end <= end => {}
                _ => break,
            }
        }

        Ok(Self { covered, slots })
    }

    /// Slots over `covered`, filled from the product's layer inputs.
    pub fn build(config: &ProductConfig, covered: DateTimeRange, coverage: &SourceCoverage) -> NcAnimateResult<Self> {
        let timezone = config.timezone()?;
        let mut map = Self::with_slots(covered, &config.frame_time_increment, &timezone)?;

        for layer in config.layers() {
            let (Some(input), Some(variable)) = (&layer.input, layer.significant_variable()) else {
                continue;
            };

            for file in coverage.files(&input.id) {
                let Some(domain) = file.temporal_domain(variable) else {
                    continue;
                };
                for time in &domain.time_values {
                    let time = time.with_timezone(&timezone);
                    let input_range = match &input.time_increment {
                        Some(increment) => DateTimeRange::from_start(time, increment),
                        None => DateTimeRange::AllTime,
                    };
                    map.fit_last(&layer.id, &input_range, MetadataFrame::new(time, file.clone(), variable));
                }
            }
        }

        Ok(map)
    }

    /// Add a frame to every slot whose end falls in `(input start, input end]`.
    ///
    /// A slot shows the latest data available when its period closes.
    /// An `AllTime` input or window matches unconditionally. The single
    /// `AllTime` slot of a bounded window takes the inputs that overlap the
    /// window interior.
    pub fn fit_last(&mut self, layer_id: &str, input_range: &DateTimeRange, frame: MetadataFrame) {
        if input_range.is_all_time() || self.covered.is_all_time() {
            for (_, table) in &mut self.slots {
                table.add(layer_id, frame.clone());
            }
            return;
        }

        let (Some(input_start), Some(input_end)) = (input_range.start(), input_range.end()) else {
            return;
        };

        // Slot ends ascend with slot starts.
        let first = self
            .slots
            .partition_point(|(slot, _)| slot.end().map_or(false, |end| end <= input_start));

        for (slot, table) in &mut self.slots[first..] {
            match slot.end() {
                Some(end) if end <= input_end => {
                    table.add(layer_id, frame.clone());
                }
                Some(_) => break,
                None => {
                    let after_start = self.covered.start().map_or(true, |start| input_end > start);
                    let before_end = self.covered.end().map_or(true, |end| input_start < end);
                    if after_start && before_end {
                        table.add(layer_id, frame.clone());
                    }
                }
            }
        }
    }

    pub fn covered_range(&self) -> DateTimeRange {
        self.covered
    }

    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Number of slots with at least one layer entry.
    pub fn filled_slot_count(&self) -> usize {
        self.slots.iter().filter(|(_, table)| !table.is_empty()).count()
    }

    pub fn slots(&self) -> impl Iterator<Item = (&DateTimeRange, &FrameTimetable)> {
        self.slots.iter().map(|(range, table)| (range, table))
    }

    pub fn get(&self, slot: &DateTimeRange) -> Option<&FrameTimetable> {
        self.slots
            .binary_search_by(|(range, _)| range.cmp(slot))
            .ok()
            .map(|index| &self.slots[index].1)
    }

    /// True when no slot has any layer entry, even if there are slots.
    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(|(_, table)| table.is_empty())
    }

    pub fn contains_layer(&self, layer_id: &str) -> bool {
        self.slots.iter().any(|(_, table)| table.contains_layer(layer_id))
    }

    /// Last modification of the best candidate file of every layer and slot,
    /// by file id.
    pub fn input_last_modified(&self) -> BTreeMap<String, Option<DateTime<Utc>>> {
        self.slots
            .iter()
            .flat_map(|(_, table)| table.iter())
            .filter_map(|(_, set)| set.first())
            .map(|frame| (frame.metadata().id.clone(), frame.metadata().last_modified))
            .collect()
    }
}

struct Slots<'a>(&'a [(DateTimeRange, FrameTimetable)]);

impl Serialize for Slots<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (range, table) in self.0 {
            map.serialize_entry(&range.to_string(), table)?;
        }
        map.end()
    }
}

impl Serialize for FrameTimetableMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("FrameTimetableMap", 2)?;
        state.serialize_field("dateRange", &self.covered)?;
        state.serialize_field("frames", &Slots(&self.slots))?;
        state.end()
    }
}
