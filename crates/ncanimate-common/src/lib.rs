//! Common types shared by the NcAnimate timetable crates.
//!
//! Holds the interval algebra, time increments, source metadata records,
//! product configuration model and render target descriptors.

pub mod config;
pub mod error;
pub mod metadata;
pub mod range;
pub mod render;
pub mod time;

pub use config::{
    ConfigPart, InputConfig, LayerConfig, PanelConfig, ProductConfig, RegionConfig, RenderConfig,
};
pub use error::{NcAnimateError, NcAnimateResult};
pub use metadata::{
    unique_dataset_id, FileMetadata, FileStatus, OutputRecord, TemporalDomain, VariableMetadata,
};
pub use range::DateTimeRange;
pub use render::{MapFormat, MapRenderFile, RenderFile, VideoFormat, VideoRenderFile};
pub use time::{fixed_offset, parse_iso8601, start_of_year, TimeIncrement, TimeIncrementUnit, Timestamp};
