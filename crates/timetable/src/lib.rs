//! Scheduling of NcAnimate product files.
//!
//! Given a product configuration and the temporal coverage of its input
//! sources, works out which map and video files should exist, which input
//! frame feeds each layer at each time slot, and whether a previously
//! generated file is outdated.
//!
//! Discovery ([`SourceCoverage::discover`]) is the only catalog read;
//! timetable construction from a coverage snapshot is synchronous.

pub mod coverage;
pub mod frame;
pub mod frame_timetable;
pub mod generate_file;
pub mod outdated;
pub mod product;
pub mod template;
pub mod timetable_map;

pub use coverage::SourceCoverage;
pub use frame::{MetadataFrame, MetadataSet};
pub use frame_timetable::FrameTimetable;
pub use generate_file::{GenerateFile, OutputKind, RenderTarget};
pub use outdated::{check_outdated, StaleReason, Staleness};
pub use product::{ProductTimetable, TimetableSummary, WindowSummary};
pub use template::{resolve_first, GeneratorContext, PlaceholderResolver, TemplateResolver};
pub use timetable_map::FrameTimetableMap;
