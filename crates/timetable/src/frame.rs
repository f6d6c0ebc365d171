//! Candidate frames: one time value of one input file.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::sync::Arc;

use serde::ser::{Serialize, SerializeStruct, Serializer};

use ncanimate_common::{FileMetadata, TemporalDomain, Timestamp};

/// A time value of an input file able to feed a layer.
///
/// Frames order by suitability: the file whose temporal domain ends last
/// comes first, then the file whose domain starts last, then file id.
/// Files without a domain for the variable come last. The frame timestamp
/// is not part of the ordering, so a [`MetadataSet`] keeps one frame per file.
#[derive(Debug, Clone)]
pub struct MetadataFrame {
    frame_date_time: Timestamp,
    metadata: Arc<FileMetadata>,
    variable_id: String,
}

impl MetadataFrame {
    pub fn new(frame_date_time: Timestamp, metadata: Arc<FileMetadata>, variable_id: impl Into<String>) -> Self {
        Self {
            frame_date_time,
            metadata,
            variable_id: variable_id.into(),
        }
    }

    pub fn frame_date_time(&self) -> Timestamp {
        self.frame_date_time
    }

    pub fn metadata(&self) -> &FileMetadata {
        &self.metadata
    }

    pub fn variable_id(&self) -> &str {
        &self.variable_id
    }

    fn domain(&self) -> Option<&TemporalDomain> {
        self.metadata.temporal_domain(&self.variable_id)
    }
}

/// Newest first, missing last.
fn cmp_desc(a: Option<Timestamp>, b: Option<Timestamp>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => b.cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

impl Ord for MetadataFrame {
    fn cmp(&self, other: &Self) -> Ordering {
        let by_domain = match (self.domain(), other.domain()) {
            (Some(a), Some(b)) => cmp_desc(a.max_date, b.max_date).then_with(|| cmp_desc(a.min_date, b.min_date)),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        };
        by_domain.then_with(|| self.metadata.id.cmp(&other.metadata.id))
    }
}

impl PartialOrd for MetadataFrame {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for MetadataFrame {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for MetadataFrame {}

impl Serialize for MetadataFrame {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("MetadataFrame", 2)?;
        state.serialize_field("frameDateTime", &self.frame_date_time)?;
        state.serialize_field("metadataId", &self.metadata.id)?;
        state.end()
    }
}

/// Candidate frames of one layer at one slot, most suitable first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataSet(BTreeSet<MetadataFrame>);

impl MetadataSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a frame. Returns false if a frame of the same file is already present.
    pub fn add(&mut self, frame: MetadataFrame) -> bool {
        self.0.insert(frame)
    }

    /// The most suitable frame.
    pub fn first(&self) -> Option<&MetadataFrame> {
        self.0.iter().next()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MetadataFrame> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for MetadataSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.0.iter())
    }
}
