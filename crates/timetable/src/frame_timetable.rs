//! Candidate frames of every layer for one time slot.

use serde::ser::{Serialize, Serializer};

use crate::frame::{MetadataFrame, MetadataSet};

/// Layer id to candidate frames, in layer insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameTimetable {
    layers: Vec<(String, MetadataSet)>,
}

impl FrameTimetable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a candidate frame for a layer, creating the layer entry if needed.
    pub fn add(&mut self, layer_id: &str, frame: MetadataFrame) -> bool {
        match self.layers.iter_mut().find(|(id, _)| id == layer_id) {
            Some((_, set)) => set.add(frame),
            None => {
                let mut set = MetadataSet::new();
                set.add(frame);
                self.layers.push((layer_id.to_string(), set));
                true
            }
        }
    }

    pub fn get(&self, layer_id: &str) -> Option<&MetadataSet> {
        self.layers
            .iter()
            .find(|(id, _)| id == layer_id)
            .map(|(_, set)| set)
    }

    pub fn contains_layer(&self, layer_id: &str) -> bool {
        self.get(layer_id).is_some()
    }

    pub fn layer_ids(&self) -> impl Iterator<Item = &str> {
        self.layers.iter().map(|(id, _)| id.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &MetadataSet)> {
        self.layers.iter().map(|(id, set)| (id.as_str(), set))
    }

    /// Number of layers with at least one candidate.
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}

impl Serialize for FrameTimetable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.iter())
    }
}
