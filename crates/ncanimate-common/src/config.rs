//! Product configuration model.
//!
//! A product is a set of panels, each showing layers backed by an input
//! data source, rendered to maps and/or videos at configured increments.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{NcAnimateError, NcAnimateResult};
use crate::render::{MapRenderFile, RenderFile, VideoRenderFile};
use crate::time::{fixed_offset, parse_iso8601, TimeIncrement, Timestamp};

/// Full configuration of one product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductConfig {
    pub id: String,
    #[serde(default)]
    pub last_modified: Option<DateTime<Utc>>,
    /// Shared configuration fragments the product is assembled from.
    #[serde(default)]
    pub parts: Vec<ConfigPart>,
    pub frame_time_increment: TimeIncrement,
    #[serde(default)]
    pub focus_layers: Vec<String>,
    #[serde(default)]
    pub panels: Vec<PanelConfig>,
    #[serde(default)]
    pub render: RenderConfig,
    #[serde(default)]
    pub regions: Vec<RegionConfig>,
    #[serde(default)]
    pub target_heights: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigPart {
    pub id: String,
    #[serde(default)]
    pub last_modified: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PanelConfig {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub layers: Vec<LayerConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerConfig {
    pub id: String,
    /// Data source, absent for decoration layers (legends, coastlines...).
    #[serde(default)]
    pub input: Option<InputConfig>,
    /// Variables drawn by the layer, most significant first.
    #[serde(default)]
    pub variables: Vec<String>,
}

impl LayerConfig {
    /// The variable whose time axis drives frame matching.
    pub fn significant_variable(&self) -> Option<&str> {
        self.variables.first().map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputConfig {
    /// Catalog definition id of the source.
    pub id: String,
    /// Reporting period of one time value. Unset means the data is valid
    /// for all time.
    #[serde(default)]
    pub time_increment: Option<TimeIncrement>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderConfig {
    #[serde(default)]
    pub utc_offset_minutes: i32,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default)]
    pub directory_uri: String,
    #[serde(default)]
    pub definition_id: Option<String>,
    #[serde(default)]
    pub video_time_increment: Option<TimeIncrement>,
    #[serde(default)]
    pub maps: BTreeMap<String, MapRenderFile>,
    #[serde(default)]
    pub videos: BTreeMap<String, VideoRenderFile>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionConfig {
    pub id: String,
    #[serde(default)]
    pub label: Option<String>,
}

impl ProductConfig {
    /// Load a product configuration from a YAML or JSON file.
    pub fn load(path: &Path) -> NcAnimateResult<Self> {
        let content = std::fs::read_to_string(path)?;

        let is_json = path.extension().map_or(false, |ext| ext == "json");
        let config = if is_json {
            Self::from_json_str(&content)?
        } else {
            Self::from_yaml_str(&content)?
        };

        debug!(product = %config.id, path = %path.display(), "Loaded product config");
        Ok(config)
    }

    pub fn from_yaml_str(content: &str) -> NcAnimateResult<Self> {
        let config: ProductConfig = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_str(content: &str) -> NcAnimateResult<Self> {
        let config: ProductConfig = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the scheduler cannot honour.
    pub fn validate(&self) -> NcAnimateResult<()> {
        if self.id.trim().is_empty() {
            return Err(NcAnimateError::InvalidConfig("Product id is empty".into()));
        }

        self.frame_time_increment.validate()?;
        if let Some(inc) = &self.render.video_time_increment {
            inc.validate()?;
        }
        for layer in self.layers() {
            if let Some(inc) = layer.input.as_ref().and_then(|i| i.time_increment.as_ref()) {
                inc.validate()?;
            }
        }

        for (name, file) in self.render_files() {
            if file.file_extension().is_none() {
                return Err(NcAnimateError::MissingFileExtension(name.to_string()));
            }
        }

        self.timezone()?;
        self.start_date()?;
        self.end_date()?;
        Ok(())
    }

    pub fn timezone(&self) -> NcAnimateResult<FixedOffset> {
        fixed_offset(self.render.utc_offset_minutes)
    }

    /// Explicit first date of the product, if configured.
    pub fn start_date(&self) -> NcAnimateResult<Option<Timestamp>> {
        self.parse_render_date(self.render.start_date.as_deref())
    }

    /// Explicit latest end date of the product, if configured.
    pub fn end_date(&self) -> NcAnimateResult<Option<Timestamp>> {
        self.parse_render_date(self.render.end_date.as_deref())
    }

    fn parse_render_date(&self, value: Option<&str>) -> NcAnimateResult<Option<Timestamp>> {
        let tz = self.timezone()?;
        value.map(|s| parse_iso8601(s, &tz)).transpose()
    }

    pub fn has_maps(&self) -> bool {
        !self.render.maps.is_empty()
    }

    pub fn has_videos(&self) -> bool {
        !self.render.videos.is_empty()
    }

    /// Increment of map windows, when the product renders maps.
    pub fn map_time_increment(&self) -> Option<TimeIncrement> {
        self.has_maps().then_some(self.frame_time_increment)
    }

    /// Increment of video windows, defaulting to the frame increment.
    pub fn video_time_increment(&self) -> Option<TimeIncrement> {
        self.has_videos()
            .then(|| self.render.video_time_increment.unwrap_or(self.frame_time_increment))
    }

    /// Catalog definition id of the product's output files.
    pub fn definition_id(&self) -> &str {
        self.render.definition_id.as_deref().unwrap_or(&self.id)
    }

    /// Every layer of every panel, in panel order.
    pub fn layers(&self) -> impl Iterator<Item = &LayerConfig> {
        self.panels.iter().flat_map(|panel| panel.layers.iter())
    }

    pub fn layer(&self, layer_id: &str) -> Option<&LayerConfig> {
        self.layers().find(|layer| layer.id == layer_id)
    }

    /// Definition ids of every layer input.
    pub fn input_definition_ids(&self) -> BTreeSet<String> {
        self.layers()
            .filter_map(|layer| layer.input.as_ref())
            .map(|input| input.id.clone())
            .collect()
    }

    pub fn region(&self, region_id: &str) -> Option<&RegionConfig> {
        self.regions.iter().find(|region| region.id == region_id)
    }

    /// Map render targets followed by video render targets, by name.
    pub fn render_files(&self) -> impl Iterator<Item = (&str, RenderFile)> {
        let maps = self
            .render
            .maps
            .iter()
            .map(|(name, map)| (name.as_str(), RenderFile::Map(map.clone())));
        let videos = self
            .render
            .videos
            .iter()
            .map(|(name, video)| (name.as_str(), RenderFile::Video(video.clone())));
        maps.chain(videos)
    }

    /// Newest modification of the configuration or any of its parts.
    pub fn newest_last_modified(&self) -> Option<DateTime<Utc>> {
        self.parts
            .iter()
            .filter_map(|part| part.last_modified)
            .chain(self.last_modified)
            .max()
    }
}
