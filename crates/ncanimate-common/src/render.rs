//! Render target descriptors (configured map and video output files).

use serde::{Deserialize, Serialize};

/// Still image formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MapFormat {
    Svg,
    Png,
    Jpg,
    Gif,
}

impl MapFormat {
    pub fn default_extension(&self) -> &'static str {
        match self {
            MapFormat::Svg => "svg",
            MapFormat::Png => "png",
            MapFormat::Jpg => "jpg",
            MapFormat::Gif => "gif",
        }
    }
}

/// Video container formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum VideoFormat {
    Mp4,
    Wmv,
    Webm,
    Gif,
}

impl VideoFormat {
    pub fn default_extension(&self) -> &'static str {
        match self {
            VideoFormat::Mp4 => "mp4",
            VideoFormat::Wmv => "wmv",
            VideoFormat::Webm => "webm",
            VideoFormat::Gif => "gif",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapRenderFile {
    #[serde(default)]
    pub format: Option<MapFormat>,
    #[serde(default)]
    pub file_extension: Option<String>,
    #[serde(default)]
    pub max_width: Option<u32>,
    #[serde(default)]
    pub max_height: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoRenderFile {
    #[serde(default)]
    pub format: Option<VideoFormat>,
    #[serde(default)]
    pub file_extension: Option<String>,
    #[serde(default)]
    pub fps: Option<u32>,
    /// Encoder macro block size, width and height.
    #[serde(default)]
    pub block_size: Option<[u32; 2]>,
    #[serde(default)]
    pub max_width: Option<u32>,
    #[serde(default)]
    pub max_height: Option<u32>,
    #[serde(default)]
    pub command_lines: Vec<String>,
}

/// An output file of a generation unit: a still map or a video.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum RenderFile {
    Map(MapRenderFile),
    Video(VideoRenderFile),
}

fn non_empty(ext: &Option<String>) -> Option<&str> {
    ext.as_deref()
        .map(|e| e.trim_start_matches('.'))
        .filter(|e| !e.is_empty())
}

impl RenderFile {
    /// Configured extension, falling back to the format's usual one.
    pub fn file_extension(&self) -> Option<&str> {
        match self {
            RenderFile::Map(map) => non_empty(&map.file_extension)
                .or_else(|| map.format.map(|f| f.default_extension())),
            RenderFile::Video(video) => non_empty(&video.file_extension)
                .or_else(|| video.format.map(|f| f.default_extension())),
        }
    }

    pub fn is_video(&self) -> bool {
        matches!(self, RenderFile::Video(_))
    }
}
