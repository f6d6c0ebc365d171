//! Generation units: one scheduled map or video file and its render targets.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use ncanimate_common::{DateTimeRange, NcAnimateError, NcAnimateResult, RenderFile};

/// Placeholders completing a dataset id per region and target height.
const DATASET_ID_SUFFIX: &str = "_${ctx.region.id}_${ctx.targetHeight}";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputKind {
    Map,
    Video,
}

impl OutputKind {
    /// Prefix of file ids, after the product id.
    pub fn file_id_suffix(&self) -> &'static str {
        match self {
            OutputKind::Map => "map",
            OutputKind::Video => "video",
        }
    }
}

impl fmt::Display for OutputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_id_suffix())
    }
}

/// A render target owned by one generation unit.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderTarget {
    /// Output URI, still templated on region and target height.
    pub file_uri: String,
    pub file_extension: String,
    pub render_file: RenderFile,
}

/// One output file to generate.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateFile {
    #[serde(rename = "_id")]
    pub id: String,
    pub kind: OutputKind,
    pub definition_id: String,
    pub dataset_id: String,
    pub file_id: String,
    pub directory_uri: String,
    pub render_files: BTreeMap<String, RenderTarget>,
    pub preview_file_uri: String,
    pub date_range: DateTimeRange,
    pub last_modified: Option<DateTime<Utc>>,
}

fn join_uri(directory_uri: &str, name: &str) -> String {
    if directory_uri.is_empty() || directory_uri.ends_with('/') {
        format!("{}{}", directory_uri, name)
    } else {
        format!("{}/{}", directory_uri, name)
    }
}

impl GenerateFile {
    /// Build a unit with its own copy of every render file.
    ///
    /// Fails if a render file has no extension.
    pub fn new(
        kind: OutputKind,
        definition_id: &str,
        directory_uri: &str,
        file_id: &str,
        render_files: &BTreeMap<String, RenderFile>,
        date_range: DateTimeRange,
    ) -> NcAnimateResult<Self> {
        let dataset_id = format!("{}{}", file_id, DATASET_ID_SUFFIX);
        let base_uri = join_uri(directory_uri, &dataset_id);

        let mut targets = BTreeMap::new();
        for (name, render_file) in render_files {
            let extension = render_file
                .file_extension()
                .ok_or_else(|| NcAnimateError::MissingFileExtension(name.clone()))?
                .to_string();

            targets.insert(
                name.clone(),
                RenderTarget {
                    file_uri: format!("{}.{}", base_uri, extension),
                    file_extension: extension,
                    render_file: render_file.clone(),
                },
            );
        }

        Ok(Self {
            id: format!("{}/{}", definition_id, dataset_id),
            kind,
            definition_id: definition_id.to_string(),
            dataset_id,
            file_id: file_id.to_string(),
            directory_uri: directory_uri.to_string(),
            render_files: targets,
            preview_file_uri: format!("{}_preview", base_uri),
            date_range,
            last_modified: None,
        })
    }

    pub fn preview_file_uri_with(&self, extension: &str) -> String {
        format!("{}.{}", self.preview_file_uri, extension)
    }

    pub fn render_file(&self, name: &str) -> Option<&RenderTarget> {
        self.render_files.get(name)
    }

    /// True when the unit has no render target, i.e. nothing to generate.
    pub fn is_empty(&self) -> bool {
        self.render_files.is_empty()
    }
}
