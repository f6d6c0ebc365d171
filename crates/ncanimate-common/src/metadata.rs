//! Source file and output file metadata records, as stored in the catalog.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::range::DateTimeRange;
use crate::time::Timestamp;

/// Catalog id of a dataset: `{definitionId}/{datasetId}` with dots replaced.
pub fn unique_dataset_id(definition_id: &str, dataset_id: &str) -> String {
    format!("{}/{}", definition_id, dataset_id).replace('.', "_")
}

/// Time axis of one variable in one file.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemporalDomain {
    #[serde(default)]
    pub min_date: Option<Timestamp>,
    #[serde(default)]
    pub max_date: Option<Timestamp>,
    /// Discrete timestamps, ascending.
    #[serde(default)]
    pub time_values: Vec<Timestamp>,
}

impl TemporalDomain {
    /// Domain whose bounds are the extremes of `time_values`.
    pub fn from_time_values(mut time_values: Vec<Timestamp>) -> Self {
        time_values.sort();
        Self {
            min_date: time_values.first().copied(),
            max_date: time_values.last().copied(),
            time_values,
        }
    }

    /// Domain with explicit bounds, which may extend past the time values.
    pub fn with_bounds(min_date: Timestamp, max_date: Timestamp, time_values: Vec<Timestamp>) -> Self {
        Self {
            min_date: Some(min_date),
            max_date: Some(max_date),
            time_values,
        }
    }

    pub fn date_range(&self) -> DateTimeRange {
        DateTimeRange::create(self.min_date, self.max_date)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariableMetadata {
    #[serde(default)]
    pub temporal_domain: Option<TemporalDomain>,
}

/// Processing status of a cataloged file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FileStatus {
    #[default]
    Valid,
    Corrupted,
    Deleted,
}

/// Metadata of one input data file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileMetadata {
    pub id: String,
    pub definition_id: String,
    pub dataset_id: String,
    #[serde(default)]
    pub last_modified: Option<DateTime<Utc>>,
    #[serde(default)]
    pub status: FileStatus,
    /// Variable id to variable metadata.
    #[serde(default)]
    pub variables: BTreeMap<String, VariableMetadata>,
}

impl FileMetadata {
    pub fn new(definition_id: impl Into<String>, dataset_id: impl Into<String>) -> Self {
        let definition_id = definition_id.into();
        let dataset_id = dataset_id.into();
        Self {
            id: unique_dataset_id(&definition_id, &dataset_id),
            definition_id,
            dataset_id,
            last_modified: None,
            status: FileStatus::Valid,
            variables: BTreeMap::new(),
        }
    }

    pub fn with_last_modified(mut self, last_modified: DateTime<Utc>) -> Self {
        self.last_modified = Some(last_modified);
        self
    }

    pub fn with_status(mut self, status: FileStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_variable(mut self, variable_id: impl Into<String>, domain: TemporalDomain) -> Self {
        self.variables.insert(
            variable_id.into(),
            VariableMetadata {
                temporal_domain: Some(domain),
            },
        );
        self
    }

    pub fn is_valid(&self) -> bool {
        self.status == FileStatus::Valid
    }

    pub fn variable(&self, variable_id: &str) -> Option<&VariableMetadata> {
        self.variables.get(variable_id)
    }

    pub fn temporal_domain(&self, variable_id: &str) -> Option<&TemporalDomain> {
        self.variable(variable_id)
            .and_then(|v| v.temporal_domain.as_ref())
    }
}

/// Catalog record of a generated product file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputRecord {
    pub definition_id: String,
    pub id: String,
    #[serde(default)]
    pub start_date: Option<Timestamp>,
    #[serde(default)]
    pub end_date: Option<Timestamp>,
    #[serde(default)]
    pub last_modified: Option<DateTime<Utc>>,
}

impl OutputRecord {
    pub fn new(definition_id: impl Into<String>, id: impl Into<String>, range: &DateTimeRange) -> Self {
        Self {
            definition_id: definition_id.into(),
            id: id.into(),
            start_date: range.start(),
            end_date: range.end(),
            last_modified: None,
        }
    }

    /// True when the recorded dates differ from `range`.
    pub fn dates_differ(&self, range: &DateTimeRange) -> bool {
        self.start_date != range.start() || self.end_date != range.end()
    }
}
