//! Staleness of generated files relative to their inputs and configuration.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use metrics::counter;
use serde::Serialize;
use tracing::{info, instrument, warn};

use ncanimate_common::{NcAnimateError, NcAnimateResult, ProductConfig, RegionConfig};
use storage::StorageBackend;

use crate::generate_file::GenerateFile;
use crate::template::{GeneratorContext, TemplateResolver};
use crate::timetable_map::FrameTimetableMap;

/// Why a file must be regenerated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "camelCase")]
pub enum StaleReason {
    #[serde(rename_all = "camelCase")]
    MissingOutput { uri: String },
    #[serde(rename_all = "camelCase")]
    MissingInputTimestamp { input_id: String },
    NoInputs,
    #[serde(rename_all = "camelCase")]
    InputNewer {
        input_id: String,
        input_last_modified: DateTime<Utc>,
        output_last_modified: DateTime<Utc>,
    },
    #[serde(rename_all = "camelCase")]
    ConfigNewer {
        config_last_modified: DateTime<Utc>,
        output_last_modified: DateTime<Utc>,
    },
}

impl fmt::Display for StaleReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StaleReason::MissingOutput { uri } => write!(f, "output file {} does not exist", uri),
            StaleReason::MissingInputTimestamp { input_id } => {
                write!(f, "input file {} has no last modified date", input_id)
            }
            StaleReason::NoInputs => f.write_str("no input file last modified date could be found"),
            StaleReason::InputNewer {
                input_id,
                input_last_modified,
                output_last_modified,
            } => write!(
                f,
                "input file {} modified at {} is newer than the oldest output file ({})",
                input_id, input_last_modified, output_last_modified
            ),
            StaleReason::ConfigNewer {
                config_last_modified,
                output_last_modified,
            } => write!(
                f,
                "configuration modified at {} is newer than the oldest output file ({})",
                config_last_modified, output_last_modified
            ),
        }
    }
}

/// Outcome of a staleness check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "camelCase")]
pub enum Staleness {
    Fresh,
    /// The unit has no render target.
    NothingToGenerate,
    Stale(StaleReason),
}

impl Staleness {
    pub fn is_outdated(&self) -> bool {
        matches!(self, Staleness::Stale(_))
    }
}

fn regions<'a>(config: &'a ProductConfig, region_id: Option<&str>) -> NcAnimateResult<Vec<Option<&'a RegionConfig>>> {
    match region_id {
        Some(id) => config
            .region(id)
            .map(|region| vec![Some(region)])
            .ok_or_else(|| NcAnimateError::UnknownRegion {
                product: config.id.clone(),
                region: id.to_string(),
            }),
        None if config.regions.is_empty() => Ok(Vec::new()),
        None => Ok(config.regions.iter().map(Some).collect()),
    }
}

/// Last modification of every concrete output file of `file`, by URI.
///
/// A product without regions has no concrete output file.
pub async fn output_last_modified(
    storage: &dyn StorageBackend,
    resolver: &dyn TemplateResolver,
    config: &ProductConfig,
    file: &GenerateFile,
    region_id: Option<&str>,
) -> NcAnimateResult<BTreeMap<String, Option<DateTime<Utc>>>> {
    let regions = regions(config, region_id)?;
    let heights: Vec<Option<f64>> = if config.target_heights.is_empty() {
        vec![None]
    } else {
        config.target_heights.iter().copied().map(Some).collect()
    };

    let mut outputs = BTreeMap::new();
    for target in file.render_files.values() {
        for region in &regions {
            for height in &heights {
                let context = GeneratorContext::new(config)
                    .with_date_range(file.date_range)
                    .with_region(*region)
                    .with_target_height(*height);
                let uri = resolver.resolve_lenient(&target.file_uri, &context);
                let last_modified = storage.last_modified(&uri).await?;
                outputs.insert(uri, last_modified);
            }
        }
    }

    Ok(outputs)
}

/// Decide whether `file` must be regenerated.
///
/// Stale when an output variant is missing, when the best input of any slot
/// is newer than the oldest output variant, or when the configuration is.
/// Unknown input modification dates count as stale.
#[instrument(skip_all, fields(product = %config.id, file = %file.file_id))]
pub async fn check_outdated(
    storage: &dyn StorageBackend,
    resolver: &dyn TemplateResolver,
    config: &ProductConfig,
    file: &GenerateFile,
    frames: &[FrameTimetableMap],
    region_id: Option<&str>,
) -> NcAnimateResult<Staleness> {
    let outputs = output_last_modified(storage, resolver, config, file, region_id).await?;

    let mut oldest_output: Option<DateTime<Utc>> = None;
    for (uri, last_modified) in &outputs {
        match last_modified {
            Some(t) => oldest_output = Some(oldest_output.map_or(*t, |o| o.min(*t))),
            None => return Ok(stale(StaleReason::MissingOutput { uri: uri.clone() })),
        }
    }
    let Some(oldest_output) = oldest_output else {
        warn!("This product generates no output file");
        return Ok(Staleness::NothingToGenerate);
    };

    let mut inputs = BTreeMap::new();
    for map in frames {
        inputs.extend(map.input_last_modified());
    }

    let mut newest_input: Option<(String, DateTime<Utc>)> = None;
    for (input_id, last_modified) in inputs {
        let Some(t) = last_modified else {
            return Ok(stale(StaleReason::MissingInputTimestamp { input_id }));
        };
        if newest_input.as_ref().map_or(true, |(_, newest)| t > *newest) {
            newest_input = Some((input_id, t));
        }
    }
    let Some((input_id, input_last_modified)) = newest_input else {
        return Ok(stale(StaleReason::NoInputs));
    };

    if input_last_modified > oldest_output {
        return Ok(stale(StaleReason::InputNewer {
            input_id,
            input_last_modified,
            output_last_modified: oldest_output,
        }));
    }

    if let Some(config_last_modified) = config.newest_last_modified() {
        if config_last_modified > oldest_output {
            return Ok(stale(StaleReason::ConfigNewer {
                config_last_modified,
                output_last_modified: oldest_output,
            }));
        }
    }

    Ok(Staleness::Fresh)
}

fn stale(reason: StaleReason) -> Staleness {
    info!(reason = %reason, "Product file is outdated");
    counter!("ncanimate_outdated_total").increment(1);
    Staleness::Stale(reason)
}
