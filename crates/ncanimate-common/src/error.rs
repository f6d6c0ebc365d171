//! Error types for the NcAnimate timetable crates.

use thiserror::Error;

/// Result type alias using NcAnimateError.
pub type NcAnimateResult<T> = Result<T, NcAnimateError>;

/// Primary error type for timetable operations.
#[derive(Debug, Error)]
pub enum NcAnimateError {
    // === Configuration Errors ===
    #[error("Invalid ncAnimate config: {0}")]
    InvalidConfig(String),

    #[error("Unsupported time increment unit: {0}")]
    UnsupportedTimeIncrement(String),

    #[error("Invalid ncAnimate config. Missing file extension for render file '{0}'")]
    MissingFileExtension(String),

    #[error("Region not found in product '{product}': {region}")]
    UnknownRegion { product: String, region: String },

    #[error("Invalid date: {0}")]
    InvalidDate(String),

    // === Collaborator Errors ===
    #[error("Catalog error: {0}")]
    Catalog(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    // === Invariant Errors ===
    #[error("Internal error: {0}")]
    Internal(String),
}

impl NcAnimateError {
    /// True for errors caused by a rejected product configuration.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            NcAnimateError::InvalidConfig(_)
                | NcAnimateError::UnsupportedTimeIncrement(_)
                | NcAnimateError::MissingFileExtension(_)
                | NcAnimateError::UnknownRegion { .. }
                | NcAnimateError::InvalidDate(_)
        )
    }
}

impl From<serde_json::Error> for NcAnimateError {
    fn from(err: serde_json::Error) -> Self {
        NcAnimateError::Serialization(format!("JSON error: {}", err))
    }
}

impl From<serde_yaml::Error> for NcAnimateError {
    fn from(err: serde_yaml::Error) -> Self {
        NcAnimateError::Serialization(format!("YAML error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_errors_are_flagged() {
        assert!(NcAnimateError::MissingFileExtension("mp4Video".into()).is_config_error());
        assert!(NcAnimateError::UnsupportedTimeIncrement("WEEK".into()).is_config_error());
        assert!(!NcAnimateError::Storage("timeout".into()).is_config_error());
    }

    #[test]
    fn test_missing_extension_message() {
        let err = NcAnimateError::MissingFileExtension("mp4Video".into());
        assert_eq!(
            err.to_string(),
            "Invalid ncAnimate config. Missing file extension for render file 'mp4Video'"
        );
    }
}
