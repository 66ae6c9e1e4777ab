use std::fmt;

use thiserror::Error;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("configuration source '{source_name}' is unavailable: {reason}")]
    SourceUnavailable { source_name: String, reason: String },

    #[error("configuration source '{source_name}' is malformed: {reason}")]
    SourceMalformed { source_name: String, reason: String },

    #[error("malformed configuration key: {0:?}")]
    MalformedKey(String),

    #[error("reload failed: {}", describe_failures(.failures))]
    ReloadFailed { failures: Vec<SourceFailure> },

    #[error("reload was cancelled before the new snapshot was applied")]
    ReloadCancelled,

    #[error("cannot bind field '{field}': value {value:?} is not a valid {expected}")]
    BindConversion {
        field: String,
        value: String,
        expected: &'static str,
    },

    #[error("failed to deserialize bound options: {0}")]
    Deserialize(#[from] serde_json::Error),
}

impl ConfigError {
    pub(crate) fn unavailable(source_name: impl Into<String>, reason: impl fmt::Display) -> Self {
        Self::SourceUnavailable {
            source_name: source_name.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn malformed(source_name: impl Into<String>, reason: impl fmt::Display) -> Self {
        Self::SourceMalformed {
            source_name: source_name.into(),
            reason: reason.to_string(),
        }
    }
}

/// One source that could not be loaded during a reload.
#[derive(Debug)]
pub struct SourceFailure {
    pub source_name: String,
    pub error: ConfigError,
}

fn describe_failures(failures: &[SourceFailure]) -> String {
    failures
        .iter()
        .map(|failure| failure.error.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}
