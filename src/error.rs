//! Error types for configuration, state parsing, binding, and export.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Configuration error raised while loading or validating a scenario.
///
/// Any of these makes the scenario unusable; they are reported before
/// synthesis starts.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read \"{}\": {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("unknown preset \"{name}\", available: {available}")]
    UnknownPreset { name: String, available: String },

    /// Dotted field path (e.g. `"users[0].daily_runs"`) plus the violated constraint.
    #[error("config error: {field}: {message}")]
    Invalid { field: String, message: String },

    #[error("activity \"{activity}\": {source}")]
    State {
        activity: String,
        #[source]
        source: StateParseError,
    },

    #[error("{field}: {source}")]
    TimeRange {
        field: String,
        #[source]
        source: TimeRangeError,
    },
}

impl ConfigError {
    /// Shorthand for [`ConfigError::Invalid`].
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Invalid {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Dotted field path this error refers to, if any.
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::Invalid { field, .. } | Self::TimeRange { field, .. } => Some(field),
            _ => None,
        }
    }
}

/// A state row that does not decode into a typed [`crate::sim::state_machine::State`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateParseError {
    #[error("state {index}: expected {expected} fields, found {found}")]
    FieldCount {
        index: usize,
        expected: usize,
        found: usize,
    },

    #[error("state {index}: invalid {field} \"{value}\"")]
    InvalidField {
        index: usize,
        field: &'static str,
        value: String,
    },
}

/// A time range that is not of the form `HH:MM-HH:MM`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed time range \"{0}\" (expected HH:MM-HH:MM)")]
pub struct TimeRangeError(pub String);

/// Failure to attach an appliance to an activity.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BindError {
    #[error("activity \"{activity}\" does not use appliance type \"{appliance}\"")]
    NotRequired { activity: String, appliance: String },

    #[error("appliance type \"{appliance}\" is already bound for activity \"{activity}\"")]
    AlreadyBound { activity: String, appliance: String },
}

/// Failure while writing trace output.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("\"{}\" is a file, not a directory", .0.display())]
    NotADirectory(PathBuf),
}
