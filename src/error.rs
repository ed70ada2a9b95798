//! Error types for mapping and flattening records.

use thiserror::Error;

/// Main error type for dictcruncher operations.
#[derive(Error, Debug)]
pub enum CrunchError {
    /// Location string does not follow the `root::seg::seg[]` grammar
    #[error("Malformed location '{location}': {reason}")]
    MalformedPath { location: String, reason: String },

    /// Location is well formed but asks for something the engine cannot do
    #[error("Unsupported location '{location}': {reason}")]
    UnsupportedPath { location: String, reason: String },

    /// Required value is absent and no coalesce value is configured
    #[error("Required value for column '{column}' is missing at '{location}'")]
    MissingValue { column: String, location: String },

    /// Two list-expanding columns of the same record disagree on width
    #[error(
        "Table {table}: column '{column}' expands to {found} rows but '{first_column}' expands to {expected}"
    )]
    Alignment {
        table: String,
        first_column: String,
        expected: usize,
        column: String,
        found: usize,
    },

    /// A caller-supplied convert function failed
    #[error("Convert function failed for column '{column}' at '{location}': {source}")]
    Transform {
        column: String,
        location: String,
        #[source]
        source: anyhow::Error,
    },

    /// Requested table is not part of the configuration
    #[error("Table '{table}' is not defined in mapper. Known tables: {known:?}")]
    UnknownTable { table: String, known: Vec<String> },

    /// Declarative configuration problem (unknown transform name, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON configuration could not be parsed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Record iteration was stopped through its stop flag
    #[error("Record processing cancelled")]
    Cancelled,
}

impl CrunchError {
    pub fn malformed(location: impl Into<String>, reason: impl Into<String>) -> Self {
        CrunchError::MalformedPath {
            location: location.into(),
            reason: reason.into(),
        }
    }

    pub fn unsupported(location: impl Into<String>, reason: impl Into<String>) -> Self {
        CrunchError::UnsupportedPath {
            location: location.into(),
            reason: reason.into(),
        }
    }

    pub fn missing(column: impl Into<String>, location: impl Into<String>) -> Self {
        CrunchError::MissingValue {
            column: column.into(),
            location: location.into(),
        }
    }

    /// Whether this error came from location parsing or resolution
    pub fn is_path_error(&self) -> bool {
        matches!(
            self,
            CrunchError::MalformedPath { .. } | CrunchError::UnsupportedPath { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, CrunchError>;
