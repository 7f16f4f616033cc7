//! Error taxonomy shared by every pipeline stage.
//!
//! Stages return [`Result<T>`] with a [`PipelineError`]; the CLI layer wraps
//! these in `anyhow` context before presenting them. Unmatched join keys are
//! not errors: see [`crate::merge::MergeOutcome`].

use std::{io, path::PathBuf};

use thiserror::Error;

use crate::data::ColumnType;

pub type Result<T, E = PipelineError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Unable to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Malformed delimited input: {message}")]
    Parse { message: String },
    #[error("Row on line {line} has {found} field(s) but the header declares {expected}")]
    RowWidth {
        line: u64,
        expected: usize,
        found: usize,
    },
    #[error("Column '{column}' row {row}: cannot convert '{value}' to {target}")]
    TypeCoercion {
        column: String,
        row: usize,
        value: String,
        target: ColumnType,
    },
    #[error("Column '{column}' not found")]
    ColumnNotFound { column: String },
    #[error("Row {row} does not fit the table layout: {message}")]
    Shape { row: usize, message: String },
    #[error("Invalid schema mapping: {message}")]
    Schema { message: String },
    #[error("Unable to render report artifact {path:?}: {message}")]
    Report { path: PathBuf, message: String },
}

impl PipelineError {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        PipelineError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn parse(message: impl Into<String>) -> Self {
        PipelineError::Parse {
            message: message.into(),
        }
    }

    pub fn column_not_found(column: impl Into<String>) -> Self {
        PipelineError::ColumnNotFound {
            column: column.into(),
        }
    }

    pub fn schema(message: impl Into<String>) -> Self {
        PipelineError::Schema {
            message: message.into(),
        }
    }

    pub fn report(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        PipelineError::Report {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl From<csv::Error> for PipelineError {
    fn from(err: csv::Error) -> Self {
        match err.kind() {
            csv::ErrorKind::UnequalLengths {
                pos,
                expected_len,
                len,
            } => PipelineError::RowWidth {
                line: pos.as_ref().map(|p| p.line()).unwrap_or_default(),
                expected: *expected_len as usize,
                found: *len as usize,
            },
            _ => PipelineError::parse(err.to_string()),
        }
    }
}

impl From<serde_yaml::Error> for PipelineError {
    fn from(err: serde_yaml::Error) -> Self {
        PipelineError::schema(err.to_string())
    }
}
