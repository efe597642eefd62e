use std::path::PathBuf;

use thiserror::Error;

pub type PipelineResult<T> = Result<T, PipelineError>;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Processing(#[from] ProcessingError),

    #[error(transparent)]
    Io(#[from] IoError),
}

/// Errors raised while reading the raw record collection.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Failed to read input file '{path}'")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Input file '{path}' is not valid JSON")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Expected a JSON array of records, found {0}")]
    NotACollection(&'static str),

    #[error("Element {index} of the record collection is not a JSON object")]
    NotARecord { index: usize },
}

/// Structural problems with the table: a required column is absent or cannot be typed.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("Missing required column(s): {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("Column '{column}' has unusable type {dtype}")]
    Untyped { column: String, dtype: String },
}

/// Unexpected failures inside a pipeline stage.
#[derive(Debug, Error)]
pub enum ProcessingError {
    #[error("Data frame error in {stage}: {message}")]
    DataFrame {
        stage: &'static str,
        message: String,
    },

    #[error("No rows left after {0}")]
    EmptyDataset(&'static str),

    #[error("Invalid pipeline configuration: {0}")]
    InvalidConfig(String),
}

/// Errors related to writing output artifacts.
#[derive(Debug, Error)]
pub enum IoError {
    #[error("Failed to create directory '{path}'")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write '{path}'")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization failed")]
    Serialize(#[from] serde_json::Error),
}
