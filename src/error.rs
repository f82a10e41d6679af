// src/error.rs

use thiserror::Error;

/// Errors raised by the table stages and the extractor.
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Missing column '{column}' in {table}")]
    MissingColumn { table: String, column: String },

    #[error("Duplicate column '{0}'")]
    DuplicateColumn(String),

    #[error("Invalid value '{value}' in column '{column}'")]
    InvalidValue { column: String, value: String },

    #[error("Column count mismatch: {left} vs {right}")]
    ShapeMismatch { left: usize, right: usize },

    #[error("Invalid repository location: {0}")]
    InvalidLocation(String),

    #[error("Invalid timestamp {seconds} (offset {offset_minutes} min)")]
    InvalidTime { seconds: i64, offset_minutes: i32 },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Git error: {0}")]
    Git(#[from] git2::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type LedgerResult<T> = Result<T, LedgerError>;
