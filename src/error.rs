//! Error taxonomy for the scan pipeline
//!
//! Only schema problems and bad filter input are errors. Per-row parse
//! failures are absorbed by the loader and show up as dropped-row counts.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Missing columns: {}", .missing.join(", "))]
    MissingColumns { missing: Vec<String> },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Excel error: {0}")]
    Xlsx(#[from] calamine::XlsxError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    #[error("Unknown dataset: {0}")]
    UnknownDataset(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl PipelineError {
    /// The input itself is unusable (wrong columns, not a readable CSV or
    /// workbook), as opposed to a failure on our side.
    pub fn is_bad_input(&self) -> bool {
        match self {
            PipelineError::MissingColumns { .. } | PipelineError::Xlsx(_) => true,
            PipelineError::Csv(e) => !e.is_io_error(),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
