//! Result export writers

pub mod csv;

pub use csv::CsvResultsWriter;

/// Output writing errors
#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    /// File I/O failure
    #[error("IO error: {0}")]
    IoError(String),

    /// CSV encoding failure
    #[error("CSV error: {0}")]
    CsvError(String),
}
