//! Crate-wide error type.
//!
//! Per-row problems inside bulk writes and imports are not errors in this
//! sense: they are collected as data (see [`crate::ops::bulk::RowError`]) so
//! a batch never aborts on one bad row.

use thiserror::Error;

/// Unified error type for store, import/export, and configuration failures.
#[derive(Error, Debug)]
pub enum GarduError {
    /// Input rejected before reaching the store or the calculator.
    #[error("validation error: {0}")]
    Validation(String),

    /// A referenced substation or measurement does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// SQLite failures.
    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    /// I/O errors (file access, sockets).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Spreadsheet could not be opened or read.
    #[error("import error: {0}")]
    Import(String),

    /// Spreadsheet or CSV could not be written.
    #[error("export error: {0}")]
    Export(String),

    /// Configuration file could not be loaded.
    #[error("configuration error: {0}")]
    Config(String),

    /// Unexpected internal state, such as a poisoned database lock.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Convenience alias for results using [`GarduError`].
pub type Result<T> = std::result::Result<T, GarduError>;

impl From<rust_xlsxwriter::XlsxError> for GarduError {
    fn from(err: rust_xlsxwriter::XlsxError) -> Self {
        Self::Export(err.to_string())
    }
}

impl From<csv::Error> for GarduError {
    fn from(err: csv::Error) -> Self {
        Self::Export(err.to_string())
    }
}

impl From<calamine::XlsxError> for GarduError {
    fn from(err: calamine::XlsxError) -> Self {
        Self::Import(err.to_string())
    }
}
