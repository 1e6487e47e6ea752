//! Spreadsheet and CSV interchange.

pub mod csv_export;
pub mod layout;
pub mod xlsx_export;
pub mod xlsx_import;

use std::path::Path;

use crate::error::{GarduError, Result};

/// File formats the exporter can write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Xlsx,
    Csv,
}

impl ExportFormat {
    /// Picks the format from the file extension.
    ///
    /// # Errors
    ///
    /// Returns [`GarduError::Validation`] for anything but `.xlsx` or `.csv`.
    pub fn from_path(path: &Path) -> Result<Self> {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .as_deref()
        {
            Some("xlsx") => Ok(Self::Xlsx),
            Some("csv") => Ok(Self::Csv),
            _ => Err(GarduError::Validation(format!(
                "cannot export to {}: use a .xlsx or .csv file name",
                path.display()
            ))),
        }
    }
}
