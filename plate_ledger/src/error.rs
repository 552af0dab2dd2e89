//! Error types for plate_ledger

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlateError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("OpenCV error: {0}")]
    OpenCv(#[from] opencv::Error),

    #[error("Ledger CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("OCR error: {0}")]
    Ocr(String),

    #[error("Workbook export error: {0}")]
    Workbook(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Resource not found: {}", .0.display())]
    ResourceNotFound(PathBuf),

    #[error("Could not open video source: {}", .0.display())]
    SourceNotOpened(PathBuf),

    #[error("Failed to load cascade classifier: {}", .0.display())]
    CascadeEmpty(PathBuf),
}

impl From<tempfile::PersistError> for PlateError {
    fn from(err: tempfile::PersistError) -> Self {
        PlateError::Io(err.error)
    }
}

pub type Result<T> = std::result::Result<T, PlateError>;
