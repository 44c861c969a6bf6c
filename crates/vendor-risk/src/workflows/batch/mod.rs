mod parser;

use std::io::Read;
use std::path::Path;

use crate::workflows::assessment::IntakeSubmission;

#[derive(Debug)]
pub enum BatchImportError {
    Io(std::io::Error),
    Csv(csv::Error),
}

impl std::fmt::Display for BatchImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BatchImportError::Io(err) => write!(f, "failed to read vendor batch: {}", err),
            BatchImportError::Csv(err) => write!(f, "invalid vendor CSV data: {}", err),
        }
    }
}

impl std::error::Error for BatchImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BatchImportError::Io(err) => Some(err),
            BatchImportError::Csv(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for BatchImportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<csv::Error> for BatchImportError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

/// Reads vendor submissions from a CSV export with camelCase headers.
pub struct VendorBatchImporter;

impl VendorBatchImporter {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Vec<IntakeSubmission>, BatchImportError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Vec<IntakeSubmission>, BatchImportError> {
        Ok(parser::parse_rows(reader)?)
    }
}
