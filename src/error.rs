use thiserror::Error;

/// Failures a source adapter reports for a record or a whole import.
///
/// Optional fields that fail to parse are never reported here; they become
/// absent on the converted record.
#[derive(Debug, Error)]
pub enum ImportError {
    /// A required field (the title) is missing or has the wrong shape.
    #[error("schema error: {0}")]
    Schema(String),

    /// A spreadsheet import could not find a required column.
    #[error("missing required column: {0}")]
    MissingColumn(&'static str),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ImportError>;
