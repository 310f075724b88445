use thiserror::Error;

/// Hard failures. Per-field and per-row problems never land here: missing
/// columns, unparseable periods and zero denominators all degrade to zero or
/// placeholder values instead.
#[derive(Error, Debug)]
pub enum DreError {
    #[error("Source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Spreadsheet error: {0}")]
    Spreadsheet(#[from] calamine::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, DreError>;
