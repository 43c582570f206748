use std::path::PathBuf;

use thiserror::Error;

/// Convenient alias for fallible results returned throughout the crate.
pub type Result<T> = std::result::Result<T, LedgerError>;

/// Error type covering the different failure cases that can occur when the
/// tool loads, maps, or queries a data source.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Wrapper for IO failures such as reading files or their metadata.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Raised when JSON serialization of a result payload fails.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Errors bubbled up from the CSV reader implementation.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Errors bubbled up from the spreadsheet reader implementation.
    #[error("spreadsheet error: {0}")]
    Spreadsheet(#[from] calamine::Error),

    /// Raised when a workbook is structurally unusable (no sheets at all).
    #[error("invalid workbook structure: {0}")]
    InvalidWorkbook(String),

    /// Raised when a query runs before any data source has been selected.
    #[error("no data source set; select a source file first")]
    NoDataSource,

    /// Raised when the selected source path no longer resolves to a file.
    #[error("data source not found: {0}")]
    SourceFileMissing(PathBuf),

    /// Raised when the source extension is outside the supported set.
    #[error("unsupported file type '{0}'; use .xlsx/.xls/.csv")]
    UnsupportedFileType(String),

    /// Raised when a date range token is not `YYYY-MM` or `YYYY-MM..YYYY-MM`.
    #[error("invalid date range '{0}'; expected YYYY-MM or YYYY-MM..YYYY-MM")]
    InvalidDateRange(String),

    /// Raised when a schema override names a role outside the known set.
    #[error("unknown schema role: {0}")]
    UnknownRole(String),

    /// Raised when a schema override names a column absent from the table.
    #[error("column '{column}' not found in the current table")]
    ColumnNotFound { column: String },

    /// Raised when the tracing subscriber fails to initialise.
    #[error("failed to initialise logging: {0}")]
    Logging(String),
}
