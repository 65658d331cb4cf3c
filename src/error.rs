use thiserror::Error;

/// Fatal load failures. Per-cell date/duration problems are not errors; the
/// loader coerces them to null and keeps going.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("unsupported file format: .{0} (expected .csv or .xlsx)")]
    UnsupportedFormat(String),

    #[error("missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("spreadsheet has no sheets")]
    NoSheets,

    #[error("failed to read file: {0}")]
    Io(#[from] std::io::Error),

    #[error("csv parse error: {0}")]
    Csv(#[from] csv::Error),

    #[error("spreadsheet error: {0}")]
    Xlsx(#[from] calamine::XlsxError),
}
