use arrow_schema::ArrowError;

#[derive(Debug, thiserror::Error)]
pub enum StatsError {
    #[error("Unknown column: {0}")]
    UnknownColumn(String),
    #[error("Column {column} is not {expected}")]
    ColumnType {
        column: String,
        expected: &'static str,
    },
    #[error("Aggregation over an empty table")]
    EmptyTable,
    #[error("No records where {column} = {value}")]
    EmptyGroup { column: String, value: String },
    #[error("No record for {city} in month {month}")]
    NoMatchingRecord { city: String, month: u32 },
    #[error("Invalid record at row {row}: {reason}")]
    InvalidRecord { row: usize, reason: String },
    #[error("Row {row}: missing field {field}")]
    MissingField { row: usize, field: &'static str },
    #[error("Row {row}: field {field} is not numeric: {value:?}")]
    InvalidNumber {
        row: usize,
        field: &'static str,
        value: String,
    },
    #[error("Row {row}: invalid date {value:?}")]
    InvalidDate { row: usize, value: String },
    #[error("I/O Error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parquet Error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),
    #[error("Arrow Error: {0}")]
    Arrow(#[from] ArrowError),
    #[error("Data Error: {0}")]
    Data(String),
    #[error("CSV Error: {0}")]
    Csv(#[from] csv::Error),
    #[error("JSON Error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, StatsError>;
