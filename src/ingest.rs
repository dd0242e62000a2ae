use crate::error::{Result, StatsError};
use crate::structs::{Record, Table};
use arrow_array::{Array, Float64Array, RecordBatch, StringArray};
use chrono::NaiveDate;
use log::debug;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde::Deserialize;
use std::{fs::File, io::Read, path::Path};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// One CSV row before type coercion. Every field is optional so that a
/// missing value is reported by name instead of as a generic decode error.
#[derive(Debug, Deserialize)]
struct RawRecord {
    date: Option<String>,
    city: Option<String>,
    temperature: Option<String>,
    humidity: Option<String>,
    precipitation: Option<String>,
    weather_condition: Option<String>,
}

/// Loads a weather table, choosing the reader from the file extension
/// (`.parquet` for Parquet, anything else is read as CSV).
///
/// # Errors
/// Returns error if the file cannot be read or any row fails to convert.
pub fn read_table(path: &Path) -> Result<Table> {
    let is_parquet = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("parquet"));
    if is_parquet {
        read_parquet(path)
    } else {
        read_csv(path)
    }
}

/// Reads weather records from a CSV file with a header row.
///
/// Expected columns: `date` (`YYYY-MM-DD`), `city`, `temperature`,
/// `humidity`, `precipitation`, `weather_condition`. Extra columns are
/// ignored.
///
/// # Errors
///
/// Fails on the first row with a missing field, a non-numeric number or an
/// unparseable date. Row numbers are 1-based and exclude the header.
pub fn read_csv(path: &Path) -> Result<Table> {
    debug!("Reading CSV file: {}", path.display());
    read_csv_from(File::open(path)?)
}

/// Same as [`read_csv`] over any reader.
pub fn read_csv_from<R: Read>(reader: R) -> Result<Table> {
    let mut reader = csv::Reader::from_reader(reader);
    let mut records = Vec::new();
    for (i, raw) in reader.deserialize::<RawRecord>().enumerate() {
        records.push(convert_row(i + 1, raw?)?);
    }
    debug!("Read {} CSV rows", records.len());
    Table::new(records)
}

fn convert_row(row: usize, raw: RawRecord) -> Result<Record> {
    let date_str = required(row, "date", raw.date)?;
    let date = NaiveDate::parse_from_str(&date_str, DATE_FORMAT).map_err(|_| {
        StatsError::InvalidDate {
            row,
            value: date_str.clone(),
        }
    })?;

    Ok(Record {
        city: required(row, "city", raw.city)?,
        date,
        temperature: number(row, "temperature", raw.temperature)?,
        humidity: number(row, "humidity", raw.humidity)?,
        precipitation: number(row, "precipitation", raw.precipitation)?,
        weather_condition: required(row, "weather_condition", raw.weather_condition)?,
    })
}

fn required(row: usize, field: &'static str, value: Option<String>) -> Result<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or(StatsError::MissingField { row, field })
}

fn number(row: usize, field: &'static str, value: Option<String>) -> Result<f64> {
    let text = required(row, field, value)?;
    match text.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(StatsError::InvalidNumber {
            row,
            field,
            value: text,
        }),
    }
}

/// Reads weather records from a Parquet file.
///
/// `date`, `city` and `weather_condition` must be Utf8 columns and the three
/// measurements Float64. Null cells are rejected rather than skipped.
///
/// # Errors
///
/// Returns `StatsError` if:
/// - File cannot be opened or read
/// - Parquet file is malformed or missing required columns
/// - A cell is null or a date cannot be parsed
pub fn read_parquet(path: &Path) -> Result<Table> {
    debug!("Reading Parquet file: {}", path.display());
    let file = File::open(path)?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;
    let reader = builder.build()?;

    let mut records = Vec::new();
    for batch_result in reader {
        let batch = batch_result.map_err(StatsError::Arrow)?;
        let date_col = get_column_str(&batch, "date")?;
        let city_col = get_column_str(&batch, "city")?;
        let condition_col = get_column_str(&batch, "weather_condition")?;
        let temp_col = get_column_f64(&batch, "temperature")?;
        let humidity_col = get_column_f64(&batch, "humidity")?;
        let precip_col = get_column_f64(&batch, "precipitation")?;

        for i in 0..batch.num_rows() {
            let row = records.len() + 1;
            let raw = RawRecord {
                date: str_cell(date_col, i),
                city: str_cell(city_col, i),
                temperature: f64_cell(temp_col, i),
                humidity: f64_cell(humidity_col, i),
                precipitation: f64_cell(precip_col, i),
                weather_condition: str_cell(condition_col, i),
            };
            records.push(convert_row(row, raw)?);
        }
    }

    debug!("Read {} Parquet rows", records.len());
    Table::new(records)
}

fn str_cell(col: &StringArray, i: usize) -> Option<String> {
    (!col.is_null(i)).then(|| col.value(i).to_string())
}

fn f64_cell(col: &Float64Array, i: usize) -> Option<String> {
    (!col.is_null(i)).then(|| col.value(i).to_string())
}

/// Extracts a Float64 column from an Arrow RecordBatch by name.
///
/// # Errors
///
/// Returns `StatsError::Data` if:
/// - Column with the specified name doesn't exist
/// - Column exists but is not of Float64 type
fn get_column_f64<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a Float64Array> {
    batch
        .column_by_name(name)
        .ok_or_else(|| StatsError::Data(format!("Column not found: {}", name)))?
        .as_any()
        .downcast_ref::<Float64Array>()
        .ok_or_else(|| StatsError::Data(format!("Column {} is not Float64", name)))
}

/// Extracts a String column from an Arrow RecordBatch by name.
///
/// # Errors
///
/// Returns `StatsError::Data` if:
/// - Column with the specified name doesn't exist
/// - Column exists but is not of String/Utf8 type
fn get_column_str<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray> {
    batch
        .column_by_name(name)
        .ok_or_else(|| StatsError::Data(format!("Column not found: {}", name)))?
        .as_any()
        .downcast_ref::<StringArray>()
        .ok_or_else(|| StatsError::Data(format!("Column {} is not Utf8/String", name)))
}
