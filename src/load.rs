use crate::error::Result;
use crate::structs::GroupComparison;
use arrow_array::{Float64Array, RecordBatch, StringArray, UInt64Array};
use arrow_schema::{DataType, Field, Schema};
use csv::Writer;
use parquet::arrow::ArrowWriter;
use parquet::file::properties::WriterProperties;
use std::{fs::File, path::Path, sync::Arc};

/// Writes a grouped comparison to a CSV file with formatted numeric values.
///
/// # Arguments
/// * `comparison` - Per-group statistics to write, one row per group
/// * `output_path` - Path where the CSV file will be created
///
/// # Errors
/// Returns error if file cannot be created or written to.
pub fn write_csv(comparison: &GroupComparison, output_path: &Path) -> Result<()> {
    let file = File::create(output_path)?;
    let mut writer = Writer::from_writer(file);

    writer.write_record([
        comparison.group_key.name(),
        "Column",
        "Count",
        "Mean",
        "Max",
        "Min",
        "Std_Dev",
    ])?;

    for group in &comparison.groups {
        writer.write_record(&[
            group.group.clone(),
            comparison.column.name().to_string(),
            group.count.to_string(),
            format!("{:.2}", group.mean),
            format!("{:.2}", group.max),
            format!("{:.2}", group.min),
            format!("{:.2}", group.std_dev),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

/// Writes a grouped comparison to a pretty-formatted JSON file.
///
/// # Errors
/// Returns error if file cannot be created or serialization fails.
pub fn write_json(comparison: &GroupComparison, output_path: &Path) -> Result<()> {
    let file = File::create(output_path)?;
    serde_json::to_writer_pretty(file, comparison)?;
    Ok(())
}

/// Writes a grouped comparison to a columnar Parquet file using Arrow format.
///
/// # Errors
/// Returns error if file cannot be created, schema is invalid, or Arrow operations fail.
pub fn write_parquet(comparison: &GroupComparison, output_path: &Path) -> Result<()> {
    let schema = Arc::new(Schema::new(vec![
        Field::new("group", DataType::Utf8, false),
        Field::new("column", DataType::Utf8, false),
        Field::new("count", DataType::UInt64, false),
        Field::new("mean", DataType::Float64, false),
        Field::new("max", DataType::Float64, false),
        Field::new("min", DataType::Float64, false),
        Field::new("std_dev", DataType::Float64, false),
    ]));

    let groups = &comparison.groups;
    let names = StringArray::from_iter_values(groups.iter().map(|g| g.group.as_str()));
    let columns =
        StringArray::from_iter_values(groups.iter().map(|_| comparison.column.name()));
    let counts: UInt64Array = groups.iter().map(|g| g.count as u64).collect();
    let means: Float64Array = groups.iter().map(|g| g.mean).collect();
    let maxes: Float64Array = groups.iter().map(|g| g.max).collect();
    let mins: Float64Array = groups.iter().map(|g| g.min).collect();
    let std_devs: Float64Array = groups.iter().map(|g| g.std_dev).collect();

    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(names),
            Arc::new(columns),
            Arc::new(counts),
            Arc::new(means),
            Arc::new(maxes),
            Arc::new(mins),
            Arc::new(std_devs),
        ],
    )?;

    let file = File::create(output_path)?;
    let props = WriterProperties::builder().build();
    let mut writer = ArrowWriter::try_new(file, schema, Some(props))?;
    writer.write(&batch)?;
    writer.close()?;

    Ok(())
}
