use arrow_array::{Array, ArrayRef, Float64Array, Int64Array, RecordBatch, StringArray};
use arrow_schema::{DataType, Field, Schema};
use parquet::arrow::ArrowWriter;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use weather_stats::{
    OutputFormat, ReportConfig, StatsEngine, StatsError, read_table, render, write_csv,
    write_json, write_parquet,
};

const CSV: &str = "\
date,city,temperature,humidity,precipitation,weather_condition
2024-01-05,Tokyo,5.2,45,0.0,sunny
2024-01-06,Sapporo,-4.1,70,12.0,snow
2024-04-10,Tokyo,15.8,60,8.5,cloudy
2024-07-10,Tokyo,28.4,78,30.2,rain
2024-07-11,Sapporo,22.0,72,5.0,sunny
2024-10-02,Tokyo,19.1,65,10.0,sunny
";

fn write_batch(path: &Path, batch: &RecordBatch) {
    let mut writer =
        ArrowWriter::try_new(File::create(path).unwrap(), batch.schema(), None).unwrap();
    writer.write(batch).unwrap();
    writer.close().unwrap();
}

/// Two Tokyo rows with the given measurement columns.
fn weather_batch(temperature: ArrayRef, humidity: ArrayRef) -> RecordBatch {
    let schema = Arc::new(Schema::new(vec![
        Field::new("date", DataType::Utf8, false),
        Field::new("city", DataType::Utf8, false),
        Field::new("temperature", temperature.data_type().clone(), true),
        Field::new("humidity", humidity.data_type().clone(), false),
        Field::new("precipitation", DataType::Float64, false),
        Field::new("weather_condition", DataType::Utf8, false),
    ]));
    RecordBatch::try_new(
        schema,
        vec![
            Arc::new(StringArray::from(vec!["2024-01-05", "2024-07-10"])),
            Arc::new(StringArray::from(vec!["Tokyo", "Tokyo"])),
            temperature,
            humidity,
            Arc::new(Float64Array::from(vec![0.0, 20.0])),
            Arc::new(StringArray::from(vec!["sunny", "rain"])),
        ],
    )
    .unwrap()
}

fn write_input(dir: &TempDir) -> std::path::PathBuf {
    let path = dir.path().join("weather.csv");
    let mut file = File::create(&path).unwrap();
    file.write_all(CSV.as_bytes()).unwrap();
    path
}

#[test]
fn test_csv_to_engine_queries() {
    let dir = TempDir::new().unwrap();
    let engine = StatsEngine::new(read_table(&write_input(&dir)).unwrap());
    assert_eq!(engine.table().len(), 6);

    let seasons = engine.seasonal_averages("Tokyo", "temperature").unwrap();
    assert!((seasons.winter - 5.2).abs() < 1e-9);
    assert!((seasons.spring - 15.8).abs() < 1e-9);
    assert!((seasons.summer - 28.4).abs() < 1e-9);
    assert!((seasons.autumn - 19.1).abs() < 1e-9);

    let comparison = engine.compare_cities("temperature").unwrap();
    let names: Vec<&str> = comparison.group_names().collect();
    assert_eq!(names, vec!["Tokyo", "Sapporo"]);

    let dist = engine.weather_probability("Tokyo").unwrap();
    assert_eq!(dist.categories[0].category, "sunny");
    assert!((dist.categories[0].percent() - 50.0).abs() < 1e-9);

    let facts = engine.monthly_narrative_facts("Sapporo", 1).unwrap();
    assert_eq!(facts.condition, "snow");
    assert!(facts.deviation_from_city_average < -5.0);
}

#[test]
fn test_bad_row_fails_fast() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bad.csv");
    fs::write(
        &path,
        "date,city,temperature,humidity,precipitation,weather_condition\n\
         2024-01-05,Tokyo,5.2,45,0.0,sunny\n\
         2024-01-06,Tokyo,,45,0.0,sunny\n",
    )
    .unwrap();
    let err = read_table(&path).unwrap_err();
    assert!(matches!(
        err,
        StatsError::MissingField {
            row: 2,
            field: "temperature"
        }
    ));
}

#[test]
fn test_export_writes_all_formats() {
    let dir = TempDir::new().unwrap();
    let engine = StatsEngine::new(read_table(&write_input(&dir)).unwrap());
    let comparison = engine.compare_cities("humidity").unwrap();

    let csv_path = dir.path().join("cities.csv");
    let json_path = dir.path().join("cities.json");
    let parquet_path = dir.path().join("cities.parquet");
    write_csv(&comparison, &csv_path).unwrap();
    write_json(&comparison, &json_path).unwrap();
    write_parquet(&comparison, &parquet_path).unwrap();

    let csv = fs::read_to_string(&csv_path).unwrap();
    let mut lines = csv.lines();
    assert_eq!(
        lines.next(),
        Some("city,Column,Count,Mean,Max,Min,Std_Dev")
    );
    assert_eq!(lines.next(), Some("Tokyo,humidity,4,62.00,78.00,45.00,13.64"));

    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&json_path).unwrap()).unwrap();
    assert_eq!(json["column"], "humidity");
    assert_eq!(json["groups"][1]["group"], "Sapporo");

    assert!(fs::metadata(&parquet_path).unwrap().len() > 0);
}

#[test]
fn test_parquet_input() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("weather.parquet");

    write_batch(
        &path,
        &weather_batch(
            Arc::new(Float64Array::from(vec![5.0, 28.0])),
            Arc::new(Float64Array::from(vec![45.0, 80.0])),
        ),
    );

    let engine = StatsEngine::new(read_table(&path).unwrap());
    let correlation = engine.correlation("temperature", "humidity").unwrap();
    assert!((correlation.r - 1.0).abs() < 1e-9);
    assert_eq!(engine.table().records()[1].month(), 7);
}

#[test]
fn test_parquet_null_temperature_is_missing() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("weather.parquet");
    write_batch(
        &path,
        &weather_batch(
            Arc::new(Float64Array::from(vec![Some(5.0), None])),
            Arc::new(Float64Array::from(vec![45.0, 80.0])),
        ),
    );

    let err = read_table(&path).unwrap_err();
    assert!(matches!(
        err,
        StatsError::MissingField {
            row: 2,
            field: "temperature"
        }
    ));
}

#[test]
fn test_parquet_integer_humidity_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("weather.parquet");
    write_batch(
        &path,
        &weather_batch(
            Arc::new(Float64Array::from(vec![5.0, 28.0])),
            Arc::new(Int64Array::from(vec![45, 80])),
        ),
    );

    match read_table(&path).unwrap_err() {
        StatsError::Data(message) => assert!(message.contains("humidity")),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_render_formats() {
    let dir = TempDir::new().unwrap();
    let engine = StatsEngine::new(read_table(&write_input(&dir)).unwrap());
    let seasons = engine.seasonal_averages("Sapporo", "temperature").unwrap();

    let table = render(&seasons, &ReportConfig::default()).unwrap();
    assert!(table.lines().any(|l| l.starts_with("spring") && l.ends_with("0.00")));

    let csv = render(
        &seasons,
        &ReportConfig {
            format: OutputFormat::Csv,
            precision: 1,
        },
    )
    .unwrap();
    assert!(csv.contains("winter,-4.1"));
}
