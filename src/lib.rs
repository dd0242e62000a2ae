pub mod engine;
pub mod error;
pub mod ingest;
pub mod load;
pub mod progress;
pub mod report;
pub mod stats;
pub mod structs;

// Re-export public API
pub use engine::StatsEngine;
pub use error::{Result, StatsError};
pub use ingest::{read_csv, read_csv_from, read_parquet, read_table};
pub use load::{write_csv, write_json, write_parquet};
pub use progress::{Activity, Award, Progress};
pub use report::{Tabular, render};
pub use structs::{
    Column, CorrelationResult, GroupComparison, GroupSummary, MonthlyFacts, OutputFormat,
    ProbabilityDistribution, Record, ReportConfig, Season, SeasonalAverages, SimpleLogger,
    StatSummary, Table,
};
