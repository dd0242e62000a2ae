use clap::{Parser, Subcommand};
use log::{debug, info};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use weather_stats::{
    Activity, OutputFormat, Progress, ReportConfig, SimpleLogger, StatsEngine, StatsError,
    read_table, render, write_csv, write_json, write_parquet,
};

static LOGGER: SimpleLogger = SimpleLogger;

#[derive(Parser, Debug)]
#[command(author, version, about = "Descriptive statistics over weather records", long_about = None)]
struct Args {
    /// Input weather data (.csv or .parquet)
    #[arg(short, long)]
    input: PathBuf,

    /// Output format for results
    #[arg(long, default_value = "table")]
    format: OutputFormat,

    /// Decimal places for numeric output
    #[arg(long, default_value_t = 2)]
    precision: usize,

    /// JSON file holding experience and achievements; created if missing
    #[arg(long)]
    progress: Option<PathBuf>,

    /// Log level for output
    #[arg(long, default_value = "false")]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Mean, median, max, min, standard deviation and variance of a column
    Stats { column: String },
    /// Per-group statistics of a column
    Compare {
        column: String,
        #[arg(long, default_value = "city")]
        by: String,
    },
    /// Seasonal averages of a column for one city
    Seasonal { city: String, column: String },
    /// Pearson correlation between two columns
    Correlate { column_a: String, column_b: String },
    /// Temperature against humidity and precipitation
    Discover,
    /// Share of each category among one city's records
    Probability {
        city: String,
        #[arg(long, default_value = "weather_condition")]
        column: String,
    },
    /// Occurrences of each category over the whole table
    Frequency { column: String },
    /// Most frequent value(s) of a column
    Mode { column: String },
    /// First-half against second-half mean, ordered by date
    Trend { column: String },
    /// Story-style facts for one city and month
    Story { city: String, month: u32 },
    /// Write a grouped comparison as CSV, JSON and Parquet
    Export {
        column: String,
        #[arg(long, default_value = "city")]
        by: String,
        /// Output base name (will create dir containing .csv, .json, and .parquet files)
        #[arg(short, long, default_value = "output")]
        output: String,
    },
}

impl Command {
    fn activity(&self) -> Activity {
        match self {
            Command::Stats { .. }
            | Command::Mode { .. }
            | Command::Compare { .. }
            | Command::Export { .. } => Activity::BasicStats,
            Command::Probability { .. } | Command::Frequency { .. } => Activity::Distribution,
            Command::Correlate { .. } | Command::Discover => Activity::Correlation,
            Command::Seasonal { .. } | Command::Trend { .. } | Command::Story { .. } => {
                Activity::TimeSeries
            }
        }
    }
}

fn main() -> Result<(), StatsError> {
    let total_start = Instant::now();
    if log::set_logger(&LOGGER).is_err() {
        eprintln!("logger already initialized");
    }

    let args = Args::parse();
    if args.debug {
        log::set_max_level(log::LevelFilter::Debug);
    } else {
        log::set_max_level(log::LevelFilter::Info);
    }

    let config = ReportConfig {
        format: args.format,
        precision: args.precision,
    };
    debug!(
        "Input file: {} | Format: {:?} | Precision: {}",
        args.input.display(),
        config.format,
        config.precision
    );

    let load_start = Instant::now();
    let engine = StatsEngine::new(read_table(&args.input)?);
    debug!(
        "Loaded {} records in {:.2?}",
        engine.table().len(),
        load_start.elapsed()
    );

    let output = run(&engine, &args.command, &config)?;
    println!("{}", output);

    if let Some(path) = &args.progress {
        record_progress(path, &[Activity::Upload, args.command.activity()])?;
    }

    debug!("Completed in {:.2?}", total_start.elapsed());
    Ok(())
}

fn run(
    engine: &StatsEngine,
    command: &Command,
    config: &ReportConfig,
) -> Result<String, StatsError> {
    match command {
        Command::Stats { column } => render(&engine.basic_stats(column)?, config),
        Command::Compare { column, by } => render(&engine.compare_by_group(column, by)?, config),
        Command::Seasonal { city, column } => {
            render(&engine.seasonal_averages(city, column)?, config)
        }
        Command::Correlate { column_a, column_b } => {
            render(&engine.correlation(column_a, column_b)?, config)
        }
        Command::Discover => render(engine.discover_correlations()?.as_slice(), config),
        Command::Probability { city, column } => {
            render(&engine.categorical_probability(city, column)?, config)
        }
        Command::Frequency { column } => render(&engine.frequency_counts(column)?, config),
        Command::Mode { column } => render(&engine.mode(column)?, config),
        Command::Trend { column } => render(&engine.trend(column)?, config),
        Command::Story { city, month } => {
            let facts = engine.monthly_narrative_facts(city, *month)?;
            match config.format {
                OutputFormat::Table => Ok(facts.narrative()),
                _ => render(&facts, config),
            }
        }
        Command::Export { column, by, output } => {
            let comparison = engine.compare_by_group(column, by)?;
            let output_dir = PathBuf::from(format!("./output/{}", output));
            fs::create_dir_all(&output_dir)?;

            // Extract just the directory name for the file names (remove path separators)
            let output_name = output.split(['/', '\\']).next_back().unwrap_or(output);
            let csv_path = output_dir.join(format!("{}.csv", output_name));
            let json_path = output_dir.join(format!("{}.json", output_name));
            let parquet_path = output_dir.join(format!("{}.parquet", output_name));

            let io_start = Instant::now();
            write_csv(&comparison, &csv_path)?;
            write_json(&comparison, &json_path)?;
            write_parquet(&comparison, &parquet_path)?;
            debug!("All files took {:.2?}", io_start.elapsed());
            debug!("  - {}", csv_path.display());
            debug!("  - {}", json_path.display());
            debug!("  - {}", parquet_path.display());

            Ok(format!(
                "Wrote {} groups to directory: {}",
                comparison.groups.len(),
                output_dir.display()
            ))
        }
    }
}

fn record_progress(path: &Path, activities: &[Activity]) -> Result<(), StatsError> {
    let mut progress = Progress::load(path)?;

    for &activity in activities {
        let award = progress.award(activity);
        info!(
            "+{} XP | Level {}: {} ({}/100)",
            award.points,
            progress.level(),
            progress.title(),
            progress.experience_in_level()
        );
        if let Some(level) = award.level_up {
            info!("Level up! You reached level {}", level);
        }
        if let Some(achievement) = award.new_achievement {
            info!("New achievement: {}", achievement);
        }
    }

    progress.save(path)
}
