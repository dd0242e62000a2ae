use crate::error::{Result, StatsError};
use chrono::{Datelike, NaiveDate};
use log::{Log, Metadata, Record as LogRecord};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

/// Simple logger implementation. Writes to stderr so stdout carries only
/// query results.
pub struct SimpleLogger;

impl Log for SimpleLogger {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &LogRecord) {
        eprintln!("[{}] {}", record.level(), record.args());
    }

    fn flush(&self) {}
}

/// One weather observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub city: String,
    pub date: NaiveDate,
    pub temperature: f64,
    pub humidity: f64,
    pub precipitation: f64,
    pub weather_condition: String,
}

impl Record {
    /// Calendar month (1-12), always derived from `date`.
    pub fn month(&self) -> u32 {
        self.date.month()
    }
}

/// The columns a query can address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Column {
    Date,
    City,
    Temperature,
    Humidity,
    Precipitation,
    WeatherCondition,
    Month,
}

impl Column {
    pub const ALL: [Column; 7] = [
        Column::Date,
        Column::City,
        Column::Temperature,
        Column::Humidity,
        Column::Precipitation,
        Column::WeatherCondition,
        Column::Month,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Column::Date => "date",
            Column::City => "city",
            Column::Temperature => "temperature",
            Column::Humidity => "humidity",
            Column::Precipitation => "precipitation",
            Column::WeatherCondition => "weather_condition",
            Column::Month => "month",
        }
    }

    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            Column::Temperature | Column::Humidity | Column::Precipitation | Column::Month
        )
    }

    /// Columns with discrete values that records can be partitioned by.
    pub fn is_categorical(self) -> bool {
        matches!(
            self,
            Column::Date | Column::City | Column::WeatherCondition | Column::Month
        )
    }

    /// Numeric value of this column for `record`, `None` for text columns.
    pub fn numeric(self, record: &Record) -> Option<f64> {
        match self {
            Column::Temperature => Some(record.temperature),
            Column::Humidity => Some(record.humidity),
            Column::Precipitation => Some(record.precipitation),
            Column::Month => Some(f64::from(record.month())),
            Column::Date | Column::City | Column::WeatherCondition => None,
        }
    }

    /// Category label of this column for `record`, `None` for continuous columns.
    pub fn category(self, record: &Record) -> Option<Cow<'_, str>> {
        match self {
            Column::City => Some(Cow::Borrowed(record.city.as_str())),
            Column::WeatherCondition => Some(Cow::Borrowed(record.weather_condition.as_str())),
            Column::Month => Some(Cow::Owned(record.month().to_string())),
            Column::Date => Some(Cow::Owned(record.date.format("%Y-%m-%d").to_string())),
            Column::Temperature | Column::Humidity | Column::Precipitation => None,
        }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Column {
    type Err = StatsError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_ascii_lowercase();
        if normalized == "condition" {
            return Ok(Column::WeatherCondition);
        }
        Column::ALL
            .into_iter()
            .find(|c| c.name() == normalized)
            .ok_or_else(|| StatsError::UnknownColumn(s.to_string()))
    }
}

/// Immutable, validated set of records loaded for one session.
#[derive(Debug, Clone, Default)]
pub struct Table {
    records: Vec<Record>,
}

impl Table {
    /// Validates every record and takes ownership of them.
    ///
    /// # Errors
    /// Returns `StatsError::InvalidRecord` for the first record (1-based row)
    /// with an empty city or a non-finite numeric field.
    pub fn new(records: Vec<Record>) -> Result<Self> {
        for (i, record) in records.iter().enumerate() {
            let row = i + 1;
            if record.city.trim().is_empty() {
                return Err(StatsError::InvalidRecord {
                    row,
                    reason: "city is empty".to_string(),
                });
            }
            for (field, value) in [
                ("temperature", record.temperature),
                ("humidity", record.humidity),
                ("precipitation", record.precipitation),
            ] {
                if !value.is_finite() {
                    return Err(StatsError::InvalidRecord {
                        row,
                        reason: format!("{} is not a finite number", field),
                    });
                }
            }
        }
        Ok(Self { records })
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Descriptive statistics for one numeric column.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StatSummary {
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    pub max: f64,
    pub min: f64,
    pub std_dev: f64,
    pub variance: f64,
}

/// Per-group statistics produced by a grouped comparison.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupSummary {
    pub group: String,
    pub count: usize,
    pub mean: f64,
    pub max: f64,
    pub min: f64,
    pub std_dev: f64,
}

impl GroupSummary {
    pub fn new(group: String, summary: &StatSummary) -> Self {
        Self {
            group,
            count: summary.count,
            mean: summary.mean,
            max: summary.max,
            min: summary.min,
            std_dev: summary.std_dev,
        }
    }
}

/// Groups appear in first-seen order of the group key.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupComparison {
    pub column: Column,
    pub group_key: Column,
    pub groups: Vec<GroupSummary>,
}

impl GroupComparison {
    pub fn get(&self, group: &str) -> Option<&GroupSummary> {
        self.groups.iter().find(|g| g.group == group)
    }

    pub fn group_names(&self) -> impl Iterator<Item = &str> {
        self.groups.iter().map(|g| g.group.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Season {
    Spring,
    Summer,
    Autumn,
    Winter,
}

impl Season {
    pub const ALL: [Season; 4] = [Season::Spring, Season::Summer, Season::Autumn, Season::Winter];

    pub fn months(self) -> [u32; 3] {
        match self {
            Season::Spring => [3, 4, 5],
            Season::Summer => [6, 7, 8],
            Season::Autumn => [9, 10, 11],
            Season::Winter => [12, 1, 2],
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Season::Spring => "spring",
            Season::Summer => "summer",
            Season::Autumn => "autumn",
            Season::Winter => "winter",
        }
    }

    pub fn contains(self, month: u32) -> bool {
        self.months().contains(&month)
    }
}

/// Average of one column per season for one city. A season with no
/// observations reports 0.0.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeasonalAverages {
    pub city: String,
    pub column: Column,
    pub spring: f64,
    pub summer: f64,
    pub autumn: f64,
    pub winter: f64,
}

impl SeasonalAverages {
    pub fn get(&self, season: Season) -> f64 {
        match season {
            Season::Spring => self.spring,
            Season::Summer => self.summer,
            Season::Autumn => self.autumn,
            Season::Winter => self.winter,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Season, f64)> + '_ {
        Season::ALL.into_iter().map(|s| (s, self.get(s)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Strength {
    Strong,
    Moderate,
    Weak,
}

impl Strength {
    pub fn from_coefficient(r: f64) -> Self {
        let magnitude = r.abs();
        if magnitude > 0.7 {
            Strength::Strong
        } else if magnitude > 0.3 {
            Strength::Moderate
        } else {
            Strength::Weak
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Strength::Strong => "strong",
            Strength::Moderate => "moderate",
            Strength::Weak => "weak",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Positive,
    Negative,
    None,
}

impl Direction {
    pub fn from_coefficient(r: f64) -> Self {
        if r > 0.0 {
            Direction::Positive
        } else if r < 0.0 {
            Direction::Negative
        } else {
            Direction::None
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Direction::Positive => "positive",
            Direction::Negative => "negative",
            Direction::None => "none",
        }
    }
}

/// Pearson correlation between two numeric columns over the whole table.
///
/// When either column is constant the coefficient is undefined; `r` is then
/// reported as 0.0 and `degenerate` is set. Callers should check the flag
/// before reading anything into `r`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationResult {
    pub column_a: Column,
    pub column_b: Column,
    pub r: f64,
    pub degenerate: bool,
    pub strength: Strength,
    pub direction: Direction,
}

impl CorrelationResult {
    pub fn new(column_a: Column, column_b: Column, r: Option<f64>) -> Self {
        let degenerate = r.is_none();
        let r = r.map(|v| v.clamp(-1.0, 1.0)).unwrap_or(0.0);
        Self {
            column_a,
            column_b,
            r,
            degenerate,
            strength: Strength::from_coefficient(r),
            direction: Direction::from_coefficient(r),
        }
    }

    /// Plain-language reading of the coefficient.
    pub fn interpretation(&self) -> &'static str {
        if self.degenerate {
            return "cannot be calculated (one of the values never changes)";
        }
        let r = self.r;
        if r > 0.7 {
            "strong positive correlation (when one is large, the other tends to be large too)"
        } else if r > 0.3 {
            "moderate positive correlation (they move together to some extent)"
        } else if r > -0.3 {
            "weak correlation (little relationship)"
        } else if r > -0.7 {
            "moderate negative correlation (when one is large, the other tends to be small)"
        } else {
            "strong negative correlation (when one is large, the other is reliably small)"
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryShare {
    pub category: String,
    pub count: usize,
    pub proportion: f64,
}

impl CategoryShare {
    pub fn percent(&self) -> f64 {
        self.proportion * 100.0
    }
}

/// Share of each category of a column among one city's records, most
/// frequent first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProbabilityDistribution {
    pub city: String,
    pub column: Column,
    pub total: usize,
    pub categories: Vec<CategoryShare>,
}

impl ProbabilityDistribution {
    pub fn get(&self, category: &str) -> Option<&CategoryShare> {
        self.categories.iter().find(|c| c.category == category)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryCount {
    pub category: String,
    pub count: usize,
}

/// Occurrences of each category over the whole table, first-seen order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrequencyTable {
    pub column: Column,
    pub counts: Vec<CategoryCount>,
}

/// Most frequent value(s) of a numeric column. Ties are not broken: every
/// value sharing the top count is listed, in first-seen order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModeResult {
    pub column: Column,
    pub values: Vec<f64>,
    pub count: usize,
}

impl ModeResult {
    pub fn is_tied(&self) -> bool {
        self.values.len() > 1
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Rising,
    Falling,
    Flat,
}

impl TrendDirection {
    pub fn label(self) -> &'static str {
        match self {
            TrendDirection::Rising => "rising",
            TrendDirection::Falling => "falling",
            TrendDirection::Flat => "flat",
        }
    }
}

/// Compares the mean of the earlier half of the records (by date) with the
/// later half.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendResult {
    pub column: Column,
    pub first_half_mean: f64,
    pub second_half_mean: f64,
    pub direction: TrendDirection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MonthlyFeature {
    NotablyWarm,
    NotablyCold,
    NearAverage,
}

impl MonthlyFeature {
    pub fn from_deviation(deviation: f64) -> Self {
        if deviation > 5.0 {
            MonthlyFeature::NotablyWarm
        } else if deviation < -5.0 {
            MonthlyFeature::NotablyCold
        } else {
            MonthlyFeature::NearAverage
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            MonthlyFeature::NotablyWarm => "notably warm month",
            MonthlyFeature::NotablyCold => "notably cold month",
            MonthlyFeature::NearAverage => "near annual average",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TemperatureBand {
    Warm,
    Cool,
    Cold,
}

impl TemperatureBand {
    pub fn classify(temperature: f64) -> Self {
        if temperature > 20.0 {
            TemperatureBand::Warm
        } else if temperature > 10.0 {
            TemperatureBand::Cool
        } else {
            TemperatureBand::Cold
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RainBand {
    Heavy,
    Moderate,
    Light,
}

impl RainBand {
    pub fn classify(precipitation: f64) -> Self {
        if precipitation > 30.0 {
            RainBand::Heavy
        } else if precipitation > 10.0 {
            RainBand::Moderate
        } else {
            RainBand::Light
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HumidityBand {
    Humid,
    Comfortable,
    Dry,
}

impl HumidityBand {
    pub fn classify(humidity: f64) -> Self {
        if humidity > 70.0 {
            HumidityBand::Humid
        } else if humidity < 60.0 {
            HumidityBand::Dry
        } else {
            HumidityBand::Comfortable
        }
    }
}

/// Facts about one representative record of a city's month, for narrative
/// display. Built from the first matching record, not an aggregate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyFacts {
    pub city: String,
    pub month: u32,
    pub date: NaiveDate,
    pub temperature: f64,
    pub precipitation: f64,
    pub humidity: f64,
    pub condition: String,
    pub city_average_temperature: f64,
    pub deviation_from_city_average: f64,
    pub feature: MonthlyFeature,
    pub temperature_band: TemperatureBand,
    pub rain_band: RainBand,
    pub humidity_band: HumidityBand,
}

impl MonthlyFacts {
    pub fn narrative(&self) -> String {
        let temperature_word = match self.temperature_band {
            TemperatureBand::Warm => "a warm",
            TemperatureBand::Cool => "a cool",
            TemperatureBand::Cold => "a cold",
        };
        let rain_word = match self.rain_band {
            RainBand::Heavy => "a lot of",
            RainBand::Moderate => "a normal amount of",
            RainBand::Light => "only a little",
        };
        let humidity_word = match self.humidity_band {
            HumidityBand::Humid => "muggy",
            HumidityBand::Comfortable => "ordinary",
            HumidityBand::Dry => "crisp",
        };
        format!(
            "Weather story: {city}, month {month}\n\
             \n\
             The temperature spirit holds {temp}°C of power. That is {temperature_word} spirit!\n\
             The rain spirit let {precip} mm fall. That is {rain_word} rain.\n\
             The humidity fairy mixed {humidity}% moisture into the air. It feels {humidity_word}.\n\
             Today's weather turned out {condition}!\n\
             \n\
             Statistics corner:\n\
             - Difference from the average temperature: {deviation:+.1}°C\n\
             - What makes this month special: {feature}",
            city = self.city,
            month = self.month,
            temp = self.temperature,
            precip = self.precipitation,
            humidity = self.humidity,
            condition = self.condition,
            deviation = self.deviation_from_city_average,
            feature = self.feature.label(),
        )
    }
}

/// Output format for query results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Table,
    Csv,
    Json,
}

/// Configuration for rendering query results
#[derive(Debug, Clone)]
pub struct ReportConfig {
    pub format: OutputFormat,
    pub precision: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::Table,
            precision: 2,
        }
    }
}
