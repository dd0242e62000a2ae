use crate::error::{Result, StatsError};
use crate::stats;
use crate::structs::{
    CategoryCount, CategoryShare, Column, CorrelationResult, FrequencyTable, GroupComparison,
    GroupSummary, HumidityBand, ModeResult, MonthlyFacts, MonthlyFeature,
    ProbabilityDistribution, RainBand, Record, Season, SeasonalAverages, StatSummary, Table,
    TemperatureBand, TrendDirection, TrendResult,
};
use log::debug;
use rayon::prelude::*;
use std::collections::HashMap;

/// Query engine over one immutable weather table.
///
/// Every query is a pure function of the table and its arguments; results are
/// value objects owned by the caller and nothing is cached between calls. A
/// failed query leaves the engine fully usable. The engine is `Send + Sync`
/// and can be shared across threads for concurrent reads.
#[derive(Debug, Clone)]
pub struct StatsEngine {
    table: Table,
}

impl StatsEngine {
    pub fn new(table: Table) -> Self {
        debug!("Engine ready over {} records", table.len());
        Self { table }
    }

    /// Validates `records` into a table and builds an engine over it.
    ///
    /// # Errors
    /// Returns `StatsError::InvalidRecord` if any record fails validation.
    pub fn from_records(records: Vec<Record>) -> Result<Self> {
        Ok(Self::new(Table::new(records)?))
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    /// Computes mean, median, min, max, sample variance and sample standard
    /// deviation of a numeric column over the whole table.
    ///
    /// # Errors
    ///
    /// Returns `StatsError` if:
    /// - `column` is not a known column (`UnknownColumn`)
    /// - `column` is not numeric (`ColumnType`)
    /// - the table has no rows (`EmptyTable`)
    pub fn basic_stats(&self, column: &str) -> Result<StatSummary> {
        let column = numeric_column(column)?;
        let values = self.values(column, |_| true);
        stats::summarize(&values).ok_or(StatsError::EmptyTable)
    }

    /// Partitions the table by `group_key` and summarizes `column` within
    /// each partition.
    ///
    /// Groups are returned in the order their key first appears in the
    /// table, not sorted.
    ///
    /// # Arguments
    ///
    /// * `column` - Numeric column to summarize
    /// * `group_key` - Categorical column to partition by (usually `"city"`)
    ///
    /// # Errors
    ///
    /// Returns `StatsError` if either column is unknown or of the wrong kind,
    /// or if the table is empty.
    pub fn compare_by_group(&self, column: &str, group_key: &str) -> Result<GroupComparison> {
        let column = numeric_column(column)?;
        let group_key = categorical_column(group_key)?;
        if self.table.is_empty() {
            return Err(StatsError::EmptyTable);
        }

        let mut index: HashMap<String, usize> = HashMap::new();
        let mut partitions: Vec<(String, Vec<f64>)> = Vec::new();
        for record in self.table.records() {
            let (Some(key), Some(value)) = (group_key.category(record), column.numeric(record))
            else {
                continue;
            };
            match index.get(&*key) {
                Some(&i) => partitions[i].1.push(value),
                None => {
                    index.insert(key.to_string(), partitions.len());
                    partitions.push((key.into_owned(), vec![value]));
                }
            }
        }
        debug!(
            "Comparing {} across {} groups of {}",
            column,
            partitions.len(),
            group_key
        );

        // collect on an indexed parallel iterator keeps first-seen order
        let groups: Vec<GroupSummary> = partitions
            .into_par_iter()
            .filter_map(|(group, values)| {
                stats::summarize(&values).map(|summary| GroupSummary::new(group, &summary))
            })
            .collect();

        Ok(GroupComparison {
            column,
            group_key,
            groups,
        })
    }

    /// Grouped comparison by city.
    pub fn compare_cities(&self, column: &str) -> Result<GroupComparison> {
        self.compare_by_group(column, Column::City.name())
    }

    /// Averages `column` for one city within each season.
    ///
    /// All four seasons are always present; a season without observations
    /// (including an unknown city) reports 0.0.
    ///
    /// # Errors
    ///
    /// Returns `StatsError` if `column` is unknown or not numeric.
    pub fn seasonal_averages(&self, city: &str, column: &str) -> Result<SeasonalAverages> {
        let column = numeric_column(column)?;
        let average = |season: Season| {
            let values = self.values(column, |r| r.city == city && season.contains(r.month()));
            stats::mean(&values).unwrap_or(0.0)
        };

        Ok(SeasonalAverages {
            city: city.to_string(),
            column,
            spring: average(Season::Spring),
            summer: average(Season::Summer),
            autumn: average(Season::Autumn),
            winter: average(Season::Winter),
        })
    }

    /// Pearson correlation between two numeric columns over the full table.
    ///
    /// A constant column makes the coefficient undefined; the result then
    /// carries `degenerate = true` and `r = 0.0` rather than failing.
    ///
    /// # Errors
    ///
    /// Returns `StatsError` if either column is unknown or not numeric, or if
    /// the table is empty.
    pub fn correlation(&self, column_a: &str, column_b: &str) -> Result<CorrelationResult> {
        let column_a = numeric_column(column_a)?;
        let column_b = numeric_column(column_b)?;
        if self.table.is_empty() {
            return Err(StatsError::EmptyTable);
        }

        let xs = self.values(column_a, |_| true);
        let ys = self.values(column_b, |_| true);
        Ok(CorrelationResult::new(
            column_a,
            column_b,
            stats::pearson(&xs, &ys),
        ))
    }

    /// The two relationships the dashboard highlights: temperature against
    /// humidity and temperature against precipitation.
    pub fn discover_correlations(&self) -> Result<Vec<CorrelationResult>> {
        [
            (Column::Temperature, Column::Humidity),
            (Column::Temperature, Column::Precipitation),
        ]
        .into_iter()
        .map(|(a, b)| self.correlation(a.name(), b.name()))
        .collect()
    }

    /// Share of each category of `column` among the records of `city`.
    ///
    /// Categories are ordered by count, most frequent first; equal counts
    /// keep first-seen order.
    ///
    /// # Errors
    ///
    /// Returns `StatsError` if `column` is unknown or not categorical, or
    /// `EmptyGroup` if no record belongs to `city`.
    pub fn categorical_probability(
        &self,
        city: &str,
        column: &str,
    ) -> Result<ProbabilityDistribution> {
        let column = categorical_column(column)?;
        let labels: Vec<_> = self
            .table
            .records()
            .iter()
            .filter(|r| r.city == city)
            .filter_map(|r| column.category(r))
            .collect();

        let total = labels.len();
        if total == 0 {
            return Err(StatsError::EmptyGroup {
                column: Column::City.name().to_string(),
                value: city.to_string(),
            });
        }

        let mut counts = stats::frequencies(labels);
        counts.sort_by(|a, b| b.1.cmp(&a.1));
        let categories = counts
            .into_iter()
            .map(|(category, count)| CategoryShare {
                category: category.into_owned(),
                count,
                proportion: count as f64 / total as f64,
            })
            .collect();

        Ok(ProbabilityDistribution {
            city: city.to_string(),
            column,
            total,
            categories,
        })
    }

    /// Weather-condition distribution for one city.
    pub fn weather_probability(&self, city: &str) -> Result<ProbabilityDistribution> {
        self.categorical_probability(city, Column::WeatherCondition.name())
    }

    /// Occurrences of each category of `column` over the whole table.
    pub fn frequency_counts(&self, column: &str) -> Result<FrequencyTable> {
        let column = categorical_column(column)?;
        let labels = self.table.records().iter().filter_map(|r| column.category(r));
        let counts = stats::frequencies(labels)
            .into_iter()
            .map(|(category, count)| CategoryCount {
                category: category.into_owned(),
                count,
            })
            .collect();
        Ok(FrequencyTable { column, counts })
    }

    /// Most frequent value(s) of a numeric column.
    ///
    /// # Errors
    ///
    /// Returns `StatsError` if `column` is unknown or not numeric, or if the
    /// table is empty.
    pub fn mode(&self, column: &str) -> Result<ModeResult> {
        let column = numeric_column(column)?;
        let (values, count) =
            stats::modes(&self.values(column, |_| true)).ok_or(StatsError::EmptyTable)?;
        Ok(ModeResult {
            column,
            values,
            count,
        })
    }

    /// Compares the first half of the records (ordered by date) with the
    /// second half.
    ///
    /// # Errors
    ///
    /// Returns `StatsError` if `column` is unknown or not numeric, or
    /// `EmptyTable` if fewer than two records are loaded.
    pub fn trend(&self, column: &str) -> Result<TrendResult> {
        let column = numeric_column(column)?;
        let mut ordered: Vec<&Record> = self.table.records().iter().collect();
        ordered.sort_by_key(|r| r.date);
        let values: Vec<f64> = ordered.iter().filter_map(|r| column.numeric(r)).collect();

        let (first_half_mean, second_half_mean) =
            stats::half_means(&values).ok_or(StatsError::EmptyTable)?;
        let direction = if second_half_mean > first_half_mean {
            TrendDirection::Rising
        } else if second_half_mean < first_half_mean {
            TrendDirection::Falling
        } else {
            TrendDirection::Flat
        };

        Ok(TrendResult {
            column,
            first_half_mean,
            second_half_mean,
            direction,
        })
    }

    /// Facts about the first record of `city` in `month`, set against the
    /// city's all-time average temperature.
    ///
    /// # Errors
    ///
    /// Returns `StatsError::NoMatchingRecord` if the city has no record in
    /// that month.
    pub fn monthly_narrative_facts(&self, city: &str, month: u32) -> Result<MonthlyFacts> {
        let record = self
            .table
            .records()
            .iter()
            .find(|r| r.city == city && r.month() == month)
            .ok_or_else(|| StatsError::NoMatchingRecord {
                city: city.to_string(),
                month,
            })?;

        let city_temps = self.values(Column::Temperature, |r| r.city == city);
        let city_average_temperature = stats::mean(&city_temps).ok_or(StatsError::EmptyTable)?;
        let deviation = record.temperature - city_average_temperature;

        Ok(MonthlyFacts {
            city: city.to_string(),
            month,
            date: record.date,
            temperature: record.temperature,
            precipitation: record.precipitation,
            humidity: record.humidity,
            condition: record.weather_condition.clone(),
            city_average_temperature,
            deviation_from_city_average: deviation,
            feature: MonthlyFeature::from_deviation(deviation),
            temperature_band: TemperatureBand::classify(record.temperature),
            rain_band: RainBand::classify(record.precipitation),
            humidity_band: HumidityBand::classify(record.humidity),
        })
    }

    fn values<F>(&self, column: Column, keep: F) -> Vec<f64>
    where
        F: Fn(&Record) -> bool,
    {
        self.table
            .records()
            .iter()
            .filter(|r| keep(*r))
            .filter_map(|r| column.numeric(r))
            .collect()
    }
}

fn numeric_column(name: &str) -> Result<Column> {
    let column: Column = name.parse()?;
    if !column.is_numeric() {
        return Err(StatsError::ColumnType {
            column: column.name().to_string(),
            expected: "numeric",
        });
    }
    Ok(column)
}

fn categorical_column(name: &str) -> Result<Column> {
    let column: Column = name.parse()?;
    if !column.is_categorical() {
        return Err(StatsError::ColumnType {
            column: column.name().to_string(),
            expected: "categorical",
        });
    }
    Ok(column)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn record(city: &str, date: &str, temperature: f64, condition: &str) -> Record {
        Record {
            city: city.to_string(),
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            temperature,
            humidity: 50.0 + temperature,
            precipitation: 2.0,
            weather_condition: condition.to_string(),
        }
    }

    fn engine(records: Vec<Record>) -> StatsEngine {
        StatsEngine::from_records(records).unwrap()
    }

    fn sample() -> StatsEngine {
        engine(vec![
            record("Sapporo", "2024-01-10", -4.0, "snow"),
            record("Tokyo", "2024-01-05", 5.0, "sunny"),
            record("Naha", "2024-01-07", 17.0, "cloudy"),
            record("Tokyo", "2024-07-10", 28.0, "sunny"),
            record("Sapporo", "2024-07-12", 22.0, "rain"),
            record("Tokyo", "2024-10-02", 19.0, "rain"),
            record("Naha", "2024-07-15", 29.0, "sunny"),
        ])
    }

    #[test]
    fn test_basic_stats_example() {
        let e = engine(
            [25.0, 28.0, 30.0, 26.0, 31.0]
                .iter()
                .map(|&t| record("Tokyo", "2024-08-01", t, "sunny"))
                .collect(),
        );
        let summary = e.basic_stats("temperature").unwrap();
        assert!((summary.mean - 28.0).abs() < 1e-9);
        assert_eq!(summary.median, 28.0);
        assert_eq!(summary.min, 25.0);
        assert_eq!(summary.max, 31.0);
    }

    #[test]
    fn test_basic_stats_errors() {
        let e = sample();
        assert!(matches!(e.basic_stats("wind"), Err(StatsError::UnknownColumn(_))));
        assert!(matches!(
            e.basic_stats("city"),
            Err(StatsError::ColumnType { expected: "numeric", .. })
        ));
        let empty = engine(Vec::new());
        assert!(matches!(empty.basic_stats("temperature"), Err(StatsError::EmptyTable)));
        // engine still answers after failures
        assert!(e.basic_stats("humidity").is_ok());
    }

    #[test]
    fn test_compare_by_group_first_seen_order() {
        let comparison = sample().compare_cities("temperature").unwrap();
        let names: Vec<&str> = comparison.group_names().collect();
        assert_eq!(names, vec!["Sapporo", "Tokyo", "Naha"]);

        let tokyo = comparison.get("Tokyo").unwrap();
        assert_eq!(tokyo.count, 3);
        assert!((tokyo.mean - 52.0 / 3.0).abs() < 1e-9);
        assert_eq!(tokyo.max, 28.0);
        assert_eq!(tokyo.min, 5.0);
    }

    #[test]
    fn test_compare_by_condition_and_month() {
        let e = sample();
        let by_condition = e.compare_by_group("temperature", "weather_condition").unwrap();
        let names: Vec<&str> = by_condition.group_names().collect();
        assert_eq!(names, vec!["snow", "sunny", "cloudy", "rain"]);

        let by_month = e.compare_by_group("temperature", "month").unwrap();
        let names: Vec<&str> = by_month.group_names().collect();
        assert_eq!(names, vec!["1", "7", "10"]);
        assert_eq!(by_month.get("10").unwrap().std_dev, 0.0);

        assert!(matches!(
            e.compare_by_group("temperature", "humidity"),
            Err(StatsError::ColumnType { expected: "categorical", .. })
        ));
    }

    #[test]
    fn test_seasonal_averages_example() {
        let e = engine(vec![
            record("Tokyo", "2024-01-05", 5.0, "sunny"),
            record("Tokyo", "2024-07-10", 28.0, "sunny"),
        ]);
        let seasons = e.seasonal_averages("Tokyo", "temperature").unwrap();
        assert_eq!(seasons.winter, 5.0);
        assert_eq!(seasons.summer, 28.0);
        assert_eq!(seasons.spring, 0.0);
        assert_eq!(seasons.autumn, 0.0);
        assert_eq!(seasons.iter().count(), 4);
    }

    #[test]
    fn test_seasonal_averages_unknown_city_is_all_zero() {
        let seasons = sample().seasonal_averages("Kyoto", "temperature").unwrap();
        assert!(seasons.iter().all(|(_, v)| v == 0.0));
    }

    #[test]
    fn test_correlation_symmetric_and_self() {
        let e = sample();
        let ab = e.correlation("temperature", "precipitation").unwrap();
        assert!(ab.degenerate, "precipitation is constant in the sample");

        let th = e.correlation("temperature", "humidity").unwrap();
        let ht = e.correlation("humidity", "temperature").unwrap();
        assert_eq!(th.r, ht.r);
        assert!((th.r - 1.0).abs() < 1e-9);

        let tt = e.correlation("temperature", "temperature").unwrap();
        assert_eq!(tt.r, 1.0);
        assert!(!tt.degenerate);
    }

    #[test]
    fn test_correlation_constant_column_is_flagged() {
        let e = engine(
            (0..3)
                .map(|_| record("Tokyo", "2024-05-01", 5.0, "sunny"))
                .collect(),
        );
        let result = e.correlation("temperature", "temperature").unwrap();
        assert!(result.degenerate);
        assert_eq!(result.r, 0.0);
    }

    #[test]
    fn test_discover_correlations() {
        let found = sample().discover_correlations().unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].column_b, Column::Humidity);
        assert_eq!(found[1].column_b, Column::Precipitation);
    }

    #[test]
    fn test_weather_probability() {
        let dist = sample().weather_probability("Tokyo").unwrap();
        assert_eq!(dist.total, 3);
        assert_eq!(dist.categories[0].category, "sunny");
        assert_eq!(dist.categories[0].count, 2);
        assert!((dist.get("rain").unwrap().proportion - 1.0 / 3.0).abs() < 1e-12);
        let sum: f64 = dist.categories.iter().map(|c| c.proportion).sum();
        assert!((sum - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_probability_empty_group() {
        assert!(matches!(
            sample().weather_probability("Kyoto"),
            Err(StatsError::EmptyGroup { value, .. }) if value == "Kyoto"
        ));
    }

    #[test]
    fn test_frequency_counts() {
        let table = sample().frequency_counts("condition").unwrap();
        let counts: Vec<(&str, usize)> = table
            .counts
            .iter()
            .map(|c| (c.category.as_str(), c.count))
            .collect();
        assert_eq!(counts, vec![("snow", 1), ("sunny", 3), ("cloudy", 1), ("rain", 2)]);
    }

    #[test]
    fn test_mode_reports_ties() {
        let e = engine(vec![
            record("Tokyo", "2024-01-01", 5.0, "sunny"),
            record("Tokyo", "2024-01-02", 7.0, "sunny"),
            record("Tokyo", "2024-01-03", 7.0, "sunny"),
            record("Tokyo", "2024-01-04", 5.0, "sunny"),
        ]);
        let mode = e.mode("temperature").unwrap();
        assert_eq!(mode.values, vec![5.0, 7.0]);
        assert_eq!(mode.count, 2);
        assert!(mode.is_tied());
    }

    #[test]
    fn test_trend_orders_by_date() {
        let e = engine(vec![
            record("Tokyo", "2024-07-01", 30.0, "sunny"),
            record("Tokyo", "2024-01-01", 2.0, "sunny"),
            record("Tokyo", "2024-08-01", 32.0, "sunny"),
            record("Tokyo", "2024-02-01", 4.0, "sunny"),
        ]);
        let trend = e.trend("temperature").unwrap();
        assert_eq!(trend.first_half_mean, 3.0);
        assert_eq!(trend.second_half_mean, 31.0);
        assert_eq!(trend.direction, TrendDirection::Rising);

        let single = engine(vec![record("Tokyo", "2024-01-01", 2.0, "sunny")]);
        assert!(matches!(single.trend("temperature"), Err(StatsError::EmptyTable)));
    }

    #[test]
    fn test_monthly_narrative_facts() {
        let facts = sample().monthly_narrative_facts("Tokyo", 7).unwrap();
        let average = 52.0 / 3.0;
        assert_eq!(facts.temperature, 28.0);
        assert_eq!(facts.condition, "sunny");
        assert!((facts.city_average_temperature - average).abs() < 1e-9);
        assert!((facts.deviation_from_city_average - (28.0 - average)).abs() < 1e-9);
        assert_eq!(facts.feature, MonthlyFeature::NotablyWarm);
        assert_eq!(facts.temperature_band, TemperatureBand::Warm);
        assert!(facts.narrative().contains("notably warm month"));

        let january = sample().monthly_narrative_facts("Tokyo", 1).unwrap();
        assert_eq!(january.feature, MonthlyFeature::NotablyCold);
    }

    #[test]
    fn test_monthly_facts_picks_first_matching_row() {
        let e = engine(vec![
            record("Tokyo", "2024-07-20", 31.0, "sunny"),
            record("Tokyo", "2024-07-01", 25.0, "rain"),
        ]);
        let facts = e.monthly_narrative_facts("Tokyo", 7).unwrap();
        assert_eq!(facts.temperature, 31.0);
        assert_eq!(facts.feature, MonthlyFeature::NearAverage);
    }

    #[test]
    fn test_monthly_facts_no_match() {
        assert!(matches!(
            sample().monthly_narrative_facts("Tokyo", 3),
            Err(StatsError::NoMatchingRecord { month: 3, .. })
        ));
    }
}
