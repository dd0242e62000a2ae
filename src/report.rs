use crate::error::{Result, StatsError};
use crate::structs::{
    CorrelationResult, FrequencyTable, GroupComparison, ModeResult, MonthlyFacts, OutputFormat,
    ProbabilityDistribution, ReportConfig, SeasonalAverages, StatSummary, TrendResult,
};
use serde::Serialize;

/// A query result that can be laid out as rows of text.
pub trait Tabular {
    fn headers(&self) -> Vec<String>;
    fn rows(&self, precision: usize) -> Vec<Vec<String>>;
}

/// Renders a result in the configured format.
///
/// # Errors
/// Returns error if CSV or JSON serialization fails.
pub fn render<T>(value: &T, config: &ReportConfig) -> Result<String>
where
    T: Tabular + Serialize + ?Sized,
{
    match config.format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(value)?),
        OutputFormat::Csv => render_csv(value, config.precision),
        OutputFormat::Table => Ok(render_table(value, config.precision)),
    }
}

fn render_csv<T: Tabular + ?Sized>(value: &T, precision: usize) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(value.headers())?;
    for row in value.rows(precision) {
        writer.write_record(row)?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| StatsError::Data(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| StatsError::Data(e.to_string()))
}

fn render_table<T: Tabular + ?Sized>(value: &T, precision: usize) -> String {
    let headers = value.headers();
    let rows = value.rows(precision);

    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let line = |cells: &[String]| {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, &width)| format!("{:<width$}", cell, width = width))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let mut out = vec![line(headers.as_slice())];
    out.push(
        widths
            .iter()
            .map(|&w| "-".repeat(w))
            .collect::<Vec<_>>()
            .join("  "),
    );
    out.extend(rows.iter().map(|row| line(row.as_slice())));
    out.join("\n")
}

fn num(value: f64, precision: usize) -> String {
    format!("{:.*}", precision, value)
}

fn headers(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| n.to_string()).collect()
}

impl Tabular for StatSummary {
    fn headers(&self) -> Vec<String> {
        headers(&["statistic", "value"])
    }

    fn rows(&self, precision: usize) -> Vec<Vec<String>> {
        [
            ("mean", self.mean),
            ("median", self.median),
            ("max", self.max),
            ("min", self.min),
            ("std_dev", self.std_dev),
            ("variance", self.variance),
        ]
        .into_iter()
        .map(|(name, v)| vec![name.to_string(), num(v, precision)])
        .chain(std::iter::once(vec!["count".to_string(), self.count.to_string()]))
        .collect()
    }
}

impl Tabular for GroupComparison {
    fn headers(&self) -> Vec<String> {
        vec![
            self.group_key.name().to_string(),
            "count".to_string(),
            "mean".to_string(),
            "max".to_string(),
            "min".to_string(),
            "std_dev".to_string(),
        ]
    }

    fn rows(&self, precision: usize) -> Vec<Vec<String>> {
        self.groups
            .iter()
            .map(|g| {
                vec![
                    g.group.clone(),
                    g.count.to_string(),
                    num(g.mean, precision),
                    num(g.max, precision),
                    num(g.min, precision),
                    num(g.std_dev, precision),
                ]
            })
            .collect()
    }
}

impl Tabular for SeasonalAverages {
    fn headers(&self) -> Vec<String> {
        headers(&["season", "average"])
    }

    fn rows(&self, precision: usize) -> Vec<Vec<String>> {
        self.iter()
            .map(|(season, v)| vec![season.name().to_string(), num(v, precision)])
            .collect()
    }
}

impl Tabular for [CorrelationResult] {
    fn headers(&self) -> Vec<String> {
        headers(&["column_a", "column_b", "r", "strength", "direction", "interpretation"])
    }

    fn rows(&self, precision: usize) -> Vec<Vec<String>> {
        self.iter()
            .map(|c| {
                // r is 3 decimals unless the caller asked for more
                let r = if c.degenerate {
                    "n/a".to_string()
                } else {
                    num(c.r, precision.max(3))
                };
                vec![
                    c.column_a.name().to_string(),
                    c.column_b.name().to_string(),
                    r,
                    c.strength.label().to_string(),
                    c.direction.label().to_string(),
                    c.interpretation().to_string(),
                ]
            })
            .collect()
    }
}

impl Tabular for CorrelationResult {
    fn headers(&self) -> Vec<String> {
        std::slice::from_ref(self).headers()
    }

    fn rows(&self, precision: usize) -> Vec<Vec<String>> {
        std::slice::from_ref(self).rows(precision)
    }
}

impl Tabular for ProbabilityDistribution {
    fn headers(&self) -> Vec<String> {
        vec![
            self.column.name().to_string(),
            "count".to_string(),
            "probability".to_string(),
            "percent".to_string(),
        ]
    }

    fn rows(&self, precision: usize) -> Vec<Vec<String>> {
        self.categories
            .iter()
            .map(|c| {
                vec![
                    c.category.clone(),
                    c.count.to_string(),
                    num(c.proportion, precision.max(3)),
                    format!("{:.1}%", c.percent()),
                ]
            })
            .collect()
    }
}

impl Tabular for FrequencyTable {
    fn headers(&self) -> Vec<String> {
        vec![self.column.name().to_string(), "count".to_string()]
    }

    fn rows(&self, _precision: usize) -> Vec<Vec<String>> {
        self.counts
            .iter()
            .map(|c| vec![c.category.clone(), c.count.to_string()])
            .collect()
    }
}

impl Tabular for ModeResult {
    fn headers(&self) -> Vec<String> {
        headers(&["mode", "count"])
    }

    fn rows(&self, precision: usize) -> Vec<Vec<String>> {
        self.values
            .iter()
            .map(|&v| vec![num(v, precision), self.count.to_string()])
            .collect()
    }
}

impl Tabular for TrendResult {
    fn headers(&self) -> Vec<String> {
        headers(&["first_half_mean", "second_half_mean", "direction"])
    }

    fn rows(&self, precision: usize) -> Vec<Vec<String>> {
        vec![vec![
            num(self.first_half_mean, precision),
            num(self.second_half_mean, precision),
            self.direction.label().to_string(),
        ]]
    }
}

impl Tabular for MonthlyFacts {
    fn headers(&self) -> Vec<String> {
        headers(&["fact", "value"])
    }

    fn rows(&self, precision: usize) -> Vec<Vec<String>> {
        vec![
            vec!["city".to_string(), self.city.clone()],
            vec!["month".to_string(), self.month.to_string()],
            vec!["date".to_string(), self.date.to_string()],
            vec!["temperature".to_string(), num(self.temperature, precision)],
            vec!["precipitation".to_string(), num(self.precipitation, precision)],
            vec!["humidity".to_string(), num(self.humidity, precision)],
            vec!["condition".to_string(), self.condition.clone()],
            vec![
                "deviation_from_city_average".to_string(),
                num(self.deviation_from_city_average, precision),
            ],
            vec!["feature".to_string(), self.feature.label().to_string()],
        ]
    }
}
