//! Numeric kernels over plain slices. Everything here is single-pass or
//! sort-based and allocation-light; the engine feeds them column values.

use crate::structs::StatSummary;
use std::collections::HashMap;
use std::hash::Hash;

/// Arithmetic mean, `None` for an empty slice.
pub fn mean(data: &[f64]) -> Option<f64> {
    if data.is_empty() {
        return None;
    }
    Some(data.iter().sum::<f64>() / data.len() as f64)
}

/// Calculates the median from a slice of values.
///
/// The values are sorted on a copy; for an even count the two central values
/// are averaged.
///
/// # Returns
///
/// Returns `None` for empty datasets.
pub fn median(data: &[f64]) -> Option<f64> {
    if data.is_empty() {
        return None;
    }

    let mut sorted_data = data.to_vec();
    sorted_data.sort_by(f64::total_cmp);

    let len = sorted_data.len();
    if len.is_multiple_of(2) {
        Some((sorted_data[len / 2 - 1] + sorted_data[len / 2]) / 2.0)
    } else {
        Some(sorted_data[len / 2])
    }
}

/// Sample variance (N-1 denominator). Zero for fewer than two values.
pub fn sample_variance(data: &[f64], mean: f64) -> f64 {
    if data.len() < 2 {
        return 0.0;
    }
    data.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (data.len() - 1) as f64
}

/// Calculates descriptive statistics for a slice of values.
///
/// # Arguments
///
/// * `data` - Values of one numeric column
///
/// # Returns
///
/// Returns a `StatSummary` with count, mean, median, min, max, sample
/// variance and sample standard deviation, or `None` when `data` is empty.
///
/// # Statistical Methods
///
/// - **Mean**: Arithmetic average of all values
/// - **Median**: Middle of the sorted values, average of the two central values for even counts
/// - **Variance**: Sample variance (N-1 denominator), exactly 0 for a single value
/// - **Min/Max**: Linear scan
pub fn summarize(data: &[f64]) -> Option<StatSummary> {
    let mean = mean(data)?;
    let median = median(data)?;
    let min = data.iter().fold(f64::INFINITY, |a, &b| a.min(b));
    let max = data.iter().fold(f64::NEG_INFINITY, |a, &b| a.max(b));
    let variance = sample_variance(data, mean);

    Some(StatSummary {
        count: data.len(),
        mean,
        median,
        max,
        min,
        std_dev: variance.sqrt(),
        variance,
    })
}

/// Pearson correlation coefficient of two equally long series.
///
/// Returns `None` when the series are empty, differ in length, or either is
/// constant (the coefficient is undefined).
pub fn pearson(xs: &[f64], ys: &[f64]) -> Option<f64> {
    if xs.len() != ys.len() {
        return None;
    }
    let xs = rescale(xs)?;
    let ys = rescale(ys)?;
    let mean_x = mean(&xs)?;
    let mean_y = mean(&ys)?;

    let mut numerator = 0.0;
    let mut sum_sq_x = 0.0;
    let mut sum_sq_y = 0.0;
    for (x, y) in xs.iter().zip(&ys) {
        let dx = x - mean_x;
        let dy = y - mean_y;
        numerator += dx * dy;
        sum_sq_x += dx * dx;
        sum_sq_y += dy * dy;
    }

    if sum_sq_x == 0.0 || sum_sq_y == 0.0 {
        return None;
    }
    Some(numerator / (sum_sq_x * sum_sq_y).sqrt())
}

/// Divides every value by the largest magnitude so the sums of squares in
/// [`pearson`] stay within range for any finite input. `None` for empty or
/// constant data.
fn rescale(data: &[f64]) -> Option<Vec<f64>> {
    let min = data.iter().fold(f64::INFINITY, |a, &b| a.min(b));
    let max = data.iter().fold(f64::NEG_INFINITY, |a, &b| a.max(b));
    if data.is_empty() || min == max {
        return None;
    }
    let scale = min.abs().max(max.abs());
    Some(data.iter().map(|x| x / scale).collect())
}

/// Counts occurrences of each item, keeping first-seen order.
pub fn frequencies<K, I>(items: I) -> Vec<(K, usize)>
where
    K: Eq + Hash + Clone,
    I: IntoIterator<Item = K>,
{
    let mut index: HashMap<K, usize> = HashMap::new();
    let mut counts: Vec<(K, usize)> = Vec::new();
    for item in items {
        match index.get(&item) {
            Some(&i) => counts[i].1 += 1,
            None => {
                index.insert(item.clone(), counts.len());
                counts.push((item, 1));
            }
        }
    }
    counts
}

/// Most frequent values and their count. Ties keep every tied value in
/// first-seen order. `None` for empty input.
pub fn modes(data: &[f64]) -> Option<(Vec<f64>, usize)> {
    // -0.0 and 0.0 are the same observation
    let keys = data.iter().map(|&x| {
        let normalized = if x == 0.0 { 0.0f64 } else { x };
        normalized.to_bits()
    });
    let counts = frequencies(keys);
    let top = counts.iter().map(|&(_, c)| c).max()?;
    let values = counts
        .into_iter()
        .filter(|&(_, c)| c == top)
        .map(|(bits, _)| f64::from_bits(bits))
        .collect();
    Some((values, top))
}

/// Means of the first and second halves of an ordered series, split at n/2.
/// Needs at least two values.
pub fn half_means(data: &[f64]) -> Option<(f64, f64)> {
    if data.len() < 2 {
        return None;
    }
    let (first, second) = data.split_at(data.len() / 2);
    Some((mean(first)?, mean(second)?))
}
