use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistogramBin {
    pub range_start: f64,
    pub range_end: f64,
    pub count: u64,
    pub fraction: f64, // share of all values, 0-1
}

/// Equal-width histogram over the data's own min/max. NaNs are skipped.
pub fn build_histogram(values: &[f64], bins: usize) -> Vec<HistogramBin> {
    let values: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    if values.is_empty() || bins == 0 { return Vec::new(); }
    let total = values.len() as f64;
    let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    if (max - min).abs() < f64::EPSILON {
        return vec![HistogramBin { range_start: min, range_end: max, count: values.len() as u64, fraction: 1.0 }];
    }
    let width = (max - min) / bins as f64;
    let mut counts = vec![0u64; bins];
    for &v in &values {
        let idx = ((v - min) / width) as usize;
        let idx = idx.min(bins - 1);
        counts[idx] += 1;
    }
    counts.iter().enumerate().map(|(i, &c)| HistogramBin {
        range_start: min + i as f64 * width,
        range_end: if i + 1 == bins { max } else { min + (i + 1) as f64 * width },
        count: c,
        fraction: c as f64 / total,
    }).collect()
}

/// Histogram of `original - estimated` for each pair where both sides are present.
pub fn difference_histogram(original: &[f64], estimated: &[f64], bins: usize) -> Vec<HistogramBin> {
    let diffs: Vec<f64> = original.iter().zip(estimated).map(|(o, e)| o - e).collect();
    build_histogram(&diffs, bins)
}
