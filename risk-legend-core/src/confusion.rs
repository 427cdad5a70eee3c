use crate::bins::BinEdges;
use serde::{Deserialize, Serialize};

/// Cross-tabulation of original (rows) vs. estimated (columns) bin classes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    pub labels: Vec<String>,
    pub counts: Vec<Vec<u64>>,
    pub dropped: u64, // pairs where either side fell outside every bin
}

impl ConfusionMatrix {
    pub fn from_pairs(original: &[f64], estimated: &[f64], bins: &BinEdges) -> Self {
        let n = bins.len();
        let mut counts = vec![vec![0u64; n]; n];
        let mut dropped = 0u64;
        for (&o, &e) in original.iter().zip(estimated) {
            match (bins.classify(o), bins.classify(e)) {
                (Some(row), Some(col)) => counts[row][col] += 1,
                _ => dropped += 1,
            }
        }
        Self { labels: bins.labels().to_vec(), counts, dropped }
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().flatten().sum()
    }

    /// Each cell as a share of all classified pairs, rounded to 4 places then
    /// scaled to percent. All zeros when nothing was classified.
    pub fn percentages(&self) -> Vec<Vec<f64>> {
        let total = self.total();
        self.counts
            .iter()
            .map(|row| {
                row.iter()
                    .map(|&c| {
                        if total == 0 {
                            0.0
                        } else {
                            (c as f64 / total as f64 * 10_000.0).round() / 100.0
                        }
                    })
                    .collect()
            })
            .collect()
    }

    /// Share of classified pairs on the diagonal, 0-100.
    pub fn agreement_pct(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        let diagonal: u64 = (0..self.counts.len()).map(|i| self.counts[i][i]).sum();
        diagonal as f64 / total as f64 * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_and_drops() {
        let bins = BinEdges::default();
        let original = [0.1, 0.1, 0.6, 0.9, 0.0];
        let estimated = [0.1, 0.3, 0.6, 0.8, 0.5];
        let m = ConfusionMatrix::from_pairs(&original, &estimated, &bins);
        assert_eq!(m.total(), 4);
        assert_eq!(m.dropped, 1); // 0.0 is outside (0, 0.01]
        assert_eq!(m.counts[1][1], 1);
        assert_eq!(m.counts[1][2], 1);
        assert_eq!(m.counts[3][3], 1);
        assert_eq!(m.counts[4][4], 1);
        assert_eq!(m.agreement_pct(), 75.0);
    }

    #[test]
    fn percentages_sum_to_hundred() {
        let bins = BinEdges::default();
        let m = ConfusionMatrix::from_pairs(&[0.1, 0.3, 0.6, 0.9], &[0.1, 0.3, 0.6, 0.2], &bins);
        let pct = m.percentages();
        let sum: f64 = pct.iter().flatten().sum();
        assert!((sum - 100.0).abs() < 1e-9);
        assert_eq!(pct[1][1], 25.0);
    }

    #[test]
    fn thirds_round_to_four_places() {
        let bins = BinEdges::default();
        let m = ConfusionMatrix::from_pairs(&[0.1, 0.3, 0.6], &[0.1, 0.3, 0.6], &bins);
        assert_eq!(m.percentages()[1][1], 33.33);
    }

    #[test]
    fn empty_matrix() {
        let m = ConfusionMatrix::from_pairs(&[], &[], &BinEdges::default());
        assert_eq!(m.total(), 0);
        assert_eq!(m.agreement_pct(), 0.0);
        assert!(m.percentages().iter().flatten().all(|&p| p == 0.0));
    }
}
