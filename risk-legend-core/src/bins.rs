use risk_legend_common::{ConfusionConfig, LegendError, Result};
use serde::{Deserialize, Serialize};

/// Fixed classification bins, e.g. `[0, 0.01, 0.25, 0.50, 0.75, 1]`.
///
/// Bins are right-closed `(a, b]` by default, so a value equal to the first
/// edge is left unclassified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinEdges {
    edges: Vec<f64>,
    labels: Vec<String>,
    right_closed: bool,
}

impl BinEdges {
    pub fn new(edges: Vec<f64>, labels: Vec<String>, right_closed: bool) -> Result<Self> {
        if edges.len() < 2 {
            return Err(LegendError::Config("need at least two bin edges".into()));
        }
        if edges.iter().any(|e| !e.is_finite()) {
            return Err(LegendError::Config("bin edges must be finite".into()));
        }
        if edges.windows(2).any(|w| w[0] >= w[1]) {
            return Err(LegendError::Config("bin edges must be strictly increasing".into()));
        }
        if labels.len() != edges.len() - 1 {
            return Err(LegendError::Config(format!(
                "{} bin edges need {} labels, got {}",
                edges.len(),
                edges.len() - 1,
                labels.len()
            )));
        }
        Ok(Self { edges, labels, right_closed })
    }

    pub fn from_config(cfg: &ConfusionConfig) -> Result<Self> {
        Self::new(cfg.edges.clone(), cfg.labels.clone(), cfg.right_closed)
    }

    pub fn edges(&self) -> &[f64] {
        &self.edges
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Index of the bin holding `value`, or `None` when it falls outside every bin.
    pub fn classify(&self, value: f64) -> Option<usize> {
        if value.is_nan() {
            return None;
        }
        self.edges.windows(2).position(|w| {
            if self.right_closed {
                value > w[0] && value <= w[1]
            } else {
                value >= w[0] && value < w[1]
            }
        })
    }

    pub fn label_of(&self, value: f64) -> Option<&str> {
        self.classify(value).map(|i| self.labels[i].as_str())
    }
}

impl Default for BinEdges {
    fn default() -> Self {
        let cfg = ConfusionConfig::default();
        Self { edges: cfg.edges, labels: cfg.labels, right_closed: cfg.right_closed }
    }
}
