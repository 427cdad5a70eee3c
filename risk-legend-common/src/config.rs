use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartitionConfig {
    #[serde(default = "default_decimal_places")]
    pub decimal_places: u32,
    #[serde(default = "default_intervals")]
    pub intervals: usize,
    #[serde(default)]
    pub anchor_zero: bool,
    #[serde(default)]
    pub strict_order: bool, // reject unsorted interval lists instead of re-sorting
}

fn default_decimal_places() -> u32 {
    2
}
fn default_intervals() -> usize {
    5
}

impl Default for PartitionConfig {
    fn default() -> Self {
        Self {
            decimal_places: default_decimal_places(),
            intervals: default_intervals(),
            anchor_zero: false,
            strict_order: false,
        }
    }
}

impl PartitionConfig {
    /// Apply one of the named partition profiles: "standard" or "fixed-zero".
    pub fn apply_profile(&mut self, name: &str) -> crate::Result<()> {
        match name {
            "standard" => {
                self.anchor_zero = false;
                self.decimal_places = 2;
            }
            "fixed-zero" => {
                self.anchor_zero = true;
                self.decimal_places = 2;
            }
            other => {
                return Err(crate::LegendError::Config(format!(
                    "unknown partition profile '{other}' (use standard or fixed-zero)"
                )))
            }
        }
        Ok(())
    }
}

/// How colours are written to legend rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorFormat {
    #[default]
    Hex,
    Rgba,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LegendConfig {
    #[serde(default = "default_style_delimiter")]
    pub style_delimiter: char,
    #[serde(default = "default_ranges_delimiter")]
    pub ranges_delimiter: char,
    #[serde(default = "default_values_delimiter")]
    pub values_delimiter: char, // wide value tables and description tables
    #[serde(default)]
    pub color_format: ColorFormat,
    #[serde(default = "default_description_code_column")]
    pub description_code_column: String,
    #[serde(default = "default_description_legend_column")]
    pub description_legend_column: String,
    #[serde(default = "default_first_id")]
    pub first_legend_id: u64,
    #[serde(default = "default_first_id")]
    pub first_row_id: u64,
    #[serde(default)]
    pub display_decimal_places: Option<u32>, // None keeps generated bounds as-is
}

fn default_style_delimiter() -> char {
    ';'
}
fn default_ranges_delimiter() -> char {
    '|'
}
fn default_values_delimiter() -> char {
    ','
}
fn default_description_code_column() -> String {
    "codigo".into()
}
fn default_description_legend_column() -> String {
    "legenda".into()
}
fn default_first_id() -> u64 {
    1
}

impl Default for LegendConfig {
    fn default() -> Self {
        Self {
            style_delimiter: default_style_delimiter(),
            ranges_delimiter: default_ranges_delimiter(),
            values_delimiter: default_values_delimiter(),
            color_format: ColorFormat::default(),
            description_code_column: default_description_code_column(),
            description_legend_column: default_description_legend_column(),
            first_legend_id: default_first_id(),
            first_row_id: default_first_id(),
            display_decimal_places: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfusionConfig {
    #[serde(default = "default_edges")]
    pub edges: Vec<f64>,
    #[serde(default = "default_labels")]
    pub labels: Vec<String>,
    #[serde(default = "default_right_closed")]
    pub right_closed: bool,
    #[serde(default = "default_column_patterns")]
    pub column_patterns: Vec<String>,
    #[serde(default = "default_histogram_bins")]
    pub histogram_bins: usize,
}

fn default_edges() -> Vec<f64> {
    vec![0.0, 0.01, 0.25, 0.50, 0.75, 1.0]
}
fn default_labels() -> Vec<String> {
    ["0.00 to 0.01", "0.01 to 0.25", "0.25 to 0.50", "0.50 to 0.75", "0.75 to 1"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}
fn default_right_closed() -> bool {
    true
}
fn default_column_patterns() -> Vec<String> {
    vec!["CL_ORIG".into(), "CL_N-0ORIG".into(), "N_ORIG".into()]
}
fn default_histogram_bins() -> usize {
    10
}

impl Default for ConfusionConfig {
    fn default() -> Self {
        Self {
            edges: default_edges(),
            labels: default_labels(),
            right_closed: default_right_closed(),
            column_patterns: default_column_patterns(),
            histogram_bins: default_histogram_bins(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    #[serde(default = "default_format")]
    pub format: String,
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
}

fn default_format() -> String {
    "csv".into()
}
fn default_output_dir() -> String {
    ".".into()
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            format: default_format(),
            output_dir: default_output_dir(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub partition: PartitionConfig,
    #[serde(default)]
    pub legend: LegendConfig,
    #[serde(default)]
    pub confusion: ConfusionConfig,
    #[serde(default)]
    pub export: ExportConfig,
}

impl Config {
    pub fn config_path() -> PathBuf {
        if let Ok(env_path) = std::env::var("RISK_LEGEND_CONFIG") {
            return PathBuf::from(env_path); // $RISK_LEGEND_CONFIG overrides default config path
        }
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("risk-legend")
            .join("config.toml")
    }

    pub fn load() -> crate::Result<Self> {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(path: &Path) -> crate::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let cfg: Self =
            toml::from_str(&content).map_err(|e| crate::LegendError::Config(e.to_string()))?;
        Ok(cfg)
    }

    pub fn save(&self) -> crate::Result<()> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> crate::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::LegendError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Config::load_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(cfg.partition.decimal_places, 2);
        assert_eq!(cfg.partition.intervals, 5);
        assert_eq!(cfg.legend.ranges_delimiter, '|');
        assert_eq!(cfg.legend.values_delimiter, ',');
        assert_eq!(cfg.legend.color_format, ColorFormat::Hex);
        assert_eq!(cfg.legend.description_legend_column, "legenda");
        assert_eq!(cfg.confusion.edges.len(), cfg.confusion.labels.len() + 1);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[partition]\nanchor_zero = true\n[legend]\nvalues_delimiter = \";\"\ncolor_format = \"rgba\"\n").unwrap();
        let cfg = Config::load_from(&path).unwrap();
        assert!(cfg.partition.anchor_zero);
        assert_eq!(cfg.partition.intervals, 5);
        assert_eq!(cfg.export.format, "csv");
        assert_eq!(cfg.legend.values_delimiter, ';');
        assert_eq!(cfg.legend.color_format, ColorFormat::Rgba);
        assert_eq!(cfg.legend.style_delimiter, ';');
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut cfg = Config::default();
        cfg.legend.display_decimal_places = Some(1);
        cfg.save_to(&path).unwrap();
        let back = Config::load_from(&path).unwrap();
        assert_eq!(back.legend.display_decimal_places, Some(1));
    }

    #[test]
    fn profiles() {
        let mut p = PartitionConfig::default();
        p.apply_profile("fixed-zero").unwrap();
        assert!(p.anchor_zero);
        p.apply_profile("standard").unwrap();
        assert!(!p.anchor_zero);
        assert!(p.apply_profile("bogus").is_err());
    }

    #[test]
    fn malformed_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[partition\n").unwrap();
        assert!(matches!(Config::load_from(&path), Err(crate::LegendError::Config(_))));
    }
}
