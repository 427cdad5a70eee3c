use crate::legend::Legend;
use risk_legend_common::{LegendError, Result};

/// Indicator description table: free-form columns, one of them holding the
/// indicator code.
#[derive(Debug, Clone, PartialEq)]
pub struct DescriptionTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

// "12", " 12 " and "12.0" all name indicator 12
fn same_code(a: &str, b: &str) -> bool {
    let (a, b) = (a.trim(), b.trim());
    if a == b {
        return true;
    }
    match (a.parse::<f64>(), b.parse::<f64>()) {
        (Ok(x), Ok(y)) => x == y,
        _ => false,
    }
}

impl DescriptionTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { headers, rows }
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h.trim() == name)
    }

    /// Write each row's legend id into `legend_column` (added when absent),
    /// using the first legend built for the row's code. Rows without a match
    /// get an empty cell; their codes are logged and returned once each.
    pub fn link_legends(
        &mut self,
        legends: &[Legend],
        code_column: &str,
        legend_column: &str,
    ) -> Result<Vec<String>> {
        let code_idx = self.column_index(code_column).ok_or_else(|| {
            LegendError::Other(format!("description table has no '{code_column}' column"))
        })?;
        let legend_idx = match self.column_index(legend_column) {
            Some(i) => i,
            None => {
                self.headers.push(legend_column.to_owned());
                self.headers.len() - 1
            }
        };
        let width = self.headers.len();
        let mut unmatched: Vec<String> = Vec::new();
        for row in self.rows.iter_mut() {
            row.resize(width.max(row.len()), String::new());
            let code = row[code_idx].trim().to_owned();
            let legend = legends.iter().find(|l| same_code(&l.indicator_id, &code));
            row[legend_idx] = match legend {
                Some(l) => l.legend_id.to_string(),
                None => {
                    if !code.is_empty() && !unmatched.contains(&code) {
                        tracing::warn!(code = %code, "no legend for indicator in description table");
                        unmatched.push(code);
                    }
                    String::new()
                }
            };
        }
        Ok(unmatched)
    }
}
