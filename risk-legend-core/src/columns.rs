use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnKind {
    Float,
    Other,
}

/// What the picker needs to know about a column; built by the table readers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSummary {
    pub name: String,
    pub kind: ColumnKind,
    pub all_within_unit: bool, // every non-null value lies in [0, 1]
}

impl ColumnSummary {
    /// Summarise parsed cells: a column is `Float` when every non-empty cell parsed.
    pub fn from_cells(name: &str, cells: &[Option<f64>], non_numeric: usize) -> Self {
        let numeric = non_numeric == 0 && cells.iter().any(Option::is_some);
        Self {
            name: name.to_owned(),
            kind: if numeric { ColumnKind::Float } else { ColumnKind::Other },
            all_within_unit: numeric && cells.iter().flatten().all(|v| (0.0..=1.0).contains(v)),
        }
    }
}

/// Finds the column holding the original indicator value.
///
/// Exact names are tried in list order; failing that, the right-most float
/// column whose values all lie in `[0, 1]` is taken.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColumnPicker {
    pub exact: Vec<String>,
}

impl ColumnPicker {
    pub fn new(exact: Vec<String>) -> Self {
        Self { exact }
    }

    pub fn pick<'a>(&self, columns: &'a [ColumnSummary]) -> Option<&'a str> {
        for wanted in &self.exact {
            if let Some(c) = columns.iter().find(|c| &c.name == wanted) {
                return Some(c.name.as_str());
            }
        }
        columns
            .iter()
            .rev()
            .find(|c| c.kind == ColumnKind::Float && c.all_within_unit)
            .map(|c| c.name.as_str())
    }

    /// Like `pick`, but never returns a column listed in `exclude`.
    pub fn pick_excluding<'a>(
        &self,
        columns: &'a [ColumnSummary],
        exclude: &[&str],
    ) -> Option<&'a str> {
        let remaining: Vec<ColumnSummary> =
            columns.iter().filter(|c| !exclude.contains(&c.name.as_str())).cloned().collect();
        let name = self.pick(&remaining)?.to_owned();
        columns.iter().find(|c| c.name == name).map(|c| c.name.as_str())
    }
}
