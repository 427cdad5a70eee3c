use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// One `{indicator_id, min, max}` row. Empty cells arrive as `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorRange {
    pub indicator_id: String,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl IndicatorRange {
    pub fn new(indicator_id: impl Into<String>, min: Option<f64>, max: Option<f64>) -> Self {
        Self { indicator_id: indicator_id.into(), min, max }
    }

    pub fn has_bounds(&self) -> bool {
        matches!((self.min, self.max), (Some(a), Some(b)) if a.is_finite() && b.is_finite())
    }
}

fn digit_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d").expect("static regex"))
}

/// Code of a wide-table column: `"1203-2050"` and `"1203-2050-b"` both map to
/// `"1203"`. Columns without any digit (ids, notes) have no code.
pub fn indicator_code(column: &str) -> Option<&str> {
    let column = column.trim();
    if !digit_re().is_match(column) {
        return None;
    }
    let code = column.split('-').next().unwrap_or(column).trim();
    if code.is_empty() {
        None
    } else {
        Some(code)
    }
}

/// Running per-code minimum and maximum, in first-seen order.
#[derive(Debug, Clone, Default)]
pub struct RangeAccumulator {
    entries: Vec<(String, f64, f64)>,
}

impl RangeAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, code: &str, value: f64) {
        self.add_range(code, value, value);
    }

    pub fn add_range(&mut self, code: &str, min: f64, max: f64) {
        if min.is_nan() || max.is_nan() {
            return;
        }
        match self.entries.iter_mut().find(|(c, _, _)| c == code) {
            Some(entry) => {
                entry.1 = entry.1.min(min);
                entry.2 = entry.2.max(max);
            }
            None => self.entries.push((code.to_owned(), min, max)),
        }
    }

    pub fn merge(&mut self, other: RangeAccumulator) {
        for (code, min, max) in other.entries {
            self.add_range(&code, min, max);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn sort(&mut self) {
        self.entries.sort_by(|a, b| a.0.cmp(&b.0));
    }

    pub fn into_ranges(self) -> Vec<IndicatorRange> {
        self.entries
            .into_iter()
            .map(|(code, min, max)| IndicatorRange::new(code, Some(min), Some(max)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes() {
        assert_eq!(indicator_code("1203-2050"), Some("1203"));
        assert_eq!(indicator_code("1203-2050-b"), Some("1203"));
        assert_eq!(indicator_code("77"), Some("77"));
        assert_eq!(indicator_code("id"), None);
        assert_eq!(indicator_code("notes-x"), None);
    }

    #[test]
    fn accumulates_min_max_per_code() {
        let mut acc = RangeAccumulator::new();
        acc.add("12", 0.4);
        acc.add("7", 3.0);
        acc.add("12", -0.1);
        acc.add("12", 0.9);
        acc.add("12", f64::NAN);
        let ranges = acc.into_ranges();
        assert_eq!(ranges.len(), 2);
        assert_eq!(ranges[0], IndicatorRange::new("12", Some(-0.1), Some(0.9)));
        assert_eq!(ranges[1], IndicatorRange::new("7", Some(3.0), Some(3.0)));
    }

    #[test]
    fn merge_and_sort() {
        let mut a = RangeAccumulator::new();
        a.add("2", 1.0);
        let mut b = RangeAccumulator::new();
        b.add("1", 5.0);
        b.add("2", 4.0);
        a.merge(b);
        a.sort();
        let ranges = a.into_ranges();
        assert_eq!(ranges[0].indicator_id, "1");
        assert_eq!(ranges[1], IndicatorRange::new("2", Some(1.0), Some(4.0)));
    }

    #[test]
    fn bounds_presence() {
        assert!(IndicatorRange::new("1", Some(0.0), Some(1.0)).has_bounds());
        assert!(!IndicatorRange::new("1", None, Some(1.0)).has_bounds());
        assert!(!IndicatorRange::new("1", Some(f64::NAN), Some(1.0)).has_bounds());
    }
}
