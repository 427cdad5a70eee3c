//! Splitting a value range into contiguous legend intervals.
//!
//! Adjacent intervals never share a boundary value: each low sits exactly one
//! continuity step (`10^-decimal_places`) above the previous high, so a value
//! rounded to the legend precision falls into exactly one interval.

use risk_legend_common::{LegendError, RangeFault, Result};
use serde::{Deserialize, Serialize};

pub const DEFAULT_DECIMAL_PLACES: u32 = 2;

// beyond 2^52 an f64 has no fractional digits left to truncate
const NO_FRACTION_LIMIT: f64 = 4_503_599_627_370_496.0;
// beyond 2^53 scaled units, adjacent steps are no longer distinct f64 values
const NO_STEP_LIMIT: f64 = 9_007_199_254_740_992.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Interval {
    pub low: f64,
    pub high: f64,
}

impl Interval {
    pub fn new(low: f64, high: f64) -> Self {
        Self { low, high }
    }
}

impl From<(f64, f64)> for Interval {
    fn from((low, high): (f64, f64)) -> Self {
        Self { low, high }
    }
}

/// How `validate_continuity` treats input that is not sorted by `low`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ContinuityMode {
    /// Check a sorted copy.
    #[default]
    Tolerant,
    /// Check in the given order and report every out-of-order interval.
    Strict,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionOptions {
    pub decimal_places: u32,
    /// Put a boundary exactly on zero when the range straddles it.
    pub anchor_zero: bool,
}

impl Default for PartitionOptions {
    fn default() -> Self {
        Self {
            decimal_places: DEFAULT_DECIMAL_PLACES,
            anchor_zero: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ContinuityViolation {
    NotIncreasing { index: usize, low: f64, high: f64 },
    Gap { index: usize, low: f64, expected: String, previous_high: f64 },
    OutOfOrder { index: usize, low: f64, previous_low: f64 },
    Unrepresentable { index: usize },
}

impl ContinuityViolation {
    /// 1-based position of the offending interval.
    pub fn index(&self) -> usize {
        match self {
            ContinuityViolation::NotIncreasing { index, .. }
            | ContinuityViolation::Gap { index, .. }
            | ContinuityViolation::OutOfOrder { index, .. }
            | ContinuityViolation::Unrepresentable { index } => *index,
        }
    }
}

impl std::fmt::Display for ContinuityViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContinuityViolation::NotIncreasing { index, low, high } => {
                write!(f, "interval {index}: low ({low}) must be less than high ({high})")
            }
            ContinuityViolation::Gap { index, low, expected, previous_high } => write!(
                f,
                "interval {index}: not continuous, low {low} should be {expected} to follow previous high {previous_high}"
            ),
            ContinuityViolation::OutOfOrder { index, low, previous_low } => write!(
                f,
                "interval {index}: out of order, low {low} is below previous low {previous_low}"
            ),
            ContinuityViolation::Unrepresentable { index } => {
                write!(f, "interval {index}: invalid numeric values for continuity validation")
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContinuityReport {
    pub violations: Vec<ContinuityViolation>,
}

impl ContinuityReport {
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn errors(&self) -> Vec<String> {
        self.violations.iter().map(|v| v.to_string()).collect()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Partitioner {
    options: PartitionOptions,
}

impl Partitioner {
    pub fn new(options: PartitionOptions) -> Self {
        Self { options }
    }

    pub fn with_decimal_places(decimal_places: u32) -> Self {
        Self::new(PartitionOptions { decimal_places, ..PartitionOptions::default() })
    }

    pub fn options(&self) -> PartitionOptions {
        self.options
    }

    pub fn decimal_places(&self) -> u32 {
        self.options.decimal_places
    }

    /// The continuity step, `10^-decimal_places`.
    pub fn step(&self) -> f64 {
        1.0 / self.scale()
    }

    fn scale(&self) -> f64 {
        10f64.powi(self.options.decimal_places as i32)
    }

    /// Split `[min, max]` into `n` contiguous intervals.
    ///
    /// The first low is `min` and the last high is `max`, both exactly. Inner
    /// highs are `min + (i + 1) * (max - min) / n` rounded to the configured
    /// decimal places, and every following low is the previous high plus one
    /// step. NaN or infinite bounds fail with `InvalidRange` so callers can
    /// substitute null intervals for missing data.
    pub fn generate(&self, min: f64, max: f64, n: usize) -> Result<Vec<Interval>> {
        if n == 0 {
            return Err(LegendError::InvalidCount(n));
        }
        if !min.is_finite() || !max.is_finite() {
            return Err(LegendError::InvalidRange { min, max, reason: RangeFault::NonFinite });
        }
        if min >= max {
            return Err(LegendError::InvalidRange { min, max, reason: RangeFault::Inverted });
        }
        if min.abs().max(max.abs()) * self.scale() >= NO_STEP_LIMIT {
            return Err(LegendError::InvalidRange { min, max, reason: RangeFault::Unrepresentable });
        }
        // n intervals need n - 1 steps between them
        if (n - 1) as f64 > (max - min) * self.scale() + 1.0 {
            return Err(LegendError::InvalidRange { min, max, reason: RangeFault::TooNarrow });
        }
        let intervals = if self.options.anchor_zero && n >= 2 && min < 0.0 && max > 0.0 {
            // extra interval of an odd count goes to the non-negative side
            let negative = n / 2;
            let mut out = self.proportional(min, -self.step(), negative);
            out.extend(self.proportional(0.0, max, n - negative));
            out
        } else {
            self.proportional(min, max, n)
        };
        let report = self.validate_continuity(&intervals, ContinuityMode::Strict)?;
        if !report.is_valid() {
            tracing::debug!(min, max, n, errors = ?report.errors(), "partition rejected");
            return Err(LegendError::InvalidRange { min, max, reason: RangeFault::TooNarrow });
        }
        Ok(intervals)
    }

    fn proportional(&self, min: f64, max: f64, n: usize) -> Vec<Interval> {
        let step_size = (max - min) / n as f64;
        let mut out = Vec::with_capacity(n);
        let mut low = min;
        for i in 0..n {
            let high = if i + 1 == n {
                max
            } else {
                self.round(min + (i + 1) as f64 * step_size)
            };
            out.push(Interval { low, high });
            low = self.next_low(high);
        }
        out
    }

    fn round(&self, value: f64) -> f64 {
        let scale = self.scale();
        let out = (value * scale).round() / scale;
        if out == 0.0 {
            0.0
        } else {
            out
        }
    }

    // `high` is expected to already sit on the decimal grid
    fn next_low(&self, high: f64) -> f64 {
        let scale = self.scale();
        let out = ((high * scale).round() + 1.0) / scale;
        if out == 0.0 {
            0.0
        } else {
            out
        }
    }

    /// Check that every interval is increasing and that each low is exactly one
    /// step above the previous high. Only an empty list is an error; every
    /// other problem is returned in the report.
    pub fn validate_continuity(
        &self,
        intervals: &[Interval],
        mode: ContinuityMode,
    ) -> Result<ContinuityReport> {
        if intervals.is_empty() {
            return Err(LegendError::EmptyIntervals);
        }
        let mut ordered = intervals.to_vec();
        let mut violations = Vec::new();
        match mode {
            ContinuityMode::Tolerant => ordered.sort_by(|a, b| a.low.total_cmp(&b.low)),
            ContinuityMode::Strict => {
                for (i, pair) in ordered.windows(2).enumerate() {
                    if pair[1].low < pair[0].low {
                        violations.push(ContinuityViolation::OutOfOrder {
                            index: i + 2,
                            low: pair[1].low,
                            previous_low: pair[0].low,
                        });
                    }
                }
            }
        }
        for (i, iv) in ordered.iter().enumerate() {
            let index = i + 1;
            // negated so NaN bounds are reported too
            if !(iv.low < iv.high) {
                violations.push(ContinuityViolation::NotIncreasing {
                    index,
                    low: iv.low,
                    high: iv.high,
                });
            }
            if i == 0 {
                continue;
            }
            let previous_high = ordered[i - 1].high;
            match gap_check(previous_high, iv.low, self.options.decimal_places) {
                Some((true, _)) => {}
                Some((false, expected)) => violations.push(ContinuityViolation::Gap {
                    index,
                    low: iv.low,
                    expected,
                    previous_high,
                }),
                None => violations.push(ContinuityViolation::Unrepresentable { index }),
            }
        }
        violations.sort_by_key(|v| v.index());
        Ok(ContinuityReport { violations })
    }

    /// Truncate every bound to the decimal budget and pull each low up to the
    /// previous high plus one step. Returns the repaired copy with its report.
    pub fn repair_continuity(
        &self,
        intervals: &[Interval],
    ) -> Result<(Vec<Interval>, ContinuityReport)> {
        if intervals.is_empty() {
            return Err(LegendError::EmptyIntervals);
        }
        let d = self.options.decimal_places;
        let mut fixed: Vec<Interval> = intervals
            .iter()
            .map(|iv| Interval { low: truncate(iv.low, d), high: truncate(iv.high, d) })
            .collect();
        fixed.sort_by(|a, b| a.low.total_cmp(&b.low));
        for i in 1..fixed.len() {
            fixed[i].low = self.next_low(fixed[i - 1].high);
        }
        let report = self.validate_continuity(&fixed, ContinuityMode::Strict)?;
        Ok((fixed, report))
    }
}

/// Truncate toward zero at `decimal_places`. Never returns `-0.0`.
///
/// Products within a few ULPs of a whole number are taken as that number, so
/// `truncate(0.29, 2)` stays `0.29` even though `0.29 * 100` is slightly
/// below 29 in binary, and the helper is idempotent.
pub fn truncate(value: f64, decimal_places: u32) -> f64 {
    if !value.is_finite() {
        return value;
    }
    let scale = 10f64.powi(decimal_places as i32);
    let scaled = value * scale;
    if !scaled.is_finite() || scaled.abs() >= NO_FRACTION_LIMIT {
        return value;
    }
    let nearest = scaled.round();
    let whole = if (scaled - nearest).abs() <= f64::EPSILON * 8.0 * nearest.abs().max(1.0) {
        nearest
    } else {
        scaled.trunc()
    };
    let out = whole / scale;
    if out == 0.0 {
        0.0
    } else {
        out
    }
}

/// A decimal `units * 10^-scale` read from the shortest round-trip text of an f64.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ExactDecimal {
    units: i128,
    scale: u32,
}

impl ExactDecimal {
    fn from_f64(value: f64) -> Option<Self> {
        if !value.is_finite() {
            return None;
        }
        // f64 Display is the shortest round-trip form and never uses exponents
        let text = value.to_string();
        let (negative, digits) = match text.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, text.as_str()),
        };
        let (whole, fraction) = digits.split_once('.').unwrap_or((digits, ""));
        let mut units: i128 = 0;
        for c in whole.chars().chain(fraction.chars()) {
            let digit = c.to_digit(10)? as i128;
            units = units.checked_mul(10)?.checked_add(digit)?;
        }
        Some(Self {
            units: if negative { -units } else { units },
            scale: fraction.len() as u32,
        })
    }

    fn units_at(self, scale: u32) -> Option<i128> {
        let factor = 10i128.checked_pow(scale.checked_sub(self.scale)?)?;
        self.units.checked_mul(factor)
    }
}

fn format_units(units: i128, scale: u32) -> String {
    let sign = if units < 0 { "-" } else { "" };
    let digits = units.unsigned_abs().to_string();
    if scale == 0 {
        return format!("{sign}{digits}");
    }
    let scale = scale as usize;
    let padded = format!("{digits:0>width$}", width = scale + 1);
    let (whole, fraction) = padded.split_at(padded.len() - scale);
    format!("{sign}{whole}.{fraction}")
}

/// Whether `low == previous_high + 10^-decimal_places` in exact decimal
/// arithmetic, plus the expected low as text. `None` when either value cannot
/// be represented.
fn gap_check(previous_high: f64, low: f64, decimal_places: u32) -> Option<(bool, String)> {
    let prev = ExactDecimal::from_f64(previous_high)?;
    let cur = ExactDecimal::from_f64(low)?;
    let scale = prev.scale.max(cur.scale).max(decimal_places);
    let step = 10i128.checked_pow(scale - decimal_places)?;
    let expected = prev.units_at(scale)?.checked_add(step)?;
    let actual = cur.units_at(scale)?;
    Some((actual == expected, format_units(expected, scale)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p() -> Partitioner {
        Partitioner::default()
    }

    fn pairs(intervals: &[Interval]) -> Vec<(f64, f64)> {
        intervals.iter().map(|iv| (iv.low, iv.high)).collect()
    }

    #[test]
    fn unit_range_in_five() {
        let out = p().generate(0.0, 1.0, 5).unwrap();
        assert_eq!(
            pairs(&out),
            vec![(0.0, 0.2), (0.21, 0.4), (0.41, 0.6), (0.61, 0.8), (0.81, 1.0)]
        );
    }

    #[test]
    fn generated_sequences_hold_all_laws() {
        let ranges = [
            (0.0, 1.0),
            (-3.7, 12.25),
            (10.0, 1000.0),
            (0.123, 0.987),
            (-1.0, -0.1),
            (-0.0347, 0.9),
        ];
        for &(min, max) in &ranges {
            for n in 1..=7 {
                let out = p().generate(min, max, n).unwrap();
                assert_eq!(out.len(), n);
                assert_eq!(out[0].low, min);
                assert_eq!(out[n - 1].high, max);
                for pair in out.windows(2) {
                    assert!(pair[1].low > pair[0].low);
                    assert!(pair[1].high > pair[0].high);
                    assert_eq!(gap_check(pair[0].high, pair[1].low, 2).map(|g| g.0), Some(true));
                }
                let report = p().validate_continuity(&out, ContinuityMode::Tolerant).unwrap();
                assert!(report.is_valid(), "{min}..{max}/{n}: {:?}", report.errors());
                assert!(report.errors().is_empty());
            }
        }
    }

    #[test]
    fn single_interval_is_the_range() {
        assert_eq!(pairs(&p().generate(0.5, 0.75, 1).unwrap()), vec![(0.5, 0.75)]);
    }

    #[test]
    fn one_decimal_place() {
        let out = Partitioner::with_decimal_places(1).generate(0.0, 10.0, 4).unwrap();
        assert_eq!(pairs(&out), vec![(0.0, 2.5), (2.6, 5.0), (5.1, 7.5), (7.6, 10.0)]);
    }

    #[test]
    fn corrupted_high_is_reported_on_next_interval() {
        let mut out = p().generate(0.0, 1.0, 5).unwrap();
        out[0].high = 0.19;
        let report = p().validate_continuity(&out, ContinuityMode::Tolerant).unwrap();
        assert!(!report.is_valid());
        assert_eq!(report.violations.len(), 1);
        assert_eq!(report.violations[0].index(), 2);
        let errors = report.errors();
        assert!(errors[0].starts_with("interval 2:"), "{}", errors[0]);
        assert!(errors[0].contains("0.20"), "{}", errors[0]);
    }

    #[test]
    fn inverted_interval_message() {
        let report = p()
            .validate_continuity(&[Interval::new(0.5, 0.5)], ContinuityMode::Tolerant)
            .unwrap();
        assert_eq!(report.errors(), vec!["interval 1: low (0.5) must be less than high (0.5)"]);
    }

    #[test]
    fn tolerant_sorts_strict_rejects() {
        let mut out = p().generate(0.0, 1.0, 5).unwrap();
        out.reverse();
        let tolerant = p().validate_continuity(&out, ContinuityMode::Tolerant).unwrap();
        assert!(tolerant.is_valid());
        let strict = p().validate_continuity(&out, ContinuityMode::Strict).unwrap();
        assert!(!strict.is_valid());
        assert!(strict
            .violations
            .iter()
            .any(|v| matches!(v, ContinuityViolation::OutOfOrder { .. })));
        // caller's order untouched
        assert_eq!(out[0].high, 1.0);
    }

    #[test]
    fn empty_list_is_an_error() {
        assert!(matches!(
            p().validate_continuity(&[], ContinuityMode::Tolerant),
            Err(LegendError::EmptyIntervals)
        ));
    }

    #[test]
    fn nan_bounds_are_reported_not_raised() {
        let list = [Interval::new(0.0, 0.2), Interval::new(f64::NAN, 0.4)];
        let report = p().validate_continuity(&list, ContinuityMode::Strict).unwrap();
        assert!(report
            .violations
            .iter()
            .any(|v| matches!(v, ContinuityViolation::Unrepresentable { index: 2 })));
    }

    #[test]
    fn invalid_inputs_rejected() {
        assert!(matches!(
            p().generate(1.0, 0.0, 5),
            Err(LegendError::InvalidRange { reason: RangeFault::Inverted, .. })
        ));
        assert!(matches!(
            p().generate(1.0, 1.0, 5),
            Err(LegendError::InvalidRange { reason: RangeFault::Inverted, .. })
        ));
        assert!(matches!(p().generate(0.0, 1.0, 0), Err(LegendError::InvalidCount(0))));
        let missing = p().generate(f64::NAN, 1.0, 5).unwrap_err();
        assert!(missing.is_missing_bounds());
        assert!(p().generate(0.0, f64::INFINITY, 5).unwrap_err().is_missing_bounds());
    }

    #[test]
    fn too_narrow_range_rejected() {
        assert!(matches!(
            p().generate(0.0, 0.03, 5),
            Err(LegendError::InvalidRange { reason: RangeFault::TooNarrow, .. })
        ));
    }

    #[test]
    fn huge_count_rejected_without_allocating() {
        for n in [usize::MAX, 1_000_000_000] {
            assert!(matches!(
                p().generate(0.0, 1.0, n),
                Err(LegendError::InvalidRange { reason: RangeFault::TooNarrow, .. })
            ));
        }
        // the count guard leaves tight but valid ranges alone
        let out = p().generate(0.004, 0.021, 2).unwrap();
        assert_eq!(pairs(&out), vec![(0.004, 0.01), (0.02, 0.021)]);
    }

    #[test]
    fn magnitude_beyond_step_resolution() {
        for max in [1e30, 1e40] {
            assert!(matches!(
                p().generate(0.0, max, 5),
                Err(LegendError::InvalidRange { reason: RangeFault::Unrepresentable, .. })
            ));
        }
        assert!(p().generate(0.0, 1e12, 5).is_ok());
    }

    #[test]
    fn anchor_zero_splits_at_zero() {
        let anchored = Partitioner::new(PartitionOptions { decimal_places: 2, anchor_zero: true });
        let out = anchored.generate(-0.41, 0.9, 5).unwrap();
        assert_eq!(
            pairs(&out),
            vec![(-0.41, -0.21), (-0.2, -0.01), (0.0, 0.3), (0.31, 0.6), (0.61, 0.9)]
        );
        assert!(anchored.validate_continuity(&out, ContinuityMode::Strict).unwrap().is_valid());
        // odd count: the extra interval lands on the non-negative side
        assert_eq!(out.iter().filter(|iv| iv.high < 0.0).count(), 2);
    }

    #[test]
    fn anchor_zero_ignored_when_not_straddling() {
        let anchored = Partitioner::new(PartitionOptions { decimal_places: 2, anchor_zero: true });
        assert_eq!(anchored.generate(0.0, 1.0, 5).unwrap(), p().generate(0.0, 1.0, 5).unwrap());
        assert_eq!(
            anchored.generate(-0.5, 0.5, 1).unwrap(),
            p().generate(-0.5, 0.5, 1).unwrap()
        );
    }

    #[test]
    fn anchor_zero_negative_side_too_small() {
        let anchored = Partitioner::new(PartitionOptions { decimal_places: 2, anchor_zero: true });
        assert!(matches!(
            anchored.generate(-0.005, 1.0, 4),
            Err(LegendError::InvalidRange { reason: RangeFault::TooNarrow, .. })
        ));
    }

    #[test]
    fn truncate_toward_zero() {
        assert_eq!(truncate(0.295, 2), 0.29);
        assert_eq!(truncate(-0.295, 2), -0.29);
        assert_eq!(truncate(0.29, 2), 0.29);
        assert_eq!(truncate(1.999, 0), 1.0);
        assert_eq!(truncate(0.19999, 2), 0.19);
        assert_eq!(truncate(12345.6789, 3), 12345.678);
    }

    #[test]
    fn truncate_never_negative_zero() {
        for v in [-0.001, -0.0, 0.0, -0.0099] {
            let t = truncate(v, 2);
            assert_eq!(t, 0.0);
            assert!(t.is_sign_positive(), "{v} -> {t:?}");
        }
    }

    #[test]
    fn truncate_is_idempotent() {
        for i in -1000..1000 {
            let x = i as f64 * 0.00137 + 0.000731;
            for d in 0..6 {
                let once = truncate(x, d);
                assert_eq!(truncate(once, d), once, "x={x} d={d}");
            }
        }
    }

    #[test]
    fn truncate_passes_huge_values_through() {
        assert_eq!(truncate(1e300, 2), 1e300);
        assert!(truncate(f64::NAN, 2).is_nan());
    }

    #[test]
    fn repair_pulls_lows_up() {
        let broken = [
            Interval::new(0.0, 0.19999),
            Interval::new(0.25, 0.39999),
            Interval::new(0.4, 1.0),
        ];
        let (fixed, report) = p().repair_continuity(&broken).unwrap();
        assert!(report.is_valid(), "{:?}", report.errors());
        assert_eq!(pairs(&fixed), vec![(0.0, 0.19), (0.2, 0.39), (0.4, 1.0)]);
    }

    #[test]
    fn repair_reports_what_it_cannot_fix() {
        let broken = [Interval::new(0.0, 0.5), Interval::new(0.1, 0.2)];
        let (_, report) = p().repair_continuity(&broken).unwrap();
        assert!(!report.is_valid());
    }

    #[test]
    fn exact_decimal_parsing() {
        assert_eq!(ExactDecimal::from_f64(0.21), Some(ExactDecimal { units: 21, scale: 2 }));
        assert_eq!(ExactDecimal::from_f64(-0.01), Some(ExactDecimal { units: -1, scale: 2 }));
        assert_eq!(ExactDecimal::from_f64(3.0), Some(ExactDecimal { units: 3, scale: 0 }));
        assert_eq!(ExactDecimal::from_f64(f64::NAN), None);
        assert_eq!(format_units(-1, 2), "-0.01");
        assert_eq!(format_units(20, 2), "0.20");
        assert_eq!(format_units(1234, 0), "1234");
    }

    #[test]
    fn binary_artifacts_do_not_break_gap_check() {
        // 0.1 + 0.2 != 0.3 in binary, but 0.3 - 0.29 is exactly one step in decimal
        assert_eq!(gap_check(0.29, 0.3, 2).map(|g| g.0), Some(true));
        assert_eq!(gap_check(0.29, 0.1 + 0.2, 2).map(|g| g.0), Some(false));
    }
}
