use crate::color::Rgba;
use crate::intervals::{truncate, ContinuityMode, Interval, Partitioner};
use crate::ranges::IndicatorRange;
use risk_legend_common::{ColorFormat, LegendError, Result};
use serde::{Deserialize, Serialize};

/// One row of the style table: how a legend class is labelled and coloured.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegendStyle {
    pub label: String,
    pub color: String,
    pub order: i64,
    #[serde(default)]
    pub tag: Option<String>,
}

/// Ordered style rows. The last row is the "no data" sentinel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleTable {
    rows: Vec<LegendStyle>,
}

/// Blank tags and the literal `None` written by older tables are absent.
pub(crate) fn normalize_tag(tag: Option<String>) -> Option<String> {
    tag.map(|t| t.trim().to_owned()).filter(|t| !t.is_empty() && t != "None")
}

impl StyleTable {
    /// Colours are normalised to `#RRGGBB`. Every data row needs a tag; the
    /// last row's tag is dropped and its order must be the highest, which is
    /// how legend tables find it again.
    pub fn from_rows(rows: Vec<LegendStyle>) -> Result<Self> {
        if rows.len() < 2 {
            return Err(LegendError::InvalidStyle(format!(
                "need at least one data row and the no-data row, got {} row(s)",
                rows.len()
            )));
        }
        let last = rows.len() - 1;
        if rows[..last].iter().any(|r| r.order >= rows[last].order) {
            return Err(LegendError::InvalidStyle(format!(
                "the no-data row ({}) must have the highest order",
                rows[last].label
            )));
        }
        let rows = rows
            .into_iter()
            .enumerate()
            .map(|(i, mut row)| -> Result<LegendStyle> {
                row.color = Rgba::parse(&row.color)?.to_hex();
                row.tag = if i == last { None } else { normalize_tag(row.tag) };
                if i != last && row.tag.is_none() {
                    return Err(LegendError::InvalidStyle(format!(
                        "row {} ({}) has no tag",
                        i + 1,
                        row.label
                    )));
                }
                Ok(row)
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { rows })
    }

    pub fn rows(&self) -> &[LegendStyle] {
        &self.rows
    }

    /// Rows that receive generated intervals.
    pub fn data_rows(&self) -> &[LegendStyle] {
        &self.rows[..self.rows.len() - 1]
    }

    pub fn sentinel(&self) -> &LegendStyle {
        &self.rows[self.rows.len() - 1]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegendRow {
    pub id: u64,
    pub label: String,
    pub color: String,
    pub minvalue: Option<f64>,
    pub maxvalue: Option<f64>,
    pub legend_id: u64,
    pub indicator_id: String,
    pub tag: Option<String>,
    pub order: i64,
}

impl LegendRow {
    pub fn interval(&self) -> Option<Interval> {
        Some(Interval::new(self.minvalue?, self.maxvalue?))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Legend {
    pub legend_id: u64,
    pub indicator_id: String,
    pub intervals: Option<Vec<Interval>>, // None when the indicator had no data
    pub rows: Vec<LegendRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedIndicator {
    pub indicator_id: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LegendBatch {
    pub legends: Vec<Legend>,
    pub skipped: Vec<SkippedIndicator>,
    pub all_continuous: bool, // every emitted legend passes a strict check
}

impl LegendBatch {
    pub fn rows(&self) -> Vec<LegendRow> {
        self.legends.iter().flat_map(|l| l.rows.iter().cloned()).collect()
    }

    pub fn no_data_count(&self) -> usize {
        self.legends.iter().filter(|l| l.intervals.is_none()).count()
    }
}

/// Pairs generated intervals with the style table, numbering rows and legends.
pub struct LegendBuilder<'a> {
    partitioner: Partitioner,
    style: &'a StyleTable,
    next_legend_id: u64,
    next_row_id: u64,
    display_decimal_places: Option<u32>,
    color_format: ColorFormat,
}

impl<'a> LegendBuilder<'a> {
    pub fn new(partitioner: Partitioner, style: &'a StyleTable) -> Self {
        Self {
            partitioner,
            style,
            next_legend_id: 1,
            next_row_id: 1,
            display_decimal_places: None,
            color_format: ColorFormat::Hex,
        }
    }

    pub fn with_ids(mut self, first_legend_id: u64, first_row_id: u64) -> Self {
        self.next_legend_id = first_legend_id;
        self.next_row_id = first_row_id;
        self
    }

    /// Truncate the bounds written to rows; generated intervals are kept intact.
    pub fn with_display_decimal_places(mut self, places: Option<u32>) -> Self {
        self.display_decimal_places = places;
        self
    }

    pub fn with_color_format(mut self, format: ColorFormat) -> Self {
        self.color_format = format;
        self
    }

    /// Build one legend. Missing or non-finite bounds produce a legend whose
    /// rows all have null bounds; any other range error is returned and no
    /// ids are consumed.
    pub fn build(&mut self, range: &IndicatorRange) -> Result<Legend> {
        let n = self.style.data_rows().len();
        let min = range.min.unwrap_or(f64::NAN);
        let max = range.max.unwrap_or(f64::NAN);
        let intervals = match self.partitioner.generate(min, max, n) {
            Ok(iv) => Some(iv),
            Err(e) if e.is_missing_bounds() => {
                tracing::info!(indicator = %range.indicator_id, "no data, emitting null legend");
                None
            }
            Err(e) => return Err(e),
        };
        let colors = self
            .style
            .rows()
            .iter()
            .map(|style| -> Result<String> { Ok(Rgba::parse(&style.color)?.format(self.color_format)) })
            .collect::<Result<Vec<_>>>()?;
        let legend_id = self.next_legend_id;
        self.next_legend_id += 1;
        let last = self.style.rows().len() - 1;
        let mut rows = Vec::with_capacity(self.style.rows().len());
        for (i, (style, color)) in self.style.rows().iter().zip(colors).enumerate() {
            let bounds = if i < last {
                intervals.as_ref().map(|iv| iv[i])
            } else {
                None
            };
            let (minvalue, maxvalue) = match bounds {
                Some(iv) => (Some(self.display(iv.low)), Some(self.display(iv.high))),
                None => (None, None),
            };
            rows.push(LegendRow {
                id: self.next_row_id,
                label: style.label.clone(),
                color,
                minvalue,
                maxvalue,
                legend_id,
                indicator_id: range.indicator_id.clone(),
                tag: if i < last { style.tag.clone() } else { None },
                order: style.order,
            });
            self.next_row_id += 1;
        }
        Ok(Legend { legend_id, indicator_id: range.indicator_id.clone(), intervals, rows })
    }

    fn display(&self, value: f64) -> f64 {
        match self.display_decimal_places {
            Some(d) => truncate(value, d),
            None => value,
        }
    }

    /// Build every legend, logging and skipping indicators whose range is unusable.
    pub fn build_all(&mut self, ranges: &[IndicatorRange]) -> LegendBatch {
        let mut batch = LegendBatch { all_continuous: true, ..Default::default() };
        for range in ranges {
            match self.build(range) {
                Ok(legend) => {
                    let continuous = validate_legend_rows(&legend.rows, &self.partitioner, ContinuityMode::Strict)
                        .map(|checks| checks.iter().all(LegendCheck::is_valid))
                        .unwrap_or(false);
                    if !continuous {
                        tracing::debug!(indicator = %legend.indicator_id, "displayed bounds are not continuous");
                    }
                    batch.all_continuous &= continuous;
                    batch.legends.push(legend);
                }
                Err(e) => {
                    tracing::warn!(indicator = %range.indicator_id, error = %e, "skipping indicator");
                    batch.skipped.push(SkippedIndicator {
                        indicator_id: range.indicator_id.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }
        batch
    }
}

/// Outcome of checking one legend of a legend table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegendCheck {
    pub legend_id: u64,
    pub indicator_id: String,
    pub no_data: bool, // every data row has null bounds
    pub errors: Vec<String>,
}

impl LegendCheck {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Row indices per `legend_id` in first-seen order, with the "no data" row
/// (highest `order`, last on ties) removed from each group.
fn data_rows_by_legend(rows: &[LegendRow]) -> Vec<(u64, Vec<usize>)> {
    let mut groups: Vec<(u64, Vec<usize>)> = Vec::new();
    for (i, row) in rows.iter().enumerate() {
        match groups.iter_mut().find(|(id, _)| *id == row.legend_id) {
            Some((_, idx)) => idx.push(i),
            None => groups.push((row.legend_id, vec![i])),
        }
    }
    for (_, idx) in groups.iter_mut() {
        let sentinel = idx.iter().copied().max_by_key(|&i| (rows[i].order, i));
        idx.retain(|&i| Some(i) != sentinel);
    }
    groups
}

/// Validate each legend in a table, grouped by `legend_id` in first-seen order.
/// The highest-order row of each legend is the "no data" row and is skipped.
/// A legend whose data rows are all null is a valid no-data legend, while a
/// partially null one is reported.
pub fn validate_legend_rows(
    rows: &[LegendRow],
    partitioner: &Partitioner,
    mode: ContinuityMode,
) -> Result<Vec<LegendCheck>> {
    let mut checks = Vec::new();
    for (legend_id, idx) in data_rows_by_legend(rows) {
        let data: Vec<&LegendRow> = idx.iter().map(|&i| &rows[i]).collect();
        let indicator_id = rows
            .iter()
            .find(|r| r.legend_id == legend_id)
            .map(|r| r.indicator_id.clone())
            .unwrap_or_default();
        let intervals: Vec<Interval> = data.iter().filter_map(|r| r.interval()).collect();
        if intervals.is_empty() {
            checks.push(LegendCheck { legend_id, indicator_id, no_data: true, errors: Vec::new() });
            continue;
        }
        let mut errors: Vec<String> = data
            .iter()
            .filter(|r| r.interval().is_none())
            .map(|r| format!("row {}: missing minvalue or maxvalue", r.id))
            .collect();
        errors.extend(partitioner.validate_continuity(&intervals, mode)?.errors());
        checks.push(LegendCheck { legend_id, indicator_id, no_data: false, errors });
    }
    Ok(checks)
}

/// Repair every legend in place (see `Partitioner::repair_continuity`) and
/// return the checks of the repaired table.
pub fn repair_legend_rows(rows: &mut [LegendRow], partitioner: &Partitioner) -> Result<Vec<LegendCheck>> {
    for (legend_id, idx) in data_rows_by_legend(rows) {
        let mut data: Vec<usize> = idx.into_iter().filter(|&i| rows[i].interval().is_some()).collect();
        if data.is_empty() {
            continue;
        }
        data.sort_by(|&a, &b| {
            let (a, b) = (rows[a].minvalue.unwrap_or(f64::NAN), rows[b].minvalue.unwrap_or(f64::NAN));
            a.total_cmp(&b)
        });
        let intervals: Vec<Interval> = data.iter().filter_map(|&i| rows[i].interval()).collect();
        let (fixed, report) = partitioner.repair_continuity(&intervals)?;
        if !report.is_valid() {
            tracing::warn!(legend_id, errors = ?report.errors(), "legend still broken after repair");
        }
        for (&i, iv) in data.iter().zip(&fixed) {
            rows[i].minvalue = Some(iv.low);
            rows[i].maxvalue = Some(iv.high);
        }
    }
    validate_legend_rows(rows, partitioner, ContinuityMode::Strict)
}
