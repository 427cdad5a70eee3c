use crate::columns::ColumnSummary;
use crate::description::DescriptionTable;
use crate::legend::{normalize_tag, LegendRow, LegendStyle, StyleTable};
use crate::ranges::{indicator_code, IndicatorRange, RangeAccumulator};
use rayon::prelude::*;
use risk_legend_common::{LegendError, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

fn reader(path: &Path, delimiter: char) -> Result<csv::Reader<std::fs::File>> {
    if !delimiter.is_ascii() {
        return Err(LegendError::Config(format!("delimiter {delimiter:?} is not ASCII")));
    }
    Ok(csv::ReaderBuilder::new()
        .delimiter(delimiter as u8)
        .trim(csv::Trim::All)
        .from_path(path)?)
}

fn parse_cell(cell: &str) -> std::result::Result<Option<f64>, ()> {
    if cell.is_empty() {
        return Ok(None);
    }
    cell.parse::<f64>().map(Some).map_err(|_| ())
}

/// Expand a path or glob pattern into a sorted list of files.
pub fn resolve_inputs(pattern: &str) -> Result<Vec<PathBuf>> {
    let p = Path::new(pattern);
    if p.is_file() {
        return Ok(vec![p.to_path_buf()]);
    }
    let mut paths: Vec<PathBuf> = glob::glob(pattern)
        .map_err(|e| LegendError::Other(format!("bad pattern {pattern}: {e}")))?
        .filter_map(|entry| entry.ok())
        .filter(|p| p.is_file())
        .collect();
    paths.sort();
    if paths.is_empty() {
        return Err(LegendError::Other(format!("no files match {pattern}")));
    }
    Ok(paths)
}

pub fn read_style_table(path: &Path, delimiter: char) -> Result<StyleTable> {
    let mut rdr = reader(path, delimiter)?;
    let rows = rdr.deserialize::<LegendStyle>().collect::<std::result::Result<Vec<_>, _>>()?;
    StyleTable::from_rows(rows)
}

#[derive(Deserialize)]
struct RangeRecord {
    indicator_id: String,
    min: Option<f64>,
    max: Option<f64>,
}

/// Read `indicator_id|min|max`; extra columns are ignored and empty cells are null.
pub fn read_indicator_ranges(path: &Path, delimiter: char) -> Result<Vec<IndicatorRange>> {
    let mut rdr = reader(path, delimiter)?;
    let mut ranges = Vec::new();
    for record in rdr.deserialize::<RangeRecord>() {
        let r = record?;
        ranges.push(IndicatorRange::new(r.indicator_id, r.min, r.max));
    }
    Ok(ranges)
}

/// Per-code min/max of one wide value table. Columns without a code are
/// ignored; unparseable cells are skipped and counted in the log.
pub fn read_value_table(path: &Path, delimiter: char) -> Result<RangeAccumulator> {
    let mut rdr = reader(path, delimiter)?;
    let codes: Vec<Option<String>> = rdr
        .headers()?
        .iter()
        .map(|h| if h.eq_ignore_ascii_case("id") { None } else { indicator_code(h).map(str::to_owned) })
        .collect();
    let mut acc = RangeAccumulator::new();
    let mut bad = 0usize;
    for record in rdr.records() {
        let record = record?;
        for (cell, code) in record.iter().zip(&codes) {
            let Some(code) = code else { continue };
            match parse_cell(cell) {
                Ok(Some(v)) => acc.add(code, v),
                Ok(None) => {}
                Err(()) => bad += 1,
            }
        }
    }
    if bad > 0 {
        tracing::warn!(path = %path.display(), cells = bad, "skipped non-numeric cells");
    }
    tracing::debug!(path = %path.display(), indicators = acc.len(), "read value table");
    Ok(acc)
}

/// Read many value tables in parallel and merge them in input order. Files
/// that fail are logged; the call fails only when every file does.
pub fn read_value_tables_parallel(paths: &[PathBuf], delimiter: char) -> Result<RangeAccumulator> {
    let results: Vec<Result<RangeAccumulator>> =
        paths.par_iter().map(|p| read_value_table(p, delimiter)).collect();

    let mut merged = RangeAccumulator::new();
    let mut ok = 0usize;
    let mut errors = Vec::new();
    for (path, r) in paths.iter().zip(results) {
        match r {
            Ok(acc) => {
                merged.merge(acc);
                ok += 1;
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "failed to read value table");
                errors.push(e);
            }
        }
    }
    if ok == 0 && !errors.is_empty() {
        return Err(errors.remove(0));
    }
    Ok(merged)
}

/// Read a legend table. Tags written as `None` by older tools read as absent.
pub fn read_legend_table(path: &Path) -> Result<Vec<LegendRow>> {
    let mut rdr = reader(path, ',')?;
    let mut rows = rdr.deserialize::<LegendRow>().collect::<std::result::Result<Vec<_>, _>>()?;
    for row in rows.iter_mut() {
        row.tag = normalize_tag(row.tag.take());
    }
    Ok(rows)
}

pub fn write_legend_table(path: &Path, rows: &[LegendRow]) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn read_description_table(path: &Path, delimiter: char) -> Result<DescriptionTable> {
    let mut rdr = reader(path, delimiter)?;
    let headers: Vec<String> = rdr.headers()?.iter().map(str::to_owned).collect();
    let mut rows = Vec::new();
    for record in rdr.records() {
        rows.push(record?.iter().map(str::to_owned).collect());
    }
    Ok(DescriptionTable::new(headers, rows))
}

pub fn write_description_table(path: &Path, table: &DescriptionTable, delimiter: char) -> Result<()> {
    if !delimiter.is_ascii() {
        return Err(LegendError::Config(format!("delimiter {delimiter:?} is not ASCII")));
    }
    let mut wtr = csv::WriterBuilder::new().delimiter(delimiter as u8).from_path(path)?;
    wtr.write_record(&table.headers)?;
    for row in &table.rows {
        wtr.write_record(row)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Column-major numeric view of a CSV file; non-numeric cells become `None`.
#[derive(Debug, Clone)]
pub struct NumericTable {
    pub columns: Vec<String>,
    pub cells: Vec<Vec<Option<f64>>>,
    non_numeric: Vec<usize>,
}

impl NumericTable {
    pub fn summaries(&self) -> Vec<ColumnSummary> {
        self.columns
            .iter()
            .zip(&self.cells)
            .zip(&self.non_numeric)
            .map(|((name, cells), &bad)| ColumnSummary::from_cells(name, cells, bad))
            .collect()
    }

    pub fn column(&self, name: &str) -> Option<&[Option<f64>]> {
        let i = self.columns.iter().position(|c| c == name)?;
        Some(&self.cells[i])
    }

    /// Rows where both columns hold a value.
    pub fn pairs(&self, first: &str, second: &str) -> Result<(Vec<f64>, Vec<f64>)> {
        let a = self.column(first).ok_or_else(|| LegendError::Other(format!("no column {first}")))?;
        let b = self.column(second).ok_or_else(|| LegendError::Other(format!("no column {second}")))?;
        Ok(a.iter()
            .zip(b)
            .filter_map(|(x, y)| Some(((*x)?, (*y)?)))
            .unzip())
    }
}

pub fn read_numeric_table(path: &Path, delimiter: char) -> Result<NumericTable> {
    let mut rdr = reader(path, delimiter)?;
    let columns: Vec<String> = rdr.headers()?.iter().map(str::to_owned).collect();
    let mut cells = vec![Vec::new(); columns.len()];
    let mut non_numeric = vec![0usize; columns.len()];
    for record in rdr.records() {
        let record = record?;
        for (i, cell) in record.iter().enumerate().take(columns.len()) {
            match parse_cell(cell) {
                Ok(v) => cells[i].push(v),
                Err(()) => {
                    cells[i].push(None);
                    non_numeric[i] += 1;
                }
            }
        }
    }
    Ok(NumericTable { columns, cells, non_numeric })
}
