use crate::confusion::ConfusionMatrix;
use crate::histogram::HistogramBin;
use crate::legend::{LegendBatch, LegendCheck};
use risk_legend_common::Result;
use std::path::Path;

// --- headless summaries ---

pub fn print_batch_summary(batch: &LegendBatch) {
    println!("{:<16} {}", "Legends:", batch.legends.len());
    println!("{:<16} {}", "Rows:", batch.legends.iter().map(|l| l.rows.len()).sum::<usize>());
    println!("{:<16} {}", "No data:", batch.no_data_count());
    println!("{:<16} {}", "Skipped:", batch.skipped.len());
    println!("{:<16} {}", "Continuous:", if batch.all_continuous { "yes" } else { "no" });
    for s in &batch.skipped {
        println!("  {:<14} {}", s.indicator_id, s.reason);
    }
}

pub fn print_checks(checks: &[LegendCheck]) {
    let bad = checks.iter().filter(|c| !c.is_valid()).count();
    for c in checks.iter().filter(|c| !c.is_valid()) {
        println!("legend {} (indicator {}):", c.legend_id, c.indicator_id);
        for e in &c.errors {
            println!("  {e}");
        }
    }
    println!("{:<16} {}", "Legends:", checks.len());
    println!("{:<16} {}", "No data:", checks.iter().filter(|c| c.no_data).count());
    println!("{:<16} {}", "Invalid:", bad);
}

pub fn print_confusion(matrix: &ConfusionMatrix) {
    let width = matrix.labels.iter().map(|l| l.len()).max().unwrap_or(0).max(8);
    print!("{:<width$}", "orig \\ est");
    for l in &matrix.labels {
        print!(" {l:>width$}");
    }
    println!();
    for (label, row) in matrix.labels.iter().zip(matrix.percentages()) {
        print!("{label:<width$}");
        for p in row {
            print!(" {:>width$}", format!("{p:.2}%"));
        }
        println!();
    }
    println!("{:<16} {}", "Pairs:", matrix.total());
    println!("{:<16} {}", "Dropped:", matrix.dropped);
    println!("{:<16} {:.2}%", "Agreement:", matrix.agreement_pct());
}

// --- JSON export ---

pub fn export_legends_json(output_path: &Path, batch: &LegendBatch) -> Result<()> {
    let doc = serde_json::json!({
        "legends": batch.legends,
        "skipped": batch.skipped,
        "all_continuous": batch.all_continuous,
    });
    let file = std::fs::File::create(output_path)?;
    serde_json::to_writer_pretty(file, &doc)?;
    Ok(())
}

pub fn export_confusion_json(
    output_path: &Path,
    matrix: &ConfusionMatrix,
    histogram: &[HistogramBin],
) -> Result<()> {
    let doc = serde_json::json!({
        "labels": matrix.labels,
        "counts": matrix.counts,
        "percentages": matrix.percentages(),
        "dropped": matrix.dropped,
        "agreement_pct": matrix.agreement_pct(),
        "difference_histogram": histogram,
    });
    let file = std::fs::File::create(output_path)?;
    serde_json::to_writer_pretty(file, &doc)?;
    Ok(())
}

// --- CSV export ---

/// Percentage matrix with the original class in the first column.
pub fn export_confusion_csv(output_path: &Path, matrix: &ConfusionMatrix) -> Result<()> {
    let mut wtr = csv::Writer::from_path(output_path)?;
    let mut header = vec!["original".to_string()];
    header.extend(matrix.labels.iter().cloned());
    wtr.write_record(&header)?;
    for (label, row) in matrix.labels.iter().zip(matrix.percentages()) {
        let mut record = vec![label.clone()];
        record.extend(row.iter().map(|p| format!("{p:.2}")));
        wtr.write_record(&record)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn export_histogram_csv(output_path: &Path, bins: &[HistogramBin]) -> Result<()> {
    let mut wtr = csv::Writer::from_path(output_path)?;
    for bin in bins {
        wtr.serialize(bin)?;
    }
    wtr.flush()?;
    Ok(())
}
