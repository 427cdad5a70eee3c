use anyhow::Context;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use risk_legend_common::{Config, PartitionConfig};
use risk_legend_core::bins::BinEdges;
use risk_legend_core::columns::ColumnPicker;
use risk_legend_core::confusion::ConfusionMatrix;
use risk_legend_core::export::{
    export_confusion_csv, export_confusion_json, export_histogram_csv, export_legends_json,
    print_batch_summary, print_checks, print_confusion,
};
use risk_legend_core::histogram::difference_histogram;
use risk_legend_core::io::{
    read_description_table, read_indicator_ranges, read_legend_table, read_numeric_table,
    read_style_table, read_value_tables_parallel, resolve_inputs, write_description_table,
    write_legend_table,
};
use risk_legend_core::legend::{repair_legend_rows, validate_legend_rows};
use risk_legend_core::{
    ContinuityMode, IndicatorRange, LegendBatch, LegendBuilder, PartitionOptions, Partitioner,
};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "risk-legend", version, about = "Build and check classed map legends")]
struct Cli {
    /// Verbose logging on stderr
    #[arg(long, global = true)]
    debug: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the intervals for one range
    Intervals {
        #[arg(long, allow_negative_numbers = true)] min: f64,
        #[arg(long, allow_negative_numbers = true)] max: f64,
        #[arg(short = 'n', long)] intervals: Option<usize>,
        #[arg(long)] decimal_places: Option<u32>,
        #[arg(long)] anchor_zero: bool,
        /// `standard` or `fixed-zero`
        #[arg(long)] profile: Option<String>,
        #[arg(long)] json: bool,
    },
    /// Build a legend table from an indicator range file
    Legends {
        #[arg(long)] ranges: PathBuf,
        #[arg(long)] style: PathBuf,
        #[arg(long)] output: Option<PathBuf>,
        #[arg(long)] format: Option<String>,
        #[arg(long)] profile: Option<String>,
    },
    /// Build a legend table from wide value tables (path or glob)
    LegendsFromValues {
        #[arg(long)] values: String,
        #[arg(long)] style: PathBuf,
        #[arg(long)] output: Option<PathBuf>,
        #[arg(long)] format: Option<String>,
        #[arg(long)] profile: Option<String>,
        /// Indicator description table to link legend ids into
        #[arg(long)] description: Option<PathBuf>,
        #[arg(long, requires = "description")] description_output: Option<PathBuf>,
    },
    /// Validate every legend of a legend table
    Check {
        #[arg(long)] legends: PathBuf,
        #[arg(long)] strict: bool,
    },
    /// Repair gaps and overlaps in a legend table
    Repair {
        #[arg(long)] legends: PathBuf,
        #[arg(long)] output: PathBuf,
    },
    /// Confusion matrix of original vs. estimated classes
    Confusion {
        #[arg(long)] input: PathBuf,
        #[arg(long)] estimated_column: String,
        #[arg(long)] original_column: Option<String>,
        #[arg(long)] output_dir: Option<PathBuf>,
        #[arg(long)] left_closed: bool,
    },
    /// Print the effective configuration
    Config {
        #[arg(long)] save: bool,
    },
    Completions { shell: Shell },
}

fn init_logging(debug: bool) {
    let level = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.debug);
    let config = Config::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "config not loaded, using defaults");
        Config::default()
    });
    match cli.command {
        Commands::Intervals { min, max, intervals, decimal_places, anchor_zero, profile, json } => {
            let mut partition = partition_config(&config, profile.as_deref())?;
            if let Some(d) = decimal_places { partition.decimal_places = d; }
            partition.anchor_zero |= anchor_zero;
            run_intervals(min, max, intervals.unwrap_or(partition.intervals), &partition, json)?
        }
        Commands::Legends { ranges, style, output, format, profile } => {
            let indicator_ranges = read_indicator_ranges(&ranges, config.legend.ranges_delimiter)
                .with_context(|| format!("reading {}", ranges.display()))?;
            run_legends(&indicator_ranges, &style, output, format, profile.as_deref(), &config)?;
        }
        Commands::LegendsFromValues { values, style, output, format, profile, description, description_output } => {
            let paths = resolve_inputs(&values)?;
            tracing::info!(files = paths.len(), "reading value tables");
            let mut acc = read_value_tables_parallel(&paths, config.legend.values_delimiter)?;
            acc.sort();
            let batch = run_legends(&acc.into_ranges(), &style, output, format, profile.as_deref(), &config)?;
            if let Some(path) = description {
                let out = description_output
                    .unwrap_or_else(|| Path::new(&config.export.output_dir).join("description.csv"));
                run_link_description(&path, &out, &batch, &config)?;
            }
        }
        Commands::Check { legends, strict } => run_check(&legends, strict, &config)?,
        Commands::Repair { legends, output } => run_repair(&legends, &output, &config)?,
        Commands::Confusion { input, estimated_column, original_column, output_dir, left_closed } => {
            run_confusion(&input, &estimated_column, original_column.as_deref(), output_dir, left_closed, &config)?
        }
        Commands::Config { save } => {
            print!("{}", toml::to_string_pretty(&config)?);
            if save {
                config.save()?;
                eprintln!("saved {}", Config::config_path().display());
            }
        }
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "risk-legend", &mut std::io::stdout());
        }
    }
    Ok(())
}

fn partition_config(config: &Config, profile: Option<&str>) -> anyhow::Result<PartitionConfig> {
    let mut partition = config.partition.clone();
    if let Some(name) = profile {
        partition.apply_profile(name)?;
    }
    Ok(partition)
}

fn partitioner(partition: &PartitionConfig) -> Partitioner {
    Partitioner::new(PartitionOptions {
        decimal_places: partition.decimal_places,
        anchor_zero: partition.anchor_zero,
    })
}

fn validation_mode(partition: &PartitionConfig) -> ContinuityMode {
    if partition.strict_order { ContinuityMode::Strict } else { ContinuityMode::Tolerant }
}

fn run_intervals(min: f64, max: f64, n: usize, partition: &PartitionConfig, json: bool) -> anyhow::Result<()> {
    let intervals = partitioner(partition).generate(min, max, n)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&intervals)?);
        return Ok(());
    }
    for (i, iv) in intervals.iter().enumerate() {
        println!("{:>3}  {:>14}  {:>14}", i + 1, iv.low, iv.high);
    }
    Ok(())
}

fn run_legends(
    ranges: &[IndicatorRange],
    style_path: &Path,
    output: Option<PathBuf>,
    format: Option<String>,
    profile: Option<&str>,
    config: &Config,
) -> anyhow::Result<LegendBatch> {
    let style = read_style_table(style_path, config.legend.style_delimiter)
        .with_context(|| format!("reading {}", style_path.display()))?;
    let partition = partition_config(config, profile)?;
    let batch: LegendBatch = LegendBuilder::new(partitioner(&partition), &style)
        .with_ids(config.legend.first_legend_id, config.legend.first_row_id)
        .with_display_decimal_places(config.legend.display_decimal_places)
        .with_color_format(config.legend.color_format)
        .build_all(ranges);

    let format = format.unwrap_or_else(|| config.export.format.clone());
    let output = output.unwrap_or_else(|| Path::new(&config.export.output_dir).join(format!("legends.{format}")));
    match format.as_str() {
        "csv" => write_legend_table(&output, &batch.rows())?,
        "json" => export_legends_json(&output, &batch)?,
        other => anyhow::bail!("unknown format: {other} (expected csv or json)"),
    }
    print_batch_summary(&batch);
    tracing::info!(path = %output.display(), "legends written");
    Ok(batch)
}

fn run_link_description(path: &Path, output: &Path, batch: &LegendBatch, config: &Config) -> anyhow::Result<()> {
    let delimiter = config.legend.values_delimiter;
    let mut table = read_description_table(path, delimiter)
        .with_context(|| format!("reading {}", path.display()))?;
    let unmatched = table.link_legends(
        &batch.legends,
        &config.legend.description_code_column,
        &config.legend.description_legend_column,
    )?;
    write_description_table(output, &table, delimiter)?;
    println!("{:<16} {}", "Unlinked codes:", unmatched.len());
    tracing::info!(path = %output.display(), "description table written");
    Ok(())
}

fn run_check(path: &Path, strict: bool, config: &Config) -> anyhow::Result<()> {
    let rows = read_legend_table(path).with_context(|| format!("reading {}", path.display()))?;
    let mode = if strict { ContinuityMode::Strict } else { validation_mode(&config.partition) };
    let checks = validate_legend_rows(&rows, &partitioner(&config.partition), mode)?;
    print_checks(&checks);
    let bad = checks.iter().filter(|c| !c.is_valid()).count();
    if bad > 0 {
        anyhow::bail!("{bad} legend(s) have interval errors");
    }
    Ok(())
}

fn run_repair(path: &Path, output: &Path, config: &Config) -> anyhow::Result<()> {
    let mut rows = read_legend_table(path).with_context(|| format!("reading {}", path.display()))?;
    let checks = repair_legend_rows(&mut rows, &partitioner(&config.partition))?;
    write_legend_table(output, &rows)?;
    print_checks(&checks);
    tracing::info!(path = %output.display(), "repaired table written");
    Ok(())
}

fn run_confusion(
    input: &Path,
    estimated: &str,
    original: Option<&str>,
    output_dir: Option<PathBuf>,
    left_closed: bool,
    config: &Config,
) -> anyhow::Result<()> {
    let table = read_numeric_table(input, ',').with_context(|| format!("reading {}", input.display()))?;
    let summaries = table.summaries();
    let original = match original {
        Some(name) => name.to_owned(),
        None => ColumnPicker::new(config.confusion.column_patterns.clone())
            .pick_excluding(&summaries, &[estimated])
            .map(str::to_owned)
            .ok_or_else(|| anyhow::anyhow!("no original-value column found in {}", input.display()))?,
    };
    tracing::info!(original = %original, estimated, "comparing columns");

    let mut cfg = config.confusion.clone();
    cfg.right_closed &= !left_closed;
    let bins = BinEdges::from_config(&cfg)?;
    let (o, e) = table.pairs(&original, estimated)?;
    let matrix = ConfusionMatrix::from_pairs(&o, &e, &bins);
    let histogram = difference_histogram(&o, &e, cfg.histogram_bins);

    let dir = output_dir.unwrap_or_else(|| PathBuf::from(&config.export.output_dir));
    std::fs::create_dir_all(&dir)?;
    export_confusion_csv(&dir.join("confusion_matrix.csv"), &matrix)?;
    export_histogram_csv(&dir.join("difference_histogram.csv"), &histogram)?;
    export_confusion_json(&dir.join("confusion.json"), &matrix, &histogram)?;
    print_confusion(&matrix);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_negative_bounds() {
        let cli = Cli::try_parse_from(["risk-legend", "intervals", "--min", "-0.41", "--max", "0.9", "--anchor-zero"]).unwrap();
        match cli.command {
            Commands::Intervals { min, max, anchor_zero, .. } => {
                assert_eq!(min, -0.41);
                assert_eq!(max, 0.9);
                assert!(anchor_zero);
            }
            _ => panic!("wrong command"),
        }
    }

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn legends_then_check() {
        let dir = tempfile::tempdir().unwrap();
        let style = dir.path().join("style.csv");
        std::fs::write(&style, "label;color;order;tag\nLow;#00ff00;1;l\nHigh;#ff0000;2;h\nNo data;#cccccc;3;\n").unwrap();
        let out = dir.path().join("legends.csv");
        let ranges = [IndicatorRange::new("1", Some(0.0), Some(1.0)), IndicatorRange::new("2", None, None)];
        let config = Config::default();
        let batch = run_legends(&ranges, &style, Some(out.clone()), Some("csv".into()), None, &config).unwrap();
        assert_eq!(batch.legends.len(), 2);
        run_check(&out, true, &config).unwrap();
        let repaired = dir.path().join("repaired.csv");
        run_repair(&out, &repaired, &config).unwrap();
        assert_eq!(read_legend_table(&repaired).unwrap(), read_legend_table(&out).unwrap());
    }

    #[test]
    fn description_gets_legend_ids() {
        let dir = tempfile::tempdir().unwrap();
        let style = dir.path().join("style.csv");
        std::fs::write(&style, "label;color;order;tag\nLow;#00ff00;1;l\nHigh;#ff0000;2;h\nNo data;#cccccc;3;\n").unwrap();
        let description = dir.path().join("descricao.csv");
        std::fs::write(&description, "codigo,nome\n5,Flood\n6,Heat\n8,Fire\n").unwrap();
        let config = Config::default();
        let ranges = [IndicatorRange::new("5", Some(0.0), Some(1.0)), IndicatorRange::new("6", Some(2.0), Some(4.0))];
        let batch = run_legends(&ranges, &style, Some(dir.path().join("l.csv")), Some("csv".into()), None, &config).unwrap();
        let out = dir.path().join("linked.csv");
        run_link_description(&description, &out, &batch, &config).unwrap();
        let text = std::fs::read_to_string(&out).unwrap();
        assert_eq!(text, "codigo,nome,legenda\n5,Flood,1\n6,Heat,2\n8,Fire,\n");
    }

    #[test]
    fn description_output_requires_description() {
        let r = Cli::try_parse_from([
            "risk-legend", "legends-from-values", "--values", "v.csv", "--style", "s.csv",
            "--description-output", "d.csv",
        ]);
        assert!(r.is_err());
    }

    #[test]
    fn unknown_format_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let style = dir.path().join("style.csv");
        std::fs::write(&style, "label;color;order;tag\nLow;#00ff00;1;l\nNo data;#cccccc;2;\n").unwrap();
        let r = run_legends(&[], &style, Some(dir.path().join("x")), Some("xlsx".into()), None, &Config::default());
        assert!(r.is_err());
    }
}
