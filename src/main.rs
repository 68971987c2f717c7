//! Retail Insights - command line report
//!
//! Loads a sales CSV, cleans it and prints the data-quality checks and every
//! requested view.

use anyhow::{Context, Result};
use clap::Parser;
use retail_insights::analysis::AggregationResult;
use retail_insights::data::ColumnInfo;
use retail_insights::{
    DataCleaner, DatasetCache, ImputationReport, NullReport, PipelineConfig, Record, View,
};
use serde::Serialize;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "retail-insights")]
#[command(about = "Clean a retail sales CSV and print ranked sales views")]
struct Args {
    /// Sales CSV file
    csv: PathBuf,

    /// JSON config file (missing keys use defaults)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// View to compute, repeatable (default: all), e.g. revenue-by-category-in-year:1985
    #[arg(short, long = "view")]
    views: Vec<View>,

    /// Length of top-N rankings
    #[arg(long)]
    top_n: Option<usize>,

    /// Establishment year for the per-year category view
    #[arg(long)]
    year: Option<i32>,

    /// Print one JSON document instead of text
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct ViewReport {
    name: String,
    title: String,
    result: AggregationResult,
}

#[derive(Serialize)]
struct Report<'a> {
    rows: usize,
    preview: &'a [Record],
    columns: Vec<ColumnInfo>,
    nulls_before: NullReport,
    duplicates: usize,
    imputation: ImputationReport,
    nulls_after: NullReport,
    views: Vec<ViewReport>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => PipelineConfig::from_json_file(path)
            .with_context(|| format!("failed to read config {}", path.display()))?,
        None => PipelineConfig::default(),
    };
    if let Some(top_n) = args.top_n {
        config.top_n = top_n;
    }
    if let Some(year) = args.year {
        config.focus_year = year;
    }

    let mut cache = DatasetCache::new(config.load_options()?);
    let dataset = cache
        .load(&args.csv)
        .with_context(|| format!("failed to load {}", args.csv.display()))?;

    let nulls_before = DataCleaner::null_report(dataset);
    let duplicates = DataCleaner::duplicate_count(dataset);
    let imputation = DataCleaner::impute_missing(dataset, &config.imputation_rules())
        .context("failed to impute missing values")?;
    let nulls_after = DataCleaner::null_report(dataset);

    let views = if args.views.is_empty() {
        View::all(&config)
    } else {
        args.views.clone()
    };

    let mut reports = Vec::with_capacity(views.len());
    for view in views {
        match view.compute(dataset, &config) {
            Ok(result) => reports.push(ViewReport {
                name: view.to_string(),
                title: view.title(),
                result,
            }),
            Err(err) => warn!(view = %view, error = %err, "view skipped"),
        }
    }
    info!(views = reports.len(), "report ready");

    let report = Report {
        rows: dataset.len(),
        preview: dataset.preview(config.preview_rows),
        columns: dataset.info(),
        nulls_before,
        duplicates,
        imputation,
        nulls_after,
        views: reports,
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        let frame = dataset.to_frame()?.head(Some(config.preview_rows));
        print_text(&report, &frame);
    }
    Ok(())
}

fn print_text(report: &Report<'_>, preview: &polars::prelude::DataFrame) {
    println!("### Data preview ({} rows total)", report.rows);
    println!("{preview}");

    println!("\n### Columns");
    for column in &report.columns {
        println!("{:<20} {:<4} {} non-null", column.field, column.dtype, column.non_null);
    }

    println!("\n### Missing values");
    for (field, count) in report.nulls_before.iter() {
        println!("{field:<20} {count}");
    }

    println!("\n### After imputation");
    if let Some(mean) = report.imputation.weight_mean {
        println!("weight filled with mean {mean:.3}: {}", report.imputation.weight_filled);
    }
    println!("outlet_size filled: {}", report.imputation.outlet_size_filled);
    println!("missing values left: {}", report.nulls_after.total());

    println!("\n### Duplicates: {}", report.duplicates);

    for view in &report.views {
        println!("\n### {}", view.title);
        for (key, value) in view.result.round_result() {
            println!("{key:<30} {value}");
        }
    }
}
