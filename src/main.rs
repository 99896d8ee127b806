//! Text report over a scan-record export (CSV or xlsx)
//!
//! Usage:
//!   ./target/release/scan_throughput report [--input PATH] [--start DATE] [--end DATE] [--shift NAME]
//!   ./target/release/scan_throughput matrix [--input PATH] [--start DATE] [--end DATE] [--shift NAME]

use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use scan_throughput::aggregate::VolumeMatrix;
use scan_throughput::config::DashboardConfig;
use scan_throughput::dashboard::{self, DashboardView};
use scan_throughput::loader::{self, DatasetId};
use scan_throughput::models::ShiftWindow;
use scan_throughput::session::{FilterUpdate, Session};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "scan_throughput")]
#[command(about = "Hourly scan throughput and relative efficiency by operator")]
struct Cli {
    /// JSON config file (all keys optional)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// KPIs, volume summary and labor group deep dives
    Report(FilterArgs),
    /// Distinct shipments per operator per hour bucket
    Matrix(FilterArgs),
}

#[derive(Args, Debug)]
struct FilterArgs {
    /// Scan-record CSV or xlsx (defaults to the configured file)
    #[arg(long)]
    input: Option<PathBuf>,

    /// First day, YYYY-MM-DD (defaults to the first day in the data)
    #[arg(long)]
    start: Option<NaiveDate>,

    /// Last day, YYYY-MM-DD (defaults to the last day in the data)
    #[arg(long)]
    end: Option<NaiveDate>,

    /// early, mid or night
    #[arg(long)]
    shift: Option<String>,
}

fn build_view(config: &DashboardConfig, args: &FilterArgs) -> Result<DashboardView> {
    let path = args
        .input
        .clone()
        .unwrap_or_else(|| config.default_file_path.clone());
    let dataset = loader::load_from_path(&path)
        .with_context(|| format!("Failed to load scan records from {}", path.display()))?;
    info!(
        "Loaded {} records ({} dropped) from {}",
        dataset.records.len(),
        dataset.dropped_rows,
        path.display()
    );

    let shift = args
        .shift
        .as_deref()
        .map(str::parse::<ShiftWindow>)
        .transpose()
        .map_err(|e| anyhow!(e))?;

    let mut session = Session::new(DatasetId::Default(path), &dataset);
    session.apply(&FilterUpdate {
        start: args.start,
        end: args.end,
        shift,
    })?;

    Ok(dashboard::build_dashboard(&dataset, &session, config)?)
}

fn fmt_value(v: f64, decimals: usize) -> String {
    if v.is_finite() {
        format!("{:.*}", decimals, v)
    } else {
        "-".to_string()
    }
}

fn print_report(view: &DashboardView) {
    let h = &view.header;
    println!("\n{}", "=".repeat(70));
    println!("         {} SCAN THROUGHPUT REPORT", h.sorting_center);
    println!("{}\n", "=".repeat(70));

    println!("  Shift:        {}", h.shift);
    println!("  Date range:   {} to {}", h.date_range.start, h.date_range.end);
    println!("  Time context: {}", h.time_context);
    println!("  Records:      {:>10}", h.records);
    println!("  Operators:    {:>10}", h.operators);

    let k = &view.kpis;
    println!("\nKPIS");
    println!("{}", "-".repeat(50));
    println!("  Total volume:   {:>10}", k.total_volume);
    println!("  Sorter volume:  {:>10}", k.sorter_volume);
    println!("  Sorter share:   {:>9.1}%", k.sorter_share);
    println!("  Peak bucket:    {:>10} ({} shipments)", k.peak_bucket, k.peak_volume);

    println!("\nVOLUME BY HOUR");
    println!("{}", "-".repeat(50));
    println!("  {:<8} {:>10} {:>10} {:>10}", "Bucket", "Total", "Sorter", "Others");
    let totals = view.matrix.column_totals();
    let sorter = view
        .sorter_vs_total
        .series_named("Sorter")
        .map(|s| s.y.clone())
        .unwrap_or_default();
    for (i, bucket) in view.matrix.buckets.iter().enumerate() {
        let s = sorter.get(i).copied().unwrap_or(0.0) as u64;
        println!(
            "  {:<8} {:>10} {:>10} {:>10}",
            bucket.label(),
            totals[i],
            s,
            totals[i].saturating_sub(s)
        );
    }

    for group in &view.groups {
        println!("\n{} TEAM", group.code.to_uppercase());
        println!("{}", "-".repeat(50));
        println!("  {}", group.summary);
        let points = &group.quadrant.points;
        if points.is_empty() {
            println!("  No {} employees in this selection", group.code);
            continue;
        }
        println!(
            "\n  {:<16} {:>12} {:>12}  {}",
            "Operator", "Avg RelEff", "CV", "Quadrant"
        );
        for p in points {
            println!(
                "  {:<16} {:>12} {:>12}  {}",
                p.operator,
                fmt_value(p.avg_relative_efficiency, 3),
                fmt_value(p.detrended_cv, 3),
                p.quadrant.label()
            );
        }
    }

    println!("\n{}", "=".repeat(70));
}

fn print_matrix(matrix: &VolumeMatrix) {
    if matrix.is_empty() {
        println!("No scans in this selection");
        return;
    }
    let width = matrix.operators.iter().map(|o| o.len()).max().unwrap_or(8).max(8);

    print!("{:<width$}", "Operator", width = width);
    for label in matrix.bucket_labels() {
        print!(" {:>6}", label);
    }
    println!(" {:>8}", "Total");

    for (op, row) in matrix.operators.iter().zip(&matrix.counts) {
        print!("{:<width$}", op, width = width);
        for v in row {
            print!(" {:>6}", v);
        }
        println!(" {:>8}", row.iter().map(|v| u64::from(*v)).sum::<u64>());
    }

    print!("{:<width$}", "Total", width = width);
    for v in matrix.column_totals() {
        print!(" {:>6}", v);
    }
    println!(" {:>8}", matrix.total());
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = DashboardConfig::load(cli.config.as_deref()).context("Failed to load config")?;

    match &cli.command {
        Command::Report(args) => print_report(&build_view(&config, args)?),
        Command::Matrix(args) => print_matrix(&build_view(&config, args)?.matrix),
    }

    Ok(())
}
