//! Synthetic scan-record generator
//!
//! Writes a CSV in the sorting-center export layout: one row per scan event,
//! with per-employee skill, shift assignment, re-scans and a few unusable rows.
//!
//! Usage:
//!   cargo run --release --bin generate_synthetic -- [OPTIONS]
//!
//! Options:
//!   --days <N>            Number of days to generate (default: 3)
//!   --start-date <DATE>   First day, YYYY-MM-DD (default: 2025-01-06)
//!   --jou <N>             JOU employees (default: 12)
//!   --rd <N>              RD employees (default: 10)
//!   --pr <N>              pr employees (default: 6)
//!   --rescan-rate <F>     Probability a scan repeats a previous waybill (default: 0.05)
//!   --bad-row-rate <F>    Probability of an unusable row (default: 0.005)
//!   --seed <N>            Random seed for reproducibility (optional)
//!   --output <PATH>       Output CSV path (default: data/scan_records.csv)

use chrono::{Duration, NaiveDate, NaiveDateTime};
use clap::Parser;
use csv::WriterBuilder;
use rand::prelude::*;
use rand::rngs::StdRng;
use scan_throughput::models::ShiftWindow;
use scan_throughput::shift::in_shift_hours;
use serde::Serialize;
use std::error::Error;
use std::path::PathBuf;

/// Synthetic scan-record generator
#[derive(Parser, Debug)]
#[command(name = "generate_synthetic")]
#[command(about = "Generate synthetic sorting-center scan records")]
struct Args {
    /// Number of days to generate
    #[arg(long, default_value = "3")]
    days: u32,

    /// First day
    #[arg(long, default_value = "2025-01-06")]
    start_date: NaiveDate,

    /// JOU employees
    #[arg(long, default_value = "12")]
    jou: usize,

    /// RD employees
    #[arg(long, default_value = "10")]
    rd: usize,

    /// pr employees
    #[arg(long, default_value = "6")]
    pr: usize,

    /// Mean scans per hour for an average employee
    #[arg(long, default_value = "45")]
    employee_rate: u32,

    /// Mean scans per hour for the automated sorter
    #[arg(long, default_value = "320")]
    sorter_rate: u32,

    /// Probability that a scan repeats an earlier waybill of the same operator
    #[arg(long, default_value = "0.05")]
    rescan_rate: f64,

    /// Probability of emitting an unusable row (bad timestamp or blank operator)
    #[arg(long, default_value = "0.005")]
    bad_row_rate: f64,

    /// Random seed for reproducibility
    #[arg(long)]
    seed: Option<u64>,

    /// Output CSV path
    #[arg(long, default_value = "data/scan_records.csv")]
    output: PathBuf,
}

/// One exported scan row
#[derive(Debug, Serialize)]
struct OutputRecord {
    #[serde(rename = "Operation time")]
    operation_time: String,
    #[serde(rename = "Operator")]
    operator: String,
    #[serde(rename = "Waybill No.")]
    waybill_no: String,
    #[serde(rename = "Scan type")]
    scan_type: &'static str,
}

struct Employee {
    id: String,
    shift: ShiftWindow,
    /// Multiplier on the mean hourly rate
    skill: f64,
    /// Chance of a near-idle hour
    idle_rate: f64,
}

fn make_team(prefix: &str, count: usize, rng: &mut impl Rng) -> Vec<Employee> {
    (1..=count)
        .map(|n| Employee {
            id: format!("{}{:03}", prefix, n),
            shift: ShiftWindow::ALL[rng.gen_range(0..ShiftWindow::ALL.len())],
            skill: rng.gen_range(0.55..1.45),
            idle_rate: rng.gen_range(0.0..0.15),
        })
        .collect()
}

/// Ramp-up at shift start and a dip in the middle of the shift
fn hour_factor(shift: ShiftWindow, hour: u32) -> f64 {
    let start = match shift {
        ShiftWindow::Early => 7,
        ShiftWindow::Mid => 15,
        ShiftWindow::Night => 23,
    };
    match (hour + 24 - start) % 24 {
        0 => 0.6,
        4 => 0.5,
        _ => 1.0,
    }
}

/// Poisson-ish count: mean with ±30% uniform noise
fn scan_count(mean: f64, rng: &mut impl Rng) -> u32 {
    if mean <= 0.0 {
        return 0;
    }
    (mean * rng.gen_range(0.7..1.3)).round().max(0.0) as u32
}

fn format_time(dt: &NaiveDateTime) -> String {
    dt.format("%H:%M:%S %d/%m/%Y").to_string()
}

struct ScanWriter<W: std::io::Write> {
    writer: csv::Writer<W>,
    next_waybill: u64,
    written: usize,
    rescans: usize,
    bad_rows: usize,
}

impl<W: std::io::Write> ScanWriter<W> {
    fn new_waybill(&mut self) -> String {
        self.next_waybill += 1;
        format!("MIA{:010}", self.next_waybill)
    }

    /// Write `count` scans for `operator` spread over the hour starting at `hour_start`.
    fn write_hour(
        &mut self,
        operator: &str,
        hour_start: NaiveDateTime,
        count: u32,
        args: &Args,
        rng: &mut impl Rng,
    ) -> Result<(), Box<dyn Error>> {
        let mut recent: Vec<String> = Vec::new();
        for _ in 0..count {
            let ts = hour_start + Duration::seconds(rng.gen_range(0..3600));

            if rng.gen::<f64>() < args.bad_row_rate {
                let row = if rng.gen_bool(0.5) {
                    OutputRecord {
                        operation_time: "not a time".to_string(),
                        operator: operator.to_string(),
                        waybill_no: self.new_waybill(),
                        scan_type: "ARRIVAL",
                    }
                } else {
                    OutputRecord {
                        operation_time: format_time(&ts),
                        operator: String::new(),
                        waybill_no: self.new_waybill(),
                        scan_type: "ARRIVAL",
                    }
                };
                self.writer.serialize(&row)?;
                self.bad_rows += 1;
                continue;
            }

            let waybill = match recent.choose(rng) {
                Some(w) if rng.gen::<f64>() < args.rescan_rate => {
                    self.rescans += 1;
                    w.clone()
                }
                _ => self.new_waybill(),
            };
            self.writer.serialize(&OutputRecord {
                operation_time: format_time(&ts),
                operator: operator.to_string(),
                waybill_no: waybill.clone(),
                scan_type: "ARRIVAL",
            })?;
            recent.push(waybill);
            self.written += 1;
        }
        Ok(())
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    println!("🔧 Synthetic Scan Generator");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("Output:           {}", args.output.display());
    println!("Days:             {} from {}", args.days, args.start_date);
    println!("Employees:        JOU {} / RD {} / pr {}", args.jou, args.rd, args.pr);
    println!("Employee rate:    {} scans/h", args.employee_rate);
    println!("Sorter rate:      {} scans/h", args.sorter_rate);
    println!("Rescan rate:      {:.1}%", args.rescan_rate * 100.0);
    println!("Bad row rate:     {:.2}%", args.bad_row_rate * 100.0);
    if let Some(seed) = args.seed {
        println!("Random seed:      {}", seed);
    }
    println!();

    // Initialize RNG
    let mut rng: StdRng = match args.seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    };

    let mut employees = make_team("JOU", args.jou, &mut rng);
    employees.extend(make_team("RD", args.rd, &mut rng));
    employees.extend(make_team("pr", args.pr, &mut rng));

    // Ensure output directory exists
    if let Some(parent) = args.output.parent() {
        std::fs::create_dir_all(parent)?;
    }

    println!("🏭 Generating scans...");
    let mut out = ScanWriter {
        writer: WriterBuilder::new().has_headers(true).from_path(&args.output)?,
        next_waybill: 0,
        written: 0,
        rescans: 0,
        bad_rows: 0,
    };

    for d in 0..args.days {
        let day = args.start_date + Duration::days(i64::from(d));
        for hour in 0..24u32 {
            let Some(hour_start) = day.and_hms_opt(hour, 0, 0) else {
                continue;
            };

            let sorter_mean = f64::from(args.sorter_rate) * if (1..5).contains(&hour) { 0.4 } else { 1.0 };
            let count = scan_count(sorter_mean, &mut rng);
            out.write_hour("sorter", hour_start, count, &args, &mut rng)?;

            for emp in &employees {
                if !in_shift_hours(emp.shift, hour) {
                    continue;
                }
                let mut mean = f64::from(args.employee_rate) * emp.skill * hour_factor(emp.shift, hour);
                if rng.gen::<f64>() < emp.idle_rate {
                    mean *= 0.1;
                }
                let count = scan_count(mean, &mut rng);
                out.write_hour(&emp.id, hour_start, count, &args, &mut rng)?;
            }
        }
        println!("   Day {} ({}) done, {} rows so far", d + 1, day, out.written + out.bad_rows);
    }

    out.writer.flush()?;

    println!("\n✅ Generation complete!");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("Scan rows:         {:>8}", out.written);
    println!("  of which rescans {:>8}", out.rescans);
    println!("Unusable rows:     {:>8}", out.bad_rows);
    println!("Operators:         {:>8}", employees.len() + 1);
    println!("Output file:       {}", args.output.display());

    Ok(())
}
