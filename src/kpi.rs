//! Header figures: time context and the KPI row.

use serde::Serialize;
use std::collections::HashSet;

use crate::aggregate::VolumeMatrix;
use crate::models::ScanRecord;

pub const PLACEHOLDER: &str = "-";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KpiSummary {
    pub total_volume: u64,
    pub sorter_volume: u64,
    /// Percent, 0.0 when there is no volume.
    pub sorter_share: f64,
    pub peak_bucket: String,
    pub peak_volume: u64,
}

pub fn kpi_summary(matrix: &VolumeMatrix, sorter_name: &str) -> KpiSummary {
    let totals = matrix.column_totals();
    let total_volume: u64 = totals.iter().sum();
    let sorter_volume: u64 = matrix
        .row(sorter_name)
        .map(|row| row.iter().map(|v| u64::from(*v)).sum())
        .unwrap_or(0);
    let sorter_share = if total_volume > 0 {
        sorter_volume as f64 / total_volume as f64 * 100.0
    } else {
        0.0
    };

    // first bucket wins a tie
    let peak = totals
        .iter()
        .enumerate()
        .fold(None::<(usize, u64)>, |best, (i, v)| match best {
            Some((_, b)) if b >= *v => best,
            _ => Some((i, *v)),
        });

    let (peak_bucket, peak_volume) = match peak {
        Some((i, v)) => (matrix.buckets[i].label(), v),
        None => (PLACEHOLDER.to_string(), 0),
    };

    KpiSummary {
        total_volume,
        sorter_volume,
        sorter_share,
        peak_bucket,
        peak_volume,
    }
}

/// "2025-01-01 | 09:15–17:40" within one day, otherwise
/// "2025-01-01 23:05 → 2025-01-02 06:50"; "-" without records.
pub fn time_context<'a, I>(records: I) -> String
where
    I: IntoIterator<Item = &'a ScanRecord>,
{
    let mut bounds = None;
    for r in records {
        bounds = match bounds {
            None => Some((r.op_time, r.op_time)),
            Some((lo, hi)) => Some((lo.min(r.op_time), hi.max(r.op_time))),
        };
    }

    match bounds {
        None => PLACEHOLDER.to_string(),
        Some((start, end)) if start.date() == end.date() => format!(
            "{} | {}–{}",
            start.format("%Y-%m-%d"),
            start.format("%H:%M"),
            end.format("%H:%M")
        ),
        Some((start, end)) => format!(
            "{} → {}",
            start.format("%Y-%m-%d %H:%M"),
            end.format("%Y-%m-%d %H:%M")
        ),
    }
}

pub fn distinct_operators<'a, I>(records: I) -> usize
where
    I: IntoIterator<Item = &'a ScanRecord>,
{
    records
        .into_iter()
        .map(|r| r.operator.as_str())
        .collect::<HashSet<_>>()
        .len()
}
