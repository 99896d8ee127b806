//! Within-group relative efficiency.
//!
//! Each operator is compared with the mean of their own labor group, bucket by
//! bucket, so the shared time-of-day trend cancels out. Undefined values are
//! NaN and stay NaN: they are never coerced to zero or infinity.

use regex::{Regex, RegexBuilder};
use serde::Serialize;

use crate::aggregate::VolumeMatrix;
use crate::buckets::Bucket;
use crate::error::{PipelineError, Result};

pub const DEFAULT_EPSILON: f64 = 1e-9;

/// Case-insensitive operator filter built from regex patterns ("^JOU").
#[derive(Debug, Clone)]
pub struct SubgroupSelector {
    include: Option<Regex>,
    exclude: Option<Regex>,
}

fn compile(pattern: &str) -> Result<Regex> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map_err(|e| PipelineError::Config(format!("invalid operator pattern '{}': {}", pattern, e)))
}

impl SubgroupSelector {
    pub fn new(include: Option<&str>, exclude: Option<&str>) -> Result<Self> {
        Ok(Self {
            include: include.filter(|p| !p.is_empty()).map(compile).transpose()?,
            exclude: exclude.filter(|p| !p.is_empty()).map(compile).transpose()?,
        })
    }

    pub fn including(pattern: &str) -> Result<Self> {
        Self::new(Some(pattern), None)
    }

    pub fn matches(&self, operator: &str) -> bool {
        let operator = operator.trim();
        self.include.as_ref().map_or(true, |re| re.is_match(operator))
            && !self.exclude.as_ref().map_or(false, |re| re.is_match(operator))
    }
}

/// Employee frame: the selected rows of the matrix, optionally without all-zero rows.
pub fn employee_frame(matrix: &VolumeMatrix, selector: &SubgroupSelector, drop_all_zero: bool) -> VolumeMatrix {
    let frame = matrix.select_rows(|op| selector.matches(op));
    if drop_all_zero {
        frame.drop_zero_rows()
    } else {
        frame
    }
}

/// Mean over every cell of the frame; the team's average hourly scan count.
pub fn team_average(frame: &VolumeMatrix) -> f64 {
    let cells: Vec<f64> = frame.counts.iter().flatten().map(|v| f64::from(*v)).collect();
    if cells.is_empty() {
        return 0.0;
    }
    cells.iter().sum::<f64>() / cells.len() as f64
}

#[derive(Debug, Clone, Serialize)]
pub struct OperatorSummary {
    pub operator: String,
    pub avg_relative_efficiency: f64,
    pub detrended_std: f64,
    pub detrended_cv: f64,
}

impl OperatorSummary {
    /// Ranking ignores operators whose average is undefined, and those whose
    /// average is zero since their CV is undefined too.
    pub fn is_rankable(&self) -> bool {
        self.avg_relative_efficiency.is_finite() && self.avg_relative_efficiency != 0.0
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EfficiencyFrame {
    pub operators: Vec<String>,
    pub buckets: Vec<Bucket>,
    /// Group mean per bucket; NaN where the whole group was idle.
    pub bucket_mean: Vec<f64>,
    /// count / (bucket mean + ε)
    pub relative: Vec<Vec<f64>>,
    /// count − bucket mean
    pub residual: Vec<Vec<f64>>,
    pub summaries: Vec<OperatorSummary>,
}

fn mean_defined(values: &[f64]) -> f64 {
    let defined: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    if defined.is_empty() {
        return f64::NAN;
    }
    defined.iter().sum::<f64>() / defined.len() as f64
}

/// Sample standard deviation (n − 1) of the non-NaN values.
fn std_defined(values: &[f64]) -> f64 {
    let defined: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    if defined.len() < 2 {
        return f64::NAN;
    }
    let mean = defined.iter().sum::<f64>() / defined.len() as f64;
    let var = defined.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (defined.len() - 1) as f64;
    var.sqrt()
}

impl EfficiencyFrame {
    pub fn compute(matrix: &VolumeMatrix, selector: &SubgroupSelector, drop_all_zero: bool, epsilon: f64) -> Self {
        let group = employee_frame(matrix, selector, drop_all_zero);
        let n = group.operators.len();

        let bucket_mean: Vec<f64> = (0..group.buckets.len())
            .map(|col| {
                if n == 0 {
                    return f64::NAN;
                }
                let sum: f64 = group.counts.iter().map(|row| f64::from(row[col])).sum();
                let mean = sum / n as f64;
                if mean == 0.0 {
                    f64::NAN
                } else {
                    mean
                }
            })
            .collect();

        let relative: Vec<Vec<f64>> = group
            .counts
            .iter()
            .map(|row| {
                row.iter()
                    .zip(&bucket_mean)
                    .map(|(v, mean)| f64::from(*v) / (mean + epsilon))
                    .collect()
            })
            .collect();

        let residual: Vec<Vec<f64>> = group
            .counts
            .iter()
            .map(|row| row.iter().zip(&bucket_mean).map(|(v, mean)| f64::from(*v) - mean).collect())
            .collect();

        let summaries = group
            .operators
            .iter()
            .zip(relative.iter().zip(&residual))
            .map(|(op, (rel, res))| {
                let avg = mean_defined(rel);
                let std = std_defined(res);
                let cv = if avg == 0.0 { f64::NAN } else { std / avg };
                OperatorSummary {
                    operator: op.clone(),
                    avg_relative_efficiency: avg,
                    detrended_std: std,
                    detrended_cv: cv,
                }
            })
            .collect();

        Self {
            operators: group.operators,
            buckets: group.buckets,
            bucket_mean,
            relative,
            residual,
            summaries,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.operators.is_empty()
    }
}

/// The `n` rankable operators with the lowest average relative efficiency,
/// lowest first. Ties keep row order.
pub fn bottom_n(summaries: &[OperatorSummary], n: usize) -> Vec<&OperatorSummary> {
    let mut ranked: Vec<&OperatorSummary> = summaries.iter().filter(|s| s.is_rankable()).collect();
    ranked.sort_by(|a, b| {
        a.avg_relative_efficiency
            .partial_cmp(&b.avg_relative_efficiency)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    ranked.truncate(n);
    ranked
}
