//! Chart builders
//!
//! Pure functions from aggregated tables to renderer-agnostic chart specs.
//! Category axes always use bucket labels in start-hour order. Non-finite
//! numbers serialize as `null`.

use serde::Serialize;

use crate::aggregate::VolumeMatrix;
use crate::config::{LaborGroup, QuadrantReference};
use crate::efficiency::OperatorSummary;

const CHART_HEIGHT: u32 = 520;
const AXIS_LINE_COLOR: &str = "rgba(0,0,0,0.55)";
const QUADRANT_FILL: &str = "rgba(0,0,0,0.03)";
const QUADRANT_ALERT_FILL: &str = "rgba(220, 53, 69, 0.18)";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SeriesKind {
    Bar,
    Line,
    /// Text labels only, no marks
    Text,
    Markers,
}

#[derive(Debug, Clone, Serialize)]
pub struct Series {
    pub name: String,
    pub kind: SeriesKind,
    /// Numeric x values; `None` means the chart's `x_categories`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<Vec<f64>>,
    pub y: Vec<f64>,
    /// Per-point annotations
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<Vec<String>>,
    pub show_legend: bool,
}

impl Series {
    fn new(name: &str, kind: SeriesKind, y: Vec<f64>) -> Self {
        Self {
            name: name.to_string(),
            kind,
            x: None,
            y,
            text: None,
            show_legend: !matches!(kind, SeriesKind::Text),
        }
    }

    fn with_text(mut self, text: Vec<String>) -> Self {
        self.text = Some(text);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Axis {
    X,
    Y,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LineDash {
    Solid,
    Dash,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReferenceLine {
    pub axis: Axis,
    pub value: f64,
    pub dash: LineDash,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Rect {
    pub x0: f64,
    pub x1: f64,
    pub y0: f64,
    pub y1: f64,
    pub fill: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Annotation {
    pub x: f64,
    pub y: f64,
    pub text: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChartStyle {
    pub height: u32,
    pub background: String,
    pub x_title: String,
    pub y_title: String,
    /// Category x axis in the order of `x_categories`
    pub categorical_x: bool,
    pub stacked: bool,
    pub legend_orientation: String,
    pub legend_position: String,
    pub axis_line_color: String,
    pub gridlines: bool,
    pub y_from_zero: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x_range: Option<[f64; 2]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y_range: Option<[f64; 2]>,
}

impl ChartStyle {
    /// Shared look of the bucket-axis charts.
    pub fn bucket_axis(y_title: &str) -> Self {
        Self {
            height: CHART_HEIGHT,
            background: "white".to_string(),
            x_title: "Time Bin".to_string(),
            y_title: y_title.to_string(),
            categorical_x: true,
            stacked: false,
            legend_orientation: "h".to_string(),
            legend_position: "top".to_string(),
            axis_line_color: AXIS_LINE_COLOR.to_string(),
            gridlines: true,
            y_from_zero: true,
            x_range: None,
            y_range: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Chart {
    pub title: String,
    pub x_categories: Vec<String>,
    pub series: Vec<Series>,
    pub reference_lines: Vec<ReferenceLine>,
    pub shapes: Vec<Rect>,
    pub annotations: Vec<Annotation>,
    pub style: ChartStyle,
}

impl Chart {
    fn on_buckets(title: &str, matrix: &VolumeMatrix, style: ChartStyle) -> Self {
        Self {
            title: title.to_string(),
            x_categories: matrix.bucket_labels(),
            series: Vec::new(),
            reference_lines: Vec::new(),
            shapes: Vec::new(),
            annotations: Vec::new(),
            style,
        }
    }

    pub fn series_named(&self, name: &str) -> Option<&Series> {
        self.series.iter().find(|s| s.name == name)
    }
}

fn to_f64(values: &[u64]) -> Vec<f64> {
    values.iter().map(|v| *v as f64).collect()
}

/// Stacked hourly volume: sorter on top of everyone else, total above each bar
/// and sorter share inside the sorter segment.
pub fn sorter_vs_total(matrix: &VolumeMatrix, sorter_name: &str) -> Chart {
    let mut chart = Chart::on_buckets("Sorter vs Total Volume", matrix, ChartStyle::bucket_axis("Scan Count"));
    chart.style.stacked = true;

    let totals = matrix.column_totals();
    let sorter: Vec<u64> = match matrix.row(sorter_name) {
        Some(row) => row.iter().map(|v| u64::from(*v)).collect(),
        None => vec![0; totals.len()],
    };
    let others: Vec<u64> = totals.iter().zip(&sorter).map(|(t, s)| t - s).collect();

    let share_text: Vec<String> = totals
        .iter()
        .zip(&sorter)
        .map(|(t, s)| {
            if *t == 0 {
                String::new()
            } else {
                format!("{:.1}%", *s as f64 / *t as f64 * 100.0)
            }
        })
        .collect();
    let share_mid: Vec<f64> = others
        .iter()
        .zip(&sorter)
        .map(|(o, s)| *o as f64 + *s as f64 / 2.0)
        .collect();

    chart.series.push(Series::new("Others (All non-sorter)", SeriesKind::Bar, to_f64(&others)));
    chart.series.push(Series::new("Sorter", SeriesKind::Bar, to_f64(&sorter)));
    chart.series.push(
        Series::new("Total", SeriesKind::Text, to_f64(&totals))
            .with_text(totals.iter().map(|t| t.to_string()).collect()),
    );
    chart
        .series
        .push(Series::new("Sorter Share", SeriesKind::Text, share_mid).with_text(share_text));
    chart
}

/// One line per labor group, summing operators whose id starts with the group's prefix.
pub fn labor_group_lines(matrix: &VolumeMatrix, groups: &[LaborGroup]) -> Chart {
    let mut chart = Chart::on_buckets(
        "Total Sorting Volume by Labor Group",
        matrix,
        ChartStyle::bucket_axis("Total Volume"),
    );

    for group in groups {
        let sums = matrix.column_totals_where(|op| op.starts_with(group.prefix()));
        chart.series.push(
            Series::new(&group.code, SeriesKind::Line, to_f64(&sums))
                .with_text(sums.iter().map(|v| v.to_string()).collect()),
        );
    }
    chart
}

/// Per-employee lines with a fixed benchmark and the overall average.
pub fn employee_curves(frame: &VolumeMatrix, group_code: &str, benchmark: f64, overall_avg: f64) -> Chart {
    let mut chart = Chart::on_buckets(
        &format!("{} Employee Efficiency Curves", group_code),
        frame,
        ChartStyle::bucket_axis("Scan Count"),
    );

    for (op, row) in frame.operators.iter().zip(&frame.counts) {
        chart.series.push(Series::new(
            op,
            SeriesKind::Line,
            row.iter().map(|v| f64::from(*v)).collect(),
        ));
    }

    chart.reference_lines.push(ReferenceLine {
        axis: Axis::Y,
        value: benchmark,
        dash: LineDash::Solid,
        label: None,
    });
    chart.reference_lines.push(ReferenceLine {
        axis: Axis::Y,
        value: overall_avg,
        dash: LineDash::Dash,
        label: Some(format!("Overall Avg = {:.1}", overall_avg)),
    });
    chart
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Quadrant {
    #[serde(rename = "Low & Unstable")]
    LowUnstable,
    #[serde(rename = "High & Unstable")]
    HighUnstable,
    #[serde(rename = "Low & Stable")]
    LowStable,
    #[serde(rename = "High & Stable")]
    HighStable,
}

impl Quadrant {
    pub fn classify(efficiency: f64, cv: f64, x_ref: f64, y_ref: f64) -> Self {
        match (efficiency < x_ref, cv > y_ref) {
            (true, true) => Quadrant::LowUnstable,
            (false, true) => Quadrant::HighUnstable,
            (true, false) => Quadrant::LowStable,
            (false, false) => Quadrant::HighStable,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Quadrant::LowUnstable => "Low & Unstable",
            Quadrant::HighUnstable => "High & Unstable",
            Quadrant::LowStable => "Low & Stable",
            Quadrant::HighStable => "High & Stable",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct QuadrantPoint {
    pub operator: String,
    pub avg_relative_efficiency: f64,
    pub detrended_cv: f64,
    pub quadrant: Quadrant,
}

#[derive(Debug, Clone, Serialize)]
pub struct QuadrantChart {
    pub chart: Chart,
    pub x_ref: f64,
    pub y_ref: f64,
    pub points: Vec<QuadrantPoint>,
}

fn median(sorted: &[f64]) -> f64 {
    let n = sorted.len();
    match n {
        0 => f64::NAN,
        _ if n % 2 == 1 => sorted[n / 2],
        _ => (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0,
    }
}

/// Padded axis range; a zero span gets a fixed pad of 0.2.
fn padded(min: f64, max: f64, frac: f64) -> (f64, f64) {
    let pad = if max > min { (max - min) * frac } else { 0.2 };
    (min - pad, max + pad)
}

/// Average relative efficiency against de-trended CV. Operators with a
/// non-finite value on either axis are left out.
pub fn quadrant(summaries: &[OperatorSummary], group_code: &str, reference: QuadrantReference) -> QuadrantChart {
    let x_ref = 1.0;
    let usable: Vec<&OperatorSummary> = summaries
        .iter()
        .filter(|s| s.avg_relative_efficiency.is_finite() && s.detrended_cv.is_finite())
        .collect();

    let mut cvs: Vec<f64> = usable.iter().map(|s| s.detrended_cv).collect();
    cvs.sort_by(|a, b| a.total_cmp(b));
    let y_ref = match reference {
        QuadrantReference::Median => median(&cvs),
        QuadrantReference::Mean if cvs.is_empty() => f64::NAN,
        QuadrantReference::Mean => cvs.iter().sum::<f64>() / cvs.len() as f64,
    };

    let mut style = ChartStyle::bucket_axis("De-trended CV (within company)");
    style.x_title = "Avg Relative Efficiency (within company)".to_string();
    style.categorical_x = false;
    style.y_from_zero = false;

    let mut chart = Chart {
        title: format!("{} Relative Efficiency Quadrant", group_code),
        x_categories: Vec::new(),
        series: Vec::new(),
        reference_lines: Vec::new(),
        shapes: Vec::new(),
        annotations: Vec::new(),
        style,
    };

    if usable.is_empty() {
        return QuadrantChart {
            chart,
            x_ref,
            y_ref,
            points: Vec::new(),
        };
    }

    let xs: Vec<f64> = usable.iter().map(|s| s.avg_relative_efficiency).collect();
    let x_min = xs.iter().copied().fold(f64::INFINITY, f64::min);
    let x_max = xs.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let (x_min, x_max) = padded(x_min, x_max, 0.08);
    let (y_min, y_max) = padded(cvs[0], cvs[cvs.len() - 1], 0.10);
    let y_min = y_min.max(0.0);

    chart.style.x_range = Some([x_min, x_max]);
    chart.style.y_range = Some([y_min, y_max]);

    let mut series = Series::new("Employees", SeriesKind::Markers, usable.iter().map(|s| s.detrended_cv).collect());
    series.x = Some(xs);
    series.text = Some(usable.iter().map(|s| s.operator.clone()).collect());
    series.show_legend = false;
    chart.series.push(series);

    let rect = |x0: f64, x1: f64, y0: f64, y1: f64, fill: &str| Rect {
        x0,
        x1,
        y0,
        y1,
        fill: fill.to_string(),
    };
    chart.shapes.push(rect(x_min, x_ref, y_min, y_ref, QUADRANT_FILL));
    chart.shapes.push(rect(x_ref, x_max, y_min, y_ref, QUADRANT_FILL));
    chart.shapes.push(rect(x_min, x_ref, y_ref, y_max, QUADRANT_ALERT_FILL));
    chart.shapes.push(rect(x_ref, x_max, y_ref, y_max, QUADRANT_FILL));

    for (axis, value) in [(Axis::X, x_ref), (Axis::Y, y_ref)] {
        chart.reference_lines.push(ReferenceLine {
            axis,
            value,
            dash: LineDash::Dash,
            label: None,
        });
    }

    let x_left = x_min + 0.5 * (x_ref - x_min);
    let x_right = x_ref + 0.5 * (x_max - x_ref);
    let y_low = y_min + 0.5 * (y_ref - y_min);
    let y_high = y_ref + 0.5 * (y_max - y_ref);
    for (x, y, q) in [
        (x_left, y_high, Quadrant::LowUnstable),
        (x_right, y_high, Quadrant::HighUnstable),
        (x_left, y_low, Quadrant::LowStable),
        (x_right, y_low, Quadrant::HighStable),
    ] {
        chart.annotations.push(Annotation {
            x,
            y,
            text: q.label().to_string(),
        });
    }

    let points = usable
        .iter()
        .map(|s| QuadrantPoint {
            operator: s.operator.clone(),
            avg_relative_efficiency: s.avg_relative_efficiency,
            detrended_cv: s.detrended_cv,
            quadrant: Quadrant::classify(s.avg_relative_efficiency, s.detrended_cv, x_ref, y_ref),
        })
        .collect();

    QuadrantChart {
        chart,
        x_ref,
        y_ref,
        points,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buckets::Bucket;

    fn matrix(rows: &[(&str, &[u32])], hours: &[u8]) -> VolumeMatrix {
        VolumeMatrix {
            operators: rows.iter().map(|(op, _)| op.to_string()).collect(),
            buckets: hours.iter().map(|h| Bucket::new(*h).unwrap()).collect(),
            counts: rows.iter().map(|(_, r)| r.to_vec()).collect(),
        }
    }

    fn summary(op: &str, avg: f64, cv: f64) -> OperatorSummary {
        OperatorSummary {
            operator: op.to_string(),
            avg_relative_efficiency: avg,
            detrended_std: cv * avg,
            detrended_cv: cv,
        }
    }

    #[test]
    fn test_sorter_vs_total() {
        let m = matrix(&[("JOU1", &[30, 10]), ("sorter", &[10, 0])], &[9, 10]);
        let chart = sorter_vs_total(&m, "sorter");

        assert_eq!(chart.x_categories, vec!["9-10", "10-11"]);
        assert!(chart.style.stacked);
        assert_eq!(chart.series_named("Others (All non-sorter)").unwrap().y, vec![30.0, 10.0]);
        assert_eq!(chart.series_named("Sorter").unwrap().y, vec![10.0, 0.0]);

        let total = chart.series_named("Total").unwrap();
        assert_eq!(total.text.as_ref().unwrap(), &vec!["40".to_string(), "10".to_string()]);

        let share = chart.series_named("Sorter Share").unwrap();
        assert_eq!(share.text.as_ref().unwrap(), &vec!["25.0%".to_string(), "0.0%".to_string()]);
        assert_eq!(share.y, vec![35.0, 10.0]);
    }

    #[test]
    fn test_sorter_missing_is_zero() {
        let m = matrix(&[("JOU1", &[5])], &[9]);
        let chart = sorter_vs_total(&m, "sorter");
        assert_eq!(chart.series_named("Sorter").unwrap().y, vec![0.0]);
        assert_eq!(chart.series_named("Others (All non-sorter)").unwrap().y, vec![5.0]);
    }

    #[test]
    fn test_labor_group_lines_use_case_sensitive_prefix() {
        let m = matrix(
            &[("JOU1", &[1, 2]), ("JOU2", &[3, 4]), ("RD1", &[5, 0]), ("pr1", &[1, 1]), ("PR9", &[7, 7])],
            &[9, 10],
        );
        let groups = vec![
            LaborGroup::new("JOU", "^JOU", true),
            LaborGroup::new("RD", "^RD", true),
            LaborGroup::new("pr", "^pr", false),
        ];
        let chart = labor_group_lines(&m, &groups);
        assert_eq!(chart.series_named("JOU").unwrap().y, vec![4.0, 6.0]);
        assert_eq!(chart.series_named("RD").unwrap().y, vec![5.0, 0.0]);
        assert_eq!(chart.series_named("pr").unwrap().y, vec![1.0, 1.0]);
        assert_eq!(chart.series_named("JOU").unwrap().text.as_ref().unwrap()[1], "6");
    }

    #[test]
    fn test_employee_curves_reference_lines() {
        let m = matrix(&[("JOU1", &[10, 20]), ("JOU2", &[30, 40])], &[9, 10]);
        let chart = employee_curves(&m, "JOU", 600.0, 25.0);
        assert_eq!(chart.series.len(), 2);
        assert_eq!(chart.reference_lines[0].value, 600.0);
        assert_eq!(chart.reference_lines[0].dash, LineDash::Solid);
        assert_eq!(chart.reference_lines[1].label.as_deref(), Some("Overall Avg = 25.0"));
    }

    #[test]
    fn test_quadrant_median_and_classification() {
        let summaries = vec![
            summary("A", 0.6, 0.9),
            summary("B", 1.4, 0.2),
            summary("C", 1.0, 0.5),
            summary("D", f64::NAN, 0.1),
            summary("E", 0.8, f64::INFINITY),
        ];
        let q = quadrant(&summaries, "JOU", QuadrantReference::Median);
        assert_eq!(q.points.len(), 3);
        assert!((q.y_ref - 0.5).abs() < 1e-12);
        assert_eq!(q.points[0].quadrant, Quadrant::LowUnstable);
        assert_eq!(q.points[1].quadrant, Quadrant::HighStable);
        assert_eq!(q.points[2].quadrant, Quadrant::HighStable);

        let [x0, x1] = q.chart.style.x_range.unwrap();
        assert!((x0 - (0.6 - 0.8 * 0.08)).abs() < 1e-12);
        assert!((x1 - (1.4 + 0.8 * 0.08)).abs() < 1e-12);
        let [y0, _] = q.chart.style.y_range.unwrap();
        assert!((y0 - (0.2 - 0.07)).abs() < 1e-12);
        assert_eq!(q.chart.shapes.len(), 4);
        assert_eq!(q.chart.shapes[2].fill, QUADRANT_ALERT_FILL);
        assert_eq!(q.chart.annotations.len(), 4);
    }

    #[test]
    fn test_quadrant_mean_and_single_point() {
        let q = quadrant(&[summary("A", 1.2, 0.4)], "RD", QuadrantReference::Mean);
        assert!((q.y_ref - 0.4).abs() < 1e-12);
        let [x0, x1] = q.chart.style.x_range.unwrap();
        assert!((x0 - 1.0).abs() < 1e-12);
        assert!((x1 - 1.4).abs() < 1e-12);
        assert_eq!(q.chart.style.y_range.unwrap()[0], 0.2);
    }

    #[test]
    fn test_quadrant_empty() {
        let q = quadrant(&[], "JOU", QuadrantReference::Median);
        assert!(q.points.is_empty());
        assert!(q.chart.series.is_empty());
        assert!(q.y_ref.is_nan());
    }

    #[test]
    fn test_nan_serializes_as_null() {
        let q = quadrant(&[], "JOU", QuadrantReference::Median);
        let json = serde_json::to_value(&q).unwrap();
        assert!(json["y_ref"].is_null());
    }
}
