//! Full recomputation of one dashboard view: shift filter, aggregation, KPIs,
//! charts and the per-group deep dives. Nothing here is incremental.

use serde::Serialize;
use tracing::debug;

use crate::aggregate::VolumeMatrix;
use crate::charts::{self, Chart, QuadrantChart};
use crate::config::{DashboardConfig, LaborGroup};
use crate::efficiency::{bottom_n, employee_frame, team_average, EfficiencyFrame, OperatorSummary};
use crate::error::Result;
use crate::kpi::{self, KpiSummary};
use crate::loader::ScanDataset;
use crate::models::{DateRange, ScanRecord};
use crate::session::Session;
use crate::shift::filter_by_shift;

#[derive(Debug, Clone, Serialize)]
pub struct Header {
    pub time_context: String,
    pub shift: String,
    pub date_range: DateRange,
    pub records: usize,
    pub operators: usize,
    pub sorting_center: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct GroupReport {
    pub code: String,
    pub frame: EfficiencyFrame,
    pub team_average: f64,
    pub bottom: Vec<OperatorSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GroupDeepDive {
    pub code: String,
    pub employee_curves: Chart,
    pub quadrant: QuadrantChart,
    pub team_average: f64,
    pub bottom: Vec<String>,
    pub summary: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardView {
    pub dataset_id: String,
    pub header: Header,
    pub kpis: KpiSummary,
    pub matrix: VolumeMatrix,
    pub sorter_vs_total: Chart,
    pub labor_group_volume: Chart,
    pub groups: Vec<GroupDeepDive>,
}

/// Records selected by the session's shift and date range, and their matrix.
pub fn filtered<'a>(dataset: &'a ScanDataset, session: &Session) -> (Vec<&'a ScanRecord>, VolumeMatrix) {
    let records = filter_by_shift(&dataset.records, &session.date_range, session.shift);
    let matrix = VolumeMatrix::from_records(records.iter().copied());
    debug!(
        "{} of {} records in {} for {}..={}",
        records.len(),
        dataset.records.len(),
        session.shift,
        session.date_range.start,
        session.date_range.end
    );
    (records, matrix)
}

pub fn group_report(matrix: &VolumeMatrix, group: &LaborGroup, config: &DashboardConfig) -> Result<GroupReport> {
    let selector = group.selector()?;
    let frame = EfficiencyFrame::compute(matrix, &selector, true, config.epsilon);
    let employees = employee_frame(matrix, &selector, true);
    let bottom = bottom_n(&frame.summaries, config.bottom_n)
        .into_iter()
        .cloned()
        .collect();

    Ok(GroupReport {
        code: group.code.clone(),
        team_average: team_average(&employees),
        frame,
        bottom,
    })
}

pub fn group_summary_line(time_context: &str, code: &str, team_avg: f64, bottom: &[String]) -> String {
    let lowest = if bottom.is_empty() {
        "(none)".to_string()
    } else {
        bottom.join(", ")
    };
    format!(
        "In {}, {} team employees averaged {:.1} scans per hour. Lowest efficiency: {}",
        time_context, code, team_avg, lowest
    )
}

fn deep_dive(matrix: &VolumeMatrix, group: &LaborGroup, config: &DashboardConfig, time_context: &str) -> Result<GroupDeepDive> {
    let report = group_report(matrix, group, config)?;
    let employees = employee_frame(matrix, &group.selector()?, true);
    let bottom: Vec<String> = report.bottom.iter().map(|s| s.operator.clone()).collect();

    Ok(GroupDeepDive {
        employee_curves: charts::employee_curves(&employees, &group.code, config.benchmark, report.team_average),
        quadrant: charts::quadrant(&report.frame.summaries, &group.code, config.quadrant_reference),
        summary: group_summary_line(time_context, &group.code, report.team_average, &bottom),
        team_average: report.team_average,
        code: report.code,
        bottom,
    })
}

pub fn build_dashboard(dataset: &ScanDataset, session: &Session, config: &DashboardConfig) -> Result<DashboardView> {
    let (records, matrix) = filtered(dataset, session);
    let time_context = kpi::time_context(records.iter().copied());

    let header = Header {
        time_context: time_context.clone(),
        shift: session.shift.name().to_string(),
        date_range: session.date_range,
        records: records.len(),
        operators: kpi::distinct_operators(records.iter().copied()),
        sorting_center: config.sorting_center.clone(),
    };

    let groups = config
        .labor_groups
        .iter()
        .filter(|g| g.deep_dive)
        .map(|g| deep_dive(&matrix, g, config, &time_context))
        .collect::<Result<Vec<_>>>()?;

    Ok(DashboardView {
        dataset_id: session.dataset_id.to_string(),
        kpis: kpi::kpi_summary(&matrix, &config.sorter_name),
        sorter_vs_total: charts::sorter_vs_total(&matrix, &config.sorter_name),
        labor_group_volume: charts::labor_group_lines(&matrix, &config.labor_groups),
        header,
        matrix,
        groups,
    })
}
