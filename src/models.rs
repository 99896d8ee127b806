use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::buckets::{time_slot, Bucket};

pub const OPERATION_TIME_COLUMN: &str = "Operation time";
pub const OPERATOR_COLUMN: &str = "Operator";
pub const WAYBILL_COLUMN: &str = "Waybill No.";

/// Columns every scan export must carry. Anything else is ignored.
pub const REQUIRED_COLUMNS: [&str; 3] = [OPERATION_TIME_COLUMN, OPERATOR_COLUMN, WAYBILL_COLUMN];

/// Timestamp formats accepted for "Operation time", day-first. The first is the
/// export format ("14:59:55 13/12/2025").
const TIMESTAMP_FORMATS: [&str; 4] = [
    "%H:%M:%S %d/%m/%Y",
    "%d/%m/%Y %H:%M:%S",
    "%H:%M %d/%m/%Y",
    "%Y-%m-%d %H:%M:%S",
];

/// Raw row from a scan export
#[derive(Debug, Deserialize)]
pub struct CsvRecord {
    #[serde(rename = "Operation time", default)]
    pub operation_time: String,
    #[serde(rename = "Operator", default)]
    pub operator: String,
    #[serde(rename = "Waybill No.", default)]
    pub waybill_no: String,
}

/// Cleaned scan event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanRecord {
    pub operator: String,
    /// `None` when the export left the waybill blank; such rows never add to distinct counts.
    pub shipment: Option<String>,
    pub op_time: NaiveDateTime,
}

impl ScanRecord {
    pub fn new(operator: &str, shipment: &str, op_time: NaiveDateTime) -> Self {
        let shipment = shipment.trim();
        Self {
            operator: operator.trim().to_string(),
            shipment: (!shipment.is_empty()).then(|| shipment.to_string()),
            op_time,
        }
    }

    pub fn bucket(&self) -> Bucket {
        time_slot(&self.op_time).bucket
    }

    pub fn date(&self) -> NaiveDate {
        self.op_time.date()
    }
}

impl CsvRecord {
    /// `None` when the row must be discarded: unparseable timestamp, or an
    /// operator that is blank or the literal "nan".
    pub fn to_scan_record(&self) -> Option<ScanRecord> {
        let operator = self.operator.trim();
        if operator.is_empty() || operator.eq_ignore_ascii_case("nan") {
            return None;
        }
        let op_time = parse_operation_time(&self.operation_time)?;
        Some(ScanRecord::new(operator, &self.waybill_no, op_time))
    }
}

pub fn parse_operation_time(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
}

/// Shift template
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ShiftWindow {
    /// [07:00, 15:00)
    #[default]
    Early,
    /// [15:00, 23:00)
    Mid,
    /// [23:00, 24:00) and [00:00, 07:00) of the next calendar day
    Night,
}

impl ShiftWindow {
    pub const ALL: [ShiftWindow; 3] = [ShiftWindow::Early, ShiftWindow::Mid, ShiftWindow::Night];

    pub fn name(&self) -> &'static str {
        match self {
            ShiftWindow::Early => "Early (07-15)",
            ShiftWindow::Mid => "Mid (15-23)",
            ShiftWindow::Night => "Night (23-07)",
        }
    }
}

impl fmt::Display for ShiftWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ShiftWindow {
    type Err = String;

    /// Accepts the display name ("Night (23-07)") or the bare word ("night").
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        ShiftWindow::ALL
            .into_iter()
            .find(|w| {
                w.name().eq_ignore_ascii_case(s)
                    || format!("{:?}", w).eq_ignore_ascii_case(s)
            })
            .ok_or_else(|| {
                format!(
                    "unknown shift '{}', expected one of: {}",
                    s,
                    ShiftWindow::ALL.map(|w| w.name()).join(", ")
                )
            })
    }
}

/// Inclusive calendar-date range
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// `None` when `start` is after `end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Option<Self> {
        (start <= end).then_some(Self { start, end })
    }

    pub fn single(day: NaiveDate) -> Self {
        Self { start: day, end: day }
    }

    pub fn contains(&self, day: NaiveDate) -> bool {
        self.start <= day && day <= self.end
    }
}
