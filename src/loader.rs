//! Scan export loading: schema check, per-row cleaning, dataset identity.

use calamine::{Data, DataType, Reader, Xlsx};
use chrono::NaiveDate;
use csv::ReaderBuilder;
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::fmt;
use std::fs::File;
use std::io::{BufReader, Cursor, Read, Seek};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::{PipelineError, Result};
use crate::models::{
    CsvRecord, DateRange, ScanRecord, OPERATION_TIME_COLUMN, OPERATOR_COLUMN, REQUIRED_COLUMNS, WAYBILL_COLUMN,
};

/// Identity of a dataset, used as the cache key and to detect dataset swaps.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DatasetId {
    /// The configured default file, keyed by path.
    Default(PathBuf),
    /// An uploaded file, keyed by the SHA-256 of its bytes.
    Upload(String),
}

impl DatasetId {
    pub fn for_upload(bytes: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        DatasetId::Upload(format!("{:x}", hasher.finalize()))
    }

    /// Parse an upload id ("upload::<sha256 hex>"). Default ids never come
    /// from outside: the only default dataset is the configured file.
    pub fn parse_upload(s: &str) -> Option<Self> {
        s.strip_prefix("upload::")
            .filter(|h| h.len() == 64 && h.bytes().all(|b| b.is_ascii_hexdigit()))
            .map(|h| DatasetId::Upload(h.to_ascii_lowercase()))
    }
}

impl fmt::Display for DatasetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatasetId::Default(path) => write!(f, "default::{}", path.display()),
            DatasetId::Upload(hash) => write!(f, "upload::{}", hash),
        }
    }
}

/// Cleaned contents of one scan export
#[derive(Debug, Clone, Default)]
pub struct ScanDataset {
    pub records: Vec<ScanRecord>,
    pub total_rows: usize,
    pub dropped_rows: usize,
}

impl ScanDataset {
    pub fn from_records(records: Vec<ScanRecord>) -> Self {
        Self {
            total_rows: records.len(),
            dropped_rows: 0,
            records,
        }
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.records.iter().map(|r| r.date()).min()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.records.iter().map(|r| r.date()).max()
    }

    /// Full calendar span of the data; `None` for an empty dataset.
    pub fn span(&self) -> Option<DateRange> {
        DateRange::new(self.first_date()?, self.last_date()?)
    }

    pub fn operator_count(&self) -> usize {
        self.records
            .iter()
            .map(|r| r.operator.as_str())
            .collect::<HashSet<_>>()
            .len()
    }
}

/// Fails with the sorted list of required columns the header row lacks.
pub fn check_schema<'a>(headers: impl IntoIterator<Item = &'a str>) -> Result<()> {
    let present: HashSet<&str> = headers.into_iter().map(str::trim).collect();
    let mut missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|c| !present.contains(*c))
        .map(|c| c.to_string())
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        missing.sort();
        Err(PipelineError::MissingColumns { missing })
    }
}

/// Input layout of a scan export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Csv,
    Xlsx,
}

impl SourceFormat {
    /// By file extension; anything but `.xlsx` is read as CSV.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("xlsx") => SourceFormat::Xlsx,
            _ => SourceFormat::Csv,
        }
    }

    /// By content: an xlsx workbook is a zip archive.
    pub fn sniff(bytes: &[u8]) -> Self {
        if bytes.starts_with(b"PK\x03\x04") {
            SourceFormat::Xlsx
        } else {
            SourceFormat::Csv
        }
    }
}

/// Count and keep the rows that survive cleaning.
fn collect_rows<I>(rows: I) -> ScanDataset
where
    I: IntoIterator<Item = Option<ScanRecord>>,
{
    let mut dataset = ScanDataset::default();
    for row in rows {
        dataset.total_rows += 1;
        match row {
            Some(record) => dataset.records.push(record),
            None => dataset.dropped_rows += 1,
        }
    }

    if dataset.dropped_rows > 0 {
        debug!(
            "Dropped {} of {} rows (bad timestamp or operator)",
            dataset.dropped_rows, dataset.total_rows
        );
    }
    info!(
        "Parsed {} scan records, {} operators",
        dataset.records.len(),
        dataset.operator_count()
    );
    dataset
}

pub fn load_from_reader<R: Read>(source: R) -> Result<ScanDataset> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(source);

    check_schema(reader.headers()?.iter())?;

    Ok(collect_rows(
        reader
            .deserialize::<CsvRecord>()
            .map(|result| result.ok().and_then(|row| row.to_scan_record())),
    ))
}

/// Text of a worksheet cell as the CSV export would have it. Date cells come
/// back as "%Y-%m-%d %H:%M:%S", one of the accepted timestamp layouts.
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::String(s) => s.clone(),
        Data::DateTime(dt) => dt
            .as_datetime()
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_default(),
        Data::DateTimeIso(s) => s.replacen('T', " ", 1),
        other => other.as_string().unwrap_or_default(),
    }
}

/// First worksheet of an xlsx workbook; header row first, same cleaning as CSV.
pub fn load_from_xlsx<RS: Read + Seek>(source: RS) -> Result<ScanDataset> {
    let mut workbook: Xlsx<_> = Xlsx::new(source)?;
    let Some(sheet) = workbook.sheet_names().first().cloned() else {
        return Err(PipelineError::MissingColumns {
            missing: REQUIRED_COLUMNS.iter().map(|c| c.to_string()).collect(),
        });
    };
    let range = workbook.worksheet_range(&sheet)?;
    let mut rows = range.rows();

    let headers: Vec<String> = rows
        .next()
        .map(|row| row.iter().map(|c| cell_text(c).trim().to_string()).collect())
        .unwrap_or_default();
    check_schema(headers.iter().map(String::as_str))?;

    let column = |name: &str| headers.iter().position(|h| h == name).unwrap_or(0);
    let (time_col, operator_col, waybill_col) =
        (column(OPERATION_TIME_COLUMN), column(OPERATOR_COLUMN), column(WAYBILL_COLUMN));
    let cell = |row: &[Data], i: usize| row.get(i).map(cell_text).unwrap_or_default();

    Ok(collect_rows(rows.map(|row| {
        CsvRecord {
            operation_time: cell(row, time_col),
            operator: cell(row, operator_col),
            waybill_no: cell(row, waybill_col),
        }
        .to_scan_record()
    })))
}

pub fn load_from_path(path: &Path) -> Result<ScanDataset> {
    info!("Reading scan export from {:?}", path);
    let file = BufReader::new(File::open(path)?);
    match SourceFormat::from_path(path) {
        SourceFormat::Csv => load_from_reader(file),
        SourceFormat::Xlsx => load_from_xlsx(file),
    }
}

pub fn load_from_bytes(bytes: &[u8]) -> Result<ScanDataset> {
    match SourceFormat::sniff(bytes) {
        SourceFormat::Csv => load_from_reader(bytes),
        SourceFormat::Xlsx => load_from_xlsx(Cursor::new(bytes)),
    }
}
