//! Per-viewer filter state.
//!
//! When the active dataset changes identity the date range resets to the new
//! dataset's full span and the shift to the default.

use chrono::{NaiveDate, Utc};
use serde::Serialize;
use tracing::info;

use crate::error::{PipelineError, Result};
use crate::loader::{DatasetId, ScanDataset};
use crate::models::{DateRange, ShiftWindow};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Session {
    #[serde(serialize_with = "serialize_display")]
    pub dataset_id: DatasetId,
    pub date_range: DateRange,
    pub shift: ShiftWindow,
}

fn serialize_display<S: serde::Serializer>(id: &DatasetId, s: S) -> std::result::Result<S::Ok, S::Error> {
    s.collect_str(id)
}

/// Full span of the dataset, or today when it has no records.
pub fn dataset_span(dataset: &ScanDataset) -> DateRange {
    dataset
        .span()
        .unwrap_or_else(|| DateRange::single(Utc::now().date_naive()))
}

/// Filter changes requested by the viewer; `None` keeps the current value.
#[derive(Debug, Clone, Default)]
pub struct FilterUpdate {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub shift: Option<ShiftWindow>,
}

impl Session {
    pub fn new(dataset_id: DatasetId, dataset: &ScanDataset) -> Self {
        Self {
            dataset_id,
            date_range: dataset_span(dataset),
            shift: ShiftWindow::default(),
        }
    }

    /// Point the session at `dataset_id`. Returns `true` when this was a swap
    /// and the filters were reset.
    pub fn sync_dataset(&mut self, dataset_id: &DatasetId, dataset: &ScanDataset) -> bool {
        if &self.dataset_id == dataset_id {
            return false;
        }
        info!("Dataset changed to {}, resetting filters", dataset_id);
        *self = Session::new(dataset_id.clone(), dataset);
        true
    }

    /// Apply a filter change. Missing range ends keep their current value; a
    /// range whose start falls after its end is rejected and leaves the session as is.
    pub fn apply(&mut self, update: &FilterUpdate) -> Result<()> {
        let start = update.start.unwrap_or(self.date_range.start);
        let end = update.end.unwrap_or(self.date_range.end);
        let range = DateRange::new(start, end).ok_or_else(|| {
            PipelineError::InvalidFilter(format!("start date {} is after end date {}", start, end))
        })?;

        self.date_range = range;
        if let Some(shift) = update.shift {
            self.shift = shift;
        }
        Ok(())
    }
}
