//! Shift membership and shift-day attribution.
//!
//! Night runs 23:00 to 07:00. Its early-morning hours belong to the shift that
//! started the previous evening, so a scan at 00:30 on the 2nd counts for the 1st.

use chrono::{NaiveDate, NaiveDateTime};

use crate::buckets::time_slot;
use crate::models::{DateRange, ScanRecord, ShiftWindow};

/// Whether an hour of day falls inside the shift's window.
pub fn in_shift_hours(shift: ShiftWindow, hour: u32) -> bool {
    match shift {
        ShiftWindow::Early => (7..15).contains(&hour),
        ShiftWindow::Mid => (15..23).contains(&hour),
        ShiftWindow::Night => hour >= 23 || hour < 7,
    }
}

/// Calendar date the timestamp is attributed to under `shift`.
pub fn shift_day(shift: ShiftWindow, ts: &NaiveDateTime) -> NaiveDate {
    let slot = time_slot(ts);
    match shift {
        ShiftWindow::Night if slot.hour < 7 => slot.date.pred_opt().unwrap_or(slot.date),
        _ => slot.date,
    }
}

/// A timestamp belongs to the selection when its hour is inside the shift window
/// and its shift-day falls in the date range.
pub fn in_shift(shift: ShiftWindow, range: &DateRange, ts: &NaiveDateTime) -> bool {
    in_shift_hours(shift, u32::from(time_slot(ts).hour)) && range.contains(shift_day(shift, ts))
}

pub fn filter_by_shift<'a>(
    records: &'a [ScanRecord],
    range: &DateRange,
    shift: ShiftWindow,
) -> Vec<&'a ScanRecord> {
    records
        .iter()
        .filter(|r| in_shift(shift, range, &r.op_time))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::parse_operation_time;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn ts(s: &str) -> NaiveDateTime {
        parse_operation_time(s).unwrap()
    }

    #[test]
    fn test_night_early_hours_belong_to_previous_day() {
        for hour in 0..7 {
            let t = ts(&format!("{:02}:10:00 02/01/2025", hour));
            assert_eq!(shift_day(ShiftWindow::Night, &t), day(2025, 1, 1));
        }
        let late = ts("23:10:00 02/01/2025");
        assert_eq!(shift_day(ShiftWindow::Night, &late), day(2025, 1, 2));
    }

    #[test]
    fn test_day_shifts_keep_calendar_date() {
        let t = ts("03:00:00 02/01/2025");
        assert_eq!(shift_day(ShiftWindow::Early, &t), day(2025, 1, 2));
        assert_eq!(shift_day(ShiftWindow::Mid, &t), day(2025, 1, 2));
    }

    #[test]
    fn test_hour_windows_are_half_open() {
        assert!(!in_shift_hours(ShiftWindow::Early, 6));
        assert!(in_shift_hours(ShiftWindow::Early, 7));
        assert!(in_shift_hours(ShiftWindow::Early, 14));
        assert!(!in_shift_hours(ShiftWindow::Early, 15));
        assert!(in_shift_hours(ShiftWindow::Mid, 15));
        assert!(!in_shift_hours(ShiftWindow::Mid, 23));
        assert!(in_shift_hours(ShiftWindow::Night, 23));
        assert!(in_shift_hours(ShiftWindow::Night, 0));
        assert!(in_shift_hours(ShiftWindow::Night, 6));
        assert!(!in_shift_hours(ShiftWindow::Night, 7));
    }

    #[test]
    fn test_night_selection_uses_shift_day() {
        let range = DateRange::single(day(2025, 1, 1));
        assert!(in_shift(ShiftWindow::Night, &range, &ts("00:30:00 02/01/2025")));
        assert!(in_shift(ShiftWindow::Night, &range, &ts("23:30:00 01/01/2025")));
        assert!(!in_shift(ShiftWindow::Night, &range, &ts("08:00:00 01/01/2025")));
        // belongs to the night of 31/12
        assert!(!in_shift(ShiftWindow::Night, &range, &ts("00:30:00 01/01/2025")));
    }

    #[test]
    fn test_filter_by_shift() {
        let records = vec![
            ScanRecord::new("JOU1", "S1", ts("09:00:00 01/01/2025")),
            ScanRecord::new("JOU1", "S2", ts("16:00:00 01/01/2025")),
            ScanRecord::new("JOU1", "S3", ts("09:00:00 03/01/2025")),
        ];
        let range = DateRange::new(day(2025, 1, 1), day(2025, 1, 2)).unwrap();
        let early = filter_by_shift(&records, &range, ShiftWindow::Early);
        assert_eq!(early.len(), 1);
        assert_eq!(early[0].shipment.as_deref(), Some("S1"));
        assert_eq!(filter_by_shift(&records, &range, ShiftWindow::Mid).len(), 1);
        assert!(filter_by_shift(&records, &range, ShiftWindow::Night).is_empty());
    }
}
