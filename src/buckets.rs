//! Hour-of-day buckets ("14-15") used as the columns of every volume table.

use chrono::{NaiveDate, NaiveDateTime, Timelike};
use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// One-hour time-of-day interval. Ordered by start hour, so "9-10" < "10-11".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Bucket {
    start_hour: u8,
}

impl Bucket {
    /// Returns `None` for hours outside 0..=23.
    pub fn new(start_hour: u8) -> Option<Self> {
        (start_hour < 24).then_some(Self { start_hour })
    }

    pub fn from_timestamp(ts: &NaiveDateTime) -> Self {
        Self {
            start_hour: ts.hour() as u8,
        }
    }

    pub fn start_hour(&self) -> u8 {
        self.start_hour
    }

    pub fn label(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start_hour, self.start_hour + 1)
    }
}

impl FromStr for Bucket {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        bucket_start(s)
            .and_then(Bucket::new)
            .ok_or_else(|| format!("invalid bucket label '{}'", s))
    }
}

impl Serialize for Bucket {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Start hour of a bucket label, read from the left side of "H-(H+1)".
///
/// Labels only sort through this (via `FromStr`); sorting the label strings
/// would put "10-11" before "9-10".
pub fn bucket_start(label: &str) -> Option<u8> {
    label.trim().split('-').next()?.trim().parse().ok()
}

/// Calendar date, hour and bucket of a timestamp; what shift filtering and
/// aggregation read off every scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeSlot {
    pub date: NaiveDate,
    pub hour: u8,
    pub bucket: Bucket,
}

pub fn time_slot(ts: &NaiveDateTime) -> TimeSlot {
    let bucket = Bucket::from_timestamp(ts);
    TimeSlot {
        date: ts.date(),
        hour: bucket.start_hour(),
        bucket,
    }
}
