//! Operator × hour-bucket matrix of distinct-shipment scan counts.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashSet};

use crate::buckets::Bucket;
use crate::models::ScanRecord;

/// Rows sorted by operator, columns sorted by bucket start hour. After
/// [`VolumeMatrix::from_records`] no row and no column is all zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct VolumeMatrix {
    pub operators: Vec<String>,
    pub buckets: Vec<Bucket>,
    /// `counts[row][col]`
    pub counts: Vec<Vec<u32>>,
}

impl VolumeMatrix {
    pub fn from_records<'a, I>(records: I) -> Self
    where
        I: IntoIterator<Item = &'a ScanRecord>,
    {
        let mut groups: BTreeMap<(&str, Bucket), HashSet<&str>> = BTreeMap::new();
        for record in records {
            let shipments = groups
                .entry((record.operator.as_str(), record.bucket()))
                .or_default();
            if let Some(shipment) = record.shipment.as_deref() {
                shipments.insert(shipment);
            }
        }

        let operators: BTreeSet<&str> = groups
            .iter()
            .filter(|(_, s)| !s.is_empty())
            .map(|((op, _), _)| *op)
            .collect();
        let buckets: BTreeSet<Bucket> = groups
            .iter()
            .filter(|(_, s)| !s.is_empty())
            .map(|((_, b), _)| *b)
            .collect();

        let operators: Vec<String> = operators.into_iter().map(String::from).collect();
        let buckets: Vec<Bucket> = buckets.into_iter().collect();

        let counts = operators
            .iter()
            .map(|op| {
                buckets
                    .iter()
                    .map(|b| {
                        groups
                            .get(&(op.as_str(), *b))
                            .map(|s| s.len() as u32)
                            .unwrap_or(0)
                    })
                    .collect()
            })
            .collect();

        Self {
            operators,
            buckets,
            counts,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.operators.is_empty() || self.buckets.is_empty()
    }

    pub fn bucket_labels(&self) -> Vec<String> {
        self.buckets.iter().map(Bucket::label).collect()
    }

    pub fn row_index(&self, operator: &str) -> Option<usize> {
        self.operators.binary_search_by(|o| o.as_str().cmp(operator)).ok()
    }

    pub fn row(&self, operator: &str) -> Option<&[u32]> {
        self.row_index(operator).map(|i| self.counts[i].as_slice())
    }

    pub fn get(&self, operator: &str, bucket: Bucket) -> u32 {
        let col = self.buckets.binary_search(&bucket).ok();
        match (self.row(operator), col) {
            (Some(row), Some(col)) => row[col],
            _ => 0,
        }
    }

    /// Per-bucket totals across all operators.
    pub fn column_totals(&self) -> Vec<u64> {
        self.column_totals_where(|_| true)
    }

    /// Per-bucket totals across the operators accepted by `keep`.
    pub fn column_totals_where<F>(&self, keep: F) -> Vec<u64>
    where
        F: Fn(&str) -> bool,
    {
        let mut totals = vec![0u64; self.buckets.len()];
        for (op, row) in self.operators.iter().zip(&self.counts) {
            if !keep(op) {
                continue;
            }
            for (total, v) in totals.iter_mut().zip(row) {
                *total += u64::from(*v);
            }
        }
        totals
    }

    pub fn total(&self) -> u64 {
        self.column_totals().iter().sum()
    }

    /// Sub-matrix of the rows accepted by `keep`, same columns.
    pub fn select_rows<F>(&self, keep: F) -> VolumeMatrix
    where
        F: Fn(&str) -> bool,
    {
        let (operators, counts) = self
            .operators
            .iter()
            .zip(&self.counts)
            .filter(|(op, _)| keep(op))
            .map(|(op, row)| (op.clone(), row.clone()))
            .unzip();
        VolumeMatrix {
            operators,
            buckets: self.buckets.clone(),
            counts,
        }
    }

    pub fn drop_zero_rows(mut self) -> Self {
        let keep: Vec<bool> = self.counts.iter().map(|r| r.iter().any(|v| *v != 0)).collect();
        let mut flags = keep.iter();
        self.operators.retain(|_| *flags.next().unwrap_or(&false));
        let mut flags = keep.iter();
        self.counts.retain(|_| *flags.next().unwrap_or(&false));
        self
    }
}
