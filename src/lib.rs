//! Scan-throughput analytics for a sorting center.
//!
//! Raw scan events flow through a fixed pipeline: load and clean the CSV,
//! filter by shift window and date range, count distinct shipments per
//! operator per hour bucket, then derive KPIs, relative efficiency and the
//! chart descriptions served by the REST API and the report CLI.

pub mod aggregate;
pub mod api;
pub mod buckets;
pub mod cache;
pub mod charts;
pub mod config;
pub mod dashboard;
pub mod efficiency;
pub mod error;
pub mod kpi;
pub mod loader;
pub mod models;
pub mod session;
pub mod shift;
