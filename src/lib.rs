//! Clinical-operations dashboard: turns the performance-metric,
//! program-outcome and utilization-log snapshots into display-ready tables
//! and a filterable event feed.

pub mod dashboard;
pub mod format;
pub mod loader;
pub mod logging;
pub mod manifest;
pub mod polarity;
pub mod projection;
pub mod records;
pub mod render;
pub mod state;
pub mod trend;
pub mod variance;
pub mod workbook;
