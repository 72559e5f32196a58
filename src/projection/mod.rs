//! Record sequences → presentation rows.
//!
//! Everything here is synchronous and free of I/O; the dashboard reruns
//! these on every filter change.

pub mod feed;
pub mod metrics;
pub mod programs;

pub use feed::{event_options, feed_cards, filter_and_sort, EventFilter, FeedCard, FeedSelection, TagStyle};
pub use metrics::{DerivedMetricRow, MetricTable, MetricTableProjector, TableLine};
pub use programs::{project_programs, ProgramOutcomeRow, ProgramTable};
