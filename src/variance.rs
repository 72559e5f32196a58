//! Current-vs-benchmark variance.
//!
//! Two signals are kept apart on purpose: `arrow` is the direction the value
//! actually moved relative to the benchmark (↓ below, ↑ at or above), and
//! `is_favorable` is whether that movement is good for the metric's
//! polarity. For lower-is-better metrics a favorable result shows ↓; for
//! higher-is-better metrics it shows ↑.

use serde::Serialize;

use crate::format::{format_count, MetricKind};
use crate::polarity::{Polarity, PolarityTable};
use crate::records::Cell;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Arrow {
    Up,
    Down,
}

impl Arrow {
    /// Ties render as ↑.
    pub fn of(signed_difference: f64) -> Self {
        if signed_difference < 0.0 {
            Arrow::Down
        } else {
            Arrow::Up
        }
    }

    pub fn glyph(self) -> &'static str {
        match self {
            Arrow::Up => "↑",
            Arrow::Down => "↓",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Variance {
    pub signed_difference: f64,
    pub is_favorable: bool,
    pub arrow: Arrow,
    pub display_text: String,
}

/// Variance for a named metric, with kind and polarity resolved from the name.
/// `None` is the neutral result: either side missing or not numeric.
pub fn metric_variance(
    table: &PolarityTable,
    metric_name: &str,
    current: &Cell,
    benchmark: &Cell,
) -> Option<Variance> {
    variance(MetricKind::of(metric_name), table.resolve(metric_name), current, benchmark)
}

pub fn variance(
    kind: MetricKind,
    polarity: Polarity,
    current: &Cell,
    benchmark: &Cell,
) -> Option<Variance> {
    let current = current.number()?;
    let benchmark = benchmark.number()?;
    let signed_difference = current - benchmark;
    let arrow = Arrow::of(signed_difference);

    let sign = if signed_difference >= 0.0 { "+" } else { "" };
    let magnitude = match kind {
        MetricKind::Percentage => format!("{:.1} pts", signed_difference),
        MetricKind::Count => format_count(signed_difference),
    };

    Some(Variance {
        signed_difference,
        is_favorable: polarity.is_favorable(signed_difference),
        arrow,
        display_text: format!("{}{} {}", sign, magnitude, arrow.glyph()),
    })
}

/// Display text for an optional variance; neutral renders empty.
pub fn variance_text(variance: Option<&Variance>) -> String {
    variance.map(|v| v.display_text.clone()).unwrap_or_default()
}
