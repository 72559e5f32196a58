//! Display formatting for metric cells.

use serde::Serialize;

use crate::records::Cell;

/// Shown wherever a value is missing or not numeric.
pub const PLACEHOLDER: &str = "—";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    Percentage,
    Count,
}

impl MetricKind {
    /// Names containing "%", "(%)" or "Rate" are percentages.
    pub fn of(metric_name: &str) -> Self {
        if metric_name.contains('%') || metric_name.contains("Rate") {
            MetricKind::Percentage
        } else {
            MetricKind::Count
        }
    }

    pub fn format(self, value: f64) -> String {
        match self {
            MetricKind::Percentage => format_percent(value),
            MetricKind::Count => format_count(value),
        }
    }
}

/// Format a raw cell for the named metric.
pub fn format_value(metric_name: &str, raw: &Cell) -> String {
    format_cell(MetricKind::of(metric_name), raw)
}

pub fn format_cell(kind: MetricKind, raw: &Cell) -> String {
    match raw.number() {
        Some(value) => kind.format(value),
        None => PLACEHOLDER.to_string(),
    }
}

pub fn format_optional(kind: MetricKind, value: Option<f64>) -> String {
    value.map(|v| kind.format(v)).unwrap_or_else(|| PLACEHOLDER.to_string())
}

pub fn format_percent(value: f64) -> String {
    format!("{:.1}%", value)
}

/// Counts: ≥100 drop decimals (grouped from 1,000 up), smaller values keep
/// one decimal unless whole.
pub fn format_count(value: f64) -> String {
    let magnitude = value.abs();
    if magnitude >= 1000.0 {
        group_thousands(&format!("{:.0}", value))
    } else if magnitude >= 100.0 || value.fract() == 0.0 {
        format!("{:.0}", value)
    } else {
        format!("{:.1}", value)
    }
}

fn group_thousands(rendered: &str) -> String {
    let (sign, digits) = match rendered.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", rendered),
    };
    let mut out = String::with_capacity(rendered.len() + digits.len() / 3);
    out.push_str(sign);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
