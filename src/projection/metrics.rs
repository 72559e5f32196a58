use serde::Serialize;

use crate::format::{format_cell, format_optional, MetricKind};
use crate::polarity::PolarityTable;
use crate::records::MetricRecord;
use crate::trend::{SeedCache, TrendSource};
use crate::variance::{metric_variance, variance_text, Variance};

pub const DEFAULT_SECTION_ORDER: [&str; 2] = ["UTILIZATION", "CLINICAL QUALITY"];

/// Section for records that carry none.
pub const UNCATEGORIZED: &str = "UNCATEGORIZED";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DerivedMetricRow {
    pub metric: String,
    pub display_trailing: String,
    pub display_current: String,
    pub display_benchmark: String,
    pub variance: Option<Variance>,
    pub variance_text: String,
    pub variance_is_favorable: Option<bool>,
    pub display_ytd: String,
    pub trend_synthetic: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TableLine {
    Section { title: String },
    Row(DerivedMetricRow),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MetricTable {
    pub lines: Vec<TableLine>,
    /// Current/benchmark cells shown as placeholders.
    #[serde(skip)]
    pub degraded_cells: usize,
    #[serde(skip)]
    pub synthesized_rows: usize,
    #[serde(skip)]
    pub unrecognized_sections: Vec<String>,
}

impl MetricTable {
    pub fn rows(&self) -> impl Iterator<Item = &DerivedMetricRow> {
        self.lines.iter().filter_map(|line| match line {
            TableLine::Row(row) => Some(row),
            TableLine::Section { .. } => None,
        })
    }

    pub fn section_titles(&self) -> Vec<&str> {
        self.lines
            .iter()
            .filter_map(|line| match line {
                TableLine::Section { title } => Some(title.as_str()),
                TableLine::Row(_) => None,
            })
            .collect()
    }
}

pub fn normalize_section(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        UNCATEGORIZED.to_string()
    } else {
        trimmed.to_uppercase()
    }
}

/// Groups one organization's metric records into ordered sections.
///
/// Preferred sections come first in configured order; anything else follows
/// in first-seen order. Rows keep source order within a section.
pub struct MetricTableProjector<'a> {
    polarity: &'a PolarityTable,
    trends: &'a dyn TrendSource,
    section_order: Vec<String>,
}

impl<'a> MetricTableProjector<'a> {
    pub fn new(polarity: &'a PolarityTable, trends: &'a dyn TrendSource) -> Self {
        Self {
            polarity,
            trends,
            section_order: DEFAULT_SECTION_ORDER.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn with_section_order<S: AsRef<str>>(mut self, order: &[S]) -> Self {
        self.section_order = order.iter().map(|s| normalize_section(s.as_ref())).collect();
        self
    }

    pub fn project<'r, I>(&self, records: I, cache: &mut SeedCache) -> MetricTable
    where
        I: IntoIterator<Item = &'r MetricRecord>,
    {
        let mut groups: Vec<(String, Vec<&MetricRecord>)> = Vec::new();
        for record in records {
            let section = normalize_section(&record.section);
            match groups.iter_mut().find(|(title, _)| *title == section) {
                Some((_, rows)) => rows.push(record),
                None => groups.push((section, vec![record])),
            }
        }

        let mut ordered: Vec<(String, Vec<&MetricRecord>)> = Vec::with_capacity(groups.len());
        for preferred in &self.section_order {
            if let Some(pos) = groups.iter().position(|(title, _)| title == preferred) {
                ordered.push(groups.remove(pos));
            }
        }
        let unrecognized: Vec<String> = groups.iter().map(|(title, _)| title.clone()).collect();
        ordered.extend(groups);

        let mut table = MetricTable {
            unrecognized_sections: unrecognized,
            ..Default::default()
        };
        for (title, rows) in ordered {
            table.lines.push(TableLine::Section { title });
            for record in rows {
                let row = self.derive(record, cache, &mut table.degraded_cells);
                if row.trend_synthetic {
                    table.synthesized_rows += 1;
                }
                table.lines.push(TableLine::Row(row));
            }
        }
        table
    }

    fn derive(&self, record: &MetricRecord, cache: &mut SeedCache, degraded: &mut usize) -> DerivedMetricRow {
        let name = record.metric_name.as_str();
        let kind = MetricKind::of(name);
        let trends = self.trends.trends(record, cache);
        let variance = metric_variance(self.polarity, name, &record.current_value, &record.benchmark_value);

        *degraded += [&record.current_value, &record.benchmark_value]
            .iter()
            .filter(|cell| cell.number().is_none())
            .count();

        DerivedMetricRow {
            metric: record.metric_name.clone(),
            display_trailing: format_optional(kind, trends.trailing),
            display_current: format_cell(kind, &record.current_value),
            display_benchmark: format_cell(kind, &record.benchmark_value),
            variance_text: variance_text(variance.as_ref()),
            variance_is_favorable: variance.as_ref().map(|v| v.is_favorable),
            variance,
            display_ytd: format_optional(kind, trends.year_to_date),
            trend_synthetic: trends.synthetic,
        }
    }
}
