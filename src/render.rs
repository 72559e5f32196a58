//! Rendering port and the two terminal renderers the CLI ships with.

use anyhow::Result;
use std::io::Write;

use crate::dashboard::{DashboardView, ALL_EVENTS_LABEL};
use crate::projection::{DerivedMetricRow, FeedCard, ProgramOutcomeRow, TableLine};

pub trait RenderPort {
    fn render(&mut self, view: &DashboardView) -> Result<()>;
}

const SYNTHETIC_MARK: &str = "*";

fn favorability(is_favorable: Option<bool>) -> &'static str {
    match is_favorable {
        Some(true) => " (good)",
        Some(false) => " (bad)",
        None => "",
    }
}

fn trend_cell(value: &str, synthetic: bool) -> String {
    if synthetic {
        format!("{}{}", value, SYNTHETIC_MARK)
    } else {
        value.to_string()
    }
}

/// Fixed-width plain text.
pub struct TextRenderer<W: Write> {
    out: W,
}

impl<W: Write> TextRenderer<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn metric_row(&mut self, row: &DerivedMetricRow) -> Result<()> {
        let variance = format!("{}{}", row.variance_text, favorability(row.variance_is_favorable));
        writeln!(
            self.out,
            "  {:<28} {:>11} {:>9} {:>9} {:>18} {:>9}",
            row.metric,
            trend_cell(&row.display_trailing, row.trend_synthetic),
            row.display_current,
            row.display_benchmark,
            variance,
            trend_cell(&row.display_ytd, row.trend_synthetic),
        )?;
        Ok(())
    }

    fn program_row(&mut self, row: &ProgramOutcomeRow) -> Result<()> {
        let variance = format!("{}{}", row.variance_text, favorability(row.variance_is_favorable));
        writeln!(
            self.out,
            "  {:<12} {:>9} {:>9} {:>9} {:>10} {:>10} {:>18}",
            row.program,
            row.eligible,
            row.engaged,
            row.completed,
            row.completion_pct,
            row.benchmark_pct,
            variance,
        )?;
        Ok(())
    }

    fn card(&mut self, card: &FeedCard) -> Result<()> {
        let tags: Vec<String> = card
            .tags
            .iter()
            .map(|t| format!("[{}:{}]", t.label, t.style.as_str()))
            .collect();
        let event = if card.inpatient {
            format!("{} (inp)", card.event)
        } else {
            card.event.clone()
        };
        writeln!(
            self.out,
            "  {}  {} {}  | {} | {}  {}",
            card.date,
            card.patient,
            tags.join(" "),
            card.organization,
            event,
            card.icd10
        )?;
        writeln!(self.out, "      FACILITY:  {}", card.facility)?;
        writeln!(self.out, "      DIAGNOSIS: {}", card.diagnosis)?;
        Ok(())
    }
}

impl<W: Write> RenderPort for TextRenderer<W> {
    fn render(&mut self, view: &DashboardView) -> Result<()> {
        writeln!(self.out, "CLINICAL OPERATIONS DASHBOARD: {}", view.organization)?;
        writeln!(self.out)?;

        writeln!(self.out, "PERFORMANCE METRICS")?;
        writeln!(
            self.out,
            "  {:<28} {:>11} {:>9} {:>9} {:>18} {:>9}",
            "Metric", "Last 3 Mth", "Current", "Benchmark", "Variance", "YTD"
        )?;
        for line in &view.metrics {
            match line {
                TableLine::Section { title } => writeln!(self.out, "  {}", title)?,
                TableLine::Row(row) => self.metric_row(row)?,
            }
        }
        if view.synthetic_trends {
            writeln!(
                self.out,
                "  {} synthetic trend filler, not measured data",
                SYNTHETIC_MARK
            )?;
        }
        writeln!(self.out)?;

        writeln!(self.out, "PROGRAM OUTCOMES")?;
        writeln!(
            self.out,
            "  {:<12} {:>9} {:>9} {:>9} {:>10} {:>10} {:>18}",
            "Program", "Eligible", "Engaged", "Completed", "Completion", "Benchmark", "Variance"
        )?;
        for row in &view.programs {
            self.program_row(row)?;
        }
        writeln!(self.out)?;

        let filter = if view.event_filter.is_empty() {
            ALL_EVENTS_LABEL
        } else {
            view.event_filter.as_str()
        };
        writeln!(self.out, "UTILIZATION FEED ({}, {})", filter, view.feed.total_label)?;
        for card in &view.feed.cards {
            self.card(card)?;
        }
        writeln!(self.out)?;
        writeln!(self.out, "Export: {}", view.export_href)?;
        self.out.flush()?;
        Ok(())
    }
}

/// The view as one JSON document.
pub struct JsonRenderer<W: Write> {
    out: W,
    pretty: bool,
}

impl<W: Write> JsonRenderer<W> {
    pub fn new(out: W) -> Self {
        Self { out, pretty: true }
    }

    pub fn compact(mut self) -> Self {
        self.pretty = false;
        self
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> RenderPort for JsonRenderer<W> {
    fn render(&mut self, view: &DashboardView) -> Result<()> {
        if self.pretty {
            serde_json::to_writer_pretty(&mut self.out, view)?;
        } else {
            serde_json::to_writer(&mut self.out, view)?;
        }
        writeln!(self.out)?;
        self.out.flush()?;
        Ok(())
    }
}
