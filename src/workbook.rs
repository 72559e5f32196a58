//! Converts the performance workbook export into the three JSON datasets.
//!
//! Expected sheets: `Performance_Metrics`, `Program_Outcomes`,
//! `Utilization_Log`. The first row of each sheet is the header.

use anyhow::{anyhow, Context, Result};
use calamine::{open_workbook_auto, Data, Reader};
use chrono::{Duration, NaiveDate};
use std::collections::HashMap;
use std::path::Path;

use crate::records::{Cell, MetricRecord, ProgramOutcomeRecord, UtilizationLogEntry};

pub const METRICS_SHEET: &str = "Performance_Metrics";
pub const PROGRAMS_SHEET: &str = "Program_Outcomes";
pub const LOG_SHEET: &str = "Utilization_Log";

#[derive(Debug, Clone, Default)]
pub struct WorkbookDatasets {
    pub metrics: Vec<MetricRecord>,
    pub programs: Vec<ProgramOutcomeRecord>,
    pub log: Vec<UtilizationLogEntry>,
}

/// Header-addressed view over one sheet.
pub struct Sheet {
    columns: HashMap<String, usize>,
    rows: Vec<Vec<Data>>,
}

impl Sheet {
    pub fn from_rows(mut rows: Vec<Vec<Data>>) -> Self {
        let header = if rows.is_empty() { Vec::new() } else { rows.remove(0) };
        let columns = header
            .iter()
            .enumerate()
            .map(|(i, cell)| (data_text(cell).trim().to_string(), i))
            .collect();
        Self { columns, rows }
    }

    fn get<'a>(&self, row: &'a [Data], column: &str) -> Option<&'a Data> {
        self.columns.get(column).and_then(|&i| row.get(i))
    }

    fn text(&self, row: &[Data], column: &str) -> String {
        self.get(row, column).map(data_text).unwrap_or_default()
    }

    fn cell(&self, row: &[Data], column: &str) -> Cell {
        self.get(row, column).map(data_cell).unwrap_or_default()
    }

    fn rows(&self) -> impl Iterator<Item = &Vec<Data>> {
        self.rows
            .iter()
            .filter(|row| row.iter().any(|c| !matches!(c, Data::Empty)))
    }
}

fn excel_date(serial: f64) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(1899, 12, 30)?.checked_add_signed(Duration::days(serial.floor() as i64))
}

fn whole_number_text(f: f64) -> String {
    if f.fract() == 0.0 && f.abs() < 1e15 {
        format!("{}", f as i64)
    } else {
        format!("{}", f)
    }
}

pub fn data_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Int(n) => n.to_string(),
        Data::Float(f) => whole_number_text(*f),
        Data::Bool(b) => b.to_string(),
        Data::Error(_) => String::new(),
        Data::DateTime(dt) => excel_date(dt.as_f64())
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_default(),
        Data::DateTimeIso(s) => s.clone(),
        Data::DurationIso(s) => s.clone(),
    }
}

pub fn data_cell(cell: &Data) -> Cell {
    match cell {
        Data::Empty | Data::Error(_) => Cell::Missing,
        Data::Int(n) => Cell::Number(*n as f64),
        Data::Float(f) => Cell::Number(*f),
        Data::String(s) => Cell::Text(s.clone()),
        Data::Bool(b) => Cell::Other(serde_json::Value::Bool(*b)),
        Data::DateTime(dt) => Cell::Number(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::Text(s.clone()),
    }
}

pub fn metrics_from_sheet(sheet: &Sheet) -> Vec<MetricRecord> {
    sheet
        .rows()
        .map(|row| MetricRecord {
            section: sheet.text(row, "Section"),
            metric_name: sheet.text(row, "Metric"),
            current_value: sheet.cell(row, "Current_Month"),
            benchmark_value: sheet.cell(row, "Benchmark"),
            trailing_average: sheet.cell(row, "Last_3_Mth_Avg"),
            year_to_date_average: sheet.cell(row, "YTD_Avg"),
            organization: sheet.text(row, "Org"),
        })
        .collect()
}

/// Completion stored as a fraction (≤ 1) becomes a percentage.
fn as_percent(cell: Cell) -> Cell {
    match cell.number() {
        Some(v) if v <= 1.0 => Cell::Number(v * 100.0),
        Some(v) => Cell::Number(v),
        None => cell,
    }
}

pub fn programs_from_sheet(sheet: &Sheet) -> Vec<ProgramOutcomeRecord> {
    sheet
        .rows()
        .map(|row| ProgramOutcomeRecord {
            program: sheet.text(row, "Program"),
            eligible_count: sheet.cell(row, "Eligible"),
            engaged_count: sheet.cell(row, "Engaged"),
            completed_count: sheet.cell(row, "Completed"),
            completion_pct: as_percent(sheet.cell(row, "Completion_Pct")),
            benchmark_pct: sheet.cell(row, "Benchmark"),
            organization: sheet.text(row, "Org"),
        })
        .collect()
}

pub fn log_from_sheet(sheet: &Sheet) -> Vec<UtilizationLogEntry> {
    sheet
        .rows()
        .map(|row| UtilizationLogEntry {
            patient: sheet.text(row, "Patient"),
            date: sheet.text(row, "Date"),
            organization: sheet.text(row, "Org"),
            event: sheet.text(row, "Event"),
            program_tags: sheet
                .text(row, "Tags")
                .split(',')
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect(),
            icd10: sheet.text(row, "ICD10"),
            facility: sheet.text(row, "Facility"),
            diagnosis: sheet.text(row, "Diagnosis"),
        })
        .collect()
}

pub fn read_workbook(path: &Path) -> Result<WorkbookDatasets> {
    let mut workbook =
        open_workbook_auto(path).with_context(|| format!("opening {}", path.display()))?;
    let mut sheet = |name: &str| -> Result<Sheet> {
        let range = workbook
            .worksheet_range(name)
            .map_err(|e| anyhow!("sheet {}: {}", name, e))?;
        Ok(Sheet::from_rows(range.rows().map(|r| r.to_vec()).collect()))
    };
    Ok(WorkbookDatasets {
        metrics: metrics_from_sheet(&sheet(METRICS_SHEET)?),
        programs: programs_from_sheet(&sheet(PROGRAMS_SHEET)?),
        log: log_from_sheet(&sheet(LOG_SHEET)?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(v: &str) -> Data {
        Data::String(v.to_string())
    }

    #[test]
    fn metrics_sheet_maps_columns_by_header() {
        let sheet = Sheet::from_rows(vec![
            vec![s("Org"), s("Metric"), s("Last_3_Mth_Avg"), s("Current_Month"), s("YTD_Avg"), s("Benchmark")],
            vec![s("ACN"), s("ER Admits/1,000"), Data::Float(43.5), Data::Int(41), Data::Empty, Data::Float(45.0)],
            vec![Data::Empty, Data::Empty, Data::Empty, Data::Empty, Data::Empty, Data::Empty],
        ]);
        let rows = metrics_from_sheet(&sheet);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].organization, "ACN");
        assert_eq!(rows[0].current_value, Cell::Number(41.0));
        assert_eq!(rows[0].trailing_average, Cell::Number(43.5));
        assert!(rows[0].year_to_date_average.is_missing());
        assert_eq!(rows[0].section, "");
    }

    #[test]
    fn completion_fraction_becomes_percent() {
        let sheet = Sheet::from_rows(vec![
            vec![s("Org"), s("Program"), s("Eligible"), s("Engaged"), s("Completed"), s("Completion_Pct")],
            vec![s("ACN"), s("CCM"), Data::Int(100), Data::Int(80), Data::Int(60), Data::Float(0.75)],
            vec![s("ACN"), s("TCM"), Data::Int(100), Data::Int(80), Data::Int(60), Data::Float(72.4)],
        ]);
        let rows = programs_from_sheet(&sheet);
        assert_eq!(rows[0].completion_pct, Cell::Number(75.0));
        assert_eq!(rows[1].completion_pct, Cell::Number(72.4));
        assert!(rows[0].benchmark_pct.is_missing());
    }

    #[test]
    fn log_sheet_splits_tags() {
        let sheet = Sheet::from_rows(vec![
            vec![s("Patient"), s("Date"), s("Org"), s("Event"), s("Tags"), s("ICD10")],
            vec![s("Jane"), s("03/01/2024"), s("ACN"), s("INP Admit"), s("TCM, CCM"), Data::Float(250.0)],
        ]);
        let rows = log_from_sheet(&sheet);
        assert_eq!(rows[0].program_tags, vec!["TCM", "CCM"]);
        assert_eq!(rows[0].icd10, "250");
        assert_eq!(rows[0].facility, "");
    }

    #[test]
    fn excel_serial_dates() {
        assert_eq!(excel_date(45352.0), NaiveDate::from_ymd_opt(2024, 3, 1));
    }
}
