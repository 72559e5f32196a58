use serde::Serialize;

use crate::format::{format_cell, MetricKind};
use crate::polarity::Polarity;
use crate::records::{Cell, ProgramOutcomeRecord};
use crate::variance::{variance, variance_text, Variance};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgramOutcomeRow {
    pub program: String,
    pub eligible: String,
    pub engaged: String,
    pub completed: String,
    pub completion_pct: String,
    pub benchmark_pct: String,
    pub variance: Option<Variance>,
    pub variance_text: String,
    pub variance_is_favorable: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProgramTable {
    pub rows: Vec<ProgramOutcomeRow>,
    #[serde(skip)]
    pub degraded_cells: usize,
}

/// One row per program, source order. Completion is always higher-is-better.
pub fn project_programs<'r, I>(records: I) -> ProgramTable
where
    I: IntoIterator<Item = &'r ProgramOutcomeRecord>,
{
    let mut table = ProgramTable::default();
    for record in records {
        let cells: [&Cell; 5] = [
            &record.eligible_count,
            &record.engaged_count,
            &record.completed_count,
            &record.completion_pct,
            &record.benchmark_pct,
        ];
        table.degraded_cells += cells.iter().filter(|c| c.number().is_none()).count();

        let variance = variance(
            MetricKind::Percentage,
            Polarity::HigherIsBetter,
            &record.completion_pct,
            &record.benchmark_pct,
        );
        table.rows.push(ProgramOutcomeRow {
            program: record.program.clone(),
            eligible: format_cell(MetricKind::Count, &record.eligible_count),
            engaged: format_cell(MetricKind::Count, &record.engaged_count),
            completed: format_cell(MetricKind::Count, &record.completed_count),
            completion_pct: format_cell(MetricKind::Percentage, &record.completion_pct),
            benchmark_pct: format_cell(MetricKind::Percentage, &record.benchmark_pct),
            variance_text: variance_text(variance.as_ref()),
            variance_is_favorable: variance.as_ref().map(|v| v.is_favorable),
            variance,
        });
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::PLACEHOLDER;

    fn program(name: &str, eligible: f64, engaged: f64, completed: f64, pct: Cell, bench: Cell) -> ProgramOutcomeRecord {
        ProgramOutcomeRecord {
            program: name.into(),
            eligible_count: Cell::Number(eligible),
            engaged_count: Cell::Number(engaged),
            completed_count: Cell::Number(completed),
            completion_pct: pct,
            benchmark_pct: bench,
            organization: "ACN".into(),
        }
    }

    #[test]
    fn ccm_above_benchmark() {
        let rec = program("CCM", 1450.0, 620.0, 449.0, Cell::Number(72.4), Cell::Number(65.0));
        let table = project_programs([&rec]);
        let row = &table.rows[0];
        assert_eq!(row.program, "CCM");
        assert_eq!(row.eligible, "1,450");
        assert_eq!(row.engaged, "620");
        assert_eq!(row.completed, "449");
        assert_eq!(row.completion_pct, "72.4%");
        assert_eq!(row.benchmark_pct, "65.0%");
        assert_eq!(row.variance_text, "+7.4 pts ↑");
        assert_eq!(row.variance_is_favorable, Some(true));
    }

    #[test]
    fn below_benchmark_is_unfavorable_even_for_utilization_named_programs() {
        // program names never go through the metric polarity table
        let rec = program("ER Diversion", 80.0, 40.0, 20.0, Cell::Number(50.0), Cell::Number(60.0));
        let table = project_programs([&rec]);
        assert_eq!(table.rows[0].variance_text, "-10.0 pts ↓");
        assert_eq!(table.rows[0].variance_is_favorable, Some(false));
    }

    #[test]
    fn missing_benchmark_is_neutral() {
        let rec = program("RPM", 10.0, 5.0, 2.0, Cell::Number(40.0), Cell::Missing);
        let table = project_programs([&rec]);
        assert_eq!(table.rows[0].benchmark_pct, PLACEHOLDER);
        assert_eq!(table.rows[0].variance, None);
        assert_eq!(table.rows[0].variance_text, "");
        assert_eq!(table.degraded_cells, 1);
    }

    #[test]
    fn preserves_source_order() {
        let records = vec![
            program("TCM", 1.0, 1.0, 1.0, Cell::Number(1.0), Cell::Number(1.0)),
            program("AWV", 1.0, 1.0, 1.0, Cell::Number(1.0), Cell::Number(1.0)),
        ];
        let names: Vec<String> = project_programs(&records).rows.into_iter().map(|r| r.program).collect();
        assert_eq!(names, vec!["TCM", "AWV"]);
    }
}
