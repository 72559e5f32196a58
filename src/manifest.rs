//! Dataset inspection: what the dashboard will see before it sees it.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

use crate::loader::fingerprint;
use crate::projection::feed::parse_log_date;
use crate::records::{Cell, CoercionError, MetricRecord, ProgramOutcomeRecord, Scoped, UtilizationLogEntry};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatasetManifest {
    pub path: String,
    pub hash_sha256: String,
    pub row_count: u64,
    pub organizations: Vec<String>,
    /// Present but not numeric.
    pub non_numeric_cells: u64,
    pub missing_cells: u64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub events: Vec<String>,
    pub unparseable_dates: u64,
    pub warnings: Vec<String>,
}

fn tally(manifest: &mut DatasetManifest, cells: &[&Cell]) {
    for cell in cells {
        match cell.value() {
            Ok(_) => {}
            Err(CoercionError::Missing) => manifest.missing_cells += 1,
            Err(CoercionError::NotNumeric(_)) => manifest.non_numeric_cells += 1,
        }
    }
}

fn organizations<T: Scoped>(rows: &[T]) -> Vec<String> {
    rows.iter()
        .map(|r| r.organization().trim().to_string())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

fn read_rows<T: DeserializeOwned>(path: &Path) -> Result<(Vec<T>, DatasetManifest)> {
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let rows: Vec<T> =
        serde_json::from_slice(&bytes).with_context(|| format!("decoding {}", path.display()))?;
    let manifest = DatasetManifest {
        path: path.display().to_string(),
        hash_sha256: fingerprint(&bytes),
        row_count: rows.len() as u64,
        ..Default::default()
    };
    Ok((rows, manifest))
}

pub fn analyze_metrics(path: &Path) -> Result<DatasetManifest> {
    let (rows, mut manifest) = read_rows::<MetricRecord>(path)?;
    manifest.organizations = organizations(&rows);
    let mut seen = BTreeSet::new();
    for r in &rows {
        tally(
            &mut manifest,
            &[&r.current_value, &r.benchmark_value, &r.trailing_average, &r.year_to_date_average],
        );
        if !seen.insert((r.organization.trim().to_string(), r.metric_name.clone())) {
            manifest.warnings.push(format!(
                "duplicate metric {:?} for organization {:?}",
                r.metric_name, r.organization
            ));
        }
    }
    Ok(manifest)
}

pub fn analyze_programs(path: &Path) -> Result<DatasetManifest> {
    let (rows, mut manifest) = read_rows::<ProgramOutcomeRecord>(path)?;
    manifest.organizations = organizations(&rows);
    for r in &rows {
        tally(
            &mut manifest,
            &[&r.eligible_count, &r.engaged_count, &r.completed_count, &r.completion_pct, &r.benchmark_pct],
        );
        // the dashboard trusts these counts; report, don't reject
        if let (Some(eligible), Some(engaged), Some(completed)) = (
            r.eligible_count.number(),
            r.engaged_count.number(),
            r.completed_count.number(),
        ) {
            if completed > engaged || engaged > eligible {
                manifest.warnings.push(format!(
                    "program {:?} ({}) counts out of order: eligible={} engaged={} completed={}",
                    r.program, r.organization, eligible, engaged, completed
                ));
            }
        }
    }
    Ok(manifest)
}

pub fn analyze_log(path: &Path) -> Result<DatasetManifest> {
    let (rows, mut manifest) = read_rows::<UtilizationLogEntry>(path)?;
    manifest.organizations = organizations(&rows);
    manifest.events = rows
        .iter()
        .filter(|e| !e.event.is_empty())
        .map(|e| e.event.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    manifest.unparseable_dates = rows.iter().filter(|e| parse_log_date(&e.date).is_none()).count() as u64;
    Ok(manifest)
}
