//! Dataset records as they arrive from the three JSON snapshots.
//!
//! Upstream exports are loose: numbers show up as strings, blanks as `""`,
//! and field names differ between export revisions. Records keep raw
//! numeric cells as [`Cell`] and coerce at projection time, so one bad
//! value degrades one display cell instead of failing the whole dataset.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoercionError {
    #[error("value is missing")]
    Missing,
    #[error("value {0:?} is not numeric")]
    NotNumeric(String),
}

/// A raw numeric cell: number, numeric string, null, or anything else.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    Number(f64),
    Text(String),
    #[default]
    Missing,
    Other(Value),
}

impl Cell {
    pub fn value(&self) -> Result<f64, CoercionError> {
        match self {
            Cell::Number(n) if n.is_finite() => Ok(*n),
            Cell::Number(n) => Err(CoercionError::NotNumeric(n.to_string())),
            Cell::Text(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    return Err(CoercionError::Missing);
                }
                match trimmed.parse::<f64>() {
                    Ok(n) if n.is_finite() => Ok(n),
                    _ => Err(CoercionError::NotNumeric(s.clone())),
                }
            }
            Cell::Missing => Err(CoercionError::Missing),
            Cell::Other(v) => Err(CoercionError::NotNumeric(v.to_string())),
        }
    }

    pub fn number(&self) -> Option<f64> {
        self.value().ok()
    }

    /// Absent, null, or blank.
    pub fn is_missing(&self) -> bool {
        matches!(self.value(), Err(CoercionError::Missing))
    }
}

impl From<f64> for Cell {
    fn from(n: f64) -> Self {
        Cell::Number(n)
    }
}

impl From<Option<f64>> for Cell {
    fn from(n: Option<f64>) -> Self {
        n.map(Cell::Number).unwrap_or(Cell::Missing)
    }
}

/// Records that belong to one organization.
pub trait Scoped {
    fn organization(&self) -> &str;

    fn belongs_to(&self, organization: &str) -> bool {
        self.organization().trim() == organization.trim()
    }
}

/// Keep only the rows for `organization`, in source order.
pub fn for_organization<'a, T: Scoped>(rows: &'a [T], organization: &str) -> Vec<&'a T> {
    rows.iter().filter(|r| r.belongs_to(organization)).collect()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricRecord {
    #[serde(default, alias = "Section", alias = "Category", deserialize_with = "lenient_text")]
    pub section: String,
    #[serde(default, alias = "KPI", alias = "Metric", deserialize_with = "lenient_text")]
    pub metric_name: String,
    #[serde(default, alias = "Current", alias = "Current_Month")]
    pub current_value: Cell,
    #[serde(default, alias = "Benchmark")]
    pub benchmark_value: Cell,
    #[serde(default, alias = "Last3", alias = "Last_3_Mth_Avg")]
    pub trailing_average: Cell,
    #[serde(default, alias = "YTD", alias = "YTD_Avg")]
    pub year_to_date_average: Cell,
    #[serde(default, alias = "Org", deserialize_with = "lenient_text")]
    pub organization: String,
}

impl Scoped for MetricRecord {
    fn organization(&self) -> &str {
        &self.organization
    }
}

/// completed ≤ engaged ≤ eligible is expected upstream but not checked here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgramOutcomeRecord {
    #[serde(default, alias = "Program", deserialize_with = "lenient_text")]
    pub program: String,
    #[serde(default, alias = "Eligible")]
    pub eligible_count: Cell,
    #[serde(default, alias = "Engaged")]
    pub engaged_count: Cell,
    #[serde(default, alias = "Completed")]
    pub completed_count: Cell,
    #[serde(default, alias = "Completion_Pct", alias = "CompletionPct")]
    pub completion_pct: Cell,
    #[serde(default, alias = "Benchmark", alias = "BenchmarkPct")]
    pub benchmark_pct: Cell,
    #[serde(default, alias = "Org", deserialize_with = "lenient_text")]
    pub organization: String,
}

impl Scoped for ProgramOutcomeRecord {
    fn organization(&self) -> &str {
        &self.organization
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UtilizationLogEntry {
    #[serde(default, alias = "Patient", deserialize_with = "lenient_text")]
    pub patient: String,
    #[serde(default, alias = "Date", deserialize_with = "lenient_text")]
    pub date: String,
    #[serde(default, alias = "Org", deserialize_with = "lenient_text")]
    pub organization: String,
    #[serde(default, alias = "Event", deserialize_with = "lenient_text")]
    pub event: String,
    #[serde(default, alias = "Programs", alias = "Tags", deserialize_with = "program_tags")]
    pub program_tags: Vec<String>,
    #[serde(default, alias = "ICD10", deserialize_with = "lenient_text")]
    pub icd10: String,
    #[serde(default, alias = "Facility", deserialize_with = "lenient_text")]
    pub facility: String,
    #[serde(default, alias = "Diagnosis", deserialize_with = "lenient_text")]
    pub diagnosis: String,
}

impl Scoped for UtilizationLogEntry {
    fn organization(&self) -> &str {
        &self.organization
    }
}

fn value_to_text(value: Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s,
        other => other.to_string(),
    }
}

fn lenient_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(value_to_text)
}

/// Tags arrive either as a JSON array or as one comma-separated string.
fn program_tags<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Value::deserialize(deserializer)?;
    let items: Vec<String> = match raw {
        Value::Array(values) => values.into_iter().map(value_to_text).collect(),
        Value::Null => Vec::new(),
        other => value_to_text(other).split(',').map(str::to_string).collect(),
    };
    Ok(items
        .into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect())
}
