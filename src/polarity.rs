//! Which direction is "good" for a metric.
//!
//! Every variance computation goes through [`PolarityTable::resolve`]; no
//! call site keeps its own list of lower-is-better metrics.

use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;

/// Utilization metrics where fewer events is the better outcome.
pub const LOWER_IS_BETTER_METRICS: [&str; 3] =
    ["Readmission Rate (%)", "INP Admits/1,000", "ER Admits/1,000"];

pub const LOWER_IS_BETTER_PATTERN: &str = r"(?i)Readmission|Admits|ER|INP";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Polarity {
    LowerIsBetter,
    HigherIsBetter,
}

impl Polarity {
    pub fn lower_is_better(self) -> bool {
        matches!(self, Polarity::LowerIsBetter)
    }

    /// Non-strict: matching the benchmark exactly is favorable either way.
    pub fn is_favorable(self, signed_difference: f64) -> bool {
        match self {
            Polarity::LowerIsBetter => signed_difference <= 0.0,
            Polarity::HigherIsBetter => signed_difference >= 0.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PolarityTable {
    exact: Vec<(String, Polarity)>,
    patterns: Vec<(Regex, Polarity)>,
    fallback: Polarity,
}

impl PolarityTable {
    /// Empty table; everything resolves to `fallback`.
    pub fn new(fallback: Polarity) -> Self {
        Self {
            exact: Vec::new(),
            patterns: Vec::new(),
            fallback,
        }
    }

    /// The clinical-operations defaults.
    pub fn clinical() -> Self {
        let mut table = Self::new(Polarity::HigherIsBetter);
        for name in LOWER_IS_BETTER_METRICS {
            table = table.with_exact(name, Polarity::LowerIsBetter);
        }
        if let Ok(pattern) = Regex::new(LOWER_IS_BETTER_PATTERN) {
            table.patterns.push((pattern, Polarity::LowerIsBetter));
        }
        table
    }

    pub fn with_exact(mut self, metric_name: &str, polarity: Polarity) -> Self {
        self.exact.push((metric_name.to_string(), polarity));
        self
    }

    pub fn with_pattern(mut self, pattern: &str, polarity: Polarity) -> Result<Self, regex::Error> {
        self.patterns.push((Regex::new(pattern)?, polarity));
        Ok(self)
    }

    /// Exact names win over patterns; unknown metrics get the fallback.
    pub fn resolve(&self, metric_name: &str) -> Polarity {
        let name = metric_name.trim();
        if let Some((_, polarity)) = self.exact.iter().find(|(n, _)| n == name) {
            return *polarity;
        }
        self.patterns
            .iter()
            .find(|(re, _)| re.is_match(name))
            .map(|(_, polarity)| *polarity)
            .unwrap_or(self.fallback)
    }
}

impl Default for PolarityTable {
    fn default() -> Self {
        Self::clinical()
    }
}

static CLINICAL: OnceLock<PolarityTable> = OnceLock::new();

pub fn clinical_table() -> &'static PolarityTable {
    CLINICAL.get_or_init(PolarityTable::clinical)
}

pub fn lower_is_better(metric_name: &str) -> bool {
    clinical_table().resolve(metric_name).lower_is_better()
}
