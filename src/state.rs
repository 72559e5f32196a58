use anyhow::{bail, Result};
use std::path::PathBuf;

use crate::dashboard::{DashboardSettings, DatasetPaths};
use crate::projection::metrics::DEFAULT_SECTION_ORDER;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub organization: String,
    pub data_dir: PathBuf,
    pub data_base_url: Option<String>,
    pub metrics_file: String,
    pub programs_file: String,
    pub log_file: String,
    pub event_filter: String,
    pub synthesize_trends: bool,
    pub section_order: Vec<String>,
    pub export_href: String,
    pub load_retries: u32,
    pub output: OutputFormat,
    pub list_events: bool,
}

fn parse_flag(raw: &str) -> bool {
    matches!(raw.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(var: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            organization: var("DASHBOARD_ORG").unwrap_or_else(|| "ACN".to_string()),
            data_dir: PathBuf::from(var("DATA_DIR").unwrap_or_else(|| "./data".to_string())),
            data_base_url: var("DATA_BASE_URL").filter(|v| !v.trim().is_empty()),
            metrics_file: var("METRICS_FILE").unwrap_or_else(|| "performance_metrics.json".to_string()),
            programs_file: var("PROGRAMS_FILE").unwrap_or_else(|| "program_outcomes.json".to_string()),
            log_file: var("LOG_FILE").unwrap_or_else(|| "utilization_log.json".to_string()),
            event_filter: var("EVENT_FILTER").unwrap_or_default(),
            synthesize_trends: var("SYNTH_TRENDS").map(|v| parse_flag(&v)).unwrap_or(false),
            section_order: var("SECTION_ORDER")
                .map(|v| {
                    v.split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or_else(|| DEFAULT_SECTION_ORDER.iter().map(|s| s.to_string()).collect()),
            export_href: var("EXPORT_HREF").unwrap_or_else(|| "./data/dashboard_export.xlsx".to_string()),
            load_retries: var("LOAD_RETRIES").and_then(|v| v.parse().ok()).unwrap_or(0),
            output: match var("OUTPUT_FORMAT").as_deref() {
                Some("json") => OutputFormat::Json,
                _ => OutputFormat::Text,
            },
            list_events: false,
        }
    }

    /// Command-line flags override the environment.
    pub fn apply_args<I>(&mut self, args: I) -> Result<()>
    where
        I: IntoIterator<Item = String>,
    {
        for arg in args {
            if let Some(v) = arg.strip_prefix("--event=") {
                self.event_filter = v.to_string();
            } else if let Some(v) = arg.strip_prefix("--org=") {
                self.organization = v.to_string();
            } else if let Some(v) = arg.strip_prefix("--data-dir=") {
                self.data_dir = PathBuf::from(v);
                self.data_base_url = None;
            } else if let Some(v) = arg.strip_prefix("--url=") {
                self.data_base_url = Some(v.to_string());
            } else if let Some(v) = arg.strip_prefix("--retries=") {
                self.load_retries = match v.parse() {
                    Ok(n) => n,
                    Err(_) => bail!("invalid --retries value: {}", v),
                };
            } else {
                match arg.as_str() {
                    "--synth-trends" => self.synthesize_trends = true,
                    "--json" => self.output = OutputFormat::Json,
                    "--list-events" => self.list_events = true,
                    other => bail!("unknown argument: {}", other),
                }
            }
        }
        Ok(())
    }

    pub fn dataset_paths(&self) -> DatasetPaths {
        DatasetPaths {
            metrics: self.metrics_file.clone(),
            programs: self.programs_file.clone(),
            log: self.log_file.clone(),
        }
    }

    pub fn settings(&self) -> DashboardSettings {
        DashboardSettings {
            organization: self.organization.clone(),
            section_order: self.section_order.clone(),
            export_href: self.export_href.clone(),
            synthesize_trends: self.synthesize_trends,
        }
    }
}
