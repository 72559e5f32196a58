//! Utilization feed: organization + event filtering, newest first.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::Serialize;

use crate::records::{Scoped, UtilizationLogEntry};

/// Value of the event selector. `""` and `"ALL"` mean no filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum EventFilter {
    #[default]
    All,
    Only(String),
}

impl EventFilter {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "" | "ALL" => EventFilter::All,
            event => EventFilter::Only(event.to_string()),
        }
    }

    /// Exact, case-sensitive match.
    pub fn matches(&self, event: &str) -> bool {
        match self {
            EventFilter::All => true,
            EventFilter::Only(wanted) => wanted == event,
        }
    }

    /// Selector value; empty for no filter.
    pub fn as_str(&self) -> &str {
        match self {
            EventFilter::All => "",
            EventFilter::Only(event) => event,
        }
    }
}

const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

// two-digit years first: "%Y" would happily read "24" as year 24
const DATE_FORMATS: [&str; 5] = ["%m/%d/%y", "%m/%d/%Y", "%Y-%m-%d", "%Y/%m/%d", "%d-%b-%Y"];

/// Calendar parse of a log date; `None` when no known format fits.
pub fn parse_log_date(raw: &str) -> Option<NaiveDateTime> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

#[derive(Debug, Clone, Default)]
pub struct FeedSelection<'a> {
    pub entries: Vec<&'a UtilizationLogEntry>,
    pub unparseable_dates: usize,
}

/// Entries for `organization` matching `filter`, newest first.
///
/// The sort is stable. Entries whose date does not parse rank below every
/// dated entry and keep their original relative order.
pub fn filter_and_sort<'a>(
    log: &'a [UtilizationLogEntry],
    organization: &str,
    filter: &EventFilter,
) -> FeedSelection<'a> {
    let mut keyed: Vec<(Option<NaiveDateTime>, &UtilizationLogEntry)> = log
        .iter()
        .filter(|e| e.belongs_to(organization) && filter.matches(&e.event))
        .map(|e| (parse_log_date(&e.date), e))
        .collect();
    keyed.sort_by(|a, b| b.0.cmp(&a.0));

    let unparseable_dates = keyed.iter().filter(|(date, _)| date.is_none()).count();
    FeedSelection {
        entries: keyed.into_iter().map(|(_, e)| e).collect(),
        unparseable_dates,
    }
}

/// Distinct non-empty events for the organization, sorted.
pub fn event_options(log: &[UtilizationLogEntry], organization: &str) -> Vec<String> {
    let mut events: Vec<String> = log
        .iter()
        .filter(|e| e.belongs_to(organization) && !e.event.is_empty())
        .map(|e| e.event.clone())
        .collect();
    events.sort();
    events.dedup();
    events
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TagStyle {
    Tcm,
    Ccm,
    Rpm,
    Awv,
    Acp,
    Sdoh,
    Neutral,
}

impl TagStyle {
    pub fn of(tag: &str) -> Self {
        match tag.trim().to_uppercase().as_str() {
            "TCM" => TagStyle::Tcm,
            "CCM" => TagStyle::Ccm,
            "RPM" => TagStyle::Rpm,
            "AWV" => TagStyle::Awv,
            "ACP" => TagStyle::Acp,
            "SDOH" => TagStyle::Sdoh,
            _ => TagStyle::Neutral,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TagStyle::Tcm => "tcm",
            TagStyle::Ccm => "ccm",
            TagStyle::Rpm => "rpm",
            TagStyle::Awv => "awv",
            TagStyle::Acp => "acp",
            TagStyle::Sdoh => "sdoh",
            TagStyle::Neutral => "neutral",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgramTag {
    pub label: String,
    pub style: TagStyle,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedCard {
    pub patient: String,
    pub date: String,
    pub organization: String,
    pub event: String,
    /// Inpatient events get the highlighted pill.
    pub inpatient: bool,
    pub tags: Vec<ProgramTag>,
    pub icd10: String,
    pub facility: String,
    pub diagnosis: String,
}

impl From<&UtilizationLogEntry> for FeedCard {
    fn from(entry: &UtilizationLogEntry) -> Self {
        Self {
            patient: entry.patient.clone(),
            date: entry.date.clone(),
            organization: entry.organization.clone(),
            event: entry.event.clone(),
            inpatient: entry.event.to_lowercase().contains("inp"),
            tags: entry
                .program_tags
                .iter()
                .map(|t| ProgramTag {
                    label: t.clone(),
                    style: TagStyle::of(t),
                })
                .collect(),
            icd10: entry.icd10.clone(),
            facility: entry.facility.clone(),
            diagnosis: entry.diagnosis.clone(),
        }
    }
}

pub fn feed_cards(selection: &FeedSelection<'_>) -> Vec<FeedCard> {
    selection.entries.iter().map(|e| FeedCard::from(*e)).collect()
}
