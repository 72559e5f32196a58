//! One dashboard session: the three loaded snapshots plus the state derived
//! from them for as long as the session lives.

use serde::Serialize;

use crate::loader::{load_dataset, DatasetSource, LoadError};
use crate::logging::{
    log_degraded_cells, log_feed_applied, log_load_failure, log_trend_synthesis,
    log_unrecognized_sections, v_str, Domain, ProfileScope,
};
use crate::polarity::PolarityTable;
use crate::projection::metrics::DEFAULT_SECTION_ORDER;
use crate::projection::{
    event_options, feed_cards, filter_and_sort, project_programs, EventFilter, FeedCard,
    MetricTable, MetricTableProjector, ProgramOutcomeRow, ProgramTable, TableLine,
};
use crate::records::{for_organization, MetricRecord, ProgramOutcomeRecord, UtilizationLogEntry};
use crate::trend::{trend_source, SeedCache, TrendSource};

pub const ALL_EVENTS_LABEL: &str = "All Events";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetPaths {
    pub metrics: String,
    pub programs: String,
    pub log: String,
}

impl Default for DatasetPaths {
    fn default() -> Self {
        Self {
            metrics: "performance_metrics.json".to_string(),
            programs: "program_outcomes.json".to_string(),
            log: "utilization_log.json".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Datasets {
    pub metrics: Vec<MetricRecord>,
    pub programs: Vec<ProgramOutcomeRecord>,
    pub log: Vec<UtilizationLogEntry>,
}

/// Fetch all three datasets concurrently; the first failure wins and
/// nothing is returned.
pub async fn load_all<S>(source: &S, paths: &DatasetPaths) -> Result<Datasets, LoadError>
where
    S: DatasetSource + ?Sized,
{
    let joined = tokio::try_join!(
        load_dataset::<MetricRecord, S>(source, &paths.metrics),
        load_dataset::<ProgramOutcomeRecord, S>(source, &paths.programs),
        load_dataset::<UtilizationLogEntry, S>(source, &paths.log),
    );
    match joined {
        Ok((metrics, programs, log)) => Ok(Datasets { metrics, programs, log }),
        Err(err) => {
            log_load_failure(err.path(), &err.to_string());
            Err(err)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardSettings {
    pub organization: String,
    pub section_order: Vec<String>,
    pub export_href: String,
    pub synthesize_trends: bool,
}

impl Default for DashboardSettings {
    fn default() -> Self {
        Self {
            organization: "ACN".to_string(),
            section_order: DEFAULT_SECTION_ORDER.iter().map(|s| s.to_string()).collect(),
            export_href: "./data/dashboard_export.xlsx".to_string(),
            synthesize_trends: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventOption {
    pub value: String,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedView {
    pub total_label: String,
    pub cards: Vec<FeedCard>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardView {
    pub organization: String,
    pub event_filter: String,
    pub event_options: Vec<EventOption>,
    pub metrics: Vec<TableLine>,
    pub programs: Vec<ProgramOutcomeRow>,
    pub feed: FeedView,
    /// Passthrough link to the pre-generated spreadsheet.
    pub export_href: String,
    pub synthetic_trends: bool,
}

pub struct Dashboard {
    settings: DashboardSettings,
    data: Datasets,
    polarity: PolarityTable,
    trends: Box<dyn TrendSource>,
    seeds: SeedCache,
}

impl Dashboard {
    pub async fn load<S>(
        source: &S,
        paths: &DatasetPaths,
        settings: DashboardSettings,
    ) -> Result<Self, LoadError>
    where
        S: DatasetSource + ?Sized,
    {
        let data = load_all(source, paths).await?;
        Ok(Self::new(settings, data))
    }

    pub fn new(settings: DashboardSettings, data: Datasets) -> Self {
        let trends = trend_source(settings.synthesize_trends);
        Self {
            settings,
            data,
            polarity: PolarityTable::clinical(),
            trends,
            seeds: SeedCache::new(),
        }
    }

    pub fn with_polarity(mut self, polarity: PolarityTable) -> Self {
        self.polarity = polarity;
        self
    }

    pub fn with_trend_source(mut self, trends: Box<dyn TrendSource>) -> Self {
        self.trends = trends;
        self
    }

    pub fn with_seed_cache(mut self, seeds: SeedCache) -> Self {
        self.seeds = seeds;
        self
    }

    pub fn settings(&self) -> &DashboardSettings {
        &self.settings
    }

    pub fn datasets(&self) -> &Datasets {
        &self.data
    }

    pub fn metric_table(&mut self) -> MetricTable {
        let org = self.settings.organization.as_str();
        let records = for_organization(&self.data.metrics, org);
        let table = MetricTableProjector::new(&self.polarity, self.trends.as_ref())
            .with_section_order(&self.settings.section_order)
            .project(records, &mut self.seeds);

        log_degraded_cells(Domain::Metrics, org, table.degraded_cells);
        log_unrecognized_sections(org, &table.unrecognized_sections);
        if table.synthesized_rows > 0 {
            log_trend_synthesis(org, table.synthesized_rows, self.seeds.len());
        }
        table
    }

    pub fn program_outcomes(&self) -> ProgramTable {
        let org = self.settings.organization.as_str();
        let table = project_programs(for_organization(&self.data.programs, org));
        log_degraded_cells(Domain::Programs, org, table.degraded_cells);
        table
    }

    pub fn feed(&self, filter: &EventFilter) -> FeedView {
        let org = self.settings.organization.as_str();
        let selection = filter_and_sort(&self.data.log, org, filter);
        log_feed_applied(
            org,
            filter.as_str(),
            self.data.log.len(),
            selection.entries.len(),
            selection.unparseable_dates,
        );
        FeedView {
            total_label: format!("{} Total", selection.entries.len()),
            cards: feed_cards(&selection),
        }
    }

    /// "All Events" first, then the organization's distinct events.
    pub fn event_options(&self) -> Vec<EventOption> {
        let mut options = vec![EventOption {
            value: String::new(),
            label: ALL_EVENTS_LABEL.to_string(),
        }];
        options.extend(
            event_options(&self.data.log, &self.settings.organization)
                .into_iter()
                .map(|event| EventOption {
                    value: event.clone(),
                    label: event,
                }),
        );
        options
    }

    pub fn view(&mut self, filter: &EventFilter) -> DashboardView {
        let _scope = ProfileScope::with_context(
            "dashboard_view",
            &[("organization", v_str(&self.settings.organization))],
        );
        let metrics = self.metric_table();
        let synthetic_trends = metrics.synthesized_rows > 0;
        DashboardView {
            organization: self.settings.organization.clone(),
            event_filter: filter.as_str().to_string(),
            event_options: self.event_options(),
            metrics: metrics.lines,
            programs: self.program_outcomes().rows,
            feed: self.feed(filter),
            export_href: self.settings.export_href.clone(),
            synthetic_trends,
        }
    }

    /// Event filter changes only touch the feed; the tables stay as they are.
    pub fn refilter(&self, view: &mut DashboardView, filter: &EventFilter) {
        view.event_filter = filter.as_str().to_string();
        view.feed = self.feed(filter);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::testing::MemorySource;
    use crate::trend::SynthesizedTrends;

    const METRICS: &str = r#"[
        {"Org":"ACN","Section":"Utilization","KPI":"Readmission Rate (%)","Current":14.2,"Benchmark":13.0},
        {"Org":"ACN","Section":"Utilization","KPI":"INP Admits/1,000","Current":18,"Benchmark":20},
        {"Org":"XYZ","Section":"Utilization","KPI":"ER Admits/1,000","Current":50,"Benchmark":45}
    ]"#;
    const PROGRAMS: &str = r#"[
        {"Org":"ACN","Program":"CCM","Eligible":1450,"Engaged":620,"Completed":449,"Completion_Pct":72.4,"Benchmark":65.0},
        {"Org":"XYZ","Program":"TCM","Eligible":10,"Engaged":5,"Completed":1,"Completion_Pct":10,"Benchmark":50}
    ]"#;
    const LOG: &str = r#"[
        {"Org":"ACN","Patient":"B","Date":"02/15/2024","Event":"ER Visit","Programs":"CCM"},
        {"Org":"ACN","Patient":"A","Date":"03/01/2024","Event":"INP Admit","Programs":["TCM"]},
        {"Org":"XYZ","Patient":"C","Date":"03/05/2024","Event":"SNF Admit"}
    ]"#;

    fn source() -> MemorySource {
        MemorySource::default()
            .with("performance_metrics.json", METRICS)
            .with("program_outcomes.json", PROGRAMS)
            .with("utilization_log.json", LOG)
    }

    #[tokio::test]
    async fn loads_and_projects_one_organization() {
        let mut dash = Dashboard::load(&source(), &DatasetPaths::default(), DashboardSettings::default())
            .await
            .unwrap();
        let view = dash.view(&EventFilter::All);

        assert_eq!(view.organization, "ACN");
        assert_eq!(view.metrics.len(), 3); // section + 2 rows
        assert_eq!(view.programs.len(), 1);
        assert_eq!(view.programs[0].variance_text, "+7.4 pts ↑");
        assert_eq!(view.feed.total_label, "2 Total");
        let order: Vec<&str> = view.feed.cards.iter().map(|c| c.patient.as_str()).collect();
        assert_eq!(order, vec!["A", "B"]);
        assert!(!view.synthetic_trends);
    }

    #[tokio::test]
    async fn missing_dataset_aborts_load() {
        let partial = MemorySource::default()
            .with("performance_metrics.json", METRICS)
            .with("utilization_log.json", LOG);
        let err = Dashboard::load(&partial, &DatasetPaths::default(), DashboardSettings::default())
            .await
            .err()
            .unwrap();
        assert_eq!(err.path(), "program_outcomes.json");
    }

    #[tokio::test]
    async fn refilter_recomputes_feed_only() {
        let mut dash = Dashboard::load(&source(), &DatasetPaths::default(), DashboardSettings::default())
            .await
            .unwrap();
        let mut view = dash.view(&EventFilter::All);
        let metrics_before = view.metrics.clone();

        dash.refilter(&mut view, &EventFilter::parse("ER Visit"));
        assert_eq!(view.event_filter, "ER Visit");
        assert_eq!(view.feed.total_label, "1 Total");
        assert_eq!(view.feed.cards[0].patient, "B");
        assert_eq!(view.metrics, metrics_before);
    }

    #[tokio::test]
    async fn event_options_start_with_all_events() {
        let dash = Dashboard::load(&source(), &DatasetPaths::default(), DashboardSettings::default())
            .await
            .unwrap();
        let labels: Vec<String> = dash.event_options().into_iter().map(|o| o.label).collect();
        assert_eq!(labels, vec!["All Events", "ER Visit", "INP Admit"]);
        assert_eq!(dash.event_options()[0].value, "");
    }

    #[test]
    fn synthetic_trends_are_stable_across_rerenders() {
        let data = Datasets {
            metrics: serde_json::from_str(METRICS).unwrap(),
            ..Default::default()
        };
        let mut dash = Dashboard::new(DashboardSettings::default(), data)
            .with_trend_source(Box::new(SynthesizedTrends::default()))
            .with_seed_cache(SeedCache::seeded(11));
        let first = dash.view(&EventFilter::All);
        let second = dash.view(&EventFilter::parse("ER Visit"));
        assert!(first.synthetic_trends);
        assert_eq!(first.metrics, second.metrics);
    }

    #[test]
    fn organization_comes_from_settings() {
        let data = Datasets {
            metrics: serde_json::from_str(METRICS).unwrap(),
            programs: serde_json::from_str(PROGRAMS).unwrap(),
            log: serde_json::from_str(LOG).unwrap(),
        };
        let settings = DashboardSettings {
            organization: "XYZ".into(),
            ..Default::default()
        };
        let mut dash = Dashboard::new(settings, data);
        let view = dash.view(&EventFilter::All);
        assert_eq!(view.programs[0].program, "TCM");
        assert_eq!(view.feed.cards.len(), 1);
        assert_eq!(view.feed.cards[0].patient, "C");
    }
}
