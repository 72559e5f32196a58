//! End-to-end: datasets on disk → loaded session → rendered view.

use clinops_dashboard::dashboard::{Dashboard, DashboardSettings, DatasetPaths};
use clinops_dashboard::format::PLACEHOLDER;
use clinops_dashboard::loader::{FsSource, LoadError};
use clinops_dashboard::projection::{EventFilter, TableLine};
use clinops_dashboard::render::{RenderPort, TextRenderer};
use clinops_dashboard::trend::{SeedCache, SynthesizedTrends};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const METRICS: &str = r#"[
  {"Org":"ACN","Section":"Clinical Quality","KPI":"AWV Completion %","Current":61.5,"Benchmark":55,"Last3":60.1,"YTD":58.9},
  {"Org":"ACN","Section":"Utilization","KPI":"Readmission Rate (%)","Current":14.2,"Benchmark":13.0,"Last3":null,"YTD":null},
  {"Org":"ACN","Section":"Utilization","KPI":"INP Admits/1,000","Current":"18","Benchmark":20},
  {"Org":"ACN","Section":"Utilization","KPI":"ER Admits/1,000","Current":null,"Benchmark":45},
  {"Org":"ACN","Section":"Cost","KPI":"Total Visits","Current":12500,"Benchmark":10000},
  {"Org":"BRV","Section":"Utilization","KPI":"ER Admits/1,000","Current":52,"Benchmark":45}
]"#;

const PROGRAMS: &str = r#"[
  {"Org":"ACN","Program":"CCM","Eligible":1450,"Engaged":620,"Completed":449,"Completion_Pct":72.4,"Benchmark":65.0},
  {"Org":"ACN","Program":"TCM","Eligible":310,"Engaged":250,"Completed":160,"Completion_Pct":64.0,"Benchmark":70.0},
  {"Org":"BRV","Program":"RPM","Eligible":90,"Engaged":40,"Completed":30,"Completion_Pct":75.0,"Benchmark":60.0}
]"#;

const LOG: &str = r#"[
  {"Patient":"P-1","Date":"02/15/2024","Org":"ACN","Event":"ER Visit","Tags":["CCM"],"ICD10":"J44.1","Facility":"Mercy","Diagnosis":"COPD exacerbation"},
  {"Patient":"P-2","Date":"03/01/2024","Org":"ACN","Event":"INP Admit","Tags":"TCM, RPM","ICD10":"I50.9","Facility":"St. Luke","Diagnosis":"Heart failure"},
  {"Patient":"P-3","Date":"not recorded","Org":"ACN","Event":"ER Visit","Tags":[],"ICD10":"R07.9","Facility":"Mercy","Diagnosis":"Chest pain"},
  {"Patient":"P-4","Date":"12/20/2023","Org":"ACN","Event":"INP Admit","Tags":["SDOH"],"ICD10":"E11.9","Facility":"Mercy","Diagnosis":"Diabetes"},
  {"Patient":"P-5","Date":"03/05/2024","Org":"BRV","Event":"ER Visit","Tags":[],"ICD10":"S52.5","Facility":"North","Diagnosis":"Fracture"}
]"#;

fn write_datasets(dir: &Path) {
    fs::write(dir.join("performance_metrics.json"), METRICS).unwrap();
    fs::write(dir.join("program_outcomes.json"), PROGRAMS).unwrap();
    fs::write(dir.join("utilization_log.json"), LOG).unwrap();
}

async fn load(dir: &Path, settings: DashboardSettings) -> Result<Dashboard, LoadError> {
    Dashboard::load(&FsSource::new(dir), &DatasetPaths::default(), settings).await
}

#[tokio::test]
async fn metric_table_sections_and_variances() {
    let dir = TempDir::new().unwrap();
    write_datasets(dir.path());
    let mut dash = load(dir.path(), DashboardSettings::default()).await.unwrap();
    let view = dash.view(&EventFilter::All);

    let titles: Vec<&str> = view
        .metrics
        .iter()
        .filter_map(|l| match l {
            TableLine::Section { title } => Some(title.as_str()),
            TableLine::Row(_) => None,
        })
        .collect();
    assert_eq!(titles, vec!["UTILIZATION", "CLINICAL QUALITY", "COST"]);

    let rows: Vec<_> = view
        .metrics
        .iter()
        .filter_map(|l| match l {
            TableLine::Row(r) => Some(r),
            TableLine::Section { .. } => None,
        })
        .collect();
    assert_eq!(rows.len(), 5);

    let readmit = rows.iter().find(|r| r.metric == "Readmission Rate (%)").unwrap();
    assert_eq!(readmit.variance_text, "+1.2 pts ↑");
    assert_eq!(readmit.variance_is_favorable, Some(false));
    // no synthesis unless asked for
    assert_eq!(readmit.display_trailing, PLACEHOLDER);
    assert!(!readmit.trend_synthetic);

    let inp = rows.iter().find(|r| r.metric == "INP Admits/1,000").unwrap();
    assert_eq!(inp.display_current, "18");
    assert_eq!(inp.variance_text, "-2 ↓");
    assert_eq!(inp.variance_is_favorable, Some(true));

    let er = rows.iter().find(|r| r.metric == "ER Admits/1,000").unwrap();
    assert_eq!(er.display_current, PLACEHOLDER);
    assert_eq!(er.variance_text, "");
    assert_eq!(er.variance_is_favorable, None);

    let awv = rows.iter().find(|r| r.metric == "AWV Completion %").unwrap();
    assert_eq!(awv.display_trailing, "60.1%");
    assert_eq!(awv.variance_text, "+6.5 pts ↑");

    let visits = rows.iter().find(|r| r.metric == "Total Visits").unwrap();
    assert_eq!(visits.display_current, "12,500");
    assert_eq!(visits.variance_text, "+2,500 ↑");
}

#[tokio::test]
async fn program_outcomes_use_higher_is_better() {
    let dir = TempDir::new().unwrap();
    write_datasets(dir.path());
    let dash = load(dir.path(), DashboardSettings::default()).await.unwrap();
    let programs = dash.program_outcomes().rows;

    assert_eq!(programs.len(), 2);
    assert_eq!(programs[0].program, "CCM");
    assert_eq!(programs[0].eligible, "1,450");
    assert_eq!(programs[0].variance_text, "+7.4 pts ↑");
    assert_eq!(programs[0].variance_is_favorable, Some(true));
    assert_eq!(programs[1].variance_text, "-6.0 pts ↓");
    assert_eq!(programs[1].variance_is_favorable, Some(false));
}

#[tokio::test]
async fn feed_is_newest_first_with_undated_last() {
    let dir = TempDir::new().unwrap();
    write_datasets(dir.path());
    let dash = load(dir.path(), DashboardSettings::default()).await.unwrap();

    let feed = dash.feed(&EventFilter::parse(""));
    let order: Vec<&str> = feed.cards.iter().map(|c| c.patient.as_str()).collect();
    assert_eq!(order, vec!["P-2", "P-1", "P-4", "P-3"]);
    assert_eq!(feed.total_label, "4 Total");

    let inp = dash.feed(&EventFilter::parse("INP Admit"));
    let order: Vec<&str> = inp.cards.iter().map(|c| c.patient.as_str()).collect();
    assert_eq!(order, vec!["P-2", "P-4"]);
    assert!(inp.cards.iter().all(|c| c.inpatient));
    assert_eq!(inp.cards[0].tags.len(), 2);
}

#[tokio::test]
async fn synthesized_trends_are_opt_in_and_stable() {
    let dir = TempDir::new().unwrap();
    write_datasets(dir.path());
    let settings = DashboardSettings {
        synthesize_trends: true,
        ..Default::default()
    };
    let mut dash = load(dir.path(), settings)
        .await
        .unwrap()
        .with_seed_cache(SeedCache::seeded(2024));
    let first = dash.view(&EventFilter::All);
    let again = dash.view(&EventFilter::parse("ER Visit"));
    assert!(first.synthetic_trends);
    assert_eq!(first.metrics, again.metrics);

    let mut fresh = load(dir.path(), DashboardSettings::default())
        .await
        .unwrap()
        .with_trend_source(Box::new(SynthesizedTrends::default()))
        .with_seed_cache(SeedCache::seeded(2024));
    assert_eq!(fresh.view(&EventFilter::All).metrics, first.metrics);
}

#[tokio::test]
async fn missing_dataset_fails_initialization() {
    let dir = TempDir::new().unwrap();
    write_datasets(dir.path());
    fs::remove_file(dir.path().join("utilization_log.json")).unwrap();
    let err = load(dir.path(), DashboardSettings::default()).await.err().unwrap();
    assert!(matches!(err, LoadError::Unreachable { .. }));
    assert_eq!(err.path(), "utilization_log.json");
}

#[tokio::test]
async fn malformed_dataset_fails_initialization() {
    let dir = TempDir::new().unwrap();
    write_datasets(dir.path());
    fs::write(dir.path().join("program_outcomes.json"), "[{").unwrap();
    let err = load(dir.path(), DashboardSettings::default()).await.err().unwrap();
    assert!(matches!(err, LoadError::Decode { .. }));
}

#[tokio::test]
async fn organization_is_configurable() {
    let dir = TempDir::new().unwrap();
    write_datasets(dir.path());
    let settings = DashboardSettings {
        organization: "BRV".into(),
        ..Default::default()
    };
    let mut dash = load(dir.path(), settings).await.unwrap();
    let view = dash.view(&EventFilter::All);
    assert_eq!(view.programs.len(), 1);
    assert_eq!(view.programs[0].program, "RPM");
    assert_eq!(view.feed.cards.len(), 1);

    let mut renderer = TextRenderer::new(Vec::new());
    renderer.render(&view).unwrap();
    let text = String::from_utf8(renderer.into_inner()).unwrap();
    assert!(text.contains("CLINICAL OPERATIONS DASHBOARD: BRV"));
    assert!(text.contains("+7 ↑ (bad)"));
}
