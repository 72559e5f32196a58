use anyhow::{Context, Result};
use serde_json::json;
use url::Url;

use clinops_dashboard::dashboard::Dashboard;
use clinops_dashboard::loader::{DatasetSource, FsSource, HttpSource, RetryConfig, RetryingSource};
use clinops_dashboard::logging::{log, obj, v_str, Domain, Level};
use clinops_dashboard::projection::EventFilter;
use clinops_dashboard::render::{JsonRenderer, RenderPort, TextRenderer};
use clinops_dashboard::state::{Config, OutputFormat};

#[tokio::main]
async fn main() -> Result<()> {
    let mut cfg = Config::from_env();
    cfg.apply_args(std::env::args().skip(1))?;

    let source: Box<dyn DatasetSource> = match &cfg.data_base_url {
        Some(base) => {
            let url = Url::parse(base).with_context(|| format!("invalid DATA_BASE_URL {}", base))?;
            Box::new(HttpSource::new(url))
        }
        None => Box::new(FsSource::new(&cfg.data_dir)),
    };
    let source = RetryingSource::new(source, RetryConfig::with_retries(cfg.load_retries));

    log(
        Level::Info,
        Domain::System,
        "startup",
        obj(&[
            ("organization", v_str(&cfg.organization)),
            ("source", v_str(&source.describe())),
            ("event_filter", v_str(&cfg.event_filter)),
            ("synthesize_trends", json!(cfg.synthesize_trends)),
        ]),
    );

    let mut dashboard = match Dashboard::load(&source, &cfg.dataset_paths(), cfg.settings()).await {
        Ok(d) => d,
        Err(err) => {
            // no partial dashboard
            eprintln!("Failed to load dashboard data: {}. Check the log for details.", err);
            std::process::exit(1);
        }
    };

    if cfg.list_events {
        for option in dashboard.event_options() {
            println!("{}\t{}", option.value, option.label);
        }
        return Ok(());
    }

    let view = dashboard.view(&EventFilter::parse(&cfg.event_filter));
    let stdout = std::io::stdout();
    let mut renderer: Box<dyn RenderPort> = match cfg.output {
        OutputFormat::Text => Box::new(TextRenderer::new(stdout.lock())),
        OutputFormat::Json => Box::new(JsonRenderer::new(stdout.lock())),
    };
    renderer.render(&view)?;

    log(
        Level::Info,
        Domain::System,
        "rendered",
        obj(&[
            ("organization", v_str(&view.organization)),
            ("metric_lines", json!(view.metrics.len())),
            ("programs", json!(view.programs.len())),
            ("feed_cards", json!(view.feed.cards.len())),
        ]),
    );
    Ok(())
}
