use clinops_dashboard::manifest::{analyze_log, analyze_metrics, analyze_programs};
use clinops_dashboard::state::Config;
use serde_json::json;
use std::env;
use std::path::PathBuf;

fn main() {
    let cfg = Config::from_env();
    let dir = env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| cfg.data_dir.clone());

    let metrics = match analyze_metrics(&dir.join(&cfg.metrics_file)) {
        Ok(m) => m,
        Err(err) => {
            eprintln!("metrics analysis failed: {:#}", err);
            std::process::exit(2);
        }
    };
    let programs = match analyze_programs(&dir.join(&cfg.programs_file)) {
        Ok(m) => m,
        Err(err) => {
            eprintln!("program analysis failed: {:#}", err);
            std::process::exit(3);
        }
    };
    let log = match analyze_log(&dir.join(&cfg.log_file)) {
        Ok(m) => m,
        Err(err) => {
            eprintln!("log analysis failed: {:#}", err);
            std::process::exit(4);
        }
    };

    let payload = json!({
        "performance_metrics": metrics,
        "program_outcomes": programs,
        "utilization_log": log,
    });
    match serde_json::to_string_pretty(&payload) {
        Ok(text) => println!("{}", text),
        Err(err) => {
            eprintln!("failed to serialize manifest: {}", err);
            std::process::exit(5);
        }
    }
}
