//! Structured logging for the dashboard pipeline.
//!
//! Design goals:
//! 1. Multi-level granularity (TRACE → FATAL)
//! 2. Domain-specific categories for filtering
//! 3. stdout stays reserved for the rendered dashboard; records go to stderr
//! 4. Patient-identifying fields never leave the process unredacted

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fs::{create_dir_all, File};
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::process;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, OnceLock};
use std::time::Instant;

// =============================================================================
// Log Levels
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Trace = 0,
    Debug = 1,
    Info = 2,
    Warn = 3,
    Error = 4,
    Fatal = 5,
}

impl Level {
    pub fn from_env() -> Self {
        match std::env::var("LOG_LEVEL").as_deref() {
            Ok("trace") => Level::Trace,
            Ok("debug") => Level::Debug,
            Ok("info") => Level::Info,
            Ok("warn") => Level::Warn,
            Ok("error") => Level::Error,
            Ok("fatal") => Level::Fatal,
            _ => Level::Info,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Trace => "trace",
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Warn => "warn",
            Level::Error => "error",
            Level::Fatal => "fatal",
        }
    }
}

// =============================================================================
// Log Domains (categories for filtering)
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    Load,     // Dataset fetch and decode
    Metrics,  // Performance metric table projection
    Programs, // Program outcome projection
    Feed,     // Utilization feed filtering/ordering
    Trend,    // Synthetic trend filler
    System,   // Startup, shutdown, config
    Profile,  // Timing
}

impl Domain {
    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::Load => "load",
            Domain::Metrics => "metrics",
            Domain::Programs => "programs",
            Domain::Feed => "feed",
            Domain::Trend => "trend",
            Domain::System => "system",
            Domain::Profile => "profile",
        }
    }

    pub fn is_enabled(&self) -> bool {
        // Check LOG_DOMAINS env var (comma-separated list or "all")
        match std::env::var("LOG_DOMAINS").as_deref() {
            Ok("all") | Err(_) => true,
            Ok(domains) => domains.split(',').any(|d| d.trim() == self.as_str()),
        }
    }
}

// =============================================================================
// Run context
// =============================================================================

static LOG_SEQ: AtomicU64 = AtomicU64::new(0);
static PROFILE_SEQ: AtomicU64 = AtomicU64::new(0);
static RUN_CONTEXT: OnceLock<RunContext> = OnceLock::new();

fn next_seq() -> u64 {
    LOG_SEQ.fetch_add(1, Ordering::SeqCst)
}

#[derive(Debug)]
struct RunContext {
    run_id: String,
    /// Only present when LOG_DIR is set.
    events: Option<Mutex<BufWriter<File>>>,
}

fn ensure_run_context() -> &'static RunContext {
    RUN_CONTEXT.get_or_init(|| {
        let run_id = std::env::var("RUN_ID")
            .unwrap_or_else(|_| format!("r-{}-{}", ts_epoch_ms(), process::id()));
        let events = std::env::var("LOG_DIR").ok().and_then(|base| {
            let mut run_dir = PathBuf::from(base);
            run_dir.push(&run_id);
            if let Err(err) = create_dir_all(&run_dir) {
                eprintln!("[log] failed to create run dir: {}", err);
                return None;
            }
            let _ = std::fs::write(
                run_dir.join("manifest.json"),
                json!({
                    "run_id": run_id,
                    "ts": ts_now(),
                    "pid": process::id(),
                    "log_dir": run_dir.to_string_lossy(),
                })
                .to_string(),
            );
            match File::create(run_dir.join("events.jsonl")) {
                Ok(file) => Some(Mutex::new(BufWriter::new(file))),
                Err(err) => {
                    eprintln!("[log] failed to create events log: {}", err);
                    None
                }
            }
        });

        RunContext { run_id, events }
    })
}

const REDACTED_KEYS: [&str; 5] = ["patient", "diagnosis", "icd10", "authorization", "Authorization"];

fn sanitize_fields(mut fields: Map<String, Value>) -> Map<String, Value> {
    let redacted = Value::String("[REDACTED]".to_string());
    for key in REDACTED_KEYS {
        if fields.contains_key(key) {
            fields.insert(key.to_string(), redacted.clone());
        }
    }
    fields
}

fn split_fields(mut fields: Map<String, Value>) -> (Map<String, Value>, Map<String, Value>) {
    let mut top = Map::new();
    for key in ["organization", "dataset", "msg"] {
        if let Some(value) = fields.remove(key) {
            top.insert(key.to_string(), value);
        }
    }
    (top, fields)
}

fn write_line(writer: &Mutex<BufWriter<File>>, line: &str) {
    if let Ok(mut w) = writer.lock() {
        let _ = writeln!(w, "{}", line);
        let _ = w.flush();
    }
}

// =============================================================================
// Core logging functions
// =============================================================================

/// RFC3339 timestamp with milliseconds
pub fn ts_now() -> String {
    Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

pub fn ts_epoch_ms() -> u64 {
    Utc::now().timestamp_millis() as u64
}

/// Emit a structured log entry
pub fn log(level: Level, domain: Domain, event: &str, fields: Map<String, Value>) {
    let min_level = Level::from_env();
    if level < min_level || !domain.is_enabled() {
        return;
    }

    let line = build_record(level, domain.as_str(), event, fields).to_string();
    let ctx = ensure_run_context();
    if let Some(events) = &ctx.events {
        write_line(events, &line);
    }
    eprintln!("{}", line);
}

fn build_record(level: Level, component: &str, event: &str, fields: Map<String, Value>) -> Value {
    let ctx = ensure_run_context();
    let fields = sanitize_fields(fields);
    let (mut top, data) = split_fields(fields);

    let msg = top.remove("msg").unwrap_or(Value::String(String::new()));
    let mut entry = Map::new();
    entry.insert("ts".to_string(), json!(ts_now()));
    entry.insert("run_id".to_string(), json!(ctx.run_id.clone()));
    entry.insert("seq".to_string(), json!(next_seq()));
    entry.insert("lvl".to_string(), json!(level.as_str().to_uppercase()));
    entry.insert("component".to_string(), json!(component));
    entry.insert("event".to_string(), json!(event));
    entry.insert("msg".to_string(), msg);
    for (k, v) in top {
        entry.insert(k, v);
    }
    entry.insert("data".to_string(), Value::Object(data));
    Value::Object(entry)
}

// =============================================================================
// Domain-Specific Logging Helpers
// =============================================================================

pub fn log_dataset_loaded(dataset: &str, rows: usize, fingerprint: &str, elapsed_ms: f64) {
    log(
        Level::Info,
        Domain::Load,
        "dataset_loaded",
        obj(&[
            ("dataset", v_str(dataset)),
            ("rows", json!(rows)),
            ("sha256", v_str(fingerprint)),
            ("elapsed_ms", v_num(elapsed_ms)),
        ]),
    );
}

/// A failed load aborts initialization, so this is always fatal.
pub fn log_load_failure(dataset: &str, error: &str) {
    log(
        Level::Fatal,
        Domain::Load,
        "dataset_failed",
        obj(&[("dataset", v_str(dataset)), ("error", v_str(error))]),
    );
}

pub fn log_load_retry(dataset: &str, attempt: u32, max_attempts: u32, error: &str, delay_ms: u64) {
    log(
        Level::Warn,
        Domain::Load,
        "dataset_retry",
        obj(&[
            ("dataset", v_str(dataset)),
            ("attempt", json!(attempt)),
            ("max_attempts", json!(max_attempts)),
            ("error", v_str(error)),
            ("delay_ms", json!(delay_ms)),
        ]),
    );
}

/// Cells that could not be coerced to numbers and were rendered as placeholders.
pub fn log_degraded_cells(domain: Domain, organization: &str, degraded: usize) {
    if degraded == 0 {
        return;
    }
    log(
        Level::Warn,
        domain,
        "coercion_fallback",
        obj(&[
            ("organization", v_str(organization)),
            ("cells", json!(degraded)),
        ]),
    );
}

pub fn log_unrecognized_sections(organization: &str, sections: &[String]) {
    if sections.is_empty() {
        return;
    }
    let names: Vec<Value> = sections.iter().map(|s| v_str(s)).collect();
    log(
        Level::Debug,
        Domain::Metrics,
        "unrecognized_sections",
        obj(&[
            ("organization", v_str(organization)),
            ("sections", Value::Array(names)),
        ]),
    );
}

pub fn log_trend_synthesis(organization: &str, synthesized_rows: usize, cached_seeds: usize) {
    log(
        Level::Warn,
        Domain::Trend,
        "synthetic_trends",
        obj(&[
            ("organization", v_str(organization)),
            ("msg", v_str("trend cells filled with synthetic values")),
            ("rows", json!(synthesized_rows)),
            ("cached_seeds", json!(cached_seeds)),
        ]),
    );
}

pub fn log_feed_applied(
    organization: &str,
    event_filter: &str,
    input: usize,
    output: usize,
    unparseable_dates: usize,
) {
    log(
        Level::Info,
        Domain::Feed,
        "feed_filtered",
        obj(&[
            ("organization", v_str(organization)),
            ("event_filter", v_str(event_filter)),
            ("input", json!(input)),
            ("output", json!(output)),
            ("unparseable_dates", json!(unparseable_dates)),
        ]),
    );
}

// =============================================================================
// Utility Functions
// =============================================================================

pub fn obj(pairs: &[(&str, Value)]) -> Map<String, Value> {
    let mut map = Map::new();
    for (k, v) in pairs {
        map.insert((*k).to_string(), v.clone());
    }
    map
}

pub fn v_str(s: &str) -> Value {
    Value::String(s.to_string())
}

pub fn v_num(n: f64) -> Value {
    json!(n)
}

// =============================================================================
// Profiling Scope
// =============================================================================

/// Profiling scope that emits structured timing on drop.
pub struct ProfileScope {
    label: &'static str,
    context: Option<Map<String, Value>>,
    started: Instant,
    enabled: bool,
}

impl ProfileScope {
    pub fn new(label: &'static str) -> Self {
        Self::with_context(label, &[])
    }

    pub fn with_context(label: &'static str, fields: &[(&str, Value)]) -> Self {
        let enabled = Self::should_sample();
        Self {
            label,
            context: if enabled { Some(obj(fields)) } else { None },
            started: Instant::now(),
            enabled,
        }
    }

    fn should_sample() -> bool {
        std::env::var("PROFILE_SAMPLE")
            .ok()
            .and_then(|v| v.parse::<f64>().ok())
            .map(|p| {
                if p >= 1.0 {
                    true
                } else if p <= 0.0 {
                    false
                } else {
                    let seq = PROFILE_SEQ.fetch_add(1, Ordering::SeqCst);
                    let bucket = (seq % 10_000) as f64 / 10_000.0;
                    bucket < p
                }
            })
            .unwrap_or(true)
    }
}

impl Drop for ProfileScope {
    fn drop(&mut self) {
        if !self.enabled {
            return;
        }
        let elapsed_ms = self.started.elapsed().as_secs_f64() * 1000.0;
        let mut fields = self.context.take().unwrap_or_default();
        fields.insert("label".to_string(), v_str(self.label));
        fields.insert("elapsed_ms".to_string(), v_num(elapsed_ms));
        log(Level::Trace, Domain::Profile, "profile", fields);
    }
}

// =============================================================================
// Tests
// =============================================================================
