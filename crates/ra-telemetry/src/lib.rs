// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]
#![warn(missing_docs)]
//! Structured logging setup and directive-lifecycle metrics collection
//! (spec Logging: "the worker and MCP server emit one structured event per
//! directive lifecycle transition... `ra-telemetry` owns the
//! `tracing-subscriber` setup those events flow through, plus in-process
//! metrics aggregation over them").
//!
//! This crate does not itself emit the six named lifecycle events — those
//! are logged at their call sites (`ra-worker`, `ra-oauth`, `ra-http`) so
//! the event carries the fields local to that crate. What lives here is the
//! subscriber wiring shared by every binary, and [`MetricsCollector`], an
//! in-process aggregator a binary can feed from the same call sites.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

// ---------------------------------------------------------------------------
// Subscriber setup
// ---------------------------------------------------------------------------

/// Output format for the process-wide `tracing` subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable, for local development.
    Text,
    /// Newline-delimited JSON, for production log pipelines.
    Json,
}

impl LogFormat {
    /// Read from the `LOG_FORMAT` environment variable (`json` selects
    /// [`LogFormat::Json`]; anything else, including unset, selects
    /// [`LogFormat::Text`]).
    #[must_use]
    pub fn from_env() -> Self {
        match std::env::var("LOG_FORMAT") {
            Ok(v) if v.eq_ignore_ascii_case("json") => LogFormat::Json,
            _ => LogFormat::Text,
        }
    }
}

/// Install the process-wide `tracing` subscriber (spec §6 `log_level`
/// config plus `LOG_FORMAT`).
///
/// `log_level` is one of `DEBUG|INFO|WARN|ERROR` (case-insensitive);
/// anything unrecognized falls back to `info`. Call once per process, at
/// the top of `main`.
///
/// # Panics
/// Panics if a global subscriber is already installed, matching
/// `tracing_subscriber::fmt().init()`'s behavior.
pub fn init_tracing(log_level: &str, format: LogFormat) {
    let level = match log_level.to_ascii_uppercase().as_str() {
        "DEBUG" => "debug",
        "WARN" => "warn",
        "ERROR" => "error",
        _ => "info",
    };
    let filter = EnvFilter::try_new(format!("rez_agent={level},ra={level}")).unwrap_or_else(|_| EnvFilter::new("info"));

    match format {
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
        LogFormat::Json => tracing_subscriber::fmt().json().with_env_filter(filter).init(),
    }
}

// ---------------------------------------------------------------------------
// DirectiveMetrics
// ---------------------------------------------------------------------------

/// How a directive's processing ended, for one [`DirectiveMetrics`] sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DirectiveOutcome {
    /// Reached `completed` (spec §4.13).
    Completed,
    /// Reached `failed` (permanent error, spec §4.14).
    Failed,
    /// Requeued after a transient error (spec §4.14); not yet terminal.
    Retried,
}

/// One recorded directive-processing attempt (spec Logging: metrics
/// collection alongside the structured lifecycle events).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DirectiveMetrics {
    /// The handler action this directive invoked (`weather`, `golf`, `notify`, ...).
    pub action: String,
    /// Deployment stage (`dev`/`stage`/`prod`).
    pub stage: String,
    /// How processing ended.
    pub outcome: DirectiveOutcome,
    /// Wall-clock duration of this attempt, in milliseconds.
    pub duration_ms: u64,
    /// The directive's `retry_count` at the time this sample was taken.
    pub retry_count: u32,
}

/// Aggregated statistics across recorded [`DirectiveMetrics`] samples.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MetricsSummary {
    /// Number of samples recorded.
    pub count: usize,
    /// Mean duration in milliseconds.
    pub mean_duration_ms: f64,
    /// Median (p50) duration in milliseconds.
    pub p50_duration_ms: f64,
    /// 99th-percentile duration in milliseconds.
    pub p99_duration_ms: f64,
    /// Samples that reached `completed`.
    pub completed_count: usize,
    /// Samples that reached `failed`.
    pub failed_count: usize,
    /// Samples that were transiently retried.
    pub retried_count: usize,
    /// `failed_count / count`.
    pub error_rate: f64,
    /// Per-action sample counts (deterministic ordering).
    pub action_counts: BTreeMap<String, usize>,
}

impl Default for MetricsSummary {
    fn default() -> Self {
        Self {
            count: 0,
            mean_duration_ms: 0.0,
            p50_duration_ms: 0.0,
            p99_duration_ms: 0.0,
            completed_count: 0,
            failed_count: 0,
            retried_count: 0,
            error_rate: 0.0,
            action_counts: BTreeMap::new(),
        }
    }
}

/// Compute a percentile value from a **sorted** slice.
fn percentile(sorted: &[u64], pct: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    if sorted.len() == 1 {
        return sorted[0] as f64;
    }
    let rank = pct / 100.0 * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let frac = rank - lower as f64;
    sorted[lower] as f64 * (1.0 - frac) + sorted[upper] as f64 * frac
}

/// Thread-safe collector for directive-processing metrics.
///
/// Wrap in an `Arc` to share across worker tasks (the inner storage is
/// already behind a `Mutex`).
#[derive(Debug, Clone)]
pub struct MetricsCollector {
    inner: Arc<Mutex<Vec<DirectiveMetrics>>>,
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsCollector {
    /// Create a new, empty collector.
    #[must_use]
    pub fn new() -> Self {
        Self { inner: Arc::new(Mutex::new(Vec::new())) }
    }

    /// Record one directive-processing attempt.
    pub fn record(&self, metrics: DirectiveMetrics) {
        let mut data = self.inner.lock().expect("metrics lock poisoned");
        data.push(metrics);
    }

    /// Return all recorded samples.
    #[must_use]
    pub fn samples(&self) -> Vec<DirectiveMetrics> {
        let data = self.inner.lock().expect("metrics lock poisoned");
        data.clone()
    }

    /// Number of samples recorded so far.
    #[must_use]
    pub fn len(&self) -> usize {
        let data = self.inner.lock().expect("metrics lock poisoned");
        data.len()
    }

    /// Whether the collector has no recorded samples.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Compute an aggregated summary of all recorded samples.
    #[must_use]
    pub fn summary(&self) -> MetricsSummary {
        let data = self.inner.lock().expect("metrics lock poisoned");
        if data.is_empty() {
            return MetricsSummary::default();
        }

        let count = data.len();
        let mut durations: Vec<u64> = data.iter().map(|r| r.duration_ms).collect();
        durations.sort_unstable();

        let total_duration: u64 = durations.iter().sum();
        let mean_duration_ms = total_duration as f64 / count as f64;
        let p50_duration_ms = percentile(&durations, 50.0);
        let p99_duration_ms = percentile(&durations, 99.0);

        let completed_count = data.iter().filter(|r| r.outcome == DirectiveOutcome::Completed).count();
        let failed_count = data.iter().filter(|r| r.outcome == DirectiveOutcome::Failed).count();
        let retried_count = data.iter().filter(|r| r.outcome == DirectiveOutcome::Retried).count();
        let error_rate = failed_count as f64 / count as f64;

        let mut action_counts: BTreeMap<String, usize> = BTreeMap::new();
        for r in data.iter() {
            *action_counts.entry(r.action.clone()).or_insert(0) += 1;
        }

        MetricsSummary {
            count,
            mean_duration_ms,
            p50_duration_ms,
            p99_duration_ms,
            completed_count,
            failed_count,
            retried_count,
            error_rate,
            action_counts,
        }
    }

    /// Clear all recorded samples.
    pub fn clear(&self) {
        let mut data = self.inner.lock().expect("metrics lock poisoned");
        data.clear();
    }
}

// ---------------------------------------------------------------------------
// Exporter
// ---------------------------------------------------------------------------

/// Exports an aggregated [`MetricsSummary`].
pub trait TelemetryExporter: Send + Sync {
    /// Export the given summary. Returns the serialized output on success.
    fn export(&self, summary: &MetricsSummary) -> Result<String, String>;
}

/// Exports metrics as pretty-printed JSON to a string.
#[derive(Debug, Default)]
pub struct JsonExporter;

impl TelemetryExporter for JsonExporter {
    fn export(&self, summary: &MetricsSummary) -> Result<String, String> {
        serde_json::to_string_pretty(summary).map_err(|e| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn sample(action: &str, duration: u64, outcome: DirectiveOutcome) -> DirectiveMetrics {
        DirectiveMetrics { action: action.to_string(), stage: "dev".to_string(), outcome, duration_ms: duration, retry_count: 0 }
    }

    // -- 1. LogFormat::from_env defaults to Text without LOG_FORMAT set ----
    #[test]
    fn log_format_defaults_to_text() {
        std::env::remove_var("LOG_FORMAT");
        assert_eq!(LogFormat::from_env(), LogFormat::Text);
    }

    #[test]
    fn log_format_json_is_case_insensitive() {
        std::env::set_var("LOG_FORMAT", "JSON");
        assert_eq!(LogFormat::from_env(), LogFormat::Json);
        std::env::remove_var("LOG_FORMAT");
    }

    // -- 2. collector basics -------------------------------------------------
    #[test]
    fn collector_new_is_empty() {
        let c = MetricsCollector::new();
        assert!(c.is_empty());
        assert_eq!(c.len(), 0);
    }

    #[test]
    fn collector_record_and_len() {
        let c = MetricsCollector::new();
        c.record(sample("weather", 100, DirectiveOutcome::Completed));
        assert_eq!(c.len(), 1);
        assert!(!c.is_empty());
    }

    #[test]
    fn collector_clear() {
        let c = MetricsCollector::new();
        c.record(sample("weather", 50, DirectiveOutcome::Completed));
        c.clear();
        assert!(c.is_empty());
    }

    #[test]
    fn empty_collector_summary() {
        let s = MetricsCollector::new().summary();
        assert_eq!(s.count, 0);
        assert_eq!(s.error_rate, 0.0);
        assert!(s.action_counts.is_empty());
    }

    // -- 3. aggregation math --------------------------------------------------
    #[test]
    fn summary_mean_duration() {
        let c = MetricsCollector::new();
        c.record(sample("golf", 100, DirectiveOutcome::Completed));
        c.record(sample("golf", 200, DirectiveOutcome::Completed));
        c.record(sample("golf", 300, DirectiveOutcome::Completed));
        let s = c.summary();
        assert!((s.mean_duration_ms - 200.0).abs() < f64::EPSILON);
    }

    #[test]
    fn summary_p50_odd_count() {
        let c = MetricsCollector::new();
        for d in [10, 20, 30, 40, 50] {
            c.record(sample("golf", d, DirectiveOutcome::Completed));
        }
        assert!((c.summary().p50_duration_ms - 30.0).abs() < f64::EPSILON);
    }

    #[test]
    fn summary_outcome_counts_and_error_rate() {
        let c = MetricsCollector::new();
        c.record(sample("golf", 10, DirectiveOutcome::Completed));
        c.record(sample("golf", 20, DirectiveOutcome::Failed));
        c.record(sample("weather", 30, DirectiveOutcome::Retried));
        let s = c.summary();
        assert_eq!(s.completed_count, 1);
        assert_eq!(s.failed_count, 1);
        assert_eq!(s.retried_count, 1);
        assert!((s.error_rate - (1.0 / 3.0)).abs() < 1e-9);
    }

    #[test]
    fn summary_action_counts() {
        let c = MetricsCollector::new();
        c.record(sample("golf", 10, DirectiveOutcome::Completed));
        c.record(sample("weather", 20, DirectiveOutcome::Completed));
        c.record(sample("golf", 30, DirectiveOutcome::Completed));
        let s = c.summary();
        assert_eq!(s.action_counts["golf"], 2);
        assert_eq!(s.action_counts["weather"], 1);
    }

    // -- 4. serde round-trip ----------------------------------------------------
    #[test]
    fn directive_metrics_serde_roundtrip() {
        let m = sample("golf", 999, DirectiveOutcome::Failed);
        let json = serde_json::to_string(&m).unwrap();
        let m2: DirectiveMetrics = serde_json::from_str(&json).unwrap();
        assert_eq!(m, m2);
    }

    // -- 5. thread safety ---------------------------------------------------
    #[test]
    fn concurrent_recording() {
        let c = MetricsCollector::new();
        let mut handles = vec![];
        for i in 0..10 {
            let cc = c.clone();
            handles.push(thread::spawn(move || {
                cc.record(sample("golf", i * 10, DirectiveOutcome::Completed));
            }));
        }
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(c.len(), 10);
    }

    // -- 6. JSON exporter -----------------------------------------------------
    #[test]
    fn json_exporter_valid_output() {
        let c = MetricsCollector::new();
        c.record(sample("golf", 100, DirectiveOutcome::Completed));
        let json = JsonExporter.export(&c.summary()).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["count"], 1);
    }

    // -- 7. percentile edge cases ----------------------------------------------
    #[test]
    fn percentile_empty() {
        assert_eq!(percentile(&[], 50.0), 0.0);
    }

    #[test]
    fn percentile_single() {
        assert_eq!(percentile(&[42], 99.0), 42.0);
    }
}
