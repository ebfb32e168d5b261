//! Metrics collection and reporting for pipeline execution.
//!
//! The metrics module provides an extensible API for tracking scheduling
//! statistics. The orchestrator produces per-stage counters on every run;
//! this module lets callers fold those into a long-lived collector, add
//! their own metrics, and print or save the lot as JSON.
//!
//! # Overview
//!
//! - [`Metric`] trait defines the interface for custom metrics
//! - [`MetricsCollector`] manages metric registration and collection
//! - [`MetricsCollector::record_stage`] folds a run's stage counters in
//!
//! # Example
//!
//! ```no_run
//! use leafline::metrics::MetricsCollector;
//!
//! # fn main() -> anyhow::Result<()> {
//! let collector = MetricsCollector::new();
//! collector.record_start();
//! // ... run the scheduler, then for each stage metric:
//! collector.increment_counter("runs", 1);
//! collector.record_end();
//!
//! collector.print();
//! collector.save_to_file("scheduling_metrics.json")?;
//! # Ok(())
//! # }
//! ```

use anyhow::Result;
use serde_json::{Value, json};
use std::any::Any;
use std::collections::HashMap;
use std::fs::File;
use std::io::Write;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::pipeline::StageMetrics;

/// Trait for custom metrics.
pub trait Metric: Send + Sync + Any {
    /// The name of this metric (e.g. `orders_emitted`).
    fn name(&self) -> &str;

    /// The current value of this metric as a JSON value.
    fn value(&self) -> Value;

    /// Optional description of what this metric measures.
    fn description(&self) -> Option<&str> {
        None
    }
}

/// Thread-safe container for collecting scheduling metrics.
#[derive(Clone, Default)]
pub struct MetricsCollector {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Default)]
struct Inner {
    metrics: HashMap<String, Box<dyn Metric>>,
    start_time: Option<Instant>,
    end_time: Option<Instant>,
}

impl MetricsCollector {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a custom metric, replacing any metric of the same name.
    pub fn register(&self, metric: Box<dyn Metric>) {
        let mut inner = self.inner.lock().unwrap();
        inner.metrics.insert(metric.name().to_string(), metric);
    }

    /// Record the start time of a run.
    pub fn record_start(&self) {
        self.inner.lock().unwrap().start_time = Some(Instant::now());
    }

    /// Record the end time of a run.
    pub fn record_end(&self) {
        self.inner.lock().unwrap().end_time = Some(Instant::now());
    }

    /// Elapsed time between `record_start` and `record_end`, if both were
    /// called.
    #[must_use]
    pub fn elapsed(&self) -> Option<Duration> {
        let inner = self.inner.lock().unwrap();
        match (inner.start_time, inner.end_time) {
            (Some(start), Some(end)) => Some(end.duration_since(start)),
            _ => None,
        }
    }

    /// Increment a counter metric, creating it at `value` if absent.
    pub fn increment_counter(&self, name: &str, value: u64) {
        let mut inner = self.inner.lock().unwrap();
        let current = inner
            .metrics
            .get(name)
            .and_then(|m| m.value().as_u64())
            .unwrap_or(0);
        inner.metrics.insert(
            name.to_string(),
            Box::new(CounterMetric::with_value(name, current + value)),
        );
    }

    /// Set a gauge metric to a specific value.
    pub fn set_gauge(&self, name: &str, value: f64) {
        let mut inner = self.inner.lock().unwrap();
        inner
            .metrics
            .insert(name.to_string(), Box::new(GaugeMetric::new(name, value)));
    }

    /// Fold one stage's counters into the collector, namespaced by stage.
    pub fn record_stage(&self, stage: &StageMetrics) {
        self.increment_counter(&format!("{}.input", stage.stage), stage.input_count as u64);
        self.increment_counter(&format!("{}.output", stage.stage), stage.output_count as u64);
        self.increment_counter(&format!("{}.errors", stage.stage), stage.error_count as u64);
        self.set_gauge(
            &format!("{}.duration_seconds", stage.stage),
            stage.duration_seconds,
        );
    }

    /// Get all metrics as a JSON object.
    #[must_use]
    pub fn to_json(&self) -> Value {
        let inner = self.inner.lock().unwrap();
        let mut out = serde_json::Map::new();
        for (name, metric) in &inner.metrics {
            let mut obj = serde_json::Map::new();
            obj.insert("value".to_string(), metric.value());
            if let Some(desc) = metric.description() {
                obj.insert("description".to_string(), json!(desc));
            }
            out.insert(name.clone(), Value::Object(obj));
        }
        if let (Some(start), Some(end)) = (inner.start_time, inner.end_time) {
            out.insert(
                "execution_time_ms".to_string(),
                json!(end.duration_since(start).as_millis()),
            );
        }
        json!(out)
    }

    /// Print all metrics to stdout in a human-readable format.
    pub fn print(&self) {
        println!("\n========== Scheduling Metrics ==========");
        let inner = self.inner.lock().unwrap();
        if let (Some(start), Some(end)) = (inner.start_time, inner.end_time) {
            let elapsed = end.duration_since(start);
            println!(
                "Execution Time: {:.3}s ({} ms)",
                elapsed.as_secs_f64(),
                elapsed.as_millis()
            );
            println!("----------------------------------------");
        }
        let mut sorted: Vec<_> = inner.metrics.iter().collect();
        sorted.sort_by_key(|(name, _)| *name);
        for (name, metric) in sorted {
            match metric.description() {
                Some(desc) => println!("{}: {} ({})", name, metric.value(), desc),
                None => println!("{}: {}", name, metric.value()),
            }
        }
        drop(inner);
        println!("========================================\n");
    }

    /// Save all metrics to a JSON file.
    pub fn save_to_file(&self, path: &str) -> Result<()> {
        let formatted = serde_json::to_string_pretty(&self.to_json())?;
        let mut file = File::create(path)?;
        file.write_all(formatted.as_bytes())?;
        Ok(())
    }

    /// Snapshot of all metric names and values.
    #[must_use]
    pub fn snapshot(&self) -> HashMap<String, Value> {
        let inner = self.inner.lock().unwrap();
        inner
            .metrics
            .iter()
            .map(|(name, metric)| (name.clone(), metric.value()))
            .collect()
    }
}

// ========== Built-in Metrics ==========

/// A simple counter metric.
pub struct CounterMetric {
    name: String,
    count: u64,
}

impl CounterMetric {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            count: 0,
        }
    }

    pub fn with_value(name: impl Into<String>, count: u64) -> Self {
        Self {
            name: name.into(),
            count,
        }
    }
}

impl Metric for CounterMetric {
    fn name(&self) -> &str {
        &self.name
    }

    fn value(&self) -> Value {
        json!(self.count)
    }
}

/// A gauge metric that holds a single numeric value.
pub struct GaugeMetric {
    name: String,
    value: f64,
    description: Option<String>,
}

impl GaugeMetric {
    pub fn new(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            value,
            description: None,
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

impl Metric for GaugeMetric {
    fn name(&self) -> &str {
        &self.name
    }

    fn value(&self) -> Value {
        json!(self.value)
    }

    fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }
}
