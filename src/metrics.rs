//! Observability metrics for access evaluation.
//!
//! This module provides metrics collection for policy evaluation:
//! decision counts, resolver availability, and evaluation latency.

use std::time::Duration;

use once_cell::sync::Lazy;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder,
};

use crate::models::{AccessDecision, Operation};

/// Core metrics registry for evaluator observability.
pub struct AccessMetricsRegistry {
    /// Prometheus registry for all metrics.
    pub registry: Registry,
    /// Decisions by resource, operation, decision, and reason.
    pub decisions_total: IntCounterVec,
    /// Relationship lookups that failed during evaluation.
    pub resolver_failures_total: IntCounterVec,
    /// Decision latency.
    pub evaluation_duration: HistogramVec,
}

impl AccessMetricsRegistry {
    /// Create a new metrics registry with all collectors initialized.
    pub fn new() -> Self {
        let registry = Registry::new();

        let decisions_total = IntCounterVec::new(
            Opts::new("access_decisions_total", "Total access decisions"),
            &["resource", "operation", "decision", "reason"],
        )
        .expect("Failed to create access_decisions_total metric");

        let resolver_failures_total = IntCounterVec::new(
            Opts::new(
                "access_resolver_failures_total",
                "Relationship lookups that failed and were treated as non-matching",
            ),
            &["resource", "operation"],
        )
        .expect("Failed to create access_resolver_failures_total metric");

        let evaluation_duration = HistogramVec::new(
            HistogramOpts::new(
                "access_evaluation_duration_seconds",
                "Duration of access evaluations in seconds",
            )
            .buckets(vec![0.0001, 0.0005, 0.001, 0.005, 0.01, 0.025, 0.05, 0.1]),
            &["decision"],
        )
        .expect("Failed to create access_evaluation_duration metric");

        registry
            .register(Box::new(decisions_total.clone()))
            .expect("Failed to register access_decisions_total");
        registry
            .register(Box::new(resolver_failures_total.clone()))
            .expect("Failed to register access_resolver_failures_total");
        registry
            .register(Box::new(evaluation_duration.clone()))
            .expect("Failed to register access_evaluation_duration");

        Self {
            registry,
            decisions_total,
            resolver_failures_total,
            evaluation_duration,
        }
    }
}

impl Default for AccessMetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

static ACCESS_METRICS: Lazy<AccessMetricsRegistry> = Lazy::new(AccessMetricsRegistry::new);

/// Static recording helpers, usable from any call site.
pub struct AccessMetricsHelper;

impl AccessMetricsHelper {
    pub fn record_decision(
        resource: &str,
        operation: Operation,
        decision: &AccessDecision,
        duration: Duration,
    ) {
        let label = decision.decision_label();
        ACCESS_METRICS
            .decisions_total
            .with_label_values(&[resource, operation.as_str(), label, decision.reason.as_str()])
            .inc();
        ACCESS_METRICS
            .evaluation_duration
            .with_label_values(&[label])
            .observe(duration.as_secs_f64());
    }

    pub fn record_resolver_failure(resource: &str, operation: Operation) {
        ACCESS_METRICS
            .resolver_failures_total
            .with_label_values(&[resource, operation.as_str()])
            .inc();
    }
}

/// Encode all evaluator metrics in Prometheus text format.
pub fn gather_metrics() -> Result<String, prometheus::Error> {
    let metric_families = ACCESS_METRICS.registry.gather();
    let mut buffer = Vec::new();
    let encoder = TextEncoder::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer)
        .map_err(|e| prometheus::Error::Msg(format!("metrics were not valid UTF-8: {}", e)))
}
