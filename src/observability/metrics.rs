//! Prometheus metrics for probe evaluation and the health endpoints.

use prometheus::{
    CounterVec, Encoder, GaugeVec, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry,
    TextEncoder,
};
use tracing::warn;

use crate::health::{CheckKind, Status};

/// Probe/aggregate metrics registry.
pub struct Metrics {
    registry: Registry,

    /// Last observed probe status (1 = ok, 0 = critical) by name, kind
    pub probe_status: GaugeVec,

    /// Probe evaluation duration in seconds
    pub probe_duration_seconds: HistogramVec,

    /// Probe failures by name and reason (evaluation, timeout, internal)
    pub probe_failures_total: IntCounterVec,

    /// Last aggregate status by kind (1 = ok, 0 = critical)
    pub aggregate_status: GaugeVec,

    /// Health endpoint requests by path and status
    pub http_requests_total: CounterVec,
}

impl Metrics {
    /// Create a new metrics registry with all metrics.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        // Probes are dependency pings; most finish well under a second
        let probe_buckets = vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0];

        let probe_status = GaugeVec::new(
            Opts::new(
                "healthgate_probe_status",
                "Last probe status (1 = ok, 0 = critical)",
            ),
            &["name", "kind"],
        )?;
        registry.register(Box::new(probe_status.clone()))?;

        let probe_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "healthgate_probe_duration_seconds",
                "Probe evaluation duration in seconds",
            )
            .buckets(probe_buckets),
            &["name", "kind"],
        )?;
        registry.register(Box::new(probe_duration_seconds.clone()))?;

        let probe_failures_total = IntCounterVec::new(
            Opts::new(
                "healthgate_probe_failures_total",
                "Total probe failures by reason",
            ),
            &["name", "reason"],
        )?;
        registry.register(Box::new(probe_failures_total.clone()))?;

        let aggregate_status = GaugeVec::new(
            Opts::new(
                "healthgate_aggregate_status",
                "Last aggregate status (1 = ok, 0 = critical)",
            ),
            &["kind"],
        )?;
        registry.register(Box::new(aggregate_status.clone()))?;

        let http_requests_total = CounterVec::new(
            Opts::new(
                "healthgate_http_requests_total",
                "Total health endpoint requests",
            ),
            &["path", "status"],
        )?;
        registry.register(Box::new(http_requests_total.clone()))?;

        Ok(Self {
            registry,
            probe_status,
            probe_duration_seconds,
            probe_failures_total,
            aggregate_status,
            http_requests_total,
        })
    }

    /// Record one probe evaluation.
    pub fn record_probe(&self, name: &str, kind: CheckKind, status: Status, duration_secs: f64) {
        let kind = kind.as_str();
        self.probe_status
            .with_label_values(&[name, kind])
            .set(status_value(status));
        self.probe_duration_seconds
            .with_label_values(&[name, kind])
            .observe(duration_secs);
    }

    /// Record a probe failure with its reason label.
    pub fn record_probe_failure(&self, name: &str, reason: &str) {
        self.probe_failures_total
            .with_label_values(&[name, reason])
            .inc();
    }

    /// Record the overall status of an aggregation run.
    pub fn record_aggregate(&self, kind: CheckKind, status: Status) {
        self.aggregate_status
            .with_label_values(&[kind.as_str()])
            .set(status_value(status));
    }

    /// Record an HTTP request. `path` must already be a bounded route label.
    pub fn record_http_request(&self, path: &str, status: u16) {
        self.http_requests_total
            .with_label_values(&[path, &status.to_string()])
            .inc();
    }

    /// Export metrics in Prometheus text format.
    pub fn export(&self) -> String {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
            warn!(error = %e, "Failed to encode metrics");
            return String::new();
        }
        String::from_utf8(buffer).unwrap_or_default()
    }

    /// Get the Prometheus registry (for custom metrics).
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}

fn status_value(status: Status) -> f64 {
    match status {
        Status::Ok => 1.0,
        Status::Critical => 0.0,
    }
}
