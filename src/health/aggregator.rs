//! Concurrent probe evaluation and status aggregation.

use std::any::Any;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::future::join_all;
use tokio::sync::Semaphore;
use tokio::task::JoinError;
use tokio_util::task::AbortOnDropHandle;
use tracing::{debug, warn};
use uuid::Uuid;

use super::probe::Check;
use super::registry::RegisteredProbe;
use super::{AggregateResult, CheckKind, ProbeError, ProbeOutcome, ProbeResult, Registry, Status};
use crate::observability::Metrics;

/// Aggregator tuning knobs.
#[derive(Debug, Clone)]
pub struct AggregatorConfig {
    /// Timeout for probes without their own override.
    pub default_timeout: Duration,
    /// Extra attempts for a probe that reports CRITICAL. Timeouts and
    /// internal faults are never retried.
    pub retries: u32,
    /// Max probes in flight per run (0 = unlimited).
    pub max_concurrency: usize,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            default_timeout: Duration::from_secs(2),
            retries: 0,
            max_concurrency: 0,
        }
    }
}

/// Runs every probe for a check kind and combines the results.
pub struct Aggregator {
    registry: Arc<Registry>,
    config: AggregatorConfig,
    limiter: Option<Arc<Semaphore>>,
    metrics: Option<Arc<Metrics>>,
}

impl Aggregator {
    pub fn new(registry: Arc<Registry>, config: AggregatorConfig) -> Self {
        let limiter = (config.max_concurrency > 0)
            .then(|| Arc::new(Semaphore::new(config.max_concurrency)));

        Self {
            registry,
            config,
            limiter,
            metrics: None,
        }
    }

    /// Record per-probe and aggregate metrics.
    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn config(&self) -> &AggregatorConfig {
        &self.config
    }

    /// Evaluate all probes registered for `kind`.
    ///
    /// Every probe runs to completion or timeout; there is no short
    /// circuit, so the result always carries one entry per probe, in
    /// registration order. Never fails.
    pub async fn aggregate(&self, kind: CheckKind) -> AggregateResult {
        let run_id = Uuid::new_v4();
        let start = Instant::now();

        // Flags are read here, once per run
        let probes = self.registry.probes_for(kind);
        let results = join_all(probes.into_iter().map(|p| self.run_probe(kind, p))).await;

        let aggregate = AggregateResult::new(kind, results);

        if let Some(metrics) = &self.metrics {
            metrics.record_aggregate(kind, aggregate.status);
        }

        debug!(
            run_id = %run_id,
            kind = %kind,
            status = %aggregate.status,
            probes = aggregate.results.len(),
            critical = aggregate.critical_count(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Aggregation complete"
        );

        aggregate
    }

    async fn run_probe(&self, kind: CheckKind, registered: RegisteredProbe) -> ProbeResult {
        let RegisteredProbe { probe, migrated } = registered;
        let timeout = probe.timeout().unwrap_or(self.config.default_timeout);

        // Queueing behind the limiter does not count against the timeout
        let _permit = match &self.limiter {
            Some(limiter) => Arc::clone(limiter).acquire_owned().await.ok(),
            None => None,
        };

        let start = Instant::now();
        let check = probe.check();
        let retries = self.config.retries;

        // A dedicated task contains panics and lets a hung probe be aborted.
        // The task is also aborted if this run is dropped (client went away).
        let mut handle = AbortOnDropHandle::new(tokio::spawn(async move {
            evaluate_with_retries(check, retries).await
        }));

        let evaluated = match tokio::time::timeout(timeout, &mut handle).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_err)) => Err(ProbeError::InternalFault(join_error_message(join_err))),
            Err(_) => {
                handle.abort();
                Err(ProbeError::Timeout(timeout))
            }
        };
        let duration = start.elapsed();

        let outcome = match evaluated {
            Ok(outcome) => {
                if outcome.status.is_critical() {
                    warn!(
                        probe = probe.name(),
                        kind = %kind,
                        reason = "evaluation",
                        message = outcome.message.as_deref().unwrap_or(""),
                        "Probe reported critical"
                    );
                    self.record_failure(probe.name(), "evaluation");
                }
                outcome
            }
            Err(err) => {
                warn!(
                    probe = probe.name(),
                    kind = %kind,
                    reason = err.reason(),
                    error = %err,
                    "Probe failed"
                );
                self.record_failure(probe.name(), err.reason());
                ProbeOutcome::critical(err.to_string())
            }
        };

        if let Some(metrics) = &self.metrics {
            metrics.record_probe(probe.name(), kind, outcome.status, duration.as_secs_f64());
        }

        ProbeResult {
            name: probe.name_arc(),
            classification: probe.classification(),
            migrated,
            status: outcome.status,
            message: outcome.message,
            details: outcome.details,
            duration,
        }
    }

    fn record_failure(&self, name: &str, reason: &str) {
        if let Some(metrics) = &self.metrics {
            metrics.record_probe_failure(name, reason);
        }
    }
}

async fn evaluate_with_retries(
    check: Arc<dyn Check>,
    retries: u32,
) -> Result<ProbeOutcome, ProbeError> {
    let mut attempt = 0;
    loop {
        let result = check.evaluate().await;
        let retryable = match &result {
            Ok(outcome) => outcome.status == Status::Critical,
            Err(ProbeError::Evaluation(_)) => true,
            Err(_) => false,
        };

        if !retryable || attempt >= retries {
            return result;
        }

        attempt += 1;
        debug!(attempt, retries, "Retrying critical probe");
    }
}

fn join_error_message(err: JoinError) -> String {
    if err.is_panic() {
        format!("probe panicked: {}", panic_message(err.into_panic()))
    } else {
        "probe task was cancelled".to_string()
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
