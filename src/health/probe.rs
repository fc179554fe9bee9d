//! Probe capability records and factory functions for common checks.
//!
//! A [`Probe`] is a plain record: name, classification, check kind, an
//! optional timeout override, and the [`Check`] that does the work.
//! Specialised checks are built with the factory functions below rather
//! than by extending a base type.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde_json::json;

use super::{CheckKind, Classification, ProbeError, Status};

/// What a single evaluation reports.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeOutcome {
    pub status: Status,
    pub message: Option<String>,
    pub details: Option<serde_json::Value>,
}

impl ProbeOutcome {
    /// Passing outcome with no message.
    pub fn ok() -> Self {
        Self {
            status: Status::Ok,
            message: None,
            details: None,
        }
    }

    /// Failing outcome with a message.
    pub fn critical(message: impl Into<String>) -> Self {
        Self {
            status: Status::Critical,
            message: Some(message.into()),
            details: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

/// A read-only check against one dependency or condition.
///
/// Dependency failures should be reported as `Err(ProbeError::Evaluation)`
/// or a CRITICAL outcome. Implementations must be async-friendly: a check
/// that blocks its thread cannot be timed out.
#[async_trait]
pub trait Check: Send + Sync {
    async fn evaluate(&self) -> Result<ProbeOutcome, ProbeError>;
}

/// A registered-or-registerable probe.
#[derive(Clone)]
pub struct Probe {
    name: Arc<str>,
    classification: Classification,
    kind: CheckKind,
    timeout: Option<Duration>,
    check: Arc<dyn Check>,
}

impl Probe {
    pub fn new(
        name: impl Into<Arc<str>>,
        classification: Classification,
        kind: CheckKind,
        check: impl Check + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            classification,
            kind,
            timeout: None,
            check: Arc::new(check),
        }
    }

    /// Readiness probe; the common case.
    pub fn readiness(
        name: impl Into<Arc<str>>,
        classification: Classification,
        check: impl Check + 'static,
    ) -> Self {
        Self::new(name, classification, CheckKind::Readiness, check)
    }

    /// Override the aggregator's default timeout for this probe.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn name_arc(&self) -> Arc<str> {
        Arc::clone(&self.name)
    }

    pub fn classification(&self) -> Classification {
        self.classification
    }

    pub fn kind(&self) -> CheckKind {
        self.kind
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub(crate) fn check(&self) -> Arc<dyn Check> {
        Arc::clone(&self.check)
    }
}

impl std::fmt::Debug for Probe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Probe")
            .field("name", &self.name)
            .field("classification", &self.classification)
            .field("kind", &self.kind)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Closure check
// =============================================================================

/// Check backed by an async closure.
pub struct FnCheck<F> {
    f: F,
}

/// Wrap an async closure as a [`Check`].
///
/// ```rust,ignore
/// let check = from_fn(|| async { Ok(ProbeOutcome::ok()) });
/// ```
pub fn from_fn<F, Fut>(f: F) -> FnCheck<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<ProbeOutcome, ProbeError>> + Send + 'static,
{
    FnCheck { f }
}

#[async_trait]
impl<F, Fut> Check for FnCheck<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<ProbeOutcome, ProbeError>> + Send + 'static,
{
    async fn evaluate(&self) -> Result<ProbeOutcome, ProbeError> {
        (self.f)().await
    }
}

// =============================================================================
// Threshold check
// =============================================================================

/// CRITICAL when a sampled value exceeds a maximum.
pub struct ThresholdCheck<F> {
    label: &'static str,
    read: Arc<F>,
    max: f64,
}

/// Build a threshold check (queue depth, disk usage, connection counts...).
///
/// `read` samples the current value; the check fails when it is strictly
/// greater than `max`. `read` may block (statvfs, /proc reads): it runs on
/// the blocking pool so the probe timeout still applies.
pub fn threshold<F>(label: &'static str, read: F, max: f64) -> ThresholdCheck<F>
where
    F: Fn() -> Result<f64, ProbeError> + Send + Sync + 'static,
{
    ThresholdCheck {
        label,
        read: Arc::new(read),
        max,
    }
}

#[async_trait]
impl<F> Check for ThresholdCheck<F>
where
    F: Fn() -> Result<f64, ProbeError> + Send + Sync + 'static,
{
    async fn evaluate(&self) -> Result<ProbeOutcome, ProbeError> {
        let read = Arc::clone(&self.read);
        let value = tokio::task::spawn_blocking(move || read())
            .await
            .map_err(|e| ProbeError::InternalFault(format!("threshold read failed: {}", e)))??;
        let details = json!({ "value": value, "threshold": self.max });

        if value > self.max {
            Ok(ProbeOutcome::critical(format!(
                "{} {} exceeds threshold {}",
                self.label, value, self.max
            ))
            .with_details(details))
        } else {
            Ok(ProbeOutcome::ok().with_details(details))
        }
    }
}

// =============================================================================
// Latency check
// =============================================================================

/// CRITICAL when an operation fails or takes longer than allowed.
pub struct LatencyCheck<F> {
    op: F,
    max: Duration,
}

/// Build a latency check around a dependency ping.
pub fn latency<F, Fut>(op: F, max: Duration) -> LatencyCheck<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), ProbeError>> + Send + 'static,
{
    LatencyCheck { op, max }
}

#[async_trait]
impl<F, Fut> Check for LatencyCheck<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), ProbeError>> + Send + 'static,
{
    async fn evaluate(&self) -> Result<ProbeOutcome, ProbeError> {
        let start = Instant::now();
        (self.op)().await?;
        let elapsed = start.elapsed();

        let details = json!({
            "latency_ms": elapsed.as_millis() as u64,
            "max_latency_ms": self.max.as_millis() as u64,
        });

        if elapsed > self.max {
            Ok(ProbeOutcome::critical(format!(
                "latency {}ms exceeds {}ms",
                elapsed.as_millis(),
                self.max.as_millis()
            ))
            .with_details(details))
        } else {
            Ok(ProbeOutcome::ok().with_details(details))
        }
    }
}

// =============================================================================
// TCP connect check
// =============================================================================

/// Opens (and drops) a TCP connection to an address.
pub struct TcpConnectCheck {
    addr: String,
}

/// Build a TCP connect check for `host:port`.
pub fn tcp_connect(addr: impl Into<String>) -> TcpConnectCheck {
    TcpConnectCheck { addr: addr.into() }
}

#[async_trait]
impl Check for TcpConnectCheck {
    async fn evaluate(&self) -> Result<ProbeOutcome, ProbeError> {
        let start = Instant::now();
        tokio::net::TcpStream::connect(&self.addr)
            .await
            .map_err(|e| ProbeError::Evaluation(format!("connect to {} failed: {}", self.addr, e)))?;

        Ok(ProbeOutcome::ok().with_details(json!({
            "addr": self.addr,
            "connect_ms": start.elapsed().as_millis() as u64,
        })))
    }
}
