//! Healthcheck aggregation engine.
//!
//! Combines independent probes into a single readiness decision:
//!
//! - **Liveness** (`/healthcheck`): is the process alive? Always 200; no
//!   dependency is ever consulted.
//! - **Readiness** (`/healthcheck/ready`): should this instance take
//!   traffic? 200 or 500 depending on decisive probes.
//!
//! # Migration mode
//!
//! Each probe is either DECISIVE or INFORMATIONAL. A decisive probe only
//! fails readiness once its `migrated` flag is set, which lets existing
//! checks be converted one at a time. Every probe result appears in the
//! body regardless, so alerting keeps full visibility.
//!
//! ```text
//! classification   migrated   CRITICAL result
//! ─────────────────────────────────────────────
//! decisive         true       readiness 500
//! decisive         false      body only
//! informational    any        body only
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use healthgate::health::*;
//!
//! let registry = Arc::new(Registry::new());
//! registry.register(Probe::readiness("db", Classification::Decisive, tcp_connect("db:5432")))?;
//! registry.set_migrated("db", CheckKind::Readiness, true)?;
//!
//! let responder = Responder::new(Aggregator::new(registry, AggregatorConfig::default()));
//! let res = responder.respond(CheckKind::Readiness).await;
//! ```

mod aggregator;
mod error;
mod probe;
mod registry;
mod responder;
mod status;

pub use aggregator::{Aggregator, AggregatorConfig};
pub use error::{ProbeError, RegistryError};
pub use probe::{
    from_fn, latency, tcp_connect, threshold, Check, FnCheck, LatencyCheck, Probe, ProbeOutcome,
    TcpConnectCheck, ThresholdCheck,
};
pub use registry::{RegisteredProbe, Registry};
pub use responder::{status_code, CheckEntry, HealthResponse, ReadinessBody, Responder};
pub use status::{AggregateResult, CheckKind, Classification, ProbeResult, Status};
