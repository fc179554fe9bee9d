//! Maps check kinds to HTTP status codes and JSON bodies.

use http::StatusCode;
use serde::Serialize;
use tracing::error;

use super::{AggregateResult, Aggregator, CheckKind, Classification, ProbeResult, Status};
use crate::timestamp::Iso8601Timestamp;

/// Minimal liveness body; also the fallback if a readiness body cannot be encoded.
const LIVENESS_BODY: &str = r#"{"status":"ok"}"#;

/// Status code plus JSON body, ready to be written by the HTTP layer.
#[derive(Debug, Clone)]
pub struct HealthResponse {
    pub status: StatusCode,
    pub body: String,
}

/// Readiness response document.
#[derive(Debug, Serialize)]
pub struct ReadinessBody<'a> {
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<Iso8601Timestamp>,
    pub checks: Vec<CheckEntry<'a>>,
}

/// One probe in the readiness body.
#[derive(Debug, Serialize)]
pub struct CheckEntry<'a> {
    pub name: &'a str,
    pub status: Status,
    pub message: Option<&'a str>,
    pub migrated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classification: Option<Classification>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<&'a serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

impl<'a> CheckEntry<'a> {
    fn from_result(result: &'a ProbeResult, expose_details: bool) -> Self {
        Self {
            name: &result.name,
            status: result.status,
            message: result.message.as_deref(),
            migrated: result.migrated,
            classification: expose_details.then_some(result.classification),
            details: if expose_details {
                result.details.as_ref()
            } else {
                None
            },
            duration_ms: expose_details.then(|| result.duration.as_millis() as u64),
        }
    }
}

/// HTTP status for an overall status: OK → 200, CRITICAL → 500.
pub fn status_code(status: Status) -> StatusCode {
    match status {
        Status::Ok => StatusCode::OK,
        Status::Critical => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Turns aggregation results into HTTP responses.
pub struct Responder {
    aggregator: Aggregator,
    expose_details: bool,
}

impl Responder {
    pub fn new(aggregator: Aggregator) -> Self {
        Self {
            aggregator,
            expose_details: true,
        }
    }

    /// Include classification, details, duration and timestamp in the body.
    pub fn with_expose_details(mut self, expose: bool) -> Self {
        self.expose_details = expose;
        self
    }

    pub fn aggregator(&self) -> &Aggregator {
        &self.aggregator
    }

    /// Respond to a health request. Never fails.
    ///
    /// Liveness answers "is the process scheduling requests" and never
    /// runs probes, even if liveness probes are registered.
    pub async fn respond(&self, kind: CheckKind) -> HealthResponse {
        match kind {
            CheckKind::Liveness => Self::liveness(),
            CheckKind::Readiness => {
                let aggregate = self.aggregator.aggregate(CheckKind::Readiness).await;
                self.render(&aggregate)
            }
        }
    }

    /// Liveness response: always 200.
    pub fn liveness() -> HealthResponse {
        HealthResponse {
            status: StatusCode::OK,
            body: LIVENESS_BODY.to_string(),
        }
    }

    /// Render an aggregate as a status code and body.
    pub fn render(&self, aggregate: &AggregateResult) -> HealthResponse {
        let status = status_code(aggregate.status);
        let body = ReadinessBody {
            status: aggregate.status,
            timestamp: self.expose_details.then_some(aggregate.timestamp),
            checks: aggregate
                .results
                .iter()
                .map(|r| CheckEntry::from_result(r, self.expose_details))
                .collect(),
        };

        let body = match serde_json::to_string(&body) {
            Ok(json) => json,
            Err(e) => {
                // Keep the computed status; only the detail is lost
                error!(error = %e, "Failed to encode readiness body");
                format!(r#"{{"status":"{}","checks":[]}}"#, aggregate.status)
            }
        };

        HealthResponse { status, body }
    }
}
