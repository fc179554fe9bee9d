//! Status and result types shared by probes, the aggregator and the responder.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use crate::timestamp::Iso8601Timestamp;

/// Two-valued probe status. No warning state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Ok,
    Critical,
}

impl Status {
    pub fn is_ok(self) -> bool {
        self == Status::Ok
    }

    pub fn is_critical(self) -> bool {
        self == Status::Critical
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Status::Ok => "ok",
            Status::Critical => "critical",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which endpoint a probe belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckKind {
    /// Should this instance receive traffic? (remove from LB if failed)
    Readiness,
    /// Is the process alive? Never depends on probes.
    Liveness,
}

impl CheckKind {
    pub fn as_str(self) -> &'static str {
        match self {
            CheckKind::Readiness => "readiness",
            CheckKind::Liveness => "liveness",
        }
    }
}

impl fmt::Display for CheckKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CheckKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "readiness" | "ready" => Ok(CheckKind::Readiness),
            "liveness" | "live" => Ok(CheckKind::Liveness),
            other => Err(format!("unknown check kind: {}", other)),
        }
    }
}

/// Whether a probe's CRITICAL result may fail the aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    /// May flip readiness once migrated.
    Decisive,
    /// Reported in the body only (alerting).
    Informational,
}

impl Classification {
    pub fn as_str(self) -> &'static str {
        match self {
            Classification::Decisive => "decisive",
            Classification::Informational => "informational",
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Classification {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "decisive" => Ok(Classification::Decisive),
            "informational" | "info" => Ok(Classification::Informational),
            other => Err(format!("unknown classification: {}", other)),
        }
    }
}

/// Result of one probe evaluation within one aggregation run.
#[derive(Debug, Clone)]
pub struct ProbeResult {
    pub name: Arc<str>,
    pub classification: Classification,
    /// Migration flag as read when the run started.
    pub migrated: bool,
    pub status: Status,
    pub message: Option<String>,
    pub details: Option<serde_json::Value>,
    pub duration: Duration,
}

impl ProbeResult {
    /// True if this probe currently behaves as decisive.
    pub fn is_gating(&self) -> bool {
        self.classification == Classification::Decisive && self.migrated
    }

    /// True if this result fails the aggregate.
    pub fn fails_aggregate(&self) -> bool {
        self.status.is_critical() && self.is_gating()
    }
}

/// Combined outcome of all probes for one request.
#[derive(Debug, Clone)]
pub struct AggregateResult {
    pub kind: CheckKind,
    pub status: Status,
    /// Results in registration order.
    pub results: Vec<ProbeResult>,
    pub timestamp: Iso8601Timestamp,
}

impl AggregateResult {
    /// Build an aggregate, deriving the overall status from `results`.
    ///
    /// CRITICAL iff some decisive, migrated probe is CRITICAL. An empty
    /// result set is vacuously OK.
    pub fn new(kind: CheckKind, results: Vec<ProbeResult>) -> Self {
        let status = if results.iter().any(ProbeResult::fails_aggregate) {
            Status::Critical
        } else {
            Status::Ok
        };

        Self {
            kind,
            status,
            results,
            timestamp: Iso8601Timestamp::now(),
        }
    }

    /// Number of CRITICAL results, gating or not.
    pub fn critical_count(&self) -> usize {
        self.results
            .iter()
            .filter(|r| r.status.is_critical())
            .count()
    }
}
