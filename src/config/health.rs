//! Probe and aggregation configuration.

use std::time::Duration;

use super::parse::{env_bool, env_duration, env_list, env_parse};
use super::ConfigError;
use crate::health::{AggregatorConfig, Classification};

/// A TCP connect probe declared in `TCP_PROBES`.
///
/// Format: `name=host:port[:decisive|informational]`. Classification
/// defaults to informational so a new probe can never fail readiness by
/// accident.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TcpProbeSpec {
    pub name: String,
    pub addr: String,
    pub classification: Classification,
}

impl TcpProbeSpec {
    pub fn parse(s: &str) -> Result<Self, String> {
        let (name, target) = s
            .split_once('=')
            .ok_or_else(|| format!("expected name=host:port, got '{}'", s))?;
        let name = name.trim();
        let target = target.trim();

        if name.is_empty() {
            return Err(format!("missing probe name in '{}'", s));
        }

        // The last segment is either a classification or the port
        let (addr, classification) = match target.rsplit_once(':') {
            Some((rest, last)) if last.parse::<Classification>().is_ok() => {
                (rest, last.parse::<Classification>()?)
            }
            _ => (target, Classification::Informational),
        };

        match addr.rsplit_once(':') {
            Some((host, port)) if !host.is_empty() && port.parse::<u16>().is_ok() => {}
            _ => return Err(format!("expected host:port, got '{}'", addr)),
        }

        Ok(Self {
            name: name.to_string(),
            addr: addr.to_string(),
            classification,
        })
    }
}

/// Health engine configuration loaded from environment.
#[derive(Clone, Debug)]
pub struct HealthConfig {
    /// Default per-probe timeout.
    pub probe_timeout: Duration,
    /// Extra attempts for probes reporting CRITICAL.
    pub retries: u32,
    /// Max probes in flight per request (0 = unlimited).
    pub concurrency: usize,
    /// Include classification/details/duration/timestamp in bodies.
    pub expose_details: bool,
    /// Readiness probes flipped to migrated at startup.
    pub migrated_probes: Vec<String>,
    /// TCP probes to register at startup.
    pub tcp_probes: Vec<TcpProbeSpec>,
}

impl HealthConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let probe_timeout = Self::probe_timeout_from(env_duration("PROBE_TIMEOUT", "2s")?)?;

        let tcp_probes = env_list("TCP_PROBES")
            .iter()
            .map(|s| TcpProbeSpec::parse(s))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|message| ConfigError::Invalid {
                key: "TCP_PROBES".into(),
                message,
            })?;

        Ok(Self {
            probe_timeout,
            retries: env_parse("PROBE_RETRIES", 0)?,
            concurrency: env_parse("PROBE_CONCURRENCY", 0)?,
            expose_details: env_bool("EXPOSE_DETAILS", true),
            migrated_probes: env_list("MIGRATED_PROBES"),
            tcp_probes,
        })
    }

    /// A zero or disabled timeout would fail every probe at once.
    fn probe_timeout_from(value: Option<Duration>) -> Result<Duration, ConfigError> {
        match value {
            Some(timeout) if !timeout.is_zero() => Ok(timeout),
            _ => Err(ConfigError::Invalid {
                key: "PROBE_TIMEOUT".into(),
                message: "must be a positive duration".into(),
            }),
        }
    }

    /// Aggregator settings derived from this configuration.
    pub fn aggregator_config(&self) -> AggregatorConfig {
        AggregatorConfig {
            default_timeout: self.probe_timeout,
            retries: self.retries,
            max_concurrency: self.concurrency,
        }
    }
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            probe_timeout: Duration::from_secs(2),
            retries: 0,
            concurrency: 0,
            expose_details: true,
            migrated_probes: Vec::new(),
            tcp_probes: Vec::new(),
        }
    }
}
