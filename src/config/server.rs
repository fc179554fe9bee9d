//! Server configuration.

use std::net::SocketAddr;
use std::time::Duration;

use super::parse::{env_bool, env_or, env_parse};
use super::ConfigError;

/// HTTP server configuration loaded from environment.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Listen address (default: 0.0.0.0:8080).
    pub listen_addr: SocketAddr,
    /// Graceful shutdown drain timeout.
    pub drain_timeout: Duration,
    /// Allow operators to flip migration flags over HTTP.
    pub admin_enabled: bool,
}

impl ServerConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let listen_addr: SocketAddr = env_or("LISTEN_ADDR", "0.0.0.0:8080")
            .parse()
            .map_err(|e| ConfigError::Parse {
                key: "LISTEN_ADDR".into(),
                value: env_or("LISTEN_ADDR", "0.0.0.0:8080"),
                error: format!("{}", e),
            })?;

        let drain_timeout_secs: u64 = env_parse("DRAIN_TIMEOUT_SECS", 10)?;

        Ok(Self {
            listen_addr,
            drain_timeout: Duration::from_secs(drain_timeout_secs),
            admin_enabled: env_bool("ADMIN_ENABLED", false),
        })
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            drain_timeout: Duration::from_secs(10),
            admin_enabled: false,
        }
    }
}
