//! Configuration module for healthgate.
//!
//! All configuration is loaded from environment variables.
//!
//! # Example
//!
//! ```rust,ignore
//! use healthgate::config::Config;
//!
//! let config = Config::from_env()?;
//! println!("Listen address: {}", config.server.listen_addr);
//! println!("Probe timeout: {:?}", config.health.probe_timeout);
//! ```

mod error;
mod health;
mod logging;
mod parse;
mod server;

pub use error::ConfigError;
pub use health::{HealthConfig, TcpProbeSpec};
pub use logging::{LogFormat, LoggingConfig};
pub use server::ServerConfig;

/// Complete application configuration.
#[derive(Clone, Debug, Default)]
pub struct Config {
    /// HTTP server configuration.
    pub server: ServerConfig,
    /// Probe and aggregation configuration.
    pub health: HealthConfig,
    /// Logging configuration.
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            server: ServerConfig::from_env()?,
            health: HealthConfig::from_env()?,
            logging: LoggingConfig::from_env()?,
        })
    }

    /// Print configuration summary to log.
    pub fn log_summary(&self) {
        use tracing::info;

        info!("Configuration loaded:");
        info!("  Listen: {}", self.server.listen_addr);
        info!("  Probe timeout: {}ms", self.health.probe_timeout.as_millis());

        if self.health.retries > 0 {
            info!("  Probe retries: {}", self.health.retries);
        }

        if self.health.concurrency > 0 {
            info!("  Probe concurrency: {}", self.health.concurrency);
        } else {
            info!("  Probe concurrency: unlimited");
        }

        if !self.health.tcp_probes.is_empty() {
            info!("  TCP probes: {}", self.health.tcp_probes.len());
        }

        if !self.health.migrated_probes.is_empty() {
            info!("  Migrated: {}", self.health.migrated_probes.join(","));
        }

        if self.server.admin_enabled {
            info!("  Admin endpoint: enabled");
        }

        if !self.health.expose_details {
            info!("  Response details: hidden");
        }
    }
}
