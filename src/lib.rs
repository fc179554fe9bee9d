//! healthgate - readiness and liveness healthchecks with per-probe migration.
//!
//! Probes are registered with a classification (decisive or informational)
//! and a `migrated` flag. Every probe runs on every readiness request and is
//! reported in the body, but only a decisive probe that has been migrated
//! can turn readiness into a 500. Operators flip probes over one at a time
//! after watching their results in the body and in `/metrics`.
//!
//! # Features
//!
//! - **Liveness**: always 200, never runs probes
//! - **Readiness**: concurrent probes with per-probe timeouts
//! - **Panic Containment**: a panicking probe becomes a CRITICAL result
//! - **Runtime Migration**: flip flags without a restart
//! - **Metrics**: Prometheus exposition of probe and aggregate status
//! - **Structured Logging**: text or JSON lines via tracing
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use healthgate::config::Config;
//! use healthgate::health::{from_fn, Classification, Probe, ProbeOutcome, Registry};
//! use healthgate::server::{AppState, Server};
//!
//! let config = Config::from_env()?;
//! let registry = Arc::new(Registry::new());
//! registry.register(Probe::readiness(
//!     "db",
//!     Classification::Decisive,
//!     from_fn(|| async { Ok(ProbeOutcome::ok()) }),
//! ))?;
//!
//! let state = AppState::from_config(&config, registry)?;
//! Server::new(config.server.clone(), state).run().await?;
//! ```

/// Package version from Cargo.toml
pub const PKG_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Git commit hash (8 chars) with optional "-dirty" suffix
pub const BUILD_VERSION: &str = env!("BUILD_VERSION");

/// Full version string: "0.1.0 (abc12345)" or "0.1.0 (abc12345-dirty)"
pub const VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), " (", env!("BUILD_VERSION"), ")");

pub mod config;
pub mod health;
pub mod logging;
pub mod observability;
pub mod server;
pub mod timestamp;

// Re-exports for convenience
pub use config::Config;
pub use health::{Aggregator, Probe, Registry, Responder};
pub use server::{AppState, Server};
