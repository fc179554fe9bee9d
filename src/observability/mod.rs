//! Observability: Prometheus metrics.
//!
//! ```rust,ignore
//! use healthgate::observability::Metrics;
//!
//! let metrics = Metrics::new()?;
//! metrics.record_probe("db", CheckKind::Readiness, Status::Ok, 0.004);
//! println!("{}", metrics.export());
//! ```

pub mod metrics;

pub use metrics::Metrics;
