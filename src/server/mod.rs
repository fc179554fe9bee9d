//! HTTP server for the health endpoints.
//!
//! | Method | Path                                          | Purpose                 |
//! |--------|-----------------------------------------------|-------------------------|
//! | GET    | `/healthcheck`                                | Liveness, always 200    |
//! | GET    | `/healthcheck/ready`                          | Readiness, 200 or 500   |
//! | GET    | `/healthcheck/probes`                         | Registered probes       |
//! | PUT    | `/healthcheck/probes/{kind}/{name}/migrated`  | Flip a migration flag   |
//! | GET    | `/metrics`                                    | Prometheus exposition   |
//!
//! # Graceful Shutdown
//!
//! [`Server::trigger_shutdown`] stops the accept loop. In-flight requests
//! are drained for up to `drain_timeout` before `serve` returns.
//!
//! ```rust,ignore
//! let server = Arc::new(Server::new(config.server.clone(), state));
//! let s = Arc::clone(&server);
//! tokio::spawn(async move { s.run().await });
//! // ...
//! server.trigger_shutdown();
//! ```

mod handler;
pub mod routing;

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::Request;
use hyper_util::rt::TokioIo;
use hyper_util::server::graceful::GracefulShutdown;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::config::{Config, ServerConfig};
use crate::health::{tcp_connect, Aggregator, CheckKind, Probe, Registry, Responder};
use crate::observability::Metrics;

pub use handler::handle_request;

/// Shared state behind every request.
pub struct AppState {
    pub responder: Responder,
    pub registry: Arc<Registry>,
    pub metrics: Arc<Metrics>,
    /// Accept `PUT .../migrated`.
    pub admin_enabled: bool,
}

impl AppState {
    pub fn new(responder: Responder, metrics: Arc<Metrics>) -> Self {
        let registry = Arc::clone(responder.aggregator().registry());
        Self {
            responder,
            registry,
            metrics,
            admin_enabled: false,
        }
    }

    /// Wire the engine from configuration around `registry`.
    ///
    /// Probes already in `registry` are kept; `TCP_PROBES` are added and
    /// `MIGRATED_PROBES` are applied afterwards, so both can name them.
    pub fn from_config(
        config: &Config,
        registry: Arc<Registry>,
    ) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        for spec in &config.health.tcp_probes {
            registry.register(Probe::new(
                spec.name.as_str(),
                spec.classification,
                CheckKind::Readiness,
                tcp_connect(spec.addr.as_str()),
            ))?;
        }

        for name in &config.health.migrated_probes {
            registry.set_migrated(name, CheckKind::Readiness, true)?;
        }

        let metrics = Arc::new(Metrics::new()?);
        let aggregator = Aggregator::new(registry, config.health.aggregator_config())
            .with_metrics(Arc::clone(&metrics));
        let responder =
            Responder::new(aggregator).with_expose_details(config.health.expose_details);

        Ok(Self::new(responder, metrics).with_admin_enabled(config.server.admin_enabled))
    }

    pub fn with_admin_enabled(mut self, enabled: bool) -> Self {
        self.admin_enabled = enabled;
        self
    }

    /// Default probe timeout, reported for probes without an override.
    pub fn default_timeout(&self) -> Duration {
        self.responder.aggregator().config().default_timeout
    }
}

/// Health HTTP server.
pub struct Server {
    config: ServerConfig,
    state: Arc<AppState>,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
    shutdown_initiated: AtomicBool,
}

impl Server {
    pub fn new(config: ServerConfig, state: AppState) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        Self {
            config,
            state: Arc::new(state),
            shutdown_tx,
            shutdown_rx,
            shutdown_initiated: AtomicBool::new(false),
        }
    }

    pub fn state(&self) -> &Arc<AppState> {
        &self.state
    }

    /// Bind `listen_addr` and serve until shutdown.
    pub async fn run(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let listener = TcpListener::bind(self.config.listen_addr).await?;
        self.serve(listener).await
    }

    /// Serve on an already bound listener until shutdown.
    pub async fn serve(
        &self,
        listener: TcpListener,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let local_addr = listener.local_addr()?;
        info!("Health server listening on http://{}", local_addr);

        let graceful = GracefulShutdown::new();
        let mut shutdown_rx = self.shutdown_rx.clone();

        loop {
            if *shutdown_rx.borrow() {
                break;
            }

            tokio::select! {
                result = listener.accept() => {
                    let (stream, remote_addr) = match result {
                        Ok(conn) => conn,
                        Err(e) => {
                            error!("Accept error: {}", e);
                            continue;
                        }
                    };

                    let _ = stream.set_nodelay(true);
                    self.spawn_connection(&graceful, stream, remote_addr);
                }
                _ = shutdown_rx.changed() => {
                    debug!("Shutdown signal received, stopping accept loop");
                    break;
                }
            }
        }

        drop(listener);
        self.drain(graceful).await;
        Ok(())
    }

    fn spawn_connection(
        &self,
        graceful: &GracefulShutdown,
        stream: tokio::net::TcpStream,
        remote_addr: SocketAddr,
    ) {
        let state = Arc::clone(&self.state);
        let service = service_fn(move |req: Request<Incoming>| {
            let state = Arc::clone(&state);
            async move { handle_request(req, state).await }
        });

        let conn = http1::Builder::new().serve_connection(TokioIo::new(stream), service);
        let conn = graceful.watch(conn);

        tokio::spawn(async move {
            if let Err(e) = conn.await {
                debug!(remote = %remote_addr, "Connection error: {}", e);
            }
        });
    }

    async fn drain(&self, graceful: GracefulShutdown) {
        tokio::select! {
            _ = graceful.shutdown() => {
                info!("All connections drained");
            }
            _ = tokio::time::sleep(self.config.drain_timeout) => {
                warn!(
                    "Drain timeout reached after {}s, closing remaining connections",
                    self.config.drain_timeout.as_secs()
                );
            }
        }
    }

    /// Trigger graceful shutdown. Idempotent.
    pub fn trigger_shutdown(&self) {
        if self.shutdown_initiated.swap(true, Ordering::SeqCst) {
            return;
        }
        let _ = self.shutdown_tx.send(true);
    }

    /// Get the configured drain timeout.
    pub fn drain_timeout(&self) -> Duration {
        self.config.drain_timeout
    }
}
