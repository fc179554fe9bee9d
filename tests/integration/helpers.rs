//! Test helpers and utilities

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use healthgate::config::Config;
use healthgate::health::{
    from_fn, CheckKind, Classification, Probe, ProbeError, ProbeOutcome, Registry,
};
use healthgate::server::{AppState, Server};
use reqwest::{Client, Response, StatusCode};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

type ServeResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

/// In-process server bound to 127.0.0.1 on an ephemeral port.
pub struct TestServer {
    pub base_url: String,
    pub client: Client,
    pub registry: Arc<Registry>,
    server: Arc<Server>,
    handle: JoinHandle<ServeResult>,
}

#[allow(dead_code)]
impl TestServer {
    /// Start with default configuration and the admin endpoint enabled.
    pub async fn start(registry: Arc<Registry>) -> Self {
        let mut config = Config::default();
        config.server.admin_enabled = true;
        Self::start_with(config, registry).await
    }

    pub async fn start_with(config: Config, registry: Arc<Registry>) -> Self {
        let state = AppState::from_config(&config, Arc::clone(&registry))
            .expect("Failed to build app state");

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let addr = listener.local_addr().expect("Listener has no address");

        let server = Arc::new(Server::new(config.server.clone(), state));
        let serving = Arc::clone(&server);
        let handle = tokio::spawn(async move { serving.serve(listener).await });

        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            base_url: format!("http://{}", addr),
            client,
            registry,
            server,
            handle,
        }
    }

    /// Make a GET request to the server
    pub async fn get(&self, path: &str) -> Response {
        self.client
            .get(format!("{}{}", self.base_url, path))
            .send()
            .await
            .expect("GET request failed")
    }

    /// Make a PUT request with a raw body
    pub async fn put(&self, path: &str, body: &'static str) -> Response {
        self.client
            .put(format!("{}{}", self.base_url, path))
            .body(body)
            .send()
            .await
            .expect("PUT request failed")
    }

    /// GET readiness and parse the body
    pub async fn readiness(&self) -> (StatusCode, serde_json::Value) {
        let resp = self.get("/healthcheck/ready").await;
        let status = resp.status();
        let body = resp.json().await.expect("Readiness body is not JSON");
        (status, body)
    }

    /// Flip a readiness probe's migration flag over HTTP
    pub async fn set_migrated(&self, name: &str, migrated: bool) -> Response {
        let body = if migrated { "true" } else { "false" };
        self.put(
            &format!("/healthcheck/probes/readiness/{}/migrated", name),
            body,
        )
        .await
    }

    /// Stop accepting and wait for the serve task to finish.
    pub async fn shutdown(self) {
        self.server.trigger_shutdown();
        tokio::time::timeout(Duration::from_secs(5), self.handle)
            .await
            .expect("Server did not stop in time")
            .expect("Server task panicked")
            .expect("Server returned an error");
    }
}

/// Readiness probe that always reports `outcome`.
pub fn fixed_probe(
    name: &'static str,
    classification: Classification,
    outcome: ProbeOutcome,
) -> Probe {
    Probe::new(
        name,
        classification,
        CheckKind::Readiness,
        from_fn(move || {
            let outcome = outcome.clone();
            async move { Ok(outcome) }
        }),
    )
}

/// Readiness probe whose status follows a shared flag: `true` is OK.
pub fn switch_probe(
    name: &'static str,
    classification: Classification,
    healthy: Arc<AtomicBool>,
) -> Probe {
    Probe::new(
        name,
        classification,
        CheckKind::Readiness,
        from_fn(move || {
            let outcome = if healthy.load(Ordering::SeqCst) {
                ProbeOutcome::ok()
            } else {
                ProbeOutcome::critical("backend unavailable")
            };
            std::future::ready(Ok::<_, ProbeError>(outcome))
        }),
    )
}

/// Assert that response has expected status
pub fn assert_status(response: &Response, expected: StatusCode) {
    assert_eq!(
        response.status(),
        expected,
        "Expected status {}, got {}",
        expected,
        response.status()
    );
}

/// Assert that response header starts with prefix
pub fn assert_header_starts_with(response: &Response, name: &str, prefix: &str) {
    let value = response
        .headers()
        .get(name)
        .unwrap_or_else(|| panic!("Header '{}' not found", name))
        .to_str()
        .unwrap();
    assert!(
        value.starts_with(prefix),
        "Header '{}' expected to start with '{}', got '{}'",
        name,
        prefix,
        value
    );
}

/// Find a check entry by name in a readiness body
pub fn check<'a>(body: &'a serde_json::Value, name: &str) -> &'a serde_json::Value {
    body["checks"]
        .as_array()
        .expect("checks is not an array")
        .iter()
        .find(|c| c["name"] == name)
        .unwrap_or_else(|| panic!("No check named '{}' in {}", name, body))
}
