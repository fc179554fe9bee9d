//! Probe listing, migration endpoint, metrics and shutdown tests

use std::sync::Arc;

use healthgate::config::{Config, TcpProbeSpec};
use healthgate::health::{CheckKind, Classification, ProbeOutcome, Registry};
use reqwest::StatusCode;
use tokio::net::TcpListener;

use crate::helpers::*;

fn registry_with_db() -> Arc<Registry> {
    let registry = Arc::new(Registry::new());
    registry
        .register(fixed_probe(
            "db",
            Classification::Decisive,
            ProbeOutcome::critical("connection refused"),
        ))
        .unwrap();
    registry
}

/// Migration endpoint is refused unless the admin endpoint is enabled
#[tokio::test]
async fn test_admin_disabled_by_default() {
    let server = TestServer::start_with(Config::default(), registry_with_db()).await;

    let resp = server.set_migrated("db", true).await;
    assert_status(&resp, StatusCode::FORBIDDEN);
    assert_eq!(
        server.registry.is_migrated("db", CheckKind::Readiness),
        Some(false)
    );

    let (status, _) = server.readiness().await;
    assert_eq!(status, StatusCode::OK);

    server.shutdown().await;
}

/// Flipping reports the previous value
#[tokio::test]
async fn test_set_migrated_reports_change() {
    let server = TestServer::start(registry_with_db()).await;

    let resp = server.set_migrated("db", true).await;
    assert_status(&resp, StatusCode::OK);
    let change: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(change["name"], "db");
    assert_eq!(change["kind"], "readiness");
    assert_eq!(change["previous"], false);
    assert_eq!(change["migrated"], true);

    // Idempotent
    let resp = server.set_migrated("db", true).await;
    let change: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(change["previous"], true);

    server.shutdown().await;
}

/// Bad requests against the migration endpoint
#[tokio::test]
async fn test_set_migrated_errors() {
    let server = TestServer::start(registry_with_db()).await;

    let resp = server.set_migrated("unknown", true).await;
    assert_status(&resp, StatusCode::NOT_FOUND);

    let resp = server
        .put("/healthcheck/probes/readiness/db/migrated", "maybe")
        .await;
    assert_status(&resp, StatusCode::BAD_REQUEST);

    let resp = server
        .put("/healthcheck/probes/startup/db/migrated", "true")
        .await;
    assert_status(&resp, StatusCode::BAD_REQUEST);

    let resp = server.get("/healthcheck/probes/readiness/db/migrated").await;
    assert_status(&resp, StatusCode::METHOD_NOT_ALLOWED);

    server.shutdown().await;
}

/// Probe listing shows classification, flag and effective timeout
#[tokio::test]
async fn test_list_probes() {
    let registry = registry_with_db();
    registry
        .register_with_flag(
            fixed_probe("cache", Classification::Informational, ProbeOutcome::ok()),
            true,
        )
        .unwrap();

    let server = TestServer::start(registry).await;
    let resp = server.get("/healthcheck/probes").await;
    assert_status(&resp, StatusCode::OK);

    let listing: serde_json::Value = resp.json().await.unwrap();
    let probes = listing["probes"].as_array().unwrap();
    assert_eq!(probes.len(), 2);
    assert_eq!(probes[0]["name"], "db");
    assert_eq!(probes[0]["classification"], "decisive");
    assert_eq!(probes[0]["migrated"], false);
    assert_eq!(probes[1]["name"], "cache");
    assert_eq!(probes[1]["classification"], "informational");
    assert_eq!(probes[1]["migrated"], true);
    assert_eq!(probes[1]["timeout_ms"], 2000);

    server.shutdown().await;
}

/// MIGRATED_PROBES applies to probes registered before startup
#[tokio::test]
async fn test_migrated_probes_from_config() {
    let mut config = Config::default();
    config.health.migrated_probes = vec!["db".to_string()];

    let server = TestServer::start_with(config, registry_with_db()).await;

    let (status, body) = server.readiness().await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(check(&body, "db")["migrated"], true);

    server.shutdown().await;
}

/// TCP_PROBES are registered and evaluated against a live socket
#[tokio::test]
async fn test_tcp_probes_from_config() {
    let backend = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let backend_addr = backend.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((_stream, _)) = backend.accept().await {}
    });

    let mut config = Config::default();
    config.health.tcp_probes = vec![
        TcpProbeSpec::parse(&format!("upstream={}:decisive", backend_addr)).unwrap(),
    ];
    config.health.migrated_probes = vec!["upstream".to_string()];

    let server = TestServer::start_with(config, Arc::new(Registry::new())).await;

    let (status, body) = server.readiness().await;
    assert_eq!(status, StatusCode::OK);
    let upstream = check(&body, "upstream");
    assert_eq!(upstream["status"], "ok");
    assert_eq!(upstream["migrated"], true);
    assert_eq!(upstream["classification"], "decisive");

    server.shutdown().await;
}

/// Prometheus metrics reflect probe runs and requests
#[tokio::test]
async fn test_metrics_endpoint() {
    let server = TestServer::start(registry_with_db()).await;

    let (status, _) = server.readiness().await;
    assert_eq!(status, StatusCode::OK);

    let resp = server.get("/metrics").await;
    assert_status(&resp, StatusCode::OK);
    assert_header_starts_with(&resp, "content-type", "text/plain");

    let body = resp.text().await.unwrap();
    assert!(body.contains(r#"healthgate_probe_status{kind="readiness",name="db"} 0"#), "{}", body);
    assert!(body.contains(r#"healthgate_probe_failures_total{name="db",reason="evaluation"} 1"#), "{}", body);
    assert!(body.contains(r#"healthgate_aggregate_status{kind="readiness"} 1"#), "{}", body);
    assert!(body.contains("healthgate_http_requests_total"), "{}", body);

    server.shutdown().await;
}

/// Unknown paths are 404
#[tokio::test]
async fn test_unknown_path() {
    let server = TestServer::start(Arc::new(Registry::new())).await;

    let resp = server.get("/status").await;
    assert_status(&resp, StatusCode::NOT_FOUND);

    server.shutdown().await;
}

/// Shutdown stops the accept loop and returns cleanly
#[tokio::test]
async fn test_graceful_shutdown() {
    let server = TestServer::start(Arc::new(Registry::new())).await;
    let base_url = server.base_url.clone();
    let client = server.client.clone();

    let resp = server.get("/healthcheck").await;
    assert_status(&resp, StatusCode::OK);

    server.shutdown().await;

    let result = client.get(format!("{}/healthcheck", base_url)).send().await;
    assert!(result.is_err(), "Server still accepting after shutdown");
}
