//! Liveness endpoint tests (/healthcheck)

use std::sync::Arc;

use healthgate::health::{from_fn, CheckKind, Classification, Probe, ProbeOutcome, Registry};
use reqwest::StatusCode;

use crate::helpers::*;

/// Liveness is 200 with no probes at all
#[tokio::test]
async fn test_liveness_empty_registry() {
    let server = TestServer::start(Arc::new(Registry::new())).await;
    let resp = server.get("/healthcheck").await;

    assert_status(&resp, StatusCode::OK);
    assert_header_starts_with(&resp, "content-type", "application/json");
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "ok");

    server.shutdown().await;
}

/// Liveness stays 200 while readiness is failing
#[tokio::test]
async fn test_liveness_ignores_failing_readiness() {
    let registry = Arc::new(Registry::new());
    registry
        .register_with_flag(
            fixed_probe(
                "db",
                Classification::Decisive,
                ProbeOutcome::critical("connection refused"),
            ),
            true,
        )
        .unwrap();

    let server = TestServer::start(registry).await;

    let (status, _) = server.readiness().await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

    let resp = server.get("/healthcheck").await;
    assert_status(&resp, StatusCode::OK);

    server.shutdown().await;
}

/// Probes registered for liveness are never run
#[tokio::test]
async fn test_liveness_probes_are_not_evaluated() {
    let registry = Arc::new(Registry::new());
    registry
        .register_with_flag(
            Probe::new(
                "heartbeat",
                Classification::Decisive,
                CheckKind::Liveness,
                from_fn(|| async { Ok(ProbeOutcome::critical("should not run")) }),
            ),
            true,
        )
        .unwrap();

    let server = TestServer::start(registry).await;
    let resp = server.get("/healthcheck").await;

    assert_status(&resp, StatusCode::OK);
    let body = resp.text().await.unwrap();
    assert!(!body.contains("should not run"), "Body: {}", body);

    server.shutdown().await;
}

/// Repeated liveness requests are all 200
#[tokio::test]
async fn test_liveness_repeated() {
    let server = TestServer::start(Arc::new(Registry::new())).await;

    for _ in 0..5 {
        let resp = server.get("/healthcheck").await;
        assert_status(&resp, StatusCode::OK);
    }

    server.shutdown().await;
}
