//! Readiness endpoint tests (/healthcheck/ready)

use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::{Duration, Instant};

use healthgate::config::Config;
use healthgate::health::{
    from_fn, CheckKind, Classification, Probe, ProbeError, ProbeOutcome, Registry,
};
use reqwest::StatusCode;

use crate::helpers::*;

/// Empty registry is ready with an empty check list
#[tokio::test]
async fn test_readiness_empty_registry() {
    let mut config = Config::default();
    config.health.expose_details = false;
    let server = TestServer::start_with(config, Arc::new(Registry::new())).await;

    let resp = server.get("/healthcheck/ready").await;
    assert_status(&resp, StatusCode::OK);
    assert_eq!(resp.text().await.unwrap(), r#"{"status":"ok","checks":[]}"#);

    server.shutdown().await;
}

/// A failing decisive probe only fails readiness once migrated
#[tokio::test]
async fn test_failing_probe_gated_by_migration() {
    let registry = Arc::new(Registry::new());
    registry
        .register(fixed_probe(
            "db",
            Classification::Decisive,
            ProbeOutcome::critical("connection refused"),
        ))
        .unwrap();
    registry
        .register(fixed_probe("cache", Classification::Informational, ProbeOutcome::ok()))
        .unwrap();

    let server = TestServer::start(registry).await;

    let (status, body) = server.readiness().await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let db = check(&body, "db");
    assert_eq!(db["status"], "critical");
    assert_eq!(db["message"], "connection refused");
    assert_eq!(db["migrated"], false);

    let cache = check(&body, "cache");
    assert_eq!(cache["status"], "ok");
    assert!(cache["message"].is_null());

    let resp = server.set_migrated("db", true).await;
    assert_status(&resp, StatusCode::OK);

    let (status, body) = server.readiness().await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["status"], "critical");
    assert_eq!(check(&body, "db")["migrated"], true);

    // Rolling back restores readiness
    let resp = server.set_migrated("db", false).await;
    assert_status(&resp, StatusCode::OK);
    let (status, _) = server.readiness().await;
    assert_eq!(status, StatusCode::OK);

    server.shutdown().await;
}

/// Informational probes never fail readiness, migrated or not
#[tokio::test]
async fn test_informational_never_fails_readiness() {
    let registry = Arc::new(Registry::new());
    registry
        .register_with_flag(
            fixed_probe(
                "disk",
                Classification::Informational,
                ProbeOutcome::critical("disk 97% full"),
            ),
            true,
        )
        .unwrap();

    let server = TestServer::start(registry).await;
    let (status, body) = server.readiness().await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(check(&body, "disk")["status"], "critical");
    assert_eq!(check(&body, "disk")["migrated"], true);

    server.shutdown().await;
}

/// Readiness tracks the backend without a restart
#[tokio::test]
async fn test_readiness_recovers() {
    let healthy = Arc::new(AtomicBool::new(false));
    let registry = Arc::new(Registry::new());
    registry
        .register_with_flag(
            switch_probe("db", Classification::Decisive, Arc::clone(&healthy)),
            true,
        )
        .unwrap();

    let server = TestServer::start(registry).await;

    let (status, _) = server.readiness().await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

    healthy.store(true, std::sync::atomic::Ordering::SeqCst);
    let (status, body) = server.readiness().await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(check(&body, "db")["status"], "ok");

    server.shutdown().await;
}

/// A hung probe is reported as a timeout and does not stall the response
#[tokio::test]
async fn test_probe_timeout() {
    let registry = Arc::new(Registry::new());
    registry
        .register_with_flag(
            Probe::new(
                "slow",
                Classification::Decisive,
                CheckKind::Readiness,
                from_fn(|| async {
                    tokio::time::sleep(Duration::from_secs(30)).await;
                    Ok(ProbeOutcome::ok())
                }),
            )
            .with_timeout(Duration::from_millis(100)),
            true,
        )
        .unwrap();
    registry
        .register(fixed_probe("cache", Classification::Informational, ProbeOutcome::ok()))
        .unwrap();

    let server = TestServer::start(registry).await;

    let start = Instant::now();
    let (status, body) = server.readiness().await;
    assert!(start.elapsed() < Duration::from_secs(5));

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let slow = check(&body, "slow");
    assert_eq!(slow["status"], "critical");
    assert_eq!(slow["message"], "timed out after 100ms");
    assert_eq!(check(&body, "cache")["status"], "ok");

    server.shutdown().await;
}

/// A panicking probe becomes CRITICAL and the server keeps serving
#[tokio::test]
async fn test_probe_panic_is_contained() {
    let registry = Arc::new(Registry::new());
    registry
        .register(Probe::new(
            "broken",
            Classification::Decisive,
            CheckKind::Readiness,
            from_fn(|| async {
                let missing: Option<ProbeOutcome> = None;
                match missing {
                    Some(outcome) => Ok(outcome),
                    None => panic!("unexpected nil"),
                }
            }),
        ))
        .unwrap();
    registry
        .register(fixed_probe("cache", Classification::Informational, ProbeOutcome::ok()))
        .unwrap();

    let server = TestServer::start(registry).await;

    let (status, body) = server.readiness().await;
    assert_eq!(status, StatusCode::OK);

    let broken = check(&body, "broken");
    assert_eq!(broken["status"], "critical");
    let message = broken["message"].as_str().unwrap();
    assert!(message.contains("unexpected nil"), "Message: {}", message);
    assert_eq!(check(&body, "cache")["status"], "ok");

    // Still serving after the panic
    let resp = server.get("/healthcheck").await;
    assert_status(&resp, StatusCode::OK);

    server.shutdown().await;
}

/// Evaluation errors are reported with their message
#[tokio::test]
async fn test_probe_evaluation_error() {
    let registry = Arc::new(Registry::new());
    registry
        .register(Probe::new(
            "queue",
            Classification::Decisive,
            CheckKind::Readiness,
            from_fn(|| async { Err(ProbeError::evaluation("broker rejected credentials")) }),
        ))
        .unwrap();

    let server = TestServer::start(registry).await;
    let (status, body) = server.readiness().await;

    assert_eq!(status, StatusCode::OK);
    let queue = check(&body, "queue");
    assert_eq!(queue["status"], "critical");
    assert_eq!(queue["message"], "broker rejected credentials");

    server.shutdown().await;
}

/// Checks are reported in registration order
#[tokio::test]
async fn test_checks_in_registration_order() {
    let registry = Arc::new(Registry::new());
    for name in ["zeta", "alpha", "mid"] {
        registry
            .register(fixed_probe(name, Classification::Informational, ProbeOutcome::ok()))
            .unwrap();
    }

    let server = TestServer::start(registry).await;
    let (_, body) = server.readiness().await;

    let names: Vec<&str> = body["checks"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, ["zeta", "alpha", "mid"]);

    server.shutdown().await;
}

/// Probes run concurrently: total time tracks the slowest probe
#[tokio::test]
async fn test_probes_run_concurrently() {
    let registry = Arc::new(Registry::new());
    for name in ["a", "b", "c", "d"] {
        registry
            .register(Probe::new(
                name,
                Classification::Decisive,
                CheckKind::Readiness,
                from_fn(|| async {
                    tokio::time::sleep(Duration::from_millis(300)).await;
                    Ok(ProbeOutcome::ok())
                }),
            ))
            .unwrap();
    }

    let server = TestServer::start(registry).await;

    let start = Instant::now();
    let (status, _) = server.readiness().await;
    let elapsed = start.elapsed();

    assert_eq!(status, StatusCode::OK);
    assert!(elapsed < Duration::from_millis(1100), "Took {:?}", elapsed);

    server.shutdown().await;
}

/// Details are exposed by default and hidden when disabled
#[tokio::test]
async fn test_expose_details_toggle() {
    let outcome = ProbeOutcome::critical("replication lag 12s")
        .with_details(serde_json::json!({ "lag_secs": 12 }));

    let registry = Arc::new(Registry::new());
    registry
        .register(fixed_probe("replica", Classification::Decisive, outcome.clone()))
        .unwrap();
    let server = TestServer::start(registry).await;

    let (_, body) = server.readiness().await;
    assert!(body["timestamp"].is_string());
    let replica = check(&body, "replica");
    assert_eq!(replica["classification"], "decisive");
    assert_eq!(replica["details"]["lag_secs"], 12);
    assert!(replica["duration_ms"].is_u64());
    server.shutdown().await;

    let mut config = Config::default();
    config.health.expose_details = false;
    let registry = Arc::new(Registry::new());
    registry
        .register(fixed_probe("replica", Classification::Decisive, outcome))
        .unwrap();
    let server = TestServer::start_with(config, registry).await;

    let (_, body) = server.readiness().await;
    assert!(body.get("timestamp").is_none());
    let replica = check(&body, "replica");
    assert!(replica.get("classification").is_none());
    assert!(replica.get("details").is_none());
    assert_eq!(replica["message"], "replication lag 12s");
    server.shutdown().await;
}
