//! Request handler for the health server.

use std::convert::Infallible;
use std::sync::Arc;

use bytes::Bytes;
use http::header::{HeaderValue, ALLOW, CACHE_CONTROL, CONTENT_TYPE};
use http_body_util::{BodyExt, Full, Limited};
use hyper::body::Body;
use hyper::{Request, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::routing::{route, Route};
use super::AppState;
use crate::health::{CheckKind, Classification, RegistryError};

const JSON: &str = "application/json";
const MAX_ADMIN_BODY: usize = 1024;

/// Probe listing entry for `GET /healthcheck/probes`.
#[derive(Serialize)]
struct ProbeInfo<'a> {
    name: &'a str,
    kind: CheckKind,
    classification: Classification,
    migrated: bool,
    timeout_ms: u64,
}

#[derive(Serialize)]
struct ProbeListing<'a> {
    probes: Vec<ProbeInfo<'a>>,
}

/// Accepted bodies for the migration endpoint: `true` or `{"migrated":true}`.
#[derive(Deserialize)]
#[serde(untagged)]
enum MigratedBody {
    Flag(bool),
    Object { migrated: bool },
}

impl MigratedBody {
    fn value(&self) -> bool {
        match *self {
            MigratedBody::Flag(v) => v,
            MigratedBody::Object { migrated } => migrated,
        }
    }
}

#[derive(Serialize)]
struct MigrationChange<'a> {
    name: &'a str,
    kind: CheckKind,
    previous: bool,
    migrated: bool,
}

fn response(status: StatusCode, content_type: &'static str, body: impl Into<Bytes>) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(body.into()));
    *response.status_mut() = status;
    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-store"));
    response
}

fn error_response(status: StatusCode, message: &str) -> Response<Full<Bytes>> {
    let body = serde_json::json!({ "error": message }).to_string();
    response(status, JSON, body)
}

/// Handle one request. Never fails; every outcome is an HTTP response.
pub async fn handle_request<B>(
    req: Request<B>,
    state: Arc<AppState>,
) -> Result<Response<Full<Bytes>>, Infallible>
where
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let (parts, body) = req.into_parts();
    let path = parts.uri.path();
    let route = route(&parts.method, path);

    let response = match route {
        Route::Liveness => health_response(&state, CheckKind::Liveness).await,
        Route::Readiness => health_response(&state, CheckKind::Readiness).await,
        Route::ListProbes => list_probes(&state),
        Route::SetMigrated { kind, name } => set_migrated(&state, kind, name, body).await,
        Route::Metrics => response(StatusCode::OK, prometheus::TEXT_FORMAT, state.metrics.export()),
        Route::MethodNotAllowed(allow) => {
            let mut resp = error_response(StatusCode::METHOD_NOT_ALLOWED, "method not allowed");
            resp.headers_mut().insert(ALLOW, HeaderValue::from_static(allow));
            resp
        }
        Route::NotFound => error_response(StatusCode::NOT_FOUND, "not found"),
    };

    state
        .metrics
        .record_http_request(route.label(), response.status().as_u16());
    debug!(
        method = %parts.method,
        path,
        status = response.status().as_u16(),
        "Request handled"
    );

    Ok(response)
}

async fn health_response(state: &AppState, kind: CheckKind) -> Response<Full<Bytes>> {
    let health = state.responder.respond(kind).await;
    response(health.status, JSON, health.body)
}

fn list_probes(state: &AppState) -> Response<Full<Bytes>> {
    let default_timeout = state.default_timeout();
    let registered = state.registry.all();
    let listing = ProbeListing {
        probes: registered
            .iter()
            .map(|r| ProbeInfo {
                name: r.probe.name(),
                kind: r.probe.kind(),
                classification: r.probe.classification(),
                migrated: r.migrated,
                timeout_ms: r.probe.timeout().unwrap_or(default_timeout).as_millis() as u64,
            })
            .collect(),
    };

    match serde_json::to_string(&listing) {
        Ok(body) => response(StatusCode::OK, JSON, body),
        Err(e) => {
            warn!(error = %e, "Failed to encode probe listing");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "failed to encode probe listing")
        }
    }
}

async fn set_migrated<B>(state: &AppState, kind: &str, name: &str, body: B) -> Response<Full<Bytes>>
where
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    if !state.admin_enabled {
        return error_response(StatusCode::FORBIDDEN, "admin endpoint disabled");
    }

    let kind: CheckKind = match kind.parse() {
        Ok(kind) => kind,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, &e),
    };

    let bytes = match Limited::new(body, MAX_ADMIN_BODY).collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            return error_response(StatusCode::BAD_REQUEST, &format!("unreadable body: {}", e))
        }
    };

    let migrated = match serde_json::from_slice::<MigratedBody>(&bytes) {
        Ok(body) => body.value(),
        Err(_) => {
            return error_response(
                StatusCode::BAD_REQUEST,
                r#"expected true, false or {"migrated":bool}"#,
            )
        }
    };

    match state.registry.set_migrated(name, kind, migrated) {
        Ok(previous) => {
            let change = MigrationChange {
                name,
                kind,
                previous,
                migrated,
            };
            let body = serde_json::to_string(&change).unwrap_or_else(|_| "{}".to_string());
            response(StatusCode::OK, JSON, body)
        }
        Err(e @ RegistryError::UnknownProbe { .. }) => {
            error_response(StatusCode::NOT_FOUND, &e.to_string())
        }
        Err(e) => error_response(StatusCode::BAD_REQUEST, &e.to_string()),
    }
}
