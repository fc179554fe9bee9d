//! Request routing for the health endpoints.

use hyper::Method;

pub const LIVENESS_PATH: &str = "/healthcheck";
pub const READINESS_PATH: &str = "/healthcheck/ready";
pub const PROBES_PATH: &str = "/healthcheck/probes";
pub const METRICS_PATH: &str = "/metrics";

/// A resolved route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route<'a> {
    Liveness,
    Readiness,
    ListProbes,
    /// `PUT /healthcheck/probes/{kind}/{name}/migrated`
    SetMigrated {
        kind: &'a str,
        name: &'a str,
    },
    Metrics,
    /// Known path, wrong method. Carries the `Allow` header value.
    MethodNotAllowed(&'static str),
    NotFound,
}

impl Route<'_> {
    /// Bounded path label for metrics (no probe names, no raw paths).
    pub fn label(&self) -> &'static str {
        match self {
            Route::Liveness => LIVENESS_PATH,
            Route::Readiness => READINESS_PATH,
            Route::ListProbes => PROBES_PATH,
            Route::SetMigrated { .. } => "/healthcheck/probes/:kind/:name/migrated",
            Route::Metrics => METRICS_PATH,
            Route::MethodNotAllowed(_) => "method_not_allowed",
            Route::NotFound => "not_found",
        }
    }
}

fn is_read(method: &Method) -> bool {
    method == Method::GET || method == Method::HEAD
}

/// Resolve a method and path. A single trailing slash is ignored.
pub fn route<'a>(method: &Method, path: &'a str) -> Route<'a> {
    let path = match path.strip_suffix('/') {
        Some(trimmed) if !trimmed.is_empty() => trimmed,
        _ => path,
    };

    match path {
        LIVENESS_PATH | READINESS_PATH | PROBES_PATH | METRICS_PATH if !is_read(method) => {
            Route::MethodNotAllowed("GET, HEAD")
        }
        LIVENESS_PATH => Route::Liveness,
        READINESS_PATH => Route::Readiness,
        PROBES_PATH => Route::ListProbes,
        METRICS_PATH => Route::Metrics,
        _ => route_migration(method, path),
    }
}

fn route_migration<'a>(method: &Method, path: &'a str) -> Route<'a> {
    let rest = match path
        .strip_prefix(PROBES_PATH)
        .and_then(|r| r.strip_prefix('/'))
    {
        Some(rest) => rest,
        None => return Route::NotFound,
    };

    let mut segments = rest.split('/');
    match (segments.next(), segments.next(), segments.next(), segments.next()) {
        (Some(kind), Some(name), Some("migrated"), None) if !kind.is_empty() && !name.is_empty() => {
            if method == Method::PUT {
                Route::SetMigrated { kind, name }
            } else {
                Route::MethodNotAllowed("PUT")
            }
        }
        _ => Route::NotFound,
    }
}
