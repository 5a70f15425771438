//! Liveness and readiness endpoints
//!
//! `GET /live` runs the liveness checks, `GET /ready` runs liveness and
//! readiness checks. Both answer 200 when every check passes and 503
//! otherwise. With `?full=1` the per-check results are returned as JSON.

use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

type Check = Arc<dyn Fn() -> Result<(), String> + Send + Sync>;

#[derive(Default)]
struct Checks {
    liveness: BTreeMap<String, Check>,
    readiness: BTreeMap<String, Check>,
}

/// Named health checks shared with the HTTP handlers
#[derive(Clone, Default)]
pub struct HealthRegistry {
    checks: Arc<RwLock<Checks>>,
}

#[derive(Debug, Deserialize)]
pub struct HealthQuery {
    #[serde(default)]
    pub full: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HealthReport {
    pub healthy: bool,
    pub checks: BTreeMap<String, String>,
}

impl HealthRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_liveness_check<F>(&self, name: impl Into<String>, check: F)
    where
        F: Fn() -> Result<(), String> + Send + Sync + 'static,
    {
        let mut checks = self.checks.write().unwrap_or_else(|e| e.into_inner());
        checks.liveness.insert(name.into(), Arc::new(check));
    }

    pub fn add_readiness_check<F>(&self, name: impl Into<String>, check: F)
    where
        F: Fn() -> Result<(), String> + Send + Sync + 'static,
    {
        let mut checks = self.checks.write().unwrap_or_else(|e| e.into_inner());
        checks.readiness.insert(name.into(), Arc::new(check));
    }

    fn run(&self, include_readiness: bool) -> HealthReport {
        let checks = self.checks.read().unwrap_or_else(|e| e.into_inner());

        let mut report = HealthReport {
            healthy: true,
            checks: BTreeMap::new(),
        };
        let selected = checks.liveness.iter().chain(
            checks
                .readiness
                .iter()
                .filter(|_| include_readiness),
        );
        for (name, check) in selected {
            let status = match check() {
                Ok(()) => "OK".to_string(),
                Err(reason) => {
                    report.healthy = false;
                    reason
                }
            };
            report.checks.insert(name.clone(), status);
        }
        report
    }

    /// Liveness report
    pub fn live(&self) -> HealthReport {
        self.run(false)
    }

    /// Readiness report (includes liveness checks)
    pub fn ready(&self) -> HealthReport {
        self.run(true)
    }

    /// Router serving `/live` and `/ready`
    pub fn router(&self) -> Router {
        Router::new()
            .route("/live", get(live_handler))
            .route("/ready", get(ready_handler))
            .with_state(self.clone())
    }
}

async fn live_handler(
    State(registry): State<HealthRegistry>,
    Query(query): Query<HealthQuery>,
) -> Response {
    respond(registry.live(), &query)
}

async fn ready_handler(
    State(registry): State<HealthRegistry>,
    Query(query): Query<HealthQuery>,
) -> Response {
    respond(registry.ready(), &query)
}

fn respond(report: HealthReport, query: &HealthQuery) -> Response {
    let status = if report.healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let full = matches!(query.full.as_deref(), Some("1") | Some("true"));
    if full {
        (status, Json(report)).into_response()
    } else {
        (status, "{}\n").into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tower::ServiceExt;

    async fn fetch(router: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = router
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_readiness_follows_check() {
        let ready = Arc::new(AtomicBool::new(false));
        let registry = HealthRegistry::new();
        {
            let ready = ready.clone();
            registry.add_readiness_check("spotify client ready", move || {
                if ready.load(Ordering::SeqCst) {
                    Ok(())
                } else {
                    Err("spotify client not ready".to_string())
                }
            });
        }

        let (status, _) = fetch(registry.router(), "/live").await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = fetch(registry.router(), "/ready?full=1").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["healthy"], false);
        assert_eq!(body["checks"]["spotify client ready"], "spotify client not ready");

        ready.store(true, Ordering::SeqCst);
        let (status, body) = fetch(registry.router(), "/ready").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, serde_json::json!({}));
    }

    #[tokio::test]
    async fn test_failed_liveness_fails_readiness() {
        let registry = HealthRegistry::new();
        registry.add_liveness_check("broken", || Err("down".to_string()));

        let (status, _) = fetch(registry.router(), "/ready").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }
}
