//! HTTP handlers of the webhook/login server

use crate::events::DtEvent;
use axum::{
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use dtsplayer::LoginSession;
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

pub const WEBHOOK_PATH: &str = "/dtconn";

/// State of the `/dtconn` handler
#[derive(Clone)]
pub struct WebhookState {
    pub events: mpsc::Sender<DtEvent>,
}

/// `POST /dtconn`: decodes a sensor event and hands it to the relay
pub async fn dtconn(State(state): State<WebhookState>, body: Bytes) -> Response {
    let event: DtEvent = match serde_json::from_slice(&body) {
        Ok(event) => event,
        Err(e) => {
            warn!("Malformed event on {}: {}", WEBHOOK_PATH, e);
            return (StatusCode::BAD_REQUEST, format!("Malformed event: {}", e)).into_response();
        }
    };

    debug!(event_id = %event.event.event_id, "Event received");
    if state.events.send(event).await.is_err() {
        return (StatusCode::INTERNAL_SERVER_ERROR, "Application not ready").into_response();
    }
    StatusCode::OK.into_response()
}

#[derive(Debug, Deserialize)]
pub struct LoginQuery {
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// OAuth redirect target
pub async fn login(
    State(session): State<Arc<LoginSession>>,
    Query(query): Query<LoginQuery>,
) -> Response {
    if let Some(reason) = &query.error {
        warn!("Spotify login refused: {}", reason);
        return token_failure();
    }

    let state = query.state.as_deref().unwrap_or_default();
    let code = query.code.as_deref().unwrap_or_default();
    match session.complete(state, code).await {
        Ok(_) => (StatusCode::OK, "Spotify login successful, you can close this page").into_response(),
        Err(e) => {
            error!("Spotify login failed: {}", e);
            token_failure()
        }
    }
}

fn token_failure() -> Response {
    (StatusCode::NOT_FOUND, "Was not able to get token").into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::Router;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use axum::routing::{get, post};
    use dtsplayer::{FileCredentialStore, OAuthApp};
    use tower::ServiceExt;

    fn webhook(capacity: usize) -> (Router, mpsc::Receiver<DtEvent>) {
        let (tx, rx) = mpsc::channel(capacity);
        let router = Router::new()
            .route(WEBHOOK_PATH, post(dtconn))
            .with_state(WebhookState { events: tx });
        (router, rx)
    }

    fn post_event(body: &str) -> Request<Body> {
        Request::post(WEBHOOK_PATH)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_webhook_forwards_event() {
        let (router, mut rx) = webhook(1);
        let response = router
            .oneshot(post_event(r#"{"labels": {"spotify_action": "play"}}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(rx.recv().await.unwrap().labels.spotify_action.as_deref(), Some("play"));
    }

    #[tokio::test]
    async fn test_webhook_rejects_malformed_json() {
        let (router, mut rx) = webhook(1);
        let response = router.oneshot(post_event("{not json")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_webhook_without_relay() {
        let (router, rx) = webhook(1);
        drop(rx);
        let response = router.oneshot(post_event("{}")).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"Application not ready");
    }

    #[tokio::test]
    async fn test_login_with_bad_state() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(FileCredentialStore::new(dir.path()).await.unwrap());
        let oauth = OAuthApp::with_http_client(
            reqwest::Client::new(),
            "id",
            "secret",
            "http://localhost:8080/login",
        );
        let session = Arc::new(LoginSession::new(oauth, store, "spotify_token").unwrap());
        let router = Router::new()
            .route("/login", get(login))
            .with_state(session);

        for uri in ["/login?state=forged&code=abc", "/login?error=access_denied", "/login"] {
            let response = router
                .clone()
                .oneshot(Request::get(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::NOT_FOUND, "{}", uri);
            let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
            assert_eq!(&body[..], b"Was not able to get token");
        }
    }
}
