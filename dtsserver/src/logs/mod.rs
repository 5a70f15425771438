//! Initialisation du logging et réglage du niveau à chaud
//!
//! Le niveau minimum vient de `host.logger.min_level`; il peut être changé
//! ensuite via `GET/POST /log_setup` sans redémarrer le processus.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use dtsconfig::get_config;
use serde::{Deserialize, Serialize};
use tracing::Level;
use tracing_subscriber::{
    Registry,
    filter::LevelFilter,
    layer::SubscriberExt,
    reload,
    util::SubscriberInitExt,
};

const LEVELS: [&str; 5] = ["ERROR", "WARN", "INFO", "DEBUG", "TRACE"];

/// Handle sur le filtre de niveau rechargeable
#[derive(Clone)]
pub struct LogState {
    reload_handle: reload::Handle<LevelFilter, Registry>,
}

impl LogState {
    pub fn new(reload_handle: reload::Handle<LevelFilter, Registry>) -> Self {
        Self { reload_handle }
    }

    pub fn set_max_level(&self, level: Level) -> Result<(), reload::Error> {
        self.reload_handle.reload(level_to_levelfilter(level))
    }

    pub fn get_max_level(&self) -> LevelFilter {
        self.reload_handle
            .with_current(|filter| *filter)
            .unwrap_or(LevelFilter::OFF)
    }
}

/// Initialise le subscriber global
///
/// Le niveau et la sortie console sont lus dans la configuration. Si un
/// subscriber global existe déjà (tests), il est conservé.
pub fn init_logging() -> LogState {
    let config = get_config();

    let log_level = match config.get_log_min_level() {
        Ok(l) => match string_to_level(&l) {
            Some(lev) => level_to_levelfilter(lev),
            None => LevelFilter::INFO,
        },
        Err(_) => LevelFilter::INFO,
    };

    let (filter, reload_handle) = reload::Layer::new(log_level);
    let log_state = LogState::new(reload_handle);

    let enable_console = config.get_log_enable_console().unwrap_or(true);

    let console = enable_console.then(|| {
        tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_level(true)
            .with_ansi(true)
    });

    if let Err(e) = Registry::default().with(filter).with(console).try_init() {
        eprintln!("Logging already initialized: {}", e);
    }

    log_state
}

#[derive(Debug, Deserialize)]
pub struct LogSetupRequest {
    pub level: String,
}

#[derive(Debug, Serialize)]
pub struct LogSetupResponse {
    pub current_level: String,
    pub available_levels: Vec<String>,
}

impl LogSetupResponse {
    fn new(current: LevelFilter) -> Self {
        Self {
            current_level: current.to_string().to_uppercase(),
            available_levels: LEVELS.iter().map(|l| l.to_string()).collect(),
        }
    }
}

/// GET /log_setup - niveau courant
pub async fn log_setup_get(State(state): State<LogState>) -> impl IntoResponse {
    Json(LogSetupResponse::new(state.get_max_level()))
}

/// POST /log_setup - change le niveau
pub async fn log_setup_post(
    State(state): State<LogState>,
    Json(payload): Json<LogSetupRequest>,
) -> impl IntoResponse {
    let Some(level) = string_to_level(&payload.level) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({
                "error": "Invalid log level. Must be one of: ERROR, WARN, INFO, DEBUG, TRACE"
            })),
        )
            .into_response();
    };

    if let Err(e) = state.set_max_level(level) {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({ "error": e.to_string() })),
        )
            .into_response();
    }
    tracing::info!("Log level changed to: {}", payload.level);

    Json(LogSetupResponse::new(state.get_max_level())).into_response()
}

/// Crée le router de gestion des logs
pub fn create_logs_router(log_state: LogState) -> Router {
    Router::new()
        .route("/log_setup", get(log_setup_get).post(log_setup_post))
        .with_state(log_state)
}

pub fn string_to_level(s: &str) -> Option<Level> {
    match s.trim().to_uppercase().as_str() {
        "ERROR" => Some(Level::ERROR),
        "WARN" => Some(Level::WARN),
        "INFO" => Some(Level::INFO),
        "DEBUG" => Some(Level::DEBUG),
        "TRACE" => Some(Level::TRACE),
        _ => None,
    }
}

pub fn level_to_levelfilter(level: Level) -> LevelFilter {
    match level {
        Level::ERROR => LevelFilter::ERROR,
        Level::WARN => LevelFilter::WARN,
        Level::INFO => LevelFilter::INFO,
        Level::DEBUG => LevelFilter::DEBUG,
        Level::TRACE => LevelFilter::TRACE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use tower::ServiceExt;

    fn state() -> LogState {
        let (filter, handle) = reload::Layer::<LevelFilter, Registry>::new(LevelFilter::INFO);
        // Le handle ne fonctionne que tant que le layer existe
        std::mem::forget(filter);
        LogState::new(handle)
    }

    #[test]
    fn test_string_to_level() {
        assert_eq!(string_to_level("debug"), Some(Level::DEBUG));
        assert_eq!(string_to_level(" WARN "), Some(Level::WARN));
        assert_eq!(string_to_level("verbose"), None);
    }

    #[test]
    fn test_reload() {
        let state = state();
        assert_eq!(state.get_max_level(), LevelFilter::INFO);
        state.set_max_level(Level::TRACE).unwrap();
        assert_eq!(state.get_max_level(), LevelFilter::TRACE);
    }

    #[tokio::test]
    async fn test_log_setup_routes() {
        let router = create_logs_router(state());

        let response = router
            .clone()
            .oneshot(
                Request::post("/log_setup")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"level": "debug"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["current_level"], "DEBUG");

        let response = router
            .oneshot(
                Request::post("/log_setup")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"level": "loud"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
