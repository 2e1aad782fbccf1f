use crate::alarm::AlarmController;
use crate::collectors::Sample;
use crate::dashboard::{build_dashboard, Dashboard};
use crate::metrics::Metrics;
use crate::settings::{AlarmSettings, SettingsError};
use crate::state::{StartError, State as AppState, Status};
use axum::body::Body;
use axum::extract::State;
use axum::http::{header::CONTENT_TYPE, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use std::sync::Arc;
use tokio::sync::{watch, RwLock};
use tracing::info;

#[derive(Clone)]
pub struct HttpAppState {
    pub metrics: Arc<Metrics>,
    pub state: Arc<RwLock<AppState>>,
    pub alarm: AlarmController,
    pub samples: watch::Receiver<Option<Sample>>,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct ProcessRequest {
    pub enabled: bool,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct ActionResponse {
    pub ok: bool,
    pub status: Status,
    pub alarm_active: bool,
}

#[derive(Debug, Clone, serde::Serialize)]
struct ErrorResponse {
    error: String,
}

pub fn build_router(
    metrics: Arc<Metrics>,
    state: Arc<RwLock<AppState>>,
    alarm: AlarmController,
    samples: watch::Receiver<Option<Sample>>,
) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/metrics", get(metrics_handler))
        .route("/api/state", get(state_handler))
        .route("/api/processes", get(processes_handler))
        .route("/api/settings", get(get_settings).put(put_settings))
        .route("/api/process", put(put_process))
        .route("/api/monitoring/start", post(start_monitoring))
        .route("/api/alarm/stop", post(stop_alarm))
        .with_state(HttpAppState {
            metrics,
            state,
            alarm,
            samples,
        })
}

async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

async fn metrics_handler(State(state): State<HttpAppState>) -> Response {
    state.metrics.inc_scrape_count();
    match state.metrics.encode_metrics() {
        Ok(encoded) => {
            let mut response = Response::new(Body::from(encoded));
            response.headers_mut().insert(
                CONTENT_TYPE,
                HeaderValue::from_static("text/plain; version=0.0.4"),
            );
            response
        }
        Err(err) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("ошибка кодирования метрик: {err}"),
        )
            .into_response(),
    }
}

async fn state_handler(State(state): State<HttpAppState>) -> Json<Dashboard> {
    let sample = state.samples.borrow().clone();
    let guard = state.state.read().await;
    Json(build_dashboard(&guard, sample.as_ref()))
}

async fn processes_handler(State(state): State<HttpAppState>) -> Json<Vec<String>> {
    let processes = state
        .samples
        .borrow()
        .as_ref()
        .map(|s| s.processes.clone())
        .unwrap_or_default();
    Json(processes)
}

async fn get_settings(State(state): State<HttpAppState>) -> Json<AlarmSettings> {
    Json(state.state.read().await.settings.clone())
}

async fn put_settings(
    State(state): State<HttpAppState>,
    Json(settings): Json<AlarmSettings>,
) -> Response {
    let result = state.state.write().await.update_settings(settings);
    match result {
        Ok(()) => {
            info!("настройки тревог обновлены");
            Json(state.state.read().await.settings.clone()).into_response()
        }
        Err(err) => settings_error(err),
    }
}

async fn put_process(
    State(state): State<HttpAppState>,
    Json(req): Json<ProcessRequest>,
) -> Json<AlarmSettings> {
    let mut guard = state.state.write().await;
    guard.set_process(req.enabled, req.name);
    info!(
        enabled = guard.settings.process.enabled,
        process = ?guard.settings.process.name,
        "выбор процесса обновлён"
    );
    Json(guard.settings.clone())
}

async fn start_monitoring(State(state): State<HttpAppState>) -> Response {
    let (result, status, alarm_active) = {
        let mut guard = state.state.write().await;
        let result = guard.start_monitoring();
        (result, guard.status.clone(), guard.alarm_active())
    };
    let ok = result.is_ok();
    let code = match result {
        Ok(()) => {
            info!("мониторинг запущен");
            StatusCode::OK
        }
        Err(StartError::NoProcessSelected) => StatusCode::CONFLICT,
    };
    (
        code,
        Json(ActionResponse {
            ok,
            status,
            alarm_active,
        }),
    )
        .into_response()
}

async fn stop_alarm(State(state): State<HttpAppState>) -> Json<ActionResponse> {
    state.alarm.stop().await;
    let guard = state.state.read().await;
    Json(ActionResponse {
        ok: true,
        status: guard.status.clone(),
        alarm_active: guard.alarm_active(),
    })
}

fn settings_error(err: SettingsError) -> Response {
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(ErrorResponse {
            error: err.to_string(),
        }),
    )
        .into_response()
}
