// erasure/src/server.rs
//
// HTTP front end called by the catalog: manifest, assets, logs and action execution.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use erasure_core::application::{ServiceProvider, execute_action};
use erasure_core::domain::{ActionRequest, ActionResponse, DomainError};
use erasure_core::infrastructure::config::AppConfig;

pub const ICON_FILE: &str = "thales-icon.png";
pub const SIDE_BAR_ICON_FILE: &str = "thales-sidebar-icon.png";

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<dyn ServiceProvider>,
}

impl AppState {
    pub fn new(config: AppConfig, services: Arc<dyn ServiceProvider>) -> Self {
        Self {
            config: Arc::new(config),
            services,
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/api/manifest", get(manifest))
        .route("/api/assets/icon", get(icon))
        .route("/api/assets/sideBarIcon", get(side_bar_icon))
        .route("/api/logs", get(logs))
        .route("/api/execute", post(execute))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn home() -> &'static str {
    "Application up and running!"
}

async fn manifest(State(state): State<AppState>) -> Result<Json<Value>, (StatusCode, String)> {
    let path = &state.config.server.manifest_path;
    let content = tokio::fs::read_to_string(path).await.map_err(|e| {
        error!(path = ?path, error = %e, "Cannot read manifest");
        (StatusCode::NOT_FOUND, format!("Manifest {} not found", path.display()))
    })?;
    let manifest = serde_json::from_str(&content).map_err(|e| {
        error!(path = ?path, error = %e, "Manifest is not valid JSON");
        (StatusCode::INTERNAL_SERVER_ERROR, format!("Invalid manifest: {}", e))
    })?;
    Ok(Json(manifest))
}

async fn icon(State(state): State<AppState>) -> impl IntoResponse {
    png(&state.config.server.assets_dir.join(ICON_FILE)).await
}

async fn side_bar_icon(State(state): State<AppState>) -> impl IntoResponse {
    png(&state.config.server.assets_dir.join(SIDE_BAR_ICON_FILE)).await
}

async fn png(path: &Path) -> Result<([(header::HeaderName, &'static str); 1], Vec<u8>), StatusCode> {
    let bytes = tokio::fs::read(path).await.map_err(|e| {
        error!(path = ?path, error = %e, "Cannot read asset");
        StatusCode::NOT_FOUND
    })?;
    Ok(([(header::CONTENT_TYPE, "image/png")], bytes))
}

async fn logs(State(state): State<AppState>) -> String {
    let path = &state.config.server.log_path;
    tokio::fs::read_to_string(path)
        .await
        .unwrap_or_else(|_| format!("File {} does not exist", path.display()))
}

/// Always 200: failures are reported in the body's `statusEnum`.
/// The body is decoded here rather than by the `Json` extractor, whose rejections are 4xx.
async fn execute(State(state): State<AppState>, body: Bytes) -> impl IntoResponse {
    let request = match parse_request(&body) {
        Ok(request) => request,
        Err(response) => {
            warn!(execution_id = ?response.execution_id, reason = %response.message, "Malformed action request");
            return (StatusCode::OK, Json(response));
        }
    };
    info!(action = %request.action_name, execution_id = ?request.execution_id, "Action triggered");
    let response = execute_action(&request, state.services.as_ref(), &state.config).await;
    (StatusCode::OK, Json(response))
}

/// A body that is not JSON, or not an action request, becomes an ERROR result.
/// The execution id is kept whenever the body carries a readable one.
fn parse_request(body: &[u8]) -> Result<ActionRequest, ActionResponse> {
    let value: Value = serde_json::from_slice(body).map_err(|e| invalid_request(None, &e))?;
    let execution_id = value
        .get("executionId")
        .and_then(Value::as_str)
        .map(str::to_string);
    serde_json::from_value(value).map_err(|e| invalid_request(execution_id, &e))
}

fn invalid_request(execution_id: Option<String>, err: &serde_json::Error) -> ActionResponse {
    ActionResponse::rejected(
        execution_id,
        &DomainError::Configuration(format!("invalid action request: {err}")),
    )
}
