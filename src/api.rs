use crate::dom::escape;
use crate::exchange::ChatMessage;
use crate::loader::{self, MountPlan};
use crate::server::AppState;
use crate::settings::{WidgetConfig, WidgetSettings};
use axum::Json;
use axum::extract::{Query, State};
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{Html, IntoResponse, Response};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

const SDK_FILE: &str = "pounce-widget.js";

pub async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "utc": chrono::Utc::now().to_rfc3339(),
    }))
}

pub async fn serve_stylesheet(State(state): State<AppState>) -> impl IntoResponse {
    let css = loader::load_stylesheet(&state.config.assets_root).await;
    with_content_type(css, "text/css; charset=utf-8")
}

pub async fn serve_sdk(State(state): State<AppState>) -> impl IntoResponse {
    let script = match tokio::fs::read_to_string(state.config.assets_root.join(SDK_FILE)).await {
        Ok(script) => script,
        Err(_) => crate::sdk::sdk_script(),
    };
    with_content_type(script, "application/javascript")
}

fn with_content_type(body: String, content_type: &'static str) -> Response {
    let mut resp = Response::new(body.into());
    resp.headers_mut()
        .insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
    resp
}

#[derive(Debug, Deserialize)]
pub struct MountRequest {
    #[serde(default)]
    pub config: WidgetConfig,
    #[serde(default)]
    pub path: String,
}

pub async fn post_mount(
    State(state): State<AppState>,
    Json(body): Json<MountRequest>,
) -> impl IntoResponse {
    let settings = WidgetSettings::resolve(&body.config.merged_over(&state.config.widget));
    let path = loader::normalize_path(&body.path);
    match MountPlan::for_page(settings, &path) {
        Some(plan) => Json(plan).into_response(),
        None => {
            debug!(%path, "mount suppressed by exclusion list");
            StatusCode::NO_CONTENT.into_response()
        }
    }
}

pub async fn post_chat(
    State(state): State<AppState>,
    Json(body): Json<ChatMessage>,
) -> impl IntoResponse {
    match state.relay.relay(&body.message).await {
        Ok(reply) => Json(reply).into_response(),
        Err(err) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response(),
    }
}

#[derive(Debug, Deserialize)]
pub struct IframeQuery {
    pub path: Option<String>,
}

/// Minimal host page with the widget mounted server-side.
pub async fn iframe(
    State(state): State<AppState>,
    Query(query): Query<IframeQuery>,
) -> impl IntoResponse {
    let settings = WidgetSettings::resolve(&state.config.widget);
    let path = loader::normalize_path(query.path.as_deref().unwrap_or("/iframe"));
    let script = if settings.exclusions.matches(&path) {
        ""
    } else {
        "<script src=\"/widget.js\" defer></script>"
    };
    let page = format!(
        "<!doctype html><html><head><meta charset=\"utf-8\"><title>{}</title></head><body>{script}</body></html>",
        escape(&settings.header_text)
    );
    let css = loader::load_stylesheet(&state.config.assets_root).await;
    match loader::mount_into_page(&page, settings, &path, Some(&css)) {
        Ok(html) => Html(html).into_response(),
        Err(err) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response(),
    }
}
