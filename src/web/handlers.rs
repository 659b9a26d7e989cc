//! HTTP request handlers.

use super::AppState;
use crate::store::{MonitoredResource, NotifySettings, ResourceKind, StoreError};

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use chrono::Utc;
use serde::Deserialize;

// ============================================================================
// API: Resources
// ============================================================================

pub async fn handle_get_resources(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.store.get_resources())
}

#[derive(Debug, Deserialize)]
pub struct ResourceRequest {
    pub name: String,
    pub url: String,
    pub kind: ResourceKind,
    pub interval_seconds: u64,
    #[serde(default)]
    pub stopped: bool,
}

fn validate(req: &ResourceRequest) -> Result<(), &'static str> {
    if req.name.trim().is_empty() {
        return Err("name must not be empty");
    }
    if req.url.trim().is_empty() {
        return Err("url must not be empty");
    }
    if req.interval_seconds == 0 {
        return Err("interval_seconds must be positive");
    }
    Ok(())
}

pub async fn handle_create_resource(
    State(state): State<AppState>,
    Json(req): Json<ResourceRequest>,
) -> impl IntoResponse {
    if let Err(e) = validate(&req) {
        return (StatusCode::BAD_REQUEST, e).into_response();
    }

    let mut resource =
        MonitoredResource::new(req.name.trim(), req.url.trim(), req.kind, req.interval_seconds);
    resource.stopped = req.stopped;

    match state.store.add_resource(resource.clone()) {
        Ok(()) => {
            // Monitoring begins immediately for non-paused resources
            state.scheduler.start_resource(resource.clone()).await;
            Json(resource).into_response()
        }
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

pub async fn handle_update_resource(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<ResourceRequest>,
) -> impl IntoResponse {
    if let Err(e) = validate(&req) {
        return (StatusCode::BAD_REQUEST, e).into_response();
    }

    // Stop the timer first; it is restarted below with the new cadence.
    state.scheduler.stop_resource(&id).await;

    let updated = state.store.atomic_update(&id, |r| {
        r.name = req.name.trim().to_string();
        r.url = req.url.trim().to_string();
        r.kind = req.kind;
        r.interval_seconds = req.interval_seconds;
        r.stopped = req.stopped;
        // reconfiguration resets the failure streak and the alert latch
        r.consecutive_failures = 0;
        r.alert_sent = false;
    });

    match updated {
        Ok(outcome) => {
            state.scheduler.start_resource(outcome.current.clone()).await;
            Json(outcome.current).into_response()
        }
        Err(StoreError::NotFound) => {
            (StatusCode::NOT_FOUND, "Resource not found").into_response()
        }
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

pub async fn handle_delete_resource(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    // Timer must be gone before the record is removed.
    state.scheduler.stop_resource(&id).await;

    match state.store.delete_resource(&id) {
        Ok(_) => StatusCode::NO_CONTENT.into_response(),
        Err(StoreError::NotFound) => {
            (StatusCode::NOT_FOUND, "Resource not found").into_response()
        }
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

// ============================================================================
// API: Notification settings
// ============================================================================

pub async fn handle_get_config(State(state): State<AppState>) -> impl IntoResponse {
    // Credentials never leave the server.
    Json(state.store.settings().safe())
}

pub async fn handle_set_config(
    State(state): State<AppState>,
    Json(settings): Json<NotifySettings>,
) -> impl IntoResponse {
    match state.store.set_settings(settings) {
        Ok(()) => Json(state.store.settings().safe()).into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

pub async fn handle_test_alert(State(state): State<AppState>) -> impl IntoResponse {
    match state.dispatcher.send_test("manual test").await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => (StatusCode::BAD_REQUEST, e.to_string()).into_response(),
    }
}

// ============================================================================
// API: Mirror
// ============================================================================

pub async fn handle_mirror_publish(State(state): State<AppState>) -> impl IntoResponse {
    match state.mirror.publish_now().await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => (StatusCode::BAD_GATEWAY, e.to_string()).into_response(),
    }
}

// ============================================================================
// API: Engine control
// ============================================================================

pub async fn handle_engine_status(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.scheduler.status().await)
}

pub async fn handle_engine_start(State(state): State<AppState>) -> impl IntoResponse {
    state.scheduler.start_all().await;
    Json(state.scheduler.status().await)
}

pub async fn handle_engine_stop(State(state): State<AppState>) -> impl IntoResponse {
    state.scheduler.stop_all().await;
    Json(state.scheduler.status().await)
}

pub async fn handle_engine_restart(State(state): State<AppState>) -> impl IntoResponse {
    state.scheduler.restart().await;
    Json(state.scheduler.status().await)
}

// ============================================================================
// Health
// ============================================================================

pub async fn handle_health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "OK",
        "timestamp": Utc::now(),
    }))
}
