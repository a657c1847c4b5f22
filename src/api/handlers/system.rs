//! System endpoints: health check and calendar configuration.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde::Serialize;
use utoipa::ToSchema;

use crate::app_state::AppState;
use crate::domain::{BusinessHours, Slot};

/// Health check response.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    status: String,
    timestamp: String,
    version: String,
}

/// `GET /health` — Service health status.
#[utoipa::path(
    get,
    path = "/health",
    tag = "System",
    summary = "Health check",
    description = "Returns service health status, version, and current timestamp.",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
    )
)]
pub async fn health_handler() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "healthy".to_string(),
            timestamp: Utc::now().to_rfc3339(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }),
    )
}

/// Calendar settings a client needs to draw the grids.
#[derive(Debug, Serialize, ToSchema)]
pub struct BusinessHoursResponse {
    business_hours: BusinessHours,
    slots: Vec<Slot>,
    time_zone: String,
    hour_height_px: f64,
    snap_minutes: u32,
    drag_threshold_px: f64,
}

/// `GET /config/business-hours` — Calendar configuration.
#[utoipa::path(
    get,
    path = "/config/business-hours",
    tag = "System",
    summary = "Calendar configuration",
    description = "Returns the bookable window, its slots, the viewer time zone and the weekly grid geometry.",
    responses(
        (status = 200, description = "Calendar configuration", body = BusinessHoursResponse),
    )
)]
pub async fn business_hours_handler(State(state): State<AppState>) -> impl IntoResponse {
    let config = &state.config;
    (
        StatusCode::OK,
        Json(BusinessHoursResponse {
            business_hours: config.business_hours,
            slots: config.business_hours.slots().collect(),
            time_zone: config.time_zone.name().to_string(),
            hour_height_px: config.hour_height_px,
            snap_minutes: config.snap_minutes,
            drag_threshold_px: config.drag_threshold_px,
        }),
    )
}

/// System routes mounted at the root level (not under /api/v1).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_handler))
        .route("/config/business-hours", get(business_hours_handler))
}
