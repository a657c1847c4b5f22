//! Availability handlers: one room's hours and a site's planning grid.

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;

use crate::api::dto::{AvailabilityQuery, AvailabilityResponse, DateQuery};
use crate::app_state::AppState;
use crate::domain::availability::available_slots;
use crate::domain::{BookingId, PlanningGrid, ResourceId, SiteId};
use crate::error::{BookingError, ErrorResponse};

/// `GET /resources/:id/availability` — Unavailable hours of a room.
///
/// # Errors
///
/// Returns [`BookingError`] if the bookings cannot be read or the edited
/// booking does not exist.
#[utoipa::path(
    get,
    path = "/api/v1/resources/{id}/availability",
    tag = "Availability",
    summary = "Room availability for a day",
    description = "Returns the hours of the business window overlapped by a non-cancelled booking. With `exclude_booking`, that booking's own hours are reported as free.",
    params(
        ("id" = uuid::Uuid, Path, description = "Resource UUID"),
        AvailabilityQuery,
    ),
    responses(
        (status = 200, description = "Availability", body = AvailabilityResponse),
        (status = 404, description = "Edited booking not found", body = ErrorResponse),
        (status = 400, description = "Edited booking is on another room", body = ErrorResponse),
    )
)]
pub async fn resource_availability(
    State(state): State<AppState>,
    Path(id): Path<uuid::Uuid>,
    Query(query): Query<AvailabilityQuery>,
) -> Result<impl IntoResponse, BookingError> {
    let resource_id = ResourceId::from_uuid(id);
    let unavailable = state
        .booking_service
        .unavailable_slots(
            resource_id,
            query.date,
            query.exclude_booking.map(BookingId::from_uuid),
        )
        .await?;
    let available = available_slots(&unavailable, state.booking_service.business_hours());

    Ok(Json(AvailabilityResponse {
        resource_id,
        date: query.date,
        unavailable_slots: unavailable.into_iter().collect(),
        available_slots: available,
    }))
}

/// `GET /sites/:id/planning` — Planning grid of a site.
///
/// # Errors
///
/// Returns [`BookingError`] if rooms or bookings cannot be read.
#[utoipa::path(
    get,
    path = "/api/v1/sites/{id}/planning",
    tag = "Availability",
    summary = "Site planning grid",
    description = "Returns one row per available meeting room with a free/booked/past state for every business hour of the day.",
    params(
        ("id" = uuid::Uuid, Path, description = "Site UUID"),
        DateQuery,
    ),
    responses(
        (status = 200, description = "Planning grid", body = PlanningGrid),
    )
)]
pub async fn site_planning(
    State(state): State<AppState>,
    Path(id): Path<uuid::Uuid>,
    Query(query): Query<DateQuery>,
) -> Result<impl IntoResponse, BookingError> {
    let grid = state
        .booking_service
        .planning_grid(SiteId::from_uuid(id), query.date, Utc::now())
        .await?;
    Ok(Json(grid))
}

/// Availability routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/resources/{id}/availability", get(resource_availability))
        .route("/sites/{id}/planning", get(site_planning))
}
