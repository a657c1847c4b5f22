//! Booking handlers: read, reschedule, cancel.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::api::dto::UpdateBookingRequest;
use crate::app_state::AppState;
use crate::domain::{Booking, BookingId};
use crate::error::{BookingError, ErrorResponse};

/// `GET /bookings/:id` — Get a booking.
///
/// # Errors
///
/// Returns [`BookingError::BookingNotFound`] if the booking does not exist.
#[utoipa::path(
    get,
    path = "/api/v1/bookings/{id}",
    tag = "Bookings",
    summary = "Get a booking",
    params(
        ("id" = uuid::Uuid, Path, description = "Booking UUID"),
    ),
    responses(
        (status = 200, description = "Booking", body = Booking),
        (status = 404, description = "Booking not found", body = ErrorResponse),
    )
)]
pub async fn get_booking(
    State(state): State<AppState>,
    Path(id): Path<uuid::Uuid>,
) -> Result<impl IntoResponse, BookingError> {
    let booking = state.booking_service.booking(BookingId::from_uuid(id)).await?;
    Ok(Json(booking))
}

/// `PATCH /bookings/:id` — Move a booking.
///
/// # Errors
///
/// Returns [`BookingError`] if the booking is missing or cancelled, or the
/// new interval overlaps another booking.
#[utoipa::path(
    patch,
    path = "/api/v1/bookings/{id}",
    tag = "Bookings",
    summary = "Reschedule a booking",
    description = "Moves a booking to a new interval. Credits charged at creation are kept as they are.",
    params(
        ("id" = uuid::Uuid, Path, description = "Booking UUID"),
    ),
    request_body = UpdateBookingRequest,
    responses(
        (status = 200, description = "Booking moved", body = Booking),
        (status = 404, description = "Booking not found", body = ErrorResponse),
        (status = 409, description = "Interval unavailable", body = ErrorResponse),
        (status = 422, description = "Booking cancelled", body = ErrorResponse),
    )
)]
pub async fn update_booking(
    State(state): State<AppState>,
    Path(id): Path<uuid::Uuid>,
    Json(req): Json<UpdateBookingRequest>,
) -> Result<impl IntoResponse, BookingError> {
    let booking = state
        .booking_service
        .reschedule(BookingId::from_uuid(id), req.start, req.end)
        .await?;
    Ok(Json(booking))
}

/// `POST /bookings/:id/cancel` — Cancel a booking.
///
/// # Errors
///
/// Returns [`BookingError`] if the booking is missing or already cancelled.
#[utoipa::path(
    post,
    path = "/api/v1/bookings/{id}/cancel",
    tag = "Bookings",
    summary = "Cancel a booking",
    description = "Cancels a booking. The backend refunds its credits.",
    params(
        ("id" = uuid::Uuid, Path, description = "Booking UUID"),
    ),
    responses(
        (status = 200, description = "Booking cancelled", body = Booking),
        (status = 404, description = "Booking not found", body = ErrorResponse),
        (status = 422, description = "Already cancelled", body = ErrorResponse),
    )
)]
pub async fn cancel_booking(
    State(state): State<AppState>,
    Path(id): Path<uuid::Uuid>,
) -> Result<impl IntoResponse, BookingError> {
    let booking = state
        .booking_service
        .cancel_booking(BookingId::from_uuid(id))
        .await?;
    Ok(Json(booking))
}

/// Booking routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/bookings/{id}", get(get_booking).patch(update_booking))
        .route("/bookings/{id}/cancel", post(cancel_booking))
}
