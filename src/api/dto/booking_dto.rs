//! Availability and booking DTOs.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{ResourceId, Slot};

/// Response body for `GET /resources/{id}/availability`.
#[derive(Debug, Serialize, ToSchema)]
pub struct AvailabilityResponse {
    /// Queried room.
    pub resource_id: ResourceId,
    /// Queried day.
    pub date: NaiveDate,
    /// Hours overlapped by a non-cancelled booking.
    pub unavailable_slots: Vec<Slot>,
    /// Remaining hours of the business window.
    pub available_slots: Vec<Slot>,
}

/// Request body for `PATCH /bookings/{id}`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateBookingRequest {
    /// New start.
    pub start: DateTime<Utc>,
    /// New end.
    pub end: DateTime<Utc>,
}
