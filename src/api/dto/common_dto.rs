//! Shared DTO types used across multiple endpoints.

use chrono::NaiveDate;
use serde::Deserialize;
use utoipa::IntoParams;

/// `?date=` query parameter.
#[derive(Debug, Clone, Deserialize, IntoParams)]
pub struct DateQuery {
    /// Local calendar day, `YYYY-MM-DD`.
    pub date: NaiveDate,
}

/// Query parameters of the availability endpoint.
#[derive(Debug, Clone, Deserialize, IntoParams)]
pub struct AvailabilityQuery {
    /// Local calendar day, `YYYY-MM-DD`.
    pub date: NaiveDate,
    /// Booking being edited; its own hours are reported as free.
    #[serde(default)]
    pub exclude_booking: Option<uuid::Uuid>,
}
