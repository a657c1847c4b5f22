//! Service error types with HTTP status code mapping.
//!
//! [`BookingError`] is the central error type. Each variant maps to a
//! numeric code and an HTTP status, and renders as a structured JSON body.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

/// Structured JSON error response body.
///
/// All error responses follow this shape:
/// ```json
/// {
///   "error": {
///     "code": 4001,
///     "message": "insufficient credits: 4 needed, 3 remaining",
///     "details": null
///   }
/// }
/// ```
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Numeric error code.
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
    /// Optional additional details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Server-side error enum with HTTP status code mapping.
///
/// # Error Code Ranges
///
/// | Range     | Category           | HTTP Status                   |
/// |-----------|--------------------|-------------------------------|
/// | 1000–1999 | Validation         | 400 Bad Request               |
/// | 2000–2999 | Not Found/Conflict | 404 Not Found / 409 Conflict  |
/// | 3000–3999 | Server             | 500 / 502                     |
/// | 4000–4999 | Booking rules      | 422 Unprocessable Entity      |
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BookingError {
    /// Request validation failed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The operation is not allowed in the current wizard step.
    #[error("invalid transition: {0}")]
    InvalidTransition(String),

    /// Booking with the given ID was not found.
    #[error("booking not found: {0}")]
    BookingNotFound(uuid::Uuid),

    /// Resource with the given ID was not found.
    #[error("resource not found: {0}")]
    ResourceNotFound(uuid::Uuid),

    /// Wizard session with the given ID was not found.
    #[error("wizard not found: {0}")]
    WizardNotFound(uuid::Uuid),

    /// The requested interval overlaps an existing booking.
    #[error("{0}")]
    SlotUnavailable(String),

    /// No date or no slot is selected.
    #[error("select a date and at least one slot")]
    NoSlotsSelected,

    /// The company balance does not cover the selection.
    #[error("insufficient credits: {needed} needed, {remaining} remaining")]
    InsufficientCredits {
        /// Credits the selection costs.
        needed: f64,
        /// Credits currently spendable.
        remaining: f64,
    },

    /// The booking can no longer be changed.
    #[error("booking {0} is cancelled")]
    BookingCancelled(uuid::Uuid),

    /// The backend refused a mutation. The message is passed through as is.
    #[error("{0}")]
    Rejected(String),

    /// The backend could not be read.
    #[error("fetch failed: {0}")]
    Fetch(String),

    /// Persistence layer failure.
    #[error("persistence error: {0}")]
    PersistenceError(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl BookingError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::InvalidRequest(_) => 1001,
            Self::InvalidTransition(_) => 1002,
            Self::BookingNotFound(_) => 2001,
            Self::ResourceNotFound(_) => 2002,
            Self::WizardNotFound(_) => 2003,
            Self::SlotUnavailable(_) => 2101,
            Self::Rejected(_) => 2102,
            Self::Internal(_) => 3000,
            Self::PersistenceError(_) => 3001,
            Self::Fetch(_) => 3002,
            Self::InsufficientCredits { .. } => 4001,
            Self::NoSlotsSelected => 4002,
            Self::BookingCancelled(_) => 4003,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) | Self::InvalidTransition(_) => StatusCode::BAD_REQUEST,
            Self::BookingNotFound(_) | Self::ResourceNotFound(_) | Self::WizardNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            Self::SlotUnavailable(_) | Self::Rejected(_) => StatusCode::CONFLICT,
            Self::InsufficientCredits { .. }
            | Self::NoSlotsSelected
            | Self::BookingCancelled(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Fetch(_) => StatusCode::BAD_GATEWAY,
            Self::PersistenceError(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for BookingError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(code = self.error_code(), error = %self, "request failed");
        }
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                message: self.to_string(),
                details: None,
            },
        };
        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_and_statuses_line_up() {
        let cases = [
            (BookingError::InvalidRequest(String::new()), StatusCode::BAD_REQUEST),
            (BookingError::WizardNotFound(uuid::Uuid::nil()), StatusCode::NOT_FOUND),
            (BookingError::SlotUnavailable(String::new()), StatusCode::CONFLICT),
            (BookingError::NoSlotsSelected, StatusCode::UNPROCESSABLE_ENTITY),
            (BookingError::Fetch(String::new()), StatusCode::BAD_GATEWAY),
        ];
        for (error, status) in cases {
            assert_eq!(error.status_code(), status);
        }
    }

    #[test]
    fn rejected_message_is_verbatim() {
        let error = BookingError::Rejected("Créneau indisponible".to_string());
        assert_eq!(error.to_string(), "Créneau indisponible");
    }

    #[test]
    fn into_response_sets_status() {
        let response = BookingError::InsufficientCredits {
            needed: 4.0,
            remaining: 3.0,
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
