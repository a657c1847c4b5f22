//! Credit handlers: balance and reconciled ledger.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};

use crate::api::dto::LedgerResponse;
use crate::app_state::AppState;
use crate::domain::{CompanyId, CreditBalance};
use crate::error::{BookingError, ErrorResponse};

/// `GET /companies/:id/credits` — Current balance.
///
/// # Errors
///
/// Returns [`BookingError`] if the balance cannot be read.
#[utoipa::path(
    get,
    path = "/api/v1/companies/{id}/credits",
    tag = "Credits",
    summary = "Company credit balance",
    params(
        ("id" = uuid::Uuid, Path, description = "Company UUID"),
    ),
    responses(
        (status = 200, description = "Balance", body = CreditBalance),
        (status = 500, description = "Backend failure", body = ErrorResponse),
    )
)]
pub async fn get_credits(
    State(state): State<AppState>,
    Path(id): Path<uuid::Uuid>,
) -> Result<impl IntoResponse, BookingError> {
    let balance = state
        .booking_service
        .credit_balance(Some(CompanyId::from_uuid(id)))
        .await?;
    Ok(Json(balance))
}

/// `GET /companies/:id/ledger` — Reconciled credit history.
///
/// # Errors
///
/// Returns [`BookingError`] if any source cannot be read.
#[utoipa::path(
    get,
    path = "/api/v1/companies/{id}/ledger",
    tag = "Credits",
    summary = "Company credit ledger",
    description = "Merges credit transactions with consumption derived from older bookings, newest first, with a running balance ending at the current total.",
    params(
        ("id" = uuid::Uuid, Path, description = "Company UUID"),
    ),
    responses(
        (status = 200, description = "Ledger", body = LedgerResponse),
        (status = 500, description = "Backend failure", body = ErrorResponse),
    )
)]
pub async fn get_ledger(
    State(state): State<AppState>,
    Path(id): Path<uuid::Uuid>,
) -> Result<impl IntoResponse, BookingError> {
    let company_id = CompanyId::from_uuid(id);
    let movements = state.booking_service.ledger(company_id).await?;
    let balance = state
        .booking_service
        .credit_balance(Some(company_id))
        .await?;
    Ok(Json(LedgerResponse {
        company_id,
        balance,
        movements,
    }))
}

/// Credit routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/companies/{id}/credits", get(get_credits))
        .route("/companies/{id}/ledger", get(get_ledger))
}
