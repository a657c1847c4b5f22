//! Wizard session handlers.
//!
//! Validation failures of `next` and backend refusals of `confirm` are part
//! of the wizard's state and come back as 200 with `error` set. Only
//! transitions that are not allowed from the current step are HTTP errors.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use chrono::Utc;

use crate::api::dto::{
    CreateWizardRequest, CreateWizardResponse, SelectDateRequest, SelectSiteRequest,
    SetSlotsRequest, SlotClickRequest,
};
use crate::app_state::AppState;
use crate::domain::{PlanningGrid, WizardId, WizardView};
use crate::error::{BookingError, ErrorResponse};
use crate::service::ConfirmOutcome;

/// `POST /wizards` — Open a booking wizard.
///
/// # Errors
///
/// Returns [`BookingError`] if the balance cannot be read.
#[utoipa::path(
    post,
    path = "/api/v1/wizards",
    tag = "Wizards",
    summary = "Open a booking wizard",
    description = "Creates a wizard session in the planning step, optionally preselecting a site and a day.",
    request_body = CreateWizardRequest,
    responses(
        (status = 201, description = "Wizard opened", body = CreateWizardResponse),
        (status = 400, description = "Invalid request", body = ErrorResponse),
    )
)]
pub async fn create_wizard(
    State(state): State<AppState>,
    Json(req): Json<CreateWizardRequest>,
) -> Result<impl IntoResponse, BookingError> {
    let (wizard_id, wizard) = state
        .wizard_service
        .open(req.user_id, req.company_id, req.modal, req.site_id, req.date)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(CreateWizardResponse { wizard_id, wizard }),
    ))
}

/// `GET /wizards/:id` — Current wizard view.
///
/// # Errors
///
/// Returns [`BookingError::WizardNotFound`] for an unknown session.
#[utoipa::path(
    get,
    path = "/api/v1/wizards/{id}",
    tag = "Wizards",
    summary = "Get wizard view",
    params(("id" = uuid::Uuid, Path, description = "Wizard UUID")),
    responses(
        (status = 200, description = "Wizard view", body = WizardView),
        (status = 404, description = "Wizard not found", body = ErrorResponse),
    )
)]
pub async fn get_wizard(
    State(state): State<AppState>,
    Path(id): Path<uuid::Uuid>,
) -> Result<impl IntoResponse, BookingError> {
    let view = state.wizard_service.view(WizardId::from_uuid(id)).await?;
    Ok(Json(view))
}

/// `DELETE /wizards/:id` — Close a wizard.
///
/// # Errors
///
/// Returns [`BookingError::WizardNotFound`] for an unknown session.
#[utoipa::path(
    delete,
    path = "/api/v1/wizards/{id}",
    tag = "Wizards",
    summary = "Close a wizard",
    params(("id" = uuid::Uuid, Path, description = "Wizard UUID")),
    responses(
        (status = 204, description = "Wizard closed"),
        (status = 404, description = "Wizard not found", body = ErrorResponse),
    )
)]
pub async fn delete_wizard(
    State(state): State<AppState>,
    Path(id): Path<uuid::Uuid>,
) -> Result<impl IntoResponse, BookingError> {
    state.wizard_service.close(WizardId::from_uuid(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `PUT /wizards/:id/site` — Select the site.
///
/// # Errors
///
/// Returns [`BookingError::WizardNotFound`] for an unknown session.
#[utoipa::path(
    put,
    path = "/api/v1/wizards/{id}/site",
    tag = "Wizards",
    summary = "Select site",
    description = "Changing the site outside the planning step clears the selection.",
    params(("id" = uuid::Uuid, Path, description = "Wizard UUID")),
    request_body = SelectSiteRequest,
    responses(
        (status = 200, description = "Wizard view", body = WizardView),
        (status = 404, description = "Wizard not found", body = ErrorResponse),
    )
)]
pub async fn select_site(
    State(state): State<AppState>,
    Path(id): Path<uuid::Uuid>,
    Json(req): Json<SelectSiteRequest>,
) -> Result<impl IntoResponse, BookingError> {
    let view = state
        .wizard_service
        .select_site(WizardId::from_uuid(id), req.site_id)
        .await?;
    Ok(Json(view))
}

/// `PUT /wizards/:id/date` — Select the day.
///
/// # Errors
///
/// Returns [`BookingError::WizardNotFound`] for an unknown session.
#[utoipa::path(
    put,
    path = "/api/v1/wizards/{id}/date",
    tag = "Wizards",
    summary = "Select date",
    description = "Changing the day outside the planning step clears the selection.",
    params(("id" = uuid::Uuid, Path, description = "Wizard UUID")),
    request_body = SelectDateRequest,
    responses(
        (status = 200, description = "Wizard view", body = WizardView),
        (status = 404, description = "Wizard not found", body = ErrorResponse),
    )
)]
pub async fn select_date(
    State(state): State<AppState>,
    Path(id): Path<uuid::Uuid>,
    Json(req): Json<SelectDateRequest>,
) -> Result<impl IntoResponse, BookingError> {
    let view = state
        .wizard_service
        .select_date(WizardId::from_uuid(id), req.date)
        .await?;
    Ok(Json(view))
}

/// `POST /wizards/:id/slot-click` — Pick a planning cell.
///
/// # Errors
///
/// Returns [`BookingError`] outside the planning step, for a room that
/// cannot be booked, for a slot that already started, or if availability
/// cannot be read.
#[utoipa::path(
    post,
    path = "/api/v1/wizards/{id}/slot-click",
    tag = "Wizards",
    summary = "Pick a planning cell",
    params(("id" = uuid::Uuid, Path, description = "Wizard UUID")),
    request_body = SlotClickRequest,
    responses(
        (status = 200, description = "Wizard view", body = WizardView),
        (status = 400, description = "Not in planning or room not bookable", body = ErrorResponse),
        (status = 404, description = "Wizard or room not found", body = ErrorResponse),
        (status = 409, description = "Slot already started", body = ErrorResponse),
    )
)]
pub async fn slot_click(
    State(state): State<AppState>,
    Path(id): Path<uuid::Uuid>,
    Json(req): Json<SlotClickRequest>,
) -> Result<impl IntoResponse, BookingError> {
    let view = state
        .wizard_service
        .slot_click(WizardId::from_uuid(id), req.resource_id, req.slot)
        .await?;
    Ok(Json(view))
}

/// `PUT /wizards/:id/slots` — Adjust the selected hours.
///
/// # Errors
///
/// Returns [`BookingError`] outside the slots step, for an invalid range or
/// if an hour of the range is taken.
#[utoipa::path(
    put,
    path = "/api/v1/wizards/{id}/slots",
    tag = "Wizards",
    summary = "Set selected hours",
    params(("id" = uuid::Uuid, Path, description = "Wizard UUID")),
    request_body = SetSlotsRequest,
    responses(
        (status = 200, description = "Wizard view", body = WizardView),
        (status = 400, description = "Invalid range", body = ErrorResponse),
        (status = 409, description = "Hour already booked", body = ErrorResponse),
    )
)]
pub async fn set_slots(
    State(state): State<AppState>,
    Path(id): Path<uuid::Uuid>,
    Json(req): Json<SetSlotsRequest>,
) -> Result<impl IntoResponse, BookingError> {
    let view = state
        .wizard_service
        .set_range(WizardId::from_uuid(id), req.start, req.end_hour)
        .await?;
    Ok(Json(view))
}

/// `POST /wizards/:id/next` — Continue to confirmation.
///
/// # Errors
///
/// Returns [`BookingError::InvalidTransition`] outside the slots step.
#[utoipa::path(
    post,
    path = "/api/v1/wizards/{id}/next",
    tag = "Wizards",
    summary = "Continue to confirmation",
    description = "Moves to the confirm step when a date, at least one hour and enough credits are present. Otherwise the view comes back with `error` set.",
    params(("id" = uuid::Uuid, Path, description = "Wizard UUID")),
    responses(
        (status = 200, description = "Wizard view", body = WizardView),
        (status = 400, description = "Not in the slots step", body = ErrorResponse),
    )
)]
pub async fn next_step(
    State(state): State<AppState>,
    Path(id): Path<uuid::Uuid>,
) -> Result<impl IntoResponse, BookingError> {
    let view = state.wizard_service.next(WizardId::from_uuid(id)).await?;
    Ok(Json(view))
}

/// `POST /wizards/:id/back` — Step back.
///
/// # Errors
///
/// Returns [`BookingError::WizardNotFound`] for an unknown session.
#[utoipa::path(
    post,
    path = "/api/v1/wizards/{id}/back",
    tag = "Wizards",
    summary = "Step back",
    params(("id" = uuid::Uuid, Path, description = "Wizard UUID")),
    responses(
        (status = 200, description = "Wizard view", body = WizardView),
        (status = 404, description = "Wizard not found", body = ErrorResponse),
    )
)]
pub async fn back_step(
    State(state): State<AppState>,
    Path(id): Path<uuid::Uuid>,
) -> Result<impl IntoResponse, BookingError> {
    let view = state.wizard_service.back(WizardId::from_uuid(id)).await?;
    Ok(Json(view))
}

/// `POST /wizards/:id/cancel` — Abandon the selection.
///
/// # Errors
///
/// Returns [`BookingError::WizardNotFound`] for an unknown session.
#[utoipa::path(
    post,
    path = "/api/v1/wizards/{id}/cancel",
    tag = "Wizards",
    summary = "Abandon the selection",
    params(("id" = uuid::Uuid, Path, description = "Wizard UUID")),
    responses(
        (status = 200, description = "Wizard view", body = WizardView),
        (status = 404, description = "Wizard not found", body = ErrorResponse),
    )
)]
pub async fn cancel_wizard(
    State(state): State<AppState>,
    Path(id): Path<uuid::Uuid>,
) -> Result<impl IntoResponse, BookingError> {
    let view = state.wizard_service.cancel(WizardId::from_uuid(id)).await?;
    Ok(Json(view))
}

/// `POST /wizards/:id/confirm` — Book the selection.
///
/// # Errors
///
/// Returns [`BookingError::InvalidTransition`] outside the confirm step or
/// while another confirmation is running.
#[utoipa::path(
    post,
    path = "/api/v1/wizards/{id}/confirm",
    tag = "Wizards",
    summary = "Confirm the booking",
    description = "Creates the booking. A backend refusal is returned in `wizard.error` with the step unchanged.",
    params(("id" = uuid::Uuid, Path, description = "Wizard UUID")),
    responses(
        (status = 200, description = "Confirmation outcome", body = ConfirmOutcome),
        (status = 400, description = "Not in the confirm step", body = ErrorResponse),
    )
)]
pub async fn confirm(
    State(state): State<AppState>,
    Path(id): Path<uuid::Uuid>,
) -> Result<impl IntoResponse, BookingError> {
    let outcome = state.wizard_service.confirm(WizardId::from_uuid(id)).await?;
    Ok(Json(outcome))
}

/// `GET /wizards/:id/planning` — Planning grid of the session's site and day.
///
/// # Errors
///
/// Returns [`BookingError::InvalidRequest`] until a site and a day are
/// selected.
#[utoipa::path(
    get,
    path = "/api/v1/wizards/{id}/planning",
    tag = "Wizards",
    summary = "Wizard planning grid",
    params(("id" = uuid::Uuid, Path, description = "Wizard UUID")),
    responses(
        (status = 200, description = "Planning grid", body = PlanningGrid),
        (status = 400, description = "Site or date missing", body = ErrorResponse),
    )
)]
pub async fn wizard_planning(
    State(state): State<AppState>,
    Path(id): Path<uuid::Uuid>,
) -> Result<impl IntoResponse, BookingError> {
    let grid = state
        .wizard_service
        .planning(WizardId::from_uuid(id), Utc::now())
        .await?;
    Ok(Json(grid))
}

/// Wizard routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/wizards", post(create_wizard))
        .route("/wizards/{id}", get(get_wizard).delete(delete_wizard))
        .route("/wizards/{id}/site", put(select_site))
        .route("/wizards/{id}/date", put(select_date))
        .route("/wizards/{id}/slots", put(set_slots))
        .route("/wizards/{id}/slot-click", post(slot_click))
        .route("/wizards/{id}/next", post(next_step))
        .route("/wizards/{id}/back", post(back_step))
        .route("/wizards/{id}/cancel", post(cancel_wizard))
        .route("/wizards/{id}/confirm", post(confirm))
        .route("/wizards/{id}/planning", get(wizard_planning))
}
