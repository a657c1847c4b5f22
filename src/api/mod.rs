//! REST API layer: route handlers, DTOs, and router composition.
//!
//! Resource endpoints are mounted under `/api/v1`. The OpenAPI document is
//! served at `/api-docs/openapi.json`, with Swagger UI at `/swagger-ui`
//! when the `swagger-ui` feature is enabled.

pub mod dto;
pub mod handlers;

use axum::Router;
use utoipa::OpenApi;

use crate::app_state::AppState;

/// OpenAPI document of the REST surface.
#[derive(Debug, OpenApi)]
#[openapi(
    info(title = "coworking-booking", description = "Meeting-room booking, availability and credit ledger API"),
    paths(
        handlers::system::health_handler,
        handlers::system::business_hours_handler,
        handlers::availability::resource_availability,
        handlers::availability::site_planning,
        handlers::booking::get_booking,
        handlers::booking::update_booking,
        handlers::booking::cancel_booking,
        handlers::ledger::get_credits,
        handlers::ledger::get_ledger,
        handlers::wizard::create_wizard,
        handlers::wizard::get_wizard,
        handlers::wizard::delete_wizard,
        handlers::wizard::select_site,
        handlers::wizard::select_date,
        handlers::wizard::slot_click,
        handlers::wizard::set_slots,
        handlers::wizard::next_step,
        handlers::wizard::back_step,
        handlers::wizard::cancel_wizard,
        handlers::wizard::confirm,
        handlers::wizard::wizard_planning,
    ),
    tags(
        (name = "System", description = "Health and calendar configuration"),
        (name = "Availability", description = "Room availability and planning grids"),
        (name = "Bookings", description = "Booking reads and mutations"),
        (name = "Credits", description = "Balances and the reconciled ledger"),
        (name = "Wizards", description = "Server-held booking wizard sessions"),
    )
)]
pub struct ApiDoc;

#[cfg(not(feature = "swagger-ui"))]
async fn openapi_json() -> axum::Json<utoipa::openapi::OpenApi> {
    axum::Json(ApiDoc::openapi())
}

/// Builds the complete API router with all REST endpoints.
pub fn build_router() -> Router<AppState> {
    let router = Router::new()
        .nest("/api/v1", handlers::routes())
        .merge(handlers::system::routes());

    #[cfg(feature = "swagger-ui")]
    let router = router.merge(
        utoipa_swagger_ui::SwaggerUi::new("/swagger-ui")
            .url("/api-docs/openapi.json", ApiDoc::openapi()),
    );

    #[cfg(not(feature = "swagger-ui"))]
    let router = router.route("/api-docs/openapi.json", axum::routing::get(openapi_json));

    router
}
