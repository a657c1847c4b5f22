//! # coworking-booking
//!
//! REST API and WebSocket service behind the meeting-room booking surfaces of
//! a coworking back office.
//!
//! The crate holds the booking core: the hourly slot model, availability
//! computation, the three-step booking wizard, drag-to-reschedule on a weekly
//! calendar, and reconciliation of the company credit ledger. Persistence is
//! behind [`backend::BookingBackend`], with an in-memory store and
//! PostgreSQL.
//!
//! ## Architecture
//!
//! ```text
//! Clients (HTTP, WebSocket)
//!     │
//!     ├── REST Handlers (api/)
//!     ├── WS Handler (ws/)         drag gestures, booking events
//!     │
//!     ├── WizardService (service/)
//!     ├── BookingService (service/)
//!     ├── EventBus (domain/)
//!     │
//!     ├── Slot / Availability / Ledger (domain/)
//!     │
//!     └── Backend (backend/): in-memory or PostgreSQL
//! ```

pub mod api;
pub mod app_state;
pub mod backend;
pub mod config;
pub mod domain;
pub mod error;
pub mod service;
pub mod ws;

use axum::Router;
use axum::http::StatusCode;
use axum::routing::get;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use app_state::AppState;

/// Builds the complete application: REST routes, `/ws`, and the HTTP
/// middleware stack.
pub fn build_app(state: AppState) -> Router {
    let request_timeout = state.config.request_timeout;
    Router::new()
        .merge(api::build_router())
        .route("/ws", get(ws::handler::ws_handler))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            request_timeout,
        ))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
