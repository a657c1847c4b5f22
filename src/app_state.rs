//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::backend::Backend;
use crate::config::BookingConfig;
use crate::domain::EventBus;
use crate::service::{BookingService, WizardService};

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Booking service for availability, mutations and the ledger.
    pub booking_service: Arc<BookingService<Backend>>,
    /// Wizard sessions.
    pub wizard_service: Arc<WizardService<Backend>>,
    /// Event bus for WebSocket subscriptions.
    pub event_bus: EventBus,
    /// Loaded configuration.
    pub config: Arc<BookingConfig>,
}

impl AppState {
    /// Wires the services over `backend`.
    #[must_use]
    pub fn new(backend: Backend, config: BookingConfig) -> Self {
        let event_bus = EventBus::new(config.event_bus_capacity);
        let booking_service = Arc::new(BookingService::new(
            backend,
            event_bus.clone(),
            config.time_zone,
            config.business_hours,
            config.ledger_fetch_limit,
        ));
        let wizard_service = Arc::new(WizardService::new(
            Arc::clone(&booking_service),
            config.wizard_success_delay,
        ));
        Self {
            booking_service,
            wizard_service,
            event_bus,
            config: Arc::new(config),
        }
    }
}
