//! Service layer: business logic orchestration.
//!
//! [`BookingService`] runs availability, bookings and the ledger against a
//! [`crate::backend::BookingBackend`] and emits events through the
//! [`super::domain::EventBus`]. [`WizardService`] drives wizard sessions on
//! top of it.

pub mod booking_service;
pub mod wizard_service;

pub use booking_service::{BookingService, DragCommit};
pub use wizard_service::{ConfirmOutcome, WizardService};
