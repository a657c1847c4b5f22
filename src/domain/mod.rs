//! Domain layer: booking model, slot math, and the booking state machines.
//!
//! Everything under this module except [`EventBus`] and [`WizardRegistry`]
//! is pure: slot utilities, availability, the booking wizard, the drag
//! controller and the credit ledger take snapshots and return derived values.

pub mod availability;
pub mod booking;
pub mod booking_event;
pub mod drag;
pub mod event_bus;
pub mod ids;
pub mod ledger;
pub mod slot;
pub mod wizard;
pub mod wizard_registry;

pub use availability::{EditingBooking, PlanningGrid, unavailable_slots};
pub use booking::{
    Booking, BookingStatus, CreditBalance, NewBooking, Resource, ResourceStatus, ResourceType,
    RoomBooking,
};
pub use booking_event::BookingEvent;
pub use drag::{DragController, DragOutcome, WeekGrid};
pub use event_bus::EventBus;
pub use ids::{BookingId, CompanyId, ResourceId, SiteId, TransactionId, UserId, WizardId};
pub use ledger::{CreditMovement, CreditTransaction, HistoricalBooking, TransactionType, reconcile};
pub use slot::{BusinessHours, Slot};
pub use wizard::{BookingWizard, SessionContext, WizardPhase, WizardView};
pub use wizard_registry::{WizardEntry, WizardRegistry};
