//! Domain events emitted after booking mutations.
//!
//! Every successful create, reschedule or cancel publishes a
//! [`BookingEvent`] through the [`super::EventBus`]. Subscribers treat it as
//! a signal to refetch the affected room's bookings.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::ids::{BookingId, CompanyId, ResourceId};

/// Domain event emitted after every booking mutation.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum BookingEvent {
    /// A booking was created through the wizard.
    BookingCreated {
        /// New booking.
        booking_id: BookingId,
        /// Reserved room.
        resource_id: ResourceId,
        /// Company charged.
        company_id: Option<CompanyId>,
        /// Start of the reservation.
        start: DateTime<Utc>,
        /// End of the reservation.
        end: DateTime<Utc>,
        /// Credits charged.
        credits_used: f64,
        /// Emission time.
        timestamp: DateTime<Utc>,
    },

    /// A booking was moved to a new interval.
    BookingRescheduled {
        /// Moved booking.
        booking_id: BookingId,
        /// Room of the booking.
        resource_id: ResourceId,
        /// Interval before the move.
        previous_start: DateTime<Utc>,
        /// Interval end before the move.
        previous_end: DateTime<Utc>,
        /// New start.
        start: DateTime<Utc>,
        /// New end.
        end: DateTime<Utc>,
        /// Emission time.
        timestamp: DateTime<Utc>,
    },

    /// A booking was cancelled.
    BookingCancelled {
        /// Cancelled booking.
        booking_id: BookingId,
        /// Room freed by the cancellation.
        resource_id: ResourceId,
        /// Company refunded.
        company_id: Option<CompanyId>,
        /// Emission time.
        timestamp: DateTime<Utc>,
    },
}

impl BookingEvent {
    /// Returns the room affected by this event.
    #[must_use]
    pub fn resource_id(&self) -> ResourceId {
        match self {
            Self::BookingCreated { resource_id, .. }
            | Self::BookingRescheduled { resource_id, .. }
            | Self::BookingCancelled { resource_id, .. } => *resource_id,
        }
    }

    /// Returns the company whose credits this event moved.
    ///
    /// `None` for reschedules, which keep the original charge.
    #[must_use]
    pub fn company_id(&self) -> Option<CompanyId> {
        match self {
            Self::BookingCreated { company_id, .. } | Self::BookingCancelled { company_id, .. } => {
                *company_id
            }
            Self::BookingRescheduled { .. } => None,
        }
    }

    /// Returns the booking affected by this event.
    #[must_use]
    pub fn booking_id(&self) -> BookingId {
        match self {
            Self::BookingCreated { booking_id, .. }
            | Self::BookingRescheduled { booking_id, .. }
            | Self::BookingCancelled { booking_id, .. } => *booking_id,
        }
    }

    /// Returns the event type as a static string slice.
    #[must_use]
    pub const fn event_type_str(&self) -> &'static str {
        match self {
            Self::BookingCreated { .. } => "booking_created",
            Self::BookingRescheduled { .. } => "booking_rescheduled",
            Self::BookingCancelled { .. } => "booking_cancelled",
        }
    }
}
