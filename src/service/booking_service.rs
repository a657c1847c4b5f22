//! Booking service: availability, mutations and the credit ledger.

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, NaiveDate, NaiveTime, TimeDelta, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use utoipa::ToSchema;

use crate::backend::BookingBackend;
use crate::domain::availability::unavailable_slots;
use crate::domain::drag::DraggableBooking;
use crate::domain::ledger::reconcile;
use crate::domain::wizard::to_utc;
use crate::domain::{
    Booking, BookingEvent, BookingId, BusinessHours, CompanyId, CreditBalance, CreditMovement,
    DragOutcome, EditingBooking, EventBus, NewBooking, PlanningGrid, Resource, ResourceId, SiteId,
    Slot,
};
use crate::error::BookingError;

/// What happened to a released drag gesture.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum DragCommit {
    /// Nothing to persist.
    Skipped,
    /// The booking was moved.
    Rescheduled {
        /// Updated booking.
        booking: Booking,
    },
    /// The backend refused the move. The calendar keeps the old position.
    Failed {
        /// Backend message.
        message: String,
    },
}

/// Orchestration layer for booking reads and mutations.
///
/// Every mutation follows the pattern: call the backend → emit a
/// [`BookingEvent`] → log → return the result. Nothing is cached, so the
/// next read after an event sees the backend's state.
#[derive(Debug)]
pub struct BookingService<B> {
    backend: B,
    event_bus: EventBus,
    time_zone: Tz,
    hours: BusinessHours,
    ledger_limit: u32,
}

impl<B: BookingBackend> BookingService<B> {
    /// Creates a new `BookingService`.
    #[must_use]
    pub fn new(
        backend: B,
        event_bus: EventBus,
        time_zone: Tz,
        hours: BusinessHours,
        ledger_limit: u32,
    ) -> Self {
        Self {
            backend,
            event_bus,
            time_zone,
            hours,
            ledger_limit,
        }
    }

    /// Returns a reference to the backend.
    #[must_use]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Returns a reference to the inner [`EventBus`].
    #[must_use]
    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    /// Viewer time zone.
    #[must_use]
    pub const fn time_zone(&self) -> Tz {
        self.time_zone
    }

    /// Bookable window.
    #[must_use]
    pub const fn business_hours(&self) -> BusinessHours {
        self.hours
    }

    /// UTC bounds of the local calendar day `date`.
    fn day_bounds(&self, date: NaiveDate) -> Result<(DateTime<Utc>, DateTime<Utc>), BookingError> {
        let start = to_utc(&self.time_zone, date.and_time(NaiveTime::MIN))?;
        let end = to_utc(
            &self.time_zone,
            (date + TimeDelta::days(1)).and_time(NaiveTime::MIN),
        )?;
        Ok((start, end))
    }

    /// Loads one resource.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::ResourceNotFound`] for an unknown id.
    pub async fn resource(&self, id: ResourceId) -> Result<Resource, BookingError> {
        self.backend.resource(id).await
    }

    /// Loads one booking.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::BookingNotFound`] for an unknown id.
    pub async fn booking(&self, id: BookingId) -> Result<Booking, BookingError> {
        self.backend.booking(id).await
    }

    /// Hours of `date` at which `resource_id` cannot be booked.
    ///
    /// With `editing`, that booking's own hours are not reported.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::InvalidRequest`] if `editing` is a booking of
    /// another room, or a [`BookingError`] if the backend cannot be read.
    pub async fn unavailable_slots(
        &self,
        resource_id: ResourceId,
        date: NaiveDate,
        editing: Option<BookingId>,
    ) -> Result<BTreeSet<Slot>, BookingError> {
        let (from, to) = self.day_bounds(date)?;
        let bookings = self.backend.resource_bookings(resource_id, from, to).await?;
        let editing = match editing {
            Some(id) => {
                let booking = self.backend.booking(id).await?;
                if booking.resource_id != resource_id {
                    return Err(BookingError::InvalidRequest(format!(
                        "booking {id} does not belong to resource {resource_id}"
                    )));
                }
                Some(EditingBooking::from(&booking))
            }
            None => None,
        };
        Ok(unavailable_slots(
            &bookings,
            date,
            self.hours,
            &self.time_zone,
            editing.as_ref(),
        ))
    }

    /// Availability of every bookable room of a site for one day.
    ///
    /// # Errors
    ///
    /// Returns a [`BookingError`] if the backend cannot be read.
    pub async fn planning_grid(
        &self,
        site_id: SiteId,
        date: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<PlanningGrid, BookingError> {
        let (from, to) = self.day_bounds(date)?;
        let rooms = self.backend.site_rooms(site_id).await?;
        let room_bookings = self.backend.room_bookings_for_site(site_id, from, to).await?;

        let mut by_room: HashMap<ResourceId, Vec<Booking>> = HashMap::new();
        for rb in room_bookings {
            by_room.entry(rb.booking.resource_id).or_default().push(rb.booking);
        }

        Ok(PlanningGrid::build(
            &rooms,
            &by_room,
            date,
            self.hours,
            &now.with_timezone(&self.time_zone),
        ))
    }

    /// Creates a booking.
    ///
    /// # Errors
    ///
    /// Returns the backend's error unchanged, e.g.
    /// [`BookingError::SlotUnavailable`] on overlap.
    pub async fn create_booking(&self, request: NewBooking) -> Result<Booking, BookingError> {
        let booking = self.backend.create_booking(request).await?;

        let _ = self.event_bus.publish(BookingEvent::BookingCreated {
            booking_id: booking.id,
            resource_id: booking.resource_id,
            company_id: booking.company_id,
            start: booking.start,
            end: booking.end,
            credits_used: booking.credits_used.unwrap_or(0.0),
            timestamp: Utc::now(),
        });

        tracing::info!(
            booking_id = %booking.id,
            resource_id = %booking.resource_id,
            start = %booking.start,
            end = %booking.end,
            "booking created"
        );
        Ok(booking)
    }

    /// Moves a booking to `[start, end)`.
    ///
    /// Credits charged at creation are kept as they are.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::BookingNotFound`], or the backend's error
    /// unchanged.
    pub async fn reschedule(
        &self,
        id: BookingId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Booking, BookingError> {
        let previous = self.backend.booking(id).await?;
        let booking = self.backend.update_booking_dates(id, start, end).await?;

        if booking.duration() != previous.duration() {
            tracing::warn!(
                booking_id = %id,
                previous_minutes = previous.duration().num_minutes(),
                minutes = booking.duration().num_minutes(),
                "duration changed; credits_used left unchanged"
            );
        }

        let _ = self.event_bus.publish(BookingEvent::BookingRescheduled {
            booking_id: id,
            resource_id: booking.resource_id,
            previous_start: previous.start,
            previous_end: previous.end,
            start: booking.start,
            end: booking.end,
            timestamp: Utc::now(),
        });

        tracing::info!(
            booking_id = %id,
            start = %booking.start,
            end = %booking.end,
            "booking rescheduled"
        );
        Ok(booking)
    }

    /// Cancels a booking.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::BookingNotFound`] for an unknown id and
    /// [`BookingError::BookingCancelled`] if it is already cancelled.
    pub async fn cancel_booking(&self, id: BookingId) -> Result<Booking, BookingError> {
        let booking = self.backend.cancel_booking(id).await?;

        let _ = self.event_bus.publish(BookingEvent::BookingCancelled {
            booking_id: id,
            resource_id: booking.resource_id,
            company_id: booking.company_id,
            timestamp: Utc::now(),
        });

        tracing::info!(booking_id = %id, "booking cancelled");
        Ok(booking)
    }

    /// Current balance of a company. No company means no credits.
    ///
    /// # Errors
    ///
    /// Returns a [`BookingError`] if the backend cannot be read.
    pub async fn credit_balance(
        &self,
        company_id: Option<CompanyId>,
    ) -> Result<CreditBalance, BookingError> {
        match company_id {
            Some(id) => self.backend.credit_balance(id).await,
            None => Ok(CreditBalance::default()),
        }
    }

    /// Reconciled credit history of a company, newest first.
    ///
    /// # Errors
    ///
    /// Returns a [`BookingError`] if any of the reads fails. No partial
    /// ledger is returned.
    pub async fn ledger(&self, company_id: CompanyId) -> Result<Vec<CreditMovement>, BookingError> {
        let balance = self.backend.credit_balance(company_id).await?;
        let transactions = self
            .backend
            .credit_transactions(company_id, self.ledger_limit)
            .await?;
        let users = self.backend.company_users(company_id).await?;
        let history = self
            .backend
            .historical_bookings(&users, self.ledger_limit)
            .await?;

        let movements = reconcile(&transactions, &history, balance.remaining);
        tracing::debug!(
            %company_id,
            transactions = transactions.len(),
            bookings = history.len(),
            movements = movements.len(),
            "ledger reconciled"
        );
        Ok(movements)
    }

    /// Loads a booking placed on the calendar grid in the viewer time zone.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::BookingNotFound`] for an unknown id.
    pub async fn draggable(&self, id: BookingId) -> Result<DraggableBooking, BookingError> {
        let booking = self.backend.booking(id).await?;
        Ok(DraggableBooking::from_booking(&booking, &self.time_zone))
    }

    /// Persists the result of a released drag gesture.
    ///
    /// Only [`DragOutcome::Reschedule`] touches the backend. A failure is
    /// logged and reported as [`DragCommit::Failed`].
    pub async fn commit_drag(&self, outcome: &DragOutcome) -> DragCommit {
        let DragOutcome::Reschedule {
            booking_id,
            start,
            end,
        } = outcome
        else {
            return DragCommit::Skipped;
        };

        let result = match (to_utc(&self.time_zone, *start), to_utc(&self.time_zone, *end)) {
            (Ok(start), Ok(end)) => self.reschedule(*booking_id, start, end).await,
            (Err(e), _) | (_, Err(e)) => Err(e),
        };

        match result {
            Ok(booking) => DragCommit::Rescheduled { booking },
            Err(e) => {
                tracing::warn!(%booking_id, error = %e, "drag reschedule failed");
                DragCommit::Failed {
                    message: e.to_string(),
                }
            }
        }
    }
}
