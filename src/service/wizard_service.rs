//! Wizard service: drives server-held booking wizard sessions.
//!
//! Each call locks one session, applies a transition, and releases the lock
//! before talking to the backend. Availability results come back through a
//! ticket so a response for an abandoned selection is dropped.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use super::booking_service::BookingService;
use crate::backend::BookingBackend;
use crate::domain::wizard::WizardExit;
use crate::domain::{
    Booking, BookingWizard, CompanyId, PlanningGrid, ResourceId, SessionContext, SiteId, Slot,
    UserId, WizardEntry, WizardId, WizardRegistry, WizardView,
};
use crate::error::BookingError;

/// Result of a confirmation attempt.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ConfirmOutcome {
    /// Wizard state after the attempt.
    pub wizard: WizardView,
    /// Created booking, on success.
    pub booking: Option<Booking>,
    /// What the shell should do next, on success.
    pub exit: Option<WizardExit>,
}

/// Coordinates [`BookingWizard`] sessions with the booking backend.
#[derive(Debug)]
pub struct WizardService<B> {
    bookings: Arc<BookingService<B>>,
    registry: Arc<WizardRegistry>,
    success_delay: Duration,
}

impl<B: BookingBackend> WizardService<B> {
    /// Creates a new `WizardService`.
    #[must_use]
    pub fn new(bookings: Arc<BookingService<B>>, success_delay: Duration) -> Self {
        Self {
            bookings,
            registry: Arc::new(WizardRegistry::new()),
            success_delay,
        }
    }

    /// Returns a reference to the session registry.
    #[must_use]
    pub fn registry(&self) -> &Arc<WizardRegistry> {
        &self.registry
    }

    async fn remaining(&self, company_id: Option<CompanyId>) -> Result<f64, BookingError> {
        Ok(self.bookings.credit_balance(company_id).await?.remaining)
    }

    async fn snapshot(&self, wizard_id: WizardId) -> Result<WizardView, BookingError> {
        let entry_lock = self.registry.get(wizard_id).await?;
        let company_id = entry_lock.read().await.company_id;
        let remaining = self.remaining(company_id).await?;
        Ok(entry_lock.read().await.wizard.view(remaining))
    }

    /// Opens a session, optionally preselecting a site and a day.
    ///
    /// # Errors
    ///
    /// Returns a [`BookingError`] if the balance cannot be read.
    pub async fn open(
        &self,
        user_id: UserId,
        company_id: Option<CompanyId>,
        modal: bool,
        site_id: Option<SiteId>,
        date: Option<NaiveDate>,
    ) -> Result<(WizardId, WizardView), BookingError> {
        let mut wizard = BookingWizard::new(self.bookings.business_hours(), modal);
        if let Some(site_id) = site_id {
            wizard.select_site(site_id);
        }
        if let Some(date) = date {
            wizard.select_date(date);
        }
        let wizard_id = self
            .registry
            .insert(WizardEntry::new(user_id, company_id, wizard))
            .await?;

        tracing::info!(%wizard_id, %user_id, modal, "wizard opened");
        Ok((wizard_id, self.snapshot(wizard_id).await?))
    }

    /// Current view of a session.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::WizardNotFound`] for an unknown id.
    pub async fn view(&self, wizard_id: WizardId) -> Result<WizardView, BookingError> {
        self.snapshot(wizard_id).await
    }

    /// Selects the site.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::WizardNotFound`] for an unknown id.
    pub async fn select_site(
        &self,
        wizard_id: WizardId,
        site_id: SiteId,
    ) -> Result<WizardView, BookingError> {
        let entry_lock = self.registry.get(wizard_id).await?;
        {
            let mut entry = entry_lock.write().await;
            entry.wizard.select_site(site_id);
            entry.touch();
        }
        self.snapshot(wizard_id).await
    }

    /// Selects the day.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::WizardNotFound`] for an unknown id.
    pub async fn select_date(
        &self,
        wizard_id: WizardId,
        date: NaiveDate,
    ) -> Result<WizardView, BookingError> {
        let entry_lock = self.registry.get(wizard_id).await?;
        {
            let mut entry = entry_lock.write().await;
            entry.wizard.select_date(date);
            entry.touch();
        }
        self.snapshot(wizard_id).await
    }

    /// Picks a planning cell, then loads the room's availability.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::InvalidRequest`] if the room belongs to
    /// another site, [`BookingError::SlotUnavailable`] if the slot already
    /// started, the wizard's transition error, or a fetch error.
    pub async fn slot_click(
        &self,
        wizard_id: WizardId,
        resource_id: ResourceId,
        slot: Slot,
    ) -> Result<WizardView, BookingError> {
        let room = self.bookings.resource(resource_id).await?;
        let entry_lock = self.registry.get(wizard_id).await?;
        let now = Utc::now()
            .with_timezone(&self.bookings.time_zone())
            .naive_local();

        let ticket = {
            let mut entry = entry_lock.write().await;
            if entry.wizard.site_id().is_some_and(|s| s != room.site_id) {
                return Err(BookingError::InvalidRequest(format!(
                    "room {} is not on the selected site",
                    room.name
                )));
            }
            entry.wizard.slot_click(room, slot, now)?;
            entry.touch();
            entry.wizard.begin_availability_fetch()
        };

        if let Some(ticket) = ticket {
            let unavailable = self
                .bookings
                .unavailable_slots(ticket.resource_id, ticket.date, None)
                .await?;
            let applied = entry_lock
                .write()
                .await
                .wizard
                .apply_availability(ticket, unavailable);
            if !applied {
                tracing::debug!(
                    %wizard_id,
                    generation = ticket.generation,
                    "stale availability dropped"
                );
            }
        }
        self.snapshot(wizard_id).await
    }

    /// Sets the selected hours to `[start, end_hour)`.
    ///
    /// # Errors
    ///
    /// Returns the wizard's validation error.
    pub async fn set_range(
        &self,
        wizard_id: WizardId,
        start: Slot,
        end_hour: u32,
    ) -> Result<WizardView, BookingError> {
        let entry_lock = self.registry.get(wizard_id).await?;
        {
            let mut entry = entry_lock.write().await;
            entry.wizard.set_range(start, end_hour)?;
            entry.touch();
        }
        self.snapshot(wizard_id).await
    }

    /// Advances to the confirm step.
    ///
    /// Missing slots or credits are not errors here: they are stored inline
    /// on the view and the step does not change.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::InvalidTransition`] outside the slots step.
    pub async fn next(&self, wizard_id: WizardId) -> Result<WizardView, BookingError> {
        let entry_lock = self.registry.get(wizard_id).await?;
        let company_id = entry_lock.read().await.company_id;
        let remaining = self.remaining(company_id).await?;

        let mut entry = entry_lock.write().await;
        match entry.wizard.next(remaining) {
            Ok(())
            | Err(BookingError::NoSlotsSelected | BookingError::InsufficientCredits { .. }) => {}
            Err(e) => return Err(e),
        }
        entry.touch();
        Ok(entry.wizard.view(remaining))
    }

    /// Steps back one phase.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::WizardNotFound`] for an unknown id.
    pub async fn back(&self, wizard_id: WizardId) -> Result<WizardView, BookingError> {
        let entry_lock = self.registry.get(wizard_id).await?;
        {
            let mut entry = entry_lock.write().await;
            entry.wizard.back();
            entry.touch();
        }
        self.snapshot(wizard_id).await
    }

    /// Abandons the selection.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::WizardNotFound`] for an unknown id.
    pub async fn cancel(&self, wizard_id: WizardId) -> Result<WizardView, BookingError> {
        let entry_lock = self.registry.get(wizard_id).await?;
        {
            let mut entry = entry_lock.write().await;
            entry.wizard.cancel();
            entry.touch();
        }
        self.snapshot(wizard_id).await
    }

    /// Confirms the selection and creates the booking.
    ///
    /// A backend refusal is not an error of this call: its message lands in
    /// the view's `error` and the wizard stays on confirm. A modal session
    /// is closed on success. An inline one returns to planning after the
    /// configured delay.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::InvalidTransition`] outside the confirm step
    /// or while another confirmation is running.
    pub async fn confirm(&self, wizard_id: WizardId) -> Result<ConfirmOutcome, BookingError> {
        let entry_lock = self.registry.get(wizard_id).await?;
        let (user_id, company_id) = {
            let entry = entry_lock.read().await;
            (entry.user_id, entry.company_id)
        };
        let credits = self.bookings.credit_balance(company_id).await?;
        let ctx = SessionContext {
            user_id,
            company_id,
            credits,
            time_zone: self.bookings.time_zone(),
            now: Utc::now(),
        };

        let request = {
            let mut entry = entry_lock.write().await;
            let request = entry.wizard.begin_confirm(&ctx)?;
            entry.touch();
            request
        };

        let result = self.bookings.create_booking(request).await;
        let remaining = self.remaining(company_id).await.unwrap_or(credits.remaining);

        let (exit, view) = {
            let mut entry = entry_lock.write().await;
            let exit = entry
                .wizard
                .finish_confirm(result.as_ref().map(|_| ()).map_err(ToString::to_string));
            entry.touch();
            (exit, entry.wizard.view(remaining))
        };

        match exit {
            Some(WizardExit::Close) => {
                let _ = self.registry.remove(wizard_id).await;
                tracing::info!(%wizard_id, "wizard closed after booking");
            }
            Some(WizardExit::ShowSuccess) => self.schedule_reset(wizard_id),
            None => {
                if let Err(e) = &result {
                    tracing::warn!(%wizard_id, error = %e, "wizard confirmation failed");
                }
            }
        }

        Ok(ConfirmOutcome {
            wizard: view,
            booking: result.ok(),
            exit,
        })
    }

    fn schedule_reset(&self, wizard_id: WizardId) {
        let registry = Arc::clone(&self.registry);
        let delay = self.success_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Ok(entry_lock) = registry.get(wizard_id).await {
                let mut entry = entry_lock.write().await;
                if entry.wizard.reset_after_success() {
                    entry.touch();
                    tracing::debug!(%wizard_id, "wizard returned to planning");
                }
            }
        });
    }

    /// Closes a session.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::WizardNotFound`] for an unknown id.
    pub async fn close(&self, wizard_id: WizardId) -> Result<(), BookingError> {
        self.registry.remove(wizard_id).await?;
        tracing::info!(%wizard_id, "wizard closed");
        Ok(())
    }

    /// Planning grid for the session's site and day.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::InvalidRequest`] until both a site and a day
    /// are selected.
    pub async fn planning(
        &self,
        wizard_id: WizardId,
        now: DateTime<Utc>,
    ) -> Result<PlanningGrid, BookingError> {
        let entry_lock = self.registry.get(wizard_id).await?;
        let (site_id, date) = {
            let entry = entry_lock.read().await;
            (entry.wizard.site_id(), entry.wizard.date())
        };
        let (Some(site_id), Some(date)) = (site_id, date) else {
            return Err(BookingError::InvalidRequest(
                "select a site and a date first".to_string(),
            ));
        };
        self.bookings.planning_grid(site_id, date, now).await
    }

    /// Drops sessions untouched for longer than `max_idle`.
    pub async fn evict_idle(&self, max_idle: Duration) -> usize {
        let max_idle = chrono::TimeDelta::from_std(max_idle).unwrap_or(chrono::TimeDelta::MAX);
        let cutoff = Utc::now()
            .checked_sub_signed(max_idle)
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        let evicted = self.registry.evict_idle(cutoff).await;
        if evicted > 0 {
            tracing::info!(evicted, "idle wizards evicted");
        }
        evicted
    }
}
