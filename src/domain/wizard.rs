//! Booking wizard state machine: planning → slots → confirm.
//!
//! The wizard holds the user's selection and derives pricing from it. It
//! never talks to the backend itself. [`BookingWizard::begin_confirm`] hands
//! out the mutation input and [`BookingWizard::finish_confirm`] applies the
//! backend's answer.

use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeDelta, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::availability::available_end_hours;
use super::booking::{CreditBalance, NewBooking, Resource};
use super::ids::{CompanyId, ResourceId, SiteId, UserId};
use super::slot::{BusinessHours, Slot};
use crate::error::BookingError;

/// Who is booking, and with what credit.
///
/// Built once per request or wizard session and passed explicitly.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionContext<Tz: TimeZone> {
    /// Booking user.
    pub user_id: UserId,
    /// Company billed for the booking.
    pub company_id: Option<CompanyId>,
    /// Current credit totals.
    pub credits: CreditBalance,
    /// Viewer time zone used to interpret slots.
    pub time_zone: Tz,
    /// Current instant; slots that already started cannot be booked.
    pub now: DateTime<Utc>,
}

/// Wizard step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum WizardPhase {
    /// Multi-room grid; pick a cell.
    Planning,
    /// Adjust the start/end of the selection.
    Slots,
    /// Review and confirm.
    Confirm,
}

/// Result of a completed confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum WizardExit {
    /// Modal wizard: the session should be closed.
    Close,
    /// Inline wizard: show success, then return to planning after a delay.
    ShowSuccess,
}

/// Ticket for one availability fetch.
///
/// Only the result of the most recently issued ticket is applied, so a slow
/// response for a room or date the user already left is dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AvailabilityTicket {
    /// Monotonic request generation.
    pub generation: u64,
    /// Room the fetch was issued for.
    pub resource_id: ResourceId,
    /// Day the fetch was issued for.
    pub date: NaiveDate,
}

/// Read-only snapshot exposed to the UI shell.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct WizardView {
    /// Current step.
    pub view: WizardPhase,
    /// Selected site.
    pub selected_site: Option<SiteId>,
    /// Selected room.
    pub selected_room: Option<Resource>,
    /// Selected day.
    pub selected_date: Option<NaiveDate>,
    /// Contiguous selected slots.
    pub selected_slots: Vec<Slot>,
    /// End hours offered by the slot picker for the current start.
    pub available_end_hours: Vec<u32>,
    /// `slots × rate`.
    pub credits_needed: f64,
    /// `remaining >= credits_needed`.
    pub has_enough_credits: bool,
    /// Whether `next` is allowed from the current state.
    pub can_continue: bool,
    /// Inline error message.
    pub error: Option<String>,
    /// A confirmation is in flight.
    pub submitting: bool,
    /// The last confirmation succeeded.
    pub succeeded: bool,
}

/// State of one booking wizard.
#[derive(Debug, Clone)]
pub struct BookingWizard {
    phase: WizardPhase,
    modal: bool,
    hours: BusinessHours,
    site_id: Option<SiteId>,
    date: Option<NaiveDate>,
    room: Option<Resource>,
    slots: Vec<Slot>,
    unavailable: BTreeSet<Slot>,
    error: Option<String>,
    submitting: bool,
    succeeded: bool,
    generation: u64,
    pending_fetch: Option<AvailabilityTicket>,
}

impl BookingWizard {
    /// Creates a wizard in the planning step.
    #[must_use]
    pub fn new(hours: BusinessHours, modal: bool) -> Self {
        Self {
            phase: WizardPhase::Planning,
            modal,
            hours,
            site_id: None,
            date: None,
            room: None,
            slots: Vec::new(),
            unavailable: BTreeSet::new(),
            error: None,
            submitting: false,
            succeeded: false,
            generation: 0,
            pending_fetch: None,
        }
    }

    /// Current step.
    #[must_use]
    pub const fn phase(&self) -> WizardPhase {
        self.phase
    }

    /// Selected site.
    #[must_use]
    pub const fn site_id(&self) -> Option<SiteId> {
        self.site_id
    }

    /// Selected day.
    #[must_use]
    pub const fn date(&self) -> Option<NaiveDate> {
        self.date
    }

    /// Selected room.
    #[must_use]
    pub const fn room(&self) -> Option<&Resource> {
        self.room.as_ref()
    }

    /// Selected slots, ascending and contiguous.
    #[must_use]
    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    /// Inline error message.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Whether a confirmation is in flight.
    #[must_use]
    pub const fn is_submitting(&self) -> bool {
        self.submitting
    }

    /// Whether the wizard runs inside a modal.
    #[must_use]
    pub const fn is_modal(&self) -> bool {
        self.modal
    }

    fn clear_selection(&mut self) {
        self.room = None;
        self.slots.clear();
        self.unavailable.clear();
        self.pending_fetch = None;
        self.error = None;
        self.succeeded = false;
        self.phase = WizardPhase::Planning;
    }

    /// Selects a site. Outside planning, a change resets the selection.
    /// Ignored while a confirmation is in flight.
    pub fn select_site(&mut self, site_id: SiteId) {
        if !self.submitting && self.site_id != Some(site_id) {
            self.site_id = Some(site_id);
            self.clear_selection();
        }
    }

    /// Selects a day. Outside planning, a change resets the selection.
    /// Ignored while a confirmation is in flight.
    pub fn select_date(&mut self, date: NaiveDate) {
        if !self.submitting && self.date != Some(date) {
            self.date = Some(date);
            self.clear_selection();
        }
    }

    /// Handles a click on a bookable planning cell.
    ///
    /// Moves to the slots step with the clicked hour as the selection.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::InvalidTransition`] outside planning or
    /// before a day is selected, [`BookingError::InvalidRequest`] for a room
    /// that cannot be booked or a slot outside business hours, and
    /// [`BookingError::SlotUnavailable`] for a slot that started before the
    /// local time `now`.
    pub fn slot_click(
        &mut self,
        room: Resource,
        slot: Slot,
        now: NaiveDateTime,
    ) -> Result<(), BookingError> {
        if self.phase != WizardPhase::Planning {
            return Err(BookingError::InvalidTransition(
                "a cell can only be picked from the planning view".to_string(),
            ));
        }
        let Some(date) = self.date else {
            return Err(BookingError::InvalidTransition(
                "a day must be selected before picking a cell".to_string(),
            ));
        };
        if !room.is_bookable_room() {
            return Err(BookingError::InvalidRequest(format!(
                "room {} is not bookable",
                room.name
            )));
        }
        if !self.hours.contains(slot) {
            return Err(BookingError::InvalidRequest(format!(
                "{slot} is outside business hours"
            )));
        }
        if BusinessHours::has_started(date, slot, now) {
            return Err(BookingError::SlotUnavailable(format!(
                "{slot} on {date} has already started"
            )));
        }
        self.room = Some(room);
        self.slots = vec![slot];
        self.unavailable.clear();
        self.error = None;
        self.succeeded = false;
        self.phase = WizardPhase::Slots;
        Ok(())
    }

    /// Sets the selection to the hours `[start, end)`.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::InvalidTransition`] outside the slots step,
    /// [`BookingError::InvalidRequest`] for an empty or out-of-window range
    /// and [`BookingError::SlotUnavailable`] if any hour is taken.
    pub fn set_range(&mut self, start: Slot, end_hour: u32) -> Result<(), BookingError> {
        if self.phase != WizardPhase::Slots {
            return Err(BookingError::InvalidTransition(
                "slots can only be adjusted in the slots step".to_string(),
            ));
        }
        if end_hour <= start.hour() || !self.hours.contains(start) || end_hour > self.hours.end {
            return Err(BookingError::InvalidRequest(format!(
                "invalid range {start}..{end_hour:02}:00"
            )));
        }
        let slots: Vec<Slot> = (start.hour()..end_hour).filter_map(Slot::from_hour).collect();
        if let Some(taken) = slots.iter().find(|s| self.unavailable.contains(s)) {
            return Err(BookingError::SlotUnavailable(format!("{taken} is already booked")));
        }
        self.slots = slots;
        self.error = None;
        Ok(())
    }

    /// Credits needed for the current selection.
    #[must_use]
    pub fn credits_needed(&self) -> f64 {
        let rate = self.room.as_ref().map_or(1.0, Resource::credit_rate);
        #[allow(clippy::cast_precision_loss)]
        let count = self.slots.len() as f64;
        count * rate
    }

    /// Whether `remaining` covers the current selection.
    #[must_use]
    pub fn has_enough_credits(&self, remaining: f64) -> bool {
        remaining >= self.credits_needed()
    }

    /// Whether `next` would succeed from the slots step.
    #[must_use]
    pub fn can_continue(&self, remaining: f64) -> bool {
        self.phase == WizardPhase::Slots
            && self.date.is_some()
            && !self.slots.is_empty()
            && self.has_enough_credits(remaining)
    }

    /// Advances from slots to confirm.
    ///
    /// A validation failure is also stored as the inline error.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::InvalidTransition`] outside the slots step,
    /// [`BookingError::NoSlotsSelected`] without a date or slots, and
    /// [`BookingError::InsufficientCredits`] when the balance is too low.
    pub fn next(&mut self, remaining: f64) -> Result<(), BookingError> {
        if self.phase != WizardPhase::Slots {
            return Err(BookingError::InvalidTransition(format!(
                "cannot continue from {:?}",
                self.phase
            )));
        }
        let check = if self.date.is_none() || self.slots.is_empty() {
            Err(BookingError::NoSlotsSelected)
        } else if !self.has_enough_credits(remaining) {
            Err(BookingError::InsufficientCredits {
                needed: self.credits_needed(),
                remaining,
            })
        } else {
            Ok(())
        };
        match check {
            Ok(()) => {
                self.error = None;
                self.phase = WizardPhase::Confirm;
                Ok(())
            }
            Err(e) => {
                self.error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Steps back: confirm → slots, slots → planning.
    pub fn back(&mut self) {
        match self.phase {
            WizardPhase::Confirm if !self.submitting => {
                self.error = None;
                self.phase = WizardPhase::Slots;
            }
            WizardPhase::Slots => self.clear_selection(),
            WizardPhase::Confirm | WizardPhase::Planning => {}
        }
    }

    /// Abandons the selection and returns to planning.
    pub fn cancel(&mut self) {
        if !self.submitting {
            self.clear_selection();
        }
    }

    /// Issues a ticket for fetching the selected room's availability.
    pub fn begin_availability_fetch(&mut self) -> Option<AvailabilityTicket> {
        let resource_id = self.room.as_ref()?.id;
        let date = self.date?;
        self.generation = self.generation.wrapping_add(1);
        let ticket = AvailabilityTicket {
            generation: self.generation,
            resource_id,
            date,
        };
        self.pending_fetch = Some(ticket);
        Some(ticket)
    }

    /// Applies a fetched unavailable set if `ticket` is still current.
    ///
    /// If the current selection now overlaps a taken hour, it shrinks to the
    /// longest free prefix. If the first hour is taken, the wizard returns
    /// to planning with an inline error.
    ///
    /// Returns `false` when the result is stale and was dropped.
    pub fn apply_availability(
        &mut self,
        ticket: AvailabilityTicket,
        unavailable: BTreeSet<Slot>,
    ) -> bool {
        if self.pending_fetch != Some(ticket)
            || self.room.as_ref().map(|r| r.id) != Some(ticket.resource_id)
            || self.date != Some(ticket.date)
        {
            return false;
        }
        self.pending_fetch = None;
        self.unavailable = unavailable;

        if self.phase == WizardPhase::Slots {
            let free = self
                .slots
                .iter()
                .take_while(|s| !self.unavailable.contains(s))
                .count();
            if free == 0 && !self.slots.is_empty() {
                self.clear_selection();
                self.error = Some("the selected slot is no longer available".to_string());
            } else {
                self.slots.truncate(free);
            }
        }
        true
    }

    /// Starts a confirmation and returns the mutation input.
    ///
    /// Sets the in-flight flag. Call [`Self::finish_confirm`] with the result.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::InvalidTransition`] outside the confirm step
    /// or while a confirmation is already in flight, and
    /// [`BookingError::NoSlotsSelected`] if the selection is incomplete, and
    /// [`BookingError::SlotUnavailable`] once the first slot has started.
    pub fn begin_confirm<Tz: TimeZone>(
        &mut self,
        ctx: &SessionContext<Tz>,
    ) -> Result<NewBooking, BookingError> {
        if self.phase != WizardPhase::Confirm {
            return Err(BookingError::InvalidTransition(
                "confirmation requires the confirm step".to_string(),
            ));
        }
        if self.submitting {
            return Err(BookingError::InvalidTransition(
                "a confirmation is already in progress".to_string(),
            ));
        }
        let (Some(resource_id), Some(date), Some(first), Some(last)) = (
            self.room.as_ref().map(|r| r.id),
            self.date,
            self.slots.first().copied(),
            self.slots.last().copied(),
        ) else {
            return Err(BookingError::NoSlotsSelected);
        };

        let now_local = ctx.now.with_timezone(&ctx.time_zone).naive_local();
        if BusinessHours::has_started(date, first, now_local) {
            let e = BookingError::SlotUnavailable(format!("{first} on {date} has already started"));
            self.error = Some(e.to_string());
            return Err(e);
        }

        let start_local = BusinessHours::slot_start(date, first);
        let end_local = BusinessHours::slot_start(date, last) + TimeDelta::hours(1);
        let start = to_utc(&ctx.time_zone, start_local)?;
        let end = to_utc(&ctx.time_zone, end_local)?;

        let request = NewBooking {
            user_id: ctx.user_id,
            resource_id,
            start,
            end,
            credits_to_use: self.credits_needed(),
            company_id: ctx.company_id,
        };
        self.submitting = true;
        self.error = None;
        Ok(request)
    }

    /// Applies the outcome of the create-booking mutation.
    ///
    /// On failure the message is kept verbatim as the inline error and the
    /// wizard stays on confirm.
    pub fn finish_confirm(&mut self, result: Result<(), String>) -> Option<WizardExit> {
        self.submitting = false;
        match result {
            Ok(()) => {
                self.error = None;
                self.succeeded = true;
                Some(if self.modal {
                    WizardExit::Close
                } else {
                    WizardExit::ShowSuccess
                })
            }
            Err(message) => {
                self.error = Some(message);
                None
            }
        }
    }

    /// Returns to planning after the success message was shown.
    ///
    /// Returns `false` if the user already moved on.
    pub fn reset_after_success(&mut self) -> bool {
        if !self.succeeded || self.phase != WizardPhase::Confirm {
            return false;
        }
        self.clear_selection();
        true
    }

    /// Snapshot for the UI shell.
    #[must_use]
    pub fn view(&self, remaining: f64) -> WizardView {
        let available_end_hours = self
            .slots
            .first()
            .map(|start| available_end_hours(*start, &self.unavailable, self.hours))
            .unwrap_or_default();
        WizardView {
            view: self.phase,
            selected_site: self.site_id,
            selected_room: self.room.clone(),
            selected_date: self.date,
            selected_slots: self.slots.clone(),
            available_end_hours,
            credits_needed: self.credits_needed(),
            has_enough_credits: self.has_enough_credits(remaining),
            can_continue: self.can_continue(remaining),
            error: self.error.clone(),
            submitting: self.submitting,
            succeeded: self.succeeded,
        }
    }
}

/// Resolves a local wall-clock time in `tz`, taking the earlier instant on
/// DST folds.
///
/// # Errors
///
/// Returns [`BookingError::InvalidRequest`] for times skipped by a DST gap.
pub fn to_utc<Tz: TimeZone>(
    tz: &Tz,
    local: chrono::NaiveDateTime,
) -> Result<DateTime<Utc>, BookingError> {
    tz.from_local_datetime(&local)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| BookingError::InvalidRequest(format!("{local} does not exist locally")))
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::booking::{ResourceStatus, ResourceType};
    use chrono_tz::Europe::Paris;

    fn room(rate: Option<f64>) -> Resource {
        Resource {
            id: ResourceId::new(),
            site_id: SiteId::new(),
            name: "Atelier".to_string(),
            resource_type: ResourceType::MeetingRoom,
            capacity: Some(10),
            hourly_credit_rate: rate,
            status: ResourceStatus::Available,
            equipment: BTreeSet::new(),
            photos: Vec::new(),
        }
    }

    fn slot(hour: u32) -> Slot {
        let Some(s) = Slot::from_hour(hour) else {
            panic!("valid hour");
        };
        s
    }

    fn day() -> NaiveDate {
        let Some(d) = NaiveDate::from_ymd_opt(2024, 6, 3) else {
            panic!("valid date");
        };
        d
    }

    /// Local and UTC instants well before `day()`.
    fn early() -> NaiveDateTime {
        let Some(t) = NaiveDate::from_ymd_opt(2024, 6, 1).and_then(|d| d.and_hms_opt(9, 0, 0))
        else {
            panic!("valid time");
        };
        t
    }

    fn before_day() -> DateTime<Utc> {
        early().and_utc()
    }

    fn ctx(remaining: f64) -> SessionContext<chrono_tz::Tz> {
        SessionContext {
            user_id: UserId::new(),
            company_id: Some(CompanyId::new()),
            credits: CreditBalance {
                allocated: 20.0,
                remaining,
            },
            time_zone: Paris,
            now: before_day(),
        }
    }

    fn wizard_in_slots(rate: Option<f64>) -> BookingWizard {
        let mut wizard = BookingWizard::new(BusinessHours::default(), false);
        wizard.select_site(SiteId::new());
        wizard.select_date(day());
        if wizard.slot_click(room(rate), slot(13), early()).is_err() {
            panic!("slot click failed");
        }
        wizard
    }

    #[test]
    fn slot_click_seeds_single_hour() {
        let wizard = wizard_in_slots(None);
        assert_eq!(wizard.phase(), WizardPhase::Slots);
        assert_eq!(wizard.slots(), &[slot(13)]);
        assert!((wizard.credits_needed() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn pricing_is_slots_times_rate() {
        // Scenario: rate 2, 13:00–15:00 → 4 credits.
        let mut wizard = wizard_in_slots(Some(2.0));
        assert!(wizard.set_range(slot(13), 15).is_ok());
        assert_eq!(wizard.slots(), &[slot(13), slot(14)]);
        assert!((wizard.credits_needed() - 4.0).abs() < f64::EPSILON);

        for k in 1..=6 {
            assert!(wizard.set_range(slot(10), 10 + k).is_ok());
            #[allow(clippy::cast_precision_loss)]
            let expected = f64::from(k) * 2.0;
            assert!((wizard.credits_needed() - expected).abs() < f64::EPSILON);
            assert!(wizard.can_continue(expected));
            assert!(!wizard.can_continue(expected - 0.5));
        }
    }

    #[test]
    fn insufficient_credit_blocks_continue_and_reports_on_attempt() {
        let mut wizard = wizard_in_slots(Some(2.0));
        assert!(wizard.set_range(slot(13), 15).is_ok());
        assert!(!wizard.has_enough_credits(3.0));
        assert!(!wizard.view(3.0).can_continue);
        assert!(wizard.error().is_none());

        let result = wizard.next(3.0);
        assert!(matches!(result, Err(BookingError::InsufficientCredits { .. })));
        assert_eq!(wizard.phase(), WizardPhase::Slots);
        assert!(wizard.error().is_some());
    }

    #[test]
    fn range_with_taken_hour_is_rejected() {
        let mut wizard = wizard_in_slots(None);
        let Some(ticket) = wizard.begin_availability_fetch() else {
            panic!("ticket expected");
        };
        assert!(wizard.apply_availability(ticket, [slot(15)].into_iter().collect()));
        assert!(matches!(
            wizard.set_range(slot(13), 17),
            Err(BookingError::SlotUnavailable(_))
        ));
        assert!(wizard.set_range(slot(13), 15).is_ok());
        assert_eq!(wizard.view(10.0).available_end_hours, vec![14, 15]);
        assert!(wizard.set_range(slot(13), 13).is_err());
        assert!(wizard.set_range(slot(19), 21).is_err());
    }

    #[test]
    fn back_and_cancel_move_one_step() {
        let mut wizard = wizard_in_slots(None);
        assert!(wizard.next(5.0).is_ok());
        assert_eq!(wizard.phase(), WizardPhase::Confirm);
        wizard.back();
        assert_eq!(wizard.phase(), WizardPhase::Slots);
        assert_eq!(wizard.slots().len(), 1);
        wizard.back();
        assert_eq!(wizard.phase(), WizardPhase::Planning);
        assert!(wizard.room().is_none());
        assert!(wizard.slots().is_empty());
    }

    #[test]
    fn changing_site_or_date_resets_to_planning() {
        let mut wizard = wizard_in_slots(None);
        assert!(wizard.next(5.0).is_ok());
        let Some(other_day) = day().succ_opt() else {
            panic!("valid date");
        };
        wizard.select_date(other_day);
        assert_eq!(wizard.phase(), WizardPhase::Planning);
        assert!(wizard.slots().is_empty());

        let mut wizard = wizard_in_slots(None);
        wizard.select_site(SiteId::new());
        assert_eq!(wizard.phase(), WizardPhase::Planning);
        assert!(wizard.room().is_none());
    }

    #[test]
    fn reselecting_same_date_keeps_selection() {
        let mut wizard = wizard_in_slots(None);
        wizard.select_date(day());
        assert_eq!(wizard.phase(), WizardPhase::Slots);
    }

    #[test]
    fn cannot_skip_phases() {
        let mut wizard = BookingWizard::new(BusinessHours::default(), false);
        assert!(wizard.next(100.0).is_err());
        assert!(wizard.begin_confirm(&ctx(100.0)).is_err());
        let mut wizard = wizard_in_slots(None);
        assert!(wizard.begin_confirm(&ctx(100.0)).is_err());
        assert!(wizard.slot_click(room(None), slot(9), early()).is_err());
    }

    #[test]
    fn confirm_builds_request_from_slot_bounds() {
        let mut wizard = wizard_in_slots(Some(2.0));
        assert!(wizard.set_range(slot(13), 15).is_ok());
        assert!(wizard.next(10.0).is_ok());
        let context = ctx(10.0);
        let Ok(request) = wizard.begin_confirm(&context) else {
            panic!("confirm should start");
        };
        // 13:00 Paris (CEST) is 11:00 UTC.
        assert_eq!(request.start.to_rfc3339(), "2024-06-03T11:00:00+00:00");
        assert_eq!(request.end.to_rfc3339(), "2024-06-03T13:00:00+00:00");
        assert!((request.credits_to_use - 4.0).abs() < f64::EPSILON);
        assert_eq!(request.company_id, context.company_id);
        assert!(wizard.is_submitting());
        assert!(wizard.begin_confirm(&context).is_err());
    }

    #[test]
    fn failed_confirm_keeps_state_and_message() {
        let mut wizard = wizard_in_slots(None);
        assert!(wizard.next(10.0).is_ok());
        assert!(wizard.begin_confirm(&ctx(10.0)).is_ok());
        let exit = wizard.finish_confirm(Err("Créneau indisponible".to_string()));
        assert!(exit.is_none());
        assert_eq!(wizard.phase(), WizardPhase::Confirm);
        assert_eq!(wizard.error(), Some("Créneau indisponible"));
        assert!(!wizard.is_submitting());
        assert!(wizard.begin_confirm(&ctx(10.0)).is_ok());
    }

    #[test]
    fn success_exit_depends_on_modal_mode() {
        let mut inline = wizard_in_slots(None);
        assert!(inline.next(10.0).is_ok());
        assert!(inline.begin_confirm(&ctx(10.0)).is_ok());
        assert_eq!(inline.finish_confirm(Ok(())), Some(WizardExit::ShowSuccess));
        assert!(inline.view(10.0).succeeded);
        assert!(inline.reset_after_success());
        assert_eq!(inline.phase(), WizardPhase::Planning);
        assert!(!inline.reset_after_success());

        let mut modal = BookingWizard::new(BusinessHours::default(), true);
        modal.select_date(day());
        assert!(modal.slot_click(room(None), slot(9), early()).is_ok());
        assert!(modal.next(10.0).is_ok());
        assert!(modal.begin_confirm(&ctx(10.0)).is_ok());
        assert_eq!(modal.finish_confirm(Ok(())), Some(WizardExit::Close));
    }

    #[test]
    fn stale_availability_is_dropped() {
        let mut wizard = wizard_in_slots(None);
        let Some(first) = wizard.begin_availability_fetch() else {
            panic!("ticket expected");
        };
        let Some(second) = wizard.begin_availability_fetch() else {
            panic!("ticket expected");
        };
        assert!(!wizard.apply_availability(first, [slot(14)].into_iter().collect()));
        assert!(wizard.apply_availability(second, BTreeSet::new()));
        assert!(wizard.set_range(slot(13), 16).is_ok());
    }

    #[test]
    fn availability_for_abandoned_date_is_dropped() {
        let mut wizard = wizard_in_slots(None);
        let Some(ticket) = wizard.begin_availability_fetch() else {
            panic!("ticket expected");
        };
        wizard.select_date(NaiveDate::MIN);
        assert!(!wizard.apply_availability(ticket, BTreeSet::new()));
    }

    #[test]
    fn taken_selection_returns_to_planning() {
        let mut wizard = wizard_in_slots(None);
        let Some(ticket) = wizard.begin_availability_fetch() else {
            panic!("ticket expected");
        };
        assert!(wizard.apply_availability(ticket, [slot(13)].into_iter().collect()));
        assert_eq!(wizard.phase(), WizardPhase::Planning);
        assert!(wizard.error().is_some());
    }

    #[test]
    fn started_slots_cannot_be_picked() {
        let Some(ten_past_nine) = day().and_hms_opt(9, 10, 0) else {
            panic!("valid time");
        };
        let mut wizard = BookingWizard::new(BusinessHours::default(), true);
        wizard.select_date(day());
        assert!(matches!(
            wizard.slot_click(room(None), slot(9), ten_past_nine),
            Err(BookingError::SlotUnavailable(_))
        ));
        assert_eq!(wizard.phase(), WizardPhase::Planning);
        assert!(wizard.slot_click(room(None), slot(10), ten_past_nine).is_ok());
    }

    #[test]
    fn picking_a_cell_requires_a_day() {
        let mut wizard = BookingWizard::new(BusinessHours::default(), false);
        assert!(matches!(
            wizard.slot_click(room(None), slot(10), early()),
            Err(BookingError::InvalidTransition(_))
        ));
    }

    #[test]
    fn confirm_is_refused_once_the_slot_started() {
        let mut wizard = wizard_in_slots(None);
        assert!(wizard.next(10.0).is_ok());
        let mut late = ctx(10.0);
        // 13:30 Paris (CEST) is 11:30 UTC.
        let Some(half_past) = day().and_hms_opt(11, 30, 0) else {
            panic!("valid time");
        };
        late.now = half_past.and_utc();
        assert!(matches!(
            wizard.begin_confirm(&late),
            Err(BookingError::SlotUnavailable(_))
        ));
        assert!(!wizard.is_submitting());
        assert!(wizard.error().is_some());
        assert_eq!(wizard.phase(), WizardPhase::Confirm);
    }

    #[test]
    fn site_and_date_are_locked_while_submitting() {
        let mut wizard = wizard_in_slots(None);
        assert!(wizard.next(10.0).is_ok());
        assert!(wizard.begin_confirm(&ctx(10.0)).is_ok());
        let Some(other_day) = day().succ_opt() else {
            panic!("valid date");
        };
        wizard.select_date(other_day);
        wizard.select_site(SiteId::new());
        assert_eq!(wizard.phase(), WizardPhase::Confirm);
        assert_eq!(wizard.date(), Some(day()));
        assert_eq!(wizard.slots(), &[slot(13)]);

        assert_eq!(wizard.finish_confirm(Ok(())), Some(WizardExit::ShowSuccess));
        assert!(wizard.reset_after_success());
    }
}
