//! Unavailable-slot computation and the multi-room planning grid.
//!
//! Availability is advisory. The backend has the final word on overlaps and
//! this module only keeps the UI from offering slots that are obviously taken.

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeDelta, TimeZone, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use super::booking::{Booking, Resource};
use super::ids::{BookingId, ResourceId};
use super::slot::{BusinessHours, Slot};

/// The booking whose slots are being edited.
///
/// Its original hours never block themselves, so a user can keep or shrink
/// a reservation without the editor reporting a conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EditingBooking {
    /// Booking being edited.
    pub id: BookingId,
    /// Room the booking occupies. Its hours are only released on that room.
    pub resource_id: ResourceId,
    /// Original start.
    pub start: DateTime<Utc>,
    /// Original end.
    pub end: DateTime<Utc>,
}

impl From<&Booking> for EditingBooking {
    fn from(booking: &Booking) -> Self {
        Self {
            id: booking.id,
            resource_id: booking.resource_id,
            start: booking.start,
            end: booking.end,
        }
    }
}

fn local<Tz: TimeZone>(instant: DateTime<Utc>, tz: &Tz) -> NaiveDateTime {
    instant.with_timezone(tz).naive_local()
}

/// Slots of `hours` on `day` that overlap the local interval `[start, end)`.
fn covered_slots(
    start: NaiveDateTime,
    end: NaiveDateTime,
    day: NaiveDate,
    hours: BusinessHours,
) -> impl Iterator<Item = Slot> {
    hours.slots().filter(move |slot| {
        let slot_start = BusinessHours::slot_start(day, *slot);
        let slot_end = slot_start + TimeDelta::hours(1);
        start < slot_end && end > slot_start
    })
}

/// Computes the hours of `day` that cannot be booked.
///
/// A slot is unavailable when any non-cancelled booking overlaps it, even
/// partially. Bookings are interpreted in the viewer time zone `tz`.
/// `editing` only releases its hours when every booking belongs to its room.
pub fn unavailable_slots<Tz: TimeZone>(
    bookings: &[Booking],
    day: NaiveDate,
    hours: BusinessHours,
    tz: &Tz,
    editing: Option<&EditingBooking>,
) -> BTreeSet<Slot> {
    let editing = editing.filter(|e| bookings.iter().all(|b| b.resource_id == e.resource_id));
    let mut blocked: BTreeSet<Slot> = bookings
        .iter()
        .filter(|b| b.status.blocks_slot())
        .filter(|b| editing.is_none_or(|e| e.id != b.id))
        .flat_map(|b| covered_slots(local(b.start, tz), local(b.end, tz), day, hours))
        .collect();

    if let Some(edit) = editing {
        let start = local(edit.start, tz);
        if start.date() == day {
            for own in covered_slots(start, local(edit.end, tz), day, hours) {
                blocked.remove(&own);
            }
        }
    }

    blocked
}

/// Slots of the window that remain bookable.
pub fn available_slots(unavailable: &BTreeSet<Slot>, hours: BusinessHours) -> Vec<Slot> {
    hours.slots().filter(|s| !unavailable.contains(s)).collect()
}

/// End hours the slot picker may offer after choosing `start`.
///
/// Runs from `start + 1` up to the first blocked slot (which may still serve
/// as an end boundary) or the end of the window. Empty if `start` itself is
/// blocked or outside the window.
pub fn available_end_hours(
    start: Slot,
    unavailable: &BTreeSet<Slot>,
    hours: BusinessHours,
) -> Vec<u32> {
    if !hours.contains(start) || unavailable.contains(&start) {
        return Vec::new();
    }
    let mut ends = Vec::new();
    for hour in (start.hour() + 1)..=hours.end {
        ends.push(hour);
        if Slot::from_hour(hour).is_some_and(|s| unavailable.contains(&s)) {
            break;
        }
    }
    ends
}

/// Why a planning cell is or is not bookable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CellState {
    /// Free for booking.
    Free,
    /// Taken by a non-cancelled booking.
    Booked,
    /// Already started (today only).
    Past,
}

/// One (room, hour) cell of the planning grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct PlanningCell {
    /// Hour slot.
    pub slot: Slot,
    /// Availability of the cell.
    pub state: CellState,
}

impl PlanningCell {
    /// Returns `true` if the cell can start a booking.
    #[must_use]
    pub fn is_bookable(&self) -> bool {
        self.state == CellState::Free
    }
}

/// One room's row in the planning grid.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct PlanningRow {
    /// Room described by the row.
    pub resource_id: ResourceId,
    /// Room name.
    pub name: String,
    /// Seats, when known.
    pub capacity: Option<u32>,
    /// Credits per hour.
    pub credit_rate: f64,
    /// Cells in business-hour order.
    pub cells: Vec<PlanningCell>,
}

/// Availability of every bookable room of a site for one day.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct PlanningGrid {
    /// Day covered by the grid.
    pub date: NaiveDate,
    /// Column slots.
    pub slots: Vec<Slot>,
    /// One row per bookable room.
    pub rows: Vec<PlanningRow>,
}

impl PlanningGrid {
    /// Builds the grid from each room's bookings.
    ///
    /// Rooms that are not available meeting rooms are left out. On the
    /// current day, a slot whose start is before `now` is marked past.
    pub fn build<Tz: TimeZone>(
        rooms: &[Resource],
        bookings_by_room: &HashMap<ResourceId, Vec<Booking>>,
        day: NaiveDate,
        hours: BusinessHours,
        now: &DateTime<Tz>,
    ) -> Self {
        let tz = now.timezone();
        let now_local = now.naive_local();
        let rows = rooms
            .iter()
            .filter(|room| room.is_bookable_room())
            .map(|room| {
                let bookings = bookings_by_room
                    .get(&room.id)
                    .map(Vec::as_slice)
                    .unwrap_or_default();
                let unavailable = unavailable_slots(bookings, day, hours, &tz, None);
                let cells = hours
                    .slots()
                    .map(|slot| {
                        let state = if unavailable.contains(&slot) {
                            CellState::Booked
                        } else if BusinessHours::has_started(day, slot, now_local) {
                            CellState::Past
                        } else {
                            CellState::Free
                        };
                        PlanningCell { slot, state }
                    })
                    .collect();
                PlanningRow {
                    resource_id: room.id,
                    name: room.name.clone(),
                    capacity: room.capacity,
                    credit_rate: room.credit_rate(),
                    cells,
                }
            })
            .collect();

        Self {
            date: day,
            slots: hours.slots().collect(),
            rows,
        }
    }

    /// Looks up one cell.
    #[must_use]
    pub fn cell(&self, resource_id: ResourceId, slot: Slot) -> Option<&PlanningCell> {
        self.rows
            .iter()
            .find(|r| r.resource_id == resource_id)
            .and_then(|r| r.cells.iter().find(|c| c.slot == slot))
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::booking::{BookingStatus, ResourceStatus, ResourceType};
    use crate::domain::ids::{SiteId, UserId};
    use chrono_tz::Europe::Paris;

    fn day() -> NaiveDate {
        let Some(d) = NaiveDate::from_ymd_opt(2024, 6, 3) else {
            panic!("valid date");
        };
        d
    }

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        let Some(t) = Paris.with_ymd_and_hms(2024, 6, 3, hour, minute, 0).single() else {
            panic!("valid time");
        };
        t.with_timezone(&Utc)
    }

    fn booking(start: DateTime<Utc>, end: DateTime<Utc>, status: BookingStatus) -> Booking {
        Booking {
            id: BookingId::new(),
            resource_id: ResourceId::new(),
            user_id: UserId::new(),
            company_id: None,
            start,
            end,
            status,
            credits_used: None,
            notes: None,
        }
    }

    fn slot(hour: u32) -> Slot {
        let Some(s) = Slot::from_hour(hour) else {
            panic!("valid hour");
        };
        s
    }

    fn labels(set: &BTreeSet<Slot>) -> Vec<String> {
        set.iter().map(|s| s.label()).collect()
    }

    #[test]
    fn booking_blocks_each_covered_hour() {
        let bookings = vec![booking(at(10, 0), at(12, 0), BookingStatus::Confirmed)];
        let set = unavailable_slots(&bookings, day(), BusinessHours::default(), &Paris, None);
        assert_eq!(labels(&set), vec!["10:00", "11:00"]);
    }

    #[test]
    fn partial_hours_block_the_whole_hour() {
        let bookings = vec![booking(at(9, 30), at(10, 15), BookingStatus::Pending)];
        let set = unavailable_slots(&bookings, day(), BusinessHours::default(), &Paris, None);
        assert_eq!(labels(&set), vec!["09:00", "10:00"]);
    }

    #[test]
    fn cancelled_bookings_never_block() {
        let bookings = vec![booking(at(10, 0), at(12, 0), BookingStatus::Cancelled)];
        let set = unavailable_slots(&bookings, day(), BusinessHours::default(), &Paris, None);
        assert!(set.is_empty());
    }

    #[test]
    fn hours_outside_window_are_clipped() {
        let bookings = vec![booking(at(6, 0), at(9, 0), BookingStatus::Confirmed)];
        let set = unavailable_slots(&bookings, day(), BusinessHours::default(), &Paris, None);
        assert_eq!(labels(&set), vec!["08:00"]);
    }

    #[test]
    fn other_days_do_not_leak() {
        let next_day = at(10, 0) + TimeDelta::days(1);
        let bookings = vec![booking(
            next_day,
            next_day + TimeDelta::hours(2),
            BookingStatus::Confirmed,
        )];
        let set = unavailable_slots(&bookings, day(), BusinessHours::default(), &Paris, None);
        assert!(set.is_empty());
    }

    #[test]
    fn edited_booking_never_blocks_itself() {
        let own = booking(at(14, 0), at(16, 0), BookingStatus::Confirmed);
        let other = Booking {
            resource_id: own.resource_id,
            ..booking(at(10, 0), at(11, 0), BookingStatus::Confirmed)
        };
        let editing = EditingBooking::from(&own);
        let bookings = vec![own, other];
        let hours = BusinessHours::default();
        let set = unavailable_slots(&bookings, day(), hours, &Paris, Some(&editing));
        assert_eq!(labels(&set), vec!["10:00"]);
    }

    #[test]
    fn edited_booking_on_another_room_releases_nothing() {
        let elsewhere = booking(at(14, 0), at(16, 0), BookingStatus::Confirmed);
        let here = booking(at(14, 0), at(16, 0), BookingStatus::Confirmed);
        let editing = EditingBooking::from(&elsewhere);
        let hours = BusinessHours::default();
        let set = unavailable_slots(&[here], day(), hours, &Paris, Some(&editing));
        assert_eq!(labels(&set), vec!["14:00", "15:00"]);
    }

    #[test]
    fn exact_overlap_property() {
        let hours = BusinessHours::default();
        for start in 8..19 {
            for end in (start + 1)..=20 {
                let bookings = vec![booking(at(start, 0), at(end, 0), BookingStatus::Confirmed)];
                let set = unavailable_slots(&bookings, day(), hours, &Paris, None);
                let expected: BTreeSet<Slot> = (start..end).map(slot).collect();
                assert_eq!(set, expected, "booking {start}..{end}");
            }
        }
    }

    #[test]
    fn end_hours_stop_at_first_blocked_slot() {
        let hours = BusinessHours::default();
        let unavailable: BTreeSet<Slot> = [slot(12), slot(13)].into_iter().collect();
        assert_eq!(available_end_hours(slot(9), &unavailable, hours), vec![10, 11, 12]);
        assert_eq!(
            available_end_hours(slot(14), &unavailable, hours),
            vec![15, 16, 17, 18, 19, 20]
        );
        assert!(available_end_hours(slot(12), &unavailable, hours).is_empty());
        assert!(available_end_hours(slot(21), &unavailable, hours).is_empty());
    }

    fn room(name: &str, status: ResourceStatus) -> Resource {
        Resource {
            id: ResourceId::new(),
            site_id: SiteId::new(),
            name: name.to_string(),
            resource_type: ResourceType::MeetingRoom,
            capacity: Some(6),
            hourly_credit_rate: Some(2.0),
            status,
            equipment: BTreeSet::new(),
            photos: Vec::new(),
        }
    }

    #[test]
    fn planning_grid_is_computed_per_room() {
        let a = room("A", ResourceStatus::Available);
        let b = room("B", ResourceStatus::Available);
        let hidden = room("C", ResourceStatus::Unavailable);
        let mut by_room = HashMap::new();
        by_room.insert(a.id, vec![booking(at(10, 0), at(11, 0), BookingStatus::Confirmed)]);

        let now = at(9, 20).with_timezone(&Paris);
        let grid = PlanningGrid::build(
            &[a.clone(), b.clone(), hidden],
            &by_room,
            day(),
            BusinessHours::default(),
            &now,
        );

        assert_eq!(grid.rows.len(), 2);
        assert_eq!(grid.cell(a.id, slot(10)).map(|c| c.state), Some(CellState::Booked));
        assert_eq!(grid.cell(b.id, slot(10)).map(|c| c.state), Some(CellState::Free));
        assert_eq!(grid.cell(a.id, slot(9)).map(|c| c.state), Some(CellState::Past));
        assert_eq!(grid.cell(b.id, slot(8)).map(|c| c.state), Some(CellState::Past));
        assert!(grid.cell(b.id, slot(11)).is_some_and(PlanningCell::is_bookable));
    }

    #[test]
    fn future_days_have_no_past_cells() {
        let a = room("A", ResourceStatus::Available);
        let now = (at(18, 0) - TimeDelta::days(3)).with_timezone(&Paris);
        let hours = BusinessHours::default();
        let grid = PlanningGrid::build(&[a], &HashMap::new(), day(), hours, &now);
        assert!(grid.rows.iter().flat_map(|r| &r.cells).all(PlanningCell::is_bookable));
    }
}
