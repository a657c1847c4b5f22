//! Drag-to-reschedule gesture on the weekly calendar.
//!
//! The gesture is a small state machine, `Idle → Armed → Dragging → Idle`.
//! Pointer-down arms it on an eligible booking. Moving past the threshold
//! starts a drag. Pointer-up resolves to a click, a no-op or a reschedule.
//! The geometry helpers are pure and independent of any UI toolkit.

use chrono::{NaiveDate, NaiveDateTime, TimeDelta, Timelike};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::booking::{Booking, BookingStatus};
use super::ids::BookingId;
use super::slot::{BusinessHours, snap_to_grid};

/// Pointer position in viewport pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PointerPos {
    /// Horizontal coordinate.
    pub x: f64,
    /// Vertical coordinate.
    pub y: f64,
}

/// Bounding rectangle of the drop surface, in viewport pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SurfaceRect {
    /// Left edge.
    pub left: f64,
    /// Top edge.
    pub top: f64,
    /// Width covering all day columns.
    pub width: f64,
    /// Height covering the business window.
    pub height: f64,
}

/// Static geometry of the weekly grid.
#[derive(Debug, Clone, PartialEq)]
pub struct WeekGrid {
    /// Day columns, left to right.
    pub days: Vec<NaiveDate>,
    /// Hours drawn on the grid.
    pub hours: BusinessHours,
    /// Pixel height of one hour.
    pub hour_height: f64,
    /// Snap granularity in minutes.
    pub snap_minutes: u32,
}

impl WeekGrid {
    /// Vertical offset of a local time, relative to the top of the window.
    #[must_use]
    pub fn top_for(&self, time: NaiveDateTime) -> f64 {
        let minutes =
            f64::from(time.hour() * 60 + time.minute()) - f64::from(self.hours.start * 60);
        minutes / 60.0 * self.hour_height
    }

    /// Pixel height of a duration.
    #[must_use]
    pub fn height_for(&self, duration: TimeDelta) -> f64 {
        #[allow(clippy::cast_precision_loss)]
        let minutes = duration.num_minutes() as f64;
        minutes / 60.0 * self.hour_height
    }

    /// Total drawable height of the business window.
    #[must_use]
    pub fn total_height(&self) -> f64 {
        f64::from(self.hours.len_hours()) * self.hour_height
    }

    /// Column index of `day`, if it is shown.
    #[must_use]
    pub fn column_of(&self, day: NaiveDate) -> Option<usize> {
        self.days.iter().position(|d| *d == day)
    }
}

/// Index of the column under horizontal position `x`.
///
/// The surface is split into `columns` equal-width columns. The result is
/// clamped into `[0, columns - 1]`.
#[must_use]
pub fn column_at(x: f64, rect: &SurfaceRect, columns: usize) -> usize {
    if columns == 0 || rect.width <= 0.0 {
        return 0;
    }
    #[allow(clippy::cast_precision_loss)]
    let column_width = rect.width / columns as f64;
    let raw = ((x - rect.left) / column_width).floor();
    if raw.is_nan() || raw < 0.0 {
        return 0;
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let index = raw as usize;
    index.min(columns - 1)
}

/// Clamps a block top so that the whole block stays on the surface.
#[must_use]
pub fn clamp_top(top: f64, block_height: f64, surface_height: f64) -> f64 {
    top.clamp(0.0, (surface_height - block_height).max(0.0))
}

/// A booking as placed on the weekly grid, in local wall-clock time.
#[derive(Debug, Clone, PartialEq)]
pub struct DraggableBooking {
    /// Booking identifier.
    pub id: BookingId,
    /// Local start.
    pub start: NaiveDateTime,
    /// Local end.
    pub end: NaiveDateTime,
    /// Booking status.
    pub status: BookingStatus,
}

impl DraggableBooking {
    /// Places a backend booking on the grid in time zone `tz`.
    #[must_use]
    pub fn from_booking<Tz: chrono::TimeZone>(booking: &Booking, tz: &Tz) -> Self {
        Self {
            id: booking.id,
            start: booking.start.with_timezone(tz).naive_local(),
            end: booking.end.with_timezone(tz).naive_local(),
            status: booking.status,
        }
    }
}

/// Geometry captured for one gesture.
#[derive(Debug, Clone, PartialEq)]
pub struct DragState {
    /// Booking being moved.
    pub booking: DraggableBooking,
    /// Pointer position at pointer-down.
    pub origin: PointerPos,
    /// Block top at pointer-down.
    pub initial_top: f64,
    /// Block height.
    pub height: f64,
    /// Live block top.
    pub live_top: f64,
    /// Column at pointer-down.
    pub origin_day: usize,
    /// Live column.
    pub live_day: usize,
    /// Drop-surface rectangle.
    pub rect: SurfaceRect,
}

#[derive(Debug, Clone, PartialEq)]
enum Gesture {
    Idle,
    Armed(DragState),
    Dragging(DragState),
}

/// Why a pointer-down did not arm the gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Ineligible {
    /// Cancelled bookings cannot move.
    Cancelled,
    /// Bookings that already started cannot move.
    Past,
    /// The booking is not on a shown day.
    OffGrid,
    /// Another gesture is in progress.
    Busy,
}

/// Result of releasing the pointer.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum DragOutcome {
    /// No gesture was active.
    Ignored,
    /// Movement stayed under the threshold: open the booking details.
    OpenDetails {
        /// Clicked booking.
        booking_id: BookingId,
    },
    /// Dropped where it started.
    Unchanged {
        /// Dragged booking.
        booking_id: BookingId,
    },
    /// Dropped on a new slot; issue the reschedule.
    Reschedule {
        /// Dragged booking.
        booking_id: BookingId,
        /// New local start.
        start: NaiveDateTime,
        /// New local end, preserving the original duration.
        end: NaiveDateTime,
    },
}

/// Pointer-driven reschedule controller for one calendar view.
#[derive(Debug, Clone)]
pub struct DragController {
    grid: WeekGrid,
    threshold_px: f64,
    gesture: Gesture,
}

impl DragController {
    /// Creates an idle controller.
    #[must_use]
    pub fn new(grid: WeekGrid, threshold_px: f64) -> Self {
        Self {
            grid,
            threshold_px,
            gesture: Gesture::Idle,
        }
    }

    /// Grid geometry.
    #[must_use]
    pub fn grid(&self) -> &WeekGrid {
        &self.grid
    }

    /// Whether the threshold was crossed for the current gesture.
    #[must_use]
    pub fn is_dragging(&self) -> bool {
        matches!(self.gesture, Gesture::Dragging(_))
    }

    /// Geometry of the current gesture, if any.
    #[must_use]
    pub fn drag_state(&self) -> Option<&DragState> {
        match &self.gesture {
            Gesture::Idle => None,
            Gesture::Armed(state) | Gesture::Dragging(state) => Some(state),
        }
    }

    /// Arms the gesture on `booking`.
    ///
    /// # Errors
    ///
    /// Returns the reason when the booking cannot be dragged. The controller
    /// stays idle in that case.
    pub fn pointer_down(
        &mut self,
        booking: DraggableBooking,
        pointer: PointerPos,
        rect: SurfaceRect,
        now: NaiveDateTime,
    ) -> Result<(), Ineligible> {
        if !matches!(self.gesture, Gesture::Idle) {
            return Err(Ineligible::Busy);
        }
        if booking.status == BookingStatus::Cancelled {
            return Err(Ineligible::Cancelled);
        }
        if booking.start <= now {
            return Err(Ineligible::Past);
        }
        let origin_day = self
            .grid
            .column_of(booking.start.date())
            .ok_or(Ineligible::OffGrid)?;
        let initial_top = self.grid.top_for(booking.start);
        let height = self.grid.height_for(booking.end - booking.start);
        self.gesture = Gesture::Armed(DragState {
            booking,
            origin: pointer,
            initial_top,
            height,
            live_top: initial_top,
            origin_day,
            live_day: origin_day,
            rect,
        });
        Ok(())
    }

    /// Tracks the pointer. Returns `true` while dragging.
    pub fn pointer_move(&mut self, pointer: PointerPos) -> bool {
        let columns = self.grid.days.len();
        let threshold = self.threshold_px;
        let gesture = std::mem::replace(&mut self.gesture, Gesture::Idle);
        self.gesture = match gesture {
            Gesture::Idle => Gesture::Idle,
            Gesture::Armed(state) => {
                let dx = (pointer.x - state.origin.x).abs();
                let dy = (pointer.y - state.origin.y).abs();
                if dx > threshold || dy > threshold {
                    Gesture::Dragging(track(state, pointer, columns))
                } else {
                    Gesture::Armed(state)
                }
            }
            Gesture::Dragging(state) => Gesture::Dragging(track(state, pointer, columns)),
        };
        self.is_dragging()
    }

    /// Releases the pointer and resolves the gesture.
    ///
    /// A drop whose new start is not after `now` resolves to
    /// [`DragOutcome::Unchanged`]. The gesture state is always cleared.
    pub fn pointer_up(&mut self, pointer: PointerPos, now: NaiveDateTime) -> DragOutcome {
        self.pointer_move(pointer);
        match std::mem::replace(&mut self.gesture, Gesture::Idle) {
            Gesture::Idle => DragOutcome::Ignored,
            Gesture::Armed(state) => DragOutcome::OpenDetails {
                booking_id: state.booking.id,
            },
            Gesture::Dragging(state) => self.resolve_drop(&state, now),
        }
    }

    /// Aborts an active gesture. Returns `true` if one was active.
    pub fn escape(&mut self) -> bool {
        !matches!(
            std::mem::replace(&mut self.gesture, Gesture::Idle),
            Gesture::Idle
        )
    }

    fn resolve_drop(&self, state: &DragState, now: NaiveDateTime) -> DragOutcome {
        let booking_id = state.booking.id;
        let step_fraction = f64::from(self.grid.snap_minutes) / 60.0;
        let step = self.grid.hour_height * step_fraction;
        let total = state.rect.height.min(self.grid.total_height()).max(state.height);
        let snapped = snap_to_grid(state.live_top, self.grid.hour_height, step_fraction, total);
        // Last grid line at which the whole block still ends inside the window.
        let snapped = if step > 0.0 {
            snapped.min(((total - state.height) / step).floor().max(0.0) * step)
        } else {
            snapped
        };

        if state.live_day == state.origin_day && (snapped - state.initial_top).abs() < 1.0 {
            return DragOutcome::Unchanged { booking_id };
        }

        let Some(day) = self.grid.days.get(state.live_day).copied() else {
            return DragOutcome::Unchanged { booking_id };
        };

        #[allow(clippy::cast_possible_truncation)]
        let offset_minutes = (snapped / self.grid.hour_height * 60.0).round() as i64;
        let window_start = day.and_time(chrono::NaiveTime::MIN)
            + TimeDelta::hours(i64::from(self.grid.hours.start));
        let start = window_start + TimeDelta::minutes(offset_minutes);
        let end = start + (state.booking.end - state.booking.start);

        if start == state.booking.start || start <= now {
            return DragOutcome::Unchanged { booking_id };
        }

        DragOutcome::Reschedule {
            booking_id,
            start,
            end,
        }
    }
}

fn track(mut state: DragState, pointer: PointerPos, columns: usize) -> DragState {
    let dy = pointer.y - state.origin.y;
    state.live_top = clamp_top(state.initial_top + dy, state.height, state.rect.height);
    state.live_day = column_at(pointer.x, &state.rect, columns);
    state
}
