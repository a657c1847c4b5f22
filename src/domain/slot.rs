//! Hour slots, business-day navigation and grid snapping.
//!
//! A slot is one bookable hour identified by its starting label (`"14:00"`).
//! Everything here is pure and deterministic.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Days, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Weekday};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use utoipa::ToSchema;

use crate::error::BookingError;

/// Formats an hour of the day as a slot label (`9` → `"09:00"`).
#[must_use]
pub fn hour_to_slot(hour: u32) -> String {
    format!("{hour:02}:00")
}

/// Extracts the hour from a slot label (`"09:00"` → `9`).
///
/// Labels without a parseable hour map to `0`.
#[must_use]
pub fn slot_to_hour(label: &str) -> u32 {
    label
        .split(':')
        .next()
        .and_then(|h| h.trim().parse().ok())
        .unwrap_or(0)
}

/// One bookable hour, `0..=23`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, ToSchema)]
#[schema(value_type = String, example = "14:00")]
pub struct Slot(u8);

impl Slot {
    /// Creates a slot for the given hour, or `None` outside `0..=23`.
    #[must_use]
    pub fn from_hour(hour: u32) -> Option<Self> {
        u8::try_from(hour).ok().filter(|h| *h < 24).map(Self)
    }

    /// Returns the hour of day.
    #[must_use]
    pub const fn hour(self) -> u32 {
        self.0 as u32
    }

    /// Returns the canonical `"HH:00"` label.
    #[must_use]
    pub fn label(self) -> String {
        hour_to_slot(self.hour())
    }

    /// Returns the slot that follows this one, if any.
    #[must_use]
    pub fn next(self) -> Option<Self> {
        Self::from_hour(self.hour() + 1)
    }

    /// Start of this slot as a wall-clock time.
    #[must_use]
    pub fn start_time(self) -> NaiveTime {
        NaiveTime::from_hms_opt(self.hour(), 0, 0).unwrap_or(NaiveTime::MIN)
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:00", self.0)
    }
}

impl FromStr for Slot {
    type Err = BookingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (hour, minutes) = s
            .split_once(':')
            .ok_or_else(|| BookingError::InvalidRequest(format!("invalid slot label: {s}")))?;
        if minutes != "00" {
            return Err(BookingError::InvalidRequest(format!(
                "slot must start on the hour: {s}"
            )));
        }
        hour.parse::<u32>()
            .ok()
            .and_then(Self::from_hour)
            .ok_or_else(|| BookingError::InvalidRequest(format!("invalid slot label: {s}")))
    }
}

impl Serialize for Slot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Slot {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Daily window in which rooms can be booked, `[start, end)` in whole hours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct BusinessHours {
    /// First bookable hour.
    pub start: u32,
    /// Hour at which the last slot ends.
    pub end: u32,
}

impl BusinessHours {
    /// Creates a window, rejecting empty or out-of-day ranges.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::InvalidRequest`] unless `start < end <= 24`.
    pub fn new(start: u32, end: u32) -> Result<Self, BookingError> {
        if start >= end || end > 24 {
            return Err(BookingError::InvalidRequest(format!(
                "invalid business hours {start}..{end}"
            )));
        }
        Ok(Self { start, end })
    }

    /// Iterates the slots of the window in order.
    pub fn slots(self) -> impl Iterator<Item = Slot> {
        (self.start..self.end).filter_map(Slot::from_hour)
    }

    /// Returns `true` if the slot lies inside the window.
    #[must_use]
    pub fn contains(self, slot: Slot) -> bool {
        (self.start..self.end).contains(&slot.hour())
    }

    /// Number of hours in the window.
    #[must_use]
    pub const fn len_hours(self) -> u32 {
        self.end - self.start
    }

    /// Wall-clock start of `slot` on `date`.
    #[must_use]
    pub fn slot_start(date: NaiveDate, slot: Slot) -> NaiveDateTime {
        date.and_time(slot.start_time())
    }

    /// Whether `slot` on `date` starts before the local time `now`.
    ///
    /// A started slot can no longer be booked.
    #[must_use]
    pub fn has_started(date: NaiveDate, slot: Slot, now: NaiveDateTime) -> bool {
        Self::slot_start(date, slot) < now
    }
}

impl Default for BusinessHours {
    fn default() -> Self {
        Self { start: 8, end: 20 }
    }
}

/// Returns `true` if both instants fall on the same calendar day of their
/// time zone.
#[must_use]
pub fn is_same_day<Tz: TimeZone>(a: &DateTime<Tz>, b: &DateTime<Tz>) -> bool {
    a.date_naive() == b.date_naive()
}

/// Returns `true` if `date` is the current calendar day as seen from `now`.
#[must_use]
pub fn is_today<Tz: TimeZone>(date: NaiveDate, now: &DateTime<Tz>) -> bool {
    now.date_naive() == date
}

fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Next day after `date` that is not a Saturday or Sunday.
#[must_use]
pub fn next_business_day(date: NaiveDate) -> NaiveDate {
    let mut next = date;
    loop {
        next = next.checked_add_days(Days::new(1)).unwrap_or(NaiveDate::MAX);
        if !is_weekend(next) || next == NaiveDate::MAX {
            return next;
        }
    }
}

/// Previous business day before `date`, or `None` if it would fall before
/// `today`.
#[must_use]
pub fn previous_business_day(date: NaiveDate, today: NaiveDate) -> Option<NaiveDate> {
    let mut prev = date;
    loop {
        prev = prev.checked_sub_days(Days::new(1))?;
        if prev < today {
            return None;
        }
        if !is_weekend(prev) {
            return Some(prev);
        }
    }
}

/// Rounds a pixel offset to the nearest grid line and clamps it into the
/// drawable area.
///
/// The grid step is `unit_height * step_fraction` (60 px per hour with a
/// half-hour fraction gives 30 px). The result lies in
/// `[0, total_height - step]`.
#[must_use]
pub fn snap_to_grid(offset: f64, unit_height: f64, step_fraction: f64, total_height: f64) -> f64 {
    let step = unit_height * step_fraction;
    if step <= 0.0 || !offset.is_finite() {
        return 0.0;
    }
    let snapped = (offset / step).round() * step;
    let max = ((total_height - step) / step).floor().max(0.0) * step;
    snapped.clamp(0.0, max)
}
