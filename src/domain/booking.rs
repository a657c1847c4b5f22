//! Bookings, meeting rooms and credit balances.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::ids::{BookingId, CompanyId, ResourceId, SiteId, UserId};

/// Lifecycle status of a booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    /// Active reservation.
    Confirmed,
    /// Awaiting confirmation; still blocks the slot.
    Pending,
    /// Terminal. Never blocks a slot.
    Cancelled,
}

impl BookingStatus {
    /// Returns `true` if the booking occupies its interval.
    #[must_use]
    pub const fn blocks_slot(self) -> bool {
        !matches!(self, Self::Cancelled)
    }

    /// Database / wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Confirmed => "confirmed",
            Self::Pending => "pending",
            Self::Cancelled => "cancelled",
        }
    }

    /// Parses the database representation, defaulting unknown values to
    /// `Confirmed`.
    #[must_use]
    pub fn from_db(s: &str) -> Self {
        match s {
            "pending" => Self::Pending,
            "cancelled" => Self::Cancelled,
            _ => Self::Confirmed,
        }
    }
}

/// A reservation of one resource for `[start, end)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Booking {
    /// Booking identifier.
    pub id: BookingId,
    /// Reserved resource.
    pub resource_id: ResourceId,
    /// Owning user.
    pub user_id: UserId,
    /// Company of the owning user.
    pub company_id: Option<CompanyId>,
    /// Inclusive start.
    pub start: DateTime<Utc>,
    /// Exclusive end.
    pub end: DateTime<Utc>,
    /// Lifecycle status.
    pub status: BookingStatus,
    /// Credits charged at creation. Not recomputed on reschedule.
    pub credits_used: Option<f64>,
    /// Free-form notes.
    #[serde(default)]
    pub notes: Option<String>,
}

impl Booking {
    /// Returns `true` if `[start, end)` intersects this booking's interval.
    #[must_use]
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.start < end && self.end > start
    }

    /// Duration of the booking.
    #[must_use]
    pub fn duration(&self) -> chrono::Duration {
        self.end - self.start
    }
}

/// A booking joined with the room it occupies, as listed on a site
/// planning view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RoomBooking {
    /// Underlying booking.
    #[serde(flatten)]
    pub booking: Booking,
    /// Display name of the room.
    pub resource_name: String,
}

/// Kind of bookable resource. Only meeting rooms are bookable through the
/// wizard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    /// Meeting room billed per hour in credits.
    MeetingRoom,
    /// Dedicated desk.
    Desk,
    /// Private office.
    Office,
    /// Anything else managed by the back office.
    Other,
}

impl ResourceType {
    /// Parses the database representation.
    #[must_use]
    pub fn from_db(s: &str) -> Self {
        match s {
            "meeting_room" => Self::MeetingRoom,
            "desk" => Self::Desk,
            "office" => Self::Office,
            _ => Self::Other,
        }
    }
}

/// Availability flag set by the back office.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ResourceStatus {
    /// Bookable.
    Available,
    /// Hidden from booking surfaces.
    Unavailable,
}

impl ResourceStatus {
    /// Parses the database representation. Anything but `available` hides
    /// the resource.
    #[must_use]
    pub fn from_db(s: &str) -> Self {
        if s == "available" {
            Self::Available
        } else {
            Self::Unavailable
        }
    }
}

/// A bookable unit belonging to a site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Resource {
    /// Resource identifier.
    pub id: ResourceId,
    /// Owning site.
    pub site_id: SiteId,
    /// Display name.
    pub name: String,
    /// Resource kind.
    #[serde(rename = "type")]
    pub resource_type: ResourceType,
    /// Seats, when known.
    pub capacity: Option<u32>,
    /// Credits per hour. Absent means one credit per hour.
    pub hourly_credit_rate: Option<f64>,
    /// Back-office availability flag.
    pub status: ResourceStatus,
    /// Equipment available in the room.
    #[serde(default)]
    #[schema(value_type = Vec<String>)]
    pub equipment: BTreeSet<String>,
    /// Photo URLs.
    #[serde(default)]
    pub photos: Vec<String>,
}

impl Resource {
    /// Credits charged per booked hour.
    #[must_use]
    pub fn credit_rate(&self) -> f64 {
        self.hourly_credit_rate.filter(|r| *r > 0.0).unwrap_or(1.0)
    }

    /// Returns `true` if the resource may appear on booking surfaces.
    #[must_use]
    pub fn is_bookable_room(&self) -> bool {
        self.resource_type == ResourceType::MeetingRoom && self.status == ResourceStatus::Available
    }
}

/// Aggregate credits of a company.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CreditBalance {
    /// Total granted.
    pub allocated: f64,
    /// Spendable now. Always derived by the backend.
    pub remaining: f64,
}

/// Input of the create-booking mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct NewBooking {
    /// Booking user.
    pub user_id: UserId,
    /// Room to reserve.
    pub resource_id: ResourceId,
    /// Inclusive start.
    pub start: DateTime<Utc>,
    /// Exclusive end.
    pub end: DateTime<Utc>,
    /// Credits to charge.
    pub credits_to_use: f64,
    /// Company billed for the credits.
    pub company_id: Option<CompanyId>,
}
