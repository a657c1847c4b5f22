//! WebSocket message types: envelope, commands, and events.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::BookingId;
use crate::domain::drag::{PointerPos, SurfaceRect};

/// Top-level WebSocket message envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WsMessage {
    /// Client-provided ID for requests; server-generated for events.
    pub id: String,
    /// Message type discriminator.
    #[serde(rename = "type")]
    pub msg_type: WsMessageType,
    /// ISO-8601 timestamp.
    pub timestamp: DateTime<Utc>,
    /// Variant-specific payload.
    pub payload: serde_json::Value,
}

impl WsMessage {
    /// Builds a server message stamped with the current time.
    #[must_use]
    pub fn new(id: impl Into<String>, msg_type: WsMessageType, payload: serde_json::Value) -> Self {
        Self {
            id: id.into(),
            msg_type,
            timestamp: Utc::now(),
            payload,
        }
    }

    /// Builds an error message.
    #[must_use]
    pub fn error(id: impl Into<String>, code: u16, message: impl Into<String>) -> Self {
        Self::new(
            id,
            WsMessageType::Error,
            serde_json::json!({
                "code": code,
                "message": message.into(),
            }),
        )
    }
}

/// Discriminator for WebSocket message types.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WsMessageType {
    /// Client → Server command.
    Command,
    /// Server → Client response to a command.
    Response,
    /// Server → Client broadcast event.
    Event,
    /// Server → Client error.
    Error,
}

/// Commands that a client can send over WebSocket.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum WsCommand {
    /// Subscribe to booking events of rooms or companies.
    Subscribe {
        /// Resource IDs to follow. Use `["*"]` for all rooms.
        #[serde(default)]
        resource_ids: Vec<String>,
        /// Companies whose credit-moving events to follow.
        #[serde(default)]
        company_ids: Vec<String>,
    },
    /// Unsubscribe from rooms or companies.
    Unsubscribe {
        /// Resource IDs to drop. `"*"` drops every room.
        #[serde(default)]
        resource_ids: Vec<String>,
        /// Companies to drop.
        #[serde(default)]
        company_ids: Vec<String>,
    },
    /// Sets the day columns of the calendar the drag gestures run on.
    SetWeek {
        /// Day columns, left to right.
        days: Vec<NaiveDate>,
    },
    /// Pointer pressed on a booking block.
    PointerDown {
        /// Booking under the pointer.
        booking_id: BookingId,
        /// Pointer position.
        pointer: PointerPos,
        /// Drop-surface rectangle.
        rect: SurfaceRect,
    },
    /// Pointer moved.
    PointerMove {
        /// Pointer position.
        pointer: PointerPos,
    },
    /// Pointer released.
    PointerUp {
        /// Pointer position.
        pointer: PointerPos,
    },
    /// Escape pressed; aborts the gesture.
    Escape,
}
