//! WebSocket layer: connection handling, message routing, subscriptions.
//!
//! The WebSocket endpoint at `/ws` pushes booking events to clients
//! subscribed to the affected rooms, and runs the drag-to-reschedule
//! gesture of a weekly calendar, one controller per connection.

pub mod connection;
pub mod handler;
pub mod messages;
pub mod subscription;
