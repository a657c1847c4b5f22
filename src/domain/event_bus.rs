//! Broadcast channel for booking events.
//!
//! [`EventBus`] wraps a [`tokio::sync::broadcast`] channel. Every booking
//! mutation publishes a [`BookingEvent`], and each WebSocket connection
//! subscribes to forward the ones matching its rooms.

use tokio::sync::broadcast;

use super::BookingEvent;

/// Broadcast bus for [`BookingEvent`]s.
///
/// Lagging receivers lose the oldest events once the ring buffer is full.
/// Events are only refetch hints, so a lost one costs a stale view until
/// the next refresh.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<BookingEvent>,
}

impl EventBus {
    /// Creates a new `EventBus` with the given channel capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publishes an event, returning the number of receivers reached.
    pub fn publish(&self, event: BookingEvent) -> usize {
        self.sender.send(event).unwrap_or(0)
    }

    /// Creates a receiver for all future events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<BookingEvent> {
        self.sender.subscribe()
    }

    /// Returns the current number of active receivers.
    #[must_use]
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}
