//! Per-connection event filter.
//!
//! A client watches rooms (for calendar refetches) and companies (for
//! credit balance refetches). An event is forwarded when either side
//! matches it.

use std::collections::HashSet;

use crate::domain::{BookingEvent, CompanyId, ResourceId};

/// Which rooms a connection follows.
#[derive(Debug, Clone, PartialEq, Eq)]
enum RoomScope {
    /// Only the listed rooms.
    Listed(HashSet<ResourceId>),
    /// Every room (`"*"`).
    Everything,
}

impl Default for RoomScope {
    fn default() -> Self {
        Self::Listed(HashSet::new())
    }
}

/// Event filter of a single WebSocket connection.
#[derive(Debug, Default)]
pub struct EventFilter {
    rooms: RoomScope,
    companies: HashSet<CompanyId>,
}

impl EventFilter {
    /// Follows `ids`. `everything` switches to all rooms, after which the
    /// explicit list is no longer kept.
    pub fn watch_rooms(&mut self, ids: &[ResourceId], everything: bool) {
        if everything {
            self.rooms = RoomScope::Everything;
        } else if let RoomScope::Listed(set) = &mut self.rooms {
            set.extend(ids.iter().copied());
        }
    }

    /// Stops following `ids`. `everything` drops every room, wildcard
    /// included.
    pub fn unwatch_rooms(&mut self, ids: &[ResourceId], everything: bool) {
        if everything {
            self.rooms = RoomScope::default();
        } else if let RoomScope::Listed(set) = &mut self.rooms {
            for id in ids {
                set.remove(id);
            }
        }
    }

    /// Follows the credit-affecting events of `ids`.
    pub fn watch_companies(&mut self, ids: &[CompanyId]) {
        self.companies.extend(ids.iter().copied());
    }

    /// Stops following `ids`.
    pub fn unwatch_companies(&mut self, ids: &[CompanyId]) {
        for id in ids {
            self.companies.remove(id);
        }
    }

    /// Whether `event` should be sent to this connection.
    #[must_use]
    pub fn accepts(&self, event: &BookingEvent) -> bool {
        let room = match &self.rooms {
            RoomScope::Everything => true,
            RoomScope::Listed(set) => set.contains(&event.resource_id()),
        };
        room || event
            .company_id()
            .is_some_and(|c| self.companies.contains(&c))
    }

    /// Number of explicitly listed rooms. Zero under the wildcard.
    #[must_use]
    pub fn room_count(&self) -> usize {
        match &self.rooms {
            RoomScope::Listed(set) => set.len(),
            RoomScope::Everything => 0,
        }
    }

    /// Number of followed companies.
    #[must_use]
    pub fn company_count(&self) -> usize {
        self.companies.len()
    }

    /// Whether every room is followed.
    #[must_use]
    pub fn watches_every_room(&self) -> bool {
        self.rooms == RoomScope::Everything
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use chrono::{TimeDelta, Utc};

    use super::*;
    use crate::domain::BookingId;

    fn created(resource_id: ResourceId, company_id: Option<CompanyId>) -> BookingEvent {
        let start = Utc::now();
        BookingEvent::BookingCreated {
            booking_id: BookingId::new(),
            resource_id,
            company_id,
            start,
            end: start + TimeDelta::hours(1),
            credits_used: 2.0,
            timestamp: start,
        }
    }

    fn moved(resource_id: ResourceId) -> BookingEvent {
        let start = Utc::now();
        BookingEvent::BookingRescheduled {
            booking_id: BookingId::new(),
            resource_id,
            previous_start: start,
            previous_end: start + TimeDelta::hours(1),
            start: start + TimeDelta::days(1),
            end: start + TimeDelta::days(1) + TimeDelta::hours(1),
            timestamp: start,
        }
    }

    #[test]
    fn fresh_filter_accepts_nothing() {
        let filter = EventFilter::default();
        assert!(!filter.accepts(&created(ResourceId::new(), Some(CompanyId::new()))));
    }

    #[test]
    fn listed_rooms_only() {
        let room = ResourceId::new();
        let mut filter = EventFilter::default();
        filter.watch_rooms(&[room], false);
        assert!(filter.accepts(&created(room, None)));
        assert!(filter.accepts(&moved(room)));
        assert!(!filter.accepts(&moved(ResourceId::new())));
    }

    #[test]
    fn company_sees_its_credit_events_on_any_room() {
        let company = CompanyId::new();
        let mut filter = EventFilter::default();
        filter.watch_companies(&[company]);
        assert!(filter.accepts(&created(ResourceId::new(), Some(company))));
        assert!(!filter.accepts(&created(ResourceId::new(), Some(CompanyId::new()))));
        // Reschedules keep credits as they are.
        assert!(!filter.accepts(&moved(ResourceId::new())));

        filter.unwatch_companies(&[company]);
        assert_eq!(filter.company_count(), 0);
        assert!(!filter.accepts(&created(ResourceId::new(), Some(company))));
    }

    #[test]
    fn wildcard_replaces_the_list_until_dropped() {
        let room = ResourceId::new();
        let mut filter = EventFilter::default();
        filter.watch_rooms(&[room, ResourceId::new()], false);
        assert_eq!(filter.room_count(), 2);

        filter.watch_rooms(&[], true);
        assert!(filter.watches_every_room());
        assert_eq!(filter.room_count(), 0);
        filter.unwatch_rooms(&[room], false);
        assert!(filter.accepts(&moved(room)));

        filter.unwatch_rooms(&[], true);
        assert!(!filter.watches_every_room());
        assert!(!filter.accepts(&moved(room)));
    }
}
