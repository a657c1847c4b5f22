//! Process-local backend.
//!
//! Holds every table in one [`tokio::sync::RwLock`] so that a mutation's
//! overlap check, write and credit movement happen atomically.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::BookingBackend;
use crate::domain::{
    Booking, BookingId, BookingStatus, CompanyId, CreditBalance, CreditTransaction,
    HistoricalBooking, NewBooking, Resource, ResourceId, RoomBooking, SiteId, TransactionId,
    TransactionType, UserId,
};
use crate::error::BookingError;

#[derive(Debug, Default)]
struct Store {
    resources: HashMap<ResourceId, Resource>,
    bookings: HashMap<BookingId, Booking>,
    transactions: Vec<CreditTransaction>,
    balances: HashMap<CompanyId, CreditBalance>,
    users: HashMap<UserId, CompanyId>,
    rejection: Option<String>,
}

impl Store {
    fn take_rejection(&mut self) -> Result<(), BookingError> {
        match self.rejection.take() {
            Some(message) => Err(BookingError::Rejected(message)),
            None => Ok(()),
        }
    }

    fn check_free(
        &self,
        resource_id: ResourceId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        ignore: Option<BookingId>,
    ) -> Result<(), BookingError> {
        let clash = self.bookings.values().find(|b| {
            b.resource_id == resource_id
                && b.status.blocks_slot()
                && Some(b.id) != ignore
                && b.overlaps(start, end)
        });
        match clash {
            Some(other) => Err(BookingError::SlotUnavailable(format!(
                "room already booked from {} to {}",
                other.start, other.end
            ))),
            None => Ok(()),
        }
    }

    fn resource_name(&self, id: ResourceId) -> Option<String> {
        self.resources.get(&id).map(|r| r.name.clone())
    }
}

fn check_interval(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<(), BookingError> {
    if start >= end {
        return Err(BookingError::InvalidRequest(format!(
            "booking must end after it starts ({start} >= {end})"
        )));
    }
    Ok(())
}

/// In-memory [`BookingBackend`].
///
/// Clones share the same store, so a test can keep a handle for seeding
/// after handing one to the service.
#[derive(Debug, Clone, Default)]
pub struct InMemoryBackend {
    store: Arc<RwLock<Store>>,
}

impl InMemoryBackend {
    /// Creates an empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a resource.
    pub async fn insert_resource(&self, resource: Resource) {
        self.store.write().await.resources.insert(resource.id, resource);
    }

    /// Registers a user as a member of `company_id`.
    pub async fn add_user(&self, user_id: UserId, company_id: CompanyId) {
        self.store.write().await.users.insert(user_id, company_id);
    }

    /// Sets a company balance.
    pub async fn set_credit_balance(&self, company_id: CompanyId, balance: CreditBalance) {
        self.store.write().await.balances.insert(company_id, balance);
    }

    /// Inserts a booking as is, bypassing overlap and credit checks.
    ///
    /// Used to seed legacy bookings that predate the transaction table.
    pub async fn insert_booking(&self, booking: Booking) {
        self.store.write().await.bookings.insert(booking.id, booking);
    }

    /// Inserts a transaction as is.
    pub async fn insert_transaction(&self, transaction: CreditTransaction) {
        self.store.write().await.transactions.push(transaction);
    }

    /// Makes the next mutation fail with `message`.
    pub async fn reject_next_mutation(&self, message: impl Into<String>) {
        self.store.write().await.rejection = Some(message.into());
    }
}

impl BookingBackend for InMemoryBackend {
    async fn resource(&self, id: ResourceId) -> Result<Resource, BookingError> {
        self.store
            .read()
            .await
            .resources
            .get(&id)
            .cloned()
            .ok_or(BookingError::ResourceNotFound(*id.as_uuid()))
    }

    async fn site_rooms(&self, site_id: SiteId) -> Result<Vec<Resource>, BookingError> {
        let store = self.store.read().await;
        let mut rooms: Vec<Resource> = store
            .resources
            .values()
            .filter(|r| r.site_id == site_id)
            .cloned()
            .collect();
        rooms.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(rooms)
    }

    async fn resource_bookings(
        &self,
        resource_id: ResourceId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Booking>, BookingError> {
        let store = self.store.read().await;
        let mut bookings: Vec<Booking> = store
            .bookings
            .values()
            .filter(|b| b.resource_id == resource_id && b.overlaps(from, to))
            .cloned()
            .collect();
        bookings.sort_by_key(|b| b.start);
        Ok(bookings)
    }

    async fn room_bookings_for_site(
        &self,
        site_id: SiteId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<RoomBooking>, BookingError> {
        let store = self.store.read().await;
        let mut bookings: Vec<RoomBooking> = store
            .bookings
            .values()
            .filter(|b| b.overlaps(from, to))
            .filter_map(|b| {
                let room = store.resources.get(&b.resource_id)?;
                (room.site_id == site_id).then(|| RoomBooking {
                    booking: b.clone(),
                    resource_name: room.name.clone(),
                })
            })
            .collect();
        bookings.sort_by_key(|rb| rb.booking.start);
        Ok(bookings)
    }

    async fn create_booking(&self, request: NewBooking) -> Result<Booking, BookingError> {
        check_interval(request.start, request.end)?;
        let mut store = self.store.write().await;
        store.take_rejection()?;
        if !store.resources.contains_key(&request.resource_id) {
            return Err(BookingError::ResourceNotFound(*request.resource_id.as_uuid()));
        }
        store.check_free(request.resource_id, request.start, request.end, None)?;

        let booking = Booking {
            id: BookingId::new(),
            resource_id: request.resource_id,
            user_id: request.user_id,
            company_id: request.company_id,
            start: request.start,
            end: request.end,
            status: BookingStatus::Confirmed,
            credits_used: Some(request.credits_to_use),
            notes: None,
        };

        if let Some(company_id) = request.company_id
            && request.credits_to_use > 0.0
        {
            let balance = store.balances.entry(company_id).or_default();
            if balance.remaining < request.credits_to_use {
                return Err(BookingError::Rejected(format!(
                    "insufficient credits: {} needed, {} remaining",
                    request.credits_to_use, balance.remaining
                )));
            }
            balance.remaining -= request.credits_to_use;
            let resource_name = store.resource_name(request.resource_id);
            store.transactions.push(CreditTransaction {
                id: TransactionId::new(),
                company_id,
                booking_id: Some(booking.id),
                transaction_type: TransactionType::Consumption,
                amount: -request.credits_to_use,
                reason: None,
                resource_name,
                created_at: Utc::now(),
            });
        }

        store.bookings.insert(booking.id, booking.clone());
        Ok(booking)
    }

    async fn update_booking_dates(
        &self,
        id: BookingId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Booking, BookingError> {
        check_interval(start, end)?;
        let mut store = self.store.write().await;
        store.take_rejection()?;
        let (resource_id, status) = store
            .bookings
            .get(&id)
            .map(|b| (b.resource_id, b.status))
            .ok_or(BookingError::BookingNotFound(*id.as_uuid()))?;
        if status == BookingStatus::Cancelled {
            return Err(BookingError::BookingCancelled(*id.as_uuid()));
        }
        store.check_free(resource_id, start, end, Some(id))?;

        let booking = store
            .bookings
            .get_mut(&id)
            .ok_or(BookingError::BookingNotFound(*id.as_uuid()))?;
        booking.start = start;
        booking.end = end;
        Ok(booking.clone())
    }

    async fn cancel_booking(&self, id: BookingId) -> Result<Booking, BookingError> {
        let mut store = self.store.write().await;
        store.take_rejection()?;
        let booking = store
            .bookings
            .get_mut(&id)
            .ok_or(BookingError::BookingNotFound(*id.as_uuid()))?;
        if booking.status == BookingStatus::Cancelled {
            return Err(BookingError::BookingCancelled(*id.as_uuid()));
        }
        booking.status = BookingStatus::Cancelled;
        let cancelled = booking.clone();

        let refund = cancelled.credits_used.unwrap_or(0.0);
        if let Some(company_id) = cancelled.company_id
            && refund > 0.0
        {
            store.balances.entry(company_id).or_default().remaining += refund;
            let resource_name = store.resource_name(cancelled.resource_id);
            store.transactions.push(CreditTransaction {
                id: TransactionId::new(),
                company_id,
                booking_id: Some(cancelled.id),
                transaction_type: TransactionType::Refund,
                amount: refund,
                reason: None,
                resource_name,
                created_at: Utc::now(),
            });
        }
        Ok(cancelled)
    }

    async fn booking(&self, id: BookingId) -> Result<Booking, BookingError> {
        self.store
            .read()
            .await
            .bookings
            .get(&id)
            .cloned()
            .ok_or(BookingError::BookingNotFound(*id.as_uuid()))
    }

    async fn credit_transactions(
        &self,
        company_id: CompanyId,
        limit: u32,
    ) -> Result<Vec<CreditTransaction>, BookingError> {
        let store = self.store.read().await;
        let mut rows: Vec<CreditTransaction> = store
            .transactions
            .iter()
            .filter(|t| t.company_id == company_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        rows.truncate(limit as usize);
        Ok(rows)
    }

    async fn company_users(&self, company_id: CompanyId) -> Result<Vec<UserId>, BookingError> {
        let store = self.store.read().await;
        let mut users: Vec<UserId> = store
            .users
            .iter()
            .filter(|(_, c)| **c == company_id)
            .map(|(u, _)| *u)
            .collect();
        users.sort();
        Ok(users)
    }

    async fn historical_bookings(
        &self,
        user_ids: &[UserId],
        limit: u32,
    ) -> Result<Vec<HistoricalBooking>, BookingError> {
        let store = self.store.read().await;
        let mut rows: Vec<HistoricalBooking> = store
            .bookings
            .values()
            .filter(|b| user_ids.contains(&b.user_id))
            .filter_map(|b| {
                let credits_used = b.credits_used.filter(|c| *c > 0.0)?;
                Some(HistoricalBooking {
                    id: b.id,
                    start: b.start,
                    status: b.status,
                    credits_used,
                    resource_name: store.resource_name(b.resource_id),
                })
            })
            .collect();
        rows.sort_by(|a, b| b.start.cmp(&a.start));
        rows.truncate(limit as usize);
        Ok(rows)
    }

    async fn credit_balance(&self, company_id: CompanyId) -> Result<CreditBalance, BookingError> {
        Ok(self
            .store
            .read()
            .await
            .balances
            .get(&company_id)
            .copied()
            .unwrap_or_default())
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::collections::BTreeSet;

    use chrono::TimeZone;

    use super::*;
    use crate::domain::{ResourceStatus, ResourceType};

    fn at(hour: u32) -> DateTime<Utc> {
        let Some(t) = Utc.with_ymd_and_hms(2030, 6, 3, hour, 0, 0).single() else {
            panic!("valid time");
        };
        t
    }

    fn room(site_id: SiteId, name: &str) -> Resource {
        Resource {
            id: ResourceId::new(),
            site_id,
            name: name.to_string(),
            resource_type: ResourceType::MeetingRoom,
            capacity: Some(6),
            hourly_credit_rate: None,
            status: ResourceStatus::Available,
            equipment: BTreeSet::new(),
            photos: Vec::new(),
        }
    }

    async fn seeded() -> (InMemoryBackend, Resource, UserId, CompanyId) {
        let backend = InMemoryBackend::new();
        let room = room(SiteId::new(), "Salle A");
        let user = UserId::new();
        let company = CompanyId::new();
        backend.insert_resource(room.clone()).await;
        backend.add_user(user, company).await;
        backend
            .set_credit_balance(
                company,
                CreditBalance {
                    allocated: 10.0,
                    remaining: 10.0,
                },
            )
            .await;
        (backend, room, user, company)
    }

    fn request(
        room: &Resource,
        user: UserId,
        company: CompanyId,
        from: u32,
        to: u32,
    ) -> NewBooking {
        NewBooking {
            user_id: user,
            resource_id: room.id,
            start: at(from),
            end: at(to),
            credits_to_use: f64::from(to - from),
            company_id: Some(company),
        }
    }

    #[tokio::test]
    async fn create_debits_credits_and_records_consumption() {
        let (backend, room, user, company) = seeded().await;
        let Ok(booking) = backend.create_booking(request(&room, user, company, 9, 11)).await else {
            panic!("create should succeed");
        };
        assert_eq!(booking.status, BookingStatus::Confirmed);

        let Ok(balance) = backend.credit_balance(company).await else {
            panic!("balance");
        };
        assert!((balance.remaining - 8.0).abs() < f64::EPSILON);

        let Ok(txs) = backend.credit_transactions(company, 100).await else {
            panic!("transactions");
        };
        assert_eq!(txs.len(), 1);
        assert_eq!(txs.first().map(|t| t.booking_id), Some(Some(booking.id)));
        assert_eq!(
            txs.first().map(|t| t.transaction_type),
            Some(TransactionType::Consumption)
        );
    }

    #[tokio::test]
    async fn overlapping_booking_is_rejected() {
        let (backend, room, user, company) = seeded().await;
        assert!(backend.create_booking(request(&room, user, company, 9, 11)).await.is_ok());

        let clash = backend.create_booking(request(&room, user, company, 10, 12)).await;
        assert!(matches!(clash, Err(BookingError::SlotUnavailable(_))));

        // back-to-back is fine
        assert!(backend.create_booking(request(&room, user, company, 11, 12)).await.is_ok());
    }

    #[tokio::test]
    async fn cancelled_bookings_free_their_slot_and_refund() {
        let (backend, room, user, company) = seeded().await;
        let Ok(first) = backend.create_booking(request(&room, user, company, 9, 11)).await else {
            panic!("create");
        };
        let Ok(cancelled) = backend.cancel_booking(first.id).await else {
            panic!("cancel");
        };
        assert_eq!(cancelled.status, BookingStatus::Cancelled);
        assert!(matches!(
            backend.cancel_booking(first.id).await,
            Err(BookingError::BookingCancelled(_))
        ));

        let Ok(balance) = backend.credit_balance(company).await else {
            panic!("balance");
        };
        assert!((balance.remaining - 10.0).abs() < f64::EPSILON);
        assert!(backend.create_booking(request(&room, user, company, 9, 11)).await.is_ok());
    }

    #[tokio::test]
    async fn reschedule_ignores_own_interval() {
        let (backend, room, user, company) = seeded().await;
        let Ok(booking) = backend.create_booking(request(&room, user, company, 9, 11)).await else {
            panic!("create");
        };
        let Ok(moved) = backend.update_booking_dates(booking.id, at(10), at(12)).await else {
            panic!("update should ignore the booking itself");
        };
        assert_eq!(moved.start, at(10));
        assert_eq!(moved.credits_used, Some(2.0));
    }

    #[tokio::test]
    async fn insufficient_balance_is_rejected() {
        let (backend, room, user, company) = seeded().await;
        let mut big = request(&room, user, company, 8, 19);
        big.credits_to_use = 11.0;
        assert!(matches!(
            backend.create_booking(big).await,
            Err(BookingError::Rejected(_))
        ));
    }

    #[tokio::test]
    async fn injected_rejection_applies_once() {
        let (backend, room, user, company) = seeded().await;
        backend.reject_next_mutation("Créneau indisponible").await;
        let first = backend.create_booking(request(&room, user, company, 9, 10)).await;
        assert_eq!(
            first.err(),
            Some(BookingError::Rejected("Créneau indisponible".to_string()))
        );
        assert!(backend.create_booking(request(&room, user, company, 9, 10)).await.is_ok());
    }

    #[tokio::test]
    async fn historical_bookings_skip_free_ones() {
        let (backend, room, user, company) = seeded().await;
        let mut free = request(&room, user, company, 14, 15);
        free.credits_to_use = 0.0;
        assert!(backend.create_booking(free).await.is_ok());
        assert!(backend.create_booking(request(&room, user, company, 9, 10)).await.is_ok());

        let Ok(rows) = backend.historical_bookings(&[user], 100).await else {
            panic!("history");
        };
        assert_eq!(rows.len(), 1);
        assert_eq!(rows.first().and_then(|r| r.resource_name.clone()), Some("Salle A".to_string()));
    }
}
