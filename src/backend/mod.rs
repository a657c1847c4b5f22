//! Backend layer: the system of record for rooms, bookings and credits.
//!
//! [`BookingBackend`] is the seam between the booking core and the
//! database. Two implementations exist: [`InMemoryBackend`] for tests and
//! local runs, and [`PostgresBackend`] over `sqlx::PgPool`. The service layer
//! is generic over the trait. The binary picks one at startup and wraps it in
//! [`Backend`].
//!
//! The backend is authoritative for overlap prevention and for the credit
//! balance. Availability computed by the core is advisory.

pub mod memory;
pub mod postgres;

use chrono::{DateTime, Utc};

use crate::domain::{
    Booking, BookingId, CompanyId, CreditBalance, CreditTransaction, HistoricalBooking, NewBooking,
    Resource, ResourceId, RoomBooking, SiteId, UserId,
};
use crate::error::BookingError;

pub use memory::InMemoryBackend;
pub use postgres::PostgresBackend;

/// Operations the booking core consumes from its backend.
///
/// Range queries are half-open: a booking is returned when it overlaps
/// `[from, to)`. Cancelled bookings are included; callers filter them.
pub trait BookingBackend: Send + Sync {
    /// Loads one resource.
    fn resource(
        &self,
        id: ResourceId,
    ) -> impl Future<Output = Result<Resource, BookingError>> + Send;

    /// Lists the meeting rooms of a site, in name order.
    fn site_rooms(
        &self,
        site_id: SiteId,
    ) -> impl Future<Output = Result<Vec<Resource>, BookingError>> + Send;

    /// Bookings of one resource overlapping `[from, to)`.
    fn resource_bookings(
        &self,
        resource_id: ResourceId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> impl Future<Output = Result<Vec<Booking>, BookingError>> + Send;

    /// Bookings of every room of a site overlapping `[from, to)`, joined
    /// with the room name.
    fn room_bookings_for_site(
        &self,
        site_id: SiteId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> impl Future<Output = Result<Vec<RoomBooking>, BookingError>> + Send;

    /// Creates a confirmed booking and debits its credits.
    fn create_booking(
        &self,
        request: NewBooking,
    ) -> impl Future<Output = Result<Booking, BookingError>> + Send;

    /// Moves a booking to `[start, end)`. Credits are left untouched.
    fn update_booking_dates(
        &self,
        id: BookingId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> impl Future<Output = Result<Booking, BookingError>> + Send;

    /// Cancels a booking and refunds its credits.
    fn cancel_booking(
        &self,
        id: BookingId,
    ) -> impl Future<Output = Result<Booking, BookingError>> + Send;

    /// Loads one booking.
    fn booking(&self, id: BookingId)
    -> impl Future<Output = Result<Booking, BookingError>> + Send;

    /// Latest credit transactions of a company, newest first.
    fn credit_transactions(
        &self,
        company_id: CompanyId,
        limit: u32,
    ) -> impl Future<Output = Result<Vec<CreditTransaction>, BookingError>> + Send;

    /// Users belonging to a company.
    fn company_users(
        &self,
        company_id: CompanyId,
    ) -> impl Future<Output = Result<Vec<UserId>, BookingError>> + Send;

    /// Latest bookings of `user_ids` that consumed credits, newest first.
    fn historical_bookings(
        &self,
        user_ids: &[UserId],
        limit: u32,
    ) -> impl Future<Output = Result<Vec<HistoricalBooking>, BookingError>> + Send;

    /// Current balance of a company. Unknown companies have a zero balance.
    fn credit_balance(
        &self,
        company_id: CompanyId,
    ) -> impl Future<Output = Result<CreditBalance, BookingError>> + Send;
}

/// Backend selected at startup.
#[derive(Debug, Clone)]
pub enum Backend {
    /// Process-local store.
    Memory(InMemoryBackend),
    /// PostgreSQL store.
    Postgres(PostgresBackend),
}

impl Backend {
    /// Short name for logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Memory(_) => "memory",
            Self::Postgres(_) => "postgres",
        }
    }
}

impl BookingBackend for Backend {
    async fn resource(&self, id: ResourceId) -> Result<Resource, BookingError> {
        match self {
            Self::Memory(b) => b.resource(id).await,
            Self::Postgres(b) => b.resource(id).await,
        }
    }

    async fn site_rooms(&self, site_id: SiteId) -> Result<Vec<Resource>, BookingError> {
        match self {
            Self::Memory(b) => b.site_rooms(site_id).await,
            Self::Postgres(b) => b.site_rooms(site_id).await,
        }
    }

    async fn resource_bookings(
        &self,
        resource_id: ResourceId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Booking>, BookingError> {
        match self {
            Self::Memory(b) => b.resource_bookings(resource_id, from, to).await,
            Self::Postgres(b) => b.resource_bookings(resource_id, from, to).await,
        }
    }

    async fn room_bookings_for_site(
        &self,
        site_id: SiteId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<RoomBooking>, BookingError> {
        match self {
            Self::Memory(b) => b.room_bookings_for_site(site_id, from, to).await,
            Self::Postgres(b) => b.room_bookings_for_site(site_id, from, to).await,
        }
    }

    async fn create_booking(&self, request: NewBooking) -> Result<Booking, BookingError> {
        match self {
            Self::Memory(b) => b.create_booking(request).await,
            Self::Postgres(b) => b.create_booking(request).await,
        }
    }

    async fn update_booking_dates(
        &self,
        id: BookingId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Booking, BookingError> {
        match self {
            Self::Memory(b) => b.update_booking_dates(id, start, end).await,
            Self::Postgres(b) => b.update_booking_dates(id, start, end).await,
        }
    }

    async fn cancel_booking(&self, id: BookingId) -> Result<Booking, BookingError> {
        match self {
            Self::Memory(b) => b.cancel_booking(id).await,
            Self::Postgres(b) => b.cancel_booking(id).await,
        }
    }

    async fn booking(&self, id: BookingId) -> Result<Booking, BookingError> {
        match self {
            Self::Memory(b) => b.booking(id).await,
            Self::Postgres(b) => b.booking(id).await,
        }
    }

    async fn credit_transactions(
        &self,
        company_id: CompanyId,
        limit: u32,
    ) -> Result<Vec<CreditTransaction>, BookingError> {
        match self {
            Self::Memory(b) => b.credit_transactions(company_id, limit).await,
            Self::Postgres(b) => b.credit_transactions(company_id, limit).await,
        }
    }

    async fn company_users(&self, company_id: CompanyId) -> Result<Vec<UserId>, BookingError> {
        match self {
            Self::Memory(b) => b.company_users(company_id).await,
            Self::Postgres(b) => b.company_users(company_id).await,
        }
    }

    async fn historical_bookings(
        &self,
        user_ids: &[UserId],
        limit: u32,
    ) -> Result<Vec<HistoricalBooking>, BookingError> {
        match self {
            Self::Memory(b) => b.historical_bookings(user_ids, limit).await,
            Self::Postgres(b) => b.historical_bookings(user_ids, limit).await,
        }
    }

    async fn credit_balance(&self, company_id: CompanyId) -> Result<CreditBalance, BookingError> {
        match self {
            Self::Memory(b) => b.credit_balance(company_id).await,
            Self::Postgres(b) => b.credit_balance(company_id).await,
        }
    }
}
