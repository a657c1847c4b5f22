//! PostgreSQL implementation of the backend.
//!
//! Mutations run inside a transaction that locks the room row first, so two
//! concurrent writers for one room are serialized before the overlap check.

use std::time::Duration;

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

use super::BookingBackend;
use crate::config::BookingConfig;
use crate::domain::{
    Booking, BookingId, BookingStatus, CompanyId, CreditBalance, CreditTransaction,
    HistoricalBooking, NewBooking, Resource, ResourceId, ResourceStatus, ResourceType,
    RoomBooking, SiteId, TransactionId, TransactionType, UserId,
};
use crate::error::BookingError;

type ResourceRow = (
    Uuid,
    Uuid,
    String,
    String,
    Option<i32>,
    Option<f64>,
    String,
    Vec<String>,
    Vec<String>,
);

type BookingRow = (
    Uuid,
    Uuid,
    Uuid,
    Option<Uuid>,
    DateTime<Utc>,
    DateTime<Utc>,
    String,
    Option<f64>,
    Option<String>,
);

type TransactionRow = (
    Uuid,
    Uuid,
    Option<Uuid>,
    String,
    f64,
    Option<String>,
    Option<String>,
    DateTime<Utc>,
);

fn persistence(e: sqlx::Error) -> BookingError {
    BookingError::PersistenceError(e.to_string())
}

fn resource_from_row(row: ResourceRow) -> Resource {
    let (id, site_id, name, kind, capacity, rate, status, equipment, photos) = row;
    Resource {
        id: ResourceId::from_uuid(id),
        site_id: SiteId::from_uuid(site_id),
        name,
        resource_type: ResourceType::from_db(&kind),
        capacity: capacity.and_then(|c| u32::try_from(c).ok()),
        hourly_credit_rate: rate,
        status: ResourceStatus::from_db(&status),
        equipment: equipment.into_iter().collect(),
        photos,
    }
}

fn booking_from_row(row: BookingRow) -> Booking {
    let (id, resource_id, user_id, company_id, start, end, status, credits_used, notes) = row;
    Booking {
        id: BookingId::from_uuid(id),
        resource_id: ResourceId::from_uuid(resource_id),
        user_id: UserId::from_uuid(user_id),
        company_id: company_id.map(CompanyId::from_uuid),
        start,
        end,
        status: BookingStatus::from_db(&status),
        credits_used,
        notes,
    }
}

fn transaction_from_row(row: TransactionRow) -> CreditTransaction {
    let (id, company_id, booking_id, kind, amount, reason, resource_name, created_at) = row;
    CreditTransaction {
        id: TransactionId::from_uuid(id),
        company_id: CompanyId::from_uuid(company_id),
        booking_id: booking_id.map(BookingId::from_uuid),
        transaction_type: TransactionType::from_db(&kind),
        amount,
        reason,
        resource_name,
        created_at,
    }
}

/// PostgreSQL-backed [`BookingBackend`] using `sqlx::PgPool`.
#[derive(Debug, Clone)]
pub struct PostgresBackend {
    pool: PgPool,
}

impl PostgresBackend {
    /// Creates a backend over an existing connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Opens a connection pool with the configured limits.
    ///
    /// # Errors
    ///
    /// Returns a [`BookingError::PersistenceError`] if the database cannot
    /// be reached.
    pub async fn connect(config: &BookingConfig) -> Result<Self, BookingError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .min_connections(config.database_min_connections)
            .acquire_timeout(Duration::from_secs(config.database_connect_timeout_secs))
            .connect(&config.database_url)
            .await
            .map_err(persistence)?;
        Ok(Self::new(pool))
    }

    /// Applies the bundled schema migrations.
    ///
    /// # Errors
    ///
    /// Returns a [`BookingError::PersistenceError`] if a migration fails.
    pub async fn migrate(&self) -> Result<(), BookingError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| BookingError::PersistenceError(e.to_string()))
    }

    /// Locks the room row for the rest of the transaction. Returns its name.
    async fn lock_room(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        resource_id: ResourceId,
    ) -> Result<String, BookingError> {
        let row = sqlx::query_as::<_, (String,)>(
            "SELECT name FROM resources WHERE id = $1 FOR UPDATE",
        )
        .bind(resource_id.as_uuid())
        .fetch_optional(&mut **tx)
        .await
        .map_err(persistence)?;
        row.map(|(name,)| name)
            .ok_or(BookingError::ResourceNotFound(*resource_id.as_uuid()))
    }

    async fn check_free(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        resource_id: ResourceId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        ignore: Option<BookingId>,
    ) -> Result<(), BookingError> {
        let clash = sqlx::query_as::<_, (DateTime<Utc>, DateTime<Utc>)>(
            "SELECT start_date, end_date FROM bookings \
             WHERE resource_id = $1 AND status <> 'cancelled' \
             AND start_date < $3 AND end_date > $2 \
             AND ($4::uuid IS NULL OR id <> $4) LIMIT 1",
        )
        .bind(resource_id.as_uuid())
        .bind(start)
        .bind(end)
        .bind(ignore.map(Uuid::from))
        .fetch_optional(&mut **tx)
        .await
        .map_err(persistence)?;

        match clash {
            Some((other_start, other_end)) => Err(BookingError::SlotUnavailable(format!(
                "room already booked from {other_start} to {other_end}"
            ))),
            None => Ok(()),
        }
    }
}

impl BookingBackend for PostgresBackend {
    async fn resource(&self, id: ResourceId) -> Result<Resource, BookingError> {
        sqlx::query_as::<_, ResourceRow>(
            "SELECT id, site_id, name, type, capacity, hourly_credit_rate, status, \
             equipment, photos \
             FROM resources WHERE id = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(persistence)?
        .map(resource_from_row)
        .ok_or(BookingError::ResourceNotFound(*id.as_uuid()))
    }

    async fn site_rooms(&self, site_id: SiteId) -> Result<Vec<Resource>, BookingError> {
        let rows = sqlx::query_as::<_, ResourceRow>(
            "SELECT id, site_id, name, type, capacity, hourly_credit_rate, status, \
             equipment, photos \
             FROM resources WHERE site_id = $1 AND type = 'meeting_room' ORDER BY name",
        )
        .bind(site_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(persistence)?;

        Ok(rows.into_iter().map(resource_from_row).collect())
    }

    async fn resource_bookings(
        &self,
        resource_id: ResourceId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Booking>, BookingError> {
        let rows = sqlx::query_as::<_, BookingRow>(
            "SELECT id, resource_id, user_id, company_id, start_date, end_date, status, \
             credits_used, notes \
             FROM bookings WHERE resource_id = $1 AND start_date < $3 AND end_date > $2 \
             ORDER BY start_date",
        )
        .bind(resource_id.as_uuid())
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await
        .map_err(persistence)?;

        Ok(rows.into_iter().map(booking_from_row).collect())
    }

    async fn room_bookings_for_site(
        &self,
        site_id: SiteId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<RoomBooking>, BookingError> {
        let rows = sqlx::query_as::<
            _,
            (
                Uuid,
                Uuid,
                Uuid,
                Option<Uuid>,
                DateTime<Utc>,
                DateTime<Utc>,
                String,
                Option<f64>,
                Option<String>,
                String,
            ),
        >(
            "SELECT b.id, b.resource_id, b.user_id, b.company_id, b.start_date, b.end_date, \
             b.status, b.credits_used, b.notes, r.name \
             FROM bookings b JOIN resources r ON r.id = b.resource_id \
             WHERE r.site_id = $1 AND b.start_date < $3 AND b.end_date > $2 \
             ORDER BY b.start_date",
        )
        .bind(site_id.as_uuid())
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await
        .map_err(persistence)?;

        Ok(rows
            .into_iter()
            .map(
                |(id, resource_id, user_id, company_id, start, end, status, credits, notes, name)| {
                    RoomBooking {
                        booking: booking_from_row((
                            id,
                            resource_id,
                            user_id,
                            company_id,
                            start,
                            end,
                            status,
                            credits,
                            notes,
                        )),
                        resource_name: name,
                    }
                },
            )
            .collect())
    }

    async fn create_booking(&self, request: NewBooking) -> Result<Booking, BookingError> {
        if request.start >= request.end {
            return Err(BookingError::InvalidRequest(
                "booking must end after it starts".to_string(),
            ));
        }
        let mut tx = self.pool.begin().await.map_err(persistence)?;
        Self::lock_room(&mut tx, request.resource_id).await?;
        Self::check_free(&mut tx, request.resource_id, request.start, request.end, None).await?;

        if let Some(company_id) = request.company_id
            && request.credits_to_use > 0.0
        {
            let debited = sqlx::query(
                "UPDATE company_credits SET remaining = remaining - $2 \
                 WHERE company_id = $1 AND remaining >= $2",
            )
            .bind(company_id.as_uuid())
            .bind(request.credits_to_use)
            .execute(&mut *tx)
            .await
            .map_err(persistence)?;
            if debited.rows_affected() == 0 {
                return Err(BookingError::Rejected(format!(
                    "insufficient credits: {} needed",
                    request.credits_to_use
                )));
            }
        }

        let row = sqlx::query_as::<_, BookingRow>(
            "INSERT INTO bookings \
             (id, resource_id, user_id, company_id, start_date, end_date, status, credits_used) \
             VALUES ($1, $2, $3, $4, $5, $6, 'confirmed', $7) \
             RETURNING id, resource_id, user_id, company_id, start_date, end_date, status, \
             credits_used, notes",
        )
        .bind(Uuid::new_v4())
        .bind(request.resource_id.as_uuid())
        .bind(request.user_id.as_uuid())
        .bind(request.company_id.map(Uuid::from))
        .bind(request.start)
        .bind(request.end)
        .bind(request.credits_to_use)
        .fetch_one(&mut *tx)
        .await
        .map_err(persistence)?;
        let booking = booking_from_row(row);

        if let Some(company_id) = request.company_id
            && request.credits_to_use > 0.0
        {
            sqlx::query(
                "INSERT INTO credit_transactions \
                 (id, company_id, booking_id, transaction_type, amount) \
                 VALUES ($1, $2, $3, 'consumption', $4)",
            )
            .bind(Uuid::new_v4())
            .bind(company_id.as_uuid())
            .bind(booking.id.as_uuid())
            .bind(-request.credits_to_use)
            .execute(&mut *tx)
            .await
            .map_err(persistence)?;
        }

        tx.commit().await.map_err(persistence)?;
        Ok(booking)
    }

    async fn update_booking_dates(
        &self,
        id: BookingId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Booking, BookingError> {
        if start >= end {
            return Err(BookingError::InvalidRequest(
                "booking must end after it starts".to_string(),
            ));
        }
        let mut tx = self.pool.begin().await.map_err(persistence)?;
        let (resource_id, status) = sqlx::query_as::<_, (Uuid, String)>(
            "SELECT resource_id, status FROM bookings WHERE id = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(&mut *tx)
        .await
        .map_err(persistence)?
        .ok_or(BookingError::BookingNotFound(*id.as_uuid()))?;
        if BookingStatus::from_db(&status) == BookingStatus::Cancelled {
            return Err(BookingError::BookingCancelled(*id.as_uuid()));
        }
        let resource_id = ResourceId::from_uuid(resource_id);
        Self::lock_room(&mut tx, resource_id).await?;
        Self::check_free(&mut tx, resource_id, start, end, Some(id)).await?;

        let row = sqlx::query_as::<_, BookingRow>(
            "UPDATE bookings SET start_date = $2, end_date = $3 WHERE id = $1 \
             RETURNING id, resource_id, user_id, company_id, start_date, end_date, status, \
             credits_used, notes",
        )
        .bind(id.as_uuid())
        .bind(start)
        .bind(end)
        .fetch_one(&mut *tx)
        .await
        .map_err(persistence)?;

        tx.commit().await.map_err(persistence)?;
        Ok(booking_from_row(row))
    }

    async fn cancel_booking(&self, id: BookingId) -> Result<Booking, BookingError> {
        let mut tx = self.pool.begin().await.map_err(persistence)?;
        let row = sqlx::query_as::<_, BookingRow>(
            "UPDATE bookings SET status = 'cancelled' WHERE id = $1 AND status <> 'cancelled' \
             RETURNING id, resource_id, user_id, company_id, start_date, end_date, status, \
             credits_used, notes",
        )
        .bind(id.as_uuid())
        .fetch_optional(&mut *tx)
        .await
        .map_err(persistence)?;

        let Some(row) = row else {
            let exists = sqlx::query_as::<_, (Uuid,)>("SELECT id FROM bookings WHERE id = $1")
                .bind(id.as_uuid())
                .fetch_optional(&mut *tx)
                .await
                .map_err(persistence)?;
            return Err(match exists {
                Some(_) => BookingError::BookingCancelled(*id.as_uuid()),
                None => BookingError::BookingNotFound(*id.as_uuid()),
            });
        };
        let booking = booking_from_row(row);

        let refund = booking.credits_used.unwrap_or(0.0);
        if let Some(company_id) = booking.company_id
            && refund > 0.0
        {
            sqlx::query(
                "INSERT INTO company_credits (company_id, allocated, remaining) VALUES ($1, 0, $2) \
                 ON CONFLICT (company_id) DO UPDATE SET remaining = company_credits.remaining + $2",
            )
            .bind(company_id.as_uuid())
            .bind(refund)
            .execute(&mut *tx)
            .await
            .map_err(persistence)?;

            sqlx::query(
                "INSERT INTO credit_transactions \
                 (id, company_id, booking_id, transaction_type, amount) \
                 VALUES ($1, $2, $3, 'refund', $4)",
            )
            .bind(Uuid::new_v4())
            .bind(company_id.as_uuid())
            .bind(booking.id.as_uuid())
            .bind(refund)
            .execute(&mut *tx)
            .await
            .map_err(persistence)?;
        }

        tx.commit().await.map_err(persistence)?;
        Ok(booking)
    }

    async fn booking(&self, id: BookingId) -> Result<Booking, BookingError> {
        sqlx::query_as::<_, BookingRow>(
            "SELECT id, resource_id, user_id, company_id, start_date, end_date, status, \
             credits_used, notes \
             FROM bookings WHERE id = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(persistence)?
        .map(booking_from_row)
        .ok_or(BookingError::BookingNotFound(*id.as_uuid()))
    }

    async fn credit_transactions(
        &self,
        company_id: CompanyId,
        limit: u32,
    ) -> Result<Vec<CreditTransaction>, BookingError> {
        let rows = sqlx::query_as::<_, TransactionRow>(
            "SELECT t.id, t.company_id, t.booking_id, t.transaction_type, t.amount, t.reason, \
             r.name, t.created_at \
             FROM credit_transactions t \
             LEFT JOIN bookings b ON b.id = t.booking_id \
             LEFT JOIN resources r ON r.id = b.resource_id \
             WHERE t.company_id = $1 ORDER BY t.created_at DESC LIMIT $2",
        )
        .bind(company_id.as_uuid())
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(persistence)?;

        Ok(rows.into_iter().map(transaction_from_row).collect())
    }

    async fn company_users(&self, company_id: CompanyId) -> Result<Vec<UserId>, BookingError> {
        let rows = sqlx::query_as::<_, (Uuid,)>("SELECT id FROM users WHERE company_id = $1")
            .bind(company_id.as_uuid())
            .fetch_all(&self.pool)
            .await
            .map_err(persistence)?;

        Ok(rows.into_iter().map(|(id,)| UserId::from_uuid(id)).collect())
    }

    async fn historical_bookings(
        &self,
        user_ids: &[UserId],
        limit: u32,
    ) -> Result<Vec<HistoricalBooking>, BookingError> {
        if user_ids.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<Uuid> = user_ids.iter().map(|u| *u.as_uuid()).collect();
        let rows = sqlx::query_as::<_, (Uuid, DateTime<Utc>, String, f64, Option<String>)>(
            "SELECT b.id, b.start_date, b.status, b.credits_used, r.name \
             FROM bookings b LEFT JOIN resources r ON r.id = b.resource_id \
             WHERE b.user_id = ANY($1) AND b.credits_used > 0 \
             ORDER BY b.start_date DESC LIMIT $2",
        )
        .bind(ids)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(persistence)?;

        Ok(rows
            .into_iter()
            .map(|(id, start, status, credits_used, resource_name)| HistoricalBooking {
                id: BookingId::from_uuid(id),
                start,
                status: BookingStatus::from_db(&status),
                credits_used,
                resource_name,
            })
            .collect())
    }

    async fn credit_balance(&self, company_id: CompanyId) -> Result<CreditBalance, BookingError> {
        let row = sqlx::query_as::<_, (f64, f64)>(
            "SELECT allocated, remaining FROM company_credits WHERE company_id = $1",
        )
        .bind(company_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(persistence)?;

        Ok(row
            .map(|(allocated, remaining)| CreditBalance {
                allocated,
                remaining,
            })
            .unwrap_or_default())
    }
}
