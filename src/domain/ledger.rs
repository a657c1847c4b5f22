//! Credit ledger reconciliation.
//!
//! Company credit history comes from two sources. Explicit
//! `credit_transactions` rows carry their own signed amount. Older bookings
//! only recorded `credits_used` and never got a transaction. This module
//! merges both into one newest-first movement list and back-fills a display
//! balance from the live total.

use std::cmp::Reverse;
use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::booking::BookingStatus;
use super::ids::{BookingId, CompanyId, TransactionId};

/// Transaction vocabulary stored by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    /// Credits spent on a booking.
    Consumption,
    /// Credits returned after a cancellation.
    Refund,
    /// Credits granted by a plan.
    Allocation,
    /// Credits that lapsed.
    Expiration,
    /// Manual correction, either sign.
    Adjustment,
    /// Credits bought through the billing provider.
    Purchase,
}

impl TransactionType {
    /// Database representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Consumption => "consumption",
            Self::Refund => "refund",
            Self::Allocation => "allocation",
            Self::Expiration => "expiration",
            Self::Adjustment => "adjustment",
            Self::Purchase => "purchase",
        }
    }

    /// Parses the database representation. Unknown values are treated as
    /// adjustments so their stored sign is kept.
    #[must_use]
    pub fn from_db(s: &str) -> Self {
        match s {
            "consumption" => Self::Consumption,
            "refund" => Self::Refund,
            "allocation" => Self::Allocation,
            "expiration" => Self::Expiration,
            "purchase" => Self::Purchase,
            _ => Self::Adjustment,
        }
    }

    /// Display vocabulary of the movement this transaction produces.
    #[must_use]
    pub const fn movement_type(self) -> MovementType {
        match self {
            Self::Consumption => MovementType::Reservation,
            Self::Refund => MovementType::Cancellation,
            Self::Allocation => MovementType::Allocation,
            Self::Expiration => MovementType::Expiration,
            Self::Adjustment => MovementType::Adjustment,
            Self::Purchase => MovementType::Purchase,
        }
    }

    /// Applies the sign convention: debits negative, credits positive,
    /// adjustments as stored.
    #[must_use]
    pub fn signed(self, amount: f64) -> f64 {
        match self {
            Self::Consumption | Self::Expiration => -amount.abs(),
            Self::Refund | Self::Allocation | Self::Purchase => amount.abs(),
            Self::Adjustment => amount,
        }
    }
}

/// An explicit credit transaction row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CreditTransaction {
    /// Row identifier.
    pub id: TransactionId,
    /// Company whose balance changed.
    pub company_id: CompanyId,
    /// Booking that caused the transaction, if any.
    pub booking_id: Option<BookingId>,
    /// Transaction kind.
    pub transaction_type: TransactionType,
    /// Amount as stored. The sign is normalized during reconciliation.
    pub amount: f64,
    /// Explicit reason entered by staff or the system.
    pub reason: Option<String>,
    /// Name of the linked room, for templated descriptions.
    pub resource_name: Option<String>,
    /// When the transaction happened.
    pub created_at: DateTime<Utc>,
}

/// A past booking that consumed credits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct HistoricalBooking {
    /// Booking identifier.
    pub id: BookingId,
    /// Booking start; the movement date.
    pub start: DateTime<Utc>,
    /// Current status.
    pub status: BookingStatus,
    /// Credits charged.
    pub credits_used: f64,
    /// Room name.
    pub resource_name: Option<String>,
}

/// Display vocabulary of the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum MovementType {
    /// Booking debit.
    Reservation,
    /// Cancellation refund.
    Cancellation,
    /// Plan allocation.
    Allocation,
    /// Expired credits.
    Expiration,
    /// Manual correction.
    Adjustment,
    /// Purchased credits.
    Purchase,
}

/// One row of the reconciled ledger.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct CreditMovement {
    /// Stable row id (`tx-…`, `booking-…` or `booking-…-refund`).
    pub id: String,
    /// Movement date.
    pub date: DateTime<Utc>,
    /// Movement kind.
    #[serde(rename = "type")]
    pub movement_type: MovementType,
    /// Signed amount; negative is a debit.
    pub amount: f64,
    /// Human-readable description.
    pub description: String,
    /// Reconstructed balance after this movement.
    pub balance_after: f64,
    /// Linked booking, if any.
    pub booking_id: Option<BookingId>,
}

fn room_label(name: Option<&str>) -> &str {
    name.unwrap_or("meeting room")
}

fn describe(transaction: &CreditTransaction) -> String {
    if let Some(reason) = transaction.reason.as_deref().filter(|r| !r.trim().is_empty()) {
        return reason.to_string();
    }
    let room = room_label(transaction.resource_name.as_deref());
    match transaction.transaction_type {
        TransactionType::Consumption => format!("Booking - {room}"),
        TransactionType::Refund => format!("Cancellation refund - {room}"),
        TransactionType::Allocation => "Credit allocation".to_string(),
        TransactionType::Expiration => "Credit expiration".to_string(),
        TransactionType::Adjustment => "Manual adjustment".to_string(),
        TransactionType::Purchase => "Credit purchase".to_string(),
    }
}

impl From<&CreditTransaction> for CreditMovement {
    fn from(transaction: &CreditTransaction) -> Self {
        Self {
            id: format!("tx-{}", transaction.id),
            date: transaction.created_at,
            movement_type: transaction.transaction_type.movement_type(),
            amount: transaction.transaction_type.signed(transaction.amount),
            description: describe(transaction),
            balance_after: 0.0,
            booking_id: transaction.booking_id,
        }
    }
}

/// Movements synthesized for a booking without transaction records.
///
/// A cancelled booking yields its refund first so that, on equal dates, the
/// refund sorts as the newer row.
fn synthesize(booking: &HistoricalBooking) -> Vec<CreditMovement> {
    let room = room_label(booking.resource_name.as_deref());
    let amount = booking.credits_used.abs();
    let reservation = CreditMovement {
        id: format!("booking-{}", booking.id),
        date: booking.start,
        movement_type: MovementType::Reservation,
        amount: -amount,
        description: format!("Booking - {room}"),
        balance_after: 0.0,
        booking_id: Some(booking.id),
    };
    if booking.status == BookingStatus::Cancelled {
        let refund = CreditMovement {
            id: format!("booking-{}-refund", booking.id),
            date: booking.start,
            movement_type: MovementType::Cancellation,
            amount,
            description: format!("Cancellation refund - {room}"),
            balance_after: 0.0,
            booking_id: Some(booking.id),
        };
        vec![refund, reservation]
    } else {
        vec![reservation]
    }
}

/// Merges transactions and legacy bookings into one newest-first ledger.
///
/// Bookings referenced by any transaction are skipped, so each booking
/// contributes through exactly one source. Bookings without credits are
/// ignored.
#[must_use]
pub fn reconcile(
    transactions: &[CreditTransaction],
    bookings: &[HistoricalBooking],
    total_remaining: f64,
) -> Vec<CreditMovement> {
    let referenced: HashSet<BookingId> = transactions.iter().filter_map(|t| t.booking_id).collect();

    let mut movements: Vec<CreditMovement> =
        transactions.iter().map(CreditMovement::from).collect();
    movements.extend(
        bookings
            .iter()
            .filter(|b| b.credits_used > 0.0 && !referenced.contains(&b.id))
            .flat_map(synthesize),
    );

    movements.sort_by_key(|m| Reverse(m.date));
    backfill_balances(&mut movements, total_remaining);
    movements
}

/// Writes `balance_after` walking a newest-first list.
///
/// The newest row gets `total`. Each older row gets the previous row's
/// balance minus the previous row's amount.
pub fn backfill_balances(movements: &mut [CreditMovement], total: f64) {
    let mut balance = total;
    let mut previous_amount = 0.0;
    for movement in movements.iter_mut() {
        balance -= previous_amount;
        movement.balance_after = balance;
        previous_amount = movement.amount;
    }
}
