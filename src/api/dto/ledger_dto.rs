//! Credit DTOs.

use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::{CompanyId, CreditBalance, CreditMovement};

/// Response body for `GET /companies/{id}/ledger`.
#[derive(Debug, Serialize, ToSchema)]
pub struct LedgerResponse {
    /// Company the ledger belongs to.
    pub company_id: CompanyId,
    /// Current balance; `remaining` equals the newest `balance_after`.
    pub balance: CreditBalance,
    /// Movements, newest first.
    pub movements: Vec<CreditMovement>,
}
