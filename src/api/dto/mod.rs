//! Data Transfer Objects for REST request/response serialization.
//!
//! Dates are `YYYY-MM-DD` in the viewer time zone, slots are `"HH:00"` and
//! instants are RFC 3339.

pub mod booking_dto;
pub mod common_dto;
pub mod ledger_dto;
pub mod wizard_dto;

pub use booking_dto::*;
pub use common_dto::*;
pub use ledger_dto::*;
pub use wizard_dto::*;
