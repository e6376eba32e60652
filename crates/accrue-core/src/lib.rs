//! # accrue-core
//! Foundation types, traits and accrual arithmetic for the Accrue ledger.

pub mod accrual;
pub mod clock;
pub mod constants;
pub mod error;
pub mod traits;
pub mod types;
