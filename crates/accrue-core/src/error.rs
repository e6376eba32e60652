//! Error types for the Accrue ledger.
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("rate increase rejected: current {old}, attempted {attempted}")] RateIncreaseRejected { old: u64, attempted: u64 },
    #[error("insufficient balance: available {available}, requested {requested}")] InsufficientBalance { available: u64, requested: u64 },
    #[error("arithmetic overflow")] ArithmeticOverflow,
    #[error("storage: {0}")] Storage(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AccountIdError {
    #[error("invalid hex: {0}")] InvalidHex(String),
    #[error("invalid length: got {got} bytes, expected 32")] InvalidLength { got: usize },
}
