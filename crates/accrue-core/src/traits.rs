//! Trait interfaces for the Accrue ledger.
//!
//! These traits are the seams between the accrual core and its host:
//! - [`Clock`]: current time in Unix seconds
//! - [`EventSink`]: fire-and-forget notifications of committed changes
//! - [`AccountStore`]: persisted account records and ledger scalars

use crate::error::LedgerError;
use crate::types::{AccountId, AccountState, LedgerEvent};

/// Monotonically non-decreasing source of the current time.
pub trait Clock: Send + Sync {
    /// Current time in Unix seconds.
    fn now(&self) -> u64;
}

/// Receiver of ledger notifications.
///
/// Called synchronously after the corresponding state has been committed and
/// before the ledger operation returns. Implementations must not call back
/// into the ledger.
pub trait EventSink: Send + Sync {
    /// Deliver one event.
    fn emit(&self, event: &LedgerEvent);
}

/// A set of changes committed atomically by an [`AccountStore`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StoreWrite {
    /// Replacement record for one account.
    pub account: Option<(AccountId, AccountState)>,
    /// New global rate.
    pub global_rate: Option<u64>,
    /// Tokens added to total supply (deposits and materialized interest).
    pub minted: u64,
    /// Tokens removed from total supply (withdrawals).
    pub burned: u64,
}

impl StoreWrite {
    /// Write that replaces one account record and adjusts supply.
    pub fn account(id: AccountId, state: AccountState, minted: u64, burned: u64) -> Self {
        Self {
            account: Some((id, state)),
            minted,
            burned,
            ..Self::default()
        }
    }

    /// Write that only replaces the global rate.
    pub fn global_rate(rate: u64) -> Self {
        Self {
            global_rate: Some(rate),
            ..Self::default()
        }
    }
}

/// Persistent ledger state: three per-account maps plus ledger scalars.
///
/// Implementations apply each [`StoreWrite`] all-or-nothing. The ledger
/// serializes writes per account; the store must still serialize supply
/// updates across accounts.
pub trait AccountStore: Send + Sync {
    /// Stored record for `id`. Returns `None` if the account was never written.
    fn get_account(&self, id: &AccountId) -> Result<Option<AccountState>, LedgerError>;

    /// Stored record for `id`, or the zero state for unknown accounts.
    ///
    /// Default implementation delegates to [`get_account`](Self::get_account).
    fn account_or_default(&self, id: &AccountId) -> Result<AccountState, LedgerError> {
        Ok(self.get_account(id)?.unwrap_or_default())
    }

    /// Stored global rate, or `None` for a store that was never initialised.
    fn global_rate(&self) -> Result<Option<u64>, LedgerError>;

    /// Sum of all stored principals.
    ///
    /// Wider than a single balance: each account may hold up to `u64::MAX`.
    fn total_supply(&self) -> Result<u128, LedgerError>;

    /// Apply a write atomically.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::ArithmeticOverflow`] if the supply adjustment underflows
    /// - [`LedgerError::Storage`] on backend failure; nothing is applied
    fn commit(&self, write: &StoreWrite) -> Result<(), LedgerError>;

    /// All stored accounts, ordered by identifier.
    fn iter_accounts(&self) -> Result<Vec<(AccountId, AccountState)>, LedgerError>;
}
