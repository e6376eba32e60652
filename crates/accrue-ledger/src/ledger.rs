//! The accrual ledger.
//!
//! [`AccrualLedger`] owns the global rate and an [`AccountStore`], and runs
//! every balance-affecting operation as: lock account, read record, apply the
//! pure transition from [`accrue_core::accrual`], commit one atomic
//! [`StoreWrite`], then notify the [`EventSink`].
//!
//! Lock order is always account lock, then global-rate lock. Deposits hold
//! the global-rate read lock until their write is committed, so a concurrent
//! [`set_global_rate`](AccrualLedger::set_global_rate) is ordered either
//! entirely before or entirely after each deposit. Events are emitted while
//! the relevant lock is still held, so sinks see rate changes and each
//! account's changes in commit order.

use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, warn};

use accrue_core::accrual::{self, Transition};
use accrue_core::constants::WITHDRAW_ALL;
use accrue_core::error::LedgerError;
use accrue_core::traits::{AccountStore, Clock, EventSink, StoreWrite};
use accrue_core::types::{AccountId, AccountState, LedgerEvent};

/// Single-asset ledger with linear interest at per-account frozen rates.
pub struct AccrualLedger<S: AccountStore> {
    store: S,
    clock: Arc<dyn Clock>,
    sink: Arc<dyn EventSink>,
    /// Cached copy of the stored global rate.
    global_rate: RwLock<u64>,
    /// Per-account mutexes, created on first use.
    account_locks: DashMap<AccountId, Arc<Mutex<()>>>,
}

impl<S: AccountStore> AccrualLedger<S> {
    /// Open a ledger over `store`.
    ///
    /// A store that already holds a global rate keeps it; `initial_rate` is
    /// only written to a fresh store.
    pub fn open(
        store: S,
        initial_rate: u64,
        clock: Arc<dyn Clock>,
        sink: Arc<dyn EventSink>,
    ) -> Result<Self, LedgerError> {
        let rate = match store.global_rate()? {
            Some(stored) => {
                if stored != initial_rate {
                    debug!(stored, initial_rate, "using persisted global rate");
                }
                stored
            }
            None => {
                store.commit(&StoreWrite::global_rate(initial_rate))?;
                info!(rate = initial_rate, "initialised global rate");
                initial_rate
            }
        };

        Ok(Self {
            store,
            clock,
            sink,
            global_rate: RwLock::new(rate),
            account_locks: DashMap::new(),
        })
    }

    /// Current global rate, fixed-point over `PRECISION`.
    pub fn global_rate(&self) -> u64 {
        *self.global_rate.read()
    }

    /// Lower (or keep) the global rate.
    ///
    /// Existing accounts keep their frozen rate until their next deposit.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::RateIncreaseRejected`] if `new_rate` exceeds the current rate
    pub fn set_global_rate(&self, new_rate: u64) -> Result<(), LedgerError> {
        let mut rate = self.global_rate.write();
        let old = *rate;
        if new_rate > old {
            warn!(old, attempted = new_rate, "rejected global rate increase");
            return Err(LedgerError::RateIncreaseRejected {
                old,
                attempted: new_rate,
            });
        }
        self.store.commit(&StoreWrite::global_rate(new_rate))?;
        *rate = new_rate;

        info!(old, new = new_rate, "global rate updated");
        self.sink.emit(&LedgerEvent::GlobalRateChanged { old, new: new_rate });
        Ok(())
    }

    /// Balance of `account` right now, including unmaterialized interest.
    ///
    /// Pure query: nothing is written. Unknown accounts report 0.
    pub fn current_balance(&self, account: &AccountId) -> Result<u64, LedgerError> {
        let state = self.store.account_or_default(account)?;
        accrual::current_balance(&state, self.clock.now())
    }

    /// Stored record for `account`, excluding unmaterialized interest.
    pub fn account(&self, account: &AccountId) -> Result<AccountState, LedgerError> {
        self.store.account_or_default(account)
    }

    /// All accounts that have ever been written.
    pub fn accounts(&self) -> Result<Vec<(AccountId, AccountState)>, LedgerError> {
        self.store.iter_accounts()
    }

    /// Sum of all materialized principals.
    pub fn total_supply(&self) -> Result<u128, LedgerError> {
        self.store.total_supply()
    }

    /// Credit `amount` to `account` and freeze the current global rate for it.
    ///
    /// Interest accrued under the previous frozen rate is materialized first.
    /// A zero amount is accepted and refreshes the rate and timestamp.
    pub fn deposit(&self, account: &AccountId, amount: u64) -> Result<Transition, LedgerError> {
        let lock = self.account_lock(account);
        let _guard = lock.lock();

        let t = {
            let rate = self.global_rate.read();
            let now = self.clock.now();
            let state = self.store.account_or_default(account)?;
            let t = accrual::deposit(&state, *rate, amount, now)?;
            let minted = t
                .interest
                .checked_add(amount)
                .ok_or(LedgerError::ArithmeticOverflow)?;
            self.store
                .commit(&StoreWrite::account(*account, t.state, minted, 0))?;
            t
        };

        debug!(
            %account,
            amount,
            interest = t.interest,
            principal = t.state.principal,
            frozen_rate = t.state.frozen_rate,
            "deposit"
        );
        self.notify_interest(account, t.interest);
        self.sink.emit(&LedgerEvent::Deposited {
            account: *account,
            amount,
        });
        Ok(t)
    }

    /// Debit `amount` from `account` after materializing its interest.
    ///
    /// [`WITHDRAW_ALL`](accrue_core::constants::WITHDRAW_ALL) withdraws the
    /// full current balance; the resolved amount is in [`Transition::amount`].
    /// Withdrawing nothing from an account that was never written is a no-op.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::InsufficientBalance`] if `amount` exceeds the balance;
    ///   nothing is written
    pub fn withdraw(&self, account: &AccountId, amount: u64) -> Result<Transition, LedgerError> {
        let Some(lock) = self.existing_account_lock(account)? else {
            if amount == 0 || amount == WITHDRAW_ALL {
                return Ok(Transition::untouched());
            }
            debug!(%account, amount, "withdraw from unknown account rejected");
            return Err(LedgerError::InsufficientBalance {
                available: 0,
                requested: amount,
            });
        };
        let _guard = lock.lock();

        let now = self.clock.now();
        let state = self.store.account_or_default(account)?;
        let t = match accrual::withdraw(&state, amount, now) {
            Ok(t) => t,
            Err(e) => {
                debug!(%account, amount, error = %e, "withdraw rejected");
                return Err(e);
            }
        };
        self.store.commit(&StoreWrite::account(
            *account,
            t.state,
            t.interest,
            t.amount,
        ))?;

        debug!(
            %account,
            amount = t.amount,
            interest = t.interest,
            principal = t.state.principal,
            "withdraw"
        );
        self.notify_interest(account, t.interest);
        self.sink.emit(&LedgerEvent::Withdrawn {
            account: *account,
            amount: t.amount,
        });
        Ok(t)
    }

    /// Fold accrued interest into `account`'s principal without moving funds.
    ///
    /// For composing layers that perform their own balance-affecting
    /// operations. An account that was never written stays unwritten.
    pub fn accrue(&self, account: &AccountId) -> Result<Transition, LedgerError> {
        let Some(lock) = self.existing_account_lock(account)? else {
            return Ok(Transition::untouched());
        };
        let _guard = lock.lock();

        let state = self.store.account_or_default(account)?;

        let t = accrual::materialize(&state, self.clock.now())?;
        self.store
            .commit(&StoreWrite::account(*account, t.state, t.interest, 0))?;

        debug!(%account, interest = t.interest, principal = t.state.principal, "accrue");
        self.notify_interest(account, t.interest);
        Ok(t)
    }

    /// Borrow the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    fn account_lock(&self, account: &AccountId) -> Arc<Mutex<()>> {
        self.account_locks.entry(*account).or_default().clone()
    }

    /// Lock for `account` if it has a stored record, without registering a
    /// lock for unknown accounts.
    ///
    /// Records are never removed, so one seen here is still there once the
    /// lock is held. Callers that get `None` write nothing and are ordered
    /// before any concurrent first deposit.
    fn existing_account_lock(
        &self,
        account: &AccountId,
    ) -> Result<Option<Arc<Mutex<()>>>, LedgerError> {
        if self.store.get_account(account)?.is_none() {
            return Ok(None);
        }
        Ok(Some(self.account_lock(account)))
    }

    fn notify_interest(&self, account: &AccountId, interest: u64) {
        if interest > 0 {
            self.sink.emit(&LedgerEvent::InterestMaterialized {
                account: *account,
                amount: interest,
            });
        }
    }
}
