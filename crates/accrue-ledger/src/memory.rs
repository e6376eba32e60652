//! In-memory account store.
//!
//! Account records live in a [`DashMap`]; the global rate and total supply sit
//! behind one mutex that also serializes commits, so supply adjustments from
//! different accounts never race. No persistence.

use dashmap::DashMap;
use parking_lot::Mutex;

use accrue_core::error::LedgerError;
use accrue_core::traits::{AccountStore, StoreWrite};
use accrue_core::types::{AccountId, AccountState};

#[derive(Debug, Default)]
struct Scalars {
    global_rate: Option<u64>,
    total_supply: u128,
}

/// Volatile [`AccountStore`] for tests and embedding.
#[derive(Debug, Default)]
pub struct MemoryStore {
    accounts: DashMap<AccountId, AccountState>,
    scalars: Mutex<Scalars>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored accounts.
    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    /// Whether no account has been written.
    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}

/// Apply a write's supply adjustment to `supply`.
///
/// `minted` and `burned` are netted first, so a write that lowers supply can
/// never fail on its intermediate value.
pub(crate) fn adjust_supply(supply: u128, write: &StoreWrite) -> Result<u128, LedgerError> {
    let minted = u128::from(write.minted);
    let burned = u128::from(write.burned);
    let adjusted = if minted >= burned {
        supply.checked_add(minted - burned)
    } else {
        supply.checked_sub(burned - minted)
    };
    adjusted.ok_or(LedgerError::ArithmeticOverflow)
}

impl AccountStore for MemoryStore {
    fn get_account(&self, id: &AccountId) -> Result<Option<AccountState>, LedgerError> {
        Ok(self.accounts.get(id).map(|entry| *entry))
    }

    fn global_rate(&self) -> Result<Option<u64>, LedgerError> {
        Ok(self.scalars.lock().global_rate)
    }

    fn total_supply(&self) -> Result<u128, LedgerError> {
        Ok(self.scalars.lock().total_supply)
    }

    fn commit(&self, write: &StoreWrite) -> Result<(), LedgerError> {
        let mut scalars = self.scalars.lock();
        let supply = adjust_supply(scalars.total_supply, write)?;

        if let Some((id, state)) = write.account {
            self.accounts.insert(id, state);
        }
        if let Some(rate) = write.global_rate {
            scalars.global_rate = Some(rate);
        }
        scalars.total_supply = supply;
        Ok(())
    }

    fn iter_accounts(&self) -> Result<Vec<(AccountId, AccountState)>, LedgerError> {
        let mut all: Vec<_> = self
            .accounts
            .iter()
            .map(|entry| (*entry.key(), *entry.value()))
            .collect();
        all.sort_by_key(|(id, _)| *id);
        Ok(all)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(principal: u64) -> AccountState {
        AccountState {
            principal,
            frozen_rate: 1,
            last_update: 2,
        }
    }

    #[test]
    fn empty_store() {
        let store = MemoryStore::new();
        assert!(store.is_empty());
        assert_eq!(store.global_rate().unwrap(), None);
        assert_eq!(store.total_supply().unwrap(), 0);
        assert_eq!(store.get_account(&AccountId::ZERO).unwrap(), None);
    }

    #[test]
    fn commit_account_and_supply() {
        let store = MemoryStore::new();
        let id = AccountId([3; 32]);
        store.commit(&StoreWrite::account(id, state(10), 10, 0)).unwrap();
        store.commit(&StoreWrite::account(id, state(4), 0, 6)).unwrap();
        assert_eq!(store.get_account(&id).unwrap(), Some(state(4)));
        assert_eq!(store.total_supply().unwrap(), 4);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn supply_underflow_rejected_without_write() {
        let store = MemoryStore::new();
        let id = AccountId([3; 32]);
        assert_eq!(
            store.commit(&StoreWrite::account(id, state(0), 0, 1)),
            Err(LedgerError::ArithmeticOverflow)
        );
        assert!(store.is_empty());
    }

    #[test]
    fn supply_grows_past_single_balance_limit() {
        let store = MemoryStore::new();
        let half = u64::MAX / 2 + 1;
        store
            .commit(&StoreWrite::account(AccountId([1; 32]), state(half), half, 0))
            .unwrap();
        store
            .commit(&StoreWrite::account(AccountId([2; 32]), state(half), half, 0))
            .unwrap();
        assert_eq!(store.total_supply().unwrap(), 1u128 << 64);
    }

    #[test]
    fn supply_nets_mint_against_burn() {
        let store = MemoryStore::new();
        let id = AccountId([4; 32]);
        store.commit(&StoreWrite::account(id, state(10), 10, 0)).unwrap();
        // Interest minted and a larger amount burned in the same write.
        store.commit(&StoreWrite::account(id, state(3), 5, 12)).unwrap();
        assert_eq!(store.total_supply().unwrap(), 3);
    }

    #[test]
    fn iter_sorted_by_id() {
        let store = MemoryStore::new();
        for b in [9u8, 1, 5] {
            store
                .commit(&StoreWrite::account(AccountId([b; 32]), state(b as u64), b as u64, 0))
                .unwrap();
        }
        let ids: Vec<u8> = store
            .iter_accounts()
            .unwrap()
            .iter()
            .map(|(id, _)| id.0[0])
            .collect();
        assert_eq!(ids, vec![1, 5, 9]);
        assert_eq!(store.total_supply().unwrap(), 15);
    }
}
