//! Shared test helpers for integration tests.

use std::sync::Arc;

use accrue_core::clock::ManualClock;
use accrue_core::traits::AccountStore;
use accrue_core::types::AccountId;
use accrue_ledger::{AccrualLedger, MemoryStore, RecordingSink};

/// Account identifier from a seed byte.
pub fn acct(seed: u8) -> AccountId {
    AccountId([seed; 32])
}

/// A ledger together with the clock and sink it was built with.
pub struct TestLedger<S: AccountStore> {
    pub ledger: AccrualLedger<S>,
    pub clock: Arc<ManualClock>,
    pub sink: Arc<RecordingSink>,
}

/// Build a ledger over `store` with a manual clock starting at `start`.
pub fn ledger_with<S: AccountStore>(store: S, initial_rate: u64, start: u64) -> TestLedger<S> {
    let clock = Arc::new(ManualClock::new(start));
    let sink = Arc::new(RecordingSink::new());
    let ledger = AccrualLedger::open(store, initial_rate, clock.clone(), sink.clone())
        .expect("open ledger");
    TestLedger { ledger, clock, sink }
}

/// In-memory ledger with a manual clock starting at zero.
pub fn memory_ledger(initial_rate: u64) -> TestLedger<MemoryStore> {
    ledger_with(MemoryStore::new(), initial_rate, 0)
}
