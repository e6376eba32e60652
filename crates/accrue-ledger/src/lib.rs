//! # accrue-ledger: Linear-interest accrual ledger.
//!
//! Composes the pure accrual transitions from `accrue-core` with storage,
//! per-account serialization and notifications:
//! - **AccrualLedger**: deposit, withdraw, materialize and balance queries
//!   over a non-increasing global rate that each account freezes at deposit.
//! - **Stores**: [`MemoryStore`] for tests and embedding, [`RocksStore`] for
//!   persistent state with one column family per account map.
//! - **Sinks**: structured logging, broadcast fan-out, and in-memory capture
//!   of [`LedgerEvent`](accrue_core::types::LedgerEvent)s.

pub mod config;
pub mod events;
pub mod ledger;
pub mod memory;
pub mod storage;

pub use config::LedgerConfig;
pub use events::{BroadcastSink, RecordingSink, TracingSink};
pub use ledger::AccrualLedger;
pub use memory::MemoryStore;
pub use storage::RocksStore;
