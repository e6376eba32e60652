//! Notification sinks for ledger events.

use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::info;

use accrue_core::traits::EventSink;
use accrue_core::types::LedgerEvent;

/// Logs every event as a structured `tracing` record.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: &LedgerEvent) {
        match event {
            LedgerEvent::GlobalRateChanged { old, new } => {
                info!(target: "accrue::events", old, new, "global_rate_changed");
            }
            LedgerEvent::InterestMaterialized { account, amount } => {
                info!(target: "accrue::events", %account, amount, "interest_materialized");
            }
            LedgerEvent::Deposited { account, amount } => {
                info!(target: "accrue::events", %account, amount, "deposited");
            }
            LedgerEvent::Withdrawn { account, amount } => {
                info!(target: "accrue::events", %account, amount, "withdrawn");
            }
        }
    }
}

/// Fans events out to any number of subscribers over a broadcast channel.
///
/// Sending never blocks. Slow subscribers lag and miss events once the
/// channel capacity is exceeded; emitting with no subscribers is a no-op.
#[derive(Debug, Clone)]
pub struct BroadcastSink {
    tx: broadcast::Sender<LedgerEvent>,
}

impl BroadcastSink {
    /// Create a sink buffering up to `capacity` events per subscriber.
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to events emitted from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<LedgerEvent> {
        self.tx.subscribe()
    }
}

impl EventSink for BroadcastSink {
    fn emit(&self, event: &LedgerEvent) {
        let _ = self.tx.send(event.clone());
    }
}

/// Keeps every event in memory, in emission order.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<LedgerEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of all events recorded so far.
    pub fn events(&self) -> Vec<LedgerEvent> {
        self.events.lock().clone()
    }

    /// Drain recorded events.
    pub fn take(&self) -> Vec<LedgerEvent> {
        std::mem::take(&mut *self.events.lock())
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: &LedgerEvent) {
        self.events.lock().push(event.clone());
    }
}
