use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for ledger operations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Bound on each serializable unit (approve, adjust, transition),
    /// including the wait to open the transaction.
    pub transaction_timeout_ms: u64,
    /// Capacity of each per-entry status channel.
    pub event_channel_capacity: usize,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            transaction_timeout_ms: 10_000,
            event_channel_capacity: 256,
        }
    }
}

impl LedgerConfig {
    pub fn transaction_timeout(&self) -> Duration {
        Duration::from_millis(self.transaction_timeout_ms)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.transaction_timeout_ms = timeout.as_millis() as u64;
        self
    }
}
