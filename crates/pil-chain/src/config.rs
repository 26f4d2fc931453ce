use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for chain appends.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainConfig {
    /// Re-reads of the chain head after losing an append race before
    /// giving up with `Conflict`.
    pub max_append_retries: u32,
    pub transaction_timeout_ms: u64,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            max_append_retries: 3,
            transaction_timeout_ms: 10_000,
        }
    }
}

impl ChainConfig {
    pub fn transaction_timeout(&self) -> Duration {
        Duration::from_millis(self.transaction_timeout_ms)
    }
}
