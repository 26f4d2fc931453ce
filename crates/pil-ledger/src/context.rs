use std::future::Future;
use std::sync::Arc;

use tracing::warn;

use pil_crypto::SnapshotHasher;
use pil_types::{Clock, SystemClock};

use crate::config::LedgerConfig;
use crate::error::{LedgerError, LedgerResult};
use crate::events::{EventSink, NullSink};
use crate::traits::{ConversionQuery, LedgerStore};

/// Collaborators shared by the ledger services.
///
/// Every boundary (store, conversion query, clock, hash function, event
/// sink) is injected here; nothing is ambient.
#[derive(Clone)]
pub struct LedgerContext {
    pub store: Arc<dyn LedgerStore>,
    pub conversions: Arc<dyn ConversionQuery>,
    pub hasher: SnapshotHasher,
    pub clock: Arc<dyn Clock>,
    pub events: Arc<dyn EventSink>,
    pub config: LedgerConfig,
}

impl LedgerContext {
    /// Context with the system clock, BLAKE3 snapshots, no event delivery,
    /// and default configuration.
    pub fn new(store: Arc<dyn LedgerStore>, conversions: Arc<dyn ConversionQuery>) -> Self {
        Self {
            store,
            conversions,
            hasher: SnapshotHasher::default(),
            clock: Arc::new(SystemClock),
            events: Arc::new(NullSink),
            config: LedgerConfig::default(),
        }
    }

    pub fn with_hasher(mut self, hasher: SnapshotHasher) -> Self {
        self.hasher = hasher;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    pub fn with_config(mut self, config: LedgerConfig) -> Self {
        self.config = config;
        self
    }

    /// Run one transactional unit under the configured bound. On expiry the
    /// unit's future is dropped, which rolls its transaction back.
    pub(crate) async fn within_deadline<T, F>(&self, operation: &'static str, unit: F) -> LedgerResult<T>
    where
        F: Future<Output = LedgerResult<T>>,
    {
        let limit = self.config.transaction_timeout();
        match tokio::time::timeout(limit, unit).await {
            Ok(result) => result,
            Err(_) => {
                warn!(operation, timeout_ms = limit.as_millis() as u64, "transaction timed out");
                Err(LedgerError::Timeout(limit))
            }
        }
    }
}

impl std::fmt::Debug for LedgerContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LedgerContext")
            .field("hasher", &self.hasher)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
