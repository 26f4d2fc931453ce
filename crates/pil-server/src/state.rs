use std::sync::Arc;

use pil_chain::{ChainStore, HashChainVerifier, InMemoryChainStore};
use pil_crypto::{DocumentHasher, HashAlgorithm, SnapshotHasher};
use pil_ledger::{
    BroadcastSink, ConversionQuery, InMemoryLedgerStore, LedgerContext, LedgerStore,
};
use pil_types::{Clock, SystemClock};

use crate::config::ServerConfig;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub ledger: LedgerContext,
    pub chain: Arc<HashChainVerifier>,
    pub events: Arc<BroadcastSink>,
    pub hash_function: HashAlgorithm,
}

impl AppState {
    pub fn new(
        config: &ServerConfig,
        store: Arc<dyn LedgerStore>,
        conversions: Arc<dyn ConversionQuery>,
        chain_store: Arc<dyn ChainStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let function = config.hash_function.function();
        let events = Arc::new(BroadcastSink::new(config.ledger.event_channel_capacity));

        let ledger = LedgerContext::new(store, conversions)
            .with_hasher(SnapshotHasher::new(Arc::clone(&function)))
            .with_clock(Arc::clone(&clock))
            .with_events(events.clone())
            .with_config(config.ledger.clone());
        let chain = HashChainVerifier::new(chain_store)
            .with_hasher(DocumentHasher::new(function))
            .with_clock(clock)
            .with_config(config.chain.clone());

        Self {
            ledger,
            chain: Arc::new(chain),
            events,
            hash_function: config.hash_function,
        }
    }

    /// State backed by the in-memory stores and the system clock.
    pub fn in_memory(config: &ServerConfig, ledger_store: InMemoryLedgerStore) -> Self {
        Self::new(
            config,
            Arc::new(ledger_store.clone()),
            Arc::new(ledger_store),
            Arc::new(InMemoryChainStore::new()),
            Arc::new(SystemClock),
        )
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("ledger", &self.ledger)
            .field("hash_function", &self.hash_function)
            .finish_non_exhaustive()
    }
}
