use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use pil_types::{ChainKey, ChainRecordId, HashChainRecord};

use crate::traits::{ChainStore, ChainStoreError, ChainStoreResult, StoredDocument};

/// In-memory chain store for tests, local demos, and embedding.
#[derive(Clone, Default)]
pub struct InMemoryChainStore {
    inner: Arc<RwLock<ChainState>>,
}

#[derive(Default)]
struct ChainState {
    chains: HashMap<ChainKey, Vec<StoredDocument>>,
    index: HashMap<ChainRecordId, (ChainKey, usize)>,
}

impl InMemoryChainStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of chains with at least one record.
    pub fn chain_count(&self) -> ChainStoreResult<usize> {
        Ok(self.read()?.chains.len())
    }

    /// Replace a stored document's content, bypassing the append-only rule.
    #[cfg(test)]
    pub(crate) fn overwrite_content(&self, id: &ChainRecordId, content: &[u8]) {
        let mut state = self.inner.write().unwrap();
        let (chain, slot) = state.index.get(id).cloned().unwrap();
        state.chains.get_mut(&chain).unwrap()[slot].content = content.to_vec();
    }

    fn read(&self) -> ChainStoreResult<std::sync::RwLockReadGuard<'_, ChainState>> {
        self.inner
            .read()
            .map_err(|_| ChainStoreError::Unavailable("chain store lock poisoned".into()))
    }
}

impl std::fmt::Debug for InMemoryChainStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryChainStore")
            .field("chains", &self.chain_count().ok())
            .finish()
    }
}

#[async_trait]
impl ChainStore for InMemoryChainStore {
    async fn latest(&self, chain: &ChainKey) -> ChainStoreResult<Option<HashChainRecord>> {
        Ok(self
            .read()?
            .chains
            .get(chain)
            .and_then(|docs| docs.last())
            .map(|doc| doc.record.clone()))
    }

    async fn record(&self, id: &ChainRecordId) -> ChainStoreResult<Option<StoredDocument>> {
        let state = self.read()?;
        Ok(state
            .index
            .get(id)
            .and_then(|(chain, slot)| state.chains.get(chain)?.get(*slot))
            .cloned())
    }

    async fn record_at(
        &self,
        chain: &ChainKey,
        position: u64,
    ) -> ChainStoreResult<Option<StoredDocument>> {
        let slot = match usize::try_from(position) {
            Ok(slot) => slot,
            Err(_) => return Ok(None),
        };
        Ok(self
            .read()?
            .chains
            .get(chain)
            .and_then(|docs| docs.get(slot))
            .cloned())
    }

    async fn chain_length(&self, chain: &ChainKey) -> ChainStoreResult<u64> {
        Ok(self
            .read()?
            .chains
            .get(chain)
            .map_or(0, |docs| docs.len() as u64))
    }

    async fn append(&self, document: StoredDocument) -> ChainStoreResult<()> {
        let mut state = self
            .inner
            .write()
            .map_err(|_| ChainStoreError::Unavailable("chain store lock poisoned".into()))?;

        let record = &document.record;
        if state.index.contains_key(&record.id) {
            return Err(ChainStoreError::DuplicateRecord(record.id));
        }
        let length = state.chains.get(&record.chain).map_or(0, |docs| docs.len());
        if record.chain_position != length as u64 {
            return Err(ChainStoreError::PositionTaken {
                chain: record.chain.clone(),
                position: record.chain_position,
            });
        }

        let id = record.id;
        let chain = record.chain.clone();
        state.index.insert(id, (chain.clone(), length));
        state.chains.entry(chain).or_default().push(document);
        Ok(())
    }
}
