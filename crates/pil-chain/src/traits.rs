use async_trait::async_trait;

use pil_types::{ChainKey, ChainRecordId, HashChainRecord};

/// A chain record together with the document content it covers.
///
/// Verification re-hashes `content` as currently stored, so the store must
/// keep it alongside the record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredDocument {
    pub record: HashChainRecord,
    pub content: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChainStoreError {
    /// Optimistic append lost: the chain no longer ends where the writer
    /// expected.
    #[error("position {position} of chain {chain} is not the next free slot")]
    PositionTaken { chain: ChainKey, position: u64 },

    #[error("record {0} already exists")]
    DuplicateRecord(ChainRecordId),

    #[error("{0}")]
    Unavailable(String),
}

pub type ChainStoreResult<T> = Result<T, ChainStoreError>;

/// Append-only storage for provenance chains.
///
/// `append` is the only write. It succeeds only when the record's
/// `chain_position` equals the current chain length, which makes concurrent
/// writers on one chain serialize: exactly one wins each position.
#[async_trait]
pub trait ChainStore: Send + Sync {
    async fn latest(&self, chain: &ChainKey) -> ChainStoreResult<Option<HashChainRecord>>;

    async fn record(&self, id: &ChainRecordId) -> ChainStoreResult<Option<StoredDocument>>;

    async fn record_at(
        &self,
        chain: &ChainKey,
        position: u64,
    ) -> ChainStoreResult<Option<StoredDocument>>;

    async fn chain_length(&self, chain: &ChainKey) -> ChainStoreResult<u64>;

    async fn append(&self, document: StoredDocument) -> ChainStoreResult<()>;
}
