use std::sync::Arc;

use tracing::{debug, info, warn};

use pil_crypto::DocumentHasher;
use pil_types::{
    ChainKey, ChainRecordId, ChainVerification, Clock, DocumentMetadata, HashChainRecord,
    SystemClock, VerifyFailure,
};

use crate::config::ChainConfig;
use crate::error::{ChainError, ChainResult};
use crate::traits::{ChainStore, ChainStoreError, StoredDocument};

/// Creates and verifies provenance records for generated documents.
///
/// Each record's hash covers the document content, its metadata, and the
/// previous record's hash. Verification re-derives both the record's own
/// hash and its predecessor's from the content currently stored, so a
/// rewritten document shows up as `hash_mismatch` on itself and as
/// `chain_break` on the record after it.
pub struct HashChainVerifier {
    store: Arc<dyn ChainStore>,
    hasher: DocumentHasher,
    clock: Arc<dyn Clock>,
    config: ChainConfig,
}

impl HashChainVerifier {
    pub fn new(store: Arc<dyn ChainStore>) -> Self {
        Self {
            store,
            hasher: DocumentHasher::default(),
            clock: Arc::new(SystemClock),
            config: ChainConfig::default(),
        }
    }

    pub fn with_hasher(mut self, hasher: DocumentHasher) -> Self {
        self.hasher = hasher;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_config(mut self, config: ChainConfig) -> Self {
        self.config = config;
        self
    }

    /// Append a record for `content` at the head of `chain`.
    ///
    /// Losing the append race re-reads the head and tries again, up to
    /// `max_append_retries` times, then fails with `Conflict`.
    pub async fn create(
        &self,
        chain: &ChainKey,
        content: &[u8],
        metadata: DocumentMetadata,
    ) -> ChainResult<HashChainRecord> {
        let limit = self.config.transaction_timeout();
        match tokio::time::timeout(limit, self.append_with_retries(chain, content, metadata)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(%chain, timeout_ms = limit.as_millis() as u64, "chain append timed out");
                Err(ChainError::Timeout(limit))
            }
        }
    }

    async fn append_with_retries(
        &self,
        chain: &ChainKey,
        content: &[u8],
        metadata: DocumentMetadata,
    ) -> ChainResult<HashChainRecord> {
        let mut attempt = 0;
        loop {
            let latest = self.store.latest(chain).await?;
            let previous_hash = latest.as_ref().map(|r| r.document_hash);
            let chain_position = latest.as_ref().map_or(0, |r| r.chain_position + 1);

            let record = HashChainRecord {
                id: ChainRecordId::new(),
                chain: chain.clone(),
                document_hash: self
                    .hasher
                    .hash(content, &metadata, previous_hash.as_ref())?,
                previous_hash,
                chain_position,
                timestamp: self.clock.now(),
                metadata: metadata.clone(),
            };

            let document = StoredDocument {
                record: record.clone(),
                content: content.to_vec(),
            };
            match self.store.append(document).await {
                Ok(()) => {
                    info!(
                        %chain,
                        record = %record.id,
                        position = record.chain_position,
                        hash = %record.document_hash.short_hex(),
                        "chain record appended"
                    );
                    return Ok(record);
                }
                Err(ChainStoreError::PositionTaken { position, .. }) => {
                    if attempt >= self.config.max_append_retries {
                        warn!(%chain, position, attempts = attempt + 1, "chain append abandoned");
                        return Err(ChainError::Conflict(format!(
                            "chain {chain} advanced past position {position} during append"
                        )));
                    }
                    attempt += 1;
                    debug!(%chain, position, attempt, "chain head moved, retrying append");
                }
                Err(other) => return Err(other.into()),
            }
        }
    }

    pub async fn verify(&self, id: &ChainRecordId) -> ChainResult<ChainVerification> {
        let document = self
            .store
            .record(id)
            .await?
            .ok_or_else(|| ChainError::NotFound(format!("chain record {id}")))?;
        self.check(&document).await
    }

    pub async fn verify_at(&self, chain: &ChainKey, position: u64) -> ChainResult<ChainVerification> {
        let document = self
            .store
            .record_at(chain, position)
            .await?
            .ok_or_else(|| ChainError::NotFound(format!("position {position} of chain {chain}")))?;
        self.check(&document).await
    }

    /// Verify every record of `chain`, in position order.
    pub async fn verify_chain(&self, chain: &ChainKey) -> ChainResult<Vec<ChainVerification>> {
        let length = self.store.chain_length(chain).await?;
        if length == 0 {
            return Err(ChainError::NotFound(format!("chain {chain}")));
        }

        let mut results = Vec::new();
        for position in 0..length {
            results.push(self.verify_at(chain, position).await?);
        }

        let broken = results.iter().filter(|r| !r.valid).count();
        if broken > 0 {
            warn!(%chain, length, broken, "chain verification found broken records");
        } else {
            debug!(%chain, length, "chain verified");
        }
        Ok(results)
    }

    async fn check(&self, document: &StoredDocument) -> ChainResult<ChainVerification> {
        let record = &document.record;

        let recomputed = self.hasher.hash(
            &document.content,
            &record.metadata,
            record.previous_hash.as_ref(),
        )?;
        if recomputed != record.document_hash {
            return Ok(ChainVerification::invalid(record, VerifyFailure::HashMismatch));
        }

        if record.is_genesis() {
            return Ok(match record.previous_hash {
                None => ChainVerification::valid(record),
                Some(_) => ChainVerification::invalid(record, VerifyFailure::ChainBreak),
            });
        }

        let Some(expected) = record.previous_hash else {
            return Ok(ChainVerification::invalid(record, VerifyFailure::ChainBreak));
        };
        let Some(previous) = self
            .store
            .record_at(&record.chain, record.chain_position - 1)
            .await?
        else {
            return Ok(ChainVerification::invalid(record, VerifyFailure::ChainBreak));
        };

        let previous_now = self.hasher.hash(
            &previous.content,
            &previous.record.metadata,
            previous.record.previous_hash.as_ref(),
        )?;
        if previous.record.document_hash != expected || previous_now != expected {
            return Ok(ChainVerification::invalid(record, VerifyFailure::ChainBreak));
        }

        Ok(ChainVerification::valid(record))
    }
}

impl std::fmt::Debug for HashChainVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HashChainVerifier")
            .field("hasher", &self.hasher)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
