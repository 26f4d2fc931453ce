use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::digest::Digest;
use crate::identity::{ChainKey, ChainRecordId};

/// Metadata bound into a document's hash.
///
/// The known fields are typed; `extra` is the one pass-through slot for
/// engine-specific data that the chain never interprets.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMetadata {
    pub document_id: String,
    pub document_type: String,
    pub engine: String,
    pub filename: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<serde_json::Value>,
}

/// Provenance record for one generated document. Never mutated.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HashChainRecord {
    pub id: ChainRecordId,
    pub chain: ChainKey,
    pub document_hash: Digest,
    /// `None` only for position 0.
    pub previous_hash: Option<Digest>,
    pub chain_position: u64,
    pub timestamp: DateTime<Utc>,
    pub metadata: DocumentMetadata,
}

impl HashChainRecord {
    pub fn is_genesis(&self) -> bool {
        self.chain_position == 0
    }
}

/// Why a record failed verification.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerifyFailure {
    /// The record's own content or metadata no longer hashes to its stored hash.
    HashMismatch,
    /// The link to the previous record does not hold.
    ChainBreak,
}

impl fmt::Display for VerifyFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HashMismatch => f.write_str("hash_mismatch"),
            Self::ChainBreak => f.write_str("chain_break"),
        }
    }
}

/// Verification outcome for one record: `{valid, reason?}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainVerification {
    pub record_id: ChainRecordId,
    pub chain_position: u64,
    pub valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<VerifyFailure>,
}

impl ChainVerification {
    pub fn valid(record: &HashChainRecord) -> Self {
        Self {
            record_id: record.id,
            chain_position: record.chain_position,
            valid: true,
            reason: None,
        }
    }

    pub fn invalid(record: &HashChainRecord, reason: VerifyFailure) -> Self {
        Self {
            record_id: record.id,
            chain_position: record.chain_position,
            valid: false,
            reason: Some(reason),
        }
    }
}
