//! Foundation types for the Payout Integrity Ledger (PIL).
//!
//! Every other PIL crate depends on `pil-types`. Nothing here performs I/O;
//! the types only encode the shapes and the lifecycle rules that the ledger
//! and chain services enforce.
//!
//! # Key Types
//!
//! - [`Digest`]: 32-byte cryptographic digest, persisted as lowercase hex
//! - [`BillingPeriod`]: validated billing window (`start < end`)
//! - [`PayoutLedgerEntry`]: one immutable ledger row (payout or adjustment)
//! - [`LedgerStatus`]: forward-only entry lifecycle
//! - [`ConversionRecord`]: externally attributed source record
//! - [`HashChainRecord`]: provenance record for a generated document
//! - [`ErrorCode`]: stable error taxonomy surfaced to callers

pub mod chain;
pub mod clock;
pub mod digest;
pub mod error;
pub mod event;
pub mod identity;
pub mod ledger;
pub mod period;

pub use chain::{ChainVerification, DocumentMetadata, HashChainRecord, VerifyFailure};
pub use clock::{Clock, FixedClock, SystemClock};
pub use digest::Digest;
pub use error::{ErrorCode, TypeError};
pub use event::{StatusEvent, StatusMessage};
pub use identity::{ActorId, ChainKey, ChainRecordId, ConversionId, LedgerEntryId, PartnerId};
pub use ledger::{
    ConversionRecord, LedgerStatus, LedgerType, LineageKey, PayoutLedgerEntry, PayoutTotals,
};
pub use period::BillingPeriod;

/// Monetary amounts are exact decimals, never floating point.
pub use rust_decimal::Decimal;
