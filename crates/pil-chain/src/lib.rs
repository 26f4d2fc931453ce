//! Document provenance hash chains for the Payout Integrity Ledger.
//!
//! Every generated document (statement, invoice, export) gets one record in
//! a named chain. Records are append-only; positions are assigned through an
//! optimistic check against the store, and verification distinguishes a
//! changed document (`hash_mismatch`) from a changed predecessor
//! (`chain_break`).

pub mod config;
pub mod error;
pub mod memory;
pub mod traits;
pub mod verifier;

pub use config::ChainConfig;
pub use error::{ChainError, ChainResult};
pub use memory::InMemoryChainStore;
pub use traits::{ChainStore, ChainStoreError, ChainStoreResult, StoredDocument};
pub use verifier::HashChainVerifier;
