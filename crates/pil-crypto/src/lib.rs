//! Hashing primitives for the Payout Integrity Ledger.
//!
//! Provides the pluggable [`HashFunction`] collaborator (BLAKE3 by default,
//! SHA-256 on request), domain-separated content hashing, the snapshot
//! hasher that pins an approval to an exact ordered id set, and the document
//! hasher behind provenance chains.
//!
//! All crypto operations wrap established libraries; there is no custom cryptography.

pub mod document;
pub mod function;
pub mod hasher;
pub mod snapshot;

pub use document::DocumentHasher;
pub use function::{Blake3, HashAlgorithm, HashFunction, Sha256};
pub use hasher::{ContentHasher, HasherError};
pub use snapshot::SnapshotHasher;
