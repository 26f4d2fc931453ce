use std::sync::Arc;

use pil_types::Digest;

use crate::function::{Blake3, HashFunction};

/// Domain-separated content hasher.
///
/// Each hasher carries a domain tag (e.g. `"pil-snapshot-v1"`) that is
/// prepended to every hash computation, so a snapshot and a document with
/// identical bytes never produce the same digest.
#[derive(Clone)]
pub struct ContentHasher {
    domain: &'static str,
    function: Arc<dyn HashFunction>,
}

impl ContentHasher {
    pub const SNAPSHOT_DOMAIN: &'static str = "pil-snapshot-v1";
    pub const DOCUMENT_DOMAIN: &'static str = "pil-document-v1";

    /// Hasher with the given domain over BLAKE3.
    pub fn new(domain: &'static str) -> Self {
        Self::with_function(domain, Arc::new(Blake3))
    }

    pub fn with_function(domain: &'static str, function: Arc<dyn HashFunction>) -> Self {
        Self { domain, function }
    }

    /// Hash a sequence of chunks with domain separation.
    pub fn hash_chunks(&self, chunks: &[&[u8]]) -> Digest {
        let mut all: Vec<&[u8]> = Vec::with_capacity(chunks.len() + 2);
        all.push(self.domain.as_bytes());
        all.push(b":");
        all.extend_from_slice(chunks);
        self.function.digest(&all)
    }

    /// Hash raw bytes with domain separation.
    pub fn hash(&self, data: &[u8]) -> Digest {
        self.hash_chunks(&[data])
    }

    /// Hash a serializable value as JSON with domain separation.
    pub fn hash_json<T: serde::Serialize>(&self, value: &T) -> Result<Digest, HasherError> {
        let data =
            serde_json::to_vec(value).map_err(|e| HasherError::Serialization(e.to_string()))?;
        Ok(self.hash(&data))
    }

    /// Verify that data produces the expected digest.
    pub fn verify(&self, data: &[u8], expected: &Digest) -> bool {
        self.hash(data) == *expected
    }

    pub fn domain(&self) -> &str {
        self.domain
    }

    pub fn function_name(&self) -> &'static str {
        self.function.name()
    }
}

impl std::fmt::Debug for ContentHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentHasher")
            .field("domain", &self.domain)
            .field("function", &self.function.name())
            .finish()
    }
}

/// Errors from hashing operations.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum HasherError {
    #[error("serialization error: {0}")]
    Serialization(String),
}
