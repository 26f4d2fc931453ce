use std::sync::Arc;

use pil_types::{ConversionId, Digest};

use crate::function::HashFunction;
use crate::hasher::ContentHasher;

/// Digest over an ordered sequence of conversion identifiers.
///
/// The order is significant and is never normalised here; callers hash the
/// ids in the order the source query returned them. Each id is length
/// prefixed and the sequence is count prefixed, so `["ab","c"]` and
/// `["a","bc"]` hash differently and the empty sequence has a well-defined
/// digest.
#[derive(Clone, Debug)]
pub struct SnapshotHasher {
    inner: ContentHasher,
}

impl SnapshotHasher {
    pub fn new(function: Arc<dyn HashFunction>) -> Self {
        Self {
            inner: ContentHasher::with_function(ContentHasher::SNAPSHOT_DOMAIN, function),
        }
    }

    pub fn hash(&self, ids: &[ConversionId]) -> Digest {
        let count = (ids.len() as u64).to_le_bytes();
        let lengths: Vec<[u8; 8]> = ids
            .iter()
            .map(|id| (id.as_str().len() as u64).to_le_bytes())
            .collect();

        let mut chunks: Vec<&[u8]> = Vec::with_capacity(1 + ids.len() * 2);
        chunks.push(&count);
        for (id, len) in ids.iter().zip(&lengths) {
            chunks.push(len);
            chunks.push(id.as_str().as_bytes());
        }
        self.inner.hash_chunks(&chunks)
    }

    /// Recompute and compare.
    pub fn verify(&self, ids: &[ConversionId], expected: &Digest) -> bool {
        self.hash(ids) == *expected
    }

    pub fn function_name(&self) -> &'static str {
        self.inner.function_name()
    }
}

impl Default for SnapshotHasher {
    fn default() -> Self {
        Self::new(Arc::new(crate::function::Blake3))
    }
}
