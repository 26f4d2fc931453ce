use std::sync::Arc;

use pil_types::{Digest, DocumentMetadata};

use crate::function::HashFunction;
use crate::hasher::{ContentHasher, HasherError};

/// Hash of a generated document bound to its metadata and chain predecessor.
///
/// The digest covers the content, the canonical JSON of the metadata, and the
/// previous record's hash, so rewriting any of the three is detectable.
#[derive(Clone, Debug)]
pub struct DocumentHasher {
    inner: ContentHasher,
}

impl DocumentHasher {
    pub fn new(function: Arc<dyn HashFunction>) -> Self {
        Self {
            inner: ContentHasher::with_function(ContentHasher::DOCUMENT_DOMAIN, function),
        }
    }

    pub fn hash(
        &self,
        content: &[u8],
        metadata: &DocumentMetadata,
        previous: Option<&Digest>,
    ) -> Result<Digest, HasherError> {
        let metadata_json =
            serde_json::to_vec(metadata).map_err(|e| HasherError::Serialization(e.to_string()))?;
        let content_len = (content.len() as u64).to_le_bytes();
        let metadata_len = (metadata_json.len() as u64).to_le_bytes();
        let previous_bytes: &[u8] = match previous {
            Some(digest) => digest.as_bytes(),
            None => &[],
        };
        let link_tag: &[u8] = if previous.is_some() { b"\x01" } else { b"\x00" };

        let chunks: [&[u8]; 6] = [
            &content_len[..],
            content,
            &metadata_len[..],
            metadata_json.as_slice(),
            link_tag,
            previous_bytes,
        ];
        Ok(self.inner.hash_chunks(&chunks))
    }

    pub fn function_name(&self) -> &'static str {
        self.inner.function_name()
    }
}

impl Default for DocumentHasher {
    fn default() -> Self {
        Self::new(Arc::new(crate::function::Blake3))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata(filename: &str) -> DocumentMetadata {
        DocumentMetadata {
            document_id: "doc-7".into(),
            document_type: "statement".into(),
            engine: "typst".into(),
            filename: filename.into(),
            extra: Some(serde_json::json!({"pages": 3})),
        }
    }

    #[test]
    fn deterministic() {
        let hasher = DocumentHasher::default();
        let a = hasher.hash(b"pdf-bytes", &metadata("a.pdf"), None).unwrap();
        let b = hasher.hash(b"pdf-bytes", &metadata("a.pdf"), None).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn content_metadata_and_link_are_all_bound() {
        let hasher = DocumentHasher::default();
        let base = hasher.hash(b"pdf-bytes", &metadata("a.pdf"), None).unwrap();
        let other_content = hasher.hash(b"pdf-bytez", &metadata("a.pdf"), None).unwrap();
        let other_meta = hasher.hash(b"pdf-bytes", &metadata("b.pdf"), None).unwrap();
        let linked = hasher
            .hash(b"pdf-bytes", &metadata("a.pdf"), Some(&Digest::from_bytes([0; 32])))
            .unwrap();

        assert_ne!(base, other_content);
        assert_ne!(base, other_meta);
        assert_ne!(base, linked);
    }
}
