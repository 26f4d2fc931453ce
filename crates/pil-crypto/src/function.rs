use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sha2::Digest as _;

use pil_types::Digest;

/// A 256-bit cryptographic hash over a sequence of byte chunks.
///
/// Chunks are fed in order as one continuous message. Injected wherever a
/// digest is computed so tests and deployments can choose the function.
pub trait HashFunction: Send + Sync {
    fn name(&self) -> &'static str;

    fn digest(&self, chunks: &[&[u8]]) -> Digest;
}

/// BLAKE3, the default.
#[derive(Clone, Copy, Debug, Default)]
pub struct Blake3;

impl HashFunction for Blake3 {
    fn name(&self) -> &'static str {
        "blake3"
    }

    fn digest(&self, chunks: &[&[u8]]) -> Digest {
        let mut hasher = blake3::Hasher::new();
        for chunk in chunks {
            hasher.update(chunk);
        }
        Digest::from_bytes(*hasher.finalize().as_bytes())
    }
}

/// SHA-256, for byte-compatibility with SHA-256 based digests.
#[derive(Clone, Copy, Debug, Default)]
pub struct Sha256;

impl HashFunction for Sha256 {
    fn name(&self) -> &'static str {
        "sha256"
    }

    fn digest(&self, chunks: &[&[u8]]) -> Digest {
        let mut hasher = sha2::Sha256::new();
        for chunk in chunks {
            hasher.update(chunk);
        }
        Digest::from_bytes(hasher.finalize().into())
    }
}

/// Configurable selection of the hash function.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    #[default]
    Blake3,
    Sha256,
}

impl HashAlgorithm {
    pub fn function(self) -> Arc<dyn HashFunction> {
        match self {
            Self::Blake3 => Arc::new(Blake3),
            Self::Sha256 => Arc::new(Sha256),
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Blake3 => f.write_str("blake3"),
            Self::Sha256 => f.write_str("sha256"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunking_does_not_change_the_digest() {
        for function in [HashAlgorithm::Blake3.function(), HashAlgorithm::Sha256.function()] {
            let whole = function.digest(&[b"hello world"]);
            let split = function.digest(&[b"hello", b" ", b"world"]);
            assert_eq!(whole, split, "{}", function.name());
        }
    }

    #[test]
    fn sha256_matches_known_vector() {
        let digest = Sha256.digest(&[b"abc"]);
        assert_eq!(
            digest.to_hex(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn blake3_matches_library() {
        let digest = Blake3.digest(&[b"abc"]);
        assert_eq!(digest.as_bytes(), blake3::hash(b"abc").as_bytes());
    }

    #[test]
    fn algorithms_differ() {
        assert_ne!(Blake3.digest(&[b"x"]), Sha256.digest(&[b"x"]));
    }

    #[test]
    fn algorithm_config_names() {
        let parsed: HashAlgorithm = serde_json::from_str("\"sha256\"").unwrap();
        assert_eq!(parsed, HashAlgorithm::Sha256);
        assert_eq!(HashAlgorithm::default().to_string(), "blake3");
    }
}
