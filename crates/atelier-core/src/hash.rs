//! Content hashing for generated asset payloads

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// A SHA-256 hash of an asset payload.
///
/// Used to give exported files stable, collision-resistant names and to spot
/// duplicate payloads within one batch.
#[derive(Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct ContentHash([u8; 32]);

impl ContentHash {
    /// Hash a payload
    pub fn of(data: &[u8]) -> Self {
        let digest = Sha256::digest(data);
        Self(digest.into())
    }

    /// Full lowercase hex
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{:02x}", b)).collect()
    }

    /// First 12 hex characters, enough for file names
    pub fn short(&self) -> String {
        self.to_hex()[..12].to_string()
    }

    /// Prefixed form (e.g., "sha256:abcdef...")
    pub fn to_prefixed_hex(&self) -> String {
        format!("sha256:{}", self.to_hex())
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash({})", self.short())
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.short())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_payload_same_hash() {
        assert_eq!(ContentHash::of(b"png bytes"), ContentHash::of(b"png bytes"));
        assert_ne!(ContentHash::of(b"png bytes"), ContentHash::of(b"jpeg bytes"));
    }

    #[test]
    fn test_hex_forms() {
        let h = ContentHash::of(b"hello");
        assert_eq!(h.to_hex().len(), 64);
        assert_eq!(h.short().len(), 12);
        assert!(h.to_hex().starts_with(&h.short()));
        assert_eq!(h.to_prefixed_hex(), format!("sha256:{}", h.to_hex()));
    }

    #[test]
    fn test_known_digest() {
        // sha256("abc")
        assert_eq!(
            ContentHash::of(b"abc").to_hex(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
