//! Content fingerprinting for the Intake Service's dedup check, §4.1 step 4.

use sha2::{Digest, Sha256};

/// Hex-encoded SHA-256 of `bytes`, the `content_hash` carried on `Document`.
pub fn content_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_stable_for_the_same_bytes() {
        let a = content_hash(b"hello world");
        let b = content_hash(b"hello world");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn hash_differs_for_different_bytes() {
        assert_ne!(content_hash(b"a"), content_hash(b"b"));
    }
}
