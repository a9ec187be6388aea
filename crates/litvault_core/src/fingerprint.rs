//! Content fingerprints used as the deduplication key.
//!
//! # Invariants
//! - Fingerprints are computed over converted plain text, trimmed, UTF-8 encoded.
//!   Switching to raw PDF bytes would break deduplication for existing stores.
//! - Output is 64 lowercase hex chars (SHA-256).

use sha2::{Digest, Sha256};
use std::error::Error;
use std::fmt::{Display, Formatter};

const HASH_HEX_LEN: usize = 64;

/// SHA-256 digest of a document's plain text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentHash(String);

impl ContentHash {
    /// Parses a persisted hex digest.
    pub fn from_hex(value: &str) -> Result<Self, InvalidContentHash> {
        let is_valid = value.len() == HASH_HEX_LEN
            && value
                .bytes()
                .all(|byte| byte.is_ascii_digit() || (b'a'..=b'f').contains(&byte));
        if !is_valid {
            return Err(InvalidContentHash(value.to_string()));
        }
        Ok(Self(value.to_string()))
    }

    /// Full 64-char hex digest.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First 12 hex chars, for log lines.
    pub fn short(&self) -> &str {
        &self.0[..12]
    }
}

impl Display for ContentHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidContentHash(pub String);

impl Display for InvalidContentHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid content hash `{}`", self.0)
    }
}

impl Error for InvalidContentHash {}

/// Fingerprints converted document text.
pub fn fingerprint_text(text: &str) -> ContentHash {
    let digest = Sha256::digest(text.trim().as_bytes());
    ContentHash(hex::encode(digest))
}

#[cfg(test)]
mod tests {
    use super::{fingerprint_text, ContentHash};

    #[test]
    fn identical_text_yields_identical_digest() {
        assert_eq!(
            fingerprint_text("Attention is all you need"),
            fingerprint_text("Attention is all you need")
        );
    }

    #[test]
    fn surrounding_whitespace_is_ignored() {
        assert_eq!(
            fingerprint_text("\n  body text \n"),
            fingerprint_text("body text")
        );
    }

    #[test]
    fn different_text_yields_different_digest() {
        assert_ne!(fingerprint_text("paper one"), fingerprint_text("paper two"));
    }

    #[test]
    fn digest_matches_known_sha256_vector() {
        assert_eq!(
            fingerprint_text("abc").as_str(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn from_hex_accepts_only_lowercase_sha256_digests() {
        let hash = fingerprint_text("abc");
        assert_eq!(ContentHash::from_hex(hash.as_str()).unwrap(), hash);
        assert!(ContentHash::from_hex("ABC").is_err());
        assert!(ContentHash::from_hex(&hash.as_str().to_uppercase()).is_err());
    }
}
