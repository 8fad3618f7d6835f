#![forbid(unsafe_code)]

//! One-way digest used to match secret sequences.
//!
//! The engine never stores the plaintext of a secret trigger, only the
//! SHA-256 of it. This raises the cost of reading secrets out of the shipped
//! bundle; it is not secrecy against anyone willing to brute-force the
//! verification endpoint.

use sha2::{Digest as _, Sha256};

/// Length of a digest in hex characters.
pub const DIGEST_HEX_LEN: usize = 64;

/// Fixed-length SHA-256 digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SequenceDigest([u8; 32]);

impl SequenceDigest {
    /// Digest an arbitrary string.
    #[must_use]
    pub fn of(input: &str) -> Self {
        Self(Sha256::digest(input.as_bytes()).into())
    }

    /// Digest the concatenation of `parts` without allocating the joined string.
    #[must_use]
    pub fn of_parts<'a>(parts: impl IntoIterator<Item = &'a str>) -> Self {
        let mut hasher = Sha256::new();
        for part in parts {
            hasher.update(part.as_bytes());
        }
        Self(hasher.finalize().into())
    }

    /// Parse a 64-character hex digest (either case).
    ///
    /// Returns `None` if the input has the wrong length or is not hex.
    #[must_use]
    pub fn from_hex(hex_digest: &str) -> Option<Self> {
        if hex_digest.len() != DIGEST_HEX_LEN {
            return None;
        }
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(hex_digest, &mut bytes).ok()?;
        Some(Self(bytes))
    }

    /// Lowercase hex rendering.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Raw digest bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl std::fmt::Display for SequenceDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Hex digest of `input`.
#[must_use]
pub fn digest_hex(input: &str) -> String {
    SequenceDigest::of(input).to_hex()
}
