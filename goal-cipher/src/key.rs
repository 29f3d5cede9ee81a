//! Identity-bound key derivation.
//!
//! The description key is SHA-256 over the canonical (trimmed,
//! lower-cased) identifier. Nothing secret goes in, so anyone who knows the
//! identifier can derive the same key.

use std::fmt;

use sha2::{Digest, Sha256};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Symmetric key length (32 bytes)
pub const KEY_LEN: usize = 32;

/// A derived ChaCha20-Poly1305 key. Wiped from memory on drop.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct DescriptionKey([u8; KEY_LEN]);

impl DescriptionKey {
    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }

    /// Short hex tag identifying the key without printing it.
    pub fn fingerprint(&self) -> String {
        let digest = Sha256::digest(self.0);
        hex::encode(&digest[..8])
    }
}

impl fmt::Debug for DescriptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("DescriptionKey")
            .field(&self.fingerprint())
            .finish()
    }
}

/// Canonical form of an identifier: trimmed and lower-cased.
pub fn canonical_identifier(identifier: &str) -> String {
    identifier.trim().to_lowercase()
}

/// Derive the description key for `identifier`.
///
/// Deterministic: the same identifier, in any letter case, always yields
/// the same key.
pub fn derive_key(identifier: &str) -> DescriptionKey {
    let canonical = canonical_identifier(identifier);
    let digest = Sha256::digest(canonical.as_bytes());

    let mut key = [0u8; KEY_LEN];
    key.copy_from_slice(&digest);
    DescriptionKey(key)
}
