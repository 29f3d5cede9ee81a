//! Authenticated encryption of description text.
//!
//! # Blob format
//!
//! ```text
//! "0x" ‖ hex( nonce[12] ‖ ciphertext ‖ tag[16] )
//! ```
//!
//! A fresh random nonce is drawn for every call, so encrypting the same text
//! twice gives different blobs. Decryption only ever returns plaintext whose
//! Poly1305 tag verified.

use chacha20poly1305::{aead::Aead, ChaCha20Poly1305, Key, KeyInit, Nonce};
use rand::rngs::OsRng;
use rand::RngCore;

use crate::key::{derive_key, DescriptionKey};

/// Nonce length for ChaCha20-Poly1305 (12 bytes)
pub const NONCE_LEN: usize = 12;

/// ChaCha20-Poly1305 auth tag length (16 bytes)
pub const AUTH_TAG_LEN: usize = 16;

/// Prefix marking a hex string as a byte blob.
pub const BLOB_PREFIX: &str = "0x";

/// Error types for description encryption.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CipherError {
    /// Blob could not be authenticated and decrypted
    #[error("Decryption failed: {0}")]
    DecryptionFailed(String),

    /// Plaintext could not be sealed
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),
}

/// Cipher bound to one derived key.
///
/// Useful when encrypting or decrypting several descriptions for the same
/// identity without re-deriving the key each time.
#[derive(Debug, Clone)]
pub struct DescriptionCipher {
    key: DescriptionKey,
}

impl DescriptionCipher {
    pub fn new(key: DescriptionKey) -> Self {
        Self { key }
    }

    /// Cipher keyed from a public identifier.
    pub fn for_identifier(identifier: &str) -> Self {
        Self::new(derive_key(identifier))
    }

    pub fn key(&self) -> &DescriptionKey {
        &self.key
    }

    /// Encrypt raw bytes into `nonce ‖ ciphertext ‖ tag`.
    pub fn seal(&self, plaintext: &[u8]) -> Result<Vec<u8>, CipherError> {
        let nonce = generate_nonce();
        let cipher = ChaCha20Poly1305::new(Key::from_slice(self.key.as_bytes()));
        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&nonce), plaintext)
            .map_err(|e| CipherError::EncryptionFailed(e.to_string()))?;

        let mut blob = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        blob.extend_from_slice(&nonce);
        blob.extend_from_slice(&ciphertext);
        Ok(blob)
    }

    /// Authenticate and decrypt a `nonce ‖ ciphertext ‖ tag` blob.
    pub fn open(&self, blob: &[u8]) -> Result<Vec<u8>, CipherError> {
        if blob.len() < NONCE_LEN + AUTH_TAG_LEN {
            return Err(CipherError::DecryptionFailed(format!(
                "blob is {} bytes, need at least {}",
                blob.len(),
                NONCE_LEN + AUTH_TAG_LEN
            )));
        }

        let (nonce, ciphertext) = blob.split_at(NONCE_LEN);
        let cipher = ChaCha20Poly1305::new(Key::from_slice(self.key.as_bytes()));
        cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| {
                CipherError::DecryptionFailed("authentication failed (wrong key or tampered blob)".into())
            })
    }

    /// Encrypt text into a `0x`-prefixed hex blob.
    pub fn encrypt(&self, plaintext: &str) -> Result<String, CipherError> {
        self.seal(plaintext.as_bytes()).map(|blob| encode_blob(&blob))
    }

    /// Decrypt a hex blob produced by `encrypt`.
    pub fn decrypt(&self, blob: &str) -> Result<String, CipherError> {
        let bytes = decode_blob(blob)?;
        let plaintext = self.open(&bytes)?;
        String::from_utf8(plaintext)
            .map_err(|_| CipherError::DecryptionFailed("plaintext is not valid UTF-8".into()))
    }
}

/// Encrypt `plaintext` under the key derived from `identifier`.
pub fn encrypt(plaintext: &str, identifier: &str) -> Result<String, CipherError> {
    DescriptionCipher::for_identifier(identifier).encrypt(plaintext)
}

/// Decrypt a blob produced by [`encrypt`] for the same identifier.
pub fn decrypt(blob: &str, identifier: &str) -> Result<String, CipherError> {
    DescriptionCipher::for_identifier(identifier).decrypt(blob)
}

/// Byte-level [`encrypt`], returning the raw blob.
pub fn encrypt_bytes(plaintext: &[u8], identifier: &str) -> Result<Vec<u8>, CipherError> {
    DescriptionCipher::for_identifier(identifier).seal(plaintext)
}

/// Byte-level [`decrypt`].
pub fn decrypt_bytes(blob: &[u8], identifier: &str) -> Result<Vec<u8>, CipherError> {
    DescriptionCipher::for_identifier(identifier).open(blob)
}

/// Render a raw blob as `0x`-prefixed hex.
pub fn encode_blob(bytes: &[u8]) -> String {
    format!("{BLOB_PREFIX}{}", hex::encode(bytes))
}

/// Parse a hex blob, with or without the `0x` prefix.
pub fn decode_blob(blob: &str) -> Result<Vec<u8>, CipherError> {
    let trimmed = blob.trim();
    let digits = trimmed
        .strip_prefix(BLOB_PREFIX)
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    hex::decode(digits).map_err(|e| CipherError::DecryptionFailed(format!("malformed blob: {e}")))
}

fn generate_nonce() -> [u8; NONCE_LEN] {
    let mut nonce = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce);
    nonce
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALICE: &str = "0xA11CE00000000000000000000000000000000001";
    const BOB: &str = "0xB0B0000000000000000000000000000000000002";

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        for plaintext in ["", "Read 12 books this year", "Läuft 🏃 5km"] {
            let blob = encrypt(plaintext, ALICE).unwrap();
            assert!(blob.starts_with("0x"));
            assert_eq!(decrypt(&blob, ALICE).unwrap(), plaintext);
        }
    }

    #[test]
    fn test_blob_layout() {
        let plaintext = "twelve chars";
        let blob = encrypt_bytes(plaintext.as_bytes(), ALICE).unwrap();
        assert_eq!(blob.len(), NONCE_LEN + plaintext.len() + AUTH_TAG_LEN);

        let hex_blob = encode_blob(&blob);
        assert_eq!(hex_blob.len(), 2 + blob.len() * 2);
        assert_eq!(decode_blob(&hex_blob).unwrap(), blob);
    }

    #[test]
    fn test_nonce_is_fresh_per_call() {
        let a = encrypt("same text", ALICE).unwrap();
        let b = encrypt("same text", ALICE).unwrap();
        assert_ne!(a, b);
        assert_ne!(a[2..2 + NONCE_LEN * 2], b[2..2 + NONCE_LEN * 2]);
    }

    #[test]
    fn test_identifier_case_does_not_matter() {
        let blob = encrypt("hello", ALICE).unwrap();
        assert_eq!(decrypt(&blob, &ALICE.to_lowercase()).unwrap(), "hello");
    }

    #[test]
    fn test_tampering_any_byte_fails() {
        let blob = encrypt_bytes(b"do not touch", ALICE).unwrap();

        for i in 0..blob.len() {
            let mut tampered = blob.clone();
            tampered[i] ^= 0x01;
            let result = decrypt(&encode_blob(&tampered), ALICE);
            assert!(
                matches!(result, Err(CipherError::DecryptionFailed(_))),
                "byte {i} flipped but decryption did not fail"
            );
        }
    }

    #[test]
    fn test_wrong_identity_fails() {
        let blob = encrypt("private", ALICE).unwrap();
        assert!(matches!(
            decrypt(&blob, BOB),
            Err(CipherError::DecryptionFailed(_))
        ));
    }

    #[test]
    fn test_truncated_and_malformed_fail() {
        let blob = encrypt("short", ALICE).unwrap();

        let truncated = &blob[..blob.len() - 2];
        assert!(matches!(
            decrypt(truncated, ALICE),
            Err(CipherError::DecryptionFailed(_))
        ));

        let tiny = encode_blob(&[0u8; NONCE_LEN + AUTH_TAG_LEN - 1]);
        assert!(matches!(
            decrypt(&tiny, ALICE),
            Err(CipherError::DecryptionFailed(_))
        ));

        assert!(matches!(
            decrypt("0xnot-hex", ALICE),
            Err(CipherError::DecryptionFailed(_))
        ));
    }

    #[test]
    fn test_prefix_is_optional_on_decrypt() {
        let blob = encrypt("bare", ALICE).unwrap();
        let bare = blob.trim_start_matches("0x");
        assert_eq!(decrypt(bare, ALICE).unwrap(), "bare");
    }

    #[test]
    fn test_non_utf8_plaintext_rejected_by_text_api() {
        let blob = encrypt_bytes(&[0xff, 0xfe, 0xfd], ALICE).unwrap();
        assert_eq!(decrypt_bytes(&blob, ALICE).unwrap(), vec![0xff, 0xfe, 0xfd]);
        assert!(matches!(
            decrypt(&encode_blob(&blob), ALICE),
            Err(CipherError::DecryptionFailed(_))
        ));
    }

    #[test]
    fn test_reusable_cipher() {
        let cipher = DescriptionCipher::for_identifier(ALICE);
        let blobs: Vec<String> = ["one", "two", "three"]
            .iter()
            .map(|text| cipher.encrypt(text).unwrap())
            .collect();

        for (blob, text) in blobs.iter().zip(["one", "two", "three"]) {
            assert_eq!(decrypt(blob, ALICE).unwrap(), text);
        }
    }

    /// The key is a function of the public identifier alone. Anyone who knows
    /// the address can read the description; the scheme protects integrity
    /// and guards against accidental disclosure, not against that adversary.
    #[test]
    fn test_identifier_holder_can_decrypt() {
        let blob = encrypt("visible to anyone who knows the address", ALICE).unwrap();

        let observer = DescriptionCipher::new(crate::key::derive_key(ALICE));
        assert_eq!(
            observer.decrypt(&blob).unwrap(),
            "visible to anyone who knows the address"
        );
    }
}
