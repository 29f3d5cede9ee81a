//! Goal Cipher - client-side encryption for goal descriptions
//!
//! Descriptions are sealed on the client before they reach the goal store,
//! which only ever sees opaque bytes.
//!
//! # Algorithms
//!
//! - **Key Derivation**: SHA-256 of the lower-cased owner identifier
//! - **Encryption**: ChaCha20-Poly1305 (authenticated encryption)
//! - **Nonce**: 12 random bytes from the OS CSPRNG, prepended to the blob
//!
//! # Threat model
//!
//! The key depends only on a public identifier (a wallet address). Anyone
//! who knows the address can derive it and read the description. The cipher
//! provides integrity and protection against accidental disclosure; it does
//! not provide confidentiality against someone who knows the identifier.
//! Real secrecy needs a key bound to a secret the store never sees, such as
//! a wallet signature, which is outside this crate.

pub mod cipher;
pub mod key;

pub use cipher::{
    decode_blob, decrypt, decrypt_bytes, encode_blob, encrypt, encrypt_bytes, CipherError,
    DescriptionCipher, AUTH_TAG_LEN, BLOB_PREFIX, NONCE_LEN,
};
pub use key::{canonical_identifier, derive_key, DescriptionKey, KEY_LEN};
