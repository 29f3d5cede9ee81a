//! Core trait for the FHE oracle.
//!
//! This module defines `FheOracle` - the store's only view of the
//! homomorphic-encryption engine. The store never holds plaintext for
//! encrypted fields; it asks the oracle to validate inputs, to mint
//! encrypted zeros, and to record who may later decrypt a handle.

use crate::types::{ExternalInput, FheWidth, Handle, InputProof, Principal};

/// Error types for oracle operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OracleError {
    /// Proof does not validate the input for this context
    #[error("Invalid input proof: {0}")]
    InvalidProof(String),

    /// Input was encrypted in a different bit-width domain
    #[error("Width mismatch: expected {expected}, got {actual}")]
    WidthMismatch { expected: FheWidth, actual: FheWidth },

    /// Handle is not known to the oracle
    #[error("Unknown handle: {0}")]
    UnknownHandle(String),

    /// Requester holds no decryption grant for the handle
    #[error("{principal} is not authorized to decrypt {handle}")]
    NotAuthorized { principal: Principal, handle: String },
}

/// Capability interface of the external FHE engine.
///
/// An oracle instance is bound to a single store identity (the contract
/// address in the source system); `authorize_self` grants to that identity.
/// All calls are synchronous and either succeed or fail outright.
pub trait FheOracle: Send + Sync {
    /// Identity that `authorize_self` grants decryption rights to.
    fn contract(&self) -> &Principal;

    /// Validate `proof` for `input` in the context of `caller` calling this
    /// store without importing anything.
    fn verify(
        &self,
        input: &ExternalInput,
        proof: &InputProof,
        width: FheWidth,
        caller: &Principal,
    ) -> Result<(), OracleError>;

    /// Validate `proof` for `input` in the context of `caller` calling this
    /// store, and import it as an internal handle in the `width` domain.
    fn verify_and_import(
        &self,
        input: &ExternalInput,
        proof: &InputProof,
        width: FheWidth,
        caller: &Principal,
    ) -> Result<Handle, OracleError>;

    /// Allow the bound store identity to use `handle`. Idempotent.
    fn authorize_self(&self, handle: &Handle);

    /// Allow `principal` to request decryption of `handle`. Idempotent.
    fn authorize_for(&self, handle: &Handle, principal: &Principal);

    /// Encrypted representation of zero in the `width` domain.
    fn encrypt_zero(&self, width: FheWidth) -> Handle;
}
