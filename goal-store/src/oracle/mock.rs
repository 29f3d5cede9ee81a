//! In-memory FHE oracle for testing and demos.
//!
//! Plaintexts are kept in the clear next to opaque handles, so nothing here
//! is confidential. What it does model faithfully is the bookkeeping the
//! store depends on: inputs bound to a (store, caller) pair, width checks,
//! fresh handles for encrypted zeros, and a decryption ACL.
//!
//! Every instance draws a random salt at construction, so two oracles never
//! mint the same handle bytes, even when both are bound to the same store.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};

use dashmap::DashMap;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};

use super::traits::{FheOracle, OracleError};
use crate::types::{
    EncryptedInput, ExternalInput, FheWidth, Handle, InputProof, Principal, HANDLE_LEN,
};

/// An input produced by `encrypt_input` and not necessarily imported yet.
#[derive(Debug, Clone, Copy)]
struct PendingInput {
    value: u64,
    width: FheWidth,
}

/// Salt length mixed into every handle this oracle mints
const SALT_LEN: usize = 16;

/// Mock oracle for testing.
///
/// Configurable proof rejection and call counting for unit tests.
pub struct MockOracle {
    contract: Principal,
    salt: [u8; SALT_LEN],
    inputs: DashMap<[u8; HANDLE_LEN], PendingInput>,
    ciphertexts: DashMap<[u8; HANDLE_LEN], u64>,
    acl: DashMap<[u8; HANDLE_LEN], HashSet<Principal>>,
    counter: AtomicU64,
    reject_all: AtomicBool,
    verify_calls: AtomicU32,
}

impl MockOracle {
    /// Create a mock oracle bound to the store identity `contract`.
    pub fn new(contract: Principal) -> Self {
        let mut salt = [0u8; SALT_LEN];
        OsRng.fill_bytes(&mut salt);

        Self {
            contract,
            salt,
            inputs: DashMap::new(),
            ciphertexts: DashMap::new(),
            acl: DashMap::new(),
            counter: AtomicU64::new(0),
            reject_all: AtomicBool::new(false),
            verify_calls: AtomicU32::new(0),
        }
    }

    /// Reject every proof presented to `verify_and_import`.
    pub fn with_reject_all(self, reject: bool) -> Self {
        self.reject_all.store(reject, Ordering::SeqCst);
        self
    }

    pub fn set_reject_all(&self, reject: bool) {
        self.reject_all.store(reject, Ordering::SeqCst);
    }

    /// Encrypt `value` on behalf of `caller`, as a wallet client would.
    ///
    /// The returned proof is only valid when `caller` presents it to the
    /// store this oracle is bound to. Values wider than `width` are
    /// truncated to the domain.
    pub fn encrypt_input(&self, value: u64, width: FheWidth, caller: &Principal) -> EncryptedInput {
        let seq = self.counter.fetch_add(1, Ordering::SeqCst);
        let id = digest(&[
            b"input",
            &self.salt,
            self.contract.as_str().as_bytes(),
            caller.as_str().as_bytes(),
            &seq.to_be_bytes(),
            &[width.tag()],
        ]);

        self.inputs.insert(
            id,
            PendingInput {
                value: value & width.max_value(),
                width,
            },
        );

        let handle = ExternalInput(id);
        let proof = self.proof_for(&handle, caller);
        EncryptedInput::new(handle, proof)
    }

    /// Decrypt `handle` for `requester`, honouring the ACL.
    pub fn decrypt(&self, handle: &Handle, requester: &Principal) -> Result<u64, OracleError> {
        if !self.is_authorized(handle, requester) {
            return Err(OracleError::NotAuthorized {
                principal: requester.clone(),
                handle: handle.to_string(),
            });
        }

        self.ciphertexts
            .get(handle.bytes())
            .map(|value| *value)
            .ok_or_else(|| OracleError::UnknownHandle(handle.to_string()))
    }

    /// Whether `principal` holds a grant on `handle`.
    pub fn is_authorized(&self, handle: &Handle, principal: &Principal) -> bool {
        self.acl
            .get(handle.bytes())
            .map(|grants| grants.contains(principal))
            .unwrap_or(false)
    }

    /// All principals holding a grant on `handle`, sorted.
    pub fn authorized_principals(&self, handle: &Handle) -> Vec<Principal> {
        let mut principals: Vec<Principal> = self
            .acl
            .get(handle.bytes())
            .map(|grants| grants.iter().cloned().collect())
            .unwrap_or_default();
        principals.sort();
        principals
    }

    /// Number of ciphertexts held, imported inputs and zeros alike.
    pub fn ciphertext_count(&self) -> usize {
        self.ciphertexts.len()
    }

    /// Number of proof checks, through `verify` or `verify_and_import`.
    pub fn verify_count(&self) -> u32 {
        self.verify_calls.load(Ordering::SeqCst)
    }

    pub fn reset_verify_count(&self) {
        self.verify_calls.store(0, Ordering::SeqCst);
    }

    /// Reject-all switch, input lookup, width and proof binding. Read-only.
    fn check(
        &self,
        input: &ExternalInput,
        proof: &InputProof,
        width: FheWidth,
        caller: &Principal,
    ) -> Result<PendingInput, OracleError> {
        if self.reject_all.load(Ordering::SeqCst) {
            return Err(OracleError::InvalidProof(
                "mock oracle rejects all proofs".to_string(),
            ));
        }

        let pending = self
            .inputs
            .get(&input.0)
            .map(|entry| *entry)
            .ok_or_else(|| OracleError::InvalidProof(format!("unknown input {input}")))?;

        if pending.width != width {
            return Err(OracleError::WidthMismatch {
                expected: width,
                actual: pending.width,
            });
        }

        if self.proof_for(input, caller) != *proof {
            return Err(OracleError::InvalidProof(format!(
                "proof for {input} is not bound to {caller} on {}",
                self.contract
            )));
        }

        Ok(pending)
    }

    fn proof_for(&self, input: &ExternalInput, caller: &Principal) -> InputProof {
        let bytes = digest(&[
            b"proof",
            &input.0,
            self.contract.as_str().as_bytes(),
            caller.as_str().as_bytes(),
        ]);
        InputProof(bytes.to_vec())
    }

    fn grant(&self, handle: &Handle, principal: &Principal) {
        self.acl
            .entry(*handle.bytes())
            .or_default()
            .insert(principal.clone());
    }
}

impl FheOracle for MockOracle {
    fn contract(&self) -> &Principal {
        &self.contract
    }

    fn verify(
        &self,
        input: &ExternalInput,
        proof: &InputProof,
        width: FheWidth,
        caller: &Principal,
    ) -> Result<(), OracleError> {
        self.verify_calls.fetch_add(1, Ordering::SeqCst);
        self.check(input, proof, width, caller).map(|_| ())
    }

    fn verify_and_import(
        &self,
        input: &ExternalInput,
        proof: &InputProof,
        width: FheWidth,
        caller: &Principal,
    ) -> Result<Handle, OracleError> {
        self.verify_calls.fetch_add(1, Ordering::SeqCst);
        let pending = self.check(input, proof, width, caller)?;

        // Importing the same input twice yields the same handle.
        let id = digest(&[b"imported", &input.0]);
        self.ciphertexts.insert(id, pending.value);
        Ok(Handle::new(id, width))
    }

    fn authorize_self(&self, handle: &Handle) {
        let contract = self.contract.clone();
        self.grant(handle, &contract);
    }

    fn authorize_for(&self, handle: &Handle, principal: &Principal) {
        self.grant(handle, principal);
    }

    fn encrypt_zero(&self, width: FheWidth) -> Handle {
        let seq = self.counter.fetch_add(1, Ordering::SeqCst);
        let id = digest(&[
            b"zero",
            &self.salt,
            self.contract.as_str().as_bytes(),
            &seq.to_be_bytes(),
            &[width.tag()],
        ]);
        self.ciphertexts.insert(id, 0);
        Handle::new(id, width)
    }
}

fn digest(parts: &[&[u8]]) -> [u8; HANDLE_LEN] {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update((part.len() as u64).to_be_bytes());
        hasher.update(part);
    }
    hasher.finalize().into()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn principal(s: &str) -> Principal {
        Principal::new(s).unwrap()
    }

    #[test]
    fn test_import_and_decrypt() {
        let oracle = MockOracle::new(principal("0xc0ffee"));
        let alice = principal("0xa11ce");

        let input = oracle.encrypt_input(42, FheWidth::U8, &alice);
        let handle = oracle
            .verify_and_import(&input.handle, &input.proof, FheWidth::U8, &alice)
            .unwrap();
        assert_eq!(handle.width(), FheWidth::U8);
        assert_eq!(oracle.verify_count(), 1);

        // No grant yet
        assert!(oracle.decrypt(&handle, &alice).is_err());

        oracle.authorize_for(&handle, &alice);
        assert_eq!(oracle.decrypt(&handle, &alice).unwrap(), 42);
    }

    #[test]
    fn test_proof_bound_to_caller() {
        let oracle = MockOracle::new(principal("0xc0ffee"));
        let alice = principal("0xa11ce");
        let bob = principal("0xb0b");

        let input = oracle.encrypt_input(7, FheWidth::U64, &alice);
        let result = oracle.verify_and_import(&input.handle, &input.proof, FheWidth::U64, &bob);
        assert!(matches!(result, Err(OracleError::InvalidProof(_))));
    }

    #[test]
    fn test_proof_bound_to_contract() {
        let oracle = MockOracle::new(principal("0xc0ffee"));
        let other = MockOracle::new(principal("0xdecaf"));
        let alice = principal("0xa11ce");

        let input = oracle.encrypt_input(7, FheWidth::U64, &alice);
        let result = other.verify_and_import(&input.handle, &input.proof, FheWidth::U64, &alice);
        assert!(result.is_err());
    }

    #[test]
    fn test_width_mismatch() {
        let oracle = MockOracle::new(principal("0xc0ffee"));
        let alice = principal("0xa11ce");

        let input = oracle.encrypt_input(7, FheWidth::U64, &alice);
        let result = oracle.verify_and_import(&input.handle, &input.proof, FheWidth::U8, &alice);
        assert_eq!(
            result,
            Err(OracleError::WidthMismatch {
                expected: FheWidth::U8,
                actual: FheWidth::U64,
            })
        );
    }

    #[test]
    fn test_truncates_to_domain() {
        let oracle = MockOracle::new(principal("0xc0ffee"));
        let alice = principal("0xa11ce");

        let input = oracle.encrypt_input(0x1ff, FheWidth::U8, &alice);
        let handle = oracle
            .verify_and_import(&input.handle, &input.proof, FheWidth::U8, &alice)
            .unwrap();
        oracle.authorize_for(&handle, &alice);
        assert_eq!(oracle.decrypt(&handle, &alice).unwrap(), 0xff);
    }

    #[test]
    fn test_encrypt_zero_is_fresh() {
        let oracle = MockOracle::new(principal("0xc0ffee"));
        let a = oracle.encrypt_zero(FheWidth::U8);
        let b = oracle.encrypt_zero(FheWidth::U8);
        assert_ne!(a, b);

        oracle.authorize_self(&a);
        assert_eq!(oracle.decrypt(&a, oracle.contract()).unwrap(), 0);
        assert_eq!(oracle.authorized_principals(&a), vec![principal("0xc0ffee")]);
    }

    #[test]
    fn test_reject_all() {
        let oracle = MockOracle::new(principal("0xc0ffee")).with_reject_all(true);
        let alice = principal("0xa11ce");

        let input = oracle.encrypt_input(1, FheWidth::U8, &alice);
        assert!(oracle
            .verify_and_import(&input.handle, &input.proof, FheWidth::U8, &alice)
            .is_err());

        oracle.set_reject_all(false);
        assert!(oracle
            .verify_and_import(&input.handle, &input.proof, FheWidth::U8, &alice)
            .is_ok());
        assert_eq!(oracle.verify_count(), 2);
    }

    #[test]
    fn test_verify_leaves_no_ciphertext() {
        let oracle = MockOracle::new(principal("0xc0ffee"));
        let alice = principal("0xa11ce");

        let input = oracle.encrypt_input(9, FheWidth::U8, &alice);
        oracle
            .verify(&input.handle, &input.proof, FheWidth::U8, &alice)
            .unwrap();
        assert_eq!(oracle.ciphertext_count(), 0);
        assert!(oracle
            .verify(&input.handle, &input.proof, FheWidth::U64, &alice)
            .is_err());
        assert_eq!(oracle.verify_count(), 2);
    }

    #[test]
    fn test_instances_mint_distinct_handles() {
        let first = MockOracle::new(principal("0xc0ffee"));
        let second = MockOracle::new(principal("0xc0ffee"));
        let alice = principal("0xa11ce");

        assert_ne!(first.encrypt_zero(FheWidth::U8), second.encrypt_zero(FheWidth::U8));
        assert_ne!(
            first.encrypt_input(1, FheWidth::U64, &alice).handle,
            second.encrypt_input(1, FheWidth::U64, &alice).handle
        );
    }

    #[test]
    fn test_grants_are_idempotent() {
        let oracle = MockOracle::new(principal("0xc0ffee"));
        let alice = principal("0xa11ce");
        let handle = oracle.encrypt_zero(FheWidth::U64);

        oracle.authorize_for(&handle, &alice);
        oracle.authorize_for(&handle, &alice);
        oracle.authorize_self(&handle);
        oracle.authorize_self(&handle);

        assert_eq!(oracle.authorized_principals(&handle).len(), 2);
    }
}
