//! FHE oracle abstraction layer.
//!
//! The store depends on the homomorphic-encryption engine only through
//! the `FheOracle` trait:
//! - proof verification and import of client inputs
//! - decryption grants (ACL bookkeeping)
//! - encrypted zeros for initial values
//!
//! `MockOracle` is a deterministic in-memory implementation for tests.

pub mod mock;
pub mod traits;

pub use mock::MockOracle;
pub use traits::{FheOracle, OracleError};
