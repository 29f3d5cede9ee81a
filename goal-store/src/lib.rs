//! Goal Store - access-controlled encrypted goal records
//!
//! Each goal carries plaintext metadata (owner, title, timestamps, completion
//! flag) next to two kinds of ciphertext:
//! - FHE handles for deadline, priority, progress and completion time,
//!   validated and tracked by an external oracle
//! - a client-encrypted description blob the store treats as opaque bytes
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │              GoalStore                  │
//! │  (records, owner index, state machine)  │
//! └────────────────┬────────────────────────┘
//!                  │ verify_and_import / authorize / encrypt_zero
//!                  ▼
//!          ┌───────────────┐
//!          │   FheOracle   │
//!          │ (external or  │
//!          │  MockOracle)  │
//!          └───────────────┘
//! ```
//!
//! A goal is `Active` until its owner completes it; `Completed` is terminal.
//! The store never decrypts anything. Principals granted access ask the
//! oracle directly.

pub mod events;
pub mod oracle;
pub mod snapshot;
pub mod store;
pub mod types;

// Re-export main types for convenience
pub use events::GoalEvent;
pub use oracle::{FheOracle, MockOracle, OracleError};
pub use snapshot::StoreSnapshot;
pub use store::{GoalStore, NewGoal, StoreError};
pub use types::*;
