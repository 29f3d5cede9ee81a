//! Persisted form of the goal store.
//!
//! Only the record arena is written; the owner index is rebuilt on restore.

use serde::{Deserialize, Serialize};

use crate::types::{Goal, Principal};

/// Current snapshot format version.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Serializable copy of a store's records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreSnapshot {
    /// Format version
    pub version: u32,
    /// Store identity the handles were granted to
    pub contract: Principal,
    /// Records in id order
    pub goals: Vec<Goal>,
}

impl StoreSnapshot {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
