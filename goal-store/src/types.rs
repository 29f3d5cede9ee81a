//! Core types for the goal store.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

#[cfg(feature = "typescript")]
use ts_rs::TS;

/// Length in bytes of every FHE handle.
pub const HANDLE_LEN: usize = 32;

/// Error returned when a principal identifier cannot be canonicalized.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PrincipalError {
    /// Identifier was empty after trimming
    #[error("Principal identifier is empty")]
    Empty,

    /// Identifier contained whitespace inside it
    #[error("Principal identifier contains whitespace: {0:?}")]
    Whitespace(String),
}

/// Sequential identifier of a goal record.
///
/// Ids are dense: the first goal is `0`, the next `1`, and so on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(transparent)]
pub struct GoalId(pub u64);

impl GoalId {
    /// Position of this id in the record arena, if addressable on this platform.
    pub(crate) fn index(self) -> Option<usize> {
        usize::try_from(self.0).ok()
    }
}

impl fmt::Display for GoalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for GoalId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// Authenticated identity of a caller (e.g. a wallet address).
///
/// The canonical form is trimmed and lower-cased, so `0xABC` and `0xabc`
/// name the same principal.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(transparent)]
pub struct Principal(String);

impl Principal {
    /// Canonicalize an identifier into a principal.
    pub fn new(identifier: impl AsRef<str>) -> Result<Self, PrincipalError> {
        let trimmed = identifier.as_ref().trim();
        if trimmed.is_empty() {
            return Err(PrincipalError::Empty);
        }
        if trimmed.chars().any(char::is_whitespace) {
            return Err(PrincipalError::Whitespace(trimmed.to_string()));
        }
        Ok(Self(trimmed.to_lowercase()))
    }

    /// The canonical identifier string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Principal {
    type Err = PrincipalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl<'de> Deserialize<'de> for Principal {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Principal::new(raw).map_err(serde::de::Error::custom)
    }
}

/// Bit-width domain of an encrypted value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "lowercase")]
pub enum FheWidth {
    U8,
    U64,
}

impl FheWidth {
    /// Number of plaintext bits in this domain.
    pub fn bits(self) -> u32 {
        match self {
            FheWidth::U8 => 8,
            FheWidth::U64 => 64,
        }
    }

    /// Largest plaintext representable in this domain.
    pub fn max_value(self) -> u64 {
        match self {
            FheWidth::U8 => u8::MAX as u64,
            FheWidth::U64 => u64::MAX,
        }
    }

    /// Single-byte tag used when hashing handles.
    pub(crate) fn tag(self) -> u8 {
        match self {
            FheWidth::U8 => 0x08,
            FheWidth::U64 => 0x40,
        }
    }
}

impl fmt::Display for FheWidth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "euint{}", self.bits())
    }
}

/// Opaque reference to a value held by the FHE engine.
///
/// Only the oracle can interpret a handle. The store copies and
/// compares them but never looks inside.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Handle {
    #[serde(with = "hex_array")]
    bytes: [u8; HANDLE_LEN],
    width: FheWidth,
}

impl Handle {
    pub fn new(bytes: [u8; HANDLE_LEN], width: FheWidth) -> Self {
        Self { bytes, width }
    }

    pub fn bytes(&self) -> &[u8; HANDLE_LEN] {
        &self.bytes
    }

    pub fn width(&self) -> FheWidth {
        self.width
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.bytes))
    }
}

/// Client-produced handle to an encrypted input, not yet imported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExternalInput(#[serde(with = "hex_array")] pub [u8; HANDLE_LEN]);

impl fmt::Display for ExternalInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

/// Proof that an external input was validly produced for the calling context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InputProof(#[serde(with = "hex_vec")] pub Vec<u8>);

impl InputProof {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// An external input together with its validity proof.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedInput {
    pub handle: ExternalInput,
    pub proof: InputProof,
}

impl EncryptedInput {
    pub fn new(handle: ExternalInput, proof: InputProof) -> Self {
        Self { handle, proof }
    }
}

/// The encrypted fields of a goal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "snake_case")]
pub enum EncryptedField {
    Deadline,
    Priority,
    Progress,
    CompletedAt,
}

impl EncryptedField {
    /// Domain the field's plaintext lives in.
    pub fn width(self) -> FheWidth {
        match self {
            EncryptedField::Deadline | EncryptedField::CompletedAt => FheWidth::U64,
            EncryptedField::Priority | EncryptedField::Progress => FheWidth::U8,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EncryptedField::Deadline => "deadline",
            EncryptedField::Priority => "priority",
            EncryptedField::Progress => "progress",
            EncryptedField::CompletedAt => "completed_at",
        }
    }

    pub fn all() -> [EncryptedField; 4] {
        [
            EncryptedField::Deadline,
            EncryptedField::Priority,
            EncryptedField::Progress,
            EncryptedField::CompletedAt,
        ]
    }
}

impl fmt::Display for EncryptedField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle state of a goal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "snake_case")]
pub enum GoalState {
    /// Progress may still be updated
    Active,
    /// Terminal; encrypted fields are frozen
    Completed,
}

/// Caller identity and timestamp of a single transaction.
///
/// Supplied by whatever serializes calls into the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxContext {
    /// Authenticated sender
    pub caller: Principal,
    /// When the transaction was admitted
    pub timestamp: DateTime<Utc>,
}

impl TxContext {
    pub fn new(caller: Principal, timestamp: DateTime<Utc>) -> Self {
        Self { caller, timestamp }
    }

    /// Context stamped with the current wall-clock time.
    pub fn now(caller: Principal) -> Self {
        Self::new(caller, Utc::now())
    }
}

/// A goal record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Goal {
    /// Sequential id, equal to the record's position in the store
    pub id: GoalId,
    /// Principal that created the goal
    pub owner: Principal,
    /// Plaintext title
    pub title: String,
    /// Client-encrypted description blob
    #[serde(with = "hex_vec")]
    pub encrypted_description: Vec<u8>,
    /// Deadline (64-bit domain)
    pub encrypted_deadline: Handle,
    /// Priority (8-bit domain)
    pub encrypted_priority: Handle,
    /// Progress (8-bit domain), encrypted zero until first update
    pub encrypted_progress: Handle,
    /// Completion time (64-bit domain), encrypted zero until completion
    pub encrypted_completed_at: Handle,
    /// Whether the goal has been completed
    pub is_completed: bool,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl Goal {
    pub fn state(&self) -> GoalState {
        if self.is_completed {
            GoalState::Completed
        } else {
            GoalState::Active
        }
    }

    /// Handle currently stored in `field`.
    pub fn handle(&self, field: EncryptedField) -> Handle {
        match field {
            EncryptedField::Deadline => self.encrypted_deadline,
            EncryptedField::Priority => self.encrypted_priority,
            EncryptedField::Progress => self.encrypted_progress,
            EncryptedField::CompletedAt => self.encrypted_completed_at,
        }
    }

    pub fn meta(&self) -> GoalMeta {
        GoalMeta {
            owner: self.owner.clone(),
            title: self.title.clone(),
            created_at: self.created_at,
            is_completed: self.is_completed,
        }
    }
}

/// Public (plaintext) metadata of a goal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct GoalMeta {
    pub owner: Principal,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub is_completed: bool,
}

/// Serde helpers rendering byte arrays as `0x`-prefixed hex strings.
mod hex_array {
    use super::HANDLE_LEN;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8; HANDLE_LEN], s: S) -> Result<S::Ok, S::Error> {
        super::serialize_hex(bytes, s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<[u8; HANDLE_LEN], D::Error> {
        let raw = String::deserialize(d)?;
        let bytes = super::decode_hex(&raw).map_err(serde::de::Error::custom)?;
        <[u8; HANDLE_LEN]>::try_from(bytes.as_slice()).map_err(|_| {
            serde::de::Error::custom(format!(
                "expected {} bytes, got {}",
                HANDLE_LEN,
                bytes.len()
            ))
        })
    }
}

mod hex_vec {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
        super::serialize_hex(bytes, s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        let raw = String::deserialize(d)?;
        super::decode_hex(&raw).map_err(serde::de::Error::custom)
    }
}

fn serialize_hex<S: Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&format!("0x{}", hex::encode(bytes)))
}

fn decode_hex(raw: &str) -> Result<Vec<u8>, hex::FromHexError> {
    hex::decode(raw.strip_prefix("0x").unwrap_or(raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_principal_canonical_form() {
        let upper = Principal::new("  0xA11CE  ").unwrap();
        let lower = Principal::new("0xa11ce").unwrap();
        assert_eq!(upper, lower);
        assert_eq!(upper.as_str(), "0xa11ce");
    }

    #[test]
    fn test_principal_rejects_empty_and_inner_whitespace() {
        assert_eq!(Principal::new("   "), Err(PrincipalError::Empty));
        assert!(matches!(
            Principal::new("0xa b"),
            Err(PrincipalError::Whitespace(_))
        ));
    }

    #[test]
    fn test_principal_deserialize_canonicalizes() {
        let principal: Principal = serde_json::from_str("\"0xB0B\"").unwrap();
        assert_eq!(principal.as_str(), "0xb0b");
        assert!(serde_json::from_str::<Principal>("\"\"").is_err());
    }

    #[test]
    fn test_field_widths() {
        assert_eq!(EncryptedField::Deadline.width(), FheWidth::U64);
        assert_eq!(EncryptedField::CompletedAt.width(), FheWidth::U64);
        assert_eq!(EncryptedField::Priority.width(), FheWidth::U8);
        assert_eq!(EncryptedField::Progress.width(), FheWidth::U8);
        assert_eq!(FheWidth::U8.max_value(), 255);
        assert_eq!(FheWidth::U64.to_string(), "euint64");
    }

    #[test]
    fn test_handle_json_is_hex() {
        let handle = Handle::new([0xab; HANDLE_LEN], FheWidth::U8);
        let json = serde_json::to_value(handle).unwrap();
        let bytes = json["bytes"].as_str().unwrap();
        assert!(bytes.starts_with("0xabab"));
        assert_eq!(bytes.len(), 2 + HANDLE_LEN * 2);

        let parsed: Handle = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, handle);
    }

    #[test]
    fn test_handle_json_rejects_short_bytes() {
        let json = serde_json::json!({ "bytes": "0xabcd", "width": "u8" });
        assert!(serde_json::from_value::<Handle>(json).is_err());
    }
}
