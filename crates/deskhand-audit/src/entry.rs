//! Audit entry types.
//!
//! Every pipeline stage transition is recorded as an audit entry. Entries
//! are chain-linked: each carries the BLAKE3 hash of the entry before it, so
//! editing or removing a historical entry breaks the chain.

use deskhand_core::{CommandId, Timestamp};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use uuid::Uuid;

/// Unique identifier of an audit entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AuditEntryId(pub Uuid);

impl AuditEntryId {
    /// Generate a fresh identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for AuditEntryId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AuditEntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "audit:{}", self.0)
    }
}

/// A 32-byte BLAKE3 content hash, serialized as lowercase hex.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentHash([u8; 32]);

impl ContentHash {
    /// The all-zero hash, used as the genesis link.
    #[must_use]
    pub const fn zero() -> Self {
        Self([0u8; 32])
    }

    /// Hash arbitrary bytes.
    #[must_use]
    pub fn hash(data: &[u8]) -> Self {
        Self(*blake3::hash(data).as_bytes())
    }

    /// Whether this is the genesis hash.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    /// Raw bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Lowercase hex encoding.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse a 64-character hex string.
    ///
    /// # Errors
    ///
    /// Returns a description of the problem if the input is not valid hex of
    /// the right length.
    pub fn from_hex(s: &str) -> Result<Self, String> {
        let bytes = hex::decode(s).map_err(|e| e.to_string())?;
        let array: [u8; 32] = bytes
            .try_into()
            .map_err(|v: Vec<u8>| format!("expected 32 bytes, got {}", v.len()))?;
        Ok(Self(array))
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash({})", self.to_hex())
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for ContentHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ContentHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Pipeline stage an entry was recorded at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditStage {
    /// Raw text turned into a plan (or not).
    Interpret,
    /// Plan checked against the safety policy.
    Validate,
    /// Confirmation gate decision.
    Gate,
    /// One action executed.
    Execute,
}

impl AuditStage {
    /// Wire name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Interpret => "interpret",
            Self::Validate => "validate",
            Self::Gate => "gate",
            Self::Execute => "execute",
        }
    }
}

impl fmt::Display for AuditStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result tag of an audited stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditStatus {
    /// The stage completed normally.
    Succeeded,
    /// The stage failed.
    Failed,
    /// The action was not attempted.
    Skipped,
    /// The policy allowed the plan.
    Allowed,
    /// The policy denied the plan.
    Denied,
    /// The policy asked for confirmation.
    RequiresConfirmation,
    /// The user rejected the plan, or never answered.
    Rejected,
    /// The command was cancelled.
    Cancelled,
}

impl AuditStatus {
    /// Wire name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
            Self::Allowed => "allowed",
            Self::Denied => "denied",
            Self::RequiresConfirmation => "requires_confirmation",
            Self::Rejected => "rejected",
            Self::Cancelled => "cancelled",
        }
    }

    /// Whether this status means the stage went through.
    #[must_use]
    pub fn is_ok(self) -> bool {
        matches!(self, Self::Succeeded | Self::Allowed)
    }
}

impl fmt::Display for AuditStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single audit log entry. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Unique entry identifier.
    pub id: AuditEntryId,
    /// Position in the trail, starting at 0.
    pub sequence: u64,
    /// When this entry was created.
    pub timestamp: Timestamp,
    /// Command this entry belongs to.
    pub command_id: CommandId,
    /// Pipeline stage.
    pub stage: AuditStage,
    /// What went into the stage.
    pub input_summary: String,
    /// What came out of it.
    pub output_summary: String,
    /// Verdict or outcome tag.
    pub status: AuditStatus,
    /// Hash of the previous entry (chain linking).
    pub previous_hash: ContentHash,
}

impl AuditEntry {
    /// Build an entry linked to `previous_hash`.
    #[must_use]
    pub(crate) fn create(
        sequence: u64,
        command_id: CommandId,
        stage: AuditStage,
        input_summary: String,
        output_summary: String,
        status: AuditStatus,
        previous_hash: ContentHash,
    ) -> Self {
        Self {
            id: AuditEntryId::new(),
            sequence,
            timestamp: Timestamp::now(),
            command_id,
            stage,
            input_summary,
            output_summary,
            status,
            previous_hash,
        }
    }

    /// Bytes covered by the content hash.
    #[must_use]
    pub fn hashing_data(&self) -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(self.id.0.as_bytes());
        data.extend_from_slice(&self.sequence.to_le_bytes());
        push_str(
            &mut data,
            &self
                .timestamp
                .0
                .to_rfc3339_opts(chrono::SecondsFormat::Nanos, true),
        );
        data.extend_from_slice(self.command_id.0.as_bytes());
        push_str(&mut data, self.stage.as_str());
        push_str(&mut data, &self.input_summary);
        push_str(&mut data, &self.output_summary);
        push_str(&mut data, self.status.as_str());
        data.extend_from_slice(self.previous_hash.as_bytes());
        data
    }

    /// Compute the content hash of this entry.
    #[must_use]
    pub fn content_hash(&self) -> ContentHash {
        ContentHash::hash(&self.hashing_data())
    }

    /// Check if this entry follows another (chain linking).
    #[must_use]
    pub fn follows(&self, previous: &AuditEntry) -> bool {
        self.previous_hash == previous.content_hash()
    }
}

// Length-prefixed so adjacent fields cannot be shifted into each other.
fn push_str(data: &mut Vec<u8>, s: &str) {
    data.extend_from_slice(&(s.len() as u64).to_le_bytes());
    data.extend_from_slice(s.as_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(previous: ContentHash) -> AuditEntry {
        AuditEntry::create(
            0,
            CommandId::new(),
            AuditStage::Interpret,
            "open chrome.exe".to_string(),
            "1 action: open_app".to_string(),
            AuditStatus::Succeeded,
            previous,
        )
    }

    #[test]
    fn test_content_hash_is_stable() {
        let e = entry(ContentHash::zero());
        assert_eq!(e.content_hash(), e.content_hash());
    }

    #[test]
    fn test_hash_covers_summaries() {
        let e = entry(ContentHash::zero());
        let mut tampered = e.clone();
        tampered.output_summary = "0 actions".to_string();
        assert_ne!(e.content_hash(), tampered.content_hash());
    }

    #[test]
    fn test_follows() {
        let first = entry(ContentHash::zero());
        let second = entry(first.content_hash());
        assert!(second.follows(&first));
        assert!(!first.follows(&second));
    }

    #[test]
    fn test_hash_survives_json_round_trip() {
        let e = entry(ContentHash::hash(b"prev"));
        let json = serde_json::to_string(&e).unwrap();
        let parsed: AuditEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, e);
        assert_eq!(parsed.content_hash(), e.content_hash());
    }

    #[test]
    fn test_content_hash_hex() {
        let hash = ContentHash::hash(b"deskhand");
        assert_eq!(ContentHash::from_hex(&hash.to_hex()).unwrap(), hash);
        assert!(ContentHash::from_hex("abcd").is_err());
        assert!(ContentHash::zero().is_zero());
    }

    #[test]
    fn test_stage_and_status_wire_names() {
        assert_eq!(
            serde_json::to_string(&AuditStatus::RequiresConfirmation).unwrap(),
            "\"requires_confirmation\""
        );
        assert_eq!(AuditStage::Gate.to_string(), "gate");
        assert!(AuditStatus::Allowed.is_ok());
        assert!(!AuditStatus::Rejected.is_ok());
    }
}
