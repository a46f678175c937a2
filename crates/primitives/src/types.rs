//! Core ledger types: identifiers, ciphertext handles, records, pending requests.

use serde::{Deserialize, Serialize};

/// Unix seconds as reported by the host clock.
pub type Timestamp = u64;

/// Record identifier assigned at submission. `0` means "no record".
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Debug, Default)]
#[serde(transparent)]
pub struct RecordId(pub u64);

impl RecordId {
    pub const NONE: RecordId = RecordId(0);
    pub const FIRST: RecordId = RecordId(1);

    /// Successor id, `None` on exhaustion.
    pub fn next(self) -> Option<RecordId> {
        self.0.checked_add(1).map(RecordId)
    }

    pub fn is_none(self) -> bool { self.0 == 0 }
}

impl core::fmt::Display for RecordId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Oracle-issued correlation token. `0` is the unused sentinel and never valid.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Debug, Default)]
#[serde(transparent)]
pub struct RequestId(pub u64);

impl RequestId {
    pub const UNUSED: RequestId = RequestId(0);

    pub fn is_unused(self) -> bool { self.0 == 0 }
}

impl core::fmt::Display for RequestId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque reference to an encrypted value. Never inspected by the ledger.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct CiphertextHandle(#[serde(with = "serde_bytes")] pub Vec<u8>);

impl CiphertextHandle {
    pub fn as_bytes(&self) -> &[u8] { &self.0 }
}

impl From<Vec<u8>> for CiphertextHandle {
    fn from(bytes: Vec<u8>) -> Self { CiphertextHandle(bytes) }
}

impl core::fmt::Display for CiphertextHandle {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", hex::encode(&self.0))
    }
}

impl core::fmt::Debug for CiphertextHandle {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "CiphertextHandle({})", hex::encode(&self.0))
    }
}

/// Oracle proof bytes, forwarded verbatim to the verification primitive.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct DecryptionProof(#[serde(with = "serde_bytes")] pub Vec<u8>);

impl DecryptionProof {
    pub fn as_bytes(&self) -> &[u8] { &self.0 }
}

impl core::fmt::Debug for DecryptionProof {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "DecryptionProof({} bytes)", self.0.len())
    }
}

/// 32-byte key derived from a category string (see `digest::derive_category_key`).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Debug, Default)]
pub struct CategoryKey(pub [u8; 32]);

impl core::fmt::Display for CategoryKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

/// A submitted encrypted record. Immutable once stored.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Debug)]
pub struct EncryptedRecord {
    pub record_id: RecordId,
    pub encrypted_value_a: CiphertextHandle,
    pub encrypted_value_b: CiphertextHandle,
    pub submitted_at: Timestamp,
}

impl EncryptedRecord {
    /// Handles in the order they are forwarded to the oracle.
    pub fn handles(&self) -> Vec<CiphertextHandle> {
        vec![self.encrypted_value_a.clone(), self.encrypted_value_b.clone()]
    }
}

/// Plaintext side of a record, written exactly once by the callback handler.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Debug, Default)]
pub struct RevealedRecord {
    pub revealed_score: String,
    pub revealed_comment: String,
    pub is_revealed: bool,
    pub revealed_at: Option<Timestamp>,
    pub revealed_by: Option<RequestId>,
}

impl RevealedRecord {
    pub fn unrevealed() -> Self { Self::default() }

    pub fn view(&self) -> RevealView {
        RevealView {
            score: self.revealed_score.clone(),
            comment: self.revealed_comment.clone(),
            is_revealed: self.is_revealed,
        }
    }
}

/// Read-side projection returned by `get_revealed`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Debug, Default)]
pub struct RevealView {
    pub score: String,
    pub comment: String,
    pub is_revealed: bool,
}

/// Lifecycle of a record, derived from the revealed flag and pending table.
#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Debug)]
pub enum RecordStatus {
    Submitted,
    RequestPending,
    Revealed,
}

/// What a pending decryption request resolves to.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Debug)]
pub enum RequestTarget {
    Record(RecordId),
    // Category string kept beside its key.
    Category { key: CategoryKey, category: String },
}

#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Debug)]
pub enum RequestStatus {
    Pending,
    Fulfilled,
    Expired,
    Cancelled,
}

/// Entry in the request tracker table.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Debug)]
pub struct PendingRequest {
    pub request_id: RequestId,
    pub target: RequestTarget,
    /// Ciphertexts forwarded to the oracle; proofs are checked against these.
    pub handles: Vec<CiphertextHandle>,
    pub issued_at: Timestamp,
    pub expires_at: Option<Timestamp>,
    pub status: RequestStatus,
}

impl PendingRequest {
    /// Whether a still-pending entry has outlived its deadline at `now`.
    pub fn is_overdue(&self, now: Timestamp) -> bool {
        self.status == RequestStatus::Pending && self.expires_at.map_or(false, |t| now >= t)
    }

    /// Pending and not overdue.
    pub fn is_live(&self, now: Timestamp) -> bool {
        self.status == RequestStatus::Pending && !self.is_overdue(now)
    }
}

/// Decrypted value as returned by the oracle.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Debug)]
pub enum Cleartext {
    U64(u64),
    Text(String),
}

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum PayloadError {
    #[error("expected {expected} cleartexts, got {got}")]
    Arity { expected: usize, got: usize },

    #[error("cleartext {index} has the wrong type")]
    Type { index: usize },

    #[error("undecodable cleartext list: {0}")]
    Malformed(String),
}

/// Plaintext pair delivered by a record callback.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Debug)]
pub struct RecordPlaintext {
    pub score: String,
    pub comment: String,
}

impl RecordPlaintext {
    pub fn new(score: impl Into<String>, comment: impl Into<String>) -> Self {
        Self { score: score.into(), comment: comment.into() }
    }

    /// Cleartexts in handle order (value a, value b).
    pub fn to_cleartexts(&self) -> Vec<Cleartext> {
        vec![Cleartext::Text(self.score.clone()), Cleartext::Text(self.comment.clone())]
    }

    pub fn from_cleartexts(values: &[Cleartext]) -> Result<Self, PayloadError> {
        if values.len() != 2 {
            return Err(PayloadError::Arity { expected: 2, got: values.len() });
        }
        let text = |i: usize| match &values[i] {
            Cleartext::Text(s) => Ok(s.clone()),
            Cleartext::U64(_) => Err(PayloadError::Type { index: i }),
        };
        Ok(Self { score: text(0)?, comment: text(1)? })
    }
}

/// Extract the single count from a count-reveal payload.
pub fn count_from_cleartexts(values: &[Cleartext]) -> Result<u64, PayloadError> {
    match values {
        [Cleartext::U64(n)] => Ok(*n),
        [_] => Err(PayloadError::Type { index: 0 }),
        _ => Err(PayloadError::Arity { expected: 1, got: values.len() }),
    }
}
