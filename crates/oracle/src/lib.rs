//! Decryption oracle capability for the reveal ledger.
//!
//! The ledger never performs cryptography itself. Everything it needs from
//! the encryption scheme goes through [`DecryptionOracle`]: producing
//! encrypted constants, adding ciphertexts in the encrypted domain, opening
//! asynchronous decryption requests and verifying the proofs that come back.
//!
//! Implementations:
//! - [`MockOracle`] (deterministic simulator for tests and local hosts)
//! - a threshold/KMS-backed service adapter (production, out of tree)

mod mock;

pub use mock::MockOracle;

use primitives::{CiphertextHandle, DecryptionProof, RequestId};

/// Port to the external encryption scheme and its decryption service.
pub trait DecryptionOracle {
    /// Encrypt a public constant (used for encrypted zero and one).
    fn encrypt_u64(&mut self, value: u64) -> Result<CiphertextHandle, OracleError>;

    /// Encrypted-domain addition. Neither operand is decrypted.
    fn add_encrypted(
        &mut self,
        lhs: &CiphertextHandle,
        rhs: &CiphertextHandle,
    ) -> Result<CiphertextHandle, OracleError>;

    /// Open an asynchronous decryption of `handles`. The returned id is echoed
    /// back on the matching callback and must never be `RequestId::UNUSED`.
    fn request_decryption(
        &mut self,
        handles: &[CiphertextHandle],
    ) -> Result<RequestId, OracleError>;

    /// Check that `proof` authenticates `cleartexts` (canonical encoding) as
    /// the decryption of `handles` under request `request_id`.
    fn verify_proof(
        &self,
        request_id: RequestId,
        handles: &[CiphertextHandle],
        cleartexts: &[u8],
        proof: &DecryptionProof,
    ) -> Result<bool, OracleError>;
}

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum OracleError {
    #[error("unknown ciphertext handle: {0}")]
    UnknownHandle(String),

    #[error("encrypted operands have incompatible types")]
    TypeMismatch,

    #[error("encrypted addition overflowed")]
    Overflow,

    #[error("decryption request with no ciphertexts")]
    EmptyRequest,

    #[error("unknown decryption request: {0}")]
    UnknownRequest(RequestId),

    #[error("oracle returned an invalid request id: {0}")]
    InvalidRequestId(RequestId),

    #[error("oracle service unavailable")]
    Unavailable,
}
