//! In-memory oracle: handles are keyed digests mapped to a plaintext table,
//! proofs are keyed BLAKE2b MACs over the proof message.

use std::collections::{BTreeMap, HashMap};

use blake2b_simd::Params as Blake2bParams;
use primitives::{
    encode_cleartexts, proof_message, CiphertextHandle, Cleartext, DecryptionProof, RequestId,
};
use rand_core::RngCore;
use subtle::ConstantTimeEq;
use tracing::debug;

use crate::{DecryptionOracle, OracleError};

const DS_HANDLE_V1: &[u8; 16] = b"oracle.handle.v1"; // exactly 16
const DS_SIGN_V1: &[u8; 16] = b"oracle.sign.v1\0\0"; // 14 + 2 = 16

pub struct MockOracle {
    signing_key: [u8; 32],
    plaintexts: HashMap<CiphertextHandle, Cleartext>,
    requests: BTreeMap<RequestId, Vec<CiphertextHandle>>,
    handle_counter: u64,
    next_request: u64,
    unavailable: bool,
}

impl MockOracle {
    pub fn new(rng: &mut impl RngCore) -> Self {
        let mut key = [0u8; 32];
        rng.fill_bytes(&mut key);
        Self::with_key(key)
    }

    pub fn with_key(signing_key: [u8; 32]) -> Self {
        Self {
            signing_key,
            plaintexts: HashMap::new(),
            requests: BTreeMap::new(),
            handle_counter: 0,
            next_request: 1,
            unavailable: false,
        }
    }

    /// Start issuing request ids at `first` (clamped to 1).
    pub fn with_first_request_id(mut self, first: u64) -> Self {
        self.next_request = first.max(1);
        self
    }

    /// Simulate an outage: every state-changing call fails with `Unavailable`.
    pub fn set_unavailable(&mut self, unavailable: bool) {
        self.unavailable = unavailable;
    }

    /// Client-side encryption of a text value.
    pub fn encrypt_text(&mut self, value: &str) -> CiphertextHandle {
        self.store(Cleartext::Text(value.to_owned()))
    }

    /// Decrypt a handle directly. Test and audit helper; the ledger never calls it.
    pub fn peek(&self, handle: &CiphertextHandle) -> Option<&Cleartext> {
        self.plaintexts.get(handle)
    }

    /// Handles forwarded for an issued request.
    pub fn request_handles(&self, request_id: RequestId) -> Option<&[CiphertextHandle]> {
        self.requests.get(&request_id).map(|v| v.as_slice())
    }

    /// Perform the off-ledger decryption of an issued request and sign it.
    pub fn fulfill(
        &self,
        request_id: RequestId,
    ) -> Result<(Vec<Cleartext>, DecryptionProof), OracleError> {
        let handles = self
            .requests
            .get(&request_id)
            .ok_or(OracleError::UnknownRequest(request_id))?;
        let mut values = Vec::with_capacity(handles.len());
        for h in handles {
            values.push(self.lookup(h)?.clone());
        }
        let proof = self.sign(request_id, handles, &encode_cleartexts(&values));
        Ok((values, proof))
    }

    /// Sign an arbitrary cleartext encoding for a request. Lets tests forge
    /// well-formed proofs over wrong payloads.
    pub fn sign(
        &self,
        request_id: RequestId,
        handles: &[CiphertextHandle],
        cleartexts: &[u8],
    ) -> DecryptionProof {
        let msg = proof_message(request_id, handles, cleartexts);
        let mac = Blake2bParams::new()
            .hash_length(32)
            .key(&self.signing_key)
            .personal(DS_SIGN_V1)
            .hash(&msg);
        DecryptionProof(mac.as_bytes().to_vec())
    }

    fn store(&mut self, value: Cleartext) -> CiphertextHandle {
        self.handle_counter += 1;
        let digest = Blake2bParams::new()
            .hash_length(32)
            .key(&self.signing_key)
            .personal(DS_HANDLE_V1)
            .hash(&self.handle_counter.to_be_bytes());
        let handle = CiphertextHandle(digest.as_bytes().to_vec());
        self.plaintexts.insert(handle.clone(), value);
        handle
    }

    fn lookup(&self, handle: &CiphertextHandle) -> Result<&Cleartext, OracleError> {
        self.plaintexts
            .get(handle)
            .ok_or_else(|| OracleError::UnknownHandle(handle.to_string()))
    }

    fn ensure_available(&self) -> Result<(), OracleError> {
        if self.unavailable { Err(OracleError::Unavailable) } else { Ok(()) }
    }
}

impl DecryptionOracle for MockOracle {
    fn encrypt_u64(&mut self, value: u64) -> Result<CiphertextHandle, OracleError> {
        self.ensure_available()?;
        Ok(self.store(Cleartext::U64(value)))
    }

    fn add_encrypted(
        &mut self,
        lhs: &CiphertextHandle,
        rhs: &CiphertextHandle,
    ) -> Result<CiphertextHandle, OracleError> {
        self.ensure_available()?;
        let sum = match (self.lookup(lhs)?, self.lookup(rhs)?) {
            (Cleartext::U64(a), Cleartext::U64(b)) => {
                a.checked_add(*b).ok_or(OracleError::Overflow)?
            }
            _ => return Err(OracleError::TypeMismatch),
        };
        Ok(self.store(Cleartext::U64(sum)))
    }

    fn request_decryption(
        &mut self,
        handles: &[CiphertextHandle],
    ) -> Result<RequestId, OracleError> {
        self.ensure_available()?;
        if handles.is_empty() { return Err(OracleError::EmptyRequest); }
        for h in handles { self.lookup(h)?; }
        let request_id = RequestId(self.next_request);
        self.next_request = self.next_request.checked_add(1).ok_or(OracleError::Overflow)?;
        self.requests.insert(request_id, handles.to_vec());
        debug!(request_id = %request_id, handles = handles.len(), "decryption request opened");
        Ok(request_id)
    }

    fn verify_proof(
        &self,
        request_id: RequestId,
        handles: &[CiphertextHandle],
        cleartexts: &[u8],
        proof: &DecryptionProof,
    ) -> Result<bool, OracleError> {
        let expected = self.sign(request_id, handles, cleartexts);
        if expected.0.len() != proof.0.len() { return Ok(false); }
        Ok(bool::from(expected.0.ct_eq(&proof.0)))
    }
}
