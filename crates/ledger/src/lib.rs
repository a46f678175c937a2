//! Encrypted-record submission and asynchronous-reveal ledger.
//!
//! A single authoritative store accepts opaque ciphertext pairs, tracks
//! decryption requests sent to an external oracle, writes the plaintext of a
//! record exactly once when a verified callback arrives, and keeps an
//! encrypted per-category counter over revealed values.
//!
//! The four components are `impl` blocks over disjoint parts of
//! [`LedgerState`]:
//! - `registry`: record submission and reads
//! - `tracker`: decryption request issuance, expiry and cancellation
//! - `callback`: oracle callback validation and the reveal write
//! - `counters`: encrypted per-category counts
//!
//! State-changing calls take `&mut self`, so they run one at a time and to
//! completion. A call that returns an error leaves the state untouched.

pub mod callback;
pub mod clock;
pub mod config;
pub mod counters;
pub mod error;
pub mod registry;
pub mod tracker;

use std::collections::BTreeMap;

use oracle::DecryptionOracle;
use primitives::{
    compute_state_digest, encode_bytes, encode_u32, encode_u64, CiphertextHandle, EncryptedRecord,
    LedgerEvent, PendingRequest, RecordId, RequestId, RevealedRecord,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::LedgerConfig;
pub use error::{LedgerError, LedgerResult};

/// Everything the ledger persists. Serializable for snapshots and replica audits.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerState {
    pub next_record_id: RecordId,
    pub records: BTreeMap<RecordId, EncryptedRecord>,
    pub revealed: BTreeMap<RecordId, RevealedRecord>,
    pub requests: BTreeMap<RequestId, PendingRequest>,
    /// Encrypted running count per revealed category.
    pub counters: BTreeMap<String, CiphertextHandle>,
    /// Distinct categories in first-seen order.
    pub categories: Vec<String>,
    /// Last count delivered by a verified count callback.
    pub revealed_counts: BTreeMap<String, u64>,
}

impl Default for LedgerState {
    fn default() -> Self {
        Self {
            next_record_id: RecordId::FIRST,
            records: BTreeMap::new(),
            revealed: BTreeMap::new(),
            requests: BTreeMap::new(),
            counters: BTreeMap::new(),
            categories: Vec::new(),
            revealed_counts: BTreeMap::new(),
        }
    }
}

impl LedgerState {
    /// Structural checks for a snapshot: the id counter is ahead of every
    /// stored record and each record has exactly one reveal slot.
    pub fn validate(&self) -> LedgerResult<()> {
        if self.next_record_id.is_none() {
            return Err(LedgerError::Config("next_record_id must be positive".into()));
        }
        if let Some(last) = self.records.keys().next_back() {
            if *last >= self.next_record_id {
                return Err(LedgerError::Config(format!(
                    "next_record_id {} does not follow stored record {}",
                    self.next_record_id, last
                )));
            }
        }
        if !self.records.keys().eq(self.revealed.keys()) {
            return Err(LedgerError::Config("records and reveal slots disagree".into()));
        }
        Ok(())
    }

    /// Deterministic encoding; map iteration order is the key order.
    pub fn to_canonical_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        encode_u64(self.next_record_id.0, &mut out);

        encode_u32(self.records.len() as u32, &mut out);
        for rec in self.records.values() {
            encode_bytes(&rec.to_canonical_bytes(), &mut out);
        }
        encode_u32(self.revealed.len() as u32, &mut out);
        for (id, rev) in &self.revealed {
            encode_u64(id.0, &mut out);
            encode_bytes(&rev.to_canonical_bytes(), &mut out);
        }
        encode_u32(self.requests.len() as u32, &mut out);
        for req in self.requests.values() {
            encode_bytes(&req.to_canonical_bytes(), &mut out);
        }
        encode_u32(self.counters.len() as u32, &mut out);
        for (cat, handle) in &self.counters {
            encode_bytes(cat.as_bytes(), &mut out);
            encode_bytes(handle.as_bytes(), &mut out);
        }
        encode_u32(self.categories.len() as u32, &mut out);
        for cat in &self.categories {
            encode_bytes(cat.as_bytes(), &mut out);
        }
        encode_u32(self.revealed_counts.len() as u32, &mut out);
        for (cat, n) in &self.revealed_counts {
            encode_bytes(cat.as_bytes(), &mut out);
            encode_u64(*n, &mut out);
        }
        out
    }
}

/// The store. Owns the injected oracle and clock.
pub struct Ledger<O, C = SystemClock> {
    config: LedgerConfig,
    state: LedgerState,
    oracle: O,
    clock: C,
    events: Vec<LedgerEvent>,
}

impl<O: DecryptionOracle, C: Clock> Ledger<O, C> {
    pub fn new(config: LedgerConfig, oracle: O, clock: C) -> LedgerResult<Self> {
        Self::from_state(config, LedgerState::default(), oracle, clock)
    }

    /// Resume from a snapshot. The oracle must know the snapshot's handles.
    pub fn from_state(
        config: LedgerConfig,
        state: LedgerState,
        oracle: O,
        clock: C,
    ) -> LedgerResult<Self> {
        config.validate()?;
        state.validate()?;
        Ok(Self { config, state, oracle, clock, events: Vec::new() })
    }

    pub fn config(&self) -> &LedgerConfig { &self.config }
    pub fn state(&self) -> &LedgerState { &self.state }
    pub fn oracle(&self) -> &O { &self.oracle }
    pub fn oracle_mut(&mut self) -> &mut O { &mut self.oracle }
    pub fn clock(&self) -> &C { &self.clock }

    /// Events emitted since construction or the last drain.
    pub fn events(&self) -> &[LedgerEvent] { &self.events }

    pub fn drain_events(&mut self) -> Vec<LedgerEvent> {
        std::mem::take(&mut self.events)
    }

    /// BLAKE2b digest of the canonical state; equal for replicas that applied
    /// the same calls.
    pub fn state_digest(&self) -> [u8; 32] {
        compute_state_digest(&self.state.to_canonical_bytes())
    }

    pub fn into_parts(self) -> (LedgerState, O, C) {
        (self.state, self.oracle, self.clock)
    }

    fn emit(&mut self, event: LedgerEvent) {
        debug!(event = event.name(), "ledger event");
        self.events.push(event);
    }
}

#[cfg(test)]
pub(crate) mod testutil {
    use super::*;
    use oracle::MockOracle;
    use primitives::{DecryptionProof, RecordPlaintext};

    pub const T0: u64 = 1_700_000_000;

    pub fn ledger() -> TestLedger {
        ledger_with(LedgerConfig::default())
    }

    pub fn ledger_with(config: LedgerConfig) -> TestLedger {
        let oracle = MockOracle::with_key([42u8; 32]).with_first_request_id(7);
        Ledger::new(config, oracle, ManualClock::new(T0)).unwrap()
    }

    pub type TestLedger = Ledger<MockOracle, ManualClock>;

    pub fn submit_text(l: &mut TestLedger, score: &str, comment: &str) -> RecordId {
        let a = l.oracle_mut().encrypt_text(score);
        let b = l.oracle_mut().encrypt_text(comment);
        l.submit(a, b).unwrap()
    }

    pub fn record_payload(l: &TestLedger, req: RequestId) -> (RecordPlaintext, DecryptionProof) {
        let (values, proof) = l.oracle().fulfill(req).unwrap();
        (RecordPlaintext::from_cleartexts(&values).unwrap(), proof)
    }

    /// Submit, request and reveal one record end to end.
    pub fn reveal(l: &mut TestLedger, score: &str, comment: &str) -> RecordId {
        let id = submit_text(l, score, comment);
        let req = l.request_reveal(id).unwrap();
        let (plain, proof) = record_payload(l, req);
        l.handle_record_callback(req, plain, &proof).unwrap();
        id
    }
}
