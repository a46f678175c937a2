//! Reveal callback handler: entry point for oracle responses.
//!
//! Order of checks for a record callback: request mapping, deadline, proof,
//! already-revealed, counter preparation. Only after all of them pass is
//! anything written.

use oracle::DecryptionOracle;
use primitives::{
    count_from_cleartexts, decode_cleartexts, encode_cleartexts, CiphertextHandle, Cleartext,
    DecryptionProof, LedgerEvent, PayloadError, PendingRequest, RecordPlaintext, RequestId,
    RequestStatus, RequestTarget, Timestamp,
};
use tracing::{info, warn};

use crate::error::{LedgerError, LedgerResult};
use crate::{Clock, Ledger};

impl<O: DecryptionOracle, C: Clock> Ledger<O, C> {
    /// Accept the decrypted `(score, comment)` of a record. Succeeds at most
    /// once per record; the revealed score is counted in its category.
    pub fn handle_record_callback(
        &mut self,
        request_id: RequestId,
        plaintext: RecordPlaintext,
        proof: &DecryptionProof,
    ) -> LedgerResult<()> {
        let now = self.clock.now();
        let entry = self.resolve_request(request_id, now)?;
        let record_id = match entry.target {
            RequestTarget::Record(id) => id,
            RequestTarget::Category { .. } => return Err(LedgerError::InvalidRequest(request_id)),
        };
        let handles = entry.handles.clone();
        self.verify_payload(request_id, &handles, &plaintext.to_cleartexts(), proof)?;

        let already = self
            .state
            .revealed
            .get(&record_id)
            .ok_or(LedgerError::NotFound(record_id))?
            .is_revealed;
        if already {
            warn!(record_id = %record_id, request_id = %request_id, "duplicate reveal rejected");
            return Err(LedgerError::AlreadyRevealed(record_id));
        }

        let update = self.prepare_increment(&plaintext.score)?;

        if let Some(rev) = self.state.revealed.get_mut(&record_id) {
            rev.revealed_score = plaintext.score;
            rev.revealed_comment = plaintext.comment;
            rev.is_revealed = true;
            rev.revealed_at = Some(now);
            rev.revealed_by = Some(request_id);
        }
        self.settle_request(request_id);
        info!(
            record_id = %record_id,
            request_id = %request_id,
            operation = "reveal",
            "record revealed"
        );
        self.emit(LedgerEvent::Revealed { record_id, request_id });
        self.apply_increment(update);
        Ok(())
    }

    /// Accept the decrypted count of a category. Surfaces the value as an
    /// event and a read; the counters themselves are untouched.
    pub fn handle_count_callback(
        &mut self,
        request_id: RequestId,
        plaintext_count: u64,
        proof: &DecryptionProof,
    ) -> LedgerResult<()> {
        let now = self.clock.now();
        let entry = self.resolve_request(request_id, now)?;
        if entry.status == RequestStatus::Fulfilled {
            return Err(LedgerError::InvalidRequest(request_id));
        }
        let category = match &entry.target {
            RequestTarget::Category { category, .. } => category.clone(),
            RequestTarget::Record(_) => return Err(LedgerError::InvalidRequest(request_id)),
        };
        let handles = entry.handles.clone();
        self.verify_payload(request_id, &handles, &[Cleartext::U64(plaintext_count)], proof)?;

        self.settle_request(request_id);
        self.state.revealed_counts.insert(category.clone(), plaintext_count);
        info!(
            request_id = %request_id,
            count = plaintext_count,
            operation = "count_reveal",
            "category count revealed"
        );
        self.emit(LedgerEvent::CountRevealed { category, count: plaintext_count, request_id });
        Ok(())
    }

    /// Untyped callback as delivered by an oracle relay: dispatch on the
    /// request's target and decode the cleartexts accordingly.
    pub fn handle_callback(
        &mut self,
        request_id: RequestId,
        cleartexts: &[Cleartext],
        proof: &DecryptionProof,
    ) -> LedgerResult<()> {
        let is_record = match self.state.requests.get(&request_id) {
            Some(entry) if !request_id.is_unused() => {
                matches!(entry.target, RequestTarget::Record(_))
            }
            _ => return Err(LedgerError::InvalidRequest(request_id)),
        };
        if is_record {
            let plaintext = RecordPlaintext::from_cleartexts(cleartexts)?;
            self.handle_record_callback(request_id, plaintext, proof)
        } else {
            let count = count_from_cleartexts(cleartexts)?;
            self.handle_count_callback(request_id, count, proof)
        }
    }

    /// Callback carrying the canonical cleartext encoding the proof signs,
    /// as a relay forwards it on the wire.
    pub fn handle_encoded_callback(
        &mut self,
        request_id: RequestId,
        encoded: &[u8],
        proof: &DecryptionProof,
    ) -> LedgerResult<()> {
        let cleartexts = decode_cleartexts(encoded)
            .map_err(|e| LedgerError::Payload(PayloadError::Malformed(e.to_string())))?;
        self.handle_callback(request_id, &cleartexts, proof)
    }

    /// Map a callback's request id to its entry, rejecting sentinel, unknown,
    /// cancelled and expired ones.
    fn resolve_request(
        &self,
        request_id: RequestId,
        now: Timestamp,
    ) -> LedgerResult<&PendingRequest> {
        if request_id.is_unused() {
            return Err(LedgerError::InvalidRequest(request_id));
        }
        let entry = self
            .state
            .requests
            .get(&request_id)
            .ok_or(LedgerError::InvalidRequest(request_id))?;
        match entry.status {
            RequestStatus::Cancelled => Err(LedgerError::InvalidRequest(request_id)),
            RequestStatus::Expired => Err(LedgerError::RequestExpired(request_id)),
            _ if entry.is_overdue(now) => Err(LedgerError::RequestExpired(request_id)),
            _ => Ok(entry),
        }
    }

    fn verify_payload(
        &self,
        request_id: RequestId,
        handles: &[CiphertextHandle],
        cleartexts: &[Cleartext],
        proof: &DecryptionProof,
    ) -> LedgerResult<()> {
        let encoded = encode_cleartexts(cleartexts);
        if !self.oracle.verify_proof(request_id, handles, &encoded, proof)? {
            warn!(request_id = %request_id, "decryption proof rejected");
            return Err(LedgerError::ProofInvalid(request_id));
        }
        Ok(())
    }

    fn settle_request(&mut self, request_id: RequestId) {
        if self.config.retain_fulfilled_requests {
            if let Some(req) = self.state.requests.get_mut(&request_id) {
                req.status = RequestStatus::Fulfilled;
            }
        } else {
            self.state.requests.remove(&request_id);
        }
    }
}
