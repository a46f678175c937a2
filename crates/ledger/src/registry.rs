//! Ciphertext registry: record submission and record reads.

use oracle::DecryptionOracle;
use primitives::{
    CiphertextHandle, EncryptedRecord, LedgerEvent, RecordId, RecordStatus, RequestTarget,
    RevealView, RevealedRecord,
};
use tracing::info;

use crate::error::{LedgerError, LedgerResult};
use crate::{Clock, Ledger};

impl<O: DecryptionOracle, C: Clock> Ledger<O, C> {
    /// Store an encrypted pair and its unrevealed counterpart under a fresh id.
    pub fn submit(
        &mut self,
        encrypted_value_a: CiphertextHandle,
        encrypted_value_b: CiphertextHandle,
    ) -> LedgerResult<RecordId> {
        let record_id = self.state.next_record_id;
        let next = record_id.next().ok_or(LedgerError::IdentifierOverflow)?;
        let state = &self.state;
        if state.records.contains_key(&record_id) || state.revealed.contains_key(&record_id) {
            return Err(LedgerError::IdentifierInUse(record_id));
        }
        let submitted_at = self.clock.now();

        self.state.records.insert(
            record_id,
            EncryptedRecord { record_id, encrypted_value_a, encrypted_value_b, submitted_at },
        );
        self.state.revealed.insert(record_id, RevealedRecord::unrevealed());
        self.state.next_record_id = next;

        info!(record_id = %record_id, submitted_at, operation = "submit", "record submitted");
        self.emit(LedgerEvent::Submitted { record_id, timestamp: submitted_at });
        Ok(record_id)
    }

    pub fn get_record(&self, record_id: RecordId) -> LedgerResult<&EncryptedRecord> {
        self.state.records.get(&record_id).ok_or(LedgerError::NotFound(record_id))
    }

    /// `(score, comment, is_revealed)`; empty strings until revealed.
    pub fn get_revealed(&self, record_id: RecordId) -> LedgerResult<RevealView> {
        self.state
            .revealed
            .get(&record_id)
            .map(RevealedRecord::view)
            .ok_or(LedgerError::NotFound(record_id))
    }

    pub fn record_count(&self) -> usize { self.state.records.len() }

    /// All record ids, ascending.
    pub fn record_ids(&self) -> impl Iterator<Item = RecordId> + '_ {
        self.state.records.keys().copied()
    }

    pub fn record_status(&self, record_id: RecordId) -> LedgerResult<RecordStatus> {
        let revealed = self.state.revealed.get(&record_id).ok_or(LedgerError::NotFound(record_id))?;
        if revealed.is_revealed {
            return Ok(RecordStatus::Revealed);
        }
        let now = self.clock.now();
        let pending = self
            .state
            .requests
            .values()
            .any(|r| r.target == RequestTarget::Record(record_id) && r.is_live(now));
        Ok(if pending { RecordStatus::RequestPending } else { RecordStatus::Submitted })
    }
}

#[cfg(test)]
mod tests {
    use crate::testutil::*;
    use primitives::{LedgerEvent, RecordId, RecordStatus, RevealView};

    #[test]
    fn ids_start_at_one_and_increase() {
        let mut l = ledger();
        let a = submit_text(&mut l, "x", "y");
        let b = submit_text(&mut l, "x", "y");
        assert_eq!(a, RecordId(1));
        assert_eq!(b, RecordId(2));
        assert_eq!(l.record_count(), 2);
        assert_eq!(l.record_ids().collect::<Vec<_>>(), vec![RecordId(1), RecordId(2)]);
    }

    #[test]
    fn submission_stores_unrevealed_record_and_emits() {
        let mut l = ledger();
        l.clock().advance(30);
        let id = submit_text(&mut l, "Environment", "Great");
        let rec = l.get_record(id).unwrap();
        assert_eq!(rec.submitted_at, T0 + 30);
        assert_eq!(l.get_revealed(id).unwrap(), RevealView::default());
        assert_eq!(l.record_status(id).unwrap(), RecordStatus::Submitted);
        assert_eq!(l.events(), &[LedgerEvent::Submitted { record_id: id, timestamp: T0 + 30 }]);
    }

    #[test]
    fn unknown_record_is_not_found() {
        let l = ledger();
        assert_eq!(l.get_revealed(RecordId(1)), Err(crate::LedgerError::NotFound(RecordId(1))));
        assert!(l.get_record(RecordId::NONE).is_err());
        assert!(l.record_status(RecordId(9)).is_err());
    }

    #[test]
    fn exhausted_id_space_is_rejected_without_change() {
        let mut l = ledger();
        l.state.next_record_id = RecordId(u64::MAX);
        let before = l.state_digest();
        let a = l.oracle_mut().encrypt_text("a");
        let b = l.oracle_mut().encrypt_text("b");
        assert_eq!(l.submit(a, b), Err(crate::LedgerError::IdentifierOverflow));
        assert_eq!(l.state_digest(), before);
        assert!(l.events().is_empty());
    }

    #[test]
    fn occupied_id_is_never_overwritten() {
        let mut l = ledger();
        let id = reveal(&mut l, "Environment", "Great");
        l.state.next_record_id = id;
        let before = l.state_digest();
        let a = l.oracle_mut().encrypt_text("Transit");
        let b = l.oracle_mut().encrypt_text("Slow");
        assert_eq!(l.submit(a, b), Err(crate::LedgerError::IdentifierInUse(id)));
        assert_eq!(l.state_digest(), before);
        assert!(l.get_revealed(id).unwrap().is_revealed);
    }

    #[test]
    fn repeated_reads_agree() {
        let mut l = ledger();
        let hidden = submit_text(&mut l, "Transit", "Slow");
        let shown = reveal(&mut l, "Environment", "Great");
        for id in [hidden, shown] {
            let first = l.get_revealed(id).unwrap();
            assert_eq!(l.get_revealed(id).unwrap(), first);
            assert_eq!(l.record_status(id), l.record_status(id));
        }
        assert_eq!(l.get_revealed(hidden).unwrap(), RevealView::default());
        assert_eq!(l.get_revealed(RecordId(99)), l.get_revealed(RecordId(99)));
    }

    #[test]
    fn status_follows_lifecycle() {
        let mut l = ledger();
        let id = submit_text(&mut l, "Environment", "Great");
        let req = l.request_reveal(id).unwrap();
        assert_eq!(l.record_status(id).unwrap(), RecordStatus::RequestPending);
        let (plain, proof) = record_payload(&l, req);
        l.handle_record_callback(req, plain, &proof).unwrap();
        assert_eq!(l.record_status(id).unwrap(), RecordStatus::Revealed);
    }
}
