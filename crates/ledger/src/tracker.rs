//! Decryption request tracker: issues oracle requests and owns their lifecycle.
//!
//! Entries are never removed on failure paths. Expiry is recorded only by
//! [`Ledger::expire_requests`]; callbacks that find an overdue entry fail
//! without touching it.

use oracle::{DecryptionOracle, OracleError};
use primitives::{
    derive_category_key, CiphertextHandle, LedgerEvent, PendingRequest, RecordId, RequestId,
    RequestStatus, RequestTarget,
};
use tracing::{info, warn};

use crate::error::{LedgerError, LedgerResult};
use crate::{Clock, Ledger};

impl<O: DecryptionOracle, C: Clock> Ledger<O, C> {
    /// Ask the oracle to decrypt a record's two ciphertexts.
    ///
    /// May be called again while earlier requests are outstanding; the first
    /// verified callback wins.
    pub fn request_reveal(&mut self, record_id: RecordId) -> LedgerResult<RequestId> {
        let record = self.state.records.get(&record_id).ok_or(LedgerError::NotFound(record_id))?;
        if self.state.revealed.get(&record_id).map_or(false, |r| r.is_revealed) {
            return Err(LedgerError::AlreadyRevealed(record_id));
        }
        let handles = record.handles();
        let request_id = self.open_request(RequestTarget::Record(record_id), handles)?;

        info!(
            record_id = %record_id,
            request_id = %request_id,
            operation = "request_reveal",
            "reveal requested"
        );
        self.emit(LedgerEvent::RevealRequested { record_id, request_id });
        Ok(request_id)
    }

    /// Ask the oracle to decrypt the running count of `category`.
    pub fn request_category_count_reveal(&mut self, category: &str) -> LedgerResult<RequestId> {
        let count = self
            .state
            .counters
            .get(category)
            .cloned()
            .ok_or_else(|| LedgerError::CategoryNotFound(category.to_owned()))?;
        let key = derive_category_key(category);
        let target = RequestTarget::Category { key, category: category.to_owned() };
        let request_id = self.open_request(target, vec![count])?;

        info!(
            category_hash = %key,
            request_id = %request_id,
            operation = "request_count_reveal",
            "count reveal requested"
        );
        self.emit(LedgerEvent::CountRevealRequested { category_hash: key, request_id });
        Ok(request_id)
    }

    pub fn pending_request(&self, request_id: RequestId) -> Option<&PendingRequest> {
        self.state.requests.get(&request_id)
    }

    /// Requests still awaiting a callback and within their deadline.
    pub fn outstanding_requests(&self) -> Vec<&PendingRequest> {
        let now = self.clock.now();
        self.state.requests.values().filter(|r| r.is_live(now)).collect()
    }

    /// Mark every overdue pending request as expired. Returns the ids swept.
    pub fn expire_requests(&mut self) -> Vec<RequestId> {
        let now = self.clock.now();
        let overdue: Vec<RequestId> = self
            .state
            .requests
            .values()
            .filter(|r| r.is_overdue(now))
            .map(|r| r.request_id)
            .collect();
        for id in &overdue {
            if let Some(req) = self.state.requests.get_mut(id) {
                req.status = RequestStatus::Expired;
            }
            self.emit(LedgerEvent::RequestExpired { request_id: *id });
        }
        if !overdue.is_empty() {
            info!(count = overdue.len(), operation = "expire_requests", "expired overdue requests");
        }
        overdue
    }

    /// Withdraw a pending request; its callback will be refused.
    pub fn cancel_request(&mut self, request_id: RequestId) -> LedgerResult<()> {
        match self.state.requests.get_mut(&request_id) {
            Some(req) if req.status == RequestStatus::Pending => {
                req.status = RequestStatus::Cancelled;
            }
            _ => return Err(LedgerError::InvalidRequest(request_id)),
        }
        info!(request_id = %request_id, operation = "cancel_request", "request cancelled");
        self.emit(LedgerEvent::RequestCancelled { request_id });
        Ok(())
    }

    /// Forward handles to the oracle and register the returned id.
    fn open_request(
        &mut self,
        target: RequestTarget,
        handles: Vec<CiphertextHandle>,
    ) -> LedgerResult<RequestId> {
        let request_id = self.oracle.request_decryption(&handles)?;
        if request_id.is_unused() || self.state.requests.contains_key(&request_id) {
            warn!(request_id = %request_id, "oracle issued an unusable request id");
            return Err(OracleError::InvalidRequestId(request_id).into());
        }
        let issued_at = self.clock.now();
        self.state.requests.insert(
            request_id,
            PendingRequest {
                request_id,
                target,
                handles,
                issued_at,
                expires_at: self.config.deadline(issued_at),
                status: RequestStatus::Pending,
            },
        );
        Ok(request_id)
    }
}
