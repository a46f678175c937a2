//! Events surfaced to external observers of the ledger.

use serde::{Deserialize, Serialize};

use crate::types::*;

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Debug)]
pub enum LedgerEvent {
    Submitted { record_id: RecordId, timestamp: Timestamp },
    RevealRequested { record_id: RecordId, request_id: RequestId },
    Revealed { record_id: RecordId, request_id: RequestId },
    CountRevealRequested { category_hash: CategoryKey, request_id: RequestId },
    CountRevealed { category: String, count: u64, request_id: RequestId },
    RequestExpired { request_id: RequestId },
    RequestCancelled { request_id: RequestId },
}

impl LedgerEvent {
    /// Short stable name, used as the `event` field in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Submitted { .. } => "submitted",
            Self::RevealRequested { .. } => "reveal_requested",
            Self::Revealed { .. } => "revealed",
            Self::CountRevealRequested { .. } => "count_reveal_requested",
            Self::CountRevealed { .. } => "count_revealed",
            Self::RequestExpired { .. } => "request_expired",
            Self::RequestCancelled { .. } => "request_cancelled",
        }
    }
}
