use oracle::OracleError;
use primitives::{PayloadError, RecordId, RequestId};
use thiserror::Error;

pub type LedgerResult<T> = Result<T, LedgerError>;

/// Every variant is terminal for the call that produced it; state is left unchanged.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("record not found: {0}")]
    NotFound(RecordId),

    #[error("record {0} is already revealed")]
    AlreadyRevealed(RecordId),

    #[error("request {0} is not mapped to a usable pending entry")]
    InvalidRequest(RequestId),

    #[error("proof rejected for request {0}")]
    ProofInvalid(RequestId),

    #[error("no counter for category {0:?}")]
    CategoryNotFound(String),

    #[error("request {0} has expired")]
    RequestExpired(RequestId),

    #[error("record identifier space exhausted")]
    IdentifierOverflow,

    #[error("record identifier {0} is already in use")]
    IdentifierInUse(RecordId),

    #[error("malformed callback payload: {0}")]
    Payload(#[from] PayloadError),

    #[error("oracle error: {0}")]
    Oracle(#[from] OracleError),

    #[error("configuration error: {0}")]
    Config(String),
}
