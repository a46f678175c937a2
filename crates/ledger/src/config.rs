//! Ledger configuration.

use serde::{Deserialize, Serialize};

use crate::error::LedgerError;
use primitives::Timestamp;

/// Opinionated defaults.
pub mod params {
    /// Decryption requests left unanswered this long become eligible for expiry.
    pub const DEFAULT_REQUEST_TTL_SECS: u64 = 24 * 60 * 60;
    /// Keep fulfilled requests in the table as audit entries.
    pub const DEFAULT_RETAIN_FULFILLED: bool = true;
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LedgerConfig {
    /// Lifetime of a decryption request. `None` disables expiry.
    pub request_ttl_secs: Option<u64>,
    /// When false, fulfilled requests are dropped from the table, so replays
    /// of their callbacks fail as unmapped instead of as already revealed.
    pub retain_fulfilled_requests: bool,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            request_ttl_secs: Some(params::DEFAULT_REQUEST_TTL_SECS),
            retain_fulfilled_requests: params::DEFAULT_RETAIN_FULFILLED,
        }
    }
}

impl LedgerConfig {
    pub fn from_json(s: &str) -> Result<Self, LedgerError> {
        let cfg: Self = serde_json::from_str(s).map_err(|e| LedgerError::Config(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), LedgerError> {
        if self.request_ttl_secs == Some(0) {
            return Err(LedgerError::Config("request_ttl_secs must be positive".into()));
        }
        Ok(())
    }

    /// Expiry deadline for a request issued at `issued_at`.
    pub fn deadline(&self, issued_at: Timestamp) -> Option<Timestamp> {
        self.request_ttl_secs.map(|ttl| issued_at.saturating_add(ttl))
    }
}
