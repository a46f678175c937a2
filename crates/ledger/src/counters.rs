//! Aggregate counter store: encrypted per-category counts.
//!
//! Increments are split into a fallible `prepare_increment`, which only talks
//! to the oracle, and an infallible `apply_increment`, so the callback handler
//! can finish every check before it writes anything.

use oracle::DecryptionOracle;
use primitives::{derive_category_key, CiphertextHandle};
use tracing::debug;

use crate::error::LedgerResult;
use crate::{Clock, Ledger};

/// Counter write computed ahead of commit.
pub(crate) struct CounterUpdate {
    category: String,
    count: CiphertextHandle,
    first_seen: bool,
}

impl<O: DecryptionOracle, C: Clock> Ledger<O, C> {
    /// Encrypted count for `category`, `None` if no record ever revealed to it.
    pub fn get_encrypted_count(&self, category: &str) -> Option<&CiphertextHandle> {
        self.state.counters.get(category)
    }

    /// Distinct categories in first-seen order.
    pub fn categories(&self) -> &[String] { &self.state.categories }

    /// Most recent count delivered by a verified count callback.
    pub fn last_revealed_count(&self, category: &str) -> Option<u64> {
        self.state.revealed_counts.get(category).copied()
    }

    /// Compute `count + 1` in the encrypted domain, starting from an encrypted
    /// zero for an unseen category. Writes nothing to the ledger.
    pub(crate) fn prepare_increment(&mut self, category: &str) -> LedgerResult<CounterUpdate> {
        let (current, first_seen) = match self.state.counters.get(category) {
            Some(h) => (h.clone(), false),
            None => (self.oracle.encrypt_u64(0)?, true),
        };
        let one = self.oracle.encrypt_u64(1)?;
        let count = self.oracle.add_encrypted(&current, &one)?;
        Ok(CounterUpdate { category: category.to_owned(), count, first_seen })
    }

    pub(crate) fn apply_increment(&mut self, update: CounterUpdate) {
        if update.first_seen {
            debug!(category_hash = %derive_category_key(&update.category), "counter initialized");
            self.state.categories.push(update.category.clone());
        }
        self.state.counters.insert(update.category, update.count);
    }
}

#[cfg(test)]
mod tests {
    use crate::testutil::*;
    use primitives::Cleartext;

    #[test]
    fn unseen_category_has_no_count() {
        let l = ledger();
        assert!(l.get_encrypted_count("Environment").is_none());
        assert!(l.categories().is_empty());
        assert_eq!(l.last_revealed_count("Environment"), None);
    }

    #[test]
    fn counts_accumulate_per_category() {
        let mut l = ledger();
        reveal(&mut l, "Environment", "Great");
        reveal(&mut l, "Transit", "Slow");
        reveal(&mut l, "Environment", "Fine");

        let env = l.get_encrypted_count("Environment").unwrap();
        let transit = l.get_encrypted_count("Transit").unwrap();
        assert_eq!(l.oracle().peek(env), Some(&Cleartext::U64(2)));
        assert_eq!(l.oracle().peek(transit), Some(&Cleartext::U64(1)));
        assert_eq!(l.categories(), &["Environment".to_string(), "Transit".to_string()]);
    }

    #[test]
    fn prepare_does_not_write() {
        let mut l = ledger();
        let before = l.state_digest();
        let update = l.prepare_increment("Environment").unwrap();
        assert_eq!(l.state_digest(), before);
        l.apply_increment(update);
        assert_eq!(l.categories().len(), 1);
        assert_ne!(l.state_digest(), before);
    }

    #[test]
    fn reads_are_pure() {
        let mut l = ledger();
        reveal(&mut l, "Environment", "Great");
        let a = l.get_encrypted_count("Environment").cloned();
        let b = l.get_encrypted_count("Environment").cloned();
        assert_eq!(a, b);
    }
}
