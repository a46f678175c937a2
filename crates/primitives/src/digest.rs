//! Digest derivations for category keys, proof messages and ledger state.

use blake2b_simd::Params as Blake2bParams;

use crate::encode::{encode_handles, encode_u64};
use crate::types::*;

/// Domain separators for BLAKE2b-256 derivations.
const DS_CATEGORY_V1: &[u8; 16] = b"reveal.cat.v1\0\0\0"; // 13 + 3 = 16
const DS_PROOF_MSG_V1: &[u8; 16] = b"reveal.proof.v1\0"; // 15 + 1 = 16
const DS_STATE_V1: &[u8; 16] = b"reveal.state.v1\0"; // 15 + 1 = 16

fn blake2b_256(personal: &[u8; 16], input: &[u8]) -> [u8; 32] {
    let hash = Blake2bParams::new().hash_length(32).personal(personal).hash(input);
    let mut out = [0u8; 32];
    out.copy_from_slice(hash.as_bytes());
    out
}

/// Stable key for a category string. Observers match `CountRevealRequested`
/// events against this value.
pub fn derive_category_key(category: &str) -> CategoryKey {
    CategoryKey(blake2b_256(DS_CATEGORY_V1, category.as_bytes()))
}

/// Message an oracle proof authenticates: request id, the forwarded
/// ciphertexts, and the canonical cleartext encoding.
pub fn proof_message(
    request_id: RequestId,
    handles: &[CiphertextHandle],
    encoded_cleartexts: &[u8],
) -> [u8; 32] {
    let mut buf = Vec::with_capacity(8 + 4 + handles.len() * 40 + encoded_cleartexts.len());
    encode_u64(request_id.0, &mut buf);
    encode_handles(handles, &mut buf);
    buf.extend_from_slice(encoded_cleartexts);
    blake2b_256(DS_PROOF_MSG_V1, &buf)
}

/// Digest over an already canonicalised state encoding.
pub fn compute_state_digest(canonical_state: &[u8]) -> [u8; 32] {
    blake2b_256(DS_STATE_V1, canonical_state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_key_is_stable_and_distinct() {
        assert_eq!(derive_category_key("Environment"), derive_category_key("Environment"));
        assert_ne!(derive_category_key("Environment"), derive_category_key("environment"));
        assert_ne!(derive_category_key(""), CategoryKey::default());
    }

    #[test]
    fn proof_message_binds_every_input() {
        let h = vec![CiphertextHandle(vec![1]), CiphertextHandle(vec![2])];
        let base = proof_message(RequestId(7), &h, b"x");
        assert_ne!(base, proof_message(RequestId(8), &h, b"x"));
        assert_ne!(base, proof_message(RequestId(7), &h[..1], b"x"));
        assert_ne!(base, proof_message(RequestId(7), &h, b"y"));
    }
}
