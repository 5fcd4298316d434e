//! Bloom signature pre-filtering (spec §4.4): a small per-document bit set
//! approximating which terms occur in it, checked before the more expensive
//! match-flag/filter chain runs.

/// Number of bits set per term in the signature. Matches the reference
/// builder's choice of a 3-bit Bloom filter per term (low false-positive
/// rate at the small (8-14 bit) field widths doctable layouts use).
const BITS_PER_TERM: u32 = 3;

fn fnv1a(term: &[u8], seed: u64) -> u64 {
    let mut hash = 0xcbf29ce484222325u64 ^ seed;
    for &b in term {
        hash ^= b as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}

/// Bloom signature contribution of one term, confined to `width_bits`.
/// Order-independent: the same term always sets the same bits regardless
/// of what else is being combined.
pub fn term_signature(term: &[u8], width_bits: u32) -> u64 {
    if width_bits == 0 {
        return 0;
    }
    let mut sig = 0u64;
    for k in 0..BITS_PER_TERM {
        let h = fnv1a(term, k as u64);
        let bit = h % width_bits as u64;
        sig |= 1u64 << bit;
    }
    sig
}

/// Signature for a whole query: the OR of each term's signature. OR is
/// commutative and idempotent, so this is independent of term order and of
/// duplicate terms (spec §4.4: "deterministic and order-independent").
pub fn query_signature<'a>(terms: impl IntoIterator<Item = &'a [u8]>, width_bits: u32) -> u64 {
    terms.into_iter().fold(0u64, |acc, t| acc | term_signature(t, width_bits))
}

/// A document can only contain every query term if every bit set in
/// `query_sig` is also set in `doc_sig`. A `false` result is a proof of
/// absence; a `true` result is merely "possibly present" (standard Bloom
/// filter semantics, no false negatives).
pub fn possibly_contains(query_sig: u64, doc_sig: u64) -> bool {
    (query_sig & !doc_sig) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_independent_across_term_permutations() {
        let a = query_signature([&b"red"[..], &b"car"[..]], 10);
        let b = query_signature([&b"car"[..], &b"red"[..]], 10);
        assert_eq!(a, b);
    }

    #[test]
    fn doc_missing_a_required_term_bit_is_rejected() {
        let query_sig = term_signature(b"unobtainium", 10);
        assert!(!possibly_contains(query_sig, 0));
    }

    #[test]
    fn full_width_doc_signature_always_matches() {
        let query_sig = query_signature([&b"red"[..], &b"car"[..], &b"door"[..]], 10);
        let all_bits = (1u64 << 10) - 1;
        assert!(possibly_contains(query_sig, all_bits));
    }
}
