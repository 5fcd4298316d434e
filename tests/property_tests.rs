//! Property-based tests for the quantified invariants spread across the
//! index encoders and the ranker: round-tripping of the packed/encoded
//! on-disk formats, and the order-independence/boundedness properties the
//! Bloom signature and classifier formulas are supposed to hold for any
//! input, not just the examples in their inline unit tests.

use proptest::prelude::*;

use qbasher_core::candidate::bloom::{query_signature, term_signature};
use qbasher_core::index::doctable::Layout as DoctableLayout;
use qbasher_core::index::inverted::{decode_posting, encode_posting, Posting};
use qbasher_core::index::vocab::{encode_record, lookup, Payload, VocabLayout};
use qbasher_core::options::ClassifierMode;
use qbasher_core::rank::classifier::{lexical_similarity, DolmInputs};
use qbasher_core::types::DocNum;

mod strategies {
    use super::*;

    pub fn lowercase_term() -> impl Strategy<Value = String> {
        "[a-z]{1,12}"
    }

    pub fn distinct_terms(max_len: usize) -> impl Strategy<Value = Vec<String>> {
        prop::collection::vec(lowercase_term(), 1..12).prop_map(move |mut terms| {
            terms.sort();
            terms.dedup();
            terms.retain(|t| t.len() <= max_len);
            terms
        })
    }
}

proptest! {
    #[test]
    fn doctable_entry_round_trips_within_field_widths(
        word_count in 0u64..1000,
        offset in 0u64..(1u64 << 40),
        score in 0.0f64..=1.0,
        bloom in 0u64..1024,
    ) {
        let layout = DoctableLayout::reference();
        let packed = layout.pack(word_count, offset, score, bloom);
        let unpacked = layout.unpack(packed);

        prop_assert_eq!(unpacked.word_count, word_count.min(layout.max_word_count()));
        prop_assert_eq!(unpacked.forward_offset, offset);
        prop_assert_eq!(unpacked.bloom_signature, bloom);
        // Score is quantized to 8 bits; round-trip error is bounded by the
        // resulting step size.
        prop_assert!((unpacked.score - score).abs() <= 1.0 / 255.0);
    }

    #[test]
    fn bloom_query_signature_is_order_independent(terms in strategies::distinct_terms(12)) {
        let mut shuffled = terms.clone();
        shuffled.reverse();

        let forward: Vec<&[u8]> = terms.iter().map(|t| t.as_bytes()).collect();
        let reversed: Vec<&[u8]> = shuffled.iter().map(|t| t.as_bytes()).collect();

        prop_assert_eq!(query_signature(forward, 10), query_signature(reversed, 10));
    }

    #[test]
    fn bloom_query_signature_is_deterministic(terms in strategies::distinct_terms(12)) {
        let a: Vec<&[u8]> = terms.iter().map(|t| t.as_bytes()).collect();
        let b: Vec<&[u8]> = terms.iter().map(|t| t.as_bytes()).collect();
        prop_assert_eq!(query_signature(a, 10), query_signature(b, 10));
    }

    #[test]
    fn a_documents_bloom_signature_always_contains_its_own_terms_signature(
        term in strategies::lowercase_term(),
    ) {
        // A document whose Bloom signature is built from exactly this
        // term's contribution must satisfy `possibly_contains` for a
        // query built from the same term.
        let sig = term_signature(term.as_bytes(), 10);
        let query_sig = query_signature([term.as_bytes()], 10);
        prop_assert_eq!(sig & query_sig, query_sig);
    }

    #[test]
    fn postings_round_trip_through_vbyte_gap_encoding(
        mut gaps in prop::collection::vec(0u32..5000, 1..20),
    ) {
        // Build a strictly increasing docnum sequence from arbitrary gaps.
        let mut docnum = 0u64;
        let mut postings = Vec::new();
        for (i, gap) in gaps.drain(..).enumerate() {
            docnum += gap as u64;
            postings.push(Posting { doc: DocNum(docnum), wpos: (i % 200) as u8 });
        }

        let mut buf = Vec::new();
        let mut prev = 0u64;
        for p in &postings {
            encode_posting(&mut buf, prev, *p);
            prev = p.doc.0;
        }

        let mut offset = 0;
        let mut prev = 0u64;
        let mut decoded = Vec::new();
        while offset < buf.len() {
            let (p, new_offset) = decode_posting(&buf, offset, prev).unwrap();
            decoded.push(p);
            prev = p.doc.0;
            offset = new_offset;
        }

        prop_assert_eq!(decoded, postings);
    }

    #[test]
    fn vocab_record_round_trips_through_lookup(
        occurrence_count in 2u64..100_000,
        quantized_idf in 0u8..=255,
        offset in 0u64..(1u64 << 47),
        term in strategies::lowercase_term(),
    ) {
        let layout = VocabLayout { term_max_len: 15 };
        let vocab = encode_record(&layout, term.as_bytes(), occurrence_count, quantized_idf, Payload::Offset(offset));
        let entry = lookup(&vocab, &layout, term.as_bytes()).unwrap().unwrap();

        prop_assert_eq!(entry.occurrence_count, occurrence_count);
        prop_assert_eq!(entry.quantized_idf, quantized_idf);
        prop_assert_eq!(entry.payload, Payload::Offset(offset));
    }

    #[test]
    fn count_dolm_is_bounded_to_unit_interval_for_non_negative_inputs(
        matched in 0.0f64..20.0,
        doc_extent in 0.0f64..50.0,
        insertions in 0.0f64..20.0,
        missing in 0.0f64..20.0,
    ) {
        // matched never exceeds doc_extent in a real candidate (you can't
        // match more terms than the document has words), so constrain the
        // generated inputs to that realistic region.
        prop_assume!(matched <= doc_extent + missing);

        let score = lexical_similarity(
            ClassifierMode::CountDolm,
            &DolmInputs { matched, doc_extent, insertions, missing, out_of_order: 0.0 },
        );

        prop_assert!((0.0..=1.0).contains(&score));
    }

    #[test]
    fn jaccard_is_bounded_to_unit_interval_when_matched_terms_are_a_subset(
        matched in 0.0f64..20.0,
        extra_unmatched in 0.0f64..50.0,
    ) {
        // Jaccard's denominator (doc_extent + missing) is, by construction,
        // at least as large as the matched count whenever `doc_extent`
        // already counts the matched terms themselves.
        let doc_extent = matched + extra_unmatched;
        let score = lexical_similarity(
            ClassifierMode::Jaccard,
            &DolmInputs { matched, doc_extent, insertions: 0.0, missing: 0.0, out_of_order: 0.0 },
        );
        prop_assert!((0.0..=1.0).contains(&score));
    }

    #[test]
    fn classifier_off_mode_always_scores_zero(
        matched in 0.0f64..20.0,
        doc_extent in 0.0f64..50.0,
        insertions in 0.0f64..20.0,
        missing in 0.0f64..20.0,
    ) {
        let score = lexical_similarity(
            ClassifierMode::Off,
            &DolmInputs { matched, doc_extent, insertions, missing, out_of_order: 0.0 },
        );
        prop_assert_eq!(score, 0.0);
    }
}
