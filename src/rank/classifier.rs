//! Classifier scoring modes (spec §4.5, §6 `classifier_mode`): degree-of-
//! lexical-match (DOLM) and Jaccard similarity, each with a plain-count and
//! an IDF-weighted variant, plus the match-type flag bits used to describe
//! *how* a candidate matched.

use crate::candidate::{MF_FULL, MF_FULL_EXACT, MF_PHRASE, MF_RELAX1, MF_RELAX2, MF_SEQUENCE};
use crate::options::{ClassifierMode, EPSILON};

/// Minimum number of words that must match for a query that matched `Q`
/// terms, shrinking the effective bar for short matches: `max(1, 6 - Q)`.
pub fn min_words_to_match(matched_terms: f64) -> f64 {
    (6.0 - matched_terms).max(1.0)
}

/// The inputs the degree-of-lexical-match / Jaccard formula needs, already
/// reduced to plain counts (`CountDolm`/`Jaccard`) or IDF mass
/// (`IdfDolm`/`IdfJaccard`) by the caller, which is the only place that
/// knows which variant is in play.
pub struct DolmInputs {
    /// `Q`: matched query-term count, or summed IDF of the matched terms.
    pub matched: f64,
    /// `D`: document length, or summed IDF of the document's words.
    pub doc_extent: f64,
    /// `I`: insertions (intervening non-query words) within the best
    /// matching span.
    pub insertions: f64,
    /// `M`: query terms that did not match at all.
    pub missing: f64,
    /// `S`: half a point per out-of-order pair within the span.
    pub out_of_order: f64,
}

/// Lexical similarity between the query and a candidate document.
///
/// `dolm = Q / (D + I + MWT*M + S)` for the DOLM modes, `dolm = Q / (D + M)`
/// for the Jaccard modes, with `MWT = max(1, 6 - Q)` (spec §4.5).
pub fn lexical_similarity(mode: ClassifierMode, inputs: &DolmInputs) -> f64 {
    match mode {
        ClassifierMode::Off => 0.0,
        ClassifierMode::CountDolm | ClassifierMode::IdfDolm => {
            let mwt = min_words_to_match(inputs.matched);
            let denom = inputs.doc_extent + inputs.insertions + mwt * inputs.missing + inputs.out_of_order;
            inputs.matched / denom.max(EPSILON)
        }
        ClassifierMode::Jaccard | ClassifierMode::IdfJaccard => {
            inputs.matched / (inputs.doc_extent + inputs.missing).max(EPSILON)
        }
    }
}

/// Build the match-type flag byte for a candidate, mirroring the original
/// engine's `MF_*` bits.
pub fn match_flags(
    terms_missing: usize,
    query_len: usize,
    is_phrase: bool,
    is_in_sequence: bool,
) -> u8 {
    let mut flags = 0u8;
    if terms_missing == 0 {
        flags |= MF_FULL;
        if query_len <= 1 || is_in_sequence {
            flags |= MF_FULL_EXACT;
        }
    }
    if is_phrase {
        flags |= MF_PHRASE;
    }
    if is_in_sequence {
        flags |= MF_SEQUENCE;
    }
    if terms_missing == 1 {
        flags |= MF_RELAX1;
    }
    if terms_missing == 2 {
        flags |= MF_RELAX2;
    }
    flags
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn min_words_to_match_shrinks_for_more_matched_terms() {
        assert_eq!(min_words_to_match(1.0), 5.0);
        assert_eq!(min_words_to_match(6.0), 1.0);
        assert_eq!(min_words_to_match(10.0), 1.0);
    }

    #[test]
    fn dolm_matches_the_worked_example() {
        // Q=4, D=6, I=2, M=0, S=0, MWT=max(1,6-4)=2 -> dolm = 4/(6+2+0+0) = 0.5
        let s = lexical_similarity(
            ClassifierMode::CountDolm,
            &DolmInputs { matched: 4.0, doc_extent: 6.0, insertions: 2.0, missing: 0.0, out_of_order: 0.0 },
        );
        assert!((s - 0.5).abs() < 1e-9);
    }

    #[test]
    fn missing_terms_are_penalized_by_mwt() {
        let full = lexical_similarity(
            ClassifierMode::CountDolm,
            &DolmInputs { matched: 4.0, doc_extent: 6.0, insertions: 0.0, missing: 0.0, out_of_order: 0.0 },
        );
        let one_missing = lexical_similarity(
            ClassifierMode::CountDolm,
            &DolmInputs { matched: 4.0, doc_extent: 6.0, insertions: 0.0, missing: 1.0, out_of_order: 0.0 },
        );
        assert!(one_missing < full);
    }

    #[test]
    fn jaccard_accounts_for_document_length() {
        let short_doc = lexical_similarity(
            ClassifierMode::Jaccard,
            &DolmInputs { matched: 2.0, doc_extent: 2.0, insertions: 0.0, missing: 0.0, out_of_order: 0.0 },
        );
        let long_doc = lexical_similarity(
            ClassifierMode::Jaccard,
            &DolmInputs { matched: 2.0, doc_extent: 20.0, insertions: 0.0, missing: 0.0, out_of_order: 0.0 },
        );
        assert!(short_doc > long_doc);
    }

    #[test]
    fn full_match_sets_full_flag() {
        let flags = match_flags(0, 3, false, false);
        assert_ne!(flags & MF_FULL, 0);
        assert_eq!(flags & MF_RELAX1, 0);
    }

    #[test]
    fn one_missing_term_sets_relax1_not_full() {
        let flags = match_flags(1, 3, false, false);
        assert_eq!(flags & MF_FULL, 0);
        assert_ne!(flags & MF_RELAX1, 0);
    }
}
