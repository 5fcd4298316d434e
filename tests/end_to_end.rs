//! End-to-end scenarios over a small in-memory-built index, one per spec
//! §8 "end-to-end scenarios" (exact phrase, relaxation, partial prefix,
//! classifier threshold, multi-query fallback, timeout).

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use qbasher_core::index::doctable::Layout as DoctableLayout;
use qbasher_core::index::inverted::{encode_posting, Posting};
use qbasher_core::index::vocab::{encode_record, Payload, VocabLayout};
use qbasher_core::index::IndexEnvironment;
use qbasher_core::options::ClassifierMode;
use qbasher_core::types::DocNum;
use qbasher_core::{Options, QueryEngine};

/// Build an index over `docs`, each a lowercase space-separated string of
/// words with no trailing newline. Bloom signatures are left at the
/// full-width "all bits set" value so the pre-filter never interferes with
/// the correctness properties these scenarios are actually about.
fn build_index(dir: &Path, docs: &[&str]) -> PathBuf {
    let doctable_layout = DoctableLayout::reference();
    let bloom_width = doctable_layout.bloom_width();
    let full_bloom = if bloom_width >= 64 { u64::MAX } else { (1u64 << bloom_width) - 1 };

    let mut forward = Vec::new();
    let mut doc_offsets = Vec::with_capacity(docs.len());
    let mut word_counts = Vec::with_capacity(docs.len());
    let mut postings: HashMap<&str, Vec<(u64, u8)>> = HashMap::new();

    for (doc_idx, doc) in docs.iter().enumerate() {
        doc_offsets.push(forward.len() as u64);
        let words: Vec<&str> = doc.split(' ').filter(|w| !w.is_empty()).collect();
        word_counts.push(words.len());
        for (wpos, word) in words.iter().enumerate() {
            postings.entry(*word).or_default().push((doc_idx as u64, wpos as u8));
        }
        forward.extend_from_slice(doc.as_bytes());
        forward.push(b'\n');
    }

    let mut doctable = Vec::with_capacity(docs.len() * 8);
    for (offset, word_count) in doc_offsets.iter().zip(&word_counts) {
        doctable.extend_from_slice(&doctable_layout.pack(*word_count as u64, *offset, 0.5, full_bloom).to_le_bytes());
    }

    let vocab_layout = VocabLayout { term_max_len: 15 };
    let mut terms: Vec<&str> = postings.keys().copied().collect();
    terms.sort_unstable();

    // Every size the header declares can be computed before any postings
    // are actually laid out, since the vocab's record size is fixed
    // regardless of the offsets it will end up storing. That lets the
    // header (and therefore its length) be finalized before appending
    // postings, whose offsets are absolute into this same file.
    let total_postings: u64 = terms.iter().map(|t| postings[t].len() as u64).sum();
    let vocab_len = terms.len() * vocab_layout.record_size();
    let header = header_text(forward.len(), doctable.len(), vocab_len, total_postings, docs.len());
    let mut inverted = header.into_bytes();

    let mut vocab = Vec::new();
    for term in terms {
        let list = &postings[term];
        if list.len() == 1 {
            let (doc, wpos) = list[0];
            vocab.extend(encode_record(&vocab_layout, term.as_bytes(), 1, 100, Payload::Inline { doc: DocNum(doc), wpos }));
        } else {
            let offset = inverted.len() as u64;
            let mut prev = 0u64;
            for &(doc, wpos) in list {
                encode_posting(&mut inverted, prev, Posting { doc: DocNum(doc), wpos });
                prev = doc;
            }
            vocab.extend(encode_record(&vocab_layout, term.as_bytes(), list.len() as u64, 100, Payload::Offset(offset)));
        }
    }
    debug_assert_eq!(vocab.len(), vocab_len);

    let marker = (inverted.len() as u64 + 8).to_le_bytes();
    inverted.extend_from_slice(&marker);

    let stem = dir.join("QBASH");
    std::fs::write(stem.with_extension("if"), &inverted).unwrap();
    std::fs::write(stem.with_extension("forward"), &forward).unwrap();
    std::fs::write(stem.with_extension("vocab"), &vocab).unwrap();
    std::fs::write(stem.with_extension("dt"), &doctable).unwrap();
    stem
}

fn header_text(forward_len: usize, dt_len: usize, vocab_len: usize, total_postings: u64, num_docs: usize) -> String {
    format!(
        "Index_format: 2\nQBASHER version: 9.9\nQuery_meta_chars: %\"[]~/\nOther_token_breakers: \n\
         Size of .forward: {forward_len}\nSize of .dt: {dt_len}\nSize of .vocab: {vocab_len}\n\
         Total postings: {total_postings}\nNumber of documents: {num_docs}\n\n"
    )
}

fn engine(docs: &[&str]) -> (tempfile::TempDir, QueryEngine) {
    let dir = tempfile::tempdir().unwrap();
    let stem = build_index(dir.path(), docs);
    let env = IndexEnvironment::open(&stem).unwrap();
    (dir, QueryEngine::new(env))
}

#[test]
fn exact_phrase_returns_only_the_matching_document() {
    let (_dir, engine) = engine(&["hey jude", "hey now"]);
    let options = Options::default();

    let results = engine.query("\"hey jude\"", &options).unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].doc, DocNum(0));
    assert!(results[0].score >= 0.0);
}

#[test]
fn relaxation_recovers_a_near_miss_only_when_allowed() {
    let (_dir, engine) = engine(&["the quick brown fox"]);

    let mut relaxed = Options::default();
    relaxed.relaxation_level = 1;
    let results = engine.query("the slow brown fox", &relaxed).unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].doc, DocNum(0));

    let exact = Options::default();
    let results = engine.query("the slow brown fox", &exact).unwrap();
    assert!(results.is_empty());
}

#[test]
fn partial_prefix_requires_a_matching_document_word() {
    let (_dir, engine) = engine(&["government department services"]);
    let mut options = Options::default();
    options.auto_partials = false;

    // "department" anchors an exact match; "/gov" only needs to prefix
    // some other, unmatched document word.
    let results = engine.query("department /gov", &options).unwrap();
    assert_eq!(results.len(), 1);

    // No document word starts with "xyz", so the partial-prefix filter
    // rejects the candidate even though "department" matched exactly.
    let results = engine.query("department /xyz", &options).unwrap();
    assert!(results.is_empty());
}

#[test]
fn classifier_dolm_threshold_accepts_and_rejects_at_the_documented_cutoff() {
    let (_dir, engine) = engine(&["lucy in the sky with diamonds"]);

    let mut strict = Options::default();
    strict.classifier_mode = ClassifierMode::CountDolm;
    strict.classifier_threshold = 0.75;
    let results = engine.query("lucy in the sky", &strict).unwrap();
    assert!(results.is_empty(), "a four-of-six dolm score should be rejected at threshold 0.75");

    let mut lenient = Options::default();
    lenient.classifier_mode = ClassifierMode::CountDolm;
    lenient.classifier_threshold = 0.4;
    let results = engine.query("lucy in the sky", &lenient).unwrap();
    assert_eq!(results.len(), 1, "a four-of-six dolm score should be accepted at threshold 0.4");
}

#[test]
fn multi_query_falls_back_only_when_the_first_variant_is_empty() {
    let (_dir, engine) = engine(&["dog park"]);
    let options = Options::default();

    // "cat" has no matches, so its `N<1` post-test fails and the "dog"
    // variant runs, its score scaled by the 0.9 weight.
    let results = engine.multi_query("cat\t\t1.0\tN<1\ndog\t\t0.9", &options).unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].doc, DocNum(0));
}

#[test]
fn multi_query_skips_the_fallback_when_the_first_variant_has_results() {
    let (_dir, engine) = engine(&["cat nap", "dog park"]);
    let options = Options::default();

    let results = engine.multi_query("cat\t\t1.0\tN<1\ndog\t\t0.9", &options).unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].doc, DocNum(0));
}

#[test]
fn an_expired_wall_clock_budget_returns_a_partial_result_without_crashing() {
    let docs: Vec<String> = (0..2000).map(|i| format!("term{} shared filler word", i % 50)).collect();
    let docs: Vec<&str> = docs.iter().map(String::as_str).collect();
    let (_dir, engine) = engine(&docs);

    // `timeout_msec == 0` means unlimited, so a budget has to be a small
    // positive value to actually engage the cancellation check.
    let mut options = Options::default();
    options.timeout_msec = 1;

    // No assertion beyond "doesn't panic and returns some (possibly
    // partial) result list" — whether the budget is actually exhausted
    // before the candidate scan finishes is a timing detail, not
    // something a deterministic test can pin down.
    let results = engine.query("shared filler word", &options).unwrap();
    assert!(results.len() <= options.max_to_show);
}
