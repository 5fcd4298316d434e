//! Ranker (C5): a linear combination of eight ranking features — static
//! document score, phrase match, in-sequence match, primacy, length
//! closeness, BM25, geo proximity, and span — plus a relaxation penalty
//! (spec §4.5, §6 `alpha..theta`).

pub mod classifier;
pub mod topk;

use crate::candidate::{Candidate, FV_ELTS, MF_PHRASE, MF_SEQUENCE};
use crate::index::doctable::DoctableEntry;
use crate::options::Options;

pub const BM25_K1: f64 = 2.0;
pub const BM25_B: f64 = 0.75;

/// Inputs the ranker needs beyond what's already on the [`Candidate`]:
/// static document metadata and collection-wide constants.
pub struct RankContext<'a> {
    pub doc: &'a DoctableEntry,
    pub query_len: usize,
    pub avg_doc_length: f64,
    pub total_docs: u64,
    pub terms_missing: usize,
    /// Whether the document's first word equals some query word (spec
    /// §4.5's `primacy` feature).
    pub primacy: bool,
    /// `1.0` when no geo filter is active or the candidate is within
    /// range; callers compute the actual proximity elsewhere (spec §4.4's
    /// geo filter already vetoes out-of-range candidates before scoring).
    pub geo_proximity: f64,
}

/// Score one candidate, filling in its `feature_vector` and returning the
/// final linear-combination score (also stored back on `score`).
pub fn score(candidate: &mut Candidate, ctx: &RankContext, options: &Options) -> f64 {
    let static_score = ctx.doc.score;
    let phrase = if candidate.match_flags & MF_PHRASE != 0 { 1.0 } else { 0.0 };
    let in_seq = if candidate.match_flags & MF_SEQUENCE != 0 { 1.0 } else { 0.0 };
    let primacy = if ctx.primacy { 1.0 } else { 0.0 };

    let length_diff = (ctx.doc.word_count as i64 - ctx.query_len as i64).unsigned_abs() as f64;
    let length_score = 1.0 / (length_diff + 1.0);

    let bm25_raw = bm25_score(candidate, ctx);
    let bm25 = bm25_raw / (bm25_raw + 1.0);

    let span = 1.0 / (1.0 + candidate.intervening_words as f64);

    let features = [static_score, phrase, in_seq, primacy, length_score, bm25, ctx.geo_proximity, span];
    candidate.feature_vector[..8].copy_from_slice(&features);

    let mut raw: f64 = options.rr_coeffs.iter().zip(features.iter()).map(|(c, f)| c * f).sum();
    raw *= 0.1f64.powi(ctx.terms_missing as i32);

    candidate.feature_vector[FV_ELTS - 1] = raw;
    candidate.score = raw;
    raw
}

/// BM25 over the matched query terms' term frequencies, using each term's
/// IDF as already recovered onto the candidate (spec §4.5, k1=2.0, b=0.75).
fn bm25_score(candidate: &Candidate, ctx: &RankContext) -> f64 {
    let doc_len = ctx.doc.word_count.max(1) as f64;
    let len_norm = 1.0 - BM25_B + BM25_B * doc_len / ctx.avg_doc_length.max(1.0);

    let mut total = 0.0;
    for i in 0..candidate.tf.len() {
        let tf = candidate.tf[i] as f64;
        if tf <= 0.0 {
            continue;
        }
        total += candidate.qidf[i] * (tf * (BM25_K1 + 1.0)) / (tf + BM25_K1 * len_norm);
    }
    total
}
