//! The `possibly_record_candidate` filter chain (spec §4.4): a candidate
//! that survives the relaxed-AND match count still has to pass a fixed,
//! ordered sequence of cheap-to-expensive rejection tests before it's
//! recorded. Each test short-circuits the rest on failure.

use crate::candidate::bloom::possibly_contains;
use crate::index::doctable::DoctableEntry;
use crate::options::Options;

/// Everything a filter needs to know about one surviving relaxed-AND
/// candidate. Geo/classifier/street flags are computed by their own
/// subsystems and threaded through here rather than recomputed, since this
/// chain only decides accept/reject order and short-circuiting.
pub struct FilterContext<'a> {
    pub doc: &'a DoctableEntry,
    pub query_signature: u64,
    pub query_len: usize,
    pub relaxation_used: u8,
    pub repeated_word_count: usize,
    pub geo_ok: bool,
    pub classifier_score: Option<f64>,
    pub partial_prefix_ok: bool,
    pub street_number_ok: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    Bloom,
    Length,
    RepeatedWord,
    Geo,
    ClassifierThreshold,
    PartialPrefix,
    StreetNumber,
}

/// Run the ordered chain, stopping at the first failing test. `Ok(None)`
/// means the candidate is accepted.
pub fn evaluate(ctx: &FilterContext, options: &Options) -> Option<Rejection> {
    if !possibly_contains(ctx.query_signature, ctx.doc.bloom_signature) {
        return Some(Rejection::Bloom);
    }

    let max_diff = options.max_length_diff_for(ctx.query_len, ctx.relaxation_used);
    let diff = (ctx.doc.word_count as i64 - ctx.query_len as i64).unsigned_abs() as i32;
    if diff > max_diff {
        return Some(Rejection::Length);
    }

    if options.duplicate_handling != crate::options::DuplicateHandling::None && ctx.repeated_word_count > ctx.query_len {
        return Some(Rejection::RepeatedWord);
    }

    if !ctx.geo_ok {
        return Some(Rejection::Geo);
    }

    if let Some(score) = ctx.classifier_score {
        if score < options.classifier_threshold {
            return Some(Rejection::ClassifierThreshold);
        }
    }

    if !ctx.partial_prefix_ok {
        return Some(Rejection::PartialPrefix);
    }

    if !ctx.street_number_ok {
        return Some(Rejection::StreetNumber);
    }

    None
}
