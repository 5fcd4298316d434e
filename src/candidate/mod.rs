//! Relaxed-AND candidate generation (C4): finds documents matching at
//! least `query_term_count - relaxation_level` of the top-level query
//! terms, using the (M+1)-th-rarest term's current docnum as a pivot to
//! minimize wasted `skipto` calls (spec §4.4, grounded on the original
//! `saat_relaxed_and`).

pub mod bloom;
pub mod filters;

use crate::error::Result;
use crate::saat::SaatNode;
use crate::types::{DocNum, WordPos, DONT_CARE, MAX_WDS_IN_QUERY};

pub const MF_FULL_EXACT: u8 = 1;
pub const MF_PHRASE: u8 = 2;
pub const MF_SEQUENCE: u8 = 4;
pub const MF_FULL: u8 = 8;
pub const MF_RELAX1: u8 = 16;
pub const MF_RELAX2: u8 = 32;

pub const FV_ELTS: usize = 9;

/// One surviving relaxed-AND candidate, equivalent to `candidate_t`.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub doc: DocNum,
    pub score: f64,
    pub terms_matched_bits: u32,
    pub tf: [u8; MAX_WDS_IN_QUERY],
    pub qidf: [f64; MAX_WDS_IN_QUERY],
    pub intervening_words: u8,
    pub match_flags: u8,
    pub feature_vector: [f64; FV_ELTS],
}

impl Candidate {
    pub(crate) fn new(doc: DocNum, terms_matched_bits: u32) -> Self {
        Candidate {
            doc,
            score: 0.0,
            terms_matched_bits,
            tf: [0; MAX_WDS_IN_QUERY],
            qidf: [0.0; MAX_WDS_IN_QUERY],
            intervening_words: 0,
            match_flags: 0,
            feature_vector: [0.0; FV_ELTS],
        }
    }
}

/// Candidates bucketed by how many terms they were missing: index `i` holds
/// candidates found with exactly `i` terms missing (spec §4.4, "result
/// blocks per relaxation level").
#[derive(Debug, Clone, Default)]
pub struct ResultBlocks {
    pub blocks: Vec<Vec<Candidate>>,
    pub full_match_count: u64,
    pub candidates_considered: u64,
    pub skips: u64,
}

/// Stops the search once the deterministic operation budget or wall-clock
/// timeout fires. Checked every [`CANCEL_CHECK_INTERVAL`] candidates.
pub trait Cancellation {
    fn is_cancelled(&mut self) -> bool;
}

impl<F: FnMut() -> bool> Cancellation for F {
    fn is_cancelled(&mut self) -> bool {
        self()
    }
}

const CANCEL_CHECK_INTERVAL: u64 = 10;

fn sort_by_curdoc(terms: &[SaatNode]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..terms.len()).collect();
    order.sort_by(|&a, &b| {
        let da = terms[a].curdoc();
        let db = terms[b].curdoc();
        da.cmp(&db).then_with(|| terms[a].curwpos().cmp(&terms[b].curwpos()))
    });
    order
}

/// Run relaxed-AND over `terms` (the top-level query terms/phrases/
/// disjunctions, already positioned by an initial `skipto(0, 0)`),
/// recording up to `max_candidates` per relaxation level, until the terms
/// are exhausted or `cancel` reports true.
pub fn relaxed_and(
    terms: &mut [SaatNode],
    index: &[u8],
    relaxation_level: u8,
    max_candidates: usize,
    report_match_counts_only: bool,
    needs_tf: bool,
    mut cancel: impl Cancellation,
) -> Result<ResultBlocks> {
    let t = terms.len();
    if t == 0 || t > MAX_WDS_IN_QUERY {
        return Ok(ResultBlocks::default());
    }

    let mut m = relaxation_level as usize;
    let mut u = t.saturating_sub(m);
    if u < 1 {
        u = 1;
        m = t - u;
    }
    let pivot = u - 1;

    let mut result = ResultBlocks {
        blocks: (0..=m).map(|_| Vec::new()).collect(),
        ..Default::default()
    };

    loop {
        if result.candidates_considered % CANCEL_CHECK_INTERVAL == 0 && cancel.is_cancelled() {
            break;
        }

        let ranking = sort_by_curdoc(terms);
        let candid8 = ranking[pivot];
        if terms[candid8].exhausted() {
            break;
        }
        let candidoc = terms[candid8].curdoc();

        result.candidates_considered += 1;
        let mut terms_missing = 0usize;
        let mut terms_exhausted = 0usize;
        let mut terms_matched_bits: u32 = 0;

        for l in 0..t {
            if l == candid8 {
                terms_matched_bits |= 1 << l;
                continue;
            }
            let matched = if terms[l].curdoc() > candidoc {
                false
            } else if terms[l].curdoc() == candidoc {
                true
            } else {
                result.skips += 1;
                terms[l].skipto(candidoc, DONT_CARE, index)?;
                terms[l].curdoc() == candidoc
            };

            if matched {
                terms_matched_bits |= 1 << l;
            } else {
                terms_missing += 1;
                if terms[l].exhausted() {
                    terms_exhausted += 1;
                }
                if terms_missing > m {
                    break;
                }
            }
        }

        if terms_exhausted > m {
            break;
        }

        if terms_missing <= m {
            if report_match_counts_only {
                if terms_missing == 0 {
                    result.full_match_count += 1;
                }
            } else if result.blocks[terms_missing].len() < max_candidates {
                let mut candidate = Candidate::new(candidoc, terms_matched_bits);
                if needs_tf {
                    let mut matched_wpos: Vec<WordPos> = Vec::with_capacity(t);
                    for l in 0..t {
                        if terms_matched_bits & (1 << l) != 0 {
                            if let SaatNode::Word(w) = &terms[l] {
                                matched_wpos.push(w.curwpos);
                                let mut probe = w.clone();
                                let tf = probe.advance_within_doc(index)?;
                                candidate.tf[l] = tf.min(u8::MAX as u32) as u8;
                                candidate.qidf[l] = w.qidf;
                            }
                        }
                    }
                    // Words between the first and last matched term's
                    // positions that aren't themselves part of the match —
                    // the "insertions within the best matching span" (spec
                    // §4.4/§4.5), approximated here from the word-leaf
                    // positions only (phrase/disjunction terms don't expose
                    // a single wpos and are excluded, matching the same
                    // tf/qidf restriction above).
                    if let (Some(&min), Some(&max)) = (matched_wpos.iter().min(), matched_wpos.iter().max()) {
                        let span_width = max.saturating_sub(min);
                        let insertions = span_width.saturating_sub(matched_wpos.len() as u32 - 1);
                        candidate.intervening_words = insertions.min(u8::MAX as u32) as u8;
                    }
                }
                result.blocks[terms_missing].push(candidate);
            }
        }

        // Advance every term currently sitting on candidoc past this doc.
        for l in 0..t {
            if terms_matched_bits & (1 << l) != 0 && !terms[l].exhausted() {
                terms[l].skipto(DocNum(candidoc.0 + 1), 0, index)?;
            }
        }
    }

    Ok(result)
}
