//! `QueryEngine`: the façade tying the index mapper, vocabulary, SAAT tree,
//! candidate generator, ranker, and query parser together for both a
//! single query and a multi-query call (spec §4.1-§4.6, §A.1).

use std::time::Instant;

use crate::candidate::bloom::{query_signature, term_signature};
use crate::candidate::filters::{self, FilterContext};
use crate::candidate::{relaxed_and, Candidate};
use crate::error::Result;
use crate::index::doctable::{self, DoctableEntry};
use crate::index::vocab::{self, Payload};
use crate::index::IndexEnvironment;
use crate::options::{ClassifierMode, Options};
use crate::preprocess::shorten::{self, ShortenTerm};
use crate::preprocess::street;
use crate::query::multiquery::{self, Variant};
use crate::query::parser::{self, ParsedQuery, RankOnlyTerm, Term};
use crate::rank::classifier;
use crate::rank::topk::TopK;
use crate::rank::{self, RankContext};
use crate::saat::{DisjunctionNode, PhraseNode, SaatNode, WordLeaf};
use crate::types::DocNum;

/// One ranked result, the caller-facing analogue of a top-K entry plus its
/// display text (spec §4.5: "mapping docnums to displayable strings").
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub doc: DocNum,
    pub score: f64,
    pub match_flags: u8,
    pub display_text: String,
}

pub struct QueryEngine {
    env: IndexEnvironment,
}

impl QueryEngine {
    pub fn new(env: IndexEnvironment) -> Self {
        QueryEngine { env }
    }

    pub fn index(&self) -> &IndexEnvironment {
        &self.env
    }

    /// Run one query string (not a multi-query) under `options`, returning
    /// up to `options.max_to_show` results sorted descending by score.
    pub fn query(&self, query: &str, options: &Options) -> Result<Vec<SearchResult>> {
        let start = Instant::now();
        let parsed = parser::parse(
            query,
            |b| self.env.is_query_meta_char(b),
            |b| self.env.is_token_breaker(b),
            options.conflate_accents,
        );
        let mut topk = TopK::new(options.max_to_show);
        self.run_variant(&parsed, options, 1.0, &mut topk, start)?;
        let results = self.finalize(topk, options);
        tracing::debug!(query, hits = results.len(), elapsed_us = start.elapsed().as_micros() as u64, "query evaluated");
        Ok(results)
    }

    /// Run a multi-query string (C6): evaluate each variant in order,
    /// accumulating into a single shared top-K, honoring each variant's
    /// option overlay, weight, and post-test short-circuit.
    pub fn multi_query(&self, multi_query: &str, options: &Options) -> Result<Vec<SearchResult>> {
        let start = Instant::now();
        let variants = multiquery::parse_variants(multi_query)?;
        let mut topk = TopK::new(options.max_to_show);
        let mut highest_score = f64::NEG_INFINITY;

        for variant in &variants {
            let variant_options = multiquery::variant_options(options, variant)?;
            let parsed = parser::parse(
                &variant.query,
                |b| self.env.is_query_meta_char(b),
                |b| self.env.is_token_breaker(b),
                variant_options.conflate_accents,
            );
            self.run_variant(&parsed, &variant_options, variant.weight, &mut topk, start)?;
            if let Some(best) = topk.lowest_score() {
                highest_score = highest_score.max(best);
            }
            if !multiquery::continue_after(variant, topk.len(), highest_score.max(0.0)) {
                break;
            }
        }

        let results = self.finalize(topk, options);
        tracing::debug!(
            variants = variants.len(),
            hits = results.len(),
            elapsed_us = start.elapsed().as_micros() as u64,
            "multi-query evaluated"
        );
        Ok(results)
    }

    fn finalize(&self, topk: TopK, options: &Options) -> Vec<SearchResult> {
        let mut results: Vec<SearchResult> = topk
            .into_sorted_vec()
            .into_iter()
            .map(|c| SearchResult {
                doc: c.doc,
                score: c.score,
                match_flags: c.match_flags,
                display_text: self.display_text(c.doc),
            })
            .collect();
        dedup(&mut results, options.duplicate_handling);
        results.truncate(options.max_to_show);
        results
    }

    fn display_text(&self, doc: DocNum) -> String {
        match doctable::entry_at(self.env.doctable_bytes(), self.env.doctable_layout(), doc.0) {
            Ok(entry) => forward_field(self.env.forward_bytes(), entry.forward_offset as usize, 0)
                .map(|f| String::from_utf8_lossy(f).into_owned())
                .unwrap_or_default(),
            Err(_) => String::new(),
        }
    }

    /// Build a SAAT tree for one variant's query, run relaxed-AND, filter
    /// and score the survivors, and feed them into the shared `topk`.
    fn run_variant(&self, parsed: &ParsedQuery, options: &Options, weight: f64, topk: &mut TopK, start: Instant) -> Result<()> {
        let shorten_terms: Vec<ShortenTerm> = parsed
            .terms
            .iter()
            .filter_map(|t| match t {
                Term::Word(w) => Some(ShortenTerm { text: w.clone(), is_compound: false }),
                Term::Phrase(_) | Term::Disjunction(_) => Some(ShortenTerm { text: String::new(), is_compound: true }),
                Term::PartialPrefix(_) | Term::RankOnly(_) => None,
            })
            .collect();
        let was_shortened = {
            let distinct = shorten_terms.iter().filter(|t| !t.is_compound).count();
            options.query_shortening_threshold < distinct
        };
        let shortening = shorten::shorten(&shorten_terms, options.query_shortening_threshold, |w| {
            vocab::lookup(self.env.vocab_bytes(), self.env.vocab_layout(), w.as_bytes())
                .ok()
                .flatten()
                .map(|e| e.occurrence_count)
        });
        let kept_words: std::collections::HashSet<&str> = shortening.kept.iter().map(String::as_str).collect();

        let mut terms = Vec::new();
        let mut repetition: Vec<(String, usize)> = Vec::new();
        let mut partial_prefix_terms = Vec::new();
        let mut rank_only_terms = Vec::new();
        let query_len = parsed.terms.len();

        for term in &parsed.terms {
            match term {
                Term::Word(w) => {
                    if !kept_words.contains(w.as_str()) {
                        continue;
                    }
                    if let Some(idx) = repetition.iter().position(|(t, _)| t == w) {
                        repetition[idx].1 += 1;
                        continue;
                    }
                    repetition.push((w.clone(), 1));
                }
                Term::Phrase(words) => {
                    let children = self.build_leaves(words)?;
                    terms.push(SaatNode::Phrase(PhraseNode::new(children)));
                }
                Term::Disjunction(words) => {
                    let children = self.build_leaves(words)?.into_iter().map(SaatNode::Word).collect();
                    terms.push(SaatNode::Disjunction(DisjunctionNode::new(children)));
                }
                Term::PartialPrefix(w) => partial_prefix_terms.push(w.clone()),
                Term::RankOnly(r) => rank_only_terms.push(r.clone()),
            }
        }
        for (word, repetition_count) in repetition {
            let leaf = self.build_leaf(&word, repetition_count as u32)?;
            terms.push(SaatNode::Word(leaf));
        }

        for term in &mut terms {
            term.skipto(DocNum(0), 0, self.env.inverted_bytes())?;
        }

        if terms.is_empty() {
            return Ok(());
        }

        let bloom_width = self.env.doctable_layout().bloom_width();
        let query_sig = query_signature(partial_prefix_terms.iter().map(|w: &String| &w.as_bytes()[..1.min(w.len())]), bloom_width);

        let timeout = options.timeout_msec;
        let result = relaxed_and(
            &mut terms,
            self.env.inverted_bytes(),
            options.relaxation_level,
            options.max_candidates,
            options.report_match_counts_only,
            options.scoring_needed,
            || timeout != 0 && start.elapsed().as_millis() as u64 >= timeout,
        )?;

        let phrase_mask: u32 = terms
            .iter()
            .enumerate()
            .filter(|(_, t)| matches!(t, SaatNode::Phrase(_)))
            .map(|(i, _)| 1u32 << i)
            .fold(0, |acc, bit| acc | bit);

        let mut query_words = Vec::new();
        for term in &terms {
            term.collect_leaf_terms(&mut query_words);
        }

        for (relaxation_used, block) in result.blocks.iter().enumerate() {
            for candidate in block {
                self.consider_candidate(
                    candidate.clone(),
                    relaxation_used as u8,
                    query_len,
                    query_sig,
                    phrase_mask,
                    &partial_prefix_terms,
                    &rank_only_terms,
                    &query_words,
                    was_shortened,
                    weight,
                    options,
                    topk,
                )?;
            }
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn consider_candidate(
        &self,
        mut candidate: Candidate,
        relaxation_used: u8,
        query_len: usize,
        query_sig: u64,
        phrase_mask: u32,
        partial_prefix_terms: &[String],
        rank_only_terms: &[RankOnlyTerm],
        query_words: &[&str],
        was_shortened: bool,
        weight: f64,
        options: &Options,
        topk: &mut TopK,
    ) -> Result<()> {
        let doc_entry = doctable::entry_at(self.env.doctable_bytes(), self.env.doctable_layout(), candidate.doc.0)?;
        let doc_text = forward_field(self.env.forward_bytes(), doc_entry.forward_offset as usize, 0).unwrap_or(b"");
        let doc_words: Vec<&[u8]> = doc_text.split(|&b| b == b' ').filter(|w| !w.is_empty()).collect();

        let matched_terms = candidate.terms_matched_bits.count_ones() as usize;
        let terms_missing = query_len.saturating_sub(matched_terms);
        let classifier_score = if options.classifier_mode != ClassifierMode::Off {
            let (matched, doc_extent) = match options.classifier_mode {
                ClassifierMode::IdfDolm | ClassifierMode::IdfJaccard => {
                    let idf_sum_matched: f64 = candidate.qidf.iter().sum();
                    let idf_sum_doc: f64 = doc_words
                        .iter()
                        .filter_map(|w| vocab::lookup(self.env.vocab_bytes(), self.env.vocab_layout(), *w).ok().flatten())
                        .map(|entry| vocab::idf_from_quantized(entry.quantized_idf, self.env.num_documents()))
                        .sum();
                    (idf_sum_matched, idf_sum_doc)
                }
                _ => (matched_terms as f64, doc_words.len() as f64),
            };
            Some(classifier::lexical_similarity(
                options.classifier_mode,
                &classifier::DolmInputs {
                    matched,
                    doc_extent,
                    insertions: candidate.intervening_words as f64,
                    missing: terms_missing as f64,
                    // No per-pair out-of-order signal is tracked on the
                    // candidate; the full-sequence check below already
                    // captures the common in-order case.
                    out_of_order: 0.0,
                },
            ))
        } else {
            None
        };

        let street_number_ok = street_number_check(options, &doc_words);
        let partial_prefix_ok = partial_prefix_terms.iter().all(|prefix| {
            doc_words.iter().any(|w| w.starts_with(prefix.as_bytes()))
        });

        let ctx = FilterContext {
            doc: &doc_entry,
            query_signature: query_sig,
            query_len,
            relaxation_used,
            repeated_word_count: if was_shortened { 0 } else { matched_terms },
            geo_ok: geo_ok(options, &doc_entry),
            classifier_score,
            partial_prefix_ok,
            street_number_ok,
        };
        if filters::evaluate(&ctx, options).is_some() {
            return Ok(());
        }

        let phrase_matched = phrase_mask != 0 && candidate.terms_matched_bits & phrase_mask == phrase_mask;
        // Full-order sequencing isn't independently reconstructed from the
        // candidate's bitmask; approximated here as "every term matched",
        // which is the common case `in_seq` actually fires for in practice.
        let in_sequence = terms_missing == 0;
        candidate.match_flags = classifier::match_flags(terms_missing, query_len, phrase_matched, in_sequence);

        let primacy = doc_words.first().is_some_and(|&first| query_words.iter().any(|w| w.as_bytes() == first));
        let rank_ctx = RankContext {
            doc: &doc_entry,
            query_len,
            avg_doc_length: self.env.avg_doc_length(),
            total_docs: self.env.num_documents(),
            terms_missing,
            primacy,
            geo_proximity: if options.location_lat.is_some() { 1.0 } else { 0.0 },
        };
        let mut score = rank::score(&mut candidate, &rank_ctx, options) * weight;
        if !rank_only_terms.is_empty() {
            score *= 1.0 + rank_only_terms.len() as f64 * 0.01;
        }
        if let Some(classifier_score) = classifier_score {
            score = options.cf_coeffs[0] * classifier_score + options.cf_coeffs[2] * doc_entry.score;
        }
        candidate.score = score;
        topk.offer(candidate);
        Ok(())
    }

    fn build_leaf(&self, term: &str, repetition_count: u32) -> Result<WordLeaf> {
        match vocab::lookup(self.env.vocab_bytes(), self.env.vocab_layout(), term.as_bytes())? {
            Some(entry) => {
                let qidf = vocab::idf_from_quantized(entry.quantized_idf, self.env.num_documents());
                Ok(WordLeaf::new(term, entry.occurrence_count, qidf, repetition_count, entry.payload))
            }
            None => Ok(WordLeaf::new(term, 0, 0.0, repetition_count, Payload::Offset(0))),
        }
    }

    fn build_leaves(&self, words: &[String]) -> Result<Vec<WordLeaf>> {
        words.iter().map(|w| self.build_leaf(w, 1)).collect()
    }
}

fn geo_ok(options: &Options, _doc: &DoctableEntry) -> bool {
    // Geo coordinates are not modeled in the doctable layout this crate
    // packs (spec §4.4's geo filter needs a per-doc lat/long pair that
    // lives in an extra forward-file column, not the fixed doctable
    // record); absent `geo_filter_radius`, the filter is a no-op.
    options.geo_filter_radius.is_none() || options.location_lat.is_none()
}

fn street_number_check(options: &Options, doc_words: &[&[u8]]) -> bool {
    if options.street_address_processing != crate::options::StreetAddressProcessing::StripAndEnforce {
        return true;
    }
    doc_words.iter().any(|w| {
        std::str::from_utf8(w).ok().and_then(|s| street::is_street_number(s, false)).is_some()
    })
}

/// Extract field `index` (0-based, TAB-separated) of the forward-file
/// record starting at `offset`, not including the terminating LF.
fn forward_field(forward: &[u8], offset: usize, index: usize) -> Option<&[u8]> {
    let rest = forward.get(offset..)?;
    let end = rest.iter().position(|&b| b == b'\n').unwrap_or(rest.len());
    let record = &rest[..end];
    record.split(|&b| b == b'\t').nth(index)
}

fn dedup(results: &mut Vec<SearchResult>, policy: crate::options::DuplicateHandling) {
    use crate::options::DuplicateHandling;
    match policy {
        DuplicateHandling::None => {}
        DuplicateHandling::Adjacent => {
            results.dedup_by(|a, b| a.display_text == b.display_text);
        }
        DuplicateHandling::Global => {
            let mut seen = std::collections::HashSet::new();
            results.retain(|r| seen.insert(r.display_text.clone()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::doctable::Layout as DtLayout;
    use crate::index::vocab::{encode_record, VocabLayout};
    use std::io::Write;

    fn write_index(dir: &std::path::Path) {
        let layout = DtLayout::reference();
        let mut doctable = Vec::new();
        // doc 0: "red car" at forward offset 0
        doctable.extend_from_slice(&layout.pack(2, 0, 0.5, u64::MAX).to_le_bytes());
        // doc 1: "blue bike" at forward offset 8
        doctable.extend_from_slice(&layout.pack(2, 8, 0.25, u64::MAX).to_le_bytes());

        let vocab_layout = VocabLayout { term_max_len: 15 };
        let mut vocab = Vec::new();
        vocab.extend(encode_record(&vocab_layout, b"red", 1, 100, Payload::Inline { doc: DocNum(0), wpos: 0 }));
        vocab.extend(encode_record(&vocab_layout, b"car", 1, 100, Payload::Inline { doc: DocNum(0), wpos: 1 }));
        vocab.extend(encode_record(&vocab_layout, b"blue", 1, 100, Payload::Inline { doc: DocNum(1), wpos: 0 }));

        let forward = b"red car\nblue bike\n".to_vec();

        let header = format!(
            "Index_format: 2\nQBASHER version: 9.9\nQuery_meta_chars: %\"[]~/\nOther_token_breakers: \n\
             Size of .forward: {}\nSize of .dt: {}\nSize of .vocab: {}\n\
             Total postings: 3\nNumber of documents: 2\n\n",
            forward.len(),
            doctable.len(),
            vocab.len()
        );
        let mut inverted = header.into_bytes();
        inverted.extend_from_slice(&[0u8, 1, 0]);
        let marker = (inverted.len() as u64 + 8).to_le_bytes();
        inverted.extend_from_slice(&marker);

        std::fs::File::create(dir.join("idx.if")).unwrap().write_all(&inverted).unwrap();
        std::fs::File::create(dir.join("idx.forward")).unwrap().write_all(&forward).unwrap();
        std::fs::File::create(dir.join("idx.vocab")).unwrap().write_all(&vocab).unwrap();
        std::fs::File::create(dir.join("idx.dt")).unwrap().write_all(&doctable).unwrap();
    }

    #[test]
    fn single_word_query_finds_the_matching_document() {
        let dir = tempfile::tempdir().unwrap();
        write_index(dir.path());
        let env = IndexEnvironment::open(&dir.path().join("idx")).unwrap();
        let engine = QueryEngine::new(env);
        let options = Options::default();
        let results = engine.query("red", &options).unwrap();
        assert!(!results.is_empty());
        assert_eq!(results[0].doc, DocNum(0));
    }

    #[test]
    fn two_word_and_query_requires_both_terms() {
        let dir = tempfile::tempdir().unwrap();
        write_index(dir.path());
        let env = IndexEnvironment::open(&dir.path().join("idx")).unwrap();
        let engine = QueryEngine::new(env);
        let options = Options::default();
        let results = engine.query("red car", &options).unwrap();
        assert_eq!(results.iter().map(|r| r.doc).collect::<Vec<_>>(), vec![DocNum(0)]);
    }

    #[test]
    fn multi_query_fallback_runs_second_variant_when_first_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        write_index(dir.path());
        let env = IndexEnvironment::open(&dir.path().join("idx")).unwrap();
        let engine = QueryEngine::new(env);
        let options = Options::default();
        let results = engine.multi_query("zzzznotfound\t\t1.0\tN<1\nblue", &options).unwrap();
        assert_eq!(results.iter().map(|r| r.doc).collect::<Vec<_>>(), vec![DocNum(1)]);
    }
}
