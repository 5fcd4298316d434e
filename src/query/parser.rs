//! Single-query parsing (spec §4.6/§9): split a raw query string into
//! top-level terms — bare words (AND-ed), `"…"` phrases, `[…]` disjunctions,
//! `/word` partial-prefix terms, `~word`/`~"…"` rank-only terms — plus the
//! optional leading `>` line-prefix marker.

use crate::preprocess::{maxwellize, normalize_term, tokenize};

/// One top-level term as produced by the parser, before it's turned into a
/// SAAT node (phrases/disjunctions still need per-child vocab lookups to
/// build their leaves).
#[derive(Debug, Clone, PartialEq)]
pub enum Term {
    Word(String),
    Phrase(Vec<String>),
    Disjunction(Vec<String>),
    PartialPrefix(String),
    RankOnly(RankOnlyTerm),
}

#[derive(Debug, Clone, PartialEq)]
pub enum RankOnlyTerm {
    Word(String),
    Phrase(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParsedQuery {
    pub terms: Vec<Term>,
    pub line_prefix: bool,
}

/// Parse `query` into top-level terms using the index's meta/breaker
/// character tables and normalization settings. Unknown trailing meta
/// characters with nothing to apply to (e.g. a lone `"` never closed) are
/// treated as literal word text, matching a tolerant hand-written parser
/// rather than rejecting the query outright.
pub fn parse(
    query: &str,
    is_meta: impl Fn(u8) -> bool + Copy,
    is_breaker: impl Fn(u8) -> bool + Copy,
    conflate_accents: bool,
) -> ParsedQuery {
    let mut query = query;
    let mut line_prefix = false;
    if let Some(rest) = query.strip_prefix('>') {
        line_prefix = true;
        query = rest;
    }

    let tokens = tokenize(query, is_meta, is_breaker);
    let mut terms = Vec::new();
    let mut i = 0;
    while i < tokens.len() {
        let tok = tokens[i].as_str();
        match tok {
            "\"" => {
                let (phrase, consumed) = collect_until(&tokens, i + 1, "\"", conflate_accents);
                terms.push(Term::Phrase(phrase));
                i += consumed + 2;
            }
            "[" => {
                let (words, consumed) = collect_until(&tokens, i + 1, "]", conflate_accents);
                terms.push(Term::Disjunction(words));
                i += consumed + 2;
            }
            "/" => {
                if let Some(next) = tokens.get(i + 1) {
                    terms.push(Term::PartialPrefix(clean(next, conflate_accents)));
                    i += 2;
                } else {
                    i += 1;
                }
            }
            "~" => {
                if tokens.get(i + 1).map(String::as_str) == Some("\"") {
                    let (phrase, consumed) = collect_until(&tokens, i + 2, "\"", conflate_accents);
                    terms.push(Term::RankOnly(RankOnlyTerm::Phrase(phrase)));
                    i += consumed + 3;
                } else if let Some(next) = tokens.get(i + 1) {
                    terms.push(Term::RankOnly(RankOnlyTerm::Word(clean(next, conflate_accents))));
                    i += 2;
                } else {
                    i += 1;
                }
            }
            other => {
                terms.push(Term::Word(clean(other, conflate_accents)));
                i += 1;
            }
        }
    }

    ParsedQuery { terms, line_prefix }
}

fn clean(raw: &str, conflate_accents: bool) -> String {
    normalize_term(&maxwellize(raw), conflate_accents)
}

/// Collect tokens from `start` up to (not including) the first occurrence
/// of `closing`, returning the cleaned words and how many tokens (not
/// counting the closer) were consumed. If `closing` never appears, consumes
/// to the end of the token stream.
fn collect_until(tokens: &[String], start: usize, closing: &str, conflate_accents: bool) -> (Vec<String>, usize) {
    let mut words = Vec::new();
    let mut i = start;
    while i < tokens.len() && tokens[i] != closing {
        words.push(clean(&tokens[i], conflate_accents));
        i += 1;
    }
    (words, i - start)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_meta(b: u8) -> bool {
        b"%\"[]~/".contains(&b)
    }
    fn is_breaker(b: u8) -> bool {
        b == b' '
    }

    #[test]
    fn bare_words_become_separate_word_terms() {
        let q = parse("red car", is_meta, is_breaker, false);
        assert_eq!(q.terms, vec![Term::Word("red".into()), Term::Word("car".into())]);
    }

    #[test]
    fn quoted_text_becomes_a_phrase_term() {
        let q = parse("\"hey jude\"", is_meta, is_breaker, false);
        assert_eq!(q.terms, vec![Term::Phrase(vec!["hey".into(), "jude".into()])]);
    }

    #[test]
    fn bracketed_text_becomes_a_disjunction_term() {
        let q = parse("[cat dog]", is_meta, is_breaker, false);
        assert_eq!(q.terms, vec![Term::Disjunction(vec!["cat".into(), "dog".into()])]);
    }

    #[test]
    fn slash_prefix_becomes_a_partial_prefix_term() {
        let q = parse("/car", is_meta, is_breaker, false);
        assert_eq!(q.terms, vec![Term::PartialPrefix("car".into())]);
    }

    #[test]
    fn tilde_prefix_becomes_a_rank_only_word_term() {
        let q = parse("~car", is_meta, is_breaker, false);
        assert_eq!(q.terms, vec![Term::RankOnly(RankOnlyTerm::Word("car".into()))]);
    }

    #[test]
    fn tilde_quote_becomes_a_rank_only_phrase_term() {
        let q = parse("~\"hey jude\"", is_meta, is_breaker, false);
        assert_eq!(q.terms, vec![Term::RankOnly(RankOnlyTerm::Phrase(vec!["hey".into(), "jude".into()]))]);
    }

    #[test]
    fn leading_angle_bracket_sets_line_prefix_and_is_stripped() {
        let q = parse(">red car", is_meta, is_breaker, false);
        assert!(q.line_prefix);
        assert_eq!(q.terms, vec![Term::Word("red".into()), Term::Word("car".into())]);
    }

    #[test]
    fn mixed_query_combines_all_term_kinds() {
        let q = parse("red \"fast car\" [blue green] /truck ~suv", is_meta, is_breaker, false);
        assert_eq!(
            q.terms,
            vec![
                Term::Word("red".into()),
                Term::Phrase(vec!["fast".into(), "car".into()]),
                Term::Disjunction(vec!["blue".into(), "green".into()]),
                Term::PartialPrefix("truck".into()),
                Term::RankOnly(RankOnlyTerm::Word("suv".into())),
            ]
        );
    }
}
