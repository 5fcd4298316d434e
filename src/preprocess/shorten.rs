//! Query shortening (spec §4.6, grounded on
//! `qbashq-lib/query_shortening.c`'s `create_candidate_generation_query`):
//! when a query has more distinct top-level single-word terms than
//! `query_shortening_threshold`, drop terms by an ordered chain of
//! heuristics until it's short enough, without ever touching phrases or
//! disjunctions.

/// Which heuristics fired while shortening a query, mirroring the original
/// engine's `shortening_codes` bitmask (useful for `-explain` style
/// diagnostics). A thin newtype over the bits rather than a dependency,
/// matching how match-flag bytes are handled elsewhere in this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ShorteningCodes(u32);

impl ShorteningCodes {
    pub const NOEXIST: ShorteningCodes = ShorteningCodes(1);
    pub const ALL_DIGITS: ShorteningCodes = ShorteningCodes(2);
    pub const HIGH_FREQ: ShorteningCodes = ShorteningCodes(4);

    pub fn empty() -> Self {
        ShorteningCodes(0)
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn contains(&self, other: ShorteningCodes) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOrAssign for ShorteningCodes {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// One top-level query term as seen by the shortener: phrases (`"..."`) and
/// disjunctions (`[...]`) are passed through untouched and never zapped.
#[derive(Debug, Clone)]
pub struct ShortenTerm {
    pub text: String,
    pub is_compound: bool,
}

pub struct ShorteningResult {
    pub kept: Vec<String>,
    pub codes: ShorteningCodes,
}

/// Below this occurrence count a term is considered too rare to be worth
/// zapping for being high-frequency (mirrors the original's `< 100` guard).
const HIGH_FREQ_FLOOR: u64 = 100;

/// Shorten `terms` down to at most `threshold` distinct single-word terms,
/// via: remove non-existent words (per `occurrence_count`), remove all-digit
/// words, then remove the highest-occurrence-frequency words. Repeated-word
/// removal is deliberately never applied — the original engine disabled it
/// because leaving duplicates in is cheaper than re-running candidate
/// generation without them.
///
/// `occurrence_count(term)` should return `None` for a term absent from the
/// vocabulary and `Some(count)` otherwise; it is only consulted for
/// single-word terms.
pub fn shorten(terms: &[ShortenTerm], threshold: usize, occurrence_count: impl Fn(&str) -> Option<u64>) -> ShorteningResult {
    let distinct_terms = count_distinct(terms);
    if threshold == 0 || distinct_terms <= threshold {
        return ShorteningResult { kept: terms.iter().map(|t| t.text.clone()).collect(), codes: ShorteningCodes::empty() };
    }

    let mut zapped = vec![false; terms.len()];
    let mut freaks = vec![0u64; terms.len()];
    let mut codes = ShorteningCodes::empty();
    let mut distinct_terms = distinct_terms;

    // 1. Remove non-existent words.
    for (i, term) in terms.iter().enumerate() {
        if term.is_compound {
            continue;
        }
        match occurrence_count(&term.text) {
            None => {
                zapped[i] = true;
                codes |= ShorteningCodes::NOEXIST;
                distinct_terms -= 1;
            }
            Some(count) => freaks[i] = count,
        }
    }

    // 2. Repeated-word removal: intentionally not implemented.

    // 3. Remove words which are all digits.
    if distinct_terms > threshold {
        for (i, term) in terms.iter().enumerate() {
            if zapped[i] || term.is_compound {
                continue;
            }
            if !term.text.is_empty() && term.text.bytes().all(|b| b.is_ascii_digit()) {
                zapped[i] = true;
                codes |= ShorteningCodes::ALL_DIGITS;
                distinct_terms -= 1;
                if distinct_terms <= threshold {
                    break;
                }
            }
        }
    }

    // 4. Remove the words with the highest occurrence frequency, most
    // frequent first, stopping once a term is too rare to bother with.
    if distinct_terms > threshold {
        let mut order: Vec<usize> = (0..terms.len()).collect();
        order.sort_by(|&a, &b| freaks[b].cmp(&freaks[a]));
        for i in order {
            if zapped[i] {
                continue;
            }
            if freaks[i] < HIGH_FREQ_FLOOR {
                break;
            }
            zapped[i] = true;
            codes |= ShorteningCodes::HIGH_FREQ;
            distinct_terms -= 1;
            if distinct_terms <= threshold {
                break;
            }
        }
    }

    let kept = terms.iter().zip(zapped.iter()).filter(|(_, z)| !**z).map(|(t, _)| t.text.clone()).collect();
    ShorteningResult { kept, codes }
}

fn count_distinct(terms: &[ShortenTerm]) -> usize {
    let mut distinct = 0;
    for (i, term) in terms.iter().enumerate() {
        let repeated = !term.is_compound && terms[..i].iter().any(|earlier| earlier.text == term.text);
        if !repeated {
            distinct += 1;
        }
    }
    distinct
}

fn word(text: &str) -> ShortenTerm {
    ShortenTerm { text: text.to_string(), is_compound: false }
}
