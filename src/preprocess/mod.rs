//! Query preprocessing: tokenization, case/diacritic folding, and the small
//! `maxwellize` text cleanups applied before terms reach the parser (spec
//! §4.6).

pub mod shorten;
pub mod street;
pub mod substitution;

/// Split `query` into tokens using the index's declared token-breaker
/// table; breaker bytes are discarded, query-meta characters (`%"[]~/`)
/// are split off as their own one-byte tokens so the parser can see them.
/// `is_meta`/`is_breaker` are normally backed by
/// [`crate::index::IndexEnvironment::is_query_meta_char`]/`is_token_breaker`.
pub fn tokenize(query: &str, is_meta: impl Fn(u8) -> bool, is_breaker: impl Fn(u8) -> bool) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = Vec::new();
    for &byte in query.as_bytes() {
        if is_meta(byte) {
            if !current.is_empty() {
                tokens.push(String::from_utf8_lossy(&current).into_owned());
                current.clear();
            }
            tokens.push((byte as char).to_string());
        } else if is_breaker(byte) {
            if !current.is_empty() {
                tokens.push(String::from_utf8_lossy(&current).into_owned());
                current.clear();
            }
        } else {
            current.push(byte);
        }
    }
    if !current.is_empty() {
        tokens.push(String::from_utf8_lossy(&current).into_owned());
    }
    tokens
}

/// Lowercase and, if `conflate_accents` is set, strip common Latin-1
/// diacritics down to their base letter. Always length-non-increasing in
/// byte count, so downstream fixed-width buffers never need to grow
/// (spec §4.6, "diacritic folding... length-non-increasing").
pub fn normalize_term(term: &str, conflate_accents: bool) -> String {
    let lowered = term.to_lowercase();
    if !conflate_accents {
        return lowered;
    }
    lowered.chars().map(fold_accent).collect()
}

fn fold_accent(c: char) -> char {
    match c {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' => 'a',
        'è' | 'é' | 'ê' | 'ë' => 'e',
        'ì' | 'í' | 'î' | 'ï' => 'i',
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' => 'o',
        'ù' | 'ú' | 'û' | 'ü' => 'u',
        'ý' | 'ÿ' => 'y',
        'ñ' => 'n',
        'ç' => 'c',
        other => other,
    }
}

/// Strip a trailing possessive `'s` and any literal `%20` (an un-decoded
/// space from a URL-encoded query), matching the original engine's small
/// `maxwellize` cleanup pass.
pub fn maxwellize(term: &str) -> String {
    let stripped = term.strip_suffix("'s").unwrap_or(term);
    stripped.replace("%20", " ").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_lowercases_and_folds_accents() {
        assert_eq!(normalize_term("CAFÉ", true), "cafe");
        assert_eq!(normalize_term("CAFÉ", false), "café");
    }

    #[test]
    fn maxwellize_strips_possessive_and_percent20() {
        assert_eq!(maxwellize("mcdonald's"), "mcdonald");
        assert_eq!(maxwellize("foo%20bar"), "foo bar");
    }

    #[test]
    fn tokenize_splits_on_breakers_and_keeps_meta_chars() {
        let is_meta = |b: u8| b"%\"[]~/".contains(&b);
        let is_breaker = |b: u8| b == b' ';
        let tokens = tokenize("red \"fast car\"", is_meta, is_breaker);
        assert_eq!(tokens, vec!["red", "\"", "fast", "car", "\""]);
    }

    #[test]
    fn normalize_never_grows_byte_length() {
        for term in ["café", "naïve", "hello"] {
            assert!(normalize_term(term, true).len() <= term.len());
        }
    }
}
