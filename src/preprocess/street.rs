//! Street-address token grammar (spec §4.6, grounded on
//! `utils/street_addresses.c`): recognizing house-number tokens that mix
//! digits with unit numbers or ranges, removing suite/unit/apartment
//! markers, and stripping ZIP+4 suffixes.

/// Parse a single token as a street (house) number, returning the house
/// number as an integer if it matches one of:
///   1. all digits
///   2. `digits{z|y}digits` — a combined unit/house-number pair, where `z`
///      stands in for `/` and `y` for `-` (the original engine's own
///      encoding for slash/hyphen inside a single token)
///   3. a `#`/`n` prefix on any of the above
///   4. a trailing `bis`, `a`, `b`, or `c` suffix on any of the above
///
/// `unit_number_first` controls which side of a `z`/`y` split is the house
/// number versus the unit number: when true, the house number starts right
/// after the separator.
pub fn is_street_number(word: &str, unit_number_first: bool) -> Option<u64> {
    let mut wd = word.as_bytes();
    if wd.first() == Some(&b'#') || wd.first() == Some(&b'n') {
        wd = &wd[1..];
    }
    let mut len = wd.len();
    if len >= 4 && &wd[len - 3..] == b"bis" {
        len -= 3;
    } else if len >= 2 && matches!(wd[len - 1], b'a' | b'b' | b'c') {
        len -= 1;
    }
    if len == 0 {
        return None;
    }

    let mut housenum_start = 0usize;
    let mut i = 0usize;
    while i < len {
        let b = wd[i];
        if b.is_ascii_digit() {
            i += 1;
            continue;
        }
        if (b == b'z' || b == b'y') && i > 0 && i + 1 < wd.len() && wd[i + 1].is_ascii_digit() && housenum_start == 0 {
            if unit_number_first {
                housenum_start = i + 1;
            }
            i += 1;
            continue;
        }
        return None;
    }
    // Mirrors `strtol`, which stops at the first non-digit rather than
    // requiring the whole remaining slice to be numeric (so a leading
    // house number is returned even when a 'z'/'y' separator follows it).
    let digits_end = wd[housenum_start..].iter().take_while(|b| b.is_ascii_digit()).count();
    std::str::from_utf8(&wd[housenum_start..housenum_start + digits_end]).ok()?.parse::<u64>().ok()
}

/// Remove a `suite`/`unit`/`apt`/`apartment` token and the token immediately
/// following it (the unit number), the first time one is found. Tokens are
/// assumed already case-folded.
pub fn remove_suite_number(words: &mut Vec<String>) {
    if let Some(r) = words.iter().position(|w| matches!(w.as_str(), "suite" | "unit" | "apt" | "apartment")) {
        if r + 1 < words.len() {
            words.drain(r..r + 2);
        }
    }
}

/// Strip a ZIP+4 suffix (`90210y3456`, i.e. `90210-3456` with the hyphen
/// encoded as `y`) down to just the 5-digit ZIP, in place on the first
/// token that matches.
pub fn strip_zips(words: &mut [String]) {
    for word in words.iter_mut() {
        let bytes = word.as_bytes();
        if bytes.len() < 7 || !bytes[..5].iter().all(u8::is_ascii_digit) {
            continue;
        }
        if bytes[5] == b'y' && bytes.get(6).is_some_and(u8::is_ascii_digit) {
            word.truncate(5);
            return;
        }
    }
}

/// A single entry in a `street_specs_col` list: which column positions
/// (1-based, as in the forward file) carry street-address data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreetSpec {
    Single(i32),
    Range(i32, i32),
    /// Same-parity range, e.g. odd house numbers only: `a-b` where both
    /// ends share parity (used for one side of a street).
    SameParityRange(i32, i32),
}

/// Parse the `street_specs_col` option's small grammar: a comma-separated
/// list of `N`, `a:b` (inclusive column range), or `a-b` (same-parity
/// range).
pub fn parse_street_specs(spec: &str) -> Vec<StreetSpec> {
    let mut out = Vec::new();
    for field in spec.split(',').map(str::trim).filter(|f| !f.is_empty()) {
        if let Some((a, b)) = field.split_once(':') {
            if let (Ok(a), Ok(b)) = (a.trim().parse(), b.trim().parse()) {
                out.push(StreetSpec::Range(a, b));
                continue;
            }
        }
        if let Some((a, b)) = field.split_once('-') {
            if let (Ok(a), Ok(b)) = (a.trim().parse(), b.trim().parse()) {
                out.push(StreetSpec::SameParityRange(a, b));
                continue;
            }
        }
        if let Ok(n) = field.parse() {
            out.push(StreetSpec::Single(n));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_digit_token_is_a_plain_house_number() {
        assert_eq!(is_street_number("1600", false), Some(1600));
    }

    #[test]
    fn hash_and_n_prefixes_are_stripped() {
        assert_eq!(is_street_number("#1600", false), Some(1600));
        assert_eq!(is_street_number("n1600", false), Some(1600));
    }

    #[test]
    fn bis_and_letter_suffixes_are_stripped() {
        assert_eq!(is_street_number("12bis", false), Some(12));
        assert_eq!(is_street_number("12a", false), Some(12));
    }

    #[test]
    fn combined_unit_house_token_splits_on_separator_letter() {
        // "4z1600" means "4/1600" (unit 4, house 1600) with unit first.
        assert_eq!(is_street_number("4z1600", true), Some(1600));
        // With unit_number_first false, the house number is the leading run.
        assert_eq!(is_street_number("4z1600", false), Some(4));
    }

    #[test]
    fn non_numeric_token_is_not_a_street_number() {
        assert_eq!(is_street_number("main", false), None);
    }

    #[test]
    fn removes_suite_token_and_its_number() {
        let mut words: Vec<String> = ["100", "main", "st", "suite", "200"].iter().map(|s| s.to_string()).collect();
        remove_suite_number(&mut words);
        assert_eq!(words, vec!["100", "main", "st"]);
    }

    #[test]
    fn leaves_words_unchanged_when_no_suite_marker_present() {
        let mut words: Vec<String> = ["100", "main", "st"].iter().map(|s| s.to_string()).collect();
        remove_suite_number(&mut words);
        assert_eq!(words.len(), 3);
    }

    #[test]
    fn strips_zip_plus_four_down_to_five_digits() {
        let mut words = vec!["98052y1234".to_string()];
        strip_zips(&mut words);
        assert_eq!(words[0], "98052");
    }

    #[test]
    fn parses_street_specs_grammar() {
        let specs = parse_street_specs("3, 5:7, 10-20");
        assert_eq!(specs, vec![StreetSpec::Single(3), StreetSpec::Range(5, 7), StreetSpec::SameParityRange(10, 20)]);
    }
}
