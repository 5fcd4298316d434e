//! Multi-Query Orchestrator (C6, spec §4.6): parses a multi-query string
//! into LF/0x1E-terminated variant records, each with up to four
//! TAB-separated fields (`query`, `options`, `weight`, `post_test`), and
//! drives per-variant evaluation with short-circuiting post-tests.

use crate::error::{Error, ErrorKind, Result};
use crate::options::Options;

pub const VARIANT_SEPARATOR: char = '\u{1E}';

#[derive(Debug, Clone, PartialEq)]
pub enum PostTest {
    /// `N<criterion`: keep going only while the accumulated result count is
    /// below `criterion`.
    ResultCount(usize),
    /// `H<criterion`: keep going only while the highest score seen so far is
    /// below `criterion`, per spec §4.6's documented semantics (the C source
    /// itself tests result count here too — a divergence noted in
    /// DESIGN.md — this crate follows the documented behavior).
    HighestScore(f64),
}

impl PostTest {
    fn parse(raw: &str) -> Result<Self> {
        let (kind, value) = raw.split_once('<').ok_or_else(|| {
            Error::new(ErrorKind::Parse, format!("post_test '{raw}' is not N<n or H<n"))
        })?;
        let parse_err = || Error::new(ErrorKind::InvalidArgument, format!("bad post_test criterion in '{raw}'"));
        match kind {
            "N" => Ok(PostTest::ResultCount(value.parse().map_err(|_| parse_err())?)),
            "H" => Ok(PostTest::HighestScore(value.parse().map_err(|_| parse_err())?)),
            _ => Err(Error::new(ErrorKind::Parse, format!("post_test '{raw}' must start with N< or H<"))),
        }
    }

    /// `true` means "stop here, don't run the next variant".
    fn should_stop(&self, result_count: usize, highest_score: f64) -> bool {
        match *self {
            PostTest::ResultCount(criterion) => !(result_count < criterion),
            PostTest::HighestScore(criterion) => !(highest_score < criterion),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Variant {
    pub query: String,
    pub option_overrides: Option<String>,
    pub weight: f64,
    pub post_test: Option<PostTest>,
}

/// Split a multi-query string into its variant records (LF- or
/// 0x1E-terminated) and parse each one's TAB-separated fields.
pub fn parse_variants(raw: &str) -> Result<Vec<Variant>> {
    raw.split(|c: char| c == '\n' || c == VARIANT_SEPARATOR)
        .map(str::trim_end_matches('\r'))
        .filter(|line| !line.is_empty())
        .map(parse_one_variant)
        .collect()
}

fn parse_one_variant(line: &str) -> Result<Variant> {
    let mut fields = line.split('\t');
    let query = fields.next().unwrap_or("").to_string();
    let option_overrides = fields.next().filter(|s| !s.is_empty()).map(str::to_string);
    let weight = match fields.next() {
        Some(w) if !w.is_empty() => w
            .parse::<f64>()
            .map_err(|_| Error::new(ErrorKind::InvalidArgument, format!("bad weight '{w}' in variant '{line}'")))?,
        _ => 1.0,
    };
    let post_test = match fields.next() {
        Some(pt) if !pt.is_empty() => Some(PostTest::parse(pt)?),
        _ => None,
    };
    Ok(Variant { query, option_overrides, weight, post_test })
}

/// Build the effective per-variant [`Options`] view, applying the variant's
/// overrides (if any) as a copy-on-write overlay over `base` (spec §9
/// "Option overlays": discarded at variant end, never mutates `base`).
pub fn variant_options(base: &Options, variant: &Variant) -> Result<Options> {
    match &variant.option_overrides {
        Some(overrides) => base.overlay(overrides),
        None => Ok(base.clone()),
    }
}

/// Decide whether to continue on to the next variant, given the results
/// accumulated so far. Variants without a post-test always continue.
pub fn continue_after(variant: &Variant, result_count: usize, highest_score: f64) -> bool {
    match &variant.post_test {
        None => true,
        Some(test) => !test.should_stop(result_count, highest_score),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_simple_single_field_variant() {
        let variants = parse_variants("cat").unwrap();
        assert_eq!(variants, vec![Variant { query: "cat".into(), option_overrides: None, weight: 1.0, post_test: None }]);
    }

    #[test]
    fn parses_all_four_tab_separated_fields() {
        let variants = parse_variants("cat\tmax_to_show=5\t0.9\tN<1").unwrap();
        let v = &variants[0];
        assert_eq!(v.query, "cat");
        assert_eq!(v.option_overrides.as_deref(), Some("max_to_show=5"));
        assert_eq!(v.weight, 0.9);
        assert_eq!(v.post_test, Some(PostTest::ResultCount(1)));
    }

    #[test]
    fn splits_on_newline_and_record_separator() {
        let variants = parse_variants("cat\u{1E}dog\nbird").unwrap();
        assert_eq!(variants.iter().map(|v| v.query.as_str()).collect::<Vec<_>>(), vec!["cat", "dog", "bird"]);
    }

    #[test]
    fn fallback_stops_once_prior_variant_already_has_enough_results() {
        let variant = Variant { query: "dog".into(), option_overrides: None, weight: 0.9, post_test: Some(PostTest::ResultCount(1)) };
        assert!(continue_after(&variant, 0, 0.0));
        assert!(!continue_after(&variant, 1, 0.0));
    }

    #[test]
    fn rejects_malformed_post_test() {
        assert!(parse_variants("cat\t\t1.0\tbogus").is_err());
    }
}
