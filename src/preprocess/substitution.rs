//! Regex-driven, language-keyed query substitution rules (spec §4.6,
//! grounded on `shared/substitutions.c`). A rule that fails to compile is
//! dropped with a [`crate::error::Severity::Warning`], not treated as
//! fatal — one bad rule shouldn't take down the whole rule set.

use std::collections::HashMap;

use regex::Regex;

use crate::error::{Error, ErrorKind};

pub struct Rule {
    pub pattern: Regex,
    pub replacement: String,
}

#[derive(Default)]
pub struct RuleSet {
    by_language: HashMap<String, Vec<Rule>>,
    /// Rules that failed to compile, kept for diagnostics (spec §7: dropped
    /// rules are reported as warnings, not silently discarded).
    pub warnings: Vec<Error>,
}

impl RuleSet {
    /// Parse rules out of a small text format: one rule per non-empty,
    /// non-`#`-prefixed line, `language\tpattern\treplacement`.
    pub fn parse(text: &str) -> Self {
        let mut set = RuleSet::default();
        for (lineno, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let mut fields = line.splitn(3, '\t');
            let (Some(language), Some(pattern), Some(replacement)) = (fields.next(), fields.next(), fields.next()) else {
                tracing::warn!(line = lineno + 1, "substitution rule is not language\\tpattern\\treplacement, dropping");
                set.warnings.push(Error::new(
                    ErrorKind::Parse,
                    format!("substitution rule line {} is not language\\tpattern\\treplacement", lineno + 1),
                ));
                continue;
            };
            match Regex::new(pattern) {
                Ok(compiled) => set.by_language.entry(language.to_string()).or_default().push(Rule {
                    pattern: compiled,
                    replacement: replacement.to_string(),
                }),
                Err(e) => {
                    tracing::warn!(line = lineno + 1, %pattern, error = %e, "substitution rule dropped, bad regex");
                    set.warnings.push(Error::new(
                        ErrorKind::Parse,
                        format!("substitution rule line {} dropped, bad regex: {e}", lineno + 1),
                    ));
                }
            }
        }
        set
    }

    /// Apply every rule for `language` (if any) to `query`, in file order.
    pub fn apply(&self, language: &str, query: &str) -> String {
        let Some(rules) = self.by_language.get(language) else {
            return query.to_string();
        };
        let mut current = query.to_string();
        for rule in rules {
            current = rule.pattern.replace_all(&current, rule.replacement.as_str()).into_owned();
        }
        current
    }
}
