//! Query normalization for fallback lookups
//!
//! Produces the canonical form used when the exact query finds nothing:
//! - Strip everything outside `[A-Za-z0-9\s]`
//! - Collapse runs of 3+ identical characters down to 2
//! - Trim surrounding whitespace
//!
//! The result never replaces what the user typed; it is only sent as a
//! second request and surfaced as a "did you mean" suggestion.

use std::sync::LazyLock;

use regex::Regex;

use crate::model::NormalizedQuery;

/// Characters the fallback query keeps
static DISALLOWED_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^A-Za-z0-9\s]").unwrap());

/// Longest run of one repeated character that survives normalization
const MAX_RUN: usize = 2;

/// Normalize raw query text. Pure, total and idempotent.
///
/// # Examples
///
/// ```
/// use risk_lookup::normalize;
///
/// assert_eq!(normalize("cooofffeee!!").as_str(), "cooffee");
/// assert_eq!(normalize("  Joe's  ").as_str(), "Joes");
/// ```
pub fn normalize(text: &str) -> NormalizedQuery {
    let stripped = DISALLOWED_RE.replace_all(text, "");
    let collapsed = collapse_runs(&stripped, MAX_RUN);
    NormalizedQuery(collapsed.trim().to_string())
}

/// Cap consecutive repeats of the same character at `max_run`
fn collapse_runs(s: &str, max_run: usize) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev: Option<char> = None;
    let mut run = 0usize;

    for c in s.chars() {
        if prev == Some(c) {
            run += 1;
        } else {
            prev = Some(c);
            run = 1;
        }
        if run <= max_run {
            out.push(c);
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_collapse_and_strip() {
        assert_eq!(normalize("cooofffeee!!").as_str(), "cooffee");
    }

    #[test]
    fn test_already_clean_is_unchanged() {
        assert_eq!(normalize("pzza").as_str(), "pzza");
        assert_eq!(normalize("coffee").as_str(), "coffee");
    }

    #[test]
    fn test_punctuation_only_becomes_empty() {
        assert!(normalize("!!!???").is_empty());
        assert!(normalize("").is_empty());
        assert!(normalize("   ").is_empty());
    }

    #[test]
    fn test_whitespace_runs_collapse_to_two() {
        assert_eq!(normalize("joe     coffee").as_str(), "joe  coffee");
    }

    #[test]
    fn test_stripping_can_join_runs() {
        // Removing the apostrophes yields "aaaa" which then collapses
        assert_eq!(normalize("a'a'a'a").as_str(), "aa");
    }

    #[test]
    fn test_non_ascii_letters_are_stripped() {
        assert_eq!(normalize("café").as_str(), "caf");
    }

    #[test]
    fn test_case_is_preserved() {
        assert_eq!(normalize("PIZZA Hut").as_str(), "PIZZA Hut");
    }

    proptest! {
        #[test]
        fn prop_normalize_is_idempotent(s in "\\PC{0,40}") {
            let once = normalize(&s);
            let twice = normalize(once.as_str());
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn prop_output_has_no_triple_runs(s in "[a-c !.]{0,40}") {
            let out = normalize(&s).into_inner();
            let chars: Vec<char> = out.chars().collect();
            prop_assert!(chars.windows(3).all(|w| !(w[0] == w[1] && w[1] == w[2])));
        }
    }
}
