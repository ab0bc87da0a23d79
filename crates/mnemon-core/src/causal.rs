//! Causal signal detection, direction, and sub-type classification.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

pub const MIN_CAUSAL_OVERLAP: f64 = 0.15;
pub const CAUSAL_LOOKBACK: usize = 10;
pub const MAX_CAUSAL_CANDIDATES: usize = 10;

/// Causal classification assigned to an accepted pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CausalSubType {
    Causes,
    Enables,
    Prevents,
}

impl CausalSubType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CausalSubType::Causes => "causes",
            CausalSubType::Enables => "enables",
            CausalSubType::Prevents => "prevents",
        }
    }
}

static CAUSAL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(because|therefore|due to|caused by|as a result|decided to|chosen because|so that|in order to|leads to|results in|enables|prevents|consequently|hence|thus)\b|(?i)\bthis (?:ensures|means)\b",
    )
    .unwrap()
});

static CAUSES_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(because|caused by|due to)\b").unwrap());
static ENABLES_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(so that|in order to|enables|leads to)\b").unwrap());
static PREVENTS_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(despite|prevented|prevents|blocked)\b").unwrap());

/// Whether `text` contains any causal-signal keyword.
pub fn has_causal_signal(text: &str) -> bool {
    CAUSAL_PATTERN.is_match(text)
}

/// Guess a sub-type from combined text, priority: prevents > enables >
/// causes (the default).
pub fn suggest_sub_type(text: &str) -> CausalSubType {
    if PREVENTS_PATTERN.is_match(text) {
        CausalSubType::Prevents
    } else if ENABLES_PATTERN.is_match(text) {
        CausalSubType::Enables
    } else {
        CausalSubType::Causes
    }
}

/// The first causal keyword found in `text`, if any.
pub fn find_causal_signal(text: &str) -> Option<String> {
    CAUSAL_PATTERN.find(text).map(|m| m.as_str().to_string())
}

/// `CAUSES_PATTERN`/`ENABLES_PATTERN`/`PREVENTS_PATTERN` are exposed for
/// completeness with the reference detector; `suggest_sub_type` is the
/// entry point edge generation actually uses.
pub fn causes_keyword_present(text: &str) -> bool {
    CAUSES_PATTERN.is_match(text)
}

/// Token overlap ratio: `|intersection| / max(|a|, |b|)`.
pub fn token_overlap(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(b).count() as f64;
    intersection / a.len().max(b.len()) as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::tokenize;

    #[test]
    fn causal_direction_scenario() {
        let cause = "Go compiles fast with static linking";
        let effect = "Chose Go because it compiles fast";

        assert!(!has_causal_signal(cause));
        assert!(has_causal_signal(effect));

        // tokens(cause) = {go, compiles, fast, static, linking}
        // tokens(effect) = {chose, go, because, compiles, fast}
        // intersection = {go, compiles, fast} -> 3 / max(5, 5) = 0.6
        let overlap = token_overlap(&tokenize(cause), &tokenize(effect));
        assert!((overlap - 0.6).abs() < 0.01, "overlap was {overlap}");
        assert!(overlap >= MIN_CAUSAL_OVERLAP);

        assert_eq!(suggest_sub_type(&format!("{effect} {cause}")), CausalSubType::Causes);
    }

    #[test]
    fn sub_type_priority_prevents_over_enables() {
        assert_eq!(suggest_sub_type("this enables X but also prevents Y"), CausalSubType::Prevents);
        assert_eq!(suggest_sub_type("so that we can proceed"), CausalSubType::Enables);
        assert_eq!(suggest_sub_type("plain text"), CausalSubType::Causes);
    }

    #[test]
    fn token_overlap_zero_on_empty() {
        assert_eq!(token_overlap(&HashSet::new(), &tokenize("hello")), 0.0);
    }
}
