//! Transient-content quality heuristics for the remember pipeline.
//!
//! These are advisory only: callers surface the returned labels to the
//! user, they never block a write.

use std::sync::LazyLock;

use regex::Regex;

struct Pattern {
    re: Regex,
    label: &'static str,
}

static PATTERNS: LazyLock<Vec<Pattern>> = LazyLock::new(|| {
    vec![
        Pattern { re: Regex::new(r"i-[0-9a-f]{17}").unwrap(), label: "AWS instance ID" },
        Pattern { re: Regex::new(r"\d+ resources? total").unwrap(), label: "resource count" },
        Pattern {
            re: Regex::new(r"(?i)(?:all|every)\b.{0,30}\bverified").unwrap(),
            label: "verification receipt",
        },
        Pattern { re: Regex::new(r"(?i)state (?:is )?clean").unwrap(), label: "state observation" },
        Pattern {
            re: Regex::new(r"(?i)(?:deployed|completed|applied) via").unwrap(),
            label: "deployment receipt",
        },
        Pattern {
            re: Regex::new(r"(?i)\bline\s+\d+\b|\bL\d+\b").unwrap(),
            label: "line number reference",
        },
        Pattern {
            re: Regex::new(r"[\w./-]+\.\w{1,10}:\d+").unwrap(),
            label: "file:line reference",
        },
        Pattern {
            re: Regex::new(r"(?i)\d+\s+lines?(\s+changed)?\b").unwrap(),
            label: "line-count phrase",
        },
        Pattern {
            re: Regex::new(r"\d+\s*(?:->|→)\s*\d+").unwrap(),
            label: "numeric correction",
        },
    ]
});

/// Scan content for transient patterns, returning human-readable labels
/// for each matched category.
pub fn check_content_quality(content: &str) -> Vec<&'static str> {
    PATTERNS.iter().filter(|p| p.re.is_match(content)).map(|p| p.label).collect()
}
