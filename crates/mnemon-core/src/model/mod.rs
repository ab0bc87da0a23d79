//! Data model: insights, edges, and the rules that govern them.

mod edge;
mod insight;

pub use edge::{Edge, EdgeKey, EdgeMetadata, EdgeType};
pub use insight::{Category, Insight, MAX_CONTENT_BYTES, MAX_ENTITIES, MAX_ENTITY_BYTES, MAX_TAGS, MAX_TAG_BYTES};

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Validation failures for user-supplied insight/edge fields.
///
/// These never mutate state; the caller's input is rejected before any
/// store interaction begins.
#[non_exhaustive]
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("content exceeds {MAX_CONTENT_BYTES} bytes")]
    ContentTooLong,

    #[error("importance must be in 1..=5, got {0}")]
    ImportanceOutOfRange(u8),

    #[error("unknown category {0:?}")]
    UnknownCategory(String),

    #[error("unknown edge type {0:?}")]
    UnknownEdgeType(String),

    #[error("edge weight must be finite, got {0}")]
    WeightNotFinite(f64),

    #[error("too many tags: {0} > {MAX_TAGS}")]
    TooManyTags(usize),

    #[error("tag exceeds {MAX_TAG_BYTES} bytes")]
    TagTooLong,

    #[error("too many entities: {0} > {MAX_ENTITIES}")]
    TooManyEntities(usize),

    #[error("entity exceeds {MAX_ENTITY_BYTES} bytes")]
    EntityTooLong,

    #[error("store name {0:?} does not match [A-Za-z0-9][A-Za-z0-9_-]*")]
    InvalidStoreName(String),
}

/// Format a timestamp the way every persisted field expects: second
/// precision, `Z`-suffixed, no fractional component.
pub fn format_timestamp(t: DateTime<Utc>) -> String {
    t.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// Parse an RFC-3339 timestamp as stored by [`format_timestamp`].
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Render a float with exactly four decimal digits, as required for
/// values embedded in edge metadata.
pub fn format_float(v: f64) -> String {
    format!("{v:.4}")
}

/// Base weight contributed by an insight's `importance` to its
/// effective-importance score.
pub fn base_weight(importance: u8) -> f64 {
    match importance {
        5 => 1.0,
        4 => 0.8,
        3 => 0.5,
        2 => 0.3,
        _ => 0.15,
    }
}

/// Whether an insight is immune to auto-prune regardless of its
/// effective importance.
pub fn is_immune(importance: u8, access_count: u32) -> bool {
    importance >= 4 || access_count >= 3
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_weight_matches_table() {
        assert_eq!(base_weight(5), 1.0);
        assert_eq!(base_weight(4), 0.8);
        assert_eq!(base_weight(3), 0.5);
        assert_eq!(base_weight(2), 0.3);
        assert_eq!(base_weight(1), 0.15);
        assert_eq!(base_weight(0), 0.15);
    }

    #[test]
    fn immunity_rule() {
        assert!(is_immune(4, 0));
        assert!(is_immune(5, 0));
        assert!(is_immune(1, 3));
        assert!(!is_immune(3, 2));
    }

    #[test]
    fn timestamp_roundtrip() {
        let now = Utc::now().date_naive().and_hms_opt(12, 30, 45).unwrap().and_utc();
        let s = format_timestamp(now);
        assert!(s.ends_with('Z'));
        assert_eq!(parse_timestamp(&s), Some(now));
    }

    #[test]
    fn float_formatting_has_four_decimals() {
        assert_eq!(format_float(0.333_333), "0.3333");
        assert_eq!(format_float(1.0), "1.0000");
    }
}
