//! Query intent classification and per-intent edge-type weights.

use std::sync::LazyLock;

use regex::Regex;

use crate::model::EdgeType;

static WHY_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(why|reason|because|cause|motivation|rationale)\b").unwrap());
static WHEN_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(when|time|date|before|after|during|timeline|history|sequence)\b").unwrap()
});
static ENTITY_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(what is|who is|tell me about|describe|about)\b").unwrap());

/// Coarse classification of what a recall query is asking for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Intent {
    Why,
    When,
    Entity,
    General,
}

impl serde::Serialize for Intent {
    fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(self.as_str())
    }
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::Why => "WHY",
            Intent::When => "WHEN",
            Intent::Entity => "ENTITY",
            Intent::General => "GENERAL",
        }
    }

    /// Parse a user-supplied `--intent` override.
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "WHY" => Some(Intent::Why),
            "WHEN" => Some(Intent::When),
            "ENTITY" => Some(Intent::Entity),
            "GENERAL" => Some(Intent::General),
            _ => None,
        }
    }

    /// Edge-type weights used by beam traversal for this intent.
    pub fn weights(&self) -> [(EdgeType, f64); 4] {
        match self {
            Intent::Why => [
                (EdgeType::Causal, 0.70),
                (EdgeType::Temporal, 0.20),
                (EdgeType::Entity, 0.05),
                (EdgeType::Semantic, 0.05),
            ],
            Intent::When => [
                (EdgeType::Temporal, 0.65),
                (EdgeType::Causal, 0.15),
                (EdgeType::Entity, 0.10),
                (EdgeType::Semantic, 0.10),
            ],
            Intent::Entity => [
                (EdgeType::Entity, 0.55),
                (EdgeType::Semantic, 0.30),
                (EdgeType::Temporal, 0.05),
                (EdgeType::Causal, 0.10),
            ],
            Intent::General => [
                (EdgeType::Temporal, 0.25),
                (EdgeType::Semantic, 0.25),
                (EdgeType::Causal, 0.25),
                (EdgeType::Entity, 0.25),
            ],
        }
    }

    pub fn weight_for(&self, edge_type: EdgeType) -> f64 {
        self.weights().into_iter().find(|(t, _)| *t == edge_type).map(|(_, w)| w).unwrap_or(0.0)
    }

    /// `(beam_width, max_depth, max_visited)` for this intent's beam
    /// traversal.
    pub fn traversal_params(&self) -> (usize, usize, usize) {
        match self {
            Intent::Why => (15, 5, 500),
            Intent::When => (10, 5, 400),
            Intent::Entity => (10, 4, 400),
            Intent::General => (10, 4, 500),
        }
    }
}

/// Score each pattern class by match count; the highest strictly-positive
/// score wins, ties and all-zero default to [`Intent::General`].
pub fn detect_intent(query: &str) -> Intent {
    let why_score = WHY_PATTERN.find_iter(query).count();
    let when_score = WHEN_PATTERN.find_iter(query).count();
    let entity_score = ENTITY_PATTERN.find_iter(query).count();

    if why_score > when_score && why_score > entity_score && why_score > 0 {
        Intent::Why
    } else if when_score > why_score && when_score > entity_score && when_score > 0 {
        Intent::When
    } else if entity_score > 0 {
        Intent::Entity
    } else {
        Intent::General
    }
}
