use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ValidationError;

/// The four relationship kinds the graph knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeType {
    Temporal,
    Semantic,
    Causal,
    Entity,
}

impl EdgeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeType::Temporal => "temporal",
            EdgeType::Semantic => "semantic",
            EdgeType::Causal => "causal",
            EdgeType::Entity => "entity",
        }
    }

    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        match s {
            "temporal" => Ok(EdgeType::Temporal),
            "semantic" => Ok(EdgeType::Semantic),
            "causal" => Ok(EdgeType::Causal),
            "entity" => Ok(EdgeType::Entity),
            other => Err(ValidationError::UnknownEdgeType(other.to_string())),
        }
    }
}

impl std::fmt::Display for EdgeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Typed edge metadata. Modeled as a struct of known keys rather than an
/// open string map so writers can't introduce a typo'd key; serializes
/// to a JSON object carrying only the keys that are set.
///
/// Field names persist as-is (no camelCase rename) — the metadata
/// column's keys are a spec-mandated contract, not CLI-output surface.
/// Floats (`cosine`, `hours_diff`, `overlap`) are stored as
/// [`super::format_float`]-formatted strings so the persisted value
/// always carries exactly four decimal digits, matching every other
/// edge-metadata float.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EdgeMetadata {
    // Declared in the alphabetical order of their serialized field
    // names so a struct-order serialization is already the canonical,
    // sorted-key encoding the persisted column requires.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cosine: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direction: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hours_diff: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overlap: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub_type: Option<String>,
}

impl EdgeMetadata {
    /// Canonical JSON encoding used for the stored `metadata` column:
    /// only present keys, in sorted order.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    pub fn from_json(s: &str) -> Self {
        serde_json::from_str(s).unwrap_or_default()
    }
}

/// A directed typed relation between two insights.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    pub source_id: String,
    pub target_id: String,
    pub edge_type: EdgeType,
    pub weight: f64,
    #[serde(default)]
    pub metadata: EdgeMetadata,
    pub created_at: DateTime<Utc>,
}

/// The edge primary key: (source, target, type). Reinserting a key
/// replaces the prior row.
pub type EdgeKey = (String, String, EdgeType);

impl Edge {
    pub fn new(
        source_id: impl Into<String>,
        target_id: impl Into<String>,
        edge_type: EdgeType,
        weight: f64,
        metadata: EdgeMetadata,
    ) -> Result<Self, ValidationError> {
        if !weight.is_finite() {
            return Err(ValidationError::WeightNotFinite(weight));
        }
        Ok(Self {
            source_id: source_id.into(),
            target_id: target_id.into(),
            edge_type,
            weight,
            metadata,
            created_at: Utc::now(),
        })
    }

    pub fn key(&self) -> EdgeKey {
        (self.source_id.clone(), self.target_id.clone(), self.edge_type)
    }

    /// The id on the other end of this edge from `node_id`, if the edge
    /// touches it at all.
    pub fn other_end(&self, node_id: &str) -> Option<&str> {
        if self.source_id == node_id {
            Some(&self.target_id)
        } else if self.target_id == node_id {
            Some(&self.source_id)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edge_type_roundtrip() {
        for t in [EdgeType::Temporal, EdgeType::Semantic, EdgeType::Causal, EdgeType::Entity] {
            assert_eq!(EdgeType::parse(t.as_str()).unwrap(), t);
        }
        assert!(EdgeType::parse("narrative").is_err());
    }

    #[test]
    fn metadata_json_is_sorted_and_sparse() {
        let meta = EdgeMetadata {
            sub_type: Some("backbone".into()),
            direction: Some("precedes".into()),
            ..Default::default()
        };
        assert_eq!(meta.to_json(), r#"{"direction":"precedes","sub_type":"backbone"}"#);
    }

    #[test]
    fn metadata_floats_persist_with_four_decimals() {
        let meta = EdgeMetadata {
            cosine: Some(crate::model::format_float(0.9998)),
            overlap: Some(crate::model::format_float(0.6)),
            hours_diff: Some(crate::model::format_float(0.5)),
            ..Default::default()
        };
        assert_eq!(meta.to_json(), r#"{"cosine":"0.9998","hours_diff":"0.5000","overlap":"0.6000"}"#);
    }

    #[test]
    fn weight_must_be_finite() {
        let err = Edge::new("a", "b", EdgeType::Temporal, f64::NAN, EdgeMetadata::default())
            .unwrap_err();
        matches!(err, ValidationError::WeightNotFinite(_));
    }

    #[test]
    fn other_end_resolves_either_direction() {
        let e = Edge::new("a", "b", EdgeType::Temporal, 1.0, EdgeMetadata::default()).unwrap();
        assert_eq!(e.other_end("a"), Some("b"));
        assert_eq!(e.other_end("b"), Some("a"));
        assert_eq!(e.other_end("c"), None);
    }
}
