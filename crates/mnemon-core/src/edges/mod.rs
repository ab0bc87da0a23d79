//! Edge generation pipeline run once per newly written insight:
//! entity extraction/merge, then temporal → entity → causal →
//! semantic link generators, in that fixed order.

mod causal;
mod entity;
mod semantic;
mod temporal;

pub use causal::{CausalCandidate, create_causal_edges, find_causal_candidates};
pub use entity::create_entity_edges;
pub use semantic::{
    AUTO_SEMANTIC_THRESHOLD, MAX_AUTO_SEMANTIC_EDGES, SemanticCandidate, create_semantic_edges,
    find_semantic_candidates,
};
pub use temporal::{MAX_PROXIMITY_EDGES, TEMPORAL_WINDOW_HOURS, create_temporal_edges};

use rusqlite::Connection;

use crate::entity::{extract_entities, merge_entities};
use crate::model::Insight;
use crate::store::queries;

/// Per-generator edge counts produced by [`link_insight`].
#[derive(Debug, Clone, Copy, Default)]
pub struct LinkCounts {
    pub temporal: i64,
    pub entity: i64,
    pub causal: i64,
    pub semantic: i64,
}

impl LinkCounts {
    pub fn total(&self) -> i64 {
        self.temporal + self.entity + self.causal + self.semantic
    }
}

/// Merge extracted entities into `insight` and persist them, then run
/// every edge generator against the up-to-date insight. Must be called
/// with `insight` already inserted in this transaction.
pub fn link_insight(conn: &Connection, insight: &mut Insight) -> LinkCounts {
    let extracted = extract_entities(&insight.content);
    let merged = merge_entities(&insight.entities, &extracted);
    if merged != insight.entities {
        insight.entities = merged;
        let _ = queries::update_entities(conn, &insight.id, &insight.entities);
    }

    LinkCounts {
        temporal: create_temporal_edges(conn, insight),
        entity: create_entity_edges(conn, insight),
        causal: create_causal_edges(conn, insight),
        semantic: create_semantic_edges(conn, insight),
    }
}
