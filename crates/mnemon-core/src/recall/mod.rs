//! Intent-aware recall: RRF anchor fusion, beam traversal, four-signal
//! reranking, and WHY-intent causal reordering.

mod anchors;
mod causal_order;
pub mod intent;
mod rerank;
mod traversal;

pub use anchors::{ANCHOR_TOP_K, RRF_K, VECTOR_SEARCH_MIN_SIM};
pub use causal_order::causal_topological_sort;
pub use intent::Intent;
pub use rerank::{RecallHit, Signals};
pub use traversal::beam_search_from_anchor;

use std::collections::HashMap;

use rusqlite::Connection;

use crate::store::queries;
use crate::vector::deserialize_vector;

/// Metadata about how a recall was computed, surfaced alongside
/// results for observability.
#[derive(Debug, Clone, serde::Serialize)]
pub struct RecallMeta {
    pub intent: Intent,
    pub intent_source: &'static str,
    pub anchor_count: usize,
    pub traversed: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<&'static str>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct RecallResult {
    pub results: Vec<RecallHit>,
    pub meta: RecallMeta,
}

/// Run the full retrieval pipeline: fuse keyword/vector/recency
/// anchors, beam-search outward along the graph weighted by intent,
/// rerank every reached candidate, then (for WHY queries) reorder by
/// causal topology.
pub fn intent_aware_recall(
    conn: &Connection,
    query: &str,
    query_vec: Option<&[f64]>,
    query_entities: &[String],
    limit: usize,
    intent_override: Option<Intent>,
) -> rusqlite::Result<RecallResult> {
    let (intent, intent_source) = match intent_override {
        Some(i) => (i, "override"),
        None => (intent::detect_intent(query), "auto"),
    };

    let all_insights = queries::get_all_active_insights(conn)?;

    let embed_cache: Option<HashMap<String, Vec<f64>>> = if query_vec.is_some() {
        let db_embeds = queries::get_all_embeddings(conn)?;
        if db_embeds.is_empty() {
            None
        } else {
            Some(db_embeds.into_iter().filter_map(|(id, blob)| deserialize_vector(&blob).map(|v| (id, v))).collect())
        }
    } else {
        None
    };
    let has_embeddings = embed_cache.as_ref().is_some_and(|c| !c.is_empty());

    let mut token_cache = HashMap::new();
    let anchor_map = anchors::build_anchors(&all_insights, query, query_vec, embed_cache.as_ref(), &mut token_cache);
    let anchor_count = anchor_map.len();

    let mut score_map: HashMap<String, f64> = HashMap::new();
    let mut via_map: HashMap<String, String> = HashMap::new();
    let mut insight_map: HashMap<String, crate::model::Insight> = HashMap::new();

    for (id, anchor) in &anchor_map {
        score_map.insert(id.clone(), anchor.score);
        via_map.insert(id.clone(), anchor.via.as_str().to_string());
        insight_map.insert(id.clone(), anchor.insight.clone());
    }

    for (id, anchor) in &anchor_map {
        traversal::beam_search_from_anchor(
            conn,
            id,
            anchor.score,
            if has_embeddings { query_vec } else { None },
            if has_embeddings { embed_cache.as_ref() } else { None },
            intent,
            &mut score_map,
            &mut via_map,
            &mut insight_map,
        );
    }

    let traversed_count = score_map.len();

    let candidates: Vec<rerank::Candidate> = score_map
        .iter()
        .filter_map(|(id, raw)| {
            insight_map.get(id).map(|ins| rerank::Candidate {
                insight: ins.clone(),
                graph_raw: *raw,
                via: via_map.get(id).cloned().unwrap_or_default(),
            })
        })
        .collect();

    let mut results = rerank::rerank(
        candidates,
        query,
        query_entities,
        if has_embeddings { query_vec } else { None },
        if has_embeddings { embed_cache.as_ref() } else { None },
        intent,
        &token_cache,
    );

    if limit > 0 && results.len() > limit {
        results.truncate(limit);
    }

    if intent == Intent::Why {
        results = causal_order::causal_topological_sort(conn, results);
    }

    let hint = if results.is_empty() || (limit > 0 && results.len() < limit / 2) { Some("sparse_results") } else { None };

    Ok(RecallResult {
        results,
        meta: RecallMeta { intent, intent_source, anchor_count, traversed: traversed_count, hint },
    })
}
