//! Causal edges: directional links inferred from causal-signal
//! keywords and token overlap against recent insights.

use rusqlite::Connection;

use crate::bfs::{BfsOptions, bfs};
use crate::causal::{
    CAUSAL_LOOKBACK, MAX_CAUSAL_CANDIDATES, MIN_CAUSAL_OVERLAP, find_causal_signal, has_causal_signal,
    suggest_sub_type, token_overlap,
};
use crate::model::{Edge, EdgeMetadata, EdgeType, Insight, format_float};
use crate::store::queries;
use crate::tokenizer::tokenize;

/// Compare `insight` against its [`CAUSAL_LOOKBACK`] most recent active
/// peers and create a single directional edge per qualifying pair.
/// Per-edge insert failures are swallowed.
pub fn create_causal_edges(conn: &Connection, insight: &Insight) -> i64 {
    let recent = queries::get_recent_active_insights(conn, &insight.id, CAUSAL_LOOKBACK as i64).unwrap_or_default();
    if recent.is_empty() {
        return 0;
    }

    let new_has_signal = has_causal_signal(&insight.content);
    let new_tokens = tokenize(&insight.content);
    let mut count = 0;

    for other in &recent {
        let other_has_signal = has_causal_signal(&other.content);
        if !new_has_signal && !other_has_signal {
            continue;
        }

        let other_tokens = tokenize(&other.content);
        let overlap = token_overlap(&new_tokens, &other_tokens);
        if overlap < MIN_CAUSAL_OVERLAP {
            continue;
        }

        let (source_id, target_id) = if !new_has_signal && other_has_signal {
            (insight.id.clone(), other.id.clone())
        } else {
            (other.id.clone(), insight.id.clone())
        };

        let combined = format!("{} {}", insight.content, other.content);
        let meta = EdgeMetadata {
            overlap: Some(format_float(overlap)),
            sub_type: Some(suggest_sub_type(&combined).as_str().to_string()),
            ..Default::default()
        };

        if let Ok(edge) = Edge::new(source_id, target_id, EdgeType::Causal, overlap, meta) {
            if queries::insert_edge(conn, &edge).is_ok() {
                count += 1;
            }
        }
    }

    count
}

/// A node reached by causal-candidate discovery, annotated with the
/// causal keyword driving the suggestion and a guessed sub-type.
#[derive(Debug, Clone)]
pub struct CausalCandidate {
    pub insight: Insight,
    pub hop: usize,
    pub causal_signal: Option<String>,
    pub suggested_sub_type: String,
}

/// 2-hop BFS out from `insight` over the full graph (any edge type),
/// surfacing up to [`MAX_CAUSAL_CANDIDATES`] nodes for review.
pub fn find_causal_candidates(conn: &Connection, insight: &Insight) -> Vec<CausalCandidate> {
    let hits = bfs(conn, &insight.id, BfsOptions { max_depth: 2, max_nodes: MAX_CAUSAL_CANDIDATES, edge_filter: None });

    hits.into_iter()
        .map(|hit| {
            let signal = find_causal_signal(&hit.insight.content).or_else(|| find_causal_signal(&insight.content));
            let combined = format!("{} {}", insight.content, hit.insight.content);
            CausalCandidate {
                insight: hit.insight,
                hop: hit.hop,
                causal_signal: signal,
                suggested_sub_type: suggest_sub_type(&combined).as_str().to_string(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Category;
    use crate::store::Store;

    #[test]
    fn causal_direction_runs_from_cause_to_effect() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path()).unwrap();

        let cause = Insight::new("Go compiles fast with static linking".into(), Category::Fact, 3, vec![], vec![], "test".into())
            .unwrap();
        store.in_transaction(|conn| Ok(queries::insert_insight(conn, &cause)?)).unwrap();

        let effect =
            Insight::new("Chose Go because it compiles fast".into(), Category::Decision, 3, vec![], vec![], "test".into())
                .unwrap();
        store.in_transaction(|conn| Ok(queries::insert_insight(conn, &effect)?)).unwrap();

        let count = store.with_conn(|conn| Ok(create_causal_edges(conn, &effect))).unwrap();
        assert_eq!(count, 1);

        let edges = store.get_edges_by_node(&effect.id).unwrap();
        assert_eq!(edges.len(), 1);
        let edge = &edges[0];
        assert_eq!(edge.source_id, cause.id);
        assert_eq!(edge.target_id, effect.id);
        assert_eq!(edge.metadata.sub_type.as_deref(), Some("causes"));
        // tokens(cause) = {go, compiles, fast, static, linking}, tokens(effect) = {chose, go, because, compiles, fast}
        // intersection {go, compiles, fast} / max(5, 5) = 0.6 (see causal::token_overlap)
        assert!((edge.weight - 0.6).abs() < 0.05);
    }

    #[test]
    fn no_signal_and_no_overlap_creates_no_edge() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path()).unwrap();

        let a = Insight::new("the weather is pleasant today".into(), Category::Fact, 3, vec![], vec![], "test".into()).unwrap();
        store.in_transaction(|conn| Ok(queries::insert_insight(conn, &a)?)).unwrap();

        let b = Insight::new("quarterly revenue grew by ten percent".into(), Category::Fact, 3, vec![], vec![], "test".into())
            .unwrap();
        store.in_transaction(|conn| Ok(queries::insert_insight(conn, &b)?)).unwrap();

        let count = store.with_conn(|conn| Ok(create_causal_edges(conn, &b))).unwrap();
        assert_eq!(count, 0);
    }
}
