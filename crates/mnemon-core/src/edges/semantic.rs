//! Semantic auto-linking: bidirectional edges between insights whose
//! embeddings are highly similar.

use rusqlite::Connection;

use crate::model::{Edge, EdgeMetadata, EdgeType, Insight, format_float};
use crate::store::queries;
use crate::tokenizer::content_similarity;
use crate::vector::{cosine_similarity, deserialize_vector};

pub const AUTO_SEMANTIC_THRESHOLD: f64 = 0.80;
pub const MAX_AUTO_SEMANTIC_EDGES: usize = 3;
pub const MIN_SEMANTIC_SIMILARITY: f64 = 0.10;
pub const REVIEW_SEMANTIC_THRESHOLD: f64 = 0.40;
pub const MAX_SEMANTIC_CANDIDATES: usize = 5;

/// A suggested-but-not-yet-created semantic link, surfaced to the
/// caller for review rather than auto-created.
#[derive(Debug, Clone)]
pub struct SemanticCandidate {
    pub insight: Insight,
    pub similarity: f64,
    pub auto_linked: bool,
}

/// Auto-link `insight` to its most similar peers by embedding cosine
/// similarity, above [`AUTO_SEMANTIC_THRESHOLD`], capped at
/// [`MAX_AUTO_SEMANTIC_EDGES`]. No-op if `insight` has no embedding.
/// Per-edge insert failures are swallowed.
pub fn create_semantic_edges(conn: &Connection, insight: &Insight) -> i64 {
    let Ok(Some(own_blob)) = queries::get_embedding(conn, &insight.id) else {
        return 0;
    };
    let Some(own_vec) = deserialize_vector(&own_blob) else {
        return 0;
    };

    let cache = queries::get_all_embeddings(conn).unwrap_or_default();

    let mut scored: Vec<(String, f64)> = cache
        .into_iter()
        .filter(|(id, _)| id != &insight.id)
        .filter_map(|(id, blob)| deserialize_vector(&blob).map(|v| (id, v)))
        .map(|(id, v)| (id, cosine_similarity(&own_vec, &v)))
        .filter(|(_, sim)| *sim >= AUTO_SEMANTIC_THRESHOLD)
        .collect();

    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap());
    scored.truncate(MAX_AUTO_SEMANTIC_EDGES);

    let mut count = 0;
    for (other_id, sim) in scored {
        let meta = EdgeMetadata {
            created_by: Some("auto".into()),
            cosine: Some(format_float(sim)),
            ..Default::default()
        };

        if let Ok(edge) = Edge::new(insight.id.clone(), other_id.clone(), EdgeType::Semantic, sim, meta.clone()) {
            if queries::insert_edge(conn, &edge).is_ok() {
                count += 1;
            }
        }
        if let Ok(edge) = Edge::new(other_id, insight.id.clone(), EdgeType::Semantic, sim, meta) {
            if queries::insert_edge(conn, &edge).is_ok() {
                count += 1;
            }
        }
    }

    count
}

/// Surface up to [`MAX_SEMANTIC_CANDIDATES`] related insights for
/// review, without creating edges. Prefers embedding cosine similarity
/// (threshold [`REVIEW_SEMANTIC_THRESHOLD`]); falls back to token
/// overlap (threshold [`MIN_SEMANTIC_SIMILARITY`]) when `insight` has no
/// embedding or the cache is empty.
pub fn find_semantic_candidates(conn: &Connection, insight: &Insight) -> Vec<SemanticCandidate> {
    let own_vec = queries::get_embedding(conn, &insight.id)
        .ok()
        .flatten()
        .and_then(|blob| deserialize_vector(&blob));

    if let Some(own_vec) = own_vec {
        let cache = queries::get_all_embeddings(conn).unwrap_or_default();
        if !cache.is_empty() {
            let mut scored: Vec<(String, f64)> = cache
                .into_iter()
                .filter(|(id, _)| id != &insight.id)
                .filter_map(|(id, blob)| deserialize_vector(&blob).map(|v| (id, v)))
                .map(|(id, v)| (id, cosine_similarity(&own_vec, &v)))
                .filter(|(_, sim)| *sim >= REVIEW_SEMANTIC_THRESHOLD)
                .collect();
            scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap());
            scored.truncate(MAX_SEMANTIC_CANDIDATES);

            return scored
                .into_iter()
                .filter_map(|(id, sim)| {
                    queries::get_insight(conn, &id).ok().flatten().map(|ins| SemanticCandidate {
                        insight: ins,
                        similarity: sim,
                        auto_linked: sim >= AUTO_SEMANTIC_THRESHOLD,
                    })
                })
                .collect();
        }
    }

    let others = queries::get_all_active_insights(conn).unwrap_or_default();
    let mut scored: Vec<(Insight, f64)> = others
        .into_iter()
        .filter(|o| o.id != insight.id)
        .map(|o| {
            let sim = content_similarity(&insight.content, &o.content);
            (o, sim)
        })
        .filter(|(_, sim)| *sim >= MIN_SEMANTIC_SIMILARITY)
        .collect();
    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap());
    scored.truncate(MAX_SEMANTIC_CANDIDATES);

    scored
        .into_iter()
        .map(|(ins, sim)| SemanticCandidate { insight: ins, similarity: sim, auto_linked: false })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Category;
    use crate::store::Store;
    use crate::vector::serialize_vector;

    fn seed_with_embedding(store: &Store, content: &str, vec: &[f64]) -> Insight {
        let insight = Insight::new(content.into(), Category::Fact, 3, vec![], vec![], "test".into()).unwrap();
        store
            .in_transaction(|conn| {
                queries::insert_insight(conn, &insight)?;
                queries::update_embedding(conn, &insight.id, &serialize_vector(vec))?;
                Ok(())
            })
            .unwrap();
        insight
    }

    #[test]
    fn near_identical_embeddings_auto_link_bidirectionally() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path()).unwrap();

        let a = seed_with_embedding(&store, "a".repeat(20).as_str(), &[1.0, 0.0, 0.0, 0.0]);
        let b = seed_with_embedding(&store, "b".repeat(20).as_str(), &[0.99, 0.01, 0.0, 0.0]);

        let count = store.with_conn(|conn| Ok(create_semantic_edges(conn, &b))).unwrap();
        assert_eq!(count, 2);

        let edges = store.get_edges_by_node(&b.id).unwrap();
        assert_eq!(edges.len(), 2);
        for edge in &edges {
            assert!(edge.weight > AUTO_SEMANTIC_THRESHOLD);
            assert_eq!(edge.metadata.created_by.as_deref(), Some("auto"));
        }
        assert!(edges.iter().any(|e| e.source_id == b.id && e.target_id == a.id));
        assert!(edges.iter().any(|e| e.source_id == a.id && e.target_id == b.id));
    }

    #[test]
    fn orthogonal_embeddings_create_no_edges() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path()).unwrap();

        seed_with_embedding(&store, "a".repeat(20).as_str(), &[1.0, 0.0, 0.0, 0.0]);
        let b = seed_with_embedding(&store, "b".repeat(20).as_str(), &[0.0, 1.0, 0.0, 0.0]);

        let count = store.with_conn(|conn| Ok(create_semantic_edges(conn, &b))).unwrap();
        assert_eq!(count, 0);
    }
}
