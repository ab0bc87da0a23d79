//! Intent-weighted beam search over the insight graph, fanning out
//! from each anchor along its edges.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};

use rusqlite::Connection;

use crate::model::Insight;
use crate::recall::intent::Intent;
use crate::store::queries;
use crate::vector::cosine_similarity;

const LAMBDA_STRUCTURAL: f64 = 1.0;
const LAMBDA_SEMANTIC: f64 = 0.4;

/// A node queued for the next beam, ordered by score descending (a
/// max-heap via `BinaryHeap` needs `Ord`, so we wrap the float).
struct Frontier {
    score: f64,
    id: String,
    depth: usize,
}

impl PartialEq for Frontier {
    fn eq(&self, other: &Self) -> bool {
        self.score == other.score
    }
}
impl Eq for Frontier {}
impl PartialOrd for Frontier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for Frontier {
    fn cmp(&self, other: &Self) -> Ordering {
        self.score.partial_cmp(&other.score).unwrap_or(Ordering::Equal)
    }
}

/// Beam search from a single anchor, updating `score_map`/`via_map`/
/// `insight_map` in place with the best score seen for every node this
/// anchor reaches.
#[allow(clippy::too_many_arguments)]
pub fn beam_search_from_anchor(
    conn: &Connection,
    start_id: &str,
    start_score: f64,
    query_vec: Option<&[f64]>,
    embed_cache: Option<&HashMap<String, Vec<f64>>>,
    intent: Intent,
    score_map: &mut HashMap<String, f64>,
    via_map: &mut HashMap<String, String>,
    insight_map: &mut HashMap<String, Insight>,
) {
    let (beam_width, max_depth, max_visited) = intent.traversal_params();

    let mut visited: HashSet<String> = HashSet::new();
    visited.insert(start_id.to_string());
    let mut total_visited = 1usize;

    let mut current: Vec<(f64, String, usize)> = vec![(start_score, start_id.to_string(), 0)];

    for depth in 0..max_depth {
        if current.is_empty() || total_visited >= max_visited {
            break;
        }

        let mut next_heap: BinaryHeap<Frontier> = BinaryHeap::new();
        let mut carried_over = Vec::new();

        for (cur_score, nid, d) in &current {
            if *d != depth {
                carried_over.push((*cur_score, nid.clone(), *d));
                continue;
            }

            let edges = queries::get_edges_by_node(conn, nid).unwrap_or_default();
            for edge in edges {
                if total_visited >= max_visited {
                    break;
                }
                let neighbor_id = if edge.target_id == *nid { edge.source_id.clone() } else { edge.target_id.clone() };

                let structural = intent.weight_for(edge.edge_type) * edge.weight;
                let mut semantic = 0.0;
                if let (Some(qv), Some(cache)) = (query_vec, embed_cache) {
                    if let Some(n_vec) = cache.get(&neighbor_id) {
                        let cos_sim = cosine_similarity(qv, n_vec);
                        if cos_sim > 0.0 {
                            semantic = cos_sim;
                        }
                    }
                }
                let neighbor_score = cur_score + LAMBDA_STRUCTURAL * structural + LAMBDA_SEMANTIC * semantic;

                let better = match score_map.get(&neighbor_id) {
                    Some(existing) => neighbor_score > *existing,
                    None => true,
                };
                if better {
                    score_map.insert(neighbor_id.clone(), neighbor_score);
                    via_map.insert(neighbor_id.clone(), edge.edge_type.as_str().to_string());
                    if !insight_map.contains_key(&neighbor_id) {
                        if let Ok(Some(ins)) = queries::get_insight(conn, &neighbor_id) {
                            insight_map.insert(neighbor_id.clone(), ins);
                        }
                    }
                }

                if visited.insert(neighbor_id.clone()) {
                    total_visited += 1;
                    next_heap.push(Frontier { score: neighbor_score, id: neighbor_id, depth: depth + 1 });
                }
            }
        }

        current = carried_over;
        for _ in 0..beam_width {
            match next_heap.pop() {
                Some(Frontier { score, id, depth }) => current.push((score, id, depth)),
                None => break,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Category, Edge, EdgeMetadata, EdgeType};
    use crate::store::Store;

    #[test]
    fn beam_search_reaches_direct_neighbor() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path()).unwrap();
        let a = Insight::new("a".into(), Category::Fact, 3, vec![], vec![], "user".into()).unwrap();
        let b = Insight::new("b".into(), Category::Fact, 3, vec![], vec![], "user".into()).unwrap();
        let a_id = a.id.clone();
        let b_id = b.id.clone();

        store
            .in_transaction(|conn| {
                queries::insert_insight(conn, &a)?;
                queries::insert_insight(conn, &b)?;
                let edge = Edge::new(a_id.clone(), b_id.clone(), EdgeType::Temporal, 1.0, EdgeMetadata::default()).unwrap();
                Ok(queries::insert_edge(conn, &edge)?)
            })
            .unwrap();

        let mut score_map = HashMap::new();
        let mut via_map = HashMap::new();
        let mut insight_map = HashMap::new();

        store
            .in_transaction(|conn| {
                beam_search_from_anchor(
                    conn,
                    &a_id,
                    1.0,
                    None,
                    None,
                    Intent::General,
                    &mut score_map,
                    &mut via_map,
                    &mut insight_map,
                );
                Ok(())
            })
            .unwrap();

        assert!(score_map.contains_key(&b_id));
        assert_eq!(via_map[&b_id], "temporal");
    }
}
