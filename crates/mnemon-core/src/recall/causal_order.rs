//! Kahn's topological sort, reordering WHY-intent results so causes
//! appear before their effects while preserving relevance order among
//! ties and unreachable nodes.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};

use rusqlite::Connection;

use crate::model::EdgeType;
use crate::recall::rerank::RecallHit;
use crate::store::queries;

struct Ready {
    score: f64,
    id: String,
}
impl PartialEq for Ready {
    fn eq(&self, other: &Self) -> bool {
        self.score == other.score
    }
}
impl Eq for Ready {}
impl PartialOrd for Ready {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for Ready {
    fn cmp(&self, other: &Self) -> Ordering {
        self.score.partial_cmp(&other.score).unwrap_or(Ordering::Equal)
    }
}

/// Reorder `results` via Kahn's algorithm over the causal subgraph
/// induced among them, breaking ties by descending `score`. Any result
/// left out by a cycle is appended in its original order.
pub fn causal_topological_sort(conn: &Connection, results: Vec<RecallHit>) -> Vec<RecallHit> {
    if results.len() <= 1 {
        return results;
    }

    let original_order: Vec<String> = results.iter().map(|r| r.insight.id.clone()).collect();
    let id_set: HashSet<String> = original_order.iter().cloned().collect();
    let mut by_id: HashMap<String, RecallHit> = results.into_iter().map(|r| (r.insight.id.clone(), r)).collect();

    let mut adj: HashMap<String, Vec<String>> = HashMap::new();
    let mut in_degree: HashMap<String, i64> = by_id.keys().map(|id| (id.clone(), 0)).collect();

    for id in by_id.keys().cloned().collect::<Vec<_>>() {
        let edges = queries::get_edges_by_source_and_type(conn, &id, EdgeType::Causal).unwrap_or_default();
        for e in edges {
            if id_set.contains(&e.target_id) {
                adj.entry(e.source_id).or_default().push(e.target_id.clone());
                *in_degree.entry(e.target_id).or_insert(0) += 1;
            }
        }
    }

    let mut heap: BinaryHeap<Ready> = BinaryHeap::new();
    for (id, hit) in &by_id {
        if in_degree.get(id).copied().unwrap_or(0) == 0 {
            heap.push(Ready { score: hit.score, id: id.clone() });
        }
    }

    let mut ordered = Vec::new();
    let mut covered = HashSet::new();
    while let Some(Ready { id, .. }) = heap.pop() {
        if let Some(hit) = by_id.remove(&id) {
            covered.insert(id.clone());
            ordered.push(hit);
        }
        if let Some(targets) = adj.get(&id) {
            for target in targets {
                if let Some(d) = in_degree.get_mut(target) {
                    *d -= 1;
                    if *d == 0 {
                        if let Some(hit) = by_id.get(target) {
                            heap.push(Ready { score: hit.score, id: target.clone() });
                        }
                    }
                }
            }
        }
    }

    for id in original_order {
        if !covered.contains(&id) {
            if let Some(hit) = by_id.remove(&id) {
                ordered.push(hit);
            }
        }
    }

    ordered
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Category, Edge, EdgeMetadata, Insight};
    use crate::recall::rerank::Signals;
    use crate::store::Store;

    fn hit(insight: &Insight, score: f64) -> RecallHit {
        RecallHit { insight: insight.clone(), score, intent: crate::recall::intent::Intent::Why, via: "causal".into(), signals: Signals::default() }
    }

    #[test]
    fn why_intent_orders_causes_before_effects() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path()).unwrap();

        let a = Insight::new("root cause identified".into(), Category::Fact, 3, vec![], vec![], "test".into()).unwrap();
        let b = Insight::new("mitigation applied".into(), Category::Fact, 3, vec![], vec![], "test".into()).unwrap();
        let c = Insight::new("incident closed".into(), Category::Fact, 3, vec![], vec![], "test".into()).unwrap();

        store
            .in_transaction(|conn| {
                queries::insert_insight(conn, &a)?;
                queries::insert_insight(conn, &b)?;
                queries::insert_insight(conn, &c)?;
                let ab = Edge::new(a.id.clone(), b.id.clone(), EdgeType::Causal, 0.8, EdgeMetadata::default()).unwrap();
                let bc = Edge::new(b.id.clone(), c.id.clone(), EdgeType::Causal, 0.8, EdgeMetadata::default()).unwrap();
                queries::insert_edge(conn, &ab)?;
                queries::insert_edge(conn, &bc)?;
                Ok(())
            })
            .unwrap();

        // Deliberately out of order, and with a score ranking that would put
        // the effect first if naive relevance order were kept.
        let results = vec![hit(&c, 0.9), hit(&a, 0.5), hit(&b, 0.7)];

        let ordered = store.with_conn(|conn| Ok(causal_topological_sort(conn, results))).unwrap();
        let ids: Vec<&str> = ordered.iter().map(|h| h.insight.id.as_str()).collect();
        assert_eq!(ids, vec![a.id.as_str(), b.id.as_str(), c.id.as_str()]);
    }

    #[test]
    fn single_result_is_returned_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path()).unwrap();
        let a = Insight::new("solo".into(), Category::Fact, 3, vec![], vec![], "test".into()).unwrap();
        let results = vec![hit(&a, 0.5)];
        let ordered = store.with_conn(|conn| Ok(causal_topological_sort(conn, results))).unwrap();
        assert_eq!(ordered.len(), 1);
    }
}
