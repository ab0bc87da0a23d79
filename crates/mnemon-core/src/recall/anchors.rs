//! Anchor selection: reciprocal-rank-fusion across keyword, vector, and
//! recency rankings.

use std::collections::HashMap;

use crate::model::Insight;
use crate::tokenizer::keyword_search;
use crate::vector::cosine_similarity;

pub const ANCHOR_TOP_K: usize = 20;
pub const RRF_K: f64 = 60.0;
pub const VECTOR_SEARCH_MIN_SIM: f64 = 0.10;

/// How an anchor was discovered, echoed in the final result's `via`
/// field once merged with its beam-search descendants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Via {
    Keyword,
    Vector,
    Time,
    Hybrid,
}

impl Via {
    pub fn as_str(&self) -> &'static str {
        match self {
            Via::Keyword => "keyword",
            Via::Vector => "vector",
            Via::Time => "time",
            Via::Hybrid => "hybrid",
        }
    }

    fn upgrade(self) -> Via {
        match self {
            Via::Keyword | Via::Vector => Via::Hybrid,
            other => other,
        }
    }
}

pub struct Anchor {
    pub insight: Insight,
    pub score: f64,
    pub via: Via,
}

/// Cosine similarity search over a pre-loaded embedding cache,
/// descending by similarity, capped at `limit` and floored at
/// [`VECTOR_SEARCH_MIN_SIM`].
pub fn vector_search_from_cache(embed_cache: &HashMap<String, Vec<f64>>, query_vec: &[f64], limit: usize) -> Vec<(String, f64)> {
    let mut hits: Vec<(String, f64)> = embed_cache
        .iter()
        .map(|(id, v)| (id.clone(), cosine_similarity(query_vec, v)))
        .filter(|(_, sim)| *sim > VECTOR_SEARCH_MIN_SIM)
        .collect();
    hits.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap());
    if limit > 0 && hits.len() > limit {
        hits.truncate(limit);
    }
    hits
}

/// Fuse keyword, vector, and recency rankings into one anchor set via
/// RRF, normalized to `[0, 1]` by the top fused score.
#[allow(clippy::too_many_arguments)]
pub fn build_anchors(
    all_insights: &[Insight],
    query: &str,
    query_vec: Option<&[f64]>,
    embed_cache: Option<&HashMap<String, Vec<f64>>>,
    token_cache: &mut HashMap<String, std::collections::HashSet<String>>,
) -> HashMap<String, Anchor> {
    let mut anchor_map: HashMap<String, Anchor> = HashMap::new();

    let keyword_hits = keyword_search(all_insights, query, ANCHOR_TOP_K, Some(token_cache));
    for (rank, (ins, _score)) in keyword_hits.into_iter().enumerate() {
        let rrf = 1.0 / (RRF_K + rank as f64 + 1.0);
        anchor_map.insert(ins.id.clone(), Anchor { insight: ins.clone(), score: rrf, via: Via::Keyword });
    }

    if let (Some(qv), Some(cache)) = (query_vec, embed_cache) {
        if !cache.is_empty() {
            let vector_hits = vector_search_from_cache(cache, qv, ANCHOR_TOP_K);
            for (rank, (vid, _sim)) in vector_hits.into_iter().enumerate() {
                let rrf = 1.0 / (RRF_K + rank as f64 + 1.0);
                match anchor_map.get_mut(&vid) {
                    Some(existing) => {
                        existing.score += rrf;
                        existing.via = existing.via.upgrade();
                    }
                    None => {
                        if let Some(ins) = all_insights.iter().find(|i| i.id == vid) {
                            anchor_map.insert(vid, Anchor { insight: ins.clone(), score: rrf, via: Via::Vector });
                        }
                    }
                }
            }
        }
    }

    let mut by_recency: Vec<&Insight> = all_insights.iter().collect();
    by_recency.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    for (rank, ins) in by_recency.into_iter().take(ANCHOR_TOP_K).enumerate() {
        let rrf = 1.0 / (RRF_K + rank as f64 + 1.0);
        match anchor_map.get_mut(&ins.id) {
            Some(existing) => {
                existing.score += rrf;
                existing.via = existing.via.upgrade();
            }
            None => {
                anchor_map.insert(ins.id.clone(), Anchor { insight: ins.clone(), score: rrf, via: Via::Time });
            }
        }
    }

    let max_score = anchor_map.values().map(|a| a.score).fold(0.0_f64, f64::max);
    if max_score > 0.0 {
        for anchor in anchor_map.values_mut() {
            anchor.score /= max_score;
        }
    }

    anchor_map
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Category;

    fn insight(content: &str) -> Insight {
        Insight::new(content.into(), Category::Fact, 3, vec![], vec![], "user".into()).unwrap()
    }

    #[test]
    fn keyword_and_recency_fuse_into_hybrid() {
        let a = insight("Rust uses SQLite for storage");
        let b = insight("unrelated content");
        let insights = vec![a.clone(), b];
        let mut token_cache = HashMap::new();
        let anchors = build_anchors(&insights, "Rust SQLite storage", None, None, &mut token_cache);
        assert!(anchors.contains_key(&a.id));
        assert_eq!(anchors[&a.id].via, Via::Hybrid);
    }

    #[test]
    fn vector_search_respects_threshold_and_limit() {
        let mut cache = HashMap::new();
        cache.insert("a".to_string(), vec![1.0, 0.0]);
        cache.insert("b".to_string(), vec![0.0, 1.0]);
        let hits = vector_search_from_cache(&cache, &[1.0, 0.0], 10);
        assert_eq!(hits[0].0, "a");
        assert_eq!(hits.len(), 1);
    }
}
