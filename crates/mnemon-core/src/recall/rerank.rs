//! Final reranking: a four-signal linear combination over each
//! traversal candidate, weighted differently depending on whether
//! embeddings are available.

use std::collections::{HashMap, HashSet};

use crate::model::Insight;
use crate::recall::intent::Intent;
use crate::tokenizer::{insight_tokens, tokenize};
use crate::vector::cosine_similarity;

/// Weights `(keyword, entity, similarity, graph)` used when the corpus
/// has embeddings.
const RERANK_WITH_EMBED: (f64, f64, f64, f64) = (0.30, 0.15, 0.35, 0.20);
/// Same, with similarity's weight folded into keyword+graph when there
/// is no embedding signal to score.
const RERANK_NO_EMBED: (f64, f64, f64, f64) = (0.45, 0.25, 0.0, 0.30);

/// Per-signal breakdown surfaced alongside a recall hit's final score.
#[derive(Debug, Clone, Copy, Default, serde::Serialize)]
pub struct Signals {
    pub keyword: f64,
    pub entity: f64,
    pub similarity: f64,
    pub graph: f64,
}

/// One scored, traversal-reachable candidate. `via` names how it was
/// reached: `keyword`/`vector`/`time`/`hybrid` for an anchor untouched
/// by traversal, or an edge type (`temporal`/`semantic`/`causal`/
/// `entity`) once a beam search found a better path to it.
#[derive(Debug, Clone, serde::Serialize)]
pub struct RecallHit {
    pub insight: Insight,
    pub score: f64,
    pub intent: Intent,
    pub via: String,
    pub signals: Signals,
}

pub struct Candidate {
    pub insight: Insight,
    pub graph_raw: f64,
    pub via: String,
}

/// Score every traversal candidate against the query, min-max
/// normalizing the raw graph score across the candidate set first.
pub fn rerank(
    candidates: Vec<Candidate>,
    query: &str,
    query_entities: &[String],
    query_vec: Option<&[f64]>,
    embed_cache: Option<&HashMap<String, Vec<f64>>>,
    intent: Intent,
    token_cache: &HashMap<String, HashSet<String>>,
) -> Vec<RecallHit> {
    if candidates.is_empty() {
        return Vec::new();
    }

    let query_tokens = tokenize(query);
    let query_entity_set: HashSet<String> = query_entities.iter().map(|e| e.to_lowercase()).collect();
    let has_embeddings = embed_cache.is_some_and(|c| !c.is_empty());

    let graph_min = candidates.iter().map(|c| c.graph_raw).fold(f64::INFINITY, f64::min);
    let graph_max = candidates.iter().map(|c| c.graph_raw).fold(f64::NEG_INFINITY, f64::max);
    let graph_range = if graph_max - graph_min == 0.0 { 1.0 } else { graph_max - graph_min };

    let (w_kw, w_ent, w_sim, w_gr) = if has_embeddings { RERANK_WITH_EMBED } else { RERANK_NO_EMBED };

    let mut hits = Vec::with_capacity(candidates.len());
    for c in candidates {
        let doc_tokens = token_cache.get(&c.insight.id).cloned().unwrap_or_else(|| insight_tokens(&c.insight));
        let kw_score = if query_tokens.is_empty() {
            0.0
        } else {
            query_tokens.iter().filter(|t| doc_tokens.contains(*t)).count() as f64 / query_tokens.len() as f64
        };

        let ent_score = if query_entity_set.is_empty() {
            0.0
        } else {
            let matched = c.insight.entities.iter().filter(|e| query_entity_set.contains(&e.to_lowercase())).count();
            matched as f64 / query_entity_set.len().max(1) as f64
        };

        let mut sim_score = 0.0;
        if let (Some(qv), Some(cache)) = (query_vec, embed_cache) {
            if let Some(v) = cache.get(&c.insight.id) {
                let sim = cosine_similarity(qv, v);
                if sim > 0.0 {
                    sim_score = sim;
                }
            }
        }

        let graph_score = (c.graph_raw - graph_min) / graph_range;

        let score = w_kw * kw_score + w_ent * ent_score + w_sim * sim_score + w_gr * graph_score;

        hits.push(RecallHit {
            insight: c.insight,
            score,
            intent,
            via: c.via,
            signals: Signals { keyword: kw_score, entity: ent_score, similarity: sim_score, graph: graph_score },
        });
    }

    hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap().then_with(|| b.insight.importance.cmp(&a.insight.importance)));
    hits
}
