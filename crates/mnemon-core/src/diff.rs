//! Duplicate/conflict/update classification for the remember pipeline.

use crate::model::Insight;
use crate::tokenizer::{content_similarity, keyword_search};
use crate::vector::cosine_similarity;

const NEGATION_WORDS: &[&str] = &[
    "not",
    "no longer",
    "don't",
    "doesn't",
    "never",
    "switched from",
    "instead of",
    "rather than",
    "replaced",
    "deprecated",
];

const COSINE_CONFIRM_THRESHOLD: f64 = 0.7;

/// Verdict for a candidate match against new content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Suggestion {
    Add,
    Conflict,
    Duplicate,
    Update,
}

impl Suggestion {
    pub fn as_str(&self) -> &'static str {
        match self {
            Suggestion::Add => "ADD",
            Suggestion::Conflict => "CONFLICT",
            Suggestion::Duplicate => "DUPLICATE",
            Suggestion::Update => "UPDATE",
        }
    }
}

/// Classify a new/existing pair from their similarity and negation cues.
pub fn classify_suggestion(similarity: f64, new_text: &str, existing_text: &str) -> Suggestion {
    if similarity < 0.5 {
        return Suggestion::Add;
    }

    let new_lower = new_text.to_lowercase();
    let exist_lower = existing_text.to_lowercase();
    if NEGATION_WORDS.iter().any(|n| new_lower.contains(n) || exist_lower.contains(n)) {
        return Suggestion::Conflict;
    }

    if similarity > 0.9 {
        Suggestion::Duplicate
    } else {
        Suggestion::Update
    }
}

/// One candidate match surfaced by [`diff`].
#[derive(Debug, Clone)]
pub struct DiffMatch {
    pub id: String,
    pub content: String,
    pub token_similarity: f64,
    pub cosine_similarity: f64,
    pub similarity: f64,
    pub suggestion: Suggestion,
}

/// Result of comparing new content against the existing corpus.
#[derive(Debug, Clone)]
pub struct DiffResult {
    pub suggestion: Suggestion,
    pub matches: Vec<DiffMatch>,
}

/// Compare `new_content` against `insights`, starting from the top
/// keyword matches and, if a query vector is available, supplementing
/// with a cosine-similarity scan for near-duplicates keyword search
/// missed.
pub fn diff(
    insights: &[Insight],
    new_content: &str,
    limit: usize,
    new_embedding: Option<&[f64]>,
    existing_embed: Option<&[(String, Vec<f64>)]>,
) -> DiffResult {
    let limit = if limit == 0 { 5 } else { limit };

    let candidates = keyword_search(insights, new_content, limit, None);

    let mut matches: Vec<DiffMatch> = Vec::new();
    for (ins, _kw_score) in &candidates {
        let token_sim = content_similarity(new_content, &ins.content);

        let mut cosine_sim = 0.0;
        if let (Some(new_vec), Some(existing)) = (new_embedding, existing_embed) {
            if let Some((_, exist_vec)) = existing.iter().find(|(id, _)| id == &ins.id) {
                cosine_sim = cosine_similarity(new_vec, exist_vec);
            }
        }

        let mut similarity = token_sim;
        if cosine_sim >= COSINE_CONFIRM_THRESHOLD && cosine_sim > similarity {
            similarity = cosine_sim;
        }

        let suggestion = classify_suggestion(similarity, new_content, &ins.content);
        matches.push(DiffMatch {
            id: ins.id.clone(),
            content: ins.content.clone(),
            token_similarity: token_sim,
            cosine_similarity: cosine_sim,
            similarity,
            suggestion,
        });
    }

    if let (Some(new_vec), Some(existing)) = (new_embedding, existing_embed) {
        let seen: std::collections::HashSet<&str> = matches.iter().map(|m| m.id.as_str()).collect();
        let mut cosine_pairs: Vec<(&str, f64)> = existing
            .iter()
            .filter(|(id, _)| !seen.contains(id.as_str()))
            .map(|(id, vec)| (id.as_str(), cosine_similarity(new_vec, vec)))
            .filter(|(_, cs)| *cs >= COSINE_CONFIRM_THRESHOLD)
            .collect();

        cosine_pairs.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap());
        cosine_pairs.truncate(limit);

        for (eid, cs) in cosine_pairs {
            let Some(ins) = insights.iter().find(|i| i.id == eid) else { continue };
            let token_sim = content_similarity(new_content, &ins.content);
            let mut similarity = token_sim;
            if cs >= COSINE_CONFIRM_THRESHOLD && cs > similarity {
                similarity = cs;
            }
            let suggestion = classify_suggestion(similarity, new_content, &ins.content);
            if suggestion != Suggestion::Add {
                matches.push(DiffMatch {
                    id: ins.id.clone(),
                    content: ins.content.clone(),
                    token_similarity: token_sim,
                    cosine_similarity: cs,
                    similarity,
                    suggestion,
                });
            }
        }
    }

    let mut overall = Suggestion::Add;
    if let Some(first) = matches.first() {
        overall = first.suggestion;
        if matches.iter().any(|m| m.suggestion == Suggestion::Duplicate) {
            overall = Suggestion::Duplicate;
        }
    }

    DiffResult { suggestion: overall, matches }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Category;

    fn insight(id: &str, content: &str) -> Insight {
        let mut ins =
            Insight::new(content.into(), Category::Fact, 3, vec![], vec![], "user".into()).unwrap();
        ins.id = id.to_string();
        ins
    }

    #[test]
    fn duplicate_update_conflict_scenario() {
        let corpus = vec![insight("a", "Go uses SQLite for storage")];

        let dup = diff(&corpus, "Go uses SQLite for storage", 5, None, None);
        assert_eq!(dup.suggestion, Suggestion::Duplicate);

        let update = diff(&corpus, "Go uses PostgreSQL", 5, None, None);
        assert_eq!(update.suggestion, Suggestion::Update);

        let conflict = diff(&corpus, "Go no longer uses SQLite", 5, None, None);
        assert_eq!(conflict.suggestion, Suggestion::Conflict);
    }

    #[test]
    fn classify_suggestion_boundaries() {
        assert_eq!(classify_suggestion(0.3, "a", "b"), Suggestion::Add);
        assert_eq!(classify_suggestion(0.95, "a", "b"), Suggestion::Duplicate);
        assert_eq!(classify_suggestion(0.6, "a", "b"), Suggestion::Update);
        assert_eq!(classify_suggestion(0.6, "we replaced it", "old thing"), Suggestion::Conflict);
    }
}
