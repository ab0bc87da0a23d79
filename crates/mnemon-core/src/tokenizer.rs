//! Stopword-filtered tokenization and token-overlap similarity.

use std::collections::HashSet;

use regex::Regex;
use std::sync::LazyLock;

use crate::model::Insight;

const STOPWORDS: &[&str] = &[
    "a", "an", "the", "is", "are", "was", "were", "be", "been", "being", "have", "has", "had",
    "do", "does", "did", "will", "would", "could", "should", "may", "might", "shall", "can", "to",
    "of", "in", "for", "on", "with", "at", "by", "from", "as", "into", "about", "that", "this",
    "it", "its", "or", "and", "but", "if", "not", "no", "so", "up", "out", "than", "then", "too",
    "very", "just", "also", "more", "some", "any", "all", "each", "i", "me", "my", "we", "you",
    "your", "he", "she", "they", "them", "his", "her", "our", "their", "what", "which", "who",
    "how", "when", "where",
];

static WORD_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[a-zA-Z0-9]+").unwrap());
static STOPWORD_SET: LazyLock<HashSet<&'static str>> =
    LazyLock::new(|| STOPWORDS.iter().copied().collect());

/// Lowercase, split on non-alphanumeric boundaries, drop stopwords.
pub fn tokenize(text: &str) -> HashSet<String> {
    let lower = text.to_lowercase();
    WORD_RE
        .find_iter(&lower)
        .map(|m| m.as_str().to_string())
        .filter(|w| !STOPWORD_SET.contains(w.as_str()))
        .collect()
}

/// Union of tokens over content, tags, and entities.
pub fn insight_tokens(ins: &Insight) -> HashSet<String> {
    let mut tokens = tokenize(&ins.content);
    for tag in &ins.tags {
        tokens.extend(tokenize(tag));
    }
    for ent in &ins.entities {
        tokens.extend(tokenize(ent));
    }
    tokens
}

/// Bidirectional token overlap: max of the two one-sided overlap ratios.
/// A short string fully contained in a longer one scores 1.0.
pub fn content_similarity(a: &str, b: &str) -> f64 {
    let tok_a = tokenize(a);
    let tok_b = tokenize(b);
    if tok_a.is_empty() || tok_b.is_empty() {
        return 0.0;
    }

    let intersection = tok_a.intersection(&tok_b).count() as f64;
    let score_a = intersection / tok_a.len() as f64;
    let score_b = intersection / tok_b.len() as f64;
    score_a.max(score_b)
}

/// Keyword top-k search: score = |Q ∩ tokens(doc)| / |Q|, skipping
/// zero-score docs, ties broken on higher importance. An optional token
/// cache is populated for reuse by the recall pipeline.
pub fn keyword_search<'a>(
    insights: &'a [Insight],
    query: &str,
    limit: usize,
    mut token_cache: Option<&mut std::collections::HashMap<String, HashSet<String>>>,
) -> Vec<(&'a Insight, f64)> {
    let query_tokens = tokenize(query);
    if query_tokens.is_empty() {
        return Vec::new();
    }

    let mut scored: Vec<(&Insight, f64)> = Vec::new();
    for ins in insights {
        let doc_tokens = insight_tokens(ins);
        if let Some(cache) = token_cache.as_deref_mut() {
            cache.insert(ins.id.clone(), doc_tokens.clone());
        }

        let intersection = query_tokens.iter().filter(|t| doc_tokens.contains(*t)).count();
        if intersection == 0 {
            continue;
        }
        let score = intersection as f64 / query_tokens.len() as f64;
        scored.push((ins, score));
    }

    scored.sort_by(|(a_ins, a_score), (b_ins, b_score)| {
        b_score
            .partial_cmp(a_score)
            .unwrap()
            .then_with(|| b_ins.importance.cmp(&a_ins.importance))
    });

    if limit > 0 && scored.len() > limit {
        scored.truncate(limit);
    }
    scored
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Category;

    fn insight(content: &str, importance: u8) -> Insight {
        Insight::new(content.into(), Category::Fact, importance, vec![], vec![], "user".into())
            .unwrap()
    }

    #[test]
    fn tokenize_drops_stopwords_and_lowercases() {
        let toks = tokenize("The Quick Brown Fox is Fast");
        assert!(toks.contains("quick"));
        assert!(toks.contains("brown"));
        assert!(!toks.contains("the"));
        assert!(!toks.contains("is"));
    }

    #[test]
    fn content_similarity_properties() {
        assert_eq!(content_similarity("go uses sqlite", "go uses sqlite"), 1.0);
        assert_eq!(content_similarity("", "go uses sqlite"), 0.0);
        let a = "go uses sqlite for storage";
        let b = "we use sqlite";
        assert_eq!(content_similarity(a, b), content_similarity(b, a));
    }

    #[test]
    fn content_similarity_substring_scores_one() {
        assert_eq!(content_similarity("sqlite storage", "go uses sqlite storage heavily"), 1.0);
    }

    #[test]
    fn keyword_search_skips_zero_score_and_breaks_ties_on_importance() {
        let insights = vec![insight("go compiles fast", 2), insight("go compiles fast too", 5), insight("totally unrelated", 3)];
        let results = keyword_search(&insights, "go compiles fast", 10, None);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].0.importance, 5);
    }
}
